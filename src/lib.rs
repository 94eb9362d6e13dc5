pub mod cli;
pub mod config;
pub mod export;
pub mod fetch;
pub mod protocol;

pub use config::ClientConfig;
pub use fetch::{EntityType, FetchError, Fetcher, fetch_entity, fetch_stats};
pub use protocol::{Record, Session, Stats};
