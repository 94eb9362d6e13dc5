//! Command-line interface for vndump.
//!
//! Parses what to dump and where, and turns connection flags into a
//! [`ClientConfig`].
use std::path::PathBuf;

use clap::Parser;

use crate::{
    config::{
        ClientConfig, DEFAULT_BUFFER_SIZE, DEFAULT_CLIENT, DEFAULT_HOST, DEFAULT_MAX_FRAME_SIZE,
        DEFAULT_PORT,
    },
    export::Format,
    fetch::{EntityType, FetchError},
};

/// What a run dumps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Stats,
    Entity(EntityType),
}

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// The type of data to fetch (`dbstats` or an entity type such as `vn`)
    pub target: String,
    /// What part of that data to fetch
    #[arg(default_value = "basic")]
    pub flags: String,
    /// The target dir to output
    #[arg(short, long, default_value = "data")]
    pub dir: PathBuf,
    /// Output the result as csv
    #[arg(short, long)]
    pub csv: bool,
    /// API host
    #[arg(long, default_value = DEFAULT_HOST)]
    pub host: String,
    /// API port
    #[arg(long, default_value_t = DEFAULT_PORT)]
    pub port: u16,
    /// Bytes requested per socket read
    #[arg(long, default_value_t = DEFAULT_BUFFER_SIZE)]
    pub buffer_size: usize,
    /// Largest accepted reply in bytes; 0 accepts replies of any size
    #[arg(long, default_value_t = DEFAULT_MAX_FRAME_SIZE)]
    pub max_frame_size: usize,
    /// Client name sent on login
    #[arg(long, default_value = DEFAULT_CLIENT)]
    pub client: String,
}

impl Cli {
    pub fn target(&self) -> Result<Target, FetchError> {
        match self.target.as_str() {
            "dbstats" => Ok(Target::Stats),
            s => s.parse().map(Target::Entity),
        }
    }

    pub fn format(&self) -> Format {
        if self.csv { Format::Csv } else { Format::Json }
    }

    pub fn config(&self) -> ClientConfig {
        ClientConfig {
            host: self.host.clone(),
            port: self.port,
            buffer_size: self.buffer_size,
            max_frame_size: (self.max_frame_size > 0).then_some(self.max_frame_size),
            client: self.client.clone(),
            ..ClientConfig::default()
        }
    }
}
