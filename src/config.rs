//! Client configuration.
//!
//! All connection parameters travel through a [`ClientConfig`] value handed to
//! [`Session::open`](crate::protocol::Session::open); nothing is read from
//! process-wide state.

/// Default API host.
pub const DEFAULT_HOST: &str = "api.vndb.org";
/// Default plain-TCP API port.
pub const DEFAULT_PORT: u16 = 19534;
/// Client name sent on login.
pub const DEFAULT_CLIENT: &str = env!("CARGO_PKG_NAME");
/// Size of a single socket read.
pub const DEFAULT_BUFFER_SIZE: usize = 1 << 14;
/// Largest reply accepted before the transport gives up.
pub const DEFAULT_MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Connection and login parameters for a single run.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    pub buffer_size: usize,
    /// `None` disables the cap and buffers replies without limit.
    pub max_frame_size: Option<usize>,
    pub protocol: u32,
    pub client: String,
    pub client_version: f64,
}

impl ClientConfig {
    /// `host:port` form used for connecting and logging.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            buffer_size: DEFAULT_BUFFER_SIZE,
            max_frame_size: Some(DEFAULT_MAX_FRAME_SIZE),
            protocol: 1,
            client: DEFAULT_CLIENT.to_string(),
            client_version: 0.1,
        }
    }
}
