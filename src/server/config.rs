//! Server configuration.

use std::net::SocketAddr;
use std::time::Duration;

use crate::server::cors::CorsPolicy;

/// Port the API listens on.
pub const DEFAULT_PORT: u16 = 8000;

/// HTTP server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// The address to bind to.
    pub addr: SocketAddr,
    /// The maximum number of concurrent connections.
    pub max_connections: usize,
    /// The read buffer size. A request head must fit in one buffer.
    pub read_buffer_size: usize,
    /// The largest request body accepted, in bytes.
    pub max_body_size: usize,
    /// How long a client may take to send its whole request.
    pub read_timeout: Duration,
    /// Cross-origin policy applied to every response.
    pub cors: CorsPolicy,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            max_connections: 1024,
            read_buffer_size: 8192,
            max_body_size: 1024 * 1024,
            read_timeout: Duration::from_secs(30),
            cors: CorsPolicy::default(),
        }
    }
}
