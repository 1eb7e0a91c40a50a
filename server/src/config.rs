//! Runtime configuration for the control server.

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Port the adhoc control protocol is conventionally served on.
pub const DEFAULT_PORT: u16 = 27312;
pub const DEFAULT_BACKLOG: i32 = 128;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);
pub const DEFAULT_TICK: Duration = Duration::from_millis(1);
pub const DEFAULT_MAX_SESSIONS: usize = 1024;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// IPv4 address to listen on; the wire format only carries IPv4 peers.
    pub host: Ipv4Addr,
    pub port: u16,
    /// Pending-connection queue depth handed to `listen(2)`.
    pub backlog: i32,
    /// Maximum silence before a session is reaped.
    pub timeout: Duration,
    /// Event loop granularity.
    pub tick: Duration,
    pub max_sessions: usize,
}

impl ServerConfig {
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::from((self.host, self.port))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: Ipv4Addr::UNSPECIFIED,
            port: DEFAULT_PORT,
            backlog: DEFAULT_BACKLOG,
            timeout: DEFAULT_TIMEOUT,
            tick: DEFAULT_TICK,
            max_sessions: DEFAULT_MAX_SESSIONS,
        }
    }
}
