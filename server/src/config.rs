//! Server settings

use shared::{DEFAULT_PORT, EXPORT_PERIOD, LISTEN_BACKLOG, POLL_INTERVAL};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address to listen on
    pub host: IpAddr,
    /// Port to listen on, 0 picks an ephemeral port
    pub port: u16,
    /// Longest blocking wait before the running flag is checked again
    pub poll_interval: Duration,
    /// Delay between two exported lines
    pub export_period: Duration,
    /// Pending connection queue length
    pub backlog: u32,
}

impl ServerConfig {
    pub fn with_port(port: u16) -> Self {
        Self {
            port,
            ..Self::default()
        }
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            poll_interval: POLL_INTERVAL,
            export_period: EXPORT_PERIOD,
            backlog: LISTEN_BACKLOG,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();

        assert_eq!(config.port, 8080);
        assert_eq!(config.poll_interval, Duration::from_millis(100));
        assert_eq!(config.export_period, Duration::from_millis(100));
        assert_eq!(config.backlog, 10);
        assert_eq!(config.bind_addr().to_string(), "0.0.0.0:8080");
    }

    #[test]
    fn test_with_port() {
        let config = ServerConfig::with_port(9000);
        assert_eq!(config.port, 9000);
        assert_eq!(config.host, IpAddr::V4(Ipv4Addr::UNSPECIFIED));
    }
}
