//! Configuration for the admin server.

use std::net::{IpAddr, Ipv6Addr};

/// TCP port the status page is served on.
pub const DEFAULT_ADMIN_PORT: u16 = 8080;

#[derive(Debug, Clone)]
pub struct AdminConfig {
    /// Address the listener binds to.
    /// Default: `::` (unspecified, all interfaces).
    pub bind_addr: IpAddr,

    /// Listener port.
    /// Default: 8080.
    pub port: u16,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            bind_addr: IpAddr::V6(Ipv6Addr::UNSPECIFIED),
            port: DEFAULT_ADMIN_PORT,
        }
    }
}

impl AdminConfig {
    /// Returns a configuration for tests: loopback bind, ephemeral port.
    #[cfg(any(test, feature = "dev-context-only-utils"))]
    pub fn dev_default() -> Self {
        Self {
            bind_addr: IpAddr::V6(Ipv6Addr::LOCALHOST),
            port: 0,
        }
    }
}
