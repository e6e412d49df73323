//! Configuration for the networking layer.

use {
    std::net::{IpAddr, Ipv6Addr},
    thiserror::Error,
};

/// UDP port the control plane binds for token dissemination.
pub const DEFAULT_CONTROL_PORT: u16 = 30001;

/// UDP port the border router binds for unicast sample reports.
pub const DEFAULT_REPORT_PORT: u16 = 1234;

/// UDP port carrying collection-tree frames.
pub const DEFAULT_COLLECT_PORT: u16 = 30002;

/// Logical channel number stamped on every collect frame. Frames heard
/// on another channel are dropped by the receiver.
pub const DEFAULT_COLLECT_CHANNEL: u16 = 130;

/// Hop budget handed to each tree send.
pub const DEFAULT_COLLECT_MAX_HOPS: u8 = 15;

/// Directory key under which the border router registers its report sink.
pub const DEFAULT_REPORT_SERVICE_ID: u16 = 190;

/// All-nodes link-local group the control plane broadcasts to.
pub const DEFAULT_CONTROL_GROUP: Ipv6Addr = Ipv6Addr::new(0xff02, 0, 0, 0, 0, 0, 0, 1);

const DEFAULT_OUTBOUND_BUFFER: usize = 64;

/// Socket and channel parameters shared by every transport in the node.
#[derive(Debug, Clone)]
pub struct NetConfig {
    /// Local address all sockets bind to.
    /// Default: `::` (unspecified, all interfaces).
    pub bind_addr: IpAddr,

    /// Port of the control-plane socket.
    /// Default: 30001.
    pub control_port: u16,

    /// Multicast group token broadcasts are addressed to.
    /// Default: `ff02::1`.
    pub control_group: Ipv6Addr,

    /// Whether the control socket joins `control_group` on startup.
    /// Test harnesses bind loopback and deliver unicast instead.
    /// Default: true.
    pub join_multicast: bool,

    /// Port the report sink listens on.
    /// Default: 1234.
    pub report_port: u16,

    /// Port carrying collection-tree frames.
    /// Default: 30002.
    pub collect_port: u16,

    /// Logical channel number for collect frames.
    /// Default: 130.
    pub collect_channel: u16,

    /// Hop budget for tree sends.
    /// Default: 15.
    pub collect_max_hops: u8,

    /// Directory key for the report sink service.
    /// Default: 190.
    pub report_service_id: u16,

    /// Depth of each transport's outbound queue.
    /// Default: 64.
    pub outbound_buffer: usize,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            bind_addr: IpAddr::V6(Ipv6Addr::UNSPECIFIED),
            control_port: DEFAULT_CONTROL_PORT,
            control_group: DEFAULT_CONTROL_GROUP,
            join_multicast: true,
            report_port: DEFAULT_REPORT_PORT,
            collect_port: DEFAULT_COLLECT_PORT,
            collect_channel: DEFAULT_COLLECT_CHANNEL,
            collect_max_hops: DEFAULT_COLLECT_MAX_HOPS,
            report_service_id: DEFAULT_REPORT_SERVICE_ID,
            outbound_buffer: DEFAULT_OUTBOUND_BUFFER,
        }
    }
}

/// Errors from validating a [`NetConfig`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("control group {0} is not a multicast address")]
    NotMulticast(Ipv6Addr),

    #[error("collect max hops must be at least 1")]
    ZeroMaxHops,

    #[error("outbound buffer must hold at least one packet")]
    ZeroOutboundBuffer,

    #[error("port {0} is assigned to more than one socket")]
    PortCollision(u16),
}

impl NetConfig {
    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.control_group.is_multicast() {
            return Err(ConfigError::NotMulticast(self.control_group));
        }
        if self.collect_max_hops == 0 {
            return Err(ConfigError::ZeroMaxHops);
        }
        if self.outbound_buffer == 0 {
            return Err(ConfigError::ZeroOutboundBuffer);
        }
        // Ephemeral (zero) ports never collide; the OS picks distinct ones.
        let ports = [self.control_port, self.report_port, self.collect_port];
        for (i, port) in ports.iter().enumerate() {
            if *port != 0 && ports[i.saturating_add(1)..].contains(port) {
                return Err(ConfigError::PortCollision(*port));
            }
        }
        Ok(())
    }

    /// Returns a configuration for tests: loopback binds, ephemeral
    /// ports, and no group membership.
    #[cfg(any(test, feature = "dev-context-only-utils"))]
    pub fn dev_default() -> Self {
        Self {
            bind_addr: IpAddr::V6(Ipv6Addr::LOCALHOST),
            control_port: 0,
            report_port: 0,
            collect_port: 0,
            join_multicast: false,
            outbound_buffer: 8,
            ..Self::default()
        }
    }
}
