//! Top-level node configuration.

use {
    canopy_admin::AdminConfig,
    canopy_collector::config::CollectorConfig,
    canopy_dissemination::{config::DisseminationConfig, token::NodeId},
    canopy_net::{directory::ServiceId, NetConfig},
    std::{net::SocketAddr, time::Duration},
    thiserror::Error,
};

/// Upper bound on the dispatcher's wait between timer polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Neighbors and routes silent for longer than this are dropped from
/// the status page.
pub const DEFAULT_TABLE_MAX_SILENCE: Duration = Duration::from_secs(900);

/// What a node does besides participating in dissemination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRole {
    /// Samples on a timer and reports batches toward the sink.
    Sensor,
    /// Hosts the report sink, the collect root, and the admin page.
    BorderRouter,
}

/// How a sensor delivers a full batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushPath {
    /// Resolve the sink through the service directory, then unicast.
    DirectedUnicast,
    /// Hand the batch to the collection tree.
    CollectTree,
}

#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Identity carried in disseminated records and collect frames.
    pub node_id: NodeId,

    /// Role this node plays.
    /// Default: `Sensor`.
    pub role: NodeRole,

    /// Flush path for sensors. Ignored on the border router, which
    /// hosts no collector.
    /// Default: `DirectedUnicast`.
    pub flush_path: FlushPath,

    /// Sink address seeded into the collect channel. Required for
    /// sensors on the tree path.
    pub collect_sink: Option<SocketAddr>,

    /// Directory entries seeded at startup, typically the report
    /// service on a sensor.
    pub directory_seed: Vec<(ServiceId, SocketAddr)>,

    /// Cap on the dispatcher's wait between timer polls.
    /// Default: 250ms.
    pub poll_interval: Duration,

    /// Staleness horizon for the neighbor and route tables.
    /// Default: 900s.
    pub table_max_silence: Duration,

    pub dissemination: DisseminationConfig,
    pub collector: CollectorConfig,
    pub net: NetConfig,
    pub admin: AdminConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            node_id: 0,
            role: NodeRole::Sensor,
            flush_path: FlushPath::DirectedUnicast,
            collect_sink: None,
            directory_seed: Vec::new(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            table_max_silence: DEFAULT_TABLE_MAX_SILENCE,
            dissemination: DisseminationConfig::default(),
            collector: CollectorConfig::default(),
            net: NetConfig::default(),
            admin: AdminConfig::default(),
        }
    }
}

/// Errors from validating a [`NodeConfig`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("dissemination: {0}")]
    Dissemination(#[from] canopy_dissemination::config::ConfigError),

    #[error("collector: {0}")]
    Collector(#[from] canopy_collector::config::ConfigError),

    #[error("net: {0}")]
    Net(#[from] canopy_net::config::ConfigError),

    #[error("sensor uses the collect tree but no sink address is seeded")]
    MissingCollectSink,

    #[error("poll interval must be nonzero")]
    ZeroPollInterval,
}

impl NodeConfig {
    /// Validates this configuration and every nested one.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.dissemination.validate()?;
        self.collector.validate()?;
        self.net.validate()?;
        if self.poll_interval.is_zero() {
            return Err(ConfigError::ZeroPollInterval);
        }
        if self.role == NodeRole::Sensor
            && self.flush_path == FlushPath::CollectTree
            && self.collect_sink.is_none()
        {
            return Err(ConfigError::MissingCollectSink);
        }
        Ok(())
    }

    /// Returns a configuration for tests: loopback sockets, compressed
    /// timers.
    #[cfg(any(test, feature = "dev-context-only-utils"))]
    pub fn dev_default() -> Self {
        Self {
            poll_interval: Duration::from_millis(20),
            dissemination: DisseminationConfig::dev_default(),
            collector: CollectorConfig::dev_default(),
            net: NetConfig::dev_default(),
            admin: AdminConfig::dev_default(),
            ..Self::default()
        }
    }
}
