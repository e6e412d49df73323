//! Error types for node startup.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    /// The configuration failed validation.
    #[error("invalid configuration: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// A transport failed to come up.
    #[error(transparent)]
    Net(#[from] canopy_net::NetError),

    /// The admin listener failed to come up.
    #[error(transparent)]
    Admin(#[from] canopy_admin::AdminError),

    /// The dispatcher thread could not be spawned.
    #[error("failed to spawn dispatcher thread: {0}")]
    Spawn(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, NodeError>;
