//! Error types for the admin surface.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdminError {
    /// Listener or connection I/O failed.
    #[error("admin socket error: {0}")]
    Io(#[from] std::io::Error),

    /// The dispatcher side of the request channel has shut down.
    #[error("admin request channel closed")]
    ChannelClosed,
}

pub type Result<T> = std::result::Result<T, AdminError>;
