//! Error types for the networking layer.

use thiserror::Error;

/// Errors produced while encoding, decoding, or moving datagrams.
#[derive(Debug, Error)]
pub enum NetError {
    /// The wire codec rejected a record.
    #[error("wire codec error: {0}")]
    Codec(#[from] bincode::Error),

    /// A datagram's length does not match the fixed record size.
    #[error("datagram is {got} bytes, record is {expected}")]
    WrongLength { expected: usize, got: usize },

    /// Socket creation, binding, or group membership failed.
    #[error("socket error: {0}")]
    Io(#[from] std::io::Error),

    /// The channel to or from a transport task has shut down.
    #[error("transport channel closed")]
    ChannelClosed,

    /// The outbound queue is full and the packet was dropped.
    #[error("outbound queue full (capacity {capacity})")]
    QueueFull { capacity: usize },

    /// A tree send was attempted before any parent was known.
    #[error("no parent designated for tree send")]
    NoParent,
}

pub type Result<T> = std::result::Result<T, NetError>;
