//! Node runtime for the canopy mesh.
//!
//! A node is assembled from the protocol crates and run as:
//!
//! 1. **Transports** ([`canopy_net`], [`canopy_admin`]) on a tokio
//!    runtime, feeding decoded events into channels.
//! 2. **One dispatcher thread** draining those channels and polling the
//!    Trickle and sampling timers, run-to-completion per event.
//! 3. **Role wiring**: a `Sensor` samples and reports; a `BorderRouter`
//!    hosts the report sink, the collect root, and the admin page.

pub mod config;
mod context;
pub mod error;
pub mod service;

pub use {
    config::{FlushPath, NodeConfig, NodeRole},
    error::{NodeError, Result},
    service::NodeService,
};
