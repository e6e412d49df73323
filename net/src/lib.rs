//! Networking layer for a canopy mesh node.
//!
//! Three transports share one fixed-layout wire codec:
//!
//! - [`control`]: the UDP multicast socket tokens are disseminated on.
//! - [`report`]: unicast delivery of sample batches to the sink.
//! - [`collect`]: the collection-tree channel, flattened to one hop.
//!
//! Each transport hands decoded traffic to the node's dispatcher over a
//! channel and owns its socket on background tasks, so the dispatcher
//! itself never blocks on the network. [`directory`] resolves the
//! report sink and [`tables`] keeps the neighbor and route bookkeeping
//! shown on the status page.

pub mod codec;
pub mod collect;
pub mod config;
pub mod control;
pub mod directory;
pub mod error;
pub mod report;
pub mod tables;

pub use {
    codec::CollectHeader,
    collect::{CollectChannel, CollectDelivery},
    config::NetConfig,
    control::{ControlPlane, InboundToken},
    directory::{LocalDirectory, ServiceDirectory, ServiceId},
    error::{NetError, Result},
    report::{InboundReport, ReportSender, ReportSink},
    tables::{NeighborTable, RouteTable},
};
