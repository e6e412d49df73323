//! Canopy Integration Tests
//!
//! Cross-crate scenarios that the per-crate unit tests cannot cover:
//!
//! 1. **Dissemination** — token comparison and adoption across a whole
//!    mesh, Trickle suppression and reset dynamics, admin-minted records
//!    reaching every node.
//! 2. **Reporting** — sampling cadence, ring batching, flush boundaries,
//!    and interval-change tagging driven by disseminated toggles.
//! 3. **End to end** — real sockets: the admin HTTP surface, the unicast
//!    report path, and collection-tree duplicate filtering.
//!
//! Protocol scenarios run on the in-memory [`harness::MeshHarness`] with a
//! fabricated clock; only the end-to-end module touches the network.

// The fabricated clock is Instant/Duration arithmetic throughout.
#![allow(clippy::arithmetic_side_effects)]

pub mod harness;
