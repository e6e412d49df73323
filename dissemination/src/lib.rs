//! Canopy Configuration-Token Dissemination
//!
//! Gossip-based dissemination of a small configuration record (a *token*)
//! across a mesh sensor network, governed by a Trickle timer (RFC 6206):
//!
//! 1. **Broadcast** — every node periodically multicasts its
//!    `{token, target_node, target_interval}` record on the control
//!    channel, at a randomized point in the second half of the current
//!    Trickle interval.
//! 2. **Compare** — a receiver compares token bytes under wrapping
//!    sequence arithmetic, so ordering survives the 255 → 0 wrap.
//! 3. **Converge** — equal tokens count as redundancy (and suppress
//!    transmissions once k of them are heard in one interval); a newer
//!    token is adopted and shrinks the interval back to Imin; a stale peer
//!    triggers the same shrink so it is corrected quickly.
//! 4. **Apply** — when an adopted token targets the local node, the active
//!    reporting interval flips between short and long, and a one-shot
//!    marker tags the next sample with the pre-change interval code.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────┐
//! │            DisseminationEngine             │
//! │  ┌────────────┐      ┌──────────────────┐  │
//! │  │ TokenStore │      │  decision logic  │  │
//! │  │ token,     │◄─────┤  on_receive      │  │
//! │  │ targets,   │      │  on_transmit_due │  │
//! │  │ one-shot   │      │  on_admin_edit   │  │
//! │  └────────────┘      └───────┬──────────┘  │
//! └──────────────────────────────┼─────────────┘
//!                 EngineOutput   │ TimerSignal
//!                                ▼
//!                     ┌───────────────────┐
//!                     │   TrickleTimer    │
//!                     │ I, t ∈ [I/2, I), c│
//!                     └───────────────────┘
//! ```
//!
//! The engine is pure; the timer is clock-driven but never sleeps. A
//! single-threaded driver polls the timer, feeds events to the engine and
//! executes the outputs.

// Deadline bookkeeping is Instant/Duration arithmetic throughout.
#![allow(clippy::arithmetic_side_effects)]

pub mod config;
pub mod engine;
pub mod token;
pub mod trickle;

// Re-exports for convenience
pub use config::DisseminationConfig;
pub use engine::{DisseminationEngine, EngineOutput, TimerSignal};
pub use token::{
    compare_tokens, NodeId, ReportInterval, TokenOrdering, TokenPacket, TokenStore,
};
pub use trickle::{TrickleFire, TrickleTimer};
