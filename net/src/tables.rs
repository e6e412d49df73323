//! Neighbor and route bookkeeping backing the status page.
//!
//! The node records a neighbor for every control-plane datagram it hears
//! and a route for every collect delivery the sink accepts. Entries age
//! out once a peer falls silent for longer than the caller's threshold.

use {
    canopy_dissemination::token::NodeId,
    std::{
        collections::HashMap,
        net::SocketAddr,
        time::{Duration, Instant},
    },
};

/// One peer heard on the control plane.
#[derive(Debug, Clone)]
pub struct NeighborEntry {
    pub addr: SocketAddr,
    pub first_heard: Instant,
    pub last_heard: Instant,
    pub packets_heard: u64,
}

impl NeighborEntry {
    fn new(addr: SocketAddr, now: Instant) -> Self {
        Self {
            addr,
            first_heard: now,
            last_heard: now,
            packets_heard: 1,
        }
    }

    fn record_heard(&mut self, now: Instant) {
        self.last_heard = now;
        self.packets_heard = self.packets_heard.saturating_add(1);
    }

    /// Time since this neighbor was last heard.
    pub fn silence(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_heard)
    }
}

/// All peers heard on the control plane, keyed by source address.
#[derive(Debug, Default)]
pub struct NeighborTable {
    neighbors: HashMap<SocketAddr, NeighborEntry>,
}

impl NeighborTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that a datagram arrived from `addr`.
    pub fn record_heard(&mut self, addr: SocketAddr, now: Instant) {
        self.neighbors
            .entry(addr)
            .and_modify(|entry| entry.record_heard(now))
            .or_insert_with(|| NeighborEntry::new(addr, now));
    }

    pub fn get(&self, addr: &SocketAddr) -> Option<&NeighborEntry> {
        self.neighbors.get(addr)
    }

    pub fn len(&self) -> usize {
        self.neighbors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.neighbors.is_empty()
    }

    /// Entries in address order, for stable rendering.
    pub fn entries(&self) -> Vec<&NeighborEntry> {
        let mut entries: Vec<_> = self.neighbors.values().collect();
        entries.sort_by_key(|entry| entry.addr);
        entries
    }

    /// Drops every neighbor silent for longer than `max_silence`.
    /// Returns how many entries were removed.
    pub fn evict_silent(&mut self, now: Instant, max_silence: Duration) -> usize {
        let before = self.neighbors.len();
        self.neighbors
            .retain(|_, entry| entry.silence(now) <= max_silence);
        before.saturating_sub(self.neighbors.len())
    }
}

/// One originator the sink has accepted payloads from.
#[derive(Debug, Clone)]
pub struct RouteEntry {
    pub originator: NodeId,
    pub via: SocketAddr,
    pub last_seqno: u8,
    pub hops: u8,
    pub deliveries: u64,
    pub last_updated: Instant,
}

/// Collect provenance per originator.
#[derive(Debug, Default)]
pub struct RouteTable {
    routes: HashMap<NodeId, RouteEntry>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a collect delivery. Returns `false` when the frame
    /// repeats the originator's previous sequence number, in which case
    /// the entry is refreshed but the delivery should not be processed
    /// again.
    pub fn record_delivery(
        &mut self,
        originator: NodeId,
        via: SocketAddr,
        seqno: u8,
        hops: u8,
        now: Instant,
    ) -> bool {
        match self.routes.get_mut(&originator) {
            Some(entry) if entry.last_seqno == seqno => {
                entry.via = via;
                entry.last_updated = now;
                false
            }
            Some(entry) => {
                entry.via = via;
                entry.last_seqno = seqno;
                entry.hops = hops;
                entry.deliveries = entry.deliveries.saturating_add(1);
                entry.last_updated = now;
                true
            }
            None => {
                self.routes.insert(
                    originator,
                    RouteEntry {
                        originator,
                        via,
                        last_seqno: seqno,
                        hops,
                        deliveries: 1,
                        last_updated: now,
                    },
                );
                true
            }
        }
    }

    pub fn lookup(&self, originator: NodeId) -> Option<&RouteEntry> {
        self.routes.get(&originator)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Entries in originator order, for stable rendering.
    pub fn entries(&self) -> Vec<&RouteEntry> {
        let mut entries: Vec<_> = self.routes.values().collect();
        entries.sort_by_key(|entry| entry.originator);
        entries
    }

    /// Drops every route not refreshed within `max_silence`.
    pub fn evict_silent(&mut self, now: Instant, max_silence: Duration) -> usize {
        let before = self.routes.len();
        self.routes
            .retain(|_, entry| now.saturating_duration_since(entry.last_updated) <= max_silence);
        before.saturating_sub(self.routes.len())
    }
}
