//! Canopy Test Harness
//!
//! A deterministic in-memory mesh for integration-testing the protocol
//! stack. Every node carries a real dissemination engine, a seeded
//! Trickle timer, and (for sensors) a real sample collector; the
//! harness moves a fabricated clock and delivers every broadcast to
//! every other node in the same step, so tests observe protocol
//! behavior without sockets or sleeps. Wire behavior is covered by the
//! transport crates' own tests.

use {
    canopy_collector::{
        collector::SampleCollector,
        config::CollectorConfig,
        ring::{Sample, SampleBatch},
        source::SequenceSource,
    },
    canopy_dissemination::{
        config::DisseminationConfig,
        engine::{DisseminationEngine, EngineOutput, TimerSignal},
        token::{NodeId, TokenPacket},
        trickle::TrickleTimer,
    },
    std::time::{Duration, Instant},
};

// ─── Constants ───────────────────────────────────────────────────────────────

/// Node id of the border router in every harness mesh.
pub const BORDER_ROUTER_ID: NodeId = 1;

/// Node id of the first sensor; further sensors count up from here.
pub const FIRST_SENSOR_ID: NodeId = 2;

// ─── Mesh node ───────────────────────────────────────────────────────────────

/// One protocol participant in the in-memory mesh.
pub struct MeshNode {
    pub engine: DisseminationEngine,
    pub timer: TrickleTimer,
    pub collector: Option<SampleCollector>,
    source: Option<SequenceSource>,
    /// Batches this node flushed, in flush order.
    pub flushed: Vec<SampleBatch>,
    /// Token packets this node put on the air, in transmit order.
    pub broadcasts: Vec<TokenPacket>,
}

impl MeshNode {
    fn border_router(now: Instant) -> Self {
        let engine = DisseminationEngine::new(BORDER_ROUTER_ID, false);
        Self {
            timer: TrickleTimer::seeded(
                &DisseminationConfig::dev_default(),
                now,
                BORDER_ROUTER_ID as u64,
            ),
            engine,
            collector: None,
            source: None,
            flushed: Vec::new(),
            broadcasts: Vec::new(),
        }
    }

    fn sensor(node_id: NodeId, now: Instant) -> Self {
        let engine = DisseminationEngine::new(node_id, true);
        let collector = SampleCollector::new(CollectorConfig::dev_default(), engine.store(), now);
        Self {
            timer: TrickleTimer::seeded(&DisseminationConfig::dev_default(), now, node_id as u64),
            engine,
            collector: Some(collector),
            source: Some(SequenceSource::new((1..=10_000).collect())),
            flushed: Vec::new(),
            broadcasts: Vec::new(),
        }
    }

    pub fn id(&self) -> NodeId {
        self.engine.node_id()
    }

    /// Every sample this node has flushed, flattened in order.
    pub fn flushed_samples(&self) -> Vec<Sample> {
        self.flushed.iter().flatten().copied().collect()
    }

    /// Samples taken over this node's lifetime, flushed or not.
    pub fn samples_taken(&self) -> u32 {
        self.collector
            .as_ref()
            .map_or(0, SampleCollector::samples_taken)
    }

    fn next_deadline(&self) -> Instant {
        let mut deadline = self.timer.poll_at();
        if let Some(collector) = &self.collector {
            deadline = deadline.min(collector.poll_at());
        }
        deadline
    }

    /// Applies an engine decision to the timer; returns the packet to
    /// put on the air, if any.
    fn apply(&mut self, output: EngineOutput, now: Instant) -> Option<TokenPacket> {
        match output.timer_signal {
            Some(TimerSignal::Consistency) => self.timer.hear_consistent(),
            Some(TimerSignal::Inconsistency) => self.timer.hear_inconsistent(now),
            Some(TimerSignal::Reset) => self.timer.reset_event(now),
            None => {}
        }
        if let Some(packet) = output.broadcast {
            self.broadcasts.push(packet);
            return Some(packet);
        }
        None
    }

    fn tick_collector(&mut self, now: Instant) {
        if let (Some(collector), Some(source)) = (self.collector.as_mut(), self.source.as_mut()) {
            if let Some(output) = collector.poll(now, self.engine.store_mut(), source) {
                if let Some(batch) = output.flush {
                    self.flushed.push(batch);
                }
            }
        }
    }
}

// ─── Mesh harness ────────────────────────────────────────────────────────────

/// An in-memory mesh of one border router and `sensor_count` sensors.
///
/// Broadcast delivery is instantaneous and lossless: every transmitted
/// packet is heard by every other node before the clock moves again. A
/// node never hears its own transmissions.
pub struct MeshHarness {
    pub nodes: Vec<MeshNode>,
    pub now: Instant,
}

impl MeshHarness {
    pub fn new(sensor_count: usize) -> Self {
        let now = Instant::now();
        let mut nodes = vec![MeshNode::border_router(now)];
        for n in 0..sensor_count {
            nodes.push(MeshNode::sensor(FIRST_SENSOR_ID + n as NodeId, now));
        }
        Self { nodes, now }
    }

    pub fn node(&self, node_id: NodeId) -> &MeshNode {
        self.nodes
            .iter()
            .find(|node| node.id() == node_id)
            .unwrap_or_else(|| panic!("no node {node_id} in the mesh"))
    }

    pub fn node_mut(&mut self, node_id: NodeId) -> &mut MeshNode {
        self.nodes
            .iter_mut()
            .find(|node| node.id() == node_id)
            .unwrap_or_else(|| panic!("no node {node_id} in the mesh"))
    }

    pub fn border_router(&self) -> &MeshNode {
        self.node(BORDER_ROUTER_ID)
    }

    /// Token each node currently holds, in node order.
    pub fn tokens(&self) -> Vec<u8> {
        self.nodes
            .iter()
            .map(|node| node.engine.store().token())
            .collect()
    }

    /// Total packets put on the air by the whole mesh so far.
    pub fn total_broadcasts(&self) -> usize {
        self.nodes.iter().map(|node| node.broadcasts.len()).sum()
    }

    /// Executes an interval-change command on the border router, as the
    /// admin surface would.
    pub fn admin_edit(&mut self, target_node: NodeId, interval_code: i32) {
        let now = self.now;
        let output = self.nodes[0].engine.on_admin_edit(target_node, interval_code);
        self.nodes[0].apply(output, now);
    }

    /// Delivers a fabricated packet to one node, as if a peer had
    /// transmitted it.
    pub fn deliver_to(&mut self, node_id: NodeId, packet: TokenPacket) {
        let now = self.now;
        let node = self.node_mut(node_id);
        let output = node.engine.on_receive(&packet);
        node.apply(output, now);
    }

    /// Advances the fabricated clock by `span`, running every timer
    /// that falls due and delivering every resulting broadcast.
    pub fn run_for(&mut self, span: Duration) {
        let deadline = self.now + span;
        loop {
            let next = self
                .nodes
                .iter()
                .map(MeshNode::next_deadline)
                .min()
                .expect("mesh has nodes");
            if next > deadline {
                break;
            }
            self.now = next.max(self.now);
            self.step();
        }
        self.now = deadline;
    }

    /// Runs one step at the current instant: timers first, then the
    /// broadcasts they produced are heard by everyone else.
    fn step(&mut self) {
        let now = self.now;
        let mut on_air = Vec::new();
        for (position, node) in self.nodes.iter_mut().enumerate() {
            if let Some(fire) = node.timer.poll(now) {
                let output = node.engine.on_transmit_due(fire.suppress);
                if let Some(packet) = node.apply(output, now) {
                    on_air.push((position, packet));
                }
            }
            node.tick_collector(now);
        }
        for (sender, packet) in on_air {
            for (position, node) in self.nodes.iter_mut().enumerate() {
                if position == sender {
                    continue;
                }
                let output = node.engine.on_receive(&packet);
                node.apply(output, now);
            }
        }
    }
}
