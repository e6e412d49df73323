//! Per-node state and the handlers the dispatcher runs.
//!
//! Everything a node knows lives behind [`NodeContext`]; there is no
//! global state. Handlers run to completion on the dispatcher thread,
//! one event at a time, so none of the protocol state needs locking.
//! The only I/O a handler performs is queueing a datagram.

use {
    crate::config::{FlushPath, NodeRole},
    canopy_admin::{page, server::AdminRequest, AdminServer},
    canopy_collector::{collector::SampleCollector, ring::SampleBatch, source::SampleSource},
    canopy_dissemination::{
        engine::{DisseminationEngine, EngineOutput, TimerSignal},
        trickle::TrickleTimer,
    },
    canopy_net::{
        codec,
        collect::{CollectChannel, CollectDelivery},
        control::{ControlPlane, InboundToken},
        directory::{LocalDirectory, ServiceDirectory, ServiceId},
        report::{InboundReport, ReportSender, ReportSink},
        tables::{NeighborTable, RouteTable},
    },
    log::*,
    std::{
        net::SocketAddr,
        time::{Duration, Instant},
    },
};

/// Sockets and servers a node brought up for its role. Fields the role
/// does not use stay `None`.
pub(crate) struct NodeTransports {
    pub control: ControlPlane,
    pub collect: Option<CollectChannel>,
    pub report_sender: Option<ReportSender>,
    pub report_sink: Option<ReportSink>,
    pub admin: Option<AdminServer>,
}

pub(crate) struct NodeContext {
    pub role: NodeRole,
    pub flush_path: FlushPath,
    pub engine: DisseminationEngine,
    pub timer: TrickleTimer,
    pub collector: Option<SampleCollector>,
    pub source: Box<dyn SampleSource + Send>,
    pub neighbors: NeighborTable,
    pub routes: RouteTable,
    pub directory: LocalDirectory,
    pub control: ControlPlane,
    pub collect: Option<CollectChannel>,
    pub report_sender: Option<ReportSender>,
    pub report_sink: Option<ReportSink>,
    pub admin: Option<AdminServer>,
    pub last_parent: Option<SocketAddr>,
    pub pages_served: u32,
    pub table_max_silence: Duration,
    pub report_service_id: ServiceId,
    pub collect_max_hops: u8,
}

impl NodeContext {
    /// Earliest instant either timer wants attention.
    pub(crate) fn next_deadline(&self) -> Instant {
        let mut deadline = self.timer.poll_at();
        if let Some(collector) = &self.collector {
            deadline = deadline.min(collector.poll_at());
        }
        deadline
    }

    /// Runs whatever is due at `now`: a Trickle transmission, then a
    /// sample tick, then the flush the tick may have produced.
    pub(crate) fn run_timers(&mut self, now: Instant) {
        if let Some(fire) = self.timer.poll(now) {
            let output = self.engine.on_transmit_due(fire.suppress);
            self.apply(output, now);
        }

        let flush = match self.collector.as_mut() {
            Some(collector) => collector
                .poll(now, self.engine.store_mut(), self.source.as_mut())
                .and_then(|output| output.flush),
            None => None,
        };
        if let Some(batch) = flush {
            self.flush_batch(batch);
        }
    }

    /// A token arrived on the control plane.
    pub(crate) fn on_control(&mut self, inbound: InboundToken, now: Instant) {
        self.neighbors.record_heard(inbound.from, now);
        let output = self.engine.on_receive(&inbound.packet);
        self.apply(output, now);
    }

    /// A unicast batch arrived at the report sink.
    pub(crate) fn on_report(&mut self, inbound: InboundReport, now: Instant) {
        self.neighbors.record_heard(inbound.from, now);
        info!("sink received a batch from {}", inbound.from);
        for sample in &inbound.batch {
            info!(
                "[Sink] Value = {} | Index = {} | Interval Used = {}",
                sample.value, sample.index, sample.interval_used
            );
        }
    }

    /// A frame came up the collection tree.
    pub(crate) fn on_collect(&mut self, delivery: CollectDelivery, now: Instant) {
        self.neighbors.record_heard(delivery.from, now);
        let fresh = self.routes.record_delivery(
            delivery.originator,
            delivery.from,
            delivery.seqno,
            delivery.hops,
            now,
        );
        if !fresh {
            debug!(
                "duplicate frame from node {} (seq {})",
                delivery.originator, delivery.seqno
            );
            return;
        }
        info!(
            "sink accepted frame from node {} seq {} hops {}",
            delivery.originator, delivery.seqno, delivery.hops
        );
        match codec::decode_sample_batch(&delivery.payload) {
            Ok(batch) => {
                for sample in &batch {
                    info!(
                        "[Sink] Value = {} | Index = {} | Interval Used = {}",
                        sample.value, sample.index, sample.interval_used
                    );
                }
            }
            Err(err) => warn!(
                "payload from node {} did not decode: {err}",
                delivery.originator
            ),
        }
    }

    /// A page fetch, possibly carrying an interval-change command.
    pub(crate) fn on_admin(&mut self, request: AdminRequest, now: Instant) {
        if let Some(command) = request.command {
            let output = self.engine.on_admin_edit(command.node, command.interval);
            self.apply(output, now);
        }
        self.pages_served = self.pages_served.wrapping_add(1);
        self.neighbors.evict_silent(now, self.table_max_silence);
        self.routes.evict_silent(now, self.table_max_silence);
        let chunks = page::render_status_page(
            &self.neighbors,
            &self.routes,
            request.command,
            self.pages_served,
            now,
        );
        if request.reply.send(chunks).is_err() {
            debug!("admin client went away before the page was rendered");
        }
    }

    /// Feeds an engine decision back into the timer and the wire.
    fn apply(&mut self, output: EngineOutput, now: Instant) {
        match output.timer_signal {
            Some(TimerSignal::Consistency) => self.timer.hear_consistent(),
            Some(TimerSignal::Inconsistency) => self.timer.hear_inconsistent(now),
            Some(TimerSignal::Reset) => self.timer.reset_event(now),
            None => {}
        }
        if let Some(packet) = output.broadcast {
            if let Err(err) = self.control.broadcast(packet) {
                warn!("dropping outbound token broadcast: {err}");
            }
        }
    }

    /// Delivers a full batch along the configured flush path.
    fn flush_batch(&mut self, batch: SampleBatch) {
        match self.flush_path {
            FlushPath::DirectedUnicast => {
                let Some(sink) = self.directory.lookup(self.report_service_id) else {
                    warn!("Service {} not found", self.report_service_id);
                    return;
                };
                let Some(sender) = &self.report_sender else {
                    warn!("no report sender bound, dropping batch");
                    return;
                };
                info!("sending full batch to sink {sink}");
                if let Err(err) = sender.send(sink, batch) {
                    warn!("report to {sink} dropped: {err}");
                }
            }
            FlushPath::CollectTree => {
                let Some(collect) = self.collect.as_mut() else {
                    warn!("no collect channel open, dropping batch");
                    return;
                };
                let payload = match codec::encode_sample_batch(&batch) {
                    Ok(bytes) => bytes,
                    Err(err) => {
                        error!("failed to encode batch for the tree: {err}");
                        return;
                    }
                };
                if let Err(err) = collect.send(&payload, self.collect_max_hops) {
                    warn!("tree send failed: {err}");
                }
                let parent = collect.current_parent();
                if parent != self.last_parent {
                    if let Some(old) = self.last_parent {
                        info!("link to parent {old} lost");
                    }
                    if let Some(new) = parent {
                        info!("link to parent {new} established");
                    }
                    self.last_parent = parent;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::config::NodeConfig,
        canopy_collector::{config::CollectorConfig, ring::Sample, source::SequenceSource},
        canopy_dissemination::token::TokenPacket,
        tokio::sync::oneshot,
    };

    async fn make_context(config: &NodeConfig, role: NodeRole) -> NodeContext {
        let now = Instant::now();
        let engine = DisseminationEngine::new(config.node_id, role == NodeRole::Sensor);
        let timer = TrickleTimer::seeded(&config.dissemination, now, 7);
        let collector = (role == NodeRole::Sensor)
            .then(|| SampleCollector::new(config.collector.clone(), engine.store(), now));
        NodeContext {
            role,
            flush_path: config.flush_path,
            engine,
            timer,
            collector,
            source: Box::new(SequenceSource::new((1..=50).collect())),
            neighbors: NeighborTable::new(),
            routes: RouteTable::new(),
            directory: LocalDirectory::new(),
            control: ControlPlane::start(&config.net).await.unwrap(),
            collect: None,
            report_sender: None,
            report_sink: None,
            admin: None,
            last_parent: None,
            pages_served: 0,
            table_max_silence: config.table_max_silence,
            report_service_id: config.net.report_service_id,
            collect_max_hops: config.net.collect_max_hops,
        }
    }

    fn token_from(addr: &str, token: u8) -> InboundToken {
        InboundToken {
            packet: TokenPacket {
                token,
                target_node: 0,
                target_interval: 0,
            },
            from: addr.parse().unwrap(),
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_control_event_records_neighbor_and_adopts() {
        let config = NodeConfig::dev_default();
        let mut context = make_context(&config, NodeRole::Sensor).await;
        let now = Instant::now();

        context.on_control(token_from("[::1]:40001", 5), now);

        assert_eq!(context.neighbors.len(), 1);
        assert_eq!(context.engine.store().token(), 5);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_stale_peer_still_counted_as_neighbor() {
        let config = NodeConfig::dev_default();
        let mut context = make_context(&config, NodeRole::Sensor).await;
        let now = Instant::now();

        context.on_control(token_from("[::1]:40001", 5), now);
        context.on_control(token_from("[::1]:40002", 3), now);

        // The stale token is rejected but the peer is still a neighbor.
        assert_eq!(context.engine.store().token(), 5);
        assert_eq!(context.neighbors.len(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_flush_without_directory_entry_is_dropped() {
        let config = NodeConfig::dev_default();
        let mut context = make_context(&config, NodeRole::Sensor).await;
        let start = Instant::now();

        // No registration for the report service: the third tick's
        // batch is dropped without error and the sample count keeps
        // climbing instead of rewinding to the flushed boundary.
        let tick = config.collector.short_period / 2;
        for n in 1..=4u32 {
            context.run_timers(start + tick * n);
        }
        assert_eq!(context.collector.as_ref().unwrap().samples_taken(), 4);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_collector_ticks_through_run_timers() {
        let mut config = NodeConfig::dev_default();
        config.collector = CollectorConfig::dev_default();
        let mut context = make_context(&config, NodeRole::Sensor).await;
        let start = Instant::now();

        let tick = config.collector.short_period / 2;
        context.run_timers(start + tick);
        assert_eq!(context.collector.as_ref().unwrap().samples_taken(), 1);

        // Short of the next tick nothing new is drawn.
        context.run_timers(start + tick + Duration::from_millis(1));
        assert_eq!(context.collector.as_ref().unwrap().samples_taken(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_border_router_has_no_collector_deadline() {
        let config = NodeConfig::dev_default();
        let context = make_context(&config, NodeRole::BorderRouter).await;
        assert_eq!(context.next_deadline(), context.timer.poll_at());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_collect_duplicate_not_reprocessed() {
        let config = NodeConfig::dev_default();
        let mut context = make_context(&config, NodeRole::BorderRouter).await;
        let now = Instant::now();
        let delivery = CollectDelivery {
            originator: 4,
            seqno: 9,
            hops: 1,
            payload: codec::encode_sample_batch(&[Sample::default(); 3]).unwrap(),
            from: "[::1]:40001".parse().unwrap(),
        };

        context.on_collect(delivery.clone(), now);
        context.on_collect(delivery, now);

        assert_eq!(context.routes.lookup(4).unwrap().deliveries, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_admin_command_resets_dissemination() {
        let config = NodeConfig::dev_default();
        let mut context = make_context(&config, NodeRole::BorderRouter).await;
        let now = Instant::now();

        let (reply, mut page_rx) = oneshot::channel();
        context.on_admin(
            AdminRequest {
                command: Some(canopy_admin::AdminCommand {
                    node: 3,
                    interval: 2,
                }),
                reply,
            },
            now,
        );

        assert_eq!(context.engine.store().token(), 1);
        assert_eq!(context.engine.store().target_node(), 3);
        assert_eq!(context.pages_served, 1);
        let page = page_rx.try_recv().unwrap().concat();
        assert!(page.contains("Change Node [3] to Interval => 2"));
        assert!(page.contains("This page sent 1 times"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_tree_flush_tracks_parent_changes() {
        let mut config = NodeConfig::dev_default();
        config.flush_path = FlushPath::CollectTree;
        let mut context = make_context(&config, NodeRole::Sensor).await;
        let sink = CollectChannel::open(&config.net, 1).await.unwrap();
        let mut collect = CollectChannel::open(&config.net, config.node_id)
            .await
            .unwrap();
        collect.set_parent(Some(sink.local_addr));
        context.collect = Some(collect);

        context.flush_batch([Sample::default(); 3]);
        assert_eq!(context.last_parent, Some(sink.local_addr));

        // The parent fell out of the tree: the next flush records the
        // loss even though the send itself could not go anywhere.
        context.collect.as_mut().unwrap().set_parent(None);
        context.flush_batch([Sample::default(); 3]);
        assert_eq!(context.last_parent, None);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_plain_fetch_leaves_token_alone() {
        let config = NodeConfig::dev_default();
        let mut context = make_context(&config, NodeRole::BorderRouter).await;
        let now = Instant::now();

        let (reply, mut page_rx) = oneshot::channel();
        context.on_admin(
            AdminRequest {
                command: None,
                reply,
            },
            now,
        );

        assert_eq!(context.engine.store().token(), 0);
        let page = page_rx.try_recv().unwrap().concat();
        assert!(!page.contains("<h5>"));
    }
}
