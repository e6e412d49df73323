//! Role startup and the dispatcher thread.
//!
//! [`NodeService::start`] validates the configuration, brings up the
//! transports the role needs, and hands a `NodeContext` to a single
//! dispatcher thread. The dispatcher is the only place protocol state
//! is touched: it drains the transport channels and polls the timers,
//! waiting no longer than the earliest deadline between events.

use {
    crate::{
        config::{FlushPath, NodeConfig, NodeRole},
        context::{NodeContext, NodeTransports},
        error::Result,
    },
    canopy_admin::AdminServer,
    canopy_collector::{collector::SampleCollector, source::RandomSource},
    canopy_dissemination::{engine::DisseminationEngine, trickle::TrickleTimer},
    canopy_net::{
        collect::CollectChannel,
        control::ControlPlane,
        directory::{LocalDirectory, ServiceDirectory},
        report::{ReportSender, ReportSink},
        tables::{NeighborTable, RouteTable},
    },
    crossbeam_channel::{never, select},
    log::*,
    std::{
        net::SocketAddr,
        sync::{
            atomic::{AtomicBool, Ordering},
            Arc,
        },
        thread::{Builder, JoinHandle},
        time::{Duration, Instant},
    },
};

/// A running node: transports on the async runtime, protocol on one
/// dispatcher thread.
pub struct NodeService {
    dispatcher: JoinHandle<()>,
    exit: Arc<AtomicBool>,
    /// Where the control plane bound.
    pub control_addr: SocketAddr,
    /// Where the admin page answers, when the role serves one.
    pub admin_addr: Option<SocketAddr>,
}

impl NodeService {
    /// Brings the node up and returns once the dispatcher is running.
    pub async fn start(config: NodeConfig) -> Result<Self> {
        config.validate()?;
        let now = Instant::now();

        let mut directory = LocalDirectory::with_entries(config.directory_seed.iter().copied());

        let transports = match config.role {
            NodeRole::BorderRouter => {
                let report_sink = ReportSink::bind(&config.net).await?;
                directory.register(config.net.report_service_id, report_sink.local_addr);
                info!(
                    "registered report service {} at {}",
                    config.net.report_service_id, report_sink.local_addr
                );
                let mut collect = CollectChannel::open(&config.net, config.node_id).await?;
                collect.designate_sink(true);
                let control = ControlPlane::start(&config.net).await?;
                let admin = AdminServer::start(&config.admin).await?;
                NodeTransports {
                    control,
                    collect: Some(collect),
                    report_sender: None,
                    report_sink: Some(report_sink),
                    admin: Some(admin),
                }
            }
            NodeRole::Sensor => {
                let control = ControlPlane::start(&config.net).await?;
                let report_sender = match config.flush_path {
                    FlushPath::DirectedUnicast => Some(ReportSender::start(&config.net).await?),
                    FlushPath::CollectTree => None,
                };
                let collect = match (config.flush_path, config.collect_sink) {
                    (FlushPath::CollectTree, Some(sink)) => {
                        let mut collect =
                            CollectChannel::open(&config.net, config.node_id).await?;
                        collect.set_parent(Some(sink));
                        Some(collect)
                    }
                    _ => None,
                };
                NodeTransports {
                    control,
                    collect,
                    report_sender,
                    report_sink: None,
                    admin: None,
                }
            }
        };
        let control_addr = transports.control.local_addr;
        let admin_addr = transports.admin.as_ref().map(|admin| admin.local_addr);

        let engine = DisseminationEngine::new(config.node_id, config.role == NodeRole::Sensor);
        let timer = TrickleTimer::new(&config.dissemination, now);
        let collector = (config.role == NodeRole::Sensor)
            .then(|| SampleCollector::new(config.collector.clone(), engine.store(), now));

        let context = NodeContext {
            role: config.role,
            flush_path: config.flush_path,
            engine,
            timer,
            collector,
            source: Box::new(RandomSource::new()),
            neighbors: NeighborTable::new(),
            routes: RouteTable::new(),
            directory,
            control: transports.control,
            collect: transports.collect,
            report_sender: transports.report_sender,
            report_sink: transports.report_sink,
            admin: transports.admin,
            last_parent: None,
            pages_served: 0,
            table_max_silence: config.table_max_silence,
            report_service_id: config.net.report_service_id,
            collect_max_hops: config.net.collect_max_hops,
        };

        let exit = Arc::new(AtomicBool::new(false));
        let exit_flag = exit.clone();
        let poll_interval = config.poll_interval;
        let dispatcher = Builder::new()
            .name("canopyDispatch".to_string())
            .spawn(move || run_dispatcher(context, exit_flag, poll_interval))?;

        Ok(Self {
            dispatcher,
            exit,
            control_addr,
            admin_addr,
        })
    }

    /// Tells the dispatcher to stop after its current wait.
    pub fn exit(&self) {
        self.exit.store(true, Ordering::Relaxed);
    }

    /// Waits for the dispatcher to finish.
    pub fn join(self) -> std::thread::Result<()> {
        self.dispatcher.join()
    }
}

fn run_dispatcher(mut context: NodeContext, exit: Arc<AtomicBool>, poll_interval: Duration) {
    info!(
        "dispatcher running as {:?} node {}",
        context.role,
        context.engine.node_id()
    );
    let control_rx = context.control.inbound_rx.clone();
    let report_rx = context
        .report_sink
        .as_ref()
        .map(|sink| sink.inbound_rx.clone())
        .unwrap_or_else(never);
    let collect_rx = context
        .collect
        .as_ref()
        .map(|collect| collect.inbound_rx.clone())
        .unwrap_or_else(never);
    let admin_rx = context
        .admin
        .as_ref()
        .map(|admin| admin.requests_rx.clone())
        .unwrap_or_else(never);

    while !exit.load(Ordering::Relaxed) {
        context.run_timers(Instant::now());

        let wait = context
            .next_deadline()
            .saturating_duration_since(Instant::now())
            .min(poll_interval);
        select! {
            recv(control_rx) -> inbound => match inbound {
                Ok(inbound) => context.on_control(inbound, Instant::now()),
                Err(_) => break,
            },
            recv(report_rx) -> inbound => match inbound {
                Ok(inbound) => context.on_report(inbound, Instant::now()),
                Err(_) => break,
            },
            recv(collect_rx) -> delivery => match delivery {
                Ok(delivery) => context.on_collect(delivery, Instant::now()),
                Err(_) => break,
            },
            recv(admin_rx) -> request => match request {
                Ok(request) => context.on_admin(request, Instant::now()),
                Err(_) => break,
            },
            default(wait) => {}
        }
    }
    info!("dispatcher exiting");
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        tokio::{
            io::{AsyncReadExt, AsyncWriteExt},
            net::TcpStream,
        },
    };

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_sensor_service_starts_and_exits() {
        let service = NodeService::start(NodeConfig::dev_default()).await.unwrap();
        assert_ne!(service.control_addr.port(), 0);
        assert!(service.admin_addr.is_none());

        service.exit();
        service.join().unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_invalid_config_rejected() {
        let config = NodeConfig {
            flush_path: FlushPath::CollectTree,
            ..NodeConfig::dev_default()
        };
        assert!(NodeService::start(config).await.is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_border_router_serves_page_end_to_end() {
        let config = NodeConfig {
            node_id: 1,
            role: NodeRole::BorderRouter,
            ..NodeConfig::dev_default()
        };
        let service = NodeService::start(config).await.unwrap();
        let admin_addr = service.admin_addr.unwrap();

        let mut stream = TcpStream::connect(admin_addr).await.unwrap();
        stream.write_all(b"GET / HTTP/1.0\r\n\r\n").await.unwrap();
        let mut response = Vec::new();
        tokio::time::timeout(
            Duration::from_secs(5),
            stream.read_to_end(&mut response),
        )
        .await
        .unwrap()
        .unwrap();

        let response = String::from_utf8(response).unwrap();
        assert!(response.starts_with("HTTP/1.0 200 OK"));
        assert!(response.contains("This page sent 1 times"));

        service.exit();
        service.join().unwrap();
    }
}
