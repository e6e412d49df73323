//! The canopy-node daemon.

use {
    canopy_node::{FlushPath, NodeConfig, NodeRole, NodeService},
    clap::{value_t_or_exit, App, Arg},
    log::*,
    std::{net::SocketAddr, process::exit},
};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let matches = App::new("canopy-node")
        .about("Canopy mesh node: config dissemination, sampling, reporting")
        .version(env!("CARGO_PKG_VERSION"))
        .arg(
            Arg::with_name("node_id")
                .long("node-id")
                .value_name("ID")
                .takes_value(true)
                .required(true)
                .help("Identity carried in disseminated records and collect frames"),
        )
        .arg(
            Arg::with_name("role")
                .long("role")
                .value_name("ROLE")
                .takes_value(true)
                .possible_values(&["sensor", "border-router"])
                .default_value("sensor")
                .help("Role this node plays"),
        )
        .arg(
            Arg::with_name("flush_path")
                .long("flush-path")
                .value_name("PATH")
                .takes_value(true)
                .possible_values(&["unicast", "collect"])
                .default_value("unicast")
                .help("How a sensor delivers full batches"),
        )
        .arg(
            Arg::with_name("report_sink")
                .long("report-sink")
                .value_name("ADDR")
                .takes_value(true)
                .help("Seeds the report service address (unicast sensors)"),
        )
        .arg(
            Arg::with_name("collect_sink")
                .long("collect-sink")
                .value_name("ADDR")
                .takes_value(true)
                .help("Sink address for the collect tree (collect sensors)"),
        )
        .arg(
            Arg::with_name("control_port")
                .long("control-port")
                .value_name("PORT")
                .takes_value(true)
                .help("Port of the control-plane socket"),
        )
        .arg(
            Arg::with_name("admin_port")
                .long("admin-port")
                .value_name("PORT")
                .takes_value(true)
                .help("Status page port on the border router"),
        )
        .get_matches();

    let mut config = NodeConfig::default();
    config.node_id = value_t_or_exit!(matches, "node_id", i32);
    config.role = match matches.value_of("role") {
        Some("border-router") => NodeRole::BorderRouter,
        _ => NodeRole::Sensor,
    };
    config.flush_path = match matches.value_of("flush_path") {
        Some("collect") => FlushPath::CollectTree,
        _ => FlushPath::DirectedUnicast,
    };
    if matches.is_present("report_sink") {
        let addr = value_t_or_exit!(matches, "report_sink", SocketAddr);
        config
            .directory_seed
            .push((config.net.report_service_id, addr));
    }
    if matches.is_present("collect_sink") {
        config.collect_sink = Some(value_t_or_exit!(matches, "collect_sink", SocketAddr));
    }
    if matches.is_present("control_port") {
        config.net.control_port = value_t_or_exit!(matches, "control_port", u16);
    }
    if matches.is_present("admin_port") {
        config.admin.port = value_t_or_exit!(matches, "admin_port", u16);
    }

    let runtime = tokio::runtime::Runtime::new().unwrap_or_else(|err| {
        eprintln!("failed to start runtime: {err}");
        exit(1);
    });
    let service = runtime
        .block_on(NodeService::start(config))
        .unwrap_or_else(|err| {
            eprintln!("failed to start node: {err}");
            exit(1);
        });

    info!("node up; control plane on {}", service.control_addr);
    if let Some(admin) = service.admin_addr {
        info!("status page on http://{admin}/");
    }

    if service.join().is_err() {
        eprintln!("dispatcher thread panicked");
        exit(1);
    }
}
