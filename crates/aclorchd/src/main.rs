//! ACL orchestration daemon entry point.
//!
//! Without a production transport attached, the daemon runs in simulation
//! mode: it seeds a port inventory, programs an in-memory forwarding plane,
//! and optionally replays a JSON configuration snapshot through the same
//! event handlers the consumers use.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use log::{error, info};

use aclorch_common::Orch;
use aclorch_sai::api::acl::{AclAsicApi, InMemoryAclApi, SaiObjectType};
use aclorch_sai::{LagOid, PortOid};
use aclorchd::acl::{AclOrch, AclOrchConfig, AclStage};
use aclorchd::config::Snapshot;
use aclorchd::crm::AclResourceCounters;
use aclorchd::neigh::NextHopRegistry;
use aclorchd::ports::PortRegistry;

/// ACL orchestration daemon
#[derive(Parser, Debug)]
#[command(name = "aclorchd")]
#[command(version, about, long_about = None)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, default_value = "info")]
    log_level: String,

    /// JSON configuration snapshot to replay at startup
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Number of simulated front-panel ports
    #[arg(long, default_value = "32")]
    port_count: u32,

    /// Number of simulated LAGs
    #[arg(long, default_value = "2")]
    lag_count: u32,
}

fn seed_ports(registry: &PortRegistry, port_count: u32, lag_count: u32) {
    // Front-panel naming uses 4-lane strides, matching common inventories.
    for i in 0..port_count {
        registry.add_port(
            format!("Ethernet{}", i * 4),
            PortOid::from_raw_unchecked(0x1000 + u64::from(i)),
        );
    }
    for i in 0..lag_count {
        registry.add_lag(
            format!("PortChannel{:04}", i + 1),
            LagOid::from_raw_unchecked(0x2000 + u64::from(i)),
        );
    }
}

fn log_summary(orch: &AclOrch, asic: &InMemoryAclApi, counters: &AclResourceCounters) {
    info!(
        "programmed: {} tables, {} groups, {} members, {} entries, {} ranges",
        asic.count(SaiObjectType::AclTable),
        asic.count(SaiObjectType::AclTableGroup),
        asic.count(SaiObjectType::AclTableGroupMember),
        asic.count(SaiObjectType::AclEntry),
        asic.count(SaiObjectType::AclRange),
    );
    let stats = orch.stats();
    info!(
        "rules: {} applied, {} rejected, {} withdrawn",
        stats.rules_applied, stats.rules_rejected, stats.rules_withdrawn
    );
    for ((stage, bind_point), counter) in counters.snapshot() {
        info!(
            "binding usage {}:{} used={} available={}",
            stage, bind_point, counter.used, counter.available
        );
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&args.log_level))
        .init();

    info!("starting aclorchd (simulation mode)");
    info!(
        "simulated inventory: {} ports, {} LAGs",
        args.port_count, args.lag_count
    );

    let asic = Arc::new(InMemoryAclApi::new());
    let ports = Arc::new(PortRegistry::new());
    let next_hops = Arc::new(NextHopRegistry::new());
    seed_ports(&ports, args.port_count, args.lag_count);

    let mut orch = AclOrch::new(
        Arc::clone(&asic) as Arc<dyn AclAsicApi>,
        Arc::clone(&ports),
        Arc::clone(&next_hops),
        AclOrchConfig::default(),
    );

    info!(
        "device capabilities: ingress={:?}",
        orch.capabilities().supported_actions(AclStage::Ingress)
    );

    if let Some(path) = &args.config {
        let snapshot = match Snapshot::load(path) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                error!("{}", err);
                return ExitCode::FAILURE;
            }
        };
        info!(
            "replaying snapshot: {} tables, {} rules",
            snapshot.tables.len(),
            snapshot.rules.len()
        );
        orch.enqueue_table_events(snapshot.table_events());
        orch.enqueue_rule_events(snapshot.rule_events());
        orch.do_task().await;
    }

    let counters = orch.counters();
    log_summary(&orch, &asic, counters);

    info!("aclorchd done");
    ExitCode::SUCCESS
}
