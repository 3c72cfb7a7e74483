//! Demo harness: loads a router config, wires a pcap-backed transport, and
//! replays captured traffic through `router-core`.

mod config;
mod pcap_sink;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use router_core::{Router, RouterConfig as CoreConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::RouterConfig;
use crate::pcap_sink::{spawn_replay_threads, PcapSink};

#[derive(Debug, Parser)]
#[command(name = "router", about = "Software IPv4 router demo harness")]
struct Args {
    /// Path to a TOML file describing interfaces and static routes.
    #[arg(long, default_value = "router.toml")]
    config: PathBuf,

    /// Directory pcap captures of outgoing frames are written to.
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    /// Seconds to run before exiting (0 = run until replay threads finish).
    #[arg(long, default_value_t = 0)]
    run_secs: u64,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let args = Args::parse();
    let config = RouterConfig::load(&args.config)?;
    let network = config.network().context("building interface/routing table from config")?;

    let replays: Vec<(String, String)> =
        config.interfaces.iter().filter_map(|i| i.replay.clone().map(|path| (i.name.clone(), path))).collect();

    let sink = Arc::new(PcapSink::new(&args.out_dir));
    let mut router = Router::new(network, sink, CoreConfig::default());
    router.init();
    info!(config = %args.config.display(), "router initialized");

    let router = Arc::new(router);
    let handles = spawn_replay_threads(Arc::clone(&router), replays);

    if args.run_secs > 0 {
        std::thread::sleep(std::time::Duration::from_secs(args.run_secs));
    } else {
        for handle in handles {
            let _ = handle.join();
        }
    }

    Ok(())
}
