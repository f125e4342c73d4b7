// src/main.rs
use anyhow::Result;
use sensor_node::{
    commands, config,
    health::info::HostFacts,
    logging,
    node::{self, Node},
    sink::OutputSink,
};
use std::sync::Arc;
use tokio::io::BufReader;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // -------- config + logging ----------
    let cfg = config::Cli::parse_and_build_config()?;
    let _log_guard = logging::init_tracing(cfg.log_dir.as_deref())?;
    info!(?cfg, "sensor node starting");

    // -------- channels + sampling tasks ----------
    let adc = node::simulated_adc(&cfg)?;
    let node = Node::start(&cfg, Arc::new(adc), OutputSink::stdout(), Arc::new(HostFacts::new()))?;
    info!(channels = node.registry().len(), "ready; reading commands from stdin");

    // -------- command loop ----------
    let stdin = BufReader::new(tokio::io::stdin());
    tokio::select! {
        res = commands::run_console(stdin, node.dispatcher()) => {
            res?;
            // input closed; channels already running keep sampling
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(?e, "failed to install Ctrl+C handler");
            }
        }
        res = tokio::signal::ctrl_c() => {
            if let Err(e) = res {
                warn!(?e, "failed to install Ctrl+C handler");
            }
        }
    }

    info!("shutdown signal received; exiting.");
    node.shutdown().await;
    Ok(())
}
