mod compute;
mod config;
mod container;
mod device;
mod encoder;
mod error;
mod loader;
mod models;
mod pipeline;
mod planner;
mod reconcile;
mod utils;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use compute::{ComputeOutcome, FabricCompute};
use config::{Cli, Config};
use device::JsonRpcConnector;
use encoder::Encoders;
use models::Topology;
use pipeline::TemplateRegistry;
use reconcile::{ReconcileManager, SwitchReport};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing; stdout carries configs and diffs
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "evpn_forge=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let cfg = Config::load()?.with_cli(Cli::parse());
    tracing::info!("Starting EVPN Forge");
    tracing::info!("Topology: {}", cfg.topology_file.display());

    let topology = loader::load(&cfg.topology_file)
        .with_context(|| format!("failed to load {}", cfg.topology_file.display()))?;
    warn_unknown_switches(&topology, &cfg.switches);

    let registry = TemplateRegistry::standard();
    let encoders = Encoders::standard();
    let engine = FabricCompute::new(&topology, &registry, &encoders, cfg.interface_count);
    let outcome = engine.compute_all(&cfg.switches);

    if cfg.compute_only {
        print_documents(&outcome)?;
        if !outcome.is_complete() {
            anyhow::bail!("{} switch(es) failed to compute", outcome.failed.len());
        }
        return Ok(());
    }

    let connector = Arc::new(JsonRpcConnector::new(cfg.rpc_scheme.clone(), cfg.rpc_timeout));
    let manager = ReconcileManager::new(connector, cfg.reconcile_options());
    let targets = outcome
        .computed
        .iter()
        .map(|(switch, document)| (*switch, document.clone()))
        .collect();

    let mut summary = manager
        .run(targets, &mut std::io::stdout())
        .await
        .context("failed to write reconciliation output")?;
    summary.add_compute_failures(
        outcome
            .failed
            .iter()
            .map(|(switch, e)| SwitchReport::compute_failed(switch.name.clone(), e.to_string())),
    );
    print!("{}", summary);

    if !summary.is_success() {
        anyhow::bail!("run {} finished with failures", summary.run_id);
    }
    tracing::info!("EVPN Forge finished");
    Ok(())
}

fn warn_unknown_switches(topology: &Topology, names: &[String]) {
    for name in names {
        if topology.find_switch(name).is_none() {
            tracing::warn!("Switch {} is not part of the topology", name);
        }
    }
}

/// Computed documents as one JSON object keyed by switch name
fn print_documents(outcome: &ComputeOutcome<'_>) -> anyhow::Result<()> {
    let documents: serde_json::Map<String, serde_json::Value> = outcome
        .computed
        .iter()
        .map(|(switch, document)| (switch.name.clone(), serde_json::Value::Object(document.clone())))
        .collect();
    println!("{}", serde_json::to_string_pretty(&documents)?);

    for (switch, e) in &outcome.failed {
        tracing::error!(switch = %switch.name, "Failed to compute configuration: {}", e);
    }
    Ok(())
}
