//! ---
//! fcp_section: "01-core-functionality"
//! fcp_subsection: "binary"
//! fcp_type: "source"
//! fcp_scope: "code"
//! fcp_description: "Binary entrypoint for the reliability daemon."
//! fcp_version: "v0.1.0"
//! fcp_owner: "reliability"
//! ---
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fcp_api::{spawn_api_server, ApiServer, ApiState};
use fcp_common::{init_tracing, AppConfig};
use fcp_metrics::{new_registry, DaemonMetrics, SharedRegistry};
use fcp_resilience::{
    Capabilities, DrillDefinition, DrillHarness, DrillScenario, RecoveryVerifier,
};
use fcp_telemetry::{RequestSampler, TelemetryMetrics};
use tokio::signal;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Fleet control plane reliability daemon",
    long_about = None
)]
struct Cli {
    #[arg(long, value_name = "FILE", help = "Path to configuration file")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Serve the reliability API and metrics exporter (default)")]
    Serve,
    #[command(about = "Print the drill catalogue as JSON")]
    Drills,
    #[command(about = "Run one drill against the in-memory capabilities and print the result")]
    Drill {
        #[arg(value_name = "SCENARIO", help = "Drill identifier, e.g. probe-disconnect")]
        scenario: String,
    },
    #[command(about = "Run the recovery verifier once and print the state")]
    Verify {
        #[arg(long, value_name = "PROBE", help = "Probe to check; defaults to the drill probe")]
        probe: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let mut candidates = Vec::new();
    if let Some(path) = &cli.config {
        candidates.push(path.clone());
    }
    candidates.push(PathBuf::from("configs/fcpd.toml"));
    candidates.push(PathBuf::from("/etc/fcp/fcpd.toml"));

    let load_started = Instant::now();
    let loaded = AppConfig::load_with_source(&candidates)?;
    let load_duration = load_started.elapsed();
    let config = loaded.config;
    init_tracing("fcpd", &config.logging)?;
    match &loaded.source {
        Some(path) => info!(path = %path.display(), "configuration loaded"),
        None => info!("no configuration file found; using defaults"),
    }

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            let registry = new_registry();
            DaemonMetrics::new(&registry)?.record_start(
                env!("CARGO_PKG_VERSION"),
                build_profile(),
                load_duration,
            );
            serve(config, registry).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Drills => {
            print_json(&DrillDefinition::catalogue())?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Drill { scenario } => {
            if scenario.parse::<DrillScenario>().is_err() {
                warn!(scenario = %scenario, "unknown drill scenario");
            }
            let harness = DrillHarness::new(Capabilities::default(), None)
                .with_probe_id(config.drills.probe_id.clone());
            let result = harness.run(&scenario).await;
            print_json(&result)?;
            Ok(if result.is_pass() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Commands::Verify { probe } => {
            let probe = probe.unwrap_or_else(|| config.drills.probe_id.clone());
            let state = RecoveryVerifier::new(Capabilities::default(), None)
                .verify(&probe)
                .await;
            print_json(&state)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn serve(config: AppConfig, registry: SharedRegistry) -> Result<()> {
    if !config.api.enabled {
        info!("api server disabled by configuration; nothing to serve");
        return Ok(());
    }

    let mut sampler = RequestSampler::from_config(&config.telemetry);
    let metrics_enabled = config.metrics.enabled;
    if metrics_enabled {
        let telemetry_metrics = TelemetryMetrics::new(registry.clone())
            .context("failed to register telemetry metrics")?;
        sampler = sampler.with_metrics(telemetry_metrics);
    }
    let listen = config.api.listen;
    let mut state = ApiState::new(config, Arc::new(sampler), Capabilities::default());
    if metrics_enabled {
        state = state.with_metrics(registry)?;
        info!("metrics served at /metrics on the api listener");
    } else {
        info!("metrics disabled by configuration");
    }

    let server: ApiServer = spawn_api_server(Arc::new(state), listen)?;
    info!(address = %server.addr(), "daemon running; waiting for termination signal");
    signal::ctrl_c().await?;
    info!("ctrl-c received; shutting down");
    server.shutdown().await
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("failed to render JSON output")?;
    println!("{rendered}");
    Ok(())
}

fn build_profile() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "release"
    }
}
