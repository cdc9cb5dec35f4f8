//! dataref-poller: poll X-Plane datarefs over the UDP bridge.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use dataref_client::{connect_with_store, DataRefStore, ReceiveMode};
use dataref_poller::{snapshot_json, Poller, PollerConfig};

/// Poll X-Plane datarefs over the UDP bridge
#[derive(Parser, Debug)]
#[command(name = "dataref-poller")]
#[command(about = "Read X-Plane datarefs on an interval and log each value")]
struct Args {
    /// TOML config file with [client], [poll] and [[datarefs]] tables
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Responder host (overrides the config file)
    #[arg(long)]
    host: Option<String>,

    /// Responder UDP port (overrides the config file)
    #[arg(short, long)]
    port: Option<u16>,

    /// Read timeout, e.g. "3s" or "500ms"
    #[arg(short, long, value_parser = parse_duration)]
    timeout: Option<Duration>,

    /// Use the per-call reader instead of the background receive loop
    #[arg(long)]
    per_call: bool,

    /// Run one round and exit, non-zero if any read failed
    #[arg(long)]
    once: bool,

    /// Print the latest values as JSON on exit
    #[arg(long)]
    json: bool,

    /// Log filter, e.g. "debug" or "dataref_client=trace" (default: RUST_LOG, then info)
    #[arg(long)]
    log_level: Option<String>,
}

impl Args {
    fn apply(&self, config: &mut PollerConfig) {
        if let Some(host) = &self.host {
            config.client.host = host.clone();
        }
        if let Some(port) = self.port {
            config.client.port = port;
        }
        if let Some(timeout) = self.timeout {
            config.client.read_timeout = timeout;
        }
        if self.per_call {
            config.client.mode = ReceiveMode::PerCall;
        }
    }
}

fn parse_duration(text: &str) -> Result<Duration, String> {
    humantime_serde::re::humantime::parse_duration(text).map_err(|e| e.to_string())
}

fn init_tracing(log_level: Option<&str>) -> Result<()> {
    let filter = match log_level {
        Some(level) => EnvFilter::try_new(level).context("invalid --log-level")?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.log_level.as_deref())?;

    // Load configuration
    let mut config = match &args.config {
        Some(path) => PollerConfig::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => PollerConfig::default(),
    };
    args.apply(&mut config);
    config.validate().context("invalid configuration")?;

    let store = Arc::new(DataRefStore::new());
    let reader = connect_with_store(&config.client, Some(Arc::clone(&store)))
        .await
        .with_context(|| format!("failed to open client for {}", config.client.remote()))?;

    info!(
        remote = %config.client.remote(),
        mode = ?config.client.mode,
        datarefs = config.datarefs.len(),
        "Polling datarefs"
    );

    let poller = Poller::new(reader, config.datarefs.clone(), config.poll.concurrent);

    if args.once {
        let report = poller.poll_once().await;
        if args.json {
            println!("{}", snapshot_json(&store)?);
        }
        if !report.is_clean() {
            bail!(
                "{} of {} dataref reads failed",
                report.failures(),
                report.outcomes.len()
            );
        }
        return Ok(());
    }

    tokio::select! {
        _ = poller.run(config.poll.interval) => {}
        signal = tokio::signal::ctrl_c() => {
            signal.context("failed to listen for Ctrl+C")?;
            info!("Stopping poller");
        }
    }

    if args.json {
        println!("{}", snapshot_json(&store)?);
    }

    Ok(())
}
