//! Breaker simulator.
//!
//! Drives simulated RPC traffic with random failures through a breaker set
//! built from a TOML file, logging every transition.
//!
//! ```text
//!  workers ──call──▶ BreakerSet::resolve ──▶ Breaker ──▶ simulated RPC
//!                                              │
//!                                    outcomes  ▼
//!                                         control loop ──▶ events ──▶ log / metrics
//! ```

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use thiserror::Error;

use rpc_breaker::config::{self, validation, BreakerConfig, SimulationConfig};
use rpc_breaker::lifecycle::signals::wait_for_signal;
use rpc_breaker::observability::{logging, metrics};
use rpc_breaker::{BreakerError, BreakerSet, Shutdown};

#[derive(Parser)]
#[command(name = "breaker-sim")]
#[command(about = "Drive simulated RPC traffic through a breaker set", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Total number of calls
    #[arg(long)]
    calls: Option<u64>,

    /// Concurrent callers
    #[arg(long)]
    concurrency: Option<usize>,

    /// Probability that a call fails (0.0 - 1.0)
    #[arg(long)]
    failure_rate: Option<f64>,
}

#[derive(Debug, Error)]
#[error("simulated failure")]
struct SimulatedFailure;

#[derive(Debug, Default)]
struct Tally {
    ok: AtomicU64,
    failed: AtomicU64,
    shed: AtomicU64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => config::load_config(path)?,
        None => BreakerConfig::default(),
    };
    if let Some(calls) = cli.calls {
        config.simulation.calls = calls;
    }
    if let Some(concurrency) = cli.concurrency {
        config.simulation.concurrency = concurrency;
    }
    if let Some(rate) = cli.failure_rate {
        config.simulation.failure_rate = rate;
    }
    validation::validate_config(&config).map_err(config::ConfigError::Validation)?;

    logging::init(&config.observability.log_level);
    tracing::info!("breaker-sim v{} starting", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Shutdown::new();
    let set = Arc::new(BreakerSet::from_config(&config, shutdown.subscribe()));
    let logger = logging::spawn_event_logger(set.subscribe(), shutdown.subscribe());

    let tally = Arc::new(Tally::default());
    tokio::select! {
        _ = simulate(Arc::clone(&set), config.simulation.clone(), Arc::clone(&tally)) => {
            tracing::info!("Simulation finished");
        }
        _ = wait_for_signal() => {
            tracing::info!("Simulation interrupted");
        }
    }

    print_summary(&set, &tally);

    shutdown.trigger();
    let _ = logger.await;
    tracing::info!("Shutdown complete");
    Ok(())
}

async fn simulate(set: Arc<BreakerSet>, sim: SimulationConfig, tally: Arc<Tally>) {
    let next = Arc::new(AtomicU64::new(0));
    let sim = Arc::new(sim);
    let mut workers = Vec::with_capacity(sim.concurrency);

    for _ in 0..sim.concurrency {
        let (set, sim, tally, next) = (
            Arc::clone(&set),
            Arc::clone(&sim),
            Arc::clone(&tally),
            Arc::clone(&next),
        );
        workers.push(tokio::spawn(async move {
            loop {
                let n = next.fetch_add(1, Ordering::Relaxed);
                if n >= sim.calls {
                    break;
                }
                let method = &sim.methods[n as usize % sim.methods.len()];
                let result = set
                    .call(method, None, || simulated_call(sim.failure_rate, sim.latency_ms))
                    .await;
                match result {
                    Ok(()) => tally.ok.fetch_add(1, Ordering::Relaxed),
                    Err(e) if BreakerError::is_open(&e) => tally.shed.fetch_add(1, Ordering::Relaxed),
                    Err(_) => tally.failed.fetch_add(1, Ordering::Relaxed),
                };
            }
        }));
    }

    for worker in workers {
        if let Err(e) = worker.await {
            tracing::error!(error = %e, "Worker panicked");
        }
    }
}

async fn simulated_call(failure_rate: f64, latency_ms: u64) -> Result<(), SimulatedFailure> {
    tokio::time::sleep(Duration::from_millis(latency_ms)).await;
    if fastrand::f64() < failure_rate {
        Err(SimulatedFailure)
    } else {
        Ok(())
    }
}

fn print_summary(set: &BreakerSet, tally: &Tally) {
    println!(
        "calls: ok={} failed={} shed={}",
        tally.ok.load(Ordering::Relaxed),
        tally.failed.load(Ordering::Relaxed),
        tally.shed.load(Ordering::Relaxed),
    );
    println!("{:<40} {}", "KEY", "STATE");
    for (key, gen_state) in set.snapshot() {
        println!("{:<40} {}", key.to_string(), gen_state);
    }
}
