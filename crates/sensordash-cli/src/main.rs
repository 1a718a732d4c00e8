//! Sensor Dashboard Terminal Tool
//!
//! Runs the sensor poller in-process and prints the dashboard to the terminal.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sensordash_core::{
    Channel, DashboardView, FlakySource, Poller, SensorDataSource, SimulatedSource, ViewState,
};
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sensordashctl")]
#[command(about = "Terminal dashboard for simulated environment sensors")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// RNG seed for a reproducible walk
    #[arg(long, global = true)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll continuously and print the dashboard on every update
    Watch {
        /// Poll interval in milliseconds
        #[arg(short, long, default_value = "5000")]
        interval: u64,

        /// Probability (0.0-1.0) that a fetch fails
        #[arg(long, default_value = "0.0")]
        failure_rate: f64,

        /// Stop after this many updates (omit to run until Ctrl-C)
        #[arg(short, long)]
        count: Option<NonZeroUsize>,
    },
    /// Fetch a single reading
    Sample {
        /// Print the reading as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print consecutive random walk steps without simulated latency
    Walk {
        /// Number of steps
        #[arg(short = 'n', long, default_value = "10")]
        steps: usize,
    },
}

fn simulated(seed: Option<u64>) -> SimulatedSource {
    match seed {
        Some(seed) => SimulatedSource::with_seed(seed),
        None => SimulatedSource::new(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Watch {
            interval,
            failure_rate,
            count,
        } => handle_watch(cli.seed, interval, failure_rate, count).await,
        Commands::Sample { json } => handle_sample(cli.seed, json).await,
        Commands::Walk { steps } => handle_walk(cli.seed, steps),
    }
}

async fn handle_watch(
    seed: Option<u64>,
    interval_ms: u64,
    failure_rate: f64,
    count: Option<NonZeroUsize>,
) -> Result<()> {
    let source = FlakySource::new(simulated(seed), failure_rate)
        .context("Invalid failure rate")?;
    let mut poller = Poller::new(Arc::new(source));

    let (tx, mut rx) = mpsc::unbounded_channel();
    poller
        .start(Duration::from_millis(interval_ms), move |outcome| {
            let _ = tx.send(outcome);
        })
        .context("Failed to start poller")?;

    let mut state = ViewState::new();
    print_view(&state);

    let mut updates = 0usize;
    loop {
        tokio::select! {
            outcome = rx.recv() => {
                let Some(outcome) = outcome else { break };
                if !state.apply(&outcome) {
                    debug!("Dropped stale outcome #{}", outcome.sequence);
                    continue;
                }
                print_view(&state);
                updates += 1;
                if count.is_some_and(|limit| updates >= limit.get()) {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                break;
            }
        }
    }

    poller.stop();
    Ok(())
}

fn print_view(state: &ViewState) {
    for line in DashboardView::from_state(state).render_text() {
        println!("{}", line);
    }
    println!();
}

async fn handle_sample(seed: Option<u64>, json: bool) -> Result<()> {
    let source = simulated(seed);
    let reading = source
        .fetch()
        .await
        .context("Failed to fetch sensor data")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&reading)?);
    } else {
        for channel in Channel::ALL {
            println!(
                "{:<12} {:>7.*} {}",
                channel.label(),
                channel.decimals(),
                reading.get(channel),
                channel.unit()
            );
        }
    }
    Ok(())
}

fn handle_walk(seed: Option<u64>, steps: usize) -> Result<()> {
    let source = simulated(seed);
    println!("step,temperature,humidity,luminosity");
    for step in 1..=steps {
        let r = source.step();
        println!(
            "{},{:.3},{:.3},{:.1}",
            step, r.temperature, r.humidity, r.luminosity
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watch_count_must_be_positive() {
        assert!(Cli::try_parse_from(["sensordashctl", "watch", "--count", "0"]).is_err());

        let cli = Cli::try_parse_from(["sensordashctl", "watch", "--count", "3"]).unwrap();
        match cli.command {
            Commands::Watch { count, .. } => assert_eq!(count.map(NonZeroUsize::get), Some(3)),
            _ => panic!("expected watch"),
        }
    }

    #[test]
    fn test_watch_defaults() {
        let cli = Cli::try_parse_from(["sensordashctl", "--seed", "7", "watch"]).unwrap();
        assert_eq!(cli.seed, Some(7));
        match cli.command {
            Commands::Watch {
                interval,
                failure_rate,
                count,
            } => {
                assert_eq!(interval, 5000);
                assert_eq!(failure_rate, 0.0);
                assert!(count.is_none());
            }
            _ => panic!("expected watch"),
        }
    }
}
