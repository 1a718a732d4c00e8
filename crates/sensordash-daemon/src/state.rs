//! Application state management.

use sensordash_core::{
    DashboardView, FlakySource, PollOutcome, SimulatedSource, Snapshot, ViewState,
};
use std::sync::{Mutex, RwLock};
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::{Config, SourceConfig};

/// Data source used by the daemon.
pub type DaemonSource = FlakySource<SimulatedSource>;

/// Builds the configured data source.
pub fn build_source(config: &SourceConfig) -> sensordash_core::Result<DaemonSource> {
    let simulated = match config.seed {
        Some(seed) => SimulatedSource::with_seed(seed),
        None => SimulatedSource::new(),
    };
    FlakySource::new(simulated, config.failure_rate)
}

/// Rate limiter for repeated fetch failure logs.
///
/// Logs the first failure of a streak, then at most once per minute with the
/// number of failures seen since the last log.
struct FailureLog {
    /// Failures since the last success
    streak: u32,
    /// Failures since the last log line
    unlogged: u32,
    last_log: Option<Instant>,
}

impl FailureLog {
    const QUIET_PERIOD: Duration = Duration::from_secs(60);

    fn new() -> Self {
        Self {
            streak: 0,
            unlogged: 0,
            last_log: None,
        }
    }

    /// Records a failure at `now`. Returns the repeat count when a line was logged.
    fn failure(&mut self, error: &sensordash_core::FetchError, now: Instant) -> Option<u32> {
        self.streak += 1;
        self.unlogged += 1;
        let since_log = self.last_log.map(|last| now.saturating_duration_since(last));
        let due = match since_log {
            Some(elapsed) => self.streak == 1 || elapsed >= Self::QUIET_PERIOD,
            None => true,
        };
        if !due {
            return None;
        }

        let count = self.unlogged;
        match since_log {
            Some(elapsed) if count > 1 => warn!(
                "Fetch error (repeated {} times in {:?}): {}",
                count, elapsed, error
            ),
            _ => warn!("Fetch error: {}", error),
        }
        self.unlogged = 0;
        self.last_log = Some(now);
        Some(count)
    }

    fn success(&mut self) {
        if self.streak > 0 {
            info!("Sensor data recovered after {} failures", self.streak);
        }
        self.streak = 0;
        self.unlogged = 0;
    }
}

/// Shared application state.
pub struct AppState {
    /// Configuration
    config: Config,

    /// Latest view state
    view: RwLock<ViewState>,

    /// Publishes a snapshot after every applied outcome
    updates: watch::Sender<Snapshot>,

    /// Fetch failure logging
    failures: Mutex<FailureLog>,
}

impl AppState {
    /// Creates a new application state in the loading state.
    pub fn new(config: Config) -> Self {
        let view = ViewState::new();
        let (updates, _) = watch::channel(view.snapshot());
        Self {
            config,
            view: RwLock::new(view),
            updates,
            failures: Mutex::new(FailureLog::new()),
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Applies a poll outcome. Stale outcomes are dropped.
    pub fn apply(&self, outcome: PollOutcome) {
        let snapshot = {
            let mut view = self.view.write().unwrap();
            if !view.apply(&outcome) {
                return;
            }
            view.snapshot()
        };

        match &outcome.result {
            Ok(reading) => {
                self.failures.lock().unwrap().success();
                debug!(
                    "Reading #{}: {:.2}°C {:.2}% {:.0}lx",
                    outcome.sequence, reading.temperature, reading.humidity, reading.luminosity
                );
            }
            Err(e) => {
                self.failures.lock().unwrap().failure(e, Instant::now());
            }
        }

        self.updates.send_replace(snapshot);
    }

    /// Returns a copy of the current view state.
    pub fn view(&self) -> ViewState {
        self.view.read().unwrap().clone()
    }

    /// Returns the current snapshot (state plus derived status).
    pub fn snapshot(&self) -> Snapshot {
        self.view.read().unwrap().snapshot()
    }

    /// Returns the presentation model for the current state.
    pub fn dashboard(&self) -> DashboardView {
        DashboardView::from_state(&self.view.read().unwrap())
    }

    /// Subscribes to snapshot updates.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.updates.subscribe()
    }
}
