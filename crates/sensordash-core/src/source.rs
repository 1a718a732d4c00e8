//! Sensor data sources.
//!
//! A data source produces one [`SensorReading`] per fetch. The simulated source
//! performs a bounded random walk from fixed seed values; [`FlakySource`] wraps
//! any source and fails a fraction of fetches.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;
use tracing::trace;

use crate::error::{Error, FetchError, Result};
use crate::reading::{Channel, SensorReading};

/// Trait for anything that can produce sensor readings.
///
/// Fetches take `&self` so that overlapping ticks can share one source; any
/// mutable state must live behind interior mutability and must not be locked
/// across an await point.
pub trait SensorDataSource: Send + Sync {
    /// Returns the source name.
    fn name(&self) -> &str;

    /// Fetches the next reading.
    fn fetch(&self) -> impl Future<Output = std::result::Result<SensorReading, FetchError>> + Send;
}

/// Simulated latency band of the mock backend.
pub const DEFAULT_LATENCY: (Duration, Duration) =
    (Duration::from_millis(300), Duration::from_millis(500));

struct WalkState {
    last: SensorReading,
    rng: StdRng,
}

/// Bounded random walk over the three environment channels.
pub struct SimulatedSource {
    state: Mutex<WalkState>,
    min_latency: Duration,
    max_latency: Duration,
}

impl SimulatedSource {
    /// Creates a source seeded from system entropy.
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_entropy())
    }

    /// Creates a source with a fixed seed, producing a reproducible walk.
    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    fn from_rng(rng: StdRng) -> Self {
        let (min, max) = DEFAULT_LATENCY;
        Self {
            state: Mutex::new(WalkState {
                last: SensorReading::default(),
                rng,
            }),
            min_latency: min,
            max_latency: max,
        }
    }

    /// Overrides the simulated latency band. `max` below `min` is raised to `min`.
    pub fn with_latency(mut self, min: Duration, max: Duration) -> Self {
        self.min_latency = min;
        self.max_latency = max.max(min);
        self
    }

    /// Returns the last produced reading (the seed values before the first fetch).
    pub fn last(&self) -> SensorReading {
        self.state.lock().unwrap().last
    }

    /// Advances the walk by one step and returns the new reading.
    ///
    /// Each channel moves by a uniform perturbation within its `max_step` and
    /// is then clamped to its valid range.
    pub fn step(&self) -> SensorReading {
        let mut state = self.state.lock().unwrap();
        let mut next = state.last;
        for channel in Channel::ALL {
            let bound = channel.max_step();
            let delta = state.rng.gen_range(-bound..=bound);
            next.set(channel, channel.clamp(next.get(channel) + delta));
        }
        state.last = next;
        next
    }

    fn next_latency(&self) -> Duration {
        let mut state = self.state.lock().unwrap();
        state.rng.gen_range(self.min_latency..=self.max_latency)
    }
}

impl Default for SimulatedSource {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorDataSource for SimulatedSource {
    fn name(&self) -> &str {
        "simulated"
    }

    async fn fetch(&self) -> std::result::Result<SensorReading, FetchError> {
        let latency = self.next_latency();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        let reading = self.step();
        trace!(?latency, ?reading, "Simulated reading");
        Ok(reading)
    }
}

/// Wraps a source and fails a configurable fraction of fetches.
///
/// The wrapped source is not consulted on an injected failure, so its state
/// does not advance.
pub struct FlakySource<S> {
    inner: S,
    failure_rate: f64,
    rng: Mutex<StdRng>,
}

impl<S: SensorDataSource> FlakySource<S> {
    /// Wraps `inner`, failing with probability `failure_rate` (0.0-1.0).
    pub fn new(inner: S, failure_rate: f64) -> Result<Self> {
        Self::from_rng(inner, failure_rate, StdRng::from_entropy())
    }

    /// Like [`FlakySource::new`] with a fixed seed for the failure decisions.
    pub fn with_seed(inner: S, failure_rate: f64, seed: u64) -> Result<Self> {
        Self::from_rng(inner, failure_rate, StdRng::seed_from_u64(seed))
    }

    fn from_rng(inner: S, failure_rate: f64, rng: StdRng) -> Result<Self> {
        if !(0.0..=1.0).contains(&failure_rate) {
            return Err(Error::InvalidFailureRate(failure_rate));
        }
        Ok(Self {
            inner,
            failure_rate,
            rng: Mutex::new(rng),
        })
    }

    /// Returns the wrapped source.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Returns the configured failure rate.
    pub fn failure_rate(&self) -> f64 {
        self.failure_rate
    }

    fn should_fail(&self) -> bool {
        self.failure_rate > 0.0 && self.rng.lock().unwrap().gen_bool(self.failure_rate)
    }
}

impl<S: SensorDataSource> SensorDataSource for FlakySource<S> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn fetch(&self) -> std::result::Result<SensorReading, FetchError> {
        if self.should_fail() {
            return Err(FetchError::Injected);
        }
        self.inner.fetch().await
    }
}
