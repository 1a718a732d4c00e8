//! Interval poller.
//!
//! The poller fetches once immediately and then on every interval tick. Each
//! tick spawns its own fetch, so a slow fetch never delays the next tick and
//! fetches may overlap. Every outcome carries the tick's sequence number so
//! consumers can drop results that resolve out of order.
//!
//! Stopping cancels future ticks only. Fetches already in flight still run to
//! completion and deliver their outcome.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::error::{FetchError, PollerError};
use crate::reading::SensorReading;
use crate::source::SensorDataSource;

/// Default poll interval.
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(5000);

/// Result of one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct PollOutcome {
    /// Tick number, starting at 1 and increasing across restarts.
    pub sequence: u64,
    /// Fetched reading or the fetch failure.
    pub result: Result<SensorReading, FetchError>,
}

/// Drives a data source on a fixed interval.
pub struct Poller<S> {
    source: Arc<S>,
    sequence: Arc<AtomicU64>,
    handle: Option<JoinHandle<()>>,
}

impl<S: SensorDataSource + 'static> Poller<S> {
    /// Creates an idle poller for `source`.
    pub fn new(source: Arc<S>) -> Self {
        Self {
            source,
            sequence: Arc::new(AtomicU64::new(0)),
            handle: None,
        }
    }

    /// Returns the polled source.
    pub fn source(&self) -> &Arc<S> {
        &self.source
    }

    /// Returns true while ticks are being scheduled.
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Starts polling. Must be called from within a tokio runtime.
    ///
    /// `on_result` is invoked once per tick, from the task that ran the fetch.
    pub fn start<F>(&mut self, interval: Duration, on_result: F) -> Result<(), PollerError>
    where
        F: Fn(PollOutcome) + Send + Sync + 'static,
    {
        if interval.is_zero() {
            return Err(PollerError::InvalidInterval(interval));
        }
        if self.is_running() {
            return Err(PollerError::AlreadyRunning);
        }

        let source = self.source.clone();
        let sequence = self.sequence.clone();
        let on_result = Arc::new(on_result);

        info!(
            "Polling '{}' every {}ms",
            source.name(),
            interval.as_millis()
        );

        self.handle = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                // First tick completes immediately.
                ticker.tick().await;
                let seq = sequence.fetch_add(1, Ordering::Relaxed) + 1;
                debug!("Tick #{}", seq);

                let source = source.clone();
                let on_result = on_result.clone();
                tokio::spawn(async move {
                    let result = source.fetch().await;
                    on_result(PollOutcome {
                        sequence: seq,
                        result,
                    });
                });
            }
        }));

        Ok(())
    }

    /// Stops scheduling ticks. Calling this on an idle poller is a no-op.
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            info!("Polling stopped");
        }
    }
}

impl<S> Drop for Poller<S> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{FlakySource, SimulatedSource};
    use crate::view::ViewState;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tokio::sync::mpsc;
    use tokio::time::Instant;

    fn instant_source() -> Arc<SimulatedSource> {
        Arc::new(SimulatedSource::with_seed(1).with_latency(Duration::ZERO, Duration::ZERO))
    }

    fn channel_sink() -> (
        impl Fn(PollOutcome) + Send + Sync + 'static,
        mpsc::UnboundedReceiver<(Instant, PollOutcome)>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel::<(Instant, PollOutcome)>();
        let sink = move |outcome: PollOutcome| {
            let _ = tx.send((Instant::now(), outcome));
        };
        (sink, rx)
    }

    /// Source whose n-th fetch takes the n-th scripted latency.
    struct ScriptedSource {
        latencies: Mutex<VecDeque<Duration>>,
    }

    impl SensorDataSource for ScriptedSource {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn fetch(&self) -> Result<SensorReading, FetchError> {
            let latency = self
                .latencies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_default();
            tokio::time::sleep(latency).await;
            Ok(SensorReading::new(
                18.0 + latency.as_millis() as f64 / 1000.0,
                50.0,
                500.0,
            ))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetches_immediately_then_on_interval() {
        let mut poller = Poller::new(instant_source());
        let (sink, mut rx) = channel_sink();
        let started = Instant::now();
        poller.start(DEFAULT_INTERVAL, sink).unwrap();

        for expected in 1..=3u64 {
            let (at, outcome) = rx.recv().await.unwrap();
            assert_eq!(outcome.sequence, expected);
            assert!(outcome.result.is_ok());
            let offset = DEFAULT_INTERVAL * (expected as u32 - 1);
            assert!(at.duration_since(started) >= offset);
            assert!(at.duration_since(started) < offset + Duration::from_millis(1));
        }
        poller.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_simulated_latency_delays_outcome() {
        let source = Arc::new(SimulatedSource::with_seed(2));
        let mut poller = Poller::new(source);
        let (sink, mut rx) = channel_sink();
        let started = Instant::now();
        poller.start(DEFAULT_INTERVAL, sink).unwrap();

        let (at, outcome) = rx.recv().await.unwrap();
        let elapsed = at.duration_since(started);
        assert_eq!(outcome.sequence, 1);
        assert!(elapsed >= Duration::from_millis(300));
        assert!(elapsed <= Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_do_not_suppress_ticks() {
        let inner = SimulatedSource::with_seed(1).with_latency(Duration::ZERO, Duration::ZERO);
        let source = Arc::new(FlakySource::with_seed(inner, 1.0, 1).unwrap());
        let mut poller = Poller::new(source);
        let (sink, mut rx) = channel_sink();
        poller.start(Duration::from_millis(1000), sink).unwrap();

        for expected in 1..=3u64 {
            let (_, outcome) = rx.recv().await.unwrap();
            assert_eq!(outcome.sequence, expected);
            assert_eq!(outcome.result, Err(FetchError::Injected));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_results_after_stop() {
        let mut poller = Poller::new(Arc::new(SimulatedSource::with_seed(3)));
        let (sink, mut rx) = channel_sink();
        poller.start(DEFAULT_INTERVAL, sink).unwrap();

        let (_, first) = rx.recv().await.unwrap();
        assert_eq!(first.sequence, 1);
        poller.stop();
        assert!(!poller.is_running());

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_in_flight_fetch_completes_after_stop() {
        let mut poller = Poller::new(Arc::new(SimulatedSource::with_seed(4)));
        let (sink, mut rx) = channel_sink();
        poller.start(DEFAULT_INTERVAL, sink).unwrap();

        // The first fetch is still sleeping on its 300-500ms latency.
        tokio::time::sleep(Duration::from_millis(100)).await;
        poller.stop();

        let (_, outcome) = rx.recv().await.unwrap();
        assert_eq!(outcome.sequence, 1);
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let mut poller = Poller::new(instant_source());
        poller.stop();
        poller.start(DEFAULT_INTERVAL, |_| {}).unwrap();
        poller.stop();
        poller.stop();
        assert!(!poller.is_running());
    }

    #[tokio::test]
    async fn test_start_twice_rejected() {
        let mut poller = Poller::new(instant_source());
        poller.start(DEFAULT_INTERVAL, |_| {}).unwrap();
        assert_eq!(
            poller.start(DEFAULT_INTERVAL, |_| {}),
            Err(PollerError::AlreadyRunning)
        );
        poller.stop();
        assert!(poller.start(DEFAULT_INTERVAL, |_| {}).is_ok());
    }

    #[tokio::test]
    async fn test_zero_interval_rejected() {
        let mut poller = Poller::new(instant_source());
        assert_eq!(
            poller.start(Duration::ZERO, |_| {}),
            Err(PollerError::InvalidInterval(Duration::ZERO))
        );
        assert!(!poller.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sequence_continues_across_restart() {
        let mut poller = Poller::new(instant_source());
        let (sink, mut rx) = channel_sink();
        poller.start(DEFAULT_INTERVAL, sink).unwrap();
        assert_eq!(rx.recv().await.unwrap().1.sequence, 1);
        poller.stop();

        let (sink, mut rx) = channel_sink();
        poller.start(DEFAULT_INTERVAL, sink).unwrap();
        assert_eq!(rx.recv().await.unwrap().1.sequence, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlapping_fetches_keep_newest() {
        // Tick #1 takes 1s, tick #2 (at 100ms) takes 10ms and lands first.
        let source = Arc::new(ScriptedSource {
            latencies: Mutex::new(VecDeque::from([
                Duration::from_millis(1000),
                Duration::from_millis(10),
            ])),
        });
        let mut poller = Poller::new(source);
        let (sink, mut rx) = channel_sink();
        poller.start(Duration::from_millis(100), sink).unwrap();

        let mut state = ViewState::new();
        let (_, second) = rx.recv().await.unwrap();
        assert_eq!(second.sequence, 2);
        assert!(state.apply(&second));

        // Stop scheduling so only the slow first fetch is left.
        poller.stop();
        let mut late = None;
        while let Some((_, outcome)) = rx.recv().await {
            if outcome.sequence == 1 {
                late = Some(outcome);
                break;
            }
        }
        let late = late.unwrap();
        assert!(!state.apply(&late));
        assert_eq!(state.reading, second.result.ok());
    }
}
