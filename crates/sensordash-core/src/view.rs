//! Display-facing view state.
//!
//! The view state is created in the loading state and only ever changed by
//! applying poll outcomes. Once the first outcome lands, `loading` stays false
//! for the rest of the process so later polls do not flicker.

use chrono::{DateTime, Local};
use serde::Serialize;
use tracing::debug;

use crate::poller::PollOutcome;
use crate::reading::SensorReading;

/// User-facing message shown whenever a fetch fails.
pub const FETCH_FAILED_MESSAGE: &str = "Failed to fetch sensor data. Please try again later.";

/// The three mutually exclusive dashboard states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// No poll has resolved yet.
    Connecting,
    /// The last poll succeeded.
    Live,
    /// The last poll failed.
    Error,
}

impl Status {
    /// Returns the status label shown next to the indicator.
    pub fn label(&self) -> &'static str {
        match self {
            Status::Connecting => "Connecting...",
            Status::Live => "Live",
            Status::Error => "Error",
        }
    }

    /// Returns the indicator colour name.
    pub fn color(&self) -> &'static str {
        match self {
            Status::Connecting => "yellow",
            Status::Live => "green",
            Status::Error => "red",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Latest poll outcome as seen by a dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewState {
    /// Most recent successful reading, kept across failures.
    pub reading: Option<SensorReading>,
    /// True until the first poll resolves.
    pub loading: bool,
    /// Set while the most recent applied poll failed.
    pub error_message: Option<String>,
    /// When `reading` was last replaced.
    pub last_updated: Option<DateTime<Local>>,
    /// Sequence number of the last applied outcome.
    #[serde(skip)]
    applied_sequence: Option<u64>,
}

impl ViewState {
    /// Creates the initial state: loading, nothing to show.
    pub fn new() -> Self {
        Self {
            reading: None,
            loading: true,
            error_message: None,
            last_updated: None,
            applied_sequence: None,
        }
    }

    /// Derives the display status. An error wins over loading, which wins over live.
    pub fn status(&self) -> Status {
        if self.error_message.is_some() {
            Status::Error
        } else if self.loading {
            Status::Connecting
        } else {
            Status::Live
        }
    }

    /// Records a successful fetch.
    pub fn on_success(&mut self, reading: SensorReading, now: DateTime<Local>) {
        self.reading = Some(reading);
        self.last_updated = Some(now);
        self.error_message = None;
        self.loading = false;
    }

    /// Records a failed fetch. The previous reading stays on display.
    pub fn on_failure(&mut self) {
        self.error_message = Some(FETCH_FAILED_MESSAGE.to_string());
        self.loading = false;
    }

    /// Applies a poll outcome stamped with the current local time.
    ///
    /// Returns false if the outcome is older than one already applied.
    pub fn apply(&mut self, outcome: &PollOutcome) -> bool {
        self.apply_at(outcome, Local::now())
    }

    /// Applies a poll outcome with an explicit timestamp.
    pub fn apply_at(&mut self, outcome: &PollOutcome, now: DateTime<Local>) -> bool {
        if let Some(applied) = self.applied_sequence {
            if outcome.sequence <= applied {
                debug!(
                    "Discarding stale outcome #{} (already applied #{})",
                    outcome.sequence, applied
                );
                return false;
            }
        }
        self.applied_sequence = Some(outcome.sequence);

        match &outcome.result {
            Ok(reading) => self.on_success(*reading, now),
            Err(_) => self.on_failure(),
        }
        true
    }

    /// Returns the sequence number of the last applied outcome.
    pub fn applied_sequence(&self) -> Option<u64> {
        self.applied_sequence
    }

    /// Returns a serializable snapshot including the derived status.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            status: self.status(),
            state: self.clone(),
        }
    }
}

impl Default for ViewState {
    fn default() -> Self {
        Self::new()
    }
}

/// View state plus derived status, as exposed over the API.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub status: Status,
    #[serde(flatten)]
    pub state: ViewState,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;

    fn ok(sequence: u64, t: f64, h: f64, l: f64) -> PollOutcome {
        PollOutcome {
            sequence,
            result: Ok(SensorReading::new(t, h, l)),
        }
    }

    fn failed(sequence: u64) -> PollOutcome {
        PollOutcome {
            sequence,
            result: Err(FetchError::Injected),
        }
    }

    #[test]
    fn test_initial_state() {
        let state = ViewState::new();
        assert!(state.loading);
        assert!(state.reading.is_none());
        assert!(state.error_message.is_none());
        assert!(state.last_updated.is_none());
        assert_eq!(state.status(), Status::Connecting);
    }

    #[test]
    fn test_first_tick_success() {
        let mut state = ViewState::new();
        assert!(state.apply(&ok(1, 22.6, 44.8, 760.0)));
        assert!(!state.loading);
        assert_eq!(state.reading, Some(SensorReading::new(22.6, 44.8, 760.0)));
        assert!(state.error_message.is_none());
        assert!(state.last_updated.is_some());
        assert_eq!(state.status(), Status::Live);
    }

    #[test]
    fn test_failure_sets_message() {
        let mut state = ViewState::new();
        state.apply(&failed(1));
        assert!(!state.loading);
        assert_eq!(state.error_message.as_deref(), Some(FETCH_FAILED_MESSAGE));
        assert!(state.reading.is_none());
        assert_eq!(state.status(), Status::Error);
    }

    #[test]
    fn test_failure_keeps_stale_reading() {
        let mut state = ViewState::new();
        let t0 = Local::now();
        state.apply_at(&ok(1, 22.6, 44.8, 760.0), t0);
        state.apply_at(&failed(2), t0 + chrono::Duration::seconds(5));
        assert_eq!(state.reading, Some(SensorReading::new(22.6, 44.8, 760.0)));
        assert_eq!(state.last_updated, Some(t0));
        assert_eq!(state.status(), Status::Error);
    }

    #[test]
    fn test_recovery_after_failure() {
        let mut state = ViewState::new();
        let t0 = Local::now();
        let t1 = t0 + chrono::Duration::seconds(10);
        state.apply_at(&ok(1, 22.6, 44.8, 760.0), t0);
        state.apply_at(&failed(2), t0);
        state.apply_at(&ok(3, 22.7, 45.1, 755.0), t1);
        assert!(state.error_message.is_none());
        assert_eq!(state.reading, Some(SensorReading::new(22.7, 45.1, 755.0)));
        assert_eq!(state.last_updated, Some(t1));
        assert_eq!(state.status(), Status::Live);
    }

    #[test]
    fn test_loading_never_returns() {
        let mut state = ViewState::new();
        state.apply(&failed(1));
        state.apply(&ok(2, 20.0, 40.0, 500.0));
        state.apply(&failed(3));
        assert!(!state.loading);
    }

    #[test]
    fn test_stale_outcome_discarded() {
        let mut state = ViewState::new();
        assert!(state.apply(&ok(2, 25.0, 50.0, 800.0)));
        // Tick #1 resolved late; it must not overwrite tick #2.
        assert!(!state.apply(&failed(1)));
        assert!(!state.apply(&ok(2, 19.0, 31.0, 101.0)));
        assert_eq!(state.reading, Some(SensorReading::new(25.0, 50.0, 800.0)));
        assert!(state.error_message.is_none());
        assert_eq!(state.applied_sequence(), Some(2));
    }

    #[test]
    fn test_status_labels() {
        assert_eq!(Status::Connecting.label(), "Connecting...");
        assert_eq!(Status::Live.label(), "Live");
        assert_eq!(Status::Error.label(), "Error");
        assert_eq!(Status::Error.color(), "red");
    }

    #[test]
    fn test_snapshot_json() {
        let mut state = ViewState::new();
        state.apply(&ok(1, 22.6, 44.8, 760.0));
        let json = serde_json::to_value(state.snapshot()).unwrap();
        assert_eq!(json["status"], "live");
        assert_eq!(json["loading"], false);
        assert_eq!(json["reading"]["luminosity"], 760.0);
        assert!(json["error_message"].is_null());
        assert!(json.get("applied_sequence").is_none());
    }
}
