//! Sensor Dashboard Core Library
//!
//! Provides the simulated environmental sensor source, the interval poller
//! and the view state that dashboards render from.

pub mod error;
pub mod poller;
pub mod presentation;
pub mod reading;
pub mod source;
pub mod view;

pub use error::{Error, FetchError, PollerError, Result};
pub use poller::{Poller, PollOutcome, DEFAULT_INTERVAL};
pub use presentation::{Card, DashboardView};
pub use reading::{Channel, SensorReading};
pub use source::{FlakySource, SensorDataSource, SimulatedSource};
pub use view::{Snapshot, Status, ViewState, FETCH_FAILED_MESSAGE};
