//! Display formatting shared by the web and terminal dashboards.
//!
//! Terminal layout:
//! ```text
//! [Live] Last updated: 18:45:02
//! Temperature    22.6 °C
//! Humidity       44.8 %
//! Luminosity      760 lx
//! ```

use chrono::{DateTime, Local};

use crate::reading::{Channel, SensorReading};
use crate::view::{Status, ViewState};

/// Placeholder shown for a channel with no reading.
pub const NOT_AVAILABLE: &str = "N/A";

/// Message shown while the first poll is outstanding.
pub const LOADING_MESSAGE: &str = "Initializing sensor connection...";

/// One labeled value card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Card {
    /// Channel identifier (e.g. "temperature").
    pub id: String,
    pub label: &'static str,
    pub value: String,
    pub unit: &'static str,
}

/// Everything a dashboard needs to draw one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardView {
    pub status: Status,
    pub status_label: &'static str,
    pub status_color: &'static str,
    /// Local `HH:MM:SS`, only while live.
    pub last_updated: Option<String>,
    pub loading: bool,
    pub error_message: Option<String>,
    /// Empty until a reading exists.
    pub cards: Vec<Card>,
}

/// Formats one channel with the dashboard precision.
pub fn format_value(channel: Channel, reading: Option<&SensorReading>) -> String {
    match reading {
        Some(r) => format!("{:.*}", channel.decimals(), r.get(channel)),
        None => NOT_AVAILABLE.to_string(),
    }
}

/// Formats a timestamp as local wall-clock time.
pub fn format_time(when: &DateTime<Local>) -> String {
    when.format("%H:%M:%S").to_string()
}

impl DashboardView {
    /// Builds the view for a state.
    ///
    /// Cards are kept under an error banner when a stale reading exists, so the
    /// display freezes on the last known values.
    pub fn from_state(state: &ViewState) -> Self {
        let status = state.status();
        let last_updated = match status {
            Status::Live => state.last_updated.as_ref().map(format_time),
            _ => None,
        };
        let cards = match &state.reading {
            Some(reading) => Channel::ALL
                .iter()
                .map(|&channel| Card {
                    id: channel.to_string(),
                    label: channel.label(),
                    value: format_value(channel, Some(reading)),
                    unit: channel.unit(),
                })
                .collect(),
            None => Vec::new(),
        };

        Self {
            status,
            status_label: status.label(),
            status_color: status.color(),
            last_updated,
            loading: state.loading,
            error_message: state.error_message.clone(),
            cards,
        }
    }

    /// Renders the view as plain text lines for a terminal.
    pub fn render_text(&self) -> Vec<String> {
        let mut lines = Vec::new();
        match &self.last_updated {
            Some(when) => lines.push(format!("[{}] Last updated: {}", self.status_label, when)),
            None => lines.push(format!("[{}]", self.status_label)),
        }
        if self.loading {
            lines.push(LOADING_MESSAGE.to_string());
        }
        if let Some(message) = &self.error_message {
            lines.push(format!("Error: {}", message));
        }
        for card in &self.cards {
            lines.push(format!("{:<12} {:>7} {}", card.label, card.value, card.unit));
        }
        lines
    }
}
