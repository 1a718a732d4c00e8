//! Sensor readings and per-channel limits.
//!
//! Every reading carries three channels. Each channel has a valid range, a
//! maximum per-step drift used by the simulated source, and display metadata.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// One snapshot of the environment sensors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    /// Temperature in °C.
    pub temperature: f64,
    /// Relative humidity in %.
    pub humidity: f64,
    /// Illuminance in lux.
    pub luminosity: f64,
}

impl SensorReading {
    /// Creates a new reading.
    pub fn new(temperature: f64, humidity: f64, luminosity: f64) -> Self {
        Self {
            temperature,
            humidity,
            luminosity,
        }
    }

    /// Returns the value of a single channel.
    pub fn get(&self, channel: Channel) -> f64 {
        match channel {
            Channel::Temperature => self.temperature,
            Channel::Humidity => self.humidity,
            Channel::Luminosity => self.luminosity,
        }
    }

    /// Sets the value of a single channel.
    pub fn set(&mut self, channel: Channel, value: f64) {
        match channel {
            Channel::Temperature => self.temperature = value,
            Channel::Humidity => self.humidity = value,
            Channel::Luminosity => self.luminosity = value,
        }
    }

    /// Returns true if every channel lies within its valid range.
    pub fn in_range(&self) -> bool {
        Channel::ALL.iter().all(|c| {
            let (min, max) = c.range();
            (min..=max).contains(&self.get(*c))
        })
    }
}

impl Default for SensorReading {
    /// The seed values of the simulated source.
    fn default() -> Self {
        Self::new(
            Channel::Temperature.initial(),
            Channel::Humidity.initial(),
            Channel::Luminosity.initial(),
        )
    }
}

/// A sensor channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Temperature,
    Humidity,
    Luminosity,
}

impl Channel {
    /// All channels in display order.
    pub const ALL: [Channel; 3] = [Channel::Temperature, Channel::Humidity, Channel::Luminosity];

    /// Returns the valid `(min, max)` range.
    pub fn range(&self) -> (f64, f64) {
        match self {
            Channel::Temperature => (18.0, 30.0),
            Channel::Humidity => (30.0, 70.0),
            Channel::Luminosity => (100.0, 1200.0),
        }
    }

    /// Returns the maximum absolute drift applied per simulated step.
    pub fn max_step(&self) -> f64 {
        match self {
            Channel::Temperature => 0.25,
            Channel::Humidity => 1.0,
            Channel::Luminosity => 25.0,
        }
    }

    /// Returns the value the simulated source starts from.
    pub fn initial(&self) -> f64 {
        match self {
            Channel::Temperature => 22.5,
            Channel::Humidity => 45.0,
            Channel::Luminosity => 750.0,
        }
    }

    /// Clamps a value into the valid range.
    pub fn clamp(&self, value: f64) -> f64 {
        let (min, max) = self.range();
        value.clamp(min, max)
    }

    /// Returns the human readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Channel::Temperature => "Temperature",
            Channel::Humidity => "Humidity",
            Channel::Luminosity => "Luminosity",
        }
    }

    /// Returns the unit of measurement.
    pub fn unit(&self) -> &'static str {
        match self {
            Channel::Temperature => "°C",
            Channel::Humidity => "%",
            Channel::Luminosity => "lx",
        }
    }

    /// Returns the number of decimals shown on the dashboard.
    pub fn decimals(&self) -> usize {
        match self {
            Channel::Temperature | Channel::Humidity => 1,
            Channel::Luminosity => 0,
        }
    }
}

impl FromStr for Channel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "temperature" | "temp" => Ok(Channel::Temperature),
            "humidity" => Ok(Channel::Humidity),
            "luminosity" | "light" => Ok(Channel::Luminosity),
            _ => Err(format!("unknown channel: {}", s)),
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Channel::Temperature => write!(f, "temperature"),
            Channel::Humidity => write!(f, "humidity"),
            Channel::Luminosity => write!(f, "luminosity"),
        }
    }
}
