//! BidCoS device support.
//!
//! Device types for the supported radio device families, built on top of the
//! packet layer:
//!
//! - [`heating::Thermostat`] — battery-powered heating valve thermostat
//! - [`thermal::ThermalControl`] — wall-mounted thermostat / climate sensor
//! - [`power::PowerSwitch`] — mains power switch with energy metering
//!
//! [`StandardDevice`] carries the behavior shared by all of them: the
//! per-device message counter, the piecewise parameter-memory protocol and
//! the peer-list reconciliation logic.

pub mod device;
mod error;
pub mod heating;
pub mod power;
pub mod thermal;

pub use device::{FullyQualifiedChannel, StandardDevice, PARAM_MEMORY_SIZE};
pub use error::DeviceError;

use std::fmt;

/// The most recent observation decoded from a device.
#[derive(Debug, Clone)]
pub enum Event {
    HeatingInfo(heating::InfoEvent),
    ThermalInfo(thermal::InfoEvent),
    Weather(thermal::WeatherEvent),
    ThermalControl(thermal::ThermalControlEvent),
    Power(power::PowerEvent),
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::HeatingInfo(e) => e.fmt(f),
            Event::ThermalInfo(e) => e.fmt(f),
            Event::Weather(e) => e.fmt(f),
            Event::ThermalControl(e) => e.fmt(f),
            Event::Power(e) => e.fmt(f),
        }
    }
}
