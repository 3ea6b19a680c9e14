//! Metrics infrastructure for the BidCoS controller.
//!
//! This crate declares all metrics the controller records as structured
//! [`Metric`] constants, so names and label sets live in one place, and
//! provides the [`DeviceLabels`] helper used wherever a metric is scoped to
//! one radio device. It re-exports the `metrics` crate for convenience.
//!
//! Only the recording side lives here: installing a recorder/exporter is the
//! embedding process's business.
//!
//! # Example
//!
//! ```rust,ignore
//! use bidcos_metrics::{metric_defs, describe_metrics, DeviceLabels};
//!
//! describe_metrics();
//!
//! let labels = DeviceLabels::new("390f17", "Bathroom");
//! metrics::gauge!(metric_defs::WEATHER_TEMPERATURE.name, &labels.to_labels()).set(21.5);
//! ```

pub use metrics;

use metrics::{describe_counter, describe_gauge, Unit};

/// The kind of metric (counter or gauge).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// A monotonically increasing counter.
    Counter,
    /// A gauge that can go up and down.
    Gauge,
}

/// A metric declaration with its metadata.
#[derive(Debug, Clone)]
pub struct Metric {
    /// The metric name (e.g. "bidcos.heating.set_temperature").
    pub name: &'static str,
    /// The kind of metric.
    pub kind: MetricKind,
    /// Human-readable description.
    pub description: &'static str,
    /// The unit of measurement (optional).
    pub unit: Option<Unit>,
    /// Expected label keys.
    pub labels: &'static [&'static str],
}

impl Metric {
    /// Creates a new counter metric with the given name.
    pub const fn counter(name: &'static str) -> Self {
        Self {
            name,
            kind: MetricKind::Counter,
            description: "",
            unit: None,
            labels: &[],
        }
    }

    /// Creates a new gauge metric with the given name.
    pub const fn gauge(name: &'static str) -> Self {
        Self {
            name,
            kind: MetricKind::Gauge,
            description: "",
            unit: None,
            labels: &[],
        }
    }

    /// Sets the description for the metric.
    pub const fn with_description(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    /// Sets the unit for the metric.
    pub const fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = Some(unit);
        self
    }

    /// Sets the expected label keys for the metric.
    pub const fn with_labels(mut self, labels: &'static [&'static str]) -> Self {
        self.labels = labels;
        self
    }

    /// Registers this metric's description with the metrics recorder.
    pub fn describe(&self) {
        match (self.kind, self.unit) {
            (MetricKind::Counter, Some(unit)) => {
                describe_counter!(self.name, unit, self.description);
            }
            (MetricKind::Counter, None) => {
                describe_counter!(self.name, self.description);
            }
            (MetricKind::Gauge, Some(unit)) => {
                describe_gauge!(self.name, unit, self.description);
            }
            (MetricKind::Gauge, None) => {
                describe_gauge!(self.name, self.description);
            }
        }
    }
}

/// All metric definitions for the controller.
pub mod metric_defs {
    use super::{Metric, Unit};

    /// Standard labels present on all device-scoped metrics.
    pub const DEVICE_LABELS: &[&str] = &["address", "name"];

    // ========================================================================
    // Controller
    // ========================================================================

    /// Last device contact as seconds since the epoch.
    pub const LAST_CONTACT: Metric = Metric::gauge("bidcos.last_contact")
        .with_description("Last device contact as seconds since the epoch")
        .with_unit(Unit::Seconds)
        .with_labels(DEVICE_LABELS);

    /// Radio packets successfully decoded, by event type.
    pub const PACKETS_DECODED: Metric = Metric::counter("bidcos.packets_decoded")
        .with_description("Radio packets successfully decoded")
        .with_unit(Unit::Count)
        .with_labels(&["type"]);

    // ========================================================================
    // Heating Thermostat
    // ========================================================================

    /// Target temperature reported by a heating thermostat.
    pub const HEATING_SET_TEMPERATURE: Metric = Metric::gauge("bidcos.heating.set_temperature")
        .with_description("Target temperature in degC")
        .with_labels(DEVICE_LABELS);

    /// Measured temperature reported by a heating thermostat.
    pub const HEATING_ACTUAL_TEMPERATURE: Metric =
        Metric::gauge("bidcos.heating.actual_temperature")
            .with_description("Current temperature in degC")
            .with_labels(DEVICE_LABELS);

    /// Fault state, one time series per fault kind.
    pub const HEATING_FAULT: Metric = Metric::gauge("bidcos.heating.fault")
        .with_description("Fault state as bool")
        .with_labels(&["address", "name", "fault"]);

    /// Battery voltage of a heating thermostat.
    pub const HEATING_BATTERY_STATE: Metric = Metric::gauge("bidcos.heating.battery_state")
        .with_description("Battery state in V")
        .with_labels(DEVICE_LABELS);

    /// Valve opening of a heating thermostat.
    pub const HEATING_VALVE_STATE: Metric = Metric::gauge("bidcos.heating.valve_state")
        .with_description("Valve state in percentage points")
        .with_unit(Unit::Percent)
        .with_labels(DEVICE_LABELS);

    /// Control mode, one time series per mode.
    pub const HEATING_CONTROL: Metric = Metric::gauge("bidcos.heating.control")
        .with_description("Control mode as bool")
        .with_labels(&["address", "name", "mode"]);

    /// Remaining boost time of a heating thermostat.
    pub const HEATING_BOOST_STATE: Metric = Metric::gauge("bidcos.heating.boost_state")
        .with_description("Boost state in minutes")
        .with_labels(DEVICE_LABELS);

    // ========================================================================
    // Wall Thermostat
    // ========================================================================

    /// Target temperature reported by a wall thermostat.
    pub const THERMAL_SET_TEMPERATURE: Metric = Metric::gauge("bidcos.thermal.set_temperature")
        .with_description("Target temperature in degC")
        .with_labels(DEVICE_LABELS);

    /// Measured temperature reported by a wall thermostat.
    pub const THERMAL_ACTUAL_TEMPERATURE: Metric =
        Metric::gauge("bidcos.thermal.actual_temperature")
            .with_description("Current temperature in degC")
            .with_labels(DEVICE_LABELS);

    /// Low-battery flag of a wall thermostat.
    pub const THERMAL_LOWBAT: Metric = Metric::gauge("bidcos.thermal.lowbat")
        .with_description("Low battery as bool")
        .with_labels(DEVICE_LABELS);

    /// Communication-fault flag of a wall thermostat.
    pub const THERMAL_COMMUNICATION: Metric = Metric::gauge("bidcos.thermal.communication")
        .with_description("Communication fault as bool")
        .with_labels(DEVICE_LABELS);

    /// Window-open flag of a wall thermostat.
    pub const THERMAL_WINDOW_OPEN: Metric = Metric::gauge("bidcos.thermal.window_open")
        .with_description("Window open as bool")
        .with_labels(DEVICE_LABELS);

    /// Battery voltage of a wall thermostat.
    pub const THERMAL_BATTERY_STATE: Metric = Metric::gauge("bidcos.thermal.battery_state")
        .with_description("Battery state in V")
        .with_labels(DEVICE_LABELS);

    /// Control mode of a wall thermostat.
    pub const THERMAL_CONTROL: Metric = Metric::gauge("bidcos.thermal.control")
        .with_description("Control mode")
        .with_labels(DEVICE_LABELS);

    /// Remaining boost time of a wall thermostat.
    pub const THERMAL_BOOST_STATE: Metric = Metric::gauge("bidcos.thermal.boost_state")
        .with_description("Boost state in minutes")
        .with_labels(DEVICE_LABELS);

    /// Temperature carried in a weather event.
    pub const WEATHER_TEMPERATURE: Metric = Metric::gauge("bidcos.weather.temperature")
        .with_description("Temperature in degC")
        .with_labels(DEVICE_LABELS);

    /// Humidity carried in a weather event.
    pub const WEATHER_HUMIDITY: Metric = Metric::gauge("bidcos.weather.humidity")
        .with_description("Humidity in percentage points")
        .with_unit(Unit::Percent)
        .with_labels(DEVICE_LABELS);

    /// Target temperature carried in a thermal control event.
    pub const THERMAL_CONTROL_SET_TEMPERATURE: Metric =
        Metric::gauge("bidcos.thermal_control.set_temperature")
            .with_description("Target temperature in degC")
            .with_labels(DEVICE_LABELS);

    /// Measured temperature carried in a thermal control event.
    pub const THERMAL_CONTROL_ACTUAL_TEMPERATURE: Metric =
        Metric::gauge("bidcos.thermal_control.actual_temperature")
            .with_description("Current temperature in degC")
            .with_labels(DEVICE_LABELS);

    /// Humidity carried in a thermal control event.
    pub const THERMAL_CONTROL_HUMIDITY: Metric =
        Metric::gauge("bidcos.thermal_control.humidity")
            .with_description("Humidity in percentage points")
            .with_unit(Unit::Percent)
            .with_labels(DEVICE_LABELS);

    // ========================================================================
    // Power Switch
    // ========================================================================

    /// Boot flag carried in a power event.
    pub const POWER_BOOTED: Metric = Metric::gauge("bidcos.power.booted")
        .with_description("Booted state as bool")
        .with_labels(DEVICE_LABELS);

    /// Energy counter carried in a power event.
    pub const POWER_ENERGY_COUNTER: Metric = Metric::gauge("bidcos.power.energy_counter")
        .with_description("Energy counter in Wh")
        .with_labels(DEVICE_LABELS);

    /// Instantaneous power carried in a power event.
    pub const POWER_DRAW: Metric = Metric::gauge("bidcos.power.draw")
        .with_description("Power in W")
        .with_labels(DEVICE_LABELS);

    /// Current carried in a power event.
    pub const POWER_CURRENT: Metric = Metric::gauge("bidcos.power.current")
        .with_description("Current in mA")
        .with_labels(DEVICE_LABELS);

    /// Mains voltage carried in a power event.
    pub const POWER_VOLTAGE: Metric = Metric::gauge("bidcos.power.voltage")
        .with_description("Voltage in V")
        .with_labels(DEVICE_LABELS);

    /// Mains frequency carried in a power event.
    pub const POWER_FREQUENCY: Metric = Metric::gauge("bidcos.power.frequency")
        .with_description("Frequency in Hz")
        .with_labels(DEVICE_LABELS);

    /// Returns a slice of all defined metrics.
    pub const ALL: &[&Metric] = &[
        &LAST_CONTACT,
        &PACKETS_DECODED,
        &HEATING_SET_TEMPERATURE,
        &HEATING_ACTUAL_TEMPERATURE,
        &HEATING_FAULT,
        &HEATING_BATTERY_STATE,
        &HEATING_VALVE_STATE,
        &HEATING_CONTROL,
        &HEATING_BOOST_STATE,
        &THERMAL_SET_TEMPERATURE,
        &THERMAL_ACTUAL_TEMPERATURE,
        &THERMAL_LOWBAT,
        &THERMAL_COMMUNICATION,
        &THERMAL_WINDOW_OPEN,
        &THERMAL_BATTERY_STATE,
        &THERMAL_CONTROL,
        &THERMAL_BOOST_STATE,
        &WEATHER_TEMPERATURE,
        &WEATHER_HUMIDITY,
        &THERMAL_CONTROL_SET_TEMPERATURE,
        &THERMAL_CONTROL_ACTUAL_TEMPERATURE,
        &THERMAL_CONTROL_HUMIDITY,
        &POWER_BOOTED,
        &POWER_ENERGY_COUNTER,
        &POWER_DRAW,
        &POWER_CURRENT,
        &POWER_VOLTAGE,
        &POWER_FREQUENCY,
    ];
}

/// Labels identifying one radio device.
#[derive(Debug, Clone)]
pub struct DeviceLabels {
    /// Device address in hex.
    pub address: String,
    /// Human-readable device name.
    pub name: String,
}

impl DeviceLabels {
    pub fn new(address: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            name: name.into(),
        }
    }

    /// Converts the labels to the metrics crate label format.
    pub fn to_labels(&self) -> Vec<(&'static str, String)> {
        vec![
            ("address", self.address.clone()),
            ("name", self.name.clone()),
        ]
    }

    /// Returns labels with additional key-value pairs.
    pub fn with(&self, extra: &[(&'static str, String)]) -> Vec<(&'static str, String)> {
        let mut labels = self.to_labels();
        labels.extend_from_slice(extra);
        labels
    }
}

/// Describes all metrics used by the controller.
///
/// Call once at startup, after the recorder is installed.
pub fn describe_metrics() {
    for metric in metric_defs::ALL {
        metric.describe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_labels() {
        let labels = DeviceLabels::new("390f17", "Bathroom");
        let label_vec = labels.to_labels();
        assert_eq!(label_vec.len(), 2);
        assert!(label_vec.contains(&("address", "390f17".to_string())));
        assert!(label_vec.contains(&("name", "Bathroom".to_string())));
    }

    #[test]
    fn test_device_labels_with_extra() {
        let labels = DeviceLabels::new("390f17", "Bathroom");
        let extended = labels.with(&[("fault", "lowbat".to_string())]);
        assert_eq!(extended.len(), 3);
        assert!(extended.contains(&("fault", "lowbat".to_string())));
    }

    #[test]
    fn test_metric_definitions() {
        assert_eq!(
            metric_defs::HEATING_SET_TEMPERATURE.name,
            "bidcos.heating.set_temperature"
        );
        assert_eq!(metric_defs::HEATING_SET_TEMPERATURE.kind, MetricKind::Gauge);
        assert_eq!(metric_defs::PACKETS_DECODED.kind, MetricKind::Counter);
        assert_eq!(metric_defs::PACKETS_DECODED.labels, &["type"]);
    }

    #[test]
    fn test_all_metrics_have_device_labels_or_custom() {
        for metric in metric_defs::ALL {
            assert!(!metric.labels.is_empty(), "{} has no labels", metric.name);
        }
    }
}
