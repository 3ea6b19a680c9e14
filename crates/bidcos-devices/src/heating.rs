//! Heating valve thermostat.

use std::fmt;
use std::sync::{Arc, RwLock};

use bidcos_metrics::{metric_defs, DeviceLabels};
use bidcos_packet::Sender;

use crate::device::StandardDevice;
use crate::error::DeviceError;
use crate::Event;

/// Channel receiving climate control transmissions from a wall thermostat.
pub const CLIMATE_CONTROL_RECEIVER: u8 = 0x02;

const NUM_CHANNELS: usize = 6;

/// Operating mode reported by a thermostat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMode {
    Auto,
    Manu,
    Party,
    Boost,
}

impl ControlMode {
    /// Decode the two-bit mode field.
    pub fn from_bits(bits: u8) -> ControlMode {
        match bits & 0x03 {
            0 => ControlMode::Auto,
            1 => ControlMode::Manu,
            2 => ControlMode::Party,
            _ => ControlMode::Boost,
        }
    }
}

impl fmt::Display for ControlMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlMode::Auto => write!(f, "Auto"),
            ControlMode::Manu => write!(f, "Manu"),
            ControlMode::Party => write!(f, "Party"),
            ControlMode::Boost => write!(f, "Boost"),
        }
    }
}

/// Fault condition reported by a heating thermostat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultReporting {
    NoFault,
    ValveTight,
    AdjustingRangeTooLarge,
    AdjustingRangeTooSmall,
    CommunicationError,
    /// Reserved code, never observed.
    Unknown,
    LowBattery,
    ValveErrorPosition,
}

impl FaultReporting {
    /// Decode the three-bit fault field.
    pub fn from_bits(bits: u8) -> FaultReporting {
        match bits & 0x07 {
            0 => FaultReporting::NoFault,
            1 => FaultReporting::ValveTight,
            2 => FaultReporting::AdjustingRangeTooLarge,
            3 => FaultReporting::AdjustingRangeTooSmall,
            4 => FaultReporting::CommunicationError,
            5 => FaultReporting::Unknown,
            6 => FaultReporting::LowBattery,
            _ => FaultReporting::ValveErrorPosition,
        }
    }
}

impl fmt::Display for FaultReporting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FaultReporting::NoFault => write!(f, "none"),
            FaultReporting::ValveTight => write!(f, "valve tight"),
            FaultReporting::AdjustingRangeTooLarge => write!(f, "adjusting range too large"),
            FaultReporting::AdjustingRangeTooSmall => write!(f, "adjusting range too small"),
            FaultReporting::CommunicationError => write!(f, "communication error"),
            FaultReporting::Unknown => write!(f, "unknown fault"),
            FaultReporting::LowBattery => write!(f, "low battery"),
            FaultReporting::ValveErrorPosition => write!(f, "valve error position"),
        }
    }
}

/// Periodic status report of a heating thermostat.
///
/// Party mode is not used, so its extra fields are ignored.
#[derive(Debug, Clone)]
pub struct InfoEvent {
    /// Target temperature in degC.
    pub set_temperature: f64,
    /// Measured temperature in degC.
    pub actual_temperature: f64,
    pub fault: FaultReporting,
    /// Battery voltage in V.
    pub battery_state: f64,
    /// Valve opening in percentage points.
    pub valve_state: u8,
    pub control: ControlMode,
    /// Remaining boost time in minutes.
    pub boost_state: u8,
}

impl fmt::Display for InfoEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "target {} degC, current {} degC, fault: {}, battery {} V, valve {}%, {}, boost {} min",
            self.set_temperature,
            self.actual_temperature,
            self.fault,
            self.battery_state,
            self.valve_state,
            self.control,
            self.boost_state,
        )
    }
}

/// A battery-powered heating valve thermostat.
pub struct Thermostat {
    dev: StandardDevice,
    latest_info_event: RwLock<Option<InfoEvent>>,
}

impl Thermostat {
    pub fn new(sender: Arc<Sender>, addr: [u8; 3], name: impl Into<String>) -> Thermostat {
        Thermostat {
            dev: StandardDevice::new(sender, addr, name, NUM_CHANNELS),
            latest_info_event: RwLock::new(None),
        }
    }

    /// Decode a periodic status report and keep it as the latest snapshot.
    pub fn decode_info_event(&self, payload: &[u8]) -> Result<InfoEvent, DeviceError> {
        if payload.len() != 6 {
            return Err(DeviceError::PayloadLength {
                event: "heating info event",
                got: payload.len(),
                want: 6,
            });
        }

        let ie = InfoEvent {
            set_temperature: ((payload[1] >> 2) & 0x3f) as f64 / 2.0,
            actual_temperature: ((((payload[1] & 0x03) as u16) << 8) | payload[2] as u16) as f64
                / 10.0,
            fault: FaultReporting::from_bits(payload[3] >> 5),
            battery_state: (payload[3] & 0x1f) as f64 / 10.0 + 1.5,
            valve_state: payload[4] & 0x7f,
            control: ControlMode::from_bits(payload[5] >> 6),
            boost_state: payload[5] & 0x3f,
        };

        let labels = DeviceLabels::new(self.dev.addr_hex(), self.dev.name());
        metrics::gauge!(metric_defs::HEATING_SET_TEMPERATURE.name, &labels.to_labels())
            .set(ie.set_temperature);
        metrics::gauge!(
            metric_defs::HEATING_ACTUAL_TEMPERATURE.name,
            &labels.to_labels()
        )
        .set(ie.actual_temperature);
        for (key, fault) in [
            ("valvetight", FaultReporting::ValveTight),
            ("adjustingrangetoolarge", FaultReporting::AdjustingRangeTooLarge),
            ("adjustingrangetoosmall", FaultReporting::AdjustingRangeTooSmall),
            ("communicationerror", FaultReporting::CommunicationError),
            ("lowbat", FaultReporting::LowBattery),
            ("valveerrorposition", FaultReporting::ValveErrorPosition),
        ] {
            metrics::gauge!(
                metric_defs::HEATING_FAULT.name,
                &labels.with(&[("fault", key.to_string())])
            )
            .set(if ie.fault == fault { 1.0 } else { 0.0 });
        }
        metrics::gauge!(metric_defs::HEATING_BATTERY_STATE.name, &labels.to_labels())
            .set(ie.battery_state);
        metrics::gauge!(metric_defs::HEATING_VALVE_STATE.name, &labels.to_labels())
            .set(ie.valve_state as f64);
        for (key, mode) in [
            ("manu", ControlMode::Manu),
            ("party", ControlMode::Party),
            ("boost", ControlMode::Boost),
        ] {
            metrics::gauge!(
                metric_defs::HEATING_CONTROL.name,
                &labels.with(&[("mode", key.to_string())])
            )
            .set(if ie.control == mode { 1.0 } else { 0.0 });
        }
        metrics::gauge!(metric_defs::HEATING_BOOST_STATE.name, &labels.to_labels())
            .set(ie.boost_state as f64);

        *self
            .latest_info_event
            .write()
            .unwrap_or_else(|e| e.into_inner()) = Some(ie.clone());
        Ok(ie)
    }

    /// Latest decoded events, for status observation.
    pub fn most_recent_events(&self) -> Vec<Event> {
        self.latest_info_event
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .cloned()
            .map(Event::HeatingInfo)
            .collect()
    }
}

impl std::ops::Deref for Thermostat {
    type Target = StandardDevice;

    fn deref(&self) -> &StandardDevice {
        &self.dev
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::tests::test_sender;

    #[test]
    fn test_decode_info_event() {
        let ts = Thermostat::new(test_sender(), [0xaa, 0xbb, 0xcc], "office");
        let ie = ts
            .decode_info_event(&[0x0a, 0xb0, 0xe2, 0x08, 0x00, 0x00])
            .expect("decode should succeed");
        assert_eq!(ie.set_temperature, 22.0);
        assert_eq!(ie.actual_temperature, 22.6);
        assert_eq!(ie.fault, FaultReporting::NoFault);
        assert_eq!(ie.battery_state, 2.3);
        assert_eq!(ie.valve_state, 0);
        assert_eq!(ie.control, ControlMode::Auto);
        assert_eq!(ie.boost_state, 0);
    }

    #[test]
    fn test_decode_info_event_keeps_latest() {
        let ts = Thermostat::new(test_sender(), [0xaa, 0xbb, 0xcc], "office");
        assert!(ts.most_recent_events().is_empty());
        ts.decode_info_event(&[0x0a, 0xb0, 0xe2, 0x08, 0x00, 0x00])
            .unwrap();
        assert_eq!(ts.most_recent_events().len(), 1);
    }

    #[test]
    fn test_decode_info_event_wrong_length() {
        let ts = Thermostat::new(test_sender(), [0xaa, 0xbb, 0xcc], "office");
        assert!(ts.decode_info_event(&[0x0a, 0xb0, 0xe2]).is_err());
    }

    #[test]
    fn test_reserved_fault_code_decodes_as_unknown() {
        assert_eq!(FaultReporting::from_bits(5), FaultReporting::Unknown);
    }
}
