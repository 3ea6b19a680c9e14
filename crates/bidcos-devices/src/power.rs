//! Mains power switch with energy metering.

use std::fmt;
use std::sync::{Arc, RwLock};

use bidcos_metrics::{metric_defs, DeviceLabels};
use bidcos_packet::{Packet, Sender, DEFAULT_FLAGS, LEVEL_SET};

use crate::device::StandardDevice;
use crate::error::DeviceError;
use crate::Event;

/// Channel carrying power measurements.
pub const POWER_METER: u8 = 0x02;
/// Channel switching the relay.
pub const CHANNEL_SWITCH: u8 = 0x01;

/// Relay state: on.
pub const ON: u8 = 0xc8;
/// Relay state: off.
pub const OFF: u8 = 0x00;

const NUM_CHANNELS: usize = 6;

/// Energy measurement report of a power switch.
#[derive(Debug, Clone)]
pub struct PowerEvent {
    /// Whether the device (re)booted since the last report.
    pub boot: bool,
    /// Energy counter in Wh.
    pub energy_counter: f64,
    /// Power in W.
    pub power: f64,
    /// Current in mA.
    pub current: f64,
    /// Voltage in V.
    pub voltage: f64,
    /// Mains frequency in Hz.
    pub frequency: f64,
}

impl fmt::Display for PowerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "booted: {}, {} Wh, {} W, {} mA, {} V, {} Hz",
            self.boot, self.energy_counter, self.power, self.current, self.voltage, self.frequency,
        )
    }
}

/// A mains power switch with energy metering.
pub struct PowerSwitch {
    dev: StandardDevice,
    latest_power_event: RwLock<Option<PowerEvent>>,
}

impl PowerSwitch {
    pub fn new(sender: Arc<Sender>, addr: [u8; 3], name: impl Into<String>) -> PowerSwitch {
        PowerSwitch {
            dev: StandardDevice::new(sender, addr, name, NUM_CHANNELS),
            latest_power_event: RwLock::new(None),
        }
    }

    /// Switch an actuator channel, e.g. [`CHANNEL_SWITCH`] to [`ON`].
    pub fn level_set(&self, channel: u8, state: u8, on_time: u8) -> Result<(), DeviceError> {
        self.dev.sender().write_packet(Packet {
            flags: DEFAULT_FLAGS,
            cmd: LEVEL_SET,
            dest: self.dev.addr(),
            payload: vec![
                0x02, // subtype
                channel,
                state,
                0x00, // constant
                on_time,
            ],
            ..Default::default()
        })?;
        Ok(())
    }

    /// Decode an energy measurement report.
    pub fn decode_power_event(&self, payload: &[u8]) -> Result<PowerEvent, DeviceError> {
        if payload.len() != 11 {
            return Err(DeviceError::PayloadLength {
                event: "power event",
                got: payload.len(),
                want: 11,
            });
        }

        let pe = PowerEvent {
            boot: (payload[0] >> 7) & 0x01 == 1,
            energy_counter: ((((payload[0] & 0x7f) as u32) << 16)
                | ((payload[1] as u32) << 8)
                | payload[2] as u32) as f64
                / 10.0,
            power: (((payload[3] as u32) << 16) | ((payload[4] as u32) << 8) | payload[5] as u32)
                as f64
                / 100.0,
            current: (((payload[6] as u16) << 8) | payload[7] as u16) as f64,
            voltage: (((payload[8] as u16) << 8) | payload[9] as u16) as f64 / 10.0,
            frequency: payload[10] as f64 / 100.0 + 50.0,
        };

        let labels = DeviceLabels::new(self.dev.addr_hex(), self.dev.name());
        metrics::gauge!(metric_defs::POWER_BOOTED.name, &labels.to_labels())
            .set(if pe.boot { 1.0 } else { 0.0 });
        metrics::gauge!(metric_defs::POWER_ENERGY_COUNTER.name, &labels.to_labels())
            .set(pe.energy_counter);
        metrics::gauge!(metric_defs::POWER_DRAW.name, &labels.to_labels()).set(pe.power);
        metrics::gauge!(metric_defs::POWER_CURRENT.name, &labels.to_labels()).set(pe.current);
        metrics::gauge!(metric_defs::POWER_VOLTAGE.name, &labels.to_labels()).set(pe.voltage);
        metrics::gauge!(metric_defs::POWER_FREQUENCY.name, &labels.to_labels()).set(pe.frequency);

        *self
            .latest_power_event
            .write()
            .unwrap_or_else(|e| e.into_inner()) = Some(pe.clone());
        Ok(pe)
    }

    /// Latest decoded events, for status observation.
    pub fn most_recent_events(&self) -> Vec<Event> {
        self.latest_power_event
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .cloned()
            .map(Event::Power)
            .collect()
    }
}

impl std::ops::Deref for PowerSwitch {
    type Target = StandardDevice;

    fn deref(&self) -> &StandardDevice {
        &self.dev
    }
}
