//! Wall-mounted thermostat / climate sensor unit.
//!
//! Besides decoding the three event families the unit transmits, this module
//! carries the weekly heating program encoder: a program is packed into the
//! unit's parameter memory at fixed per-weekday offsets and picked up by the
//! unit after a configuration write.

use std::fmt;
use std::sync::{Arc, RwLock};

use bidcos_metrics::{metric_defs, DeviceLabels};
use bidcos_packet::Sender;

use crate::device::{StandardDevice, PARAM_MEMORY_SIZE};
use crate::error::DeviceError;
use crate::heating::ControlMode;
use crate::Event;

/// Channel transmitting climate control data to a heating thermostat.
pub const THERMAL_CONTROL_TRANSMIT: u8 = 0x02;

const NUM_CHANNELS: usize = 7;

/// Day bit for weekday `d`, Sunday = 0.
const fn day_bit(day: u8) -> u8 {
    1 << day
}

/// Monday through Friday.
pub const WEEKDAY_MASK: u8 =
    day_bit(1) | day_bit(2) | day_bit(3) | day_bit(4) | day_bit(5);
/// Saturday and Sunday.
pub const WEEKEND_MASK: u8 = day_bit(6) | day_bit(0);

/// Switch points per day program.
pub const ENTRIES_PER_DAY: usize = 13;

/// One switch point: hold `temperature` until `end_minutes` past midnight.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProgramEntry {
    /// End time in minutes since midnight. Zero means end of day.
    pub end_minutes: u16,
    /// Temperature in degC. Zero means the default temperature.
    pub temperature: f64,
}

/// A weekly heating program for the days selected by `day_mask`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Program {
    /// Bit `d` selects weekday `d`, Sunday = 0.
    pub day_mask: u8,
    /// Up to 13 switch points; unused entries stay zero.
    pub entries: [ProgramEntry; ENTRIES_PER_DAY],
}

/// Parameter memory offsets of the per-weekday program slots, Sunday first.
const PROGRAM_OFFSETS: [usize; 7] = [46, 72, 98, 124, 150, 176, 20];

/// Temperature/humidity measurement broadcast by the unit.
#[derive(Debug, Clone)]
pub struct WeatherEvent {
    /// Temperature in degC.
    pub temperature: f64,
    /// Humidity in percentage points.
    pub humidity: u8,
}

impl fmt::Display for WeatherEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} degC, {}% humidity", self.temperature, self.humidity)
    }
}

/// Climate control report sent to the peered heating thermostat.
#[derive(Debug, Clone)]
pub struct ThermalControlEvent {
    /// Target temperature in degC.
    pub set_temperature: f64,
    /// Measured temperature in degC.
    pub actual_temperature: f64,
    /// Humidity in percentage points.
    pub actual_humidity: f64,
}

impl fmt::Display for ThermalControlEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "target {} degC, current {} degC, {}% humidity",
            self.set_temperature, self.actual_temperature, self.actual_humidity
        )
    }
}

/// Periodic status report of the unit.
///
/// Party mode is not used, so its extra fields are ignored.
#[derive(Debug, Clone)]
pub struct InfoEvent {
    /// Target temperature in degC.
    pub set_temperature: f64,
    /// Measured temperature in degC.
    pub actual_temperature: f64,
    pub lowbat_reporting: bool,
    pub communication_reporting: bool,
    pub window_open_reporting: bool,
    /// Battery voltage in V.
    pub battery_state: f64,
    pub control: ControlMode,
    /// Remaining boost time in minutes.
    pub boost_state: u8,
}

impl fmt::Display for InfoEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "target {} degC, current {} degC, lowbat: {}, window open: {}, battery {} V, {}, boost {} min",
            self.set_temperature,
            self.actual_temperature,
            self.lowbat_reporting,
            self.window_open_reporting,
            self.battery_state,
            self.control,
            self.boost_state,
        )
    }
}

/// A wall thermostat: remote temperature sensor and control unit for the
/// heating thermostats peered with it.
pub struct ThermalControl {
    dev: StandardDevice,
    latest_weather_event: RwLock<Option<WeatherEvent>>,
    latest_thermal_control_event: RwLock<Option<ThermalControlEvent>>,
    latest_info_event: RwLock<Option<InfoEvent>>,
}

impl ThermalControl {
    pub fn new(sender: Arc<Sender>, addr: [u8; 3], name: impl Into<String>) -> ThermalControl {
        ThermalControl {
            dev: StandardDevice::new(sender, addr, name, NUM_CHANNELS),
            latest_weather_event: RwLock::new(None),
            latest_thermal_control_event: RwLock::new(None),
            latest_info_event: RwLock::new(None),
        }
    }

    fn labels(&self) -> DeviceLabels {
        DeviceLabels::new(self.dev.addr_hex(), self.dev.name())
    }

    /// Decode a temperature/humidity broadcast.
    ///
    /// The temperature is a 14-bit field in tenths of a degree, decoded
    /// unsigned; sub-zero temperatures have not been observed.
    pub fn decode_weather_event(&self, payload: &[u8]) -> Result<WeatherEvent, DeviceError> {
        if payload.len() != 3 {
            return Err(DeviceError::PayloadLength {
                event: "weather event",
                got: payload.len(),
                want: 3,
            });
        }

        let we = WeatherEvent {
            temperature: ((((payload[0] as u16) << 8) | payload[1] as u16) & 0x3fff) as f64 / 10.0,
            humidity: payload[2],
        };

        let labels = self.labels();
        metrics::gauge!(metric_defs::WEATHER_TEMPERATURE.name, &labels.to_labels())
            .set(we.temperature);
        metrics::gauge!(metric_defs::WEATHER_HUMIDITY.name, &labels.to_labels())
            .set(we.humidity as f64);

        *self
            .latest_weather_event
            .write()
            .unwrap_or_else(|e| e.into_inner()) = Some(we.clone());
        Ok(we)
    }

    /// Decode a climate control report.
    pub fn decode_thermal_control_event(
        &self,
        payload: &[u8],
    ) -> Result<ThermalControlEvent, DeviceError> {
        if payload.len() != 3 {
            return Err(DeviceError::PayloadLength {
                event: "thermal control event",
                got: payload.len(),
                want: 3,
            });
        }

        let tce = ThermalControlEvent {
            set_temperature: ((payload[0] >> 2) & 0x3f) as f64 / 2.0,
            actual_temperature: ((((payload[0] & 0x03) as u16) << 8) | payload[1] as u16) as f64
                / 10.0,
            actual_humidity: payload[2] as f64,
        };

        let labels = self.labels();
        metrics::gauge!(
            metric_defs::THERMAL_CONTROL_SET_TEMPERATURE.name,
            &labels.to_labels()
        )
        .set(tce.set_temperature);
        metrics::gauge!(
            metric_defs::THERMAL_CONTROL_ACTUAL_TEMPERATURE.name,
            &labels.to_labels()
        )
        .set(tce.actual_temperature);
        metrics::gauge!(metric_defs::THERMAL_CONTROL_HUMIDITY.name, &labels.to_labels())
            .set(tce.actual_humidity);

        *self
            .latest_thermal_control_event
            .write()
            .unwrap_or_else(|e| e.into_inner()) = Some(tce.clone());
        Ok(tce)
    }

    /// Decode a periodic status report.
    pub fn decode_info_event(&self, payload: &[u8]) -> Result<InfoEvent, DeviceError> {
        if payload.len() != 5 {
            return Err(DeviceError::PayloadLength {
                event: "thermal info event",
                got: payload.len(),
                want: 5,
            });
        }

        let ie = InfoEvent {
            set_temperature: ((payload[1] >> 2) & 0x3f) as f64 / 2.0,
            actual_temperature: ((((payload[1] & 0x03) as u16) << 8) | payload[2] as u16) as f64
                / 10.0,
            lowbat_reporting: (payload[3] >> 7) & 0x01 == 1,
            communication_reporting: (payload[3] >> 6) & 0x01 == 1,
            window_open_reporting: (payload[3] >> 5) & 0x01 == 1,
            battery_state: (payload[3] & 0x1f) as f64 / 10.0 + 1.5,
            control: ControlMode::from_bits(payload[4] >> 6),
            boost_state: payload[4] & 0x3f,
        };

        let labels = self.labels();
        metrics::gauge!(metric_defs::THERMAL_SET_TEMPERATURE.name, &labels.to_labels())
            .set(ie.set_temperature);
        metrics::gauge!(
            metric_defs::THERMAL_ACTUAL_TEMPERATURE.name,
            &labels.to_labels()
        )
        .set(ie.actual_temperature);
        metrics::gauge!(metric_defs::THERMAL_LOWBAT.name, &labels.to_labels())
            .set(if ie.lowbat_reporting { 1.0 } else { 0.0 });
        metrics::gauge!(metric_defs::THERMAL_COMMUNICATION.name, &labels.to_labels())
            .set(if ie.communication_reporting { 1.0 } else { 0.0 });
        metrics::gauge!(metric_defs::THERMAL_WINDOW_OPEN.name, &labels.to_labels())
            .set(if ie.window_open_reporting { 1.0 } else { 0.0 });
        metrics::gauge!(metric_defs::THERMAL_BATTERY_STATE.name, &labels.to_labels())
            .set(ie.battery_state);
        metrics::gauge!(metric_defs::THERMAL_CONTROL.name, &labels.to_labels())
            .set(ie.control as u8 as f64);
        metrics::gauge!(metric_defs::THERMAL_BOOST_STATE.name, &labels.to_labels())
            .set(ie.boost_state as f64);

        *self
            .latest_info_event
            .write()
            .unwrap_or_else(|e| e.into_inner()) = Some(ie.clone());
        Ok(ie)
    }

    /// Latest decoded events, for status observation.
    pub fn most_recent_events(&self) -> Vec<Event> {
        let mut result = Vec::new();
        if let Some(we) = self
            .latest_weather_event
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
        {
            result.push(Event::Weather(we.clone()));
        }
        if let Some(tce) = self
            .latest_thermal_control_event
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
        {
            result.push(Event::ThermalControl(tce.clone()));
        }
        if let Some(ie) = self
            .latest_info_event
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
        {
            result.push(Event::ThermalInfo(ie.clone()));
        }
        result
    }

    fn encode_program_day(entries: &[ProgramEntry; ENTRIES_PER_DAY]) -> [u8; 26] {
        let mut result = [0u8; 26];

        for (i, entry) in entries.iter().enumerate() {
            let end_minutes = if entry.end_minutes == 0 {
                1440
            } else {
                entry.end_minutes
            };
            let temperature = if entry.temperature == 0.0 {
                17.0
            } else {
                entry.temperature
            };
            let e5 = end_minutes / 5;
            let t2 = (temperature * 2.0).round() as u16;
            result[2 * i] = (((e5 >> 8) & 0x01) | ((t2 & 0x3f) << 1)) as u8;
            result[2 * i + 1] = (e5 & 0xff) as u8;
        }

        result
    }

    /// Write the weekly programs into parameter memory.
    ///
    /// For each weekday, the first program whose day mask has that day's bit
    /// set is encoded at the day's slot; days no program covers are left
    /// untouched.
    pub fn set_programs(&self, mem: &mut [u8; PARAM_MEMORY_SIZE], programs: &[Program]) {
        for (day, &offset) in PROGRAM_OFFSETS.iter().enumerate() {
            if let Some(pg) = programs
                .iter()
                .find(|pg| pg.day_mask & day_bit(day as u8) != 0)
            {
                let encoded = Self::encode_program_day(&pg.entries);
                mem[offset..offset + encoded.len()].copy_from_slice(&encoded);
            }
        }
    }
}

impl std::ops::Deref for ThermalControl {
    type Target = StandardDevice;

    fn deref(&self) -> &StandardDevice {
        &self.dev
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::tests::test_sender;

    fn unit() -> ThermalControl {
        ThermalControl::new(test_sender(), [0xaa, 0xbb, 0xcc], "livingroom")
    }

    #[test]
    fn test_decode_weather_event() {
        let tc = unit();
        let we = tc
            .decode_weather_event(&[0x00, 0xfd, 0x39])
            .expect("decode should succeed");
        assert_eq!(we.temperature, 25.3);
        assert_eq!(we.humidity, 57);
    }

    #[test]
    fn test_decode_thermal_control_event() {
        let tc = unit();
        let tce = tc
            .decode_thermal_control_event(&[0xc8, 0xd7, 0x41])
            .expect("decode should succeed");
        assert_eq!(tce.set_temperature, 25.0);
        assert_eq!(tce.actual_temperature, 21.5);
        assert_eq!(tce.actual_humidity, 65.0);
    }

    #[test]
    fn test_decode_info_event() {
        let tc = unit();
        let ie = tc
            .decode_info_event(&[0x0b, 0xb0, 0xdf, 0x0e, 0x00])
            .expect("decode should succeed");
        assert_eq!(ie.set_temperature, 22.0);
        assert_eq!(ie.actual_temperature, 22.3);
        assert_eq!(ie.battery_state, 2.9);
        assert!(!ie.lowbat_reporting);
        assert!(!ie.window_open_reporting);
        assert_eq!(ie.control, ControlMode::Auto);
    }

    #[test]
    fn test_decode_rejects_wrong_lengths() {
        let tc = unit();
        assert!(tc.decode_weather_event(&[0x00, 0xfd]).is_err());
        assert!(tc.decode_thermal_control_event(&[0xc8]).is_err());
        assert!(tc.decode_info_event(&[0x0b, 0xb0, 0xdf, 0x0e]).is_err());
    }

    #[test]
    fn test_most_recent_events_accumulate_per_family() {
        let tc = unit();
        assert!(tc.most_recent_events().is_empty());
        tc.decode_weather_event(&[0x00, 0xfd, 0x39]).unwrap();
        tc.decode_weather_event(&[0x00, 0xfe, 0x38]).unwrap();
        tc.decode_thermal_control_event(&[0xc8, 0xd7, 0x41]).unwrap();
        // One slot per event family; the second weather event replaced the
        // first.
        let events = tc.most_recent_events();
        assert_eq!(events.len(), 2);
        match &events[0] {
            Event::Weather(we) => assert_eq!(we.temperature, 25.4),
            other => panic!("expected weather event, got {other:?}"),
        }
    }

    #[test]
    fn test_encode_program_day() {
        let mut entries = [ProgramEntry::default(); ENTRIES_PER_DAY];
        entries[0] = ProgramEntry {
            end_minutes: 360,
            temperature: 17.0,
        };
        entries[1] = ProgramEntry {
            end_minutes: 600,
            temperature: 22.0,
        };
        let encoded = ThermalControl::encode_program_day(&entries);

        // 360 min / 5 = 72, 17 degC * 2 = 34
        assert_eq!(encoded[0], (34 << 1) as u8);
        assert_eq!(encoded[1], 72);
        // 600 min / 5 = 120, 22 degC * 2 = 44
        assert_eq!(encoded[2], (44 << 1) as u8);
        assert_eq!(encoded[3], 120);
        // Unset entries default to end of day (1440 min / 5 = 288 = 0x120)
        // at 17 degC.
        assert_eq!(encoded[4], 0x01 | (34 << 1) as u8);
        assert_eq!(encoded[5], 0x20);
    }

    #[test]
    fn test_set_programs_places_days_at_fixed_offsets() {
        let tc = unit();
        let mut mem = [0u8; PARAM_MEMORY_SIZE];
        let weekday = Program {
            day_mask: WEEKDAY_MASK,
            entries: [ProgramEntry {
                end_minutes: 360,
                temperature: 21.0,
            }; ENTRIES_PER_DAY],
        };
        let weekend = Program {
            day_mask: WEEKEND_MASK,
            entries: [ProgramEntry {
                end_minutes: 300,
                temperature: 18.0,
            }; ENTRIES_PER_DAY],
        };
        tc.set_programs(&mut mem, &[weekday, weekend]);

        // Monday slot (offset 72) carries the weekday encoding.
        assert_eq!(mem[72], (42 << 1) as u8);
        assert_eq!(mem[73], 72);
        // Saturday slot (offset 20) and Sunday slot (offset 46) carry the
        // weekend encoding.
        for offset in [20, 46] {
            assert_eq!(mem[offset], (36 << 1) as u8);
            assert_eq!(mem[offset + 1], 60);
        }
        // Friday slot (offset 176) is the last weekday slot.
        assert_eq!(mem[176], (42 << 1) as u8);
    }

    #[test]
    fn test_set_programs_first_match_wins() {
        let tc = unit();
        let mut mem = [0u8; PARAM_MEMORY_SIZE];
        let all_days = Program {
            day_mask: 0x7f,
            entries: [ProgramEntry {
                end_minutes: 360,
                temperature: 21.0,
            }; ENTRIES_PER_DAY],
        };
        let weekend = Program {
            day_mask: WEEKEND_MASK,
            entries: [ProgramEntry {
                end_minutes: 300,
                temperature: 18.0,
            }; ENTRIES_PER_DAY],
        };
        tc.set_programs(&mut mem, &[all_days, weekend]);

        // Saturday matches both; the first program wins.
        assert_eq!(mem[20], (42 << 1) as u8);
    }
}
