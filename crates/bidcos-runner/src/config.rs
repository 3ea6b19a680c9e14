//! Controller configuration.
//!
//! The device inventory, desired peerings and weekly heating programs are
//! read from a JSON file, so the daemon carries no hard-coded device list.
//!
//! ```json
//! {
//!   "hmid": "fdb02c",
//!   "utc_offset_minutes": 60,
//!   "devices": [
//!     { "kind": "thermal", "address": "390f17", "serial": "MEQ0090662", "name": "Bathroom" },
//!     { "kind": "heating", "address": "38e6e9", "serial": "MEQ0058671", "name": "Bathroom" }
//!   ],
//!   "peerings": [
//!     { "wall": "MEQ0090662", "heating": "MEQ0058671" }
//!   ],
//!   "programs": [
//!     {
//!       "device": "MEQ0090662",
//!       "programs": [
//!         {
//!           "day_mask": 62,
//!           "entries": [
//!             { "end_minutes": 360, "temperature": 17.0 },
//!             { "end_minutes": 1380, "temperature": 22.0 }
//!           ]
//!         }
//!       ]
//!     }
//!   ]
//! }
//! ```

use std::fmt;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use bidcos_devices::thermal::{Program, ProgramEntry, ENTRIES_PER_DAY};

/// Errors that can occur loading the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("device {device:?} declares {got} switch points, at most {max} are supported")]
    TooManySwitchPoints {
        device: String,
        got: usize,
        max: usize,
    },

    #[error("{what} {serial:?} does not name a configured device")]
    UnknownSerial { what: &'static str, serial: String },
}

/// A three-byte radio address, written as six hex digits in the config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Addr(pub [u8; 3]);

impl<'de> Deserialize<'de> for Addr {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(&s).map_err(serde::de::Error::custom)?;
        let bytes: [u8; 3] = bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom(format!("address {s:?} is not 3 bytes")))?;
        Ok(Addr(bytes))
    }
}

impl fmt::Display for Addr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// Supported device families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    /// Heating valve thermostat.
    Heating,
    /// Wall thermostat / climate sensor.
    Thermal,
    /// Mains power switch.
    Power,
}

/// One entry of the device inventory.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeviceConfig {
    pub kind: DeviceKind,
    pub address: Addr,
    /// Device serial, as printed on the label and announced in pairing
    /// requests.
    pub serial: String,
    /// Human-readable name.
    pub name: String,
}

/// A desired wall-thermostat/heating-thermostat peering, by serial.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PeeringConfig {
    /// Serial of the wall thermostat.
    pub wall: String,
    /// Serial of the heating thermostat.
    pub heating: String,
}

/// A switch point of a weekly program.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SwitchPoint {
    /// End time in minutes since midnight.
    pub end_minutes: u16,
    /// Temperature in degC.
    pub temperature: f64,
}

/// A program covering the days in `day_mask`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProgramConfig {
    /// Bit `d` selects weekday `d`, Sunday = 0.
    pub day_mask: u8,
    pub entries: Vec<SwitchPoint>,
}

/// Weekly programs for one wall thermostat.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeviceProgramsConfig {
    /// Serial of the wall thermostat.
    pub device: String,
    pub programs: Vec<ProgramConfig>,
}

/// Controller configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// The controller's radio identity.
    pub hmid: Addr,
    /// Local timezone offset, announced to the coprocessor clock.
    #[serde(default)]
    pub utc_offset_minutes: i32,
    pub devices: Vec<DeviceConfig>,
    #[serde(default)]
    pub peerings: Vec<PeeringConfig>,
    #[serde(default)]
    pub programs: Vec<DeviceProgramsConfig>,
}

impl Config {
    /// Load and validate a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let known = |serial: &str| self.devices.iter().any(|d| d.serial == serial);

        for peering in &self.peerings {
            for (what, serial) in [("wall", &peering.wall), ("heating", &peering.heating)] {
                if !known(serial) {
                    return Err(ConfigError::UnknownSerial {
                        what,
                        serial: serial.clone(),
                    });
                }
            }
        }

        for programs in &self.programs {
            if !known(&programs.device) {
                return Err(ConfigError::UnknownSerial {
                    what: "program device",
                    serial: programs.device.clone(),
                });
            }
            for program in &programs.programs {
                if program.entries.len() > ENTRIES_PER_DAY {
                    return Err(ConfigError::TooManySwitchPoints {
                        device: programs.device.clone(),
                        got: program.entries.len(),
                        max: ENTRIES_PER_DAY,
                    });
                }
            }
        }

        Ok(())
    }

    /// UTC offset in seconds, as expected by the clock sync.
    pub fn utc_offset_secs(&self) -> i32 {
        self.utc_offset_minutes * 60
    }
}

impl DeviceProgramsConfig {
    /// Convert the configured programs into the device encoding input.
    pub fn to_programs(&self) -> Vec<Program> {
        self.programs
            .iter()
            .map(|pc| {
                let mut entries = [ProgramEntry::default(); ENTRIES_PER_DAY];
                for (slot, point) in entries.iter_mut().zip(&pc.entries) {
                    *slot = ProgramEntry {
                        end_minutes: point.end_minutes,
                        temperature: point.temperature,
                    };
                }
                Program {
                    day_mask: pc.day_mask,
                    entries,
                }
            })
            .collect()
    }
}
