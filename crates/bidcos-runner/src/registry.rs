//! Device registry.
//!
//! Devices are created once at startup from the configuration and never
//! destroyed; the registry resolves them by radio address (for incoming
//! packets) and by serial (for pairing requests).

use std::collections::HashMap;
use std::sync::Arc;

use bidcos_devices::heating::Thermostat;
use bidcos_devices::power::PowerSwitch;
use bidcos_devices::thermal::ThermalControl;
use bidcos_devices::{DeviceError, Event, StandardDevice};
use bidcos_packet::Sender;

use crate::config::{Config, DeviceKind};

/// A configured radio device of any supported family.
pub enum Device {
    Thermostat(Thermostat),
    ThermalControl(ThermalControl),
    PowerSwitch(PowerSwitch),
}

impl Device {
    /// The shared device core.
    pub fn standard(&self) -> &StandardDevice {
        match self {
            Device::Thermostat(d) => d,
            Device::ThermalControl(d) => d,
            Device::PowerSwitch(d) => d,
        }
    }

    /// Answer a pairing request.
    pub fn pair(&self) -> Result<(), DeviceError> {
        self.standard().pair()
    }

    /// Latest decoded events, for status observation.
    pub fn most_recent_events(&self) -> Vec<Event> {
        match self {
            Device::Thermostat(d) => d.most_recent_events(),
            Device::ThermalControl(d) => d.most_recent_events(),
            Device::PowerSwitch(d) => d.most_recent_events(),
        }
    }
}

/// All configured devices, indexed by address and serial.
pub struct Registry {
    by_addr: HashMap<[u8; 3], Arc<Device>>,
    by_serial: HashMap<String, Arc<Device>>,
}

impl Registry {
    /// Instantiate every configured device.
    pub fn from_config(config: &Config, sender: &Arc<Sender>) -> Registry {
        let mut by_addr = HashMap::new();
        let mut by_serial = HashMap::new();

        for dc in &config.devices {
            let device = Arc::new(match dc.kind {
                DeviceKind::Heating => Device::Thermostat(Thermostat::new(
                    sender.clone(),
                    dc.address.0,
                    dc.name.clone(),
                )),
                DeviceKind::Thermal => Device::ThermalControl(ThermalControl::new(
                    sender.clone(),
                    dc.address.0,
                    dc.name.clone(),
                )),
                DeviceKind::Power => Device::PowerSwitch(PowerSwitch::new(
                    sender.clone(),
                    dc.address.0,
                    dc.name.clone(),
                )),
            });
            by_addr.insert(dc.address.0, device.clone());
            by_serial.insert(dc.serial.clone(), device);
        }

        Registry { by_addr, by_serial }
    }

    pub fn by_addr(&self, addr: [u8; 3]) -> Option<&Arc<Device>> {
        self.by_addr.get(&addr)
    }

    pub fn by_serial(&self, serial: &str) -> Option<&Arc<Device>> {
        self.by_serial.get(serial)
    }

    /// All devices, in no particular order.
    pub fn devices(&self) -> impl Iterator<Item = &Arc<Device>> {
        self.by_addr.values()
    }

    /// The wall thermostat with the given serial, if configured as one.
    pub fn thermal_by_serial(&self, serial: &str) -> Option<&ThermalControl> {
        match self.by_serial(serial).map(Arc::as_ref) {
            Some(Device::ThermalControl(tc)) => Some(tc),
            _ => None,
        }
    }

    /// The heating thermostat with the given serial, if configured as one.
    pub fn thermostat_by_serial(&self, serial: &str) -> Option<&Thermostat> {
        match self.by_serial(serial).map(Arc::as_ref) {
            Some(Device::Thermostat(ts)) => Some(ts),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use bidcos_packet::Gateway;
    use bidcos_uartgw::GatewayError;

    struct NullGateway;

    impl Gateway for NullGateway {
        fn send(&mut self, _payload: &[u8]) -> Result<(), GatewayError> {
            Ok(())
        }
        fn receive(&mut self) -> Result<Vec<u8>, GatewayError> {
            Err(GatewayError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "reading not supported",
            )))
        }
        fn confirm(&mut self) -> Result<(), GatewayError> {
            Ok(())
        }
    }

    fn sample_registry() -> Registry {
        let config: Config = serde_json::from_str(
            r#"{
                "hmid": "fdb02c",
                "devices": [
                    { "kind": "thermal", "address": "390f17", "serial": "MEQ0090662", "name": "Bathroom" },
                    { "kind": "heating", "address": "38e6e9", "serial": "MEQ0058671", "name": "Bathroom" },
                    { "kind": "power", "address": "40c2a8", "serial": "MEQ1341845", "name": "avr" }
                ]
            }"#,
        )
        .unwrap();
        let sender = Arc::new(Sender::new(
            Box::new(Arc::new(Mutex::new(NullGateway))),
            [0xfd, 0xb0, 0x2c],
        ));
        Registry::from_config(&config, &sender)
    }

    #[test]
    fn test_lookup_by_addr_and_serial() {
        let registry = sample_registry();

        let by_addr = registry.by_addr([0x39, 0x0f, 0x17]).expect("should exist");
        let by_serial = registry.by_serial("MEQ0090662").expect("should exist");
        assert!(Arc::ptr_eq(by_addr, by_serial));
        assert_eq!(by_addr.standard().name(), "Bathroom");

        assert!(registry.by_addr([0x00, 0x00, 0x00]).is_none());
        assert!(registry.by_serial("MEQ9999999").is_none());
    }

    #[test]
    fn test_kind_specific_lookups() {
        let registry = sample_registry();

        assert!(registry.thermal_by_serial("MEQ0090662").is_some());
        assert!(registry.thermal_by_serial("MEQ0058671").is_none());
        assert!(registry.thermostat_by_serial("MEQ0058671").is_some());
        assert!(registry.thermostat_by_serial("MEQ1341845").is_none());
    }

    #[test]
    fn test_channel_counts_per_family() {
        let registry = sample_registry();

        assert_eq!(
            registry.by_serial("MEQ0090662").unwrap().standard().channels(),
            7
        );
        assert_eq!(
            registry.by_serial("MEQ0058671").unwrap().standard().channels(),
            6
        );
        assert_eq!(
            registry.by_serial("MEQ1341845").unwrap().standard().channels(),
            6
        );
    }
}
