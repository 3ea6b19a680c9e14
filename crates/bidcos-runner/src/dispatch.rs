//! Startup reconciliation and the packet dispatch loop.
//!
//! All serial I/O happens synchronously on the thread driving
//! [`Dispatcher::run`]; there is no pipelining. Decode failures on received
//! radio traffic are logged and skipped, session-level failures are fatal.

use std::io::{self, Read, Write};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use anyhow::{anyhow, bail, Context, Result};
use tracing::{debug, info, warn};

use bidcos_devices::heating::CLIMATE_CONTROL_RECEIVER;
use bidcos_devices::thermal::THERMAL_CONTROL_TRANSMIT;
use bidcos_devices::FullyQualifiedChannel;
use bidcos_metrics::{metric_defs, DeviceLabels};
use bidcos_packet::{
    Packet, DEVICE_INFO, INFO, POWER_EVENT, POWER_EVENT_CYCLIC, THERMAL_CONTROL_EVENT,
    WEATHER_EVENT,
};
use bidcos_uartgw::{AppCommand, Command, GatewayError, UartGateway};

use crate::config::Config;
use crate::registry::{Device, Registry};

/// How often the coprocessor clock is re-synchronized.
const TIME_SYNC_INTERVAL: Duration = Duration::from_secs(3600);

/// Owns the gateway session and routes incoming radio traffic to the
/// configured devices.
pub struct Dispatcher<P> {
    gateway: Arc<Mutex<UartGateway<P>>>,
    registry: Registry,
    utc_offset_secs: i32,
    last_time_sync: Instant,
}

impl<P: Read + Write + Send> Dispatcher<P> {
    pub fn new(
        gateway: Arc<Mutex<UartGateway<P>>>,
        registry: Registry,
        utc_offset_secs: i32,
    ) -> Self {
        Dispatcher {
            gateway,
            registry,
            utc_offset_secs,
            last_time_sync: Instant::now(),
        }
    }

    fn gateway(&self) -> Result<std::sync::MutexGuard<'_, UartGateway<P>>> {
        self.gateway
            .lock()
            .map_err(|_| anyhow!("gateway lock poisoned"))
    }

    /// Bring coprocessor and devices in line with the configuration:
    /// register every device as a radio peer, apply weekly programs and
    /// apply the configured peerings in both directions.
    pub fn reconcile(&self, config: &Config) -> Result<()> {
        for device in self.registry.devices() {
            let sd = device.standard();
            info!(addr = %sd.addr_hex(), "registering radio peer");
            self.gateway()?.add_peer(sd.addr(), sd.channels())?;
        }

        for programs in &config.programs {
            let tc = self
                .registry
                .thermal_by_serial(&programs.device)
                .ok_or_else(|| {
                    anyhow!("device {:?} is not a wall thermostat", programs.device)
                })?;
            info!(device = %tc.addr_hex(), "applying weekly programs");
            let progs = programs.to_programs();
            tc.ensure_configured(0, 7, |mem| tc.set_programs(mem, &progs))
                .with_context(|| format!("configuring programs of {}", tc.addr_hex()))?;
        }

        for peering in &config.peerings {
            let wall = self
                .registry
                .thermal_by_serial(&peering.wall)
                .ok_or_else(|| anyhow!("device {:?} is not a wall thermostat", peering.wall))?;
            let heating = self
                .registry
                .thermostat_by_serial(&peering.heating)
                .ok_or_else(|| {
                    anyhow!("device {:?} is not a heating thermostat", peering.heating)
                })?;

            info!(wall = %wall.addr_hex(), heating = %heating.addr_hex(), "ensuring peering");
            wall.ensure_peered_with(
                THERMAL_CONTROL_TRANSMIT,
                FullyQualifiedChannel {
                    peer: heating.addr(),
                    channel: CLIMATE_CONTROL_RECEIVER,
                },
            )
            .with_context(|| format!("peering {} with {}", wall.addr_hex(), heating.addr_hex()))?;
            heating
                .ensure_peered_with(
                    CLIMATE_CONTROL_RECEIVER,
                    FullyQualifiedChannel {
                        peer: wall.addr(),
                        channel: THERMAL_CONTROL_TRANSMIT,
                    },
                )
                .with_context(|| {
                    format!("peering {} with {}", heating.addr_hex(), wall.addr_hex())
                })?;
        }

        Ok(())
    }

    /// Run the dispatch loop. Only returns on a fatal session error.
    pub fn run(mut self) -> Result<()> {
        info!("entering radio packet handling main loop");
        loop {
            self.maybe_sync_time()?;

            let pkt = match self.gateway()?.read_packet() {
                Ok(pkt) => pkt,
                Err(GatewayError::Io(e)) if e.kind() == io::ErrorKind::TimedOut => {
                    debug!("read deadline elapsed without traffic");
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            if pkt.cmd != Command::App(AppCommand::Recv) {
                bail!("unexpected gateway command {:?}, want AppRecv", pkt.cmd);
            }

            let bpkt = match Packet::decode(&pkt.payload) {
                Ok(bpkt) => bpkt,
                Err(e) => {
                    warn!(error = %e, "skipping invalid radio packet");
                    continue;
                }
            };

            let Some(device) = self.registry.by_addr(bpkt.source) else {
                debug!(
                    source = %hex::encode(bpkt.source),
                    "ignoring packet from unknown device"
                );
                continue;
            };
            let device = device.clone();

            let sd = device.standard();
            let labels = DeviceLabels::new(sd.addr_hex(), sd.name());
            let now = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs_f64())
                .unwrap_or(0.0);
            metrics::gauge!(metric_defs::LAST_CONTACT.name, &labels.to_labels()).set(now);

            match bpkt.cmd {
                WEATHER_EVENT | THERMAL_CONTROL_EVENT | POWER_EVENT | POWER_EVENT_CYCLIC
                | INFO => {
                    Self::route_event(&device, &bpkt);
                }

                DEVICE_INFO => {
                    self.handle_pairing_request(&bpkt)?;
                }

                other => {
                    debug!(
                        cmd = format_args!("{other:#04x}"),
                        source = %sd.addr_hex(),
                        "unhandled radio command"
                    );
                }
            }
        }
    }

    /// Route an event payload to the decoder matching the device family.
    fn route_event(device: &Device, bpkt: &Packet) {
        let sd = device.standard();
        let counted = |kind: &'static str| {
            metrics::counter!(
                metric_defs::PACKETS_DECODED.name,
                &vec![("type", kind.to_string())]
            )
            .increment(1);
        };

        match (bpkt.cmd, device) {
            (WEATHER_EVENT, Device::ThermalControl(tc)) => {
                match tc.decode_weather_event(&bpkt.payload) {
                    Ok(we) => {
                        debug!(device = %sd.name(), %we, "weather event");
                        counted("thermal_weather_event");
                    }
                    Err(e) => warn!(device = %sd.addr_hex(), error = %e, "decoding weather event"),
                }
            }

            (THERMAL_CONTROL_EVENT, Device::ThermalControl(tc)) => {
                match tc.decode_thermal_control_event(&bpkt.payload) {
                    Ok(tce) => {
                        debug!(device = %sd.name(), %tce, "thermal control event");
                        counted("thermal_control_event");
                    }
                    Err(e) => {
                        warn!(device = %sd.addr_hex(), error = %e, "decoding thermal control event")
                    }
                }
            }

            (POWER_EVENT | POWER_EVENT_CYCLIC, Device::PowerSwitch(ps)) => {
                match ps.decode_power_event(&bpkt.payload) {
                    Ok(pe) => {
                        debug!(device = %sd.name(), %pe, "power event");
                        counted("power_event");
                    }
                    Err(e) => warn!(device = %sd.addr_hex(), error = %e, "decoding power event"),
                }
            }

            (INFO, Device::ThermalControl(tc)) => match tc.decode_info_event(&bpkt.payload) {
                Ok(ie) => {
                    debug!(device = %sd.name(), %ie, "thermal info event");
                    counted("thermal_info_event");
                }
                Err(e) => warn!(device = %sd.addr_hex(), error = %e, "decoding info event"),
            },

            (INFO, Device::Thermostat(ts)) => match ts.decode_info_event(&bpkt.payload) {
                Ok(ie) => {
                    debug!(device = %sd.name(), %ie, "heating info event");
                    counted("heating_info_event");
                }
                Err(e) => warn!(device = %sd.addr_hex(), error = %e, "decoding info event"),
            },

            _ => {
                warn!(
                    cmd = format_args!("{:#04x}", bpkt.cmd),
                    device = %sd.addr_hex(),
                    "ignoring event from unexpected device family"
                );
            }
        }
    }

    /// Answer a pairing request seen on the wire.
    ///
    /// The announcement carries firmware version, device type and the
    /// ten-character serial. Only serials present in the inventory whose
    /// source address matches are answered.
    fn handle_pairing_request(&self, bpkt: &Packet) -> Result<()> {
        let p = &bpkt.payload;
        if p.len() < 13 {
            warn!(got = p.len(), "unexpectedly short pairing request payload");
            return Ok(());
        }
        let firmware = p[0];
        let device_type = u16::from_be_bytes([p[1], p[2]]);
        let serial = String::from_utf8_lossy(&p[3..13]).into_owned();
        info!(
            firmware = format_args!("{firmware:#04x}"),
            device_type,
            serial = %serial,
            "pairing request"
        );

        let Some(device) = self.registry.by_serial(&serial) else {
            warn!(serial = %serial, "serial not configured, not replying to pairing request");
            return Ok(());
        };

        match self.registry.by_addr(bpkt.source) {
            Some(d) if Arc::ptr_eq(d, device) => {}
            _ => {
                warn!(
                    serial = %serial,
                    source = %hex::encode(bpkt.source),
                    "device uses unconfigured radio address, not replying to pairing request"
                );
                return Ok(());
            }
        }

        let sd = device.standard();
        self.gateway()?.add_peer(sd.addr(), sd.channels())?;

        info!(serial = %serial, "peer added, starting config");
        device.pair()?;
        Ok(())
    }

    fn maybe_sync_time(&mut self) -> Result<()> {
        if self.last_time_sync.elapsed() < TIME_SYNC_INTERVAL {
            return Ok(());
        }
        self.gateway()?
            .set_time(SystemTime::now(), self.utc_offset_secs)
            .context("setting time")?;
        self.last_time_sync = Instant::now();
        Ok(())
    }
}
