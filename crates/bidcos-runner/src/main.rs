//! BidCoS controller daemon.
//!
//! Opens the serial port to the UARTGW radio coprocessor (which is expected
//! to have just been reset externally), initializes the session, reconciles
//! configuration and peerings, and then dispatches incoming radio traffic to
//! the configured devices.

mod config;
mod dispatch;
mod registry;

use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use anyhow::{anyhow, bail, Context, Result};
use serialport::{DataBits, FlowControl, Parity, StopBits};
use tracing::info;
use tracing_subscriber::EnvFilter;

use bidcos_metrics::describe_metrics;
use bidcos_packet::Sender;
use bidcos_uartgw::UartGateway;

use crate::config::Config;
use crate::dispatch::Dispatcher;
use crate::registry::Registry;

const BAUD_RATE: u32 = 115_200;

/// The protocol has no per-frame deadline; the port read timeout only bounds
/// how long the dispatch loop can sit idle between clock syncs.
const READ_TIMEOUT: Duration = Duration::from_secs(3600);

struct Flags {
    serial_port: String,
    config: String,
}

fn parse_flags() -> Result<Flags> {
    let mut flags = Flags {
        serial_port: "/dev/ttyAMA0".to_string(),
        config: "/etc/bidcosd.json".to_string(),
    };

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--serial-port" => {
                flags.serial_port = args
                    .next()
                    .ok_or_else(|| anyhow!("--serial-port needs a value"))?;
            }
            "--config" => {
                flags.config = args.next().ok_or_else(|| anyhow!("--config needs a value"))?;
            }
            other => bail!("unknown flag {other:?}"),
        }
    }

    Ok(flags)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let flags = parse_flags()?;
    let config = Config::load(&flags.config)
        .with_context(|| format!("loading configuration from {}", flags.config))?;

    describe_metrics();

    info!(port = %flags.serial_port, "opening serial port");
    let port = serialport::new(&flags.serial_port, BAUD_RATE)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .flow_control(FlowControl::None)
        .timeout(READ_TIMEOUT)
        .open()
        .with_context(|| format!("opening serial port {}", flags.serial_port))?;

    let gw = UartGateway::new(port, config.hmid.0, SystemTime::now(), config.utc_offset_secs())
        .context("initializing gateway session")?;
    info!(
        serial = %gw.serial_number(),
        firmware = %gw.firmware_version(),
        "initialized UARTGW"
    );

    let gateway = Arc::new(Mutex::new(gw));
    let sender = Arc::new(Sender::new(Box::new(gateway.clone()), config.hmid.0));
    let registry = Registry::from_config(&config, &sender);

    let dispatcher = Dispatcher::new(gateway, registry, config.utc_offset_secs());
    dispatcher.reconcile(&config)?;
    dispatcher.run()
}
