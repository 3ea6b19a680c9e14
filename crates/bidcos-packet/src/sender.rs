//! The gateway seam and the send/confirm wrapper.

use std::io::{Read, Write};
use std::sync::{Arc, Mutex};

use bidcos_uartgw::{GatewayError, UartGateway};

use crate::codec::Packet;
use crate::error::PacketError;

/// Transport for BidCoS payloads.
///
/// Implemented by the UARTGW session; tests substitute scripted
/// implementations.
pub trait Gateway: Send {
    /// Hand a radio payload over for transmission.
    fn send(&mut self, payload: &[u8]) -> Result<(), GatewayError>;

    /// Block until the next radio payload arrives.
    fn receive(&mut self) -> Result<Vec<u8>, GatewayError>;

    /// Block until the transmission of the last sent payload is acknowledged.
    fn confirm(&mut self) -> Result<(), GatewayError>;
}

impl<P: Read + Write + Send> Gateway for UartGateway<P> {
    fn send(&mut self, payload: &[u8]) -> Result<(), GatewayError> {
        self.app_send(payload)
    }

    fn receive(&mut self) -> Result<Vec<u8>, GatewayError> {
        self.read_radio()
    }

    fn confirm(&mut self) -> Result<(), GatewayError> {
        UartGateway::confirm(self)
    }
}

/// Shared-gateway passthrough, so the dispatch loop and the sender can use
/// the same session.
impl<G: Gateway> Gateway for Arc<Mutex<G>> {
    fn send(&mut self, payload: &[u8]) -> Result<(), GatewayError> {
        self.lock().map_err(|_| GatewayError::PoisonedLock)?.send(payload)
    }

    fn receive(&mut self) -> Result<Vec<u8>, GatewayError> {
        self.lock().map_err(|_| GatewayError::PoisonedLock)?.receive()
    }

    fn confirm(&mut self) -> Result<(), GatewayError> {
        self.lock().map_err(|_| GatewayError::PoisonedLock)?.confirm()
    }
}

/// Convenience wrapper around a [`Gateway`] which fills in the BidCoS source
/// address for outgoing packets, automatically confirms outgoing packets and
/// decodes incoming packets.
///
/// The rolling message counter lives here, guarded by a mutex.
pub struct Sender {
    addr: [u8; 3],
    counter: Mutex<u8>,
    gateway: Mutex<Box<dyn Gateway>>,
}

impl Sender {
    pub fn new(gateway: Box<dyn Gateway>, addr: [u8; 3]) -> Sender {
        Sender {
            addr,
            counter: Mutex::new(0),
            gateway: Mutex::new(gateway),
        }
    }

    /// The controller address stamped onto outgoing packets.
    pub fn addr(&self) -> [u8; 3] {
        self.addr
    }

    /// Send a packet and wait for the coprocessor acknowledgement.
    pub fn write_packet(&self, mut pkt: Packet) -> Result<(), PacketError> {
        pkt.source = self.addr;
        let encoded = {
            let mut counter = self
                .counter
                .lock()
                .map_err(|_| GatewayError::PoisonedLock)?;
            pkt.encode(&mut counter)
        };

        let mut gw = self
            .gateway
            .lock()
            .map_err(|_| GatewayError::PoisonedLock)?;
        gw.send(&encoded)?;
        gw.confirm()?;
        Ok(())
    }

    /// Read and decode the next incoming packet.
    pub fn read_packet(&self) -> Result<Packet, PacketError> {
        let payload = self
            .gateway
            .lock()
            .map_err(|_| GatewayError::PoisonedLock)?
            .receive()?;
        Packet::decode(&payload)
    }
}
