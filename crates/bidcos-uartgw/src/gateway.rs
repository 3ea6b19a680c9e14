//! UARTGW session management and frame I/O.

use std::io::{Read, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use bytes::BufMut;
use crc::{Algorithm, Crc};
use tracing::{debug, warn};

use crate::commands::{AppCommand, Command, Destination, DeviceState, OsCommand};
use crate::error::GatewayError;
use crate::escaping::{EscapingWriter, UnescapingReader, FRAME_DELIMITER};

/// CRC16 parameters used by the UARTGW framing.
const CRC_PARAMS: Algorithm<u16> = Algorithm {
    width: 16,
    poly: 0x8005,
    init: 0xd77f,
    refin: false,
    refout: false,
    xorout: 0x0000,
    check: 0x0000,
    residue: 0x0000,
};

const CRC16: Crc<u16> = Crc::<u16>::new(&CRC_PARAMS);

/// Banner announced by the coprocessor bootloader after a reset.
const BANNER_BOOTLOADER: &str = "Co_CPU_BL";
/// Banner announced once the coprocessor runs its application code.
const BANNER_APP: &str = "Co_CPU_App";

/// The radio key installed during session initialization, with its key
/// index. Encrypted peering is not used, so this is a fixed literal.
const CURRENT_KEY: [u8; 17] = [
    0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88, 0x99, 0xaa, 0xbb, 0xcc, 0xdd, 0xee,
    0xff, 0x02,
];

/// A packet exchanged with the UARTGW coprocessor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UartPacket {
    /// Packet destination.
    pub dst: Destination,
    /// Per-session message counter. Assigned by the session on write.
    pub msgcnt: u8,
    /// Command, interpreted relative to the device state.
    pub cmd: Command,
    /// Command payload.
    pub payload: Vec<u8>,
}

impl UartPacket {
    fn new(dst: Destination, cmd: Command, payload: Vec<u8>) -> Self {
        UartPacket {
            dst,
            msgcnt: 0,
            cmd,
            payload,
        }
    }
}

/// A session with the UARTGW radio coprocessor.
///
/// [`UartGateway::new`] expects the coprocessor to have just been reset and
/// drives the fixed initialization sequence: bootloader handoff, firmware and
/// serial readout, CSMA/CA, clock, radio key and HMID configuration. Any
/// unexpected reply terminates initialization with an error.
pub struct UartGateway<P> {
    port: P,
    hmid: [u8; 3],
    msgcnt: u8,
    state: DeviceState,
    firmware_version: String,
    serial_number: String,
}

impl<P: Read + Write> UartGateway<P> {
    /// Initialize a freshly reset coprocessor attached to `port`.
    ///
    /// `utc_offset_secs` is the local timezone offset applied in the clock
    /// synchronization step.
    pub fn new(
        port: P,
        hmid: [u8; 3],
        now: SystemTime,
        utc_offset_secs: i32,
    ) -> Result<Self, GatewayError> {
        let mut gw = UartGateway {
            port,
            hmid,
            msgcnt: 0,
            state: DeviceState::Os,
            firmware_version: String::new(),
            serial_number: String::new(),
        };
        gw.init(now, utc_offset_secs)?;
        Ok(gw)
    }

    /// Firmware version as reported during initialization.
    pub fn firmware_version(&self) -> &str {
        &self.firmware_version
    }

    /// Serial number as reported during initialization.
    pub fn serial_number(&self) -> &str {
        &self.serial_number
    }

    /// The controller's BidCoS identity.
    pub fn hmid(&self) -> [u8; 3] {
        self.hmid
    }

    /// Read one frame, verify its checksum and decode the packet.
    ///
    /// Bytes preceding the frame delimiter are skipped; this is how the
    /// reader re-synchronizes after invalid data.
    pub fn read_packet(&mut self) -> Result<UartPacket, GatewayError> {
        let mut r = UnescapingReader::new(&mut self.port);

        loop {
            let mut b = [0u8; 1];
            r.read_exact(&mut b)?;
            if b[0] != FRAME_DELIMITER {
                warn!(byte = format_args!("{:#04x}", b[0]), "skipping non-frame-delimiter byte");
                continue;
            }

            // CRC input: delimiter, length, body (unescaped).
            let mut full = Vec::with_capacity(64);
            full.push(FRAME_DELIMITER);

            let mut lenb = [0u8; 2];
            r.read_exact(&mut lenb)?;
            full.extend_from_slice(&lenb);
            let length = u16::from_be_bytes(lenb) as usize;

            let mut body = vec![0u8; length];
            r.read_exact(&mut body)?;
            full.extend_from_slice(&body);

            let want = CRC16.checksum(&full);
            let mut crcb = [0u8; 2];
            r.read_exact(&mut crcb)?;
            let got = u16::from_be_bytes(crcb);
            if got != want {
                return Err(GatewayError::ChecksumMismatch { got, want });
            }

            if body.len() < 3 {
                return Err(GatewayError::ShortFrame(body.len()));
            }
            let cmd = Command::decode(self.state, body[2])?;
            return Ok(UartPacket {
                dst: Destination::try_from(body[0])?,
                msgcnt: body[1],
                cmd,
                payload: body[3..].to_vec(),
            });
        }
    }

    /// Frame, escape and write a packet, advancing the session counter.
    pub fn write_packet(&mut self, pkt: &UartPacket) -> Result<(), GatewayError> {
        let cmd = pkt.cmd.byte()?;

        // Assemble the unescaped frame for CRC computation.
        let mut full = Vec::with_capacity(6 + pkt.payload.len());
        full.push(FRAME_DELIMITER);
        full.put_u16(3 + pkt.payload.len() as u16);
        full.push(pkt.dst.into());
        full.push(self.msgcnt);
        full.push(cmd);
        full.extend_from_slice(&pkt.payload);
        let crc = CRC16.checksum(&full);

        // The delimiter itself goes out unescaped; everything after it is
        // escaped, including the CRC.
        self.port.write_all(&[FRAME_DELIMITER])?;
        let mut esc = EscapingWriter::new(&mut self.port);
        esc.write_all(&full[1..])?;
        esc.write_all(&crc.to_be_bytes())?;
        esc.flush()?;

        self.msgcnt = self.msgcnt.wrapping_add(1);
        Ok(())
    }

    fn expect_cmd(pkt: &UartPacket, want: Command) -> Result<(), GatewayError> {
        if pkt.cmd != want {
            return Err(GatewayError::UnexpectedCommand { got: pkt.cmd, want });
        }
        Ok(())
    }

    fn read_expecting(&mut self, want: Command) -> Result<UartPacket, GatewayError> {
        let pkt = self.read_packet()?;
        Self::expect_cmd(&pkt, want)?;
        Ok(pkt)
    }

    fn expect_banner(pkt: &UartPacket, want: &'static str) -> Result<(), GatewayError> {
        if pkt.payload != want.as_bytes() {
            return Err(GatewayError::UnexpectedBanner {
                got: String::from_utf8_lossy(&pkt.payload).into_owned(),
                want,
            });
        }
        Ok(())
    }

    fn init(&mut self, now: SystemTime, utc_offset_secs: i32) -> Result<(), GatewayError> {
        // The bootloader announces itself unsolicited after the reset.
        let pkt = self.read_expecting(Command::Os(OsCommand::GetApp))?;
        Self::expect_banner(&pkt, BANNER_BOOTLOADER)?;

        self.switch_to_app()?;
        self.get_firmware_version()?;
        self.enable_csmaca()?;
        self.get_serial_number()?;
        self.set_time(now, utc_offset_secs)?;
        self.set_current_key()?;
        self.set_hmid()?;

        Ok(())
    }

    /// Switch from bootloader to application code.
    fn switch_to_app(&mut self) -> Result<(), GatewayError> {
        self.write_packet(&UartPacket::new(
            Destination::Os,
            Command::Os(OsCommand::ChangeApp),
            Vec::new(),
        ))?;

        self.read_expecting(Command::Os(OsCommand::Ack))?;

        // The application code announces itself just like the bootloader did.
        let pkt = self.read_expecting(Command::Os(OsCommand::GetApp))?;
        Self::expect_banner(&pkt, BANNER_APP)?;

        self.state = DeviceState::App;
        Ok(())
    }

    fn get_firmware_version(&mut self) -> Result<(), GatewayError> {
        self.write_packet(&UartPacket::new(
            Destination::Os,
            Command::Os(OsCommand::GetFirmware),
            Vec::new(),
        ))?;

        let pkt = self.read_expecting(Command::App(AppCommand::Ack))?;
        if pkt.payload.len() < 7 {
            return Err(GatewayError::ShortPayload {
                what: "firmware version",
                got: pkt.payload.len(),
                want: 7,
            });
        }
        let v = &pkt.payload[4..];
        self.firmware_version = format!("{}.{}.{}", v[0], v[1], v[2]);
        Ok(())
    }

    /// Enable carrier sense multiple access with collision avoidance.
    fn enable_csmaca(&mut self) -> Result<(), GatewayError> {
        self.write_packet(&UartPacket::new(
            Destination::Os,
            Command::Os(OsCommand::EnableCsmaCa),
            vec![0x01],
        ))?;

        self.read_expecting(Command::App(AppCommand::Ack))?;
        Ok(())
    }

    fn get_serial_number(&mut self) -> Result<(), GatewayError> {
        self.write_packet(&UartPacket::new(
            Destination::Os,
            Command::Os(OsCommand::GetSerial),
            Vec::new(),
        ))?;

        let pkt = self.read_expecting(Command::App(AppCommand::Ack))?;
        if pkt.payload.is_empty() {
            return Err(GatewayError::ShortPayload {
                what: "serial number",
                got: 0,
                want: 1,
            });
        }
        self.serial_number = String::from_utf8_lossy(&pkt.payload[1..]).into_owned();
        Ok(())
    }

    /// Synchronize the coprocessor clock.
    ///
    /// The payload carries seconds since the epoch followed by the timezone
    /// offset in units of half hours.
    pub fn set_time(
        &mut self,
        now: SystemTime,
        utc_offset_secs: i32,
    ) -> Result<(), GatewayError> {
        let secs = now
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as u32)
            .unwrap_or(0);
        let mut payload = Vec::with_capacity(5);
        payload.put_u32(secs);
        payload.push((utc_offset_secs / 1800) as u8);
        self.write_packet(&UartPacket::new(
            Destination::Os,
            Command::Os(OsCommand::SetTime),
            payload,
        ))?;

        self.read_expecting(Command::App(AppCommand::Ack))?;
        Ok(())
    }

    fn set_current_key(&mut self) -> Result<(), GatewayError> {
        self.write_packet(&UartPacket::new(
            Destination::App,
            Command::App(AppCommand::SetCurrentKey),
            CURRENT_KEY.to_vec(),
        ))?;

        self.read_expecting(Command::App(AppCommand::Ack))?;
        Ok(())
    }

    fn set_hmid(&mut self) -> Result<(), GatewayError> {
        self.write_packet(&UartPacket::new(
            Destination::App,
            Command::App(AppCommand::SetHmid),
            self.hmid.to_vec(),
        ))?;

        self.read_expecting(Command::App(AppCommand::Ack))?;
        Ok(())
    }

    /// Register a radio peer with the coprocessor.
    ///
    /// The exchange is deliberately redundant: the vendor CCU adds the peer
    /// twice, strips per-channel AES, then adds it twice more (the last
    /// exchange carrying key index 0 / no wake-up). Kept as observed.
    pub fn add_peer(&mut self, addr: [u8; 3], channels: usize) -> Result<(), GatewayError> {
        let add_payload = vec![addr[0], addr[1], addr[2], 0x00, 0x00, 0x00];

        for _ in 0..2 {
            self.write_packet(&UartPacket::new(
                Destination::App,
                Command::App(AppCommand::AddPeer),
                add_payload.clone(),
            ))?;
            self.read_expecting(Command::App(AppCommand::Ack))?;
        }

        let mut remove_aes = Vec::with_capacity(3 + channels);
        remove_aes.extend_from_slice(&addr);
        for channel in 0..channels {
            remove_aes.push(channel as u8);
        }
        self.write_packet(&UartPacket::new(
            Destination::App,
            Command::App(AppCommand::PeerRemoveAes),
            remove_aes,
        ))?;
        self.read_expecting(Command::App(AppCommand::Ack))?;

        self.write_packet(&UartPacket::new(
            Destination::App,
            Command::App(AppCommand::AddPeer),
            add_payload.clone(),
        ))?;
        self.read_expecting(Command::App(AppCommand::Ack))?;

        // Same payload once more: key index 0 (no encryption), no wake-up.
        self.write_packet(&UartPacket::new(
            Destination::App,
            Command::App(AppCommand::AddPeer),
            add_payload,
        ))?;
        self.read_expecting(Command::App(AppCommand::Ack))?;

        Ok(())
    }

    /// Wait for the acknowledgement of the most recent outgoing command.
    ///
    /// Radio frames may arrive interleaved with the ack; those are dropped.
    /// The first non-radio packet must be the ack.
    pub fn confirm(&mut self) -> Result<(), GatewayError> {
        loop {
            let pkt = self.read_packet()?;

            if pkt.cmd == Command::App(AppCommand::Recv) {
                debug!(payload = %hex_str(&pkt.payload), "dropping radio frame while waiting for ack");
                continue;
            }

            return Self::expect_cmd(&pkt, Command::App(AppCommand::Ack));
        }
    }

    /// Hand a radio payload to the coprocessor for transmission.
    pub fn app_send(&mut self, payload: &[u8]) -> Result<(), GatewayError> {
        self.write_packet(&UartPacket::new(
            Destination::App,
            Command::App(AppCommand::Send),
            payload.to_vec(),
        ))
    }

    /// Read the next radio frame received by the coprocessor.
    pub fn read_radio(&mut self) -> Result<Vec<u8>, GatewayError> {
        let pkt = self.read_expecting(Command::App(AppCommand::Recv))?;
        Ok(pkt.payload)
    }
}

/// Compute the frame checksum over unescaped delimiter, length and body.
pub fn frame_checksum(frame: &[u8]) -> u16 {
    CRC16.checksum(frame)
}

fn hex_str(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
