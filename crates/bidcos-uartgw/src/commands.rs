//! Packet destinations and the state-dependent command table.

use crate::error::GatewayError;

/// Destination of a UARTGW packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    /// The bootloader ("OS") part of the coprocessor firmware.
    Os,
    /// The application part of the coprocessor firmware.
    App,
    Dual,
    DualErr,
}

impl TryFrom<u8> for Destination {
    type Error = GatewayError;

    fn try_from(raw: u8) -> Result<Self, GatewayError> {
        match raw {
            0 => Ok(Destination::Os),
            1 => Ok(Destination::App),
            254 => Ok(Destination::Dual),
            255 => Ok(Destination::DualErr),
            other => Err(GatewayError::UnknownDestination(other)),
        }
    }
}

impl From<Destination> for u8 {
    fn from(dst: Destination) -> u8 {
        match dst {
            Destination::Os => 0,
            Destination::App => 1,
            Destination::Dual => 254,
            Destination::DualErr => 255,
        }
    }
}

/// Which half of the coprocessor firmware is currently running.
///
/// The coprocessor boots into its bootloader and is switched to application
/// code during session initialization. Command byte values are interpreted
/// relative to this state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
    /// Bootloader ("OS") running.
    Os,
    /// Application code running.
    App,
}

/// Commands understood while the coprocessor runs its bootloader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsCommand {
    GetApp,
    GetFirmware,
    ChangeApp,
    Ack,
    UpdateFirmware,
    NormalMode,
    UpdateMode,
    GetCredits,
    EnableCredits,
    EnableCsmaCa,
    GetSerial,
    SetTime,
}

/// Commands understood while the coprocessor runs its application code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppCommand {
    SetHmid,
    GetHmid,
    Send,
    SetCurrentKey,
    Ack,
    Recv,
    AddPeer,
    RemovePeer,
    GetPeers,
    PeerAddAes,
    PeerRemoveAes,
    SetTempKey,
    SetPreviousKey,
    DefaultHmid,
}

/// A UARTGW command, tagged by the firmware half it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Os(OsCommand),
    App(AppCommand),
}

impl Command {
    /// Decode a raw command byte relative to the current device state.
    ///
    /// Byte values not listed for the given state are a protocol error.
    pub fn decode(state: DeviceState, raw: u8) -> Result<Command, GatewayError> {
        match state {
            DeviceState::Os => match raw {
                0x00 => Ok(Command::Os(OsCommand::GetApp)),
                0x02 => Ok(Command::Os(OsCommand::GetFirmware)),
                0x03 => Ok(Command::Os(OsCommand::ChangeApp)),
                0x04 => Ok(Command::Os(OsCommand::Ack)),
                0x05 => Ok(Command::Os(OsCommand::UpdateFirmware)),
                0x06 => Ok(Command::Os(OsCommand::NormalMode)),
                0x07 => Ok(Command::Os(OsCommand::UpdateMode)),
                0x08 => Ok(Command::Os(OsCommand::GetCredits)),
                0x09 => Ok(Command::Os(OsCommand::EnableCredits)),
                0x0a => Ok(Command::Os(OsCommand::EnableCsmaCa)),
                0x0b => Ok(Command::Os(OsCommand::GetSerial)),
                0x0e => Ok(Command::Os(OsCommand::SetTime)),
                other => Err(GatewayError::UnknownCommand { raw: other, state }),
            },
            DeviceState::App => match raw {
                // Receiving an unsolicited 0x00 in application state usually
                // means the coprocessor dropped back into its bootloader, so
                // decode it as the bootloader banner command rather than
                // AppSetHmid.
                0x00 => Ok(Command::Os(OsCommand::GetApp)),
                0x01 => Ok(Command::App(AppCommand::GetHmid)),
                0x02 => Ok(Command::App(AppCommand::Send)),
                0x03 => Ok(Command::App(AppCommand::SetCurrentKey)),
                0x04 => Ok(Command::App(AppCommand::Ack)),
                0x05 => Ok(Command::App(AppCommand::Recv)),
                0x06 => Ok(Command::App(AppCommand::AddPeer)),
                0x07 => Ok(Command::App(AppCommand::RemovePeer)),
                0x08 => Ok(Command::App(AppCommand::GetPeers)),
                0x09 => Ok(Command::App(AppCommand::PeerAddAes)),
                0x0a => Ok(Command::App(AppCommand::PeerRemoveAes)),
                0x0b => Ok(Command::App(AppCommand::SetTempKey)),
                0x0f => Ok(Command::App(AppCommand::SetPreviousKey)),
                0x10 => Ok(Command::App(AppCommand::DefaultHmid)),
                other => Err(GatewayError::UnknownCommand { raw: other, state }),
            },
        }
    }

    /// Encode the command to its wire byte.
    ///
    /// Only the commands the controller actually transmits are encodable;
    /// everything else is an error.
    pub fn byte(self) -> Result<u8, GatewayError> {
        match self {
            Command::Os(OsCommand::GetApp) => Ok(0x00),
            Command::Os(OsCommand::GetFirmware) => Ok(0x02),
            Command::Os(OsCommand::ChangeApp) => Ok(0x03),
            Command::Os(OsCommand::Ack) => Ok(0x04),
            Command::Os(OsCommand::UpdateFirmware) => Ok(0x05),
            Command::Os(OsCommand::NormalMode) => Ok(0x06),
            Command::Os(OsCommand::UpdateMode) => Ok(0x07),
            Command::Os(OsCommand::GetCredits) => Ok(0x08),
            Command::Os(OsCommand::EnableCredits) => Ok(0x09),
            Command::Os(OsCommand::EnableCsmaCa) => Ok(0x0a),
            Command::Os(OsCommand::GetSerial) => Ok(0x0b),
            Command::Os(OsCommand::SetTime) => Ok(0x0e),
            Command::App(AppCommand::SetHmid) => Ok(0x00),
            Command::App(AppCommand::Send) => Ok(0x02),
            Command::App(AppCommand::SetCurrentKey) => Ok(0x03),
            Command::App(AppCommand::Ack) => Ok(0x04),
            Command::App(AppCommand::Recv) => Ok(0x05),
            Command::App(AppCommand::AddPeer) => Ok(0x06),
            Command::App(AppCommand::GetPeers) => Ok(0x08),
            Command::App(AppCommand::PeerRemoveAes) => Ok(0x0a),
            other => Err(GatewayError::UnencodableCommand(other)),
        }
    }
}
