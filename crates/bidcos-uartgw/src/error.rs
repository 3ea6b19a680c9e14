//! Gateway error types.

use thiserror::Error;

use crate::commands::{Command, DeviceState};

/// Errors that can occur when talking to the UARTGW coprocessor.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Serial I/O failed.
    #[error("serial I/O: {0}")]
    Io(#[from] std::io::Error),

    /// Frame checksum did not verify.
    #[error("unexpected checksum: got {got:#06x}, want {want:#06x}")]
    ChecksumMismatch {
        /// Checksum carried in the frame.
        got: u16,
        /// Checksum computed over the frame contents.
        want: u16,
    },

    /// Frame body too short to carry a packet header.
    #[error("frame body too short: got {0} bytes, want >= 3")]
    ShortFrame(usize),

    /// Reply payload shorter than the field being extracted.
    #[error("short {what} payload: got {got} bytes, want >= {want}")]
    ShortPayload {
        /// Which reply was being parsed.
        what: &'static str,
        /// Actual payload length.
        got: usize,
        /// Required payload length.
        want: usize,
    },

    /// Command byte not listed for the current device state.
    #[error("unknown command byte {raw:#04x} in state {state:?}")]
    UnknownCommand {
        /// The raw command byte.
        raw: u8,
        /// Device state the byte was decoded in.
        state: DeviceState,
    },

    /// The controller does not transmit this command.
    #[error("command {0:?} cannot be encoded")]
    UnencodableCommand(Command),

    /// Destination byte outside the known set.
    #[error("unknown destination byte {0:#04x}")]
    UnknownDestination(u8),

    /// A reply carried a different command than the exchange expects.
    #[error("unexpected packet command: got {got:?}, want {want:?}")]
    UnexpectedCommand {
        /// Command found in the reply.
        got: Command,
        /// Command the exchange expects.
        want: Command,
    },

    /// The coprocessor announced an unexpected firmware banner.
    #[error("unexpected coprocessor application: got {got:?}, want {want:?}")]
    UnexpectedBanner {
        /// Banner string received.
        got: String,
        /// Banner string expected.
        want: &'static str,
    },

    /// A lock guarding the gateway was poisoned by a panicking thread.
    #[error("gateway lock poisoned")]
    PoisonedLock,
}
