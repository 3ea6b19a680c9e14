//! Device layer error types.

use thiserror::Error;

use bidcos_packet::PacketError;

/// Errors that can occur when configuring or decoding a device.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// The packet layer failed.
    #[error(transparent)]
    Packet(#[from] PacketError),

    /// A parameter request was answered with an unknown response form.
    #[error("unexpected parameter request reply: {0}")]
    UnexpectedConfigReply(String),

    /// A parameter response had a malformed structure.
    #[error("malformed parameter response: {0}")]
    MalformedConfigReply(&'static str),

    /// A peer list request was answered with something else.
    #[error("unexpected peer list reply: got subtype {got:#04x}, want {want:#04x}")]
    UnexpectedPeerListReply {
        /// Subtype found in the reply.
        got: u8,
        /// Expected peer-list subtype.
        want: u8,
    },

    /// A peer add/remove was answered with the wrong command.
    #[error("unexpected peering response command: got {got:#04x}, want {want:#04x}")]
    PeeringCommand {
        /// Command found in the reply.
        got: u8,
        /// Expected command.
        want: u8,
    },

    /// A peer add/remove response carried no status byte.
    #[error("peering response payload too short: got {got}, want >= 1")]
    PeeringResponseTooShort {
        /// Actual payload length.
        got: usize,
    },

    /// A peer add/remove was rejected by the device.
    #[error("unexpected acknowledgement status: got {0:#04x}, want 0x00")]
    PeeringStatus(u8),

    /// More than one existing peer; bulk unpeering is not implemented.
    #[error("unpeering more than one existing peer is not implemented")]
    MultiPeerUnpeering,

    /// An event payload had the wrong length for its type.
    #[error("unexpected {event} payload size: got {got}, want {want}")]
    PayloadLength {
        /// Event type being decoded.
        event: &'static str,
        /// Bytes received.
        got: usize,
        /// Bytes required.
        want: usize,
    },
}
