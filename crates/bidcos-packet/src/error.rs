//! Packet layer error types.

use thiserror::Error;

use bidcos_uartgw::GatewayError;

/// Errors that can occur at the BidCoS packet layer.
#[derive(Debug, Error)]
pub enum PacketError {
    /// Raw bytes too short to carry a packet.
    #[error("too short for a packet: got {got} bytes, want >= {want}")]
    TooShort {
        /// Bytes available.
        got: usize,
        /// Fixed header size.
        want: usize,
    },

    /// The underlying gateway failed.
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}
