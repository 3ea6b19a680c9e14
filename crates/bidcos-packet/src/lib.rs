//! BidCoS radio packet layer.
//!
//! This crate implements the BidCoS (bidirectional communication standard)
//! packet format carried over the UARTGW radio coprocessor, plus the
//! [`Sender`] wrapper enforcing the send-then-confirm exchange discipline.
//!
//! # Packet format
//!
//! ```text
//! +--------+------+------+--------+-------+-----+--------+--------+----------+
//! | status | info | rssi | msgcnt | flags | cmd | src(3) | dst(3) | payload  |
//! +--------+------+------+--------+-------+-----+--------+--------+----------+
//! ```
//!
//! Twelve fixed bytes followed by at most 17 bytes of payload. The three
//! leading bytes are transport metadata: the coprocessor fills them on
//! receive, and the encoder sets them to `00 00 burst` on send.

mod codec;
mod constants;
mod error;
mod sender;

pub use codec::*;
pub use constants::*;
pub use error::*;
pub use sender::*;
