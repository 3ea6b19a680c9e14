//! UARTGW serial gateway protocol.
//!
//! This crate implements the framed serial protocol spoken by the UARTGW
//! radio coprocessor, which bridges the host to the BidCoS sub-GHz network.
//!
//! # Framing
//!
//! The coprocessor uses a byte-stuffed, CRC-protected framing format. Within
//! a frame, `0xfc` is an escape byte:
//!
//! ```text
//! 0xfc 0x7d represents 0xfd
//! 0xfc 0x7c represents 0xfc
//! ```
//!
//! This guarantees that `0xfd` always means "start of a frame", so the reader
//! can re-synchronize on `0xfd` after reading invalid data.
//!
//! Each frame has the following format:
//!
//! ```text
//! +-------------+-----------------+-----------+--------------+
//! | 0xfd        | length (u16 BE) | body      | crc (u16 BE) |
//! +-------------+-----------------+-----------+--------------+
//! ```
//!
//! The length covers the body only; the CRC covers delimiter, length and
//! body, all computed over the unescaped bytes (see [`frame_checksum`] for
//! the CRC parameters).
//!
//! Each body (a [`UartPacket`]) has the following format:
//!
//! ```text
//! +------------------+---------------+-------------+-----------+
//! | destination (u8) | msgcnt (u8)   | command (u8)| payload   |
//! +------------------+---------------+-------------+-----------+
//! ```
//!
//! Command byte values depend on the state of the coprocessor: the same
//! value means something different in bootloader state vs. application code
//! state. See [`Command::decode`].

mod commands;
mod error;
mod escaping;
mod gateway;

pub use commands::*;
pub use error::*;
pub use escaping::*;
pub use gateway::*;
