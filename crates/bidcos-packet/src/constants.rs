//! Protocol constants
//!
//! Command bytes, subcommand bytes and flag bits of the BidCoS radio
//! protocol. Commands are top-level (e.g. `CONFIG`); frames usually specify
//! a subtype in the first payload byte (e.g. `CONFIG_PEER_ADD`).

// ============================================================================
// Commands (message types)
// ============================================================================

/// Device information broadcast, also used as pairing request.
pub const DEVICE_INFO: u8 = 0x00;
/// Configuration command; the subtype selects the operation.
pub const CONFIG: u8 = 0x01;
/// Acknowledgement.
pub const ACK: u8 = 0x02;
/// Information response (also acknowledges peer changes).
pub const INFO: u8 = 0x10;
/// Set an actuator level (e.g. switch a relay).
pub const LEVEL_SET: u8 = 0x11;
/// Climate event from a heating thermostat.
pub const CLIMATE_EVENT: u8 = 0x58;
/// Thermal control event from a wall thermostat.
pub const THERMAL_CONTROL_EVENT: u8 = 0x5a;
/// Power measurement event, sent cyclically.
pub const POWER_EVENT_CYCLIC: u8 = 0x5e;
/// Power measurement event, sent on change.
pub const POWER_EVENT: u8 = 0x5f;
/// Weather event (temperature/humidity) from a wall thermostat.
pub const WEATHER_EVENT: u8 = 0x70;

// ============================================================================
// Config Subcommands
// ============================================================================

/// Add a peer to a channel.
pub const CONFIG_PEER_ADD: u8 = 0x01;
/// Remove a peer from a channel.
pub const CONFIG_PEER_REMOVE: u8 = 0x02;
/// Request a channel's peer list.
pub const CONFIG_PEER_LIST_REQ: u8 = 0x03;
/// Request a channel's parameter memory.
pub const CONFIG_PARAM_REQ: u8 = 0x04;
/// Open a configuration write transaction.
pub const CONFIG_START: u8 = 0x05;
/// Close a configuration write transaction.
pub const CONFIG_END: u8 = 0x06;
/// Write a contiguous run of parameter bytes.
pub const CONFIG_WRITE_INDEX_SEQ: u8 = 0x07;
/// Write (index, value) parameter pairs.
pub const CONFIG_WRITE_INDEX_PAIRS: u8 = 0x08;
/// Request the device serial.
pub const CONFIG_SERIAL_REQ: u8 = 0x09;
/// Pair by serial.
pub const CONFIG_PAIR_SERIAL: u8 = 0x0a;
/// Request the device status.
pub const CONFIG_STATUS_REQUEST: u8 = 0x0e;

// ============================================================================
// Info Subcommands
// ============================================================================

/// Serial number response.
pub const INFO_SERIAL: u8 = 0x00;
/// Peer list response.
pub const INFO_PEER_LIST: u8 = 0x01;
/// Parameter response as (index, value) pairs.
pub const INFO_PARAM_RESPONSE_PAIRS: u8 = 0x02;
/// Parameter response as a contiguous run.
pub const INFO_PARAM_RESPONSE_SEQ: u8 = 0x03;
/// Parameter change notification.
pub const INFO_PARAM_CHANGE: u8 = 0x04;
/// Actuator status report.
pub const INFO_ACTUATOR_STATUS: u8 = 0x06;
/// Temperature report.
pub const INFO_TEMP: u8 = 0x0a;

// ============================================================================
// Packet Flags
// ============================================================================

/// Wake up the destination device from power-save mode.
pub const FLAG_WAKE_UP: u8 = 0x01;
/// Device is awake, send messages now.
pub const FLAG_WAKE_ME_UP: u8 = 0x02;
/// Send message to all devices.
pub const FLAG_BROADCAST: u8 = 0x04;
/// Prefix the transmission with a long wake-up preamble.
pub const FLAG_BURST: u8 = 0x10;
/// Bi-directional, i.e. response expected.
pub const FLAG_BIDI: u8 = 0x20;
/// Packet was repeated (not seen in the wild).
pub const FLAG_REPEATED: u8 = 0x40;
/// Packet can be repeated (always set).
pub const FLAG_REPEAT_ENABLE: u8 = 0x80;

/// Flags set on ordinary outgoing packets.
pub const DEFAULT_FLAGS: u8 = FLAG_REPEAT_ENABLE | FLAG_BIDI;

// ============================================================================
// Sizes
// ============================================================================

/// Fixed packet header size in bytes.
pub const MIN_PACKET_SIZE: usize = 12;
/// Maximum observed payload size in bytes.
pub const MAX_PAYLOAD_SIZE: usize = 17;
/// Stride of the outgoing message counters.
pub const COUNTER_STRIDE: u8 = 9;
