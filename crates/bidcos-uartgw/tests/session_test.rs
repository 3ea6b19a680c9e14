//! Session initialization tests against captured coprocessor traffic.
//!
//! The reply frames below were captured from a real coprocessor; the
//! expected host frames were captured from a vendor CCU driving it. Running
//! the initialization sequence against these replies must reproduce the
//! host side byte for byte.

use std::cell::RefCell;
use std::io::{Cursor, Read, Write};
use std::rc::Rc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use bidcos_uartgw::{frame_checksum, EscapingWriter, UartGateway, FRAME_DELIMITER};

struct MockPort {
    rx: Cursor<Vec<u8>>,
    tx: Rc<RefCell<Vec<u8>>>,
}

impl MockPort {
    /// Create a port serving `replies` and a handle to the bytes written.
    fn new(replies: Vec<u8>) -> (Self, Rc<RefCell<Vec<u8>>>) {
        let tx = Rc::new(RefCell::new(Vec::new()));
        (
            MockPort {
                rx: Cursor::new(replies),
                tx: tx.clone(),
            },
            tx,
        )
    }
}

impl Read for MockPort {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.rx.read(buf)
    }
}

impl Write for MockPort {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.tx.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }
    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Build an on-wire frame for the given unescaped body.
fn frame(body: &[u8]) -> Vec<u8> {
    let mut full = vec![FRAME_DELIMITER];
    full.extend_from_slice(&(body.len() as u16).to_be_bytes());
    full.extend_from_slice(body);
    let crc = frame_checksum(&full);

    let mut wire = vec![FRAME_DELIMITER];
    let mut esc = EscapingWriter::new(&mut wire);
    esc.write_all(&full[1..]).unwrap();
    esc.write_all(&crc.to_be_bytes()).unwrap();
    wire
}

const HMID: [u8; 3] = [0xfd, 0xb0, 0x2c];

/// Wall-clock instant matching the captured clock-sync frame.
fn capture_time() -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(0x58a7_1163)
}

fn init_replies() -> Vec<u8> {
    let mut replies = Vec::new();
    for hex_frame in [
        // bootloader banner "Co_CPU_BL"
        "fd000c000000436f5f4350555f424c7251",
        // ack for the bootloader -> application switch
        "fd000400000401993d",
        // application banner "Co_CPU_App"
        "fd000d000000436f5f4350555f417070d831",
        // firmware version reply (1.2.1)
        "fd000a00010402010003010201aa8a",
        // CSMA/CA ack
        "fd0004000204011916",
        // serial number reply ("NEQ1330980")
        "fd000e000304024e4551313333303938306ab9",
        // clock sync ack
        "fd000400040401196e",
        // radio key ack
        "fd0004010504010d7a",
        // HMID ack
        "fd0004010604010d46",
    ] {
        replies.extend(hex::decode(hex_frame).unwrap());
    }
    replies
}

fn init_host_frames() -> Vec<u8> {
    let mut expected = Vec::new();
    // switch to application code
    expected.extend(hex::decode("fd0003000003180a").unwrap());
    // firmware version request
    expected.extend(hex::decode("fd00030001021e0c").unwrap());
    // enable CSMA/CA
    expected.extend(frame(&[0x00, 0x02, 0x0a, 0x01]));
    // serial number request
    expected.extend(hex::decode("fd000300030b9239").unwrap());
    // clock sync (epoch 0x58a71163, UTC)
    expected.extend(hex::decode("fd000800040e58a7116300548e").unwrap());
    // radio key, key index 2
    expected.extend(hex::decode("fd001401050300112233445566778899aabbccddeeff024c6d").unwrap());
    // HMID (contains an escaped 0xfd)
    expected.extend(hex::decode("fd0006010600fc7db02cd166").unwrap());
    expected
}

#[test]
fn test_init_sequence_parses_replies() {
    let (port, _tx) = MockPort::new(init_replies());
    let gw = UartGateway::new(port, HMID, capture_time(), 0).expect("init should succeed");

    assert_eq!(gw.firmware_version(), "1.2.1");
    assert_eq!(gw.serial_number(), "NEQ1330980");
}

#[test]
fn test_init_sequence_host_frames_match_capture() {
    let (port, tx) = MockPort::new(init_replies());
    UartGateway::new(port, HMID, capture_time(), 0).expect("init should succeed");

    assert_eq!(
        hex::encode(tx.borrow().as_slice()),
        hex::encode(init_host_frames())
    );
}

#[test]
fn test_add_peer_sequence_matches_capture() {
    let peer_ack = hex::decode("fd00100108040701010001ffffffffffffffffcaaf").unwrap();

    let mut replies = init_replies();
    // one more clock sync, bringing the session counter in line with the
    // captured peering exchange
    replies.extend(hex::decode("fd000400040401196e").unwrap());
    // first + second AddPeer acks
    replies.extend(&peer_ack);
    replies.extend(&peer_ack);
    // AES strip ack
    replies.extend(hex::decode("fd0004010a04010db6").unwrap());
    // third AddPeer ack
    replies.extend(hex::decode("fd0010010b040701010001ffffffffffffffffc9a5").unwrap());
    // final AddPeer (key index 0) ack
    replies.extend(hex::decode("fd0010010c040701010001ffffffffffffffffceb7").unwrap());

    let (port, tx) = MockPort::new(replies);
    let mut gw = UartGateway::new(port, HMID, capture_time(), 0).expect("init should succeed");

    gw.set_time(capture_time(), 0).expect("clock sync should succeed");
    gw.add_peer([0x40, 0xc2, 0xa8], 7)
        .expect("peering should succeed");

    let mut expected = init_host_frames();
    // clock sync at session counter 7
    expected.extend(frame(&[0x00, 0x07, 0x0e, 0x58, 0xa7, 0x11, 0x63, 0x00]));
    // AddPeer, captured
    expected.extend(hex::decode("fd000901080640c2a8000000022e").unwrap());
    // AddPeer repeat
    expected.extend(frame(&[0x01, 0x09, 0x06, 0x40, 0xc2, 0xa8, 0x00, 0x00, 0x00]));
    // per-channel AES strip, captured
    expected.extend(hex::decode("fd000d010a0a40c2a8000102030405068b17").unwrap());
    // AddPeer again
    expected.extend(frame(&[0x01, 0x0b, 0x06, 0x40, 0xc2, 0xa8, 0x00, 0x00, 0x00]));
    // final AddPeer (key index 0, no wake-up), captured
    expected.extend(hex::decode("fd0009010c0640c2a80000004236").unwrap());

    assert_eq!(
        hex::encode(tx.borrow().as_slice()),
        hex::encode(expected)
    );
}

#[test]
fn test_init_fails_on_wrong_banner() {
    // A coprocessor that skips the bootloader banner is a protocol error.
    let replies = hex::decode("fd000d000000436f5f4350555f417070d831").unwrap();
    let (port, _tx) = MockPort::new(replies);
    assert!(UartGateway::new(port, HMID, capture_time(), 0).is_err());
}
