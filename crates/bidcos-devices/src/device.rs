//! Behavior shared by all supported radio devices.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use tracing::{debug, warn};

use bidcos_packet::{
    Msgcnt, Packet, Sender, CONFIG, CONFIG_END, CONFIG_PARAM_REQ, CONFIG_PEER_ADD,
    CONFIG_PEER_LIST_REQ, CONFIG_PEER_REMOVE, CONFIG_START, CONFIG_WRITE_INDEX_PAIRS,
    COUNTER_STRIDE, DEFAULT_FLAGS, FLAG_BURST,
};

use crate::error::DeviceError;

/// Size of a device's parameter memory. It is indexed with a byte.
pub const PARAM_MEMORY_SIZE: usize = 256;

/// Key/value pairs per configuration write packet.
const WRITE_PAIRS_PER_PACKET: usize = 14;

/// A channel at a specific BidCoS-addressed peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FullyQualifiedChannel {
    /// Peer device address.
    pub peer: [u8; 3],
    /// Channel within the peer.
    pub channel: u8,
}

/// Core state and protocol operations shared by all device types.
pub struct StandardDevice {
    sender: Arc<Sender>,
    addr: [u8; 3],
    addr_hex: String,
    name: String,
    num_channels: usize,
    // Advanced via count(); the stride matches the rolling counter's.
    msgcnt: AtomicU8,
}

impl StandardDevice {
    pub fn new(
        sender: Arc<Sender>,
        addr: [u8; 3],
        name: impl Into<String>,
        num_channels: usize,
    ) -> Self {
        StandardDevice {
            sender,
            addr,
            addr_hex: hex::encode(addr),
            name: name.into(),
            num_channels,
            msgcnt: AtomicU8::new(0),
        }
    }

    /// Human-readable device name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Radio address of the device.
    pub fn addr(&self) -> [u8; 3] {
        self.addr
    }

    /// Radio address as lowercase hex.
    pub fn addr_hex(&self) -> &str {
        &self.addr_hex
    }

    /// Number of channels the device exposes.
    pub fn channels(&self) -> usize {
        self.num_channels
    }

    /// The sender this device transmits through.
    pub fn sender(&self) -> &Sender {
        &self.sender
    }

    fn count(&self) -> Msgcnt {
        Msgcnt::Exact(self.msgcnt.fetch_add(COUNTER_STRIDE, Ordering::Relaxed))
    }

    fn config_start(&self, channel: u8, paramlist: u8) -> Result<(), DeviceError> {
        self.sender.write_packet(Packet {
            msgcnt: self.count(),
            flags: DEFAULT_FLAGS,
            cmd: CONFIG,
            dest: self.addr,
            payload: vec![
                channel,
                CONFIG_START,
                0, 0, 0, // peer address
                0, // peer channel
                paramlist,
            ],
            ..Default::default()
        })?;
        Ok(())
    }

    fn config_write_index(&self, channel: u8, kv: &[u8]) -> Result<(), DeviceError> {
        let mut payload = vec![channel, CONFIG_WRITE_INDEX_PAIRS];
        payload.extend_from_slice(kv);
        self.sender.write_packet(Packet {
            msgcnt: self.count(),
            flags: DEFAULT_FLAGS,
            cmd: CONFIG,
            dest: self.addr,
            payload,
            ..Default::default()
        })?;
        Ok(())
    }

    fn config_end(&self, channel: u8) -> Result<(), DeviceError> {
        self.sender.write_packet(Packet {
            msgcnt: self.count(),
            flags: DEFAULT_FLAGS,
            cmd: CONFIG,
            dest: self.addr,
            payload: vec![channel, CONFIG_END],
            ..Default::default()
        })?;
        Ok(())
    }

    fn config_param_req(&self, channel: u8, paramlist: u8) -> Result<(), DeviceError> {
        self.sender.write_packet(Packet {
            msgcnt: self.count(),
            flags: DEFAULT_FLAGS | FLAG_BURST,
            cmd: CONFIG,
            dest: self.addr,
            payload: vec![
                channel,
                CONFIG_PARAM_REQ,
                0, 0, 0, // peer address
                0, // peer channel
                paramlist,
            ],
            ..Default::default()
        })?;
        Ok(())
    }

    fn config_peer_list_req(&self, channel: u8) -> Result<(), DeviceError> {
        self.sender.write_packet(Packet {
            msgcnt: self.count(),
            flags: DEFAULT_FLAGS | FLAG_BURST,
            cmd: CONFIG,
            dest: self.addr,
            payload: vec![channel, CONFIG_PEER_LIST_REQ],
            ..Default::default()
        })?;
        Ok(())
    }

    fn config_peer_add(&self, channel: u8, peer: FullyQualifiedChannel) -> Result<(), DeviceError> {
        self.sender.write_packet(Packet {
            msgcnt: self.count(),
            flags: DEFAULT_FLAGS | FLAG_BURST,
            cmd: CONFIG,
            dest: self.addr,
            payload: vec![
                channel,
                CONFIG_PEER_ADD,
                peer.peer[0],
                peer.peer[1],
                peer.peer[2],
                peer.channel, // peer channel a
                0x00,         // peer channel b
            ],
            ..Default::default()
        })?;
        Ok(())
    }

    fn config_peer_remove(
        &self,
        channel: u8,
        peer: FullyQualifiedChannel,
    ) -> Result<(), DeviceError> {
        self.sender.write_packet(Packet {
            msgcnt: self.count(),
            flags: DEFAULT_FLAGS | FLAG_BURST,
            cmd: CONFIG,
            dest: self.addr,
            payload: vec![
                channel,
                CONFIG_PEER_REMOVE,
                peer.peer[0],
                peer.peer[1],
                peer.peer[2],
                peer.channel, // peer channel a
                0x00,         // peer channel b
            ],
            ..Default::default()
        })?;
        Ok(())
    }

    /// Answer a pairing request: hide internal keys and configure this
    /// controller as the device's central.
    pub fn pair(&self) -> Result<(), DeviceError> {
        let central = self.sender.addr();
        self.config_start(0, 0)?;
        self.config_write_index(
            0,
            &[
                0x02, 0x01, // internal keys not visible
                0x0a, central[0],
                0x0b, central[1],
                0x0c, central[2],
            ],
        )?;
        self.config_end(0)
    }

    /// Load the device parameters in `paramlist` of `channel` into `mem`.
    ///
    /// Only positions explicitly reported by the device are written;
    /// everything else keeps its prior value.
    pub fn load_config(
        &self,
        mem: &mut [u8; PARAM_MEMORY_SIZE],
        channel: u8,
        paramlist: u8,
    ) -> Result<(), DeviceError> {
        self.config_param_req(channel, paramlist)?;

        loop {
            let pkt = self.sender.read_packet()?;
            if pkt.source != self.addr {
                warn!(
                    source = %hex::encode(pkt.source),
                    device = %self.addr_hex,
                    "dropping packet from different device"
                );
                continue;
            }

            let p = &pkt.payload;
            if p.is_empty() {
                return Err(DeviceError::MalformedConfigReply("empty payload"));
            }
            match p[0] {
                bidcos_packet::INFO_PARAM_RESPONSE_PAIRS => {
                    if p[1..] == [0x00, 0x00] {
                        return Ok(());
                    }
                    if (p.len() - 1) % 2 != 0 {
                        return Err(DeviceError::MalformedConfigReply(
                            "odd number of pair bytes",
                        ));
                    }
                    for pair in p[1..].chunks_exact(2) {
                        mem[pair[0] as usize] = pair[1];
                    }
                }

                bidcos_packet::INFO_PARAM_RESPONSE_SEQ => {
                    if p.len() < 2 {
                        return Err(DeviceError::MalformedConfigReply("missing start index"));
                    }
                    if p[1] == 0x00 {
                        return Ok(());
                    }
                    for (i, &v) in p[2..].iter().enumerate() {
                        mem[p[1].wrapping_add(i as u8) as usize] = v;
                    }
                }

                _ => {
                    return Err(DeviceError::UnexpectedConfigReply(hex::encode(p)));
                }
            }
        }
    }

    /// Bring the device's parameter memory to the state produced by
    /// `mutate`, writing only the bytes that differ.
    ///
    /// Loads the current memory, lets `mutate` edit a copy, and sends the
    /// byte-for-byte diff as a bracketed write transaction. If nothing
    /// differs, no write packets are emitted at all.
    pub fn ensure_configured<F>(
        &self,
        channel: u8,
        paramlist: u8,
        mutate: F,
    ) -> Result<(), DeviceError>
    where
        F: FnOnce(&mut [u8; PARAM_MEMORY_SIZE]),
    {
        let mut devmem = [0u8; PARAM_MEMORY_SIZE];
        self.load_config(&mut devmem, channel, paramlist)?;

        let mut target = devmem;
        mutate(&mut target);

        let pairs: Vec<(u8, u8)> = devmem
            .iter()
            .zip(target.iter())
            .enumerate()
            .filter(|(_, (dev, tgt))| dev != tgt)
            .map(|(i, (_, tgt))| (i as u8, *tgt))
            .collect();

        if pairs.is_empty() {
            return Ok(());
        }

        debug!(
            device = %self.addr_hex,
            pairs = pairs.len(),
            "updating device configuration"
        );

        self.config_start(channel, paramlist)?;
        for chunk in pairs.chunks(WRITE_PAIRS_PER_PACKET) {
            let mut kv = Vec::with_capacity(chunk.len() * 2);
            for &(index, value) in chunk {
                kv.push(index);
                kv.push(value);
            }
            self.config_write_index(0, &kv)?;
        }
        self.config_end(channel)
    }

    /// Bring the peer list of `channel` to exactly `[dest]`.
    ///
    /// Requests the current peer list, then adds, removes or replaces as
    /// needed. More than one existing peer is not handled.
    pub fn ensure_peered_with(
        &self,
        channel: u8,
        dest: FullyQualifiedChannel,
    ) -> Result<(), DeviceError> {
        self.config_peer_list_req(channel)?;

        let mut peers = Vec::new();
        'read_peers: loop {
            let pkt = self.sender.read_packet()?;
            if pkt.source != self.addr {
                warn!(
                    source = %hex::encode(pkt.source),
                    device = %self.addr_hex,
                    "dropping packet from different device"
                );
                continue;
            }

            if pkt.payload.first() != Some(&bidcos_packet::INFO_PEER_LIST) {
                return Err(DeviceError::UnexpectedPeerListReply {
                    got: pkt.payload.first().copied().unwrap_or(0),
                    want: bidcos_packet::INFO_PEER_LIST,
                });
            }

            for record in pkt.payload[1..].chunks_exact(4) {
                if record == [0x00, 0x00, 0x00, 0x00] {
                    break 'read_peers;
                }
                peers.push(FullyQualifiedChannel {
                    peer: [record[0], record[1], record[2]],
                    channel: record[3],
                });
            }
        }

        debug!(device = %self.addr_hex, ?peers, "existing peers");
        if peers.len() > 1 {
            return Err(DeviceError::MultiPeerUnpeering);
        }
        if let Some(&existing) = peers.first() {
            if existing.peer == dest.peer {
                return Ok(());
            }

            debug!(device = %self.addr_hex, ?existing, "removing existing peer");
            self.config_peer_remove(channel, existing)?;
            self.expect_peering_ack(bidcos_packet::INFO)?;
            // fall through to add the peer
        }

        debug!(device = %self.addr_hex, ?dest, "adding peer");
        self.config_peer_add(channel, dest)?;
        self.expect_peering_ack(bidcos_packet::ACK)
    }

    fn expect_peering_ack(&self, want_cmd: u8) -> Result<(), DeviceError> {
        let pkt = self.sender.read_packet()?;
        if pkt.cmd != want_cmd {
            return Err(DeviceError::PeeringCommand {
                got: pkt.cmd,
                want: want_cmd,
            });
        }
        let status = *pkt
            .payload
            .first()
            .ok_or(DeviceError::PeeringResponseTooShort { got: 0 })?;
        if status != 0x00 {
            return Err(DeviceError::PeeringStatus(status));
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use bidcos_packet::{Gateway, ACK, INFO, INFO_PARAM_RESPONSE_PAIRS, INFO_PARAM_RESPONSE_SEQ,
        INFO_PEER_LIST};
    use bidcos_uartgw::GatewayError;

    pub(crate) const CENTRAL: [u8; 3] = [0xfd, 0xee, 0xdd];
    const DEVICE: [u8; 3] = [0xaa, 0xbb, 0xcc];

    /// A gateway that records sent payloads and serves queued replies.
    pub(crate) struct ScriptedGateway {
        pub sent: Vec<Vec<u8>>,
        pub replies: VecDeque<Vec<u8>>,
    }

    impl Gateway for ScriptedGateway {
        fn send(&mut self, payload: &[u8]) -> Result<(), GatewayError> {
            self.sent.push(payload.to_vec());
            Ok(())
        }

        fn receive(&mut self) -> Result<Vec<u8>, GatewayError> {
            self.replies.pop_front().ok_or_else(|| {
                GatewayError::Io(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "no scripted reply left",
                ))
            })
        }

        fn confirm(&mut self) -> Result<(), GatewayError> {
            Ok(())
        }
    }

    /// A sender over a scripted gateway, plus a handle to the script.
    pub(crate) fn scripted_sender(
        replies: Vec<Vec<u8>>,
    ) -> (Arc<Sender>, Arc<Mutex<ScriptedGateway>>) {
        let gw = Arc::new(Mutex::new(ScriptedGateway {
            sent: Vec::new(),
            replies: replies.into(),
        }));
        (Arc::new(Sender::new(Box::new(gw.clone()), CENTRAL)), gw)
    }

    /// A sender whose gateway has nothing scripted (decode-only tests).
    pub(crate) fn test_sender() -> Arc<Sender> {
        scripted_sender(Vec::new()).0
    }

    /// Encode a reply packet as it would arrive from `source`.
    pub(crate) fn reply(source: [u8; 3], cmd: u8, payload: &[u8]) -> Vec<u8> {
        let mut rolling = 0;
        Packet {
            cmd,
            source,
            dest: CENTRAL,
            payload: payload.to_vec(),
            ..Default::default()
        }
        .encode(&mut rolling)
    }

    fn device(sender: Arc<Sender>) -> StandardDevice {
        StandardDevice::new(sender, DEVICE, "office", 6)
    }

    fn sent_packets(gw: &Arc<Mutex<ScriptedGateway>>) -> Vec<Packet> {
        gw.lock()
            .unwrap()
            .sent
            .iter()
            .map(|raw| Packet::decode(raw).expect("sent packet should decode"))
            .collect()
    }

    #[test]
    fn test_load_config_only_sets_reported_positions() {
        let (sender, gw) = scripted_sender(vec![
            reply(
                DEVICE,
                INFO,
                &[INFO_PARAM_RESPONSE_PAIRS, 0x05, 0xaa, 0x07, 0xbb],
            ),
            reply(DEVICE, INFO, &[INFO_PARAM_RESPONSE_SEQ, 0x10, 0x01, 0x02, 0x03]),
            reply(DEVICE, INFO, &[INFO_PARAM_RESPONSE_PAIRS, 0x00, 0x00]),
        ]);
        let dev = device(sender);

        let mut mem = [0u8; PARAM_MEMORY_SIZE];
        dev.load_config(&mut mem, 0, 7).expect("load should succeed");

        assert_eq!(mem[0x05], 0xaa);
        assert_eq!(mem[0x07], 0xbb);
        assert_eq!(mem[0x10..0x13], [0x01, 0x02, 0x03]);
        let touched = [0x05, 0x07, 0x10, 0x11, 0x12];
        for (i, &b) in mem.iter().enumerate() {
            if !touched.contains(&i) {
                assert_eq!(b, 0, "position {i:#04x} was written");
            }
        }

        // Exactly one packet goes out: the parameter request, with burst.
        let sent = sent_packets(&gw);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].payload[1], bidcos_packet::CONFIG_PARAM_REQ);
        assert_ne!(sent[0].flags & FLAG_BURST, 0);
    }

    #[test]
    fn test_load_config_drops_foreign_packets() {
        let (sender, _gw) = scripted_sender(vec![
            reply([0x11, 0x22, 0x33], INFO, &[INFO_PARAM_RESPONSE_PAIRS, 0x05, 0xff]),
            reply(DEVICE, INFO, &[INFO_PARAM_RESPONSE_PAIRS, 0x00, 0x00]),
        ]);
        let dev = device(sender);

        let mut mem = [0u8; PARAM_MEMORY_SIZE];
        dev.load_config(&mut mem, 0, 7).expect("load should succeed");
        assert_eq!(mem[0x05], 0, "foreign packet must not be applied");
    }

    #[test]
    fn test_load_config_rejects_unknown_reply_form() {
        let (sender, _gw) = scripted_sender(vec![reply(DEVICE, INFO, &[0x42, 0x01])]);
        let dev = device(sender);

        let mut mem = [0u8; PARAM_MEMORY_SIZE];
        match dev.load_config(&mut mem, 0, 7) {
            Err(DeviceError::UnexpectedConfigReply(_)) => {}
            other => panic!("expected unexpected-reply error, got {other:?}"),
        }
    }

    #[test]
    fn test_ensure_configured_identity_writes_nothing() {
        let (sender, gw) = scripted_sender(vec![
            reply(DEVICE, INFO, &[INFO_PARAM_RESPONSE_PAIRS, 0x05, 0xaa]),
            reply(DEVICE, INFO, &[INFO_PARAM_RESPONSE_PAIRS, 0x00, 0x00]),
        ]);
        let dev = device(sender);

        dev.ensure_configured(0, 7, |_mem| {})
            .expect("no-op configuration should succeed");

        // Only the parameter request went out.
        assert_eq!(sent_packets(&gw).len(), 1);
    }

    #[test]
    fn test_ensure_configured_chunks_writes() {
        let (sender, gw) = scripted_sender(vec![reply(
            DEVICE,
            INFO,
            &[INFO_PARAM_RESPONSE_PAIRS, 0x00, 0x00],
        )]);
        let dev = device(sender);

        // 15 changed bytes: one full write packet plus one with the rest.
        dev.ensure_configured(0, 7, |mem| {
            for i in 0..15 {
                mem[20 + i] = 0x42;
            }
        })
        .expect("configuration should succeed");

        let sent = sent_packets(&gw);
        // param req, start, 2 writes, end
        assert_eq!(sent.len(), 5);
        assert_eq!(sent[1].payload[1], bidcos_packet::CONFIG_START);
        assert_eq!(sent[2].payload[1], bidcos_packet::CONFIG_WRITE_INDEX_PAIRS);
        assert_eq!(sent[2].payload.len(), 2 + 14 * 2);
        assert_eq!(sent[3].payload[1], bidcos_packet::CONFIG_WRITE_INDEX_PAIRS);
        assert_eq!(sent[3].payload.len(), 2 + 2);
        assert_eq!(sent[4].payload[1], bidcos_packet::CONFIG_END);

        // The first pair of the first write packet.
        assert_eq!(sent[2].payload[2], 20);
        assert_eq!(sent[2].payload[3], 0x42);
    }

    #[test]
    fn test_device_counter_advances_by_stride() {
        let (sender, gw) = scripted_sender(vec![
            reply(DEVICE, INFO, &[INFO_PARAM_RESPONSE_PAIRS, 0x00, 0x00]),
            reply(DEVICE, INFO, &[INFO_PARAM_RESPONSE_PAIRS, 0x00, 0x00]),
        ]);
        let dev = device(sender);

        let mut mem = [0u8; PARAM_MEMORY_SIZE];
        dev.load_config(&mut mem, 0, 7).unwrap();
        dev.load_config(&mut mem, 0, 7).unwrap();

        let sent = sent_packets(&gw);
        assert_eq!(sent[0].msgcnt, Msgcnt::Exact(0));
        assert_eq!(sent[1].msgcnt, Msgcnt::Exact(COUNTER_STRIDE));
    }

    #[test]
    fn test_pair_configures_central_address() {
        let (sender, gw) = scripted_sender(Vec::new());
        let dev = device(sender);

        dev.pair().expect("pairing should succeed");

        let sent = sent_packets(&gw);
        assert_eq!(sent.len(), 3);
        assert_eq!(sent[0].payload[1], bidcos_packet::CONFIG_START);
        assert_eq!(
            sent[1].payload,
            vec![
                0x00,
                CONFIG_WRITE_INDEX_PAIRS,
                0x02, 0x01,
                0x0a, CENTRAL[0],
                0x0b, CENTRAL[1],
                0x0c, CENTRAL[2],
            ]
        );
        assert_eq!(sent[2].payload[1], bidcos_packet::CONFIG_END);
    }

    #[test]
    fn test_ensure_peered_with_empty_list_adds_peer() {
        let wanted = FullyQualifiedChannel {
            peer: [0x39, 0x0f, 0x17],
            channel: 0x02,
        };
        let (sender, gw) = scripted_sender(vec![
            reply(DEVICE, INFO, &[INFO_PEER_LIST, 0x00, 0x00, 0x00, 0x00]),
            reply(DEVICE, ACK, &[0x00]),
        ]);
        let dev = device(sender);

        dev.ensure_peered_with(0x02, wanted).expect("peering should succeed");

        let sent = sent_packets(&gw);
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[1].payload[1], bidcos_packet::CONFIG_PEER_ADD);
        assert_eq!(&sent[1].payload[2..5], &wanted.peer);
        assert_eq!(sent[1].payload[5], wanted.channel);
    }

    #[test]
    fn test_ensure_peered_with_matching_peer_is_a_noop() {
        let wanted = FullyQualifiedChannel {
            peer: [0x39, 0x0f, 0x17],
            channel: 0x02,
        };
        let (sender, gw) = scripted_sender(vec![reply(
            DEVICE,
            INFO,
            &[
                INFO_PEER_LIST,
                0x39, 0x0f, 0x17, 0x02,
                0x00, 0x00, 0x00, 0x00,
            ],
        )]);
        let dev = device(sender);

        dev.ensure_peered_with(0x02, wanted).expect("peering should succeed");

        // Only the peer list request went out.
        assert_eq!(sent_packets(&gw).len(), 1);
    }

    #[test]
    fn test_ensure_peered_with_replaces_different_peer() {
        let wanted = FullyQualifiedChannel {
            peer: [0x39, 0x0f, 0x17],
            channel: 0x02,
        };
        let (sender, gw) = scripted_sender(vec![
            reply(
                DEVICE,
                INFO,
                &[
                    INFO_PEER_LIST,
                    0x11, 0x22, 0x33, 0x01,
                    0x00, 0x00, 0x00, 0x00,
                ],
            ),
            reply(DEVICE, INFO, &[0x00]),
            reply(DEVICE, ACK, &[0x00]),
        ]);
        let dev = device(sender);

        dev.ensure_peered_with(0x02, wanted).expect("peering should succeed");

        let sent = sent_packets(&gw);
        assert_eq!(sent.len(), 3);
        assert_eq!(sent[1].payload[1], bidcos_packet::CONFIG_PEER_REMOVE);
        assert_eq!(&sent[1].payload[2..5], &[0x11, 0x22, 0x33]);
        assert_eq!(sent[2].payload[1], bidcos_packet::CONFIG_PEER_ADD);
    }

    #[test]
    fn test_ensure_peered_with_rejected_add_fails() {
        let wanted = FullyQualifiedChannel {
            peer: [0x39, 0x0f, 0x17],
            channel: 0x02,
        };
        let (sender, _gw) = scripted_sender(vec![
            reply(DEVICE, INFO, &[INFO_PEER_LIST, 0x00, 0x00, 0x00, 0x00]),
            reply(DEVICE, ACK, &[0x01]),
        ]);
        let dev = device(sender);

        match dev.ensure_peered_with(0x02, wanted) {
            Err(DeviceError::PeeringStatus(0x01)) => {}
            other => panic!("expected peering status error, got {other:?}"),
        }
    }

    #[test]
    fn test_ensure_peered_with_multiple_peers_unimplemented() {
        let wanted = FullyQualifiedChannel {
            peer: [0x39, 0x0f, 0x17],
            channel: 0x02,
        };
        let (sender, _gw) = scripted_sender(vec![reply(
            DEVICE,
            INFO,
            &[
                INFO_PEER_LIST,
                0x11, 0x22, 0x33, 0x01,
                0x44, 0x55, 0x66, 0x02,
                0x00, 0x00, 0x00, 0x00,
            ],
        )]);
        let dev = device(sender);

        match dev.ensure_peered_with(0x02, wanted) {
            Err(DeviceError::MultiPeerUnpeering) => {}
            other => panic!("expected not-implemented error, got {other:?}"),
        }
    }
}
