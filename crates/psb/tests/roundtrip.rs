//! Schema roundtrips over realistic message shapes, variant groups,
//! and decoder robustness against arbitrary bytes.

use proptest::prelude::*;

use psb::error::ErrorKind;
use psb::schema::{max_element_count, read, write, ArrayElement, ReadBytes, VariantSchema,
    WriteBytes};
use psb::{DecodeError, EncodeError, Reader, Writer};

#[derive(Default, Debug, Clone, PartialEq)]
struct NodeData {
    network_id: [u8; 16],
    my_port: u32,
    peer_id: u64,
}

impl ReadBytes for NodeData {
    fn read_bytes(source: &mut Reader) -> Result<Self, DecodeError> {
        let mut out = NodeData::default();
        read::object(
            source,
            &mut [
                &mut read::field("network_id", &mut out.network_id),
                &mut read::field("my_port", &mut out.my_port),
                &mut read::defaulted("peer_id", &mut out.peer_id, 0),
            ],
        )?;
        Ok(out)
    }
}

impl WriteBytes for NodeData {
    fn write_bytes(&self, dest: &mut Writer) -> Result<(), EncodeError> {
        write::object(
            dest,
            &[
                &write::field("network_id", &self.network_id),
                &write::field("my_port", &self.my_port),
                &write::defaulted("peer_id", &self.peer_id, 0),
            ],
        )
    }
}

#[derive(Default, Debug, Clone, PartialEq)]
struct PeerEntry {
    id: u64,
    last_seen: u64,
    rpc_port: u16,
}

impl ArrayElement for PeerEntry {}

impl ReadBytes for PeerEntry {
    fn read_bytes(source: &mut Reader) -> Result<Self, DecodeError> {
        let mut out = PeerEntry::default();
        read::object(
            source,
            &mut [
                &mut read::field("id", &mut out.id),
                &mut read::defaulted("last_seen", &mut out.last_seen, 0),
                &mut read::defaulted("rpc_port", &mut out.rpc_port, 0),
            ],
        )?;
        Ok(out)
    }
}

impl WriteBytes for PeerEntry {
    fn write_bytes(&self, dest: &mut Writer) -> Result<(), EncodeError> {
        write::object(
            dest,
            &[
                &write::field("id", &self.id),
                &write::defaulted("last_seen", &self.last_seen, 0),
                &write::defaulted("rpc_port", &self.rpc_port, 0),
            ],
        )
    }
}

#[derive(Default, Debug, Clone, PartialEq)]
struct HandshakeResponse {
    node_data: NodeData,
    peers: Vec<PeerEntry>,
    block_ids: Vec<[u8; 32]>,
    top_version: Option<String>,
}

impl ReadBytes for HandshakeResponse {
    fn read_bytes(source: &mut Reader) -> Result<Self, DecodeError> {
        let mut out = HandshakeResponse::default();
        read::object(
            source,
            &mut [
                &mut read::field("node_data", &mut out.node_data),
                &mut read::array("peers", &mut out.peers, max_element_count(250)),
                &mut read::array_as_blob("block_ids", &mut out.block_ids),
                &mut read::optional("top_version", &mut out.top_version),
            ],
        )?;
        Ok(out)
    }
}

impl WriteBytes for HandshakeResponse {
    fn write_bytes(&self, dest: &mut Writer) -> Result<(), EncodeError> {
        write::object(
            dest,
            &[
                &write::field("node_data", &self.node_data),
                &write::array("peers", &self.peers),
                &write::array_as_blob("block_ids", &self.block_ids),
                &write::optional("top_version", &self.top_version),
            ],
        )
    }
}

#[test]
fn nested_object_roundtrip() {
    let value = HandshakeResponse {
        node_data: NodeData {
            network_id: [0xab; 16],
            my_port: 18080,
            peer_id: 0x0123_4567_89ab_cdef,
        },
        peers: vec![
            PeerEntry {
                id: 1,
                last_seen: 1_600_000_000,
                rpc_port: 0,
            },
            PeerEntry {
                id: 2,
                last_seen: 0,
                rpc_port: 18081,
            },
        ],
        block_ids: vec![[0x11; 32], [0x22; 32]],
        top_version: Some("v18".to_string()),
    };
    let bytes = psb::to_bytes(&value).unwrap();
    let decoded: HandshakeResponse = psb::from_bytes(bytes).unwrap();
    assert_eq!(decoded, value);
}

#[test]
fn empty_containers_roundtrip() {
    let value = HandshakeResponse::default();
    let bytes = psb::to_bytes(&value).unwrap();
    let decoded: HandshakeResponse = psb::from_bytes(bytes).unwrap();
    assert_eq!(decoded, value);
}

#[test]
fn blob_length_must_be_element_multiple() {
    // hand-write block_ids with 33 bytes
    let mut writer = Writer::new();
    writer.start_object(2).unwrap();
    writer.key("node_data").unwrap();
    writer.start_object(2).unwrap();
    writer.key("network_id").unwrap();
    writer.binary(&[0u8; 16]).unwrap();
    writer.key("my_port").unwrap();
    writer.uint32(1).unwrap();
    writer.end_object();
    writer.key("block_ids").unwrap();
    writer.binary(&[0u8; 33]).unwrap();
    writer.end_object();

    let err = psb::from_bytes::<HandshakeResponse>(writer.take_bytes()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::FixedBinary);
}

#[derive(Default, Debug, Clone, PartialEq)]
struct Matrix {
    m: Vec<Vec<u16>>,
    label: String,
}

impl ReadBytes for Matrix {
    fn read_bytes(source: &mut Reader) -> Result<Self, DecodeError> {
        let mut out = Matrix::default();
        read::object(
            source,
            &mut [
                &mut read::array("m", &mut out.m, max_element_count(16)),
                &mut read::field("label", &mut out.label),
            ],
        )?;
        Ok(out)
    }
}

impl WriteBytes for Matrix {
    fn write_bytes(&self, dest: &mut Writer) -> Result<(), EncodeError> {
        write::object(
            dest,
            &[
                &write::array("m", &self.m),
                &write::field("label", &self.label),
            ],
        )
    }
}

#[test]
fn array_of_arrays_roundtrip() {
    let value = Matrix {
        m: vec![vec![1, 2], vec![3]],
        label: "adjacency".to_string(),
    };
    let bytes = psb::to_bytes(&value).unwrap();
    let decoded: Matrix = psb::from_bytes(bytes).unwrap();
    assert_eq!(decoded, value);
}

// =============================================================================
// VARIANTS
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
enum TxOutTarget {
    ToKey([u8; 32]),
    ToScriptHash(String),
}

impl Default for TxOutTarget {
    fn default() -> Self {
        TxOutTarget::ToKey([0; 32])
    }
}

impl VariantSchema for TxOutTarget {
    const OPTIONS: &'static [&'static str] = &["to_key", "to_script_hash"];

    fn read_option(index: usize, source: &mut Reader) -> Result<Self, DecodeError> {
        match index {
            0 => Ok(TxOutTarget::ToKey(<[u8; 32]>::read_bytes(source)?)),
            _ => Ok(TxOutTarget::ToScriptHash(String::read_bytes(source)?)),
        }
    }

    fn option_index(&self) -> usize {
        match self {
            TxOutTarget::ToKey(_) => 0,
            TxOutTarget::ToScriptHash(_) => 1,
        }
    }

    fn write_option(&self, dest: &mut Writer) -> Result<(), EncodeError> {
        match self {
            TxOutTarget::ToKey(key) => key.write_bytes(dest),
            TxOutTarget::ToScriptHash(hash) => hash.write_bytes(dest),
        }
    }
}

#[derive(Default, Debug, Clone, PartialEq)]
struct TxOut {
    amount: u64,
    target: TxOutTarget,
}

impl ReadBytes for TxOut {
    fn read_bytes(source: &mut Reader) -> Result<Self, DecodeError> {
        let mut out = TxOut::default();
        read::object(
            source,
            &mut [
                &mut read::field("amount", &mut out.amount),
                &mut read::variant(&mut out.target),
            ],
        )?;
        Ok(out)
    }
}

impl WriteBytes for TxOut {
    fn write_bytes(&self, dest: &mut Writer) -> Result<(), EncodeError> {
        write::object(
            dest,
            &[
                &write::field("amount", &self.amount),
                &write::variant(&self.target),
            ],
        )
    }
}

#[test]
fn variant_alternatives_roundtrip() {
    for target in [
        TxOutTarget::ToKey([0x5a; 32]),
        TxOutTarget::ToScriptHash("p2sh".to_string()),
    ] {
        let value = TxOut {
            amount: 1000,
            target: target.clone(),
        };
        let bytes = psb::to_bytes(&value).unwrap();
        let decoded: TxOut = psb::from_bytes(bytes).unwrap();
        assert_eq!(decoded.target, target);
    }
}

#[test]
fn variant_requires_one_alternative() {
    let mut writer = Writer::new();
    writer.start_object(1).unwrap();
    writer.key("amount").unwrap();
    writer.uint64(5).unwrap();
    writer.end_object();

    let err = psb::from_bytes::<TxOut>(writer.take_bytes()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MissingKey);
}

#[test]
fn variant_rejects_two_alternatives() {
    let mut writer = Writer::new();
    writer.start_object(3).unwrap();
    writer.key("amount").unwrap();
    writer.uint64(5).unwrap();
    writer.key("to_key").unwrap();
    writer.binary(&[1u8; 32]).unwrap();
    writer.key("to_script_hash").unwrap();
    writer.string("both?").unwrap();
    writer.end_object();

    let err = psb::from_bytes::<TxOut>(writer.take_bytes()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidKey);
}

// =============================================================================
// PROPERTIES
// =============================================================================

fn peer_strategy() -> impl Strategy<Value = PeerEntry> {
    (any::<u64>(), any::<u64>(), any::<u16>()).prop_map(|(id, last_seen, rpc_port)| PeerEntry {
        id,
        last_seen,
        rpc_port,
    })
}

fn handshake_strategy() -> impl Strategy<Value = HandshakeResponse> {
    (
        any::<[u8; 16]>(),
        any::<u32>(),
        any::<u64>(),
        proptest::collection::vec(peer_strategy(), 0..8),
        proptest::collection::vec(any::<[u8; 32]>(), 0..4),
        proptest::option::of(".{0,32}"),
    )
        .prop_map(
            |(network_id, my_port, peer_id, peers, block_ids, top_version)| HandshakeResponse {
                node_data: NodeData {
                    network_id,
                    my_port,
                    peer_id,
                },
                peers,
                block_ids,
                top_version,
            },
        )
}

proptest! {
    #[test]
    fn handshake_roundtrips(value in handshake_strategy()) {
        let bytes = psb::to_bytes(&value).unwrap();
        let decoded: HandshakeResponse = psb::from_bytes(bytes).unwrap();
        prop_assert_eq!(decoded, value);
    }

    #[test]
    fn arbitrary_bytes_never_panic(raw in proptest::collection::vec(any::<u8>(), 0..512)) {
        let _ = psb::from_bytes::<HandshakeResponse>(raw);
    }

    #[test]
    fn arbitrary_bodies_never_panic(body in proptest::collection::vec(any::<u8>(), 0..512)) {
        let mut bytes = vec![0x01, 0x11, 0x01, 0x01, 0x01, 0x01, 0x02, 0x01, 0x01];
        bytes.extend_from_slice(&body);
        let _ = psb::from_bytes::<HandshakeResponse>(bytes);
    }
}
