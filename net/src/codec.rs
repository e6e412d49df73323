//! Wire codec for every datagram the node sends or receives.
//!
//! All records are encoded with fixed-width integers in host byte order,
//! matching the in-memory layout of the structs byte for byte. A datagram
//! must contain exactly one record: short or oversize payloads are
//! rejected before any field is read.

use {
    crate::error::{NetError, Result},
    bincode::Options,
    canopy_collector::ring::{SampleBatch, NSAMPLES},
    canopy_dissemination::token::{NodeId, TokenPacket},
    serde::{Deserialize, Serialize},
};

/// Encoded size of a [`TokenPacket`]: token byte plus two i32 targets.
pub const TOKEN_PACKET_WIRE_SIZE: usize = 9;

/// Encoded size of one sample record: three i32 fields.
pub const SAMPLE_WIRE_SIZE: usize = 12;

/// Encoded size of a full report batch. Batches are fixed-length arrays
/// and carry no length prefix.
pub const SAMPLE_BATCH_WIRE_SIZE: usize = SAMPLE_WIRE_SIZE * NSAMPLES;

/// Encoded size of a [`CollectHeader`].
pub const COLLECT_HEADER_WIRE_SIZE: usize = 8;

/// Provenance header prepended to every collection-tree frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectHeader {
    /// Logical channel the frame belongs to.
    pub channel: u16,
    /// Node that originated the payload.
    pub originator: NodeId,
    /// Per-originator sequence number, wrapping at 255.
    pub seqno: u8,
    /// Hops the frame has travelled when it reaches the sink.
    pub hops: u8,
}

fn wire_options() -> impl Options {
    // Default options reject trailing bytes on deserialize, which is
    // what turns a wrong-length datagram into a decode failure.
    bincode::options()
        .with_fixint_encoding()
        .with_native_endian()
}

/// Encodes a token packet for the control plane.
pub fn encode_token_packet(packet: &TokenPacket) -> Result<Vec<u8>> {
    Ok(wire_options().serialize(packet)?)
}

/// Decodes a control-plane datagram into a token packet.
pub fn decode_token_packet(data: &[u8]) -> Result<TokenPacket> {
    if data.len() != TOKEN_PACKET_WIRE_SIZE {
        return Err(NetError::WrongLength {
            expected: TOKEN_PACKET_WIRE_SIZE,
            got: data.len(),
        });
    }
    Ok(wire_options().deserialize(data)?)
}

/// Encodes a full sample batch for the report path.
pub fn encode_sample_batch(batch: &SampleBatch) -> Result<Vec<u8>> {
    Ok(wire_options().serialize(batch)?)
}

/// Decodes a report datagram into a sample batch.
pub fn decode_sample_batch(data: &[u8]) -> Result<SampleBatch> {
    if data.len() != SAMPLE_BATCH_WIRE_SIZE {
        return Err(NetError::WrongLength {
            expected: SAMPLE_BATCH_WIRE_SIZE,
            got: data.len(),
        });
    }
    Ok(wire_options().deserialize(data)?)
}

/// Encodes a collect frame: fixed header followed by the raw payload.
pub fn encode_collect_frame(header: &CollectHeader, payload: &[u8]) -> Result<Vec<u8>> {
    let mut frame = wire_options().serialize(header)?;
    frame.extend_from_slice(payload);
    Ok(frame)
}

/// Splits a collect frame into its header and payload.
pub fn decode_collect_frame(data: &[u8]) -> Result<(CollectHeader, Vec<u8>)> {
    if data.len() < COLLECT_HEADER_WIRE_SIZE {
        return Err(NetError::WrongLength {
            expected: COLLECT_HEADER_WIRE_SIZE,
            got: data.len(),
        });
    }
    let (head, payload) = data.split_at(COLLECT_HEADER_WIRE_SIZE);
    let header = wire_options().deserialize(head)?;
    Ok((header, payload.to_vec()))
}
