use crate::packet::Packet;
use prost::Message;
use thiserror::Error;

/// The largest packet we wish to emit. Incoming packets above this size are flagged, but not rejected.
///
/// This is deliberately low, so that transport MTU limits are felt early.
pub const MAX_PACKET_SIZE: usize = 250;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Could not encode packet. {0}")]
    Encode(#[from] prost::EncodeError),
    #[error("Could not decode packet. {0}")]
    Decode(#[from] prost::DecodeError),
}

pub fn encode(packet: &Packet) -> Result<Vec<u8>, CodecError> {
    let mut buffer = Vec::with_capacity(packet.encoded_len());
    packet.encode(&mut buffer)?;
    Ok(buffer)
}

pub fn decode(buffer: &[u8]) -> Result<Packet, CodecError> {
    let packet = Packet::decode(buffer)?;
    Ok(packet)
}

/// The number of bytes the packet occupies on the wire.
pub fn wire_size(packet: &Packet) -> usize {
    packet.encoded_len()
}

impl Packet {
    pub fn is_oversize(&self) -> bool {
        wire_size(self) > MAX_PACKET_SIZE
    }
}
