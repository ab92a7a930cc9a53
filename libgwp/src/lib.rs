//! Wire envelope of the gateway protocol.
//!
//! A [`Packet`] carries addressing metadata and exactly one payload variant. [`PayloadKind`] names the variant that
//! is set, and is what handlers are registered against. [`codec`] turns packets into bytes and back.

pub mod codec;
mod helpers;
pub mod packet;
mod payload;

pub use codec::{decode, encode, wire_size, CodecError, MAX_PACKET_SIZE};
pub use helpers::now_millis;
pub use packet::packet::Payload;
pub use packet::{Address, Config, Data, Packet, PollConfig, Sample, Samples, Value};
pub use payload::{PayloadKind, PayloadType};
