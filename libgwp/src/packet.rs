//! Wire envelope messages.
//!
//! These are laid out exactly as protobuf codegen emits them for the `gwp` schema, so they encode to the same bytes as
//! any other protobuf implementation of that schema. They are maintained by hand to avoid a build-time dependency on
//! `protoc`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The top-level wire message.
#[derive(Clone, PartialEq, Serialize, Deserialize, ::prost::Message)]
pub struct Packet {
    #[prost(uint32, tag = "1")]
    pub id: u32,
    /// Id of the packet this one is answering, if any.
    #[prost(uint32, optional, tag = "2")]
    pub response_to: Option<u32>,
    #[prost(bool, tag = "3")]
    pub require_ack: bool,
    /// Milliseconds since the UNIX epoch.
    #[prost(uint64, tag = "4")]
    pub timestamp: u64,
    #[prost(message, optional, tag = "5")]
    pub from: Option<Address>,
    #[prost(message, optional, tag = "6")]
    pub to: Option<Address>,
    #[prost(oneof = "packet::Payload", tags = "10, 11, 12, 13, 14")]
    pub payload: Option<packet::Payload>,
}

/// Nested message and enum types in `Packet`.
pub mod packet {
    use serde::{Deserialize, Serialize};

    #[derive(Clone, PartialEq, Serialize, Deserialize, ::prost::Oneof)]
    pub enum Payload {
        #[prost(message, tag = "10")]
        Data(super::Data),
        #[prost(message, tag = "11")]
        Config(super::Config),
        #[prost(message, tag = "12")]
        PollConfig(super::PollConfig),
        #[prost(message, tag = "13")]
        Sample(super::Sample),
        #[prost(message, tag = "14")]
        Samples(super::Samples),
    }
}

/// A protocol endpoint. The numeric node id is optional, the address itself is either a 32-bit number or a name.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ::prost::Message)]
pub struct Address {
    #[prost(uint32, optional, tag = "1")]
    pub node_id: Option<u32>,
    #[prost(oneof = "address::Addr", tags = "2, 3")]
    pub addr: Option<address::Addr>,
}

/// Nested message and enum types in `Address`.
pub mod address {
    use serde::{Deserialize, Serialize};

    #[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ::prost::Oneof)]
    pub enum Addr {
        #[prost(fixed32, tag = "2")]
        B32(u32),
        #[prost(string, tag = "3")]
        Name(String),
    }
}

/// Opaque application data.
#[derive(Clone, PartialEq, Serialize, Deserialize, ::prost::Message)]
pub struct Data {
    #[prost(uint32, tag = "1")]
    pub r#type: u32,
    #[prost(uint32, tag = "2")]
    pub id: u32,
    #[prost(bytes = "vec", tag = "3")]
    pub data: Vec<u8>,
}

/// A set of named configuration values.
#[derive(Clone, PartialEq, Serialize, Deserialize, ::prost::Message)]
pub struct Config {
    #[prost(map = "string, message", tag = "1")]
    pub config: HashMap<String, Value>,
}

/// Asks the receiver for the current values of the named configuration fields.
#[derive(Clone, PartialEq, Serialize, Deserialize, ::prost::Message)]
pub struct PollConfig {
    #[prost(string, repeated, tag = "1")]
    pub fields: Vec<String>,
}

/// A single sensor reading.
#[derive(Clone, PartialEq, Serialize, Deserialize, ::prost::Message)]
pub struct Sample {
    #[prost(message, optional, tag = "1")]
    pub from: Option<Address>,
    /// Milliseconds since the UNIX epoch.
    #[prost(uint64, tag = "2")]
    pub timestamp: u64,
    /// Sensor type tag.
    #[prost(uint32, tag = "3")]
    pub r#type: u32,
    #[prost(message, optional, tag = "4")]
    pub value: Option<Value>,
}

/// A batch of readings, typically from several devices behind one gateway.
#[derive(Clone, PartialEq, Serialize, Deserialize, ::prost::Message)]
pub struct Samples {
    #[prost(message, repeated, tag = "1")]
    pub samples: Vec<Sample>,
}

#[derive(Clone, PartialEq, Serialize, Deserialize, ::prost::Message)]
pub struct Value {
    #[prost(oneof = "value::Value", tags = "1, 2, 3")]
    pub value: Option<value::Value>,
}

/// Nested message and enum types in `Value`.
pub mod value {
    use serde::{Deserialize, Serialize};

    #[derive(Clone, PartialEq, Serialize, Deserialize, ::prost::Oneof)]
    pub enum Value {
        #[prost(int32, tag = "1")]
        Int32Val(i32),
        #[prost(float, tag = "2")]
        FloatVal(f32),
        #[prost(string, tag = "3")]
        StringVal(String),
    }
}
