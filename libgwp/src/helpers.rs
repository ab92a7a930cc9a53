use crate::packet::address::Addr;
use crate::packet::packet::Payload;
use crate::packet::value::Value as Scalar;
use crate::packet::{Address, Config, Data, Packet, Sample, Value};
use chrono::Utc;
use std::fmt::{Display, Formatter};

/// The current time as milliseconds since the UNIX epoch, which is how timestamps travel on the wire.
pub fn now_millis() -> u64 {
    Utc::now().timestamp_millis().max(0) as u64
}

impl Packet {
    pub fn new<P: Into<Payload>>(payload: P) -> Self {
        Self { payload: Some(payload.into()), ..Default::default() }
    }

    pub fn with_id(mut self, id: u32) -> Self {
        self.id = id;
        self
    }

    pub fn with_to(mut self, to: Address) -> Self {
        self.to = Some(to);
        self
    }

    pub fn with_from(mut self, from: Address) -> Self {
        self.from = Some(from);
        self
    }

    pub fn with_require_ack(mut self, require_ack: bool) -> Self {
        self.require_ack = require_ack;
        self
    }

    pub fn with_timestamp(mut self, timestamp: u64) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Sets the timestamp to the current time.
    pub fn stamped(self) -> Self {
        self.with_timestamp(now_millis())
    }

    /// Build a packet answering this one. The answer is correlated via `response_to` and addressed to the sender.
    pub fn response<P: Into<Payload>>(&self, payload: P) -> Packet {
        Packet {
            response_to: Some(self.id),
            to: self.from.clone(),
            payload: Some(payload.into()),
            ..Default::default()
        }
    }
}

impl Address {
    pub fn b32(addr: u32) -> Self {
        Self { node_id: None, addr: Some(Addr::B32(addr)) }
    }

    pub fn name<S: Into<String>>(name: S) -> Self {
        Self { node_id: None, addr: Some(Addr::Name(name.into())) }
    }

    pub fn with_node_id(mut self, node_id: u32) -> Self {
        self.node_id = Some(node_id);
        self
    }
}

impl Config {
    pub fn with<K: Into<String>, V: Into<Value>>(mut self, key: K, value: V) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }
}

impl Sample {
    /// A reading taken now.
    pub fn now<V: Into<Value>>(from: Address, sensor_type: u32, value: V) -> Self {
        Self { from: Some(from), timestamp: now_millis(), r#type: sensor_type, value: Some(value.into()) }
    }
}

impl Value {
    pub fn as_i32(&self) -> Option<i32> {
        match self.value {
            Some(Scalar::Int32Val(v)) => Some(v),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match self.value {
            Some(Scalar::FloatVal(v)) => Some(v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match &self.value {
            Some(Scalar::StringVal(v)) => Some(v),
            _ => None,
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self { value: Some(Scalar::Int32Val(v)) }
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Self { value: Some(Scalar::FloatVal(v)) }
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self { value: Some(Scalar::StringVal(v.to_string())) }
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self { value: Some(Scalar::StringVal(v)) }
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if let Some(node_id) = self.node_id {
            write!(f, "{node_id}@")?;
        }
        match &self.addr {
            Some(Addr::B32(addr)) => write!(f, "{addr:#010x}"),
            Some(Addr::Name(name)) => write!(f, "{name}"),
            None => write!(f, "<none>"),
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.value {
            Some(Scalar::Int32Val(v)) => write!(f, "{v}"),
            Some(Scalar::FloatVal(v)) => write!(f, "{v}"),
            Some(Scalar::StringVal(v)) => write!(f, "{v:?}"),
            None => write!(f, "null"),
        }
    }
}

impl Display for Data {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "type={} id={} data={}", self.r#type, self.id, hex::encode(&self.data))
    }
}

impl Display for Packet {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.id)?;
        if let Some(response_to) = self.response_to {
            write!(f, " (re #{response_to})")?;
        }
        match self.payload_kind() {
            Some(kind) => write!(f, " [{kind}]")?,
            None => write!(f, " [empty]")?,
        }
        if let Some(from) = &self.from {
            write!(f, " from {from}")?;
        }
        if let Some(to) = &self.to {
            write!(f, " to {to}")?;
        }
        if self.require_ack {
            write!(f, " ack")?;
        }
        Ok(())
    }
}
