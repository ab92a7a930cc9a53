use crate::packet::packet::Payload;
use crate::packet::{Config, Data, Packet, PollConfig, Sample, Samples};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// The kind of content an envelope carries. There is exactly one kind per variant of [`Payload`], and it is what
/// handler dispatch is keyed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PayloadKind {
    Data,
    Config,
    PollConfig,
    Sample,
    Samples,
}

impl PayloadKind {
    pub const ALL: [PayloadKind; 5] =
        [PayloadKind::Data, PayloadKind::Config, PayloadKind::PollConfig, PayloadKind::Sample, PayloadKind::Samples];

    /// The fully-qualified schema name of the payload message.
    pub fn full_name(&self) -> &'static str {
        match self {
            PayloadKind::Data => "gwp.Data",
            PayloadKind::Config => "gwp.Config",
            PayloadKind::PollConfig => "gwp.PollConfig",
            PayloadKind::Sample => "gwp.Sample",
            PayloadKind::Samples => "gwp.Samples",
        }
    }
}

impl Display for PayloadKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.full_name())
    }
}

impl Payload {
    pub fn kind(&self) -> PayloadKind {
        match self {
            Payload::Data(_) => PayloadKind::Data,
            Payload::Config(_) => PayloadKind::Config,
            Payload::PollConfig(_) => PayloadKind::PollConfig,
            Payload::Sample(_) => PayloadKind::Sample,
            Payload::Samples(_) => PayloadKind::Samples,
        }
    }
}

impl Packet {
    /// Which payload variant is set, if any. This only inspects the discriminant of the payload union.
    pub fn payload_kind(&self) -> Option<PayloadKind> {
        self.payload.as_ref().map(Payload::kind)
    }
}

/// Anything that can stand in as an example of a payload type, e.g. when registering a handler for it.
///
/// Returns `None` when no payload type can be determined, such as for a packet without a payload.
pub trait PayloadType {
    fn payload_kind(&self) -> Option<PayloadKind>;
}

impl PayloadType for PayloadKind {
    fn payload_kind(&self) -> Option<PayloadKind> {
        Some(*self)
    }
}

impl PayloadType for Payload {
    fn payload_kind(&self) -> Option<PayloadKind> {
        Some(self.kind())
    }
}

impl PayloadType for Packet {
    fn payload_kind(&self) -> Option<PayloadKind> {
        Packet::payload_kind(self)
    }
}

impl<T: PayloadType> PayloadType for Option<T> {
    fn payload_kind(&self) -> Option<PayloadKind> {
        self.as_ref().and_then(PayloadType::payload_kind)
    }
}

macro_rules! payload_message {
    ($msg:ident) => {
        impl PayloadType for $msg {
            fn payload_kind(&self) -> Option<PayloadKind> {
                Some(PayloadKind::$msg)
            }
        }

        impl From<$msg> for Payload {
            fn from(msg: $msg) -> Self {
                Payload::$msg(msg)
            }
        }
    };
}

payload_message!(Data);
payload_message!(Config);
payload_message!(PollConfig);
payload_message!(Sample);
payload_message!(Samples);
