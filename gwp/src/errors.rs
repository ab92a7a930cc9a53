use libgwp::{CodecError, PayloadKind};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("I/O error. {0}")]
    Io(#[from] std::io::Error),
    #[error("Packet codec error. {0}")]
    Codec(#[from] CodecError),
    #[error("Short write: packet size {expected}, written {written}")]
    ShortWrite { expected: usize, written: usize },
    #[error("DTLS error. {0}")]
    Dtls(#[from] webrtc_dtls::Error),
    #[error("DTLS session error. {0}")]
    DtlsUtil(#[from] webrtc_util::Error),
    #[error("Could not resolve address {0}")]
    AddressResolution(String),
    #[error("The transport has been closed")]
    Closed,
    #[error("Background task failed. {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum MuxError {
    #[error("You cannot change a sealed mux")]
    Sealed,
    #[error("Cannot resolve the payload type of the handler exemplar")]
    CannotResolveType,
    #[error("A handler for {0} is already defined")]
    AlreadyDefined(PayloadKind),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ServerError {
    #[error("Server already started")]
    AlreadyStarted,
    #[error("No listeners defined")]
    NoListeners,
    #[error("No handler defined")]
    NoHandler,
    #[error("Server has already been shut down")]
    AlreadyShutDown,
}
