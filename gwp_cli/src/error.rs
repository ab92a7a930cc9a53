use gwp::{MuxError, ServerError, TransportError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("IO Error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Invalid configuration file: {0}")]
    InvalidConfig(#[from] serde_yml::Error),
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("Server error: {0}")]
    Server(#[from] ServerError),
    #[error("Could not set up the request handlers: {0}")]
    Mux(#[from] MuxError),
    #[error("Nothing to listen on. Give at least one --udp or --dtls address.")]
    NoListeners,
}
