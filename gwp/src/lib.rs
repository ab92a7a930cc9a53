//! Transports, payload multiplexer and server for the gateway protocol.
//!
//! Listeners ([`UdpConnection`], [`DtlsListener`]) decode inbound packets into [`Request`]s. A [`Server`] drains the
//! requests of all its listeners and hands each one to a [`Handler`], usually a [`Mux`] that routes by payload type.

pub mod config;
pub mod dtls;
pub mod errors;
mod handler;
mod mux;
mod request;
mod server;
pub mod transport;
mod udp;

pub use config::TransportConfig;
pub use dtls::{self_signed_config, DtlsConfig, DtlsConnection, DtlsListener, ExtendedMasterSecretType};
pub use errors::{MuxError, ServerError, TransportError};
pub use handler::{handler_fn, Handler, HandlerFn};
pub use libgwp;
pub use mux::Mux;
pub use request::Request;
pub use server::Server;
pub use transport::{Connection, Listener, Peer, Requests};
pub use udp::UdpConnection;
