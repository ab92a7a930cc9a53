//! DTLS transport.
//!
//! [`DtlsListener`] accepts authenticated sessions and gives every peer its own [`DtlsConnection`], whose requests are
//! merged into the listener's single request channel. [`DtlsConnection::dial`] opens a client session.

mod connection;
mod listener;

pub use connection::DtlsConnection;
pub use listener::DtlsListener;
pub use webrtc_dtls::config::{Config as DtlsConfig, ExtendedMasterSecretType};

use crate::errors::TransportError;
use webrtc_dtls::crypto::Certificate;

/// A DTLS configuration using a freshly generated self-signed certificate for `names`.
pub fn self_signed_config(
    names: Vec<String>,
    extended_master_secret: ExtendedMasterSecretType,
    insecure_skip_verify: bool,
) -> Result<DtlsConfig, TransportError> {
    let certificate = Certificate::generate_self_signed(names)?;
    Ok(DtlsConfig {
        certificates: vec![certificate],
        extended_master_secret,
        insecure_skip_verify,
        ..Default::default()
    })
}
