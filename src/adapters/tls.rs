//! TLS client setup for probes.

use tokio::net::TcpStream;
use tracing::debug;

use crate::config::TlsVerify;
use crate::error::ProbeError;

#[cfg(feature = "tls")]
pub type TlsStream = tokio_native_tls::TlsStream<TcpStream>;

/// Build a TLS connector honoring the verification policy.
///
/// With [`TlsVerify::Disabled`] both the certificate chain and the host name
/// are accepted unchecked.
#[cfg(feature = "tls")]
pub fn build_connector(verify: TlsVerify) -> Result<tokio_native_tls::TlsConnector, ProbeError> {
    let mut builder = native_tls::TlsConnector::builder();
    if verify == TlsVerify::Disabled {
        builder.danger_accept_invalid_certs(true);
        builder.danger_accept_invalid_hostnames(true);
    }
    let connector = builder
        .build()
        .map_err(|e| ProbeError::Tls(format!("connector setup failed: {e}")))?;
    Ok(tokio_native_tls::TlsConnector::from(connector))
}

/// Run a client handshake over an established TCP stream.
#[cfg(feature = "tls")]
pub async fn handshake(
    tcp: TcpStream,
    domain: &str,
    verify: TlsVerify,
) -> Result<TlsStream, ProbeError> {
    if verify == TlsVerify::Disabled {
        debug!(domain, "tls handshake without certificate verification");
    }
    let connector = build_connector(verify)?;
    connector
        .connect(domain, tcp)
        .await
        .map_err(|e| ProbeError::Tls(format!("{domain}: {e}")))
}

/// Stub when TLS support is compiled out.
#[cfg(not(feature = "tls"))]
pub async fn handshake(
    _tcp: TcpStream,
    domain: &str,
    _verify: TlsVerify,
) -> Result<TcpStream, ProbeError> {
    debug!(domain, "tls requested without tls support");
    Err(ProbeError::Tls(
        "TLS support not enabled. Compile with --features tls".to_string(),
    ))
}
