use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, ReadBuf};
use tokio::net::TcpStream;
use tracing::{debug, instrument};

use super::tls;
use crate::config::TlsVerify;
use crate::domain::target::Target;
use crate::error::ProbeError;

/// Open byte stream to a target, plain or TLS.
///
/// The socket is closed when the value is dropped, so every exit path of a
/// probe releases it.
pub enum Connection {
    Plain(TcpStream),
    #[cfg(feature = "tls")]
    Tls(Box<tls::TlsStream>),
}

impl Connection {
    pub fn is_tls(&self) -> bool {
        match self {
            Connection::Plain(_) => false,
            #[cfg(feature = "tls")]
            Connection::Tls(_) => true,
        }
    }

    /// Shut the write side down and drop the stream.
    pub async fn close(mut self) {
        if let Err(e) = self.shutdown().await {
            debug!("shutdown: {e}");
        }
    }
}

impl AsyncRead for Connection {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Connection::Plain(s) => Pin::new(s).poll_read(cx, buf),
            #[cfg(feature = "tls")]
            Connection::Tls(s) => Pin::new(s.as_mut()).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for Connection {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            Connection::Plain(s) => Pin::new(s).poll_write(cx, buf),
            #[cfg(feature = "tls")]
            Connection::Tls(s) => Pin::new(s.as_mut()).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Connection::Plain(s) => Pin::new(s).poll_flush(cx),
            #[cfg(feature = "tls")]
            Connection::Tls(s) => Pin::new(s.as_mut()).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Connection::Plain(s) => Pin::new(s).poll_shutdown(cx),
            #[cfg(feature = "tls")]
            Connection::Tls(s) => Pin::new(s.as_mut()).poll_shutdown(cx),
        }
    }
}

async fn establish(target: &Target, verify: TlsVerify) -> Result<Connection, ProbeError> {
    let tcp = TcpStream::connect((target.host.as_str(), target.port))
        .await
        .map_err(|e| ProbeError::Connect(format!("{}:{}: {e}", target.host, target.port)))?;
    debug!(peer = ?tcp.peer_addr().ok(), "tcp connected");

    if !target.use_tls {
        return Ok(Connection::Plain(tcp));
    }

    #[cfg(feature = "tls")]
    {
        let stream = tls::handshake(tcp, &target.host, verify).await?;
        debug!("tls handshake complete");
        Ok(Connection::Tls(Box::new(stream)))
    }
    #[cfg(not(feature = "tls"))]
    {
        tls::handshake(tcp, &target.host, verify)
            .await
            .map(Connection::Plain)
    }
}

/// Connect to the target and, for TLS targets, finish the handshake.
///
/// `connect_timeout` bounds both steps together. The connection is only
/// returned once it is ready to carry application data.
#[instrument(skip(target, verify), fields(host = %target.host, port = target.port, tls = target.use_tls))]
pub async fn open(
    target: &Target,
    connect_timeout: Duration,
    verify: TlsVerify,
) -> Result<Connection, ProbeError> {
    tokio::time::timeout(connect_timeout, establish(target, verify))
        .await
        .map_err(|_| {
            ProbeError::Connect(format!(
                "{}:{}: timed out after {:.3}s",
                target.host,
                target.port,
                connect_timeout.as_secs_f64()
            ))
        })?
}
