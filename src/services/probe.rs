use std::io::ErrorKind;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tracing::{debug, instrument, trace};

use super::parse::{parse_endpoint, parse_url};
use crate::adapters::connector::{self, Connection};
use crate::config::ProbeConfig;
use crate::domain::measurement::{
    DownloadResult, HandshakeResult, Measurement, MeasurementKind, RunClock, TtfbResult,
};
use crate::domain::target::Target;
use crate::error::ProbeError;

/// Largest buffer a TTFB read uses, whatever the threshold.
const MAX_TTFB_BUFFER: usize = 64 * 1024;

/// When the shared read loop stops.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopAt {
    /// Once at least this many bytes were received, or on peer close.
    Threshold(usize),
    /// Only when the peer closes the stream.
    PeerClose,
}

/// Minimal HTTP/1.1 GET for the target's path.
pub fn build_request(target: &Target) -> String {
    format!(
        "GET {} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n",
        target.path,
        target.host_header()
    )
}

/// Read from `stream` in chunks of `buf_size` until `stop` is reached.
///
/// Returns the number of bytes received. A zero-length read ends the loop
/// without error; so does an EOF reported as `UnexpectedEof`, which is how
/// some TLS stacks surface a close without `close_notify`.
pub async fn read_loop<R>(
    stream: &mut R,
    buf_size: usize,
    stop: StopAt,
    read_timeout: Option<Duration>,
) -> Result<u64, ProbeError>
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; buf_size.max(1)];
    let mut total: u64 = 0;
    loop {
        let read = match read_timeout {
            Some(limit) => tokio::time::timeout(limit, stream.read(&mut buf))
                .await
                .map_err(|_| {
                    ProbeError::Read(format!(
                        "no data within {:.3}s after {total} bytes",
                        limit.as_secs_f64()
                    ))
                })?,
            None => stream.read(&mut buf).await,
        };
        let n = match read {
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => 0,
            Err(e) => return Err(ProbeError::Read(format!("after {total} bytes: {e}"))),
        };
        if n == 0 {
            debug!(total, "peer closed");
            return Ok(total);
        }
        total += n as u64;
        trace!(n, total, "chunk");
        if let StopAt::Threshold(limit) = stop {
            if total >= limit as u64 {
                debug!(total, limit, "threshold reached");
                return Ok(total);
            }
        }
    }
}

/// Run [`read_loop`] under the probe's overall deadline, if any.
async fn read_response<R>(
    stream: &mut R,
    buf_size: usize,
    stop: StopAt,
    cfg: &ProbeConfig,
) -> Result<u64, ProbeError>
where
    R: AsyncRead + Unpin,
{
    let reading = read_loop(stream, buf_size, stop, cfg.read_timeout);
    match cfg.max_duration {
        Some(limit) => tokio::time::timeout(limit, reading).await.map_err(|_| {
            ProbeError::Read(format!(
                "response not complete within {:.3}s",
                limit.as_secs_f64()
            ))
        })?,
        None => reading.await,
    }
}

async fn send_request(conn: &mut Connection, target: &Target) -> Result<(), ProbeError> {
    let request = build_request(target);
    conn.write_all(request.as_bytes())
        .await
        .map_err(|e| ProbeError::Write(e.to_string()))?;
    conn.flush()
        .await
        .map_err(|e| ProbeError::Write(e.to_string()))?;
    debug!(path = %target.path, "request sent");
    Ok(())
}

/// Measure the time needed to connect, including the TLS handshake for TLS
/// targets. Nothing is sent on the connection.
#[instrument(skip(target, cfg), fields(host = %target.host, port = target.port))]
pub async fn measure_handshake(
    target: &Target,
    cfg: &ProbeConfig,
) -> Result<Measurement, ProbeError> {
    let clock = RunClock::start();
    let start_time = clock.anchor();
    let conn = connector::open(target, cfg.connect_timeout, cfg.tls_verify).await?;
    let end_time = clock.now();
    conn.close().await;

    Ok(Measurement::Handshake(HandshakeResult::new(
        target, start_time, end_time,
    )))
}

/// Measure the time from sending a GET until `threshold_bytes` of response
/// (headers included) arrived, or the peer closed first.
#[instrument(skip(target, cfg), fields(host = %target.host, path = %target.path))]
pub async fn measure_ttfb(target: &Target, cfg: &ProbeConfig) -> Result<Measurement, ProbeError> {
    cfg.validate()?;
    let threshold = cfg.threshold_bytes;
    let mut conn = connector::open(target, cfg.connect_timeout, cfg.tls_verify).await?;

    let clock = RunClock::start();
    let start_time = clock.anchor();
    send_request(&mut conn, target).await?;
    let total = read_response(
        &mut conn,
        threshold.min(MAX_TTFB_BUFFER),
        StopAt::Threshold(threshold),
        cfg,
    )
    .await?;
    let end_time = clock.now();
    conn.close().await;

    Ok(Measurement::Ttfb(TtfbResult::new(
        target, threshold, total, start_time, end_time,
    )))
}

/// Measure the time from sending a GET until the peer closed the
/// connection, counting every byte received.
#[instrument(skip(target, cfg), fields(host = %target.host, path = %target.path))]
pub async fn measure_download(
    target: &Target,
    cfg: &ProbeConfig,
) -> Result<Measurement, ProbeError> {
    cfg.validate()?;
    let mut conn = connector::open(target, cfg.connect_timeout, cfg.tls_verify).await?;

    let clock = RunClock::start();
    let start_time = clock.anchor();
    send_request(&mut conn, target).await?;
    let total = read_response(&mut conn, cfg.chunk_size, StopAt::PeerClose, cfg).await?;
    let end_time = clock.now();
    conn.close().await;

    Ok(Measurement::Download(DownloadResult::new(
        target,
        cfg.chunk_size,
        total,
        start_time,
        end_time,
    )))
}

/// Parse `raw` with the rules of `kind` and run one probe.
pub async fn run_probe(
    kind: MeasurementKind,
    raw: &str,
    cfg: &ProbeConfig,
) -> Result<Measurement, ProbeError> {
    match kind {
        MeasurementKind::Handshake => measure_handshake(&parse_endpoint(raw)?, cfg).await,
        MeasurementKind::Ttfb => measure_ttfb(&parse_url(raw, cfg)?, cfg).await,
        MeasurementKind::Download => measure_download(&parse_url(raw, cfg)?, cfg).await,
    }
}
