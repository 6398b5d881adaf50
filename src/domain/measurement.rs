use std::fmt;
use std::time::Instant;

use chrono::{DateTime, SubsecRound, TimeDelta, TimeZone, Utc};

use super::target::Target;

/// Wall-clock instant recorded during a probe.
pub type Stamp = DateTime<Utc>;

const STAMP_PATTERN: &str = "%d %b %Y %H:%M:%S%.3f";

/// Clock for a single probe run.
///
/// The wall-clock anchor is read once; every later stamp is the anchor plus
/// monotonic elapsed time, so stamps of one run never go backwards. Stamps
/// are kept at microsecond resolution, the precision of the encoded form.
#[derive(Debug, Clone, Copy)]
pub struct RunClock {
    anchor: Stamp,
    started: Instant,
}

impl RunClock {
    pub fn start() -> Self {
        Self {
            anchor: Utc::now().trunc_subsecs(6),
            started: Instant::now(),
        }
    }

    /// Stamp at which the clock was started.
    pub fn anchor(&self) -> Stamp {
        self.anchor
    }

    pub fn now(&self) -> Stamp {
        TimeDelta::from_std(self.started.elapsed())
            .ok()
            .and_then(|elapsed| self.anchor.checked_add_signed(elapsed))
            .unwrap_or(self.anchor)
            .trunc_subsecs(6)
    }
}

/// Seconds between two stamps of the same run, clamped at zero.
pub fn seconds_between(start: Stamp, end: Stamp) -> f64 {
    let delta = end - start;
    match delta.num_microseconds() {
        Some(us) if us > 0 => us as f64 / 1_000_000.0,
        Some(_) => 0.0,
        None => delta.num_milliseconds().max(0) as f64 / 1000.0,
    }
}

/// Stamp as floating-point seconds since the Unix epoch.
pub fn epoch_seconds(ts: Stamp) -> f64 {
    ts.timestamp_micros() as f64 / 1_000_000.0
}

/// Inverse of [`epoch_seconds`], at microsecond resolution.
pub fn stamp_from_epoch(secs: f64) -> Option<Stamp> {
    if !secs.is_finite() {
        return None;
    }
    DateTime::from_timestamp_micros((secs * 1_000_000.0).round() as i64)
}

/// Render a stamp as `DD Mon YYYY HH:MM:SS.mmm` in the given timezone.
pub fn format_timestamp<Tz>(ts: Stamp, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    ts.with_timezone(tz).format(STAMP_PATTERN).to_string()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MeasurementKind {
    Handshake,
    Ttfb,
    Download,
}

impl MeasurementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MeasurementKind::Handshake => "handshake",
            MeasurementKind::Ttfb => "ttfb",
            MeasurementKind::Download => "download",
        }
    }
}

impl fmt::Display for MeasurementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Time to become ready to exchange application data.
#[derive(Clone, Debug, PartialEq)]
pub struct HandshakeResult {
    pub host: String,
    pub port: u16,
    /// Whether `hs_time` includes a TLS handshake.
    pub tls: bool,
    pub start_time: Stamp,
    pub end_time: Stamp,
    pub hs_time: f64,
}

impl HandshakeResult {
    pub fn new(target: &Target, start_time: Stamp, end_time: Stamp) -> Self {
        Self {
            host: target.host.clone(),
            port: target.port,
            tls: target.use_tls,
            start_time,
            end_time,
            hs_time: seconds_between(start_time, end_time),
        }
    }
}

/// Time until at least `byte` bytes of response arrived (or the peer closed).
#[derive(Clone, Debug, PartialEq)]
pub struct TtfbResult {
    pub url: String,
    /// Threshold the read loop stopped at.
    pub byte: usize,
    pub total_bytes: u64,
    pub start_time: Stamp,
    pub end_time: Stamp,
    pub fb_time: f64,
}

impl TtfbResult {
    pub fn new(
        target: &Target,
        byte: usize,
        total_bytes: u64,
        start_time: Stamp,
        end_time: Stamp,
    ) -> Self {
        Self {
            url: target.url(),
            byte,
            total_bytes,
            start_time,
            end_time,
            fb_time: seconds_between(start_time, end_time),
        }
    }
}

/// Time to read a whole response until the peer closed.
#[derive(Clone, Debug, PartialEq)]
pub struct DownloadResult {
    pub url: String,
    pub chunk: usize,
    pub start_time: Stamp,
    pub end_time: Stamp,
    pub download_time: f64,
    pub total_bytes: u64,
}

impl DownloadResult {
    pub fn new(
        target: &Target,
        chunk: usize,
        total_bytes: u64,
        start_time: Stamp,
        end_time: Stamp,
    ) -> Self {
        Self {
            url: target.url(),
            chunk,
            start_time,
            end_time,
            download_time: seconds_between(start_time, end_time),
            total_bytes,
        }
    }

    /// Average throughput in bytes per second, `None` for an instant close.
    pub fn throughput_bps(&self) -> Option<f64> {
        (self.download_time > 0.0).then(|| self.total_bytes as f64 / self.download_time)
    }
}

/// Outcome of one successful probe run.
#[derive(Clone, Debug, PartialEq)]
pub enum Measurement {
    Handshake(HandshakeResult),
    Ttfb(TtfbResult),
    Download(DownloadResult),
}

impl Measurement {
    pub fn kind(&self) -> MeasurementKind {
        match self {
            Measurement::Handshake(_) => MeasurementKind::Handshake,
            Measurement::Ttfb(_) => MeasurementKind::Ttfb,
            Measurement::Download(_) => MeasurementKind::Download,
        }
    }

    /// Name of the probed destination as reported.
    pub fn label(&self) -> String {
        match self {
            Measurement::Handshake(r) => format!("{}:{}", r.host, r.port),
            Measurement::Ttfb(r) => r.url.clone(),
            Measurement::Download(r) => r.url.clone(),
        }
    }

    pub fn start_time(&self) -> Stamp {
        match self {
            Measurement::Handshake(r) => r.start_time,
            Measurement::Ttfb(r) => r.start_time,
            Measurement::Download(r) => r.start_time,
        }
    }

    pub fn end_time(&self) -> Stamp {
        match self {
            Measurement::Handshake(r) => r.end_time,
            Measurement::Ttfb(r) => r.end_time,
            Measurement::Download(r) => r.end_time,
        }
    }

    /// The kind's derived duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        match self {
            Measurement::Handshake(r) => r.hs_time,
            Measurement::Ttfb(r) => r.fb_time,
            Measurement::Download(r) => r.download_time,
        }
    }

    pub fn total_bytes(&self) -> Option<u64> {
        match self {
            Measurement::Handshake(_) => None,
            Measurement::Ttfb(r) => Some(r.total_bytes),
            Measurement::Download(r) => Some(r.total_bytes),
        }
    }
}
