use chrono::Local;
#[cfg(feature = "json")]
use serde::{Deserialize, Serialize};

use crate::domain::measurement::{
    DownloadResult, HandshakeResult, Measurement, Stamp, TtfbResult, epoch_seconds,
    format_timestamp, stamp_from_epoch,
};
use crate::error::ProbeError;
use crate::stats::Stats;

/// How timestamp fields are written.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TimestampStyle {
    /// Floating-point seconds since the Unix epoch.
    #[default]
    Raw,
    /// `DD Mon YYYY HH:MM:SS.mmm` in local time.
    Formatted,
}

#[cfg(feature = "json")]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
enum JsonStamp {
    Raw(f64),
    Formatted(String),
}

#[cfg(feature = "json")]
impl JsonStamp {
    fn render(ts: Stamp, style: TimestampStyle) -> Self {
        match style {
            TimestampStyle::Raw => JsonStamp::Raw(epoch_seconds(ts)),
            TimestampStyle::Formatted => JsonStamp::Formatted(format_timestamp(ts, &Local)),
        }
    }

    fn decode(&self) -> Result<Stamp, ProbeError> {
        match self {
            JsonStamp::Raw(secs) => stamp_from_epoch(*secs)
                .ok_or_else(|| ProbeError::Encode(format!("timestamp out of range: {secs}"))),
            JsonStamp::Formatted(s) => Err(ProbeError::Encode(format!(
                "formatted timestamp '{s}' cannot be decoded"
            ))),
        }
    }
}

#[cfg(feature = "json")]
#[derive(Serialize, Deserialize)]
struct JsonHandshake {
    host: String,
    port: u16,
    tls: bool,
    start_time: JsonStamp,
    end_time: JsonStamp,
    hs_time: f64,
}

#[cfg(feature = "json")]
#[derive(Serialize, Deserialize)]
struct JsonTtfb {
    url: String,
    byte: usize,
    total_bytes: u64,
    start_time: JsonStamp,
    end_time: JsonStamp,
    fb_time: f64,
}

#[cfg(feature = "json")]
#[derive(Serialize, Deserialize)]
struct JsonDownload {
    url: String,
    chunk: usize,
    start_time: JsonStamp,
    end_time: JsonStamp,
    download_time: f64,
    total_bytes: u64,
}

#[cfg(feature = "json")]
#[derive(Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum JsonRecord {
    Handshake(JsonHandshake),
    Ttfb(JsonTtfb),
    Download(JsonDownload),
}

#[cfg(feature = "json")]
impl JsonRecord {
    fn render(m: &Measurement, style: TimestampStyle) -> Self {
        match m {
            Measurement::Handshake(r) => JsonRecord::Handshake(JsonHandshake {
                host: r.host.clone(),
                port: r.port,
                tls: r.tls,
                start_time: JsonStamp::render(r.start_time, style),
                end_time: JsonStamp::render(r.end_time, style),
                hs_time: r.hs_time,
            }),
            Measurement::Ttfb(r) => JsonRecord::Ttfb(JsonTtfb {
                url: r.url.clone(),
                byte: r.byte,
                total_bytes: r.total_bytes,
                start_time: JsonStamp::render(r.start_time, style),
                end_time: JsonStamp::render(r.end_time, style),
                fb_time: r.fb_time,
            }),
            Measurement::Download(r) => JsonRecord::Download(JsonDownload {
                url: r.url.clone(),
                chunk: r.chunk,
                start_time: JsonStamp::render(r.start_time, style),
                end_time: JsonStamp::render(r.end_time, style),
                download_time: r.download_time,
                total_bytes: r.total_bytes,
            }),
        }
    }

    fn into_measurement(self) -> Result<Measurement, ProbeError> {
        Ok(match self {
            JsonRecord::Handshake(r) => Measurement::Handshake(HandshakeResult {
                host: r.host,
                port: r.port,
                tls: r.tls,
                start_time: r.start_time.decode()?,
                end_time: r.end_time.decode()?,
                hs_time: r.hs_time,
            }),
            JsonRecord::Ttfb(r) => Measurement::Ttfb(TtfbResult {
                url: r.url,
                byte: r.byte,
                total_bytes: r.total_bytes,
                start_time: r.start_time.decode()?,
                end_time: r.end_time.decode()?,
                fb_time: r.fb_time,
            }),
            JsonRecord::Download(r) => Measurement::Download(DownloadResult {
                url: r.url,
                chunk: r.chunk,
                start_time: r.start_time.decode()?,
                end_time: r.end_time.decode()?,
                download_time: r.download_time,
                total_bytes: r.total_bytes,
            }),
        })
    }
}

#[cfg(feature = "json")]
fn write<T: Serialize>(value: &T, pretty: bool) -> Result<String, ProbeError> {
    let text = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    Ok(text)
}

/// Serialize a measurement into a flat JSON object of its own fields.
#[allow(unused_variables)]
pub fn to_json(m: &Measurement, style: TimestampStyle, pretty: bool) -> Result<String, ProbeError> {
    #[cfg(feature = "json")]
    {
        match JsonRecord::render(m, style) {
            JsonRecord::Handshake(r) => write(&r, pretty),
            JsonRecord::Ttfb(r) => write(&r, pretty),
            JsonRecord::Download(r) => write(&r, pretty),
        }
    }
    #[cfg(not(feature = "json"))]
    {
        Err(ProbeError::Encode("json feature disabled".into()))
    }
}

/// Like [`to_json`] with an extra `"kind"` key, the form [`from_json`] reads.
#[allow(unused_variables)]
pub fn to_json_tagged(
    m: &Measurement,
    style: TimestampStyle,
    pretty: bool,
) -> Result<String, ProbeError> {
    #[cfg(feature = "json")]
    {
        write(&JsonRecord::render(m, style), pretty)
    }
    #[cfg(not(feature = "json"))]
    {
        Err(ProbeError::Encode("json feature disabled".into()))
    }
}

/// Decode a tagged record with raw timestamps.
#[allow(unused_variables)]
pub fn from_json(text: &str) -> Result<Measurement, ProbeError> {
    #[cfg(feature = "json")]
    {
        let record: JsonRecord = serde_json::from_str(text)?;
        record.into_measurement()
    }
    #[cfg(not(feature = "json"))]
    {
        Err(ProbeError::Encode("json feature disabled".into()))
    }
}

#[cfg(feature = "json")]
#[derive(Serialize)]
struct JsonStats<'a> {
    kind: &'static str,
    target: &'a str,
    #[serde(flatten)]
    stats: &'a Stats,
}

/// Serialize repeated-run statistics for one target.
#[allow(unused_variables)]
pub fn stats_to_json(
    kind: &'static str,
    target: &str,
    stats: &Stats,
    pretty: bool,
) -> Result<String, ProbeError> {
    #[cfg(feature = "json")]
    {
        write(
            &JsonStats {
                kind,
                target,
                stats,
            },
            pretty,
        )
    }
    #[cfg(not(feature = "json"))]
    {
        Err(ProbeError::Encode("json feature disabled".into()))
    }
}

#[cfg(all(test, feature = "json"))]
mod tests {
    use super::*;
    use crate::domain::target::Target;
    use chrono::{DateTime, TimeDelta};
    use serde_json::Value;

    fn target() -> Target {
        Target {
            host: "example.com".into(),
            path: "/big.iso".into(),
            port: 443,
            use_tls: true,
        }
    }

    fn stamps() -> (Stamp, Stamp) {
        let start = DateTime::from_timestamp(1_700_000_000, 250_000_000).unwrap();
        (start, start + TimeDelta::microseconds(1_234_567))
    }

    fn download() -> Measurement {
        let (start, end) = stamps();
        Measurement::Download(DownloadResult::new(&target(), 4096, 1_048_576, start, end))
    }

    #[test]
    fn flat_object_uses_field_names() {
        let text = to_json(&download(), TimestampStyle::Raw, false).unwrap();
        let v: Value = serde_json::from_str(&text).unwrap();
        let obj = v.as_object().unwrap();
        let mut keys: Vec<_> = obj.keys().map(String::as_str).collect();
        keys.sort();
        assert_eq!(
            keys,
            ["chunk", "download_time", "end_time", "start_time", "total_bytes", "url"]
        );
        assert_eq!(obj["url"], "example.com/big.iso");
        assert_eq!(obj["total_bytes"], 1_048_576);
        assert_eq!(obj["start_time"].as_f64(), Some(1_700_000_000.25));
    }

    #[test]
    fn handshake_keys() {
        let (start, end) = stamps();
        let m = Measurement::Handshake(HandshakeResult::new(&target(), start, end));
        let v: Value = serde_json::from_str(&to_json(&m, TimestampStyle::Raw, false).unwrap())
            .unwrap();
        assert_eq!(v["host"], "example.com");
        assert_eq!(v["port"], 443);
        assert_eq!(v["tls"], true);
        assert_eq!(v["hs_time"].as_f64(), Some(1.234567));
    }

    #[test]
    fn formatted_style_only_touches_timestamps() {
        let raw: Value =
            serde_json::from_str(&to_json(&download(), TimestampStyle::Raw, false).unwrap())
                .unwrap();
        let fmt: Value = serde_json::from_str(
            &to_json(&download(), TimestampStyle::Formatted, false).unwrap(),
        )
        .unwrap();
        assert!(fmt["start_time"].is_string());
        assert!(fmt["end_time"].is_string());
        assert_eq!(raw["download_time"], fmt["download_time"]);
        assert_eq!(raw["total_bytes"], fmt["total_bytes"]);
    }

    #[test]
    fn tagged_record_decodes_back() {
        let (start, end) = stamps();
        let cases = [
            download(),
            Measurement::Handshake(HandshakeResult::new(&target(), start, end)),
            Measurement::Ttfb(TtfbResult::new(&target(), 1024, 0, start, end)),
        ];
        for m in cases {
            let text = to_json_tagged(&m, TimestampStyle::Raw, true).unwrap();
            assert_eq!(from_json(&text).unwrap(), m);
        }
    }

    #[test]
    fn formatted_record_is_not_decodable() {
        let text = to_json_tagged(&download(), TimestampStyle::Formatted, false).unwrap();
        assert!(matches!(from_json(&text), Err(ProbeError::Encode(_))));
    }

    #[test]
    fn stats_are_flattened() {
        let stats = Stats {
            count: 3,
            duration_avg: 0.2,
            duration_min: 0.1,
            duration_max: 0.3,
            bytes_avg: None,
        };
        let v: Value =
            serde_json::from_str(&stats_to_json("handshake", "h:1", &stats, false).unwrap())
                .unwrap();
        assert_eq!(v["kind"], "handshake");
        assert_eq!(v["count"], 3);
        assert!(v["bytes_avg"].is_null());
    }
}
