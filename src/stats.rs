use crate::domain::measurement::Measurement;
#[cfg(feature = "json")]
use serde::Serialize;

/// Summary over repeated runs of one probe kind, durations in seconds.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "json", derive(Serialize))]
pub struct Stats {
    pub count: usize,
    pub duration_avg: f64,
    pub duration_min: f64,
    pub duration_max: f64,
    /// Mean bytes received, absent for handshake probes.
    pub bytes_avg: Option<f64>,
}

/// `None` when there is nothing to summarize.
pub fn compute_stats(results: &[Measurement]) -> Option<Stats> {
    if results.is_empty() {
        return None;
    }
    let count = results.len();
    let duration_avg = results.iter().map(|r| r.duration_secs()).sum::<f64>() / count as f64;
    let duration_min = results
        .iter()
        .map(|r| r.duration_secs())
        .fold(f64::INFINITY, f64::min);
    let duration_max = results
        .iter()
        .map(|r| r.duration_secs())
        .fold(f64::NEG_INFINITY, f64::max);
    let bytes: Vec<u64> = results.iter().filter_map(|r| r.total_bytes()).collect();
    let bytes_avg = (!bytes.is_empty())
        .then(|| bytes.iter().map(|&b| b as f64).sum::<f64>() / bytes.len() as f64);
    Some(Stats {
        count,
        duration_avg,
        duration_min,
        duration_max,
        bytes_avg,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::measurement::{DownloadResult, HandshakeResult};
    use crate::domain::target::Target;
    use chrono::{DateTime, TimeDelta};

    fn target() -> Target {
        Target {
            host: "example.com".into(),
            path: "/".into(),
            port: 80,
            use_tls: false,
        }
    }

    fn download(ms: i64, bytes: u64) -> Measurement {
        let start = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let end = start + TimeDelta::milliseconds(ms);
        Measurement::Download(DownloadResult::new(&target(), 1024, bytes, start, end))
    }

    #[test]
    fn empty_input_has_no_stats() {
        assert!(compute_stats(&[]).is_none());
    }

    #[test]
    fn durations_and_bytes_are_summarized() {
        let stats = compute_stats(&[download(100, 10), download(300, 30)]).unwrap();
        assert_eq!(stats.count, 2);
        assert_eq!(stats.duration_min, 0.1);
        assert_eq!(stats.duration_max, 0.3);
        assert!((stats.duration_avg - 0.2).abs() < 1e-9);
        assert_eq!(stats.bytes_avg, Some(20.0));
    }

    #[test]
    fn handshakes_have_no_byte_average() {
        let start = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let end = start + TimeDelta::milliseconds(5);
        let m = Measurement::Handshake(HandshakeResult::new(&target(), start, end));
        assert_eq!(compute_stats(&[m]).unwrap().bytes_avg, None);
    }
}
