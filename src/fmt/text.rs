use chrono::Local;
use console::style;

use super::json::TimestampStyle;
use crate::domain::measurement::{Measurement, Stamp, epoch_seconds, format_timestamp};
use crate::stats::Stats;

fn stamp(ts: Stamp, ts_style: TimestampStyle) -> String {
    match ts_style {
        TimestampStyle::Raw => format!("{:.6}", epoch_seconds(ts)),
        TimestampStyle::Formatted => format_timestamp(ts, &Local),
    }
}

fn human_bytes(n: f64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = n;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{value:.0} {}", UNITS[unit])
    } else {
        format!("{value:.2} {}", UNITS[unit])
    }
}

/// Render one measurement as labelled lines.
pub fn render_measurement(m: &Measurement, ts_style: TimestampStyle) -> String {
    let label = |s: &str| style(s).cyan().bold().to_string();

    let mut out = format!(
        "{} {}\n{} {}",
        label("Target:"),
        style(m.label()).green(),
        label("Probe:"),
        m.kind()
    );

    match m {
        Measurement::Handshake(r) => {
            out.push_str(&format!(
                "\n{} {}",
                label("Transport:"),
                if r.tls { "TCP + TLS" } else { "TCP" }
            ));
        }
        Measurement::Ttfb(r) => {
            out.push_str(&format!("\n{} {} B", label("Threshold:"), r.byte));
        }
        Measurement::Download(r) => {
            out.push_str(&format!("\n{} {} B", label("Chunk:"), r.chunk));
        }
    }

    out.push_str(&format!(
        "\n{} {}\n{} {}\n{} {:.3} ms",
        label("Start:"),
        stamp(m.start_time(), ts_style),
        label("End:"),
        stamp(m.end_time(), ts_style),
        label("Elapsed:"),
        style(m.duration_secs() * 1000.0).yellow(),
    ));

    if let Some(bytes) = m.total_bytes() {
        out.push_str(&format!(
            "\n{} {} ({})",
            label("Received:"),
            bytes,
            human_bytes(bytes as f64)
        ));
    }
    if let Measurement::Download(r) = m {
        if let Some(bps) = r.throughput_bps() {
            out.push_str(&format!(
                "\n{} {}/s",
                label("Throughput:"),
                human_bytes(bps)
            ));
        }
    }

    out
}

/// One line per run, for repeated probes.
pub fn render_short(m: &Measurement) -> String {
    let mut line = format!(
        "{} {}: {}",
        style(m.kind()).bold(),
        style(m.label()).green(),
        style(format!("{:.3} ms", m.duration_secs() * 1000.0)).yellow()
    );
    if let Some(bytes) = m.total_bytes() {
        line.push_str(&format!(" ({bytes} B)"));
    }
    line
}

/// Summary line for repeated probes of one target.
pub fn render_stats(target: &str, stats: &Stats) -> String {
    let mut line = format!(
        "{} {}: avg {:.3} ms, min {:.3} ms, max {:.3} ms over {} runs",
        style("Stats").cyan().bold(),
        style(target).green(),
        stats.duration_avg * 1000.0,
        stats.duration_min * 1000.0,
        stats.duration_max * 1000.0,
        stats.count
    );
    if let Some(bytes) = stats.bytes_avg {
        line.push_str(&format!(", avg {}", human_bytes(bytes)));
    }
    line
}
