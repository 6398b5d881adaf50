use clap::{Parser, Subcommand};
use console::{Term, set_colors_enabled, style};
use std::io::{self, IsTerminal};
use std::process;
use std::time::Duration;
use tokio::signal;
use tracing_subscriber::EnvFilter;

use wiretime::{
    Measurement, MeasurementKind, ProbeConfig, ProbeError, TlsVerify, fmt,
    fmt::json::TimestampStyle, probe_many, stats::compute_stats,
};

#[derive(Subcommand, Debug, Clone)]
enum Probe {
    /// Time the TCP handshake (plus TLS for https:// targets)
    Handshake {
        /// Target as [scheme://]host:port - Examples: [example.com:22, https://example.com:443, [::1]:8080]
        #[arg(required = true, num_args = 1..)]
        targets: Vec<String>,
    },
    /// Time until the first N bytes of an HTTP response arrive
    Ttfb {
        /// Target as [scheme://]host[:port][/path]
        #[arg(required = true, num_args = 1..)]
        targets: Vec<String>,

        /// Byte threshold that ends the measurement
        #[arg(short = 'b', long, default_value_t = 1024)]
        byte: usize,
    },
    /// Time a full HTTP download until the server closes
    Download {
        /// Target as [scheme://]host[:port][/path]
        #[arg(required = true, num_args = 1..)]
        targets: Vec<String>,

        /// Chunk size per read
        #[arg(long, default_value_t = 1024)]
        chunk: usize,
    },
}

#[derive(Parser, Debug)]
#[command(name = "wiretime")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Wire-level timing probes - handshake, TTFB and download time")]
struct Args {
    #[command(subcommand)]
    probe: Probe,

    /// Human readable timestamps (DD Mon YYYY HH:MM:SS.mmm)
    #[arg(long, global = true)]
    sf: bool,

    /// JSON output
    #[arg(short = 'j', long, global = true)]
    json: bool,

    /// Pretty-print JSON
    #[arg(short = 'p', long, global = true)]
    pretty: bool,

    /// Disable colored output
    #[arg(long = "no-color", alias = "nocolor", global = true)]
    no_color: bool,

    /// Connect timeout in seconds, TLS handshake included
    #[arg(long, default_value_t = 5.0, global = true)]
    timeout: f64,

    /// Per-read timeout in seconds, 0 waits forever
    #[arg(long, default_value_t = 30.0, global = true)]
    read_timeout: f64,

    /// Overall deadline in seconds for reading a response, 0 means none
    #[arg(long = "max-time", default_value_t = 0.0, global = true)]
    max_time: f64,

    /// Verify TLS certificates and host names
    #[arg(long, global = true)]
    verify_tls: bool,

    /// Number of runs per target
    #[arg(short = 'c', long, default_value_t = 1, global = true)]
    count: u32,

    /// Interval between runs in seconds
    #[arg(short = 'i', long, default_value_t = 1.0, global = true)]
    interval: f64,
}

/// Seconds from the command line as a `Duration`, rejecting NaN, negative
/// and out-of-range values.
fn seconds(flag: &str, value: f64, allow_zero: bool) -> Result<Duration, String> {
    Duration::try_from_secs_f64(value)
        .ok()
        .filter(|_| allow_zero || value > 0.0)
        .ok_or_else(|| {
            let bound = if allow_zero { ">= 0" } else { "> 0" };
            format!("--{flag} must be {bound} and at most {} seconds", u64::MAX)
        })
}

/// Optional deadline where 0 disables it.
fn deadline(flag: &str, value: f64) -> Result<Option<Duration>, String> {
    seconds(flag, value, true).map(|d| (!d.is_zero()).then_some(d))
}

impl Args {
    fn config(&self) -> Result<ProbeConfig, String> {
        let mut cfg = ProbeConfig::default()
            .with_connect_timeout(seconds("timeout", self.timeout, false)?)
            .with_read_timeout(deadline("read-timeout", self.read_timeout)?)
            .with_max_duration(deadline("max-time", self.max_time)?)
            .with_tls_verify(if self.verify_tls {
                TlsVerify::Enabled
            } else {
                TlsVerify::Disabled
            });
        match &self.probe {
            Probe::Ttfb { byte, .. } => cfg = cfg.with_threshold_bytes(*byte),
            Probe::Download { chunk, .. } => cfg = cfg.with_chunk_size(*chunk),
            Probe::Handshake { .. } => {}
        }
        Ok(cfg)
    }

    fn kind_and_targets(&self) -> (MeasurementKind, &[String]) {
        match &self.probe {
            Probe::Handshake { targets } => (MeasurementKind::Handshake, targets.as_slice()),
            Probe::Ttfb { targets, .. } => (MeasurementKind::Ttfb, targets.as_slice()),
            Probe::Download { targets, .. } => (MeasurementKind::Download, targets.as_slice()),
        }
    }

    fn ts_style(&self) -> TimestampStyle {
        if self.sf {
            TimestampStyle::Formatted
        } else {
            TimestampStyle::Raw
        }
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging();

    let want_color = !args.json
        && io::stdout().is_terminal()
        && std::env::var_os("NO_COLOR").is_none()
        && !args.no_color;
    set_colors_enabled(want_color);

    let term = Term::stdout();

    if args.count == 0 {
        term.write_line(&style("--count must be at least 1").red().to_string())
            .ok();
        process::exit(2);
    }
    let (cfg, interval) = match args
        .config()
        .and_then(|cfg| Ok((cfg, seconds("interval", args.interval, true)?)))
    {
        Ok(parsed) => parsed,
        Err(msg) => {
            term.write_line(&style(format!("Error: {msg}")).red().to_string())
                .ok();
            process::exit(2);
        }
    };
    if let Err(e) = cfg.validate() {
        process::exit(handle_error(&term, e));
    }

    let (kind, targets) = args.kind_and_targets();
    let repeated = args.count > 1;
    let mut runs: Vec<Vec<Measurement>> = vec![Vec::new(); targets.len()];

    let mut n = 0u32;
    loop {
        match probe_many(kind, targets, &cfg).await {
            Ok(results) => {
                for (i, res) in results.into_iter().enumerate() {
                    output(&term, &res, &args, repeated);
                    runs[i].push(res);
                }
            }
            Err(e) => process::exit(handle_error(&term, e)),
        }
        n += 1;
        if n >= args.count {
            break;
        }
        let sleep = tokio::time::sleep(interval);
        tokio::select! {
            _ = sleep => {},
            _ = signal::ctrl_c() => { break; }
        }
    }

    if repeated {
        for (target, results) in targets.iter().zip(&runs) {
            let Some(stats) = compute_stats(results) else {
                continue;
            };
            if args.json {
                match fmt::json::stats_to_json(kind.as_str(), target, &stats, args.pretty) {
                    Ok(s) => println!("{}", s),
                    Err(e) => eprintln!("error serializing: {}", e),
                }
            } else {
                term.write_line(&fmt::text::render_stats(target, &stats))
                    .ok();
            }
        }
    }

    process::exit(0);
}

fn output(term: &Term, res: &Measurement, args: &Args, repeated: bool) {
    if args.json {
        match fmt::json::to_json(res, args.ts_style(), args.pretty) {
            Ok(s) => println!("{}", s),
            Err(e) => eprintln!("error serializing: {}", e),
        }
    } else if repeated {
        term.write_line(&fmt::text::render_short(res)).ok();
    } else {
        term.write_line(&fmt::text::render_measurement(res, args.ts_style()))
            .ok();
    }
}

fn handle_error(term: &Term, err: ProbeError) -> i32 {
    term.write_line(&style(format!("Error: {}", err)).red().to_string())
        .ok();
    err.exit_code()
}
