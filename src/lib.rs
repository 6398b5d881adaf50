//! wiretime library exposing wire-level timing probes: TCP/TLS handshake
//! time, time to first byte and full download time.

pub mod adapters;
pub mod config;
pub mod domain;
mod error;
pub mod fmt;
pub mod services;
pub mod stats;

pub use config::{ProbeConfig, TlsVerify};
pub use domain::measurement::{Measurement, MeasurementKind};
pub use domain::target::Target;
pub use error::ProbeError;
pub use services::parse::{parse_endpoint, parse_target, parse_url};
pub use services::probe::{measure_download, measure_handshake, measure_ttfb, run_probe};
pub use services::repeat::probe_many;
