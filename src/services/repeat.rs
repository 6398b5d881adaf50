use futures::future::join_all;

use tracing::instrument;

use super::probe::run_probe;
use crate::config::ProbeConfig;
use crate::domain::measurement::{Measurement, MeasurementKind};
use crate::error::ProbeError;

/// Probe many targets concurrently, each over its own connection.
///
/// Fails with the first error in target order; no partial list is returned.
#[instrument(skip(cfg))]
pub async fn probe_many(
    kind: MeasurementKind,
    targets: &[String],
    cfg: &ProbeConfig,
) -> Result<Vec<Measurement>, ProbeError> {
    let futures = targets
        .iter()
        .map(|t| run_probe(kind, t, cfg))
        .collect::<Vec<_>>();
    let results = join_all(futures).await;
    let mut out = Vec::with_capacity(results.len());
    for res in results {
        out.push(res?);
    }
    Ok(out)
}
