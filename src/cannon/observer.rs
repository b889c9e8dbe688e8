//! cannon::observer — progress notifications during label inference.
//!
//! The driver reports one event when a batch starts, one per solved star,
//! and one when the batch finishes. Observers are shared across worker
//! threads, so every method takes `&self` and implementations must be
//! `Sync`. Per-star events may arrive out of star order when running in
//! parallel.
use crate::cannon::solver::StarFit;
use tracing::{debug, trace, warn};

/// Receiver of label-inference progress events. All methods default to no-ops.
pub trait InferenceObserver: Sync {
    fn on_start(&self, _nstars: usize, _nlabels: usize) {}

    fn on_star(&self, _star: usize, _fit: &StarFit) {}

    fn on_finish(&self, _nstars: usize, _nfailed: usize) {}
}

/// Ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl InferenceObserver for NoopObserver {}

/// Reports progress through `tracing`.
///
/// - batch start/finish at `debug`,
/// - converged stars at `trace`,
/// - failed stars at `warn`, with the failure reason.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl InferenceObserver for TracingObserver {
    fn on_start(&self, nstars: usize, nlabels: usize) {
        debug!(nstars, nlabels, "inferring labels");
    }

    fn on_star(&self, star: usize, fit: &StarFit) {
        match fit {
            StarFit::Converged { iterations, chi_square, .. } => {
                trace!(star, iterations, chi_square, "star converged");
            }
            StarFit::Failed { reason, .. } => {
                warn!(star, %reason, "label fit failed");
            }
        }
    }

    fn on_finish(&self, nstars: usize, nfailed: usize) {
        debug!(nstars, nfailed, "label inference finished");
    }
}
