//! Progress reporting for catalog refreshes
//!
//! The registry never shows UI. Hosts pass a [`ProgressMonitor`] that the
//! downloader and fetcher report into; it is also the only channel through
//! which refresh failures reach the host.

use super::error::CatalogError;

/// Receives progress and failures from a background refresh
pub trait ProgressMonitor: Send + Sync {
    /// A unit of work started. `total` is in bytes when known.
    fn start_task(&self, _name: &str, _total: Option<u64>) {}

    /// Bytes completed so far for the current task
    fn progress(&self, _done: u64) {}

    /// The refresh completed and the registry was updated
    fn finished(&self) {}

    /// The refresh failed. The registry keeps its previous contents.
    fn error(&self, _error: &CatalogError) {}

    /// Polled between steps; returning true stops the refresh
    fn is_canceled(&self) -> bool {
        false
    }
}

/// Monitor that ignores everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProgressMonitor;

impl ProgressMonitor for NullProgressMonitor {}

/// Monitor that forwards every report to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingProgressMonitor;

impl ProgressMonitor for LoggingProgressMonitor {
    fn start_task(&self, name: &str, total: Option<u64>) {
        match total {
            Some(total) => tracing::info!("{} ({} bytes)", name, total),
            None => tracing::info!("{}", name),
        }
    }

    fn progress(&self, done: u64) {
        tracing::trace!("{} bytes received", done);
    }

    fn finished(&self) {
        tracing::info!("Contribution list updated");
    }

    fn error(&self, error: &CatalogError) {
        tracing::warn!("{}: {}", error.user_message(), error);
    }
}
