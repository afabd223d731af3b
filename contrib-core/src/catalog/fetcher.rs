//! Background catalog refresh
//!
//! Download → parse → `set_advertised_list`, run as a tokio task so callers
//! never block on the network. Every failure ends at the progress monitor;
//! the listing keeps its last good contents.

use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::downloader::{downloader_for_url, Downloader};
use super::error::CatalogError;
use super::listing::ContributionListing;
use super::parser;
use super::progress::ProgressMonitor;
use super::record::ContributionRecord;
use crate::config::ListingConfig;

/// How a refresh ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshStatus {
    /// The listing now holds `entries` advertised records
    Completed { entries: usize },
    /// Download or parse failed; the listing is unchanged
    Failed,
    /// Canceled before the listing was touched
    Canceled,
}

/// Fetches and parses the published catalog
#[derive(Clone)]
pub struct CatalogFetcher {
    downloader: Arc<dyn Downloader>,
    url: String,
}

impl CatalogFetcher {
    pub fn new(downloader: Arc<dyn Downloader>, url: impl Into<String>) -> Self {
        Self {
            downloader,
            url: url.into(),
        }
    }

    /// Fetcher for the configured catalog URL
    pub fn from_config(config: &ListingConfig) -> Result<Self, CatalogError> {
        let downloader = downloader_for_url(&config.catalog_url, config)?;
        Ok(Self::new(downloader, config.catalog_url.clone()))
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Download and parse the catalog without touching any listing
    pub async fn fetch(
        &self,
        progress: &dyn ProgressMonitor,
    ) -> Result<Vec<ContributionRecord>, CatalogError> {
        tracing::debug!(
            "Fetching catalog from {} via {} backend",
            self.url,
            self.downloader.name()
        );

        let bytes = self.downloader.download(&self.url, progress).await?;
        if progress.is_canceled() {
            return Err(CatalogError::Canceled);
        }
        parser::parse_bytes(&bytes)
    }

    /// Fetch, parse and install the catalog into `listing` on the current task.
    ///
    /// The merge and its listener callbacks run inline. Prefer
    /// [`refresh_shared`](Self::refresh_shared) on a runtime worker.
    pub async fn refresh(
        &self,
        listing: &ContributionListing,
        progress: &dyn ProgressMonitor,
    ) -> RefreshStatus {
        let result: Result<usize, CatalogError> = async {
            let records = self.fetch_for_merge(progress).await?;
            let entries = records.len();
            listing.set_advertised_list(records)?;
            Ok(entries)
        }
        .await;

        self.report(result, progress)
    }

    /// Like [`refresh`](Self::refresh), but the merge into `listing` runs on
    /// tokio's blocking pool, so slow listeners or a long foreground mutation
    /// holding the writer gate never stall a runtime worker.
    pub async fn refresh_shared(
        &self,
        listing: Arc<ContributionListing>,
        progress: &dyn ProgressMonitor,
    ) -> RefreshStatus {
        let result: Result<usize, CatalogError> = async move {
            let records = self.fetch_for_merge(progress).await?;
            let entries = records.len();
            match tokio::task::spawn_blocking(move || listing.set_advertised_list(records)).await {
                Ok(merged) => merged?,
                Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
                Err(_) => return Err(CatalogError::Canceled),
            }
            Ok(entries)
        }
        .await;

        self.report(result, progress)
    }

    async fn fetch_for_merge(
        &self,
        progress: &dyn ProgressMonitor,
    ) -> Result<Vec<ContributionRecord>, CatalogError> {
        let records = self.fetch(progress).await?;
        if progress.is_canceled() {
            return Err(CatalogError::Canceled);
        }
        Ok(records)
    }

    fn report(
        &self,
        result: Result<usize, CatalogError>,
        progress: &dyn ProgressMonitor,
    ) -> RefreshStatus {
        match result {
            Ok(entries) => {
                info!("Fetched {} contributions from {}", entries, self.url);
                progress.finished();
                RefreshStatus::Completed { entries }
            }
            Err(CatalogError::Canceled) => {
                info!("Catalog refresh from {} canceled", self.url);
                progress.error(&CatalogError::Canceled);
                RefreshStatus::Canceled
            }
            Err(err) => {
                warn!(
                    kind = err.kind(),
                    "Failed to refresh catalog from {}: {}", self.url, err
                );
                progress.error(&err);
                RefreshStatus::Failed
            }
        }
    }
}

impl std::fmt::Debug for CatalogFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogFetcher")
            .field("downloader", &self.downloader.name())
            .field("url", &self.url)
            .finish()
    }
}

/// Handle to a refresh running in the background
#[derive(Debug)]
pub struct RefreshTask {
    handle: JoinHandle<RefreshStatus>,
}

impl RefreshTask {
    /// Abort the refresh. Has no effect once the listing was updated.
    pub fn cancel(&self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the refresh to end
    pub async fn wait(self) -> RefreshStatus {
        match self.handle.await {
            Ok(status) => status,
            Err(err) if err.is_cancelled() => RefreshStatus::Canceled,
            Err(err) => {
                tracing::error!("Catalog refresh task failed: {}", err);
                RefreshStatus::Failed
            }
        }
    }
}

impl ContributionListing {
    /// Start a background refresh of the advertised list.
    ///
    /// Must be called from within a tokio runtime. The download runs on a
    /// runtime task and the merge on the blocking pool, where listeners are
    /// called. Canceling has no effect once the merge has started. Failures
    /// are reported to `progress` only.
    pub fn refresh_advertised_list_async(
        self: &Arc<Self>,
        fetcher: CatalogFetcher,
        progress: Arc<dyn ProgressMonitor>,
    ) -> RefreshTask {
        let listing = Arc::clone(self);
        let handle =
            tokio::spawn(async move { fetcher.refresh_shared(listing, progress.as_ref()).await });
        RefreshTask { handle }
    }
}
