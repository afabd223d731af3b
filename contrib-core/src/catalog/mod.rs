//! Contribution catalog - advertised and installed contributions
//!
//! This module reconciles the remotely published contribution catalog with
//! the contributions installed on this machine.
//!
//! # Architecture
//!
//! ```text
//! CatalogFetcher (tokio task)
//!     │
//!     ├── Downloader        ← file:// or http(s):// backend
//!     ├── parser            ← contributions.xml → records
//!     ▼
//! ContributionListing       ← advertised pool, all records, by category
//!     │
//!     └── ChangeNotifier    ← added / removed / changed listeners
//!
//! host ── update_installed_list ──► ContributionListing
//! ```

mod downloader;
mod error;
mod fetcher;
pub mod filter;
mod listing;
mod notifier;
pub mod parser;
mod progress;
mod record;

pub use downloader::{downloader_for_url, Downloader, FileDownloader};
#[cfg(feature = "http")]
pub use downloader::HttpDownloader;
pub use error::CatalogError;
pub use fetcher::{CatalogFetcher, RefreshStatus, RefreshTask};
pub use filter::{FilterQuery, FilterToken};
pub use listing::ContributionListing;
pub use notifier::{ChangeNotifier, ContributionChange, ContributionListener};
pub use progress::{LoggingProgressMonitor, NullProgressMonitor, ProgressMonitor};
pub use record::{compare_records, Author, ContributionRecord, ContributionType};

#[cfg(test)]
mod tests;
