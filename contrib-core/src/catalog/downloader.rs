//! Catalog download backends
//!
//! The fetcher only sees the [`Downloader`] trait. Two backends ship with
//! the crate:
//! - [`FileDownloader`] - reads `file://` URLs and plain paths
//! - `HttpDownloader` - HTTP(S) via reqwest (requires the `http` feature)

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;

use super::error::CatalogError;
use super::progress::ProgressMonitor;
use crate::config::ListingConfig;

/// Fetches raw catalog bytes
#[async_trait]
pub trait Downloader: Send + Sync {
    /// Download `url`, reporting progress to `progress`.
    ///
    /// Timeouts are the backend's business; the fetcher applies none.
    async fn download(
        &self,
        url: &str,
        progress: &dyn ProgressMonitor,
    ) -> Result<Vec<u8>, CatalogError>;

    /// Backend identifier for logging
    fn name(&self) -> &'static str;
}

/// Reads catalogs from the local filesystem
#[derive(Debug, Default, Clone, Copy)]
pub struct FileDownloader;

impl FileDownloader {
    fn path_for(url: &str) -> PathBuf {
        PathBuf::from(url.strip_prefix("file://").unwrap_or(url))
    }
}

#[async_trait]
impl Downloader for FileDownloader {
    async fn download(
        &self,
        url: &str,
        progress: &dyn ProgressMonitor,
    ) -> Result<Vec<u8>, CatalogError> {
        let path = Self::path_for(url);
        progress.start_task("Reading contribution list", None);

        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|source| CatalogError::Io {
                context: path.display().to_string(),
                source,
            })?;

        progress.progress(bytes.len() as u64);
        Ok(bytes)
    }

    fn name(&self) -> &'static str {
        "file"
    }
}

/// Downloads catalogs over HTTP(S)
#[cfg(feature = "http")]
pub struct HttpDownloader {
    client: reqwest::Client,
}

#[cfg(feature = "http")]
impl HttpDownloader {
    pub fn new(config: &ListingConfig) -> Result<Self, CatalogError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(std::time::Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| {
                CatalogError::ParseConfiguration(format!("Failed to create HTTP client: {e}"))
            })?;

        Ok(Self { client })
    }
}

#[cfg(feature = "http")]
#[async_trait]
impl Downloader for HttpDownloader {
    async fn download(
        &self,
        url: &str,
        progress: &dyn ProgressMonitor,
    ) -> Result<Vec<u8>, CatalogError> {
        let download_error = |message: String| CatalogError::Download {
            url: url.to_string(),
            message,
        };

        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| download_error(e.to_string()))?;

        if !response.status().is_success() {
            return Err(download_error(format!("HTTP {}", response.status())));
        }

        progress.start_task("Downloading contribution list", response.content_length());

        let mut bytes = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| download_error(e.to_string()))?
        {
            if progress.is_canceled() {
                return Err(CatalogError::Canceled);
            }
            bytes.extend_from_slice(&chunk);
            progress.progress(bytes.len() as u64);
        }

        tracing::debug!("Downloaded {} bytes from {}", bytes.len(), url);
        Ok(bytes)
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

/// Pick a backend for `url` based on its scheme
pub fn downloader_for_url(
    url: &str,
    config: &ListingConfig,
) -> Result<Arc<dyn Downloader>, CatalogError> {
    if url.starts_with("http://") || url.starts_with("https://") {
        http_downloader(config)
    } else {
        Ok(Arc::new(FileDownloader))
    }
}

#[cfg(feature = "http")]
fn http_downloader(config: &ListingConfig) -> Result<Arc<dyn Downloader>, CatalogError> {
    Ok(Arc::new(HttpDownloader::new(config)?))
}

#[cfg(not(feature = "http"))]
fn http_downloader(_config: &ListingConfig) -> Result<Arc<dyn Downloader>, CatalogError> {
    Err(CatalogError::ParseConfiguration(
        "HTTP catalogs need the `http` feature. Rebuild with --features http".to_string(),
    ))
}

#[cfg(test)]
mod downloader_tests {
    use super::*;
    use crate::catalog::progress::NullProgressMonitor;

    #[tokio::test]
    async fn test_file_downloader_reads_plain_and_file_urls() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("contributions.xml");
        std::fs::write(&path, b"<contributions/>").unwrap();

        let plain = FileDownloader
            .download(path.to_str().unwrap(), &NullProgressMonitor)
            .await
            .unwrap();
        assert_eq!(plain, b"<contributions/>");

        let url = format!("file://{}", path.display());
        let via_url = FileDownloader
            .download(&url, &NullProgressMonitor)
            .await
            .unwrap();
        assert_eq!(via_url, plain);
    }

    #[tokio::test]
    async fn test_file_downloader_missing_file() {
        let err = FileDownloader
            .download("/definitely/not/here/contributions.xml", &NullProgressMonitor)
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::Io { .. }));
    }

    #[test]
    fn test_local_paths_use_file_backend() {
        let config = ListingConfig::default();
        let downloader = downloader_for_url("/tmp/contributions.xml", &config).unwrap();
        assert_eq!(downloader.name(), "file");
    }

    #[cfg(feature = "http")]
    #[test]
    fn test_http_urls_use_http_backend() {
        let config = ListingConfig::default();
        let downloader = downloader_for_url("https://example.com/contributions.xml", &config).unwrap();
        assert_eq!(downloader.name(), "http");
    }

    #[cfg(not(feature = "http"))]
    #[test]
    fn test_http_urls_need_http_feature() {
        let config = ListingConfig::default();
        let err = downloader_for_url("https://example.com/contributions.xml", &config).err().unwrap();
        assert!(matches!(err, CatalogError::ParseConfiguration(_)));
    }
}
