//! Catalog error types
//!
//! Only the parse and fetch boundary can fail. Registry mutations are total.

use thiserror::Error;

/// Failures while obtaining or decoding a catalog
#[derive(Error, Debug)]
pub enum CatalogError {
    /// The parser could not be set up for this document
    #[error("Cannot prepare catalog parser: {0}")]
    ParseConfiguration(String),

    /// The catalog could not be read
    #[error("Failed to read catalog from {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// The document is not well-formed or violates the catalog schema
    #[error("Malformed catalog document at byte {position}: {message}")]
    MalformedDocument { position: u64, message: String },

    /// A downloader could not fetch the catalog
    #[error("Failed to download catalog from {url}: {message}")]
    Download { url: String, message: String },

    /// The refresh was canceled before the registry was updated
    #[error("Catalog refresh was canceled")]
    Canceled,
}

impl CatalogError {
    pub(crate) fn malformed(position: u64, message: impl Into<String>) -> Self {
        CatalogError::MalformedDocument {
            position,
            message: message.into(),
        }
    }

    /// Short category label used in log fields and progress reports
    pub fn kind(&self) -> &'static str {
        match self {
            CatalogError::ParseConfiguration(_) => "parse-configuration",
            CatalogError::Io { .. } | CatalogError::Download { .. } => "io",
            CatalogError::MalformedDocument { .. } => "malformed-document",
            CatalogError::Canceled => "canceled",
        }
    }

    /// Message suitable for showing to a user. The application stays usable
    /// for manual installs whatever went wrong.
    pub fn user_message(&self) -> &'static str {
        match self {
            CatalogError::ParseConfiguration(_) => {
                "An internal error occurred when preparing to read the list of contributions. \
                 You can still install contributions manually."
            }
            CatalogError::Io { .. } | CatalogError::Download { .. } => {
                "An error occurred while reading the list of available contributions. \
                 Try refreshing again later."
            }
            CatalogError::MalformedDocument { .. } => {
                "The downloaded list of contributions appears to be malformed. \
                 You can still install contributions manually."
            }
            CatalogError::Canceled => "Refreshing the list of contributions was canceled.",
        }
    }
}
