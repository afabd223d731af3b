//! Contribution records
//!
//! A record describes one installable contribution, either as advertised
//! in the remote catalog or as found installed on the local machine.

use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;
use std::sync::{Arc, Weak};

/// Kind of contribution a record describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContributionType {
    Library,
    LibraryCompilation,
    Mode,
    Tool,
}

impl ContributionType {
    /// Catalog element name for this type
    pub fn as_str(&self) -> &'static str {
        match self {
            ContributionType::Library => "library",
            ContributionType::LibraryCompilation => "librarycompilation",
            ContributionType::Mode => "mode",
            ContributionType::Tool => "tool",
        }
    }
}

impl fmt::Display for ContributionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Author credited on a contribution
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Author {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Author {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: None,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

/// Metadata for a single contribution
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionRecord {
    /// Identifier, unique within a contribution type
    pub name: String,

    /// Contribution type
    #[serde(rename = "type")]
    pub contribution_type: ContributionType,

    /// Category label used for browsing
    pub category: Option<String>,

    /// Integer version used for update detection
    pub version: i32,

    /// Human-readable version (e.g. "1.0.2")
    pub pretty_version: Option<String>,

    /// Authors in catalog order
    pub authors: Vec<Author>,

    /// One-line summary (`sentence` in the catalog)
    pub short_description: Option<String>,

    /// Longer description (`paragraph` in the catalog)
    pub long_description: Option<String>,

    /// Homepage of the contribution
    pub url: Option<String>,

    /// Where the contribution archive can be downloaded
    pub download_link: Option<String>,

    /// Whether this record describes a locally installed contribution
    pub installed: bool,

    /// Libraries bundled by a compilation, in declaration order
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub member_library_names: Vec<String>,

    /// Matching entry in the advertised pool. Only used to compare versions.
    #[serde(skip)]
    pub advertised_counterpart: Option<Weak<ContributionRecord>>,
}

impl ContributionRecord {
    /// Create a record with the given identity and empty metadata
    pub fn new(name: impl Into<String>, contribution_type: ContributionType) -> Self {
        Self {
            name: name.into(),
            contribution_type,
            category: None,
            version: 0,
            pretty_version: None,
            authors: Vec::new(),
            short_description: None,
            long_description: None,
            url: None,
            download_link: None,
            installed: false,
            member_library_names: Vec::new(),
            advertised_counterpart: None,
        }
    }

    /// Shorthand for a library record
    pub fn library(name: impl Into<String>) -> Self {
        Self::new(name, ContributionType::Library)
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_version(mut self, version: i32) -> Self {
        self.version = version;
        self
    }

    pub fn with_author(mut self, author: Author) -> Self {
        self.authors.push(author);
        self
    }

    pub fn with_short_description(mut self, sentence: impl Into<String>) -> Self {
        self.short_description = Some(sentence.into());
        self
    }

    pub fn with_long_description(mut self, paragraph: impl Into<String>) -> Self {
        self.long_description = Some(paragraph.into());
        self
    }

    pub fn installed(mut self) -> Self {
        self.installed = true;
        self
    }

    /// True if `other` has the same `(name, type)` identity key
    pub fn same_key(&self, other: &ContributionRecord) -> bool {
        self.matches_key(&other.name, other.contribution_type)
    }

    pub fn matches_key(&self, name: &str, contribution_type: ContributionType) -> bool {
        self.contribution_type == contribution_type && self.name == name
    }

    /// The advertised record this one was matched against, if it is still alive
    pub fn advertised(&self) -> Option<Arc<ContributionRecord>> {
        self.advertised_counterpart.as_ref().and_then(Weak::upgrade)
    }

    /// Version published in the catalog for the matched advertised record
    pub fn advertised_version(&self) -> Option<i32> {
        self.advertised().map(|advertised| advertised.version)
    }

    /// True when the advertised counterpart carries a newer version
    pub fn has_updates(&self) -> bool {
        self.advertised_version()
            .is_some_and(|latest| latest > self.version)
    }

    /// Display version, falling back to the integer version
    pub fn version_display(&self) -> String {
        self.pretty_version
            .clone()
            .unwrap_or_else(|| self.version.to_string())
    }

    /// Author names joined for display
    pub fn authors_display(&self) -> String {
        self.authors
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Listing order: case-insensitive name, ties broken by type
pub fn compare_records(a: &ContributionRecord, b: &ContributionRecord) -> Ordering {
    a.name
        .to_lowercase()
        .cmp(&b.name.to_lowercase())
        .then(a.contribution_type.cmp(&b.contribution_type))
}

/// Stable sort of shared records into listing order
pub fn sort_records(records: &mut [Arc<ContributionRecord>]) {
    records.sort_by(|a, b| compare_records(a, b));
}

#[cfg(test)]
mod record_tests {
    use super::*;

    #[test]
    fn test_ordering_ignores_case() {
        let a = ContributionRecord::library("alpha");
        let b = ContributionRecord::library("Beta");
        let c = ContributionRecord::library("gamma");

        assert_eq!(compare_records(&a, &b), Ordering::Less);
        assert_eq!(compare_records(&c, &b), Ordering::Greater);
    }

    #[test]
    fn test_ordering_ties_broken_by_type() {
        let lib = ContributionRecord::new("video", ContributionType::Library);
        let tool = ContributionRecord::new("Video", ContributionType::Tool);

        assert_eq!(compare_records(&lib, &tool), Ordering::Less);
        assert_eq!(compare_records(&tool, &lib), Ordering::Greater);
    }

    #[test]
    fn test_has_updates_follows_counterpart() {
        let advertised = Arc::new(ContributionRecord::library("net").with_version(3));

        let mut installed = ContributionRecord::library("net").with_version(2).installed();
        assert!(!installed.has_updates());

        installed.advertised_counterpart = Some(Arc::downgrade(&advertised));
        assert!(installed.has_updates());
        assert_eq!(installed.advertised_version(), Some(3));

        installed.version = 3;
        assert!(!installed.has_updates());
    }

    #[test]
    fn test_dropped_counterpart_means_no_update() {
        let mut installed = ContributionRecord::library("net").with_version(1);
        {
            let advertised = Arc::new(ContributionRecord::library("net").with_version(5));
            installed.advertised_counterpart = Some(Arc::downgrade(&advertised));
            assert!(installed.has_updates());
        }
        assert!(!installed.has_updates());
    }

    #[test]
    fn test_version_display_falls_back_to_integer() {
        let mut record = ContributionRecord::library("sound").with_version(7);
        assert_eq!(record.version_display(), "7");

        record.pretty_version = Some("1.2.0".to_string());
        assert_eq!(record.version_display(), "1.2.0");
    }
}
