//! Filter queries over contribution records
//!
//! A query is a category constraint plus a list of tokens that must all
//! match. Structured tokens look like `is:installed`; anything without a
//! colon is a case-insensitive free-text search.
//!
//! Unrecognized structured tokens (e.g. `by:someone`) match every record so
//! that query strings written for newer hosts keep working.

use std::sync::Arc;

use super::record::ContributionRecord;

/// A single parsed filter token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterToken {
    /// `has:update` or `has:updates`
    HasUpdate,
    /// `is:installed`
    Installed,
    /// `not:installed`
    NotInstalled,
    /// Any other `key:value` token. Always matches.
    Unknown(String),
    /// Free-text search, already lower-cased
    Text(String),
}

impl FilterToken {
    pub fn parse(token: &str) -> Self {
        match token {
            "has:update" | "has:updates" => FilterToken::HasUpdate,
            "is:installed" => FilterToken::Installed,
            "not:installed" => FilterToken::NotInstalled,
            other if other.contains(':') => FilterToken::Unknown(other.to_string()),
            other => FilterToken::Text(other.to_lowercase()),
        }
    }

    pub fn matches(&self, record: &ContributionRecord) -> bool {
        match self {
            FilterToken::HasUpdate => record.has_updates(),
            FilterToken::Installed => record.installed,
            FilterToken::NotInstalled => !record.installed,
            FilterToken::Unknown(_) => true,
            FilterToken::Text(needle) => text_matches(record, needle),
        }
    }
}

/// A parsed filter: optional category plus AND-ed tokens
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterQuery {
    pub category: Option<String>,
    pub tokens: Vec<FilterToken>,
}

impl FilterQuery {
    pub fn new<S: AsRef<str>>(category: Option<&str>, filters: &[S]) -> Self {
        let tokens: Vec<FilterToken> = filters
            .iter()
            .map(|f| FilterToken::parse(f.as_ref()))
            .collect();

        for token in &tokens {
            if let FilterToken::Unknown(raw) = token {
                tracing::debug!("Ignoring unrecognized filter '{}'", raw);
            }
        }

        Self {
            category: category.map(String::from),
            tokens,
        }
    }

    /// Build a query from search-box text, splitting on whitespace
    pub fn parse(category: Option<&str>, query: &str) -> Self {
        let filters: Vec<&str> = query.split_whitespace().collect();
        Self::new(category, &filters)
    }

    pub fn matches(&self, record: &ContributionRecord) -> bool {
        if let Some(category) = &self.category {
            if record.category.as_deref() != Some(category.as_str()) {
                return false;
            }
        }
        self.tokens.iter().all(|token| token.matches(record))
    }

    /// Keep matching records, preserving input order
    pub fn apply(&self, records: &[Arc<ContributionRecord>]) -> Vec<Arc<ContributionRecord>> {
        records
            .iter()
            .filter(|record| self.matches(record))
            .cloned()
            .collect()
    }
}

/// Filter `records` by category and tokens
pub fn filter<S: AsRef<str>>(
    category: Option<&str>,
    filters: &[S],
    records: &[Arc<ContributionRecord>],
) -> Vec<Arc<ContributionRecord>> {
    FilterQuery::new(category, filters).apply(records)
}

fn text_matches(record: &ContributionRecord, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }

    let contains = |field: Option<&str>| field.is_some_and(|f| f.to_lowercase().contains(needle));

    record
        .authors
        .iter()
        .any(|author| contains(Some(author.name.as_str())))
        || contains(record.short_description.as_deref())
        || contains(record.long_description.as_deref())
        || contains(record.category.as_deref())
        || contains(Some(record.name.as_str()))
}
