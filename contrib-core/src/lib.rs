//! Contribution registry library exports

pub mod catalog;
pub mod config;
