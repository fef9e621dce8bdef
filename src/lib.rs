//! econpulse library
//!
//! Exposes the data, cache, statistics, and insight modules for use by the
//! binary and integration tests.

pub mod cache;
pub mod cli;
pub mod dashboard;
pub mod data;
pub mod insights;
pub mod report;
pub mod stats;
