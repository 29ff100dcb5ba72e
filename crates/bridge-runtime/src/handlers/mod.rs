//! # Handlers Module
//!
//! Read paths served from committed snapshots.

pub mod query;

pub use query::QueryService;
