//! Semantic similarity over taxonomy graphs.
//!
//! A run loads a typed graph from tabular sources, derives information
//! content scores from it, and scores pairs of entities with configurable
//! pairwise and groupwise measures on a bounded worker pool.

pub mod batch;
pub mod boot;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod errors;
pub mod ic;
pub mod logger;
pub mod measures;
pub mod ontology;

pub use errors::Error;

/// Application results options list
pub type Result<T, E = Error> = std::result::Result<T, E>;
