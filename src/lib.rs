//! Crate root: lightweight module orchestration and public re-exports.
//!
//! Modules:
//! - `parser`: reading the tree block of BEAST/MrBayes NEXUS files.
//! - `taxa`: TRANSLATE tables and the run-wide taxon registry.
//! - `burnin`: dropping leading trees and early MCMC states.
//! - `bitset`: compact bitset representation for tree partitions.
//! - `snapshot`: bipartition snapshots and the validated tree collection.
//! - `distances`: RF / weighted RF / Kuhner-Felsenstein and the pairwise matrix.
//! - `pipeline`: the `pairwise_*` entry operations.
//! - `io`: reading tree files and writing TSV matrices.
//! - `api`: Python bindings via `pyo3` (gated behind "python" feature).

pub mod bitset;
pub mod burnin;
pub mod distances;
pub mod error;
pub mod io;
pub mod parser;
pub mod pipeline;
pub mod snapshot;
pub mod taxa;

#[cfg(feature = "python")]
pub mod api;

// Re-export frequently used types & functions
pub use bitset::Bitset;
pub use burnin::Burnin;
pub use distances::Metric;
pub use error::{ErrorKind, Result, TreeDistError};
pub use io::{TreeSource, read_tree_source, write_matrix_tsv};
pub use pipeline::{
    DistanceOptions, PairwiseResult, load_collection, load_sources, pairwise_kf, pairwise_rf,
    pairwise_weighted_rf,
};
pub use snapshot::{TreeCollection, TreeSnapshot};
pub use taxa::TaxonRegistry;
