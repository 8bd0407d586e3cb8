//! The three entry operations: read → burn-in → validate → distances.
//!
//! Everything up to the distance phase is metric independent, so all three
//! operations return identical `names` for identical inputs and options.

use std::path::Path;
use std::time::Instant;

use log::info;
use rayon::prelude::*;

use crate::burnin::{Burnin, ensure_trees_left};
use crate::distances::{
    Metric, kf_from_snapshots, pairwise_matrix, rf_from_snapshots, weighted_rf_from_snapshots,
};
use crate::error::{Result, TreeDistError};
use crate::io::{TreeSource, read_tree_source};
use crate::parser::{TreeRecord, parse_tree_file};
use crate::snapshot::{TreeCollection, TreeSnapshot};

/// Per-run options shared by all metrics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DistanceOptions {
    pub burnin: Burnin,
    /// Rewrite leaf codes through each file's TRANSLATE table.
    pub use_real_taxa: bool,
}

impl DistanceOptions {
    /// Options from caller-supplied signed burn-in values; negatives are a
    /// [`TreeDistError::Range`].
    pub fn new(burnin_trees: i64, burnin_states: i64, use_real_taxa: bool) -> Result<Self> {
        Ok(DistanceOptions {
            burnin: Burnin::checked(burnin_trees, burnin_states)?,
            use_real_taxa,
        })
    }
}

/// Tree names aligned 1:1 with the rows and columns of `matrix`.
#[derive(Debug, Clone, PartialEq)]
pub struct PairwiseResult<T> {
    pub names: Vec<String>,
    pub matrix: Vec<Vec<T>>,
}

impl<T> PairwiseResult<T> {
    pub fn into_parts(self) -> (Vec<String>, Vec<Vec<T>>) {
        (self.names, self.matrix)
    }
}

fn parse_and_filter(source: &TreeSource, options: &DistanceOptions) -> Result<Vec<TreeRecord>> {
    let records = parse_tree_file(&source.id, &source.content, options.use_real_taxa)?;
    let total = records.len();
    let kept = options.burnin.apply(records);
    info!("{}: kept {} of {} trees after burn-in", source.id, kept.len(), total);
    Ok(kept)
}

fn assemble(per_file: Vec<Vec<TreeRecord>>) -> Result<TreeCollection> {
    let records: Vec<TreeRecord> = per_file.into_iter().flatten().collect();
    ensure_trees_left(&records)?;
    TreeCollection::build(records)
}

/// Build the validated collection from in-memory sources, in source order.
pub fn load_sources(sources: &[TreeSource], options: &DistanceOptions) -> Result<TreeCollection> {
    if sources.is_empty() {
        return Err(TreeDistError::Input("no tree files provided".into()));
    }
    let per_file = sources
        .par_iter()
        .map(|source| parse_and_filter(source, options))
        .collect::<Result<Vec<_>>>()?;
    assemble(per_file)
}

/// Build the validated collection from tree files, in path order.
pub fn load_collection<P: AsRef<Path> + Sync>(
    paths: &[P],
    options: &DistanceOptions,
) -> Result<TreeCollection> {
    if paths.is_empty() {
        return Err(TreeDistError::Input("no tree files provided".into()));
    }
    let start = Instant::now();
    let per_file = paths
        .par_iter()
        .map(|path| parse_and_filter(&read_tree_source(path)?, options))
        .collect::<Result<Vec<_>>>()?;
    let collection = assemble(per_file)?;
    info!(
        "read {} trees over {} taxa from {} file(s) in {:.3}s",
        collection.len(),
        collection.registry().len(),
        paths.len(),
        start.elapsed().as_secs_f64()
    );
    Ok(collection)
}

/// Compute the matrix for `collection` and pair it with the tree names.
pub fn assemble_result<T, F>(collection: TreeCollection, metric: Metric, distance: F) -> PairwiseResult<T>
where
    T: Copy + Default + Send,
    F: Fn(&TreeSnapshot, &TreeSnapshot) -> T + Sync,
{
    let n = collection.len();
    let start = Instant::now();
    let matrix = pairwise_matrix(collection.snapshots(), distance);
    info!(
        "{} distances for {} pairs in {:.3}s",
        metric.label(),
        n * n.saturating_sub(1) / 2,
        start.elapsed().as_secs_f64()
    );
    PairwiseResult {
        names: collection.into_names(),
        matrix,
    }
}

pub fn rf_matrix(collection: TreeCollection) -> PairwiseResult<usize> {
    assemble_result(collection, Metric::Rf, rf_from_snapshots)
}

pub fn weighted_rf_matrix(collection: TreeCollection) -> PairwiseResult<f64> {
    assemble_result(collection, Metric::Weighted, weighted_rf_from_snapshots)
}

pub fn kf_matrix(collection: TreeCollection) -> PairwiseResult<f64> {
    assemble_result(collection, Metric::Kf, kf_from_snapshots)
}

/// Pairwise Robinson-Foulds distances between all retained trees of `paths`.
pub fn pairwise_rf<P: AsRef<Path> + Sync>(
    paths: &[P],
    options: &DistanceOptions,
) -> Result<PairwiseResult<usize>> {
    Ok(rf_matrix(load_collection(paths, options)?))
}

/// Pairwise weighted Robinson-Foulds distances between all retained trees.
pub fn pairwise_weighted_rf<P: AsRef<Path> + Sync>(
    paths: &[P],
    options: &DistanceOptions,
) -> Result<PairwiseResult<f64>> {
    Ok(weighted_rf_matrix(load_collection(paths, options)?))
}

/// Pairwise Kuhner-Felsenstein distances between all retained trees.
pub fn pairwise_kf<P: AsRef<Path> + Sync>(
    paths: &[P],
    options: &DistanceOptions,
) -> Result<PairwiseResult<f64>> {
    Ok(kf_matrix(load_collection(paths, options)?))
}
