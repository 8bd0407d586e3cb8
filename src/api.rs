//! Python binding layer for tree distance calculations.
//!
//! Provides Python functions for computing pairwise tree distances
//! from BEAST/NEXUS tree files.

use pyo3::create_exception;
use pyo3::exceptions::{PyOverflowError, PyValueError};
use pyo3::prelude::*;

use crate::error::{ErrorKind, TreeDistError};
use crate::pipeline::{self, DistanceOptions, PairwiseResult};

create_exception!(posterior_tree_distances, RangeError, PyOverflowError);
create_exception!(posterior_tree_distances, InputError, PyValueError);
create_exception!(posterior_tree_distances, TreeParseError, PyValueError);
create_exception!(posterior_tree_distances, ValidationError, PyValueError);
create_exception!(posterior_tree_distances, EmptyResultError, PyValueError);

fn to_pyerr(e: TreeDistError) -> PyErr {
    let msg = e.to_string();
    match e.kind() {
        ErrorKind::Range => RangeError::new_err(msg),
        ErrorKind::Input => InputError::new_err(msg),
        ErrorKind::Parse => TreeParseError::new_err(msg),
        ErrorKind::Validation => ValidationError::new_err(msg),
        ErrorKind::EmptyResult => EmptyResultError::new_err(msg),
    }
}

fn run<T>(
    paths: Vec<String>,
    burnin_trees: i64,
    burnin_states: i64,
    use_real_taxa: bool,
    compute: fn(&[String], &DistanceOptions) -> crate::Result<PairwiseResult<T>>,
) -> PyResult<(Vec<String>, Vec<Vec<T>>)> {
    let options = DistanceOptions::new(burnin_trees, burnin_states, use_real_taxa).map_err(to_pyerr)?;
    compute(&paths, &options)
        .map(PairwiseResult::into_parts)
        .map_err(to_pyerr)
}

/// Compute pairwise Robinson-Foulds distances from multiple tree files.
///
/// Args:
///     paths: List of file paths to BEAST/NEXUS tree files
///     burnin_trees: Number of trees to skip at the beginning of each file (default: 0)
///     burnin_states: Minimum STATE value to keep trees (default: 0)
///     use_real_taxa: Use TRANSLATE block for taxon names when available (default: False)
///
/// Returns:
///     A tuple of (tree_names, distance_matrix) where:
///     - tree_names is a list of tree identifiers
///     - distance_matrix is a 2D list of RF distances
///
/// Raises:
///     RangeError: If a burn-in value is negative (an OverflowError)
///     InputError, TreeParseError, ValidationError, EmptyResultError:
///         all subclasses of ValueError
#[pyfunction]
#[pyo3(signature = (paths, burnin_trees=0, burnin_states=0, use_real_taxa=false))]
fn pairwise_rf(
    paths: Vec<String>,
    burnin_trees: i64,
    burnin_states: i64,
    use_real_taxa: bool,
) -> PyResult<(Vec<String>, Vec<Vec<usize>>)> {
    run(paths, burnin_trees, burnin_states, use_real_taxa, pipeline::pairwise_rf)
}

/// Compute pairwise Weighted Robinson-Foulds distances from multiple tree files.
///
/// This metric considers branch lengths when comparing trees.
/// Arguments, return value and exceptions as for `pairwise_rf`.
#[pyfunction]
#[pyo3(signature = (paths, burnin_trees=0, burnin_states=0, use_real_taxa=false))]
fn pairwise_weighted_rf(
    paths: Vec<String>,
    burnin_trees: i64,
    burnin_states: i64,
    use_real_taxa: bool,
) -> PyResult<(Vec<String>, Vec<Vec<f64>>)> {
    run(paths, burnin_trees, burnin_states, use_real_taxa, pipeline::pairwise_weighted_rf)
}

/// Compute pairwise Kuhner-Felsenstein (Branch Score) distances from multiple tree files.
///
/// This metric uses squared differences of branch lengths: sqrt(Σ(length_a - length_b)²)
/// Arguments, return value and exceptions as for `pairwise_rf`.
#[pyfunction]
#[pyo3(signature = (paths, burnin_trees=0, burnin_states=0, use_real_taxa=false))]
fn pairwise_kf(
    paths: Vec<String>,
    burnin_trees: i64,
    burnin_states: i64,
    use_real_taxa: bool,
) -> PyResult<(Vec<String>, Vec<Vec<f64>>)> {
    run(paths, burnin_trees, burnin_states, use_real_taxa, pipeline::pairwise_kf)
}

/// Python module definition
#[pymodule]
fn posterior_tree_distances(m: &Bound<'_, PyModule>) -> PyResult<()> {
    let py = m.py();
    m.add("RangeError", py.get_type::<RangeError>())?;
    m.add("InputError", py.get_type::<InputError>())?;
    m.add("TreeParseError", py.get_type::<TreeParseError>())?;
    m.add("ValidationError", py.get_type::<ValidationError>())?;
    m.add("EmptyResultError", py.get_type::<EmptyResultError>())?;
    m.add_function(wrap_pyfunction!(pairwise_rf, m)?)?;
    m.add_function(wrap_pyfunction!(pairwise_weighted_rf, m)?)?;
    m.add_function(wrap_pyfunction!(pairwise_kf, m)?)?;
    Ok(())
}
