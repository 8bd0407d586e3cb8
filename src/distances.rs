//! Tree distance metrics over bipartition snapshots.
//!
//! This module implements three phylogenetic tree distance measures:
//!
//! 1. **Robinson-Foulds (RF)**: number of bipartitions present in exactly
//!    one of the two trees. Range: [0, 2n-6] where n is the number of leaves.
//!
//! 2. **Weighted Robinson-Foulds**: sum over the union of bipartitions of
//!    |length_a - length_b|, a missing bipartition having length 0.
//!
//! 3. **Kuhner-Felsenstein (Branch Score)**: like weighted RF but with
//!    squared differences: sqrt(Σ(length_a - length_b)²)
//!
//! RF is exact integer arithmetic. The two weighted metrics accumulate
//! floats in hash-map iteration order, so repeated runs may differ in the
//! last bits; every matrix cell is still computed exactly once and mirrored,
//! which keeps matrices exactly symmetric.

use phylotree::tree::Tree as PhyloTree;
use rayon::prelude::*;

use crate::error::{Result, TreeDistError};
use crate::snapshot::{TreeSnapshot, leaf_labels};
use crate::taxa::TaxonRegistry;

/// Distance metric selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Rf,
    Weighted,
    Kf,
}

impl Metric {
    pub fn label(&self) -> &'static str {
        match self {
            Metric::Rf => "RF",
            Metric::Weighted => "Weighted RF",
            Metric::Kf => "KF",
        }
    }
}

/// Robinson-Foulds distance from two snapshots.
///
/// # Algorithm
/// RF = |A| + |B| - 2|A ∩ B|
///
/// # Example
/// ```text
/// Tree 1:  ((A,B),(C,D),E)     Splits: {A,B}, {C,D}
/// Tree 2:  ((A,C),(B,D),E)     Splits: {A,C}, {B,D}
///
/// Intersection: 0 splits match
/// RF = 2 + 2 - 2*0 = 4
/// ```
pub fn rf_from_snapshots(a: &TreeSnapshot, b: &TreeSnapshot) -> usize {
    let inter = a.splits.keys().filter(|s| b.contains(s)).count();
    a.len() + b.len() - 2 * inter
}

/// Weighted RF distance from two snapshots.
///
/// For each split:
/// - in both trees: add |length_a - length_b|
/// - only in A: add length_a
/// - only in B: add length_b
pub fn weighted_rf_from_snapshots(a: &TreeSnapshot, b: &TreeSnapshot) -> f64 {
    let mut distance = 0.0;

    for (split, length_a) in &a.splits {
        distance += (length_a - b.length(split)).abs();
    }
    for (split, length_b) in &b.splits {
        if !a.contains(split) {
            distance += length_b;
        }
    }

    distance
}

/// Kuhner-Felsenstein distance from two snapshots.
///
/// Same traversal as [`weighted_rf_from_snapshots`], accumulating squared
/// differences and taking the square root of the sum.
pub fn kf_from_snapshots(a: &TreeSnapshot, b: &TreeSnapshot) -> f64 {
    let mut sum_squared = 0.0;

    for (split, length_a) in &a.splits {
        let diff = length_a - b.length(split);
        sum_squared += diff * diff;
    }
    for (split, length_b) in &b.splits {
        if !a.contains(split) {
            sum_squared += length_b * length_b;
        }
    }

    sum_squared.sqrt()
}

/// Snapshot two standalone trees over their shared taxa.
fn snapshot_pair(tree_a: &PhyloTree, tree_b: &PhyloTree) -> Result<(TreeSnapshot, TreeSnapshot)> {
    let mut registry = TaxonRegistry::new();
    let (labels_a, labels_b) = (leaf_labels(tree_a), leaf_labels(tree_b));
    for label in labels_a.iter().chain(&labels_b) {
        registry.register(label);
    }

    if labels_a.len() != registry.len() || labels_b.len() != registry.len() {
        return Err(TreeDistError::Validation(format!(
            "trees have {} and {} leaves over {} distinct taxa",
            labels_a.len(),
            labels_b.len(),
            registry.len()
        )));
    }

    Ok((
        TreeSnapshot::from_tree(tree_a, &registry)?,
        TreeSnapshot::from_tree(tree_b, &registry)?,
    ))
}

/// Robinson-Foulds distance between two trees over the same taxa.
pub fn robinson_foulds(tree_a: &PhyloTree, tree_b: &PhyloTree) -> Result<usize> {
    let (a, b) = snapshot_pair(tree_a, tree_b)?;
    Ok(rf_from_snapshots(&a, &b))
}

/// Weighted Robinson-Foulds distance between two trees over the same taxa.
pub fn weighted_robinson_foulds(tree_a: &PhyloTree, tree_b: &PhyloTree) -> Result<f64> {
    let (a, b) = snapshot_pair(tree_a, tree_b)?;
    Ok(weighted_rf_from_snapshots(&a, &b))
}

/// Kuhner-Felsenstein distance between two trees over the same taxa.
pub fn kuhner_felsenstein(tree_a: &PhyloTree, tree_b: &PhyloTree) -> Result<f64> {
    let (a, b) = snapshot_pair(tree_a, tree_b)?;
    Ok(kf_from_snapshots(&a, &b))
}

/// All-pairs matrix of `distance` over `snapshots`.
///
/// Unordered pairs (i < j) are spread over the rayon pool; each result is
/// written to `[i][j]` and mirrored to `[j][i]`. The diagonal stays at
/// `T::default()`.
pub fn pairwise_matrix<T, F>(snapshots: &[TreeSnapshot], distance: F) -> Vec<Vec<T>>
where
    T: Copy + Default + Send,
    F: Fn(&TreeSnapshot, &TreeSnapshot) -> T + Sync,
{
    let n = snapshots.len();
    let mut matrix = vec![vec![T::default(); n]; n];

    let pairs: Vec<(usize, usize, T)> = (0..n)
        .into_par_iter()
        .flat_map_iter(|i| (i + 1..n).map(move |j| (i, j)))
        .map(|(i, j)| (i, j, distance(&snapshots[i], &snapshots[j])))
        .collect();

    for (i, j, dist) in pairs {
        matrix[i][j] = dist;
        matrix[j][i] = dist;
    }

    matrix
}

#[cfg(test)]
mod tests {
    use super::*;
    use itertools::Itertools;

    // Reference trees and RF distances from
    // https://evolution.genetics.washington.edu/phylip/doc/treedist.html
    const TREEDIST_TREES: [&str; 12] = [
        "(A:0.1,(B:0.1,(H:0.1,(D:0.1,(J:0.1,(((G:0.1,E:0.1):0.1,(F:0.1,I:0.1):0.1):0.1,C:0.1):0.1):0.1):0.1):0.1):0.1);",
        "(A:0.1,(B:0.1,(D:0.1,((J:0.1,H:0.1):0.1,(((G:0.1,E:0.1):0.1,(F:0.1,I:0.1):0.1):0.1,C:0.1):0.1):0.1):0.1):0.1);",
        "(A:0.1,(B:0.1,(D:0.1,(H:0.1,(J:0.1,(((G:0.1,E:0.1):0.1,(F:0.1,I:0.1):0.1):0.1,C:0.1):0.1):0.1):0.1):0.1):0.1);",
        "(A:0.1,(B:0.1,(E:0.1,(G:0.1,((F:0.1,I:0.1):0.1,((J:0.1,(H:0.1,D:0.1):0.1):0.1,C:0.1):0.1):0.1):0.1):0.1):0.1);",
        "(A:0.1,(B:0.1,(E:0.1,(G:0.1,((F:0.1,I:0.1):0.1,(((J:0.1,H:0.1):0.1,D:0.1):0.1,C:0.1):0.1):0.1):0.1):0.1):0.1);",
        "(A:0.1,(B:0.1,(E:0.1,((F:0.1,I:0.1):0.1,(G:0.1,((J:0.1,(H:0.1,D:0.1):0.1):0.1,C:0.1):0.1):0.1):0.1):0.1):0.1);",
        "(A:0.1,(B:0.1,(E:0.1,((F:0.1,I:0.1):0.1,(G:0.1,(((J:0.1,H:0.1):0.1,D:0.1):0.1,C:0.1):0.1):0.1):0.1):0.1):0.1);",
        "(A:0.1,(B:0.1,(E:0.1,((G:0.1,(F:0.1,I:0.1):0.1):0.1,((J:0.1,(H:0.1,D:0.1):0.1):0.1,C:0.1):0.1):0.1):0.1):0.1);",
        "(A:0.1,(B:0.1,(E:0.1,((G:0.1,(F:0.1,I:0.1):0.1):0.1,(((J:0.1,H:0.1):0.1,D:0.1):0.1,C:0.1):0.1):0.1):0.1):0.1);",
        "(A:0.1,(B:0.1,(E:0.1,(G:0.1,((F:0.1,I:0.1):0.1,((J:0.1,(H:0.1,D:0.1):0.1):0.1,C:0.1):0.1):0.1):0.1):0.1):0.1);",
        "(A:0.1,(B:0.1,(D:0.1,(H:0.1,(J:0.1,(((G:0.1,E:0.1):0.1,(F:0.1,I:0.1):0.1):0.1,C:0.1):0.1):0.1):0.1):0.1):0.1);",
        "(A:0.1,(B:0.1,(E:0.1,((G:0.1,(F:0.1,I:0.1):0.1):0.1,((J:0.1,(H:0.1,D:0.1):0.1):0.1,C:0.1):0.1):0.1):0.1):0.1);",
    ];

    const TREEDIST_RF: [[usize; 12]; 12] = [
        [0, 4, 2, 10, 10, 10, 10, 10, 10, 10, 2, 10],
        [4, 0, 2, 10, 8, 10, 8, 10, 8, 10, 2, 10],
        [2, 2, 0, 10, 10, 10, 10, 10, 10, 10, 0, 10],
        [10, 10, 10, 0, 2, 2, 4, 2, 4, 0, 10, 2],
        [10, 8, 10, 2, 0, 4, 2, 4, 2, 2, 10, 4],
        [10, 10, 10, 2, 4, 0, 2, 2, 4, 2, 10, 2],
        [10, 8, 10, 4, 2, 2, 0, 4, 2, 4, 10, 4],
        [10, 10, 10, 2, 4, 2, 4, 0, 2, 2, 10, 0],
        [10, 8, 10, 4, 2, 4, 2, 2, 0, 4, 10, 2],
        [10, 10, 10, 0, 2, 2, 4, 2, 4, 0, 10, 2],
        [2, 2, 0, 10, 10, 10, 10, 10, 10, 10, 0, 10],
        [10, 10, 10, 2, 4, 2, 4, 0, 2, 2, 10, 0],
    ];

    fn treedist_trees() -> Vec<PhyloTree> {
        TREEDIST_TREES
            .iter()
            .map(|nwk| PhyloTree::from_newick(nwk).unwrap())
            .collect()
    }

    #[test]
    fn robinson_foulds_treedist() {
        let trees = treedist_trees();
        for indices in (0..trees.len()).combinations(2) {
            let (i0, i1) = (indices[0], indices[1]);
            assert_eq!(
                robinson_foulds(&trees[i0], &trees[i1]).unwrap(),
                TREEDIST_RF[i0][i1]
            );
        }
    }

    // Every internal branch is 0.1, so each split present in only one tree
    // contributes 0.1 and shared splits contribute nothing.
    #[test]
    fn weighted_robinson_foulds_treedist() {
        let trees = treedist_trees();
        for indices in (0..trees.len()).combinations(2) {
            let (i0, i1) = (indices[0], indices[1]);
            let expected = TREEDIST_RF[i0][i1] as f64 * 0.1;
            let got = weighted_robinson_foulds(&trees[i0], &trees[i1]).unwrap();
            assert!((got - expected).abs() < 1e-12, "[{i0}, {i1}] {got} != {expected}");
        }
    }

    #[test]
    fn kuhner_felsenstein_treedist() {
        let trees = treedist_trees();
        for indices in (0..trees.len()).combinations(2) {
            let (i0, i1) = (indices[0], indices[1]);
            let expected = (TREEDIST_RF[i0][i1] as f64 * 0.01).sqrt();
            let got = kuhner_felsenstein(&trees[i0], &trees[i1]).unwrap();
            assert!((got - expected).abs() < 1e-12, "[{i0}, {i1}] {got} != {expected}");
        }
    }

    #[test]
    fn shared_split_length_difference() {
        let a = PhyloTree::from_newick("((A:1.0,B:1.0):2.0,(C:1.0,D:1.0):2.0,E:1.0);").unwrap();
        let b = PhyloTree::from_newick("((A:1.5,B:1.0):3.0,(C:0.5,D:1.0):2.0,E:1.0);").unwrap();

        assert_eq!(robinson_foulds(&a, &b).unwrap(), 0);
        // Only {A,B} differs: |2.0 - 3.0|
        assert!((weighted_robinson_foulds(&a, &b).unwrap() - 1.0).abs() < 1e-12);
        assert!((kuhner_felsenstein(&a, &b).unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn weighted_and_kf_aggregate_differently() {
        let a = PhyloTree::from_newick("((A:0.1,B:0.1):0.3,(C:0.1,D:0.1):0.4,E:0.1);").unwrap();
        let b = PhyloTree::from_newick("((A:0.1,C:0.1):0.3,(B:0.1,D:0.1):0.4,E:0.1);").unwrap();

        assert_eq!(robinson_foulds(&a, &b).unwrap(), 4);
        let w = weighted_robinson_foulds(&a, &b).unwrap();
        let k = kuhner_felsenstein(&a, &b).unwrap();
        assert!((w - 1.4).abs() < 1e-12);
        assert!((k - 0.5f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn different_taxa_are_rejected() {
        let a = PhyloTree::from_newick("((A,B),(C,D));").unwrap();
        let b = PhyloTree::from_newick("((A,B),(C,E));").unwrap();
        assert!(matches!(
            robinson_foulds(&a, &b),
            Err(TreeDistError::Validation(_))
        ));
    }

    #[test]
    fn pairwise_matrix_is_symmetric_with_zero_diagonal() {
        let trees = treedist_trees();
        let mut registry = TaxonRegistry::new();
        for label in leaf_labels(&trees[0]) {
            registry.register(label);
        }
        let snaps: Vec<TreeSnapshot> = trees
            .iter()
            .map(|t| TreeSnapshot::from_tree(t, &registry).unwrap())
            .collect();

        let rf = pairwise_matrix(&snaps, rf_from_snapshots);
        let kf = pairwise_matrix(&snaps, kf_from_snapshots);
        for i in 0..snaps.len() {
            assert_eq!(rf[i][i], 0);
            assert_eq!(kf[i][i], 0.0);
            for j in 0..snaps.len() {
                assert_eq!(rf[i][j], TREEDIST_RF[i][j]);
                assert_eq!(kf[i][j].to_bits(), kf[j][i].to_bits());
            }
        }
    }

    #[test]
    fn single_snapshot_gives_one_by_one_matrix() {
        let m = pairwise_matrix(&[TreeSnapshot::default()], weighted_rf_from_snapshots);
        assert_eq!(m, vec![vec![0.0]]);
    }
}
