//! Bipartition snapshots of parsed trees.
//!
//! # Overview
//! A [`TreeSnapshot`] captures every non-trivial bipartition (split) of a
//! tree together with its branch length. Snapshots are immutable and are
//! compared pairwise in parallel by [`crate::distances`].
//!
//! # What is a bipartition?
//! Removing one edge splits the leaves into two groups:
//! ```text
//!      root
//!     /    \
//!   {A,B}  {C,D}  ← both root edges induce the split {A,B} | {C,D}
//! ```
//!
//! # Taxon indices come from the registry, not from node IDs
//! Node IDs are assigned by the Newick parser and differ between trees.
//! Every leaf is mapped to its label's index in the run-wide
//! [`TaxonRegistry`], so the same taxon sets the same bit in every tree.

use std::collections::{HashMap, HashSet};

use itertools::Itertools;
use log::debug;
use phylotree::tree::Tree as PhyloTree;
use rayon::prelude::*;

use crate::bitset::Bitset;
use crate::error::{Result, TreeDistError};
use crate::parser::TreeRecord;
use crate::taxa::TaxonRegistry;

/// Canonical bipartitions of one tree.
///
/// # Canonicalization
/// A split {A,B}|{C,D} could be stored as either side. We always store the
/// side that does NOT contain taxon 0 of the registry, which makes the
/// representation independent of where the tree was rooted and of the
/// order of children.
///
/// Trees are treated as unrooted. The two edges below a bifurcating root
/// induce one and the same split; they are stored once, with the sum of
/// both edge lengths as its length.
///
/// Trivial splits (one side holding a single taxon) are left out.
#[derive(Debug, Clone, Default)]
pub struct TreeSnapshot {
    /// Canonical split → branch length.
    pub splits: HashMap<Bitset, f64>,
}

impl TreeSnapshot {
    /// Build the snapshot of `tree` over the taxon universe of `registry`.
    ///
    /// Every leaf label must already be registered. Missing branch lengths
    /// count as 0.0; negative or non-finite lengths are rejected.
    pub fn from_tree(tree: &PhyloTree, registry: &TaxonRegistry) -> Result<Self> {
        let fail = |message: String| TreeDistError::Validation(message);
        let num_taxa = registry.len();
        let words = registry.words();
        let root_id = tree
            .get_root()
            .map_err(|e| fail(format!("tree has no root: {e}")))?;

        // Iterative post-order: a node is finished once all its children are.
        let mut clades: HashMap<usize, Bitset> = HashMap::new();
        let mut stack = vec![(root_id, false)];
        let mut splits: HashMap<Bitset, f64> = HashMap::new();

        while let Some((node_id, children_done)) = stack.pop() {
            let node = tree.get(&node_id).map_err(|e| fail(e.to_string()))?;

            if !children_done && !node.children.is_empty() {
                stack.push((node_id, true));
                stack.extend(node.children.iter().map(|&c| (c, false)));
                continue;
            }

            let mut clade = Bitset::zeros(words);
            if node.children.is_empty() {
                let label = node.name.as_deref().unwrap_or_default();
                let idx = registry
                    .index_of(label)
                    .ok_or_else(|| fail(format!("taxon '{label}' is not registered")))?;
                clade.set(idx);
            } else {
                for child in &node.children {
                    if let Some(child_clade) = clades.remove(child) {
                        clade.or_assign(&child_clade);
                    }
                }
            }

            if node_id != root_id {
                let length = node.parent_edge.unwrap_or(0.0);
                if !length.is_finite() || length < 0.0 {
                    return Err(fail(format!("invalid branch length {length}")));
                }

                let side = if clade.contains(0) {
                    clade.complement(num_taxa)
                } else {
                    clade.clone()
                };
                let size = side.count_ones();
                if size > 1 && size + 1 < num_taxa {
                    *splits.entry(side).or_insert(0.0) += length;
                }
            }

            clades.insert(node_id, clade);
        }

        Ok(TreeSnapshot { splits })
    }

    pub fn len(&self) -> usize {
        self.splits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.splits.is_empty()
    }

    pub fn contains(&self, split: &Bitset) -> bool {
        self.splits.contains_key(split)
    }

    /// Branch length of `split`, 0.0 when the tree lacks it.
    pub fn length(&self, split: &Bitset) -> f64 {
        self.splits.get(split).copied().unwrap_or(0.0)
    }
}

/// Leaf labels of a tree, in node order. Leaves are named by the parser.
pub(crate) fn leaf_labels(tree: &PhyloTree) -> Vec<&str> {
    tree.get_leaves()
        .iter()
        .filter_map(|id| tree.get(id).ok()?.name.as_deref())
        .collect()
}

/// The retained trees of a run, in output order, with their snapshots and
/// the registry that fixes the taxon universe.
#[derive(Debug, Clone)]
pub struct TreeCollection {
    registry: TaxonRegistry,
    names: Vec<String>,
    snapshots: Vec<TreeSnapshot>,
}

impl TreeCollection {
    /// Register the taxa of `records` (in order, first occurrence wins),
    /// check that every tree covers exactly that taxon set, then build all
    /// snapshots.
    ///
    /// Every inconsistent tree is reported in a single
    /// [`TreeDistError::Validation`] rather than stopping at the first.
    pub fn build(records: Vec<TreeRecord>) -> Result<Self> {
        if records.is_empty() {
            return Err(TreeDistError::EmptyResult);
        }

        let mut registry = TaxonRegistry::new();
        for record in &records {
            for label in leaf_labels(&record.tree) {
                registry.register(label);
            }
        }

        let problems: Vec<String> = records
            .iter()
            .filter_map(|record| {
                let labels = leaf_labels(&record.tree);
                let present: HashSet<&str> = labels.iter().copied().collect();
                let missing: Vec<&str> = registry
                    .labels()
                    .iter()
                    .map(String::as_str)
                    .filter(|l| !present.contains(l))
                    .collect();
                let duplicated = labels.len() - present.len();

                if missing.is_empty() && duplicated == 0 {
                    return None;
                }
                let mut msg = format!("{} ({})", record.name, record.file_id);
                if !missing.is_empty() {
                    msg.push_str(&format!(" lacks taxa [{}]", missing.iter().join(", ")));
                }
                if duplicated > 0 {
                    msg.push_str(&format!(" repeats {duplicated} taxon label(s)"));
                }
                Some(msg)
            })
            .collect();

        if !problems.is_empty() {
            return Err(TreeDistError::Validation(format!(
                "{} of {} trees differ from the {} registered taxa: {}",
                problems.len(),
                records.len(),
                registry.len(),
                problems.iter().join("; ")
            )));
        }

        let num_records = records.len();
        let built = records
            .into_par_iter()
            .map(|record| {
                let snapshot = TreeSnapshot::from_tree(&record.tree, &registry).map_err(|e| match e {
                    TreeDistError::Validation(message) => TreeDistError::Parse {
                        file: record.file_id.clone(),
                        message: format!("tree '{}': {message}", record.name),
                    },
                    other => other,
                })?;
                Ok::<_, TreeDistError>((record.name, snapshot))
            })
            .collect::<Result<Vec<_>>>()?;
        let (names, snapshots): (Vec<String>, Vec<TreeSnapshot>) = built.into_iter().unzip();

        debug!(
            "built {} snapshots over {} taxa",
            num_records,
            registry.len()
        );

        Ok(TreeCollection {
            registry,
            names,
            snapshots,
        })
    }

    pub fn registry(&self) -> &TaxonRegistry {
        &self.registry
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn snapshots(&self) -> &[TreeSnapshot] {
        &self.snapshots
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn into_names(self) -> Vec<String> {
        self.names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_tree_file;

    fn collection(newicks: &[&str]) -> Result<TreeCollection> {
        let content: String = newicks
            .iter()
            .enumerate()
            .map(|(i, nwk)| format!("tree STATE_{i} = {nwk}\n"))
            .collect();
        TreeCollection::build(parse_tree_file("t.trees", &content, false)?)
    }

    fn split(registry: &TaxonRegistry, taxa: &[&str]) -> Bitset {
        let mut bs = Bitset::zeros(registry.words());
        for t in taxa {
            bs.set(registry.index_of(t).unwrap());
        }
        bs
    }

    /// ```text
    ///              root
    ///             /    \
    ///         node1     E
    ///         /   \
    ///     node2    D
    ///     /   \
    ///    A    node3
    ///         /   \
    ///        B     C
    /// ```
    ///
    /// A is registered first (index 0). Non-trivial splits:
    /// - node3: {B,C}          → kept as {B,C}
    /// - node2: {A,B,C}|{D,E}  → stored as {D,E}
    /// - node1: {A,B,C,D}|{E}  → trivial, dropped
    #[test]
    fn test_asymmetric_tree_partitions() {
        let coll = collection(&["(((A:0.1,(B:0.1,C:0.1):0.3):0.2,D:0.1):0.4,E:0.1);"]).unwrap();
        let reg = coll.registry();
        let snap = &coll.snapshots()[0];

        assert_eq!(reg.len(), 5);
        assert_eq!(reg.index_of("A"), Some(0));
        assert_eq!(snap.len(), 2);
        assert_eq!(snap.length(&split(reg, &["B", "C"])), 0.3);
        assert_eq!(snap.length(&split(reg, &["D", "E"])), 0.2);
        assert!(!snap.contains(&split(reg, &["E"])));
    }

    /// Rooting the same unrooted tree on different edges gives the same
    /// snapshot; the two root edges are merged into one split.
    #[test]
    fn test_root_placement_does_not_matter() {
        let coll = collection(&[
            "((A:0.1,B:0.1):0.2,(C:0.1,(D:0.1,E:0.1):0.3):0.2);",
            "((D:0.1,E:0.1):0.15,(C:0.1,(B:0.1,A:0.1):0.4):0.15);",
        ])
        .unwrap();
        let reg = coll.registry();
        let (a, b) = (&coll.snapshots()[0], &coll.snapshots()[1]);

        assert_eq!(a.len(), 2);
        assert!((a.length(&split(reg, &["C", "D", "E"])) - 0.4).abs() < 1e-12);
        let cde = split(reg, &["C", "D", "E"]);
        let de = split(reg, &["D", "E"]);
        assert!((b.length(&cde) - 0.4).abs() < 1e-12);
        assert!((a.length(&de) - b.length(&de)).abs() < 1e-12);
        assert_eq!(
            a.splits.keys().collect::<HashSet<_>>(),
            b.splits.keys().collect::<HashSet<_>>()
        );
    }

    #[test]
    fn test_missing_branch_lengths_are_zero() {
        let coll = collection(&["((A,B),(C,D),E);"]).unwrap();
        let snap = &coll.snapshots()[0];
        assert_eq!(snap.len(), 2);
        assert!(snap.splits.values().all(|l| *l == 0.0));
    }

    #[test]
    fn test_inconsistent_taxa_are_all_reported() {
        let err = collection(&[
            "((A,B),(C,D));",
            "((A,B),(C,E));",
            "((A,B),C);",
        ])
        .unwrap_err();
        let msg = err.to_string();
        assert!(matches!(err, TreeDistError::Validation(_)));
        assert!(msg.contains("3 of 3 trees"));
        assert!(msg.contains("t_STATE1"));
        assert!(msg.contains("t_STATE2"));
    }

    #[test]
    fn test_duplicate_leaf_label_is_rejected() {
        let err = collection(&["((A,B),(C,D));", "((A,A),(C,D),B);"]).unwrap_err();
        assert!(matches!(
            err,
            TreeDistError::Validation(_) | TreeDistError::Parse { .. }
        ));
    }

    #[test]
    fn test_empty_collection() {
        assert!(matches!(
            TreeCollection::build(Vec::new()),
            Err(TreeDistError::EmptyResult)
        ));
    }
}
