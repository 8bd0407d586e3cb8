//! Reading the tree block of BEAST/MrBayes NEXUS tree-sample files.
//!
//! A file contributes an ordered list of [`TreeRecord`]s, one per
//! `tree <label> = <newick>` statement, each tagged with the MCMC STATE it
//! was sampled at and a display name of the form `{file-stem}_STATE{state}`.

use std::path::Path;

use log::{debug, warn};
use phylotree::tree::Tree as PhyloTree;
use rayon::prelude::*;

use crate::error::{Result, TreeDistError};
use crate::taxa::TranslateTable;

/// One sampled tree, as read from its file.
#[derive(Debug, Clone)]
pub struct TreeRecord {
    /// Identifier of the file this tree came from (usually its path).
    pub file_id: String,
    /// Zero-based position among the tree statements of that file.
    pub position: usize,
    /// MCMC iteration; 0 if the header carries no recognizable STATE.
    pub state: u64,
    /// Display name, unique within a file for well-formed samples.
    pub name: String,
    /// Topology with leaves labeled by taxon (translated when requested).
    pub tree: PhyloTree,
}

/// Remove NEXUS square-bracket comments, which includes BEAST annotations
/// such as `[&rate=0.123]` and the `[&R]` rooting marker.
///
/// Returns `None` if a comment is left open.
fn strip_comments(newick: &str) -> Option<String> {
    let mut result = String::with_capacity(newick.len());
    let mut depth = 0usize;

    for ch in newick.chars() {
        match ch {
            '[' => depth += 1,
            ']' if depth > 0 => depth -= 1,
            _ if depth == 0 => result.push(ch),
            _ => {}
        }
    }

    (depth == 0).then_some(result)
}

/// Split `tree <header> = <body>` at the first `=` outside a comment;
/// BEAST headers carry `[&lnP=...]` annotations.
fn split_statement(line: &str) -> Option<(&str, &str)> {
    let mut depth = 0usize;
    for (i, ch) in line.char_indices() {
        match ch {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            '=' if depth == 0 => return Some((line[..i].trim(), line[i + 1..].trim())),
            _ => {}
        }
    }
    None
}

fn is_tree_statement(line: &str) -> bool {
    let upper = line.trim_start().to_ascii_uppercase();
    upper.starts_with("TREE ") || upper.starts_with("TREE\t")
}

/// STATE from a header such as `tree STATE_100000 [&lnP=...]` (BEAST) or
/// `tree gen.5000` (MrBayes).
fn extract_state(header: &str) -> Option<u64> {
    let upper = header.to_ascii_uppercase();
    ["STATE_", "GEN."].iter().find_map(|marker| {
        let start = upper.find(marker)? + marker.len();
        let digits: String = header[start..]
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect();
        digits.parse::<u64>().ok()
    })
}

/// File name without directories, a trailing `.gz`, and its extension:
/// `data/hiv1.trees.gz` → `hiv1`.
pub fn file_stem(file_id: &str) -> &str {
    let name = Path::new(file_id)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(file_id);
    let name = name.strip_suffix(".gz").unwrap_or(name);
    Path::new(name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(name)
}

/// Check that every leaf is named and, if a translation table is given,
/// rewrite numeric codes to real taxon names.
fn relabel_leaves(
    tree: &mut PhyloTree,
    translate: Option<&TranslateTable>,
    file_id: &str,
    tree_name: &str,
) -> Result<()> {
    for leaf_id in tree.get_leaves() {
        let node = tree
            .get_mut(&leaf_id)
            .map_err(|e| TreeDistError::parse(file_id, format!("tree '{tree_name}': {e}")))?;

        let Some(label) = node.name.as_deref() else {
            return Err(TreeDistError::parse(
                file_id,
                format!("tree '{tree_name}' has an unnamed leaf"),
            ));
        };

        if let Some(table) = translate {
            let real = table.get(label).ok_or_else(|| {
                TreeDistError::parse(
                    file_id,
                    format!("tree '{tree_name}' uses taxon '{label}' which is not in TRANSLATE"),
                )
            })?;
            node.name = Some(real.to_string());
        }
    }
    Ok(())
}

/// Branch lengths must be finite and non-negative. Missing lengths are fine.
fn check_branch_lengths(tree: &PhyloTree, file_id: &str, tree_name: &str) -> Result<()> {
    let fail = |message: String| TreeDistError::parse(file_id, format!("tree '{tree_name}': {message}"));
    let root = tree.get_root().map_err(|e| fail(e.to_string()))?;
    for node_id in tree.preorder(&root).map_err(|e| fail(e.to_string()))? {
        let node = tree.get(&node_id).map_err(|e| fail(e.to_string()))?;
        if let Some(length) = node.parent_edge {
            if !length.is_finite() || length < 0.0 {
                return Err(fail(format!("invalid branch length {length}")));
            }
        }
    }
    Ok(())
}

fn parse_statement(
    file_id: &str,
    stem: &str,
    position: usize,
    line: &str,
    translate: Option<&TranslateTable>,
) -> Result<TreeRecord> {
    let (header, body) = split_statement(line).ok_or_else(|| {
        TreeDistError::parse(file_id, format!("tree statement {position} has no '='"))
    })?;

    let state = extract_state(header).unwrap_or_else(|| {
        debug!("{file_id}: tree statement {position} has no STATE, using 0");
        0
    });
    let name = format!("{stem}_STATE{state}");

    let newick = strip_comments(body).ok_or_else(|| {
        TreeDistError::parse(file_id, format!("tree '{name}' has an unclosed comment"))
    })?;

    let mut tree = PhyloTree::from_newick(newick.trim())
        .map_err(|e| TreeDistError::parse(file_id, format!("tree '{name}': {e}")))?;

    check_branch_lengths(&tree, file_id, &name)?;
    relabel_leaves(&mut tree, translate, file_id, &name)?;

    Ok(TreeRecord {
        file_id: file_id.to_string(),
        position,
        state,
        name,
        tree,
    })
}

/// Parse every tree statement of one file, in file order.
///
/// With `use_real_taxa`, leaf codes are rewritten through the file's
/// TRANSLATE table; a file without one keeps its raw labels.
pub fn parse_tree_file(file_id: &str, content: &str, use_real_taxa: bool) -> Result<Vec<TreeRecord>> {
    let table = TranslateTable::parse(file_id, content)?;
    let translate = match (use_real_taxa, table.is_empty()) {
        (true, false) => Some(&table),
        (true, true) => {
            warn!("{file_id}: no TRANSLATE block, keeping raw taxon labels");
            None
        }
        (false, _) => None,
    };

    let stem = file_stem(file_id);
    let statements: Vec<&str> = content.lines().filter(|l| is_tree_statement(l)).collect();

    let records = statements
        .par_iter()
        .enumerate()
        .map(|(position, line)| parse_statement(file_id, stem, position, line, translate))
        .collect::<Result<Vec<_>>>()?;

    debug!(
        "{file_id}: parsed {} trees ({} TRANSLATE entries)",
        records.len(),
        table.len()
    );
    Ok(records)
}
