//! Taxon identity for one run: the TRANSLATE table of a file and the
//! registry that maps every taxon label to a dense bit index.

use std::collections::HashMap;

use crate::bitset::Bitset;
use crate::error::{Result, TreeDistError};

/// Dense index of a taxon inside a [`TaxonRegistry`].
pub type TaxonId = usize;

/// Numeric leaf code → real taxon name, as read from a NEXUS `TRANSLATE` block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranslateTable(HashMap<String, String>);

impl TranslateTable {
    /// Parse the `TRANSLATE` block of `content`, if any.
    ///
    /// Entries look like
    /// ```text
    ///     Translate
    ///         1 '1959.M.CD.59.ZR59',
    ///         2 Homo_sapiens,
    ///         3 'Pan troglodytes'
    ///     ;
    /// ```
    /// The block ends at a line that starts with `;` or whose entry ends
    /// with `;`. A file without the block yields an empty table.
    pub fn parse(file_id: &str, content: &str) -> Result<Self> {
        let mut map = HashMap::new();
        let mut lines = content
            .lines()
            .skip_while(|line| !line.trim().to_ascii_uppercase().starts_with("TRANSLATE"));

        let Some(first) = lines.next() else {
            return Ok(TranslateTable(map));
        };

        // Some writers put the first entry on the TRANSLATE line itself.
        let inline = first.trim()["TRANSLATE".len()..].trim();
        for line in std::iter::once(inline).chain(lines) {
            let line = line.trim();
            if line.starts_with(';') {
                break;
            }
            if line.is_empty() {
                continue;
            }
            let last = line.ends_with(';');
            let entry = line.trim_end_matches(';').trim().trim_end_matches(',').trim();

            let (code, label) = entry
                .split_once(char::is_whitespace)
                .map(|(c, l)| (c, l.trim().trim_matches('\'').trim_matches('"')))
                .filter(|(_, l)| !l.is_empty())
                .ok_or_else(|| {
                    TreeDistError::parse(file_id, format!("malformed TRANSLATE entry '{line}'"))
                })?;

            if map.insert(code.to_string(), label.to_string()).is_some() {
                return Err(TreeDistError::parse(
                    file_id,
                    format!("duplicate TRANSLATE code '{code}'"),
                ));
            }
            if last {
                break;
            }
        }

        Ok(TranslateTable(map))
    }

    pub fn get(&self, code: &str) -> Option<&str> {
        self.0.get(code).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Assigns each distinct taxon label a stable index, in order of first
/// registration.
///
/// Built single-threaded while the [`TreeCollection`](crate::snapshot::TreeCollection)
/// is assembled and read-only afterwards, so it can be shared freely across
/// the worker threads of the distance phase.
#[derive(Debug, Clone, Default)]
pub struct TaxonRegistry {
    labels: Vec<String>,
    index: HashMap<String, TaxonId>,
}

impl TaxonRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `label`, returning its index. Re-registering is a no-op.
    pub fn register(&mut self, label: &str) -> TaxonId {
        if let Some(&id) = self.index.get(label) {
            return id;
        }
        let id = self.labels.len();
        self.labels.push(label.to_string());
        self.index.insert(label.to_string(), id);
        id
    }

    pub fn index_of(&self, label: &str) -> Option<TaxonId> {
        self.index.get(label).copied()
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Bitset width (in words) shared by every bipartition of the run.
    pub fn words(&self) -> usize {
        Bitset::words_for(self.labels.len())
    }
}
