//! Burn-in removal.
//!
//! Two independent filters, applied per file in this order:
//! 1. `trees`: drop the first N records of the file, whatever their STATE.
//! 2. `states`: drop every remaining record whose STATE is below the
//!    threshold. Records whose header had no STATE count as STATE 0.

use crate::error::{Result, TreeDistError};
use crate::parser::TreeRecord;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Burnin {
    /// Leading trees dropped from each file.
    pub trees: usize,
    /// Minimum STATE a tree needs to be kept.
    pub states: u64,
}

impl Burnin {
    pub fn new(trees: usize, states: u64) -> Self {
        Burnin { trees, states }
    }

    /// Build from signed values as handed over by a binding layer,
    /// rejecting negatives before any input is touched.
    ///
    /// ```
    /// # use posterior_tree_distances::burnin::Burnin;
    /// assert_eq!(Burnin::checked(2, 500).unwrap(), Burnin::new(2, 500));
    /// assert!(Burnin::checked(-1, 0).is_err());
    /// ```
    pub fn checked(trees: i64, states: i64) -> Result<Self> {
        let trees = usize::try_from(trees).map_err(|_| TreeDistError::Range {
            name: "burnin_trees",
            value: trees,
        })?;
        let states = u64::try_from(states).map_err(|_| TreeDistError::Range {
            name: "burnin_states",
            value: states,
        })?;
        Ok(Burnin { trees, states })
    }

    /// Whether a record at `position` with `state` survives burn-in.
    pub fn keeps(&self, position: usize, state: u64) -> bool {
        position >= self.trees && state >= self.states
    }

    /// Retained subsequence of one file's records, order preserved.
    pub fn apply(&self, records: Vec<TreeRecord>) -> Vec<TreeRecord> {
        records
            .into_iter()
            .filter(|record| self.keeps(record.position, record.state))
            .collect()
    }
}

/// Fail with [`TreeDistError::EmptyResult`] if burn-in removed everything.
pub fn ensure_trees_left(records: &[TreeRecord]) -> Result<()> {
    if records.is_empty() {
        return Err(TreeDistError::EmptyResult);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_tree_file;

    fn sample() -> Vec<TreeRecord> {
        let content: String = [0u64, 100, 200, 300, 400]
            .iter()
            .map(|s| format!("tree STATE_{s} = (A:0.1,(B:0.1,C:0.1):0.1,D:0.1);\n"))
            .collect();
        parse_tree_file("run.trees", &content, false).unwrap()
    }

    fn states(records: &[TreeRecord]) -> Vec<u64> {
        records.iter().map(|r| r.state).collect()
    }

    #[test]
    fn zero_burnin_keeps_everything() {
        assert_eq!(Burnin::default().apply(sample()).len(), 5);
    }

    #[test]
    fn drops_leading_trees() {
        let kept = Burnin::new(2, 0).apply(sample());
        assert_eq!(states(&kept), [200, 300, 400]);
    }

    #[test]
    fn drops_states_below_threshold() {
        let kept = Burnin::new(0, 200).apply(sample());
        assert_eq!(states(&kept), [200, 300, 400]);
    }

    #[test]
    fn both_filters_combine() {
        let kept = Burnin::new(3, 100).apply(sample());
        assert_eq!(states(&kept), [300, 400]);
        let kept = Burnin::new(1, 300).apply(sample());
        assert_eq!(states(&kept), [300, 400]);
    }

    #[test]
    fn stateless_records_fall_to_any_state_threshold() {
        let content = "tree UNTITLED = (A,B,C,D);\ntree STATE_100 = (A,B,C,D);\n";
        let records = parse_tree_file("hiv1.trees", content, false).unwrap();
        let kept = Burnin::new(0, 50).apply(records);
        let names: Vec<&str> = kept.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["hiv1_STATE100"]);
        assert!(Burnin::new(0, 0).keeps(0, 0));
    }

    #[test]
    fn exhausting_burnin_is_empty_result() {
        let kept = Burnin::new(10, 0).apply(sample());
        assert!(matches!(ensure_trees_left(&kept), Err(TreeDistError::EmptyResult)));
    }

    #[test]
    fn negative_values_are_range_errors() {
        let err = Burnin::checked(0, -5).unwrap_err();
        assert!(matches!(
            err,
            TreeDistError::Range {
                name: "burnin_states",
                value: -5
            }
        ));
    }
}
