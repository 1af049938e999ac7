// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Incremental line provenance
//!
//! Each change carries one entry per line of the file after the change: the
//! commit that last wrote that line. A change's annotation is derived from
//! its parent change's annotation and its own hunks.

use chronicle_log::{HunkRecord, LineOperation};
use thiserror::Error;

use crate::model::CommitIdx;

/// A hunk addressed a line outside the annotated file
///
/// The builder stops tracking provenance for the file instead of failing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{operation:?} of line {number} outside a file of {len} lines")]
pub struct ProvenanceOverflow {
    /// Operation that overflowed
    pub operation: LineOperation,
    /// 1-based line number
    pub number: usize,
    /// Annotated length when the operation was applied
    pub len: usize,
}

/// Apply `hunks` to the parent's annotation
///
/// Deletes are applied in descending line order, then adds in ascending
/// order; every added line is attributed to `commit`.
///
/// # Errors
///
/// Returns [`ProvenanceOverflow`] if a line number falls outside the file.
pub fn annotate(
    parent_lines: &[CommitIdx],
    hunks: &[HunkRecord],
    commit: CommitIdx,
) -> Result<Vec<CommitIdx>, ProvenanceOverflow> {
    let mut lines = parent_lines.to_vec();

    let mut deletes: Vec<usize> = hunks
        .iter()
        .flat_map(|hunk| hunk.deleted_lines())
        .map(|lc| lc.number)
        .collect();
    deletes.sort_unstable_by(|a, b| b.cmp(a));
    for number in deletes {
        if number == 0 || number > lines.len() {
            return Err(ProvenanceOverflow {
                operation: LineOperation::Delete,
                number,
                len: lines.len(),
            });
        }
        lines.remove(number - 1);
    }

    let mut adds: Vec<usize> = hunks
        .iter()
        .flat_map(|hunk| hunk.added_lines())
        .map(|lc| lc.number)
        .collect();
    adds.sort_unstable();
    for number in adds {
        if number == 0 || number > lines.len() + 1 {
            return Err(ProvenanceOverflow {
                operation: LineOperation::Add,
                number,
                len: lines.len(),
            });
        }
        lines.insert(number - 1, commit);
    }

    Ok(lines)
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use chronicle_log::LineChange;
    use proptest::prelude::*;

    /// A parent length, lines to delete from it and a run of leading adds
    fn edit() -> impl Strategy<Value = (usize, Vec<usize>, Vec<usize>)> {
        (0usize..40)
            .prop_flat_map(|len| {
                let numbers: Vec<usize> = (1..=len).collect();
                (
                    Just(len),
                    proptest::sample::subsequence(numbers, 0..=len),
                    0usize..10,
                )
            })
            .prop_map(|(len, deletes, adds)| (len, deletes, (1..=adds).collect()))
    }

    proptest! {
        #[test]
        fn prop_length_law((len, deletes, adds) in edit()) {
            let parent = vec![CommitIdx(0); len];
            let changes: Vec<LineChange> = deletes
                .iter()
                .map(|&n| LineChange::deleted(n, None))
                .chain(adds.iter().map(|&n| LineChange::added(n, None)))
                .collect();

            let lines = annotate(&parent, &[HunkRecord::new(changes)], CommitIdx(1)).unwrap();
            prop_assert_eq!(lines.len(), len - deletes.len() + adds.len());
            prop_assert_eq!(lines.iter().filter(|c| **c == CommitIdx(1)).count(), adds.len());
        }
    }
}
