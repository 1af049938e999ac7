// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Branch id assignment

use crate::model::{CommitGraph, CommitIdx};

/// Number every commit with a branch id and return the number of ids used
///
/// Commits are visited depth first from the roots, each one only after all
/// of its parents. A merge keeps its first parent's id. A root, or a commit
/// whose first parent splits, opens a new id; anything else continues its
/// first parent's id. Ids start at 1 and running this again yields the same
/// numbering.
pub fn assign_branch_ids(graph: &mut CommitGraph) -> u32 {
    let mut pending: Vec<usize> = graph.commits.iter().map(|c| c.parents.len()).collect();
    let mut stack: Vec<CommitIdx> = graph
        .commits()
        .filter(|(_, c)| c.is_root())
        .map(|(idx, _)| idx)
        .collect();
    stack.reverse();

    let mut last_id = 0;
    while let Some(idx) = stack.pop() {
        let commit = graph.commit(idx);
        let branch_id = match commit.first_parent() {
            Some(first) if commit.is_merge() || !graph.commit(first).is_split() => {
                graph.commit(first).branch_id
            }
            _ => {
                last_id += 1;
                last_id
            }
        };

        for &child in commit.children.iter().rev() {
            let remaining = &mut pending[child.index()];
            *remaining = remaining.saturating_sub(1);
            if *remaining == 0 {
                stack.push(child);
            }
        }
        graph.commits[idx.index()].branch_id = branch_id;
    }
    last_id
}
