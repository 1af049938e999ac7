// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Error types for chronicle-graph

use thiserror::Error;

/// Errors that abort adding a commit to the graph
///
/// The graph is left unchanged when [`crate::GraphBuilder::add_commit`]
/// returns one of these.
#[derive(Debug, Error)]
pub enum GraphError {
    /// A parent id names no commit in the graph
    #[error("Commit {commit} names unknown parent {parent}")]
    MissingParent {
        /// The commit being added
        commit: String,
        /// The unknown parent id
        parent: String,
    },

    /// The commit id is already in the graph
    #[error("Duplicate commit: {commit}")]
    DuplicateCommit {
        /// The repeated id
        commit: String,
    },

    /// A date field could not be parsed
    #[error("Invalid date '{date}' in commit {commit}: {reason}")]
    InvalidDate {
        /// The commit being added
        commit: String,
        /// The date text
        date: String,
        /// Parser error
        reason: String,
    },
}

impl GraphError {
    /// Id of the commit the error refers to
    #[must_use]
    pub fn commit_id(&self) -> &str {
        match self {
            Self::MissingParent { commit, .. }
            | Self::DuplicateCommit { commit }
            | Self::InvalidDate { commit, .. } => commit,
        }
    }
}
