// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Error types for chronicle-log

use thiserror::Error;

/// Errors that can occur while encoding, decoding or parsing commit logs
#[derive(Debug, Error)]
pub enum LogError {
    /// Malformed compact-log or raw diff text
    #[error("Format error in commit {} at line {line}: {reason}", commit_id.as_deref().unwrap_or("<unknown>"))]
    Format {
        /// Id of the commit block being read, when it was already known
        commit_id: Option<String>,
        /// 0-based line offset inside the commit block
        line: usize,
        /// Description of what was expected
        reason: String,
    },

    /// Change-type marker not in {A, D, R, M} while decoding strictly
    #[error("Unknown change type '{marker}' in commit {commit_id}")]
    UnknownChangeKind {
        /// The unrecognized marker character
        marker: char,
        /// Commit the change belongs to
        commit_id: String,
    },

    /// Error reading or writing a log stream
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Character map could not be loaded or created
    #[error("Character map error at {path}: {reason}")]
    CharMap {
        /// Location of the map file
        path: String,
        /// Description of the problem
        reason: String,
    },
}

impl LogError {
    /// Build a format error for the given block position
    pub(crate) fn format(commit_id: Option<&str>, line: usize, reason: impl Into<String>) -> Self {
        Self::Format {
            commit_id: commit_id.map(str::to_string),
            line,
            reason: reason.into(),
        }
    }

    /// Commit id the error refers to, if known
    #[must_use]
    pub fn commit_id(&self) -> Option<&str> {
        match self {
            Self::Format { commit_id, .. } => commit_id.as_deref(),
            Self::UnknownChangeKind { commit_id, .. } => Some(commit_id),
            _ => None,
        }
    }

    /// Whether the error only affects a single commit block
    ///
    /// Such errors can be skipped by the caller; IO and character map errors
    /// cannot.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Format { .. } | Self::UnknownChangeKind { .. })
    }
}
