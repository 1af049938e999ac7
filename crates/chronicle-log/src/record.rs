// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Commit, change and hunk records
//!
//! These are the plain-data records produced by the diff parser and by the
//! compact-log decoder, and consumed by the encoder and the graph builder.

use serde::{Deserialize, Serialize};

use crate::meta::HunkChangeMeta;

/// Path used for the missing side of an added or deleted file
pub const DEV_NULL: &str = "dev/null";

/// Kind of file change within a commit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeKind {
    /// File was created
    Add,
    /// File was removed
    Delete,
    /// File was moved (possibly with edits)
    Rename,
    /// File was edited in place
    Modify,
}

impl ChangeKind {
    /// Marker letter used in the compact log
    #[must_use]
    pub fn marker(self) -> char {
        match self {
            Self::Add => 'A',
            Self::Delete => 'D',
            Self::Rename => 'R',
            Self::Modify => 'M',
        }
    }

    /// Parse a compact-log marker letter
    #[must_use]
    pub fn from_marker(marker: char) -> Option<Self> {
        match marker {
            'A' => Some(Self::Add),
            'D' => Some(Self::Delete),
            'R' => Some(Self::Rename),
            'M' => Some(Self::Modify),
            _ => None,
        }
    }
}

/// Whether a line was added or deleted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LineOperation {
    /// Line present only in the new version
    Add,
    /// Line present only in the old version
    Delete,
}

/// A single added or deleted line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineChange {
    /// Add or delete
    pub operation: LineOperation,
    /// 1-based line number (old file for deletes, new file for adds)
    pub number: usize,
    /// Literal line content including its trailing newline, if retained
    pub content: Option<String>,
}

impl LineChange {
    /// Create an added line
    #[must_use]
    pub fn added(number: usize, content: Option<String>) -> Self {
        Self {
            operation: LineOperation::Add,
            number,
            content,
        }
    }

    /// Create a deleted line
    #[must_use]
    pub fn deleted(number: usize, content: Option<String>) -> Self {
        Self {
            operation: LineOperation::Delete,
            number,
            content,
        }
    }

    /// Check if this is an added line
    #[must_use]
    pub fn is_add(&self) -> bool {
        self.operation == LineOperation::Add
    }
}

/// A contiguous run of added and deleted lines
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HunkRecord {
    /// Line changes in hunk order
    pub line_changes: Vec<LineChange>,
    /// Character-level summary kept when content is reduced to metadata
    pub change_meta: Option<HunkChangeMeta>,
}

impl HunkRecord {
    /// Create a hunk from its line changes
    #[must_use]
    pub fn new(line_changes: Vec<LineChange>) -> Self {
        Self {
            line_changes,
            change_meta: None,
        }
    }

    /// Added lines in hunk order
    pub fn added_lines(&self) -> impl Iterator<Item = &LineChange> {
        self.line_changes.iter().filter(|lc| lc.is_add())
    }

    /// Deleted lines in hunk order
    pub fn deleted_lines(&self) -> impl Iterator<Item = &LineChange> {
        self.line_changes.iter().filter(|lc| !lc.is_add())
    }

    /// Number of added lines
    #[must_use]
    pub fn added_count(&self) -> usize {
        self.added_lines().count()
    }

    /// Number of deleted lines
    #[must_use]
    pub fn deleted_count(&self) -> usize {
        self.deleted_lines().count()
    }

    /// Check if any line change still carries literal content
    #[must_use]
    pub fn has_content(&self) -> bool {
        self.line_changes.iter().any(|lc| lc.content.is_some())
    }

    /// Reorder line changes as the compact log stores them
    ///
    /// Adds come first in ascending line order, then deletes in ascending
    /// line order.
    pub fn canonicalize(&mut self) {
        self.line_changes
            .sort_by_key(|lc| (!lc.is_add(), lc.number));
    }
}

/// One file's modification record within a commit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    /// Change kind
    pub kind: ChangeKind,
    /// Path before the change ([`DEV_NULL`] for additions)
    pub old_path: String,
    /// Path after the change ([`DEV_NULL`] for deletions)
    pub new_path: String,
    /// Parent commit this change is relative to (empty for root commits)
    pub parent_commit_id: String,
    /// Binary files carry no hunks
    pub binary: bool,
    /// Hunks in file order
    pub hunks: Vec<HunkRecord>,
}

impl ChangeRecord {
    /// Logical file key: the old path for deletions, the new path otherwise
    #[must_use]
    pub fn path(&self) -> &str {
        if self.kind == ChangeKind::Delete {
            &self.old_path
        } else {
            &self.new_path
        }
    }

    /// Total added lines over all hunks
    #[must_use]
    pub fn added_count(&self) -> usize {
        self.hunks.iter().map(HunkRecord::added_count).sum()
    }

    /// Total deleted lines over all hunks
    #[must_use]
    pub fn deleted_count(&self) -> usize {
        self.hunks.iter().map(HunkRecord::deleted_count).sum()
    }
}

/// A parsed commit with its changes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    /// Revision id
    pub id: String,
    /// Parent revision ids in order
    pub parent_ids: Vec<String>,
    /// Author name
    pub author_name: String,
    /// Author email
    pub author_email: String,
    /// Author date as emitted upstream
    pub author_date: String,
    /// Committer name
    pub committer_name: String,
    /// Committer email
    pub committer_email: String,
    /// Committer date as emitted upstream
    pub committer_date: String,
    /// Commit message
    pub message: String,
    /// Changes in upstream order
    pub changes: Vec<ChangeRecord>,
}

impl CommitRecord {
    /// Get the short id (first 7 characters)
    #[must_use]
    pub fn short_id(&self) -> &str {
        let end = self
            .id
            .char_indices()
            .nth(7)
            .map_or(self.id.len(), |(idx, _)| idx);
        &self.id[..end]
    }

    /// Check if this is a merge commit (has multiple parents)
    #[must_use]
    pub fn is_merge(&self) -> bool {
        self.parent_ids.len() > 1
    }

    /// Check if this is a root commit (has no parents)
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.parent_ids.is_empty()
    }

    /// Get the first line of the commit message (subject)
    #[must_use]
    pub fn subject(&self) -> &str {
        self.message.lines().next().unwrap_or("")
    }

    /// Check whether committer identity and date equal the author's
    #[must_use]
    pub fn committer_is_author(&self) -> bool {
        self.committer_date == self.author_date
            && self.committer_email == self.author_email
            && self.committer_name == self.author_name
    }

    /// Reorder every hunk as the compact log stores it
    pub fn canonicalize(&mut self) {
        for hunk in self.changes.iter_mut().flat_map(|c| c.hunks.iter_mut()) {
            hunk.canonicalize();
        }
    }

    /// Drop literal content, keeping only line numbers
    pub fn strip_content(&mut self) {
        for lc in self
            .changes
            .iter_mut()
            .flat_map(|c| c.hunks.iter_mut())
            .flat_map(|h| h.line_changes.iter_mut())
        {
            lc.content = None;
        }
    }
}
