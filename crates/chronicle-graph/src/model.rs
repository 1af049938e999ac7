// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Arena graph model
//!
//! Commits, changes, files and accounts live in flat arenas owned by
//! [`CommitGraph`] and refer to each other through typed indices.

use std::collections::{HashMap, HashSet};
use std::fmt;

use chrono::{DateTime, FixedOffset};
use chronicle_log::{ChangeKind, DEV_NULL, HunkRecord};
use serde::{Deserialize, Serialize};

macro_rules! arena_index {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub u32);

        impl $name {
            /// Position in the owning arena
            #[must_use]
            pub fn index(self) -> usize {
                self.0 as usize
            }

            pub(crate) fn from_len(len: usize) -> Self {
                Self(u32::try_from(len).unwrap_or(u32::MAX))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

arena_index!(
    /// Index of a [`Commit`] in its graph
    CommitIdx
);
arena_index!(
    /// Index of a [`Change`] in its graph
    ChangeIdx
);
arena_index!(
    /// Index of a [`File`] in its graph
    FileIdx
);
arena_index!(
    /// Index of an [`Account`] in its graph
    AccountIdx
);

/// A commit and its derived metrics
#[derive(Debug, Clone)]
pub struct Commit {
    /// Revision id
    pub id: String,
    /// Parents in parent order
    pub parents: Vec<CommitIdx>,
    /// Children in insertion order
    pub children: Vec<CommitIdx>,
    /// Author account
    pub author: AccountIdx,
    /// Committer account
    pub committer: AccountIdx,
    /// Author timestamp
    pub author_date: DateTime<FixedOffset>,
    /// Committer timestamp
    pub committer_date: DateTime<FixedOffset>,
    /// Full message
    pub message: String,
    /// Development line label, see [`crate::assign_branch_ids`]
    pub branch_id: u32,
    /// Net line count of the repository after this commit
    pub repo_size: i64,
    /// Changes owned by this commit
    pub changes: Vec<ChangeIdx>,
}

impl Commit {
    /// Abbreviated id
    #[must_use]
    pub fn short_id(&self) -> &str {
        let end = self
            .id
            .char_indices()
            .nth(7)
            .map_or(self.id.len(), |(idx, _)| idx);
        &self.id[..end]
    }

    /// First line of the message
    #[must_use]
    pub fn subject(&self) -> &str {
        self.message.lines().next().unwrap_or("")
    }

    /// Whether the commit has more than one parent
    #[must_use]
    pub fn is_merge(&self) -> bool {
        self.parents.len() > 1
    }

    /// Whether more than one commit names this one as a parent
    #[must_use]
    pub fn is_split(&self) -> bool {
        self.children.len() > 1
    }

    /// Whether the commit has no parents in the graph
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.parents.is_empty()
    }

    /// First parent, if any
    #[must_use]
    pub fn first_parent(&self) -> Option<CommitIdx> {
        self.parents.first().copied()
    }
}

/// One file's change within a commit
#[derive(Debug, Clone)]
pub struct Change {
    /// Owning commit
    pub commit: CommitIdx,
    /// Change kind
    pub kind: ChangeKind,
    /// Path before the change
    pub old_path: String,
    /// Path after the change
    pub new_path: String,
    /// Whether the upstream diff reported the file as binary
    pub binary: bool,
    /// Hunks relative to `parent_commit`
    pub hunks: Vec<HunkRecord>,
    /// Parent the hunks are relative to
    pub parent_commit: Option<CommitIdx>,
    /// Previous version of the file on `parent_commit`'s ancestry
    pub parent_change: Option<ChangeIdx>,
    /// Previous versions on the other parents of a merge
    pub merged_parent_changes: Vec<ChangeIdx>,
    /// Commit that last wrote each line after this change
    pub annotated_lines: Vec<CommitIdx>,
    /// File identity this change belongs to
    pub file: FileIdx,
}

impl Change {
    /// Logical file key: the old path for deletions, the new path otherwise
    #[must_use]
    pub fn path(&self) -> &str {
        if self.kind == ChangeKind::Delete {
            &self.old_path
        } else {
            &self.new_path
        }
    }

    /// Number of added lines
    #[must_use]
    pub fn added_count(&self) -> usize {
        self.hunks.iter().map(HunkRecord::added_count).sum()
    }

    /// Number of deleted lines
    #[must_use]
    pub fn deleted_count(&self) -> usize {
        self.hunks.iter().map(HunkRecord::deleted_count).sum()
    }
}

/// Rename-stable file identity
#[derive(Debug, Clone, Default)]
pub struct File {
    /// Binary files carry no provenance
    pub binary: bool,
    /// Set when merge reconciliation folded this file into another one
    pub retired: bool,
    /// Changes in commit order
    pub changes: Vec<ChangeIdx>,
}

/// Deduplicated `(name, email)` identity
#[derive(Debug, Clone)]
pub struct Account {
    /// Display name
    pub name: String,
    /// Email address
    pub email: String,
    /// Commits authored or committed, once each
    pub commits: Vec<CommitIdx>,
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}>", self.name, self.email)
    }
}

/// A reconstructed commit history
#[derive(Debug, Clone, Default)]
pub struct CommitGraph {
    pub(crate) commits: Vec<Commit>,
    pub(crate) changes: Vec<Change>,
    pub(crate) files: Vec<File>,
    pub(crate) accounts: Vec<Account>,
    pub(crate) commit_index: HashMap<String, CommitIdx>,
    pub(crate) account_index: HashMap<(String, String), AccountIdx>,
    pub(crate) change_index: HashMap<(String, String, String), ChangeIdx>,
}

impl CommitGraph {
    /// Commit at `idx`
    ///
    /// # Panics
    ///
    /// Panics if `idx` does not come from this graph.
    #[must_use]
    pub fn commit(&self, idx: CommitIdx) -> &Commit {
        &self.commits[idx.index()]
    }

    /// Change at `idx`
    ///
    /// # Panics
    ///
    /// Panics if `idx` does not come from this graph.
    #[must_use]
    pub fn change(&self, idx: ChangeIdx) -> &Change {
        &self.changes[idx.index()]
    }

    /// File at `idx`
    ///
    /// # Panics
    ///
    /// Panics if `idx` does not come from this graph.
    #[must_use]
    pub fn file(&self, idx: FileIdx) -> &File {
        &self.files[idx.index()]
    }

    /// Account at `idx`
    ///
    /// # Panics
    ///
    /// Panics if `idx` does not come from this graph.
    #[must_use]
    pub fn account(&self, idx: AccountIdx) -> &Account {
        &self.accounts[idx.index()]
    }

    /// Commits in insertion order
    pub fn commits(&self) -> impl Iterator<Item = (CommitIdx, &Commit)> {
        self.commits
            .iter()
            .enumerate()
            .map(|(n, c)| (CommitIdx::from_len(n), c))
    }

    /// Changes in insertion order
    pub fn changes(&self) -> impl Iterator<Item = (ChangeIdx, &Change)> {
        self.changes
            .iter()
            .enumerate()
            .map(|(n, c)| (ChangeIdx::from_len(n), c))
    }

    /// Files that have not been retired
    pub fn live_files(&self) -> impl Iterator<Item = (FileIdx, &File)> {
        self.files
            .iter()
            .enumerate()
            .filter(|(_, f)| !f.retired)
            .map(|(n, f)| (FileIdx::from_len(n), f))
    }

    /// Accounts in insertion order
    pub fn accounts(&self) -> impl Iterator<Item = (AccountIdx, &Account)> {
        self.accounts
            .iter()
            .enumerate()
            .map(|(n, a)| (AccountIdx::from_len(n), a))
    }

    /// Number of commits
    #[must_use]
    pub fn commit_count(&self) -> usize {
        self.commits.len()
    }

    /// Number of changes
    #[must_use]
    pub fn change_count(&self) -> usize {
        self.changes.len()
    }

    /// Number of files, retired ones included
    #[must_use]
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Most recently added commit
    #[must_use]
    pub fn last_commit(&self) -> Option<CommitIdx> {
        self.commits.len().checked_sub(1).map(CommitIdx::from_len)
    }

    /// Look up a commit by id
    ///
    /// An id starting with `^` matches the first commit whose id starts with
    /// the rest.
    #[must_use]
    pub fn find_commit(&self, id: &str) -> Option<CommitIdx> {
        match id.strip_prefix('^') {
            Some(prefix) => self
                .commits()
                .find(|(_, c)| c.id.starts_with(prefix))
                .map(|(idx, _)| idx),
            None => self.commit_index.get(id).copied(),
        }
    }

    /// Look up a change by `(commit id, old path, new path)`
    #[must_use]
    pub fn find_change(&self, commit_id: &str, old_path: &str, new_path: &str) -> Option<ChangeIdx> {
        self.change_index
            .get(&(commit_id.to_string(), old_path.to_string(), new_path.to_string()))
            .copied()
    }

    /// Look up an account by name and email
    #[must_use]
    pub fn find_account(&self, name: &str, email: &str) -> Option<AccountIdx> {
        self.account_index
            .get(&(name.to_string(), email.to_string()))
            .copied()
    }

    /// Most recent change writing `path`, searching from `from` back
    ///
    /// Ancestors are searched depth first, first parent first; `from`'s own
    /// changes are searched first.
    #[must_use]
    pub fn find_last_change(&self, from: CommitIdx, path: &str) -> Option<ChangeIdx> {
        let mut stack = vec![from];
        let mut visited = HashSet::new();

        while let Some(idx) = stack.pop() {
            if !visited.insert(idx) {
                continue;
            }
            let commit = self.commit(idx);
            if let Some(&found) = commit
                .changes
                .iter()
                .find(|&&c| self.change(c).new_path == path)
            {
                return Some(found);
            }
            stack.extend(commit.parents.iter().rev());
        }
        None
    }

    /// Last change of `file` at `commit`, following first parents
    #[must_use]
    pub fn last_change_at(&self, file: FileIdx, commit: CommitIdx) -> Option<ChangeIdx> {
        let changes = &self.file(file).changes;
        let mut current = Some(commit);
        while let Some(idx) = current {
            if let Some(&found) = changes.iter().find(|&&c| self.change(c).commit == idx) {
                return Some(found);
            }
            current = self.commit(idx).first_parent();
        }
        None
    }

    /// Path of `file` at `commit`
    ///
    /// A deleted file reports [`DEV_NULL`].
    #[must_use]
    pub fn file_path_at(&self, file: FileIdx, commit: CommitIdx) -> Option<&str> {
        self.last_change_at(file, commit)
            .map(|c| self.change(c).new_path.as_str())
    }

    /// Whether `file` exists at `commit`
    #[must_use]
    pub fn is_alive_at(&self, file: FileIdx, commit: CommitIdx) -> bool {
        self.last_change_at(file, commit)
            .is_some_and(|c| self.change(c).kind != ChangeKind::Delete)
    }

    /// Live file holding `path` at `commit`
    #[must_use]
    pub fn file_at(&self, path: &str, commit: CommitIdx) -> Option<FileIdx> {
        if path == DEV_NULL {
            return None;
        }
        self.find_last_change(commit, path)
            .map(|c| self.change(c).file)
            .filter(|&file| {
                self.is_alive_at(file, commit) && self.file_path_at(file, commit) == Some(path)
            })
    }

    /// Commit that last wrote each line of `path` at `commit`
    ///
    /// Returns `None` if no live file holds `path` or its provenance is not
    /// tracked.
    #[must_use]
    pub fn blame(&self, path: &str, commit: CommitIdx) -> Option<Vec<&Commit>> {
        let file = self.file_at(path, commit)?;
        if self.file(file).binary {
            return None;
        }
        let change = self.last_change_at(file, commit)?;
        Some(
            self.change(change)
                .annotated_lines
                .iter()
                .map(|&c| self.commit(c))
                .collect(),
        )
    }
}
