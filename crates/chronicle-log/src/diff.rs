// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Raw log parsing
//!
//! Upstream sources emit one raw block per commit and parent:
//!
//! ```text
//! ig#<commit id>
//! <parent ids>
//! <author name>
//! <author email>
//! <author date>
//! <committer name>
//! <committer email>
//! <committer date>
//! <message lines>
//! #{Glme}
//! diff --git a/<path> b/<path>
//! ...unified diff...
//! ```
//!
//! A merge with N parents is emitted as N consecutive blocks sharing the
//! same id, one diff per parent. [`CommitAssembler`] regroups them and
//! [`DiffParser::parse_group`] merges them into one [`CommitRecord`].

use tracing::{debug, warn};

use crate::codec::COMMIT_PREFIX;
use crate::error::LogError;
use crate::record::{ChangeKind, ChangeRecord, CommitRecord, DEV_NULL, HunkRecord, LineChange};

/// Line terminating the commit message in a raw block
pub const MESSAGE_END: &str = "#{Glme}";
/// Prefix of the line opening one file's diff
pub const DIFF_START: &str = "diff --git";

const NO_NEWLINE: &str = "\\ No newline at end of file";

/// Chooses which parents of a merge produced a diff
///
/// Upstream sources omit the block for a parent whose diff against the
/// merge is empty, so a merge can arrive with fewer blocks than parents.
pub trait MergeParentResolver {
    /// Parents of `commit_id` (in parent order) whose diff is non-empty
    fn parents_with_diff(&self, commit_id: &str, parent_ids: &[String]) -> Vec<String>;
}

/// Parses raw blocks into commit records
#[derive(Clone, Copy, Default)]
pub struct DiffParser<'r> {
    resolver: Option<&'r dyn MergeParentResolver>,
}

impl<'r> DiffParser<'r> {
    /// Create a parser without a merge parent resolver
    #[must_use]
    pub fn new() -> Self {
        Self { resolver: None }
    }

    /// Use a resolver for merges with missing per-parent blocks
    #[must_use]
    pub fn with_resolver(mut self, resolver: &'r dyn MergeParentResolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Parse a single raw block
    ///
    /// Changes are tagged with the first parent (empty for root commits).
    ///
    /// # Errors
    ///
    /// Returns `LogError::Format` for a truncated header or a malformed hunk
    /// header.
    pub fn parse_block(&self, block: &str) -> Result<CommitRecord, LogError> {
        let lines = block_lines(block);
        let (mut commit, body_start) = parse_header(&lines)?;
        let parent = commit.parent_ids.first().cloned().unwrap_or_default();

        commit.changes = parse_changes(&lines[body_start..], body_start, &commit.id, &parent)?;

        debug!(commit = %commit.short_id(), changes = commit.changes.len(), "Parsed raw block");
        Ok(commit)
    }

    /// Parse the blocks of one commit into a single record
    ///
    /// The change list concatenates each block's changes, tagged with the
    /// parent that block was diffed against.
    ///
    /// # Errors
    ///
    /// Returns `LogError::Format` if the group is empty, mixes commit ids,
    /// has more blocks than parents, or any block fails to parse.
    pub fn parse_group<S: AsRef<str>>(&self, blocks: &[S]) -> Result<CommitRecord, LogError> {
        let (first, rest) = blocks
            .split_first()
            .ok_or_else(|| LogError::format(None, 0, "empty commit group"))?;
        let mut commit = self.parse_block(first.as_ref())?;
        if rest.is_empty() && commit.parent_ids.len() <= 1 {
            return Ok(commit);
        }

        let mut siblings = Vec::with_capacity(rest.len());
        for block in rest {
            let sibling = self.parse_block(block.as_ref())?;
            if sibling.id != commit.id {
                return Err(LogError::format(
                    Some(commit.id.as_str()),
                    0,
                    format!("commit group mixes ids {} and {}", commit.id, sibling.id),
                ));
            }
            siblings.push(sibling);
        }

        let parents = self.block_parents(&commit, blocks.len())?;
        for change in &mut commit.changes {
            change.parent_commit_id.clone_from(&parents[0]);
        }
        for (sibling, parent) in siblings.into_iter().zip(&parents[1..]) {
            commit.changes.extend(sibling.changes.into_iter().map(|mut change| {
                change.parent_commit_id.clone_from(parent);
                change
            }));
        }

        Ok(commit)
    }

    /// Parent each block of a merge group was diffed against
    fn block_parents(&self, commit: &CommitRecord, blocks: usize) -> Result<Vec<String>, LogError> {
        let parents = &commit.parent_ids;
        if blocks > parents.len() {
            return Err(LogError::format(
                Some(commit.id.as_str()),
                1,
                format!("{blocks} blocks for {} parents", parents.len()),
            ));
        }
        if blocks == parents.len() {
            return Ok(parents.clone());
        }

        if let Some(resolver) = self.resolver {
            let resolved = resolver.parents_with_diff(&commit.id, parents);
            if resolved.len() == blocks {
                return Ok(resolved);
            }
            warn!(
                commit = %commit.id,
                resolved = resolved.len(),
                blocks,
                "Resolver disagrees with block count, assigning parents by position"
            );
        } else {
            warn!(
                commit = %commit.id,
                parents = parents.len(),
                blocks,
                "Merge has fewer blocks than parents, assigning parents by position"
            );
        }
        Ok(parents[..blocks].to_vec())
    }
}

/// Split raw text into blocks at `ig#` lines
///
/// Text before the first `ig#` line is dropped.
#[must_use]
pub fn split_blocks(text: &str) -> Vec<String> {
    let mut blocks: Vec<String> = Vec::new();
    for line in text.split_inclusive('\n') {
        if line.starts_with(COMMIT_PREFIX) {
            blocks.push(String::new());
        }
        if let Some(block) = blocks.last_mut() {
            block.push_str(line);
        }
    }
    blocks
}

/// Commit id of a raw or compact block
#[must_use]
pub fn block_commit_id(block: &str) -> Option<&str> {
    block
        .lines()
        .next()
        .and_then(|line| line.strip_prefix(COMMIT_PREFIX))
        .map(str::trim_end)
}

/// Number of parents named on the second line of a block
#[must_use]
pub fn block_parent_count(block: &str) -> usize {
    block
        .lines()
        .nth(1)
        .map_or(0, |line| line.split_whitespace().count())
}

/// Regroups per-parent blocks of a merge as they arrive
///
/// A group is emitted once it holds one block per parent, or when a block
/// with a different id arrives.
#[derive(Debug, Default)]
pub struct CommitAssembler {
    pending: Vec<String>,
    expected: usize,
}

impl CommitAssembler {
    /// Create an empty assembler
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the next block, returning any groups it completes
    pub fn push(&mut self, block: String) -> Vec<Vec<String>> {
        let mut done = Vec::new();

        let same_commit = self
            .pending
            .first()
            .is_some_and(|first| block_commit_id(first) == block_commit_id(&block));
        if !self.pending.is_empty() && !same_commit {
            done.push(std::mem::take(&mut self.pending));
        }

        if self.pending.is_empty() {
            self.expected = block_parent_count(&block).max(1);
        }
        self.pending.push(block);

        if self.pending.len() >= self.expected {
            done.push(std::mem::take(&mut self.pending));
        }
        done
    }

    /// Emit the trailing partial group, if any
    #[must_use]
    pub fn finish(self) -> Option<Vec<String>> {
        (!self.pending.is_empty()).then_some(self.pending)
    }
}

fn block_lines(block: &str) -> Vec<&str> {
    let mut lines: Vec<&str> = block.split('\n').collect();
    if block.ends_with('\n') {
        lines.pop();
    }
    lines
}

/// Parse the header of a raw block, returning the index of the first diff line
fn parse_header(lines: &[&str]) -> Result<(CommitRecord, usize), LogError> {
    let id = lines
        .first()
        .and_then(|l| l.strip_prefix(COMMIT_PREFIX))
        .map(|id| id.trim().to_string())
        .ok_or_else(|| LogError::format(None, 0, format!("expected '{COMMIT_PREFIX}' line")))?;

    let field = |idx: usize, what: &str| -> Result<String, LogError> {
        lines
            .get(idx)
            .map(|l| l.trim().to_string())
            .ok_or_else(|| LogError::format(Some(id.as_str()), idx, format!("truncated header: missing {what}")))
    };

    let parent_ids = field(1, "parent ids")?
        .split_whitespace()
        .map(str::to_string)
        .collect();
    let author_name = field(2, "author name")?;
    let author_email = field(3, "author email")?;
    let author_date = field(4, "author date")?;
    let committer_name = field(5, "committer name")?;
    let committer_email = field(6, "committer email")?;
    let committer_date = field(7, "committer date")?;

    let message_lines = &lines[8.min(lines.len())..];
    let end = message_lines
        .iter()
        .position(|l| *l == MESSAGE_END)
        .ok_or_else(|| LogError::format(Some(id.as_str()), lines.len(), "truncated header: missing message end"))?;
    let message = message_lines[..end].join("\n").trim().to_string();
    let body_start = lines.len() - message_lines.len() + end + 1;

    let commit = CommitRecord {
        id,
        parent_ids,
        author_name,
        author_email,
        author_date,
        committer_name,
        committer_email,
        committer_date,
        message,
        changes: Vec::new(),
    };
    Ok((commit, body_start))
}

fn parse_changes(
    lines: &[&str],
    offset: usize,
    commit_id: &str,
    parent: &str,
) -> Result<Vec<ChangeRecord>, LogError> {
    let starts: Vec<usize> = lines
        .iter()
        .enumerate()
        .filter(|(_, l)| l.starts_with(DIFF_START))
        .map(|(idx, _)| idx)
        .collect();

    let mut changes = Vec::with_capacity(starts.len());
    for (n, &start) in starts.iter().enumerate() {
        let end = starts.get(n + 1).copied().unwrap_or(lines.len());
        changes.push(parse_change(&lines[start..end], offset + start, commit_id, parent)?);
    }
    Ok(changes)
}

fn parse_change(
    lines: &[&str],
    offset: usize,
    commit_id: &str,
    parent: &str,
) -> Result<ChangeRecord, LogError> {
    let hunk_start = lines
        .iter()
        .position(|l| l.starts_with('@'))
        .unwrap_or(lines.len());
    let header = &lines[..hunk_start];

    let has = |prefix: &str| header.iter().any(|l| l.starts_with(prefix));
    let kind = if has("new file mode") {
        ChangeKind::Add
    } else if has("deleted file mode") {
        ChangeKind::Delete
    } else if has("similarity index") {
        ChangeKind::Rename
    } else {
        ChangeKind::Modify
    };
    let binary = has("Binary files");

    let (old_prefix, new_prefix) = if kind == ChangeKind::Rename {
        ("rename from ", "rename to ")
    } else {
        ("--- a/", "+++ b/")
    };
    let old_path = if kind == ChangeKind::Add {
        DEV_NULL.to_string()
    } else {
        file_name(header, old_prefix)
    };
    let new_path = if kind == ChangeKind::Delete {
        DEV_NULL.to_string()
    } else {
        file_name(header, new_prefix)
    };

    let mut hunks = Vec::new();
    if !binary {
        let mut start = hunk_start;
        while start < lines.len() {
            let end = lines[start + 1..]
                .iter()
                .position(|l| l.starts_with('@'))
                .map_or(lines.len(), |idx| start + 1 + idx);
            hunks.push(parse_hunk(&lines[start..end], offset + start, commit_id)?);
            start = end;
        }
    }

    Ok(ChangeRecord {
        kind,
        old_path,
        new_path,
        parent_commit_id: parent.to_string(),
        binary,
        hunks,
    })
}

fn file_name(header: &[&str], prefix: &str) -> String {
    header
        .iter()
        .find_map(|l| l.strip_prefix(prefix))
        .map_or_else(|| header_file_name(header.first().copied().unwrap_or("")), str::to_string)
        .trim()
        .to_string()
}

/// File name from a `diff --git a/<name> b/<name>` header
///
/// Both sides name the same file here, so the name is the first half of the
/// text after ` a/` split on ` b/`.
fn header_file_name(diff_line: &str) -> String {
    let names = diff_line
        .find(" a/")
        .map_or("", |idx| &diff_line[idx + 3..]);
    let parts: Vec<&str> = names.split(" b/").collect();
    parts[..parts.len() / 2].join(" b/")
}

fn parse_hunk(lines: &[&str], offset: usize, commit_id: &str) -> Result<HunkRecord, LogError> {
    let header = lines.first().copied().unwrap_or("");
    let (mut old_number, mut new_number) = hunk_start_numbers(header)
        .ok_or_else(|| LogError::format(Some(commit_id), offset, format!("malformed hunk header '{header}'")))?;

    let mut line_changes: Vec<LineChange> = Vec::new();
    let mut last_captured = false;

    for line in &lines[1..] {
        if *line == NO_NEWLINE {
            if last_captured {
                if let Some(content) = line_changes.last_mut().and_then(|lc| lc.content.as_mut()) {
                    content.pop();
                }
            }
            continue;
        }

        if let Some(text) = line.strip_prefix('-') {
            line_changes.push(LineChange::deleted(old_number, Some(format!("{text}\n"))));
            old_number += 1;
            last_captured = true;
        } else if let Some(text) = line.strip_prefix('+') {
            line_changes.push(LineChange::added(new_number, Some(format!("{text}\n"))));
            new_number += 1;
            last_captured = true;
        } else {
            old_number += 1;
            new_number += 1;
            last_captured = false;
        }
    }

    Ok(HunkRecord::new(line_changes))
}

/// Starting old and new line numbers of a `@@ -a,b +c,d @@` header
fn hunk_start_numbers(header: &str) -> Option<(usize, usize)> {
    let ranges = header.strip_prefix("@@ ")?;
    let ranges = &ranges[..ranges.find(" @@")?];
    let (old, new) = ranges.split_once(' ')?;
    Some((range_start(old.strip_prefix('-')?)?, range_start(new.strip_prefix('+')?)?))
}

fn range_start(range: &str) -> Option<usize> {
    range.split(',').next()?.parse().ok()
}
