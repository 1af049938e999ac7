// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Character-level hunk metadata
//!
//! When literal content is dropped from a log, each hunk keeps a small
//! summary of how many characters (and how many of those were whitespace)
//! were added, deleted and left unmodified. For hunks that both add and
//! delete lines the counts come from a character diff of the old text
//! against the new text.

use serde::{Deserialize, Serialize};
use similar::{ChangeTag, TextDiff};

use crate::record::{CommitRecord, HunkRecord, LineChange};

/// Prefix of a metadata line in the compact log
pub const META_PREFIX: &str = "~>";

/// Character and whitespace counts for a piece of text
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentMeta {
    /// Total characters
    pub chars: usize,
    /// Whitespace characters among them
    pub spaces: usize,
}

impl ContentMeta {
    /// Count characters of a text
    #[must_use]
    pub fn of(text: &str) -> Self {
        text.chars().fold(Self::default(), |mut meta, c| {
            meta.chars += 1;
            if c.is_whitespace() {
                meta.spaces += 1;
            }
            meta
        })
    }

    /// Check if no characters were counted
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chars == 0
    }

    fn saturating_sub(self, other: Self) -> Self {
        Self {
            chars: self.chars.saturating_sub(other.chars),
            spaces: self.spaces.saturating_sub(other.spaces),
        }
    }
}

/// Added, deleted and unmodified character counts of a hunk
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HunkChangeMeta {
    /// Characters only present in the new text
    pub added: ContentMeta,
    /// Characters only present in the old text
    pub deleted: ContentMeta,
    /// Characters of the old text that survived
    pub unmodified: ContentMeta,
}

impl HunkChangeMeta {
    /// Compute metadata from a hunk's literal content
    ///
    /// Lines without content count as empty text.
    #[must_use]
    pub fn from_hunk(hunk: &HunkRecord) -> Self {
        let old_text = joined(hunk.deleted_lines());
        let new_text = joined(hunk.added_lines());

        let (added, deleted) = if hunk.added_count() > 0 && hunk.deleted_count() > 0 {
            char_diff(&old_text, &new_text)
        } else {
            (ContentMeta::of(&new_text), ContentMeta::of(&old_text))
        };

        let unmodified = if added.is_empty() || deleted.is_empty() {
            ContentMeta::default()
        } else {
            ContentMeta::of(&old_text).saturating_sub(deleted)
        };

        Self {
            added,
            deleted,
            unmodified,
        }
    }

    /// Net character delta (added minus deleted)
    #[must_use]
    pub fn chars_delta(&self) -> i64 {
        self.added.chars as i64 - self.deleted.chars as i64
    }

    /// Format as the body of a `~>` line
    #[must_use]
    pub fn to_line(&self) -> String {
        format!(
            "{}-{} {}-{} {}-{}",
            self.added.chars,
            self.added.spaces,
            self.deleted.chars,
            self.deleted.spaces,
            self.unmodified.chars,
            self.unmodified.spaces
        )
    }

    /// Parse the body of a `~>` line
    ///
    /// Returns a description of the problem on failure.
    pub fn parse_line(text: &str) -> Result<Self, String> {
        let fields: Vec<&str> = text.split(' ').collect();
        let [added, deleted, unmodified] = fields.as_slice() else {
            return Err(format!("expected 3 metadata fields, found {}", fields.len()));
        };
        Ok(Self {
            added: parse_content_meta(added)?,
            deleted: parse_content_meta(deleted)?,
            unmodified: parse_content_meta(unmodified)?,
        })
    }
}

fn parse_content_meta(field: &str) -> Result<ContentMeta, String> {
    let malformed = || format!("malformed metadata field '{field}'");
    let (chars, spaces) = field.split_once('-').ok_or_else(malformed)?;
    Ok(ContentMeta {
        chars: chars.parse().map_err(|_| malformed())?,
        spaces: spaces.parse().map_err(|_| malformed())?,
    })
}

fn joined<'a>(lines: impl Iterator<Item = &'a LineChange>) -> String {
    lines.filter_map(|lc| lc.content.as_deref()).collect()
}

fn char_diff(old: &str, new: &str) -> (ContentMeta, ContentMeta) {
    let mut added = ContentMeta::default();
    let mut deleted = ContentMeta::default();

    let diff = TextDiff::from_chars(old, new);
    for change in diff.iter_all_changes() {
        let target = match change.tag() {
            ChangeTag::Insert => &mut added,
            ChangeTag::Delete => &mut deleted,
            ChangeTag::Equal => continue,
        };
        let counted = ContentMeta::of(change.value());
        target.chars += counted.chars;
        target.spaces += counted.spaces;
    }

    (added, deleted)
}

impl CommitRecord {
    /// Replace literal content with per-hunk character metadata
    ///
    /// Hunks that already carry metadata and no content are left alone.
    pub fn reduce_to_metadata(&mut self) {
        for hunk in self.changes.iter_mut().flat_map(|c| c.hunks.iter_mut()) {
            if hunk.has_content() || hunk.change_meta.is_none() {
                hunk.change_meta = Some(HunkChangeMeta::from_hunk(hunk));
            }
        }
        self.strip_content();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use similar_asserts::assert_eq;

    fn hunk(adds: &[&str], dels: &[&str]) -> HunkRecord {
        let mut line_changes = Vec::new();
        for (i, text) in dels.iter().enumerate() {
            line_changes.push(LineChange::deleted(i + 1, Some((*text).to_string())));
        }
        for (i, text) in adds.iter().enumerate() {
            line_changes.push(LineChange::added(i + 1, Some((*text).to_string())));
        }
        HunkRecord::new(line_changes)
    }

    #[test]
    fn test_content_meta_counts_whitespace() {
        let meta = ContentMeta::of("a b\n");
        assert_eq!(meta, ContentMeta { chars: 4, spaces: 2 });
    }

    #[test]
    fn test_pure_addition() {
        let meta = HunkChangeMeta::from_hunk(&hunk(&["fn main() {}\n"], &[]));
        assert_eq!(meta.added, ContentMeta { chars: 13, spaces: 3 });
        assert!(meta.deleted.is_empty());
        assert!(meta.unmodified.is_empty());
    }

    #[test]
    fn test_pure_deletion() {
        let meta = HunkChangeMeta::from_hunk(&hunk(&[], &["xy\n", "z\n"]));
        assert_eq!(meta.deleted, ContentMeta { chars: 5, spaces: 2 });
        assert!(meta.added.is_empty());
    }

    #[test]
    fn test_modification_uses_char_diff() {
        let meta = HunkChangeMeta::from_hunk(&hunk(&["let x = 2;\n"], &["let x = 1;\n"]));
        assert_eq!(meta.added, ContentMeta { chars: 1, spaces: 0 });
        assert_eq!(meta.deleted, ContentMeta { chars: 1, spaces: 0 });
        assert_eq!(meta.unmodified, ContentMeta { chars: 10, spaces: 4 });
        assert_eq!(meta.chars_delta(), 0);
    }

    #[test]
    fn test_line_roundtrip() {
        let meta = HunkChangeMeta {
            added: ContentMeta { chars: 12, spaces: 3 },
            deleted: ContentMeta { chars: 4, spaces: 0 },
            unmodified: ContentMeta { chars: 7, spaces: 1 },
        };
        assert_eq!(meta.to_line(), "12-3 4-0 7-1");
        assert_eq!(HunkChangeMeta::parse_line("12-3 4-0 7-1").unwrap(), meta);
    }

    #[test]
    fn test_parse_line_rejects_malformed() {
        assert!(HunkChangeMeta::parse_line("1-2 3-4").is_err());
        assert!(HunkChangeMeta::parse_line("1-2 3-4 x-1").is_err());
        assert!(HunkChangeMeta::parse_line("12 3-4 5-6").is_err());
    }

    #[test]
    fn test_reduce_to_metadata_drops_content() {
        let mut commit = CommitRecord {
            id: "a".repeat(40),
            parent_ids: Vec::new(),
            author_name: "A".to_string(),
            author_email: "a@x".to_string(),
            author_date: "Thu Jan 1 00:00:00 2026 +0000".to_string(),
            committer_name: "A".to_string(),
            committer_email: "a@x".to_string(),
            committer_date: "Thu Jan 1 00:00:00 2026 +0000".to_string(),
            message: "init".to_string(),
            changes: vec![crate::record::ChangeRecord {
                kind: crate::record::ChangeKind::Add,
                old_path: crate::record::DEV_NULL.to_string(),
                new_path: "a.txt".to_string(),
                parent_commit_id: String::new(),
                binary: false,
                hunks: vec![hunk(&["one\n", "two\n"], &[])],
            }],
        };

        commit.reduce_to_metadata();

        let reduced = &commit.changes[0].hunks[0];
        assert!(!reduced.has_content());
        assert_eq!(reduced.added_count(), 2);
        assert_eq!(
            reduced.change_meta.map(|m| m.added),
            Some(ContentMeta { chars: 8, spaces: 2 })
        );
    }
}
