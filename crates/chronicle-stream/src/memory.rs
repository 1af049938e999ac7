// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! In-memory page source
//!
//! Serves pre-rendered raw blocks, for replaying captured logs and for
//! driving the streamer in tests.

use std::io::Cursor;
use std::sync::Arc;

use chronicle_log::diff::{block_commit_id, split_blocks};
use parking_lot::Mutex;

use crate::error::StreamError;
use crate::pager::PageSource;

/// Page source over rendered commits held in memory, oldest first
///
/// Each entry holds every raw block of one commit (several for a merge).
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    commits: Vec<String>,
    fetches: Arc<Mutex<Vec<(usize, usize)>>>,
    fail_at_fetch: Option<usize>,
}

impl MemorySource {
    /// Create a source from rendered commits, oldest first
    #[must_use]
    pub fn new(commits: Vec<String>) -> Self {
        Self {
            commits,
            ..Default::default()
        }
    }

    /// Create a source from raw log text, grouping merge blocks by commit
    #[must_use]
    pub fn from_raw(text: &str) -> Self {
        let mut commits: Vec<String> = Vec::new();
        let mut last_id: Option<String> = None;

        for block in split_blocks(text) {
            let id = block_commit_id(&block).map(str::to_string);
            match commits.last_mut() {
                Some(current) if id.is_some() && id == last_id => current.push_str(&block),
                _ => commits.push(block),
            }
            last_id = id;
        }

        Self::new(commits)
    }

    /// Fail the `n`-th fetch (0-based) and every fetch after it
    #[must_use]
    pub fn failing_at_fetch(mut self, n: usize) -> Self {
        self.fail_at_fetch = Some(n);
        self
    }

    /// `(count, skip)` of every fetch so far, shared across clones
    #[must_use]
    pub fn fetch_log(&self) -> Arc<Mutex<Vec<(usize, usize)>>> {
        Arc::clone(&self.fetches)
    }
}

impl PageSource for MemorySource {
    type Page = Cursor<Vec<u8>>;

    fn commit_count(&self) -> Result<usize, StreamError> {
        Ok(self.commits.len())
    }

    fn fetch_page(&self, count: usize, skip: usize) -> Result<Self::Page, StreamError> {
        let fetch_number = {
            let mut fetches = self.fetches.lock();
            fetches.push((count, skip));
            fetches.len() - 1
        };
        if self.fail_at_fetch.is_some_and(|n| fetch_number >= n) {
            return Err(StreamError::Io(std::io::Error::other(format!(
                "upstream failed on fetch {fetch_number}"
            ))));
        }

        let end = self
            .commits
            .len()
            .checked_sub(skip)
            .ok_or_else(|| out_of_range(count, skip, self.commits.len()))?;
        let start = end
            .checked_sub(count)
            .ok_or_else(|| out_of_range(count, skip, self.commits.len()))?;

        let mut page = String::new();
        for commit in &self.commits[start..end] {
            page.push_str(commit);
            if !commit.ends_with('\n') {
                page.push('\n');
            }
        }
        Ok(Cursor::new(page.into_bytes()))
    }
}

fn out_of_range(count: usize, skip: usize, len: usize) -> StreamError {
    StreamError::InvalidPage {
        reason: format!("{count} commits after skipping {skip} of {len}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use similar_asserts::assert_eq;
    use std::io::Read;

    fn read(mut page: Cursor<Vec<u8>>) -> String {
        let mut text = String::new();
        page.read_to_string(&mut text).expect("read");
        text
    }

    #[test]
    fn test_fetch_counts_skip_from_newest() {
        let source = MemorySource::new(vec!["ig#a".into(), "ig#b".into(), "ig#c".into()]);
        assert_eq!(read(source.fetch_page(2, 1).unwrap()), "ig#a\nig#b\n");
        assert_eq!(read(source.fetch_page(1, 0).unwrap()), "ig#c\n");
        assert_eq!(*source.fetch_log().lock(), vec![(2, 1), (1, 0)]);
    }

    #[test]
    fn test_fetch_out_of_range() {
        let source = MemorySource::new(vec!["ig#a\n".into()]);
        assert!(matches!(
            source.fetch_page(2, 0),
            Err(StreamError::InvalidPage { .. })
        ));
        assert!(matches!(
            source.fetch_page(1, 3),
            Err(StreamError::InvalidPage { .. })
        ));
    }

    #[test]
    fn test_from_raw_groups_merge_blocks() {
        let text = "ig#a\n\nx\nig#m\na b\ny\nig#m\na b\nz\nig#c\nm\nw\n";
        let source = MemorySource::from_raw(text);
        assert_eq!(source.commit_count().unwrap(), 3);
        assert_eq!(read(source.fetch_page(1, 1).unwrap()), "ig#m\na b\ny\nig#m\na b\nz\n");
    }

    #[test]
    fn test_failing_fetch() {
        let source = MemorySource::new(vec!["ig#a\n".into(), "ig#b\n".into()]).failing_at_fetch(1);
        assert!(source.fetch_page(1, 1).is_ok());
        assert!(matches!(source.fetch_page(1, 0), Err(StreamError::Io(_))));
    }
}
