// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Upstream page sources and page arithmetic

use std::io::BufRead;

use tracing::debug;

use crate::error::StreamError;

/// Upstream source of raw commit blocks
///
/// Commits are addressed newest-first, as `git log --skip` does: `skip`
/// counts commits back from the newest. The returned page holds `count`
/// complete commits, oldest first.
pub trait PageSource {
    /// Reader over one page of raw blocks
    type Page: BufRead;

    /// Total number of commits
    ///
    /// # Errors
    ///
    /// Returns an error if the upstream cannot be queried.
    fn commit_count(&self) -> Result<usize, StreamError>;

    /// Fetch `count` commits after skipping the `skip` newest ones
    ///
    /// # Errors
    ///
    /// Returns an error if the range is out of bounds or the upstream fails.
    fn fetch_page(&self, count: usize, skip: usize) -> Result<Self::Page, StreamError>;
}

/// Fixed-size pages over a [`PageSource`], oldest page first
///
/// Page `n` covers the `n`-th oldest batch of `page_size` commits; the last
/// page holds whatever remains.
#[derive(Debug)]
pub struct LogPager<S> {
    source: S,
    page_size: usize,
    commit_count: usize,
}

impl<S: PageSource> LogPager<S> {
    /// Create a pager, querying the commit count once
    ///
    /// # Errors
    ///
    /// Returns `StreamError::InvalidPage` for a zero page size and any error
    /// of [`PageSource::commit_count`].
    pub fn new(source: S, page_size: usize) -> Result<Self, StreamError> {
        if page_size == 0 {
            return Err(StreamError::InvalidPage {
                reason: "page size must be at least 1".to_string(),
            });
        }
        let commit_count = source.commit_count()?;
        debug!(commit_count, page_size, "Created log pager");
        Ok(Self {
            source,
            page_size,
            commit_count,
        })
    }

    /// Number of commits in the source
    #[must_use]
    pub fn commit_count(&self) -> usize {
        self.commit_count
    }

    /// Commits per page
    #[must_use]
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Number of pages
    #[must_use]
    pub fn page_count(&self) -> usize {
        self.commit_count.div_ceil(self.page_size)
    }

    /// `(count, skip)` arguments for page `n`
    ///
    /// # Errors
    ///
    /// Returns `StreamError::InvalidPage` if `n` is past the last page.
    pub fn page_bounds(&self, n: usize) -> Result<(usize, usize), StreamError> {
        if n >= self.page_count() {
            return Err(StreamError::InvalidPage {
                reason: format!("page {n} of {}", self.page_count()),
            });
        }
        let covered = self.page_size * (n + 1);
        Ok(match self.commit_count.checked_sub(covered) {
            Some(skip) => (self.page_size, skip),
            None => (self.page_size - (covered - self.commit_count), 0),
        })
    }

    /// Fetch page `n`
    ///
    /// # Errors
    ///
    /// Returns `StreamError::InvalidPage` if `n` is past the last page and
    /// any error of [`PageSource::fetch_page`].
    pub fn page(&self, n: usize) -> Result<S::Page, StreamError> {
        let (count, skip) = self.page_bounds(n)?;
        debug!(page = n, count, skip, "Fetching page");
        self.source.fetch_page(count, skip)
    }
}
