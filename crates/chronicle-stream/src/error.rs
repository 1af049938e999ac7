// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Error types for chronicle-stream

use chronicle_log::LogError;
use thiserror::Error;

/// Errors that can occur while paging or streaming commit logs
#[derive(Debug, Error)]
pub enum StreamError {
    /// Error reading or writing buffer slots
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from git2 operations
    #[error("Git error: {0}")]
    Git2(#[from] git2::Error),

    /// Repository not found at the specified path
    #[error("Repository not found: {path}")]
    RepositoryNotFound {
        /// The path that was searched
        path: String,
    },

    /// Page number or page size outside the valid range
    #[error("Invalid page: {reason}")]
    InvalidPage {
        /// Description of the problem
        reason: String,
    },

    /// The producer thread failed; no further blocks will arrive
    #[error("Pipeline failed after {}: {reason}", cached_label(.last_cached))]
    PipelineFatal {
        /// Sequence number of the last block the producer cached
        last_cached: Option<usize>,
        /// Description of the producer failure
        reason: String,
    },

    /// Error decoding or parsing a block
    #[error(transparent)]
    Log(#[from] LogError),
}

fn cached_label(last_cached: &Option<usize>) -> String {
    match last_cached {
        Some(seq) => format!("caching block {seq}"),
        None => "caching no blocks".to_string(),
    }
}

impl StreamError {
    /// Whether the error ended the producer/consumer pipeline
    #[must_use]
    pub fn is_pipeline_fatal(&self) -> bool {
        matches!(self, Self::PipelineFatal { .. })
    }
}
