// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Error types for the chronicle commands

use thiserror::Error;

use chronicle_graph::GraphError;
use chronicle_log::LogError;
use chronicle_stream::StreamError;

use crate::config::ConfigError;

/// Exit status for ordinary failures
pub const EXIT_FAILURE: u8 = 1;

/// Exit status when the upstream pipeline failed mid-stream
pub const EXIT_PIPELINE_FATAL: u8 = 2;

/// Errors returned by the extract, replay, blame and anonymize commands
#[derive(Debug, Error)]
pub enum ChronicleError {
    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Compact log or raw diff error
    #[error("Log error: {0}")]
    Log(#[from] LogError),

    /// Upstream streaming error
    #[error("Stream error: {0}")]
    Stream(#[from] StreamError),

    /// Commit graph error
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error on an input or output file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// No commit matches the requested id
    #[error("Commit not found: {commit}")]
    CommitNotFound {
        /// The requested id
        commit: String,
    },

    /// The log holds no commits
    #[error("Log contains no commits")]
    EmptyHistory,

    /// No tracked file holds the path at the commit
    #[error("No line provenance for {path} at commit {commit}")]
    PathNotTracked {
        /// The requested path
        path: String,
        /// The commit it was requested at
        commit: String,
    },
}

impl ChronicleError {
    /// Process exit status for this error
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Stream(e) if e.is_pipeline_fatal() => EXIT_PIPELINE_FATAL,
            _ => EXIT_FAILURE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use similar_asserts::assert_eq;

    #[test]
    fn test_exit_codes() {
        let fatal = ChronicleError::Stream(StreamError::PipelineFatal {
            last_cached: Some(4),
            reason: "upstream failed".to_string(),
        });
        assert_eq!(fatal.exit_code(), EXIT_PIPELINE_FATAL);

        let missing = ChronicleError::CommitNotFound {
            commit: "abc".to_string(),
        };
        assert_eq!(missing.exit_code(), EXIT_FAILURE);
        assert_eq!(missing.to_string(), "Commit not found: abc");
    }
}
