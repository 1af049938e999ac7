// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Rebuilding the commit graph from a compact log

use std::io::BufRead;

use chronicle_graph::{BuildOptions, BuildStats, CommitGraph, GraphBuilder, GraphSummary};
use chronicle_log::{DecodeOptions, LogReader};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::ChronicleError;
use crate::extract::skip_or_fail;

/// Options for [`replay`]
#[derive(Debug, Clone, Copy, Default)]
pub struct ReplayOptions {
    /// How the compact log is decoded
    pub decode: DecodeOptions,
    /// How the graph is built
    pub build: BuildOptions,
    /// Abort on the first malformed or unplaceable commit
    pub fail_fast: bool,
}

/// A rebuilt graph
#[derive(Debug)]
pub struct Replay {
    /// The graph, with branch ids assigned
    pub graph: CommitGraph,
    /// Builder counters
    pub stats: BuildStats,
    /// Version line of the log
    pub version: String,
    /// Commits skipped as malformed or unplaceable
    pub commits_skipped: usize,
}

/// Summary printed by `chronicle replay`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayReport {
    /// Version line of the log
    pub version: String,
    /// Commits skipped while reading
    pub commits_skipped: usize,
    /// Graph counts
    pub summary: GraphSummary,
}

impl Replay {
    /// Summarize the replay
    #[must_use]
    pub fn report(&self) -> ReplayReport {
        ReplayReport {
            version: self.version.clone(),
            commits_skipped: self.commits_skipped,
            summary: GraphSummary::new(&self.graph, &self.stats),
        }
    }
}

/// Read a compact log and rebuild its commit graph
///
/// A commit that fails to decode, or that the builder rejects, is logged
/// and skipped unless `fail_fast` is set. Children of a skipped commit are
/// skipped in turn because their parent is unknown.
///
/// # Errors
///
/// Returns IO errors, and the first decode or graph error when failing fast.
pub fn replay<R: BufRead>(input: R, options: &ReplayOptions) -> Result<Replay, ChronicleError> {
    let reader = LogReader::new(input, options.decode)?;
    let version = reader.version().to_string();
    let mut builder = GraphBuilder::new(options.build);
    let mut skipped = 0;

    for record in reader {
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                skip_or_fail(e, options.fail_fast, &mut skipped)?;
                continue;
            }
        };
        if let Err(e) = builder.add_commit(record) {
            if options.fail_fast {
                return Err(e.into());
            }
            warn!(commit = e.commit_id(), error = %e, "Skipping commit");
            skipped += 1;
        }
    }

    let (graph, stats) = builder.finish();
    info!(commits = stats.commits, skipped, "Replayed compact log");
    Ok(Replay {
        graph,
        stats,
        version,
        commits_skipped: skipped,
    })
}

/// One line of `chronicle blame` output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlameLine {
    /// 1-based line number
    pub line: usize,
    /// Commit that last wrote the line
    pub commit: String,
    /// Author of that commit
    pub author: String,
    /// Author date, RFC 3339
    pub date: String,
    /// Subject line of that commit
    pub subject: String,
}

/// Per-line provenance of `path` at `commit` (the last commit by default)
///
/// # Errors
///
/// Returns `CommitNotFound` for an unknown id, `EmptyHistory` for an empty
/// graph and `PathNotTracked` when no text file holds `path` at the commit.
pub fn blame(graph: &CommitGraph, path: &str, commit: Option<&str>) -> Result<Vec<BlameLine>, ChronicleError> {
    let idx = match commit {
        Some(id) => graph
            .find_commit(id)
            .ok_or_else(|| ChronicleError::CommitNotFound { commit: id.to_string() })?,
        None => graph.last_commit().ok_or(ChronicleError::EmptyHistory)?,
    };

    let lines = graph
        .blame(path, idx)
        .ok_or_else(|| ChronicleError::PathNotTracked {
            path: path.to_string(),
            commit: graph.commit(idx).id.clone(),
        })?;

    Ok(lines
        .into_iter()
        .enumerate()
        .map(|(n, c)| BlameLine {
            line: n + 1,
            commit: c.id.clone(),
            author: graph.account(c.author).name.clone(),
            date: c.author_date.to_rfc3339(),
            subject: c.subject().to_string(),
        })
        .collect())
}
