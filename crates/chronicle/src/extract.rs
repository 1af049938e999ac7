// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Repository to compact log extraction
//!
//! Raw commit blocks are streamed from a [`PageSource`], regrouped per
//! commit, parsed into records and written as a compact log.
//!
//! # Example
//!
//! ```no_run
//! use chronicle::extract::{ExtractOptions, extract_repository};
//!
//! let file = std::fs::File::create("history.log").expect("create");
//! let stats = extract_repository("/path/to/repo", None, file, &ExtractOptions::default())
//!     .expect("extract");
//! println!("Wrote {} commits", stats.commits_written);
//! ```

use std::io::Write;
use std::path::Path;

use chronicle_log::{
    CharMap, CommitAssembler, DiffParser, EncodeOptions, LogError, LogWriter, MergeParentResolver,
};
use chronicle_stream::{CommitStreamer, GitRepoSource, PageSource, StreamOptions};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::ChronicleError;

// ============================================================================
// Options and Statistics
// ============================================================================

/// Options for [`extract`]
#[derive(Debug, Clone, Default)]
pub struct ExtractOptions {
    /// Paging and buffering of the upstream source
    pub stream: StreamOptions,
    /// Content profile and anonymization of the written log
    pub encode: EncodeOptions,
    /// Abort on the first malformed commit
    pub fail_fast: bool,
}

impl ExtractOptions {
    /// Use the given stream options
    #[must_use]
    pub fn with_stream(mut self, stream: StreamOptions) -> Self {
        self.stream = stream;
        self
    }

    /// Write literal line content
    #[must_use]
    pub fn full_content(mut self) -> Self {
        self.encode = EncodeOptions {
            incognito: self.encode.incognito.take(),
            ..EncodeOptions::full_content()
        };
        self
    }

    /// Anonymize identities with `map`
    #[must_use]
    pub fn with_incognito(mut self, map: CharMap) -> Self {
        self.encode = self.encode.with_incognito(map);
        self
    }

    /// Abort on the first malformed commit
    #[must_use]
    pub fn fail_fast(mut self) -> Self {
        self.fail_fast = true;
        self
    }
}

/// Statistics from an extraction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractStats {
    /// Raw blocks read from the stream
    pub blocks_read: usize,
    /// Commits written to the log
    pub commits_written: usize,
    /// Merge commits among them
    pub merges: usize,
    /// Commits skipped as malformed
    pub commits_skipped: usize,
}

// ============================================================================
// Extraction
// ============================================================================

/// Extract the history of the repository containing `repo`
///
/// # Errors
///
/// See [`extract`]; also fails if no repository contains `repo` or
/// `revision` cannot be resolved.
pub fn extract_repository<W: Write>(
    repo: impl AsRef<Path>,
    revision: Option<&str>,
    out: W,
    options: &ExtractOptions,
) -> Result<ExtractStats, ChronicleError> {
    let repo = repo.as_ref();
    info!(path = %repo.display(), revision = revision.unwrap_or("HEAD"), "Starting extraction");

    let source = GitRepoSource::discover_at(repo, revision)?;
    // The producer thread owns `source`; merges are resolved on a second handle.
    let resolver = GitRepoSource::discover_at(repo, revision)?;
    extract(source, Some(&resolver), out, options)
}

/// Stream `source` into a compact log written to `out`
///
/// Malformed commits are logged and skipped unless `fail_fast` is set. If
/// the stream fails mid-way, every commit received so far is written and
/// flushed before the error is returned, including a merge still waiting
/// for further sub-blocks.
///
/// # Errors
///
/// Returns a stream error (`PipelineFatal` when the producer failed), an IO
/// error from `out`, or the first parse error when failing fast.
pub fn extract<S, W>(
    source: S,
    resolver: Option<&dyn MergeParentResolver>,
    out: W,
    options: &ExtractOptions,
) -> Result<ExtractStats, ChronicleError>
where
    S: PageSource + Send + 'static,
    W: Write,
{
    let streamer = CommitStreamer::spawn(source, options.stream.clone())?;
    debug!(
        commits = streamer.commit_count(),
        pages = streamer.page_count(),
        buffer = %streamer.buffer_dir().display(),
        "Streaming commits"
    );

    let parser = match resolver {
        Some(resolver) => DiffParser::new().with_resolver(resolver),
        None => DiffParser::new(),
    };
    let mut writer = LogWriter::new(out, options.encode.clone())?;
    let mut assembler = CommitAssembler::new();
    let mut stats = ExtractStats::default();

    for block in streamer {
        let block = match block {
            Ok(block) => block,
            Err(e) => {
                if let Some(group) = assembler.finish() {
                    write_group(&parser, &group, &mut writer, options, &mut stats)?;
                }
                writer.finish()?;
                warn!(
                    commits = stats.commits_written,
                    "Upstream stream failed, log holds the commits received so far"
                );
                return Err(e.into());
            }
        };
        stats.blocks_read += 1;
        for group in assembler.push(block) {
            write_group(&parser, &group, &mut writer, options, &mut stats)?;
        }
    }
    if let Some(group) = assembler.finish() {
        write_group(&parser, &group, &mut writer, options, &mut stats)?;
    }
    writer.finish()?;

    info!(
        commits = stats.commits_written,
        merges = stats.merges,
        skipped = stats.commits_skipped,
        "Extraction complete"
    );
    Ok(stats)
}

fn write_group<W: Write>(
    parser: &DiffParser<'_>,
    group: &[String],
    writer: &mut LogWriter<W>,
    options: &ExtractOptions,
    stats: &mut ExtractStats,
) -> Result<(), ChronicleError> {
    let mut commit = match parser.parse_group(group) {
        Ok(commit) => commit,
        Err(e) => return skip_or_fail(e, options.fail_fast, &mut stats.commits_skipped),
    };

    if options.encode.profile == chronicle_log::ContentProfile::Metadata {
        commit.reduce_to_metadata();
    }
    if commit.is_merge() {
        stats.merges += 1;
    }
    writer.write_commit(&commit)?;
    stats.commits_written += 1;
    Ok(())
}

/// Log a recoverable error and count it, or return it
pub(crate) fn skip_or_fail(
    error: LogError,
    fail_fast: bool,
    skipped: &mut usize,
) -> Result<(), ChronicleError> {
    if fail_fast || !error.is_recoverable() {
        return Err(error.into());
    }
    warn!(
        commit = error.commit_id().unwrap_or("<unknown>"),
        error = %error,
        "Skipping malformed commit"
    );
    *skipped += 1;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chronicle_log::{DecodeOptions, LogReader};
    use chronicle_stream::MemorySource;
    use similar_asserts::assert_eq;

    fn block(id: &str, parents: &str, diff: &str) -> String {
        format!(
            "ig#{id}\n{parents}\nAnn\nann@example.com\nThu Jan 1 10:00:00 2026 +0000\n\
             Ann\nann@example.com\nThu Jan 1 10:00:00 2026 +0000\nmessage {id}\n#{{Glme}}\n{diff}"
        )
    }

    const ADD_F: &str = "diff --git a/f b/f\nnew file mode 100644\n--- /dev/null\n+++ b/f\n\
                         @@ -0,0 +1,2 @@\n+one\n+two\n";

    fn run(commits: Vec<String>, options: &ExtractOptions) -> Result<(ExtractStats, String), ChronicleError> {
        let mut out = Vec::new();
        let stats = extract(MemorySource::new(commits), None, &mut out, options)?;
        Ok((stats, String::from_utf8(out).unwrap()))
    }

    #[test]
    fn test_extract_writes_every_commit() {
        let commits = vec![block("a", "", ADD_F), block("b", "a", "")];
        let (stats, text) = run(commits, &ExtractOptions::default()).unwrap();

        assert_eq!(stats.commits_written, 2);
        assert_eq!(stats.blocks_read, 2);
        assert!(text.starts_with(chronicle_log::FORMAT_VERSION));
        assert!(text.contains("@=1:2|0"));
        assert!(!text.contains(">one"));

        let records: Vec<_> = LogReader::new(text.as_bytes(), DecodeOptions::default())
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].parent_ids, vec!["a".to_string()]);
    }

    #[test]
    fn test_full_content_keeps_lines() {
        let (_, text) = run(vec![block("a", "", ADD_F)], &ExtractOptions::default().full_content())
            .unwrap();
        assert!(text.contains(">one"));
    }

    #[test]
    fn test_malformed_commit_is_skipped() {
        let bad = block("b", "a", "diff --git a/f b/f\n--- a/f\n+++ b/f\n@@ nonsense @@\n-one\n");
        let commits = vec![block("a", "", ADD_F), bad, block("c", "a", "")];

        let (stats, _) = run(commits.clone(), &ExtractOptions::default()).unwrap();
        assert_eq!(stats.commits_written, 2);
        assert_eq!(stats.commits_skipped, 1);

        let err = run(commits, &ExtractOptions::default().fail_fast()).unwrap_err();
        assert!(matches!(err, ChronicleError::Log(_)));
    }

    #[test]
    fn test_pipeline_failure_keeps_cached_commits() {
        let commits: Vec<String> = (0..5).map(|i| block(&format!("c{i}"), "", "")).collect();
        let source = MemorySource::new(commits).failing_at_fetch(1);
        let options = ExtractOptions::default()
            .with_stream(StreamOptions::default().with_page_size(2));

        let mut out = Vec::new();
        let err = extract(source, None, &mut out, &options).unwrap_err();
        assert_eq!(err.exit_code(), crate::error::EXIT_PIPELINE_FATAL);

        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.matches("ig#").count(), 2);
    }

    #[test]
    fn test_pipeline_failure_keeps_pending_merge() {
        let commits = vec![
            block("a", "", ADD_F),
            block("b", "", ""),
            block("m", "a b", ""),
            block("c", "m", ""),
            block("d", "c", ""),
        ];
        let source = MemorySource::new(commits).failing_at_fetch(1);
        let options = ExtractOptions::default()
            .with_stream(StreamOptions::default().with_page_size(3));

        let mut out = Vec::new();
        let err = extract(source, None, &mut out, &options).unwrap_err();
        assert_eq!(err.exit_code(), crate::error::EXIT_PIPELINE_FATAL);

        let records: Vec<_> = LogReader::new(out.as_slice(), DecodeOptions::default())
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "m"]);
        assert!(records[2].is_merge());
    }

    #[test]
    fn test_incognito_rewrites_identities() {
        let map = CharMap::generate();
        let expected = map.apply("ann@example.com");
        let (_, text) = run(
            vec![block("a", "", ADD_F)],
            &ExtractOptions::default().with_incognito(map),
        )
        .unwrap();
        assert!(text.contains(&expected));
    }
}
