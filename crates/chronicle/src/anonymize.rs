// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Anonymized re-export of a compact log

use std::io::{BufRead, Write};

use chronicle_log::{CharMap, DecodeOptions, EncodeOptions, LogReader, LogWriter};
use tracing::info;

use crate::error::ChronicleError;
use crate::extract::skip_or_fail;

/// Counts from [`anonymize`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnonymizeStats {
    /// Commits written
    pub commits_written: usize,
    /// Commits skipped as malformed
    pub commits_skipped: usize,
}

/// Copy a compact log with identities mapped through `map`
///
/// Literal content is reduced to character metadata.
///
/// # Errors
///
/// Returns IO errors, and the first decode error when `fail_fast` is set.
pub fn anonymize<R: BufRead, W: Write>(
    input: R,
    out: W,
    map: &CharMap,
    decode: DecodeOptions,
    fail_fast: bool,
) -> Result<AnonymizeStats, ChronicleError> {
    let reader = LogReader::new(input, decode)?;
    let mut writer = LogWriter::new(out, EncodeOptions::metadata_only())?;
    let mut stats = AnonymizeStats::default();

    for record in reader {
        let mut record = match record {
            Ok(record) => record,
            Err(e) => {
                skip_or_fail(e, fail_fast, &mut stats.commits_skipped)?;
                continue;
            }
        };
        map.anonymize_commit(&mut record);
        record.reduce_to_metadata();
        writer.write_commit(&record)?;
        stats.commits_written += 1;
    }
    writer.finish()?;

    info!(
        commits = stats.commits_written,
        skipped = stats.commits_skipped,
        "Wrote anonymized log"
    );
    Ok(stats)
}
