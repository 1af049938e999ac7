// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Compact commit-log codec
//!
//! The compact log is a line-oriented text format. The first line of a log
//! holds [`FORMAT_VERSION`]; commit blocks follow, each starting with an
//! `ig#<id>` line:
//!
//! ```text
//! ig#<commit id>
//! <parent ids, space separated>
//! <author date>
//! <author email>
//! <author name>
//! [<committer date>            only when any committer field differs
//!  <committer email>
//!  <committer name>]
//! $<message line>               one per message line
//! #<A|D|R|M>[b]                 one block per change, `b` marks binary
//! <parent commit id>
//! <file name lines>             1 line, or 2 (old, new) for renames
//! @=<add ranges>|<del ranges> one per hunk
//! [~><hunk metadata>]
//! [><content line> ...]         full-content profile only
//! ```
//!
//! File-name and identity lines are read by position, so names starting
//! with `#`, `@` or `$` are safe. Such a line starting with `ig#` or `\` is
//! written with an extra leading `\` so it cannot open a new block.

use std::borrow::Cow;
use std::io::{BufRead, Write};

use tracing::{debug, warn};

use crate::error::LogError;
use crate::incognito::CharMap;
use crate::meta::{HunkChangeMeta, META_PREFIX};
use crate::ranges::{format_ranges, parse_ranges};
use crate::record::{ChangeKind, ChangeRecord, CommitRecord, DEV_NULL, HunkRecord, LineChange};

/// Version line written at the top of every compact log
pub const FORMAT_VERSION: &str = "chronicle-log/1";

/// Prefix of the line that opens a commit block
pub const COMMIT_PREFIX: &str = "ig#";
/// Prefix of message lines
pub const MESSAGE_PREFIX: char = '$';
/// Prefix of change header lines
pub const CHANGE_PREFIX: char = '#';
/// Prefix of hunk lines
pub const HUNK_PREFIX: &str = "@=";
/// Prefix of literal content lines
pub const CONTENT_PREFIX: char = '>';
/// Line stripping the trailing newline of the preceding content line
pub const NO_NEWLINE_MARKER: &str = "\\";
/// Prefix escaping file-name and identity lines
pub const ESCAPE_PREFIX: char = '\\';

/// How much of each hunk's content is written
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ContentProfile {
    /// Line numbers (and metadata lines when present) only
    #[default]
    Metadata,
    /// Line numbers plus literal content lines
    Full,
}

/// Options for [`encode_commit`] and [`LogWriter`]
#[derive(Debug, Clone, Default)]
pub struct EncodeOptions {
    /// Content profile
    pub profile: ContentProfile,
    /// Character map applied to identities while encoding
    pub incognito: Option<CharMap>,
}

impl EncodeOptions {
    /// Options for the metadata-only profile
    #[must_use]
    pub fn metadata_only() -> Self {
        Self::default()
    }

    /// Options for the full-content profile
    #[must_use]
    pub fn full_content() -> Self {
        Self {
            profile: ContentProfile::Full,
            ..Default::default()
        }
    }

    /// Anonymize identities with the given map
    #[must_use]
    pub fn with_incognito(mut self, map: CharMap) -> Self {
        self.incognito = Some(map);
        self
    }
}

/// Treatment of change-type markers outside {A, D, R, M}
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ChangeKindPolicy {
    /// Decode as Modify and log a warning
    #[default]
    Lenient,
    /// Reject with [`LogError::UnknownChangeKind`]
    Strict,
}

/// Options for [`decode_commit`] and [`LogReader`]
#[derive(Debug, Clone, Copy, Default)]
pub struct DecodeOptions {
    /// Unknown change-type handling
    pub change_kind_policy: ChangeKindPolicy,
}

impl DecodeOptions {
    /// Reject unknown change types
    #[must_use]
    pub fn strict(mut self) -> Self {
        self.change_kind_policy = ChangeKindPolicy::Strict;
        self
    }
}

/// Encode one commit as a compact-log block
///
/// Hunk line changes are written in canonical order (adds ascending, then
/// deletes ascending) whatever their order in the record.
#[must_use]
pub fn encode_commit(commit: &CommitRecord, options: &EncodeOptions) -> String {
    let identity = |text: &str| match &options.incognito {
        Some(map) => escape_name(&map.apply(text)).into_owned(),
        None => escape_name(text).into_owned(),
    };

    let mut out = String::new();
    push_line(&mut out, &format!("{COMMIT_PREFIX}{}", commit.id));
    push_line(&mut out, &commit.parent_ids.join(" "));
    push_line(&mut out, &commit.author_date);
    push_line(&mut out, &identity(&commit.author_email));
    push_line(&mut out, &identity(&commit.author_name));

    if !commit.committer_is_author() {
        push_line(&mut out, &commit.committer_date);
        push_line(&mut out, &identity(&commit.committer_email));
        push_line(&mut out, &identity(&commit.committer_name));
    }

    for line in commit.message.split('\n') {
        out.push(MESSAGE_PREFIX);
        push_line(&mut out, line);
    }

    for change in &commit.changes {
        encode_change(&mut out, change, options.profile);
    }

    out
}

fn encode_change(out: &mut String, change: &ChangeRecord, profile: ContentProfile) {
    out.push(CHANGE_PREFIX);
    out.push(change.kind.marker());
    if change.binary {
        out.push('b');
    }
    out.push('\n');
    push_line(out, &change.parent_commit_id);

    match change.kind {
        ChangeKind::Add => push_line(out, &escape_name(&change.new_path)),
        ChangeKind::Delete => push_line(out, &escape_name(&change.old_path)),
        ChangeKind::Rename => {
            push_line(out, &escape_name(&change.old_path));
            push_line(out, &escape_name(&change.new_path));
        }
        ChangeKind::Modify => push_line(out, &escape_name(&change.new_path)),
    }

    if change.binary {
        return;
    }

    for hunk in &change.hunks {
        let mut ordered: Vec<&LineChange> = hunk.line_changes.iter().collect();
        ordered.sort_by_key(|lc| (!lc.is_add(), lc.number));

        let adds: Vec<usize> = ordered.iter().filter(|lc| lc.is_add()).map(|lc| lc.number).collect();
        let dels: Vec<usize> = ordered.iter().filter(|lc| !lc.is_add()).map(|lc| lc.number).collect();
        out.push_str(HUNK_PREFIX);
        push_line(out, &format!("{}|{}", format_ranges(&adds), format_ranges(&dels)));

        if let Some(meta) = &hunk.change_meta {
            push_line(out, &format!("{META_PREFIX}{}", meta.to_line()));
        }

        if profile == ContentProfile::Full && hunk.has_content() {
            for lc in ordered {
                let content = lc.content.as_deref().unwrap_or("\n");
                out.push(CONTENT_PREFIX);
                match content.strip_suffix('\n') {
                    Some(line) => push_line(out, line),
                    None => {
                        push_line(out, content);
                        push_line(out, NO_NEWLINE_MARKER);
                    }
                }
            }
        }
    }
}

fn push_line(out: &mut String, line: &str) {
    out.push_str(line);
    out.push('\n');
}

/// Sequential reader over the lines of one commit block
struct Cursor<'a> {
    lines: Vec<&'a str>,
    pos: usize,
    commit_id: Option<String>,
}

impl<'a> Cursor<'a> {
    fn new(text: &'a str) -> Self {
        let mut lines: Vec<&str> = text.split('\n').collect();
        if text.ends_with('\n') {
            lines.pop();
        }
        Self {
            lines,
            pos: 0,
            commit_id: None,
        }
    }

    fn peek(&self) -> Option<&'a str> {
        self.lines.get(self.pos).copied()
    }

    fn next(&mut self, what: &str) -> Result<&'a str, LogError> {
        let line = self
            .peek()
            .ok_or_else(|| self.error(format!("truncated block: missing {what}")))?;
        self.pos += 1;
        Ok(line)
    }

    fn next_if(&mut self, pred: impl Fn(&str) -> bool) -> Option<&'a str> {
        let line = self.peek().filter(|l| pred(l))?;
        self.pos += 1;
        Some(line)
    }

    fn error(&self, reason: impl Into<String>) -> LogError {
        LogError::format(self.commit_id.as_deref(), self.pos, reason)
    }

    /// Error pointing at the line just consumed
    fn error_prev(&self, reason: impl Into<String>) -> LogError {
        LogError::format(self.commit_id.as_deref(), self.pos.saturating_sub(1), reason)
    }
}

/// Decode one compact-log commit block
///
/// # Errors
///
/// Returns `LogError::Format` for truncated blocks and malformed range or
/// metadata lines, and `LogError::UnknownChangeKind` for unknown change
/// types when decoding strictly.
pub fn decode_commit(text: &str, options: &DecodeOptions) -> Result<CommitRecord, LogError> {
    let mut cursor = Cursor::new(text);

    let id_line = cursor.next("commit id")?;
    let id = id_line
        .strip_prefix(COMMIT_PREFIX)
        .ok_or_else(|| cursor.error_prev(format!("expected '{COMMIT_PREFIX}' line")))?
        .to_string();
    cursor.commit_id = Some(id.clone());

    let parent_ids = cursor
        .next("parent ids")?
        .split_whitespace()
        .map(str::to_string)
        .collect();
    let author_date = cursor.next("author date")?.to_string();
    let author_email = unescape_name(cursor.next("author email")?);
    let author_name = unescape_name(cursor.next("author name")?);

    let next = cursor.peek().ok_or_else(|| cursor.error("truncated block: missing message"))?;
    let (committer_date, committer_email, committer_name) = if next.starts_with(MESSAGE_PREFIX) {
        (author_date.clone(), author_email.clone(), author_name.clone())
    } else {
        (
            cursor.next("committer date")?.to_string(),
            unescape_name(cursor.next("committer email")?),
            unescape_name(cursor.next("committer name")?),
        )
    };

    let mut message_lines = Vec::new();
    while let Some(line) = cursor.next_if(|l| l.starts_with(MESSAGE_PREFIX)) {
        message_lines.push(&line[MESSAGE_PREFIX.len_utf8()..]);
    }
    if message_lines.is_empty() {
        return Err(cursor.error("truncated block: missing message"));
    }
    let message = message_lines.join("\n").trim_end().to_string();

    let mut changes = Vec::new();
    while cursor.peek().is_some() {
        changes.push(decode_change(&mut cursor, &id, options)?);
    }

    Ok(CommitRecord {
        id,
        parent_ids,
        author_name,
        author_email,
        author_date,
        committer_name,
        committer_email,
        committer_date,
        message,
        changes,
    })
}

fn escape_name(name: &str) -> Cow<'_, str> {
    if name.starts_with(COMMIT_PREFIX) || name.starts_with(ESCAPE_PREFIX) {
        Cow::Owned(format!("{ESCAPE_PREFIX}{name}"))
    } else {
        Cow::Borrowed(name)
    }
}

fn unescape_name(line: &str) -> String {
    line.strip_prefix(ESCAPE_PREFIX).unwrap_or(line).to_string()
}

fn decode_change(
    cursor: &mut Cursor<'_>,
    commit_id: &str,
    options: &DecodeOptions,
) -> Result<ChangeRecord, LogError> {
    let header = cursor.next("change header")?;
    let mut flags = header
        .strip_prefix(CHANGE_PREFIX)
        .ok_or_else(|| cursor.error_prev(format!("expected change header, found '{header}'")))?
        .chars();
    let marker = flags
        .next()
        .ok_or_else(|| cursor.error_prev("change header without type"))?;
    let binary = flags.next().is_some();

    let kind = match (ChangeKind::from_marker(marker), options.change_kind_policy) {
        (Some(kind), _) => kind,
        (None, ChangeKindPolicy::Strict) => {
            return Err(LogError::UnknownChangeKind {
                marker,
                commit_id: commit_id.to_string(),
            });
        }
        (None, ChangeKindPolicy::Lenient) => {
            warn!(commit = %commit_id, %marker, "Unknown change type, decoding as modify");
            ChangeKind::Modify
        }
    };

    let parent_commit_id = cursor.next("change parent id")?.to_string();

    let (old_path, new_path) = match kind {
        ChangeKind::Add => (DEV_NULL.to_string(), unescape_name(cursor.next("file name")?)),
        ChangeKind::Delete => (unescape_name(cursor.next("file name")?), DEV_NULL.to_string()),
        ChangeKind::Rename => (
            unescape_name(cursor.next("old file name")?),
            unescape_name(cursor.next("new file name")?),
        ),
        ChangeKind::Modify => {
            let name = unescape_name(cursor.next("file name")?);
            (name.clone(), name)
        }
    };

    let mut hunks = Vec::new();
    if !binary {
        while let Some(line) = cursor.next_if(|l| l.starts_with(HUNK_PREFIX)) {
            hunks.push(decode_hunk(cursor, &line[HUNK_PREFIX.len()..])?);
        }
    }

    Ok(ChangeRecord {
        kind,
        old_path,
        new_path,
        parent_commit_id,
        binary,
        hunks,
    })
}

fn decode_hunk(cursor: &mut Cursor<'_>, body: &str) -> Result<HunkRecord, LogError> {
    let (adds, dels) = body
        .split_once('|')
        .ok_or_else(|| cursor.error_prev(format!("hunk line without '|': '{body}'")))?;
    let adds = parse_ranges(adds).map_err(|reason| cursor.error_prev(reason))?;
    let dels = parse_ranges(dels).map_err(|reason| cursor.error_prev(reason))?;

    let mut line_changes: Vec<LineChange> = adds
        .into_iter()
        .map(|n| LineChange::added(n, None))
        .chain(dels.into_iter().map(|n| LineChange::deleted(n, None)))
        .collect();

    let change_meta = match cursor.next_if(|l| l.starts_with(META_PREFIX)) {
        Some(line) => Some(
            HunkChangeMeta::parse_line(&line[META_PREFIX.len()..])
                .map_err(|reason| cursor.error_prev(reason))?,
        ),
        None => None,
    };

    if cursor.peek().is_some_and(|l| l.starts_with(CONTENT_PREFIX)) {
        for lc in &mut line_changes {
            let line = cursor
                .next_if(|l| l.starts_with(CONTENT_PREFIX))
                .ok_or_else(|| cursor.error("fewer content lines than line changes"))?;
            let mut content = format!("{}\n", &line[CONTENT_PREFIX.len_utf8()..]);
            if cursor.next_if(|l| l == NO_NEWLINE_MARKER).is_some() {
                content.pop();
            }
            lc.content = Some(content);
        }
    }

    Ok(HunkRecord {
        line_changes,
        change_meta,
    })
}

/// Writes a compact log to any [`Write`] sink
pub struct LogWriter<W: Write> {
    inner: W,
    options: EncodeOptions,
    written: usize,
}

impl<W: Write> LogWriter<W> {
    /// Create a writer and emit the version line
    ///
    /// # Errors
    ///
    /// Returns `LogError::Io` if the version line cannot be written.
    pub fn new(mut inner: W, options: EncodeOptions) -> Result<Self, LogError> {
        writeln!(inner, "{FORMAT_VERSION}")?;
        Ok(Self {
            inner,
            options,
            written: 0,
        })
    }

    /// Append one commit block
    ///
    /// # Errors
    ///
    /// Returns `LogError::Io` on write failure.
    pub fn write_commit(&mut self, commit: &CommitRecord) -> Result<(), LogError> {
        self.inner
            .write_all(encode_commit(commit, &self.options).as_bytes())?;
        self.written += 1;
        Ok(())
    }

    /// Number of commits written so far
    #[must_use]
    pub fn commits_written(&self) -> usize {
        self.written
    }

    /// Flush and return the underlying sink
    ///
    /// # Errors
    ///
    /// Returns `LogError::Io` if flushing fails.
    pub fn finish(mut self) -> Result<W, LogError> {
        self.inner.flush()?;
        debug!(commits = self.written, "Finished writing compact log");
        Ok(self.inner)
    }
}

/// Streams commit records from a compact log
///
/// Each item is the decode result of one block, so a caller may skip a
/// malformed block and continue with the next one.
pub struct LogReader<R: BufRead> {
    inner: R,
    options: DecodeOptions,
    version: String,
    pending: Option<String>,
    done: bool,
}

impl<R: BufRead> LogReader<R> {
    /// Create a reader, consuming the version line
    ///
    /// # Errors
    ///
    /// Returns `LogError::Io` on read failure and `LogError::Format` for an
    /// empty log.
    pub fn new(inner: R, options: DecodeOptions) -> Result<Self, LogError> {
        let mut reader = Self {
            inner,
            options,
            version: String::new(),
            pending: None,
            done: false,
        };

        let version = reader
            .read_line()?
            .ok_or_else(|| LogError::format(None, 0, "empty log: missing version line"))?;
        if version != FORMAT_VERSION {
            warn!(found = %version, expected = FORMAT_VERSION, "Unexpected compact log version");
        }
        reader.version = version;
        Ok(reader)
    }

    /// Version line of the log
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    fn read_line(&mut self) -> Result<Option<String>, LogError> {
        let mut line = String::new();
        if self.inner.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        if line.ends_with('\n') {
            line.pop();
        }
        Ok(Some(line))
    }

    fn next_block(&mut self) -> Result<Option<String>, LogError> {
        let mut block = match self.pending.take() {
            Some(first) => first,
            None => loop {
                match self.read_line()? {
                    None => return Ok(None),
                    Some(line) if line.starts_with(COMMIT_PREFIX) => break line,
                    Some(line) if line.is_empty() => {}
                    Some(line) => warn!(line = %line, "Skipping text outside a commit block"),
                }
            },
        };
        block.push('\n');

        while let Some(line) = self.read_line()? {
            if line.starts_with(COMMIT_PREFIX) {
                self.pending = Some(line);
                break;
            }
            block.push_str(&line);
            block.push('\n');
        }

        Ok(Some(block))
    }
}

impl<R: BufRead> Iterator for LogReader<R> {
    type Item = Result<CommitRecord, LogError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_block() {
            Ok(Some(block)) => Some(decode_commit(&block, &self.options)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    fn identity() -> impl Strategy<Value = String> {
        "[A-Za-z][A-Za-z0-9 .@_-]{0,20}[A-Za-z0-9]"
    }

    fn path() -> impl Strategy<Value = String> {
        "[#@$a-z][a-z0-9_/.]{0,15}"
    }

    fn content() -> impl Strategy<Value = String> {
        ("[ -~]{0,20}", any::<bool>()).prop_map(|(text, newline)| {
            if newline { format!("{text}\n") } else { text }
        })
    }

    fn hunk(with_content: bool) -> impl Strategy<Value = HunkRecord> {
        (
            prop::collection::btree_set(1usize..200, 0..8),
            prop::collection::btree_set(1usize..200, 0..8),
            prop::collection::vec(content(), 16),
        )
            .prop_map(move |(adds, dels, texts): (BTreeSet<usize>, BTreeSet<usize>, Vec<String>)| {
                let mut texts = texts.into_iter();
                let mut take = || if with_content { texts.next() } else { None };
                let mut line_changes = Vec::new();
                for n in adds {
                    line_changes.push(LineChange::added(n, take()));
                }
                for n in dels {
                    line_changes.push(LineChange::deleted(n, take()));
                }
                HunkRecord::new(line_changes)
            })
    }

    fn change(with_content: bool) -> impl Strategy<Value = ChangeRecord> {
        (
            0usize..4,
            path(),
            path(),
            "[0-9a-f]{0,40}",
            any::<bool>(),
            prop::collection::vec(hunk(with_content), 0..3),
        )
            .prop_map(|(kind, old, new, parent, binary, hunks)| {
                let kind = [ChangeKind::Add, ChangeKind::Delete, ChangeKind::Rename, ChangeKind::Modify][kind];
                let (old_path, new_path) = match kind {
                    ChangeKind::Add => (DEV_NULL.to_string(), new),
                    ChangeKind::Delete => (old, DEV_NULL.to_string()),
                    ChangeKind::Rename => (old, new),
                    ChangeKind::Modify => (new.clone(), new),
                };
                ChangeRecord {
                    kind,
                    old_path,
                    new_path,
                    parent_commit_id: parent,
                    binary,
                    hunks: if binary { Vec::new() } else { hunks },
                }
            })
    }

    fn commit(with_content: bool) -> impl Strategy<Value = CommitRecord> {
        (
            "[0-9a-f]{40}",
            prop::collection::vec("[0-9a-f]{40}", 0..3),
            identity(),
            identity(),
            identity(),
            "[A-Za-z0-9 ]{0,10}[A-Za-z0-9](\n[A-Za-z0-9 ]{0,10}[A-Za-z0-9]){0,3}",
            any::<bool>(),
            prop::collection::vec(change(with_content), 0..4),
        )
            .prop_map(|(id, parent_ids, name, email, other, message, same, changes)| {
                let date = "Thu Jan 1 10:00:00 2026 +0000".to_string();
                CommitRecord {
                    id,
                    parent_ids,
                    author_name: name.clone(),
                    author_email: email.clone(),
                    author_date: date.clone(),
                    committer_name: if same { name } else { other },
                    committer_email: email,
                    committer_date: date,
                    message,
                    changes,
                }
            })
    }

    proptest! {
        #[test]
        fn prop_metadata_profile_roundtrip(record in commit(false)) {
            let text = encode_commit(&record, &EncodeOptions::metadata_only());
            let decoded = decode_commit(&text, &DecodeOptions::default()).unwrap();
            prop_assert_eq!(decoded, record);
        }

        #[test]
        fn prop_full_profile_roundtrip(record in commit(true)) {
            let text = encode_commit(&record, &EncodeOptions::full_content());
            let decoded = decode_commit(&text, &DecodeOptions::default()).unwrap();
            prop_assert_eq!(decoded, record);
        }

        #[test]
        fn prop_decode_never_panics(text in "(ig#|[#@$~>\\\\]|[a-z0-9:| -]){0,80}(\n(ig#|[#@$~>]|[a-z0-9:| -]){0,20}){0,12}") {
            let _ = decode_commit(&text, &DecodeOptions::default());
        }

        #[test]
        fn prop_decode_hunk_never_panics(
            adds in "([0-9]{1,20}(:[0-9]{1,20})? ?){1,4}",
            dels in "([0-9]{1,20}(:[0-9]{1,20})? ?){1,4}",
        ) {
            let text = format!("ig#a\n\nd\ne\nn\n$m\n#M\np\nf\n@={adds}|{dels}\n");
            let _ = decode_commit(&text, &DecodeOptions::default());
        }
    }
}
