// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! chronicle-log: commit records, the compact log codec and raw diff parsing
//!
//! This library crate defines the commit/change/hunk record vocabulary shared
//! by the chronicle crates, the line-oriented compact log format those
//! records round-trip through, and the parser that turns raw per-parent log
//! blocks into records.
//!
//! # Example
//!
//! ```
//! use chronicle_log::{DecodeOptions, DiffParser, EncodeOptions, decode_commit, encode_commit};
//!
//! let raw = "ig#1111111111111111111111111111111111111111\n\nAnn\nann@example.com\n\
//!            Thu Jan 1 10:00:00 2026 +0000\nAnn\nann@example.com\n\
//!            Thu Jan 1 10:00:00 2026 +0000\ninitial\n#{Glme}\n\
//!            diff --git a/a.txt b/a.txt\nnew file mode 100644\n--- /dev/null\n+++ b/a.txt\n\
//!            @@ -0,0 +1,3 @@\n+x\n+y\n+z\n";
//!
//! let mut commit = DiffParser::new().parse_block(raw).expect("parse");
//! commit.strip_content();
//!
//! let text = encode_commit(&commit, &EncodeOptions::metadata_only());
//! assert!(text.contains("@=1:3|0"));
//! assert_eq!(decode_commit(&text, &DecodeOptions::default()).expect("decode"), commit);
//! ```

#![warn(missing_docs)]

pub mod codec;
pub mod diff;
pub mod error;
pub mod incognito;
pub mod meta;
pub mod ranges;
pub mod record;

pub use codec::{
    ChangeKindPolicy, ContentProfile, DecodeOptions, EncodeOptions, FORMAT_VERSION, LogReader,
    LogWriter, decode_commit, encode_commit,
};
pub use diff::{CommitAssembler, DiffParser, MergeParentResolver, split_blocks};
pub use error::LogError;
pub use incognito::CharMap;
pub use meta::{ContentMeta, HunkChangeMeta};
pub use record::{
    ChangeKind, ChangeRecord, CommitRecord, DEV_NULL, HunkRecord, LineChange, LineOperation,
};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::codec::{DecodeOptions, EncodeOptions, LogReader, LogWriter};
    pub use crate::diff::{CommitAssembler, DiffParser, MergeParentResolver};
    pub use crate::error::LogError;
    pub use crate::incognito::CharMap;
    pub use crate::record::{ChangeKind, ChangeRecord, CommitRecord, HunkRecord, LineChange};
}
