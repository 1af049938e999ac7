// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! chronicle-stream: paginated, disk-buffered streaming of raw commit blocks
//!
//! A [`PageSource`] serves raw blocks a page at a time; [`LogPager`] walks
//! its pages oldest first, and [`CommitStreamer`] runs the pager on a
//! producer thread, caching blocks on disk until the consumer reads them.
//!
//! # Example
//!
//! ```
//! use chronicle_stream::{CommitStreamer, MemorySource, StreamOptions};
//!
//! let source = MemorySource::from_raw("ig#a\n\nfirst\nig#b\na\nsecond\n");
//! let streamer = CommitStreamer::spawn(source, StreamOptions::default().with_page_size(1))
//!     .expect("spawn");
//!
//! let blocks: Vec<String> = streamer.collect::<Result<_, _>>().expect("stream");
//! assert_eq!(blocks, vec!["ig#a\n\nfirst\n", "ig#b\na\nsecond\n"]);
//! ```

#![warn(missing_docs)]

pub mod blocks;
pub mod error;
pub mod git;
pub mod memory;
pub mod pager;
pub mod streamer;

pub use blocks::BlockReader;
pub use error::StreamError;
pub use git::GitRepoSource;
pub use memory::MemorySource;
pub use pager::{LogPager, PageSource};
pub use streamer::{CommitStreamer, StreamOptions};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::error::StreamError;
    pub use crate::git::GitRepoSource;
    pub use crate::memory::MemorySource;
    pub use crate::pager::PageSource;
    pub use crate::streamer::{CommitStreamer, StreamOptions};
}
