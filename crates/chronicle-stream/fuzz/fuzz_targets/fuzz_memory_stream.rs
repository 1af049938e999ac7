// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Fuzz target for the commit streamer
//!
//! Streams arbitrary raw text through a small buffer and checks that every
//! block comes back in order.

#![no_main]

use chronicle_log::split_blocks;
use chronicle_stream::{CommitStreamer, MemorySource, StreamOptions};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Some((&page_size, rest)) = data.split_first() else {
        return;
    };
    let Ok(text) = std::str::from_utf8(rest) else {
        return;
    };

    let options = StreamOptions::default()
        .with_page_size(usize::from(page_size % 8) + 1)
        .with_buffer_capacity(2);
    let Ok(streamer) = CommitStreamer::spawn(MemorySource::from_raw(text), options) else {
        return;
    };

    // Pages always end in a newline
    let mut expected = text.to_string();
    if !expected.ends_with('\n') {
        expected.push('\n');
    }

    let blocks: Vec<String> = streamer.filter_map(Result::ok).collect();
    assert_eq!(blocks, split_blocks(&expected));
});
