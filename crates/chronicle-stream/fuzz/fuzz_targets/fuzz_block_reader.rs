// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Fuzz target for the incremental block reader
//!
//! Blocks read line by line must match splitting the whole page at once.

#![no_main]

use chronicle_log::split_blocks;
use chronicle_stream::BlockReader;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    let streamed: Result<Vec<String>, _> = BlockReader::new(text.as_bytes()).collect();
    if let Ok(streamed) = streamed {
        assert_eq!(streamed, split_blocks(text));
    }
});
