// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Fuzz target for the raw diff parser
//!
//! Arbitrary raw text is split, regrouped and parsed; nothing may panic.

#![no_main]

use chronicle_log::{CommitAssembler, DiffParser, split_blocks};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    let parser = DiffParser::new();
    let mut assembler = CommitAssembler::new();
    for block in split_blocks(text) {
        for group in assembler.push(block) {
            let _ = std::hint::black_box(parser.parse_group(&group));
        }
    }
    if let Some(group) = assembler.finish() {
        let _ = std::hint::black_box(parser.parse_group(&group));
    }
});
