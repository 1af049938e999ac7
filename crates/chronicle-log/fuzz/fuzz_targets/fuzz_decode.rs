// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Fuzz target for the compact log decoder
//!
//! Decoded records must re-encode without panicking.

#![no_main]

use chronicle_log::{DecodeOptions, EncodeOptions, decode_commit, encode_commit};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    // Anything that decodes must re-encode to text that decodes to the same record
    if let Ok(record) = decode_commit(text, &DecodeOptions::default()) {
        let encoded = encode_commit(&record, &EncodeOptions::full_content());
        let _ = std::hint::black_box(decode_commit(&encoded, &DecodeOptions::default()));
    }
});
