// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Fuzz target for rebuilding a graph from an arbitrary compact log
//!
//! Building the graph and blaming every touched path must not panic.

#![no_main]

use chronicle_graph::{BuildOptions, GraphBuilder};
use chronicle_log::{DecodeOptions, LogReader};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(reader) = LogReader::new(data, DecodeOptions::default()) else {
        return;
    };

    let mut builder = GraphBuilder::new(BuildOptions::default());
    for record in reader.flatten() {
        let _ = builder.add_commit(record);
    }
    let (graph, _) = builder.finish();

    let Some(head) = graph.last_commit() else {
        return;
    };
    let paths: Vec<String> = graph
        .changes()
        .map(|(_, change)| change.path().to_string())
        .collect();
    for path in paths {
        if let Some(lines) = graph.blame(&path, head) {
            std::hint::black_box(lines.len());
        }
    }
});
