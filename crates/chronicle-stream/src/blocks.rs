// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Incremental splitting of a page into raw blocks

use std::io::BufRead;

use chronicle_log::codec::COMMIT_PREFIX;

use crate::error::StreamError;

/// Reads raw blocks from a page one at a time
///
/// A block starts at an `ig#` line and runs to the next one. Lines before
/// the first `ig#` line are skipped. Invalid UTF-8 is replaced lossily.
#[derive(Debug)]
pub struct BlockReader<R> {
    inner: R,
    pending: Option<String>,
    done: bool,
}

impl<R: BufRead> BlockReader<R> {
    /// Wrap a page reader
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            pending: None,
            done: false,
        }
    }

    fn next_block(&mut self) -> Result<Option<String>, StreamError> {
        let mut buf = Vec::new();
        loop {
            buf.clear();
            if self.inner.read_until(b'\n', &mut buf)? == 0 {
                self.done = true;
                return Ok(self.pending.take());
            }
            let line = String::from_utf8_lossy(&buf);
            if line.starts_with(COMMIT_PREFIX) {
                let finished = self.pending.replace(line.into_owned());
                if finished.is_some() {
                    return Ok(finished);
                }
            } else if let Some(block) = self.pending.as_mut() {
                block.push_str(&line);
            }
        }
    }
}

impl<R: BufRead> Iterator for BlockReader<R> {
    type Item = Result<String, StreamError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_block() {
            Ok(block) => block.map(Ok),
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chronicle_log::split_blocks;
    use similar_asserts::assert_eq;

    fn read_all(text: &str) -> Vec<String> {
        BlockReader::new(text.as_bytes())
            .collect::<Result<_, _>>()
            .expect("read")
    }

    #[test]
    fn test_splits_at_commit_lines() {
        let blocks = read_all("ig#a\n\nfirst\nig#b\na\nsecond\n");
        assert_eq!(blocks, vec!["ig#a\n\nfirst\n", "ig#b\na\nsecond\n"]);
    }

    #[test]
    fn test_skips_preamble() {
        let blocks = read_all("warning: something\n\nig#a\n\n");
        assert_eq!(blocks, vec!["ig#a\n\n"]);
    }

    #[test]
    fn test_keeps_missing_trailing_newline() {
        let blocks = read_all("ig#a\nlast");
        assert_eq!(blocks, vec!["ig#a\nlast"]);
    }

    #[test]
    fn test_empty_page() {
        assert!(read_all("").is_empty());
        assert!(read_all("no commits here\n").is_empty());
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let page: &[u8] = b"ig#a\n\n-caf\xe9\n+cafe\nig#b\na\n";
        let blocks: Vec<String> = BlockReader::new(page)
            .collect::<Result<_, _>>()
            .expect("read");
        assert_eq!(blocks, vec!["ig#a\n\n-caf\u{fffd}\n+cafe\n", "ig#b\na\n"]);
    }

    #[test]
    fn test_matches_split_blocks() {
        let text = "junk\nig#1\n\nA\nig#2\n1\n+x\n-y\n ig#not a header\nig#3\n2\n";
        assert_eq!(read_all(text), split_blocks(text));
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use chronicle_log::split_blocks;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_agrees_with_split_blocks(
            lines in proptest::collection::vec(
                prop_oneof![Just("ig#c".to_string()), "[a-z +-]{0,8}"],
                0..40,
            )
        ) {
            let text: String = lines.iter().map(|l| format!("{l}\n")).collect();
            let streamed: Vec<String> = BlockReader::new(text.as_bytes())
                .collect::<Result<_, _>>()
                .unwrap();
            prop_assert_eq!(streamed, split_blocks(&text));
        }
    }
}
