// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Line-range lists used by hunk lines
//!
//! A side of a hunk line is a space-separated list of `N` (single line) or
//! `N:M` (inclusive run) tokens. An empty side is written as `0`.

use std::fmt::Write as _;

/// Most line numbers one side of a hunk line may expand to
pub const MAX_SIDE_LINES: usize = 1 << 22;

/// Format ascending line numbers as a range list
///
/// Consecutive numbers are collapsed into `N:M` runs.
#[must_use]
pub fn format_ranges(numbers: &[usize]) -> String {
    let Some((&first, rest)) = numbers.split_first() else {
        return "0".to_string();
    };

    let mut out = String::new();
    let mut start = first;
    let mut end = first;

    for &n in rest {
        if n == end + 1 {
            end = n;
        } else {
            push_run(&mut out, start, end);
            start = n;
            end = n;
        }
    }
    push_run(&mut out, start, end);
    out
}

fn push_run(out: &mut String, start: usize, end: usize) {
    if !out.is_empty() {
        out.push(' ');
    }
    if start == end {
        let _ = write!(out, "{start}");
    } else {
        let _ = write!(out, "{start}:{end}");
    }
}

/// Parse a range list into ascending line numbers
///
/// Returns a description of the first offending token on failure. A side
/// expanding to more than [`MAX_SIDE_LINES`] numbers is rejected.
pub fn parse_ranges(text: &str) -> Result<Vec<usize>, String> {
    let mut numbers = Vec::new();

    for token in text.split_whitespace() {
        if token == "0" {
            continue;
        }
        match token.split_once(':') {
            Some((start, end)) => {
                let start = parse_line_number(start, token)?;
                let end = parse_line_number(end, token)?;
                if end < start {
                    return Err(format!("descending range '{token}'"));
                }
                if end - start >= MAX_SIDE_LINES - numbers.len() {
                    return Err(format!("range '{token}' too wide"));
                }
                numbers.extend(start..=end);
            }
            None => {
                if numbers.len() == MAX_SIDE_LINES {
                    return Err(format!("too many line numbers at '{token}'"));
                }
                numbers.push(parse_line_number(token, token)?);
            }
        }
    }

    Ok(numbers)
}

fn parse_line_number(text: &str, token: &str) -> Result<usize, String> {
    match text.parse::<usize>() {
        Ok(0) => Err(format!("line number 0 inside range '{token}'")),
        Ok(n) => Ok(n),
        Err(_) => Err(format!("malformed range '{token}'")),
    }
}
