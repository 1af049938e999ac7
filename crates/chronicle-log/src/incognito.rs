// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Identity anonymization for exported logs
//!
//! A [`CharMap`] is a pair of random bijections, one over `a..z` and one over
//! `0..9`. It is applied to author and committer names and emails so that
//! exported logs keep identities distinct without revealing them. Upper-case
//! letters map through their lower-case counterpart, preserving case.
//!
//! The map is generated once and persisted as `<from> <to>` lines; later runs
//! load the same file so identities stay stable across exports.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use rand::seq::SliceRandom;
use tracing::{debug, info};

use crate::error::LogError;
use crate::record::CommitRecord;

/// Environment variable naming the character map file
pub const CHARMAP_ENV: &str = "CHRONICLE_CHARMAP";

const LETTERS: &str = "abcdefghijklmnopqrstuvwxyz";
const DIGITS: &str = "0123456789";

/// Case-preserving letter and digit substitution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharMap {
    map: BTreeMap<char, char>,
}

impl CharMap {
    /// Generate a fresh random map
    #[must_use]
    pub fn generate() -> Self {
        let mut rng = rand::rng();
        let mut map = BTreeMap::new();

        for alphabet in [LETTERS, DIGITS] {
            let from: Vec<char> = alphabet.chars().collect();
            let mut to = from.clone();
            to.shuffle(&mut rng);
            map.extend(from.into_iter().zip(to));
        }

        Self { map }
    }

    /// Parse the persisted `<from> <to>` form
    ///
    /// Blank lines are ignored. Characters without an entry map to
    /// themselves.
    ///
    /// # Errors
    ///
    /// Returns a description of the problem if a line is malformed or two
    /// characters map to the same target.
    pub fn parse(text: &str) -> Result<Self, String> {
        let mut map = BTreeMap::new();

        for (idx, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let mut parts = line.split_whitespace();
            let (Some(from), Some(to), None) = (parts.next(), parts.next(), parts.next()) else {
                return Err(format!("line {}: expected '<from> <to>'", idx + 1));
            };
            let (Some(from), Some(to)) = (single_char(from), single_char(to)) else {
                return Err(format!("line {}: entries must be single characters", idx + 1));
            };
            if !is_mappable(from) || !is_mappable(to) || from.is_ascii_digit() != to.is_ascii_digit() {
                return Err(format!("line {}: cannot map '{from}' to '{to}'", idx + 1));
            }
            map.insert(from, to);
        }

        let mut targets: Vec<char> = map.values().copied().collect();
        targets.sort_unstable();
        targets.dedup();
        if targets.len() != map.len() {
            return Err("character map is not a bijection".to_string());
        }

        Ok(Self { map })
    }

    /// Render the persisted form
    #[must_use]
    pub fn to_text(&self) -> String {
        self.map
            .iter()
            .map(|(from, to)| format!("{from} {to}\n"))
            .collect()
    }

    /// Load a map from a file
    ///
    /// # Errors
    ///
    /// Returns `LogError::CharMap` if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LogError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| charmap_error(path, e.to_string()))?;
        Self::parse(&text).map_err(|reason| charmap_error(path, reason))
    }

    /// Write the map to a file, creating parent directories
    ///
    /// # Errors
    ///
    /// Returns `LogError::CharMap` if the file cannot be written.
    pub fn persist(&self, path: impl AsRef<Path>) -> Result<(), LogError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| charmap_error(path, e.to_string()))?;
        }
        fs::write(path, self.to_text()).map_err(|e| charmap_error(path, e.to_string()))
    }

    /// Load the map at `path`, generating and persisting one if it is missing
    ///
    /// # Errors
    ///
    /// Returns `LogError::CharMap` if an existing file is invalid or a new
    /// one cannot be written.
    pub fn load_or_create(path: impl AsRef<Path>) -> Result<Self, LogError> {
        let path = path.as_ref();
        if path.exists() {
            debug!(path = %path.display(), "Loading character map");
            return Self::load(path);
        }

        let map = Self::generate();
        map.persist(path)?;
        info!(path = %path.display(), "Generated new character map");
        Ok(map)
    }

    /// Default map location
    ///
    /// `CHRONICLE_CHARMAP` when set, otherwise `~/.chronicle/charmap`.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        if let Some(path) = std::env::var_os(CHARMAP_ENV).filter(|p| !p.is_empty()) {
            return Some(PathBuf::from(path));
        }
        dirs::home_dir().map(|home| home.join(".chronicle").join("charmap"))
    }

    /// Map a single character
    #[must_use]
    pub fn map_char(&self, c: char) -> char {
        if c.is_ascii_uppercase() {
            self.map
                .get(&c.to_ascii_lowercase())
                .map_or(c, char::to_ascii_uppercase)
        } else {
            self.map.get(&c).copied().unwrap_or(c)
        }
    }

    /// Map every character of a string
    #[must_use]
    pub fn apply(&self, text: &str) -> String {
        text.chars().map(|c| self.map_char(c)).collect()
    }

    /// Rewrite author and committer identities of a commit
    pub fn anonymize_commit(&self, commit: &mut CommitRecord) {
        commit.author_name = self.apply(&commit.author_name);
        commit.author_email = self.apply(&commit.author_email);
        commit.committer_name = self.apply(&commit.committer_name);
        commit.committer_email = self.apply(&commit.committer_email);
    }
}

fn single_char(s: &str) -> Option<char> {
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}

fn is_mappable(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit()
}

fn charmap_error(path: &Path, reason: String) -> LogError {
    LogError::CharMap {
        path: path.display().to_string(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use similar_asserts::assert_eq;

    fn rotate_map() -> CharMap {
        let mut text = String::new();
        for (from, to) in LETTERS.chars().zip(LETTERS.chars().cycle().skip(1)) {
            text.push_str(&format!("{from} {to}\n"));
        }
        text.push_str("1 2\n2 1\n");
        CharMap::parse(&text).expect("valid map")
    }

    #[test]
    fn test_generate_is_bijection_over_both_alphabets() {
        let map = CharMap::generate();
        let mut letters: Vec<char> = LETTERS.chars().map(|c| map.map_char(c)).collect();
        letters.sort_unstable();
        assert_eq!(letters.into_iter().collect::<String>(), LETTERS);

        let mut digits: Vec<char> = DIGITS.chars().map(|c| map.map_char(c)).collect();
        digits.sort_unstable();
        assert_eq!(digits.into_iter().collect::<String>(), DIGITS);
    }

    #[test]
    fn test_apply_preserves_case_and_punctuation() {
        let map = rotate_map();
        assert_eq!(map.apply("Ann.Z1@x-3"), "Boo.A2@y-3");
    }

    #[test]
    fn test_text_roundtrip() {
        let map = CharMap::generate();
        let parsed = CharMap::parse(&map.to_text()).expect("parse");
        assert_eq!(parsed, map);
    }

    #[test]
    fn test_parse_rejects_non_bijection() {
        assert!(CharMap::parse("a b\nc b\n").is_err());
    }

    #[test]
    fn test_parse_rejects_malformed_lines() {
        assert!(CharMap::parse("a\n").is_err());
        assert!(CharMap::parse("ab c\n").is_err());
        assert!(CharMap::parse("a 1\n").is_err());
    }

    #[test]
    fn test_load_or_create_persists_once() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("charmap");

        let first = CharMap::load_or_create(&path).expect("create");
        assert!(path.exists());
        let second = CharMap::load_or_create(&path).expect("load");
        assert_eq!(first, second);
    }

    #[test]
    fn test_load_invalid_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("charmap");
        fs::write(&path, "not a map at all\n").expect("write");

        match CharMap::load(&path) {
            Err(LogError::CharMap { path: p, .. }) => assert!(p.ends_with("charmap")),
            other => panic!("Expected CharMap error, got {other:?}"),
        }
    }

    #[test]
    fn test_anonymize_commit_touches_identities_only() {
        let map = rotate_map();
        let mut commit = CommitRecord {
            id: "abc".to_string(),
            parent_ids: Vec::new(),
            author_name: "ann".to_string(),
            author_email: "ann@x".to_string(),
            author_date: "Thu Jan 1 00:00:00 2026 +0000".to_string(),
            committer_name: "bob".to_string(),
            committer_email: "bob@x".to_string(),
            committer_date: "Thu Jan 1 00:00:00 2026 +0000".to_string(),
            message: "keep me".to_string(),
            changes: Vec::new(),
        };

        map.anonymize_commit(&mut commit);

        assert_eq!(commit.author_name, "boo");
        assert_eq!(commit.author_email, "boo@y");
        assert_eq!(commit.committer_name, "cpc");
        assert_eq!(commit.message, "keep me");
        assert_eq!(commit.id, "abc");
    }
}
