//! CLI tests for flag parsing and validation
//!
//! These tests verify how arguments map onto subcommands and how
//! `Config::validate` treats the parsed paths.

use std::path::PathBuf;

use chronicle::config::{Command, Config, ConfigError};
use chronicle_stream::streamer::{DEFAULT_BUFFER_CAPACITY, DEFAULT_PAGE_SIZE};
use clap::Parser;
use tracing::Level;

// ============================================================================
// Global flags
// ============================================================================

#[test]
fn test_no_subcommand() {
    let config = Config::try_parse_from(["chronicle"]).expect("parse should succeed");
    assert!(config.command.is_none());
    assert_eq!(config.log_level(), Level::INFO);
    assert!(config.validate().is_ok());
}

#[test]
fn test_global_flags_after_subcommand() {
    let config = Config::try_parse_from(["chronicle", "replay", "h.log", "-v", "--strict-change-kinds"])
        .expect("parse should succeed");
    assert!(config.verbose);
    assert!(config.strict_change_kinds);
    assert_eq!(config.log_level(), Level::DEBUG);
}

#[test]
fn test_quiet_sets_warn_log_level() {
    let config = Config::try_parse_from(["chronicle", "-q"]).expect("parse should succeed");
    assert_eq!(config.log_level(), Level::WARN);
}

#[test]
fn test_verbose_wins_over_quiet() {
    let config = Config::try_parse_from(["chronicle", "-v", "-q"]).expect("parse should succeed");
    assert_eq!(config.log_level(), Level::DEBUG);
}

#[test]
fn test_flag_value_syntax_not_supported() {
    let result = Config::try_parse_from(["chronicle", "--verbose=true"]);
    assert!(result.is_err(), "Boolean flags don't support =value syntax");
}

#[test]
fn test_explicit_charmap_path() {
    let config = Config::try_parse_from(["chronicle", "--charmap", "/tmp/map", "anonymize", "h.log"])
        .expect("parse should succeed");
    assert_eq!(config.charmap_path(), Some(PathBuf::from("/tmp/map")));
    assert!(config.needs_charmap());
}

// ============================================================================
// extract
// ============================================================================

#[test]
fn test_extract_defaults() {
    let config = Config::try_parse_from(["chronicle", "extract"]).expect("parse should succeed");
    let Some(Command::Extract {
        repo,
        rev,
        output,
        full_content,
        incognito,
        page_size,
        buffer_capacity,
        buffer_dir,
        fail_fast,
    }) = config.command
    else {
        panic!("expected extract");
    };
    assert_eq!(repo, PathBuf::from("."));
    assert!(rev.is_none());
    assert!(output.is_none());
    assert!(!full_content && !incognito && !fail_fast);
    assert_eq!(page_size, DEFAULT_PAGE_SIZE);
    assert_eq!(buffer_capacity, DEFAULT_BUFFER_CAPACITY);
    assert!(buffer_dir.is_none());
}

#[test]
fn test_extract_options() {
    let config = Config::try_parse_from([
        "chronicle",
        "extract",
        "/src/project",
        "--rev",
        "v1.0",
        "-o",
        "out.log",
        "--full-content",
        "--page-size",
        "50",
        "--buffer-capacity",
        "5",
    ])
    .expect("parse should succeed");
    let Some(Command::Extract {
        repo,
        rev,
        output,
        full_content,
        page_size,
        buffer_capacity,
        ..
    }) = config.command
    else {
        panic!("expected extract");
    };
    assert_eq!(repo, PathBuf::from("/src/project"));
    assert_eq!(rev.as_deref(), Some("v1.0"));
    assert_eq!(output, Some(PathBuf::from("out.log")));
    assert!(full_content);
    assert_eq!((page_size, buffer_capacity), (50, 5));
}

#[test]
fn test_extract_rejects_non_numeric_page_size() {
    let result = Config::try_parse_from(["chronicle", "extract", "--page-size", "many"]);
    assert!(result.is_err());
}

#[test]
fn test_extract_zero_page_size_fails_validation() {
    let dir = tempfile::tempdir().expect("tempdir");
    let repo = dir.path().to_str().expect("utf8 path");
    let config = Config::try_parse_from(["chronicle", "extract", repo, "--page-size", "0"])
        .expect("parse should succeed");
    assert!(matches!(config.validate(), Err(ConfigError::ZeroPageSize)));
}

#[test]
fn test_extract_incognito_needs_charmap() {
    let config = Config::try_parse_from(["chronicle", "extract", "--incognito"])
        .expect("parse should succeed");
    assert!(config.needs_charmap());

    let config = Config::try_parse_from(["chronicle", "extract"]).expect("parse should succeed");
    assert!(!config.needs_charmap());
}

// ============================================================================
// replay, blame and anonymize
// ============================================================================

#[test]
fn test_replay_requires_log() {
    assert!(Config::try_parse_from(["chronicle", "replay"]).is_err());
}

#[test]
fn test_replay_missing_log_fails_validation() {
    let config = Config::try_parse_from(["chronicle", "replay", "/nonexistent/h.log"])
        .expect("parse should succeed");
    assert!(matches!(config.validate(), Err(ConfigError::LogNotFound(_))));
}

#[test]
fn test_replay_log_is_directory() {
    let dir = tempfile::tempdir().expect("tempdir");
    let log = dir.path().to_str().expect("utf8 path");
    let config =
        Config::try_parse_from(["chronicle", "replay", log]).expect("parse should succeed");
    assert!(matches!(config.validate(), Err(ConfigError::LogIsDirectory(_))));
}

#[test]
fn test_blame_arguments() {
    let config = Config::try_parse_from([
        "chronicle",
        "blame",
        "h.log",
        "src/main.rs",
        "--commit",
        "^abc",
        "--json",
    ])
    .expect("parse should succeed");
    let Some(Command::Blame {
        log,
        path,
        commit,
        json,
    }) = config.command
    else {
        panic!("expected blame");
    };
    assert_eq!(log, PathBuf::from("h.log"));
    assert_eq!(path, "src/main.rs");
    assert_eq!(commit.as_deref(), Some("^abc"));
    assert!(json);
}

#[test]
fn test_anonymize_onto_itself_fails_validation() {
    let dir = tempfile::tempdir().expect("tempdir");
    let log = dir.path().join("h.log");
    std::fs::write(&log, "chronicle-log/1\n").expect("write");
    let log = log.to_str().expect("utf8 path");

    let config = Config::try_parse_from(["chronicle", "--charmap", "map", "anonymize", log, "-o", log])
        .expect("parse should succeed");
    assert!(matches!(
        config.validate(),
        Err(ConfigError::OutputOverwritesInput(_))
    ));
}

#[test]
fn test_unknown_subcommand() {
    assert!(Config::try_parse_from(["chronicle", "serve"]).is_err());
}
