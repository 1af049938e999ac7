// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Command-line configuration for the chronicle binary
//!
//! Global flags control logging, the character map used for anonymized
//! output and how strictly compact logs are decoded. Each subcommand carries
//! its own inputs.

use std::path::{Path, PathBuf};

use chronicle_log::incognito::CHARMAP_ENV;
use chronicle_log::{CharMap, DecodeOptions};
use chronicle_stream::streamer::{DEFAULT_BUFFER_CAPACITY, DEFAULT_PAGE_SIZE};
use clap::{Parser, Subcommand};

/// Chronicle - replay git history with line provenance
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "chronicle")]
#[command(version, about, long_about = None)]
pub struct Config {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Enable verbose logging (debug level)
    ///
    /// Logs are written to stderr so that logs written to stdout stay clean.
    #[arg(short, long, global = true, default_value = "false")]
    pub verbose: bool,

    /// Quiet mode - suppress info-level logs
    #[arg(short, long, global = true, default_value = "false")]
    pub quiet: bool,

    /// Character map used for anonymized output
    ///
    /// Created on first use. Defaults to ~/.chronicle/charmap.
    #[arg(long, global = true, env = CHARMAP_ENV)]
    pub charmap: Option<PathBuf>,

    /// Reject unknown change types when reading a compact log
    ///
    /// By default they are read as modifications with a warning.
    #[arg(long, global = true, default_value = "false")]
    pub strict_change_kinds: bool,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Write the history of a git repository as a compact log
    ///
    /// Example:
    ///   chronicle extract ~/src/project -o project.log
    Extract {
        /// Repository to read (any path inside it)
        #[arg(default_value = ".")]
        repo: PathBuf,

        /// Revision whose history is extracted (defaults to HEAD)
        #[arg(long)]
        rev: Option<String>,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Keep literal line content instead of character metadata
        #[arg(long, default_value = "false")]
        full_content: bool,

        /// Anonymize author and committer identities
        #[arg(long, default_value = "false")]
        incognito: bool,

        /// Commits fetched from the repository per page
        #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
        page_size: usize,

        /// Commits buffered on disk ahead of the parser
        #[arg(long, default_value_t = DEFAULT_BUFFER_CAPACITY)]
        buffer_capacity: usize,

        /// Directory for buffered commits (a temporary directory by default)
        ///
        /// Emptied before use and removed afterwards.
        #[arg(long)]
        buffer_dir: Option<PathBuf>,

        /// Abort on the first malformed commit instead of skipping it
        #[arg(long, default_value = "false")]
        fail_fast: bool,
    },

    /// Rebuild the commit graph from a compact log and summarize it
    Replay {
        /// Compact log to read
        log: PathBuf,

        /// Print the summary as JSON
        #[arg(long, default_value = "false")]
        json: bool,

        /// Skip line provenance
        #[arg(long, default_value = "false")]
        no_provenance: bool,

        /// Abort on the first malformed commit instead of skipping it
        #[arg(long, default_value = "false")]
        fail_fast: bool,
    },

    /// Show which commit last wrote each line of a file
    Blame {
        /// Compact log to read
        log: PathBuf,

        /// Path of the file
        path: String,

        /// Commit id, or ^prefix (defaults to the last commit)
        #[arg(long)]
        commit: Option<String>,

        /// Print the result as JSON
        #[arg(long, default_value = "false")]
        json: bool,
    },

    /// Rewrite a compact log with anonymized identities and no content
    Anonymize {
        /// Compact log to read
        log: PathBuf,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Abort on the first malformed commit instead of skipping it
        #[arg(long, default_value = "false")]
        fail_fast: bool,
    },
}

impl Config {
    /// Get the log level based on verbose/quiet flags
    #[must_use]
    pub fn log_level(&self) -> tracing::Level {
        if self.verbose {
            tracing::Level::DEBUG
        } else if self.quiet {
            tracing::Level::WARN
        } else {
            tracing::Level::INFO
        }
    }

    /// Decode options implied by the global flags
    #[must_use]
    pub fn decode_options(&self) -> DecodeOptions {
        if self.strict_change_kinds {
            DecodeOptions::default().strict()
        } else {
            DecodeOptions::default()
        }
    }

    /// Location of the character map
    #[must_use]
    pub fn charmap_path(&self) -> Option<PathBuf> {
        self.charmap.clone().or_else(CharMap::default_path)
    }

    /// Whether the selected command needs the character map
    #[must_use]
    pub fn needs_charmap(&self) -> bool {
        matches!(
            self.command,
            Some(Command::Extract {
                incognito: true,
                ..
            }) | Some(Command::Anonymize { .. })
        )
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - An input path does not exist
    /// - A page size or buffer capacity is zero
    /// - An output file would overwrite the input log
    /// - A character map is needed but has no location
    pub fn validate(&self) -> Result<(), ConfigError> {
        match &self.command {
            Some(Command::Extract {
                repo,
                page_size,
                buffer_capacity,
                buffer_dir,
                ..
            }) => {
                if !repo.exists() {
                    return Err(ConfigError::RepositoryNotFound(repo.clone()));
                }
                if *page_size == 0 {
                    return Err(ConfigError::ZeroPageSize);
                }
                if *buffer_capacity == 0 {
                    return Err(ConfigError::ZeroBufferCapacity);
                }
                if let Some(dir) = buffer_dir
                    && dir.exists()
                    && !dir.is_dir()
                {
                    return Err(ConfigError::BufferDirNotDirectory(dir.clone()));
                }
            }
            Some(Command::Replay { log, .. } | Command::Blame { log, .. }) => {
                check_log(log)?;
            }
            Some(Command::Anonymize { log, output, .. }) => {
                check_log(log)?;
                if output.as_deref().is_some_and(|out| same_file(out, log)) {
                    return Err(ConfigError::OutputOverwritesInput(log.clone()));
                }
            }
            None => {}
        }

        if self.needs_charmap() && self.charmap_path().is_none() {
            return Err(ConfigError::CharmapLocationUnknown);
        }
        Ok(())
    }
}

fn check_log(log: &Path) -> Result<(), ConfigError> {
    if !log.exists() {
        return Err(ConfigError::LogNotFound(log.to_path_buf()));
    }
    if log.is_dir() {
        return Err(ConfigError::LogIsDirectory(log.to_path_buf()));
    }
    Ok(())
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Repository path not found
    #[error("Repository path not found: {0}")]
    RepositoryNotFound(PathBuf),

    /// Compact log not found
    #[error("Log file not found: {0}")]
    LogNotFound(PathBuf),

    /// Compact log path is a directory
    #[error("Log path is a directory: {0}")]
    LogIsDirectory(PathBuf),

    /// Page size of zero
    #[error("Page size must be at least 1")]
    ZeroPageSize,

    /// Buffer capacity of zero
    #[error("Buffer capacity must be at least 1")]
    ZeroBufferCapacity,

    /// Buffer directory path names a file
    #[error("Buffer path is not a directory: {0}")]
    BufferDirNotDirectory(PathBuf),

    /// Output file is the input log
    #[error("Output would overwrite the input log: {0}")]
    OutputOverwritesInput(PathBuf),

    /// No home directory and no explicit character map
    #[error("Cannot locate the character map; pass --charmap or set {CHARMAP_ENV}")]
    CharmapLocationUnknown,
}

#[cfg(test)]
mod tests {
    use super::*;
    use similar_asserts::assert_eq;

    fn replay(log: &str) -> Config {
        Config {
            command: Some(Command::Replay {
                log: PathBuf::from(log),
                json: false,
                no_provenance: false,
                fail_fast: false,
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.command.is_none());
        assert!(config.charmap.is_none());
        assert!(!config.verbose);
        assert!(!config.quiet);
        assert!(!config.strict_change_kinds);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_log_level() {
        let mut config = Config::default();
        assert_eq!(config.log_level(), tracing::Level::INFO);
        config.quiet = true;
        assert_eq!(config.log_level(), tracing::Level::WARN);
        config.verbose = true;
        assert_eq!(config.log_level(), tracing::Level::DEBUG);
    }

    #[test]
    fn test_decode_options() {
        let mut config = Config::default();
        assert_eq!(
            config.decode_options().change_kind_policy,
            chronicle_log::ChangeKindPolicy::Lenient
        );
        config.strict_change_kinds = true;
        assert_eq!(
            config.decode_options().change_kind_policy,
            chronicle_log::ChangeKindPolicy::Strict
        );
    }

    #[test]
    fn test_charmap_path_custom() {
        let config = Config {
            charmap: Some(PathBuf::from("/custom/charmap")),
            ..Default::default()
        };
        assert_eq!(config.charmap_path(), Some(PathBuf::from("/custom/charmap")));
    }

    #[test]
    fn test_validate_missing_log() {
        let result = replay("/nonexistent/path/12345.log").validate();
        assert!(matches!(result, Err(ConfigError::LogNotFound(_))));
    }

    #[test]
    fn test_validate_log_directory() {
        let dir = tempfile::tempdir().unwrap();
        let result = replay(dir.path().to_str().unwrap()).validate();
        assert!(matches!(result, Err(ConfigError::LogIsDirectory(_))));
    }

    #[test]
    fn test_validate_extract_limits() {
        let dir = tempfile::tempdir().unwrap();
        let extract = |page_size, buffer_capacity| Config {
            command: Some(Command::Extract {
                repo: dir.path().to_path_buf(),
                rev: None,
                output: None,
                full_content: false,
                incognito: false,
                page_size,
                buffer_capacity,
                buffer_dir: None,
                fail_fast: false,
            }),
            ..Default::default()
        };
        assert!(extract(10, 10).validate().is_ok());
        assert!(matches!(extract(0, 10).validate(), Err(ConfigError::ZeroPageSize)));
        assert!(matches!(
            extract(10, 0).validate(),
            Err(ConfigError::ZeroBufferCapacity)
        ));
    }

    #[test]
    fn test_validate_anonymize_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("history.log");
        std::fs::write(&log, "chronicle-log/1\n").unwrap();

        let config = Config {
            command: Some(Command::Anonymize {
                log: log.clone(),
                output: Some(log),
                fail_fast: false,
            }),
            charmap: Some(dir.path().join("charmap")),
            ..Default::default()
        };
        assert!(config.needs_charmap());
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutputOverwritesInput(_))
        ));
    }

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Config::command().debug_assert();
    }
}
