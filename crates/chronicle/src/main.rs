// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! chronicle: replay git history with line provenance
//!
//! This binary extracts a repository's history into a compact log, rebuilds
//! the commit graph from such a log, and answers blame queries against it.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use chronicle::anonymize::anonymize;
use chronicle::config::{Command, Config};
use chronicle::extract::{ExtractOptions, extract_repository};
use chronicle::replay::{ReplayOptions, ReplayReport, blame, replay};
use chronicle::{ChronicleError, EXIT_FAILURE};
use chronicle_graph::BuildOptions;
use chronicle_log::CharMap;
use chronicle_stream::StreamOptions;
use clap::{CommandFactory, Parser};
use tracing::{error, info};

fn main() -> ExitCode {
    let config = Config::parse();

    // Logs go to stderr; stdout may carry a compact log
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(config.log_level().into()),
        )
        .with_writer(io::stderr)
        .init();

    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            let code = err
                .downcast_ref::<ChronicleError>()
                .map_or(EXIT_FAILURE, ChronicleError::exit_code);
            ExitCode::from(code)
        }
    }
}

fn run(config: &Config) -> Result<()> {
    config.validate()?;

    let Some(command) = &config.command else {
        Config::command().print_help()?;
        return Ok(());
    };

    match command {
        Command::Extract {
            repo,
            rev,
            output,
            full_content,
            incognito,
            page_size,
            buffer_capacity,
            buffer_dir,
            fail_fast,
        } => {
            let mut stream = StreamOptions::default()
                .with_page_size(*page_size)
                .with_buffer_capacity(*buffer_capacity);
            if let Some(dir) = buffer_dir {
                stream = stream.with_buffer_dir(dir);
            }
            let mut options = ExtractOptions::default().with_stream(stream);
            if *full_content {
                options = options.full_content();
            }
            if *incognito {
                options = options.with_incognito(load_charmap(config)?);
            }
            if *fail_fast {
                options = options.fail_fast();
            }

            let out = open_output(output.as_deref())?;
            let stats = extract_repository(repo, rev.as_deref(), out, &options)?;
            info!(
                commits = stats.commits_written,
                skipped = stats.commits_skipped,
                "Done"
            );
        }

        Command::Replay {
            log,
            json,
            no_provenance,
            fail_fast,
        } => {
            let options = ReplayOptions {
                decode: config.decode_options(),
                build: BuildOptions::default().with_provenance(!no_provenance),
                fail_fast: *fail_fast,
            };
            let replayed = replay(open_input(log)?, &options)?;
            let report = replayed.report();

            let mut stdout = io::stdout().lock();
            if *json {
                serde_json::to_writer_pretty(&mut stdout, &report)?;
                writeln!(stdout)?;
            } else {
                print_report(&mut stdout, &report)?;
            }
        }

        Command::Blame {
            log,
            path,
            commit,
            json,
        } => {
            let options = ReplayOptions {
                decode: config.decode_options(),
                ..ReplayOptions::default()
            };
            let replayed = replay(open_input(log)?, &options)?;
            let lines = blame(&replayed.graph, path, commit.as_deref())?;

            let mut stdout = io::stdout().lock();
            if *json {
                serde_json::to_writer_pretty(&mut stdout, &lines)?;
                writeln!(stdout)?;
            } else {
                for line in &lines {
                    let short = line.commit.get(..8).unwrap_or(&line.commit);
                    writeln!(
                        stdout,
                        "{short} ({} {}) {:>5}  {}",
                        line.author, line.date, line.line, line.subject
                    )?;
                }
            }
        }

        Command::Anonymize {
            log,
            output,
            fail_fast,
        } => {
            let map = load_charmap(config)?;
            let out = open_output(output.as_deref())?;
            anonymize(open_input(log)?, out, &map, config.decode_options(), *fail_fast)?;
        }
    }
    Ok(())
}

fn print_report(out: &mut impl Write, report: &ReplayReport) -> io::Result<()> {
    let summary = &report.summary;
    writeln!(out, "log version:  {}", report.version)?;
    writeln!(
        out,
        "commits:      {} ({} merges, {} roots)",
        summary.commits, summary.merges, summary.roots
    )?;
    writeln!(out, "branches:     {}", summary.branches)?;
    writeln!(out, "changes:      {}", summary.changes)?;
    writeln!(
        out,
        "files:        {} ({} untracked)",
        summary.files, summary.binary_files
    )?;
    writeln!(out, "accounts:     {}", summary.accounts)?;
    writeln!(out, "head:         {}", summary.head.as_deref().unwrap_or("-"))?;
    writeln!(out, "repo size:    {} lines", summary.repo_size)?;
    writeln!(
        out,
        "skipped:      {} commits, {} changes",
        report.commits_skipped, summary.build.dropped_changes
    )?;
    for author in &summary.top_authors {
        writeln!(out, "  {:>6}  {} <{}>", author.commits, author.name, author.email)?;
    }
    Ok(())
}

fn load_charmap(config: &Config) -> Result<CharMap> {
    let path = config
        .charmap_path()
        .context("No location for the character map")?;
    CharMap::load_or_create(&path)
        .with_context(|| format!("Failed to load character map {}", path.display()))
}

fn open_input(path: &Path) -> Result<BufReader<File>> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    Ok(BufReader::new(file))
}

fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    Ok(match path {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            Box::new(BufWriter::new(file))
        }
        None => Box::new(BufWriter::new(io::stdout().lock())),
    })
}
