// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! git2-backed page source
//!
//! Renders commits of a local repository in the raw block format the diff
//! parser reads, one block per parent with a non-empty diff.

use std::fmt::Write as _;
use std::io::Cursor;
use std::path::Path;

use chrono::{DateTime, FixedOffset};
use chronicle_log::MergeParentResolver;
use chronicle_log::codec::COMMIT_PREFIX;
use chronicle_log::diff::MESSAGE_END;
use git2::{
    Commit, Diff, DiffFindOptions, DiffFormat, DiffOptions, ErrorCode, Oid, Repository, Signature,
    Sort, Time,
};
use tracing::{debug, warn};

use crate::error::StreamError;
use crate::pager::PageSource;

/// Upstream date format, e.g. `Thu Jan 1 10:00:00 2026 +0000`
pub const DATE_FORMAT: &str = "%a %b %-d %H:%M:%S %Y %z";

/// Minimum similarity (percent) for a delete/add pair to count as a rename
pub const RENAME_THRESHOLD: u16 = 60;

const NO_NEWLINE: &str = "\\ No newline at end of file\n";

/// Page source over a local git repository
///
/// The history reachable from the chosen revision is walked once at
/// construction, parents before children.
pub struct GitRepoSource {
    repo: Repository,
    oids: Vec<Oid>,
}

impl std::fmt::Debug for GitRepoSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitRepoSource")
            .field("path", &self.repo.path())
            .field("commits", &self.oids.len())
            .finish()
    }
}

impl GitRepoSource {
    /// Open the repository at `path` and walk history from HEAD
    ///
    /// # Errors
    ///
    /// Returns `StreamError::RepositoryNotFound` if the path is not a git
    /// repository, or a git error if the history cannot be walked.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StreamError> {
        let path = path.as_ref();
        let repo = Repository::open(path).map_err(|_| StreamError::RepositoryNotFound {
            path: path.display().to_string(),
        })?;
        Self::new(repo, None)
    }

    /// Discover the repository containing `path` and walk history from HEAD
    ///
    /// # Errors
    ///
    /// Returns `StreamError::RepositoryNotFound` if no repository is found.
    pub fn discover(path: impl AsRef<Path>) -> Result<Self, StreamError> {
        Self::discover_at(path, None)
    }

    /// Discover the repository containing `path` and walk from `revision`
    ///
    /// # Errors
    ///
    /// Returns `StreamError::RepositoryNotFound` if no repository is found,
    /// or a git error if the revision cannot be resolved.
    pub fn discover_at(path: impl AsRef<Path>, revision: Option<&str>) -> Result<Self, StreamError> {
        let path = path.as_ref();
        let repo = Repository::discover(path).map_err(|_| StreamError::RepositoryNotFound {
            path: path.display().to_string(),
        })?;
        Self::new(repo, revision)
    }

    /// Walk history reachable from `revision` (HEAD when `None`)
    ///
    /// An unborn HEAD yields an empty history.
    ///
    /// # Errors
    ///
    /// Returns a git error if the revision cannot be resolved or walked.
    pub fn new(repo: Repository, revision: Option<&str>) -> Result<Self, StreamError> {
        let mut revwalk = repo.revwalk()?;
        revwalk.set_sorting(Sort::TOPOLOGICAL | Sort::REVERSE)?;

        match revision {
            Some(revision) => {
                let oid = repo.revparse_single(revision)?.peel_to_commit()?.id();
                revwalk.push(oid)?;
            }
            None => match revwalk.push_head() {
                Ok(()) => {}
                Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => {
                    debug!(path = %repo.path().display(), "HEAD is unborn, history is empty");
                    drop(revwalk);
                    return Ok(Self {
                        repo,
                        oids: Vec::new(),
                    });
                }
                Err(e) => return Err(e.into()),
            },
        }

        let oids = revwalk.collect::<Result<Vec<_>, _>>()?;
        debug!(path = %repo.path().display(), commits = oids.len(), "Walked repository history");
        Ok(Self { repo, oids })
    }

    /// Commit ids, oldest first
    #[must_use]
    pub fn commit_ids(&self) -> &[Oid] {
        &self.oids
    }

    /// Render every block of one commit
    ///
    /// # Errors
    ///
    /// Returns a git error if the commit or a tree cannot be read.
    pub fn render_commit(&self, oid: Oid) -> Result<String, StreamError> {
        let commit = self.repo.find_commit(oid)?;
        let header = render_header(&commit);
        let mut out = String::new();

        if commit.parent_count() == 0 {
            out.push_str(&header);
            render_patch(&self.diff_against(&commit, None)?, &mut out)?;
            return Ok(out);
        }

        let diffs = self.parent_diffs(&commit)?;
        let non_empty = diffs.iter().filter(|(_, diff)| diff.deltas().len() > 0).count();
        for (n, (_, diff)) in diffs.iter().enumerate() {
            // A commit always keeps at least its first-parent block.
            let keep = diff.deltas().len() > 0 || (non_empty == 0 && n == 0);
            if keep {
                out.push_str(&header);
                render_patch(diff, &mut out)?;
            }
        }
        Ok(out)
    }

    fn parent_diffs<'a>(&'a self, commit: &Commit<'a>) -> Result<Vec<(Oid, Diff<'a>)>, StreamError> {
        commit
            .parents()
            .map(|parent| -> Result<_, StreamError> {
                Ok((parent.id(), self.diff_against(commit, Some(&parent))?))
            })
            .collect()
    }

    fn diff_against(&self, commit: &Commit<'_>, parent: Option<&Commit<'_>>) -> Result<Diff<'_>, StreamError> {
        let tree = commit.tree()?;
        let parent_tree = parent.map(Commit::tree).transpose()?;

        let mut options = DiffOptions::new();
        options.context_lines(1);
        let mut diff = self
            .repo
            .diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), Some(&mut options))?;

        let mut find = DiffFindOptions::new();
        find.renames(true).rename_threshold(RENAME_THRESHOLD);
        diff.find_similar(Some(&mut find))?;
        Ok(diff)
    }

    fn resolve_parents(&self, commit_id: &str) -> Result<Vec<String>, StreamError> {
        let commit = self.repo.find_commit(Oid::from_str(commit_id)?)?;
        let diffs = self.parent_diffs(&commit)?;
        let with_diff: Vec<String> = diffs
            .iter()
            .filter(|(_, diff)| diff.deltas().len() > 0)
            .map(|(oid, _)| oid.to_string())
            .collect();
        if with_diff.is_empty() {
            Ok(diffs.first().map(|(oid, _)| oid.to_string()).into_iter().collect())
        } else {
            Ok(with_diff)
        }
    }
}

impl PageSource for GitRepoSource {
    type Page = Cursor<Vec<u8>>;

    fn commit_count(&self) -> Result<usize, StreamError> {
        Ok(self.oids.len())
    }

    fn fetch_page(&self, count: usize, skip: usize) -> Result<Self::Page, StreamError> {
        let range = self
            .oids
            .len()
            .checked_sub(skip)
            .and_then(|end| end.checked_sub(count).map(|start| start..end))
            .ok_or_else(|| StreamError::InvalidPage {
                reason: format!(
                    "{count} commits after skipping {skip} of {}",
                    self.oids.len()
                ),
            })?;

        let mut page = String::new();
        for &oid in &self.oids[range] {
            page.push_str(&self.render_commit(oid)?);
        }
        Ok(Cursor::new(page.into_bytes()))
    }
}

impl MergeParentResolver for GitRepoSource {
    fn parents_with_diff(&self, commit_id: &str, parent_ids: &[String]) -> Vec<String> {
        match self.resolve_parents(commit_id) {
            Ok(parents) => parents,
            Err(e) => {
                warn!(commit = commit_id, error = %e, "Could not resolve merge parents");
                parent_ids.to_vec()
            }
        }
    }
}

fn render_header(commit: &Commit<'_>) -> String {
    let parents: Vec<String> = commit.parent_ids().map(|oid| oid.to_string()).collect();
    let author = commit.author();
    let committer = commit.committer();
    let message = String::from_utf8_lossy(commit.message_bytes());

    let mut out = String::new();
    let _ = writeln!(out, "{COMMIT_PREFIX}{}", commit.id());
    let _ = writeln!(out, "{}", parents.join(" "));
    push_signature(&mut out, &author);
    push_signature(&mut out, &committer);
    let _ = writeln!(out, "{}", message.trim_end());
    let _ = writeln!(out, "{MESSAGE_END}");
    out
}

fn push_signature(out: &mut String, signature: &Signature<'_>) {
    let _ = writeln!(out, "{}", String::from_utf8_lossy(signature.name_bytes()));
    let _ = writeln!(out, "{}", String::from_utf8_lossy(signature.email_bytes()));
    let _ = writeln!(out, "{}", format_time(signature.when()));
}

/// Format a git timestamp in its own offset
#[must_use]
pub fn format_time(time: Time) -> String {
    let Some(utc) = DateTime::from_timestamp(time.seconds(), 0) else {
        return String::new();
    };
    match FixedOffset::east_opt(time.offset_minutes() * 60) {
        Some(offset) => utc.with_timezone(&offset).format(DATE_FORMAT).to_string(),
        None => utc.format(DATE_FORMAT).to_string(),
    }
}

fn render_patch(diff: &Diff<'_>, out: &mut String) -> Result<(), StreamError> {
    diff.print(DiffFormat::Patch, |_delta, _hunk, line| {
        let content = String::from_utf8_lossy(line.content());
        match line.origin() {
            origin @ ('+' | '-' | ' ') => {
                out.push(origin);
                out.push_str(&content);
            }
            '=' | '>' | '<' => {
                if !out.ends_with('\n') {
                    out.push('\n');
                }
                out.push_str(NO_NEWLINE);
            }
            _ => {
                if !out.is_empty() && !out.ends_with('\n') {
                    out.push('\n');
                }
                out.push_str(&content);
            }
        }
        true
    })?;
    if !out.ends_with('\n') {
        out.push('\n');
    }
    Ok(())
}
