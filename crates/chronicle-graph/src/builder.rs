// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Single-pass commit graph construction
//!
//! Commits must arrive parents first. Each commit's changes are linked to
//! the previous version of their file, grouped into file identities and,
//! when enabled, annotated with line provenance. Merge commits reconcile
//! their per-parent changes into one change per file.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, FixedOffset};
use chronicle_log::{ChangeKind, ChangeRecord, CommitRecord, HunkRecord};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::branch::assign_branch_ids;
use crate::error::GraphError;
use crate::model::{Account, AccountIdx, Change, ChangeIdx, Commit, CommitGraph, CommitIdx, File, FileIdx};
use crate::provenance::annotate;

/// Date format of commit records, e.g. `Thu Jan 1 10:00:00 2026 +0000`
pub const DATE_FORMAT: &str = "%a %b %-d %H:%M:%S %Y %z";

/// Options for [`GraphBuilder`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildOptions {
    /// Compute per-line provenance for every text file
    pub track_provenance: bool,
    /// Drop unknown parent ids instead of failing
    pub allow_partial_history: bool,
    /// Keep line content in the stored hunks
    pub keep_content: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            track_provenance: true,
            allow_partial_history: false,
            keep_content: false,
        }
    }
}

impl BuildOptions {
    /// Enable or disable provenance tracking
    #[must_use]
    pub fn with_provenance(mut self, track: bool) -> Self {
        self.track_provenance = track;
        self
    }

    /// Accept commits whose parents are not in the graph
    #[must_use]
    pub fn allow_partial_history(mut self) -> Self {
        self.allow_partial_history = true;
        self
    }

    /// Keep line content in the stored hunks
    #[must_use]
    pub fn keep_content(mut self) -> Self {
        self.keep_content = true;
        self
    }
}

/// Counters reported after a build
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildStats {
    /// Commits added
    pub commits: usize,
    /// Merge commits among them
    pub merges: usize,
    /// Changes stored
    pub changes: usize,
    /// Changes dropped because no prior version of the file was found
    pub dropped_changes: usize,
    /// Unknown parent ids dropped under partial history
    pub dropped_parents: usize,
    /// Files whose provenance stopped being tracked after an overflow
    pub untracked_files: usize,
}

/// A change resolved against the graph but not yet stored
struct Candidate {
    record: ChangeRecord,
    hunks: Vec<HunkRecord>,
    parent_commit: Option<CommitIdx>,
    parent_change: Option<ChangeIdx>,
    file: FileIdx,
    annotated_lines: Vec<CommitIdx>,
}

/// Builds a [`CommitGraph`] from commit records in emission order
#[derive(Debug, Default)]
pub struct GraphBuilder {
    graph: CommitGraph,
    options: BuildOptions,
    stats: BuildStats,
}

impl GraphBuilder {
    /// Create an empty builder
    #[must_use]
    pub fn new(options: BuildOptions) -> Self {
        Self {
            graph: CommitGraph::default(),
            options,
            stats: BuildStats::default(),
        }
    }

    /// Graph built so far
    #[must_use]
    pub fn graph(&self) -> &CommitGraph {
        &self.graph
    }

    /// Counters so far
    #[must_use]
    pub fn stats(&self) -> &BuildStats {
        &self.stats
    }

    /// Add the next commit
    ///
    /// Changes without a resolvable prior version are logged and dropped;
    /// the rest of the commit is kept.
    ///
    /// # Errors
    ///
    /// Returns `GraphError::DuplicateCommit` for a repeated id,
    /// `GraphError::InvalidDate` for an unparseable date and
    /// `GraphError::MissingParent` for an unknown parent unless partial
    /// history is allowed. The graph is unchanged on error.
    pub fn add_commit(&mut self, record: CommitRecord) -> Result<CommitIdx, GraphError> {
        if self.graph.commit_index.contains_key(&record.id) {
            return Err(GraphError::DuplicateCommit { commit: record.id });
        }
        let author_date = parse_date(&record.id, &record.author_date)?;
        let committer_date = if record.committer_date.trim().is_empty() {
            author_date
        } else {
            parse_date(&record.id, &record.committer_date)?
        };
        let parents = self.resolve_parents(&record)?;

        let author = self.account(&record.author_name, &record.author_email);
        let committer = if record.committer_name.is_empty() {
            author
        } else {
            self.account(&record.committer_name, &record.committer_email)
        };

        let idx = CommitIdx::from_len(self.graph.commits.len());
        for parent in &parents {
            self.graph.commits[parent.index()].children.push(idx);
        }
        self.graph.accounts[author.index()].commits.push(idx);
        if committer != author {
            self.graph.accounts[committer.index()].commits.push(idx);
        }

        let is_merge = parents.len() > 1;
        let first_parent = parents.first().copied();
        let CommitRecord {
            id,
            message,
            changes,
            ..
        } = record;
        self.graph.commits.push(Commit {
            id: id.clone(),
            parents,
            children: Vec::new(),
            author,
            committer,
            author_date,
            committer_date,
            message,
            branch_id: 0,
            repo_size: 0,
            changes: Vec::new(),
        });
        self.graph.commit_index.insert(id, idx);
        self.stats.commits += 1;

        let growth = if is_merge {
            self.stats.merges += 1;
            self.add_merge_changes(idx, changes)
        } else {
            self.add_changes(idx, changes)
        };
        let base = first_parent.map_or(0, |p| self.graph.commit(p).repo_size);
        let commit = &mut self.graph.commits[idx.index()];
        commit.repo_size = base + growth;

        debug!(
            commit = %commit.short_id(),
            changes = commit.changes.len(),
            repo_size = commit.repo_size,
            "Added commit"
        );
        Ok(idx)
    }

    /// Assign branch ids and return the graph
    #[must_use]
    pub fn finish(mut self) -> (CommitGraph, BuildStats) {
        let branches = assign_branch_ids(&mut self.graph);
        info!(
            commits = self.stats.commits,
            changes = self.stats.changes,
            dropped_changes = self.stats.dropped_changes,
            untracked_files = self.stats.untracked_files,
            branches,
            "Built commit graph"
        );
        (self.graph, self.stats)
    }

    fn resolve_parents(&mut self, record: &CommitRecord) -> Result<Vec<CommitIdx>, GraphError> {
        let mut parents = Vec::with_capacity(record.parent_ids.len());
        let mut dropped = 0;
        for parent in &record.parent_ids {
            match self.graph.commit_index.get(parent) {
                Some(&idx) => parents.push(idx),
                None if self.options.allow_partial_history => {
                    warn!(commit = %record.id, parent = %parent, "Dropping unknown parent");
                    dropped += 1;
                }
                None => {
                    return Err(GraphError::MissingParent {
                        commit: record.id.clone(),
                        parent: parent.clone(),
                    });
                }
            }
        }
        self.stats.dropped_parents += dropped;
        Ok(parents)
    }

    fn account(&mut self, name: &str, email: &str) -> AccountIdx {
        let key = (name.to_string(), email.to_string());
        if let Some(&idx) = self.graph.account_index.get(&key) {
            return idx;
        }
        let idx = AccountIdx::from_len(self.graph.accounts.len());
        self.graph.accounts.push(Account {
            name: key.0.clone(),
            email: key.1.clone(),
            commits: Vec::new(),
        });
        self.graph.account_index.insert(key, idx);
        idx
    }

    fn new_file(&mut self, binary: bool) -> FileIdx {
        let idx = FileIdx::from_len(self.graph.files.len());
        self.graph.files.push(File {
            binary,
            ..File::default()
        });
        idx
    }

    fn add_changes(&mut self, commit: CommitIdx, records: Vec<ChangeRecord>) -> i64 {
        let mut growth = 0;
        for record in records {
            if let Some(candidate) = self.transform(commit, record) {
                growth += self.growth_of(commit, &candidate);
                self.register(commit, candidate, Vec::new());
            }
        }
        growth
    }

    fn add_merge_changes(&mut self, commit: CommitIdx, records: Vec<ChangeRecord>) -> i64 {
        let mut positions: HashMap<String, usize> = HashMap::new();
        let mut groups: Vec<Vec<ChangeRecord>> = Vec::new();
        for record in records {
            let position = *positions
                .entry(record.path().to_string())
                .or_insert_with(|| {
                    groups.push(Vec::new());
                    groups.len() - 1
                });
            groups[position].push(record);
        }

        let mut growth = 0;
        for group in groups {
            let candidates: Vec<Candidate> = group
                .into_iter()
                .filter_map(|record| self.transform(commit, record))
                .collect();
            growth += candidates
                .iter()
                .map(|c| self.growth_of(commit, c))
                .sum::<i64>();
            self.reconcile(commit, candidates);
        }
        growth
    }

    /// Resolve a change record against the graph
    fn transform(&mut self, commit: CommitIdx, mut record: ChangeRecord) -> Option<Candidate> {
        let parent_commit = if record.parent_commit_id.is_empty() {
            None
        } else {
            self.graph
                .commit(commit)
                .parents
                .iter()
                .copied()
                .find(|&p| self.graph.commit(p).id == record.parent_commit_id)
        };

        let parent_change = if record.kind == ChangeKind::Add {
            None
        } else {
            let found = parent_commit.and_then(|p| self.graph.find_last_change(p, &record.old_path));
            if found.is_none() {
                warn!(
                    commit = %self.graph.commit(commit).id,
                    path = %record.old_path,
                    kind = ?record.kind,
                    "No prior version of changed file, dropping change"
                );
                self.stats.dropped_changes += 1;
                return None;
            }
            found
        };

        let file = match parent_change {
            Some(prior) => self.graph.change(prior).file,
            None => self.new_file(record.binary),
        };
        if record.binary {
            self.graph.files[file.index()].binary = true;
        }

        let mut hunks = std::mem::take(&mut record.hunks);
        if self.graph.file(file).binary {
            hunks.clear();
        }
        if !self.options.keep_content {
            for line in hunks.iter_mut().flat_map(|h| h.line_changes.iter_mut()) {
                line.content = None;
            }
        }

        let annotated_lines = self.annotate_change(commit, file, parent_change, &hunks, &record);
        Some(Candidate {
            record,
            hunks,
            parent_commit,
            parent_change,
            file,
            annotated_lines,
        })
    }

    fn annotate_change(
        &mut self,
        commit: CommitIdx,
        file: FileIdx,
        parent_change: Option<ChangeIdx>,
        hunks: &[HunkRecord],
        record: &ChangeRecord,
    ) -> Vec<CommitIdx> {
        if !self.options.track_provenance || self.graph.file(file).binary {
            return Vec::new();
        }
        let parent_lines = parent_change.map_or(&[][..], |c| self.graph.change(c).annotated_lines.as_slice());
        match annotate(parent_lines, hunks, commit) {
            Ok(lines) => lines,
            Err(overflow) => {
                warn!(
                    commit = %self.graph.commit(commit).id,
                    path = %record.path(),
                    %overflow,
                    "Line provenance overflow, no longer tracking file"
                );
                self.graph.files[file.index()].binary = true;
                self.stats.untracked_files += 1;
                Vec::new()
            }
        }
    }

    /// Net line delta a change contributes to `repo_size`
    fn growth_of(&self, commit: CommitIdx, candidate: &Candidate) -> i64 {
        let first_parent = self.graph.commit(commit).first_parent();
        if first_parent.is_some() && candidate.parent_commit != first_parent {
            return 0;
        }
        let added: usize = candidate.hunks.iter().map(HunkRecord::added_count).sum();
        let deleted: usize = candidate.hunks.iter().map(HunkRecord::deleted_count).sum();
        i64::try_from(added).unwrap_or(i64::MAX) - i64::try_from(deleted).unwrap_or(i64::MAX)
    }

    /// Fold the per-parent changes of one file into a single change
    fn reconcile(&mut self, commit: CommitIdx, mut candidates: Vec<Candidate>) {
        if candidates.is_empty() {
            return;
        }
        let parents = self.graph.commit(commit).parents.clone();

        let all_deletes = candidates.iter().all(|c| c.record.kind == ChangeKind::Delete);
        let implicit = if candidates.len() < parents.len() && !all_deletes {
            self.clean_parent_change(&parents, &candidates)
        } else {
            None
        };

        if let Some(implicit) = implicit {
            candidates[0]
                .annotated_lines
                .clone_from(&self.graph.change(implicit).annotated_lines);
        }
        reconcile_annotations(&mut candidates, commit);

        let mut files: Vec<FileIdx> = Vec::new();
        let implicit_file = implicit.map(|c| self.graph.change(c).file);
        for file in candidates.iter().map(|c| c.file).chain(implicit_file) {
            if !files.contains(&file) {
                files.push(file);
            }
        }
        if files.len() > 1 {
            let survivor = self.splice_files(&files);
            for candidate in &mut candidates {
                candidate.file = survivor;
            }
        }

        let mut rest = candidates.into_iter();
        if let Some(survivor) = rest.next() {
            let merged = rest.filter_map(|c| c.parent_change).collect();
            self.register(commit, survivor, merged);
        }
    }

    /// Last change of the group's file on the parent that produced no diff
    fn clean_parent_change(&self, parents: &[CommitIdx], candidates: &[Candidate]) -> Option<ChangeIdx> {
        let clean = parents
            .iter()
            .copied()
            .find(|&p| candidates.iter().all(|c| c.parent_commit != Some(p)))?;
        let path = candidates
            .iter()
            .find(|c| c.record.kind != ChangeKind::Delete)
            .map(|c| c.record.new_path.as_str())?;

        let found = self.graph.find_last_change(clean, path);
        if found.is_none() {
            debug!(
                parent = %self.graph.commit(clean).id,
                path,
                "Clean parent has no version of merged file"
            );
        }
        found
    }

    /// Move the change histories of `files` onto the first one
    fn splice_files(&mut self, files: &[FileIdx]) -> FileIdx {
        let survivor = files[0];
        let mut seen = HashSet::new();
        let mut changes: Vec<ChangeIdx> = Vec::new();
        let mut binary = false;

        for &idx in files {
            let file = &mut self.graph.files[idx.index()];
            binary |= file.binary;
            changes.extend(file.changes.drain(..).filter(|c| seen.insert(*c)));
            if idx != survivor {
                file.retired = true;
            }
        }

        let graph = &self.graph;
        changes.sort_by_key(|&c| graph.commit(graph.change(c).commit).committer_date);
        for &c in &changes {
            self.graph.changes[c.index()].file = survivor;
        }

        let file = &mut self.graph.files[survivor.index()];
        file.changes = changes;
        file.binary = binary;
        debug!(file = %survivor, retired = files.len() - 1, "Spliced file histories");
        survivor
    }

    fn register(&mut self, commit: CommitIdx, candidate: Candidate, merged_parent_changes: Vec<ChangeIdx>) {
        let commit_id = self.graph.commit(commit).id.clone();
        let Candidate {
            record,
            hunks,
            parent_commit,
            parent_change,
            file,
            annotated_lines,
        } = candidate;

        let key = (commit_id, record.old_path.clone(), record.new_path.clone());
        if self.graph.change_index.contains_key(&key) {
            warn!(
                commit = %key.0,
                old_path = %key.1,
                new_path = %key.2,
                "Duplicate change in commit, dropping"
            );
            self.stats.dropped_changes += 1;
            return;
        }

        let idx = ChangeIdx::from_len(self.graph.changes.len());
        self.graph.changes.push(Change {
            commit,
            kind: record.kind,
            old_path: record.old_path,
            new_path: record.new_path,
            binary: record.binary,
            hunks,
            parent_commit,
            parent_change,
            merged_parent_changes,
            annotated_lines,
            file,
        });
        self.graph.change_index.insert(key, idx);
        self.graph.commits[commit.index()].changes.push(idx);
        self.graph.files[file.index()].changes.push(idx);
        self.stats.changes += 1;
    }
}

/// Resolve lines the first change attributes to the merge itself
///
/// Where the first change names `merge` for a line, the first other change
/// with a different commit for that line supplies it.
fn reconcile_annotations(candidates: &mut [Candidate], merge: CommitIdx) {
    let Some((first, rest)) = candidates.split_first_mut() else {
        return;
    };
    for (n, line) in first.annotated_lines.iter_mut().enumerate() {
        if *line != merge {
            continue;
        }
        if let Some(&replacement) = rest
            .iter()
            .filter_map(|c| c.annotated_lines.get(n))
            .find(|&&c| c != merge)
        {
            *line = replacement;
        }
    }
}

fn parse_date(commit: &str, text: &str) -> Result<DateTime<FixedOffset>, GraphError> {
    DateTime::parse_from_str(text.trim(), DATE_FORMAT).map_err(|e| GraphError::InvalidDate {
        commit: commit.to_string(),
        date: text.to_string(),
        reason: e.to_string(),
    })
}

/// Build a graph from records in emission order
///
/// # Errors
///
/// Returns the first [`GraphError`] raised by [`GraphBuilder::add_commit`].
pub fn build_graph<I>(records: I, options: BuildOptions) -> Result<(CommitGraph, BuildStats), GraphError>
where
    I: IntoIterator<Item = CommitRecord>,
{
    let mut builder = GraphBuilder::new(options);
    for record in records {
        builder.add_commit(record)?;
    }
    Ok(builder.finish())
}
