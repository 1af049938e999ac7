// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Serializable overview of a built graph

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::builder::BuildStats;
use crate::model::CommitGraph;

/// Number of authors listed in [`GraphSummary::top_authors`]
pub const TOP_AUTHORS: usize = 10;

/// Commits authored by one account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorSummary {
    /// Author name
    pub name: String,
    /// Author email
    pub email: String,
    /// Commits authored
    pub commits: usize,
}

/// Counts describing a graph, as printed by `chronicle replay`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSummary {
    /// Commits in the graph
    pub commits: usize,
    /// Merge commits
    pub merges: usize,
    /// Commits without parents
    pub roots: usize,
    /// Distinct branch ids
    pub branches: usize,
    /// Stored changes
    pub changes: usize,
    /// File identities still in use
    pub files: usize,
    /// File identities folded into another by a merge
    pub retired_files: usize,
    /// Live files without line provenance
    pub binary_files: usize,
    /// Distinct (name, email) accounts
    pub accounts: usize,
    /// Id of the last commit added
    pub head: Option<String>,
    /// Line count at `head`
    pub repo_size: i64,
    /// Most prolific authors, most commits first
    pub top_authors: Vec<AuthorSummary>,
    /// Builder counters
    pub build: BuildStats,
}

impl GraphSummary {
    /// Summarize `graph`
    #[must_use]
    pub fn new(graph: &CommitGraph, stats: &BuildStats) -> Self {
        let mut authored: HashMap<_, usize> = HashMap::new();
        let mut branches = HashSet::new();
        for (_, commit) in graph.commits() {
            *authored.entry(commit.author).or_default() += 1;
            branches.insert(commit.branch_id);
        }

        let mut top_authors: Vec<AuthorSummary> = authored
            .into_iter()
            .map(|(idx, commits)| {
                let account = graph.account(idx);
                AuthorSummary {
                    name: account.name.clone(),
                    email: account.email.clone(),
                    commits,
                }
            })
            .collect();
        top_authors.sort_by(|a, b| {
            b.commits
                .cmp(&a.commits)
                .then_with(|| a.name.cmp(&b.name))
                .then_with(|| a.email.cmp(&b.email))
        });
        top_authors.truncate(TOP_AUTHORS);

        let head = graph.last_commit().map(|idx| graph.commit(idx));
        Self {
            commits: graph.commit_count(),
            merges: graph.commits().filter(|(_, c)| c.is_merge()).count(),
            roots: graph.commits().filter(|(_, c)| c.is_root()).count(),
            branches: branches.len(),
            changes: graph.change_count(),
            files: graph.live_files().count(),
            retired_files: graph.file_count() - graph.live_files().count(),
            binary_files: graph.live_files().filter(|(_, f)| f.binary).count(),
            accounts: graph.accounts().count(),
            head: head.map(|c| c.id.clone()),
            repo_size: head.map_or(0, |c| c.repo_size),
            top_authors,
            build: *stats,
        }
    }
}
