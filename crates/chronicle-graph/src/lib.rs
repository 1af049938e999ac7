// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! chronicle-graph: commit graph reconstruction with line provenance
//!
//! [`GraphBuilder`] consumes [`chronicle_log::CommitRecord`]s parents first
//! and links every change to the previous version of its file. Files keep
//! their identity across renames, merges fold per-parent changes into one
//! change per file, and each change records which commit last wrote each
//! of its lines.
//!
//! # Example
//!
//! ```
//! use chronicle_graph::{BuildOptions, build_graph};
//! use chronicle_log::DiffParser;
//!
//! let raw = "ig#a1\n\nAnn\nann@example.com\nThu Jan 1 10:00:00 2026 +0000\n\
//!            Ann\nann@example.com\nThu Jan 1 10:00:00 2026 +0000\nadd f\n#{Glme}\n\
//!            diff --git a/f b/f\nnew file mode 100644\n--- /dev/null\n+++ b/f\n\
//!            @@ -0,0 +1,2 @@\n+x\n+y\n";
//! let record = DiffParser::new().parse_block(raw).expect("parse");
//!
//! let (graph, stats) = build_graph([record], BuildOptions::default()).expect("build");
//! let head = graph.last_commit().expect("head");
//! assert_eq!(graph.commit(head).repo_size, 2);
//! assert_eq!(graph.blame("f", head).expect("blame").len(), 2);
//! assert_eq!(stats.changes, 1);
//! ```

#![warn(missing_docs)]

pub mod branch;
pub mod builder;
pub mod error;
pub mod model;
pub mod provenance;
pub mod summary;

pub use branch::assign_branch_ids;
pub use builder::{BuildOptions, BuildStats, DATE_FORMAT, GraphBuilder, build_graph};
pub use error::GraphError;
pub use model::{
    Account, AccountIdx, Change, ChangeIdx, Commit, CommitGraph, CommitIdx, File, FileIdx,
};
pub use provenance::{ProvenanceOverflow, annotate};
pub use summary::{AuthorSummary, GraphSummary};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::builder::{BuildOptions, BuildStats, GraphBuilder, build_graph};
    pub use crate::error::GraphError;
    pub use crate::model::{CommitGraph, CommitIdx};
    pub use crate::summary::GraphSummary;
}
