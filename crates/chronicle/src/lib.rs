// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! chronicle library
//!
//! This module exports the commands behind the chronicle binary for use in
//! integration tests and as a library.

pub mod anonymize;
pub mod config;
pub mod error;
pub mod extract;
pub mod replay;

pub use error::{ChronicleError, EXIT_FAILURE, EXIT_PIPELINE_FATAL};
