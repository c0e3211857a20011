//! Shared types and utilities for deepprofile
//!
//! This crate contains the job descriptor exchanged between the launcher and
//! the runner process, the typed views recovered from trace exports, and
//! small helpers used by the command-line tools.

pub mod types;
pub mod utils;

// Re-export commonly used types
pub use types::{job::*, trace::*};
