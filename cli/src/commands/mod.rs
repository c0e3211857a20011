//! Subcommand implementations

pub mod analyze;
pub mod occupancy;
pub mod profile;
