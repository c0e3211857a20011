//! Data types shared between the launcher, runner and analyzer

pub mod job;
pub mod trace;
