//! CLI commands

pub mod compile;
pub mod list;
