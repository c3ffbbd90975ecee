//! CLI subcommands

pub mod merge;
pub mod report;
pub mod scan;
pub mod setup;
pub mod watch;
