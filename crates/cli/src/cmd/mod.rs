//! Subcommands of the `trontrust` binary.

pub mod chains;
pub mod serve;
