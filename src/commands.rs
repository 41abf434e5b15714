//! Subcommands of the `jshake` binary that are not shaking itself.

pub mod generate;
