//! # truss-cli
//!
//! The command-line front end: the `clap`-derived subcommand tree
//! ([`cli`]), project discovery and the reusable harness entry point
//! ([`harness`]), `truss init` scaffolding ([`init`]), and the CLI-level
//! error taxonomy ([`error`]). The `truss` binary (`src/main.rs`) is a
//! thin wrapper around this library so the dispatch logic itself stays
//! testable and reusable by an embedding project's own binary.

pub mod cli;
pub mod error;
pub mod harness;
pub mod init;
