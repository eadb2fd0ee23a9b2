//! snap CLI library
//!
//! Exports the CLI components for the binary and for integration tests.

pub mod commands;
pub mod exit_code;
pub mod output;
