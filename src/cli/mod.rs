//! Command-line interface
//!
//! Argument definitions live in [`args`]; each subcommand has a handler in
//! [`commands`].

pub mod args;
pub mod commands;
