//! Library module for dbrecode.
//!
//! Exposes the command-line surface and command implementations so they can
//! be exercised without a process boundary. The binary lives in `main.rs`.

pub mod cli;
pub mod commands;
pub mod output;

pub use cli::{Cli, Command, GlobalArgs};
