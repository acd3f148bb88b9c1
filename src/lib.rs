#![warn(clippy::uninlined_format_args)]

pub mod adapters;
pub mod batch;
pub mod cli;
pub mod config;
pub mod core;
pub mod ledger;
pub mod paths;
pub mod retry;
pub mod status_export;

pub use cli::{Cli, Commands};
