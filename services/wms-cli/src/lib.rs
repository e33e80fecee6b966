//! Command-line front end for the WMS client.

pub mod cli;
pub mod commands;
pub mod config;

pub use cli::{Cli, Command, MapArgs};
pub use commands::AppContext;
pub use config::CliConfig;
