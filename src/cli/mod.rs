//! CLI module for probe-report
//!
//! This module handles command-line argument parsing and command execution.

use clap::{Parser, Subcommand};

use crate::utils::logging::LogFormat;

pub mod args;
pub mod commands;

pub use args::RenderArgs;

/// probe-report
///
/// Renders media probe snapshots in the default, compact, csv, flat, ini,
/// json or xml report formats.
#[derive(Parser)]
#[command(name = "probe-report")]
#[command(about = "Render media probe snapshots as structured reports")]
#[command(version)]
#[command(long_about = None)]
pub struct Cli {
    /// Logging level
    #[arg(long, default_value = "info", global = true)]
    pub log_level: String,

    /// Format of diagnostic messages on stderr
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    pub log_format: LogFormat,

    /// The command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Render a media snapshot as a report
    Render(args::RenderArgs),
    /// List the section tree
    Sections,
    /// List the output formats
    Formats,
}
