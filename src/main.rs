//! probe-report
//!
//! Renders media probe snapshots as structured reports.
//!
//! # Usage
//!
//! ```bash
//! probe-report render --input snapshot.json --show-format --show-streams --of json
//! probe-report render --input snapshot.json --show-entries stream=codec_name --of csv=p=0
//! probe-report sections
//! ```

use anyhow::Result;
use clap::Parser;
use tracing::info;

use probe_report::cli::{commands, Cli, Commands};
use probe_report::section::validate_schema;
use probe_report::utils::logging::{init_logging, LogBuffer};

/// Main entry point for the probe-report CLI
fn main() -> Result<()> {
    let cli = Cli::parse();

    // Frame logs are captured only while rendering
    let logs = LogBuffer::new();
    let capture = matches!(cli.command, Commands::Render(_)).then(|| logs.clone());
    init_logging(&cli.log_level, cli.log_format, capture);

    validate_schema();
    info!("Starting probe-report");

    match cli.command {
        Commands::Render(args) => commands::render(args, &logs)?,
        Commands::Sections => commands::sections()?,
        Commands::Formats => commands::formats()?,
    }

    info!("probe-report completed successfully");
    Ok(())
}
