//! Command implementations

use std::fs::File;
use std::io::{self, BufWriter, Write};

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use crate::cli::args::RenderArgs;
use crate::config::ReportConfig;
use crate::probe::{probe_report, MediaSnapshot};
use crate::section::filter::FilterTable;
use crate::section::format_sections;
use crate::utils::logging::LogBuffer;
use crate::writer::{OutputFormat, ReportWriter};

/// Execute the render command.
///
/// Configuration problems are reported before anything is written. A
/// failure while writing closes the open sections best-effort and is
/// returned.
pub fn render(args: RenderArgs, logs: &LogBuffer) -> Result<()> {
    let file_config = match &args.config {
        Some(path) => ReportConfig::load(path).context("Failed to load configuration")?,
        None => ReportConfig::default(),
    };
    let config = file_config.with_overrides(args.overrides());

    let mut filter = FilterTable::new();
    args.mark_sections(&mut filter);
    config
        .apply_show_entries(&mut filter)
        .context("Invalid show_entries")?;
    let opts = config.show_options(&filter)?;
    let digest = config.digest()?;

    let snapshot = MediaSnapshot::load(&args.input)
        .with_context(|| format!("Failed to load snapshot {}", args.input.display()))?;
    info!(
        "Snapshot: {} streams, {} packets, {} frames",
        snapshot.streams.len(),
        snapshot.packets.len(),
        snapshot.frames.len()
    );

    let sink: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(File::create(path).with_context(|| {
            format!("Failed to create output file {}", path.display())
        })?)),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    let mut writer = ReportWriter::new(sink, &config.output_format, filter, config.presentation())?;
    if let Some(digest) = digest {
        writer = writer.with_digest(Box::new(digest));
    }

    logs.clear();
    let capture = opts.log.map(|_| logs);
    if let Err(err) = probe_report(&mut writer, &snapshot, &opts, capture) {
        error!("Report aborted: {}", err);
        match writer.close_all() {
            Ok(()) => {
                if let Err(flush_err) = writer.finish() {
                    warn!("Failed to flush partial report: {}", flush_err);
                }
            }
            Err(close_err) => warn!("Failed to close open sections: {}", close_err),
        }
        return Err(err).context("Failed to write report");
    }

    writer.finish().context("Failed to flush report")?;
    if let Some(path) = &args.output {
        info!("Report written to {}", path.display());
    }
    Ok(())
}

/// Execute the sections command
pub fn sections() -> Result<()> {
    let mut stdout = io::stdout().lock();
    stdout.write_all(format_sections().as_bytes())?;
    stdout.flush()?;
    Ok(())
}

/// Execute the formats command
pub fn formats() -> Result<()> {
    let mut stdout = io::stdout().lock();
    for format in OutputFormat::ALL {
        writeln!(stdout, "{}", format.name())?;
    }
    stdout.flush()?;
    Ok(())
}
