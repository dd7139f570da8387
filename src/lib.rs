//! probe-report library
//!
//! A streaming, hierarchical report writer for media probe results. A
//! caller walks a fixed tree of sections, opening and closing them and
//! printing key/value fields in between; the [`ReportWriter`] renders those
//! calls in one forward pass as `default`, `compact`, `csv`, `flat`, `ini`,
//! `json` or `xml` output.
//!
//! ```
//! use probe_report::format::PresentationOptions;
//! use probe_report::section::filter::FilterTable;
//! use probe_report::section::SectionId;
//! use probe_report::ReportWriter;
//!
//! let mut w = ReportWriter::new(
//!     Vec::new(),
//!     "flat",
//!     FilterTable::show_all(),
//!     PresentationOptions::default(),
//! )?;
//! w.enter_section(SectionId::Root)?;
//! w.enter_section(SectionId::Format)?;
//! w.print_string("format_name", "mov,mp4")?;
//! w.exit_section()?;
//! w.exit_section()?;
//! let out = String::from_utf8(w.finish()?).unwrap();
//! assert_eq!(out, "format.format_name=\"mov,mp4\"\n");
//! # Ok::<(), probe_report::ReportError>(())
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod escape;
pub mod format;
pub mod probe;
pub mod section;
pub mod utils;
pub mod writer;

// Re-export commonly used types
pub use config::ReportConfig;
pub use error::{ReportError, ReportResult};
pub use format::{OptionalFields, PresentationOptions, Rational, UnitValue};
pub use probe::{probe_report, MediaSnapshot, ShowOptions};
pub use section::filter::FilterTable;
pub use section::payload::SectionPayload;
pub use section::SectionId;
pub use writer::{OutputFormat, ReportWriter};
