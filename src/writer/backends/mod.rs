//! Output backends
//!
//! A backend turns section enter/exit events and key/value fields into one
//! concrete syntax. It reads and updates the shared [`TraversalContext`] but
//! never filters or validates; the writer does that before calling in.

use std::fmt;
use std::io::{self, Write};
use std::str::FromStr;

use crate::error::{ReportError, ReportResult};
use crate::format::PresentationOptions;
use crate::writer::context::TraversalContext;
use crate::writer::options::OptionSet;

pub mod compact;
pub mod default;
pub mod flat;
pub mod ini;
pub mod json;
pub mod xml;

pub use compact::CompactBackend;
pub use default::DefaultBackend;
pub use flat::FlatBackend;
pub use ini::IniBackend;
pub use json::JsonBackend;
pub use xml::XmlBackend;

/// Capabilities a backend advertises to the writer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackendFlags {
    /// Optional fields are printed under `show_optional_fields=auto`
    pub display_optional_fields: bool,
    /// Interleaved packets and frames can share one array
    pub packets_and_frames_in_same_chapter: bool,
}

/// Event sink for one output syntax
pub trait Backend {
    fn name(&self) -> &'static str;

    fn flags(&self) -> BackendFlags;

    /// Called after the context has pushed the new section.
    ///
    /// `section_type` is the resolved type name for sections flagged
    /// `HAS_TYPE`.
    fn print_section_header(
        &mut self,
        ctx: &mut TraversalContext,
        out: &mut dyn Write,
        section_type: Option<&str>,
    ) -> io::Result<()>;

    /// Called before the context pops the section
    fn print_section_footer(&mut self, _ctx: &TraversalContext, _out: &mut dyn Write) -> io::Result<()> {
        Ok(())
    }

    fn print_integer(
        &mut self,
        ctx: &TraversalContext,
        out: &mut dyn Write,
        key: &str,
        value: i64,
    ) -> io::Result<()>;

    /// `value` is already UTF-8 validated; escaping is up to the backend
    fn print_string(
        &mut self,
        ctx: &TraversalContext,
        out: &mut dyn Write,
        key: &str,
        value: &str,
    ) -> io::Result<()>;
}

/// Registered output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    Default,
    Compact,
    Csv,
    Flat,
    Ini,
    Json,
    Xml,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 7] = [
        OutputFormat::Default,
        OutputFormat::Compact,
        OutputFormat::Csv,
        OutputFormat::Flat,
        OutputFormat::Ini,
        OutputFormat::Json,
        OutputFormat::Xml,
    ];

    pub fn name(self) -> &'static str {
        match self {
            OutputFormat::Default => "default",
            OutputFormat::Compact => "compact",
            OutputFormat::Csv => "csv",
            OutputFormat::Flat => "flat",
            OutputFormat::Ini => "ini",
            OutputFormat::Json => "json",
            OutputFormat::Xml => "xml",
        }
    }

    /// Build the backend, consuming its options from `opts`
    pub fn create_backend(
        self,
        opts: &mut OptionSet,
        presentation: &PresentationOptions,
    ) -> ReportResult<Box<dyn Backend>> {
        Ok(match self {
            OutputFormat::Default => Box::new(DefaultBackend::new(opts)?),
            OutputFormat::Compact => Box::new(CompactBackend::compact(opts)?),
            OutputFormat::Csv => Box::new(CompactBackend::csv(opts)?),
            OutputFormat::Flat => Box::new(FlatBackend::new(opts)?),
            OutputFormat::Ini => Box::new(IniBackend::new(opts)?),
            OutputFormat::Json => Box::new(JsonBackend::new(opts)?),
            OutputFormat::Xml => Box::new(XmlBackend::new(opts, presentation)?),
        })
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for OutputFormat {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|format| format.name() == s)
            .ok_or_else(|| ReportError::UnknownFormat { name: s.to_string() })
    }
}

/// How elements inside the packets-and-frames array are numbered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketFrameOrdinal {
    /// Position in the interleaved array
    Combined,
    /// Running count per element kind
    PerKind,
}

impl PacketFrameOrdinal {
    pub(crate) fn resolve(self, ctx: &TraversalContext) -> usize {
        match self {
            PacketFrameOrdinal::Combined => ctx.item_count(ctx.level() - 1),
            PacketFrameOrdinal::PerKind => ctx.packet_frame_ordinal(),
        }
    }
}

impl FromStr for PacketFrameOrdinal {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "combined" => Ok(PacketFrameOrdinal::Combined),
            "per_kind" => Ok(PacketFrameOrdinal::PerKind),
            other => Err(format!(
                "unknown packet/frame ordinal mode '{}', expected combined or per_kind",
                other
            )),
        }
    }
}

/// Ordinal of the current element within its array parent
pub(crate) fn array_ordinal(ctx: &TraversalContext, pf_ordinal: PacketFrameOrdinal) -> usize {
    if ctx.parent_id() == Some(crate::section::SectionId::PacketsAndFrames) {
        pf_ordinal.resolve(ctx)
    } else {
        ctx.item_count(ctx.level() - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_lookup() {
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        let err = "yaml".parse::<OutputFormat>().unwrap_err();
        assert_eq!(err.to_string(), "Unknown output format with name 'yaml'");
    }

    #[test]
    fn test_backend_flags() {
        let presentation = PresentationOptions::default();
        let expected = [
            (OutputFormat::Default, true, false),
            (OutputFormat::Compact, true, false),
            (OutputFormat::Csv, true, false),
            (OutputFormat::Flat, true, true),
            (OutputFormat::Ini, true, true),
            (OutputFormat::Json, false, true),
            (OutputFormat::Xml, false, true),
        ];
        for (format, optional, same_chapter) in expected {
            let mut opts = OptionSet::parse(format.name(), None).unwrap();
            let backend = format.create_backend(&mut opts, &presentation).unwrap();
            assert_eq!(backend.name(), format.name());
            assert_eq!(backend.flags().display_optional_fields, optional, "{}", format);
            assert_eq!(
                backend.flags().packets_and_frames_in_same_chapter,
                same_chapter,
                "{}",
                format
            );
        }
    }
}
