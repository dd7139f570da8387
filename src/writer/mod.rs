//! Streaming report writer
//!
//! [`ReportWriter`] owns the output sink, the traversal state and one
//! backend. Callers open and close sections and print fields; the writer
//! applies the entries filter, the optional-field policy and UTF-8
//! validation, then forwards the event to the backend. Output is streamed:
//! nothing is buffered beyond the per-level prefix strings.

use std::io::Write;

use tracing::{debug, error, warn};

use crate::error::{ReportError, ReportResult};
use crate::escape::utf8::DEFAULT_REPLACEMENT;
use crate::escape::{StringValidation, StringValidator};
use crate::format::{
    format_digest, format_hexdump, format_integers, format_rational, format_time, format_value,
    is_unset, DigestProvider, OptionalFields, PresentationOptions, Rational, UnitValue,
};
use crate::section::payload::SectionPayload;
use crate::section::filter::FilterTable;
use crate::section::SectionId;

pub mod backends;
pub mod context;
pub mod options;

pub use backends::{Backend, BackendFlags, OutputFormat, PacketFrameOrdinal};
pub use context::{TraversalContext, MAX_NESTING};
pub use options::{split_format_spec, OptionSet};

/// Placeholder printed for unavailable values
pub const NOT_AVAILABLE: &str = "N/A";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StringKind {
    Plain,
    Optional,
}

pub struct ReportWriter<W: Write> {
    out: W,
    format: OutputFormat,
    backend: Box<dyn Backend>,
    ctx: TraversalContext,
    filter: FilterTable,
    presentation: PresentationOptions,
    validator: StringValidator,
    digest: Option<Box<dyn DigestProvider>>,
}

impl<W: Write> ReportWriter<W> {
    /// Create a writer from a `name[=k=v:k=v]` format spec.
    ///
    /// Besides the backend's own options every writer accepts
    /// `string_validation`/`sv` and `string_validation_replacement`/`svr`.
    pub fn new(
        out: W,
        format_spec: &str,
        filter: FilterTable,
        presentation: PresentationOptions,
    ) -> ReportResult<Self> {
        let (name, args) = split_format_spec(format_spec);
        let format: OutputFormat = name.parse()?;
        let mut opts = OptionSet::parse(name, args)?;

        let policy = opts.take_parsed(&["string_validation", "sv"], StringValidation::Replace)?;
        let replacement =
            opts.take_string(&["string_validation_replacement", "svr"], DEFAULT_REPLACEMENT);
        let backend = format.create_backend(&mut opts, &presentation)?;
        opts.finish()?;

        let validator = StringValidator::new(policy, &replacement)?
            .exclude_xml_controls(format == OutputFormat::Xml);

        debug!(
            "Created '{}' writer, string validation {:?}",
            format, policy
        );

        Ok(Self {
            out,
            format,
            backend,
            ctx: TraversalContext::new(),
            filter,
            presentation,
            validator,
            digest: None,
        })
    }

    /// Enable data hashes printed by [`print_digest`](Self::print_digest)
    pub fn with_digest(mut self, provider: Box<dyn DigestProvider>) -> Self {
        self.digest = Some(provider);
        self
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn backend_flags(&self) -> BackendFlags {
        self.backend.flags()
    }

    pub fn filter(&self) -> &FilterTable {
        &self.filter
    }

    pub fn presentation(&self) -> &PresentationOptions {
        &self.presentation
    }

    pub fn has_digest(&self) -> bool {
        self.digest.is_some()
    }

    /// Number of open sections
    pub fn depth(&self) -> usize {
        self.ctx.depth()
    }

    /// Open a section without type payload.
    ///
    /// Panics on nesting violations: a section that is not a declared child
    /// of the current one, too deep a stack, or a typed section.
    pub fn enter_section(&mut self, id: SectionId) -> ReportResult<()> {
        self.enter(id, None)
    }

    /// Open a typed section, resolving its type name from `payload`
    pub fn enter_section_with(&mut self, id: SectionId, payload: SectionPayload<'_>) -> ReportResult<()> {
        self.enter(id, Some(payload))
    }

    fn enter(&mut self, id: SectionId, payload: Option<SectionPayload<'_>>) -> ReportResult<()> {
        let def = id.def();
        let section_type = match (def.type_kind, payload) {
            (Some(kind), Some(payload)) => Some(kind.type_name(&payload)),
            (Some(_), None) => panic!("section '{}' requires a type payload", def.display_name()),
            (None, _) => None,
        };
        self.ctx.push(id);
        self.backend
            .print_section_header(&mut self.ctx, &mut self.out, section_type)?;
        Ok(())
    }

    /// Close the innermost section.
    ///
    /// Panics when no section is open.
    pub fn exit_section(&mut self) -> ReportResult<()> {
        assert!(self.ctx.depth() > 0, "exit_section called with no open section");
        self.ctx.complete_current();
        let result = self.backend.print_section_footer(&self.ctx, &mut self.out);
        self.ctx.pop();
        result?;
        Ok(())
    }

    /// Close every open section, innermost first
    pub fn close_all(&mut self) -> ReportResult<()> {
        while self.ctx.depth() > 0 {
            self.exit_section()?;
        }
        Ok(())
    }

    /// Flush and hand back the sink.
    ///
    /// Panics when sections are still open; call [`close_all`](Self::close_all)
    /// first when aborting a report.
    pub fn finish(mut self) -> ReportResult<W> {
        assert_eq!(
            self.ctx.depth(),
            0,
            "report finished with {} open section(s)",
            self.ctx.depth()
        );
        self.out.flush()?;
        Ok(self.out)
    }

    fn should_emit(&self, key: &str) -> bool {
        self.filter.should_emit(self.ctx.section_id(), key)
    }

    pub fn print_integer(&mut self, key: &str, value: i64) -> ReportResult<()> {
        if !self.should_emit(key) {
            return Ok(());
        }
        self.backend
            .print_integer(&self.ctx, &mut self.out, key, value)?;
        let level = self.ctx.level();
        self.ctx.bump_item_count(level);
        Ok(())
    }

    /// `never` drops every string field; `auto` drops optional ones on
    /// backends that do not display them
    fn string_hidden(&self, kind: StringKind) -> bool {
        match self.presentation.show_optional_fields {
            OptionalFields::Always => false,
            OptionalFields::Never => true,
            OptionalFields::Auto => {
                kind == StringKind::Optional && !self.backend.flags().display_optional_fields
            }
        }
    }

    fn emit_string(&mut self, key: &str, value: &str, kind: StringKind) -> ReportResult<()> {
        if self.string_hidden(kind) || !self.should_emit(key) {
            return Ok(());
        }
        self.backend
            .print_string(&self.ctx, &mut self.out, key, value)?;
        let level = self.ctx.level();
        self.ctx.bump_item_count(level);
        Ok(())
    }

    pub fn print_string(&mut self, key: &str, value: &str) -> ReportResult<()> {
        self.emit_string(key, value, StringKind::Plain)
    }

    /// Optional field, subject to `show_optional_fields`
    pub fn print_string_opt(&mut self, key: &str, value: &str) -> ReportResult<()> {
        self.emit_string(key, value, StringKind::Optional)
    }

    /// Print raw bytes of unknown encoding, validating key and value first.
    ///
    /// Under the fail policy an invalid value aborts with
    /// [`ReportError::InvalidString`] and nothing is written.
    pub fn print_string_validated(&mut self, key: &str, value: &[u8]) -> ReportResult<()> {
        if self.string_hidden(StringKind::Plain) || !self.should_emit(key) {
            return Ok(());
        }
        let section = self.ctx.section().display_name();
        let checked = self
            .validate(key.as_bytes())
            .and_then(|checked_key| self.validate(value).map(|checked_value| (checked_key, checked_value)));

        // The field counts as printed even when it fails validation
        let level = self.ctx.level();
        self.ctx.bump_item_count(level);

        let Some((checked_key, checked_value)) = checked else {
            error!(
                "Invalid key=value string combination {}={} in section {}",
                key,
                String::from_utf8_lossy(value),
                section
            );
            return Err(ReportError::InvalidString {
                section: section.to_string(),
                key: key.to_string(),
            });
        };
        self.backend
            .print_string(&self.ctx, &mut self.out, &checked_key, &checked_value)?;
        Ok(())
    }

    fn validate(&self, input: &[u8]) -> Option<String> {
        match self.validator.validate(input) {
            Ok(validated) => {
                if validated.invalid_runs > 0 && self.validator.policy() == StringValidation::Replace {
                    warn!(
                        "{} invalid UTF-8 sequence(s) found in string '{}', replaced with '{}'",
                        validated.invalid_runs,
                        String::from_utf8_lossy(input),
                        self.validator.replacement()
                    );
                }
                Some(validated.text.into_owned())
            }
            Err(invalid) => {
                error!(
                    "{} invalid UTF-8 sequence(s) found in string '{}'",
                    invalid.invalid_runs,
                    String::from_utf8_lossy(input)
                );
                None
            }
        }
    }

    pub fn print_rational(&mut self, key: &str, value: Rational, sep: char) -> ReportResult<()> {
        self.print_string(key, &format_rational(value.num, value.den, sep))
    }

    fn print_scaled(&mut self, key: &str, ts: i64, time_base: Rational, is_duration: bool) -> ReportResult<()> {
        match format_time(ts, time_base, is_duration, &self.presentation) {
            Some(text) => self.print_string(key, &text),
            None => self.print_string_opt(key, NOT_AVAILABLE),
        }
    }

    /// Timestamp in seconds, optional `N/A` when unset
    pub fn print_time(&mut self, key: &str, ts: i64, time_base: Rational) -> ReportResult<()> {
        self.print_scaled(key, ts, time_base, false)
    }

    /// Duration in seconds, optional `N/A` when zero
    pub fn print_duration_time(&mut self, key: &str, ts: i64, time_base: Rational) -> ReportResult<()> {
        self.print_scaled(key, ts, time_base, true)
    }

    fn print_raw_ts(&mut self, key: &str, ts: i64, is_duration: bool) -> ReportResult<()> {
        if is_unset(ts, is_duration) {
            self.print_string_opt(key, NOT_AVAILABLE)
        } else {
            self.print_integer(key, ts)
        }
    }

    /// Raw timestamp, optional `N/A` when unset
    pub fn print_ts(&mut self, key: &str, ts: i64) -> ReportResult<()> {
        self.print_raw_ts(key, ts, false)
    }

    /// Raw duration, optional `N/A` when zero
    pub fn print_duration_ts(&mut self, key: &str, ts: i64) -> ReportResult<()> {
        self.print_raw_ts(key, ts, true)
    }

    /// Quantity rendered with the configured unit and prefix options
    pub fn print_value(&mut self, key: &str, value: UnitValue) -> ReportResult<()> {
        let text = format_value(value, &self.presentation);
        self.print_string(key, &text)
    }

    pub fn print_hexdump(&mut self, key: &str, data: &[u8]) -> ReportResult<()> {
        self.print_string(key, &format_hexdump(data))
    }

    pub fn print_integers(
        &mut self,
        key: &str,
        values: &[i32],
        columns: usize,
        width: usize,
        offset_add: usize,
    ) -> ReportResult<()> {
        self.print_string(key, &format_integers(values, columns, width, offset_add))
    }

    /// `ALGO:hex` of `data`; prints nothing when no digest is configured
    pub fn print_digest(&mut self, key: &str, data: &[u8]) -> ReportResult<()> {
        let Some(provider) = self.digest.as_deref() else {
            return Ok(());
        };
        let text = format_digest(provider, data);
        self.print_string(key, &text)
    }
}
