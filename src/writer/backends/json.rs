//! JSON backend

use std::io::{self, Write};

use super::{Backend, BackendFlags};
use crate::error::ReportResult;
use crate::escape::json_escape;
use crate::section::SectionId;
use crate::writer::context::TraversalContext;
use crate::writer::options::OptionSet;

#[derive(Debug)]
pub struct JsonBackend {
    compact: bool,
    indent_level: usize,
    item_sep: &'static str,
    item_start_end: &'static str,
}

impl JsonBackend {
    pub fn new(opts: &mut OptionSet) -> ReportResult<Self> {
        let compact = opts.take_bool(&["compact", "c"], false)?;
        Ok(Self {
            compact,
            indent_level: 0,
            item_sep: if compact { ", " } else { ",\n" },
            item_start_end: if compact { " " } else { "\n" },
        })
    }

    /// Indentation is never empty, a zero level still writes one space
    fn indent(&self, out: &mut dyn Write) -> io::Result<()> {
        write!(out, "{:width$}", "", width = (self.indent_level * 4).max(1))
    }

    fn start_item(&self, ctx: &TraversalContext, out: &mut dyn Write) -> io::Result<()> {
        if ctx.item_count(ctx.level()) > 0 || ctx.parent_id() == Some(SectionId::PacketsAndFrames) {
            out.write_all(self.item_sep.as_bytes())?;
        }
        if !self.compact {
            self.indent(out)?;
        }
        Ok(())
    }
}

impl Backend for JsonBackend {
    fn name(&self) -> &'static str {
        "json"
    }

    fn flags(&self) -> BackendFlags {
        BackendFlags {
            display_optional_fields: false,
            packets_and_frames_in_same_chapter: true,
        }
    }

    fn print_section_header(
        &mut self,
        ctx: &mut TraversalContext,
        out: &mut dyn Write,
        _section_type: Option<&str>,
    ) -> io::Result<()> {
        let level = ctx.level();
        let section = ctx.section();
        let parent = ctx.parent();

        if level > 0 && ctx.item_count(level - 1) > 0 {
            out.write_all(b",\n")?;
        }

        if section.is_wrapper() {
            out.write_all(b"{\n")?;
            self.indent_level += 1;
            return Ok(());
        }

        let name = json_escape(section.name);
        self.indent(out)?;
        self.indent_level += 1;
        if section.is_array() {
            writeln!(out, "\"{}\": [", name)?;
        } else if parent.map_or(false, |parent| !parent.is_array()) {
            write!(out, "\"{}\": {{{}", name, self.item_start_end)?;
        } else {
            write!(out, "{{{}", self.item_start_end)?;
            if ctx.parent_id() == Some(SectionId::PacketsAndFrames) {
                if !self.compact {
                    self.indent(out)?;
                }
                write!(out, "\"type\": \"{}\"", name)?;
                ctx.bump_item_count(level);
            }
        }
        Ok(())
    }

    fn print_section_footer(&mut self, ctx: &TraversalContext, out: &mut dyn Write) -> io::Result<()> {
        if ctx.level() == 0 {
            self.indent_level = self.indent_level.saturating_sub(1);
            out.write_all(b"\n}\n")
        } else if ctx.section().is_array() {
            writeln!(out)?;
            self.indent_level = self.indent_level.saturating_sub(1);
            self.indent(out)?;
            out.write_all(b"]")
        } else {
            out.write_all(self.item_start_end.as_bytes())?;
            self.indent_level = self.indent_level.saturating_sub(1);
            if !self.compact {
                self.indent(out)?;
            }
            out.write_all(b"}")
        }
    }

    fn print_integer(
        &mut self,
        ctx: &TraversalContext,
        out: &mut dyn Write,
        key: &str,
        value: i64,
    ) -> io::Result<()> {
        self.start_item(ctx, out)?;
        write!(out, "\"{}\": {}", json_escape(key), value)
    }

    fn print_string(
        &mut self,
        ctx: &TraversalContext,
        out: &mut dyn Write,
        key: &str,
        value: &str,
    ) -> io::Result<()> {
        self.start_item(ctx, out)?;
        write!(out, "\"{}\": \"{}\"", json_escape(key), json_escape(value))
    }
}
