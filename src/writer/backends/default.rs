//! Default backend: `[SECTION]` blocks of `key=value` lines

use std::io::{self, Write};

use super::{Backend, BackendFlags};
use crate::error::ReportResult;
use crate::writer::context::{TraversalContext, MAX_NESTING};
use crate::writer::options::OptionSet;

#[derive(Debug)]
pub struct DefaultBackend {
    noprint_wrappers: bool,
    nokey: bool,
    nested: [bool; MAX_NESTING],
}

impl DefaultBackend {
    pub fn new(opts: &mut OptionSet) -> ReportResult<Self> {
        Ok(Self {
            noprint_wrappers: opts.take_bool(&["noprint_wrappers", "nw"], false)?,
            nokey: opts.take_bool(&["nokey", "nk"], false)?,
            nested: [false; MAX_NESTING],
        })
    }

    fn print_key(&self, ctx: &TraversalContext, out: &mut dyn Write, key: &str) -> io::Result<()> {
        if !self.nokey {
            write!(out, "{}{}=", ctx.prefix(ctx.level()), key)?;
        }
        Ok(())
    }
}

impl Backend for DefaultBackend {
    fn name(&self) -> &'static str {
        "default"
    }

    fn flags(&self) -> BackendFlags {
        BackendFlags {
            display_optional_fields: true,
            packets_and_frames_in_same_chapter: false,
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
        self.nested[level] = false;

        if let Some(parent) = ctx.parent() {
            if !parent.is_wrapper() && !parent.is_array() {
                self.nested[level] = true;
                let label = section.element_name.unwrap_or(section.name).to_ascii_uppercase();
                let (parent_prefix, prefix) = ctx.split_prefix();
                prefix.push_str(parent_prefix);
                prefix.push_str(&label);
                prefix.push(':');
            }
        }

        if self.noprint_wrappers || self.nested[level] {
            return Ok(());
        }
        if !section.is_wrapper() && !section.is_array() {
            writeln!(out, "[{}]", section.name.to_ascii_uppercase())?;
        }
        Ok(())
    }

    fn print_section_footer(&mut self, ctx: &TraversalContext, out: &mut dyn Write) -> io::Result<()> {
        let section = ctx.section();
        if self.noprint_wrappers || self.nested[ctx.level()] {
            return Ok(());
        }
        if !section.is_wrapper() && !section.is_array() {
            writeln!(out, "[/{}]", section.name.to_ascii_uppercase())?;
        }
        Ok(())
    }

    fn print_integer(
        &mut self,
        ctx: &TraversalContext,
        out: &mut dyn Write,
        key: &str,
        value: i64,
    ) -> io::Result<()> {
        self.print_key(ctx, out, key)?;
        writeln!(out, "{}", value)
    }

    fn print_string(
        &mut self,
        ctx: &TraversalContext,
        out: &mut dyn Write,
        key: &str,
        value: &str,
    ) -> io::Result<()> {
        self.print_key(ctx, out, key)?;
        writeln!(out, "{}", value)
    }
}
