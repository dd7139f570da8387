//! Flat backend: shell-sourceable `a.b.0.key="value"` lines

use std::io::{self, Write};

use super::{array_ordinal, Backend, BackendFlags, PacketFrameOrdinal};
use crate::error::ReportResult;
use crate::escape::{flat_escape_key, flat_escape_value};
use crate::writer::context::TraversalContext;
use crate::writer::options::OptionSet;

#[derive(Debug)]
pub struct FlatBackend {
    sep: char,
    hierarchical: bool,
    pf_ordinal: PacketFrameOrdinal,
}

impl FlatBackend {
    pub fn new(opts: &mut OptionSet) -> ReportResult<Self> {
        Ok(Self {
            sep: opts.take_char(&["sep_char", "s"], '.', "Item separator")?,
            hierarchical: opts.take_bool(&["hierarchical", "h"], true)?,
            pf_ordinal: opts.take_parsed(
                &["packet_frame_ordinal", "pfo"],
                PacketFrameOrdinal::Combined,
            )?,
        })
    }
}

impl Backend for FlatBackend {
    fn name(&self) -> &'static str {
        "flat"
    }

    fn flags(&self) -> BackendFlags {
        BackendFlags {
            display_optional_fields: true,
            packets_and_frames_in_same_chapter: true,
        }
    }

    fn print_section_header(
        &mut self,
        ctx: &mut TraversalContext,
        _out: &mut dyn Write,
        _section_type: Option<&str>,
    ) -> io::Result<()> {
        let Some(parent) = ctx.parent() else {
            return Ok(());
        };
        let section = ctx.section();
        let ordinal = parent.is_array().then(|| array_ordinal(ctx, self.pf_ordinal));
        let sep = self.sep;
        let hierarchical = self.hierarchical;

        let (parent_prefix, prefix) = ctx.split_prefix();
        prefix.push_str(parent_prefix);
        if hierarchical || (!section.is_array() && !section.is_wrapper()) {
            prefix.push_str(section.name);
            prefix.push(sep);
            if let Some(n) = ordinal {
                prefix.push_str(&n.to_string());
                prefix.push(sep);
            }
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
        writeln!(out, "{}{}={}", ctx.prefix(ctx.level()), key, value)
    }

    fn print_string(
        &mut self,
        ctx: &TraversalContext,
        out: &mut dyn Write,
        key: &str,
        value: &str,
    ) -> io::Result<()> {
        writeln!(
            out,
            "{}{}=\"{}\"",
            ctx.prefix(ctx.level()),
            flat_escape_key(key),
            flat_escape_value(value)
        )
    }
}
