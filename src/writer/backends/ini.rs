//! INI backend: `[dotted.section.path]` headers with escaped pairs

use std::io::{self, Write};

use super::{array_ordinal, Backend, BackendFlags, PacketFrameOrdinal};
use crate::error::ReportResult;
use crate::escape::ini_escape;
use crate::writer::context::TraversalContext;
use crate::writer::options::OptionSet;

/// First line of every INI report
pub const INI_BANNER: &str = "# ffprobe output\n\n";

#[derive(Debug)]
pub struct IniBackend {
    hierarchical: bool,
    pf_ordinal: PacketFrameOrdinal,
}

impl IniBackend {
    pub fn new(opts: &mut OptionSet) -> ReportResult<Self> {
        Ok(Self {
            hierarchical: opts.take_bool(&["hierarchical", "h"], true)?,
            pf_ordinal: opts.take_parsed(
                &["packet_frame_ordinal", "pfo"],
                PacketFrameOrdinal::PerKind,
            )?,
        })
    }
}

impl Backend for IniBackend {
    fn name(&self) -> &'static str {
        "ini"
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
        out: &mut dyn Write,
        _section_type: Option<&str>,
    ) -> io::Result<()> {
        let Some(parent) = ctx.parent() else {
            return out.write_all(INI_BANNER.as_bytes());
        };
        let level = ctx.level();
        let section = ctx.section();
        if ctx.item_count(level - 1) > 0 {
            writeln!(out)?;
        }

        let ordinal = parent.is_array().then(|| array_ordinal(ctx, self.pf_ordinal));
        let hierarchical = self.hierarchical;
        let (parent_prefix, prefix) = ctx.split_prefix();
        prefix.push_str(parent_prefix);
        if hierarchical || (!section.is_array() && !section.is_wrapper()) {
            if !prefix.is_empty() {
                prefix.push('.');
            }
            prefix.push_str(section.name);
            if let Some(n) = ordinal {
                prefix.push('.');
                prefix.push_str(&n.to_string());
            }
        }

        if !section.is_array() && !section.is_wrapper() {
            writeln!(out, "[{}]", ctx.prefix(level))?;
        }
        Ok(())
    }

    fn print_integer(
        &mut self,
        _ctx: &TraversalContext,
        out: &mut dyn Write,
        key: &str,
        value: i64,
    ) -> io::Result<()> {
        writeln!(out, "{}={}", key, value)
    }

    fn print_string(
        &mut self,
        _ctx: &TraversalContext,
        out: &mut dyn Write,
        key: &str,
        value: &str,
    ) -> io::Result<()> {
        writeln!(out, "{}={}", ini_escape(key), ini_escape(value))
    }
}
