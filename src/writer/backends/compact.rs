//! Compact and CSV backends: one line per top-level element

use std::io::{self, Write};

use super::{Backend, BackendFlags};
use crate::error::ReportResult;
use crate::escape::EscapeMode;
use crate::writer::context::{TraversalContext, MAX_NESTING};
use crate::writer::options::OptionSet;

#[derive(Debug)]
pub struct CompactBackend {
    name: &'static str,
    item_sep: char,
    nokey: bool,
    print_section: bool,
    escape: EscapeMode,
    nested: [bool; MAX_NESTING],
}

impl CompactBackend {
    /// `compact`: `|` separated, keyed, C escaping
    pub fn compact(opts: &mut OptionSet) -> ReportResult<Self> {
        Self::with_defaults(opts, "compact", '|', false, EscapeMode::C)
    }

    /// `csv`: comma separated, unkeyed, RFC4180 quoting
    pub fn csv(opts: &mut OptionSet) -> ReportResult<Self> {
        Self::with_defaults(opts, "csv", ',', true, EscapeMode::Csv)
    }

    fn with_defaults(
        opts: &mut OptionSet,
        name: &'static str,
        item_sep: char,
        nokey: bool,
        escape: EscapeMode,
    ) -> ReportResult<Self> {
        Ok(Self {
            name,
            item_sep: opts.take_char(&["item_sep", "s"], item_sep, "Item separator")?,
            nokey: opts.take_bool(&["nokey", "nk"], nokey)?,
            print_section: opts.take_bool(&["print_section", "p"], true)?,
            escape: opts.take_parsed(&["escape", "e"], escape)?,
            nested: [false; MAX_NESTING],
        })
    }

    fn print_key(&self, ctx: &TraversalContext, out: &mut dyn Write, key: &str) -> io::Result<()> {
        if ctx.item_count(ctx.level()) > 0 {
            write!(out, "{}", self.item_sep)?;
        }
        if !self.nokey {
            write!(out, "{}{}=", ctx.prefix(ctx.level()), key)?;
        }
        Ok(())
    }
}

/// Type names in prefixes keep ASCII alphanumerics, lowercased
fn push_type_label(prefix: &mut String, section_type: &str) {
    prefix.extend(section_type.bytes().map(|b| {
        if b.is_ascii_alphanumeric() {
            char::from(b.to_ascii_lowercase())
        } else {
            '_'
        }
    }));
}

impl Backend for CompactBackend {
    fn name(&self) -> &'static str {
        self.name
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
        section_type: Option<&str>,
    ) -> io::Result<()> {
        let level = ctx.level();
        let section = ctx.section();
        self.nested[level] = false;

        let parent = ctx.parent();
        let is_nested = parent.map_or(false, |parent| {
            section.has_type()
                || (!section.is_array() && !parent.is_wrapper() && !parent.is_array())
        });

        if is_nested {
            self.nested[level] = true;
            let (parent_prefix, prefix) = ctx.split_prefix();
            prefix.push_str(parent_prefix);
            prefix.push_str(section.element_name.unwrap_or(section.name));
            if section.has_type() {
                prefix.push('/');
                push_type_label(prefix, section_type.unwrap_or_default());
            }
            prefix.push(':');
            let inherited = ctx.item_count(level - 1);
            ctx.set_item_count(level, inherited);
        } else {
            if let Some(parent) = parent {
                if !parent.is_wrapper() && !parent.is_array() && ctx.item_count(level - 1) > 0 {
                    write!(out, "{}", self.item_sep)?;
                }
            }
            if self.print_section && !section.is_wrapper() && !section.is_array() {
                write!(out, "{}{}", section.name, self.item_sep)?;
            }
        }
        Ok(())
    }

    fn print_section_footer(&mut self, ctx: &TraversalContext, out: &mut dyn Write) -> io::Result<()> {
        let level = ctx.level();
        let section = ctx.section();
        if !self.nested[level] && !section.is_wrapper() && !section.is_array() {
            writeln!(out)?;
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
        write!(out, "{}", value)
    }

    fn print_string(
        &mut self,
        ctx: &TraversalContext,
        out: &mut dyn Write,
        key: &str,
        value: &str,
    ) -> io::Result<()> {
        self.print_key(ctx, out, key)?;
        out.write_all(self.escape.apply(value, self.item_sep).as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_label() {
        let mut prefix = String::from("side_datum/");
        push_type_label(&mut prefix, "Display Matrix");
        assert_eq!(prefix, "side_datum/display_matrix");
    }

    #[test]
    fn test_unknown_escape_mode() {
        let mut opts = OptionSet::parse("compact", Some("e=xml")).unwrap();
        let err = CompactBackend::compact(&mut opts).unwrap_err();
        assert!(err.to_string().contains("Unknown escape mode 'xml'"));
    }

    #[test]
    fn test_csv_defaults() {
        let mut opts = OptionSet::parse("csv", None).unwrap();
        let backend = CompactBackend::csv(&mut opts).unwrap();
        assert_eq!(backend.item_sep, ',');
        assert!(backend.nokey);
        assert_eq!(backend.escape, EscapeMode::Csv);
    }
}
