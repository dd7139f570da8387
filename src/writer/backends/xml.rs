//! XML backend, optionally namespace-qualified for schema validation

use std::io::{self, Write};

use super::{Backend, BackendFlags};
use crate::error::{ReportError, ReportResult};
use crate::escape::xml_escape;
use crate::format::PresentationOptions;
use crate::writer::context::TraversalContext;
use crate::writer::options::OptionSet;

const XML_DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";

const QUALIFIED_ATTRIBUTES: &str = " xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\" \
     xmlns:ffprobe=\"http://www.ffmpeg.org/schema/ffprobe\" \
     xsi:schemaLocation=\"http://www.ffmpeg.org/schema/ffprobe ffprobe.xsd\"";

#[derive(Debug)]
pub struct XmlBackend {
    fully_qualified: bool,
    within_tag: bool,
    indent_level: usize,
}

impl XmlBackend {
    pub fn new(opts: &mut OptionSet, presentation: &PresentationOptions) -> ReportResult<Self> {
        let mut fully_qualified = opts.take_bool(&["fully_qualified", "q"], false)?;
        let xsd_strict = opts.take_bool(&["xsd_strict", "x"], false)?;

        if xsd_strict {
            fully_qualified = true;
            let conflicts = [
                (presentation.show_private_data, "private"),
                (presentation.show_value_unit, "unit"),
                (presentation.use_value_prefix, "prefix"),
            ];
            if let Some((_, option)) = conflicts.iter().find(|(enabled, _)| *enabled) {
                return Err(ReportError::XsdIncompatible {
                    option: option.to_string(),
                });
            }
        }

        Ok(Self {
            fully_qualified,
            within_tag: false,
            indent_level: 0,
        })
    }

    fn indent(&self, out: &mut dyn Write) -> io::Result<()> {
        write!(out, "{:width$}", "", width = (self.indent_level * 4).max(1))
    }

    fn namespace(&self) -> &'static str {
        if self.fully_qualified {
            "ffprobe:"
        } else {
            ""
        }
    }

    fn print_value(
        &mut self,
        ctx: &TraversalContext,
        out: &mut dyn Write,
        key: &str,
        value: &str,
    ) -> io::Result<()> {
        let section = ctx.section();
        if section.has_variable_fields() {
            self.indent_level += 1;
            self.indent(out)?;
            writeln!(
                out,
                "<{} key=\"{}\" value=\"{}\"/>",
                section.element_name.unwrap_or(section.name),
                xml_escape(key),
                value
            )?;
            self.indent_level -= 1;
        } else {
            if ctx.item_count(ctx.level()) > 0 {
                out.write_all(b" ")?;
            }
            write!(out, "{}=\"{}\"", key, value)?;
        }
        Ok(())
    }
}

impl Backend for XmlBackend {
    fn name(&self) -> &'static str {
        "xml"
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
        section_type: Option<&str>,
    ) -> io::Result<()> {
        let level = ctx.level();
        if level == 0 {
            out.write_all(XML_DECLARATION.as_bytes())?;
            let attributes = if self.fully_qualified {
                QUALIFIED_ATTRIBUTES
            } else {
                ""
            };
            return writeln!(out, "<{}ffprobe{}>", self.namespace(), attributes);
        }

        if self.within_tag {
            self.within_tag = false;
            out.write_all(b">\n")?;
        }

        let section = ctx.section();
        if ctx.parent().map_or(false, |parent| parent.is_wrapper()) && ctx.item_count(level - 1) > 0 {
            writeln!(out)?;
        }
        self.indent_level += 1;

        self.indent(out)?;
        if section.is_array() || section.has_variable_fields() {
            write!(out, "<{}", section.name)?;
            if section.has_type() {
                write!(out, " type=\"{}\"", xml_escape(section_type.unwrap_or_default()))?;
            }
            out.write_all(b">\n")?;
        } else {
            write!(out, "<{} ", section.name)?;
            self.within_tag = true;
        }
        Ok(())
    }

    fn print_section_footer(&mut self, ctx: &TraversalContext, out: &mut dyn Write) -> io::Result<()> {
        if ctx.level() == 0 {
            writeln!(out, "</{}ffprobe>", self.namespace())
        } else if self.within_tag {
            self.within_tag = false;
            self.indent_level = self.indent_level.saturating_sub(1);
            out.write_all(b"/>\n")
        } else {
            self.indent(out)?;
            writeln!(out, "</{}>", ctx.section().name)?;
            self.indent_level = self.indent_level.saturating_sub(1);
            Ok(())
        }
    }

    fn print_integer(
        &mut self,
        ctx: &TraversalContext,
        out: &mut dyn Write,
        key: &str,
        value: i64,
    ) -> io::Result<()> {
        self.print_value(ctx, out, key, &value.to_string())
    }

    fn print_string(
        &mut self,
        ctx: &TraversalContext,
        out: &mut dyn Write,
        key: &str,
        value: &str,
    ) -> io::Result<()> {
        self.print_value(ctx, out, key, &xml_escape(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(args: &str, presentation: &PresentationOptions) -> ReportResult<XmlBackend> {
        let mut opts = OptionSet::parse("xml", Some(args))?;
        XmlBackend::new(&mut opts, presentation)
    }

    #[test]
    fn test_xsd_strict_forces_qualified() {
        let presentation = PresentationOptions {
            show_private_data: false,
            ..PresentationOptions::default()
        };
        let backend = build("x=1", &presentation).unwrap();
        assert!(backend.fully_qualified);
    }

    #[test]
    fn test_xsd_strict_rejects_private_data() {
        let err = build("xsd_strict=1", &PresentationOptions::default()).unwrap_err();
        assert!(matches!(err, ReportError::XsdIncompatible { ref option } if option == "private"));
    }

    #[test]
    fn test_xsd_strict_rejects_units() {
        let presentation = PresentationOptions {
            show_private_data: false,
            show_value_unit: true,
            ..PresentationOptions::default()
        };
        let err = build("x=1", &presentation).unwrap_err();
        assert!(matches!(err, ReportError::XsdIncompatible { ref option } if option == "unit"));
    }
}
