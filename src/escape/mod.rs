//! Per-backend string escaping
//!
//! Every escaper returns the input borrowed when nothing needs escaping, so
//! plain values never allocate.

use std::borrow::Cow;
use std::fmt::Write as _;
use std::str::FromStr;

pub mod utf8;

pub use utf8::{StringValidation, StringValidator, Validated};

fn escape_with<'a>(
    src: &'a str,
    needs_escape: impl Fn(char) -> bool,
    escape: impl Fn(&mut String, char),
) -> Cow<'a, str> {
    match src.find(|c: char| needs_escape(c)) {
        None => Cow::Borrowed(src),
        Some(first) => {
            let mut dst = String::with_capacity(src.len() + 8);
            dst.push_str(&src[..first]);
            for c in src[first..].chars() {
                escape(&mut dst, c);
            }
            Cow::Owned(dst)
        }
    }
}

/// C-like escaping: `\b \f \n \r \\`, plus a backslash before `sep`
pub fn c_escape(src: &str, sep: char) -> Cow<'_, str> {
    escape_with(
        src,
        |c| matches!(c, '\u{8}' | '\u{c}' | '\n' | '\r' | '\\') || c == sep,
        |dst, c| match c {
            '\u{8}' => dst.push_str("\\b"),
            '\u{c}' => dst.push_str("\\f"),
            '\n' => dst.push_str("\\n"),
            '\r' => dst.push_str("\\r"),
            '\\' => dst.push_str("\\\\"),
            _ => {
                if c == sep {
                    dst.push('\\');
                }
                dst.push(c);
            }
        },
    )
}

/// RFC4180 quoting, triggered by `sep`, `"`, LF or CR; quotes are doubled
pub fn csv_escape(src: &str, sep: char) -> Cow<'_, str> {
    let needs_quoting = src.contains(|c: char| c == sep || matches!(c, '"' | '\n' | '\r'));
    if !needs_quoting {
        return Cow::Borrowed(src);
    }
    let mut dst = String::with_capacity(src.len() + 2);
    dst.push('"');
    for c in src.chars() {
        if c == '"' {
            dst.push('"');
        }
        dst.push(c);
    }
    dst.push('"');
    Cow::Owned(dst)
}

/// JSON string escaping, `\u00XX` for remaining control bytes
pub fn json_escape(src: &str) -> Cow<'_, str> {
    escape_with(
        src,
        |c| matches!(c, '"' | '\\') || (c as u32) < 0x20,
        |dst, c| match c {
            '"' => dst.push_str("\\\""),
            '\\' => dst.push_str("\\\\"),
            '\u{8}' => dst.push_str("\\b"),
            '\u{c}' => dst.push_str("\\f"),
            '\n' => dst.push_str("\\n"),
            '\r' => dst.push_str("\\r"),
            '\t' => dst.push_str("\\t"),
            c if (c as u32) < 0x20 => {
                let _ = write!(dst, "\\u00{:02x}", c as u32);
            }
            c => dst.push(c),
        },
    )
}

/// XML attribute escaping with double-quote entities
pub fn xml_escape(src: &str) -> Cow<'_, str> {
    escape_with(
        src,
        |c| matches!(c, '&' | '<' | '>' | '"'),
        |dst, c| match c {
            '&' => dst.push_str("&amp;"),
            '<' => dst.push_str("&lt;"),
            '>' => dst.push_str("&gt;"),
            '"' => dst.push_str("&quot;"),
            c => dst.push(c),
        },
    )
}

/// INI escaping: control characters and the INI metacharacters `\ # = :`
pub fn ini_escape(src: &str) -> Cow<'_, str> {
    escape_with(
        src,
        |c| matches!(c, '\\' | '#' | '=' | ':') || (c as u32) < 0x20,
        |dst, c| match c {
            '\u{8}' => dst.push_str("\\b"),
            '\u{c}' => dst.push_str("\\f"),
            '\n' => dst.push_str("\\n"),
            '\r' => dst.push_str("\\r"),
            '\t' => dst.push_str("\\t"),
            '\\' | '#' | '=' | ':' => {
                dst.push('\\');
                dst.push(c);
            }
            c if (c as u32) < 0x20 => {
                let _ = write!(dst, "\\x00{:02x}", c as u32);
            }
            c => dst.push(c),
        },
    )
}

/// Flat key sanitizing: every byte outside `[A-Za-z0-9]` becomes `_`
pub fn flat_escape_key(src: &str) -> Cow<'_, str> {
    escape_with(
        src,
        |c| !c.is_ascii_alphanumeric(),
        |dst, c| {
            if c.is_ascii_alphanumeric() {
                dst.push(c);
            } else {
                dst.extend(std::iter::repeat('_').take(c.len_utf8()));
            }
        },
    )
}

/// Shell-safe value escaping for the flat format
pub fn flat_escape_value(src: &str) -> Cow<'_, str> {
    escape_with(
        src,
        |c| matches!(c, '\n' | '\r' | '\\' | '"' | '`' | '$'),
        |dst, c| match c {
            '\n' => dst.push_str("\\n"),
            '\r' => dst.push_str("\\r"),
            '\\' | '"' | '`' | '$' => {
                dst.push('\\');
                dst.push(c);
            }
            c => dst.push(c),
        },
    )
}

/// Value escaping applied by the compact and csv writers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscapeMode {
    None,
    C,
    Csv,
}

impl EscapeMode {
    pub fn apply<'a>(self, src: &'a str, sep: char) -> Cow<'a, str> {
        match self {
            EscapeMode::None => Cow::Borrowed(src),
            EscapeMode::C => c_escape(src, sep),
            EscapeMode::Csv => csv_escape(src, sep),
        }
    }
}

impl FromStr for EscapeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(EscapeMode::None),
            "c" => Ok(EscapeMode::C),
            "csv" => Ok(EscapeMode::Csv),
            other => Err(format!("Unknown escape mode '{}'", other)),
        }
    }
}
