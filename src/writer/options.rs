//! Writer option strings: `name=k1=v1:k2=v2`

use std::str::FromStr;

use crate::error::{ReportError, ReportResult};

/// Split a format spec into writer name and raw option string
pub fn split_format_spec(spec: &str) -> (&str, Option<&str>) {
    match spec.split_once('=') {
        Some((name, args)) => (name, Some(args)),
        None => (spec, None),
    }
}

/// Read one token up to any of `terminators`, honoring `\x` escapes and
/// `'...'` quoting. Leading and trailing unquoted whitespace is dropped.
fn next_token<'a>(input: &'a str, terminators: &[char]) -> (String, &'a str) {
    let mut token = String::new();
    let mut trailing_ws = 0;
    let mut chars = input.char_indices().peekable();
    while let Some(&(_, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else {
            break;
        }
    }
    while let Some((pos, c)) = chars.next() {
        if terminators.contains(&c) {
            token.truncate(token.len() - trailing_ws);
            return (token, &input[pos..]);
        }
        match c {
            '\\' => {
                if let Some((_, escaped)) = chars.next() {
                    token.push(escaped);
                }
                trailing_ws = 0;
            }
            '\'' => {
                for (_, quoted) in chars.by_ref() {
                    if quoted == '\'' {
                        break;
                    }
                    token.push(quoted);
                }
                trailing_ws = 0;
            }
            c if c.is_whitespace() => {
                token.push(c);
                trailing_ws += c.len_utf8();
            }
            c => {
                token.push(c);
                trailing_ws = 0;
            }
        }
    }
    token.truncate(token.len() - trailing_ws);
    (token, "")
}

/// Parsed `key=value` pairs for one writer, consumed as options are applied
#[derive(Debug, Clone)]
pub struct OptionSet {
    writer: String,
    pairs: Vec<(String, String)>,
    used: Vec<bool>,
}

impl OptionSet {
    /// Parse the option string of `writer`
    pub fn parse(writer: &str, args: Option<&str>) -> ReportResult<Self> {
        let mut pairs = Vec::new();
        let mut rest = args.unwrap_or("");
        while !rest.is_empty() {
            let (key, after_key) = next_token(rest, &['=', ':']);
            let Some(after_eq) = after_key.strip_prefix('=') else {
                return Err(ReportError::invalid_option(
                    writer,
                    &key,
                    "",
                    "missing '=' after option name",
                ));
            };
            let (value, after_value) = next_token(after_eq, &[':']);
            pairs.push((key, value));
            rest = after_value.strip_prefix(':').unwrap_or(after_value);
        }
        let used = vec![false; pairs.len()];
        Ok(Self {
            writer: writer.to_string(),
            pairs,
            used,
        })
    }

    pub fn writer(&self) -> &str {
        &self.writer
    }

    /// Value for any of `names`, the last occurrence winning
    pub fn take_str(&mut self, names: &[&str]) -> Option<(String, String)> {
        let mut found = None;
        for (index, (key, value)) in self.pairs.iter().enumerate() {
            if names.contains(&key.as_str()) {
                self.used[index] = true;
                found = Some((key.clone(), value.clone()));
            }
        }
        found
    }

    pub fn take_string(&mut self, names: &[&str], default: &str) -> String {
        self.take_str(names)
            .map(|(_, value)| value)
            .unwrap_or_else(|| default.to_string())
    }

    pub fn take_bool(&mut self, names: &[&str], default: bool) -> ReportResult<bool> {
        match self.take_str(names) {
            None => Ok(default),
            Some((key, value)) => parse_bool(&value).ok_or_else(|| {
                ReportError::invalid_option(&self.writer, &key, &value, "expected a boolean")
            }),
        }
    }

    pub fn take_parsed<T>(&mut self, names: &[&str], default: T) -> ReportResult<T>
    where
        T: FromStr<Err = String>,
    {
        match self.take_str(names) {
            None => Ok(default),
            Some((key, value)) => value
                .parse()
                .map_err(|message| ReportError::invalid_option(&self.writer, &key, &value, message)),
        }
    }

    /// Single-character option value
    pub fn take_char(&mut self, names: &[&str], default: char, what: &str) -> ReportResult<char> {
        match self.take_str(names) {
            None => Ok(default),
            Some((key, value)) => {
                let mut chars = value.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Ok(c),
                    _ => Err(ReportError::invalid_option(
                        &self.writer,
                        &key,
                        &value,
                        format!(
                            "{} '{}' specified, but must contain a single character",
                            what, value
                        ),
                    )),
                }
            }
        }
    }

    /// Fail on the first option no one consumed
    pub fn finish(self) -> ReportResult<()> {
        match self.pairs.iter().zip(&self.used).find(|(_, used)| !**used) {
            Some(((key, value), _)) => Err(ReportError::invalid_option(
                &self.writer,
                key,
                value,
                "option not found",
            )),
            None => Ok(()),
        }
    }
}

/// Boolean spellings accepted for writer options
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "y" | "yes" | "on" | "enable" => Some(true),
        "0" | "false" | "n" | "no" | "off" | "disable" => Some(false),
        other => other.parse::<i64>().ok().map(|n| n != 0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_format_spec() {
        assert_eq!(split_format_spec("json"), ("json", None));
        assert_eq!(split_format_spec("compact=s=,:nk=1"), ("compact", Some("s=,:nk=1")));
    }

    #[test]
    fn test_parse_pairs_and_aliases() {
        let mut opts = OptionSet::parse("compact", Some("s=;:nokey=1")).unwrap();
        assert_eq!(opts.take_char(&["item_sep", "s"], '|', "Item separator").unwrap(), ';');
        assert!(opts.take_bool(&["nokey", "nk"], false).unwrap());
        assert!(opts.finish().is_ok());
    }

    #[test]
    fn test_escaped_and_quoted_values() {
        let mut opts = OptionSet::parse("compact", Some("s=\\::svr='a:b'")).unwrap();
        assert_eq!(opts.take_string(&["s"], "|"), ":");
        assert_eq!(opts.take_string(&["svr"], ""), "a:b");
    }

    #[test]
    fn test_last_occurrence_wins() {
        let mut opts = OptionSet::parse("flat", Some("h=0:hierarchical=1")).unwrap();
        assert!(opts.take_bool(&["hierarchical", "h"], false).unwrap());
    }

    #[test]
    fn test_unknown_option_rejected() {
        let opts = OptionSet::parse("json", Some("bogus=1")).unwrap();
        let err = opts.finish().unwrap_err();
        assert!(err.to_string().contains("'bogus'"));
        assert!(err.to_string().contains("writer 'json'"));
    }

    #[test]
    fn test_multi_char_separator_rejected() {
        let mut opts = OptionSet::parse("compact", Some("item_sep=ab")).unwrap();
        let err = opts
            .take_char(&["item_sep", "s"], '|', "Item separator")
            .unwrap_err();
        assert!(err
            .to_string()
            .contains("Item separator 'ab' specified, but must contain a single character"));
    }

    #[test]
    fn test_missing_equals() {
        assert!(OptionSet::parse("json", Some("compact")).is_err());
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("2"), Some(true));
        assert_eq!(parse_bool("maybe"), None);
    }
}
