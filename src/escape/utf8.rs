//! UTF-8 validation with a configurable policy for invalid input

use std::borrow::Cow;
use std::str::FromStr;

use crate::error::{ReportError, ReportResult};

/// Default placeholder for invalid sequences
pub const DEFAULT_REPLACEMENT: &str = "\u{FFFD}";

/// What to do with invalid UTF-8 in string fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StringValidation {
    /// Abort the report
    Fail,
    /// Substitute the replacement string for each invalid run
    #[default]
    Replace,
    /// Drop the invalid bytes
    Ignore,
}

impl FromStr for StringValidation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fail" | "0" => Ok(StringValidation::Fail),
            "replace" | "1" => Ok(StringValidation::Replace),
            "ignore" | "2" => Ok(StringValidation::Ignore),
            other => Err(format!(
                "unknown string validation mode '{}', expected ignore, replace or fail",
                other
            )),
        }
    }
}

/// Result of a successful validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validated<'a> {
    pub text: Cow<'a, str>,
    /// Number of maximal invalid byte runs found
    pub invalid_runs: usize,
}

/// Input contained invalid UTF-8 under the fail policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidUtf8 {
    pub invalid_runs: usize,
}

/// UTF-8 checker applied to string fields before backend escaping
#[derive(Debug, Clone)]
pub struct StringValidator {
    policy: StringValidation,
    replacement: String,
    exclude_xml_controls: bool,
}

impl Default for StringValidator {
    fn default() -> Self {
        Self {
            policy: StringValidation::default(),
            replacement: DEFAULT_REPLACEMENT.to_string(),
            exclude_xml_controls: false,
        }
    }
}

enum Decoded {
    Char(char, usize),
    Invalid(usize),
}

/// Smallest code point allowed for each continuation-byte count
const OVERLONG_MINIMUMS: [u64; 6] = [0x0, 0x80, 0x800, 0x1_0000, 0x20_0000, 0x400_0000];

/// Decode the code point at the start of `bytes` (never empty).
///
/// A bad lead byte, a truncated sequence or a non-continuation byte inside
/// a sequence consume only the lead byte. Overlong forms, surrogates, code
/// points above U+10FFFF, the non-characters U+FFFE/U+FFFF and, when
/// `exclude_xml_controls` is set, control codes other than tab, LF and CR
/// consume the whole sequence.
fn decode_one(bytes: &[u8], exclude_xml_controls: bool) -> Decoded {
    let lead = bytes[0];
    if lead & 0xC0 == 0x80 || lead >= 0xFE {
        return Decoded::Invalid(1);
    }

    let mut code = u64::from(lead);
    let mut top: u64 = (code & 0x80) >> 1;
    let mut len = 1;
    while code & top != 0 {
        match bytes.get(len) {
            Some(&b) if b & 0xC0 == 0x80 => {
                code = (code << 6) + u64::from(b - 0x80);
                top <<= 5;
                len += 1;
            }
            _ => return Decoded::Invalid(1),
        }
    }
    code &= (top << 1).wrapping_sub(1);

    let invalid = code < OVERLONG_MINIMUMS[len - 1]
        || code > 0x10FFFF
        || (0xD800..=0xDFFF).contains(&code)
        || code == 0xFFFE
        || code == 0xFFFF
        || (exclude_xml_controls && code < 0x20 && !matches!(code, 0x9 | 0xA | 0xD));
    if invalid {
        return Decoded::Invalid(len);
    }
    match char::from_u32(code as u32) {
        Some(c) => Decoded::Char(c, len),
        None => Decoded::Invalid(len),
    }
}

impl StringValidator {
    /// Build a validator, rejecting a replacement that is itself invalid
    pub fn new(policy: StringValidation, replacement: &str) -> ReportResult<Self> {
        let validator = Self {
            policy,
            replacement: replacement.to_string(),
            exclude_xml_controls: false,
        };
        if validator.count_invalid_runs(replacement.as_bytes()) > 0 {
            return Err(ReportError::InvalidReplacement {
                replacement: replacement.to_string(),
            });
        }
        Ok(validator)
    }

    /// Also reject control codes not allowed in XML 1.0
    pub fn exclude_xml_controls(mut self, exclude: bool) -> Self {
        self.exclude_xml_controls = exclude;
        self
    }

    pub fn policy(&self) -> StringValidation {
        self.policy
    }

    pub fn replacement(&self) -> &str {
        &self.replacement
    }

    fn count_invalid_runs(&self, input: &[u8]) -> usize {
        let mut runs = 0;
        let mut in_run = false;
        let mut pos = 0;
        while pos < input.len() {
            match decode_one(&input[pos..], self.exclude_xml_controls) {
                Decoded::Char(_, len) => {
                    in_run = false;
                    pos += len;
                }
                Decoded::Invalid(len) => {
                    if !in_run {
                        runs += 1;
                        in_run = true;
                    }
                    pos += len;
                }
            }
        }
        runs
    }

    /// Validate `input` according to the configured policy.
    ///
    /// Adjacent invalid sequences form one maximal run: `Replace` emits a
    /// single replacement per run and `Ignore` drops the run. Valid input is
    /// returned borrowed.
    pub fn validate<'a>(&self, input: &'a [u8]) -> Result<Validated<'a>, InvalidUtf8> {
        let mut out = String::with_capacity(input.len());
        let mut runs = 0;
        let mut in_run = false;
        let mut pos = 0;
        while pos < input.len() {
            match decode_one(&input[pos..], self.exclude_xml_controls) {
                Decoded::Char(c, len) => {
                    in_run = false;
                    out.push(c);
                    pos += len;
                }
                Decoded::Invalid(len) => {
                    if !in_run {
                        runs += 1;
                        in_run = true;
                        if self.policy == StringValidation::Replace {
                            out.push_str(&self.replacement);
                        }
                    }
                    pos += len;
                }
            }
        }

        if runs == 0 {
            return Ok(Validated {
                text: String::from_utf8_lossy(input),
                invalid_runs: 0,
            });
        }
        match self.policy {
            StringValidation::Fail => Err(InvalidUtf8 { invalid_runs: runs }),
            StringValidation::Replace | StringValidation::Ignore => Ok(Validated {
                text: Cow::Owned(out),
                invalid_runs: runs,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator(policy: StringValidation) -> StringValidator {
        StringValidator::new(policy, DEFAULT_REPLACEMENT).unwrap()
    }

    #[test]
    fn test_valid_input_is_borrowed() {
        let v = validator(StringValidation::Replace);
        let out = v.validate("héllo wörld".as_bytes()).unwrap();
        assert!(matches!(out.text, Cow::Borrowed("héllo wörld")));
        assert_eq!(out.invalid_runs, 0);
    }

    #[test]
    fn test_replace_one_placeholder_per_run() {
        let v = validator(StringValidation::Replace);
        let out = v.validate(b"ab\x80\x80\xffcd\xc3").unwrap();
        assert_eq!(out.text, "ab\u{FFFD}cd\u{FFFD}");
        assert_eq!(out.invalid_runs, 2);
    }

    #[test]
    fn test_custom_replacement() {
        let v = StringValidator::new(StringValidation::Replace, "?").unwrap();
        let out = v.validate(b"a\xe2\x28\xa1b").unwrap();
        assert_eq!(out.text, "a?(?b");
        assert_eq!(out.invalid_runs, 2);
    }

    #[test]
    fn test_ignore_drops_invalid_bytes() {
        let v = validator(StringValidation::Ignore);
        let out = v.validate(b"ab\x80cd").unwrap();
        assert_eq!(out.text, "abcd");
        assert_eq!(out.invalid_runs, 1);
    }

    #[test]
    fn test_fail_reports_runs() {
        let v = validator(StringValidation::Fail);
        assert_eq!(v.validate(b"\x80ok\x80").unwrap_err(), InvalidUtf8 { invalid_runs: 2 });
        assert!(v.validate(b"ok").is_ok());
    }

    #[test]
    fn test_rejects_overlong_surrogate_and_noncharacters() {
        let v = validator(StringValidation::Fail);
        assert!(v.validate(b"\xc0\xaf").is_err());
        assert!(v.validate(b"\xed\xa0\x80").is_err());
        assert!(v.validate(b"\xef\xbf\xbf").is_err());
        assert!(v.validate(b"\xf4\x90\x80\x80").is_err());
        assert!(v.validate("\u{10FFFD}".as_bytes()).is_ok());
    }

    #[test]
    fn test_xml_control_codes() {
        let plain = validator(StringValidation::Fail);
        assert!(plain.validate(b"a\x01b").is_ok());
        let xml = validator(StringValidation::Fail).exclude_xml_controls(true);
        assert!(xml.validate(b"a\x01b").is_err());
        assert!(xml.validate(b"a\tb\nc\rd").is_ok());
    }

    #[test]
    fn test_invalid_replacement_rejected() {
        assert!(matches!(
            StringValidator::new(StringValidation::Replace, "\u{FFFF}"),
            Err(ReportError::InvalidReplacement { .. })
        ));
        assert!(StringValidator::new(StringValidation::Replace, "").is_ok());
    }

    #[test]
    fn test_policy_parse() {
        assert_eq!("fail".parse::<StringValidation>().unwrap(), StringValidation::Fail);
        assert_eq!("2".parse::<StringValidation>().unwrap(), StringValidation::Ignore);
        assert!("strict".parse::<StringValidation>().is_err());
    }
}
