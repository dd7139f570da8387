//! Value formatting helpers
//!
//! Pure functions turning raw probe values into display strings according to
//! the global presentation options.

use std::fmt::Write as _;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub mod digest;

pub use digest::{format_digest, DigestProvider, HashAlgorithm};

/// Sentinel for "no timestamp"
pub const NOPTS_VALUE: i64 = i64::MIN;

/// Rational number, used for time bases and frame rates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rational {
    pub num: i32,
    pub den: i32,
}

impl Rational {
    pub const fn new(num: i32, den: i32) -> Self {
        Self { num, den }
    }

    /// Microsecond time base used for container-level times
    pub const fn time_base_us() -> Self {
        Self::new(1, 1_000_000)
    }

    pub fn to_f64(self) -> f64 {
        f64::from(self.num) / f64::from(self.den)
    }
}

/// When optional fields are displayed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionalFields {
    Always,
    Never,
    /// Only on backends that display optional fields
    #[default]
    Auto,
}

impl FromStr for OptionalFields {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "always" | "1" => Ok(OptionalFields::Always),
            "never" | "0" => Ok(OptionalFields::Never),
            "auto" | "-1" => Ok(OptionalFields::Auto),
            other => Err(format!(
                "invalid show_optional_fields value '{}', expected always, never or auto",
                other
            )),
        }
    }
}

/// Global presentation flags
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresentationOptions {
    pub show_value_unit: bool,
    pub use_value_prefix: bool,
    pub use_byte_value_binary_prefix: bool,
    pub use_value_sexagesimal_format: bool,
    pub show_optional_fields: OptionalFields,
    pub show_private_data: bool,
}

impl Default for PresentationOptions {
    fn default() -> Self {
        Self {
            show_value_unit: false,
            use_value_prefix: false,
            use_byte_value_binary_prefix: false,
            use_value_sexagesimal_format: false,
            show_optional_fields: OptionalFields::Auto,
            show_private_data: true,
        }
    }
}

impl PresentationOptions {
    /// Units, prefixes, binary byte prefixes and sexagesimal times
    pub fn pretty() -> Self {
        Self {
            show_value_unit: true,
            use_value_prefix: true,
            use_byte_value_binary_prefix: true,
            use_value_sexagesimal_format: true,
            ..Self::default()
        }
    }
}

/// A quantity tagged with its unit
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UnitValue {
    Seconds(f64),
    Hertz(i64),
    Bytes(i64),
    BitRate(i64),
}

impl UnitValue {
    pub fn unit(&self) -> &'static str {
        match self {
            UnitValue::Seconds(_) => "s",
            UnitValue::Hertz(_) => "Hz",
            UnitValue::Bytes(_) => "byte",
            UnitValue::BitRate(_) => "bit/s",
        }
    }
}

struct SiPrefix {
    bin_val: f64,
    dec_val: f64,
    bin_str: &'static str,
    dec_str: &'static str,
}

const SI_PREFIXES: [SiPrefix; 6] = [
    SiPrefix { bin_val: 1.0, dec_val: 1.0, bin_str: "", dec_str: "" },
    SiPrefix { bin_val: 1.024e3, dec_val: 1e3, bin_str: "Ki", dec_str: "K" },
    SiPrefix { bin_val: 1.048576e6, dec_val: 1e6, bin_str: "Mi", dec_str: "M" },
    SiPrefix { bin_val: 1.073741824e9, dec_val: 1e9, bin_str: "Gi", dec_str: "G" },
    SiPrefix { bin_val: 1.099511627776e12, dec_val: 1e12, bin_str: "Ti", dec_str: "T" },
    SiPrefix { bin_val: 1.125899906842624e15, dec_val: 1e15, bin_str: "Pi", dec_str: "P" },
];

fn prefix_index(log: f64, per_step: f64) -> usize {
    let index = (log.trunc() as i64) / per_step as i64;
    index.clamp(0, SI_PREFIXES.len() as i64 - 1) as usize
}

/// Render a quantity with optional prefix, unit suffix and sexagesimal time
pub fn format_value(value: UnitValue, opts: &PresentationOptions) -> String {
    let (mut vald, mut vali, show_float) = match value {
        UnitValue::Seconds(d) => (d, d as i64, true),
        UnitValue::Hertz(i) | UnitValue::Bytes(i) | UnitValue::BitRate(i) => (i as f64, i, false),
    };

    if let UnitValue::Seconds(secs) = value {
        if opts.use_value_sexagesimal_format {
            let total_mins = secs as i32 / 60;
            let secs = secs - f64::from(total_mins) * 60.0;
            let hours = total_mins / 60;
            let mins = total_mins % 60;
            return format!("{}:{:02}:{:09.6}", hours, mins, secs);
        }
    }

    let mut prefix = "";
    if opts.use_value_prefix && vald > 1.0 {
        let (divisor, name) =
            if matches!(value, UnitValue::Bytes(_)) && opts.use_byte_value_binary_prefix {
                let entry = &SI_PREFIXES[prefix_index(vald.log2(), 10.0)];
                (entry.bin_val, entry.bin_str)
            } else {
                let entry = &SI_PREFIXES[prefix_index(vald.log10(), 3.0)];
                (entry.dec_val, entry.dec_str)
            };
        vald /= divisor;
        prefix = name;
        vali = vald as i64;
    }

    let mut out = if show_float || (opts.use_value_prefix && vald != (vald as i64) as f64) {
        format!("{:.6}", vald)
    } else {
        vali.to_string()
    };

    if !prefix.is_empty() || opts.show_value_unit {
        out.push(' ');
    }
    out.push_str(prefix);
    if opts.show_value_unit {
        out.push_str(value.unit());
    }
    out
}

/// Timestamp scaled by `time_base` and rendered as seconds.
///
/// `None` means the value is unavailable: the sentinel for a timestamp, or
/// zero for a duration. Callers print it as an optional `N/A`.
pub fn format_time(
    ts: i64,
    time_base: Rational,
    is_duration: bool,
    opts: &PresentationOptions,
) -> Option<String> {
    if is_unset(ts, is_duration) {
        return None;
    }
    let secs = ts as f64 * time_base.to_f64();
    Some(format_value(UnitValue::Seconds(secs), opts))
}

/// Whether a raw timestamp or duration should display as `N/A`
pub fn is_unset(ts: i64, is_duration: bool) -> bool {
    (!is_duration && ts == NOPTS_VALUE) || (is_duration && ts == 0)
}

pub fn format_rational(num: i32, den: i32, sep: char) -> String {
    format!("{}{}{}", num, sep, den)
}

/// Classic hex+ASCII dump, 16 bytes per row, preceded by a newline
pub fn format_hexdump(data: &[u8]) -> String {
    let mut out = String::from("\n");
    for (row, chunk) in data.chunks(16).enumerate() {
        let _ = write!(out, "{:08x}: ", row * 16);
        for (i, byte) in chunk.iter().enumerate() {
            let _ = write!(out, "{:02x}", byte);
            if i & 1 == 1 {
                out.push(' ');
            }
        }
        let i = chunk.len();
        out.extend(std::iter::repeat(' ').take(41 - 2 * i - i / 2));
        out.extend(chunk.iter().map(|&b| {
            if (32..127).contains(&b) {
                b as char
            } else {
                '.'
            }
        }));
        out.push('\n');
    }
    out
}

/// Offset-prefixed dump of integers, `columns` per row, each right-aligned
/// to `width` after a leading space
pub fn format_integers(values: &[i32], columns: usize, width: usize, offset_add: usize) -> String {
    let mut out = String::from("\n");
    for (row, chunk) in values.chunks(columns.max(1)).enumerate() {
        let _ = write!(out, "{:08x}: ", row * offset_add);
        for value in chunk {
            let _ = write!(out, " {:>width$}", value, width = width);
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts() -> PresentationOptions {
        PresentationOptions::default()
    }

    #[test]
    fn test_plain_values() {
        assert_eq!(format_value(UnitValue::Seconds(1.5), &opts()), "1.500000");
        assert_eq!(format_value(UnitValue::Bytes(1536), &opts()), "1536");
        assert_eq!(format_value(UnitValue::Hertz(48000), &opts()), "48000");
    }

    #[test]
    fn test_units_and_prefixes() {
        let mut o = opts();
        o.show_value_unit = true;
        assert_eq!(format_value(UnitValue::Hertz(48000), &o), "48000 Hz");
        o.use_value_prefix = true;
        assert_eq!(format_value(UnitValue::Hertz(48000), &o), "48 KHz");
        assert_eq!(format_value(UnitValue::BitRate(1_500_000), &o), "1.500000 Mbit/s");
        assert_eq!(format_value(UnitValue::Bytes(1536), &o), "1.536000 Kbyte");
        o.use_byte_value_binary_prefix = true;
        assert_eq!(format_value(UnitValue::Bytes(1536), &o), "1.500000 Kibyte");
        assert_eq!(format_value(UnitValue::Bytes(1), &o), "1 byte");
    }

    #[test]
    fn test_prefix_without_unit() {
        let mut o = opts();
        o.use_value_prefix = true;
        assert_eq!(format_value(UnitValue::BitRate(2_000_000), &o), "2 M");
        assert_eq!(format_value(UnitValue::BitRate(999), &o), "999");
    }

    #[test]
    fn test_sexagesimal() {
        let mut o = opts();
        o.use_value_sexagesimal_format = true;
        assert_eq!(format_value(UnitValue::Seconds(3723.5), &o), "1:02:03.500000");
        assert_eq!(format_value(UnitValue::Seconds(0.04), &o), "0:00:00.040000");
    }

    #[test]
    fn test_pretty_preset() {
        let o = PresentationOptions::pretty();
        assert_eq!(format_value(UnitValue::Seconds(10.0), &o), "0:00:10.000000");
        assert_eq!(format_value(UnitValue::Bytes(2048), &o), "2 Kibyte");
    }

    #[test]
    fn test_format_time() {
        let tb = Rational::new(1, 1000);
        assert_eq!(format_time(1500, tb, false, &opts()).as_deref(), Some("1.500000"));
        assert_eq!(format_time(NOPTS_VALUE, tb, false, &opts()), None);
        assert_eq!(format_time(0, tb, true, &opts()), None);
        assert_eq!(format_time(0, tb, false, &opts()).as_deref(), Some("0.000000"));
    }

    #[test]
    fn test_format_rational() {
        assert_eq!(format_rational(30000, 1001, '/'), "30000/1001");
        assert_eq!(format_rational(16, 9, ':'), "16:9");
    }

    #[test]
    fn test_hexdump() {
        let dump = format_hexdump(b"ABC\x00");
        assert_eq!(dump, format!("\n00000000: 4142 4300{}ABC.\n", " ".repeat(32)));

        let data: Vec<u8> = (0x41..0x41 + 17).collect();
        let dump = format_hexdump(&data);
        let lines: Vec<&str> = dump.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[1],
            "00000000: 4142 4344 4546 4748 494a 4b4c 4d4e 4f50  ABCDEFGHIJKLMNOP"
        );
        assert!(lines[2].starts_with("00000010: 51"));
        assert!(lines[2].ends_with("Q"));
    }

    #[test]
    fn test_integers_dump() {
        let matrix = [65536, 0, 0, 0, 65536, 0, 0, 0, 1073741824];
        let dump = format_integers(&matrix, 3, 11, 1);
        let lines: Vec<&str> = dump.lines().collect();
        assert_eq!(lines[0], "");
        assert_eq!(lines[1], "00000000:        65536           0           0");
        assert_eq!(lines[3], "00000002:            0           0  1073741824");
    }

    #[test]
    fn test_optional_fields_parse() {
        assert_eq!("never".parse::<OptionalFields>().unwrap(), OptionalFields::Never);
        assert_eq!("-1".parse::<OptionalFields>().unwrap(), OptionalFields::Auto);
        assert!("sometimes".parse::<OptionalFields>().is_err());
    }
}
