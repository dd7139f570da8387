//! Report configuration
//!
//! Settings come from three layers, highest precedence first: command-line
//! overrides, a TOML file with a `[report]` table, and built-in defaults.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ReportError, ReportResult};
use crate::format::{OptionalFields, PresentationOptions, HashAlgorithm};
use crate::probe::ShowOptions;
use crate::section::filter::FilterTable;
use crate::utils::logging::parse_log_threshold;

/// Report settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Writer spec, `name[=key=value:...]`
    pub output_format: String,
    /// Entries expression, `section[=key,...][:section...]`
    pub show_entries: Option<String>,
    /// Append units to values
    pub unit: bool,
    /// Scale values with SI prefixes
    pub prefix: bool,
    /// Use binary prefixes for byte values
    pub byte_binary_prefix: bool,
    /// Print times as HH:MM:SS.MICROSECONDS
    pub sexagesimal: bool,
    /// Shorthand for unit, prefix, byte_binary_prefix and sexagesimal
    pub pretty: bool,
    /// always, never or auto
    pub show_optional_fields: OptionalFields,
    /// Print private codec and format options
    pub show_private_data: bool,
    /// Dump payloads as hex
    pub show_data: bool,
    /// Hash algorithm for data hashes, e.g. `SHA256`
    pub show_data_hash: Option<String>,
    /// Highest log level shown in frame logs, name or number
    pub show_log: Option<String>,
    /// Omit build-dependent fields
    pub bitexact: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_format: "default".to_string(),
            show_entries: None,
            unit: false,
            prefix: false,
            byte_binary_prefix: false,
            sexagesimal: false,
            pretty: false,
            show_optional_fields: OptionalFields::Auto,
            show_private_data: true,
            show_data: false,
            show_data_hash: None,
            show_log: None,
            bitexact: false,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    report: ReportConfig,
}

/// Values given on the command line; `None` keeps the lower layer
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub output_format: Option<String>,
    pub show_entries: Option<String>,
    pub unit: Option<bool>,
    pub prefix: Option<bool>,
    pub byte_binary_prefix: Option<bool>,
    pub sexagesimal: Option<bool>,
    pub pretty: Option<bool>,
    pub show_optional_fields: Option<OptionalFields>,
    pub show_private_data: Option<bool>,
    pub show_data: Option<bool>,
    pub show_data_hash: Option<String>,
    pub show_log: Option<String>,
    pub bitexact: Option<bool>,
}

impl ReportConfig {
    /// Parse the `[report]` table of a TOML document
    pub fn from_toml_str(text: &str) -> ReportResult<Self> {
        let file: ConfigFile = toml::from_str(text).map_err(|e| ReportError::Config {
            message: format!("Failed to parse TOML config: {}", e),
        })?;
        Ok(file.report)
    }

    pub fn load(path: &Path) -> ReportResult<Self> {
        if !path.exists() {
            return Err(ReportError::Config {
                message: format!("Config file does not exist: {}", path.display()),
            });
        }
        let text = fs::read_to_string(path).map_err(|e| ReportError::Config {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;
        info!("Loading configuration from: {}", path.display());
        Self::from_toml_str(&text)
    }

    /// Apply command-line values on top of this configuration
    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        fn apply<T>(slot: &mut T, value: Option<T>) {
            if let Some(value) = value {
                *slot = value;
            }
        }

        apply(&mut self.output_format, overrides.output_format);
        apply(&mut self.unit, overrides.unit);
        apply(&mut self.prefix, overrides.prefix);
        apply(&mut self.byte_binary_prefix, overrides.byte_binary_prefix);
        apply(&mut self.sexagesimal, overrides.sexagesimal);
        apply(&mut self.pretty, overrides.pretty);
        apply(&mut self.show_optional_fields, overrides.show_optional_fields);
        apply(&mut self.show_private_data, overrides.show_private_data);
        apply(&mut self.show_data, overrides.show_data);
        apply(&mut self.bitexact, overrides.bitexact);
        if overrides.show_entries.is_some() {
            self.show_entries = overrides.show_entries;
        }
        if overrides.show_data_hash.is_some() {
            self.show_data_hash = overrides.show_data_hash;
        }
        if overrides.show_log.is_some() {
            self.show_log = overrides.show_log;
        }
        debug!("Effective configuration: {:?}", self);
        self
    }

    pub fn presentation(&self) -> PresentationOptions {
        let pretty = self.pretty;
        PresentationOptions {
            show_value_unit: self.unit || pretty,
            use_value_prefix: self.prefix || pretty,
            use_byte_value_binary_prefix: self.byte_binary_prefix || pretty,
            use_value_sexagesimal_format: self.sexagesimal || pretty,
            show_optional_fields: self.show_optional_fields,
            show_private_data: self.show_private_data,
        }
    }

    /// Apply `show_entries` to `filter`
    pub fn apply_show_entries(&self, filter: &mut FilterTable) -> ReportResult<()> {
        match &self.show_entries {
            Some(expr) => filter.parse_show_entries(expr),
            None => Ok(()),
        }
    }

    pub fn digest(&self) -> ReportResult<Option<HashAlgorithm>> {
        self.show_data_hash
            .as_deref()
            .map(HashAlgorithm::from_name)
            .transpose()
    }

    pub fn log_threshold(&self) -> ReportResult<Option<i32>> {
        self.show_log
            .as_deref()
            .map(|level| parse_log_threshold(level).map_err(|message| ReportError::Config { message }))
            .transpose()
    }

    /// Derive what to emit from the filter, then check the combination
    pub fn show_options(&self, filter: &FilterTable) -> ReportResult<ShowOptions> {
        let opts = ShowOptions {
            log: self.log_threshold()?,
            show_data: self.show_data,
            bitexact: self.bitexact,
            ..ShowOptions::from_filter(filter)
        };
        if opts.bitexact && (opts.program_version || opts.library_versions) {
            return Err(ReportError::Config {
                message: "bitexact and show_program_version or show_library_versions options \
                          are incompatible"
                    .to_string(),
            });
        }
        Ok(opts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::section::SectionId;

    #[test]
    fn test_defaults() {
        let config = ReportConfig::default();
        assert_eq!(config.output_format, "default");
        assert!(config.show_private_data);
        assert_eq!(config.presentation(), PresentationOptions::default());
    }

    #[test]
    fn test_toml_report_table() {
        let config = ReportConfig::from_toml_str(
            r#"
            [report]
            output_format = "json=c=1"
            pretty = true
            show_optional_fields = "never"
            show_data_hash = "sha256"
            "#,
        )
        .unwrap();
        assert_eq!(config.output_format, "json=c=1");
        assert_eq!(config.show_optional_fields, OptionalFields::Never);
        assert_eq!(config.presentation(), PresentationOptions {
            show_optional_fields: OptionalFields::Never,
            ..PresentationOptions::pretty()
        });
        assert_eq!(config.digest().unwrap(), Some(HashAlgorithm::Sha256));
    }

    #[test]
    fn test_missing_table_uses_defaults() {
        let config = ReportConfig::from_toml_str("").unwrap();
        assert_eq!(config, ReportConfig::default());
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = ReportConfig::from_toml_str("[report\n").unwrap_err();
        assert!(matches!(err, ReportError::Config { .. }));
        assert!(err.is_config_error());
    }

    #[test]
    fn test_cli_overrides_file() {
        let file = ReportConfig {
            output_format: "xml".to_string(),
            unit: true,
            show_entries: Some("format".to_string()),
            ..ReportConfig::default()
        };
        let config = file.with_overrides(ConfigOverrides {
            output_format: Some("csv".to_string()),
            show_private_data: Some(false),
            ..ConfigOverrides::default()
        });
        assert_eq!(config.output_format, "csv");
        assert!(config.unit);
        assert!(!config.show_private_data);
        assert_eq!(config.show_entries.as_deref(), Some("format"));
    }

    #[test]
    fn test_bitexact_conflicts_with_versions() {
        let config = ReportConfig {
            bitexact: true,
            ..ReportConfig::default()
        };
        let mut filter = FilterTable::new();
        filter.mark_show_entries(SectionId::ProgramVersion, true, std::iter::empty::<&str>());
        let err = config.show_options(&filter).unwrap_err();
        assert!(err.to_string().contains("incompatible"));

        let mut filter = FilterTable::new();
        filter.mark_show_entries(SectionId::Format, true, std::iter::empty::<&str>());
        let opts = config.show_options(&filter).unwrap();
        assert!(opts.bitexact);
        assert!(opts.format);
    }

    #[test]
    fn test_unknown_digest_and_log_level() {
        let config = ReportConfig {
            show_data_hash: Some("MD5".to_string()),
            show_log: Some("noisy".to_string()),
            ..ReportConfig::default()
        };
        assert!(matches!(config.digest(), Err(ReportError::UnknownDigest { .. })));
        assert!(config.log_threshold().is_err());
    }
}
