//! Entries-to-show filter
//!
//! Per-section inclusion state, built once before a report starts and owned
//! by the writer for the rest of the run.

use std::collections::BTreeSet;

use tracing::debug;

use super::{SectionId, SECTIONS};
use crate::error::{ReportError, ReportResult};

#[derive(Debug, Clone, Default)]
struct SectionFilter {
    show_all: bool,
    entries: BTreeSet<String>,
}

/// Which keys of which sections get emitted
#[derive(Debug, Clone)]
pub struct FilterTable {
    sections: Vec<SectionFilter>,
}

impl Default for FilterTable {
    fn default() -> Self {
        Self::new()
    }
}

impl FilterTable {
    /// Table where nothing is shown
    pub fn new() -> Self {
        Self {
            sections: vec![SectionFilter::default(); SECTIONS.len()],
        }
    }

    /// Table where every key of every section is shown
    pub fn show_all() -> Self {
        let mut table = Self::new();
        table.mark_show_entries(SectionId::Root, true, std::iter::empty::<&str>());
        table
    }

    /// Mark `section` for output.
    ///
    /// With `show_all` every descendant is marked show-all as well, overriding
    /// any allow-list already set there. Otherwise `keys` are added to the
    /// section's allow-list and its show-all flag is cleared; descendants are
    /// left untouched.
    pub fn mark_show_entries<I, K>(&mut self, section: SectionId, show_all: bool, keys: I)
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        if show_all {
            self.mark_show_all(section);
        } else {
            let filter = &mut self.sections[section.index()];
            filter.show_all = false;
            filter.entries.extend(keys.into_iter().map(Into::into));
        }
    }

    fn mark_show_all(&mut self, section: SectionId) {
        self.sections[section.index()].show_all = true;
        for &child in section.def().children {
            self.mark_show_all(child);
        }
    }

    /// Sections whose name or unique name equals `name`
    pub fn resolve_section(name: &str) -> Vec<SectionId> {
        SECTIONS
            .iter()
            .filter(|def| def.name == name || def.unique_name == Some(name))
            .map(|def| def.id)
            .collect()
    }

    /// Whether `key` in `section` is emitted
    pub fn should_emit(&self, section: SectionId, key: &str) -> bool {
        let filter = &self.sections[section.index()];
        filter.show_all || filter.entries.contains(key)
    }

    pub fn is_show_all(&self, section: SectionId) -> bool {
        self.sections[section.index()].show_all
    }

    /// True when the section or any descendant wants some output
    pub fn wants_output(&self, section: SectionId) -> bool {
        let filter = &self.sections[section.index()];
        if filter.show_all || !filter.entries.is_empty() {
            return true;
        }
        section
            .def()
            .children
            .iter()
            .any(|&child| self.wants_output(child))
    }

    /// Apply a `SECTION[=k1,k2,...][:SECTION...]` expression.
    ///
    /// A bare section name selects every key of that section and its
    /// descendants. Names are matched against both `name` and `unique_name`
    /// and may select several sections at once.
    pub fn parse_show_entries(&mut self, expr: &str) -> ReportResult<()> {
        let mut rest = expr;
        while !rest.is_empty() {
            let end = rest.find(&['=', ':'][..]).unwrap_or(rest.len());
            let name = rest[..end].trim();
            rest = &rest[end..];

            if name.is_empty() {
                return Err(ReportError::InvalidShowEntries {
                    expr: expr.to_string(),
                    message: "missing section name".to_string(),
                });
            }

            let mut keys = Vec::new();
            let show_all = match rest.strip_prefix('=') {
                Some(after) => {
                    let end = after.find(':').unwrap_or(after.len());
                    keys.extend(
                        after[..end]
                            .split(',')
                            .map(str::trim)
                            .filter(|key| !key.is_empty())
                            .map(str::to_string),
                    );
                    rest = &after[end..];
                    false
                }
                None => true,
            };

            let matches = Self::resolve_section(name);
            if matches.is_empty() {
                return Err(ReportError::UnknownSection {
                    name: name.to_string(),
                });
            }
            for id in matches {
                debug!(
                    "'{}' matches section with unique name '{}'",
                    name,
                    id.def().display_name()
                );
                self.mark_show_entries(id, show_all, keys.iter().cloned());
            }

            rest = rest.strip_prefix(':').unwrap_or(rest);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_table_hides_everything() {
        let table = FilterTable::new();
        assert!(!table.should_emit(SectionId::Format, "duration"));
        assert!(!table.wants_output(SectionId::Root));
    }

    #[test]
    fn test_show_all_recurses() {
        let mut table = FilterTable::new();
        table.mark_show_entries(SectionId::Stream, false, ["index"]);
        table.mark_show_entries(SectionId::Streams, true, Vec::<String>::new());
        assert!(table.should_emit(SectionId::Stream, "codec_name"));
        assert!(table.should_emit(SectionId::StreamTags, "language"));
        assert!(!table.should_emit(SectionId::Format, "duration"));
    }

    #[test]
    fn test_allow_list_does_not_recurse() {
        let mut table = FilterTable::new();
        table.mark_show_entries(SectionId::Stream, false, ["index"]);
        assert!(table.should_emit(SectionId::Stream, "index"));
        assert!(!table.should_emit(SectionId::Stream, "codec_name"));
        assert!(!table.should_emit(SectionId::StreamTags, "index"));
        assert!(table.wants_output(SectionId::Streams));
        assert!(!table.wants_output(SectionId::Format));
    }

    #[test]
    fn test_allow_list_accumulates_keys() {
        let mut table = FilterTable::new();
        table.mark_show_entries(SectionId::Format, false, ["duration"]);
        table.mark_show_entries(SectionId::Format, false, ["size"]);
        assert!(table.should_emit(SectionId::Format, "duration"));
        assert!(table.should_emit(SectionId::Format, "size"));
        assert!(!table.should_emit(SectionId::Format, "bit_rate"));
    }

    #[test]
    fn test_resolve_by_name_and_unique_name() {
        let tags = FilterTable::resolve_section("tags");
        assert!(tags.contains(&SectionId::FormatTags));
        assert!(tags.contains(&SectionId::StreamTags));
        assert_eq!(FilterTable::resolve_section("stream_tags"), vec![SectionId::StreamTags]);
        assert!(FilterTable::resolve_section("nope").is_empty());
    }

    #[test]
    fn test_parse_show_entries() {
        let mut table = FilterTable::new();
        table
            .parse_show_entries("format=duration,size:stream_tags:stream=index")
            .unwrap();
        assert!(table.should_emit(SectionId::Format, "duration"));
        assert!(table.should_emit(SectionId::Format, "size"));
        assert!(!table.should_emit(SectionId::Format, "bit_rate"));
        assert!(table.is_show_all(SectionId::StreamTags));
        assert!(!table.is_show_all(SectionId::FormatTags));
        assert!(table.should_emit(SectionId::Stream, "index"));
        assert!(table.should_emit(SectionId::ProgramStream, "index"));
    }

    #[test]
    fn test_parse_show_entries_unknown_section() {
        let mut table = FilterTable::new();
        let err = table.parse_show_entries("format:bogus").unwrap_err();
        assert_eq!(err.to_string(), "No match for section 'bogus'");
    }

    #[test]
    fn test_parse_show_entries_missing_name() {
        let mut table = FilterTable::new();
        assert!(matches!(
            table.parse_show_entries("=a"),
            Err(ReportError::InvalidShowEntries { .. })
        ));
    }
}
