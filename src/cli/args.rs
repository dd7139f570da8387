//! Command-line argument definitions

use std::path::PathBuf;

use clap::Args;

use crate::config::ConfigOverrides;
use crate::format::OptionalFields;
use crate::section::filter::FilterTable;
use crate::section::SectionId;

/// Arguments for the render command
#[derive(Args, Debug)]
pub struct RenderArgs {
    /// Media snapshot file (JSON, or TOML with a .toml extension)
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output file path (default: stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Configuration file with a [report] table
    #[arg(long, env = "PROBE_REPORT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Writer and its options, e.g. json=compact=1 or csv=p=0
    #[arg(long = "of", visible_alias = "output-format")]
    pub output_format: Option<String>,

    /// Entries to show, e.g. format=duration,size:stream=codec_name
    #[arg(long)]
    pub show_entries: Option<String>,

    /// Show container information
    #[arg(long)]
    pub show_format: bool,

    /// Show streams
    #[arg(long)]
    pub show_streams: bool,

    /// Show programs and their streams
    #[arg(long)]
    pub show_programs: bool,

    /// Show chapters
    #[arg(long)]
    pub show_chapters: bool,

    /// Show packets
    #[arg(long)]
    pub show_packets: bool,

    /// Show frames and subtitles
    #[arg(long)]
    pub show_frames: bool,

    /// Show the probing error, if any
    #[arg(long)]
    pub show_error: bool,

    /// Show program version
    #[arg(long)]
    pub show_program_version: bool,

    /// Show library versions
    #[arg(long)]
    pub show_library_versions: bool,

    /// Show program and library versions
    #[arg(long)]
    pub show_versions: bool,

    /// Show pixel format descriptors
    #[arg(long)]
    pub show_pixel_formats: bool,

    /// Show frame logs up to this level (name or number)
    #[arg(long)]
    pub show_log: Option<String>,

    /// Dump packet payloads and extradata
    #[arg(long)]
    pub show_data: bool,

    /// Hash packet payloads and extradata with this algorithm
    #[arg(long)]
    pub show_data_hash: Option<String>,

    /// Show optional fields: always, never or auto
    #[arg(long)]
    pub show_optional_fields: Option<OptionalFields>,

    /// Append units to values
    #[arg(long)]
    pub unit: bool,

    /// Use SI prefixes
    #[arg(long)]
    pub prefix: bool,

    /// Use binary prefixes for byte values
    #[arg(long)]
    pub byte_binary_prefix: bool,

    /// Print times as HH:MM:SS.MICROSECONDS
    #[arg(long)]
    pub sexagesimal: bool,

    /// Units, prefixes and sexagesimal times
    #[arg(long)]
    pub pretty: bool,

    /// Hide private codec and format options
    #[arg(long)]
    pub no_private: bool,

    /// Omit build-dependent fields
    #[arg(long)]
    pub bitexact: bool,
}

impl RenderArgs {
    /// Command-line values that override the configuration file
    pub fn overrides(&self) -> ConfigOverrides {
        let flag = |set: bool| set.then_some(true);
        ConfigOverrides {
            output_format: self.output_format.clone(),
            show_entries: self.show_entries.clone(),
            unit: flag(self.unit),
            prefix: flag(self.prefix),
            byte_binary_prefix: flag(self.byte_binary_prefix),
            sexagesimal: flag(self.sexagesimal),
            pretty: flag(self.pretty),
            show_optional_fields: self.show_optional_fields,
            show_private_data: self.no_private.then_some(false),
            show_data: flag(self.show_data),
            show_data_hash: self.show_data_hash.clone(),
            show_log: self.show_log.clone(),
            bitexact: flag(self.bitexact),
        }
    }

    /// Sections selected by the `--show-*` switches
    pub fn selected_sections(&self) -> Vec<SectionId> {
        let switches = [
            (self.show_format, &[SectionId::Format][..]),
            (self.show_streams, &[SectionId::Stream][..]),
            (self.show_programs, &[SectionId::Program][..]),
            (self.show_chapters, &[SectionId::Chapter][..]),
            (self.show_packets, &[SectionId::Packet][..]),
            (self.show_frames, &[SectionId::Frame, SectionId::Subtitle][..]),
            (self.show_error, &[SectionId::Error][..]),
            (
                self.show_program_version || self.show_versions,
                &[SectionId::ProgramVersion][..],
            ),
            (
                self.show_library_versions || self.show_versions,
                &[SectionId::LibraryVersions][..],
            ),
            (self.show_pixel_formats, &[SectionId::PixelFormats][..]),
        ];
        switches
            .iter()
            .filter(|(enabled, _)| *enabled)
            .flat_map(|(_, sections)| sections.iter().copied())
            .collect()
    }

    /// Mark every section selected by a `--show-*` switch
    pub fn mark_sections(&self, filter: &mut FilterTable) {
        for section in self.selected_sections() {
            filter.mark_show_entries(section, true, std::iter::empty::<&str>());
        }
    }
}
