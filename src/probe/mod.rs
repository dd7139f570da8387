//! Media snapshot model and report emitters
//!
//! A [`MediaSnapshot`] is what a prober found in one input: container,
//! streams, programs, chapters, packets, frames and version information.
//! The emitters in [`emit`] replay it through a
//! [`ReportWriter`](crate::writer::ReportWriter).

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ReportError, ReportResult};
use crate::format::Rational;

pub mod emit;

pub use emit::{probe_report, ShowOptions};

/// Text that may not be valid UTF-8, given either as a string or raw bytes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawString {
    Text(String),
    Bytes(Vec<u8>),
}

impl RawString {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            RawString::Text(text) => text.as_bytes(),
            RawString::Bytes(bytes) => bytes,
        }
    }
}

impl Default for RawString {
    fn default() -> Self {
        RawString::Text(String::new())
    }
}

impl From<&str> for RawString {
    fn from(text: &str) -> Self {
        RawString::Text(text.to_string())
    }
}

/// Metadata dictionary, printed in key order
pub type Tags = BTreeMap<String, RawString>;

/// Media type of a stream or frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Video,
    Audio,
    Data,
    Subtitle,
    Attachment,
}

impl MediaType {
    pub fn name(self) -> &'static str {
        match self {
            MediaType::Video => "video",
            MediaType::Audio => "audio",
            MediaType::Data => "data",
            MediaType::Subtitle => "subtitle",
            MediaType::Attachment => "attachment",
        }
    }
}

/// Everything known about one probed input
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaSnapshot {
    /// Version of the program that produced the snapshot
    pub program_version: Option<ProgramVersion>,
    /// Libraries linked into that program
    pub library_versions: Vec<LibraryVersion>,
    /// Known pixel format descriptors
    pub pixel_formats: Vec<PixelFormatInfo>,
    /// Container information
    pub format: Option<FormatInfo>,
    pub streams: Vec<StreamInfo>,
    pub programs: Vec<ProgramInfo>,
    pub chapters: Vec<ChapterInfo>,
    /// Demuxed packets in read order
    pub packets: Vec<PacketInfo>,
    /// Decoded audio and video frames in decode order
    pub frames: Vec<FrameInfo>,
    /// Decoded subtitles
    pub subtitles: Vec<SubtitleInfo>,
    /// Failure that stopped probing, if any
    pub error: Option<ErrorInfo>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgramVersion {
    pub version: String,
    pub copyright: String,
    pub compiler_ident: String,
    pub configuration: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryVersion {
    /// Library name, e.g. `libavformat`
    pub name: String,
    pub major: u32,
    pub minor: u32,
    pub micro: u32,
    pub ident: String,
}

impl LibraryVersion {
    /// Packed `major << 16 | minor << 8 | micro`
    pub fn packed(&self) -> i64 {
        (i64::from(self.major) << 16) | (i64::from(self.minor) << 8) | i64::from(self.micro)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PixelFormatInfo {
    pub name: String,
    pub nb_components: u32,
    /// Chroma subsampling shifts, absent for RGB and formats with fewer than
    /// three components
    pub log2_chroma_w: Option<u32>,
    pub log2_chroma_h: Option<u32>,
    pub bits_per_pixel: Option<u32>,
    /// Set flags among big_endian, palette, bitstream, hwaccel, planar, rgb
    /// and alpha
    pub flags: Vec<String>,
    /// Bit depth of each component
    pub component_depths: Vec<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatInfo {
    pub filename: RawString,
    pub nb_stream_groups: u32,
    pub format_name: String,
    pub format_long_name: Option<String>,
    /// Start time in microseconds
    pub start_time: Option<i64>,
    /// Duration in microseconds
    pub duration: Option<i64>,
    /// Input size in bytes
    pub size: Option<i64>,
    pub bit_rate: Option<i64>,
    pub probe_score: i32,
    pub tags: Tags,
}

/// Video parameters of a stream
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoParams {
    pub width: i64,
    pub height: i64,
    /// Decoder-side values, present only when a decoder was opened
    pub coded_width: Option<i64>,
    pub coded_height: Option<i64>,
    pub closed_captions: Option<bool>,
    pub film_grain: Option<bool>,
    pub has_b_frames: i64,
    pub sample_aspect_ratio: Option<Rational>,
    pub display_aspect_ratio: Option<Rational>,
    pub pix_fmt: Option<String>,
    pub level: i64,
    pub color_range: Option<String>,
    pub color_space: Option<String>,
    pub color_transfer: Option<String>,
    pub color_primaries: Option<String>,
    pub chroma_location: Option<String>,
    pub field_order: Option<String>,
    pub refs: Option<i64>,
}

/// Audio parameters of a stream
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioParams {
    pub sample_fmt: Option<String>,
    pub sample_rate: i64,
    pub channels: i64,
    pub channel_layout: Option<String>,
    pub bits_per_sample: i64,
    pub initial_padding: i64,
}

/// Subtitle parameters of a stream
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SubtitleParams {
    pub width: Option<i64>,
    pub height: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamInfo {
    pub index: i64,
    pub codec_name: Option<String>,
    pub codec_long_name: Option<String>,
    pub profile: Option<String>,
    /// Numeric profile, printed when no profile name is known
    pub profile_id: Option<i64>,
    pub codec_type: Option<MediaType>,
    pub codec_tag: u32,
    pub video: Option<VideoParams>,
    pub audio: Option<AudioParams>,
    pub subtitle: Option<SubtitleParams>,
    /// Exported decoder and demuxer private options
    pub private_options: BTreeMap<String, String>,
    /// Container-level stream id, for formats that expose one
    pub id: Option<i64>,
    pub r_frame_rate: Rational,
    pub avg_frame_rate: Rational,
    pub time_base: Rational,
    pub start_pts: Option<i64>,
    pub duration_ts: Option<i64>,
    pub bit_rate: Option<i64>,
    pub max_bit_rate: Option<i64>,
    pub bits_per_raw_sample: Option<i64>,
    pub nb_frames: Option<i64>,
    pub nb_read_frames: Option<i64>,
    pub nb_read_packets: Option<i64>,
    pub extradata: Option<Vec<u8>>,
    /// Names of the disposition flags that are set
    pub disposition: Vec<String>,
    pub tags: Tags,
    pub side_data: Vec<SideData>,
}

impl Default for StreamInfo {
    fn default() -> Self {
        Self {
            index: 0,
            codec_name: None,
            codec_long_name: None,
            profile: None,
            profile_id: None,
            codec_type: None,
            codec_tag: 0,
            video: None,
            audio: None,
            subtitle: None,
            private_options: BTreeMap::new(),
            id: None,
            r_frame_rate: Rational::new(0, 1),
            avg_frame_rate: Rational::new(0, 1),
            time_base: Rational::time_base_us(),
            start_pts: None,
            duration_ts: None,
            bit_rate: None,
            max_bit_rate: None,
            bits_per_raw_sample: None,
            nb_frames: None,
            nb_read_frames: None,
            nb_read_packets: None,
            extradata: None,
            disposition: Vec::new(),
            tags: Tags::new(),
            side_data: Vec::new(),
        }
    }
}

/// Scalar carried by a side data field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Int(i64),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SideDataField {
    pub key: String,
    pub value: FieldValue,
}

/// One side data entry attached to a stream, packet or frame
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SideData {
    /// Registered side data name, `None` when the kind is unnamed
    pub side_data_type: Option<String>,
    /// 3x3 display transformation matrix, 16.16 fixed point except the
    /// last column
    pub displaymatrix: Option<Vec<i32>>,
    /// Kind-specific fields in print order
    pub fields: Vec<SideDataField>,
    /// Opaque payload, dumped with `show_data` and hashed
    pub data: Option<Vec<u8>>,
    /// SMPTE timecodes, frame side data only
    pub timecodes: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgramInfo {
    pub program_id: i64,
    pub program_num: i64,
    pub pmt_pid: i64,
    pub pcr_pid: i64,
    /// Indexes into the snapshot streams
    pub stream_indexes: Vec<usize>,
    pub tags: Tags,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChapterInfo {
    pub id: i64,
    pub time_base: Rational,
    pub start: i64,
    pub end: i64,
    pub tags: Tags,
}

impl Default for ChapterInfo {
    fn default() -> Self {
        Self {
            id: 0,
            time_base: Rational::new(1, 1000),
            start: 0,
            end: 0,
            tags: Tags::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PacketInfo {
    pub stream_index: usize,
    pub pts: Option<i64>,
    pub dts: Option<i64>,
    pub duration: i64,
    pub size: i64,
    pub pos: Option<i64>,
    pub keyframe: bool,
    pub discard: bool,
    pub corrupt: bool,
    pub data: Option<Vec<u8>>,
    pub tags: Tags,
    pub side_data: Vec<SideData>,
}

/// Message a decoder logged while producing a frame
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderMessage {
    /// error, warning, info, verbose or debug
    pub level: String,
    pub context: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameInfo {
    pub stream_index: usize,
    pub key_frame: bool,
    pub pts: Option<i64>,
    pub pkt_dts: Option<i64>,
    pub best_effort_timestamp: Option<i64>,
    pub duration: i64,
    pub pkt_pos: Option<i64>,
    pub pkt_size: Option<i64>,
    pub width: i64,
    pub height: i64,
    pub crop_top: i64,
    pub crop_bottom: i64,
    pub crop_left: i64,
    pub crop_right: i64,
    pub pix_fmt: Option<String>,
    pub sample_aspect_ratio: Option<Rational>,
    /// Picture type letter, `?` when unknown
    pub pict_type: Option<char>,
    pub interlaced_frame: bool,
    pub top_field_first: bool,
    pub repeat_pict: i64,
    pub color_range: Option<String>,
    pub color_space: Option<String>,
    pub color_primaries: Option<String>,
    pub color_transfer: Option<String>,
    pub chroma_location: Option<String>,
    pub sample_fmt: Option<String>,
    pub nb_samples: i64,
    pub channels: i64,
    pub channel_layout: Option<String>,
    pub tags: Tags,
    pub side_data: Vec<SideData>,
    /// Messages replayed through the log while the frame is emitted
    pub decoder_log: Vec<DecoderMessage>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SubtitleInfo {
    pub stream_index: usize,
    /// Presentation time in microseconds
    pub pts: Option<i64>,
    pub format: i64,
    pub start_display_time: i64,
    pub end_display_time: i64,
    pub num_rects: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorInfo {
    pub code: i64,
    pub string: String,
}

impl MediaSnapshot {
    pub fn from_json_str(text: &str) -> ReportResult<Self> {
        serde_json::from_str(text).map_err(|e| ReportError::Snapshot {
            message: format!("invalid JSON snapshot: {}", e),
        })
    }

    pub fn from_toml_str(text: &str) -> ReportResult<Self> {
        toml::from_str(text).map_err(|e| ReportError::Snapshot {
            message: format!("invalid TOML snapshot: {}", e),
        })
    }

    /// Load a snapshot file, TOML when the extension says so, JSON otherwise
    pub fn load(path: &Path) -> ReportResult<Self> {
        let text = fs::read_to_string(path).map_err(|e| ReportError::Snapshot {
            message: format!("cannot read {}: {}", path.display(), e),
        })?;
        let is_toml = path
            .extension()
            .map_or(false, |ext| ext.eq_ignore_ascii_case("toml"));
        debug!("Loading snapshot from {}", path.display());
        if is_toml {
            Self::from_toml_str(&text)
        } else {
            Self::from_json_str(&text)
        }
    }

    /// Time base of the stream at `index`, microseconds when unknown
    pub fn stream_time_base(&self, index: usize) -> Rational {
        self.streams
            .get(index)
            .map_or(Rational::time_base_us(), |stream| stream.time_base)
    }

    pub fn stream_media_type(&self, index: usize) -> Option<MediaType> {
        self.streams.get(index).and_then(|stream| stream.codec_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_snapshot_defaults() {
        let snapshot = MediaSnapshot::from_json_str(
            r#"{
                "format": {"filename": "in.mp4", "format_name": "mov,mp4", "probe_score": 100},
                "streams": [{"index": 0, "codec_type": "video", "time_base": {"num": 1, "den": 90000}}]
            }"#,
        )
        .unwrap();
        let format = snapshot.format.as_ref().unwrap();
        assert_eq!(format.filename, RawString::from("in.mp4"));
        assert_eq!(format.start_time, None);
        assert_eq!(snapshot.stream_time_base(0), Rational::new(1, 90000));
        assert_eq!(snapshot.stream_time_base(7), Rational::time_base_us());
        assert_eq!(snapshot.stream_media_type(0), Some(MediaType::Video));
    }

    #[test]
    fn test_raw_bytes_filename() {
        let snapshot =
            MediaSnapshot::from_json_str(r#"{"format": {"filename": [97, 255, 98]}}"#).unwrap();
        let filename = &snapshot.format.unwrap().filename;
        assert_eq!(filename.as_bytes(), &[97, 255, 98]);
    }

    #[test]
    fn test_toml_snapshot() {
        let snapshot = MediaSnapshot::from_toml_str(
            r#"
            [format]
            filename = "clip.mkv"
            format_name = "matroska,webm"

            [[chapters]]
            id = 1
            start = 0
            end = 5000
            "#,
        )
        .unwrap();
        assert_eq!(snapshot.chapters.len(), 1);
        assert_eq!(snapshot.chapters[0].time_base, Rational::new(1, 1000));
    }

    #[test]
    fn test_invalid_snapshot_is_reported() {
        let err = MediaSnapshot::from_json_str("{").unwrap_err();
        assert!(matches!(err, ReportError::Snapshot { .. }));
    }

    #[test]
    fn test_packed_library_version() {
        let lib = LibraryVersion {
            name: "libavutil".to_string(),
            major: 59,
            minor: 8,
            micro: 100,
            ident: "Lavu59.8.100".to_string(),
        };
        assert_eq!(lib.packed(), (59 << 16) | (8 << 8) | 100);
    }
}
