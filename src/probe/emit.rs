//! Report emitters
//!
//! Each `show_*` function walks one part of a [`MediaSnapshot`] through a
//! [`ReportWriter`], using the keys and field order of ffprobe. Values that
//! are unknown are printed as optional `N/A` or `unknown` strings, so
//! backends that hide optional fields simply omit them.

use std::fmt::Write as _;
use std::io::Write;

use tracing::{debug, error, info, trace, warn};

use super::{
    AudioParams, ChapterInfo, DecoderMessage, ErrorInfo, FieldValue, FormatInfo, FrameInfo,
    LibraryVersion, MediaSnapshot, MediaType, PacketInfo, PixelFormatInfo, ProgramInfo,
    ProgramVersion, SideData, StreamInfo, SubtitleInfo, Tags, VideoParams,
};
use crate::error::ReportResult;
use crate::format::{Rational, UnitValue, NOPTS_VALUE};
use crate::section::filter::FilterTable;
use crate::section::payload::SectionPayload;
use crate::section::SectionId;
use crate::utils::logging::LogBuffer;
use crate::writer::{ReportWriter, NOT_AVAILABLE};

/// Disposition flags in bit order
pub const DISPOSITIONS: [&str; 19] = [
    "default",
    "dub",
    "original",
    "comment",
    "lyrics",
    "karaoke",
    "forced",
    "hearing_impaired",
    "visual_impaired",
    "clean_effects",
    "attached_pic",
    "timed_thumbnails",
    "non_diegetic",
    "captions",
    "descriptions",
    "metadata",
    "dependent",
    "still_image",
    "multilayer",
];

const PIXEL_FORMAT_FLAGS: [&str; 7] = [
    "big_endian",
    "palette",
    "bitstream",
    "hwaccel",
    "planar",
    "rgb",
    "alpha",
];

/// What parts of a snapshot to emit
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShowOptions {
    pub program_version: bool,
    pub library_versions: bool,
    pub pixel_formats: bool,
    pub format: bool,
    pub streams: bool,
    pub programs: bool,
    pub chapters: bool,
    pub packets: bool,
    /// Frames and subtitles
    pub frames: bool,
    pub error: bool,
    /// Highest level of captured messages shown in frame logs; `None`
    /// disables frame logs
    pub log: Option<i32>,
    /// Hex dumps of packet payloads, extradata and side data
    pub show_data: bool,
    /// Omit fields that depend on the build, such as long names
    pub bitexact: bool,
}

impl ShowOptions {
    /// Show whatever the filter table asks output for
    pub fn from_filter(filter: &FilterTable) -> Self {
        Self {
            program_version: filter.wants_output(SectionId::ProgramVersion),
            library_versions: filter.wants_output(SectionId::LibraryVersions),
            pixel_formats: filter.wants_output(SectionId::PixelFormats),
            format: filter.wants_output(SectionId::Format),
            streams: filter.wants_output(SectionId::Streams),
            programs: filter.wants_output(SectionId::Programs),
            chapters: filter.wants_output(SectionId::Chapters),
            packets: filter.wants_output(SectionId::Packets),
            frames: filter.wants_output(SectionId::Frames),
            error: filter.wants_output(SectionId::Error),
            log: None,
            show_data: false,
            bitexact: false,
        }
    }
}

/// Emit the whole report for `snapshot` inside the root section.
///
/// `logs` is the capture buffer frame logs are drained from. On error the
/// writer is left with open sections; close them with
/// [`ReportWriter::close_all`].
pub fn probe_report<W: Write>(
    w: &mut ReportWriter<W>,
    snapshot: &MediaSnapshot,
    opts: &ShowOptions,
    logs: Option<&LogBuffer>,
) -> ReportResult<()> {
    info!("Writing {} report", w.format());
    w.enter_section(SectionId::Root)?;

    if opts.program_version {
        if let Some(version) = &snapshot.program_version {
            show_program_version(w, version)?;
        }
    }
    if opts.library_versions {
        show_library_versions(w, &snapshot.library_versions)?;
    }
    if opts.pixel_formats {
        show_pixel_formats(w, &snapshot.pixel_formats)?;
    }

    show_packets_and_frames(w, snapshot, opts, logs)?;

    if opts.programs {
        show_programs(w, snapshot, opts)?;
    }
    if opts.streams {
        show_streams(w, snapshot, opts)?;
    }
    if opts.chapters {
        show_chapters(w, &snapshot.chapters)?;
    }
    if opts.format {
        if let Some(format) = &snapshot.format {
            show_format(w, snapshot, format, opts)?;
        }
    }
    if opts.error {
        if let Some(err) = &snapshot.error {
            show_error(w, err)?;
        }
    }

    w.exit_section()?;
    info!("Report complete");
    Ok(())
}

fn print_name_or_unknown<W: Write>(
    w: &mut ReportWriter<W>,
    key: &str,
    name: Option<&str>,
) -> ReportResult<()> {
    match name {
        Some(name) => w.print_string(key, name),
        None => w.print_string_opt(key, "unknown"),
    }
}

fn print_media_type<W: Write>(
    w: &mut ReportWriter<W>,
    key: &str,
    media_type: Option<MediaType>,
) -> ReportResult<()> {
    print_name_or_unknown(w, key, media_type.map(MediaType::name))
}

/// Number rendered as a string, optional `N/A` when absent
fn print_count<W: Write>(w: &mut ReportWriter<W>, key: &str, value: Option<i64>) -> ReportResult<()> {
    match value {
        Some(value) => w.print_string(key, &value.to_string()),
        None => w.print_string_opt(key, NOT_AVAILABLE),
    }
}

fn print_int_or_na<W: Write>(w: &mut ReportWriter<W>, key: &str, value: Option<i64>) -> ReportResult<()> {
    match value {
        Some(value) => w.print_integer(key, value),
        None => w.print_string_opt(key, NOT_AVAILABLE),
    }
}

fn print_flag<W: Write>(w: &mut ReportWriter<W>, key: &str, set: bool) -> ReportResult<()> {
    w.print_integer(key, i64::from(set))
}

/// Tags section, skipped when empty or filtered out
pub fn show_tags<W: Write>(w: &mut ReportWriter<W>, tags: &Tags, section: SectionId) -> ReportResult<()> {
    if tags.is_empty() || !w.filter().wants_output(section) {
        return Ok(());
    }
    w.enter_section(section)?;
    for (key, value) in tags {
        w.print_string_validated(key, value.as_bytes())?;
    }
    w.exit_section()
}

pub fn show_program_version<W: Write>(w: &mut ReportWriter<W>, version: &ProgramVersion) -> ReportResult<()> {
    w.enter_section(SectionId::ProgramVersion)?;
    w.print_string("version", &version.version)?;
    w.print_string("copyright", &version.copyright)?;
    w.print_string("compiler_ident", &version.compiler_ident)?;
    w.print_string("configuration", &version.configuration)?;
    w.exit_section()
}

pub fn show_library_versions<W: Write>(
    w: &mut ReportWriter<W>,
    libraries: &[LibraryVersion],
) -> ReportResult<()> {
    w.enter_section(SectionId::LibraryVersions)?;
    for lib in libraries {
        w.enter_section(SectionId::LibraryVersion)?;
        w.print_string("name", &lib.name)?;
        w.print_integer("major", i64::from(lib.major))?;
        w.print_integer("minor", i64::from(lib.minor))?;
        w.print_integer("micro", i64::from(lib.micro))?;
        w.print_integer("version", lib.packed())?;
        w.print_string("ident", &lib.ident)?;
        w.exit_section()?;
    }
    w.exit_section()
}

pub fn show_pixel_formats<W: Write>(w: &mut ReportWriter<W>, formats: &[PixelFormatInfo]) -> ReportResult<()> {
    let show_flags = w.filter().wants_output(SectionId::PixelFormatFlags);
    let show_components = w.filter().wants_output(SectionId::PixelFormatComponents);

    w.enter_section(SectionId::PixelFormats)?;
    for pix_fmt in formats {
        w.enter_section(SectionId::PixelFormat)?;
        w.print_string("name", &pix_fmt.name)?;
        w.print_integer("nb_components", i64::from(pix_fmt.nb_components))?;
        match (pix_fmt.log2_chroma_w, pix_fmt.log2_chroma_h) {
            (Some(chroma_w), Some(chroma_h)) => {
                w.print_integer("log2_chroma_w", i64::from(chroma_w))?;
                w.print_integer("log2_chroma_h", i64::from(chroma_h))?;
            }
            _ => {
                w.print_string_opt("log2_chroma_w", NOT_AVAILABLE)?;
                w.print_string_opt("log2_chroma_h", NOT_AVAILABLE)?;
            }
        }
        print_int_or_na(
            w,
            "bits_per_pixel",
            pix_fmt.bits_per_pixel.filter(|&bits| bits > 0).map(i64::from),
        )?;

        if show_flags {
            w.enter_section(SectionId::PixelFormatFlags)?;
            for flag in PIXEL_FORMAT_FLAGS {
                print_flag(w, flag, pix_fmt.flags.iter().any(|set| set == flag))?;
            }
            w.exit_section()?;
        }
        if show_components && !pix_fmt.component_depths.is_empty() {
            w.enter_section(SectionId::PixelFormatComponents)?;
            for (index, depth) in pix_fmt.component_depths.iter().enumerate() {
                w.enter_section(SectionId::PixelFormatComponent)?;
                w.print_integer("index", index as i64 + 1)?;
                w.print_integer("bit_depth", i64::from(*depth))?;
                w.exit_section()?;
            }
            w.exit_section()?;
        }
        w.exit_section()?;
    }
    w.exit_section()
}

pub fn show_format<W: Write>(
    w: &mut ReportWriter<W>,
    snapshot: &MediaSnapshot,
    format: &FormatInfo,
    opts: &ShowOptions,
) -> ReportResult<()> {
    let time_base = Rational::time_base_us();

    w.enter_section(SectionId::Format)?;
    w.print_string_validated("filename", format.filename.as_bytes())?;
    w.print_integer("nb_streams", snapshot.streams.len() as i64)?;
    w.print_integer("nb_programs", snapshot.programs.len() as i64)?;
    w.print_integer("nb_stream_groups", i64::from(format.nb_stream_groups))?;
    w.print_string("format_name", &format.format_name)?;
    if !opts.bitexact {
        print_name_or_unknown(w, "format_long_name", format.format_long_name.as_deref())?;
    }
    w.print_time("start_time", format.start_time.unwrap_or(NOPTS_VALUE), time_base)?;
    w.print_time("duration", format.duration.unwrap_or(NOPTS_VALUE), time_base)?;
    match format.size.filter(|&size| size >= 0) {
        Some(size) => w.print_value("size", UnitValue::Bytes(size))?,
        None => w.print_string_opt("size", NOT_AVAILABLE)?,
    }
    match format.bit_rate.filter(|&rate| rate > 0) {
        Some(rate) => w.print_value("bit_rate", UnitValue::BitRate(rate))?,
        None => w.print_string_opt("bit_rate", NOT_AVAILABLE)?,
    }
    w.print_integer("probe_score", i64::from(format.probe_score))?;
    show_tags(w, &format.tags, SectionId::FormatTags)?;
    w.exit_section()
}

/// Where a stream is printed: the top-level list or inside a program
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamContainer {
    Streams,
    Program,
}

impl StreamContainer {
    fn section(self) -> SectionId {
        match self {
            StreamContainer::Streams => SectionId::Stream,
            StreamContainer::Program => SectionId::ProgramStream,
        }
    }

    fn disposition(self) -> SectionId {
        match self {
            StreamContainer::Streams => SectionId::StreamDisposition,
            StreamContainer::Program => SectionId::ProgramStreamDisposition,
        }
    }

    fn tags(self) -> SectionId {
        match self {
            StreamContainer::Streams => SectionId::StreamTags,
            StreamContainer::Program => SectionId::ProgramStreamTags,
        }
    }

    /// Program streams carry no side data
    fn side_data(self) -> Option<&'static SideDataSections> {
        match self {
            StreamContainer::Streams => Some(&STREAM_SIDE_DATA),
            StreamContainer::Program => None,
        }
    }
}

pub fn show_streams<W: Write>(
    w: &mut ReportWriter<W>,
    snapshot: &MediaSnapshot,
    opts: &ShowOptions,
) -> ReportResult<()> {
    w.enter_section(SectionId::Streams)?;
    for stream in &snapshot.streams {
        show_stream(w, stream, StreamContainer::Streams, opts)?;
    }
    w.exit_section()
}

pub fn show_stream<W: Write>(
    w: &mut ReportWriter<W>,
    stream: &StreamInfo,
    container: StreamContainer,
    opts: &ShowOptions,
) -> ReportResult<()> {
    w.enter_section(container.section())?;
    w.print_integer("index", stream.index)?;

    match &stream.codec_name {
        Some(name) => w.print_string("codec_name", name)?,
        None => w.print_string_opt("codec_name", "unknown")?,
    }
    if !opts.bitexact {
        print_name_or_unknown(w, "codec_long_name", stream.codec_long_name.as_deref())?;
    }
    match (&stream.profile, stream.profile_id) {
        (Some(profile), _) if !opts.bitexact => w.print_string("profile", profile)?,
        (_, Some(id)) => w.print_string("profile", &id.to_string())?,
        _ => w.print_string_opt("profile", "unknown")?,
    }
    print_media_type(w, "codec_type", stream.codec_type)?;
    w.print_string("codec_tag_string", &fourcc_string(stream.codec_tag))?;
    w.print_string("codec_tag", &format!("0x{:04x}", stream.codec_tag))?;

    match stream.codec_type {
        Some(MediaType::Video) => {
            show_video_params(w, stream.video.as_ref().unwrap_or(&VideoParams::default()))?
        }
        Some(MediaType::Audio) => {
            show_audio_params(w, stream.audio.as_ref().unwrap_or(&AudioParams::default()))?
        }
        Some(MediaType::Subtitle) => {
            let params = stream.subtitle.clone().unwrap_or_default();
            print_int_or_na(w, "width", params.width)?;
            print_int_or_na(w, "height", params.height)?;
        }
        _ => {}
    }

    if w.presentation().show_private_data {
        for (key, value) in &stream.private_options {
            w.print_string(key, value)?;
        }
    }

    match stream.id {
        Some(id) => w.print_string("id", &format!("0x{:x}", id))?,
        None => w.print_string_opt("id", NOT_AVAILABLE)?,
    }
    w.print_rational("r_frame_rate", stream.r_frame_rate, '/')?;
    w.print_rational("avg_frame_rate", stream.avg_frame_rate, '/')?;
    w.print_rational("time_base", stream.time_base, '/')?;
    let start_pts = stream.start_pts.unwrap_or(NOPTS_VALUE);
    w.print_ts("start_pts", start_pts)?;
    w.print_time("start_time", start_pts, stream.time_base)?;
    let duration_ts = stream.duration_ts.unwrap_or(NOPTS_VALUE);
    w.print_ts("duration_ts", duration_ts)?;
    w.print_time("duration", duration_ts, stream.time_base)?;

    match stream.bit_rate.filter(|&rate| rate > 0) {
        Some(rate) => w.print_value("bit_rate", UnitValue::BitRate(rate))?,
        None => w.print_string_opt("bit_rate", NOT_AVAILABLE)?,
    }
    match stream.max_bit_rate.filter(|&rate| rate > 0) {
        Some(rate) => w.print_value("max_bit_rate", UnitValue::BitRate(rate))?,
        None => w.print_string_opt("max_bit_rate", NOT_AVAILABLE)?,
    }
    print_count(w, "bits_per_raw_sample", stream.bits_per_raw_sample.filter(|&bits| bits > 0))?;
    print_count(w, "nb_frames", stream.nb_frames.filter(|&n| n > 0))?;
    print_count(w, "nb_read_frames", stream.nb_read_frames.filter(|&n| n > 0))?;
    print_count(w, "nb_read_packets", stream.nb_read_packets.filter(|&n| n > 0))?;

    if let Some(extradata) = stream.extradata.as_deref().filter(|data| !data.is_empty()) {
        if opts.show_data {
            w.print_hexdump("extradata", extradata)?;
        }
        w.print_integer("extradata_size", extradata.len() as i64)?;
        w.print_digest("extradata_hash", extradata)?;
    }

    if w.filter().wants_output(container.disposition()) {
        w.enter_section(container.disposition())?;
        for flag in DISPOSITIONS {
            print_flag(w, flag, stream.disposition.iter().any(|set| set == flag))?;
        }
        w.exit_section()?;
    }

    show_tags(w, &stream.tags, container.tags())?;
    if let Some(sections) = container.side_data() {
        show_side_data_list(w, &stream.side_data, sections, opts)?;
    }
    w.exit_section()
}

fn show_video_params<W: Write>(w: &mut ReportWriter<W>, video: &VideoParams) -> ReportResult<()> {
    w.print_integer("width", video.width)?;
    w.print_integer("height", video.height)?;
    if let Some(coded_width) = video.coded_width {
        w.print_integer("coded_width", coded_width)?;
    }
    if let Some(coded_height) = video.coded_height {
        w.print_integer("coded_height", coded_height)?;
    }
    if let Some(closed_captions) = video.closed_captions {
        print_flag(w, "closed_captions", closed_captions)?;
    }
    if let Some(film_grain) = video.film_grain {
        print_flag(w, "film_grain", film_grain)?;
    }
    w.print_integer("has_b_frames", video.has_b_frames)?;

    match video.sample_aspect_ratio.filter(|sar| sar.num != 0) {
        Some(sar) => {
            let dar = video
                .display_aspect_ratio
                .or_else(|| display_aspect_ratio(video.width, video.height, sar));
            w.print_rational("sample_aspect_ratio", sar, ':')?;
            match dar {
                Some(dar) => w.print_rational("display_aspect_ratio", dar, ':')?,
                None => w.print_string_opt("display_aspect_ratio", NOT_AVAILABLE)?,
            }
        }
        None => {
            w.print_string_opt("sample_aspect_ratio", NOT_AVAILABLE)?;
            w.print_string_opt("display_aspect_ratio", NOT_AVAILABLE)?;
        }
    }

    print_name_or_unknown(w, "pix_fmt", video.pix_fmt.as_deref())?;
    w.print_integer("level", video.level)?;
    print_name_or_unknown(w, "color_range", video.color_range.as_deref())?;
    print_name_or_unknown(w, "color_space", video.color_space.as_deref())?;
    print_name_or_unknown(w, "color_transfer", video.color_transfer.as_deref())?;
    print_name_or_unknown(w, "color_primaries", video.color_primaries.as_deref())?;
    print_name_or_unknown(w, "chroma_location", video.chroma_location.as_deref())?;
    print_name_or_unknown(w, "field_order", video.field_order.as_deref())?;
    if let Some(refs) = video.refs {
        w.print_integer("refs", refs)?;
    }
    Ok(())
}

fn show_audio_params<W: Write>(w: &mut ReportWriter<W>, audio: &AudioParams) -> ReportResult<()> {
    print_name_or_unknown(w, "sample_fmt", audio.sample_fmt.as_deref())?;
    w.print_value("sample_rate", UnitValue::Hertz(audio.sample_rate))?;
    w.print_integer("channels", audio.channels)?;
    print_name_or_unknown(w, "channel_layout", audio.channel_layout.as_deref())?;
    w.print_integer("bits_per_sample", audio.bits_per_sample)?;
    w.print_integer("initial_padding", audio.initial_padding)
}

pub fn show_programs<W: Write>(
    w: &mut ReportWriter<W>,
    snapshot: &MediaSnapshot,
    opts: &ShowOptions,
) -> ReportResult<()> {
    w.enter_section(SectionId::Programs)?;
    for program in &snapshot.programs {
        show_program(w, snapshot, program, opts)?;
    }
    w.exit_section()
}

fn show_program<W: Write>(
    w: &mut ReportWriter<W>,
    snapshot: &MediaSnapshot,
    program: &ProgramInfo,
    opts: &ShowOptions,
) -> ReportResult<()> {
    w.enter_section(SectionId::Program)?;
    w.print_integer("program_id", program.program_id)?;
    w.print_integer("program_num", program.program_num)?;
    w.print_integer("nb_streams", program.stream_indexes.len() as i64)?;
    w.print_integer("pmt_pid", program.pmt_pid)?;
    w.print_integer("pcr_pid", program.pcr_pid)?;
    show_tags(w, &program.tags, SectionId::ProgramTags)?;

    w.enter_section(SectionId::ProgramStreams)?;
    for &index in &program.stream_indexes {
        match snapshot.streams.get(index) {
            Some(stream) => show_stream(w, stream, StreamContainer::Program, opts)?,
            None => warn!(
                "Program {} references missing stream {}",
                program.program_id, index
            ),
        }
    }
    w.exit_section()?;
    w.exit_section()
}

pub fn show_chapters<W: Write>(w: &mut ReportWriter<W>, chapters: &[ChapterInfo]) -> ReportResult<()> {
    w.enter_section(SectionId::Chapters)?;
    for chapter in chapters {
        w.enter_section(SectionId::Chapter)?;
        w.print_integer("id", chapter.id)?;
        w.print_rational("time_base", chapter.time_base, '/')?;
        w.print_integer("start", chapter.start)?;
        w.print_time("start_time", chapter.start, chapter.time_base)?;
        w.print_integer("end", chapter.end)?;
        w.print_time("end_time", chapter.end, chapter.time_base)?;
        show_tags(w, &chapter.tags, SectionId::ChapterTags)?;
        w.exit_section()?;
    }
    w.exit_section()
}

pub fn show_error<W: Write>(w: &mut ReportWriter<W>, err: &ErrorInfo) -> ReportResult<()> {
    w.enter_section(SectionId::Error)?;
    w.print_integer("code", err.code)?;
    w.print_string("string", &err.string)?;
    w.exit_section()
}

/// Section ids used for one kind of side data
#[derive(Debug)]
pub struct SideDataSections {
    list: SectionId,
    entry: SectionId,
    timecodes: Option<(SectionId, SectionId)>,
}

const STREAM_SIDE_DATA: SideDataSections = SideDataSections {
    list: SectionId::StreamSideDataList,
    entry: SectionId::StreamSideData,
    timecodes: None,
};

const PACKET_SIDE_DATA: SideDataSections = SideDataSections {
    list: SectionId::PacketSideDataList,
    entry: SectionId::PacketSideData,
    timecodes: None,
};

const FRAME_SIDE_DATA: SideDataSections = SideDataSections {
    list: SectionId::FrameSideDataList,
    entry: SectionId::FrameSideData,
    timecodes: Some((SectionId::FrameSideDataTimecodeList, SectionId::FrameSideDataTimecode)),
};

fn show_side_data_list<W: Write>(
    w: &mut ReportWriter<W>,
    entries: &[SideData],
    sections: &SideDataSections,
    opts: &ShowOptions,
) -> ReportResult<()> {
    if entries.is_empty() || !w.filter().wants_output(sections.list) {
        return Ok(());
    }
    w.enter_section(sections.list)?;
    for side_data in entries {
        show_side_data(w, side_data, sections, opts)?;
    }
    w.exit_section()
}

fn show_side_data<W: Write>(
    w: &mut ReportWriter<W>,
    side_data: &SideData,
    sections: &SideDataSections,
    opts: &ShowOptions,
) -> ReportResult<()> {
    let name = side_data.side_data_type.as_deref();
    w.enter_section_with(sections.entry, SectionPayload::SideData(name))?;
    w.print_string("side_data_type", name.unwrap_or("unknown"))?;

    if let Some(matrix) = side_data.displaymatrix.as_deref().filter(|m| m.len() >= 9) {
        w.print_integers("displaymatrix", &matrix[..9], 3, 11, 1)?;
        w.print_integer("rotation", display_rotation(matrix))?;
    }
    for field in &side_data.fields {
        match &field.value {
            FieldValue::Int(value) => w.print_integer(&field.key, *value)?,
            FieldValue::Text(value) => w.print_string(&field.key, value)?,
        }
    }
    if let (true, Some(data)) = (opts.show_data, side_data.data.as_deref()) {
        w.print_hexdump("data", data)?;
    }

    if let Some((list, entry)) = sections.timecodes {
        if !side_data.timecodes.is_empty() {
            w.enter_section(list)?;
            for timecode in &side_data.timecodes {
                w.enter_section(entry)?;
                w.print_string("value", timecode)?;
                w.exit_section()?;
            }
            w.exit_section()?;
        }
    }
    w.exit_section()
}

/// One element of the packets and frames arrays
#[derive(Debug, Clone, Copy)]
enum MediaEvent<'a> {
    Packet(&'a PacketInfo),
    Frame(&'a FrameInfo),
    Subtitle(&'a SubtitleInfo),
}

impl MediaEvent<'_> {
    /// Presentation time in seconds, when known
    fn seconds(&self, snapshot: &MediaSnapshot) -> Option<f64> {
        let (ts, time_base) = match self {
            MediaEvent::Packet(packet) => (
                packet.pts.or(packet.dts),
                snapshot.stream_time_base(packet.stream_index),
            ),
            MediaEvent::Frame(frame) => (
                frame.best_effort_timestamp.or(frame.pts),
                snapshot.stream_time_base(frame.stream_index),
            ),
            MediaEvent::Subtitle(subtitle) => (subtitle.pts, Rational::time_base_us()),
        };
        ts.filter(|&ts| ts != NOPTS_VALUE)
            .map(|ts| ts as f64 * time_base.to_f64())
    }
}

/// Stable merge by time; `first` wins ties and events without a time keep
/// their position relative to `first`
fn merge_by_time<'a>(
    snapshot: &MediaSnapshot,
    first: Vec<MediaEvent<'a>>,
    second: Vec<MediaEvent<'a>>,
) -> Vec<MediaEvent<'a>> {
    let mut merged = Vec::with_capacity(first.len() + second.len());
    let mut second = second.into_iter().peekable();
    for event in first {
        let time = event.seconds(snapshot);
        while let Some(earlier) = second.next_if(|next| {
            matches!((next.seconds(snapshot), time), (Some(b), Some(a)) if b < a)
        }) {
            merged.push(earlier);
        }
        merged.push(event);
    }
    merged.extend(second);
    merged
}

fn decoded_events(snapshot: &MediaSnapshot) -> Vec<MediaEvent<'_>> {
    merge_by_time(
        snapshot,
        snapshot.frames.iter().map(MediaEvent::Frame).collect(),
        snapshot.subtitles.iter().map(MediaEvent::Subtitle).collect(),
    )
}

/// Packets and frames interleaved by time, packets first on ties
fn interleaved_events(snapshot: &MediaSnapshot) -> Vec<MediaEvent<'_>> {
    merge_by_time(
        snapshot,
        snapshot.packets.iter().map(MediaEvent::Packet).collect(),
        decoded_events(snapshot),
    )
}

/// Emit packets and frames.
///
/// Both are written into one `packets_and_frames` array when the backend
/// supports it, otherwise into separate `packets` and `frames` arrays.
pub fn show_packets_and_frames<W: Write>(
    w: &mut ReportWriter<W>,
    snapshot: &MediaSnapshot,
    opts: &ShowOptions,
    logs: Option<&LogBuffer>,
) -> ReportResult<()> {
    if opts.packets && opts.frames && w.backend_flags().packets_and_frames_in_same_chapter {
        debug!("Interleaving packets and frames");
        w.enter_section(SectionId::PacketsAndFrames)?;
        for event in interleaved_events(snapshot) {
            show_event(w, snapshot, event, opts, logs)?;
        }
        return w.exit_section();
    }

    if opts.packets {
        w.enter_section(SectionId::Packets)?;
        for packet in &snapshot.packets {
            show_packet(w, snapshot, packet, opts)?;
        }
        w.exit_section()?;
    }
    if opts.frames {
        w.enter_section(SectionId::Frames)?;
        for event in decoded_events(snapshot) {
            show_event(w, snapshot, event, opts, logs)?;
        }
        w.exit_section()?;
    }
    Ok(())
}

fn show_event<W: Write>(
    w: &mut ReportWriter<W>,
    snapshot: &MediaSnapshot,
    event: MediaEvent<'_>,
    opts: &ShowOptions,
    logs: Option<&LogBuffer>,
) -> ReportResult<()> {
    match event {
        MediaEvent::Packet(packet) => show_packet(w, snapshot, packet, opts),
        MediaEvent::Frame(frame) => show_frame(w, snapshot, frame, opts, logs),
        MediaEvent::Subtitle(subtitle) => show_subtitle(w, subtitle),
    }
}

pub fn show_packet<W: Write>(
    w: &mut ReportWriter<W>,
    snapshot: &MediaSnapshot,
    packet: &PacketInfo,
    opts: &ShowOptions,
) -> ReportResult<()> {
    let time_base = snapshot.stream_time_base(packet.stream_index);
    let pts = packet.pts.unwrap_or(NOPTS_VALUE);
    let dts = packet.dts.unwrap_or(NOPTS_VALUE);

    w.enter_section(SectionId::Packet)?;
    print_media_type(w, "codec_type", snapshot.stream_media_type(packet.stream_index))?;
    w.print_integer("stream_index", packet.stream_index as i64)?;
    w.print_ts("pts", pts)?;
    w.print_time("pts_time", pts, time_base)?;
    w.print_ts("dts", dts)?;
    w.print_time("dts_time", dts, time_base)?;
    w.print_duration_ts("duration", packet.duration)?;
    w.print_duration_time("duration_time", packet.duration, time_base)?;
    w.print_value("size", UnitValue::Bytes(packet.size))?;
    print_count(w, "pos", packet.pos.filter(|&pos| pos >= 0))?;
    w.print_string("flags", &packet_flags(packet))?;

    if let Some(data) = packet.data.as_deref() {
        if opts.show_data {
            w.print_hexdump("data", data)?;
        }
        w.print_digest("data_hash", data)?;
    }
    show_tags(w, &packet.tags, SectionId::PacketTags)?;
    show_side_data_list(w, &packet.side_data, &PACKET_SIDE_DATA, opts)?;
    w.exit_section()
}

fn packet_flags(packet: &PacketInfo) -> String {
    [
        (packet.keyframe, 'K'),
        (packet.discard, 'D'),
        (packet.corrupt, 'C'),
    ]
    .iter()
    .map(|&(set, flag)| if set { flag } else { '_' })
    .collect()
}

/// Route a frame's recorded decoder messages through the log
fn replay_decoder_log(messages: &[DecoderMessage]) {
    for message in messages {
        let context = message.context.as_str();
        let text = message.message.as_str();
        match message.level.as_str() {
            "panic" | "fatal" | "error" => error!(context, "{}", text),
            "warning" | "warn" => warn!(context, "{}", text),
            "info" => info!(context, "{}", text),
            "verbose" | "debug" => debug!(context, "{}", text),
            _ => trace!(context, "{}", text),
        }
    }
}

pub fn show_frame<W: Write>(
    w: &mut ReportWriter<W>,
    snapshot: &MediaSnapshot,
    frame: &FrameInfo,
    opts: &ShowOptions,
    logs: Option<&LogBuffer>,
) -> ReportResult<()> {
    if let Some(buffer) = logs {
        buffer.clear();
    }
    replay_decoder_log(&frame.decoder_log);

    let time_base = snapshot.stream_time_base(frame.stream_index);
    let media_type = snapshot.stream_media_type(frame.stream_index);
    let pts = frame.pts.unwrap_or(NOPTS_VALUE);
    let pkt_dts = frame.pkt_dts.unwrap_or(NOPTS_VALUE);
    let best_effort = frame.best_effort_timestamp.unwrap_or(NOPTS_VALUE);

    w.enter_section(SectionId::Frame)?;
    print_media_type(w, "media_type", media_type)?;
    w.print_integer("stream_index", frame.stream_index as i64)?;
    print_flag(w, "key_frame", frame.key_frame)?;
    w.print_ts("pts", pts)?;
    w.print_time("pts_time", pts, time_base)?;
    w.print_ts("pkt_dts", pkt_dts)?;
    w.print_time("pkt_dts_time", pkt_dts, time_base)?;
    w.print_ts("best_effort_timestamp", best_effort)?;
    w.print_time("best_effort_timestamp_time", best_effort, time_base)?;
    w.print_duration_ts("duration", frame.duration)?;
    w.print_duration_time("duration_time", frame.duration, time_base)?;
    print_count(w, "pkt_pos", frame.pkt_pos.filter(|&pos| pos >= 0))?;
    match frame.pkt_size.filter(|&size| size >= 0) {
        Some(size) => w.print_value("pkt_size", UnitValue::Bytes(size))?,
        None => w.print_string_opt("pkt_size", NOT_AVAILABLE)?,
    }

    match media_type {
        Some(MediaType::Video) => {
            w.print_integer("width", frame.width)?;
            w.print_integer("height", frame.height)?;
            w.print_integer("crop_top", frame.crop_top)?;
            w.print_integer("crop_bottom", frame.crop_bottom)?;
            w.print_integer("crop_left", frame.crop_left)?;
            w.print_integer("crop_right", frame.crop_right)?;
            print_name_or_unknown(w, "pix_fmt", frame.pix_fmt.as_deref())?;
            match frame.sample_aspect_ratio.filter(|sar| sar.num != 0) {
                Some(sar) => w.print_rational("sample_aspect_ratio", sar, ':')?,
                None => w.print_string_opt("sample_aspect_ratio", NOT_AVAILABLE)?,
            }
            w.print_string("pict_type", &frame.pict_type.unwrap_or('?').to_string())?;
            print_flag(w, "interlaced_frame", frame.interlaced_frame)?;
            print_flag(w, "top_field_first", frame.top_field_first)?;
            w.print_integer("repeat_pict", frame.repeat_pict)?;
            print_name_or_unknown(w, "color_range", frame.color_range.as_deref())?;
            print_name_or_unknown(w, "color_space", frame.color_space.as_deref())?;
            print_name_or_unknown(w, "color_primaries", frame.color_primaries.as_deref())?;
            print_name_or_unknown(w, "color_transfer", frame.color_transfer.as_deref())?;
            print_name_or_unknown(w, "chroma_location", frame.chroma_location.as_deref())?;
        }
        Some(MediaType::Audio) => {
            print_name_or_unknown(w, "sample_fmt", frame.sample_fmt.as_deref())?;
            w.print_integer("nb_samples", frame.nb_samples)?;
            w.print_integer("channels", frame.channels)?;
            print_name_or_unknown(w, "channel_layout", frame.channel_layout.as_deref())?;
        }
        _ => {}
    }

    show_tags(w, &frame.tags, SectionId::FrameTags)?;
    if let (Some(threshold), Some(buffer)) = (opts.log, logs) {
        if w.filter().wants_output(SectionId::FrameLogs) {
            show_log(w, buffer, threshold)?;
        }
    }
    show_side_data_list(w, &frame.side_data, &FRAME_SIDE_DATA, opts)?;
    w.exit_section()
}

pub fn show_subtitle<W: Write>(w: &mut ReportWriter<W>, subtitle: &SubtitleInfo) -> ReportResult<()> {
    let pts = subtitle.pts.unwrap_or(NOPTS_VALUE);
    w.enter_section(SectionId::Subtitle)?;
    w.print_string("media_type", MediaType::Subtitle.name())?;
    w.print_ts("pts", pts)?;
    w.print_time("pts_time", pts, Rational::time_base_us())?;
    w.print_integer("format", subtitle.format)?;
    w.print_integer("start_display_time", subtitle.start_display_time)?;
    w.print_integer("end_display_time", subtitle.end_display_time)?;
    w.print_integer("num_rects", subtitle.num_rects)?;
    w.exit_section()
}

/// Drain `buffer` into a `logs` array, keeping entries at or below
/// `threshold`. Nothing is written when the buffer is empty.
pub fn show_log<W: Write>(w: &mut ReportWriter<W>, buffer: &LogBuffer, threshold: i32) -> ReportResult<()> {
    let entries = buffer.drain();
    if entries.is_empty() {
        return Ok(());
    }
    w.enter_section(SectionId::FrameLogs)?;
    for entry in entries.iter().filter(|entry| entry.level <= threshold) {
        w.enter_section(SectionId::FrameLog)?;
        w.print_string("context", &entry.context)?;
        w.print_integer("level", i64::from(entry.level))?;
        w.print_integer("category", i64::from(entry.category))?;
        match &entry.parent_context {
            Some(parent) => {
                w.print_string("parent_context", parent)?;
                w.print_integer("parent_category", i64::from(entry.parent_category.unwrap_or(0)))?;
            }
            None => {
                w.print_string_opt("parent_context", NOT_AVAILABLE)?;
                w.print_string_opt("parent_category", NOT_AVAILABLE)?;
            }
        }
        w.print_string("message", &entry.message)?;
        w.exit_section()?;
    }
    w.exit_section()
}

/// Four character code, non-printable bytes as `[n]`
pub fn fourcc_string(tag: u32) -> String {
    let mut out = String::new();
    for byte in tag.to_le_bytes() {
        if byte.is_ascii_alphanumeric() || b" .-_".contains(&byte) {
            out.push(char::from(byte));
        } else {
            let _ = write!(out, "[{}]", byte);
        }
    }
    out
}

fn gcd(mut a: u128, mut b: u128) -> u128 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

/// Reduced `width*sar : height*sar`, `None` when zero or out of `i32` range
fn display_aspect_ratio(width: i64, height: i64, sar: Rational) -> Option<Rational> {
    let num = i128::from(width) * i128::from(sar.num);
    let den = i128::from(height) * i128::from(sar.den);
    if num == 0 || den == 0 {
        return None;
    }
    let divisor = i128::try_from(gcd(num.unsigned_abs(), den.unsigned_abs())).ok()?;
    let sign = den.signum();
    let (num, den) = (sign * num / divisor, sign * den / divisor);
    Some(Rational::new(i32::try_from(num).ok()?, i32::try_from(den).ok()?))
}

/// Counter-clockwise rotation in whole degrees encoded by a display matrix
fn display_rotation(matrix: &[i32]) -> i64 {
    let fixed = |i: usize| f64::from(matrix[i]) / 65536.0;
    let scale_x = fixed(0).hypot(fixed(3));
    let scale_y = fixed(1).hypot(fixed(4));
    if scale_x == 0.0 || scale_y == 0.0 {
        return 0;
    }
    -(fixed(1) / scale_y).atan2(fixed(0) / scale_x).to_degrees() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> MediaSnapshot {
        MediaSnapshot::from_json_str(
            r#"{
                "streams": [
                    {"index": 0, "codec_type": "video", "time_base": {"num": 1, "den": 1000}},
                    {"index": 1, "codec_type": "audio", "time_base": {"num": 1, "den": 100}}
                ],
                "packets": [
                    {"stream_index": 0, "pts": 0},
                    {"stream_index": 1, "pts": 5},
                    {"stream_index": 0, "pts": 100}
                ],
                "frames": [
                    {"stream_index": 0, "pts": 0},
                    {"stream_index": 1, "best_effort_timestamp": 5, "pts": 900}
                ],
                "subtitles": [{"pts": 20000}]
            }"#,
        )
        .unwrap()
    }

    fn describe(events: &[MediaEvent<'_>]) -> Vec<String> {
        events
            .iter()
            .map(|event| match event {
                MediaEvent::Packet(p) => format!("p{}", p.stream_index),
                MediaEvent::Frame(f) => format!("f{}", f.stream_index),
                MediaEvent::Subtitle(_) => "s".to_string(),
            })
            .collect()
    }

    #[test]
    fn test_interleave_packets_first_on_ties() {
        let snapshot = snapshot();
        let events = interleaved_events(&snapshot);
        assert_eq!(describe(&events), ["p0", "f0", "s", "p1", "f1", "p0"]);
    }

    #[test]
    fn test_events_without_time_keep_order() {
        let mut snapshot = snapshot();
        snapshot.packets[0].pts = None;
        let events = interleaved_events(&snapshot);
        assert_eq!(describe(&events)[0], "p0");
    }

    #[test]
    fn test_show_options_from_filter() {
        let mut filter = FilterTable::new();
        filter.parse_show_entries("format=duration:packet").unwrap();
        let opts = ShowOptions::from_filter(&filter);
        assert!(opts.format);
        assert!(opts.packets);
        assert!(!opts.frames);
        assert!(!opts.streams);
        assert_eq!(opts.log, None);
    }

    #[test]
    fn test_fourcc_string() {
        assert_eq!(fourcc_string(u32::from_le_bytes(*b"avc1")), "avc1");
        assert_eq!(fourcc_string(0), "[0][0][0][0]");
        assert_eq!(fourcc_string(u32::from_le_bytes(*b"mp4a")), "mp4a");
    }

    #[test]
    fn test_display_aspect_ratio() {
        let dar = display_aspect_ratio(720, 576, Rational::new(16, 15));
        assert_eq!(dar, Some(Rational::new(4, 3)));
    }

    #[test]
    fn test_display_aspect_ratio_out_of_range() {
        let sar = Rational::new(i32::MAX, 1);
        assert_eq!(display_aspect_ratio(i64::MAX, 1, sar), None);
        assert_eq!(display_aspect_ratio(i64::MIN, 3, Rational::new(1, 1)), None);
        assert_eq!(
            display_aspect_ratio(i64::MIN, i64::MIN, Rational::new(1, 1)),
            Some(Rational::new(1, 1))
        );
        assert_eq!(display_aspect_ratio(0, 576, sar), None);
    }

    #[test]
    fn test_display_rotation() {
        let identity = [65536, 0, 0, 0, 65536, 0, 0, 0, 1 << 30];
        assert_eq!(display_rotation(&identity), 0);
        let quarter = [0, 65536, 0, -65536, 0, 0, 0, 0, 1 << 30];
        assert_eq!(display_rotation(&quarter), -90);
        assert_eq!(display_rotation(&[0; 9]), 0);
    }

    #[test]
    fn test_packet_flags() {
        let packet = PacketInfo {
            keyframe: true,
            corrupt: true,
            ..PacketInfo::default()
        };
        assert_eq!(packet_flags(&packet), "K_C");
    }
}
