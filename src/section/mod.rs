//! Static section schema
//!
//! Every section a report can contain is declared once in [`SECTIONS`]. A
//! section is addressed by its [`SectionId`], carries structural
//! [`SectionFlags`] and lists the sections allowed directly below it. The
//! table is immutable; per-report filter state lives in [`filter::FilterTable`].

use std::fmt::{self, Write as _};
use std::ops::BitOr;

pub mod filter;
pub mod payload;

pub use filter::FilterTable;
pub use payload::{SectionPayload, TypeDiscriminator};

/// Maximum number of children a section may declare
pub const MAX_CHILDREN: usize = 12;

/// Structural flags of a section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SectionFlags(u8);

impl SectionFlags {
    pub const NONE: SectionFlags = SectionFlags(0);
    /// Only contains other sections, no data of its own
    pub const IS_WRAPPER: SectionFlags = SectionFlags(1);
    /// Contains an array of elements of the same type
    pub const IS_ARRAY: SectionFlags = SectionFlags(2);
    /// Contains a data-driven set of keys
    pub const HAS_VARIABLE_FIELDS: SectionFlags = SectionFlags(4);
    /// Carries a runtime type discriminator
    pub const HAS_TYPE: SectionFlags = SectionFlags(8);

    pub const fn contains(self, other: SectionFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn union(self, other: SectionFlags) -> SectionFlags {
        SectionFlags(self.0 | other.0)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }
}

impl BitOr for SectionFlags {
    type Output = SectionFlags;

    fn bitor(self, rhs: SectionFlags) -> SectionFlags {
        self.union(rhs)
    }
}

/// Identifier of every known section, also the index into [`SECTIONS`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SectionId {
    Root,
    Chapters,
    Chapter,
    ChapterTags,
    Error,
    Format,
    FormatTags,
    Frames,
    Frame,
    FrameTags,
    FrameSideDataList,
    FrameSideData,
    FrameSideDataTimecodeList,
    FrameSideDataTimecode,
    FrameSideDataComponentList,
    FrameSideDataComponent,
    FrameSideDataPieceList,
    FrameSideDataPiece,
    FrameLogs,
    FrameLog,
    LibraryVersions,
    LibraryVersion,
    Packets,
    PacketsAndFrames,
    Packet,
    PacketTags,
    PacketSideDataList,
    PacketSideData,
    PixelFormats,
    PixelFormat,
    PixelFormatFlags,
    PixelFormatComponents,
    PixelFormatComponent,
    Programs,
    Program,
    ProgramTags,
    ProgramStreams,
    ProgramStream,
    ProgramStreamDisposition,
    ProgramStreamTags,
    ProgramVersion,
    StreamGroups,
    StreamGroup,
    StreamGroupTags,
    StreamGroupDisposition,
    StreamGroupComponents,
    StreamGroupComponent,
    StreamGroupSubcomponents,
    StreamGroupSubcomponent,
    StreamGroupPieces,
    StreamGroupPiece,
    StreamGroupSubpieces,
    StreamGroupSubpiece,
    StreamGroupBlocks,
    StreamGroupBlock,
    StreamGroupStreams,
    StreamGroupStream,
    StreamGroupStreamDisposition,
    StreamGroupStreamTags,
    Streams,
    Stream,
    StreamDisposition,
    StreamTags,
    StreamSideDataList,
    StreamSideData,
    Subtitle,
}

impl SectionId {
    /// Position in [`SECTIONS`]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Schema entry for this section
    pub fn def(self) -> &'static SectionDef {
        &SECTIONS[self.index()]
    }

    pub fn name(self) -> &'static str {
        self.def().name
    }

    /// Iterate over every section in table order
    pub fn all() -> impl Iterator<Item = SectionId> {
        SECTIONS.iter().map(|def| def.id)
    }
}

impl fmt::Display for SectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.def().display_name())
    }
}

/// Immutable description of one section
#[derive(Debug)]
pub struct SectionDef {
    pub id: SectionId,
    pub name: &'static str,
    pub flags: SectionFlags,
    pub children: &'static [SectionId],
    /// Name of each contained element, for repeated or variable-keyed content
    pub element_name: Option<&'static str>,
    /// Disambiguating alias when `name` recurs under different parents
    pub unique_name: Option<&'static str>,
    pub type_kind: Option<TypeDiscriminator>,
}

impl SectionDef {
    pub fn is_wrapper(&self) -> bool {
        self.flags.contains(SectionFlags::IS_WRAPPER)
    }

    pub fn is_array(&self) -> bool {
        self.flags.contains(SectionFlags::IS_ARRAY)
    }

    pub fn has_variable_fields(&self) -> bool {
        self.flags.contains(SectionFlags::HAS_VARIABLE_FIELDS)
    }

    pub fn has_type(&self) -> bool {
        self.flags.contains(SectionFlags::HAS_TYPE)
    }

    /// Unique name when present, otherwise the plain name
    pub fn display_name(&self) -> &'static str {
        self.unique_name.unwrap_or(self.name)
    }

    pub fn has_child(&self, id: SectionId) -> bool {
        self.children.contains(&id)
    }
}

const W: SectionFlags = SectionFlags::IS_WRAPPER;
const A: SectionFlags = SectionFlags::IS_ARRAY;
const V: SectionFlags = SectionFlags::HAS_VARIABLE_FIELDS;
const VT: SectionFlags = SectionFlags::HAS_VARIABLE_FIELDS.union(SectionFlags::HAS_TYPE);
const N: SectionFlags = SectionFlags::NONE;

const fn section(
    id: SectionId,
    name: &'static str,
    flags: SectionFlags,
    children: &'static [SectionId],
) -> SectionDef {
    SectionDef {
        id,
        name,
        flags,
        children,
        element_name: None,
        unique_name: None,
        type_kind: None,
    }
}

impl SectionDef {
    const fn element(mut self, element_name: &'static str) -> Self {
        self.element_name = Some(element_name);
        self
    }

    const fn unique(mut self, unique_name: &'static str) -> Self {
        self.unique_name = Some(unique_name);
        self
    }

    const fn typed(mut self, kind: TypeDiscriminator) -> Self {
        self.type_kind = Some(kind);
        self
    }
}

use SectionId as S;

/// The section table, indexed by [`SectionId::index`]
pub static SECTIONS: [SectionDef; 66] = [
    section(S::Root, "root", W, &[
        S::Chapters, S::Format, S::Frames, S::Programs, S::StreamGroups, S::Streams,
        S::Packets, S::Error, S::ProgramVersion, S::LibraryVersions, S::PixelFormats,
        S::PacketsAndFrames,
    ]),
    section(S::Chapters, "chapters", A, &[S::Chapter]),
    section(S::Chapter, "chapter", N, &[S::ChapterTags]),
    section(S::ChapterTags, "tags", V, &[]).element("tag").unique("chapter_tags"),
    section(S::Error, "error", N, &[]),
    section(S::Format, "format", N, &[S::FormatTags]),
    section(S::FormatTags, "tags", V, &[]).element("tag").unique("format_tags"),
    section(S::Frames, "frames", A, &[S::Frame, S::Subtitle]),
    section(S::Frame, "frame", N, &[S::FrameTags, S::FrameSideDataList, S::FrameLogs]),
    section(S::FrameTags, "tags", V, &[]).element("tag").unique("frame_tags"),
    section(S::FrameSideDataList, "side_data_list", A, &[S::FrameSideData])
        .element("side_data")
        .unique("frame_side_data_list"),
    section(S::FrameSideData, "side_data", VT, &[S::FrameSideDataTimecodeList, S::FrameSideDataComponentList])
        .element("side_datum")
        .unique("frame_side_data")
        .typed(TypeDiscriminator::SideData),
    section(S::FrameSideDataTimecodeList, "timecodes", A, &[S::FrameSideDataTimecode]),
    section(S::FrameSideDataTimecode, "timecode", N, &[]),
    section(S::FrameSideDataComponentList, "components", A, &[S::FrameSideDataComponent])
        .element("component")
        .unique("frame_side_data_components"),
    section(S::FrameSideDataComponent, "component", VT, &[S::FrameSideDataPieceList])
        .element("component_entry")
        .unique("frame_side_data_component")
        .typed(TypeDiscriminator::Raw),
    section(S::FrameSideDataPieceList, "pieces", A, &[S::FrameSideDataPiece])
        .element("piece")
        .unique("frame_side_data_pieces"),
    section(S::FrameSideDataPiece, "piece", VT, &[])
        .element("piece_entry")
        .unique("frame_side_data_piece")
        .typed(TypeDiscriminator::Raw),
    section(S::FrameLogs, "logs", A, &[S::FrameLog]),
    section(S::FrameLog, "log", N, &[]),
    section(S::LibraryVersions, "library_versions", A, &[S::LibraryVersion]),
    section(S::LibraryVersion, "library_version", N, &[]),
    section(S::Packets, "packets", A, &[S::Packet]),
    section(S::PacketsAndFrames, "packets_and_frames", A, &[S::Packet, S::Frame, S::Subtitle]),
    section(S::Packet, "packet", N, &[S::PacketTags, S::PacketSideDataList]),
    section(S::PacketTags, "tags", V, &[]).element("tag").unique("packet_tags"),
    section(S::PacketSideDataList, "side_data_list", A, &[S::PacketSideData])
        .element("side_data")
        .unique("packet_side_data_list"),
    section(S::PacketSideData, "side_data", VT, &[])
        .element("side_datum")
        .unique("packet_side_data")
        .typed(TypeDiscriminator::SideData),
    section(S::PixelFormats, "pixel_formats", A, &[S::PixelFormat]),
    section(S::PixelFormat, "pixel_format", N, &[S::PixelFormatFlags, S::PixelFormatComponents]),
    section(S::PixelFormatFlags, "flags", N, &[]).unique("pixel_format_flags"),
    section(S::PixelFormatComponents, "components", A, &[S::PixelFormatComponent])
        .unique("pixel_format_components"),
    section(S::PixelFormatComponent, "component", N, &[]),
    section(S::Programs, "programs", A, &[S::Program]),
    section(S::Program, "program", N, &[S::ProgramTags, S::ProgramStreams]),
    section(S::ProgramTags, "tags", V, &[]).element("tag").unique("program_tags"),
    section(S::ProgramStreams, "streams", A, &[S::ProgramStream]).unique("program_streams"),
    section(S::ProgramStream, "stream", N, &[S::ProgramStreamDisposition, S::ProgramStreamTags])
        .unique("program_stream"),
    section(S::ProgramStreamDisposition, "disposition", N, &[])
        .unique("program_stream_disposition"),
    section(S::ProgramStreamTags, "tags", V, &[]).element("tag").unique("program_stream_tags"),
    section(S::ProgramVersion, "program_version", N, &[]),
    section(S::StreamGroups, "stream_groups", A, &[S::StreamGroup]),
    section(S::StreamGroup, "stream_group", N, &[
        S::StreamGroupTags, S::StreamGroupDisposition, S::StreamGroupComponents, S::StreamGroupStreams,
    ]),
    section(S::StreamGroupTags, "tags", V, &[]).element("tag").unique("stream_group_tags"),
    section(S::StreamGroupDisposition, "disposition", N, &[]).unique("stream_group_disposition"),
    section(S::StreamGroupComponents, "components", A, &[S::StreamGroupComponent])
        .element("component")
        .unique("stream_group_components"),
    section(S::StreamGroupComponent, "component", VT, &[S::StreamGroupSubcomponents])
        .element("component_entry")
        .unique("stream_group_component")
        .typed(TypeDiscriminator::StreamGroup),
    section(S::StreamGroupSubcomponents, "subcomponents", A, &[S::StreamGroupSubcomponent])
        .element("component"),
    section(S::StreamGroupSubcomponent, "subcomponent", VT, &[S::StreamGroupPieces])
        .element("subcomponent_entry")
        .typed(TypeDiscriminator::Raw),
    section(S::StreamGroupPieces, "pieces", A, &[S::StreamGroupPiece])
        .element("piece")
        .unique("stream_group_pieces"),
    section(S::StreamGroupPiece, "piece", VT, &[S::StreamGroupSubpieces])
        .element("piece_entry")
        .unique("stream_group_piece")
        .typed(TypeDiscriminator::Raw),
    section(S::StreamGroupSubpieces, "subpieces", A, &[S::StreamGroupSubpiece]).element("subpiece"),
    section(S::StreamGroupSubpiece, "subpiece", VT, &[S::StreamGroupBlocks])
        .element("subpiece_entry")
        .typed(TypeDiscriminator::Raw),
    section(S::StreamGroupBlocks, "blocks", A, &[S::StreamGroupBlock]).element("block"),
    section(S::StreamGroupBlock, "block", VT, &[])
        .element("block_entry")
        .typed(TypeDiscriminator::Raw),
    section(S::StreamGroupStreams, "streams", A, &[S::StreamGroupStream])
        .unique("stream_group_streams"),
    section(S::StreamGroupStream, "stream", N, &[S::StreamGroupStreamDisposition, S::StreamGroupStreamTags])
        .unique("stream_group_stream"),
    section(S::StreamGroupStreamDisposition, "disposition", N, &[])
        .unique("stream_group_stream_disposition"),
    section(S::StreamGroupStreamTags, "tags", V, &[])
        .element("tag")
        .unique("stream_group_stream_tags"),
    section(S::Streams, "streams", A, &[S::Stream]),
    section(S::Stream, "stream", N, &[S::StreamDisposition, S::StreamTags, S::StreamSideDataList]),
    section(S::StreamDisposition, "disposition", N, &[]).unique("stream_disposition"),
    section(S::StreamTags, "tags", V, &[]).element("tag").unique("stream_tags"),
    section(S::StreamSideDataList, "side_data_list", A, &[S::StreamSideData])
        .element("side_data")
        .unique("stream_side_data_list"),
    section(S::StreamSideData, "side_data", VT, &[])
        .element("side_datum")
        .unique("stream_side_data")
        .typed(TypeDiscriminator::SideData),
    section(S::Subtitle, "subtitle", N, &[]),
];

/// One-time startup self check of the section table.
///
/// Panics when the table is malformed: ids out of order, too many children,
/// a typed section without a discriminator, a variable-fields section without
/// an element name, an orphan section or a cycle.
pub fn validate_schema() {
    let mut referenced = vec![false; SECTIONS.len()];
    for (index, def) in SECTIONS.iter().enumerate() {
        assert_eq!(def.id.index(), index, "section '{}' is out of order", def.name);
        assert!(
            def.children.len() <= MAX_CHILDREN,
            "section '{}' has more than {} children",
            def.name,
            MAX_CHILDREN
        );
        assert_eq!(
            def.has_type(),
            def.type_kind.is_some(),
            "section '{}' type discriminator does not match its flags",
            def.name
        );
        assert!(
            !def.has_variable_fields() || def.element_name.is_some(),
            "section '{}' has variable fields but no element name",
            def.name
        );
        for child in def.children {
            referenced[child.index()] = true;
        }
    }

    assert!(SectionId::Root.def().is_wrapper(), "root section must be a wrapper");
    for def in &SECTIONS {
        if def.id != SectionId::Root {
            assert!(referenced[def.id.index()], "section '{}' is not reachable", def.name);
        }
    }

    let mut path = Vec::new();
    check_acyclic(SectionId::Root, &mut path);
}

fn check_acyclic(id: SectionId, path: &mut Vec<SectionId>) {
    assert!(
        !path.contains(&id),
        "section '{}' is part of a cycle",
        id.name()
    );
    path.push(id);
    for &child in id.def().children {
        check_acyclic(child, path);
    }
    path.pop();
}

/// Render the schema as an indented tree with flag columns
pub fn format_sections() -> String {
    let mut out = String::from(
        "Sections:\n\
         W... = Section is a wrapper (contains other sections, no local entries)\n\
         .A.. = Section contains an array of elements of the same type\n\
         ..V. = Section may contain a variable number of fields with variable keys\n\
         ...T = Section contain a unique type\n\
         FLAGS NAME/UNIQUE_NAME\n\
         ----\n",
    );
    format_section_tree(&mut out, SectionId::Root, 0);
    out
}

fn format_section_tree(out: &mut String, id: SectionId, level: usize) {
    let def = id.def();
    let flag = |set: bool, c: char| if set { c } else { '.' };
    out.push(flag(def.is_wrapper(), 'W'));
    out.push(flag(def.is_array(), 'A'));
    out.push(flag(def.has_variable_fields(), 'V'));
    out.push(flag(def.has_type(), 'T'));
    let _ = write!(out, "{:width$}  {}", ' ', def.name, width = (level * 4).max(1));
    if let Some(unique) = def.unique_name {
        let _ = write!(out, "/{}", unique);
    }
    out.push('\n');
    for &child in def.children {
        format_section_tree(out, child, level + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_self_check_passes() {
        validate_schema();
    }

    #[test]
    fn test_root_children_within_limit() {
        let root = SectionId::Root.def();
        assert_eq!(root.children.len(), MAX_CHILDREN);
        assert!(root.has_child(SectionId::PacketsAndFrames));
        assert!(SECTIONS.iter().all(|def| def.children.len() <= MAX_CHILDREN));
    }

    #[test]
    fn test_lookup_by_id() {
        assert_eq!(SectionId::StreamTags.def().name, "tags");
        assert_eq!(SectionId::StreamTags.def().unique_name, Some("stream_tags"));
        assert_eq!(SectionId::StreamTags.to_string(), "stream_tags");
        assert_eq!(SectionId::Format.to_string(), "format");
    }

    #[test]
    fn test_flags() {
        let def = SectionId::FrameSideData.def();
        assert!(def.has_variable_fields());
        assert!(def.has_type());
        assert!(!def.is_array());
        assert!(SectionId::Root.def().is_wrapper());
        assert!(SectionId::Streams.def().is_array());
        assert_eq!((SectionFlags::IS_ARRAY | SectionFlags::IS_WRAPPER).bits(), 3);
    }

    #[test]
    fn test_packets_and_frames_children() {
        let def = SectionId::PacketsAndFrames.def();
        assert!(def.has_child(SectionId::Packet));
        assert!(def.has_child(SectionId::Frame));
        assert!(SectionId::Root.def().has_child(SectionId::PacketsAndFrames));
    }

    #[test]
    fn test_section_listing() {
        let listing = format_sections();
        assert!(listing.starts_with("Sections:\n"));
        let line = |flags: &str, level: usize, name: &str| {
            format!("{}{}  {}\n", flags, " ".repeat((level * 4).max(1)), name)
        };
        assert!(listing.contains(&line("W...", 0, "root")));
        assert!(listing.contains(&line(".A..", 1, "streams")));
        assert!(listing.contains(&line("..V.", 3, "tags/stream_tags")));
        assert!(listing.contains(&line("..VT", 4, "side_data/frame_side_data")));
    }
}
