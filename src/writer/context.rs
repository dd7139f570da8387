//! Traversal state shared between the writer and its backend

use crate::section::{SectionDef, SectionId};

/// Maximum supported section nesting
pub const MAX_NESTING: usize = 12;

/// Per-report traversal state: open sections, sibling counts, prefix
/// buffers and the packets-and-frames counters.
#[derive(Debug)]
pub struct TraversalContext {
    sections: Vec<SectionId>,
    item_count: [usize; MAX_NESTING],
    prefix: Vec<String>,
    nb_packets: usize,
    nb_frames: usize,
    nb_packet_frame: usize,
}

impl Default for TraversalContext {
    fn default() -> Self {
        Self::new()
    }
}

impl TraversalContext {
    pub fn new() -> Self {
        Self {
            sections: Vec::with_capacity(MAX_NESTING),
            item_count: [0; MAX_NESTING],
            prefix: vec![String::new(); MAX_NESTING],
            nb_packets: 0,
            nb_frames: 0,
            nb_packet_frame: 0,
        }
    }

    /// Number of open sections
    pub fn depth(&self) -> usize {
        self.sections.len()
    }

    /// Level of the innermost open section, root being 0
    pub fn level(&self) -> usize {
        assert!(!self.sections.is_empty(), "no section is open");
        self.sections.len() - 1
    }

    pub fn section_id(&self) -> SectionId {
        self.sections[self.level()]
    }

    pub fn section(&self) -> &'static SectionDef {
        self.section_id().def()
    }

    pub fn parent_id(&self) -> Option<SectionId> {
        let level = self.level();
        if level == 0 {
            None
        } else {
            Some(self.sections[level - 1])
        }
    }

    pub fn parent(&self) -> Option<&'static SectionDef> {
        self.parent_id().map(SectionId::def)
    }

    pub fn section_at(&self, level: usize) -> SectionId {
        self.sections[level]
    }

    /// Items already emitted or closed at `level`
    pub fn item_count(&self, level: usize) -> usize {
        self.item_count[level]
    }

    pub fn set_item_count(&mut self, level: usize, count: usize) {
        self.item_count[level] = count;
    }

    pub fn bump_item_count(&mut self, level: usize) {
        self.item_count[level] += 1;
    }

    pub fn prefix(&self, level: usize) -> &str {
        &self.prefix[level]
    }

    /// Prefix buffer of the current level
    pub fn prefix_mut(&mut self) -> &mut String {
        let level = self.level();
        &mut self.prefix[level]
    }

    /// Parent prefix and the current prefix buffer, for building one from
    /// the other. The current level must not be the root.
    pub fn split_prefix(&mut self) -> (&str, &mut String) {
        let level = self.level();
        assert!(level > 0, "root section has no parent prefix");
        let (parents, current) = self.prefix.split_at_mut(level);
        (parents[level - 1].as_str(), &mut current[0])
    }

    /// Ordinal of the current element among packets or frames of the same
    /// kind inside the packets-and-frames array
    pub fn packet_frame_ordinal(&self) -> usize {
        self.nb_packet_frame
    }

    /// Packets and frames closed so far inside the interleaved array
    pub fn packet_frame_totals(&self) -> (usize, usize) {
        (self.nb_packets, self.nb_frames)
    }

    pub(crate) fn push(&mut self, id: SectionId) {
        assert!(
            self.sections.len() < MAX_NESTING,
            "section '{}' exceeds the maximum nesting depth of {}",
            id.def().display_name(),
            MAX_NESTING
        );
        let parent = self.sections.last().copied();
        if let Some(parent) = parent {
            assert!(
                parent.def().has_child(id),
                "section '{}' is not a child of '{}'",
                id.def().display_name(),
                parent.def().display_name()
            );
        }

        let level = self.sections.len();
        self.sections.push(id);
        self.item_count[level] = 0;
        self.prefix[level].clear();

        if id == SectionId::PacketsAndFrames {
            self.nb_packets = 0;
            self.nb_frames = 0;
            self.nb_packet_frame = 0;
        } else if parent == Some(SectionId::PacketsAndFrames) {
            self.nb_packet_frame = if id == SectionId::Packet {
                self.nb_packets
            } else {
                self.nb_frames
            };
        }
    }

    /// Account the current section as a completed sibling of its parent
    pub(crate) fn complete_current(&mut self) {
        let id = self.section_id();
        match self.parent_id() {
            Some(parent) => {
                let level = self.level();
                self.item_count[level - 1] += 1;
                if parent == SectionId::PacketsAndFrames {
                    if id == SectionId::Packet {
                        self.nb_packets += 1;
                    } else {
                        self.nb_frames += 1;
                    }
                }
            }
            None => {}
        }
    }

    pub(crate) fn pop(&mut self) {
        assert!(self.sections.pop().is_some(), "exit_section called with no open section");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_resets_level_state() {
        let mut ctx = TraversalContext::new();
        ctx.push(SectionId::Root);
        ctx.push(SectionId::Streams);
        ctx.prefix_mut().push_str("stale");
        ctx.set_item_count(1, 5);
        ctx.pop();
        ctx.push(SectionId::Format);
        assert_eq!(ctx.item_count(1), 0);
        assert_eq!(ctx.prefix(1), "");
        assert_eq!(ctx.parent_id(), Some(SectionId::Root));
    }

    #[test]
    fn test_completed_children_count_in_parent() {
        let mut ctx = TraversalContext::new();
        ctx.push(SectionId::Root);
        ctx.push(SectionId::Streams);
        for _ in 0..3 {
            ctx.push(SectionId::Stream);
            ctx.complete_current();
            ctx.pop();
        }
        assert_eq!(ctx.item_count(1), 3);
    }

    #[test]
    fn test_packet_frame_counters() {
        let mut ctx = TraversalContext::new();
        ctx.push(SectionId::Root);
        ctx.push(SectionId::PacketsAndFrames);
        let mut ordinals = Vec::new();
        for id in [SectionId::Packet, SectionId::Frame, SectionId::Packet, SectionId::Frame] {
            ctx.push(id);
            ordinals.push((ctx.packet_frame_ordinal(), ctx.item_count(1)));
            ctx.complete_current();
            ctx.pop();
        }
        assert_eq!(ordinals, vec![(0, 0), (0, 1), (1, 2), (1, 3)]);
        assert_eq!(ctx.packet_frame_totals(), (2, 2));
    }

    #[test]
    fn test_split_prefix() {
        let mut ctx = TraversalContext::new();
        ctx.push(SectionId::Root);
        ctx.prefix_mut().push_str("root.");
        ctx.push(SectionId::Format);
        let (parent, current) = ctx.split_prefix();
        current.push_str(parent);
        current.push_str("format.");
        assert_eq!(ctx.prefix(1), "root.format.");
    }

    #[test]
    #[should_panic(expected = "maximum nesting depth")]
    fn test_nesting_overflow_panics() {
        let mut ctx = TraversalContext::new();
        for id in [
            SectionId::Root,
            SectionId::StreamGroups,
            SectionId::StreamGroup,
            SectionId::StreamGroupComponents,
            SectionId::StreamGroupComponent,
            SectionId::StreamGroupSubcomponents,
            SectionId::StreamGroupSubcomponent,
            SectionId::StreamGroupPieces,
            SectionId::StreamGroupPiece,
            SectionId::StreamGroupSubpieces,
            SectionId::StreamGroupSubpiece,
            SectionId::StreamGroupBlocks,
            SectionId::StreamGroupBlock,
        ] {
            ctx.push(id);
        }
    }

    #[test]
    #[should_panic(expected = "is not a child of")]
    fn test_wrong_parent_panics() {
        let mut ctx = TraversalContext::new();
        ctx.push(SectionId::Root);
        ctx.push(SectionId::Stream);
    }

    #[test]
    #[should_panic(expected = "no open section")]
    fn test_pop_underflow_panics() {
        let mut ctx = TraversalContext::new();
        ctx.pop();
    }
}
