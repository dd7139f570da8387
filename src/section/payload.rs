//! Type discriminators for typed sections

/// How a typed section derives its type name from the entering payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeDiscriminator {
    /// Packet, stream or frame side data; name of the side data kind
    SideData,
    /// Stream group kind name
    StreamGroup,
    /// Payload string is the type itself
    Raw,
}

/// Payload passed when entering a section flagged `HAS_TYPE`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionPayload<'a> {
    /// Side data kind, `None` when the kind has no registered name
    SideData(Option<&'a str>),
    /// Stream group kind, `None` when unnamed
    StreamGroup(Option<&'a str>),
    Raw(&'a str),
}

impl TypeDiscriminator {
    /// Resolve the type name for `payload`.
    ///
    /// Panics when the payload variant does not belong to this discriminator.
    pub fn type_name<'a>(self, payload: &SectionPayload<'a>) -> &'a str {
        match (self, *payload) {
            (TypeDiscriminator::SideData, SectionPayload::SideData(name)) => {
                name.unwrap_or("unknown")
            }
            (TypeDiscriminator::StreamGroup, SectionPayload::StreamGroup(kind)) => {
                kind.unwrap_or("unknown")
            }
            (TypeDiscriminator::Raw, SectionPayload::Raw(value)) => value,
            (kind, payload) => panic!(
                "payload {:?} does not match type discriminator {:?}",
                payload, kind
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_data_names() {
        let kind = TypeDiscriminator::SideData;
        assert_eq!(kind.type_name(&SectionPayload::SideData(Some("Display Matrix"))), "Display Matrix");
        assert_eq!(kind.type_name(&SectionPayload::SideData(None)), "unknown");
    }

    #[test]
    fn test_raw_and_group() {
        assert_eq!(TypeDiscriminator::Raw.type_name(&SectionPayload::Raw("y")), "y");
        assert_eq!(
            TypeDiscriminator::StreamGroup.type_name(&SectionPayload::StreamGroup(None)),
            "unknown"
        );
    }

    #[test]
    #[should_panic(expected = "does not match")]
    fn test_mismatched_payload_panics() {
        TypeDiscriminator::Raw.type_name(&SectionPayload::SideData(None));
    }
}
