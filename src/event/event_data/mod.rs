//! The five KEL event bodies, keyed by their `t` tag (spec §4.4).

pub mod delegated;
pub mod inception;
pub mod interaction;
pub mod rotation;

pub use delegated::{delegated_inception, delegated_rotation};
pub use inception::InceptionData;
pub use interaction::InteractionData;
pub use rotation::RotationData;

use serde_json::Value;

use crate::error::Error;

/// The semantic payload of a KEL event, dispatched on its `t` tag.
/// Structurally `Icp`/`Dip` and `Rot`/`Drt` are identical -- the tag and
/// the presence of a delegator prefix are what distinguish them.
#[derive(Debug, Clone, PartialEq)]
pub enum EventData {
    Icp(InceptionData),
    Rot(RotationData),
    Ixn(InteractionData),
    Dip(InceptionData),
    Drt(RotationData),
}

impl EventData {
    pub fn tag(&self) -> EventTypeTag {
        match self {
            EventData::Icp(_) => EventTypeTag::Icp,
            EventData::Rot(_) => EventTypeTag::Rot,
            EventData::Ixn(_) => EventTypeTag::Ixn,
            EventData::Dip(_) => EventTypeTag::Dip,
            EventData::Drt(_) => EventTypeTag::Drt,
        }
    }

    pub fn is_establishment(&self) -> bool {
        !matches!(self, EventData::Ixn(_))
    }

    pub fn to_ordered_fields(&self) -> Vec<(&'static str, Value)> {
        match self {
            EventData::Icp(d) | EventData::Dip(d) => d.to_ordered_fields(),
            EventData::Rot(d) | EventData::Drt(d) => d.to_ordered_fields(),
            EventData::Ixn(d) => d.to_ordered_fields(),
        }
    }

    /// Reconstructs the typed body from the flattened rest-of-envelope
    /// value, given the already-parsed `t` tag.
    pub fn from_tagged_value(tag: EventTypeTag, value: Value) -> Result<Self, Error> {
        use crate::event::event_data_serde::RawEventBody;
        let raw: RawEventBody =
            serde_json::from_value(value).map_err(|e| Error::ParseError(format!("bad event body: {e}")))?;
        match tag {
            EventTypeTag::Icp => Ok(EventData::Icp(raw.into_inception()?)),
            EventTypeTag::Dip => Ok(EventData::Dip(raw.into_inception()?)),
            EventTypeTag::Rot => Ok(EventData::Rot(raw.into_rotation()?)),
            EventTypeTag::Drt => Ok(EventData::Drt(raw.into_rotation()?)),
            EventTypeTag::Ixn => Ok(EventData::Ixn(raw.into_interaction()?)),
        }
    }
}

/// The `t` field of a KEL event envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventTypeTag {
    Icp,
    Rot,
    Ixn,
    Dip,
    Drt,
}

impl EventTypeTag {
    pub fn as_str(self) -> &'static str {
        match self {
            EventTypeTag::Icp => "icp",
            EventTypeTag::Rot => "rot",
            EventTypeTag::Ixn => "ixn",
            EventTypeTag::Dip => "dip",
            EventTypeTag::Drt => "drt",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, Error> {
        match s {
            "icp" => Ok(EventTypeTag::Icp),
            "rot" => Ok(EventTypeTag::Rot),
            "ixn" => Ok(EventTypeTag::Ixn),
            "dip" => Ok(EventTypeTag::Dip),
            "drt" => Ok(EventTypeTag::Drt),
            other => Err(Error::InvalidInput(format!("unknown KEL event type {other}"))),
        }
    }

    pub fn is_delegated(self) -> bool {
        matches!(self, EventTypeTag::Dip | EventTypeTag::Drt)
    }
}
