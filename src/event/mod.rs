//! KEL event envelope: the five establishment/interaction event bodies
//! sharing a common `{v, t, d, i, s}` header (spec §4.4).

pub mod event_data;
pub mod event_data_serde;
pub mod sections;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::Error;
use crate::prefix::{IdentifierPrefix, Prefix, SelfAddressingPrefix};
use crate::state::{EventSemantics, IdentifierState};

pub use event_data::{EventData, EventTypeTag};

/// A single KEL event: version string, type tag, SAID, AID and sequence
/// number, plus the type-specific body. Canonical field order is
/// `v t d i s <body fields>`, enforced by a manual `Serialize` impl
/// rather than relying on derive-macro tag/flatten ordering (spec §4.4,
/// §9 "dynamic typing in the source").
#[derive(Debug, Clone, PartialEq)]
pub struct KeyEvent {
    pub version: crate::event_message::SerializationInfo,
    pub said: SelfAddressingPrefix,
    pub prefix: IdentifierPrefix,
    pub sn: u64,
    pub data: EventData,
}

impl KeyEvent {
    pub fn new(
        version: crate::event_message::SerializationInfo,
        said: SelfAddressingPrefix,
        prefix: IdentifierPrefix,
        sn: u64,
        data: EventData,
    ) -> Self {
        Self {
            version,
            said,
            prefix,
            sn,
            data,
        }
    }

    pub fn event_type(&self) -> EventTypeTag {
        self.data.tag()
    }

    /// Builds the canonical ordered JSON object for this event, used both
    /// for serialization and as the input to `said::saidify`.
    pub fn to_canonical_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("v".to_string(), Value::String(self.version.to_str()));
        map.insert("t".to_string(), Value::String(self.event_type().as_str().to_string()));
        map.insert("d".to_string(), Value::String(self.said.to_str()));
        map.insert("i".to_string(), Value::String(self.prefix.to_str()));
        map.insert("s".to_string(), Value::String(format!("{:x}", self.sn)));
        for (key, value) in self.data.to_ordered_fields() {
            map.insert(key.to_string(), value);
        }
        Value::Object(map)
    }
}

impl EventSemantics for KeyEvent {
    fn apply_to(&self, state: IdentifierState) -> Result<IdentifierState, Error> {
        match &self.data {
            EventData::Icp(_) | EventData::Dip(_) => {
                if state.prefix != IdentifierPrefix::default() || self.sn != 0 {
                    return Err(Error::SequenceGap { expected: 0, got: self.sn });
                }
            }
            _ => {
                if self.prefix != state.prefix {
                    return Err(Error::InvalidInput("event AID does not match state".into()));
                }
                if self.sn != state.sn + 1 {
                    return Err(Error::SequenceGap {
                        expected: state.sn + 1,
                        got: self.sn,
                    });
                }
            }
        }
        Ok(IdentifierState {
            sn: self.sn,
            prefix: self.prefix.clone(),
            last_event_said: self.said.clone(),
            ..self.data.apply_to(state)?
        })
    }
}

impl Serialize for KeyEvent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_canonical_value().serialize(serializer)
    }
}

#[derive(Deserialize)]
struct EnvelopeHeader {
    v: crate::event_message::SerializationInfo,
    t: String,
    d: SelfAddressingPrefix,
    i: IdentifierPrefix,
    s: String,
    #[serde(flatten)]
    rest: Value,
}

impl<'de> Deserialize<'de> for KeyEvent {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let header = EnvelopeHeader::deserialize(deserializer)?;
        let tag = EventTypeTag::from_str(&header.t).map_err(de::Error::custom)?;
        let sn = u64::from_str_radix(&header.s, 16).map_err(de::Error::custom)?;
        let data = EventData::from_tagged_value(tag, header.rest).map_err(de::Error::custom)?;
        Ok(KeyEvent {
            version: header.v,
            said: header.d,
            prefix: header.i,
            sn,
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::Protocol;
    use crate::derivation::{Basic, SelfAddressing};
    use crate::event::event_data::InceptionData;
    use crate::event::sections::KeyConfig;
    use crate::event_message::SerializationFormats;

    fn sample_icp() -> KeyEvent {
        let key = Basic::Ed25519.derive(&[7u8; 32]);
        let kc = KeyConfig::new(vec![key.clone()], vec![], None, None);
        let data = EventData::Icp(InceptionData::new(kc, None, None, None, None));
        KeyEvent::new(
            crate::event_message::SerializationInfo::new(Protocol::Keri, SerializationFormats::JSON, 0),
            SelfAddressing::Blake3_256.derive(b"placeholder"),
            IdentifierPrefix::Basic(key),
            0,
            data,
        )
    }

    #[test]
    fn field_order_is_v_t_d_i_s_then_body() {
        let event = sample_icp();
        let value = event.to_canonical_value();
        let obj = value.as_object().unwrap();
        let keys: Vec<&String> = obj.keys().collect();
        assert_eq!(keys[0], "v");
        assert_eq!(keys[1], "t");
        assert_eq!(keys[2], "d");
        assert_eq!(keys[3], "i");
        assert_eq!(keys[4], "s");
        assert_eq!(keys[5], "kt");
    }

    #[test]
    fn round_trips_through_json() {
        let event = sample_icp();
        let s = serde_json::to_string(&event).unwrap();
        let back: KeyEvent = serde_json::from_str(&s).unwrap();
        assert_eq!(event, back);
    }
}
