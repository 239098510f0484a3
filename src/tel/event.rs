//! TEL event bodies (spec §4.5). Unlike KEL events, the position of the
//! registry/credential identifier relative to the sequence number is not
//! uniform across types (`vcp` places `ii` between `i` and `s`), so each
//! variant owns its full field order rather than sharing one envelope
//! layout.

use serde_json::{json, Map, Value};

use crate::error::Error;
use crate::event::sections::seal::Seal;
use crate::event_message::SerializationInfo;
use crate::prefix::{BasicPrefix, IdentifierPrefix, Prefix, SelfAddressingPrefix};

/// `vcp`: registry inception. Field order `v t d i ii s c bt b n`.
#[derive(Debug, Clone, PartialEq)]
pub struct VcpEvent {
    pub version: SerializationInfo,
    pub said: SelfAddressingPrefix,
    pub issuer: IdentifierPrefix,
    pub config_traits: Vec<String>,
    pub backer_threshold: u64,
    pub backers: Vec<BasicPrefix>,
    pub nonce: String,
}

impl VcpEvent {
    pub fn registry_id(&self) -> IdentifierPrefix {
        IdentifierPrefix::SelfAddressing(self.said.clone())
    }

    pub fn to_ordered_fields(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("v", json!(self.version.to_str())),
            ("t", json!("vcp")),
            ("d", json!(self.said)),
            ("i", json!(self.said)),
            ("ii", json!(self.issuer)),
            ("s", json!("0")),
            ("c", json!(self.config_traits)),
            ("bt", json!(format!("{:x}", self.backer_threshold))),
            ("b", json!(self.backers)),
            ("n", json!(self.nonce)),
        ]
    }
}

/// `iss`: credential issuance. Field order `v t d i s ri dt`. `i` is the
/// ACDC's SAID, `s` is always `0` from the credential's perspective.
#[derive(Debug, Clone, PartialEq)]
pub struct IssEvent {
    pub version: SerializationInfo,
    pub said: SelfAddressingPrefix,
    pub credential_said: SelfAddressingPrefix,
    pub registry_id: IdentifierPrefix,
    pub issued_at: String,
}

impl IssEvent {
    pub fn to_ordered_fields(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("v", json!(self.version.to_str())),
            ("t", json!("iss")),
            ("d", json!(self.said)),
            ("i", json!(self.credential_said)),
            ("s", json!("0")),
            ("ri", json!(self.registry_id)),
            ("dt", json!(self.issued_at)),
        ]
    }
}

/// `rev`: credential revocation. Field order `v t d i s ri p dt`. `s` is
/// always `1`; `p` is the prior `iss` event's SAID for this credential.
#[derive(Debug, Clone, PartialEq)]
pub struct RevEvent {
    pub version: SerializationInfo,
    pub said: SelfAddressingPrefix,
    pub credential_said: SelfAddressingPrefix,
    pub registry_id: IdentifierPrefix,
    pub previous_event_said: SelfAddressingPrefix,
    pub revoked_at: String,
}

impl RevEvent {
    pub fn to_ordered_fields(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("v", json!(self.version.to_str())),
            ("t", json!("rev")),
            ("d", json!(self.said)),
            ("i", json!(self.credential_said)),
            ("s", json!("1")),
            ("ri", json!(self.registry_id)),
            ("p", json!(self.previous_event_said)),
            ("dt", json!(self.revoked_at)),
        ]
    }
}

/// `ixn` (TEL-scoped): anchors a nested registry's `vcp` SAID, or any
/// other externally-relevant seal, into the registry's own sequence.
/// Field order `v t d i s p a`.
#[derive(Debug, Clone, PartialEq)]
pub struct TelInteractionEvent {
    pub version: SerializationInfo,
    pub said: SelfAddressingPrefix,
    pub registry_id: IdentifierPrefix,
    pub sn: u64,
    pub previous_event_said: SelfAddressingPrefix,
    pub seals: Vec<Seal>,
}

impl TelInteractionEvent {
    pub fn to_ordered_fields(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("v", json!(self.version.to_str())),
            ("t", json!("ixn")),
            ("d", json!(self.said)),
            ("i", json!(self.registry_id)),
            ("s", json!(format!("{:x}", self.sn))),
            ("p", json!(self.previous_event_said)),
            ("a", json!(self.seals)),
        ]
    }
}

/// `vrt`: registry rotation, adjusting the backer list. Field order
/// `v t d i s p ba br bt` (additions before removals, mirroring the
/// cuts-then-adds application order but listed for readability as
/// additions/removals/new-threshold).
#[derive(Debug, Clone, PartialEq)]
pub struct VrtEvent {
    pub version: SerializationInfo,
    pub said: SelfAddressingPrefix,
    pub registry_id: IdentifierPrefix,
    pub sn: u64,
    pub previous_event_said: SelfAddressingPrefix,
    pub backers_added: Vec<BasicPrefix>,
    pub backers_removed: Vec<BasicPrefix>,
    pub backer_threshold: u64,
}

impl VrtEvent {
    pub fn to_ordered_fields(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("v", json!(self.version.to_str())),
            ("t", json!("vrt")),
            ("d", json!(self.said)),
            ("i", json!(self.registry_id)),
            ("s", json!(format!("{:x}", self.sn))),
            ("p", json!(self.previous_event_said)),
            ("ba", json!(self.backers_added)),
            ("br", json!(self.backers_removed)),
            ("bt", json!(format!("{:x}", self.backer_threshold))),
        ]
    }
}

/// Any one of the five TEL event bodies.
#[derive(Debug, Clone, PartialEq)]
pub enum TelEvent {
    Vcp(VcpEvent),
    Iss(IssEvent),
    Rev(RevEvent),
    Ixn(TelInteractionEvent),
    Vrt(VrtEvent),
}

impl TelEvent {
    pub fn tag(&self) -> &'static str {
        match self {
            TelEvent::Vcp(_) => "vcp",
            TelEvent::Iss(_) => "iss",
            TelEvent::Rev(_) => "rev",
            TelEvent::Ixn(_) => "ixn",
            TelEvent::Vrt(_) => "vrt",
        }
    }

    pub fn said(&self) -> &SelfAddressingPrefix {
        match self {
            TelEvent::Vcp(e) => &e.said,
            TelEvent::Iss(e) => &e.said,
            TelEvent::Rev(e) => &e.said,
            TelEvent::Ixn(e) => &e.said,
            TelEvent::Vrt(e) => &e.said,
        }
    }

    pub fn sn(&self) -> u64 {
        match self {
            TelEvent::Vcp(_) | TelEvent::Iss(_) => 0,
            TelEvent::Rev(_) => 1,
            TelEvent::Ixn(e) => e.sn,
            TelEvent::Vrt(e) => e.sn,
        }
    }

    /// The scope this event belongs to: the registry id for everything
    /// except `iss`/`rev`, whose `i` is the credential's own SAID.
    pub fn registry_scope(&self) -> Option<IdentifierPrefix> {
        match self {
            TelEvent::Vcp(e) => Some(e.registry_id()),
            TelEvent::Iss(e) => Some(e.registry_id.clone()),
            TelEvent::Rev(e) => Some(e.registry_id.clone()),
            TelEvent::Ixn(e) => Some(e.registry_id.clone()),
            TelEvent::Vrt(e) => Some(e.registry_id.clone()),
        }
    }

    pub fn to_canonical_value(&self) -> Value {
        let fields = match self {
            TelEvent::Vcp(e) => e.to_ordered_fields(),
            TelEvent::Iss(e) => e.to_ordered_fields(),
            TelEvent::Rev(e) => e.to_ordered_fields(),
            TelEvent::Ixn(e) => e.to_ordered_fields(),
            TelEvent::Vrt(e) => e.to_ordered_fields(),
        };
        let mut map = Map::new();
        for (k, v) in fields {
            map.insert(k.to_string(), v);
        }
        Value::Object(map)
    }
}

impl serde::Serialize for TelEvent {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_canonical_value().serialize(serializer)
    }
}

impl<'de> serde::Deserialize<'de> for TelEvent {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = <Value as serde::Deserialize>::deserialize(deserializer)?;
        TelEvent::from_value(value).map_err(serde::de::Error::custom)
    }
}

impl TelEvent {
    pub fn from_value(value: Value) -> Result<Self, Error> {
        let t = value
            .get("t")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::ParseError("missing tel event tag".into()))?
            .to_string();
        match t.as_str() {
            "vcp" => Ok(TelEvent::Vcp(parse_vcp(value)?)),
            "iss" => Ok(TelEvent::Iss(parse_iss(value)?)),
            "rev" => Ok(TelEvent::Rev(parse_rev(value)?)),
            "ixn" => Ok(TelEvent::Ixn(parse_ixn(value)?)),
            "vrt" => Ok(TelEvent::Vrt(parse_vrt(value)?)),
            other => Err(Error::ParseError(format!("unknown tel event type {other}"))),
        }
    }
}

fn field<'a>(value: &'a Value, key: &str) -> Result<&'a Value, Error> {
    value
        .get(key)
        .ok_or_else(|| Error::ParseError(format!("missing tel field {key}")))
}

fn as_str(value: &Value, key: &str) -> Result<String, Error> {
    field(value, key)?
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| Error::ParseError(format!("tel field {key} is not a string")))
}

fn as_said(value: &Value, key: &str) -> Result<SelfAddressingPrefix, Error> {
    as_str(value, key)?
        .parse()
        .map_err(|_| Error::ParseError(format!("bad said in tel field {key}")))
}

fn as_identifier(value: &Value, key: &str) -> Result<IdentifierPrefix, Error> {
    as_str(value, key)?
        .parse()
        .map_err(|_| Error::ParseError(format!("bad identifier in tel field {key}")))
}

fn as_hex(value: &Value, key: &str) -> Result<u64, Error> {
    let s = as_str(value, key)?;
    u64::from_str_radix(&s, 16).map_err(|_| Error::ParseError(format!("bad hex in tel field {key}")))
}

fn as_version(value: &Value) -> Result<SerializationInfo, Error> {
    SerializationInfo::from_str(&as_str(value, "v")?)
}

fn as_prefix_vec(value: &Value, key: &str) -> Result<Vec<BasicPrefix>, Error> {
    field(value, key)?
        .as_array()
        .ok_or_else(|| Error::ParseError(format!("tel field {key} is not an array")))?
        .iter()
        .map(|v| {
            v.as_str()
                .ok_or_else(|| Error::ParseError(format!("tel field {key} has non-string element")))?
                .parse()
                .map_err(|_| Error::ParseError(format!("bad basic prefix in {key}")))
        })
        .collect()
}

fn as_string_vec(value: &Value, key: &str) -> Result<Vec<String>, Error> {
    field(value, key)?
        .as_array()
        .ok_or_else(|| Error::ParseError(format!("tel field {key} is not an array")))?
        .iter()
        .map(|v| {
            v.as_str()
                .map(str::to_string)
                .ok_or_else(|| Error::ParseError(format!("tel field {key} has non-string element")))
        })
        .collect()
}

fn as_seal_vec(value: &Value, key: &str) -> Result<Vec<Seal>, Error> {
    let arr = field(value, key)?
        .as_array()
        .ok_or_else(|| Error::ParseError(format!("tel field {key} is not an array")))?;
    arr.iter()
        .map(|v| serde_json::from_value(v.clone()).map_err(|e| Error::ParseError(format!("bad seal: {e}"))))
        .collect()
}

fn parse_vcp(value: Value) -> Result<VcpEvent, Error> {
    Ok(VcpEvent {
        version: as_version(&value)?,
        said: as_said(&value, "d")?,
        issuer: as_identifier(&value, "ii")?,
        config_traits: as_string_vec(&value, "c")?,
        backer_threshold: as_hex(&value, "bt")?,
        backers: as_prefix_vec(&value, "b")?,
        nonce: as_str(&value, "n")?,
    })
}

fn parse_iss(value: Value) -> Result<IssEvent, Error> {
    Ok(IssEvent {
        version: as_version(&value)?,
        said: as_said(&value, "d")?,
        credential_said: as_said(&value, "i")?,
        registry_id: as_identifier(&value, "ri")?,
        issued_at: as_str(&value, "dt")?,
    })
}

fn parse_rev(value: Value) -> Result<RevEvent, Error> {
    Ok(RevEvent {
        version: as_version(&value)?,
        said: as_said(&value, "d")?,
        credential_said: as_said(&value, "i")?,
        registry_id: as_identifier(&value, "ri")?,
        previous_event_said: as_said(&value, "p")?,
        revoked_at: as_str(&value, "dt")?,
    })
}

fn parse_ixn(value: Value) -> Result<TelInteractionEvent, Error> {
    Ok(TelInteractionEvent {
        version: as_version(&value)?,
        said: as_said(&value, "d")?,
        registry_id: as_identifier(&value, "i")?,
        sn: as_hex(&value, "s")?,
        previous_event_said: as_said(&value, "p")?,
        seals: as_seal_vec(&value, "a")?,
    })
}

fn parse_vrt(value: Value) -> Result<VrtEvent, Error> {
    Ok(VrtEvent {
        version: as_version(&value)?,
        said: as_said(&value, "d")?,
        registry_id: as_identifier(&value, "i")?,
        sn: as_hex(&value, "s")?,
        previous_event_said: as_said(&value, "p")?,
        backers_added: as_prefix_vec(&value, "ba")?,
        backers_removed: as_prefix_vec(&value, "br")?,
        backer_threshold: as_hex(&value, "bt")?,
    })
}
