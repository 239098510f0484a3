//! ACDC (Authentic Chained Data Container) credentials (spec §4.6): a
//! schema-bound, self-addressing object with an issuer AID, an optional
//! registry anchor, and a nested self-addressing subject.

use serde_json::{json, Map, Value};

use crate::derivation::SelfAddressing;
use crate::error::Error;
use crate::event_message::SerializationInfo;
use crate::prefix::{IdentifierPrefix, Prefix, SelfAddressingPrefix};
use crate::said;

/// The `a` block of a credential: a self-addressing object carrying the
/// credential's attribute data, an issuance timestamp, and an optional
/// recipient AID (spec §4.6 step 1).
#[derive(Debug, Clone, PartialEq)]
pub struct Subject {
    pub said: SelfAddressingPrefix,
    pub recipient: Option<IdentifierPrefix>,
    pub issued_at: String,
    pub data: Map<String, Value>,
}

impl Subject {
    /// Builds the subject's canonical ordered value (`d [i] dt ...data`),
    /// saidifying it -- the first half of the two-stage construction order
    /// spec §4.6 calls out as load-bearing for the credential's own SAID.
    pub fn build(
        recipient: Option<IdentifierPrefix>,
        issued_at: String,
        data: Map<String, Value>,
        code: SelfAddressing,
    ) -> Result<Self, Error> {
        let mut map = Map::new();
        map.insert("d".to_string(), Value::String(crate::consts::said_placeholder()));
        if let Some(ref r) = recipient {
            map.insert("i".to_string(), Value::String(r.to_str()));
        }
        map.insert("dt".to_string(), Value::String(issued_at.clone()));
        for (k, v) in &data {
            map.insert(k.clone(), v.clone());
        }
        let said_value = said::saidify(&Value::Object(map), &["d"], code)?;
        let said = said_value
            .get("d")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::Internal("saidify dropped subject said".into()))?
            .parse()
            .map_err(|_: Error| Error::Internal("bad subject said".into()))?;
        Ok(Self {
            said,
            recipient,
            issued_at,
            data,
        })
    }

    pub fn to_ordered_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("d".to_string(), json!(self.said));
        if let Some(ref r) = self.recipient {
            map.insert("i".to_string(), json!(r.to_str()));
        }
        map.insert("dt".to_string(), json!(self.issued_at));
        for (k, v) in &self.data {
            map.insert(k.clone(), v.clone());
        }
        Value::Object(map)
    }

    /// Re-derives the subject SAID from its own fields and compares it to
    /// `self.said` (spec §4.6 invariant: "the subject SAID must re-derive
    /// exactly").
    pub fn verify(&self, code: SelfAddressing) -> Result<(), Error> {
        said::verify_said(&self.to_ordered_value(), "d", code)
    }
}

/// A credential: version, own SAID, issuer AID, optional registry anchor,
/// schema SAID, and the nested subject (spec §3, §4.6).
#[derive(Debug, Clone, PartialEq)]
pub struct Acdc {
    pub version: SerializationInfo,
    pub said: SelfAddressingPrefix,
    pub issuer: IdentifierPrefix,
    pub registry: Option<IdentifierPrefix>,
    pub schema: SelfAddressingPrefix,
    pub subject: Subject,
}

impl Acdc {
    /// Builds a credential per spec §4.6 step 2: assemble `{v, d, i, [ri],
    /// s, a}` in canonical order, fill the placeholder, learn the size,
    /// rewrite `v`, then saidify.
    pub fn build(
        issuer: IdentifierPrefix,
        registry: Option<IdentifierPrefix>,
        schema: SelfAddressingPrefix,
        subject: Subject,
        code: SelfAddressing,
    ) -> Result<Self, Error> {
        let mut acdc = Acdc {
            version: SerializationInfo::new(crate::consts::Protocol::Acdc, crate::event_message::SerializationFormats::JSON, 0),
            said: code.derive(&[]),
            issuer,
            registry,
            schema,
            subject,
        };
        let said_value = said::saidify_with_size(&acdc.to_canonical_value(), &["d"], code, |size| {
            SerializationInfo::new(crate::consts::Protocol::Acdc, crate::event_message::SerializationFormats::JSON, size).to_str()
        })?;
        acdc.version = SerializationInfo::from_str(
            said_value
                .get("v")
                .and_then(Value::as_str)
                .ok_or_else(|| Error::Internal("saidify dropped acdc version".into()))?,
        )?;
        acdc.said = said_value
            .get("d")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::Internal("saidify dropped acdc said".into()))?
            .parse()
            .map_err(|_: Error| Error::Internal("bad acdc said".into()))?;
        Ok(acdc)
    }

    pub fn to_canonical_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("v".to_string(), json!(self.version.to_str()));
        map.insert("d".to_string(), json!(self.said));
        map.insert("i".to_string(), json!(self.issuer.to_str()));
        if let Some(ref ri) = self.registry {
            map.insert("ri".to_string(), json!(ri.to_str()));
        }
        map.insert("s".to_string(), json!(self.schema));
        map.insert("a".to_string(), self.subject.to_ordered_value());
        Value::Object(map)
    }

    /// Re-derives both the credential SAID and the nested subject SAID,
    /// and checks the version prefix is `ACDC` (spec §4.8
    /// `verify_credential`).
    pub fn verify(&self, code: SelfAddressing) -> Result<(), Error> {
        if self.version.protocol != crate::consts::Protocol::Acdc {
            return Err(Error::VersionMismatch {
                expected: "ACDC".into(),
                got: self.version.protocol.tag().into(),
            });
        }
        self.subject.verify(code)?;
        said::verify_said(&self.to_canonical_value(), "d", code)
    }
}

impl serde::Serialize for Acdc {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_canonical_value().serialize(serializer)
    }
}

impl<'de> serde::Deserialize<'de> for Acdc {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Acdc::from_value(value).map_err(serde::de::Error::custom)
    }
}

impl Acdc {
    pub fn from_value(value: Value) -> Result<Self, Error> {
        let version = SerializationInfo::from_str(
            value
                .get("v")
                .and_then(Value::as_str)
                .ok_or_else(|| Error::ParseError("missing acdc version".into()))?,
        )?;
        let said: SelfAddressingPrefix = value
            .get("d")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::ParseError("missing acdc said".into()))?
            .parse()
            .map_err(|_: Error| Error::ParseError("bad acdc said".into()))?;
        let issuer: IdentifierPrefix = value
            .get("i")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::ParseError("missing acdc issuer".into()))?
            .parse()
            .map_err(|_: Error| Error::ParseError("bad acdc issuer".into()))?;
        let registry = match value.get("ri").and_then(Value::as_str) {
            Some(s) => Some(s.parse().map_err(|_: Error| Error::ParseError("bad acdc registry".into()))?),
            None => None,
        };
        let schema: SelfAddressingPrefix = value
            .get("s")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::ParseError("missing acdc schema".into()))?
            .parse()
            .map_err(|_: Error| Error::ParseError("bad acdc schema".into()))?;
        let subject_value = value.get("a").cloned().ok_or_else(|| Error::ParseError("missing acdc subject".into()))?;
        let subject = subject_from_value(subject_value)?;
        Ok(Acdc {
            version,
            said,
            issuer,
            registry,
            schema,
            subject,
        })
    }
}

fn subject_from_value(value: Value) -> Result<Subject, Error> {
    let mut map = value
        .as_object()
        .cloned()
        .ok_or_else(|| Error::ParseError("acdc subject is not an object".into()))?;
    let said: SelfAddressingPrefix = map
        .shift_remove("d")
        .and_then(|v| v.as_str().map(str::to_string))
        .ok_or_else(|| Error::ParseError("missing subject said".into()))?
        .parse()
        .map_err(|_: Error| Error::ParseError("bad subject said".into()))?;
    let recipient = match map.shift_remove("i") {
        Some(v) => Some(
            v.as_str()
                .ok_or_else(|| Error::ParseError("subject recipient is not a string".into()))?
                .parse()
                .map_err(|_: Error| Error::ParseError("bad subject recipient".into()))?,
        ),
        None => None,
    };
    let issued_at = map
        .shift_remove("dt")
        .and_then(|v| v.as_str().map(str::to_string))
        .ok_or_else(|| Error::ParseError("missing subject dt".into()))?;
    Ok(Subject {
        said,
        recipient,
        issued_at,
        data: map,
    })
}

/// A self-addressing JSON-Schema object (spec §3 "Schema"): the schema's
/// own `$id`-style SAID label, computed and written back the same way any
/// other self-addressing object is.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    pub said: SelfAddressingPrefix,
    pub body: Value,
}

impl Schema {
    /// Saidifies `body` (which must already carry a placeholder `$id`
    /// field) and returns the resulting schema.
    pub fn build(mut body: Map<String, Value>, code: SelfAddressing) -> Result<Self, Error> {
        body.insert("$id".to_string(), Value::String(crate::consts::said_placeholder()));
        let said_value = said::saidify(&Value::Object(body), &["$id"], code)?;
        let said = said_value
            .get("$id")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::Internal("saidify dropped schema $id".into()))?
            .parse()
            .map_err(|_: Error| Error::Internal("bad schema said".into()))?;
        Ok(Schema { said, body: said_value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    fn issuer() -> IdentifierPrefix {
        IdentifierPrefix::SelfAddressing(SelfAddressing::Blake3_256.derive(b"issuer"))
    }

    fn schema_said() -> SelfAddressingPrefix {
        SelfAddressing::Blake3_256.derive(b"schema")
    }

    #[test]
    fn subject_round_trips_and_verifies() {
        let mut data = Map::new();
        data.insert("name".to_string(), json!("alice"));
        let subject = Subject::build(None, "2026-01-01T00:00:00.000000+00:00".into(), data, SelfAddressing::Blake3_256).unwrap();
        subject.verify(SelfAddressing::Blake3_256).unwrap();
    }

    #[test]
    fn acdc_round_trips_through_json() {
        let mut data = Map::new();
        data.insert("name".to_string(), json!("alice"));
        let subject = Subject::build(None, "2026-01-01T00:00:00.000000+00:00".into(), data, SelfAddressing::Blake3_256).unwrap();
        let acdc = Acdc::build(issuer(), None, schema_said(), subject, SelfAddressing::Blake3_256).unwrap();
        acdc.verify(SelfAddressing::Blake3_256).unwrap();

        let bytes = serde_json::to_vec(&acdc).unwrap();
        let back: Acdc = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(acdc, back);
        back.verify(SelfAddressing::Blake3_256).unwrap();
    }

    #[test]
    fn acdc_with_multiple_attributes_round_trips_in_order() {
        let mut data = Map::new();
        data.insert("name".to_string(), json!("alice"));
        data.insert("role".to_string(), json!("engineer"));
        data.insert("level".to_string(), json!(7));
        let subject = Subject::build(
            Some(IdentifierPrefix::SelfAddressing(SelfAddressing::Blake3_256.derive(b"recipient"))),
            "2026-01-01T00:00:00.000000+00:00".into(),
            data,
            SelfAddressing::Blake3_256,
        )
        .unwrap();
        let acdc = Acdc::build(issuer(), None, schema_said(), subject, SelfAddressing::Blake3_256).unwrap();
        acdc.verify(SelfAddressing::Blake3_256).unwrap();

        let bytes = serde_json::to_vec(&acdc).unwrap();
        let back: Acdc = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(acdc, back);
        back.verify(SelfAddressing::Blake3_256).unwrap();
        assert_eq!(
            back.subject.data.keys().collect::<Vec<_>>(),
            vec!["name", "role", "level"]
        );
    }

    #[test]
    fn acdc_with_registry_anchor_carries_ri() {
        let mut data = Map::new();
        data.insert("name".to_string(), json!("bob"));
        let subject = Subject::build(None, "2026-01-01T00:00:00.000000+00:00".into(), data, SelfAddressing::Blake3_256).unwrap();
        let registry = IdentifierPrefix::SelfAddressing(SelfAddressing::Blake3_256.derive(b"registry"));
        let acdc = Acdc::build(issuer(), Some(registry.clone()), schema_said(), subject, SelfAddressing::Blake3_256).unwrap();
        assert_eq!(acdc.registry, Some(registry));
    }

    #[test]
    fn tampered_subject_data_fails_verify() {
        let mut data = Map::new();
        data.insert("name".to_string(), json!("alice"));
        let subject = Subject::build(None, "2026-01-01T00:00:00.000000+00:00".into(), data, SelfAddressing::Blake3_256).unwrap();
        let mut acdc = Acdc::build(issuer(), None, schema_said(), subject, SelfAddressing::Blake3_256).unwrap();
        acdc.subject.data.insert("name".to_string(), json!("mallory"));
        assert!(acdc.verify(SelfAddressing::Blake3_256).is_err());
    }
}
