//! Import/export bundle format and the import pipeline (spec §4.8, §6):
//! a `{type, metadata, events}` value whose raw events are either parsed
//! as KEL events, TEL events, or ACDCs depending on `type`, and admitted
//! into an [`EventStore`] one at a time, each failure recorded rather
//! than aborting the whole bundle.

use serde_json::Value;

use crate::acdc::Acdc;
use crate::codec::{decode_b64url, encode_b64url};
use crate::derivation::SelfAddressing;
use crate::error::Error;
use crate::event::KeyEvent;
use crate::kv::KvStore;
use crate::prefix::Prefix;
use crate::said::verify_said;
use crate::store::EventStore;
use crate::tel::TelEvent;

/// Which event family a bundle's raw entries decode as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BundleType {
    Kel,
    Tel,
    Acdc,
}

impl BundleType {
    fn as_str(self) -> &'static str {
        match self {
            BundleType::Kel => "kel",
            BundleType::Tel => "tel",
            BundleType::Acdc => "acdc",
        }
    }

    fn from_str(s: &str) -> Result<Self, Error> {
        match s {
            "kel" => Ok(BundleType::Kel),
            "tel" => Ok(BundleType::Tel),
            "acdc" => Ok(BundleType::Acdc),
            other => Err(Error::InvalidInput(format!("unknown bundle type {other}"))),
        }
    }
}

/// Bundle-level metadata, opaque beyond these two optional fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BundleMetadata {
    pub scope: Option<String>,
    pub created_at: Option<String>,
}

/// A bundle of raw events plus metadata, the unit of import/export.
#[derive(Debug, Clone)]
pub struct Bundle {
    pub bundle_type: BundleType,
    pub metadata: BundleMetadata,
    pub events: Vec<Vec<u8>>,
}

impl Bundle {
    pub fn new(bundle_type: BundleType, metadata: BundleMetadata, events: Vec<Vec<u8>>) -> Self {
        Self {
            bundle_type,
            metadata,
            events,
        }
    }

    /// Renders this bundle as the JSON wire form (spec §6): raw events
    /// base64-encoded.
    pub fn to_json(&self) -> Value {
        let mut metadata = serde_json::Map::new();
        if let Some(ref scope) = self.metadata.scope {
            metadata.insert("scope".to_string(), Value::String(scope.clone()));
        }
        if let Some(ref created_at) = self.metadata.created_at {
            metadata.insert("created_at".to_string(), Value::String(created_at.clone()));
        }
        let events = self.events.iter().map(|e| Value::String(encode_b64url(e))).collect();
        let mut obj = serde_json::Map::new();
        obj.insert("type".to_string(), Value::String(self.bundle_type.as_str().to_string()));
        obj.insert("metadata".to_string(), Value::Object(metadata));
        obj.insert("events".to_string(), Value::Array(events));
        Value::Object(obj)
    }

    /// Parses the JSON wire form back into a `Bundle`.
    pub fn from_json(value: &Value) -> Result<Self, Error> {
        let obj = value
            .as_object()
            .ok_or_else(|| Error::ParseError("bundle is not a JSON object".into()))?;
        let bundle_type = obj
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::ParseError("bundle missing type".into()))?;
        let bundle_type = BundleType::from_str(bundle_type)?;

        let metadata = match obj.get("metadata").and_then(Value::as_object) {
            Some(m) => BundleMetadata {
                scope: m.get("scope").and_then(Value::as_str).map(str::to_string),
                created_at: m.get("created_at").and_then(Value::as_str).map(str::to_string),
            },
            None => BundleMetadata::default(),
        };

        let raw_events = obj
            .get("events")
            .and_then(Value::as_array)
            .ok_or_else(|| Error::ParseError("bundle missing events".into()))?;
        let events = raw_events
            .iter()
            .map(|v| {
                v.as_str()
                    .ok_or_else(|| Error::ParseError("bundle event is not a string".into()))
                    .and_then(decode_b64url)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            bundle_type,
            metadata,
            events,
        })
    }
}

/// Import-time behavior switches (spec §4.8 `import.from_bundle`).
#[derive(Debug, Clone, Copy, Default)]
pub struct ImportOptions {
    pub skip_existing: bool,
    pub verify: bool,
}

/// Outcome of one `from_bundle` call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportReport {
    pub imported: usize,
    pub skipped: usize,
    pub failed: usize,
    pub errors: Vec<String>,
    pub aid: Option<String>,
    pub registry_id: Option<String>,
    pub credential_id: Option<String>,
}

/// Runs a bundle through the import pipeline against `store`. `cancelled`
/// is polled at the entry of each per-event iteration (spec §5
/// cancellation); events already committed before a cancellation are not
/// rolled back.
pub fn from_bundle<KV: KvStore>(
    store: &mut EventStore<KV>,
    bundle: &Bundle,
    options: ImportOptions,
    mut cancelled: impl FnMut() -> bool,
) -> Result<ImportReport, Error> {
    let mut report = ImportReport::default();

    for raw in &bundle.events {
        if cancelled() {
            break;
        }
        match import_one(store, bundle.bundle_type, raw, options, &mut report) {
            Ok(()) => {}
            Err(e) => {
                report.failed += 1;
                report.errors.push(e.to_string());
            }
        }
    }

    Ok(report)
}

fn import_one<KV: KvStore>(
    store: &mut EventStore<KV>,
    bundle_type: BundleType,
    raw: &[u8],
    options: ImportOptions,
    report: &mut ImportReport,
) -> Result<(), Error> {
    match bundle_type {
        BundleType::Kel => {
            let event: KeyEvent =
                serde_json::from_slice(raw).map_err(|e| Error::ParseError(format!("bad kel event: {e}")))?;
            let said = event.said.to_str();
            if options.skip_existing && store.get_event(&said)?.is_some() {
                report.skipped += 1;
                return Ok(());
            }
            if options.verify {
                verify_said(&event.to_canonical_value(), "d", SelfAddressing::Blake3_256)?;
            }
            store.put_kel_event(&event)?;
            report.imported += 1;
            report.aid.get_or_insert_with(|| event.prefix.to_str());
        }
        BundleType::Tel => {
            let event: TelEvent =
                serde_json::from_slice(raw).map_err(|e| Error::ParseError(format!("bad tel event: {e}")))?;
            let said = event.said().to_str();
            if options.skip_existing && store.get_event(&said)?.is_some() {
                report.skipped += 1;
                return Ok(());
            }
            if options.verify {
                verify_said(&event.to_canonical_value(), "d", SelfAddressing::Blake3_256)?;
            }
            let registry_id = event.registry_scope().map(Prefix::to_str);
            store.put_tel_event(&event)?;
            report.imported += 1;
            if let Some(ri) = registry_id {
                report.registry_id.get_or_insert(ri);
            }
        }
        BundleType::Acdc => {
            let acdc: Acdc = serde_json::from_slice(raw).map_err(|e| Error::ParseError(format!("bad acdc: {e}")))?;
            let said = acdc.said.to_str();
            if options.skip_existing && store.get_event(&said)?.is_some() {
                report.skipped += 1;
                return Ok(());
            }
            if options.verify {
                acdc.verify(SelfAddressing::Blake3_256)?;
            }
            store.put_acdc(&acdc)?;
            report.imported += 1;
            report.credential_id.get_or_insert(said);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::Protocol;
    use crate::derivation::Basic;
    use crate::event::event_data::{EventData, InceptionData};
    use crate::event::sections::KeyConfig;
    use crate::event_message::{build_key_event, SerializationFormats};
    use crate::prefix::IdentifierPrefix;
    use crate::store::mem::MemKv;

    fn icp_event(seed: u8) -> KeyEvent {
        let key = Basic::Ed25519.derive(&[seed; 32]);
        let kc = KeyConfig::new(vec![key.clone()], vec![], None, None);
        let data = EventData::Icp(InceptionData::new(kc, None, None, None, None));
        build_key_event(
            Protocol::Keri,
            SerializationFormats::JSON,
            SelfAddressing::Blake3_256,
            0,
            IdentifierPrefix::Basic(key),
            data,
            false,
        )
        .unwrap()
    }

    #[test]
    fn bundle_json_round_trips() {
        let icp = icp_event(1);
        let raw = serde_json::to_vec(&icp).unwrap();
        let bundle = Bundle::new(
            BundleType::Kel,
            BundleMetadata {
                scope: Some(icp.prefix.to_str()),
                created_at: None,
            },
            vec![raw],
        );
        let json = bundle.to_json();
        let back = Bundle::from_json(&json).unwrap();
        assert_eq!(back.bundle_type, BundleType::Kel);
        assert_eq!(back.events, bundle.events);
    }

    #[test]
    fn import_kel_bundle_sets_aid_and_imports_once() {
        let mut store = EventStore::new(MemKv::new());
        let icp = icp_event(2);
        let raw = serde_json::to_vec(&icp).unwrap();
        let bundle = Bundle::new(BundleType::Kel, BundleMetadata::default(), vec![raw]);

        let report = from_bundle(&mut store, &bundle, ImportOptions::default(), || false).unwrap();
        assert_eq!(report.imported, 1);
        assert_eq!(report.failed, 0);
        assert_eq!(report.aid, Some(icp.prefix.to_str()));
    }

    #[test]
    fn second_import_skips_when_requested() {
        let mut store = EventStore::new(MemKv::new());
        let icp = icp_event(3);
        let raw = serde_json::to_vec(&icp).unwrap();
        let bundle = Bundle::new(BundleType::Kel, BundleMetadata::default(), vec![raw]);
        let options = ImportOptions {
            skip_existing: true,
            verify: false,
        };

        from_bundle(&mut store, &bundle, options, || false).unwrap();
        let second = from_bundle(&mut store, &bundle, options, || false).unwrap();
        assert_eq!(second.imported, 0);
        assert_eq!(second.skipped, 1);
    }

    #[test]
    fn malformed_event_is_recorded_as_failed_not_aborted() {
        let mut store = EventStore::new(MemKv::new());
        let icp = icp_event(4);
        let good = serde_json::to_vec(&icp).unwrap();
        let bad = b"not json".to_vec();
        let bundle = Bundle::new(BundleType::Kel, BundleMetadata::default(), vec![bad, good]);

        let report = from_bundle(&mut store, &bundle, ImportOptions::default(), || false).unwrap();
        assert_eq!(report.imported, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.errors.len(), 1);
    }

    #[test]
    fn cancellation_stops_before_next_event_without_rollback() {
        let mut store = EventStore::new(MemKv::new());
        let icp = icp_event(5);
        let raw = serde_json::to_vec(&icp).unwrap();
        let bundle = Bundle::new(BundleType::Kel, BundleMetadata::default(), vec![raw]);

        let mut calls = 0;
        let report = from_bundle(&mut store, &bundle, ImportOptions::default(), || {
            calls += 1;
            calls > 1
        })
        .unwrap();
        assert_eq!(report.imported, 1);
        assert!(store.get_event(&icp.said.to_str()).unwrap().is_some());
    }
}
