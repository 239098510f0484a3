//! The wire-level event message: a `KeyEvent` plus the machinery for
//! building it through the SAID size-fixpoint, and attaching signatures
//! (spec §4.2, §4.4, §6 on-wire format).

pub mod parse;
pub mod serialization_info;

pub use serialization_info::{SerializationFormats, SerializationInfo};

use serde_json::Value;

use crate::consts::Protocol;
use crate::derivation::SelfAddressing;
use crate::error::Error;
use crate::event::{EventData, KeyEvent};
use crate::prefix::{AttachedSignaturePrefix, IdentifierPrefix, Prefix};
use crate::said;

/// Builds a `KeyEvent` from an already-assembled body, running the
/// version/size/SAID fixpoint loop (spec §4.2 step 4, §4.4 step 4): fill
/// placeholders, serialize to learn size, rewrite `v`, recompute the SAID,
/// write it back. `prefix` is the already-known AID for non-inception
/// events; for inception callers pass `IdentifierPrefix::default()` and
/// request self-addressing derivation via `self_addressing`.
pub fn build_key_event(
    protocol: Protocol,
    format: SerializationFormats,
    code: SelfAddressing,
    sn: u64,
    prefix: IdentifierPrefix,
    data: EventData,
    self_addressing: bool,
) -> Result<KeyEvent, Error> {
    log::trace!("building {:?} event at sn {sn}", data.tag());
    let placeholder_said = code.derive(&[]);
    let mut event = KeyEvent::new(
        SerializationInfo::new(protocol, format, 0),
        placeholder_said,
        prefix,
        sn,
        data,
    );

    let labels: &[&str] = if self_addressing { &["d", "i"] } else { &["d"] };
    let said_value = said::saidify_with_size(&event.to_canonical_value(), labels, code, |size| {
        SerializationInfo::new(protocol, format, size).to_str()
    })?;

    event.version = SerializationInfo::from_str(
        said_value
            .get("v")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::Internal("saidify dropped version field".into()))?,
    )?;
    event.said = said_value
        .get("d")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::Internal("saidify dropped said field".into()))?
        .parse()
        .map_err(|_: Error| Error::Internal("bad said after saidify".into()))?;
    if self_addressing {
        event.prefix = said_value
            .get("i")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::Internal("saidify dropped prefix field".into()))?
            .parse()
            .map_err(|_: Error| Error::Internal("bad prefix after saidify".into()))?;
    }
    log::trace!("built event {} at sn {sn}", event.said.to_str());
    Ok(event)
}

/// A `KeyEvent` together with its attached signatures (spec §3 "partially
/// signed event", §6 on-wire framing).
#[derive(Debug, Clone, PartialEq)]
pub struct SignedEventMessage {
    pub event: KeyEvent,
    pub signatures: Vec<AttachedSignaturePrefix>,
}

impl SignedEventMessage {
    pub fn new(event: KeyEvent, signatures: Vec<AttachedSignaturePrefix>) -> Self {
        Self { event, signatures }
    }

    pub fn serialize(&self) -> Result<Vec<u8>, Error> {
        let mut out = self.event.version.kind.encode(&self.event)?;
        out.extend_from_slice(indexed_signature_attachment(&self.signatures).as_bytes());
        Ok(out)
    }
}

/// Witness/backer receipt couplets attached to a non-transferable receipt
/// message (spec §6 `VRC` attachment).
#[derive(Debug, Clone)]
pub struct SignedNontransferableReceipt {
    pub event: KeyEvent,
    pub couplets: Vec<(crate::prefix::BasicPrefix, crate::prefix::SelfSigningPrefix)>,
}

/// Encodes an `-AAB` style attachment group: a count code followed by
/// each indexed signature's CESR text.
fn indexed_signature_attachment(signatures: &[AttachedSignaturePrefix]) -> String {
    let mut out = format!("-AAB{:02}", signatures.len());
    for sig in signatures {
        out.push_str(&format!("{:02}", sig.index));
        out.push_str(&sig.signature.to_str());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::derivation::Basic;
    use crate::event::event_data::InceptionData;
    use crate::event::sections::KeyConfig;

    #[test]
    fn build_basic_inception_uses_sole_key_as_prefix() {
        let key = Basic::Ed25519.derive(&[3u8; 32]);
        let kc = KeyConfig::new(vec![key.clone()], vec![], None, None);
        let data = EventData::Icp(InceptionData::new(kc, None, None, None, None));
        let event = build_key_event(
            Protocol::Keri,
            SerializationFormats::JSON,
            SelfAddressing::Blake3_256,
            0,
            IdentifierPrefix::Basic(key.clone()),
            data,
            false,
        )
        .unwrap();
        assert_eq!(event.prefix, IdentifierPrefix::Basic(key));
        assert_ne!(event.said.to_str(), "");
    }

    #[test]
    fn build_self_addressing_inception_matches_prefix_and_said() {
        let key1 = Basic::Ed25519.derive(&[3u8; 32]);
        let key2 = Basic::Ed25519.derive(&[4u8; 32]);
        let kc = KeyConfig::new(
            vec![key1, key2],
            vec![],
            Some(crate::event::sections::SignatureThreshold::Simple(2)),
            None,
        );
        let data = EventData::Icp(InceptionData::new(kc, None, None, None, None));
        let event = build_key_event(
            Protocol::Keri,
            SerializationFormats::JSON,
            SelfAddressing::Blake3_256,
            0,
            IdentifierPrefix::default(),
            data,
            true,
        )
        .unwrap();
        assert_eq!(event.prefix.to_str(), event.said.to_str());
    }

    #[test]
    fn size_fixpoint_is_self_consistent() {
        let key = Basic::Ed25519.derive(&[5u8; 32]);
        let kc = KeyConfig::new(vec![key.clone()], vec![], None, None);
        let data = EventData::Icp(InceptionData::new(kc, None, None, None, None));
        let event = build_key_event(
            Protocol::Keri,
            SerializationFormats::JSON,
            SelfAddressing::Blake3_256,
            0,
            IdentifierPrefix::Basic(key),
            data,
            false,
        )
        .unwrap();
        let bytes = serde_json::to_vec(&event).unwrap();
        assert_eq!(bytes.len(), event.version.size);
    }
}
