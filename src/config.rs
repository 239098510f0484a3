//! Configuration recognized by KEL/TEL/ACDC builders (spec §6). No CLI or
//! environment-variable surface lives here; a host wrapping the core owns
//! that concern.

use rand_core::{CryptoRng, RngCore};

use crate::consts::{Protocol, DEFAULT_VERSION};
use crate::derivation::SelfAddressing;
use crate::event::sections::SignatureThreshold;
use crate::event_message::SerializationFormats;
use crate::prefix::{IdentifierPrefix, Prefix};

/// Builder-wide configuration. Every field has the spec-mandated default
/// when omitted; only `protocol` and `kind` are meaningfully fixed by the
/// reference encoding.
#[derive(Debug, Clone)]
pub struct ProtocolConfig {
    pub protocol: Protocol,
    pub version: (u8, u8),
    pub kind: SerializationFormats,
    pub code: SelfAddressing,
    pub current_threshold: Option<SignatureThreshold>,
    pub next_threshold: Option<SignatureThreshold>,
    pub delegator: Option<IdentifierPrefix>,
    pub backer_threshold: Option<u64>,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            protocol: Protocol::Keri,
            version: DEFAULT_VERSION,
            kind: SerializationFormats::JSON,
            code: SelfAddressing::Blake3_256,
            current_threshold: None,
            next_threshold: None,
            delegator: None,
            backer_threshold: None,
        }
    }
}

impl ProtocolConfig {
    pub fn for_acdc() -> Self {
        Self {
            protocol: Protocol::Acdc,
            ..Self::default()
        }
    }

    pub fn is_delegated(&self) -> bool {
        self.delegator.is_some()
    }
}

/// Generates a 44-character CESR nonce (spec §6 `nonce`), used by registry
/// inception (`vcp.n`) to make otherwise-identical registries unique.
pub fn generate_nonce<R: RngCore + CryptoRng>(rng: &mut R) -> String {
    let mut raw = [0u8; 32];
    rng.fill_bytes(&mut raw);
    SelfAddressing::Blake3_256.derive(&raw).to_str()
}

/// Current timestamp in the ISO-8601-with-microseconds, explicit-offset
/// form every builder must emit (spec §6 `dt`). Takes the instant as an
/// argument since core builders are pure and must not read the clock
/// implicitly (spec §5).
pub fn format_timestamp(unix_micros: i64) -> String {
    crate::util::format_timestamp_micros(unix_micros)
}
