//! `icp` / `dip`: establishes an AID's first signing authority (spec §4.4).

use serde_json::{json, Value};

use crate::derivation::SelfAddressing;
use crate::error::Error;
use crate::event::sections::seal::Seal;
use crate::event::sections::threshold::SignatureThreshold;
use crate::event::sections::witness::InceptionWitnessConfig;
use crate::event::sections::KeyConfig;
use crate::prefix::{BasicPrefix, IdentifierPrefix, Prefix, SelfAddressingPrefix};

/// Body of an `icp` event (and, with `delegator` set, a `dip` event):
/// canonical field order `kt k nt n bt b c a [di]`.
#[derive(Debug, Clone, PartialEq)]
pub struct InceptionData {
    pub key_config: KeyConfig,
    pub witness_config: InceptionWitnessConfig,
    pub config_traits: Vec<String>,
    pub seals: Vec<Seal>,
    pub delegator: Option<IdentifierPrefix>,
}

impl InceptionData {
    pub fn new(
        key_config: KeyConfig,
        witness_config: Option<InceptionWitnessConfig>,
        config_traits: Option<Vec<String>>,
        seals: Option<Vec<Seal>>,
        delegator: Option<IdentifierPrefix>,
    ) -> Self {
        Self {
            key_config,
            witness_config: witness_config.unwrap_or_default(),
            config_traits: config_traits.unwrap_or_default(),
            seals: seals.unwrap_or_default(),
            delegator,
        }
    }

    pub fn is_delegated(&self) -> bool {
        self.delegator.is_some()
    }

    /// Picks the inception derivation mode per spec §4.4 step 3: basic
    /// when there is exactly one key and no explicit threshold override,
    /// self-addressing otherwise.
    pub fn wants_basic_derivation(&self, explicit_threshold_given: bool) -> bool {
        self.key_config.public_keys.len() == 1 && !explicit_threshold_given && !self.is_delegated()
    }

    pub fn validate(&self) -> Result<(), Error> {
        self.key_config.threshold.validate(self.key_config.public_keys.len())?;
        if !self.key_config.next_keys_digest.is_empty() {
            self.key_config
                .next_threshold
                .validate(self.key_config.next_keys_digest.len())?;
        }
        if self.witness_config.initial_backers.len()
            != count_unique(&self.witness_config.initial_backers)
        {
            return Err(Error::DuplicateBacker);
        }
        if let Some(IdentifierPrefix::SelfAddressing(ref s)) = self.delegator {
            if s.digest.is_empty() {
                return Err(Error::InvalidInput("dip requires a non-empty delegator prefix".into()));
            }
        }
        Ok(())
    }

    /// Body fields in canonical order, for splicing into the shared
    /// envelope after `v t d i s`.
    pub fn to_ordered_fields(&self) -> Vec<(&'static str, Value)> {
        let mut fields = vec![
            ("kt", json!(self.key_config.threshold)),
            ("k", json!(self.key_config.public_keys)),
            ("nt", json!(self.key_config.next_threshold)),
            ("n", json!(self.key_config.next_keys_digest)),
            ("bt", json!(format!("{:x}", self.witness_config.threshold))),
            ("b", json!(self.witness_config.initial_backers)),
            ("c", json!(self.config_traits)),
            ("a", json!(self.seals)),
        ];
        if let Some(ref delegator) = self.delegator {
            fields.push(("di", json!(delegator.to_str())));
        }
        fields
    }
}

fn count_unique(backers: &[BasicPrefix]) -> usize {
    let set: std::collections::HashSet<&BasicPrefix> = backers.iter().collect();
    set.len()
}

/// Derives the AID for a basic-derivation inception: the sole public key.
pub fn basic_derivation_prefix(key_config: &KeyConfig) -> Result<IdentifierPrefix, Error> {
    key_config
        .public_keys
        .first()
        .cloned()
        .map(IdentifierPrefix::Basic)
        .ok_or_else(|| Error::InvalidInput("basic derivation requires at least one key".into()))
}

/// Derives a self-addressing prefix from already-saidified event JSON
/// (caller computes the SAID via the shared `said` module against this
/// object with both `d` and `i` as placeholder labels).
pub fn self_addressing_prefix_from_said(said: &SelfAddressingPrefix) -> IdentifierPrefix {
    IdentifierPrefix::SelfAddressing(said.clone())
}

pub fn default_digest_derivation() -> SelfAddressing {
    SelfAddressing::Blake3_256
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::derivation::Basic;

    fn key(byte: u8) -> BasicPrefix {
        Basic::Ed25519.derive(&[byte; 32])
    }

    #[test]
    fn basic_mode_detected_for_single_key_no_threshold() {
        let kc = KeyConfig::new(vec![key(1)], vec![], None, None);
        let data = InceptionData::new(kc, None, None, None, None);
        assert!(data.wants_basic_derivation(false));
    }

    #[test]
    fn self_addressing_mode_for_multiple_keys() {
        let kc = KeyConfig::new(vec![key(1), key(2)], vec![], None, None);
        let data = InceptionData::new(kc, None, None, None, None);
        assert!(!data.wants_basic_derivation(false));
    }

    #[test]
    fn delegated_requires_delegator() {
        let kc = KeyConfig::new(vec![key(1)], vec![], None, None);
        let data = InceptionData::new(kc, None, None, None, None);
        assert!(!data.is_delegated());
    }
}
