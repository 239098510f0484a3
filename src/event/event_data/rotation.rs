//! `rot` / `drt`: rotates an AID's signing authority, revealing keys that
//! were pre-committed in the immediately prior establishment event
//! (spec §4.4).

use serde_json::{json, Value};

use crate::derivation::SelfAddressing;
use crate::error::Error;
use crate::event::sections::key_config::next_keys_commitment;
use crate::event::sections::seal::Seal;
use crate::event::sections::witness::RotationWitnessConfig;
use crate::event::sections::KeyConfig;
use crate::prefix::{BasicPrefix, IdentifierPrefix, SelfAddressingPrefix};

/// Body of a `rot` event (and, with `delegator` set, a `drt` event):
/// canonical field order `p kt k nt n br ba c a [di]`.
#[derive(Debug, Clone, PartialEq)]
pub struct RotationData {
    pub previous_event_said: SelfAddressingPrefix,
    pub key_config: KeyConfig,
    pub witness_delta: RotationWitnessConfig,
    pub config_traits: Vec<String>,
    pub seals: Vec<Seal>,
    pub delegator: Option<IdentifierPrefix>,
}

impl RotationData {
    pub fn new(
        previous_event_said: SelfAddressingPrefix,
        key_config: KeyConfig,
        witness_delta: Option<RotationWitnessConfig>,
        config_traits: Option<Vec<String>>,
        seals: Option<Vec<Seal>>,
        delegator: Option<IdentifierPrefix>,
    ) -> Self {
        Self {
            previous_event_said,
            key_config,
            witness_delta: witness_delta.unwrap_or_default(),
            config_traits: config_traits.unwrap_or_default(),
            seals: seals.unwrap_or_default(),
            delegator,
        }
    }

    /// Enforces spec testable property 4: every newly-exposed key must
    /// hash to a digest the prior establishment event committed to.
    pub fn validate_pre_rotation(&self, prior_config: &KeyConfig, derivation: SelfAddressing) -> Result<(), Error> {
        prior_config.verify_next(&self.key_config.public_keys, &self.key_config.threshold, derivation)?;
        Ok(())
    }

    pub fn applied_witness_list(&self, prior_backers: &[BasicPrefix]) -> Result<Vec<BasicPrefix>, Error> {
        self.witness_delta.apply(prior_backers)
    }

    pub fn to_ordered_fields(&self) -> Vec<(&'static str, Value)> {
        let mut fields = vec![
            ("p", json!(self.previous_event_said)),
            ("kt", json!(self.key_config.threshold)),
            ("k", json!(self.key_config.public_keys)),
            ("nt", json!(self.key_config.next_threshold)),
            ("n", json!(self.key_config.next_keys_digest)),
            ("br", json!(self.witness_delta.prune)),
            ("ba", json!(self.witness_delta.graft)),
            ("c", json!(self.config_traits)),
            ("a", json!(self.seals)),
        ];
        if let Some(ref delegator) = self.delegator {
            fields.push(("di", json!(delegator.to_str())));
        }
        fields
    }
}

/// Computes the next-key commitment for a rotation's `n` field, matching
/// the same per-key digest scheme used at inception.
pub fn next_commitment(keys: &[BasicPrefix], derivation: SelfAddressing) -> Vec<SelfAddressingPrefix> {
    next_keys_commitment(keys, derivation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::derivation::Basic;
    use crate::event::sections::threshold::SignatureThreshold;

    fn key(byte: u8) -> BasicPrefix {
        Basic::Ed25519.derive(&[byte; 32])
    }

    #[test]
    fn pre_rotation_accepts_committed_key() {
        let next_key = key(2);
        let commitment = next_keys_commitment(&[next_key.clone()], SelfAddressing::Blake3_256);
        let prior_config = KeyConfig::new(vec![key(1)], commitment, None, None);

        let new_config = KeyConfig::new(vec![next_key], vec![], Some(SignatureThreshold::Simple(1)), None);
        let rot = RotationData::new(
            SelfAddressing::Blake3_256.derive(b"prior"),
            new_config,
            None,
            None,
            None,
            None,
        );
        assert!(rot.validate_pre_rotation(&prior_config, SelfAddressing::Blake3_256).is_ok());
    }

    #[test]
    fn pre_rotation_accepts_subset_of_committed_keys() {
        let next_keys = [key(2), key(3), key(4)];
        let commitment = next_keys_commitment(&next_keys, SelfAddressing::Blake3_256);
        let prior_config = KeyConfig::new(vec![key(1)], commitment, None, Some(SignatureThreshold::Simple(1)));

        // Only two of the three committed next keys are revealed.
        let new_config = KeyConfig::new(
            vec![next_keys[0].clone(), next_keys[1].clone()],
            vec![],
            Some(SignatureThreshold::Simple(2)),
            None,
        );
        let rot = RotationData::new(
            SelfAddressing::Blake3_256.derive(b"prior"),
            new_config,
            None,
            None,
            None,
            None,
        );
        assert!(rot.validate_pre_rotation(&prior_config, SelfAddressing::Blake3_256).is_ok());
    }

    #[test]
    fn pre_rotation_rejects_uncommitted_key() {
        let commitment = next_keys_commitment(&[key(2)], SelfAddressing::Blake3_256);
        let prior_config = KeyConfig::new(vec![key(1)], commitment, None, None);

        let new_config = KeyConfig::new(vec![key(3)], vec![], Some(SignatureThreshold::Simple(1)), None);
        let rot = RotationData::new(
            SelfAddressing::Blake3_256.derive(b"prior"),
            new_config,
            None,
            None,
            None,
            None,
        );
        assert!(rot.validate_pre_rotation(&prior_config, SelfAddressing::Blake3_256).is_err());
    }
}
