//! Current and next signing-key configuration, and the pre-rotation
//! commitment between them (spec §4.4).

use std::collections::HashSet;

use crate::derivation::SelfAddressing;
use crate::error::Error;
use crate::event::sections::threshold::SignatureThreshold;
use crate::prefix::{AttachedSignaturePrefix, BasicPrefix, Prefix, SelfAddressingPrefix};

/// The signing authority established (or re-established) by an
/// establishment event: the current key set and threshold, plus the
/// commitment to the next key set.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct KeyConfig {
    pub threshold: SignatureThreshold,
    pub public_keys: Vec<BasicPrefix>,
    pub next_threshold: SignatureThreshold,
    pub next_keys_digest: Vec<SelfAddressingPrefix>,
}

impl KeyConfig {
    pub fn new(
        public_keys: Vec<BasicPrefix>,
        next_keys_digest: Vec<SelfAddressingPrefix>,
        threshold: Option<SignatureThreshold>,
        next_threshold: Option<SignatureThreshold>,
    ) -> Self {
        let threshold = threshold.unwrap_or_else(|| SignatureThreshold::default_current(public_keys.len()));
        let next_threshold =
            next_threshold.unwrap_or_else(|| SignatureThreshold::default_next(next_keys_digest.len()));
        Self {
            threshold,
            public_keys,
            next_threshold,
            next_keys_digest,
        }
    }

    /// Verifies `sigs` against `message` using the indices attached to each
    /// signature, checking both threshold satisfaction and key membership.
    pub fn verify(&self, message: &[u8], sigs: &[AttachedSignaturePrefix]) -> Result<bool, Error> {
        if sigs.len() > self.public_keys.len() {
            return Err(Error::TooManySignatures);
        }
        let mut seen = HashSet::new();
        for sig in sigs {
            if !seen.insert(sig.index) {
                return Err(Error::DuplicateSignature(sig.index));
            }
        }
        let indices: Vec<u16> = sigs.iter().map(|s| s.index).collect();
        if !self.threshold.enough_signatures(&indices)? {
            return Err(Error::NotEnoughSigsError);
        }
        for sig in sigs {
            let key = self
                .public_keys
                .get(sig.index as usize)
                .ok_or_else(|| Error::InvalidInput("signer index out of range".into()))?;
            if !key.verify(message, &sig.signature)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Checks that every key in `next_keys` hashes to a digest this config
    /// committed to (a subset of the commitment, not an exact match --
    /// spec invariant 4: pre-rotation is "the set `digest(k)` is a subset
    /// of the immediately prior establishment event's `n`"), that the
    /// revealed subset satisfies the *prior* next-threshold, and that the
    /// incoming `next_threshold` is consistent with the newly revealed
    /// key set.
    pub fn verify_next(
        &self,
        next_keys: &[BasicPrefix],
        next_threshold: &SignatureThreshold,
        derivation: SelfAddressing,
    ) -> Result<bool, Error> {
        let digest_index: std::collections::HashMap<String, usize> = self
            .next_keys_digest
            .iter()
            .enumerate()
            .map(|(i, d)| (d.to_str(), i))
            .collect();
        let mut indices = Vec::with_capacity(next_keys.len());
        for key in next_keys {
            let digest = derivation.derive(key.to_str().as_bytes());
            let index = *digest_index
                .get(&digest.to_str())
                .ok_or(Error::PreRotationViolation)?;
            indices.push(index as u16);
        }
        if !self.next_threshold.enough_signatures(&indices)? {
            return Err(Error::PreRotationViolation);
        }
        next_threshold.validate(next_keys.len())?;
        Ok(true)
    }
}

/// Computes the per-key digest commitment for a set of next public keys
/// (the `n` field of an establishment event).
pub fn next_keys_commitment(keys: &[BasicPrefix], derivation: SelfAddressing) -> Vec<SelfAddressingPrefix> {
    keys.iter().map(|k| derivation.derive(k.to_str().as_bytes())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_commitment_round_trips() {
        let sk1 = BasicPrefix {
            derivation: crate::derivation::Basic::Ed25519,
            public_key: vec![1u8; 32],
        };
        let sk2 = BasicPrefix {
            derivation: crate::derivation::Basic::Ed25519,
            public_key: vec![2u8; 32],
        };
        let commitment = next_keys_commitment(&[sk1.clone(), sk2.clone()], SelfAddressing::Blake3_256);
        let cfg = KeyConfig::new(vec![], commitment, None, None);
        assert!(cfg
            .verify_next(&[sk1, sk2], &SignatureThreshold::Simple(1), SelfAddressing::Blake3_256)
            .unwrap());
    }

    #[test]
    fn verify_next_accepts_proper_subset_of_commitment() {
        let sk1 = BasicPrefix {
            derivation: crate::derivation::Basic::Ed25519,
            public_key: vec![1u8; 32],
        };
        let sk2 = BasicPrefix {
            derivation: crate::derivation::Basic::Ed25519,
            public_key: vec![2u8; 32],
        };
        let sk3 = BasicPrefix {
            derivation: crate::derivation::Basic::Ed25519,
            public_key: vec![3u8; 32],
        };
        let commitment = next_keys_commitment(&[sk1.clone(), sk2.clone(), sk3], SelfAddressing::Blake3_256);
        let cfg = KeyConfig::new(vec![], commitment, None, Some(SignatureThreshold::Simple(1)));
        // Revealing two of the three committed keys is a valid subset.
        assert!(cfg
            .verify_next(&[sk1, sk2], &SignatureThreshold::Simple(2), SelfAddressing::Blake3_256)
            .unwrap());
    }

    #[test]
    fn verify_next_rejects_subset_that_fails_prior_next_threshold() {
        let sk1 = BasicPrefix {
            derivation: crate::derivation::Basic::Ed25519,
            public_key: vec![1u8; 32],
        };
        let sk2 = BasicPrefix {
            derivation: crate::derivation::Basic::Ed25519,
            public_key: vec![2u8; 32],
        };
        let commitment = next_keys_commitment(&[sk1.clone(), sk2], SelfAddressing::Blake3_256);
        // Prior commitment required both keys (nt = 2); revealing only one
        // is a subset of the digest set but does not satisfy the prior nt.
        let cfg = KeyConfig::new(vec![], commitment, None, Some(SignatureThreshold::Simple(2)));
        assert!(cfg
            .verify_next(&[sk1], &SignatureThreshold::Simple(1), SelfAddressing::Blake3_256)
            .is_err());
    }

    #[test]
    fn next_commitment_rejects_unlisted_key() {
        let sk1 = BasicPrefix {
            derivation: crate::derivation::Basic::Ed25519,
            public_key: vec![1u8; 32],
        };
        let sk2 = BasicPrefix {
            derivation: crate::derivation::Basic::Ed25519,
            public_key: vec![2u8; 32],
        };
        let commitment = next_keys_commitment(&[sk1.clone()], SelfAddressing::Blake3_256);
        let cfg = KeyConfig::new(vec![], commitment, None, None);
        assert!(cfg
            .verify_next(&[sk2], &SignatureThreshold::Simple(1), SelfAddressing::Blake3_256)
            .is_err());
    }
}
