//! Backer (witness) lists and the receipt-threshold default formula
//! (spec §4.4, §4.5).

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_hex::{Compact, SerHex};

use crate::error::Error;
use crate::prefix::BasicPrefix;

/// Backer list carried by an inception event: the initial set plus its
/// receipt threshold.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct InceptionWitnessConfig {
    #[serde(rename = "bt", with = "SerHex::<Compact>")]
    pub threshold: u64,

    #[serde(rename = "b")]
    pub initial_backers: Vec<BasicPrefix>,
}

/// Backer-list delta carried by a rotation event: cuts applied before
/// adds, both required to stay duplicate-free and non-overlapping.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct RotationWitnessConfig {
    #[serde(rename = "br")]
    pub prune: Vec<BasicPrefix>,

    #[serde(rename = "ba")]
    pub graft: Vec<BasicPrefix>,
}

impl RotationWitnessConfig {
    /// Applies this delta to `current`, removing `prune` then adding
    /// `graft`, rejecting duplicates or overlap between the two lists.
    pub fn apply(&self, current: &[BasicPrefix]) -> Result<Vec<BasicPrefix>, Error> {
        let prune_set: HashSet<&BasicPrefix> = self.prune.iter().collect();
        if prune_set.len() != self.prune.len() {
            return Err(Error::DuplicateBacker);
        }
        let graft_set: HashSet<&BasicPrefix> = self.graft.iter().collect();
        if graft_set.len() != self.graft.len() {
            return Err(Error::DuplicateBacker);
        }
        if prune_set.intersection(&graft_set).next().is_some() {
            return Err(Error::BackerOverlap);
        }
        let mut next: Vec<BasicPrefix> = current.iter().filter(|b| !prune_set.contains(b)).cloned().collect();
        for b in &self.graft {
            if next.contains(b) {
                return Err(Error::DuplicateBacker);
            }
            next.push(b.clone());
        }
        Ok(next)
    }
}

/// Default backer receipt threshold for `n` backers (spec §4.5 `ample`).
pub fn ample(n: usize) -> u64 {
    match n {
        0 => 0,
        1 => 1,
        2 => 2,
        _ => ((n - 1) / 3) as u64 + 1,
    }
}

/// Checks whether `receipt_count` witness receipts satisfy the backer
/// threshold.
pub fn enough_receipts(receipt_count: usize, threshold: u64) -> bool {
    receipt_count as u64 >= threshold
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ample_formula() {
        assert_eq!(ample(0), 0);
        assert_eq!(ample(1), 1);
        assert_eq!(ample(2), 2);
        assert_eq!(ample(3), 1);
        assert_eq!(ample(4), 2);
        assert_eq!(ample(6), 2);
        assert_eq!(ample(7), 3);
    }

    fn key(byte: u8) -> BasicPrefix {
        BasicPrefix {
            derivation: crate::derivation::Basic::Ed25519,
            public_key: vec![byte; 32],
        }
    }

    #[test]
    fn rotation_delta_removes_then_adds() {
        let current = vec![key(1), key(2)];
        let delta = RotationWitnessConfig {
            prune: vec![key(1)],
            graft: vec![key(3)],
        };
        let next = delta.apply(&current).unwrap();
        assert_eq!(next, vec![key(2), key(3)]);
    }

    #[test]
    fn rotation_delta_rejects_overlap() {
        let delta = RotationWitnessConfig {
            prune: vec![key(1)],
            graft: vec![key(1)],
        };
        assert!(delta.apply(&[key(1)]).is_err());
    }
}
