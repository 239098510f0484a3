//! Group multi-signature coordinator (spec §4.10): a partially-signed
//! event moves through up to three escrows before it is complete --
//! **gpse** (collecting member signatures), **gdee** (awaiting a
//! delegator's approval), **gpwe** (collecting witness receipts) -- with
//! the path through them depending on the group's properties.

use std::collections::BTreeMap;

use crate::error::Error;
use crate::event::sections::SignatureThreshold;
use crate::event_message::SignedEventMessage;
use crate::prefix::{AttachedSignaturePrefix, BasicPrefix, Prefix, SelfSigningPrefix};

/// Which escrow a partially-signed event currently sits in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscrowStage {
    PartiallySigned,
    Delegated,
    PartiallyWitnessed,
    Completed,
}

/// The properties of the group event being coordinated, which determine
/// which escrows it must pass through after signature threshold is met.
#[derive(Debug, Clone, Copy)]
pub struct GroupProperties {
    pub is_delegated: bool,
    pub requires_witness_receipts: bool,
    pub witness_threshold: u64,
}

impl GroupProperties {
    /// The escrow a signature-complete event moves to, per spec §4.10:
    /// "transitions to either delegating, witnessing, or completed
    /// depending on group properties."
    fn stage_after_signatures(&self) -> EscrowStage {
        if self.is_delegated {
            EscrowStage::Delegated
        } else if self.requires_witness_receipts {
            EscrowStage::PartiallyWitnessed
        } else {
            EscrowStage::Completed
        }
    }

    /// The escrow a delegation-approved event moves to.
    fn stage_after_delegation(&self) -> EscrowStage {
        if self.requires_witness_receipts {
            EscrowStage::PartiallyWitnessed
        } else {
            EscrowStage::Completed
        }
    }
}

/// One event under coordination: its accumulating signatures, delegation
/// approval state, and witness receipts.
#[derive(Debug, Clone)]
pub struct PartiallySignedEvent {
    pub event: SignedEventMessage,
    pub stage: EscrowStage,
    pub received_at: u64,
    pub properties: GroupProperties,
    pub delegator_approved: bool,
    pub witness_receipts: Vec<(BasicPrefix, SelfSigningPrefix)>,
}

/// The group coordinator: a map from event SAID to its escrow entry, plus
/// the sweep timeout applied uniformly across events (spec §4.10
/// "Timeout").
pub struct GroupCoordinator {
    escrow: BTreeMap<String, PartiallySignedEvent>,
    timeout_seconds: u64,
}

impl GroupCoordinator {
    pub fn new(timeout_seconds: u64) -> Self {
        Self {
            escrow: BTreeMap::new(),
            timeout_seconds,
        }
    }

    pub fn get(&self, event_said: &str) -> Option<&PartiallySignedEvent> {
        self.escrow.get(event_said)
    }

    /// Adds one member's signature to the event identified by
    /// `signed.event.said`, seeding its escrow entry on first submission.
    /// Transitions out of `gpse` once `threshold` is satisfied.
    pub fn submit_signature(
        &mut self,
        signed: SignedEventMessage,
        threshold: &SignatureThreshold,
        properties: GroupProperties,
        received_at: u64,
    ) -> Result<EscrowStage, Error> {
        let said = signed.event.said.to_str();
        let entry = self.escrow.entry(said.clone()).or_insert_with(|| PartiallySignedEvent {
            event: SignedEventMessage::new(signed.event.clone(), Vec::new()),
            stage: EscrowStage::PartiallySigned,
            received_at,
            properties,
            delegator_approved: false,
            witness_receipts: Vec::new(),
        });

        if entry.stage != EscrowStage::PartiallySigned {
            return Ok(entry.stage);
        }

        for sig in signed.signatures {
            if !entry.event.signatures.iter().any(|s| s.index == sig.index) {
                entry.event.signatures.push(sig);
            }
        }

        let indices: Vec<u16> = entry.event.signatures.iter().map(|s| s.index).collect();
        if threshold.enough_signatures(&indices)? {
            entry.stage = properties.stage_after_signatures();
            log::debug!("group event {said} advanced to {:?} with {} signatures", entry.stage, indices.len());
        }
        Ok(entry.stage)
    }

    /// Records the delegator's approval of a `gdee`-staged event,
    /// transitioning it onward per its properties.
    pub fn approve_delegation(&mut self, event_said: &str) -> Result<EscrowStage, Error> {
        let entry = self
            .escrow
            .get_mut(event_said)
            .ok_or_else(|| Error::NotFound(format!("no escrowed event {event_said}")))?;
        if entry.stage != EscrowStage::Delegated {
            return Err(Error::InvalidInput(format!("event {event_said} is not awaiting delegation")));
        }
        entry.delegator_approved = true;
        entry.stage = entry.properties.stage_after_delegation();
        log::debug!("group event {event_said} delegation approved, now {:?}", entry.stage);
        Ok(entry.stage)
    }

    /// Adds one witness receipt to a `gpwe`-staged event, completing it
    /// once `|receipts| >= bt`.
    pub fn submit_witness_receipt(
        &mut self,
        event_said: &str,
        backer: BasicPrefix,
        signature: SelfSigningPrefix,
    ) -> Result<EscrowStage, Error> {
        let entry = self
            .escrow
            .get_mut(event_said)
            .ok_or_else(|| Error::NotFound(format!("no escrowed event {event_said}")))?;
        if entry.stage != EscrowStage::PartiallyWitnessed {
            return Err(Error::InvalidInput(format!("event {event_said} is not awaiting witness receipts")));
        }
        if entry.witness_receipts.iter().any(|(b, _)| *b == backer) {
            return Err(Error::DuplicateBacker);
        }
        entry.witness_receipts.push((backer, signature));
        if entry.witness_receipts.len() as u64 >= entry.properties.witness_threshold {
            entry.stage = EscrowStage::Completed;
            log::debug!("group event {event_said} completed after {} witness receipts", entry.witness_receipts.len());
        }
        Ok(entry.stage)
    }

    /// The elected member for operations that must be singly performed:
    /// the smallest-index signer present among the group's already
    /// recorded signatures (spec §4.10 "Election").
    pub fn elected_member(&self, event_said: &str, present_indices: &[u16]) -> Result<u16, Error> {
        let entry = self
            .escrow
            .get(event_said)
            .ok_or_else(|| Error::NotFound(format!("no escrowed event {event_said}")))?;
        let signing_indices: std::collections::HashSet<u16> = entry.event.signatures.iter().map(|s| s.index).collect();
        present_indices
            .iter()
            .copied()
            .filter(|i| signing_indices.contains(i))
            .min()
            .ok_or_else(|| Error::NotFound("no present signing member for this event".into()))
    }

    /// Removes escrow entries older than the configured timeout and not
    /// yet `Completed`, returning their SAIDs. Completed entries are
    /// never swept (spec §4.10 "Timeout").
    pub fn sweep(&mut self, now: u64) -> Vec<String> {
        let expired: Vec<String> = self
            .escrow
            .iter()
            .filter(|(_, e)| e.stage != EscrowStage::Completed && now.saturating_sub(e.received_at) >= self.timeout_seconds)
            .map(|(said, _)| said.clone())
            .collect();
        for said in &expired {
            self.escrow.remove(said);
            log::warn!("group event {said} expired before reaching completion");
        }
        expired
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::Protocol;
    use crate::derivation::{Basic, SelfAddressing};
    use crate::event::event_data::{EventData, InceptionData};
    use crate::event::sections::KeyConfig;
    use crate::event_message::{build_key_event, SerializationFormats};
    use crate::prefix::IdentifierPrefix;
    use crate::signer::Signer;

    fn sample_event() -> SignedEventMessage {
        let key = Basic::Ed25519.derive(&[1u8; 32]);
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
        SignedEventMessage::new(event, Vec::new())
    }

    #[test]
    fn two_of_three_completes_on_second_signature() {
        let mut coordinator = GroupCoordinator::new(3600);
        let event = sample_event();
        let threshold = SignatureThreshold::Simple(2);
        let props = GroupProperties {
            is_delegated: false,
            requires_witness_receipts: false,
            witness_threshold: 0,
        };

        let signer_a = Signer::from_seed(&[1u8; 32]);
        let message = serde_json::to_vec(&event.event).unwrap();
        let sig_a = AttachedSignaturePrefix::new(signer_a.sign(&message), 0);
        let first = SignedEventMessage::new(event.event.clone(), vec![sig_a]);
        let stage = coordinator.submit_signature(first, &threshold, props, 1_000).unwrap();
        assert_eq!(stage, EscrowStage::PartiallySigned);

        let signer_b = Signer::from_seed(&[2u8; 32]);
        let sig_b = AttachedSignaturePrefix::new(signer_b.sign(&message), 1);
        let second = SignedEventMessage::new(event.event.clone(), vec![sig_b]);
        let stage = coordinator.submit_signature(second, &threshold, props, 1_001).unwrap();
        assert_eq!(stage, EscrowStage::Completed);
    }

    #[test]
    fn delegated_event_waits_for_approval_then_completes() {
        let mut coordinator = GroupCoordinator::new(3600);
        let event = sample_event();
        let threshold = SignatureThreshold::Simple(1);
        let props = GroupProperties {
            is_delegated: true,
            requires_witness_receipts: false,
            witness_threshold: 0,
        };
        let signer = Signer::from_seed(&[3u8; 32]);
        let message = serde_json::to_vec(&event.event).unwrap();
        let sig = AttachedSignaturePrefix::new(signer.sign(&message), 0);
        let submission = SignedEventMessage::new(event.event.clone(), vec![sig]);
        let stage = coordinator.submit_signature(submission, &threshold, props, 1_000).unwrap();
        assert_eq!(stage, EscrowStage::Delegated);

        let said = event.event.said.to_str();
        let stage = coordinator.approve_delegation(&said).unwrap();
        assert_eq!(stage, EscrowStage::Completed);
    }

    #[test]
    fn witnessed_event_completes_after_enough_receipts() {
        let mut coordinator = GroupCoordinator::new(3600);
        let event = sample_event();
        let threshold = SignatureThreshold::Simple(1);
        let props = GroupProperties {
            is_delegated: false,
            requires_witness_receipts: true,
            witness_threshold: 2,
        };
        let signer = Signer::from_seed(&[4u8; 32]);
        let message = serde_json::to_vec(&event.event).unwrap();
        let sig = AttachedSignaturePrefix::new(signer.sign(&message), 0);
        let submission = SignedEventMessage::new(event.event.clone(), vec![sig]);
        coordinator.submit_signature(submission, &threshold, props, 1_000).unwrap();

        let said = event.event.said.to_str();
        let backer1 = Basic::Ed25519.derive(&[5u8; 32]);
        let backer2 = Basic::Ed25519.derive(&[6u8; 32]);
        let receipt_signer = Signer::from_seed(&[7u8; 32]);
        let receipt_sig = receipt_signer.sign(&message);
        let stage = coordinator
            .submit_witness_receipt(&said, backer1, receipt_sig.clone())
            .unwrap();
        assert_eq!(stage, EscrowStage::PartiallyWitnessed);
        let stage = coordinator.submit_witness_receipt(&said, backer2, receipt_sig).unwrap();
        assert_eq!(stage, EscrowStage::Completed);
    }

    #[test]
    fn sweep_removes_expired_incomplete_but_not_completed() {
        let mut coordinator = GroupCoordinator::new(10);
        let event = sample_event();
        let threshold = SignatureThreshold::Simple(2);
        let props = GroupProperties {
            is_delegated: false,
            requires_witness_receipts: false,
            witness_threshold: 0,
        };
        let signer = Signer::from_seed(&[8u8; 32]);
        let message = serde_json::to_vec(&event.event).unwrap();
        let sig = AttachedSignaturePrefix::new(signer.sign(&message), 0);
        let submission = SignedEventMessage::new(event.event.clone(), vec![sig]);
        coordinator.submit_signature(submission, &threshold, props, 1_000).unwrap();

        let expired = coordinator.sweep(1_020);
        assert_eq!(expired.len(), 1);
        assert!(coordinator.get(&event.event.said.to_str()).is_none());
    }

    #[test]
    fn elected_member_is_smallest_present_index() {
        let mut coordinator = GroupCoordinator::new(3600);
        let event = sample_event();
        let threshold = SignatureThreshold::Simple(3);
        let props = GroupProperties {
            is_delegated: false,
            requires_witness_receipts: false,
            witness_threshold: 0,
        };
        let message = serde_json::to_vec(&event.event).unwrap();
        let mut sigs = Vec::new();
        for (seed, index) in [(20u8, 2u16), (21u8, 0u16)] {
            let signer = Signer::from_seed(&[seed; 32]);
            sigs.push(AttachedSignaturePrefix::new(signer.sign(&message), index));
        }
        let submission = SignedEventMessage::new(event.event.clone(), sigs);
        coordinator.submit_signature(submission, &threshold, props, 1_000).unwrap();

        let said = event.event.said.to_str();
        let elected = coordinator.elected_member(&said, &[0, 1, 2]).unwrap();
        assert_eq!(elected, 0);
    }
}
