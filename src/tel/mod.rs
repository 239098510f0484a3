//! Registry-scoped TEL state machine (spec §4.5, §9). A registry's own
//! `vcp`/`ixn`/`vrt` sequence is folded independently from the
//! per-credential `iss`/`rev` pairs it anchors; the two projections share
//! a registry id but not a sequence counter.

pub mod event;

pub use event::{IssEvent, RevEvent, TelEvent, TelInteractionEvent, VcpEvent, VrtEvent};

use crate::error::Error;
use crate::event::sections::seal::Seal;
use crate::event::sections::witness::RotationWitnessConfig;
use crate::prefix::{BasicPrefix, IdentifierPrefix, Prefix, SelfAddressingPrefix};

/// Running state of one registry, derived by folding `vcp` then any
/// `ixn`/`vrt` events in sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistryState {
    pub registry_id: IdentifierPrefix,
    pub issuer: IdentifierPrefix,
    pub sn: u64,
    pub last_event_said: SelfAddressingPrefix,
    pub backers: Vec<BasicPrefix>,
    pub backer_threshold: u64,
}

impl RegistryState {
    /// Folds a `vcp` event into the registry's initial state.
    pub fn from_vcp(vcp: &VcpEvent) -> Result<Self, Error> {
        if (vcp.backer_threshold as usize) > vcp.backers.len() {
            return Err(Error::ThresholdUnsatisfied);
        }
        Ok(Self {
            registry_id: vcp.registry_id(),
            issuer: vcp.issuer.clone(),
            sn: 0,
            last_event_said: vcp.said.clone(),
            backers: vcp.backers.clone(),
            backer_threshold: vcp.backer_threshold,
        })
    }
}

/// A credential's own `iss`/`rev` sub-sequence, anchored under a
/// registry but numbered independently of the registry's `ixn`/`vrt`
/// sequence (spec §4.5: `iss` is always `s=0`, `rev` is always `s=1`).
#[derive(Debug, Clone, PartialEq)]
pub struct CredentialTelState {
    pub credential_said: SelfAddressingPrefix,
    pub registry_id: IdentifierPrefix,
    pub revoked: bool,
    pub last_event_said: SelfAddressingPrefix,
}

/// Folds one TEL event into the registry's own sequence. Only `vcp`
/// (with no prior state), `ixn`, and `vrt` are valid here; `iss`/`rev`
/// belong to [`apply_credential_event`].
pub fn apply_registry_event(state: Option<RegistryState>, event: &TelEvent) -> Result<RegistryState, Error> {
    match (state, event) {
        (None, TelEvent::Vcp(vcp)) => RegistryState::from_vcp(vcp),
        (None, _) => Err(Error::InvalidInput("registry has no vcp event yet".into())),
        (Some(_), TelEvent::Vcp(_)) => Err(Error::DuplicateEvent("vcp".into())),
        (Some(state), TelEvent::Ixn(ixn)) => {
            require_same_registry(&state.registry_id, &ixn.registry_id)?;
            require_continuity(state.sn, &state.last_event_said, ixn.sn, &ixn.previous_event_said)?;
            Ok(RegistryState {
                sn: ixn.sn,
                last_event_said: ixn.said.clone(),
                ..state
            })
        }
        (Some(state), TelEvent::Vrt(vrt)) => {
            require_same_registry(&state.registry_id, &vrt.registry_id)?;
            require_continuity(state.sn, &state.last_event_said, vrt.sn, &vrt.previous_event_said)?;
            let delta = RotationWitnessConfig {
                prune: vrt.backers_removed.clone(),
                graft: vrt.backers_added.clone(),
            };
            let applied = delta.apply(&state.backers)?;
            // Open question (spec §9): the effective backer count used to
            // judge the new threshold is the *resulting* list, not the
            // bare `ba` addition count from the rotation inputs.
            if (vrt.backer_threshold as usize) > applied.len() {
                return Err(Error::ThresholdUnsatisfied);
            }
            Ok(RegistryState {
                sn: vrt.sn,
                last_event_said: vrt.said.clone(),
                backers: applied,
                backer_threshold: vrt.backer_threshold,
                ..state
            })
        }
        (Some(_), TelEvent::Iss(_)) | (Some(_), TelEvent::Rev(_)) => {
            Err(Error::InvalidInput("iss/rev do not belong to the registry's own sequence".into()))
        }
    }
}

/// Folds one TEL event into a single credential's `iss`/`rev`
/// sub-sequence.
pub fn apply_credential_event(state: Option<CredentialTelState>, event: &TelEvent) -> Result<CredentialTelState, Error> {
    match (state, event) {
        (None, TelEvent::Iss(iss)) => Ok(CredentialTelState {
            credential_said: iss.credential_said.clone(),
            registry_id: iss.registry_id.clone(),
            revoked: false,
            last_event_said: iss.said.clone(),
        }),
        (None, TelEvent::Rev(_)) => Err(Error::InvalidInput("rev with no prior iss for this credential".into())),
        (Some(_), TelEvent::Iss(_)) => Err(Error::DuplicateEvent("iss".into())),
        (Some(state), TelEvent::Rev(rev)) => {
            if state.revoked {
                return Err(Error::DuplicateEvent("rev".into()));
            }
            if rev.credential_said != state.credential_said {
                return Err(Error::InvalidInput("rev credential said mismatch".into()));
            }
            if rev.previous_event_said != state.last_event_said {
                return Err(Error::PriorMismatch {
                    expected: state.last_event_said.to_str(),
                    got: rev.previous_event_said.to_str(),
                });
            }
            Ok(CredentialTelState {
                revoked: true,
                last_event_said: rev.said.clone(),
                ..state
            })
        }
        (_, TelEvent::Vcp(_)) | (_, TelEvent::Ixn(_)) | (_, TelEvent::Vrt(_)) => {
            Err(Error::InvalidInput("only iss/rev belong to a credential's sub-sequence".into()))
        }
    }
}

/// Checks that `seals` (typically a KEL `ixn`'s `a` field) contains the
/// canonical anchor for `registry_id`'s `vcp` event (spec §9: a registry
/// is valid only if its issuer's KEL anchors its inception).
pub fn verify_registry_anchor(seals: &[Seal], registry_id: &IdentifierPrefix, vcp_said: &SelfAddressingPrefix) -> Result<(), Error> {
    let expected = Seal::registry_anchor(registry_id.clone(), vcp_said.clone());
    if seals.iter().any(|s| *s == expected) {
        Ok(())
    } else {
        Err(Error::NotFound(format!("no anchor seal for registry {}", registry_id.to_str())))
    }
}

fn require_same_registry(expected: &IdentifierPrefix, got: &IdentifierPrefix) -> Result<(), Error> {
    if expected == got {
        Ok(())
    } else {
        Err(Error::InvalidInput("event does not belong to this registry".into()))
    }
}

fn require_continuity(
    state_sn: u64,
    state_said: &SelfAddressingPrefix,
    event_sn: u64,
    event_prior: &SelfAddressingPrefix,
) -> Result<(), Error> {
    if event_sn != state_sn + 1 {
        return Err(Error::SequenceGap {
            expected: state_sn + 1,
            got: event_sn,
        });
    }
    if event_prior != state_said {
        return Err(Error::PriorMismatch {
            expected: state_said.to_str(),
            got: event_prior.to_str(),
        });
    }
    Ok(())
}
