//! Verification pipeline (spec §4.8): replays a KEL from inception to its
//! head enforcing signing-threshold and pre-rotation invariants, folds a
//! TEL's registry and per-credential sub-sequences, and checks an ACDC's
//! structural self-consistency.

use crate::acdc::Acdc;
use crate::derivation::SelfAddressing;
use crate::error::Error;
use crate::event::event_data::EventData;
use crate::event_message::SignedEventMessage;
use crate::prefix::{Prefix, SelfAddressingPrefix};
use crate::state::{EventSemantics, IdentifierState};
use crate::tel::{apply_credential_event, apply_registry_event, CredentialTelState, RegistryState, TelEvent};

/// Verifies one signed event against a running `IdentifierState` and
/// folds it in. Establishment events (`icp`/`dip`) are checked against
/// their own founding key config; every other event is checked against
/// the key config the *prior* state already established.
pub fn verify_event(state: IdentifierState, signed: &SignedEventMessage) -> Result<IdentifierState, Error> {
    let message = serde_json::to_vec(&signed.event).map_err(|e| Error::Internal(format!("event serialize failed: {e}")))?;
    let verifying_config = match &signed.event.data {
        EventData::Icp(d) | EventData::Dip(d) => &d.key_config,
        EventData::Rot(_) | EventData::Ixn(_) | EventData::Drt(_) => &state.current,
    };
    if !verifying_config.verify(&message, &signed.signatures)? {
        log::warn!("rejecting event {} at sn {}: threshold unsatisfied", signed.event.said.to_str(), signed.event.sn);
        return Err(Error::ThresholdUnsatisfied);
    }
    signed.event.apply_to(state)
}

/// Replays an entire KEL from inception to head, requiring the first
/// event be `icp` or `dip` (spec §4.4 invariant 1).
pub fn verify_kel(events: &[SignedEventMessage]) -> Result<IdentifierState, Error> {
    let mut iter = events.iter();
    let first = iter.next().ok_or_else(|| Error::NotFound("kel has no events".into()))?;
    if !matches!(first.event.data, EventData::Icp(_) | EventData::Dip(_)) {
        return Err(Error::InvalidInput("kel must start with icp or dip".into()));
    }
    let mut state = verify_event(IdentifierState::default(), first)?;
    for signed in iter {
        state = verify_event(state, signed)?;
    }
    Ok(state)
}

/// Folds a registry's own `vcp`/`ixn`/`vrt` sub-sequence, ignoring any
/// `iss`/`rev` events interleaved in the same stream (spec §4.5: the two
/// sequences are independent).
pub fn verify_tel(events: &[TelEvent]) -> Result<RegistryState, Error> {
    let mut state = None;
    for event in events {
        if matches!(event, TelEvent::Iss(_) | TelEvent::Rev(_)) {
            continue;
        }
        state = Some(apply_registry_event(state, event)?);
    }
    state.ok_or_else(|| Error::NotFound("tel has no vcp event".into()))
}

/// Folds one credential's `iss`/`rev` sub-sequence out of a registry's
/// event stream.
pub fn verify_credential_tel(events: &[TelEvent], credential_said: &SelfAddressingPrefix) -> Result<CredentialTelState, Error> {
    let mut state = None;
    for event in events {
        let belongs = match event {
            TelEvent::Iss(e) => &e.credential_said == credential_said,
            TelEvent::Rev(e) => &e.credential_said == credential_said,
            _ => false,
        };
        if belongs {
            state = Some(apply_credential_event(state, event)?);
        }
    }
    state.ok_or_else(|| Error::NotFound(format!("no iss event for credential {}", credential_said.to_str())))
}

/// Checks an ACDC's structural self-consistency: the protocol tag, the
/// nested subject SAID, and the credential's own SAID (spec §4.6
/// invariants, §4.8 `verify_credential`).
pub fn verify_credential(acdc: &Acdc, code: SelfAddressing) -> Result<(), Error> {
    acdc.verify(code)
}

/// Rejects a credential whose TEL sub-sequence shows it revoked.
pub fn require_not_revoked(tel_state: &CredentialTelState) -> Result<(), Error> {
    if tel_state.revoked {
        Err(Error::InvalidInput("credential has been revoked".into()))
    } else {
        Ok(())
    }
}
