//! Running KEL state: the projection that applying a sequence of events
//! produces (spec §4.4 state-machine summary, testable property 3).

use crate::derivation::SelfAddressing;
use crate::error::Error;
use crate::event::event_data::EventData;
use crate::event::sections::KeyConfig;
use crate::prefix::{BasicPrefix, IdentifierPrefix, SelfAddressingPrefix};

/// Applies an event to a running `IdentifierState`, producing the next
/// state or a structured error (spec §4.4 failure semantics).
pub trait EventSemantics {
    fn apply_to(&self, state: IdentifierState) -> Result<IdentifierState, Error>;
}

/// The controller state derived by folding a KEL from inception to head.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IdentifierState {
    pub prefix: IdentifierPrefix,
    pub sn: u64,
    pub last_event_said: SelfAddressingPrefix,
    pub current: KeyConfig,
    pub witnesses: Vec<BasicPrefix>,
    pub witness_threshold: u64,
    pub delegator: Option<IdentifierPrefix>,
    pub delegated_keys: Vec<IdentifierPrefix>,
}

impl EventSemantics for EventData {
    fn apply_to(&self, state: IdentifierState) -> Result<IdentifierState, Error> {
        match self {
            EventData::Icp(data) | EventData::Dip(data) => {
                data.validate()?;
                Ok(IdentifierState {
                    current: data.key_config.clone(),
                    witnesses: data.witness_config.initial_backers.clone(),
                    witness_threshold: data.witness_config.threshold,
                    delegator: data.delegator.clone(),
                    ..state
                })
            }
            EventData::Rot(data) => {
                if state.delegator.is_some() {
                    return Err(Error::DelegationContinuityBroken);
                }
                data.validate_pre_rotation(&state.current, SelfAddressing::Blake3_256)?;
                let witnesses = data.applied_witness_list(&state.witnesses)?;
                Ok(IdentifierState {
                    current: data.key_config.clone(),
                    witnesses,
                    ..state
                })
            }
            EventData::Drt(data) => {
                if state.delegator.is_none() || data.delegator != state.delegator {
                    return Err(Error::DelegationContinuityBroken);
                }
                data.validate_pre_rotation(&state.current, SelfAddressing::Blake3_256)?;
                let witnesses = data.applied_witness_list(&state.witnesses)?;
                Ok(IdentifierState {
                    current: data.key_config.clone(),
                    witnesses,
                    ..state
                })
            }
            EventData::Ixn(_) => Ok(state),
        }
    }
}
