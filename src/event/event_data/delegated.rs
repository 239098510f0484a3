//! `dip` / `drt`: inception and rotation variants whose establishment is
//! approved by a delegator rather than self-certified alone (spec §4.4).
//!
//! `dip`/`icp` and `drt`/`rot` share an identical field shape; what
//! distinguishes them is the event-type tag and the required presence of
//! `di`. Rather than duplicate `InceptionData`/`RotationData`, delegated
//! variants wrap them and enforce that `delegator` is set.

use crate::error::Error;
use crate::event::event_data::{InceptionData, RotationData};

/// Wraps `InceptionData`, requiring a delegator prefix.
pub fn delegated_inception(data: InceptionData) -> Result<InceptionData, Error> {
    if data.delegator.is_none() {
        return Err(Error::InvalidInput("dip requires a delegator prefix".into()));
    }
    Ok(data)
}

/// Wraps `RotationData`, requiring a delegator prefix.
pub fn delegated_rotation(data: RotationData) -> Result<RotationData, Error> {
    if data.delegator.is_none() {
        return Err(Error::InvalidInput("drt requires a delegator prefix".into()));
    }
    Ok(data)
}

pub type DelegatedInceptionData = InceptionData;
pub type DelegatedRotationData = RotationData;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::derivation::Basic;
    use crate::event::sections::KeyConfig;
    use crate::prefix::IdentifierPrefix;

    #[test]
    fn dip_requires_delegator() {
        let kc = KeyConfig::new(vec![Basic::Ed25519.derive(&[1u8; 32])], vec![], None, None);
        let data = InceptionData::new(kc, None, None, None, None);
        assert!(delegated_inception(data).is_err());
    }

    #[test]
    fn dip_accepts_delegator() {
        let kc = KeyConfig::new(vec![Basic::Ed25519.derive(&[1u8; 32])], vec![], None, None);
        let delegator = IdentifierPrefix::Basic(Basic::Ed25519.derive(&[9u8; 32]));
        let data = InceptionData::new(kc, None, None, None, Some(delegator));
        assert!(delegated_inception(data).is_ok());
    }
}
