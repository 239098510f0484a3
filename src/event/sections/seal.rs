//! Seals: small cross-references embedded in `a` fields of `ixn` events to
//! anchor external events, most commonly a registry's `vcp` (spec §4.4,
//! §4.5, §9 nested-registry anchoring).

use serde::{Deserialize, Serialize};
use serde_hex::{Compact, SerHex};

use crate::prefix::{IdentifierPrefix, SelfAddressingPrefix};

/// `{i, s?, d}`: a reference to an external event by its owning AID
/// (or registry id), optional sequence number, and SAID.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Seal {
    #[serde(rename = "i")]
    pub identifier: IdentifierPrefix,

    #[serde(rename = "s", skip_serializing_if = "Option::is_none", with = "opt_hex")]
    pub sn: Option<u64>,

    #[serde(rename = "d")]
    pub said: SelfAddressingPrefix,
}

impl Seal {
    /// The canonical seal shape anchoring a registry's inception event
    /// (spec §9: `{i: registryId, d: vcpSaid}`, no sequence number).
    pub fn registry_anchor(registry_id: IdentifierPrefix, vcp_said: SelfAddressingPrefix) -> Self {
        Self {
            identifier: registry_id,
            sn: None,
            said: vcp_said,
        }
    }
}

/// A seal pointing at a specific establishment event of some other AID's
/// KEL, used by delegation to reference the delegating event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventSeal {
    #[serde(rename = "i")]
    pub prefix: IdentifierPrefix,

    #[serde(rename = "s", with = "SerHex::<Compact>")]
    pub sn: u64,

    #[serde(rename = "d")]
    pub event_said: SelfAddressingPrefix,
}

mod opt_hex {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<u64>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(v) => serializer.serialize_str(&format!("{:x}", v)),
            None => unreachable!("skip_serializing_if filters None"),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
        let s: Option<String> = Option::deserialize(deserializer)?;
        s.map(|s| {
            u64::from_str_radix(&s, 16).map_err(|e| serde::de::Error::custom(format!("bad hex sn: {e}")))
        })
        .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::derivation::SelfAddressing;

    #[test]
    fn registry_anchor_shape() {
        let registry_id = IdentifierPrefix::self_addressing(SelfAddressing::Blake3_256.derive(b"registry"));
        let vcp_said = SelfAddressing::Blake3_256.derive(b"vcp");
        let seal = Seal::registry_anchor(registry_id.clone(), vcp_said.clone());
        let v = serde_json::to_value(&seal).unwrap();
        assert_eq!(v.as_object().unwrap().len(), 2);
        assert_eq!(v["i"], registry_id.to_str());
        assert_eq!(v["d"], vcp_said.to_str());
    }
}
