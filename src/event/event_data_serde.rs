//! Deserialization-only shapes for the three distinct KEL event bodies.
//! Field order does not matter for deserialization (only for the
//! canonical serialization the SAID is computed over), so these derive
//! the ordinary way and get converted into the typed, order-aware bodies.

use serde::Deserialize;
use serde_json::Value;

use crate::error::Error;
use crate::event::event_data::{InceptionData, InteractionData, RotationData};
use crate::event::sections::seal::Seal;
use crate::event::sections::threshold::SignatureThreshold;
use crate::event::sections::witness::{InceptionWitnessConfig, RotationWitnessConfig};
use crate::event::sections::KeyConfig;
use crate::prefix::{BasicPrefix, IdentifierPrefix, SelfAddressingPrefix};

#[derive(Debug, Deserialize)]
struct RawInception {
    kt: SignatureThreshold,
    k: Vec<BasicPrefix>,
    nt: SignatureThreshold,
    n: Vec<SelfAddressingPrefix>,
    #[serde(default, deserialize_with = "hex_u64")]
    bt: u64,
    #[serde(default)]
    b: Vec<BasicPrefix>,
    #[serde(default)]
    c: Vec<String>,
    #[serde(default)]
    a: Vec<Seal>,
    #[serde(default)]
    di: Option<IdentifierPrefix>,
}

#[derive(Debug, Deserialize)]
struct RawRotation {
    p: SelfAddressingPrefix,
    kt: SignatureThreshold,
    k: Vec<BasicPrefix>,
    nt: SignatureThreshold,
    n: Vec<SelfAddressingPrefix>,
    #[serde(default)]
    br: Vec<BasicPrefix>,
    #[serde(default)]
    ba: Vec<BasicPrefix>,
    #[serde(default)]
    c: Vec<String>,
    #[serde(default)]
    a: Vec<Seal>,
    #[serde(default)]
    di: Option<IdentifierPrefix>,
}

#[derive(Debug, Deserialize)]
struct RawInteraction {
    p: SelfAddressingPrefix,
    #[serde(default)]
    a: Vec<Seal>,
}

fn hex_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    u64::from_str_radix(&s, 16).map_err(serde::de::Error::custom)
}

/// The raw body of whichever event type the envelope's `t` claimed.
pub struct RawEventBody(Value);

impl From<Value> for RawEventBody {
    fn from(value: Value) -> Self {
        RawEventBody(value)
    }
}

impl<'de> Deserialize<'de> for RawEventBody {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(RawEventBody)
    }
}

impl RawEventBody {
    pub fn into_inception(self) -> Result<InceptionData, Error> {
        let raw: RawInception =
            serde_json::from_value(self.0).map_err(|e| Error::ParseError(format!("bad icp/dip body: {e}")))?;
        let key_config = KeyConfig::new(raw.k, raw.n, Some(raw.kt), Some(raw.nt));
        Ok(InceptionData::new(
            key_config,
            Some(InceptionWitnessConfig {
                threshold: raw.bt,
                initial_backers: raw.b,
            }),
            Some(raw.c),
            Some(raw.a),
            raw.di,
        ))
    }

    pub fn into_rotation(self) -> Result<RotationData, Error> {
        let raw: RawRotation =
            serde_json::from_value(self.0).map_err(|e| Error::ParseError(format!("bad rot/drt body: {e}")))?;
        let key_config = KeyConfig::new(raw.k, raw.n, Some(raw.kt), Some(raw.nt));
        Ok(RotationData::new(
            raw.p,
            key_config,
            Some(RotationWitnessConfig {
                prune: raw.br,
                graft: raw.ba,
            }),
            Some(raw.c),
            Some(raw.a),
            raw.di,
        ))
    }

    pub fn into_interaction(self) -> Result<InteractionData, Error> {
        let raw: RawInteraction =
            serde_json::from_value(self.0).map_err(|e| Error::ParseError(format!("bad ixn body: {e}")))?;
        Ok(InteractionData::new(raw.p, raw.a))
    }
}
