//! The fixed-shape version string `v` (spec §3, §4.2): protocol tag,
//! major/minor version, serialization kind, and a hex byte-size that is
//! filled in after SAID placeholder substitution but before the digest.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::consts::{Protocol, DEFAULT_VERSION};
use crate::error::Error;

/// Reference encoding kind. The spec names `JSON` as the only kind the
/// reference encoding supports; the shape is kept generic so a future
/// `CBOR`/`MGPK` kind only needs a new match arm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerializationFormats {
    JSON,
}

impl SerializationFormats {
    fn tag(self) -> &'static str {
        match self {
            SerializationFormats::JSON => "JSON",
        }
    }

    fn from_tag(tag: &str) -> Result<Self, Error> {
        match tag {
            "JSON" => Ok(SerializationFormats::JSON),
            other => Err(Error::InvalidInput(format!("unsupported serialization kind {other}"))),
        }
    }

    pub fn encode<T: Serialize>(self, value: &T) -> Result<Vec<u8>, Error> {
        match self {
            SerializationFormats::JSON => {
                serde_json::to_vec(value).map_err(|e| Error::Internal(format!("serialize failed: {e}")))
            }
        }
    }
}

/// `<proto><majorhex><minorhex><kind><sizehex6>_`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerializationInfo {
    pub protocol: Protocol,
    pub major_version: u8,
    pub minor_version: u8,
    pub kind: SerializationFormats,
    pub size: usize,
}

impl SerializationInfo {
    pub fn new(protocol: Protocol, kind: SerializationFormats, size: usize) -> Self {
        Self {
            protocol,
            major_version: DEFAULT_VERSION.0,
            minor_version: DEFAULT_VERSION.1,
            kind,
            size,
        }
    }

    pub fn to_str(self) -> String {
        format!(
            "{}{:x}{:x}{}{:06x}_",
            self.protocol.tag(),
            self.major_version,
            self.minor_version,
            self.kind.tag(),
            self.size
        )
    }

    pub fn from_str(s: &str) -> Result<Self, Error> {
        if s.len() != 17 || !s.ends_with('_') {
            return Err(Error::InvalidInput(format!("malformed version string {s}")));
        }
        let protocol = match &s[0..4] {
            "KERI" => Protocol::Keri,
            "ACDC" => Protocol::Acdc,
            other => return Err(Error::InvalidInput(format!("unknown protocol tag {other}"))),
        };
        let major_version = u8::from_str_radix(&s[4..5], 16)
            .map_err(|_| Error::InvalidInput("bad major version digit".into()))?;
        let minor_version = u8::from_str_radix(&s[5..6], 16)
            .map_err(|_| Error::InvalidInput("bad minor version digit".into()))?;
        let kind = SerializationFormats::from_tag(&s[6..10])?;
        let size = usize::from_str_radix(&s[10..16], 16)
            .map_err(|_| Error::InvalidInput("bad version string size field".into()))?;
        Ok(Self {
            protocol,
            major_version,
            minor_version,
            kind,
            size,
        })
    }
}

impl Serialize for SerializationInfo {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_str())
    }
}

impl<'de> Deserialize<'de> for SerializationInfo {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        SerializationInfo::from_str(&s).map_err(de::Error::custom)
    }
}
