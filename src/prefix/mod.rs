//! Self-certifying identifiers, public-key prefixes, digests and attached
//! signature material (spec §3, §4.2, §4.9).

use std::fmt;
use std::str::FromStr;

use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::consts::{BLAKE3_256_CODE, ED25519_CODE, ED25519_NT_CODE, ED25519_SIG_CODE};
use crate::derivation::{Basic, SelfAddressing, SelfSigning};
use crate::error::Error;

/// Common interface for every CESR-encoded primitive: a textual form and
/// the raw bytes it carries.
pub trait Prefix: Sized {
    fn to_str(&self) -> String;
    fn from_str_checked(s: &str) -> Result<Self, Error>;
}

/// A basic (non-self-addressing) public-key prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BasicPrefix {
    pub derivation: Basic,
    pub public_key: Vec<u8>,
}

impl BasicPrefix {
    pub fn verify(&self, message: &[u8], signature: &SelfSigningPrefix) -> Result<bool, Error> {
        let key_bytes: [u8; 32] = self
            .public_key
            .clone()
            .try_into()
            .map_err(|_| Error::InvalidInput("bad ed25519 public key length".into()))?;
        let vk = VerifyingKey::from_bytes(&key_bytes)
            .map_err(|e| Error::InvalidInput(format!("bad ed25519 public key: {e}")))?;
        let sig_bytes: [u8; 64] = signature
            .signature
            .clone()
            .try_into()
            .map_err(|_| Error::InvalidInput("bad ed25519 signature length".into()))?;
        let sig = Signature::from_bytes(&sig_bytes);
        Ok(vk.verify(message, &sig).is_ok())
    }
}

impl Prefix for BasicPrefix {
    fn to_str(&self) -> String {
        crate::derivation::encode_with(self.derivation.code(), &self.public_key)
    }

    fn from_str_checked(s: &str) -> Result<Self, Error> {
        for code in [ED25519_CODE, ED25519_NT_CODE] {
            if s.starts_with(code) {
                let derivation = Basic::from_code(code)?;
                let public_key = crate::derivation::decode_with(s, code)?;
                return Ok(BasicPrefix {
                    derivation,
                    public_key,
                });
            }
        }
        Err(Error::InvalidInput(format!("unrecognized basic prefix {s}")))
    }
}

/// A self-addressing digest prefix (a SAID, or any other structural
/// digest such as a `p`/`prior` pointer).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SelfAddressingPrefix {
    pub derivation: SelfAddressing,
    pub digest: Vec<u8>,
}

impl SelfAddressingPrefix {
    /// True if `self` is the digest of `data` under the same derivation.
    pub fn verify_binding(&self, data: &[u8]) -> bool {
        self.derivation.digest(data) == self.digest
    }
}

impl Prefix for SelfAddressingPrefix {
    fn to_str(&self) -> String {
        crate::derivation::encode_with(self.derivation.code(), &self.digest)
    }

    fn from_str_checked(s: &str) -> Result<Self, Error> {
        if s.starts_with(BLAKE3_256_CODE) {
            let digest = crate::derivation::decode_with(s, BLAKE3_256_CODE)?;
            return Ok(SelfAddressingPrefix {
                derivation: SelfAddressing::Blake3_256,
                digest,
            });
        }
        Err(Error::InvalidInput(format!(
            "unrecognized self-addressing prefix {s}"
        )))
    }
}

/// An attached signature's raw bytes, tagged with its derivation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SelfSigningPrefix {
    pub derivation: SelfSigning,
    pub signature: Vec<u8>,
}

impl Prefix for SelfSigningPrefix {
    fn to_str(&self) -> String {
        crate::derivation::encode_with(self.derivation.code(), &self.signature)
    }

    fn from_str_checked(s: &str) -> Result<Self, Error> {
        if s.starts_with(ED25519_SIG_CODE) {
            let signature = crate::derivation::decode_with(s, ED25519_SIG_CODE)?;
            return Ok(SelfSigningPrefix {
                derivation: SelfSigning::Ed25519Sha512,
                signature,
            });
        }
        Err(Error::InvalidInput(format!(
            "unrecognized self-signing prefix {s}"
        )))
    }
}

/// An AID: either the controller's sole basic public key (single-key,
/// implicitly-thresholded inception) or the SAID of its inception event
/// (self-addressing inception). §3/§4.4.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IdentifierPrefix {
    Basic(BasicPrefix),
    SelfAddressing(SelfAddressingPrefix),
}

impl Default for IdentifierPrefix {
    fn default() -> Self {
        IdentifierPrefix::SelfAddressing(SelfAddressingPrefix::default())
    }
}

impl IdentifierPrefix {
    pub fn self_addressing(said: SelfAddressingPrefix) -> Self {
        IdentifierPrefix::SelfAddressing(said)
    }
}

impl Prefix for IdentifierPrefix {
    fn to_str(&self) -> String {
        match self {
            IdentifierPrefix::Basic(bp) => bp.to_str(),
            IdentifierPrefix::SelfAddressing(sap) => sap.to_str(),
        }
    }

    fn from_str_checked(s: &str) -> Result<Self, Error> {
        if s.is_empty() {
            return Ok(IdentifierPrefix::default());
        }
        if let Ok(sap) = SelfAddressingPrefix::from_str_checked(s) {
            return Ok(IdentifierPrefix::SelfAddressing(sap));
        }
        BasicPrefix::from_str_checked(s).map(IdentifierPrefix::Basic)
    }
}

/// An indexed signature: a `SelfSigningPrefix` plus the index of the
/// signing key within its `KeyConfig.public_keys` (spec §3 "partially
/// signed event").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachedSignaturePrefix {
    pub index: u16,
    pub signature: SelfSigningPrefix,
}

impl AttachedSignaturePrefix {
    pub fn new(signature: SelfSigningPrefix, index: u16) -> Self {
        Self { index, signature }
    }
}

macro_rules! impl_str_serde {
    ($ty:ty) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.to_str())
            }
        }

        impl FromStr for $ty {
            type Err = Error;
            fn from_str(s: &str) -> Result<Self, Error> {
                <$ty>::from_str_checked(s)
            }
        }

        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_str())
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                <$ty>::from_str_checked(&s).map_err(de::Error::custom)
            }
        }
    };
}

impl_str_serde!(BasicPrefix);
impl_str_serde!(SelfAddressingPrefix);
impl_str_serde!(SelfSigningPrefix);
impl_str_serde!(IdentifierPrefix);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_prefix_round_trip() {
        let sap = SelfAddressing::Blake3_256.derive(b"hello world");
        let id = IdentifierPrefix::SelfAddressing(sap.clone());
        let s = id.to_str();
        let back = IdentifierPrefix::from_str_checked(&s).unwrap();
        assert_eq!(id, back);
    }

    #[test]
    fn default_identifier_prefix_serializes_empty() {
        assert_eq!(IdentifierPrefix::default().to_str(), "");
    }
}
