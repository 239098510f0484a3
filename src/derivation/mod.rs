//! Derivation-code tables: which code identifies which key/digest/signature
//! family, and how to derive a prefix from raw material. Process-wide and
//! read-only (§5); adding an algorithm is an enum variant, not a redesign.

use crate::codec::{cesr_decode_with_code, cesr_encode};
use crate::consts::{BLAKE3_256_CODE, ED25519_CODE, ED25519_NT_CODE, ED25519_SIG_CODE};
use crate::error::Error;
use crate::prefix::{BasicPrefix, SelfAddressingPrefix, SelfSigningPrefix};

/// Basic (non-self-addressing) public-key derivation families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Basic {
    Ed25519,
    Ed25519Nontransferable,
}

impl Basic {
    pub fn code(self) -> &'static str {
        match self {
            Basic::Ed25519 => ED25519_CODE,
            Basic::Ed25519Nontransferable => ED25519_NT_CODE,
        }
    }

    pub fn derive(self, public_key: &[u8]) -> BasicPrefix {
        BasicPrefix {
            derivation: self,
            public_key: public_key.to_vec(),
        }
    }

    pub fn from_code(code: &str) -> Result<Self, Error> {
        match code {
            ED25519_CODE => Ok(Basic::Ed25519),
            ED25519_NT_CODE => Ok(Basic::Ed25519Nontransferable),
            _ => Err(Error::InvalidInput(format!("unknown basic code {code}"))),
        }
    }
}

/// Self-addressing digest derivation families. Blake3-256 is the
/// reference hash (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SelfAddressing {
    #[default]
    Blake3_256,
}

impl SelfAddressing {
    pub fn code(self) -> &'static str {
        match self {
            SelfAddressing::Blake3_256 => BLAKE3_256_CODE,
        }
    }

    pub fn digest(self, data: &[u8]) -> Vec<u8> {
        match self {
            SelfAddressing::Blake3_256 => blake3::hash(data).as_bytes().to_vec(),
        }
    }

    pub fn derive(self, data: &[u8]) -> SelfAddressingPrefix {
        SelfAddressingPrefix {
            derivation: self,
            digest: self.digest(data),
        }
    }

    pub fn from_code(code: &str) -> Result<Self, Error> {
        match code {
            BLAKE3_256_CODE => Ok(SelfAddressing::Blake3_256),
            _ => Err(Error::InvalidInput(format!(
                "unknown self-addressing code {code}"
            ))),
        }
    }
}

/// Self-signing (signature) derivation families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelfSigning {
    Ed25519Sha512,
}

impl SelfSigning {
    pub fn code(self) -> &'static str {
        match self {
            SelfSigning::Ed25519Sha512 => ED25519_SIG_CODE,
        }
    }

    pub fn derive(self, signature: Vec<u8>) -> SelfSigningPrefix {
        SelfSigningPrefix {
            derivation: self,
            signature,
        }
    }

    pub fn from_code(code: &str) -> Result<Self, Error> {
        match code {
            ED25519_SIG_CODE => Ok(SelfSigning::Ed25519Sha512),
            _ => Err(Error::InvalidInput(format!(
                "unknown self-signing code {code}"
            ))),
        }
    }
}

pub(crate) fn encode_with(code: &str, raw: &[u8]) -> String {
    cesr_encode(raw, code)
}

pub(crate) fn decode_with(s: &str, code: &str) -> Result<Vec<u8>, Error> {
    cesr_decode_with_code(s, code)
}
