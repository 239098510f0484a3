//! Ed25519 keypair wrapper used to produce the signatures KEL/TEL/ACDC
//! builders attach out-of-band (spec §3 "signatures produced externally").

use ed25519_dalek::{Signer as _, SigningKey};
use rand_core::{CryptoRng, RngCore};

use crate::derivation::Basic;
use crate::error::Error;
use crate::prefix::{BasicPrefix, Prefix, SelfSigningPrefix};

/// A single signing keypair plus the basic prefix derived from its public
/// half.
pub struct Signer {
    signing_key: SigningKey,
    prefix: BasicPrefix,
}

impl Signer {
    pub fn new<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        let signing_key = SigningKey::generate(rng);
        let prefix = Basic::Ed25519.derive(signing_key.verifying_key().as_bytes());
        Self { signing_key, prefix }
    }

    pub fn from_seed(seed: &[u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(seed);
        let prefix = Basic::Ed25519.derive(signing_key.verifying_key().as_bytes());
        Self { signing_key, prefix }
    }

    pub fn prefix(&self) -> &BasicPrefix {
        &self.prefix
    }

    pub fn sign(&self, message: &[u8]) -> SelfSigningPrefix {
        let signature = self.signing_key.sign(message);
        crate::derivation::SelfSigning::Ed25519Sha512.derive(signature.to_bytes().to_vec())
    }

    pub fn verify(&self, message: &[u8], signature: &SelfSigningPrefix) -> Result<bool, Error> {
        self.prefix.verify(message, signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    #[test]
    fn sign_and_verify_round_trip() {
        let mut rng = OsRng;
        let signer = Signer::new(&mut rng);
        let sig = signer.sign(b"hello keri");
        assert!(signer.verify(b"hello keri", &sig).unwrap());
        assert!(!signer.verify(b"tampered", &sig).unwrap());
    }

    #[test]
    fn deterministic_from_seed() {
        let seed = [9u8; 32];
        let a = Signer::from_seed(&seed);
        let b = Signer::from_seed(&seed);
        assert_eq!(a.prefix().to_str(), b.prefix().to_str());
    }
}
