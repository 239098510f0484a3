//! Sub-structures shared across KEL (and, where noted, TEL) event bodies:
//! the signing-threshold algebra, key configuration and pre-rotation
//! commitment, backer lists, and seals.

pub mod key_config;
pub mod seal;
pub mod threshold;
pub mod witness;

pub use key_config::{next_keys_commitment, KeyConfig};
pub use seal::{EventSeal, Seal};
pub use threshold::{Fraction, SignatureThreshold};
pub use witness::{ample, enough_receipts, InceptionWitnessConfig, RotationWitnessConfig};
