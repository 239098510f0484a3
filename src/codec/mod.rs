//! Base64url and CESR encode/decode of raw digests, keys and signatures
//! (spec §4.1).

pub mod base64;
pub mod cesr;

pub use base64::{decode_b64url, encode_b64url};
pub use cesr::{cesr_decode, cesr_decode_with_code, cesr_encode};
