use crate::error::Error;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};

/// Encodes raw bytes with the standard URL-safe, no-padding alphabet.
pub fn encode_b64url(raw: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(raw)
}

/// Decodes a URL-safe, no-padding base64 string.
pub fn decode_b64url(s: &str) -> Result<Vec<u8>, Error> {
    URL_SAFE_NO_PAD
        .decode(s)
        .map_err(|e| Error::InvalidInput(format!("bad base64url: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let raw = [0u8, 1, 2, 250, 251, 252, 253, 254, 255];
        let enc = encode_b64url(&raw);
        assert!(!enc.contains('='));
        let dec = decode_b64url(&enc).unwrap();
        assert_eq!(dec, raw);
    }
}
