use super::base64::{decode_b64url, encode_b64url};
use crate::consts::raw_length_for_code;
use crate::error::Error;

/// Encodes `raw` under derivation `code` per spec §4.1:
/// left-pad with `ps = (3 - len(raw) % 3) % 3` zero bytes, base64url-encode,
/// drop the first `len(code) % 4` characters, prepend `code`.
pub fn cesr_encode(raw: &[u8], code: &str) -> String {
    let ps = (3 - raw.len() % 3) % 3;
    let mut padded = vec![0u8; ps];
    padded.extend_from_slice(raw);
    let b64 = encode_b64url(&padded);
    let drop = code.len() % 4;
    format!("{code}{}", &b64[drop..])
}

/// Decodes a CESR string whose derivation code is known ahead of time.
/// Rejects input whose length is inconsistent with `code`'s claimed raw
/// length.
pub fn cesr_decode_with_code(s: &str, code: &str) -> Result<Vec<u8>, Error> {
    let raw_len = raw_length_for_code(code)
        .ok_or_else(|| Error::InvalidInput(format!("unknown derivation code {code}")))?;
    let body = s
        .strip_prefix(code)
        .ok_or_else(|| Error::InvalidInput(format!("expected code {code}")))?;
    let ps = (3 - raw_len % 3) % 3;
    let padded_len = raw_len + ps;
    let full_b64_len = padded_len * 4 / 3;
    let drop = code.len() % 4;
    let expected_body_len = full_b64_len
        .checked_sub(drop)
        .ok_or_else(|| Error::InvalidInput("code longer than encoding".into()))?;
    if body.len() != expected_body_len {
        return Err(Error::InvalidInput(format!(
            "cesr length mismatch for code {code}: expected {expected_body_len}, got {}",
            body.len()
        )));
    }
    let full_b64 = format!("{}{}", "A".repeat(drop), body);
    let padded = decode_b64url(&full_b64)?;
    if padded.len() != padded_len {
        return Err(Error::InvalidInput("cesr padding mismatch".into()));
    }
    Ok(padded[ps..].to_vec())
}

/// Decodes a CESR string by sniffing its derivation code from a small
/// known-code table, preferring the longest matching prefix.
pub fn cesr_decode(s: &str) -> Result<(String, Vec<u8>), Error> {
    for len in [2usize, 1usize] {
        if s.len() < len {
            continue;
        }
        let code = &s[..len];
        if raw_length_for_code(code).is_some() {
            if let Ok(raw) = cesr_decode_with_code(s, code) {
                return Ok((code.to_string(), raw));
            }
        }
    }
    Err(Error::InvalidInput(format!(
        "could not determine derivation code for {s}"
    )))
}
