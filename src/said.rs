//! The SAID engine: placeholder substitution, canonical serialization,
//! digest, write-back (spec §4.2). The central fixpoint operation every
//! self-addressing object goes through.

use serde_json::Value;

use crate::consts::said_placeholder;
use crate::derivation::SelfAddressing;
use crate::error::Error;

/// Serializes `value` with stable (insertion-order) key ordering and no
/// whitespace, per spec §4.1. Relies on `serde_json`'s `preserve_order`
/// feature to back `Value::Object` with an order-preserving map.
pub fn canonicalize(value: &Value) -> Result<Vec<u8>, Error> {
    serde_json::to_vec(value).map_err(|e| Error::Internal(format!("canonicalization failed: {e}")))
}

/// Replaces each of `labels` in `obj` with the fixed-width SAID placeholder,
/// then serializes canonically and digests the result with `derivation`,
/// producing the SAID that would be written back into those labels.
///
/// This is the core half of `saidify`: it does not mutate `obj`, so callers
/// that also need to fix up a version-string size field can do so between
/// placeholder injection and this call.
pub fn derive_said(obj: &Value, labels: &[&str], derivation: SelfAddressing) -> Result<String, Error> {
    let mut map = obj
        .as_object()
        .cloned()
        .ok_or_else(|| Error::InvalidInput("saidify target is not a JSON object".into()))?;
    for label in labels {
        if !map.contains_key(*label) {
            return Err(Error::InvalidInput(format!("missing said label {label}")));
        }
        map.insert((*label).to_string(), Value::String(said_placeholder()));
    }
    let canonical = canonicalize(&Value::Object(map))?;
    Ok(derivation.derive(&canonical).to_str())
}

/// Full `saidify` fixpoint: substitutes placeholders into every label in
/// `labels`, serializes, digests, and writes the resulting SAID back into
/// every one of those labels. Idempotent: calling this twice on the same
/// input yields the same SAID (spec testable property 1).
pub fn saidify(obj: &Value, labels: &[&str], derivation: SelfAddressing) -> Result<Value, Error> {
    let mut map = obj
        .as_object()
        .cloned()
        .ok_or_else(|| Error::InvalidInput("saidify target is not a JSON object".into()))?;
    let said = derive_said(&Value::Object(map.clone()), labels, derivation)?;
    for label in labels {
        map.insert((*label).to_string(), Value::String(said.clone()));
    }
    Ok(Value::Object(map))
}

/// Saidifies `obj` after first fixing up a version-string field (`v`) so
/// that its embedded size reflects the placeholder-filled, not yet sized,
/// serialization -- the "size-update loop" of spec §4.2/§4.4 step 4.
///
/// `make_version` receives the byte length of the placeholder-filled
/// canonical form and must return the version string to splice into `v`.
pub fn saidify_with_size(
    obj: &Value,
    labels: &[&str],
    derivation: SelfAddressing,
    make_version: impl Fn(usize) -> String,
) -> Result<Value, Error> {
    let mut map = obj
        .as_object()
        .cloned()
        .ok_or_else(|| Error::InvalidInput("saidify target is not a JSON object".into()))?;
    for label in labels {
        if !map.contains_key(*label) {
            return Err(Error::InvalidInput(format!("missing said label {label}")));
        }
        map.insert((*label).to_string(), Value::String(said_placeholder()));
    }
    let sized_len = canonicalize(&Value::Object(map.clone()))?.len();
    map.insert("v".to_string(), Value::String(make_version(sized_len)));

    let said = derivation.derive(&canonicalize(&Value::Object(map.clone()))?).to_str();
    for label in labels {
        map.insert((*label).to_string(), Value::String(said.clone()));
    }

    let final_len = canonicalize(&Value::Object(map.clone()))?.len();
    if final_len != sized_len {
        return Err(Error::SizeMismatch {
            expected: sized_len,
            got: final_len,
        });
    }
    Ok(Value::Object(map))
}

/// Re-derives the SAID of an already-saidified object and compares it to
/// the value stored in `label`, used by the verifier (spec §4.8).
pub fn verify_said(obj: &Value, label: &str, derivation: SelfAddressing) -> Result<(), Error> {
    let stored = obj
        .get(label)
        .and_then(Value::as_str)
        .ok_or_else(|| Error::InvalidInput(format!("missing said label {label}")))?
        .to_string();
    let recomputed = derive_said(obj, &[label], derivation)?;
    if stored != recomputed {
        return Err(Error::SaidMismatch {
            expected: stored,
            computed: recomputed,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn saidify_is_idempotent() {
        let obj = json!({"d": "", "a": 1, "b": "two"});
        let once = saidify(&obj, &["d"], SelfAddressing::Blake3_256).unwrap();
        let twice = saidify(&once, &["d"], SelfAddressing::Blake3_256).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn saidify_rewrites_multiple_labels_identically() {
        let obj = json!({"d": "", "i": "", "a": 1});
        let said_obj = saidify(&obj, &["d", "i"], SelfAddressing::Blake3_256).unwrap();
        assert_eq!(said_obj["d"], said_obj["i"]);
    }

    #[test]
    fn verify_said_detects_tamper() {
        let obj = json!({"d": "", "a": 1});
        let mut said_obj = saidify(&obj, &["d"], SelfAddressing::Blake3_256).unwrap();
        verify_said(&said_obj, "d", SelfAddressing::Blake3_256).unwrap();
        said_obj["a"] = json!(2);
        assert!(verify_said(&said_obj, "d", SelfAddressing::Blake3_256).is_err());
    }

    #[test]
    fn missing_label_is_invalid_input() {
        let obj = json!({"a": 1});
        assert!(saidify(&obj, &["d"], SelfAddressing::Blake3_256).is_err());
    }
}
