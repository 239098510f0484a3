//! Signing-threshold algebra: numeric ("sith"-style hex) and weighted
//! (fractional) thresholds, and satisfaction tests against a set of signer
//! indices (spec §4.3).

use std::collections::HashSet;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::error::Error;

/// A single weight `p/q` in a weighted threshold clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fraction {
    pub numerator: u64,
    pub denominator: u64,
}

impl Fraction {
    pub fn new(numerator: u64, denominator: u64) -> Result<Self, Error> {
        if denominator == 0 {
            return Err(Error::InvalidInput("threshold weight has zero denominator".into()));
        }
        if numerator > denominator {
            return Err(Error::InvalidInput("threshold weight exceeds 1".into()));
        }
        Ok(Self { numerator, denominator })
    }

    fn parse(s: &str) -> Result<Self, Error> {
        match s.split_once('/') {
            Some((n, d)) => {
                let n: u64 = n
                    .parse()
                    .map_err(|_| Error::InvalidInput(format!("bad threshold weight {s}")))?;
                let d: u64 = d
                    .parse()
                    .map_err(|_| Error::InvalidInput(format!("bad threshold weight {s}")))?;
                Fraction::new(n, d)
            }
            None => {
                let n: u64 = s
                    .parse()
                    .map_err(|_| Error::InvalidInput(format!("bad threshold weight {s}")))?;
                Fraction::new(n, 1)
            }
        }
    }

    fn to_string_form(self) -> String {
        if self.denominator == 1 {
            self.numerator.to_string()
        } else {
            format!("{}/{}", self.numerator, self.denominator)
        }
    }
}

/// Signing threshold: either a plain count, or a weighted clause over the
/// corresponding key vector.
#[derive(Debug, Clone, PartialEq)]
pub enum SignatureThreshold {
    Simple(u64),
    Weighted(Vec<Fraction>),
}

impl Default for SignatureThreshold {
    fn default() -> Self {
        SignatureThreshold::Simple(0)
    }
}

impl SignatureThreshold {
    pub fn simple(t: u64) -> Self {
        SignatureThreshold::Simple(t)
    }

    /// Validates the threshold against the corresponding key-vector length.
    /// `t = 0` is only legal for a next-threshold over zero next-keys.
    pub fn validate(&self, key_count: usize) -> Result<(), Error> {
        match self {
            SignatureThreshold::Simple(t) => {
                if (*t as usize) > key_count {
                    return Err(Error::ThresholdUnsatisfied);
                }
                if *t == 0 && key_count != 0 {
                    return Err(Error::ThresholdUnsatisfied);
                }
                Ok(())
            }
            SignatureThreshold::Weighted(weights) => {
                if weights.len() != key_count {
                    return Err(Error::InvalidInput(
                        "weighted threshold length does not match key count".into(),
                    ));
                }
                Ok(())
            }
        }
    }

    /// True iff the given signer indices satisfy this threshold.
    pub fn enough_signatures(&self, indices: &[u16]) -> Result<bool, Error> {
        let unique: HashSet<u16> = indices.iter().copied().collect();
        match self {
            SignatureThreshold::Simple(t) => Ok(unique.len() as u64 >= *t),
            SignatureThreshold::Weighted(weights) => {
                let mut num_sum: u128 = 0;
                let mut common_denom: u128 = 1;
                for w in weights {
                    common_denom = lcm(common_denom, w.denominator as u128);
                }
                for idx in &unique {
                    let w = weights
                        .get(*idx as usize)
                        .ok_or_else(|| Error::InvalidInput("signer index out of range".into()))?;
                    num_sum += common_denom / w.denominator as u128 * w.numerator as u128;
                }
                Ok(num_sum >= common_denom)
            }
        }
    }

    /// Default current threshold for `n` keys: `ceil(n/2)`, clamped to at
    /// least 1 when `n >= 1`.
    pub fn default_current(n: usize) -> Self {
        if n == 0 {
            return SignatureThreshold::Simple(0);
        }
        SignatureThreshold::Simple((n as u64 + 1) / 2)
    }

    /// Default next threshold for `n` next-keys: `ceil(n/2)`, or 0 when
    /// there are no next-keys.
    pub fn default_next(n: usize) -> Self {
        Self::default_current(n)
    }
}

fn gcd(a: u128, b: u128) -> u128 {
    if b == 0 {
        a
    } else {
        gcd(b, a % b)
    }
}

fn lcm(a: u128, b: u128) -> u128 {
    a / gcd(a, b) * b
}

impl Serialize for SignatureThreshold {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            SignatureThreshold::Simple(t) => serializer.serialize_str(&format!("{:x}", t)),
            SignatureThreshold::Weighted(weights) => {
                use serde::ser::SerializeSeq;
                let mut seq = serializer.serialize_seq(Some(weights.len()))?;
                for w in weights {
                    seq.serialize_element(&w.to_string_form())?;
                }
                seq.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for SignatureThreshold {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Str(String),
            Vec(Vec<String>),
        }
        match Raw::deserialize(deserializer)? {
            Raw::Str(s) => {
                let t = u64::from_str_radix(s.trim_start_matches("0x"), 16)
                    .map_err(|_| de::Error::custom(format!("bad numeric threshold {s}")))?;
                Ok(SignatureThreshold::Simple(t))
            }
            Raw::Vec(v) => {
                let weights = v
                    .iter()
                    .map(|s| Fraction::parse(s))
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(de::Error::custom)?;
                Ok(SignatureThreshold::Weighted(weights))
            }
        }
    }
}
