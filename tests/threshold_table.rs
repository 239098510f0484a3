//! Table-driven threshold and CESR round-trip coverage.

use keri_core::codec::{decode_b64url, encode_b64url};
use keri_core::event::sections::SignatureThreshold;
use rstest::rstest;

#[rstest]
#[case(vec![0], 1, false)]
#[case(vec![0, 1], 1, true)]
#[case(vec![0, 1], 2, true)]
#[case(vec![0, 1, 2], 4, false)]
fn simple_threshold_satisfaction(#[case] indices: Vec<u16>, #[case] threshold: u64, #[case] expected: bool) {
    let t = SignatureThreshold::Simple(threshold);
    assert_eq!(t.enough_signatures(&indices).unwrap(), expected);
}

#[rstest]
#[case(&[])]
#[case(&[0u8])]
#[case(&[1, 2, 3, 4, 5])]
#[case(&[250, 251, 252, 253, 254, 255])]
fn b64url_round_trip_is_identity(#[case] raw: &[u8]) {
    let encoded = encode_b64url(raw);
    let decoded = decode_b64url(&encoded).unwrap();
    assert_eq!(decoded, raw);
}
