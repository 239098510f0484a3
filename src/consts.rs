//! Process-wide read-only constants: protocol tags, version defaults and
//! the CESR derivation-code table. No mutable globals live here (§5).

/// `protocol` tag recognized by builders (spec §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Keri,
    Acdc,
}

impl Protocol {
    pub fn tag(self) -> &'static str {
        match self {
            Protocol::Keri => "KERI",
            Protocol::Acdc => "ACDC",
        }
    }
}

/// Default `(major, minor)` version.
pub const DEFAULT_VERSION: (u8, u8) = (1, 0);

/// Width, in CESR text characters, of a Blake3-256 self-addressing
/// identifier once encoded with its single-character derivation code.
pub const SAID_WIDTH: usize = 44;

/// Fixed placeholder written into SAID label(s) before digesting (§4.2).
pub fn said_placeholder() -> String {
    "#".repeat(SAID_WIDTH)
}

/// Derivation code for Blake3-256 digests (the reference hash family).
pub const BLAKE3_256_CODE: &str = "E";

/// Derivation code for a raw Ed25519 public key (basic, non-transferable
/// once used as a one-time prefix; transferable when committed to `nxt`).
pub const ED25519_CODE: &str = "D";

/// Derivation code for an Ed25519 public key used in a non-transferable
/// (witness) role.
pub const ED25519_NT_CODE: &str = "B";

/// Derivation code for an attached Ed25519 signature.
pub const ED25519_SIG_CODE: &str = "0B";

/// Length, in raw bytes, of material each derivation code carries.
pub fn raw_length_for_code(code: &str) -> Option<usize> {
    match code {
        BLAKE3_256_CODE => Some(32),
        ED25519_CODE | ED25519_NT_CODE => Some(32),
        ED25519_SIG_CODE => Some(64),
        _ => None,
    }
}
