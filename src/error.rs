use thiserror::Error;

/// Structured error taxonomy for the core. The core never panics on
/// data-driven input; every caller-visible failure is one of these
/// variants.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("canonical size mismatch: expected {expected}, got {got}")]
    SizeMismatch { expected: usize, got: usize },

    #[error("said mismatch: expected {expected}, computed {computed}")]
    SaidMismatch { expected: String, computed: String },

    #[error("sequence gap: expected {expected}, got {got}")]
    SequenceGap { expected: u64, got: u64 },

    #[error("prior mismatch: expected {expected}, got {got}")]
    PriorMismatch { expected: String, got: String },

    #[error("threshold not satisfied")]
    ThresholdUnsatisfied,

    #[error("pre-rotation violation: key not committed in prior next-key list")]
    PreRotationViolation,

    #[error("delegation continuity broken")]
    DelegationContinuityBroken,

    #[error("version string mismatch: expected {expected}, got {got}")]
    VersionMismatch { expected: String, got: String },

    #[error("duplicate backer in witness list")]
    DuplicateBacker,

    #[error("backer add/remove lists overlap")]
    BackerOverlap,

    #[error("duplicate signature at index {0}")]
    DuplicateSignature(u16),

    #[error("too many signatures attached")]
    TooManySignatures,

    #[error("not enough signatures to satisfy threshold")]
    NotEnoughSigsError,

    #[error("ipex chain rule violated: {0}")]
    ChainRuleViolated(String),

    #[error("alias already bound to another said in this scope")]
    AliasCollision,

    #[error("event not found for said {0}")]
    NotFound(String),

    #[error("event already exists for said {0}")]
    DuplicateEvent(String),

    #[error("store error: {0}")]
    StoreError(String),

    #[error("parse error: {0}")]
    ParseError(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;
