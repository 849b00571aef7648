use thiserror::Error;

#[derive(Debug, Error)]
pub enum ControlError {
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("ring degree must be a power of 2 and at least 16, got {0}")]
    InvalidRingDegree(usize),

    #[error("modulus mismatch")]
    ModulusMismatch,

    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("scalar {value} outside representable range [{min}, {max}]")]
    ScalarOutOfRange { value: i64, min: i64, max: i64 },

    /// The control received after `step` would decrypt with `remaining`
    /// bits of budget, below the `floor`. Step `step` is the last good one.
    #[error("noise budget exhausted after step {step}: {remaining} bits left, floor is {floor}")]
    NoiseBudgetExhausted { step: u64, remaining: u32, floor: u32 },

    /// Plaintext integer arithmetic left the `i64` range.
    #[error("integer overflow in {0}")]
    Overflow(&'static str),

    #[error("{0} is already bound to key material")]
    AlreadyBound(&'static str),

    #[error("{0} has no key material bound")]
    NotBound(&'static str),

    #[error("out of order: {0}")]
    OutOfOrder(String),

    #[error("plant at step {plant} but controller at step {controller}")]
    StepDesync { plant: u64, controller: u64 },
}

pub type Result<T> = std::result::Result<T, ControlError>;
