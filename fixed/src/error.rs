//! Fixed-point arithmetic error types

use core::fmt;

/// Errors raised by fixed-point pitch math
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixedError {
    /// Pitch-step computation overflowed 32 bits
    Overflow,
    /// Pitch-step computation produced zero (a valid step is always non-zero)
    Zero,
    /// Divisor was zero (output sample rate of 0)
    DivByZero,
}

impl fmt::Display for FixedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FixedError::Overflow => write!(f, "pitch-step computation overflowed 32 bits"),
            FixedError::Zero => write!(f, "pitch-step computation produced a zero step"),
            FixedError::DivByZero => write!(f, "pitch-step computation divided by zero"),
        }
    }
}

impl std::error::Error for FixedError {}
