//! Sequencer runtime error types

use core::fmt;

/// Errors raised while interpreting a voice's command stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequencerError {
    /// `P` referenced an instrument slot outside `[0, 20)`
    InstrumentOutOfRange(u32),
    /// `P` referenced an instrument slot the current voice-set never validated
    TaintedInstrument(u32),
    /// A voice's loop stack exceeded its maximum depth (67)
    LoopStackOverflow,
}

impl fmt::Display for SequencerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SequencerError::InstrumentOutOfRange(i) => {
                write!(f, "instrument index {i} out of range")
            }
            SequencerError::TaintedInstrument(i) => {
                write!(f, "instrument {i} is tainted or absent in the current voice-set")
            }
            SequencerError::LoopStackOverflow => {
                write!(f, "loop stack exceeded maximum depth of {}", crate::LOOP_STACK_DEPTH)
            }
        }
    }
}

impl std::error::Error for SequencerError {}
