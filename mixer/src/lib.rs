//! Fixed-point resampling mixer and hardware back-end variants for the
//! Quartet player (spec components H, I, J, K)
//!
//! The kernel (§4.H) and interpolators (§4.I) operate purely on integers;
//! floating point never appears in this crate, per the player's
//! integer-only mixing requirement.

mod backend;
mod error;
mod frontend;
mod interp;
mod kernel;
mod module;

pub use backend::{
    make_backend, Backend, FalconDmaBackend, MixerVariant, PaulaBackend, RingBuffer,
    SoftwareBackend, SteDmaBackend, SteDmaMode, Ym2149Backend, YmRegisterWrite, PAULA_MIN_PERIOD,
};
pub use error::MixerError;
pub use frontend::{Mixer, SampleRateRequest};
pub use module::{Interpolator, MixVoice, MIXER_FP, SPR_DEF, SPR_MAX, SPR_MIN};
