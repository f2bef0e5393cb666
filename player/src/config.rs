//! In-memory player configuration (spec §6 `setup`/`init`/`blend`)
//!
//! The core persists nothing to disk (spec §6 "Persisted state: None"); this
//! struct only validates and clamps the caller's requested knobs the way
//! `nethercore-core`'s runtime config validates fields before they reach the
//! engine, rather than trusting the caller blindly.

use quartet_mixer::{Interpolator, MixerVariant, SampleRateRequest};
use quartet_sequencer::{DEFAULT_TICK_HZ, TICK_HZ_RANGE};

use crate::error::Error;

/// Sentinel passed to [`crate::Player::init`] meaning "run until the
/// sequencer's natural end is detected" (spec §6 `init`'s `EOF` sentinel).
pub const MAX_TICKS_AUTO: u64 = 0;

/// Sentinel passed to [`crate::Player::init`] meaning "derive the tick rate
/// from the loaded song's tempo", per spec §6 `init(rate_hz, ...)`.
pub const TICK_HZ_FROM_SONG: u32 = 0;

/// The A/B/C/D voice → L/R output permutation (spec §6 `blend`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelMap {
    /// `0` — voices in order A, B, C, D.
    #[default]
    Abcd,
    /// `1` — voices reordered A, C, B, D.
    Acbd,
    /// `2` — voices reordered A, D, B, C.
    Adbc,
}

impl ChannelMap {
    /// The voice index feeding each of the four output slots, in order.
    pub fn voice_order(self) -> [usize; 4] {
        match self {
            ChannelMap::Abcd => [0, 1, 2, 3],
            ChannelMap::Acbd => [0, 2, 1, 3],
            ChannelMap::Adbc => [0, 3, 1, 2],
        }
    }
}

/// Validated in-memory player configuration. Constructed fresh per
/// [`crate::Player`]; never read from or written to disk.
#[derive(Debug, Clone)]
pub struct PlayerConfig {
    pub(crate) tick_hz: u32,
    pub(crate) max_ticks: u64,
    pub(crate) end_detect: bool,
    pub(crate) sample_rate: SampleRateRequest,
    pub(crate) mixer: MixerVariant,
    pub(crate) interpolator: Interpolator,
    pub(crate) lr8: u16,
    pub(crate) channel_map: ChannelMap,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        PlayerConfig {
            tick_hz: DEFAULT_TICK_HZ,
            max_ticks: MAX_TICKS_AUTO,
            end_detect: true,
            sample_rate: SampleRateRequest::Mq,
            mixer: MixerVariant::Software,
            interpolator: Interpolator::default(),
            lr8: 128,
            channel_map: ChannelMap::default(),
        }
    }
}

impl PlayerConfig {
    /// Set the tick rate, clamped into spec.md's documented `[50, 800]`
    /// range. `TICK_HZ_FROM_SONG` (0) is accepted and resolved later from
    /// the loaded song.
    pub fn with_tick_hz(mut self, hz: u32) -> Result<Self, Error> {
        if hz != TICK_HZ_FROM_SONG && !TICK_HZ_RANGE.contains(&hz) {
            return Err(Error::Arg(format!(
                "tick rate {hz} outside {:?}",
                TICK_HZ_RANGE
            )));
        }
        self.tick_hz = hz;
        Ok(self)
    }

    pub fn with_max_ticks(mut self, max_ticks: u64) -> Self {
        self.max_ticks = max_ticks;
        self
    }

    pub fn with_end_detect(mut self, end_detect: bool) -> Self {
        self.end_detect = end_detect;
        self
    }

    pub fn with_sample_rate(mut self, spr: SampleRateRequest) -> Self {
        self.sample_rate = spr;
        self
    }

    pub fn with_mixer(mut self, mixer: MixerVariant) -> Self {
        self.mixer = mixer;
        self
    }

    pub fn with_interpolator(mut self, interp: Interpolator) -> Self {
        self.interpolator = interp;
        self
    }

    /// Set the stereo crosstalk blend, validated into `[0, 256]`.
    pub fn with_blend(mut self, lr8: u16, channel_map: ChannelMap) -> Result<Self, Error> {
        if lr8 > 256 {
            return Err(Error::Arg(format!("lr8={lr8} outside [0, 256]")));
        }
        self.lr8 = lr8;
        self.channel_map = channel_map;
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_sane_values() {
        let cfg = PlayerConfig::default();
        assert_eq!(cfg.tick_hz, DEFAULT_TICK_HZ);
        assert_eq!(cfg.max_ticks, MAX_TICKS_AUTO);
        assert!(cfg.end_detect);
    }

    #[test]
    fn tick_hz_out_of_range_is_rejected() {
        assert!(PlayerConfig::default().with_tick_hz(10).is_err());
        assert!(PlayerConfig::default().with_tick_hz(2000).is_err());
        assert!(PlayerConfig::default().with_tick_hz(TICK_HZ_FROM_SONG).is_ok());
    }

    #[test]
    fn blend_out_of_range_is_rejected() {
        assert!(PlayerConfig::default()
            .with_blend(300, ChannelMap::Abcd)
            .is_err());
        assert!(PlayerConfig::default()
            .with_blend(256, ChannelMap::Acbd)
            .is_ok());
    }

    #[test]
    fn channel_map_orders_voices() {
        assert_eq!(ChannelMap::Abcd.voice_order(), [0, 1, 2, 3]);
        assert_eq!(ChannelMap::Acbd.voice_order(), [0, 2, 1, 3]);
        assert_eq!(ChannelMap::Adbc.voice_order(), [0, 3, 1, 2]);
    }
}
