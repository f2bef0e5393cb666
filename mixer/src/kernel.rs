//! The resampling kernel: one voice into an output buffer (spec §4.H)

use quartet_fixed::reduce_overflow;
use quartet_voiceset::Inst;

use crate::interp::sample;
use crate::module::{Interpolator, MixVoice, MIXER_FP};

/// Render `voice` into `out`, assigning on the first voice of a tick and
/// accumulating (adding) for subsequent voices.
///
/// `inst` is the instrument backing `voice.slot`, resolved by the caller
/// from the current voice-set immediately before this call (spec §3
/// "Lifecycle": the mixer holds no instrument borrow beyond one `push`).
///
/// Returns once `out` is full or the voice runs dry (one-shot instrument
/// reaching its end); the remaining samples in `out` are left untouched
/// when assigning (the caller must have zeroed the buffer first) or
/// unmodified when accumulating.
pub fn push_voice(voice: &mut MixVoice, inst: Option<&Inst>, out: &mut [i32], interp: Interpolator, first: bool) {
    let Some(inst) = inst else {
        return;
    };
    let pcm = inst.pcm.as_slice();

    for slot in out.iter_mut() {
        if voice.xtp == 0 {
            break;
        }

        let i = (voice.idx >> MIXER_FP) as usize;
        let f = voice.idx & ((1 << MIXER_FP) - 1);
        let s = sample(interp, pcm, i, f, voice.idx, MIXER_FP);

        if first {
            *slot = s;
        } else {
            *slot += s;
        }

        voice.idx += voice.xtp;

        if voice.idx >= voice.len {
            if voice.lpl == 0 {
                voice.stop();
                break;
            }
            let ovf = (voice.idx - voice.len) as u64;
            let ovf = reduce_overflow(ovf, voice.lpl as u64) as u32;
            voice.idx = (voice.len - voice.lpl) + ovf;
            debug_assert!(voice.idx >= voice.len - voice.lpl && voice.idx < voice.len);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quartet_voiceset::Inst;

    fn inst(pcm: Vec<i8>, len: u32, lpl: u32) -> Inst {
        let end = pcm.len() as u32;
        Inst { pcm, len, lpl, end }
    }

    #[test]
    fn one_shot_nearest_runs_to_completion_and_stops() {
        let i = inst(vec![10, 20, 30, 40, 0, 0, 0, 0], 4, 0);
        let mut voice = MixVoice {
            slot: Some(0),
            idx: 0,
            len: 4 << MIXER_FP,
            lpl: 0,
            xtp: 1 << MIXER_FP,
        };
        let mut out = vec![0i32; 8];
        push_voice(&mut voice, Some(&i), &mut out, Interpolator::Nearest, true);

        assert_eq!(&out[..4], &[10 << 6, 20 << 6, 30 << 6, 40 << 6]);
        assert_eq!(&out[4..], &[0, 0, 0, 0]);
        assert!(!voice.is_active());
    }

    #[test]
    fn looped_linear_wraps_at_len() {
        // len=4, lpl=2: loop body is samples [2,3]; tail pad continues it.
        let mut pcm = vec![0i8, 127, -1, -128];
        pcm.extend([-1i8, -128, -1, -128]); // unroller-style continuation tail
        let i = inst(pcm, 4, 2);
        let mut voice = MixVoice {
            slot: Some(0),
            idx: 0,
            len: 4 << MIXER_FP,
            lpl: 2 << MIXER_FP,
            xtp: (1 << MIXER_FP) / 2, // step of 0.5 samples per output sample
        };
        let mut out = vec![0i32; 8];
        push_voice(&mut voice, Some(&i), &mut out, Interpolator::Linear, true);

        assert!(voice.is_active(), "looped voice must keep playing");
        assert!(voice.idx >= voice.len - voice.lpl && voice.idx < voice.len);
    }

    #[test]
    fn accumulation_adds_into_existing_buffer() {
        let i = inst(vec![50, 0, 0], 1, 0);
        let mut voice = MixVoice {
            slot: Some(0),
            idx: 0,
            len: 1 << MIXER_FP,
            lpl: 0,
            xtp: 1 << MIXER_FP,
        };
        let mut out = vec![100i32];
        push_voice(&mut voice, Some(&i), &mut out, Interpolator::Nearest, false);
        assert_eq!(out[0], 100 + (50 << 6));
    }
}
