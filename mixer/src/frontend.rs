//! Mixer front-end: trigger dispatch and four-voice accumulation (spec §4.J)

use quartet_fixed::{pitch_step, Step};
use quartet_sequencer::{Chan, NoteState, Trig};
use quartet_voiceset::{Inst, VoiceSet};

use crate::error::MixerError;
use crate::kernel::push_voice;
use crate::module::{Interpolator, MixVoice, MIXER_FP, SPR_DEF, SPR_MAX, SPR_MIN};

/// An output sample-rate request, including the documented sentinel rates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleRateRequest {
    /// A specific rate in Hz, clamped into `[SPR_MIN, SPR_MAX]`.
    Exact(u32),
    /// `LQ`: the voice-set's native rate (`khz * 1000`).
    Lq,
    /// `FQ`: the lowest supported rate.
    Fq,
    /// `MQ`: the default rate (48 kHz).
    Mq,
    /// `HQ`: the highest supported rate.
    Hq,
}

fn resolve_spr(req: SampleRateRequest, voiceset_khz: u32) -> u32 {
    match req {
        SampleRateRequest::Exact(v) => v.clamp(SPR_MIN, SPR_MAX),
        SampleRateRequest::Lq => (voiceset_khz * 1000).clamp(SPR_MIN, SPR_MAX),
        SampleRateRequest::Fq => SPR_MIN,
        SampleRateRequest::Mq => SPR_DEF,
        SampleRateRequest::Hq => SPR_MAX,
    }
}

/// The four-voice software mixer (spec §4.J).
///
/// Holds no borrow into any voice-set: a `Mixer` is constructed once per
/// player and outlives any one loaded voice-set, so each `push` call
/// resolves instruments fresh from the `voice_set` argument it is given
/// (spec §3 "Lifecycle").
pub struct Mixer {
    voices: [MixVoice; 4],
    interp: Interpolator,
    spr: u32,
}

impl Mixer {
    /// Allocate per-voice state at the requested output rate.
    pub fn init(req: SampleRateRequest, voiceset_khz: u32, interp: Interpolator) -> Mixer {
        Mixer {
            voices: std::array::from_fn(|_| MixVoice::default()),
            interp,
            spr: resolve_spr(req, voiceset_khz),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.spr
    }

    /// Current per-output-sample pitch increment for voice `k` (0 if silent).
    pub fn voice_xtp(&self, k: usize) -> u32 {
        self.voices[k].xtp
    }

    pub fn set_interpolator(&mut self, interp: Interpolator) {
        self.interp = interp;
    }

    /// Apply this tick's triggers, then render one block of `out.len()`
    /// samples, accumulating all four voices. Returns the number of samples
    /// produced (always `out.len()` for this software mixer).
    pub fn push(
        &mut self,
        chans: &[Chan; 4],
        voice_set: &VoiceSet,
        out: &mut [i32],
    ) -> Result<usize, MixerError> {
        for k in 0..4 {
            let inst = voice_set.instrument(chans[k].curi);
            apply_trigger(&mut self.voices[k], chans[k].trig, &chans[k].note, chans[k].curi, inst, voice_set.khz as u32, self.spr)?;
        }
        for k in 0..4 {
            let inst = self.voices[k].slot.and_then(|slot| voice_set.instrument(slot as u32));
            push_voice(&mut self.voices[k], inst, out, self.interp, k == 0);
        }
        Ok(out.len())
    }

    /// Release mixer state (a no-op for the software mixer; hardware
    /// back-ends override this to stop DMA/interrupts).
    pub fn free(&mut self) {
        for voice in &mut self.voices {
            voice.stop();
        }
    }
}

/// Apply one tick's trigger to a voice (spec §4.H "Trigger application").
fn apply_trigger(
    voice: &mut MixVoice,
    trig: Trig,
    note: &NoteState,
    curi: u32,
    inst: Option<&Inst>,
    ikhz: u32,
    ohz: u32,
) -> Result<(), MixerError> {
    match trig {
        Trig::Nop => {}
        Trig::Stop => voice.stop(),
        Trig::Note => {
            let Some(inst) = inst else {
                voice.stop();
                return Ok(());
            };
            voice.slot = Some(curi as u8);
            voice.idx = 0;
            voice.len = (inst.len) << MIXER_FP;
            voice.lpl = (inst.lpl) << MIXER_FP;
            recompute_xtp(voice, note, ikhz, ohz)?;
        }
        Trig::Slide => {
            if voice.slot.is_some() {
                recompute_xtp(voice, note, ikhz, ohz)?;
            }
        }
    }
    Ok(())
}

fn recompute_xtp(voice: &mut MixVoice, note: &NoteState, ikhz: u32, ohz: u32) -> Result<(), MixerError> {
    let xtp = pitch_step(Step::from_raw(note.cur), ikhz, ohz, MIXER_FP)?;
    voice.xtp = xtp;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use quartet_sequencer::Chan;
    use quartet_voiceset::VoiceSet;

    fn voiceset_with_one_instrument() -> VoiceSet {
        let pcm = vec![50i8; 16];
        let inst = Inst {
            pcm,
            len: 4,
            lpl: 0,
            end: 16,
        };
        let mut instruments: [Option<Inst>; 20] = Default::default();
        instruments[0] = Some(inst);
        VoiceSet {
            khz: 8,
            instruments,
            used: 1,
        }
    }

    #[test]
    fn resolves_sentinel_sample_rates() {
        assert_eq!(resolve_spr(SampleRateRequest::Fq, 8), SPR_MIN);
        assert_eq!(resolve_spr(SampleRateRequest::Mq, 8), SPR_DEF);
        assert_eq!(resolve_spr(SampleRateRequest::Hq, 8), SPR_MAX);
        assert_eq!(resolve_spr(SampleRateRequest::Lq, 8), 8000);
    }

    #[test]
    fn exact_rate_is_clamped_into_range() {
        assert_eq!(resolve_spr(SampleRateRequest::Exact(1), 8), SPR_MIN);
        assert_eq!(resolve_spr(SampleRateRequest::Exact(999_999), 8), SPR_MAX);
    }

    #[test]
    fn note_trigger_seeds_voice_from_instrument() {
        let vs = voiceset_with_one_instrument();
        let mut mixer = Mixer::init(SampleRateRequest::Exact(8000), vs.khz as u32, Interpolator::Nearest);
        let mut chans: [Chan; 4] = std::array::from_fn(|_| Chan::new(0, 1, true));
        chans[0].trig = Trig::Note;
        chans[0].note.cur = 0x10000;
        chans[0].curi = 0;

        let mut out = vec![0i32; 4];
        mixer.push(&chans, &vs, &mut out).unwrap();
        assert_eq!(out[0], 50 << 6);
    }
}
