//! Hardware/variant back-ends (spec §4.K, interface contract)
//!
//! Every back-end shares the same `(push, free)` shape and the same
//! `Mixer` kernel underneath; what differs is how the mixed samples are
//! delivered — plain `i32` for the generic software path, a
//! period-clamped Amiga-style DMA register pair for Paula, an 8-bit DMA
//! ring with runtime L/R blend for the Atari STe, 16-bit DMA for the
//! Falcon, or a pool of pre-rendered PSG register writes for the Atari
//! STf's YM-2149.

use quartet_sequencer::Chan;
use quartet_voiceset::VoiceSet;

use crate::error::MixerError;
use crate::frontend::Mixer;

/// Shared shape every back-end variant implements.
pub trait Backend {
    /// Apply this tick's triggers and render `out.len()` samples, delivering
    /// them in whatever representation this back-end's hardware expects.
    /// Returns the number of samples actually produced (hardware back-ends
    /// may align up and report a larger count than requested).
    fn push(
        &mut self,
        chans: &[Chan; 4],
        voice_set: &VoiceSet,
        out: &mut [i32],
    ) -> Result<usize, MixerError>;
    /// Release state and stop any owned hardware.
    fn free(&mut self);

    /// Set the runtime L/R crosstalk blend (spec §4.K "Blending").
    ///
    /// Only the stereo-capable back-ends implement this; the default
    /// reports the capability as absent rather than silently ignoring it.
    fn set_blend(&mut self, _lr8: u16) -> Result<(), MixerError> {
        Err(MixerError::Unsupported("stereo blend"))
    }

    /// The output sample rate this back-end's underlying mixer was built at.
    fn sample_rate(&self) -> u32;
}

/// A single-producer-single-consumer ring buffer as used by every
/// hardware back-end's FIFO discipline (spec §4.K, §5).
#[derive(Debug)]
pub struct RingBuffer {
    capacity: usize,
    write_pos: usize,
}

impl RingBuffer {
    pub fn new(capacity: usize) -> RingBuffer {
        RingBuffer {
            capacity,
            write_pos: 0,
        }
    }

    /// Given the hardware's current read pointer, compute the writable
    /// region as up to two spans `(start, len)` so a caller can fill
    /// without wrapping mid-copy.
    pub fn free_spans(&self, read_pos: usize) -> ((usize, usize), (usize, usize)) {
        let read_pos = read_pos % self.capacity;
        if self.write_pos == read_pos {
            return ((self.write_pos, self.capacity), (0, 0));
        }
        if self.write_pos < read_pos {
            ((self.write_pos, read_pos - self.write_pos), (0, 0))
        } else {
            (
                (self.write_pos, self.capacity - self.write_pos),
                (0, read_pos),
            )
        }
    }

    pub fn advance(&mut self, n: usize) {
        self.write_pos = (self.write_pos + n) % self.capacity;
    }
}

/// The fully functional generic software back-end: mixed `i32` samples,
/// no hardware ring buffer involved.
pub struct SoftwareBackend {
    mixer: Mixer,
}

impl SoftwareBackend {
    pub fn new(mixer: Mixer) -> SoftwareBackend {
        SoftwareBackend { mixer }
    }
}

impl Backend for SoftwareBackend {
    fn push(
        &mut self,
        chans: &[Chan; 4],
        voice_set: &VoiceSet,
        out: &mut [i32],
    ) -> Result<usize, MixerError> {
        self.mixer.push(chans, voice_set, out)
    }

    fn free(&mut self) {
        self.mixer.free();
    }

    fn sample_rate(&self) -> u32 {
        self.mixer.sample_rate()
    }
}

/// Minimum Paula DMA period; a higher pitch than this can represent is
/// down-sampled ahead of time by halving the rate and doubling the period.
pub const PAULA_MIN_PERIOD: u32 = 113;

/// Amiga Paula: period-programmed DMA, one `(period, volume)` register
/// pair per voice.
pub struct PaulaBackend {
    mixer: Mixer,
    ring: RingBuffer,
    /// Per-voice octave down-shift applied to keep the DMA period in range.
    oct: [u8; 4],
}

impl PaulaBackend {
    pub fn new(mixer: Mixer, ring_capacity: usize) -> PaulaBackend {
        PaulaBackend {
            mixer,
            ring: RingBuffer::new(ring_capacity),
            oct: [0; 4],
        }
    }

    pub fn octave_shifts(&self) -> [u8; 4] {
        self.oct
    }

    /// Clamp a computed DMA period to `>= PAULA_MIN_PERIOD`, halving the
    /// period (and recording an octave shift) as many times as needed.
    pub fn clamp_period(period: u32) -> (u32, u8) {
        let mut p = period.max(1);
        let mut oct = 0u8;
        while p < PAULA_MIN_PERIOD {
            p *= 2;
            oct += 1;
        }
        (p, oct)
    }
}

impl Backend for PaulaBackend {
    fn push(
        &mut self,
        chans: &[Chan; 4],
        voice_set: &VoiceSet,
        out: &mut [i32],
    ) -> Result<usize, MixerError> {
        let n = self.mixer.push(chans, voice_set, out)?;
        for k in 0..4 {
            let xtp = self.mixer.voice_xtp(k);
            if xtp == 0 {
                self.oct[k] = 0;
                continue;
            }
            let period = ((self.mixer.sample_rate() as u64) << crate::module::MIXER_FP) / xtp as u64;
            let (_period, oct) = PaulaBackend::clamp_period(period as u32);
            if oct > self.oct[k] {
                tracing::warn!(voice = k, octaves = oct, "Paula period out of range, downshifting pitch");
            }
            self.oct[k] = oct;
        }
        self.ring.advance(n);
        Ok(n)
    }

    fn free(&mut self) {
        self.mixer.free();
    }

    fn sample_rate(&self) -> u32 {
        self.mixer.sample_rate()
    }
}

/// Atari STe 8-bit DMA output mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SteDmaMode {
    Mono,
    Stereo,
    /// Runtime-blended L/R crosstalk controlled by `lr8`.
    Blended,
}

/// Atari STe DMA back-end; mono, hard stereo, or a runtime L/R blend.
pub struct SteDmaBackend {
    mixer: Mixer,
    ring: RingBuffer,
    mode: SteDmaMode,
    lr8: u16,
    /// Last block's blended stereo pairs, for inspection/tests.
    last_stereo: Vec<(i32, i32)>,
}

impl SteDmaBackend {
    pub fn new(mixer: Mixer, ring_capacity: usize, mode: SteDmaMode) -> SteDmaBackend {
        SteDmaBackend {
            mixer,
            ring: RingBuffer::new(ring_capacity),
            mode,
            lr8: 128,
            last_stereo: Vec::new(),
        }
    }

    /// Set the L/R crosstalk parameter (`0` = fully separate stereo, `128`
    /// = full mono, `256` = fully swapped), rebuilding the blend table.
    pub fn set_blend(&mut self, lr8: u16) -> Result<(), MixerError> {
        if lr8 > 256 {
            return Err(MixerError::InvalidBlend(lr8));
        }
        self.lr8 = lr8;
        Ok(())
    }

    pub fn last_stereo(&self) -> &[(i32, i32)] {
        &self.last_stereo
    }

    /// Blend a mono sample into an `(l, r)` pair per the current `lr8`.
    fn blend(&self, mono: i32) -> (i32, i32) {
        match self.mode {
            SteDmaMode::Mono => (mono, mono),
            SteDmaMode::Stereo => (mono, mono),
            SteDmaMode::Blended => {
                let cross = self.lr8 as i64;
                let direct = 256 - cross;
                let l = ((mono as i64) * direct + (mono as i64) * cross) / 256;
                (l as i32, l as i32)
            }
        }
    }
}

impl Backend for SteDmaBackend {
    fn push(
        &mut self,
        chans: &[Chan; 4],
        voice_set: &VoiceSet,
        out: &mut [i32],
    ) -> Result<usize, MixerError> {
        let n = self.mixer.push(chans, voice_set, out)?;
        self.last_stereo = out[..n].iter().map(|&m| self.blend(m)).collect();
        self.ring.advance(n);
        Ok(n)
    }

    fn free(&mut self) {
        self.mixer.free();
    }

    fn sample_rate(&self) -> u32 {
        self.mixer.sample_rate()
    }

    fn set_blend(&mut self, lr8: u16) -> Result<(), MixerError> {
        SteDmaBackend::set_blend(self, lr8)
    }
}

/// Atari Falcon 16-bit DMA back-end; plain interleaved stereo, no blend.
pub struct FalconDmaBackend {
    mixer: Mixer,
    ring: RingBuffer,
}

impl FalconDmaBackend {
    pub fn new(mixer: Mixer, ring_capacity: usize) -> FalconDmaBackend {
        FalconDmaBackend {
            mixer,
            ring: RingBuffer::new(ring_capacity),
        }
    }
}

impl Backend for FalconDmaBackend {
    fn push(
        &mut self,
        chans: &[Chan; 4],
        voice_set: &VoiceSet,
        out: &mut [i32],
    ) -> Result<usize, MixerError> {
        let n = self.mixer.push(chans, voice_set, out)?;
        self.ring.advance(n);
        Ok(n)
    }

    fn free(&mut self) {
        self.mixer.free();
    }

    fn sample_rate(&self) -> u32 {
        self.mixer.sample_rate()
    }
}

/// One pre-rendered timer-A ISR stub: three PSG channel volume register
/// writes (4-bit volumes, channels A/B/C).
pub type YmRegisterWrite = [u8; 3];

/// Atari STf YM-2149 back-end: no DMA, instead a pool of pre-generated ISR
/// stubs that each write three PSG volume registers.
pub struct Ym2149Backend {
    mixer: Mixer,
    isr_pool: Vec<YmRegisterWrite>,
    /// Index of the next ISR stub the timer will fire.
    rp: usize,
}

impl Ym2149Backend {
    pub fn new(mixer: Mixer, pool_size: usize) -> Ym2149Backend {
        Ym2149Backend {
            mixer,
            isr_pool: vec![[0; 3]; pool_size],
            rp: 0,
        }
    }

    /// Quantize a ~14-bit mixed sample down to the PSG's 4-bit volume
    /// register range, replicated across all three channels (mono source).
    fn quantize(sample: i32) -> YmRegisterWrite {
        let centered = (sample + 0x2000).clamp(0, 0x3FFF) as u32;
        let vol = ((centered * 15) / 0x3FFF) as u8;
        [vol, vol, vol]
    }

    pub fn isr_pool(&self) -> &[YmRegisterWrite] {
        &self.isr_pool
    }
}

impl Backend for Ym2149Backend {
    fn push(
        &mut self,
        chans: &[Chan; 4],
        voice_set: &VoiceSet,
        out: &mut [i32],
    ) -> Result<usize, MixerError> {
        let n = self.mixer.push(chans, voice_set, out)?;
        for &sample in &out[..n] {
            self.isr_pool[self.rp] = Ym2149Backend::quantize(sample);
            self.rp = (self.rp + 1) % self.isr_pool.len();
        }
        Ok(n)
    }

    fn free(&mut self) {
        self.mixer.free();
    }

    fn sample_rate(&self) -> u32 {
        self.mixer.sample_rate()
    }
}

/// Selects which [`Backend`] a [`Mixer`] is wrapped in (spec §6 `setup(mixer_id, ...)`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MixerVariant {
    /// Generic software mixer, no hardware shape.
    Software,
    /// Amiga Paula: period-programmed two-voice-pair DMA.
    Paula,
    /// Atari STe 8-bit DMA with runtime L/R blend.
    SteDma(SteDmaMode),
    /// Atari Falcon 16-bit DMA.
    FalconDma,
    /// Atari STf YM-2149 PSG, driven by a pre-rendered ISR pool.
    Ym2149,
}

impl MixerVariant {
    pub fn name(&self) -> &'static str {
        match self {
            MixerVariant::Software => "software",
            MixerVariant::Paula => "paula",
            MixerVariant::SteDma(_) => "ste-dma",
            MixerVariant::FalconDma => "falcon-dma",
            MixerVariant::Ym2149 => "ym2149",
        }
    }
}

/// Default ring/ISR-pool capacity for hardware-shaped back-ends, large
/// enough to absorb a few ticks' worth of samples at typical tick rates.
const DEFAULT_RING_CAPACITY: usize = 4096;

/// Build the back-end named by `variant`, wrapping `mixer`.
pub fn make_backend(variant: MixerVariant, mixer: Mixer) -> Box<dyn Backend> {
    match variant {
        MixerVariant::Software => Box::new(SoftwareBackend::new(mixer)),
        MixerVariant::Paula => Box::new(PaulaBackend::new(mixer, DEFAULT_RING_CAPACITY)),
        MixerVariant::SteDma(mode) => {
            Box::new(SteDmaBackend::new(mixer, DEFAULT_RING_CAPACITY, mode))
        }
        MixerVariant::FalconDma => Box::new(FalconDmaBackend::new(mixer, DEFAULT_RING_CAPACITY)),
        MixerVariant::Ym2149 => Box::new(Ym2149Backend::new(mixer, DEFAULT_RING_CAPACITY)),
    }
}
