//! Per-voice sequencer state (spec §3 `Chan`)

/// Maximum loop stack depth per voice.
pub const LOOP_STACK_DEPTH: usize = 67;

/// Single-tick signal handed to the mixer front-end for a voice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Trig {
    /// Nothing changed this tick.
    #[default]
    Nop,
    /// A new note started; the mixer must reset its read position.
    Note,
    /// The pitch changed (from a slide); the mixer recomputes its step.
    Slide,
    /// The voice stopped; the mixer must silence it.
    Stop,
}

/// Current/target/increment pitch state for one voice.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoteState {
    pub cur: u32,
    pub aim: u32,
    pub stp: i32,
}

/// One entry of a voice's loop stack: where to jump back to, and how many
/// iterations remain.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoopFrame {
    pub return_position: usize,
    pub remaining: u32,
}

/// Per-voice interpreter state (spec §3 `Chan`).
#[derive(Debug, Clone)]
pub struct Chan {
    /// Index of this voice's first command.
    pub seq: usize,
    /// Index of the next command to execute.
    pub cur: usize,
    /// First sound-producing command, used by the whole-sequence loop
    /// suppression rule.
    pub sq0: Option<usize>,
    /// Last sound-producing command, used by the same rule.
    pub sqn: Option<usize>,
    /// One past the last command belonging to this voice.
    pub end: usize,
    /// Ticks remaining before the next command is processed.
    pub wait: u32,
    /// Single-tick signal for the mixer.
    pub trig: Trig,
    /// Current instrument index (0..19).
    pub curi: u32,
    pub note: NoteState,
    pub loop_stack: Vec<LoopFrame>,
    /// Count of times this voice has reached `F`.
    pub has_loop: u32,
    /// `true` once this voice is permanently muted by the host.
    pub muted: bool,
}

impl Chan {
    pub fn new(seq: usize, end: usize, muted: bool) -> Chan {
        Chan {
            seq,
            cur: seq,
            sq0: None,
            sqn: None,
            end,
            wait: 0,
            trig: Trig::Nop,
            curi: 0,
            note: NoteState::default(),
            loop_stack: Vec::new(),
            // Muted voices count as looped from the start so a solo voice
            // ends correctly (spec §4.F).
            has_loop: if muted { 1 } else { 0 },
            muted,
        }
    }
}
