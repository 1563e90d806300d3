//! Compiled chart data and per-run mutable state.
//!
//! Template fields are filled once when the definition is compiled and never
//! change; the run-state groups are overwritten at the start of every run
//! before they are read.

/// One note, compiled: template fields plus its per-run judge state.
#[derive(Debug, Clone)]
pub(crate) struct LiveNote {
    // Template
    pub time: f64,
    /// `time - hi_speed`; what notes-count triggers key off.
    pub show_time: f64,
    /// NaN when the note is not a hold.
    pub hold_end_time: f64,
    pub card_index: usize,
    pub attribute: i32,
    pub is_hold: bool,
    pub is_slide: bool,
    pub is_bomb: bool,
    // Run state
    pub is_hold_begin_perfect: bool,
    pub hold_begin_hit_time: f64,
}

/// One judge-able event: a note's press, or a hold note's release.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Hit {
    pub time: f64,
    pub note_index: usize,
    pub is_perfect: bool,
    pub is_hold_begin: bool,
    pub is_hold_end: bool,
    pub is_slide: bool,
}

impl Hit {
    pub fn new(note_index: usize, note: &LiveNote, is_hold_end: bool) -> Self {
        Self {
            time: if is_hold_end { note.hold_end_time } else { note.time },
            note_index,
            is_perfect: true,
            is_hold_begin: note.is_hold && !is_hold_end,
            is_hold_end,
            is_slide: note.is_slide,
        }
    }
}

/// One compiled song.
#[derive(Debug, Clone)]
pub(crate) struct ChartData {
    pub member_category: i32,
    pub score_rate: f64,
    /// Global note-index range, for triggers that count across songs.
    pub begin_note: i64,
    pub end_note: i64,
    pub last_note_show_time: f64,
    pub notes: Vec<LiveNote>,
}

/// Per-card run state; rebuilt from the card template every run.
#[derive(Debug, Clone)]
pub(crate) struct LiveCard {
    /// Activation-order tag; the high half of the event tie-break id.
    pub order: u32,
    pub current_skill_level: usize,
    /// Mid-discharge, or parked in the forced re-arm delay.
    pub is_active: bool,
    /// Next trigger threshold; unit depends on the trigger type.
    pub next_trigger: i64,
    pub remaining_chain: usize,
    /// Unconsumed flag per chain target type.
    pub chain_status: Vec<bool>,
    /// Resolved mimic target for the current activation.
    pub mimic_source: Option<usize>,
    pub mimic_level: usize,
    /// Status override applied by another card's GainStatus.
    pub buffed_status: Option<f64>,
    /// Status override applied by this card's own SyncStatus.
    pub sync_status: Option<f64>,
}

/// The shared "last non-mimic skill fired" slot. A pop newer than the last
/// push means the record is spent.
#[derive(Debug, Clone)]
pub(crate) struct MimicStack {
    pub push_time: f64,
    pub pop_time: f64,
    pub skill_index: usize,
    pub skill_level: usize,
}

impl MimicStack {
    pub fn reset(&mut self) {
        self.push_time = -1.0;
        self.pop_time = 0.0;
        self.skill_index = 0;
        self.skill_level = 0;
    }
}

impl Default for MimicStack {
    fn default() -> Self {
        let mut stack = Self { push_time: 0.0, pop_time: 0.0, skill_index: 0, skill_level: 0 };
        stack.reset();
        stack
    }
}
