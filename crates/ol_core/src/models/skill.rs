use serde::{Deserialize, Serialize};

/// Skill effect classes, keeping the upstream effect-id vocabulary.
///
/// `ComboBonusRatio`, `ComboBonusFixedValue` and `GainSkillLevel` are part of
/// the vocabulary but intentionally not modeled; definitions carrying them are
/// rejected at load so results are never silently wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkillEffect {
    None,
    /// Great judgments count as perfect while active.
    GreatToPerfect,
    /// Good judgments count as perfect while active.
    GoodToPerfect,
    /// Restores life; a scoring no-op in this model.
    HpRestore,
    /// Adds a flat amount to the running score.
    ScorePlus,
    /// Multiplies other skills' activation rates while active.
    SkillRateUp,
    /// Copies the most recently activated non-mimic skill.
    Mimic,
    /// Multiplies perfect-hit note scores while active (stacking product).
    PerfectBonusRatio,
    /// Adds a flat amount to perfect-hit note scores while active (stacking sum).
    PerfectBonusFixedValue,
    ComboBonusRatio,
    ComboBonusFixedValue,
    /// Copies a random target card's effective status onto this card.
    SyncStatus,
    GainSkillLevel,
    /// Raises target cards' effective status by a ratio while active.
    GainStatus,
}

impl SkillEffect {
    /// Effects that must fail validation rather than silently no-op.
    pub fn is_unsupported(self) -> bool {
        matches!(
            self,
            SkillEffect::ComboBonusRatio
                | SkillEffect::ComboBonusFixedValue
                | SkillEffect::GainSkillLevel
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkillDischarge {
    None,
    /// One-shot application on activation.
    Immediate,
    /// Active window ended by a scheduled off event.
    Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkillTrigger {
    None,
    /// Fires every `trigger_value` seconds of chart time.
    Time,
    /// Fires every `trigger_value` notes shown.
    NotesCount,
    /// Fires every `trigger_value` combo.
    ComboCount,
    /// Fires every `trigger_value` score.
    Score,
    /// Fires every `trigger_value` perfects.
    PerfectCount,
    /// Fires every `trigger_value` perfect bomb notes.
    StarPerfect,
    /// Fires once every required unit type has activated a skill this song.
    Chain,
}

/// Per-level skill numbers, indexed by the 1-based skill level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SkillLevelData {
    pub effect_value: f64,
    #[serde(default)]
    pub discharge_time: f64,
    #[serde(default)]
    pub trigger_value: i64,
    pub activation_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillDefinition {
    pub effect: SkillEffect,
    pub discharge: SkillDischarge,
    pub trigger: SkillTrigger,
    /// 1-based index into `levels`.
    pub level: usize,
    pub levels: Vec<SkillLevelData>,
    /// Unit-type ids a chain trigger waits for.
    #[serde(default)]
    pub chain_targets: Vec<i32>,
    /// Card indices a status effect applies to.
    #[serde(default)]
    pub effect_targets: Vec<usize>,
}

impl SkillDefinition {
    /// Level data for the skill's configured level. Valid after load-time
    /// validation has checked the level range.
    pub fn level_data(&self) -> &SkillLevelData {
        &self.levels[self.level - 1]
    }
}
