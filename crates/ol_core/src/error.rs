use thiserror::Error;

use crate::models::SkillEffect;

/// Load-time validation errors.
///
/// Everything here is raised by [`crate::Live::new`] before any run starts;
/// a successfully constructed `Live` never fails at simulation time.
#[derive(Error, Debug)]
pub enum LiveError {
    #[error("definition has no cards")]
    EmptyUnit,

    #[error("definition has no charts")]
    EmptyCharts,

    #[error("invalid note position {position} in chart {chart} (expected 1..={card_count})")]
    InvalidNotePosition { chart: usize, position: u32, card_count: usize },

    #[error("non-positive hold duration {duration} in chart {chart}")]
    InvalidHoldDuration { chart: usize, duration: f64 },

    #[error("card {card}: skill level {level} out of range (1..={max_level})")]
    InvalidSkillLevel { card: usize, level: usize, max_level: usize },

    #[error("card {card}: skill effect {effect:?} is not implemented")]
    UnsupportedSkillEffect { card: usize, effect: SkillEffect },

    #[error("card {card}: non-positive trigger value {value}")]
    InvalidTriggerValue { card: usize, value: i64 },

    #[error("card {card}: effect target {target} out of range (card count {card_count})")]
    InvalidEffectTarget { card: usize, target: usize, card_count: usize },

    #[error("card {card}: {effect:?} skill has no effect targets")]
    MissingEffectTargets { card: usize, effect: SkillEffect },

    #[error("card {card}: chain trigger has no target unit types")]
    MissingChainTargets { card: usize },

    #[error("invalid skill order permutation: {reason}")]
    InvalidSkillOrder { reason: String },

    #[error("invalid judge configuration: {reason}")]
    InvalidJudgeConfig { reason: String },
}

pub type Result<T> = std::result::Result<T, LiveError>;
