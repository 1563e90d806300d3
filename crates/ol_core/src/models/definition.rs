use serde::{Deserialize, Serialize};

use super::card::CardDefinition;
use super::chart::ChartDefinition;

/// Per-category timing-error standard deviations, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimingSigmas {
    pub hit: f64,
    pub hold_begin: f64,
    pub hold_end: f64,
    pub slide: f64,
}

impl Default for TimingSigmas {
    fn default() -> Self {
        Self { hit: 0.015, hold_begin: 0.015, hold_end: 0.018, slide: 0.030 }
    }
}

/// Pre-derived "great or worse" probabilities per hit category.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JudgeRates {
    pub hit: f64,
    pub hold_begin: f64,
    pub hold_end: f64,
    pub slide: f64,
    pub slide_hold_end: f64,
}

/// How hits are judged. Selected at configuration time, never per hit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode")]
pub enum JudgeConfig {
    /// One Bernoulli draw per hit, with explicitly supplied rates.
    Approximate { rates: JudgeRates },
    /// One Bernoulli draw per hit, rates derived from a normal error model.
    ApproximateFromSigma {
        sigma: TimingSigmas,
        /// Systematic timing-error mean; switches the rate derivation to the
        /// symmetric two-window form when nonzero.
        #[serde(default)]
        mean: f64,
    },
    /// Explicit per-hit timing-error sampling with window clamping.
    TimingError { sigma: TimingSigmas },
}

impl Default for JudgeConfig {
    fn default() -> Self {
        JudgeConfig::ApproximateFromSigma { sigma: TimingSigmas::default(), mean: 0.0 }
    }
}

/// Which trigger types are forced to wait one frame before re-arming after an
/// activation attempt, so they cannot fire twice in the same instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum FrameDelayPolicy {
    None,
    /// Score-triggered skills wait one frame (the reference configuration).
    #[default]
    ScoreTriggered,
    /// Every trigger type except elapsed-time waits one frame.
    AllButTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveSettings {
    /// Note approach speed; a note becomes visible `hi_speed` seconds before
    /// its judge time.
    #[serde(default = "default_hi_speed")]
    pub hi_speed: f64,
    /// Systematic judge-time offset applied in timing-error mode.
    #[serde(default)]
    pub judge_offset: f64,
    #[serde(default)]
    pub judge: JudgeConfig,
    #[serde(default)]
    pub frame_delay: FrameDelayPolicy,
    /// Baseline skill activation-rate multiplier; SkillRateUp off resets the
    /// modifier to this value.
    #[serde(default = "default_skill_rate_base")]
    pub skill_rate_base: f64,
    /// Status bonus granted while at least one judge buff is active.
    #[serde(default)]
    pub judge_sis_bonus: f64,
}

fn default_hi_speed() -> f64 {
    0.7
}

fn default_skill_rate_base() -> f64 {
    1.0
}

impl Default for LiveSettings {
    fn default() -> Self {
        Self {
            hi_speed: default_hi_speed(),
            judge_offset: 0.0,
            judge: JudgeConfig::default(),
            frame_delay: FrameDelayPolicy::default(),
            skill_rate_base: default_skill_rate_base(),
            judge_sis_bonus: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitDefinition {
    /// Team strength total, the base of every note score.
    pub status: f64,
    pub cards: Vec<CardDefinition>,
}

/// A fully parsed live: settings, unit and charts. [`crate::Live::new`]
/// validates this and compiles it into a runnable form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveDefinition {
    #[serde(default)]
    pub settings: LiveSettings,
    pub unit: UnitDefinition,
    pub charts: Vec<ChartDefinition>,
    /// Fixed skill activation-order permutation. When absent the order is
    /// shuffled per run from that run's RNG stream.
    #[serde(default)]
    pub skill_order: Option<Vec<usize>>,
}
