use serde::{Deserialize, Serialize};

use super::skill::SkillDefinition;

/// One performing unit member. Immutable template data; per-run mutable state
/// lives in the engine's `LiveCard`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardDefinition {
    /// Character id, used by chain triggers.
    pub unit_type: i32,
    /// Group id, matched against the chart's member category for the bonus.
    pub member_category: i32,
    /// Color attribute, matched against note attributes.
    pub attribute: i32,
    /// Pre-buff strength.
    #[serde(default)]
    pub base_status: f64,
    /// Post-buff strength, the value status effects copy and scale.
    #[serde(default)]
    pub status: f64,
    #[serde(default)]
    pub skill: Option<SkillDefinition>,
}
