use serde::{Deserialize, Serialize};

use super::note::NoteDefinition;

/// One song of a (possibly multi-song) live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartDefinition {
    /// Group id this song grants the member-category bonus for.
    #[serde(default)]
    pub member_category: i32,
    /// Score multiplier applied per note after the fixed bonuses.
    #[serde(default = "default_score_rate")]
    pub score_rate: f64,
    pub notes: Vec<NoteDefinition>,
}

fn default_score_rate() -> f64 {
    1.0
}
