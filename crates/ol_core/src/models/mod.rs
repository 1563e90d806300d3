//! Definition model: the immutable-after-load description of a live that the
//! engine compiles and simulates. Everything here is plain serde-derived data;
//! validation happens in [`crate::Live::new`].

pub mod card;
pub mod chart;
pub mod definition;
pub mod note;
pub mod skill;

pub use card::CardDefinition;
pub use chart::ChartDefinition;
pub use definition::{
    FrameDelayPolicy, JudgeConfig, JudgeRates, LiveDefinition, LiveSettings, TimingSigmas,
    UnitDefinition,
};
pub use note::NoteDefinition;
pub use skill::{SkillDefinition, SkillDischarge, SkillEffect, SkillLevelData, SkillTrigger};
