use serde::{Deserialize, Serialize};

/// Raw upstream note effect codes.
pub mod effect_code {
    pub const NORMAL: i32 = 1;
    pub const EVENT: i32 = 2;
    pub const HOLD: i32 = 3;
    pub const BOMB_1: i32 = 4;
    pub const BOMB_9: i32 = 7;
    pub const SLIDE: i32 = 11;
    pub const SLIDE_EVENT: i32 = 12;
    pub const SLIDE_HOLD: i32 = 13;
}

/// One chart event as loaded. `position` is the 1-based lane counted from the
/// right edge, as upstream chart files encode it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoteDefinition {
    /// Judge time in seconds.
    pub time: f64,
    pub position: u32,
    #[serde(default)]
    pub attribute: i32,
    /// Raw effect code, see [`effect_code`].
    #[serde(default = "default_effect")]
    pub effect: i32,
    /// Hold duration in seconds for hold notes.
    #[serde(default)]
    pub effect_value: f64,
}

fn default_effect() -> i32 {
    effect_code::NORMAL
}

impl NoteDefinition {
    pub fn is_hold(&self) -> bool {
        self.effect == effect_code::HOLD || self.effect == effect_code::SLIDE_HOLD
    }

    pub fn is_slide(&self) -> bool {
        (effect_code::SLIDE..=effect_code::SLIDE_HOLD).contains(&self.effect)
    }

    pub fn is_bomb(&self) -> bool {
        (effect_code::BOMB_1..=effect_code::BOMB_9).contains(&self.effect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(effect: i32) -> NoteDefinition {
        NoteDefinition { time: 1.0, position: 1, attribute: 0, effect, effect_value: 0.0 }
    }

    #[test]
    fn test_effect_code_flags() {
        assert!(note(effect_code::HOLD).is_hold());
        assert!(!note(effect_code::HOLD).is_slide());
        assert!(note(effect_code::SLIDE_HOLD).is_hold());
        assert!(note(effect_code::SLIDE_HOLD).is_slide());
        assert!(note(effect_code::SLIDE).is_slide());
        assert!(!note(effect_code::SLIDE).is_hold());
        for code in effect_code::BOMB_1..=effect_code::BOMB_9 {
            assert!(note(code).is_bomb(), "code {} should be a bomb", code);
        }
        assert!(!note(effect_code::NORMAL).is_hold());
        assert!(!note(effect_code::NORMAL).is_slide());
        assert!(!note(effect_code::NORMAL).is_bomb());
    }
}
