//! # ol_core - Deterministic Live Score Simulation Engine
//!
//! This library simulates rhythm-game live performances: given a validated
//! definition (unit, skills, charts, judging model) it computes the final
//! score of one randomized run.
//!
//! ## Features
//! - 100% deterministic simulation (same `(run_id, seed)` = same score)
//! - Self-implemented PCG-32 / Bernoulli / Ziggurat sampling, bit-stable
//!   across platforms
//! - Event-scheduled skill system: chains, mimicry, status sync, stacking
//!   bonuses, with exact reference tie-break semantics
//! - Fail-fast validation; a constructed [`Live`] never errors mid-run
//!
//! ## Usage
//! ```
//! use ol_core::{Live, LiveDefinition, UnitDefinition, CardDefinition, ChartDefinition,
//!               NoteDefinition, LiveSettings};
//!
//! let definition = LiveDefinition {
//!     settings: LiveSettings::default(),
//!     unit: UnitDefinition {
//!         status: 50_000.0,
//!         cards: vec![CardDefinition {
//!             unit_type: 1,
//!             member_category: 1,
//!             attribute: 1,
//!             base_status: 50_000.0,
//!             status: 50_000.0,
//!             skill: None,
//!         }],
//!     },
//!     charts: vec![ChartDefinition {
//!         member_category: 1,
//!         score_rate: 1.0,
//!         notes: vec![NoteDefinition {
//!             time: 1.0,
//!             position: 1,
//!             attribute: 1,
//!             effect: 1,
//!             effect_value: 0.0,
//!         }],
//!     }],
//!     skill_order: None,
//! };
//! let mut live = Live::new(&definition).expect("valid definition");
//! let score = live.simulate(0, 0xcafef00dd15ea5e5);
//! assert!(score >= 0);
//! ```

pub mod engine;
pub mod error;
pub mod models;

pub use engine::Live;
pub use error::{LiveError, Result};
pub use models::{
    CardDefinition, ChartDefinition, FrameDelayPolicy, JudgeConfig, JudgeRates, LiveDefinition,
    LiveSettings, NoteDefinition, SkillDefinition, SkillDischarge, SkillEffect, SkillLevelData,
    SkillTrigger, TimingSigmas, UnitDefinition,
};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const SEED: u64 = 0xcafef00dd15ea5e5;

    fn plain_card(status: f64) -> CardDefinition {
        CardDefinition {
            unit_type: 1,
            member_category: 0,
            attribute: 1,
            base_status: status,
            status,
            skill: None,
        }
    }

    fn skill(
        effect: SkillEffect,
        discharge: SkillDischarge,
        trigger: SkillTrigger,
        effect_value: f64,
        discharge_time: f64,
        trigger_value: i64,
        activation_rate: f64,
    ) -> SkillDefinition {
        SkillDefinition {
            effect,
            discharge,
            trigger,
            level: 1,
            levels: vec![SkillLevelData {
                effect_value,
                discharge_time,
                trigger_value,
                activation_rate,
            }],
            chain_targets: vec![],
            effect_targets: vec![],
        }
    }

    fn chart(times: &[f64], card_count: u32) -> ChartDefinition {
        ChartDefinition {
            member_category: 99,
            score_rate: 1.0,
            notes: times
                .iter()
                .map(|&time| NoteDefinition {
                    time,
                    position: card_count,
                    attribute: 0,
                    effect: 1,
                    effect_value: 0.0,
                })
                .collect(),
        }
    }

    /// Rates of 0.0 judge every hit perfect; 1.0 judges none perfect.
    fn fixed_rate_settings(rate: f64) -> LiveSettings {
        LiveSettings {
            judge: JudgeConfig::Approximate {
                rates: JudgeRates {
                    hit: rate,
                    hold_begin: rate,
                    hold_end: rate,
                    slide: rate,
                    slide_hold_end: rate,
                },
            },
            ..LiveSettings::default()
        }
    }

    fn definition(
        status: f64,
        cards: Vec<CardDefinition>,
        charts: Vec<ChartDefinition>,
        settings: LiveSettings,
    ) -> LiveDefinition {
        LiveDefinition {
            settings,
            unit: UnitDefinition { status, cards },
            charts,
            skill_order: None,
        }
    }

    #[test]
    fn test_skill_less_unit_scores_exactly() {
        let def = definition(
            10_000.0,
            vec![plain_card(10_000.0)],
            vec![chart(&[1.0, 2.0, 3.0], 1)],
            fixed_rate_settings(0.0),
        );
        let mut live = Live::new(&def).unwrap();
        // Three perfects at tier 1.0: 3 * floor(10000 * 1.25 / 100) = 375.
        assert_eq!(live.simulate(0, SEED), 375);
        assert_eq!(live.simulate(0, SEED), 375, "same run must replay identically");

        let all_greats = definition(
            10_000.0,
            vec![plain_card(10_000.0)],
            vec![chart(&[1.0, 2.0, 3.0], 1)],
            fixed_rate_settings(1.0),
        );
        let mut live = Live::new(&all_greats).unwrap();
        assert_eq!(live.simulate(0, SEED), 330, "3 * floor(10000 * 1.1 / 100)");
    }

    #[test]
    fn test_judge_buff_overrides_sampled_verdicts() {
        // Sampling says "great" for every hit, but a duration judge buff
        // active from before the first hit forces every one perfect.
        let mut card = plain_card(10_000.0);
        card.skill = Some(skill(
            SkillEffect::GreatToPerfect,
            SkillDischarge::Duration,
            SkillTrigger::NotesCount,
            0.0,
            100.0,
            1,
            100.0,
        ));
        let def = definition(
            10_000.0,
            vec![card],
            vec![chart(&[1.0, 2.0, 3.0, 4.0, 5.0], 1)],
            fixed_rate_settings(1.0),
        );
        let mut live = Live::new(&def).unwrap();
        assert_eq!(live.simulate(0, SEED), 625, "5 * 125, all forced perfect");
        assert_eq!(live.simulate(7, 99), 625, "forced perfects are seed independent");
    }

    #[test]
    fn test_judge_buff_window_bounds() {
        // Active window covers only the last note: the first four keep their
        // sampled "great" verdicts, the fifth is forced perfect.
        let mut card = plain_card(10_000.0);
        card.skill = Some(skill(
            SkillEffect::GreatToPerfect,
            SkillDischarge::Duration,
            SkillTrigger::NotesCount,
            0.0,
            2.5,
            5,
            100.0,
        ));
        let def = definition(
            10_000.0,
            vec![card],
            vec![chart(&[1.0, 2.0, 3.0, 4.0, 5.0], 1)],
            fixed_rate_settings(1.0),
        );
        let mut live = Live::new(&def).unwrap();
        assert_eq!(live.simulate(0, SEED), 4 * 110 + 125);
    }

    #[test]
    fn test_score_plus_notes_count_trigger_cadence() {
        let mut card = plain_card(10_000.0);
        card.skill = Some(skill(
            SkillEffect::ScorePlus,
            SkillDischarge::Immediate,
            SkillTrigger::NotesCount,
            3_500.0,
            0.0,
            2,
            100.0,
        ));
        let def = definition(
            10_000.0,
            vec![card],
            vec![chart(&[1.0, 2.0, 3.0, 4.0, 5.0], 1)],
            fixed_rate_settings(0.0),
        );
        let mut live = Live::new(&def).unwrap();
        // Fires at the 2nd and 4th note show times; the 6th exceeds the chart.
        assert_eq!(live.simulate(0, SEED), 625 + 2 * 3_500);
    }

    #[test]
    fn test_combo_multiplier_carries_across_songs() {
        let times: Vec<f64> = (1..=30).map(|i| i as f64).collect();
        let def = definition(
            10_000.0,
            vec![plain_card(10_000.0)],
            vec![chart(&times, 1), chart(&times, 1)],
            fixed_rate_settings(0.0),
        );
        let mut live = Live::new(&def).unwrap();
        // Combo runs 1..=60 across both songs: 50 notes at tier 1.0 pay 125,
        // the last 10 (combo 51..=60) pay floor(12500 * 1.1 / 100) = 137.
        assert_eq!(live.simulate(0, SEED), 50 * 125 + 10 * 137);
    }

    #[test]
    fn test_perfect_bonus_ratio_multiplies_before_floor() {
        let mut card = plain_card(10_000.0);
        card.skill = Some(skill(
            SkillEffect::PerfectBonusRatio,
            SkillDischarge::Duration,
            SkillTrigger::NotesCount,
            2.0,
            100.0,
            1,
            100.0,
        ));
        let def = definition(
            10_000.0,
            vec![card],
            vec![chart(&[1.0, 2.0, 3.0], 1)],
            fixed_rate_settings(0.0),
        );
        let mut live = Live::new(&def).unwrap();
        // floor(10000 * 1.25 * 2.0 / 100) = 250 per note.
        assert_eq!(live.simulate(0, SEED), 750);
    }

    #[test]
    fn test_perfect_bonus_fixed_adds_after_floor() {
        let mut card = plain_card(10_000.0);
        card.skill = Some(skill(
            SkillEffect::PerfectBonusFixedValue,
            SkillDischarge::Duration,
            SkillTrigger::NotesCount,
            300.0,
            100.0,
            1,
            100.0,
        ));
        let def = definition(
            10_000.0,
            vec![card],
            vec![chart(&[1.0, 2.0, 3.0], 1)],
            fixed_rate_settings(0.0),
        );
        let mut live = Live::new(&def).unwrap();
        assert_eq!(live.simulate(0, SEED), 3 * (125 + 300));
    }

    #[test]
    fn test_gain_status_raises_running_total() {
        let mut buffer = plain_card(15_000.0);
        let mut buff_skill = skill(
            SkillEffect::GainStatus,
            SkillDischarge::Duration,
            SkillTrigger::NotesCount,
            1.5,
            100.0,
            1,
            100.0,
        );
        buff_skill.effect_targets = vec![1];
        buffer.skill = Some(buff_skill);
        let target = plain_card(5_000.0);
        let def = definition(
            20_000.0,
            vec![buffer, target],
            vec![chart(&[1.0, 2.0], 2)],
            fixed_rate_settings(0.0),
        );
        let mut live = Live::new(&def).unwrap();
        // Buff lifts card 1 from 5000 to 7500; the running total becomes
        // 22500 before the first hit: 2 * floor(22500 * 1.25 / 100) = 562.
        assert_eq!(live.simulate(0, SEED), 562);
    }

    #[test]
    fn test_mimic_pops_once_per_push() {
        let mut source = plain_card(10_000.0);
        source.skill = Some(skill(
            SkillEffect::ScorePlus,
            SkillDischarge::Immediate,
            SkillTrigger::Time,
            3_500.0,
            0.0,
            5,
            100.0,
        ));
        let mimic_skill = || {
            skill(
                SkillEffect::Mimic,
                SkillDischarge::Immediate,
                SkillTrigger::Time,
                0.0,
                0.0,
                7,
                100.0,
            )
        };
        let mut first_mimic = plain_card(10_000.0);
        first_mimic.skill = Some(mimic_skill());
        let mut second_mimic = plain_card(10_000.0);
        second_mimic.skill = Some(mimic_skill());
        let mut def = definition(
            10_000.0,
            vec![source, first_mimic, second_mimic],
            vec![chart(&[1.0, 10.0], 3)],
            fixed_rate_settings(0.0),
        );
        def.skill_order = Some(vec![0, 1, 2]);
        let mut live = Live::new(&def).unwrap();
        // The source fires once at t=5 and is copied by exactly one of the
        // two mimics triggering together at t=7; the second finds the stack
        // spent and re-arms without activating.
        assert_eq!(live.simulate(0, SEED), 250 + 3_500 + 3_500);
    }

    #[test]
    fn test_chain_fires_after_all_types_activated() {
        let score_card = |unit_type: i32, trigger_value: i64| {
            let mut card = plain_card(10_000.0);
            card.unit_type = unit_type;
            card.skill = Some(skill(
                SkillEffect::ScorePlus,
                SkillDischarge::Immediate,
                SkillTrigger::Time,
                1_000.0,
                0.0,
                trigger_value,
                100.0,
            ));
            card
        };
        let chain_card = || {
            let mut card = plain_card(10_000.0);
            card.unit_type = 104;
            let mut chain_skill = skill(
                SkillEffect::ScorePlus,
                SkillDischarge::Duration,
                SkillTrigger::Chain,
                5_000.0,
                100.0,
                0,
                100.0,
            );
            chain_skill.chain_targets = vec![101, 102, 103];
            card.skill = Some(chain_skill);
            card
        };

        // Chart shows end at t=9.3: type 101 fires at 2,4,6,8; type 102 at
        // 3,6,9; type 103 at 4,8. The chain completes at t=4.
        let mut def = definition(
            10_000.0,
            vec![score_card(101, 2), score_card(102, 3), score_card(103, 4), chain_card()],
            vec![chart(&[1.0, 10.0], 4)],
            fixed_rate_settings(0.0),
        );
        def.skill_order = Some(vec![0, 1, 2, 3]);
        let mut live = Live::new(&def).unwrap();
        assert_eq!(live.simulate(0, SEED), 250 + 4_000 + 3_000 + 2_000 + 5_000);

        // With type 103 never activating (trigger beyond the chart), the
        // chain stays incomplete and never fires.
        let mut def = definition(
            10_000.0,
            vec![score_card(101, 2), score_card(102, 3), score_card(103, 20), chain_card()],
            vec![chart(&[1.0, 10.0], 4)],
            fixed_rate_settings(0.0),
        );
        def.skill_order = Some(vec![0, 1, 2, 3]);
        let mut live = Live::new(&def).unwrap();
        assert_eq!(live.simulate(0, SEED), 250 + 4_000 + 3_000);
    }

    /// The end-to-end scenario of the regression contract: nine lanes, one
    /// ScorePlus skill (notes-count 22, rate 50, value 3500, status 57033),
    /// approximate judging derived from sigma 0.015.
    fn probabilistic_definition() -> LiveDefinition {
        let mut cards: Vec<CardDefinition> = (0..9).map(|_| plain_card(57_033.0 / 9.0)).collect();
        cards[0].skill = Some(skill(
            SkillEffect::ScorePlus,
            SkillDischarge::Immediate,
            SkillTrigger::NotesCount,
            3_500.0,
            0.0,
            22,
            50.0,
        ));
        let notes: Vec<NoteDefinition> = (1..=100)
            .map(|i| NoteDefinition {
                time: i as f64 * 0.8,
                position: (i % 9 + 1) as u32,
                attribute: 0,
                effect: 1,
                effect_value: 0.0,
            })
            .collect();
        definition(
            57_033.0,
            cards,
            vec![ChartDefinition { member_category: 99, score_rate: 1.0, notes }],
            LiveSettings {
                judge: JudgeConfig::ApproximateFromSigma {
                    sigma: TimingSigmas { hit: 0.015, ..TimingSigmas::default() },
                    mean: 0.0,
                },
                ..LiveSettings::default()
            },
        )
    }

    #[test]
    fn test_probabilistic_runs_replay_bit_for_bit() {
        let mut live = Live::new(&probabilistic_definition()).unwrap();
        let first = live.simulate(0, SEED);
        let second = live.simulate(0, SEED);
        assert_eq!(first, second);
        assert!(first >= 0, "scores are never negative");
    }

    #[test]
    fn test_runs_are_independent_of_call_history() {
        let mut live = Live::new(&probabilistic_definition()).unwrap();
        let fresh = live.simulate(5, SEED);
        live.simulate(6, SEED);
        live.simulate(7, SEED);
        assert_eq!(live.simulate(5, SEED), fresh);
    }

    #[test]
    fn test_timing_mode_replays_bit_for_bit() {
        let mut def = probabilistic_definition();
        def.settings.judge = JudgeConfig::TimingError { sigma: TimingSigmas::default() };
        let mut live = Live::new(&def).unwrap();
        let first = live.simulate(3, SEED);
        live.simulate(4, SEED);
        assert_eq!(live.simulate(3, SEED), first, "timing mode must not leak run state");
    }

    #[test]
    fn test_hold_notes_score_on_release_only() {
        let mut def = definition(
            10_000.0,
            vec![plain_card(10_000.0)],
            vec![chart(&[1.0, 3.0], 1)],
            fixed_rate_settings(0.0),
        );
        def.charts[0].notes[0].effect = 3; // hold
        def.charts[0].notes[0].effect_value = 1.0;
        let mut live = Live::new(&def).unwrap();
        // Hold release at t=2: floor(10000 * 1.25 * 1.25 / 100) = 156; the
        // plain note at t=3 is combo 2: 125.
        assert_eq!(live.simulate(0, SEED), 156 + 125);
    }

    #[test]
    fn test_validation_rejects_bad_definitions() {
        let base = || {
            definition(
                10_000.0,
                vec![plain_card(10_000.0)],
                vec![chart(&[1.0], 1)],
                fixed_rate_settings(0.0),
            )
        };

        let mut def = base();
        def.unit.cards.clear();
        assert!(matches!(Live::new(&def), Err(LiveError::EmptyUnit)));

        let mut def = base();
        def.charts.clear();
        assert!(matches!(Live::new(&def), Err(LiveError::EmptyCharts)));

        let mut def = base();
        def.charts[0].notes[0].position = 2;
        assert!(matches!(Live::new(&def), Err(LiveError::InvalidNotePosition { .. })));

        let mut def = base();
        def.unit.cards[0].skill = Some(skill(
            SkillEffect::ComboBonusRatio,
            SkillDischarge::Immediate,
            SkillTrigger::NotesCount,
            1.0,
            0.0,
            1,
            100.0,
        ));
        assert!(matches!(Live::new(&def), Err(LiveError::UnsupportedSkillEffect { .. })));

        let mut def = base();
        def.unit.cards[0].skill = Some(skill(
            SkillEffect::GainSkillLevel,
            SkillDischarge::Immediate,
            SkillTrigger::NotesCount,
            1.0,
            0.0,
            1,
            100.0,
        ));
        assert!(matches!(Live::new(&def), Err(LiveError::UnsupportedSkillEffect { .. })));

        let mut def = base();
        let mut bad_level = skill(
            SkillEffect::ScorePlus,
            SkillDischarge::Immediate,
            SkillTrigger::NotesCount,
            1.0,
            0.0,
            1,
            100.0,
        );
        bad_level.level = 2;
        def.unit.cards[0].skill = Some(bad_level);
        assert!(matches!(Live::new(&def), Err(LiveError::InvalidSkillLevel { .. })));

        let mut def = base();
        def.skill_order = Some(vec![0, 0]);
        assert!(matches!(Live::new(&def), Err(LiveError::InvalidSkillOrder { .. })));

        let mut def = base();
        def.charts[0].notes[0].effect = 3;
        def.charts[0].notes[0].effect_value = 0.0;
        assert!(matches!(Live::new(&def), Err(LiveError::InvalidHoldDuration { .. })));

        let mut def = base();
        let mut sync = skill(
            SkillEffect::SyncStatus,
            SkillDischarge::Duration,
            SkillTrigger::NotesCount,
            1.0,
            10.0,
            1,
            100.0,
        );
        sync.effect_targets = vec![];
        def.unit.cards[0].skill = Some(sync);
        assert!(matches!(Live::new(&def), Err(LiveError::MissingEffectTargets { .. })));
    }

    proptest! {
        #[test]
        fn prop_simulate_is_pure_in_run_and_seed(seed: u64, run_id in 0u64..1000) {
            let mut live = Live::new(&probabilistic_definition()).unwrap();
            let first = live.simulate(run_id, seed);
            let second = live.simulate(run_id, seed);
            prop_assert_eq!(first, second);
            prop_assert!(first >= 0);
        }
    }
}
