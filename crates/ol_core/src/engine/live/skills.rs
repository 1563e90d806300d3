//! Skill trigger state machine.
//!
//! Per card: Idle -> Triggered (activation roll) -> Active (duration skills)
//! -> Idle, with a transient parked state while the forced one-frame re-arm
//! delay elapses. Chain consumption and the mimic stack are global side
//! effects of every successful activation.

use super::super::constants::timing::FRAME_TIME;
use super::super::events::{SkillEvent, SkillEventKind, ValueTrigger};
use super::Live;
use crate::models::{FrameDelayPolicy, SkillDischarge, SkillEffect, SkillLevelData, SkillTrigger};

impl Live {
    /// Handle an On event: resolve mimicry, roll activation, apply or re-arm.
    pub(crate) fn skill_trigger(&mut self, idx: usize) {
        debug_assert!(!self.live_cards[idx].is_active);
        let is_mimic = self.skill(idx).effect == SkillEffect::Mimic;
        if is_mimic && !self.resolve_mimic(idx) {
            self.skill_rearm(idx);
            return;
        }
        let rate = self.level_data(idx).activation_rate;
        let roll = self.rng.below(100) as f64;
        if roll < rate * self.activation_mod {
            self.skill_on(idx, is_mimic);
        } else {
            log::trace!("card {} failed activation roll at {:.3}", idx, self.time);
            self.skill_rearm(idx);
        }
    }

    /// Apply a successful activation's effect and schedule its end.
    fn skill_on(&mut self, idx: usize, is_mimic: bool) {
        let (effect, discharge, level, effect_card) = if is_mimic {
            let source = self.mimic_source(idx);
            let skill = self.skill(source);
            let level = skill.levels[self.live_cards[idx].mimic_level - 1];
            (skill.effect, skill.discharge, level, source)
        } else {
            let skill = self.skill(idx);
            (skill.effect, skill.discharge, *self.level_data(idx), idx)
        };
        log::trace!("card {} activates {:?} at {:.3}", idx, effect, self.time);

        match effect {
            SkillEffect::GreatToPerfect | SkillEffect::GoodToPerfect => {
                if self.judge_count == 0 {
                    self.status += self.judge_sis_bonus;
                }
                self.judge_count += 1;
            }
            SkillEffect::ScorePlus => {
                self.score += level.effect_value;
            }
            SkillEffect::SkillRateUp => {
                self.activation_mod *= level.effect_value;
            }
            SkillEffect::PerfectBonusRatio => {
                self.push_ratio_bonus(level.effect_value);
            }
            SkillEffect::PerfectBonusFixedValue => {
                self.push_fixed_bonus(level.effect_value);
            }
            SkillEffect::SyncStatus => {
                self.apply_sync_status(idx, effect_card);
            }
            SkillEffect::GainStatus => {
                self.apply_gain_status(effect_card, level.effect_value);
            }
            SkillEffect::HpRestore | SkillEffect::None => {}
            SkillEffect::Mimic => {
                debug_assert!(false, "mimic cannot resolve to a mimic skill");
            }
            SkillEffect::ComboBonusRatio
            | SkillEffect::ComboBonusFixedValue
            | SkillEffect::GainSkillLevel => {
                debug_assert!(false, "unsupported effect past load validation");
            }
        }

        match discharge {
            SkillDischarge::Duration => {
                self.live_cards[idx].is_active = true;
                self.skill_events.push(SkillEvent {
                    time: self.time + level.discharge_time,
                    kind: SkillEventKind::Off,
                    id: self.event_id(idx),
                });
            }
            SkillDischarge::Immediate | SkillDischarge::None => {
                self.skill_rearm(idx);
            }
        }

        self.update_chain(idx);
        self.update_mimic(idx);
    }

    /// Handle an Off event: reverse the effect, then re-arm.
    pub(crate) fn skill_off(&mut self, idx: usize) {
        debug_assert!(self.live_cards[idx].is_active);
        let is_mimic = self.skill(idx).effect == SkillEffect::Mimic;
        let (effect, effect_card) = if is_mimic {
            let source = self.mimic_source(idx);
            (self.skill(source).effect, source)
        } else {
            (self.skill(idx).effect, idx)
        };
        log::trace!("card {} deactivates {:?} at {:.3}", idx, effect, self.time);

        match effect {
            SkillEffect::GreatToPerfect | SkillEffect::GoodToPerfect => {
                debug_assert!(self.judge_count > 0);
                self.judge_count -= 1;
                if self.judge_count == 0 {
                    self.status -= self.judge_sis_bonus;
                }
            }
            SkillEffect::SkillRateUp => {
                // Any rate-up turning off resets the modifier outright
                // instead of dividing out its own contribution; upstream
                // behavior, preserved for compatibility.
                self.activation_mod = self.skill_rate_base;
            }
            SkillEffect::PerfectBonusRatio => {
                // FIFO eviction regardless of which instance expires;
                // upstream behavior, preserved for compatibility.
                self.pop_ratio_bonus();
            }
            SkillEffect::PerfectBonusFixedValue => {
                self.pop_fixed_bonus();
            }
            SkillEffect::SyncStatus => {
                if self.live_cards[idx].sync_status.is_some() {
                    let old = self.effective_status(idx);
                    self.live_cards[idx].sync_status = None;
                    self.status += self.effective_status(idx) - old;
                }
            }
            SkillEffect::GainStatus => {
                self.revert_gain_status(effect_card);
            }
            _ => {}
        }

        self.live_cards[idx].is_active = false;
        self.skill_set_next_trigger(idx);
    }

    /// Compute and queue the next trigger for an idle skill.
    pub(crate) fn skill_set_next_trigger(&mut self, idx: usize) {
        debug_assert!(!self.live_cards[idx].is_active);
        let trigger = self.skill(idx).trigger;
        let level = *self.level_data(idx);
        let id = self.event_id(idx);
        match trigger {
            SkillTrigger::None => {}
            SkillTrigger::Time => {
                let trigger_time = self.time + level.trigger_value as f64;
                if !(trigger_time < self.charts[self.chart_index].last_note_show_time) {
                    return;
                }
                self.skill_events.push(SkillEvent {
                    time: trigger_time,
                    kind: SkillEventKind::On,
                    id,
                });
            }
            SkillTrigger::NotesCount => {
                let begin_note = self.charts[self.chart_index].begin_note;
                let end_note = self.charts[self.chart_index].end_note;
                let mut trigger_note = self.live_cards[idx].next_trigger + level.trigger_value;
                if trigger_note > end_note {
                    return;
                }
                let show_time = self.note_show_time(trigger_note - begin_note - 1);
                if self.time < show_time {
                    self.skill_events.push(SkillEvent {
                        time: show_time,
                        kind: SkillEventKind::On,
                        id,
                    });
                } else {
                    // Thresholds already passed collapse into one immediate
                    // fire that advances the counter past all of them.
                    self.skill_events.push(SkillEvent {
                        time: self.time,
                        kind: SkillEventKind::On,
                        id,
                    });
                    while trigger_note + level.trigger_value <= end_note
                        && !(self.time
                            < self.note_show_time(
                                trigger_note + level.trigger_value - begin_note - 1,
                            ))
                    {
                        trigger_note += level.trigger_value;
                    }
                }
                self.live_cards[idx].next_trigger = trigger_note;
            }
            SkillTrigger::ComboCount => {
                let end_note = self.charts[self.chart_index].end_note;
                let mut trigger_combo = self.live_cards[idx].next_trigger + level.trigger_value;
                if trigger_combo > end_note {
                    return;
                }
                if self.combo < trigger_combo {
                    self.skill_events.push(SkillEvent {
                        time: self.combo_times[(trigger_combo - 1) as usize],
                        kind: SkillEventKind::On,
                        id,
                    });
                } else {
                    self.skill_events.push(SkillEvent {
                        time: self.time,
                        kind: SkillEventKind::On,
                        id,
                    });
                    while !(self.combo < trigger_combo + level.trigger_value) {
                        trigger_combo += level.trigger_value;
                    }
                }
                self.live_cards[idx].next_trigger = trigger_combo;
            }
            SkillTrigger::Score => {
                let mut trigger_score = self.live_cards[idx].next_trigger + level.trigger_value;
                if self.score < trigger_score as f64 {
                    self.score_triggers.push(ValueTrigger { value: trigger_score, id });
                } else {
                    self.skill_events.push(SkillEvent {
                        time: self.time,
                        kind: SkillEventKind::On,
                        id,
                    });
                    while !(self.score < (trigger_score + level.trigger_value) as f64) {
                        trigger_score += level.trigger_value;
                    }
                }
                self.live_cards[idx].next_trigger = trigger_score;
            }
            SkillTrigger::PerfectCount => {
                let mut trigger_perfect = self.live_cards[idx].next_trigger + level.trigger_value;
                if self.perfect < trigger_perfect {
                    self.perfect_triggers.push(ValueTrigger { value: trigger_perfect, id });
                } else {
                    self.skill_events.push(SkillEvent {
                        time: self.time,
                        kind: SkillEventKind::On,
                        id,
                    });
                    while !(self.perfect < trigger_perfect + level.trigger_value) {
                        trigger_perfect += level.trigger_value;
                    }
                }
                self.live_cards[idx].next_trigger = trigger_perfect;
            }
            SkillTrigger::StarPerfect => {
                let mut trigger_star = self.live_cards[idx].next_trigger + level.trigger_value;
                if self.star_perfect < trigger_star {
                    self.star_perfect_triggers.push(ValueTrigger { value: trigger_star, id });
                } else {
                    self.skill_events.push(SkillEvent {
                        time: self.time,
                        kind: SkillEventKind::On,
                        id,
                    });
                    while !(self.star_perfect < trigger_star + level.trigger_value) {
                        trigger_star += level.trigger_value;
                    }
                }
                self.live_cards[idx].next_trigger = trigger_star;
            }
            SkillTrigger::Chain => {
                // Bounded like the time trigger so a completed chain stops
                // re-attempting once the chart's content has run out.
                if self.live_cards[idx].remaining_chain == 0
                    && self.time < self.charts[self.chart_index].last_note_show_time
                {
                    self.skill_events.push(SkillEvent {
                        time: self.time,
                        kind: SkillEventKind::On,
                        id,
                    });
                }
            }
        }
    }

    /// Re-arm after an activation attempt, inserting the forced one-frame
    /// delay where the policy (or chain-trigger termination) demands it.
    pub(crate) fn skill_rearm(&mut self, idx: usize) {
        let trigger = self.skill(idx).trigger;
        let delay = trigger == SkillTrigger::Chain
            || match self.frame_delay {
                FrameDelayPolicy::None => false,
                FrameDelayPolicy::ScoreTriggered => trigger == SkillTrigger::Score,
                FrameDelayPolicy::AllButTime => trigger != SkillTrigger::Time,
            };
        if delay {
            self.live_cards[idx].is_active = true;
            self.skill_events.push(SkillEvent {
                time: self.time + FRAME_TIME,
                kind: SkillEventKind::NextTrigger,
                id: self.event_id(idx),
            });
        } else {
            self.skill_set_next_trigger(idx);
        }
    }

    /// Consume chain-target flags on every other card's chain skill after a
    /// non-chain activation; completing a chain queues its On immediately.
    fn update_chain(&mut self, idx: usize) {
        if self.skill(idx).trigger == SkillTrigger::Chain {
            return;
        }
        let unit_type = self.cards[idx].unit_type;
        for pos in 0..self.chain_cards.len() {
            let chain_idx = self.chain_cards[pos];
            if self.live_cards[chain_idx].remaining_chain == 0 {
                continue;
            }
            let Some(slot) =
                self.skill(chain_idx).chain_targets.iter().position(|&t| t == unit_type)
            else {
                continue;
            };
            if !self.live_cards[chain_idx].chain_status[slot] {
                continue;
            }
            self.live_cards[chain_idx].chain_status[slot] = false;
            self.live_cards[chain_idx].remaining_chain -= 1;
            if self.live_cards[chain_idx].remaining_chain == 0
                && !self.live_cards[chain_idx].is_active
            {
                log::trace!("card {} chain complete at {:.3}", chain_idx, self.time);
                self.skill_events.push(SkillEvent {
                    time: self.time,
                    kind: SkillEventKind::On,
                    id: self.event_id(chain_idx),
                });
            }
        }
    }

    /// Record a non-mimic activation as the mimicable skill. First activator
    /// wins within one instant; later instants overwrite.
    fn update_mimic(&mut self, idx: usize) {
        if self.skill(idx).effect == SkillEffect::Mimic {
            return;
        }
        if self.time > self.mimic_stack.push_time {
            self.mimic_stack.push_time = self.time;
            self.mimic_stack.skill_index = idx;
            self.mimic_stack.skill_level = self.live_cards[idx].current_skill_level;
        }
    }

    /// Try to pop the mimic stack. Fails when the record was already
    /// consumed since its push; a success stamps the pop time so later
    /// mimics at strictly later times fail until the next push.
    fn resolve_mimic(&mut self, idx: usize) -> bool {
        debug_assert!(self.skill(idx).effect == SkillEffect::Mimic);
        debug_assert!(self.time >= self.mimic_stack.push_time);
        debug_assert!(self.time >= self.mimic_stack.pop_time);
        if self.mimic_stack.pop_time > self.mimic_stack.push_time {
            self.live_cards[idx].mimic_source = None;
            self.live_cards[idx].mimic_level = 0;
            return false;
        }
        self.mimic_stack.pop_time = self.time;
        self.live_cards[idx].mimic_source = Some(self.mimic_stack.skill_index);
        self.live_cards[idx].mimic_level = self.mimic_stack.skill_level;
        true
    }

    // ------------------------------------------------------------------
    // Status effects
    // ------------------------------------------------------------------

    /// A card's status as scoring sees it: sync override, else buff
    /// override, else the template value.
    fn effective_status(&self, idx: usize) -> f64 {
        let live = &self.live_cards[idx];
        live.sync_status.or(live.buffed_status).unwrap_or(self.cards[idx].status)
    }

    fn apply_sync_status(&mut self, idx: usize, skill_card: usize) {
        let target_count = self.skill(skill_card).effect_targets.len() as u32;
        let pick = self.rng.below(target_count) as usize;
        let target = self.skill(skill_card).effect_targets[pick];
        let value = self.effective_status(target);
        let old = self.effective_status(idx);
        self.live_cards[idx].sync_status = Some(value);
        self.status += value - old;
    }

    /// Raise each unbuffed target's status; targets already carrying a buff
    /// are skipped, so gains never stack.
    fn apply_gain_status(&mut self, skill_card: usize, ratio: f64) {
        for pos in 0..self.skill(skill_card).effect_targets.len() {
            let target = self.skill(skill_card).effect_targets[pos];
            if self.live_cards[target].buffed_status.is_some() {
                continue;
            }
            let old = self.effective_status(target);
            let buffed = self.cards[target].status * ratio;
            self.live_cards[target].buffed_status = Some(buffed);
            self.status += self.effective_status(target) - old;
        }
    }

    fn revert_gain_status(&mut self, skill_card: usize) {
        for pos in 0..self.skill(skill_card).effect_targets.len() {
            let target = self.skill(skill_card).effect_targets[pos];
            if self.live_cards[target].buffed_status.is_none() {
                continue;
            }
            let old = self.effective_status(target);
            self.live_cards[target].buffed_status = None;
            self.status += self.effective_status(target) - old;
        }
    }

    // ------------------------------------------------------------------
    // Internal lookups
    // ------------------------------------------------------------------

    fn level_data(&self, idx: usize) -> &SkillLevelData {
        let level = self.live_cards[idx].current_skill_level;
        &self.skill(idx).levels[level - 1]
    }

    fn mimic_source(&self, idx: usize) -> usize {
        match self.live_cards[idx].mimic_source {
            Some(source) => source,
            None => unreachable!("mimic activation without a resolved source"),
        }
    }

    fn note_show_time(&self, local_index: i64) -> f64 {
        self.charts[self.chart_index].notes[local_index as usize].show_time
    }
}
