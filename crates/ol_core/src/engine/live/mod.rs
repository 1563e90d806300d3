//! The live engine: validated construction, per-run initialization, and the
//! time-ordered merge of the hit stream with the skill event queues.
//!
//! One `Live` value holds both the compiled template data (immutable after
//! construction) and the mutable state of the run in progress. Runs never
//! share mutable state; parallel batch drivers give each worker its own
//! clone and rely on `(run_id, seed)` alone to determine every result.

pub(crate) mod state;
mod skills;

use std::collections::VecDeque;

use self::state::{ChartData, Hit, LiveCard, LiveNote, MimicStack};
use super::constants::RUN_STRIDE;
use super::events::{MinQueue, SkillEvent, SkillEventKind, SkillId, ValueTrigger};
use super::judge::JudgeParams;
use super::rng::Pcg32;
use super::score::{advance_combo_tier, combo_multiplier, note_score, NoteScoreInput};
use crate::error::{LiveError, Result};
use crate::models::{
    CardDefinition, FrameDelayPolicy, LiveDefinition, SkillDefinition, SkillEffect, SkillTrigger,
};

/// A compiled, runnable live. See [`Live::new`] and [`Live::simulate`].
#[derive(Debug, Clone)]
pub struct Live {
    // Compiled template data
    frame_delay: FrameDelayPolicy,
    skill_rate_base: f64,
    judge_sis_bonus: f64,
    judge: JudgeParams,
    cards: Vec<CardDefinition>,
    unit_status: f64,
    charts: Vec<ChartData>,
    hit_templates: Vec<Vec<Hit>>,
    /// Time of the hit completing each combo count, across all songs.
    combo_times: Vec<f64>,
    /// Indices of cards with chain-trigger skills.
    chain_cards: Vec<usize>,
    fixed_order: Option<Vec<u32>>,

    // Run state
    rng: Pcg32,
    pub(crate) live_cards: Vec<LiveCard>,
    chart_hits: Vec<Vec<Hit>>,
    pub(crate) mimic_stack: MimicStack,
    pub(crate) chart_index: usize,
    pub(crate) time: f64,
    hit_index: usize,
    pub(crate) score: f64,
    pub(crate) combo: i64,
    pub(crate) perfect: i64,
    pub(crate) star_perfect: i64,
    pub(crate) judge_count: u32,
    combo_tier: usize,
    pub(crate) status: f64,
    pub(crate) activation_mod: f64,
    perfect_ratio_queue: VecDeque<f64>,
    pub(crate) perfect_ratio_mul: f64,
    perfect_fixed_queue: VecDeque<f64>,
    pub(crate) perfect_fixed_sum: f64,
    pub(crate) skill_events: MinQueue<SkillEvent>,
    pub(crate) score_triggers: MinQueue<ValueTrigger>,
    pub(crate) perfect_triggers: MinQueue<ValueTrigger>,
    pub(crate) star_perfect_triggers: MinQueue<ValueTrigger>,
}

impl Live {
    /// Validate a definition and compile it into a runnable live.
    ///
    /// Fails fast with a specific [`LiveError`]; a returned `Live` never
    /// fails during [`Live::simulate`].
    pub fn new(definition: &LiveDefinition) -> Result<Self> {
        let card_count = definition.unit.cards.len();
        if card_count == 0 {
            return Err(LiveError::EmptyUnit);
        }
        if definition.charts.is_empty() {
            return Err(LiveError::EmptyCharts);
        }

        for (i, card) in definition.unit.cards.iter().enumerate() {
            if let Some(skill) = &card.skill {
                validate_skill(i, skill, card_count)?;
            }
        }

        let fixed_order = match &definition.skill_order {
            Some(order) => Some(validate_skill_order(order, card_count)?),
            None => None,
        };

        let judge = JudgeParams::derive(&definition.settings)?;

        // Compile charts: resolve lanes, derive show/hold times, sort, and
        // assign global note-index ranges.
        let mut charts = Vec::with_capacity(definition.charts.len());
        let mut total_notes: i64 = 0;
        for (k, chart) in definition.charts.iter().enumerate() {
            let mut notes = Vec::with_capacity(chart.notes.len());
            for note in &chart.notes {
                if note.position == 0 || note.position as usize > card_count {
                    return Err(LiveError::InvalidNotePosition {
                        chart: k,
                        position: note.position,
                        card_count,
                    });
                }
                let is_hold = note.is_hold();
                if is_hold && !(note.effect_value > 0.0) {
                    return Err(LiveError::InvalidHoldDuration {
                        chart: k,
                        duration: note.effect_value,
                    });
                }
                notes.push(LiveNote {
                    time: note.time,
                    show_time: note.time - definition.settings.hi_speed,
                    hold_end_time: if is_hold { note.time + note.effect_value } else { f64::NAN },
                    card_index: card_count - note.position as usize,
                    attribute: note.attribute,
                    is_hold,
                    is_slide: note.is_slide(),
                    is_bomb: note.is_bomb(),
                    is_hold_begin_perfect: false,
                    hold_begin_hit_time: 0.0,
                });
            }
            notes.sort_by(|a, b| a.time.total_cmp(&b.time));
            let begin_note = total_notes;
            total_notes += notes.len() as i64;
            charts.push(ChartData {
                member_category: chart.member_category,
                score_rate: chart.score_rate,
                begin_note,
                end_note: total_notes,
                last_note_show_time: notes.last().map_or(0.0, |n| n.show_time),
                notes,
            });
        }

        // Hit streams: one per note, press + release for holds, sorted by
        // time; the combo-time table indexes combo counts across all songs.
        let mut hit_templates = Vec::with_capacity(charts.len());
        let mut combo_times = Vec::with_capacity(total_notes as usize);
        for chart in &charts {
            let mut hits = Vec::with_capacity(chart.notes.len() * 2);
            for (i, note) in chart.notes.iter().enumerate() {
                hits.push(Hit::new(i, note, false));
                if note.is_hold {
                    hits.push(Hit::new(i, note, true));
                }
            }
            hits.sort_by(|a, b| a.time.total_cmp(&b.time));
            for hit in &hits {
                if !hit.is_hold_begin {
                    combo_times.push(hit.time);
                }
            }
            debug_assert_eq!(combo_times.len() as i64, chart.end_note);
            hit_templates.push(hits);
        }

        let chain_cards = definition
            .unit
            .cards
            .iter()
            .enumerate()
            .filter(|(_, c)| {
                c.skill.as_ref().is_some_and(|s| s.trigger == SkillTrigger::Chain)
            })
            .map(|(i, _)| i)
            .collect();

        let live_cards = definition
            .unit
            .cards
            .iter()
            .map(|card| LiveCard {
                order: 0,
                current_skill_level: 0,
                is_active: false,
                next_trigger: 0,
                remaining_chain: 0,
                chain_status: card
                    .skill
                    .as_ref()
                    .map_or_else(Vec::new, |s| vec![true; s.chain_targets.len()]),
                mimic_source: None,
                mimic_level: 0,
                buffed_status: None,
                sync_status: None,
            })
            .collect();

        let chart_hits = hit_templates.clone();
        Ok(Self {
            frame_delay: definition.settings.frame_delay,
            skill_rate_base: definition.settings.skill_rate_base,
            judge_sis_bonus: definition.settings.judge_sis_bonus,
            judge,
            cards: definition.unit.cards.clone(),
            unit_status: definition.unit.status,
            charts,
            hit_templates,
            combo_times,
            chain_cards,
            fixed_order,
            rng: Pcg32::new(0),
            live_cards,
            chart_hits,
            mimic_stack: MimicStack::default(),
            chart_index: 0,
            time: 0.0,
            hit_index: 0,
            score: 0.0,
            combo: 0,
            perfect: 0,
            star_perfect: 0,
            judge_count: 0,
            combo_tier: 0,
            status: 0.0,
            activation_mod: 1.0,
            perfect_ratio_queue: VecDeque::new(),
            perfect_ratio_mul: 1.0,
            perfect_fixed_queue: VecDeque::new(),
            perfect_fixed_sum: 0.0,
            skill_events: MinQueue::new(),
            score_triggers: MinQueue::new(),
            perfect_triggers: MinQueue::new(),
            star_perfect_triggers: MinQueue::new(),
        })
    }

    /// Run one simulation to completion and return the final score.
    ///
    /// Pure in `(run_id, seed)`: the same pair on an unmodified `Live`
    /// always returns the same score, bit for bit, regardless of what ran
    /// before. Each run id addresses its own RNG stream offset so batches
    /// can be sharded or parallelized freely.
    pub fn simulate(&mut self, run_id: u64, seed: u64) -> i64 {
        self.rng.reseed(seed);
        self.rng.advance(run_id.wrapping_mul(RUN_STRIDE));
        self.init_run();
        self.judge_all_charts();
        self.start_skill_triggers();
        for chart_index in 0..self.charts.len() {
            self.chart_index = chart_index;
            if chart_index > 0 {
                self.init_next_song();
            }
            self.run_chart();
        }
        self.score_triggers.clear();
        self.perfect_triggers.clear();
        self.star_perfect_triggers.clear();
        debug_assert!(self.skill_events.is_empty());
        self.score as i64
    }

    fn init_run(&mut self) {
        self.chart_index = 0;
        self.time = 0.0;
        self.hit_index = 0;
        self.score = 0.0;
        self.combo = 0;
        self.perfect = 0;
        self.star_perfect = 0;
        self.judge_count = 0;
        self.combo_tier = 0;
        self.status = self.unit_status;
        self.activation_mod = self.skill_rate_base;
        self.perfect_ratio_queue.clear();
        self.perfect_ratio_mul = 1.0;
        self.perfect_fixed_queue.clear();
        self.perfect_fixed_sum = 0.0;
        debug_assert!(self.skill_events.is_empty());
        debug_assert!(self.score_triggers.is_empty());
        debug_assert!(self.perfect_triggers.is_empty());
        debug_assert!(self.star_perfect_triggers.is_empty());

        for i in 0..self.cards.len() {
            let order = i as u32;
            let card = &self.cards[i];
            let live = &mut self.live_cards[i];
            live.order = order;
            live.buffed_status = None;
            live.sync_status = None;
            if let Some(skill) = &card.skill {
                live.current_skill_level = skill.level;
                live.is_active = false;
                live.next_trigger = 0;
                live.remaining_chain = skill.chain_targets.len();
                live.chain_status.fill(true);
                live.mimic_source = None;
                live.mimic_level = 0;
            }
        }
        self.mimic_stack.reset();

        match &self.fixed_order {
            Some(order) => {
                for (i, &tag) in order.iter().enumerate() {
                    self.live_cards[i].order = tag;
                }
            }
            None => self.shuffle_order(),
        }
    }

    /// Fisher-Yates over the activation-order tags, driven by this run's
    /// stream so the order is part of the reproducible state.
    fn shuffle_order(&mut self) {
        for i in (2..=self.cards.len()).rev() {
            let j = self.rng.below(i as u32) as usize;
            let tag = self.live_cards[i - 1].order;
            self.live_cards[i - 1].order = self.live_cards[j].order;
            self.live_cards[j].order = tag;
        }
    }

    fn judge_all_charts(&mut self) {
        for k in 0..self.charts.len() {
            // Working copies start from the template every run so the draw
            // order never depends on a previous run's re-sort.
            self.chart_hits[k].clone_from(&self.hit_templates[k]);
            self.judge.judge_chart(
                &mut self.rng,
                &mut self.charts[k].notes,
                &mut self.chart_hits[k],
            );
        }
    }

    fn start_skill_triggers(&mut self) {
        for i in 0..self.cards.len() {
            if self.cards[i].skill.is_some() {
                self.skill_set_next_trigger(i);
            }
        }
    }

    fn init_next_song(&mut self) {
        self.time = 0.0;
        self.hit_index = 0;
        debug_assert_eq!(self.judge_count, 0);
        for i in 0..self.cards.len() {
            let Some(skill) = &self.cards[i].skill else { continue };
            let trigger = skill.trigger;
            let chain_len = skill.chain_targets.len();
            debug_assert!(!self.live_cards[i].is_active);
            match trigger {
                SkillTrigger::Time => {
                    self.live_cards[i].next_trigger = 0;
                    self.skill_set_next_trigger(i);
                }
                SkillTrigger::NotesCount | SkillTrigger::ComboCount => {
                    self.skill_set_next_trigger(i);
                }
                SkillTrigger::Chain => {
                    let live = &mut self.live_cards[i];
                    live.remaining_chain = chain_len;
                    live.chain_status.fill(true);
                }
                _ => {}
            }
        }
        for i in 0..self.cards.len() {
            if self.cards[i].skill.as_ref().map(|s| s.effect) == Some(SkillEffect::Mimic) {
                self.live_cards[i].mimic_source = None;
                self.live_cards[i].mimic_level = 0;
            }
        }
        self.mimic_stack.reset();
    }

    /// Merge-drive one chart: repeatedly process the earlier of the next
    /// unprocessed hit and the top of the skill event queue. Hits win ties.
    fn run_chart(&mut self) {
        loop {
            let next_hit = self.chart_hits[self.chart_index].get(self.hit_index).copied();
            match next_hit {
                Some(hit)
                    if self.skill_events.peek().map_or(true, |e| !(e.time < hit.time)) =>
                {
                    self.process_hit(hit);
                }
                _ => {
                    let Some(event) = self.skill_events.pop() else { break };
                    self.time = event.time;
                    let card = event.id.card();
                    match event.kind {
                        SkillEventKind::On => self.skill_trigger(card),
                        SkillEventKind::NextTrigger => {
                            self.live_cards[card].is_active = false;
                            self.skill_set_next_trigger(card);
                        }
                        SkillEventKind::Off => self.skill_off(card),
                    }
                }
            }
        }
    }

    fn process_hit(&mut self, hit: Hit) {
        self.time = hit.time;
        let is_perfect = hit.is_perfect || self.judge_count > 0;
        let k = self.chart_index;
        if hit.is_hold_begin {
            // Holds touch combo and score only at their release.
            self.charts[k].notes[hit.note_index].is_hold_begin_perfect = is_perfect;
            self.hit_index += 1;
            return;
        }

        self.combo += 1;
        self.combo_tier = advance_combo_tier(self.combo_tier, self.combo);

        let (is_bomb, is_hold, hold_begin_perfect, card_index, note_attribute) = {
            let note = &self.charts[k].notes[hit.note_index];
            (note.is_bomb, note.is_hold, note.is_hold_begin_perfect, note.card_index, note.attribute)
        };

        if is_perfect && (!hit.is_hold_end || hold_begin_perfect) {
            self.perfect += 1;
            while let Some(&top) = self.perfect_triggers.peek() {
                if self.perfect < top.value {
                    break;
                }
                self.perfect_triggers.pop();
                self.skill_events.push(SkillEvent {
                    time: self.time,
                    kind: SkillEventKind::On,
                    id: top.id,
                });
            }
            if is_bomb {
                self.star_perfect += 1;
                while let Some(&top) = self.star_perfect_triggers.peek() {
                    if self.star_perfect < top.value {
                        break;
                    }
                    self.star_perfect_triggers.pop();
                    self.skill_events.push(SkillEvent {
                        time: self.time,
                        kind: SkillEventKind::On,
                        id: top.id,
                    });
                }
            }
        }

        let card = &self.cards[card_index];
        self.score += note_score(&NoteScoreInput {
            status: self.status,
            is_perfect,
            combo_multiplier: combo_multiplier(self.combo_tier),
            perfect_bonus_ratio: self.perfect_ratio_mul,
            perfect_bonus_fixed: self.perfect_fixed_sum,
            member_match: card.member_category == self.charts[k].member_category,
            is_hold,
            hold_begin_perfect,
            is_slide: hit.is_slide,
            attribute_match: card.attribute == note_attribute,
            score_rate: self.charts[k].score_rate,
        });
        while let Some(&top) = self.score_triggers.peek() {
            if self.score < top.value as f64 {
                break;
            }
            self.score_triggers.pop();
            self.skill_events.push(SkillEvent {
                time: self.time,
                kind: SkillEventKind::On,
                id: top.id,
            });
        }

        self.hit_index += 1;
    }

    // ------------------------------------------------------------------
    // Shared internal accessors
    // ------------------------------------------------------------------

    /// Skill of a card that is known to carry one. Reaching this for a
    /// skill-less card means the scheduler enqueued a bogus event.
    pub(crate) fn skill(&self, idx: usize) -> &SkillDefinition {
        match &self.cards[idx].skill {
            Some(skill) => skill,
            None => unreachable!("skill event for card {} without a skill", idx),
        }
    }

    pub(crate) fn event_id(&self, idx: usize) -> SkillId {
        SkillId { order: self.live_cards[idx].order, index: idx as u32 }
    }

    pub(crate) fn push_ratio_bonus(&mut self, value: f64) {
        self.perfect_ratio_queue.push_back(value);
        self.perfect_ratio_mul = self.perfect_ratio_queue.iter().product();
    }

    pub(crate) fn pop_ratio_bonus(&mut self) {
        self.perfect_ratio_queue.pop_front();
        self.perfect_ratio_mul = self.perfect_ratio_queue.iter().product();
    }

    pub(crate) fn push_fixed_bonus(&mut self, value: f64) {
        self.perfect_fixed_queue.push_back(value);
        self.perfect_fixed_sum = self.perfect_fixed_queue.iter().sum();
    }

    pub(crate) fn pop_fixed_bonus(&mut self) {
        self.perfect_fixed_queue.pop_front();
        self.perfect_fixed_sum = self.perfect_fixed_queue.iter().sum();
    }
}

fn validate_skill(card: usize, skill: &SkillDefinition, card_count: usize) -> Result<()> {
    if skill.level == 0 || skill.level > skill.levels.len() {
        return Err(LiveError::InvalidSkillLevel {
            card,
            level: skill.level,
            max_level: skill.levels.len(),
        });
    }
    if skill.effect.is_unsupported() {
        return Err(LiveError::UnsupportedSkillEffect { card, effect: skill.effect });
    }
    if matches!(skill.effect, SkillEffect::SyncStatus | SkillEffect::GainStatus) {
        if skill.effect_targets.is_empty() {
            return Err(LiveError::MissingEffectTargets { card, effect: skill.effect });
        }
        for &target in &skill.effect_targets {
            if target >= card_count {
                return Err(LiveError::InvalidEffectTarget { card, target, card_count });
            }
        }
    }
    if skill.trigger == SkillTrigger::Chain && skill.chain_targets.is_empty() {
        return Err(LiveError::MissingChainTargets { card });
    }
    let counter_trigger = matches!(
        skill.trigger,
        SkillTrigger::Time
            | SkillTrigger::NotesCount
            | SkillTrigger::ComboCount
            | SkillTrigger::Score
            | SkillTrigger::PerfectCount
            | SkillTrigger::StarPerfect
    );
    if counter_trigger {
        let value = skill.level_data().trigger_value;
        if value <= 0 {
            return Err(LiveError::InvalidTriggerValue { card, value });
        }
    }
    Ok(())
}

fn validate_skill_order(order: &[usize], card_count: usize) -> Result<Vec<u32>> {
    if order.len() != card_count {
        return Err(LiveError::InvalidSkillOrder {
            reason: format!("length {} does not match card count {}", order.len(), card_count),
        });
    }
    let mut seen = vec![false; card_count];
    for &tag in order {
        if tag >= card_count {
            return Err(LiveError::InvalidSkillOrder {
                reason: format!("entry {} out of range", tag),
            });
        }
        if seen[tag] {
            return Err(LiveError::InvalidSkillOrder {
                reason: format!("duplicate entry {}", tag),
            });
        }
        seen[tag] = true;
    }
    Ok(order.iter().map(|&tag| tag as u32).collect())
}
