//! Probabilistic hit judging.
//!
//! Two modes, fixed at configuration time. The approximate mode prices each
//! hit category once as a "great or worse" Bernoulli rate from the normal
//! error model and draws one bit per hit. The accurate mode samples a signed
//! timing error per hit, clamps it to the relevant window, and re-sorts the
//! hit stream because the perturbed times can change the processing order.

use std::f64::consts::FRAC_1_SQRT_2;

use super::constants::timing::{FRAME_TIME, GOOD_WINDOW, GREAT_WINDOW, PERFECT_WINDOW};
use super::live::state::{Hit, LiveNote};
use super::math::erfc;
use super::rng::{FastBernoulli, Pcg32, ZigguratNormal};
use crate::error::{LiveError, Result};
use crate::models::{JudgeConfig, LiveSettings, TimingSigmas};

/// Probability that a hit with the given timing window and error model lands
/// outside the window (great or worse). With a systematic mean offset the
/// two window edges are priced separately.
pub fn great_rate(window: f64, sigma: f64, mean: f64) -> f64 {
    let rate = if mean == 0.0 {
        erfc(window / sigma * FRAC_1_SQRT_2)
    } else {
        0.5 * (erfc((window - mean) / sigma * FRAC_1_SQRT_2)
            + erfc((window + mean) / sigma * FRAC_1_SQRT_2))
    };
    rate.min(1.0)
}

/// Compiled judging parameters for one live.
#[derive(Debug, Clone)]
pub(crate) enum JudgeParams {
    Rate {
        hit: FastBernoulli,
        hold_begin: FastBernoulli,
        hold_end: FastBernoulli,
        slide: FastBernoulli,
        slide_hold_end: FastBernoulli,
    },
    Timing {
        hit: ZigguratNormal,
        hold_begin: ZigguratNormal,
        hold_end: ZigguratNormal,
        slide: ZigguratNormal,
        judge_offset: f64,
    },
}

fn check_sigmas(sigma: &TimingSigmas) -> Result<()> {
    for (name, value) in [
        ("hit", sigma.hit),
        ("hold_begin", sigma.hold_begin),
        ("hold_end", sigma.hold_end),
        ("slide", sigma.slide),
    ] {
        if !(value > 0.0) {
            return Err(LiveError::InvalidJudgeConfig {
                reason: format!("sigma.{} must be positive, got {}", name, value),
            });
        }
    }
    Ok(())
}

fn check_rate(name: &str, value: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(LiveError::InvalidJudgeConfig {
            reason: format!("rate.{} must be in [0, 1], got {}", name, value),
        });
    }
    Ok(())
}

impl JudgeParams {
    pub fn derive(settings: &LiveSettings) -> Result<Self> {
        match settings.judge {
            JudgeConfig::Approximate { rates } => {
                check_rate("hit", rates.hit)?;
                check_rate("hold_begin", rates.hold_begin)?;
                check_rate("hold_end", rates.hold_end)?;
                check_rate("slide", rates.slide)?;
                check_rate("slide_hold_end", rates.slide_hold_end)?;
                Ok(JudgeParams::Rate {
                    hit: FastBernoulli::new(rates.hit),
                    hold_begin: FastBernoulli::new(rates.hold_begin),
                    hold_end: FastBernoulli::new(rates.hold_end),
                    slide: FastBernoulli::new(rates.slide),
                    slide_hold_end: FastBernoulli::new(rates.slide_hold_end),
                })
            }
            JudgeConfig::ApproximateFromSigma { sigma, mean } => {
                check_sigmas(&sigma)?;
                Ok(JudgeParams::Rate {
                    hit: FastBernoulli::new(great_rate(PERFECT_WINDOW, sigma.hit, mean)),
                    hold_begin: FastBernoulli::new(great_rate(
                        PERFECT_WINDOW,
                        sigma.hold_begin,
                        mean,
                    )),
                    hold_end: FastBernoulli::new(great_rate(PERFECT_WINDOW, sigma.hold_end, mean)),
                    slide: FastBernoulli::new(great_rate(GREAT_WINDOW, sigma.slide, mean)),
                    slide_hold_end: FastBernoulli::new(great_rate(
                        GREAT_WINDOW,
                        sigma.hold_end,
                        mean,
                    )),
                })
            }
            JudgeConfig::TimingError { sigma } => {
                check_sigmas(&sigma)?;
                Ok(JudgeParams::Timing {
                    hit: ZigguratNormal::new(0.0, sigma.hit),
                    hold_begin: ZigguratNormal::new(0.0, sigma.hold_begin),
                    hold_end: ZigguratNormal::new(0.0, sigma.hold_end),
                    slide: ZigguratNormal::new(0.0, sigma.slide),
                    judge_offset: settings.judge_offset,
                })
            }
        }
    }

    /// Judge one chart's hit stream in place. In timing mode the hits come
    /// out re-sorted by their perturbed times.
    pub fn judge_chart(&self, rng: &mut Pcg32, notes: &mut [LiveNote], hits: &mut [Hit]) {
        match self {
            JudgeParams::Rate { hit, hold_begin, hold_end, slide, slide_hold_end } => {
                for h in hits.iter_mut() {
                    let sampler = if h.is_slide {
                        if h.is_hold_end {
                            slide_hold_end
                        } else {
                            slide
                        }
                    } else if h.is_hold_begin {
                        hold_begin
                    } else if h.is_hold_end {
                        hold_end
                    } else {
                        hit
                    };
                    h.is_perfect = !sampler.sample(rng);
                    if h.is_hold_begin {
                        notes[h.note_index].is_hold_begin_perfect = h.is_perfect;
                    }
                }
            }
            JudgeParams::Timing { hit, hold_begin, hold_end, slide, judge_offset } => {
                for h in hits.iter_mut() {
                    let note = &mut notes[h.note_index];
                    let note_time = if h.is_hold_end { note.hold_end_time } else { note.time };
                    let judge_time = note_time + judge_offset;
                    let mut e = if h.is_hold_end {
                        hold_end.sample(rng)
                    } else if h.is_slide {
                        slide.sample(rng)
                    } else if h.is_hold_begin {
                        hold_begin.sample(rng)
                    } else {
                        hit.sample(rng)
                    };
                    if h.is_slide {
                        if !(e.abs() < GOOD_WINDOW) {
                            e = GOOD_WINDOW.copysign(e);
                        }
                    } else if !(e.abs() < GREAT_WINDOW) {
                        e = GREAT_WINDOW.copysign(e);
                    }
                    if h.is_hold_end {
                        // A release cannot resolve before one frame after its press.
                        let min_e = note.hold_begin_hit_time + FRAME_TIME - judge_time;
                        if e < min_e {
                            e = min_e;
                        }
                    }
                    h.time = judge_time + e;
                    h.is_perfect = if h.is_slide {
                        e.abs() < GREAT_WINDOW
                    } else {
                        e.abs() < PERFECT_WINDOW
                    };
                    if h.is_hold_begin {
                        note.is_hold_begin_perfect = h.is_perfect;
                        note.hold_begin_hit_time = h.time;
                    }
                }
                hits.sort_by(|a, b| a.time.total_cmp(&b.time));
            }
        }
    }
}
