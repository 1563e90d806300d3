//! Deterministic RNG and distributions for the simulation core.
//!
//! Everything here is self-implemented because the engine's results must
//! replay bit-for-bit for a given `(run_id, seed)` on every platform, and
//! library distribution algorithms are implementation-defined. The generator
//! is the PCG-32 permuted congruential generator (64-bit LCG state, XSH-RR
//! output), which the reference system uses and which supports O(log n)
//! stream seeking. Not cryptographically secure; never use it for secrets.

use once_cell::sync::Lazy;
use rand::{Error, RngCore, SeedableRng};

// ============================================================================
// PCG-32
// ============================================================================

const PCG_MULT: u64 = 6364136223846793005;
const PCG_INC: u64 = 1442695040888963407;

/// PCG-32 with the default stream.
///
/// Implements [`rand::RngCore`]/[`rand::SeedableRng`], so it composes with
/// the `rand` ecosystem; the simulation itself only relies on the methods
/// defined here plus `next_u32`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pcg32 {
    state: u64,
}

impl Pcg32 {
    pub fn new(seed: u64) -> Self {
        let mut rng = Self { state: 0 };
        rng.reseed(seed);
        rng
    }

    /// Re-seed in place, identical to constructing a fresh generator.
    pub fn reseed(&mut self, seed: u64) {
        self.state = 0;
        self.step();
        self.state = self.state.wrapping_add(seed);
        self.step();
    }

    #[inline]
    fn step(&mut self) {
        self.state = self.state.wrapping_mul(PCG_MULT).wrapping_add(PCG_INC);
    }

    /// Jump the stream forward by `delta` draws in O(log delta), via
    /// Brown's LCG jump-ahead.
    pub fn advance(&mut self, mut delta: u64) {
        let mut acc_mult: u64 = 1;
        let mut acc_plus: u64 = 0;
        let mut cur_mult = PCG_MULT;
        let mut cur_plus = PCG_INC;
        while delta > 0 {
            if delta & 1 == 1 {
                acc_mult = acc_mult.wrapping_mul(cur_mult);
                acc_plus = acc_plus.wrapping_mul(cur_mult).wrapping_add(cur_plus);
            }
            cur_plus = cur_mult.wrapping_add(1).wrapping_mul(cur_plus);
            cur_mult = cur_mult.wrapping_mul(cur_mult);
            delta >>= 1;
        }
        self.state = self.state.wrapping_mul(acc_mult).wrapping_add(acc_plus);
    }

    /// Uniform value in `[0, bound)` by threshold rejection, so the result is
    /// exactly uniform and matches the reference generator draw for draw.
    #[inline]
    pub fn below(&mut self, bound: u32) -> u32 {
        debug_assert!(bound > 0);
        let threshold = bound.wrapping_neg() % bound;
        loop {
            let r = self.next_u32();
            if r >= threshold {
                return r % bound;
            }
        }
    }
}

impl RngCore for Pcg32 {
    #[inline]
    fn next_u32(&mut self) -> u32 {
        let old = self.state;
        self.step();
        let xorshifted = (((old >> 18) ^ old) >> 27) as u32;
        let rot = (old >> 59) as u32;
        xorshifted.rotate_right(rot)
    }

    #[inline]
    fn next_u64(&mut self) -> u64 {
        let low = self.next_u32() as u64;
        let high = self.next_u32() as u64;
        low | (high << 32)
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        let mut chunks = dest.chunks_exact_mut(4);
        for chunk in &mut chunks {
            chunk.copy_from_slice(&self.next_u32().to_le_bytes());
        }
        let rem = chunks.into_remainder();
        if !rem.is_empty() {
            let bytes = self.next_u32().to_le_bytes();
            rem.copy_from_slice(&bytes[..rem.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

impl SeedableRng for Pcg32 {
    type Seed = [u8; 8];

    fn from_seed(seed: Self::Seed) -> Self {
        Self::new(u64::from_le_bytes(seed))
    }

    fn seed_from_u64(state: u64) -> Self {
        Self::new(state)
    }
}

// ============================================================================
// Fast Bernoulli
// ============================================================================

/// Bernoulli sampler over a 32-bit fixed-point threshold.
///
/// The probability is quantized once to `round(p * u32::MAX)`; a draw of
/// exactly zero is discarded and resampled, which removes the false positive
/// the `u <= threshold` comparison would otherwise produce at raw zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FastBernoulli {
    threshold: u32,
}

impl FastBernoulli {
    pub fn new(p: f64) -> Self {
        debug_assert!((0.0..=1.0).contains(&p), "probability out of range: {}", p);
        Self { threshold: (p * u32::MAX as f64).round_ties_even() as u32 }
    }

    /// The quantized probability actually sampled.
    pub fn p(&self) -> f64 {
        self.threshold as f64 / u32::MAX as f64
    }

    #[inline]
    pub fn sample(&self, rng: &mut Pcg32) -> bool {
        loop {
            let u = rng.next_u32();
            if u != 0 {
                return u <= self.threshold;
            }
        }
    }
}

// ============================================================================
// Ziggurat normal
// ============================================================================

const ZIG_LOG2_N: u32 = 7;
const ZIG_N: usize = 1 << ZIG_LOG2_N;
const ZIG_INDEX_MASK: u32 = (ZIG_N - 1) as u32;
const ZIG_VALUE_MASK: u32 = !ZIG_INDEX_MASK;
const ZIG_VALUE_OFFSET: u32 = 1 << (ZIG_LOG2_N - 1);
const ZIG_TAIL_X: f64 = 3.442_619_855_896_652;
const ZIG_PSEUDO_X: f64 = 3.713_086_246_740_363;
const ZIG_AREA: f64 = 0.009_912_563_035_336_461;

const Y_SCALE: f64 = 1.0 / (u32::MAX as f64 + 1.0);
const X_SCALE: f64 = 2.0 / (u32::MAX as f64 + 1.0);

struct ZigTables {
    y: [f64; ZIG_N + 1],
    scale: [f64; ZIG_N],
    thres: [u32; ZIG_N],
}

static ZIG_TABLES: Lazy<ZigTables> = Lazy::new(|| {
    const QUANT: f64 = (u32::MAX as f64 + 1.0) * 0.5;
    const SCALE: f64 = 1.0 / QUANT;
    let mut tables =
        ZigTables { y: [0.0; ZIG_N + 1], scale: [0.0; ZIG_N], thres: [0; ZIG_N] };
    let mut y = 0.0;
    let mut x = ZIG_PSEUDO_X;
    for i in 0..ZIG_N {
        let old_x = x;
        y += ZIG_AREA / old_x;
        tables.y[i + 1] = y;
        tables.scale[i] = old_x * SCALE;
        if i + 1 < ZIG_N {
            x = (-2.0 * y.ln()).sqrt();
            tables.thres[i] = (x / old_x * QUANT).round_ties_even() as u32;
        } else {
            tables.thres[i] = 0;
        }
    }
    tables
});

/// Normal sampler using the Ziggurat layer-rejection method over the shared
/// precomputed tables. Roughly one 32-bit draw per sample on the fast path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZigguratNormal {
    mean: f64,
    stddev: f64,
}

impl ZigguratNormal {
    pub fn new(mean: f64, stddev: f64) -> Self {
        debug_assert!(stddev > 0.0, "stddev must be positive: {}", stddev);
        Self { mean, stddev }
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    pub fn stddev(&self) -> f64 {
        self.stddev
    }

    #[inline]
    pub fn sample(&self, rng: &mut Pcg32) -> f64 {
        self.sample_standard(rng) * self.stddev + self.mean
    }

    fn sample_standard(&self, rng: &mut Pcg32) -> f64 {
        let tables = &*ZIG_TABLES;
        loop {
            let r = rng.next_u32();
            let index = (r & ZIG_INDEX_MASK) as usize;
            let uvalue = (r & ZIG_VALUE_MASK) | ZIG_VALUE_OFFSET;
            let value = uvalue as i32;
            if value.unsigned_abs() < tables.thres[index] {
                return value as f64 * tables.scale[index];
            }
            if index > 0 {
                // Layer wedge: accept against the density gap.
                let r2 = rng.next_u32();
                let x = value as f64 * tables.scale[index];
                let y = tables.y[index]
                    + (tables.y[index + 1] - tables.y[index]) * ((r2 as f64 + 0.5) * Y_SCALE);
                if y < (-0.5 * x * x).exp() {
                    return x;
                }
            } else {
                // Tail rejection beyond the last layer.
                const REV_TAIL_X: f64 = 1.0 / ZIG_TAIL_X;
                loop {
                    let r2 = rng.next_u32();
                    let r3 = rng.next_u32() as i32;
                    let py = -((r2 as f64 + 0.5) * Y_SCALE).ln();
                    let dx = -((r3 as f64 + 0.5).abs() * X_SCALE).ln() * REV_TAIL_X;
                    if py > 0.5 * dx * dx {
                        return if r3 >= 0 { dx + ZIG_TAIL_X } else { -(dx + ZIG_TAIL_X) };
                    }
                }
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
