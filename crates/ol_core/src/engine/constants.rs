//! Fixed gameplay constants shared across the engine.

/// Judging timing constants, in seconds.
pub mod timing {
    /// One display frame; the forced re-arm delay and the minimum gap between
    /// a hold press and its release.
    pub const FRAME_TIME: f64 = 0.016;

    pub const PERFECT_WINDOW: f64 = 0.032;
    pub const GREAT_WINDOW: f64 = 0.080;
    pub const GOOD_WINDOW: f64 = 0.128;
}

/// Combo score multiplier tiers.
///
/// A tier applies while the combo has not yet exceeded its bound: combo 50
/// still pays 1.0, combo 51 pays 1.1.
pub const COMBO_MUL: [(i64, f64); 7] = [
    (50, 1.0),
    (100, 1.1),
    (200, 1.15),
    (400, 1.2),
    (600, 1.25),
    (800, 1.3),
    (i64::MAX, 1.35),
];

/// Per-run RNG stream stride. Large and odd so distinct run ids land on
/// non-overlapping stream offsets.
pub const RUN_STRIDE: u64 = 0x9E3779B97F4A7C15;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combo_mul_is_sorted_and_non_decreasing() {
        for pair in COMBO_MUL.windows(2) {
            assert!(pair[0].0 < pair[1].0, "bounds must ascend: {:?}", pair);
            assert!(pair[0].1 <= pair[1].1, "factors must not decrease: {:?}", pair);
        }
        assert_eq!(COMBO_MUL.last().unwrap().0, i64::MAX);
    }

    #[test]
    fn test_run_stride_is_odd() {
        assert_eq!(RUN_STRIDE & 1, 1);
    }
}
