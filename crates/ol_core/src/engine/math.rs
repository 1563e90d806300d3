//! Small self-contained math helpers.
//!
//! The standard library has no complementary error function, so the judging
//! rate derivation carries its own, like other score calculators in this
//! space do.

/// Complementary error function.
///
/// Chebyshev-fitted rational approximation; relative error below 1.3e-7
/// everywhere, orders of magnitude inside the tolerance of the judging-rate
/// derivation it feeds.
pub fn erfc(x: f64) -> f64 {
    let z = x.abs();
    let t = 1.0 / (1.0 + 0.5 * z);
    let poly = -1.26551223
        + t * (1.00002368
            + t * (0.37409196
                + t * (0.09678418
                    + t * (-0.18628806
                        + t * (0.27886807
                            + t * (-1.13520398
                                + t * (1.48851587
                                    + t * (-0.82215223 + t * 0.17087277))))))));
    let ans = t * (-z * z + poly).exp();
    if x >= 0.0 {
        ans
    } else {
        2.0 - ans
    }
}
