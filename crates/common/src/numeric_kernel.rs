use std::f64;

/// Logistic function `1 / (1 + e^-x)`.
pub fn sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        // Rewritten so that exp() never overflows for large negative inputs.
        let e = x.exp();
        e / (1.0 + e)
    }
}

/// Numerically stable `ln(1 + e^x)`.
pub fn log1p_exp(x: f64) -> f64 {
    if x > 35.0 {
        x
    } else if x < -35.0 {
        x.exp()
    } else {
        x.exp().ln_1p()
    }
}

/// `ln(Σ e^v)` over `values`; `-inf` entries contribute zero mass.
///
/// Returns `-inf` when every entry is `-inf` or the slice is empty.
pub fn log_sum_exp(values: &[f64]) -> f64 {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return max;
    }
    let sum: f64 = values.iter().map(|v| (v - max).exp()).sum();
    max + sum.ln()
}

/// Median of `values`, `None` for an empty slice. The slice is sorted in place.
pub fn median(values: &mut [f64]) -> Option<f64> {
    let n = values.len();
    if n == 0 {
        return None;
    }
    values.sort_by(f64::total_cmp);
    if n % 2 == 0 {
        Some((values[n / 2] + values[n / 2 - 1]) / 2.0)
    } else {
        Some(values[n / 2])
    }
}

/// Pearson correlation of paired observations, skipping pairs where either side is NaN.
///
/// Returns `None` when fewer than three usable pairs remain, when any of the running
/// sums is exactly zero, or when the denominator vanishes.
pub fn pearson<I>(pairs: I) -> Option<f64>
where
    I: IntoIterator<Item = (f64, f64)>,
{
    let (mut ex, mut ey, mut exx, mut eyy, mut exy) = (0.0, 0.0, 0.0, 0.0, 0.0);
    let mut n = 0.0;

    for (x, y) in pairs {
        if x.is_nan() || y.is_nan() {
            continue;
        }
        ex += x;
        ey += y;
        exx += x * x;
        eyy += y * y;
        exy += x * y;
        n += 1.0;
    }

    if n <= 2.0 || ex == 0.0 || ey == 0.0 || exx == 0.0 || eyy == 0.0 || exy == 0.0 {
        return None;
    }

    let denominator = ((n * exx - ex * ex) * (n * eyy - ey * ey)).sqrt();
    if denominator == 0.0 || !denominator.is_finite() {
        return None;
    }
    Some((n * exy - ex * ey) / denominator)
}

#[cfg(test)]
mod numerical_kernel_tests {
    use super::*;

    const TOL: f64 = 1e-12;

    fn assert_approx_eq(a: f64, b: f64) {
        assert!((a - b).abs() < TOL, "{} is not approximately equal to {}", a, b);
    }

    #[test]
    fn sigmoid_is_symmetric_and_bounded() {
        assert_approx_eq(sigmoid(0.0), 0.5);
        assert_approx_eq(sigmoid(2.0) + sigmoid(-2.0), 1.0);
        assert!(sigmoid(-800.0) >= 0.0);
        assert!(sigmoid(800.0) <= 1.0);
    }

    #[test]
    fn log1p_exp_matches_naive_in_safe_range() {
        for x in [-5.0, -0.3, 0.0, 1.7, 10.0] {
            assert!((log1p_exp(x) - (1.0 + f64::exp(x)).ln()).abs() < 1e-10);
        }
        // Naive form overflows here.
        assert_approx_eq(log1p_exp(1000.0), 1000.0);
    }

    #[test]
    fn log_sum_exp_handles_negative_infinity() {
        let v = [f64::NEG_INFINITY, 0.0_f64.ln(), 1.0_f64.ln()];
        assert_approx_eq(log_sum_exp(&v), 0.0);
        assert_eq!(log_sum_exp(&[f64::NEG_INFINITY; 3]), f64::NEG_INFINITY);
        assert_eq!(log_sum_exp(&[]), f64::NEG_INFINITY);
    }

    #[test]
    fn log_sum_exp_is_shift_stable() {
        let big = [1000.0, 1000.0];
        assert_approx_eq(log_sum_exp(&big), 1000.0 + 2.0_f64.ln());
    }

    #[test]
    fn median_even_and_odd() {
        assert_eq!(median(&mut []), None);
        assert_eq!(median(&mut [3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&mut [4.0, 1.0, 3.0, 2.0]), Some(2.5));
    }

    #[test]
    fn pearson_perfect_correlation() {
        let r = pearson([(1.0, 2.0), (2.0, 4.0), (3.0, 6.0), (4.0, 8.0)]).unwrap();
        assert_approx_eq(r, 1.0);

        let r = pearson([(1.0, 8.0), (2.0, 6.0), (3.0, 4.0), (4.0, 2.0)]).unwrap();
        assert_approx_eq(r, -1.0);
    }

    #[test]
    fn pearson_skips_missing_values() {
        let r = pearson([(1.0, 2.0), (f64::NAN, 5.0), (2.0, 4.0), (3.0, 6.0)]).unwrap();
        assert_approx_eq(r, 1.0);
    }

    #[test]
    fn pearson_rejects_short_or_zero_input() {
        assert_eq!(pearson([(1.0, 2.0), (2.0, 3.0)]), None);
        assert_eq!(pearson([(0.0, 2.0), (0.0, 3.0), (0.0, 1.0)]), None);
    }
}
