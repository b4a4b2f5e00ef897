//! Multiple-testing adjustment.
//!
//! Benjamini-Hochberg over the genes that survive an independent filter on the mean of
//! normalised counts. The filter threshold is the quantile of `base_mean` that maximises the
//! number of rejections at the target false discovery rate.

/// Number of candidate filter quantiles.
const FILTER_STEPS: usize = 50;
const MAX_FILTER_QUANTILE: f64 = 0.95;
const SMOOTHING_WINDOW: usize = 5;
/// Below this many rejections the filter is not applied.
const MIN_REJECTIONS: usize = 10;

/// Benjamini-Hochberg adjusted p-values, in input order.
pub fn benjamini_hochberg(p_values: &[f64]) -> Vec<f64> {
    let n = p_values.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| p_values[a].total_cmp(&p_values[b]));

    let mut adjusted = vec![0.0; n];
    let mut running = f64::INFINITY;
    for (rank, &i) in order.iter().enumerate().rev() {
        let adj = (p_values[i] * n as f64 / (rank + 1) as f64).min(1.0);
        running = running.min(adj);
        adjusted[i] = running;
    }
    adjusted
}

/// Sample quantile with linear interpolation between order statistics.
pub fn quantile(sorted: &[f64], prob: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let h = (sorted.len() - 1) as f64 * prob.clamp(0.0, 1.0);
    let lo = h.floor() as usize;
    let hi = h.ceil() as usize;
    sorted[lo] + (h - lo as f64) * (sorted[hi] - sorted[lo])
}

/// Centred moving average; the window shrinks at the ends.
fn smooth(values: &[f64], window: usize) -> Vec<f64> {
    let half = window / 2;
    (0..values.len())
        .map(|i| {
            let lo = i.saturating_sub(half);
            let hi = (i + half + 1).min(values.len());
            values[lo..hi].iter().sum::<f64>() / (hi - lo) as f64
        })
        .collect()
}

/// Outcome of [`independent_filtering`].
#[derive(Debug, Clone, PartialEq)]
pub struct FilterResult {
    /// `None` for genes removed by the filter or without a p-value.
    pub p_adjusted: Vec<Option<f64>>,
    /// `base_mean` threshold; genes at or above it are tested.
    pub threshold: f64,
    /// Fraction of genes below the threshold.
    pub filter_quantile: f64,
}

pub(crate) fn adjust_above(base_means: &[f64], p_values: &[Option<f64>], cutoff: f64) -> Vec<Option<f64>> {
    let tested: Vec<usize> = (0..p_values.len())
        .filter(|&i| base_means[i] >= cutoff && p_values[i].is_some())
        .collect();
    let raw: Vec<f64> = tested.iter().filter_map(|&i| p_values[i]).collect();

    let mut out = vec![None; p_values.len()];
    for (&i, adj) in tested.iter().zip(benjamini_hochberg(&raw)) {
        out[i] = Some(adj);
    }
    out
}

///
/// Choose a `base_mean` filter and adjust the surviving p-values.
///
/// Candidate filters are evenly spaced quantiles of `base_mean` from the fraction of genes
/// with a zero mean up to 0.95. The number of rejections at `alpha` is smoothed over the
/// candidates, and the first candidate within one residual standard deviation of the maximum
/// is chosen. When no candidate reaches more than ten rejections nothing is filtered.
///
pub fn independent_filtering(
    base_means: &[f64],
    p_values: &[Option<f64>],
    alpha: f64,
) -> FilterResult {
    let no_filter = || FilterResult {
        p_adjusted: adjust_above(base_means, p_values, f64::NEG_INFINITY),
        threshold: 0.0,
        filter_quantile: 0.0,
    };
    if base_means.is_empty() {
        return no_filter();
    }

    let mut sorted = base_means.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let zero_fraction =
        base_means.iter().filter(|&&m| m == 0.0).count() as f64 / base_means.len() as f64;
    let lower = zero_fraction.min(MAX_FILTER_QUANTILE);

    let thetas: Vec<f64> = (0..FILTER_STEPS)
        .map(|k| lower + (MAX_FILTER_QUANTILE - lower) * k as f64 / (FILTER_STEPS - 1) as f64)
        .collect();
    let cutoffs: Vec<f64> = thetas.iter().map(|&t| quantile(&sorted, t)).collect();
    let adjusted: Vec<Vec<Option<f64>>> = cutoffs
        .iter()
        .map(|&c| adjust_above(base_means, p_values, c))
        .collect();
    let rejections: Vec<f64> = adjusted
        .iter()
        .map(|adj| adj.iter().flatten().filter(|&&p| p < alpha).count() as f64)
        .collect();

    if rejections.iter().all(|&r| r <= MIN_REJECTIONS as f64) {
        log::info!("independent filtering: too few rejections, no filter applied");
        return no_filter();
    }

    let fitted = smooth(&rejections, SMOOTHING_WINDOW);
    let max_fit = fitted.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let rmse = (rejections
        .iter()
        .zip(&fitted)
        .map(|(r, f)| (r - f).powi(2))
        .sum::<f64>()
        / rejections.len() as f64)
        .sqrt();
    let chosen = rejections
        .iter()
        .position(|&r| r > max_fit - rmse)
        .unwrap_or(0);

    log::info!(
        "independent filtering: base_mean >= {:.3} (quantile {:.2}), {} rejections at alpha {alpha}",
        cutoffs[chosen],
        thetas[chosen],
        rejections[chosen]
    );

    FilterResult {
        p_adjusted: adjusted.into_iter().nth(chosen).unwrap_or_default(),
        threshold: cutoffs[chosen],
        filter_quantile: thetas[chosen],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[rstest]
    fn test_bh_known_values() {
        let adj = benjamini_hochberg(&[0.01, 0.04, 0.03, 0.2]);
        // 0.03 * 4 / 2 = 0.06 is capped by 0.04 * 4 / 3
        let expected = [0.04, 0.04 * 4.0 / 3.0, 0.04 * 4.0 / 3.0, 0.2];
        for (a, e) in adj.iter().zip(expected) {
            assert!((a - e).abs() < 1e-12, "{adj:?}");
        }
    }

    #[rstest]
    fn test_bh_is_not_below_raw() {
        let p = [0.5, 0.001, 0.02, 0.9, 0.04, 0.3];
        for (raw, adj) in p.iter().zip(benjamini_hochberg(&p)) {
            assert!(adj >= *raw && adj <= 1.0);
        }
    }

    #[rstest]
    #[case(0.0, 1.0)]
    #[case(1.0, 5.0)]
    #[case(0.5, 3.0)]
    #[case(0.1, 1.4)]
    fn test_quantile(#[case] prob: f64, #[case] expected: f64) {
        let sorted = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert!((quantile(&sorted, prob) - expected).abs() < 1e-12);
    }

    #[rstest]
    fn test_smooth_edges() {
        assert_eq!(smooth(&[0.0, 3.0, 6.0], 5), vec![3.0, 3.0, 3.0]);
    }

    #[rstest]
    fn test_few_rejections_means_no_filter() {
        let means = [1.0, 2.0, 3.0, 4.0];
        let p = [Some(0.5), None, Some(0.01), Some(0.2)];
        let res = independent_filtering(&means, &p, 0.1);
        assert_eq!(res.threshold, 0.0);
        assert_eq!(res.p_adjusted[1], None);
        assert!(res.p_adjusted.iter().filter(|p| p.is_some()).count() == 3);
    }

    #[rstest]
    fn test_filter_removes_noisy_low_counts() {
        // 40 genes at p = 0.02 survive BH only when fewer than 200 genes are tested
        let mut means = Vec::new();
        let mut p = Vec::new();
        for i in 0..200 {
            means.push(1.0 + i as f64 * 0.01);
            p.push(Some(0.2 + (i % 10) as f64 * 0.08));
        }
        for i in 0..40 {
            means.push(100.0 + i as f64);
            p.push(Some(0.02));
        }
        let res = independent_filtering(&means, &p, 0.1);
        assert!(res.threshold > 1.0);
        assert!(res.p_adjusted[0].is_none());
        assert!(res.p_adjusted[239].is_some());
        for (raw, adj) in p.iter().zip(res.p_adjusted.iter()) {
            if let (Some(raw), Some(adj)) = (raw, adj) {
                assert!(adj >= raw);
            }
        }
    }
}
