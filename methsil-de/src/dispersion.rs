//! Negative-binomial dispersion estimates.
//!
//! Three steps: a gene-wise method-of-moments estimate, a mean-dispersion trend fitted across
//! genes, and a shrinkage of every gene-wise estimate towards the trend in log space.

use serde::Serialize;

/// Smallest dispersion an estimate can take.
pub const MIN_DISPERSION: f64 = 1e-8;

const TREND_MAX_ITER: usize = 10;
const TREND_TOLERANCE: f64 = 1e-6;
const MIN_PRIOR_LOG_VARIANCE: f64 = 0.25;
const OUTLIER_SD: f64 = 2.0;

/// Scale making the median absolute deviation consistent with a normal standard deviation.
const MAD_SCALE: f64 = 1.4826;

///
/// Trigamma function, the second derivative of `ln Γ(x)`, for `x > 0`.
///
/// Uses the recurrence `ψ1(x) = ψ1(x + 1) + 1/x²` until `x >= 6`, then the asymptotic series.
///
pub fn trigamma(x: f64) -> f64 {
    if x <= 0.0 || !x.is_finite() {
        return f64::NAN;
    }
    let mut x = x;
    let mut acc = 0.0;
    while x < 6.0 {
        acc += 1.0 / (x * x);
        x += 1.0;
    }
    let inv = 1.0 / x;
    let inv2 = inv * inv;
    acc + inv
        + inv2 / 2.0
        + inv * inv2 * (1.0 / 6.0 - inv2 * (1.0 / 30.0 - inv2 * (1.0 / 42.0 - inv2 / 30.0)))
}

/// Sampling variance of a log dispersion estimate with `df` residual degrees of freedom.
pub fn log_dispersion_sampling_variance(df: f64) -> f64 {
    trigamma(df / 2.0)
}

/// The mean-dispersion relationship across genes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind")]
pub enum DispersionTrend {
    /// `asymptotic + extra_poisson / mean`
    Parametric { asymptotic: f64, extra_poisson: f64 },
    /// Fallback when the parametric fit does not converge to positive coefficients.
    Mean { value: f64 },
}

impl DispersionTrend {
    pub fn at(&self, mean: f64) -> f64 {
        match *self {
            DispersionTrend::Parametric {
                asymptotic,
                extra_poisson,
            } => asymptotic + extra_poisson / mean,
            DispersionTrend::Mean { value } => value,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DispersionFit {
    pub gene_wise: Vec<f64>,
    pub trend: DispersionTrend,
    /// Trend value per gene.
    pub fitted: Vec<f64>,
    /// Dispersion used by the Wald test.
    pub shrunken: Vec<f64>,
    pub prior_log_variance: f64,
}

///
/// Method-of-moments dispersion of one gene.
///
/// The variance is pooled within groups so that a difference between group means does not
/// inflate it; the Poisson part of the variance of normalised counts is `mean * E[1/s]`.
///
/// # Arguments
/// - normalized: normalised counts of the gene, one per sample
/// - groups: sample positions of each group
/// - inv_sf_mean: mean of the reciprocal size factors
/// - max_dispersion: upper bound of the estimate
///
pub fn moments_dispersion(
    normalized: &[f64],
    groups: &[&[usize]],
    inv_sf_mean: f64,
    max_dispersion: f64,
) -> f64 {
    let m = normalized.len();
    let df = m.saturating_sub(groups.len());
    let mean = normalized.iter().sum::<f64>() / m as f64;
    if mean <= 0.0 || df == 0 {
        return MIN_DISPERSION;
    }

    let mut ss = 0.0;
    for members in groups {
        let group_mean =
            members.iter().map(|&j| normalized[j]).sum::<f64>() / members.len() as f64;
        ss += members
            .iter()
            .map(|&j| (normalized[j] - group_mean).powi(2))
            .sum::<f64>();
    }
    let pooled = ss / df as f64;

    ((pooled - inv_sf_mean * mean) / (mean * mean)).clamp(MIN_DISPERSION, max_dispersion)
}

/// Weighted least squares for `y = b0 + b1 * x`.
fn weighted_line(x: &[f64], y: &[f64], w: &[f64]) -> Option<(f64, f64)> {
    let sw: f64 = w.iter().sum();
    let sx: f64 = w.iter().zip(x).map(|(w, x)| w * x).sum();
    let sy: f64 = w.iter().zip(y).map(|(w, y)| w * y).sum();
    let sxx: f64 = w.iter().zip(x).map(|(w, x)| w * x * x).sum();
    let sxy: f64 = w.iter().zip(x).zip(y).map(|((w, x), y)| w * x * y).sum();

    let det = sw * sxx - sx * sx;
    if det.abs() < f64::EPSILON * sw * sxx || !det.is_finite() {
        return None;
    }
    let b1 = (sw * sxy - sx * sy) / det;
    let b0 = (sy - b1 * sx) / sw;
    Some((b0, b1))
}

///
/// Fit `dispersion = a0 + a1 / mean` over the genes in `use_genes`.
///
/// Iterates a gamma-family fit (weighted least squares with weights `1 / fitted²`), each round
/// excluding genes whose estimate is more than 15 times or less than 1e-4 times the current
/// trend. Falls back to [`DispersionTrend::Mean`] when a coefficient turns non-positive or too
/// few genes remain.
///
pub fn fit_trend(means: &[f64], dispersions: &[f64], use_genes: &[usize]) -> DispersionTrend {
    let fallback = || {
        let n = use_genes.len().max(1) as f64;
        let value = use_genes.iter().map(|&i| dispersions[i]).sum::<f64>() / n;
        log::warn!("dispersion trend did not converge, using the mean dispersion {value:.4}");
        DispersionTrend::Mean {
            value: value.max(MIN_DISPERSION),
        }
    };

    let (mut a0, mut a1) = (0.1, 1.0);
    for iter in 0..TREND_MAX_ITER {
        let kept: Vec<usize> = use_genes
            .iter()
            .copied()
            .filter(|&i| {
                let ratio = dispersions[i] / (a0 + a1 / means[i]);
                ratio > 1e-4 && ratio < 15.0
            })
            .collect();
        if kept.len() < 3 {
            return fallback();
        }

        let x: Vec<f64> = kept.iter().map(|&i| 1.0 / means[i]).collect();
        let y: Vec<f64> = kept.iter().map(|&i| dispersions[i]).collect();
        let w: Vec<f64> = x.iter().map(|x| (a0 + a1 * x).powi(-2)).collect();

        let Some((b0, b1)) = weighted_line(&x, &y, &w) else {
            return fallback();
        };
        if b0 <= 0.0 || b1 <= 0.0 {
            return fallback();
        }

        let change = (b0 / a0).ln().abs() + (b1 / a1).ln().abs();
        (a0, a1) = (b0, b1);
        log::debug!("dispersion trend iteration {iter}: {a0:.4} + {a1:.4}/mean");
        if change < TREND_TOLERANCE {
            break;
        }
    }

    DispersionTrend::Parametric {
        asymptotic: a0,
        extra_poisson: a1,
    }
}

fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let n = sorted.len();
    match n {
        0 => f64::NAN,
        _ if n % 2 == 1 => sorted[n / 2],
        _ => 0.5 * (sorted[n / 2 - 1] + sorted[n / 2]),
    }
}

fn mad(values: &[f64]) -> f64 {
    let center = median(values);
    let deviations: Vec<f64> = values.iter().map(|v| (v - center).abs()).collect();
    MAD_SCALE * median(&deviations)
}

///
/// Estimate gene-wise, trended and shrunken dispersions.
///
/// # Arguments
/// - normalized: normalised counts, `[gene][sample]`, every gene with a positive mean
/// - base_means: mean normalised count per gene
/// - groups: sample positions of each group
/// - size_factors: per sample
///
pub fn estimate_dispersions(
    normalized: &[Vec<f64>],
    base_means: &[f64],
    groups: &[&[usize]],
    size_factors: &[f64],
) -> DispersionFit {
    let m = size_factors.len();
    let df = m.saturating_sub(groups.len()).max(1) as f64;
    let inv_sf_mean = size_factors.iter().map(|s| 1.0 / s).sum::<f64>() / m as f64;
    let max_dispersion = (m as f64).max(10.0);

    let gene_wise: Vec<f64> = normalized
        .iter()
        .map(|row| moments_dispersion(row, groups, inv_sf_mean, max_dispersion))
        .collect();

    let use_genes: Vec<usize> = (0..gene_wise.len())
        .filter(|&i| base_means[i] > 0.0 && gene_wise[i] > 100.0 * MIN_DISPERSION)
        .collect();
    let trend = fit_trend(base_means, &gene_wise, &use_genes);
    let fitted: Vec<f64> = base_means
        .iter()
        .map(|&mu| trend.at(mu).max(MIN_DISPERSION))
        .collect();

    let residuals: Vec<f64> = use_genes
        .iter()
        .map(|&i| gene_wise[i].ln() - fitted[i].ln())
        .collect();
    let log_variance = if residuals.is_empty() {
        0.0
    } else {
        mad(&residuals).powi(2)
    };
    let sampling_variance = log_dispersion_sampling_variance(df);
    let prior_log_variance = (log_variance - sampling_variance).max(MIN_PRIOR_LOG_VARIANCE);
    log::info!(
        "dispersion prior log-variance {prior_log_variance:.3} (sampling {sampling_variance:.3})"
    );

    let outlier_cut = OUTLIER_SD * log_variance.sqrt();
    let mut outliers = 0usize;
    let shrunken: Vec<f64> = gene_wise
        .iter()
        .zip(fitted.iter())
        .map(|(&gw, &fit)| {
            let (log_gw, log_fit) = (gw.ln(), fit.ln());
            if log_variance > 0.0 && log_gw > log_fit + outlier_cut {
                outliers += 1;
                return gw;
            }
            let precision = 1.0 / sampling_variance + 1.0 / prior_log_variance;
            let log_map =
                (log_gw / sampling_variance + log_fit / prior_log_variance) / precision;
            log_map.exp().clamp(MIN_DISPERSION, max_dispersion)
        })
        .collect();
    log::debug!("{outliers} dispersion outliers keep their gene-wise estimate");

    DispersionFit {
        gene_wise,
        trend,
        fitted,
        shrunken,
        prior_log_variance,
    }
}
