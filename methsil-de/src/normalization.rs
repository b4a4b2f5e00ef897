//! Library-size normalisation by the median-of-ratios method.

use methsil_io::CountMatrix;

use crate::errors::{DeError, Result};

fn median(values: &mut [f64]) -> f64 {
    values.sort_by(|a, b| a.total_cmp(b));
    let n = values.len();
    if n % 2 == 1 {
        values[n / 2]
    } else {
        0.5 * (values[n / 2 - 1] + values[n / 2])
    }
}

///
/// Median-of-ratios size factors, one per sample column.
///
/// The reference of each gene is the geometric mean of its counts across all samples; only
/// genes with a non-zero count in every sample contribute. Fails with
/// [`DeError::NoSizeFactorGenes`] when no gene qualifies.
///
pub fn size_factors(counts: &CountMatrix) -> Result<Vec<f64>> {
    let n_samples = counts.n_samples();

    let mut ratios: Vec<Vec<f64>> = vec![Vec::new(); n_samples];
    for row in counts.counts.iter().filter(|row| row.iter().all(|&c| c > 0)) {
        let logs: Vec<f64> = row.iter().map(|&c| (c as f64).ln()).collect();
        let log_geo_mean = logs.iter().sum::<f64>() / n_samples as f64;
        for (j, l) in logs.iter().enumerate() {
            ratios[j].push(l - log_geo_mean);
        }
    }

    if ratios.first().is_none_or(|r| r.is_empty()) {
        return Err(DeError::NoSizeFactorGenes);
    }
    log::debug!("size factors from {} genes", ratios[0].len());

    Ok(ratios.iter_mut().map(|r| median(r).exp()).collect())
}

/// `counts[gene][sample] / size_factors[sample]`
pub fn normalized_counts(counts: &CountMatrix, size_factors: &[f64]) -> Vec<Vec<f64>> {
    counts
        .counts
        .iter()
        .map(|row| {
            row.iter()
                .zip(size_factors)
                .map(|(&c, s)| c as f64 / s)
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;

    fn matrix(counts: Vec<Vec<u64>>) -> CountMatrix {
        let genes = (0..counts.len()).map(|i| format!("g{i}")).collect();
        let samples = (0..counts[0].len()).map(|j| format!("s{j}")).collect();
        CountMatrix::new(genes, samples, counts).unwrap()
    }

    #[rstest]
    fn test_doubled_library_doubles_size_factor() {
        let counts = matrix(vec![
            vec![10, 20],
            vec![50, 100],
            vec![7, 14],
            vec![0, 3],
        ]);
        let sf = size_factors(&counts).unwrap();
        assert!((sf[1] / sf[0] - 2.0).abs() < 1e-12);
        // geometric mean of the factors is one
        assert!((sf[0] * sf[1] - 1.0).abs() < 1e-12);
    }

    #[rstest]
    fn test_no_gene_without_zeros() {
        let counts = matrix(vec![vec![0, 4], vec![3, 0]]);
        assert!(matches!(
            size_factors(&counts),
            Err(DeError::NoSizeFactorGenes)
        ));
    }

    #[rstest]
    fn test_normalized_counts() {
        let counts = matrix(vec![vec![10, 20], vec![4, 8]]);
        let norm = normalized_counts(&counts, &[0.5, 2.0]);
        assert_eq!(norm, vec![vec![20.0, 10.0], vec![8.0, 4.0]]);
    }

    #[rstest]
    #[case(vec![3.0, 1.0, 2.0], 2.0)]
    #[case(vec![4.0, 1.0, 3.0, 2.0], 2.5)]
    fn test_median(#[case] mut values: Vec<f64>, #[case] expected: f64) {
        assert_eq!(median(&mut values), expected);
    }
}
