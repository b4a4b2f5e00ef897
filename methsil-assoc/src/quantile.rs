use crate::errors::{AssocError, Result};

///
/// Split values into `n_bins` groups of (nearly) equal size by rank.
///
/// Returns a 1-based bin per value, in input order. Equal values are ranked by their input
/// position, so bin sizes differ by at most one even with ties.
///
pub fn quantile_bin(values: &[f64], n_bins: usize) -> Result<Vec<usize>> {
    if n_bins == 0 {
        return Err(AssocError::NoBins);
    }

    let mut order: Vec<usize> = (0..values.len()).collect();
    // stable sort keeps input order among ties
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let n = values.len();
    let mut bins = vec![0; n];
    for (rank, &i) in order.iter().enumerate() {
        bins[i] = rank * n_bins / n + 1;
    }
    Ok(bins)
}
