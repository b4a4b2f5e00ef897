use rayon::prelude::*;

use methsil_core::models::RegionSet;

use crate::errors::OverlapError;
use crate::multi_chrom_overlapper::IntoMultiChromOverlapper;
use crate::nearest::{NearestHit, NearestIndex};

fn check_regions(set: &'static str, rs: &RegionSet) -> Result<(), OverlapError> {
    match rs.regions.iter().find(|r| r.start > r.end) {
        Some(r) => Err(OverlapError::InvertedRegion {
            set,
            locus: r.locus(),
        }),
        None => Ok(()),
    }
}

///
/// Fraction of the regions of `a` that share at least one base with some region of `b`.
///
/// Returns 0.0 when `a` is empty or the two sets share no chromosome.
///
/// # Arguments
/// - a: query regions
/// - b: subject regions
///
pub fn overlap_fraction(a: &RegionSet, b: &RegionSet) -> Result<f64, OverlapError> {
    check_regions("query", a)?;
    check_regions("subject", b)?;

    if a.is_empty() {
        return Ok(0.0);
    }

    let index = b.into_multi_chrom_overlapper();
    let hits = a
        .regions
        .par_iter()
        .filter(|r| index.overlaps_any(r))
        .count();

    log::debug!("{hits} of {} query regions overlap {} subjects", a.len(), b.len());

    Ok(hits as f64 / a.len() as f64)
}

///
/// For every region of `a`, in order, the nearest region of `b` and the gap to it.
///
/// The entry is `None` when `b` has no region on that chromosome. See
/// [`NearestIndex::nearest`] for the tie-breaking rule.
///
/// # Arguments
/// - a: query regions
/// - b: subject regions
///
pub fn nearest_distance(
    a: &RegionSet,
    b: &RegionSet,
) -> Result<Vec<Option<NearestHit>>, OverlapError> {
    check_regions("query", a)?;
    check_regions("subject", b)?;

    let index = NearestIndex::new(b);
    let hits: Vec<Option<NearestHit>> = a.regions.par_iter().map(|r| index.nearest(r)).collect();

    let missing = hits.iter().filter(|h| h.is_none()).count();
    if missing > 0 {
        log::debug!("{missing} query regions sit on chromosomes absent from the subject set");
    }

    Ok(hits)
}
