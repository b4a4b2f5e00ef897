//! Joining methylation regions to the expression change of their nearest gene.

use fxhash::FxHashMap;
use methsil_core::models::RegionSet;
use methsil_de::ExpressionTable;
use methsil_io::Table;
use methsil_overlaprs::nearest_distance;
use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::models::RegionGeneAssociation;
use crate::promoters::gene_symbol;
use crate::quantile::quantile_bin;

pub const DEFAULT_DMR_MAX_DISTANCE: u32 = 2000;
pub const DEFAULT_ALPHA: f64 = 0.05;
pub const DEFAULT_A_BINS: usize = 9;

/// Where the methylation change of a region comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeltaSource {
    /// `treated - control` of two methylation-level columns.
    Difference { control: String, treated: String },
    /// A precomputed column.
    Column(String),
}

impl DeltaSource {
    /// `mC_treated - mC_control`
    pub fn methylation_difference() -> Self {
        DeltaSource::Difference {
            control: "mC_control".to_string(),
            treated: "mC_treated".to_string(),
        }
    }

    /// The `delta_mC` column of the UMR table.
    pub fn delta_column() -> Self {
        DeltaSource::Column("delta_mC".to_string())
    }

    fn values(&self, table: &Table) -> Result<Vec<f64>> {
        match self {
            DeltaSource::Difference { control, treated } => {
                let control = table.floats(control)?;
                let treated = table.floats(treated)?;
                Ok(treated.iter().zip(control).map(|(t, c)| t - c).collect())
            }
            DeltaSource::Column(name) => Ok(table.floats(name)?.to_vec()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AssociationParams {
    /// Largest region-promoter gap kept, inclusive.
    pub max_distance: u32,
    /// Adjusted p-value below which a gene counts as significant.
    pub alpha: f64,
    pub a_bins: usize,
}

impl Default for AssociationParams {
    fn default() -> Self {
        AssociationParams {
            max_distance: DEFAULT_DMR_MAX_DISTANCE,
            alpha: DEFAULT_ALPHA,
            a_bins: DEFAULT_A_BINS,
        }
    }
}

/// Number of regions lost at each step of [`associate`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropCounts {
    pub no_promoter_nearby: usize,
    pub no_gene_symbol: usize,
    pub no_expression: usize,
    pub no_adjusted_p: usize,
    pub missing_delta: usize,
    pub non_finite_a: usize,
    pub duplicate_gene: usize,
}

#[derive(Debug, Clone)]
pub struct Associations {
    pub rows: Vec<RegionGeneAssociation>,
    pub dropped: DropCounts,
}

///
/// Associate every region with the gene of its nearest promoter and that gene's expression
/// change.
///
/// Regions are kept only within `max_distance` of a named promoter whose gene has an adjusted
/// p-value, a finite methylation change and a finite A-value. A gene is reported at most once,
/// for its closest region (the first one in table order on ties). Output follows table order.
///
/// Genes come only from `promoters`. Gene columns a region table carries itself, such as the
/// UMR table's `nearest_gene` and `tss_distance`, are not consulted.
///
/// # Arguments
/// - regions: region table with `chr`, `start`, `end` and the delta columns
/// - promoters: promoter regions with the gene symbol in `rest`
/// - expression: differential expression results
/// - delta: how to obtain the methylation change
/// - params: distance cutoff, significance level and A-value bins
///
pub fn associate(
    regions: &Table,
    promoters: &RegionSet,
    expression: &ExpressionTable,
    delta: &DeltaSource,
    params: &AssociationParams,
) -> Result<Associations> {
    let region_set = regions.to_region_set()?;
    let deltas = delta.values(regions)?;
    let hits = nearest_distance(&region_set, promoters)?;

    let mut dropped = DropCounts::default();
    let mut candidates: Vec<RegionGeneAssociation> = Vec::new();

    for (i, hit) in hits.into_iter().enumerate() {
        let Some(hit) = hit.filter(|h| h.distance <= params.max_distance) else {
            dropped.no_promoter_nearby += 1;
            continue;
        };
        let Some(gene) = gene_symbol(&promoters.regions[hit.subject_index]) else {
            dropped.no_gene_symbol += 1;
            continue;
        };
        let Some(result) = expression.get(gene) else {
            dropped.no_expression += 1;
            continue;
        };
        let Some(p_adjusted) = result.p_adjusted else {
            dropped.no_adjusted_p += 1;
            continue;
        };
        if !deltas[i].is_finite() {
            dropped.missing_delta += 1;
            continue;
        }

        let fold_change = result.fold_change();
        let a_value = 0.5 * (result.base_mean.log2() + (fold_change * result.base_mean).log2());
        if !a_value.is_finite() || !result.log2_fold_change.is_finite() {
            dropped.non_finite_a += 1;
            continue;
        }

        let region = &region_set.regions[i];
        candidates.push(RegionGeneAssociation {
            region: regions.row_labels[i].clone(),
            chr: region.chr.clone(),
            start: region.start,
            end: region.end,
            gene: gene.to_string(),
            distance: hit.distance,
            delta_methylation: deltas[i],
            base_mean: result.base_mean,
            log2_fold_change: result.log2_fold_change,
            fold_change,
            p_adjusted,
            a_value,
            a_bin: 0,
            significant: p_adjusted < params.alpha,
        });
    }

    // closest region per gene, first in table order on ties
    let mut best: FxHashMap<&str, usize> = FxHashMap::default();
    for (i, row) in candidates.iter().enumerate() {
        best.entry(row.gene.as_str())
            .and_modify(|kept| {
                if row.distance < candidates[*kept].distance {
                    *kept = i;
                }
            })
            .or_insert(i);
    }
    let mut keep = vec![false; candidates.len()];
    for &i in best.values() {
        keep[i] = true;
    }
    dropped.duplicate_gene = candidates.len() - best.len();

    let mut rows: Vec<RegionGeneAssociation> = candidates
        .into_iter()
        .zip(keep)
        .filter_map(|(row, keep)| keep.then_some(row))
        .collect();

    let a_values: Vec<f64> = rows.iter().map(|r| r.a_value).collect();
    for (row, bin) in rows.iter_mut().zip(quantile_bin(&a_values, params.a_bins)?) {
        row.a_bin = bin;
    }

    log::info!(
        "{}: {} of {} regions associated with a gene ({:?})",
        regions.name,
        rows.len(),
        regions.len(),
        dropped
    );
    Ok(Associations { rows, dropped })
}
