use serde::{Deserialize, Serialize};

/// A region joined to the expression result of its nearest gene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionGeneAssociation {
    /// Row label of the region in its source table.
    pub region: String,
    pub chr: String,
    pub start: u32,
    pub end: u32,
    pub gene: String,
    /// Gap to the gene's promoter, 0 when overlapping.
    pub distance: u32,
    /// Treated minus control methylation.
    pub delta_methylation: f64,
    pub base_mean: f64,
    pub log2_fold_change: f64,
    pub fold_change: f64,
    pub p_adjusted: f64,
    /// Mean log2 expression of the two conditions.
    pub a_value: f64,
    /// Expression quantile, 1 = lowest.
    pub a_bin: usize,
    pub significant: bool,
}
