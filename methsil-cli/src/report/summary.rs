use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use methsil_assoc::binning::{BinCount, ClassCount, Classification};
use methsil_assoc::{Associations, DropCounts};
use methsil_de::ExpressionTable;

/// Headline numbers of one region table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionSummary {
    pub n_regions: usize,
    pub n_associated: usize,
    pub dropped: DropCounts,
    pub delta_threshold: f64,
    pub n_above_threshold: usize,
    pub bins: Vec<BinCount>,
    pub classes: Vec<ClassCount>,
    pub log2_bins: Vec<BinCount>,
    pub log2_classes: Vec<ClassCount>,
}

impl RegionSummary {
    pub fn new(
        n_regions: usize,
        associations: &Associations,
        fold_change: &Classification,
        log2: &Classification,
    ) -> Self {
        RegionSummary {
            n_regions,
            n_associated: associations.rows.len(),
            dropped: associations.dropped.clone(),
            delta_threshold: fold_change.threshold,
            n_above_threshold: fold_change.total(),
            bins: fold_change.bins.clone(),
            classes: fold_change.classes.clone(),
            log2_bins: log2.bins.clone(),
            log2_classes: log2.classes.clone(),
        }
    }

    /// e.g. `Increase 37.0%, SmallDecrease 21.0%, Decrease 42.0% of 2063 pairs`
    pub fn headline(&self) -> String {
        let parts: Vec<String> = self
            .classes
            .iter()
            .map(|c| format!("{} {:.1}%", c.class, 100.0 * c.fraction))
            .collect();
        format!("{} of {} pairs", parts.join(", "), self.n_above_threshold)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpressionSummary {
    pub n_genes: usize,
    pub n_significant: usize,
    pub alpha: f64,
    pub control_samples: Vec<String>,
    pub treated_samples: Vec<String>,
    pub size_factors: BTreeMap<String, f64>,
    pub filter_threshold: f64,
}

impl ExpressionSummary {
    pub fn new(table: &ExpressionTable, samples: &[String], alpha: f64) -> Self {
        let names =
            |idx: &[usize]| -> Vec<String> { idx.iter().map(|&i| samples[i].clone()).collect() };
        ExpressionSummary {
            n_genes: table.len(),
            n_significant: table.n_significant(alpha),
            alpha,
            control_samples: names(&table.grouping.control),
            treated_samples: names(&table.grouping.treated),
            size_factors: table.size_factors.iter().cloned().collect(),
            filter_threshold: table.filter_threshold,
        }
    }
}

/// Everything `summary.json` holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub umrs: RegionSummary,
    pub dmrs: RegionSummary,
    pub expression: ExpressionSummary,
    /// Fraction of the regions of one set overlapping another, keyed `<query>_in_<subject>`.
    pub overlaps: BTreeMap<String, f64>,
}

impl Summary {
    pub fn to_json_file(&self, path: &Path) -> Result<()> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)
            .with_context(|| format!("Failed to write {}", path.display()))
    }
}
