use fxhash::FxHashMap;
use methsil_io::CountMatrix;
use serde::{Deserialize, Serialize};

use crate::adjust::{adjust_above, independent_filtering};
use crate::dispersion::{DispersionTrend, estimate_dispersions};
use crate::errors::{DeError, Result};
use crate::grouping::{GroupingConfig, SampleGrouping, assign_groups};
use crate::normalization::{normalized_counts, size_factors};
use crate::wald::{fit_group_mean, wald_test};

pub const DEFAULT_FILTER_ALPHA: f64 = 0.1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DeConfig {
    pub grouping: GroupingConfig,
    /// Target false discovery rate of the independent filter.
    pub filter_alpha: f64,
    pub independent_filtering: bool,
}

impl Default for DeConfig {
    fn default() -> Self {
        DeConfig {
            grouping: GroupingConfig::default(),
            filter_alpha: DEFAULT_FILTER_ALPHA,
            independent_filtering: true,
        }
    }
}

/// Fit outcome of one gene, Methylated relative to Control.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpressionResult {
    pub gene: String,
    pub base_mean: f64,
    pub log2_fold_change: f64,
    pub lfc_se: f64,
    pub stat: f64,
    pub p_value: Option<f64>,
    /// `None` when the gene was removed by independent filtering.
    pub p_adjusted: Option<f64>,
    pub dispersion: f64,
}

impl ExpressionResult {
    pub fn fold_change(&self) -> f64 {
        self.log2_fold_change.exp2()
    }
}

/// Per-gene results, keyed by gene label.
#[derive(Debug, Clone)]
pub struct ExpressionTable {
    results: Vec<ExpressionResult>,
    index: FxHashMap<String, usize>,
    pub grouping: SampleGrouping,
    /// Sample names and size factors of the included samples, control first.
    pub size_factors: Vec<(String, f64)>,
    pub trend: DispersionTrend,
    pub filter_threshold: f64,
}

impl ExpressionTable {
    pub fn get(&self, gene: &str) -> Option<&ExpressionResult> {
        self.index.get(gene).map(|&i| &self.results[i])
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ExpressionResult> {
        self.results.iter()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Genes with an adjusted p-value below `alpha`.
    pub fn n_significant(&self, alpha: f64) -> usize {
        self.results
            .iter()
            .filter(|r| r.p_adjusted.is_some_and(|p| p < alpha))
            .count()
    }
}

impl<'a> IntoIterator for &'a ExpressionTable {
    type Item = &'a ExpressionResult;
    type IntoIter = std::slice::Iter<'a, ExpressionResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.iter()
    }
}

///
/// Two-group negative-binomial differential expression.
///
/// ```rust,no_run
/// use methsil_de::{DeConfig, DifferentialExpressionRunner};
/// # fn demo(counts: &methsil_io::CountMatrix) -> Result<(), methsil_de::DeError> {
/// let table = DifferentialExpressionRunner::new(DeConfig::default()).run(counts)?;
/// println!("{} genes at padj < 0.05", table.n_significant(0.05));
/// # Ok(())
/// # }
/// ```
pub struct DifferentialExpressionRunner {
    config: DeConfig,
}

impl DifferentialExpressionRunner {
    pub fn new(config: DeConfig) -> Self {
        DifferentialExpressionRunner { config }
    }

    pub fn config(&self) -> &DeConfig {
        &self.config
    }

    ///
    /// Fit every gene of `counts` and return one result per gene with reads in the included
    /// samples.
    ///
    /// Fails with [`DeError::EmptyGroup`] when a group has no samples and with
    /// [`DeError::NoReplicates`] when there are no residual degrees of freedom.
    ///
    pub fn run(&self, counts: &CountMatrix) -> Result<ExpressionTable> {
        let grouping = assign_groups(&counts.samples, &self.config.grouping)?;
        let included = grouping.included();
        let m = included.len();
        if m <= 2 {
            return Err(DeError::NoReplicates(m));
        }

        let selected = counts.select_samples(&included);
        let expressed: Vec<usize> = (0..selected.n_genes())
            .filter(|&i| selected.counts[i].iter().any(|&c| c > 0))
            .collect();
        if expressed.len() < selected.n_genes() {
            log::info!(
                "{} genes have no reads in the compared samples and are not tested",
                selected.n_genes() - expressed.len()
            );
        }
        let selected = CountMatrix {
            genes: expressed.iter().map(|&i| selected.genes[i].clone()).collect(),
            samples: selected.samples.clone(),
            counts: expressed.iter().map(|&i| selected.counts[i].clone()).collect(),
        };

        let sf = size_factors(&selected)?;
        let normalized = normalized_counts(&selected, &sf);
        let base_means: Vec<f64> = normalized
            .iter()
            .map(|row| row.iter().sum::<f64>() / m as f64)
            .collect();

        let n_control = grouping.control.len();
        let control: Vec<usize> = (0..n_control).collect();
        let treated: Vec<usize> = (n_control..m).collect();
        let groups: [&[usize]; 2] = [&control, &treated];
        let dispersions = estimate_dispersions(&normalized, &base_means, &groups, &sf);

        let (sf_control, sf_treated) = sf.split_at(n_control);
        let tests: Vec<_> = selected
            .counts
            .iter()
            .zip(dispersions.shrunken.iter())
            .map(|(row, &alpha)| {
                let (k_control, k_treated) = row.split_at(n_control);
                wald_test(
                    fit_group_mean(k_control, sf_control, alpha),
                    fit_group_mean(k_treated, sf_treated, alpha),
                )
            })
            .collect();

        let p_values: Vec<Option<f64>> = tests
            .iter()
            .map(|t| Some(t.p_value).filter(|p| p.is_finite()))
            .collect();
        let (p_adjusted, filter_threshold) = if self.config.independent_filtering {
            let filtered = independent_filtering(&base_means, &p_values, self.config.filter_alpha);
            (filtered.p_adjusted, filtered.threshold)
        } else {
            (adjust_above(&base_means, &p_values, f64::NEG_INFINITY), 0.0)
        };

        let results: Vec<ExpressionResult> = selected
            .genes
            .iter()
            .enumerate()
            .map(|(i, gene)| ExpressionResult {
                gene: gene.clone(),
                base_mean: base_means[i],
                log2_fold_change: tests[i].log2_fold_change,
                lfc_se: tests[i].lfc_se,
                stat: tests[i].stat,
                p_value: p_values[i],
                p_adjusted: p_adjusted[i],
                dispersion: dispersions.shrunken[i],
            })
            .collect();
        let index = results
            .iter()
            .enumerate()
            .map(|(i, r)| (r.gene.clone(), i))
            .collect();

        let table = ExpressionTable {
            results,
            index,
            size_factors: selected.samples.iter().cloned().zip(sf).collect(),
            grouping,
            trend: dispersions.trend,
            filter_threshold,
        };
        log::info!(
            "tested {} genes, {} with padj < {}",
            table.len(),
            table.n_significant(self.config.filter_alpha),
            self.config.filter_alpha
        );
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use methsil_core::utils::get_dynamic_reader;
    use methsil_io::counts::parse_counts;
    use pretty_assertions::assert_eq;
    use rstest::*;

    /// Twenty background genes, one strongly up, one strongly down, one silent.
    #[fixture]
    fn synthetic() -> CountMatrix {
        let samples: Vec<String> = ["ctrl_1", "ctrl_2", "ctrl_3", "dox_1", "dox_2", "dox_3"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let jitter = [0.9, 1.05, 1.0, 0.95, 1.1, 1.0];
        let mut genes = Vec::new();
        let mut counts = Vec::new();
        for g in 0..20 {
            let base = 100.0 + 37.0 * g as f64;
            genes.push(format!("BG{g}"));
            counts.push(
                jitter
                    .iter()
                    .enumerate()
                    .map(|(j, f)| (base * f * (1.0 + 0.03 * ((g + j) % 3) as f64)).round() as u64)
                    .collect(),
            );
        }
        genes.push("UP".to_string());
        counts.push(vec![100, 110, 95, 800, 850, 790]);
        genes.push("DOWN".to_string());
        counts.push(vec![900, 950, 880, 100, 120, 90]);
        genes.push("SILENT".to_string());
        counts.push(vec![0, 0, 0, 0, 0, 0]);
        CountMatrix {
            genes,
            samples,
            counts,
        }
    }

    fn runner() -> DifferentialExpressionRunner {
        DifferentialExpressionRunner::new(DeConfig::default())
    }

    #[rstest]
    fn test_detects_direction(synthetic: CountMatrix) {
        let table = runner().run(&synthetic).unwrap();
        let up = table.get("UP").unwrap();
        let down = table.get("DOWN").unwrap();
        assert!(up.log2_fold_change > 2.5);
        assert!(down.log2_fold_change < -2.5);
        assert!(up.p_value.unwrap() < 1e-4);
        assert!(down.p_value.unwrap() < 1e-4);
        assert!(up.fold_change() > 5.0);
    }

    #[rstest]
    fn test_silent_gene_is_not_tested(synthetic: CountMatrix) {
        let table = runner().run(&synthetic).unwrap();
        assert!(table.get("SILENT").is_none());
        assert_eq!(table.len(), 22);
    }

    #[rstest]
    fn test_adjusted_not_below_raw(synthetic: CountMatrix) {
        let table = runner().run(&synthetic).unwrap();
        for r in table.iter() {
            assert!(r.base_mean >= 0.0);
            if let (Some(p), Some(padj)) = (r.p_value, r.p_adjusted) {
                assert!(padj >= p && padj <= 1.0, "{}: {p} {padj}", r.gene);
            }
        }
    }

    #[rstest]
    fn test_empty_group(synthetic: CountMatrix) {
        let mut counts = synthetic;
        counts.samples = counts.samples.iter().map(|s| s.replace("dox", "x")).collect();
        assert!(matches!(
            runner().run(&counts),
            Err(DeError::EmptyGroup(_))
        ));
    }

    #[rstest]
    fn test_no_replicates() {
        let counts = CountMatrix {
            genes: vec!["A".into()],
            samples: vec!["ctrl".into(), "dox".into()],
            counts: vec![vec![5, 10]],
        };
        assert!(matches!(
            runner().run(&counts),
            Err(DeError::NoReplicates(2))
        ));
    }

    #[rstest]
    fn test_fixture_counts() {
        let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../tests/data/tables/counts.tsv.gz");
        let counts = parse_counts(get_dynamic_reader(&path).unwrap()).unwrap();
        let table = runner().run(&counts).unwrap();

        // removal samples are excluded, noDox is a control
        assert_eq!(table.grouping.control, vec![0, 1, 2]);
        assert_eq!(table.grouping.treated, vec![3, 4, 5]);
        let g01 = table.get("G01").unwrap();
        let g21 = table.get("G21").unwrap();
        assert!((g01.fold_change() - 0.2).abs() < 0.03);
        assert!((g21.log2_fold_change - 1.0).abs() < 0.1);
        assert!(g01.p_adjusted.is_some_and(|p| p < 0.05));
    }
}
