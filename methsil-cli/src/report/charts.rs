//! Serializable chart descriptions.
//!
//! A [`ChartSpec`] holds everything needed to draw a chart, so a chart written by `run` can be
//! re-rendered later by `render` without re-running the pipeline.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use methsil_assoc::binning::{BinScheme, Classification, EffectClass};
use methsil_assoc::RegionGeneAssociation;

pub const BELOW_THRESHOLD: &str = "BelowThreshold";
pub const SIGNIFICANT: &str = "Significant";
pub const NOT_SIGNIFICANT: &str = "NotSignificant";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChartKind {
    Scatter,
    /// One scatter panel per stratum.
    StratifiedScatter,
    Bar,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub class: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stratum: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub label: String,
    pub value: f64,
    pub class: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    #[serde(default)]
    pub points: Vec<Point>,
    #[serde(default)]
    pub bars: Vec<Bar>,
    /// Vertical reference lines.
    #[serde(default)]
    pub x_markers: Vec<f64>,
    /// `#rrggbb` colour per class label.
    #[serde(default)]
    pub colours: BTreeMap<String, String>,
}

impl ChartSpec {
    pub fn to_json_file(&self, path: &Path) -> Result<()> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)
            .with_context(|| format!("Failed to write chart {}", path.display()))
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let file =
            File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
        serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Invalid chart {}", path.display()))
    }

    /// Class labels in order of first appearance.
    pub fn classes(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        let labels = self
            .points
            .iter()
            .map(|p| p.class.as_str())
            .chain(self.bars.iter().map(|b| b.class.as_str()));
        for label in labels {
            if !seen.contains(&label) {
                seen.push(label);
            }
        }
        seen
    }
}

fn class_colours() -> BTreeMap<String, String> {
    [
        (EffectClass::Increase.to_string(), "#b2182b"),
        (EffectClass::SmallDecrease.to_string(), "#92c5de"),
        (EffectClass::Decrease.to_string(), "#2166ac"),
        (BELOW_THRESHOLD.to_string(), "#bdbdbd"),
    ]
    .into_iter()
    .map(|(k, v)| (k, v.to_string()))
    .collect()
}

fn effect_point(row: &RegionGeneAssociation, threshold: f64, stratum: Option<usize>) -> Point {
    let class = if row.delta_methylation > threshold {
        BinScheme::FoldChange.class(row).to_string()
    } else {
        BELOW_THRESHOLD.to_string()
    };
    Point {
        x: row.delta_methylation,
        y: row.log2_fold_change,
        class,
        stratum,
        label: Some(row.gene.clone()),
    }
}

/// Figure 5A: methylation gain of each UMR against the expression change of its gene.
pub fn umr_scatter(rows: &[RegionGeneAssociation], threshold: f64) -> ChartSpec {
    ChartSpec {
        kind: ChartKind::Scatter,
        title: format!("UMR methylation gain vs expression change (n = {})", rows.len()),
        x_label: "delta mC (treated - control)".to_string(),
        y_label: "log2 fold change".to_string(),
        points: rows.iter().map(|r| effect_point(r, threshold, None)).collect(),
        bars: Vec::new(),
        x_markers: vec![threshold],
        colours: class_colours(),
    }
}

/// The Figure 5A scatter split into one panel per A-value bin.
pub fn stratified_umr_scatter(rows: &[RegionGeneAssociation], threshold: f64) -> ChartSpec {
    ChartSpec {
        kind: ChartKind::StratifiedScatter,
        title: "UMR methylation gain vs expression change by expression level".to_string(),
        points: rows
            .iter()
            .map(|r| effect_point(r, threshold, Some(r.a_bin)))
            .collect(),
        ..umr_scatter(rows, threshold)
    }
}

fn bars_of(classification: &Classification) -> Vec<Bar> {
    classification
        .bins
        .iter()
        .enumerate()
        .map(|(i, bin)| Bar {
            label: bin.label.clone(),
            value: 100.0 * bin.fraction,
            class: classification.scheme.bin_class(i).to_string(),
        })
        .collect()
}

/// Figure 5B: percentage of genes per fold-change bin.
pub fn fold_change_bars(classification: &Classification) -> ChartSpec {
    ChartSpec {
        kind: ChartKind::Bar,
        title: format!(
            "Genes with UMR delta mC > {} (n = {})",
            classification.threshold,
            classification.total()
        ),
        x_label: "fold change (treated / control)".to_string(),
        y_label: "% of genes".to_string(),
        points: Vec::new(),
        bars: bars_of(classification),
        x_markers: Vec::new(),
        colours: class_colours(),
    }
}

/// Figure 5B on the log2 scale.
pub fn log_fold_change_bars(classification: &Classification) -> ChartSpec {
    ChartSpec {
        x_label: "log2 fold change".to_string(),
        ..fold_change_bars(classification)
    }
}

/// DMRs near a promoter, coloured by significance of their gene.
pub fn dmr_scatter(rows: &[RegionGeneAssociation]) -> ChartSpec {
    let mut colours = BTreeMap::new();
    colours.insert(SIGNIFICANT.to_string(), "#d95f02".to_string());
    colours.insert(NOT_SIGNIFICANT.to_string(), "#7f7f7f".to_string());
    ChartSpec {
        kind: ChartKind::Scatter,
        title: format!("DMR methylation change vs expression change (n = {})", rows.len()),
        x_label: "delta mC (treated - control)".to_string(),
        y_label: "log2 fold change".to_string(),
        points: rows
            .iter()
            .map(|r| Point {
                x: r.delta_methylation,
                y: r.log2_fold_change,
                class: (if r.significant { SIGNIFICANT } else { NOT_SIGNIFICANT }).to_string(),
                stratum: None,
                label: Some(r.gene.clone()),
            })
            .collect(),
        bars: Vec::new(),
        x_markers: vec![0.0],
        colours,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use methsil_assoc::binning::{classify, classify_with};
    use pretty_assertions::assert_eq;
    use rstest::*;

    fn row(gene: &str, delta: f64, fold_change: f64, a_bin: usize) -> RegionGeneAssociation {
        RegionGeneAssociation {
            region: format!("UMR_{gene}"),
            chr: "chr1".to_string(),
            start: 100,
            end: 200,
            gene: gene.to_string(),
            distance: 0,
            delta_methylation: delta,
            base_mean: 500.0,
            log2_fold_change: fold_change.log2(),
            fold_change,
            p_adjusted: 0.01,
            a_value: 8.0,
            a_bin,
            significant: fold_change < 0.5,
        }
    }

    #[fixture]
    fn rows() -> Vec<RegionGeneAssociation> {
        vec![
            row("A", 0.6, 0.2, 1),
            row("B", 0.5, 0.8, 2),
            row("C", 0.4, 1.5, 3),
            row("D", 0.1, 0.2, 1),
        ]
    }

    #[rstest]
    fn test_umr_scatter_classes(rows: Vec<RegionGeneAssociation>) {
        let chart = umr_scatter(&rows, 0.3);
        let classes: Vec<&str> = chart.points.iter().map(|p| p.class.as_str()).collect();
        assert_eq!(
            classes,
            vec!["Decrease", "SmallDecrease", "Increase", BELOW_THRESHOLD]
        );
        assert_eq!(chart.x_markers, vec![0.3]);
        for class in chart.classes() {
            assert!(chart.colours.contains_key(class));
        }
    }

    #[rstest]
    fn test_stratified_points_carry_a_bin(rows: Vec<RegionGeneAssociation>) {
        let chart = stratified_umr_scatter(&rows, 0.3);
        assert_eq!(chart.kind, ChartKind::StratifiedScatter);
        let strata: Vec<Option<usize>> = chart.points.iter().map(|p| p.stratum).collect();
        assert_eq!(strata, vec![Some(1), Some(2), Some(3), Some(1)]);
    }

    #[rstest]
    fn test_bar_percentages(rows: Vec<RegionGeneAssociation>) {
        let chart = fold_change_bars(&classify(&rows, 0.3));
        assert_eq!(chart.bars.len(), 6);
        let total: f64 = chart.bars.iter().map(|b| b.value).sum();
        assert!((total - 100.0).abs() < 1e-9);
        assert_eq!(chart.bars[0].class, "Decrease");
        assert_eq!(chart.bars[3].class, "SmallDecrease");
        assert_eq!(chart.bars[5].class, "Increase");

        let log = log_fold_change_bars(&classify_with(&rows, 0.3, BinScheme::Log2FoldChange));
        assert_eq!(log.bars.len(), 12);
        assert_eq!(log.x_label, "log2 fold change");
    }

    #[rstest]
    fn test_json_round_trip(rows: Vec<RegionGeneAssociation>) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chart.json");
        let chart = dmr_scatter(&rows);
        chart.to_json_file(&path).unwrap();
        assert_eq!(ChartSpec::from_json_file(&path).unwrap(), chart);
    }

    #[rstest]
    fn test_minimal_json_uses_defaults() {
        let raw = r#"{"kind": "Bar", "title": "t", "x_label": "x", "y_label": "y",
                      "bars": [{"label": "a", "value": 1.0, "class": "k"}]}"#;
        let chart: ChartSpec = serde_json::from_str(raw).unwrap();
        assert!(chart.points.is_empty() && chart.colours.is_empty());
        assert_eq!(chart.classes(), vec!["k"]);
    }
}
