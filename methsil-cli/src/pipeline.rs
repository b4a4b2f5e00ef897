//! The end-to-end run: load, fit, associate, bin, write.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use methsil_assoc::associate::associate;
use methsil_assoc::binning::{BinScheme, classify_with};
use methsil_assoc::{DeltaSource, GtfPromoterSource, PromoterSource};
use methsil_core::models::RegionSet;
use methsil_de::DifferentialExpressionRunner;
use methsil_io::{SourceCache, TableId, TableLoader};
use methsil_overlaprs::overlap_fraction;

use crate::config::PipelineConfig;
use crate::report::charts::{
    ChartSpec, dmr_scatter, fold_change_bars, log_fold_change_bars, stratified_umr_scatter,
    umr_scatter,
};
use crate::report::summary::{ExpressionSummary, RegionSummary, Summary};
use crate::report::svg::render_svg;
use crate::report::tables::write_tsv;

pub const UMR_ASSOCIATIONS_FILE: &str = "umr_associations.tsv";
pub const DMR_ASSOCIATIONS_FILE: &str = "dmr_associations.tsv";
pub const EXPRESSION_FILE: &str = "expression.tsv";
pub const SUMMARY_FILE: &str = "summary.json";

/// Outcome of [`run_pipeline`].
#[derive(Debug)]
pub struct PipelineOutput {
    pub summary: Summary,
    /// Every file written, in write order.
    pub files: Vec<PathBuf>,
}

fn region_set(loader: &TableLoader, id: TableId) -> Result<RegionSet> {
    let table = loader
        .load(id)
        .with_context(|| format!("Failed to load {id}"))?;
    Ok(table.to_region_set()?)
}

fn write_chart(chart: &ChartSpec, out_dir: &Path, stem: &str, files: &mut Vec<PathBuf>) -> Result<()> {
    let json = out_dir.join(format!("{stem}.json"));
    chart.to_json_file(&json)?;
    files.push(json);

    let svg = out_dir.join(format!("{stem}.svg"));
    render_svg(chart, &svg).with_context(|| format!("Failed to render {stem}"))?;
    files.push(svg);
    Ok(())
}

///
/// Run the whole figure pipeline with `config`.
///
/// Inputs are read from (and downloaded into) the configured data directory; every output is
/// written to `config.out_dir`, overwriting earlier runs.
///
/// # Arguments
/// - config: the pipeline configuration
/// - show_progress: show download progress bars
///
pub fn run_pipeline(config: &PipelineConfig, show_progress: bool) -> Result<PipelineOutput> {
    let data_dir = config.resolved_data_dir();
    let out_dir = &config.out_dir;
    log::info!(
        "data directory {}, output directory {}",
        data_dir.display(),
        out_dir.display()
    );

    let cache = SourceCache::builder()
        .with_data_dir(data_dir)
        .with_progress(show_progress)
        .finish()
        .context("Failed to open the data directory")?;
    let loader = TableLoader::new(cache, config.sources.clone(), config.tables.clone());

    // tables
    let umrs = loader.load(TableId::Umrs).context("Failed to load umrs")?;
    let dmrs = loader.load(TableId::Dmrs).context("Failed to load dmrs")?;
    let binding_sites = region_set(&loader, TableId::BindingSites)?;
    let promoter_methylation = region_set(&loader, TableId::PromoterMethylation)?;
    let counts = loader.load_counts().context("Failed to load counts")?;

    // expression
    let expression = DifferentialExpressionRunner::new(config.de_config())
        .run(&counts)
        .context("Differential expression failed")?;

    // promoters
    let gtf = loader
        .cache()
        .ensure(&config.annotation_source())
        .with_context(|| format!("Failed to fetch the {} annotation", config.annotation.assembly))?;
    let annotation = GtfPromoterSource::new(&gtf.to_string_lossy(), config.annotation.window());
    log::info!(
        "promoters of {} from {}",
        config.annotation.assembly,
        annotation.describe()
    );
    let promoters = annotation
        .promoters()
        .context("Failed to build promoter annotation")?;

    // associations
    let umr_assoc = associate(
        &umrs,
        &promoters,
        &expression,
        &DeltaSource::delta_column(),
        &config.umr_params(),
    )
    .context("Failed to associate UMRs with genes")?;
    let dmr_assoc = associate(
        &dmrs,
        &promoters,
        &expression,
        &DeltaSource::methylation_difference(),
        &config.dmr_params(),
    )
    .context("Failed to associate DMRs with genes")?;

    // categories
    let threshold = config.thresholds.delta_high;
    let umr_bins = classify_with(&umr_assoc.rows, threshold, BinScheme::FoldChange);
    let umr_log_bins = classify_with(&umr_assoc.rows, threshold, BinScheme::Log2FoldChange);
    let dmr_bins = classify_with(&dmr_assoc.rows, threshold, BinScheme::FoldChange);
    let dmr_log_bins = classify_with(&dmr_assoc.rows, threshold, BinScheme::Log2FoldChange);

    // overlaps
    let umr_regions = umrs.to_region_set()?;
    let dmr_regions = dmrs.to_region_set()?;
    let pairs: [(&str, &RegionSet, &RegionSet); 5] = [
        ("umrs_in_binding_sites", &umr_regions, &binding_sites),
        ("dmrs_in_binding_sites", &dmr_regions, &binding_sites),
        ("umrs_in_promoters", &umr_regions, &promoters),
        ("dmrs_in_promoters", &dmr_regions, &promoters),
        ("promoter_methylation_in_umrs", &promoter_methylation, &umr_regions),
    ];
    let mut overlaps = BTreeMap::new();
    for (key, a, b) in pairs {
        let fraction = overlap_fraction(a, b).with_context(|| format!("Failed to compute {key}"))?;
        log::info!("{key}: {:.1}%", 100.0 * fraction);
        overlaps.insert(key.to_string(), fraction);
    }

    let summary = Summary {
        umrs: RegionSummary::new(umrs.len(), &umr_assoc, &umr_bins, &umr_log_bins),
        dmrs: RegionSummary::new(dmrs.len(), &dmr_assoc, &dmr_bins, &dmr_log_bins),
        expression: ExpressionSummary::new(&expression, &counts.samples, config.thresholds.alpha),
        overlaps,
    };
    log::info!("UMRs with delta mC > {threshold}: {}", summary.umrs.headline());

    // outputs
    fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;
    let mut files = Vec::new();

    let tables = [
        (UMR_ASSOCIATIONS_FILE, &umr_assoc.rows),
        (DMR_ASSOCIATIONS_FILE, &dmr_assoc.rows),
    ];
    for (name, rows) in tables {
        let path = out_dir.join(name);
        write_tsv(&path, rows.iter())?;
        files.push(path);
    }
    let path = out_dir.join(EXPRESSION_FILE);
    write_tsv(&path, expression.iter())?;
    files.push(path);

    write_chart(&umr_scatter(&umr_assoc.rows, threshold), out_dir, "figure5a", &mut files)?;
    write_chart(&fold_change_bars(&umr_bins), out_dir, "figure5b", &mut files)?;
    write_chart(
        &stratified_umr_scatter(&umr_assoc.rows, threshold),
        out_dir,
        "figure5a_by_expression",
        &mut files,
    )?;
    write_chart(&log_fold_change_bars(&umr_log_bins), out_dir, "figure5b_log2", &mut files)?;
    write_chart(&dmr_scatter(&dmr_assoc.rows), out_dir, "dmr_scatter", &mut files)?;

    let path = out_dir.join(SUMMARY_FILE);
    summary.to_json_file(&path)?;
    files.push(path);

    Ok(PipelineOutput { summary, files })
}

#[cfg(test)]
mod tests {
    use super::*;

    use methsil_assoc::binning::EffectClass;
    use methsil_assoc::RegionGeneAssociation;
    use pretty_assertions::assert_eq;
    use rstest::*;

    use methsil_io::SourceConfig;

    use crate::config::ANNOTATION_SOURCE;
    use crate::report::charts::ChartKind;

    fn fixtures() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../tests/data")
    }

    fn fixture_config(out_dir: &Path) -> PipelineConfig {
        let mut config = PipelineConfig {
            data_dir: Some(fixtures().join("tables")),
            out_dir: out_dir.to_path_buf(),
            ..PipelineConfig::default()
        };
        config.sources.insert(
            ANNOTATION_SOURCE.to_string(),
            SourceConfig {
                file_name: Some(fixtures().join("annotation/genes.gtf").to_string_lossy().into_owned()),
                ..SourceConfig::default()
            },
        );
        config.expression.independent_filtering = false;
        config
    }

    #[rstest]
    fn test_fixture_run() {
        let dir = tempfile::tempdir().unwrap();
        let output = run_pipeline(&fixture_config(dir.path()), false).unwrap();
        let umrs = &output.summary.umrs;

        assert_eq!(umrs.n_associated, 7);
        assert_eq!(umrs.n_above_threshold, 6);
        let count = |class: EffectClass| {
            umrs.classes
                .iter()
                .find(|c| c.class == class)
                .map(|c| c.count)
                .unwrap()
        };
        assert_eq!(count(EffectClass::Decrease), 3);
        assert_eq!(count(EffectClass::SmallDecrease), 1);
        assert_eq!(count(EffectClass::Increase), 2);
        assert_eq!(output.summary.dmrs.n_associated, 2);

        for fraction in output.summary.overlaps.values() {
            assert!((0.0..=1.0).contains(fraction));
        }
        assert_eq!(
            output.summary.expression.control_samples,
            vec!["CTRL_1", "CTRL_2", "noDox_1"]
        );

        // 3 tables, 5 charts as json and svg, summary
        assert_eq!(output.files.len(), 14);
        for file in &output.files {
            assert!(file.exists(), "{}", file.display());
        }
    }

    #[rstest]
    fn test_fixture_outputs_read_back() {
        let dir = tempfile::tempdir().unwrap();
        run_pipeline(&fixture_config(dir.path()), false).unwrap();

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .from_path(dir.path().join(UMR_ASSOCIATIONS_FILE))
            .unwrap();
        let rows: Vec<RegionGeneAssociation> =
            reader.deserialize().collect::<std::result::Result<_, _>>().unwrap();
        assert_eq!(rows.len(), 7);
        assert_eq!(rows[0].region, "UMR_1");
        assert_eq!(rows[0].gene, "G01");

        let fig5b = ChartSpec::from_json_file(&dir.path().join("figure5b.json")).unwrap();
        assert_eq!(fig5b.kind, ChartKind::Bar);
        let total: f64 = fig5b.bars.iter().map(|b| b.value).sum();
        assert!((total - 100.0).abs() < 1e-9);

        let summary: Summary =
            serde_json::from_str(&fs::read_to_string(dir.path().join(SUMMARY_FILE)).unwrap())
                .unwrap();
        assert_eq!(summary.umrs.n_above_threshold, 6);
    }

    #[rstest]
    fn test_missing_annotation_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = fixture_config(dir.path());
        // no cached copy and no url for an unknown assembly
        config.annotation.assembly = "unknown".to_string();
        config.sources.remove(ANNOTATION_SOURCE);
        assert!(run_pipeline(&config, false).is_err());
    }

    /// Needs the real supplementary tables in `METHSIL_DATA_DIR`.
    #[rstest]
    #[ignore]
    fn test_reported_percentages() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig {
            out_dir: dir.path().to_path_buf(),
            ..PipelineConfig::default()
        };
        let output = run_pipeline(&config, false).unwrap();
        let umrs = &output.summary.umrs;
        let fraction = |class: EffectClass| {
            umrs.classes
                .iter()
                .find(|c| c.class == class)
                .map(|c| c.fraction)
                .unwrap()
        };
        assert!((fraction(EffectClass::Increase) - 0.37).abs() < 0.02);
        assert!((fraction(EffectClass::SmallDecrease) - 0.21).abs() < 0.02);
        assert!((fraction(EffectClass::Decrease) - 0.42).abs() < 0.02);
    }
}
