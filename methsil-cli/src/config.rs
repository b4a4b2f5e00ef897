//! The TOML pipeline configuration.
//!
//! Every field has a default, so an empty file (or no file) runs the pipeline on the standard
//! catalogue. Command-line flags override `data_dir` and `out_dir`.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use methsil_assoc::associate::{DEFAULT_A_BINS, DEFAULT_ALPHA, DEFAULT_DMR_MAX_DISTANCE};
use methsil_assoc::binning::DEFAULT_DELTA_HIGH;
use methsil_assoc::promoters::{DEFAULT_DOWNSTREAM, DEFAULT_UPSTREAM};
use methsil_assoc::{AssociationParams, PromoterWindow};
use methsil_de::runner::DEFAULT_FILTER_ALPHA;
use methsil_de::{DeConfig, GroupingConfig};
use methsil_io::cache::get_default_data_dir;
use methsil_io::{Source, SourceConfig, TablesConfig};

pub const DEFAULT_OUT_DIR: &str = "figure5";
pub const DEFAULT_ASSEMBLY: &str = "hg19";
/// Source id of the gene annotation in `[sources]`.
pub const ANNOTATION_SOURCE: &str = "annotation";

/// GENCODE comprehensive gene annotation of a known assembly.
pub fn default_annotation_url(assembly: &str) -> Option<&'static str> {
    match assembly {
        "hg19" => Some(
            "https://ftp.ebi.ac.uk/pub/databases/gencode/Gencode_human/release_19/gencode.v19.annotation.gtf.gz",
        ),
        "hg38" => Some(
            "https://ftp.ebi.ac.uk/pub/databases/gencode/Gencode_human/release_44/gencode.v44.annotation.gtf.gz",
        ),
        "mm10" => Some(
            "https://ftp.ebi.ac.uk/pub/databases/gencode/Gencode_mouse/release_M25/gencode.vM25.annotation.gtf.gz",
        ),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Thresholds {
    /// Methylation gain above which a UMR enters the fold-change bins.
    pub delta_high: f64,
    pub dmr_max_distance: u32,
    pub umr_max_distance: u32,
    pub alpha: f64,
    pub a_bins: usize,
}

impl Default for Thresholds {
    fn default() -> Self {
        Thresholds {
            delta_high: DEFAULT_DELTA_HIGH,
            dmr_max_distance: DEFAULT_DMR_MAX_DISTANCE,
            umr_max_distance: 0,
            alpha: DEFAULT_ALPHA,
            a_bins: DEFAULT_A_BINS,
        }
    }
}

/// The `[expression]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExpressionConfig {
    pub filter_alpha: f64,
    pub independent_filtering: bool,
}

impl Default for ExpressionConfig {
    fn default() -> Self {
        ExpressionConfig {
            filter_alpha: DEFAULT_FILTER_ALPHA,
            independent_filtering: true,
        }
    }
}

/// The `[annotation]` section: promoters of `assembly`.
///
/// The GTF itself is the `annotation` source, cached like the tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnnotationConfig {
    pub assembly: String,
    pub upstream: u32,
    pub downstream: u32,
}

impl Default for AnnotationConfig {
    fn default() -> Self {
        AnnotationConfig {
            assembly: DEFAULT_ASSEMBLY.to_string(),
            upstream: DEFAULT_UPSTREAM,
            downstream: DEFAULT_DOWNSTREAM,
        }
    }
}

impl AnnotationConfig {
    pub fn window(&self) -> PromoterWindow {
        PromoterWindow {
            upstream: self.upstream,
            downstream: self.downstream,
        }
    }

    pub fn default_file_name(&self) -> String {
        format!("{}.genes.gtf.gz", self.assembly)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub data_dir: Option<PathBuf>,
    pub out_dir: PathBuf,
    pub sources: BTreeMap<String, SourceConfig>,
    pub tables: TablesConfig,
    pub grouping: GroupingConfig,
    pub expression: ExpressionConfig,
    pub thresholds: Thresholds,
    pub annotation: AnnotationConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            data_dir: None,
            out_dir: PathBuf::from(DEFAULT_OUT_DIR),
            sources: BTreeMap::new(),
            tables: TablesConfig::default(),
            grouping: GroupingConfig::default(),
            expression: ExpressionConfig::default(),
            thresholds: Thresholds::default(),
            annotation: AnnotationConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("Invalid config {}", path.display()))
    }

    /// The data directory: the config file, then `METHSIL_DATA_DIR`, then `./data`.
    pub fn resolved_data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(get_default_data_dir)
    }

    ///
    /// The gene annotation source.
    ///
    /// `[sources.annotation]` sets the file name and url; without a url the GENCODE release
    /// of `annotation.assembly` is used, if there is one.
    ///
    pub fn annotation_source(&self) -> Source {
        let mut source = self
            .sources
            .get(ANNOTATION_SOURCE)
            .cloned()
            .unwrap_or_default()
            .resolve(ANNOTATION_SOURCE, &self.annotation.default_file_name());
        if source.url.is_none() {
            source.url = default_annotation_url(&self.annotation.assembly).map(String::from);
        }
        source
    }

    pub fn de_config(&self) -> DeConfig {
        DeConfig {
            grouping: self.grouping.clone(),
            filter_alpha: self.expression.filter_alpha,
            independent_filtering: self.expression.independent_filtering,
        }
    }

    pub fn umr_params(&self) -> AssociationParams {
        AssociationParams {
            max_distance: self.thresholds.umr_max_distance,
            alpha: self.thresholds.alpha,
            a_bins: self.thresholds.a_bins,
        }
    }

    pub fn dmr_params(&self) -> AssociationParams {
        AssociationParams {
            max_distance: self.thresholds.dmr_max_distance,
            ..self.umr_params()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[rstest]
    fn test_empty_config_is_default() {
        let config: PipelineConfig = toml::from_str("").unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.thresholds.delta_high, 0.3);
        assert_eq!(config.dmr_params().max_distance, 2000);
        assert_eq!(config.umr_params().max_distance, 0);
    }

    #[rstest]
    fn test_partial_sections() {
        let raw = r#"
            out_dir = "out"

            [sources.umrs]
            file_name = "Table_S1.txt"
            url = "https://example.org/S1.txt"

            [tables]
            umr_genebody_column = "gb"

            [thresholds]
            delta_high = 0.4
            a_bins = 5

            [sources.annotation]
            file_name = "/ref/genes.gtf"

            [annotation]
            assembly = "hg38"
        "#;
        let config: PipelineConfig = toml::from_str(raw).unwrap();
        assert_eq!(config.out_dir, PathBuf::from("out"));
        assert_eq!(config.sources["umrs"].file_name.as_deref(), Some("Table_S1.txt"));
        assert_eq!(config.tables.umr_genebody_column, "gb");
        assert_eq!(config.thresholds.delta_high, 0.4);
        assert_eq!(config.thresholds.alpha, 0.05);
        assert_eq!(config.umr_params().a_bins, 5);
        let annotation = config.annotation_source();
        assert_eq!(annotation.file_name, "/ref/genes.gtf");
        assert_eq!(annotation.url.as_deref(), default_annotation_url("hg38"));
        assert_eq!(config.annotation.upstream, 2000);
    }

    #[rstest]
    fn test_demo_config_matches_defaults() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../demos/methsil.toml");
        let config = PipelineConfig::from_file(&path).unwrap();
        let defaults = PipelineConfig::default();
        assert_eq!(config.thresholds, defaults.thresholds);
        assert_eq!(config.grouping, defaults.grouping);
        assert_eq!(config.annotation, defaults.annotation);
        assert_eq!(config.sources.len(), 6);
        // empty urls resolve to none
        let source = config.sources["counts"].resolve("counts", "counts.tsv.gz");
        assert_eq!(source.url, None);
    }

    #[rstest]
    fn test_unknown_key_is_rejected() {
        let res: std::result::Result<PipelineConfig, _> = toml::from_str("[thresholds]\ndelta = 1.0\n");
        assert!(res.is_err());
    }

    #[rstest]
    #[case("hg19", None, "hg19.genes.gtf.gz", default_annotation_url("hg19"))]
    #[case("hg19", Some("https://host/own.gtf.gz"), "hg19.genes.gtf.gz", Some("https://host/own.gtf.gz"))]
    #[case("dm6", None, "dm6.genes.gtf.gz", None)]
    fn test_annotation_source(
        #[case] assembly: &str,
        #[case] url: Option<&str>,
        #[case] file_name: &str,
        #[case] expected_url: Option<&str>,
    ) {
        let mut config = PipelineConfig::default();
        config.annotation.assembly = assembly.to_string();
        if let Some(url) = url {
            config.sources.insert(
                ANNOTATION_SOURCE.to_string(),
                SourceConfig {
                    url: Some(url.to_string()),
                    ..SourceConfig::default()
                },
            );
        }
        let source = config.annotation_source();
        assert_eq!(source.id, ANNOTATION_SOURCE);
        assert_eq!(source.file_name, file_name);
        assert_eq!(source.url.as_deref(), expected_url);
    }

    #[rstest]
    fn test_annotation_is_cached_source() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("hg19.genes.gtf.gz"), "").unwrap();
        let cache = methsil_io::SourceCache::builder()
            .with_data_dir(dir.path().to_path_buf())
            .with_progress(false)
            .finish()
            .unwrap();
        // cached, so the default url is never requested
        let path = cache.ensure(&PipelineConfig::default().annotation_source()).unwrap();
        assert_eq!(path, dir.path().join("hg19.genes.gtf.gz"));
    }

    #[rstest]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("methsil.toml");
        fs::write(&path, "data_dir = \"/tmp/methsil\"\n[grouping]\ntreated = [\"meth\"]\n").unwrap();
        let config = PipelineConfig::from_file(&path).unwrap();
        assert_eq!(config.resolved_data_dir(), PathBuf::from("/tmp/methsil"));
        assert_eq!(config.de_config().grouping.treated, vec!["meth".to_string()]);
        assert!(PipelineConfig::from_file(&dir.path().join("missing.toml")).is_err());
    }
}
