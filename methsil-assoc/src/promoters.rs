//! Promoter annotation.
//!
//! A [`PromoterSource`] yields one promoter region per gene, with the gene symbol as the first
//! field of `rest`. Promoters without a symbol are kept with `rest: None`; the associator
//! drops them later and counts them.

use std::io::BufRead;
use std::path::{Path, PathBuf};

use methsil_core::models::{Region, RegionSet};
use methsil_core::utils::{get_dynamic_reader, get_dynamic_reader_from_url, is_url};
use serde::{Deserialize, Serialize};

use crate::errors::{AssocError, Result};

pub const DEFAULT_UPSTREAM: u32 = 2000;
pub const DEFAULT_DOWNSTREAM: u32 = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strand {
    Plus,
    Minus,
    Unstranded,
}

impl Strand {
    pub fn from_char(c: char) -> Self {
        match c {
            '+' => Strand::Plus,
            '-' => Strand::Minus,
            _ => Strand::Unstranded,
        }
    }
}

/// Bases upstream and downstream of the transcription start site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromoterWindow {
    pub upstream: u32,
    pub downstream: u32,
}

impl Default for PromoterWindow {
    fn default() -> Self {
        PromoterWindow {
            upstream: DEFAULT_UPSTREAM,
            downstream: DEFAULT_DOWNSTREAM,
        }
    }
}

impl PromoterWindow {
    ///
    /// Promoter of a gene body.
    ///
    /// The TSS of a plus-strand (or unstranded) gene is its start, that of a minus-strand gene
    /// its end; upstream extends against the direction of transcription. The gene's `rest` is
    /// carried over.
    ///
    pub fn promoter(&self, gene: &Region, strand: Strand) -> Region {
        let (start, end) = match strand {
            Strand::Minus => (
                gene.end.saturating_sub(self.downstream),
                gene.end.saturating_add(self.upstream),
            ),
            Strand::Plus | Strand::Unstranded => (
                gene.start.saturating_sub(self.upstream),
                gene.start.saturating_add(self.downstream),
            ),
        };
        Region {
            chr: gene.chr.clone(),
            start,
            end,
            rest: gene.rest.clone(),
        }
    }
}

/// Gene symbol of a promoter region, if it has one.
pub fn gene_symbol(region: &Region) -> Option<&str> {
    region
        .rest
        .as_deref()
        .and_then(|rest| rest.split('\t').next())
        .map(str::trim)
        .filter(|s| !s.is_empty() && *s != ".")
}

pub trait PromoterSource {
    fn promoters(&self) -> Result<RegionSet>;

    /// Where the promoters come from, for logging.
    fn describe(&self) -> String;
}

/// Value of one `key "value";` pair of a GTF attribute column.
fn gtf_attribute<'a>(attrs: &'a str, key: &str) -> Option<&'a str> {
    attrs.split(';').find_map(|pair| {
        let (k, v) = pair.trim().split_once(' ')?;
        (k == key).then(|| v.trim().trim_matches('"'))
    })
}

///
/// Read the `gene` features of a GTF file.
///
/// Coordinates are converted from 1-based inclusive to 0-based half-open. The `gene_name`
/// attribute, when present, becomes the region's `rest`.
///
/// # Arguments
/// - reader: GTF content
/// - convert_ensembl_ucsc: prepend `chr` to chromosome names lacking it
///
pub fn read_gtf_genes<R: BufRead>(
    reader: R,
    convert_ensembl_ucsc: bool,
) -> Result<Vec<(Region, Strand)>> {
    let mut genes = Vec::new();

    for (i, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| AssocError::AnnotationParse {
            line: i + 1,
            detail: e.to_string(),
        })?;
        if line.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 9 || fields[2] != "gene" {
            continue;
        }

        let parse = |raw: &str, what: &str| {
            raw.parse::<u32>().map_err(|e| AssocError::AnnotationParse {
                line: i + 1,
                detail: format!("{what} '{raw}': {e}"),
            })
        };
        let start = parse(fields[3], "start")?.saturating_sub(1);
        let end = parse(fields[4], "end")?;

        let mut chr = fields[0].to_string();
        if convert_ensembl_ucsc && !chr.starts_with("chr") {
            chr = format!("chr{chr}");
        }

        let strand = Strand::from_char(fields[6].chars().next().unwrap_or('.'));
        let name = gtf_attribute(fields[8], "gene_name").map(String::from);

        genes.push((
            Region {
                chr,
                start,
                end,
                rest: name,
            },
            strand,
        ));
    }

    Ok(genes)
}

/// Promoters derived from a (possibly gzipped, possibly remote) GTF gene annotation.
#[derive(Debug, Clone)]
pub struct GtfPromoterSource {
    pub location: String,
    pub window: PromoterWindow,
    pub convert_ensembl_ucsc: bool,
}

impl GtfPromoterSource {
    pub fn new(location: &str, window: PromoterWindow) -> Self {
        GtfPromoterSource {
            location: location.to_string(),
            window,
            convert_ensembl_ucsc: true,
        }
    }

    fn unavailable(&self, reason: impl ToString) -> AssocError {
        AssocError::AnnotationUnavailable {
            location: self.location.clone(),
            reason: reason.to_string(),
        }
    }
}

impl PromoterSource for GtfPromoterSource {
    fn promoters(&self) -> Result<RegionSet> {
        let genes = if is_url(&self.location) {
            let reader = get_dynamic_reader_from_url(&self.location)
                .map_err(|e| self.unavailable(format!("{e:#}")))?;
            read_gtf_genes(reader, self.convert_ensembl_ucsc)?
        } else {
            let reader = get_dynamic_reader(Path::new(&self.location))
                .map_err(|e| self.unavailable(format!("{e:#}")))?;
            read_gtf_genes(reader, self.convert_ensembl_ucsc)?
        };

        if genes.is_empty() {
            return Err(AssocError::EmptyAnnotation(self.location.clone()));
        }
        let unnamed = genes.iter().filter(|(g, _)| g.rest.is_none()).count();
        log::info!(
            "{} genes in {} ({unnamed} without gene_name)",
            genes.len(),
            self.location
        );

        let promoters: Vec<Region> = genes
            .iter()
            .map(|(gene, strand)| self.window.promoter(gene, *strand))
            .collect();
        Ok(RegionSet::from(promoters))
    }

    fn describe(&self) -> String {
        format!(
            "GTF {} (-{}/+{} bp)",
            self.location, self.window.upstream, self.window.downstream
        )
    }
}

/// Ready-made promoter regions from a BED file whose name column holds the gene symbol.
#[derive(Debug, Clone)]
pub struct BedPromoterSource {
    pub path: PathBuf,
}

impl PromoterSource for BedPromoterSource {
    fn promoters(&self) -> Result<RegionSet> {
        RegionSet::try_from(self.path.as_path()).map_err(|e| AssocError::AnnotationUnavailable {
            location: self.path.display().to_string(),
            reason: e.to_string(),
        })
    }

    fn describe(&self) -> String {
        format!("BED {}", self.path.display())
    }
}
