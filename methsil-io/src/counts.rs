use std::io::Read;

use fxhash::{FxHashMap, FxHashSet};

use crate::error::{LoadError, Result};
use crate::loader::{delimited_reader, line_of};

/// RNA-seq read counts, one row per gene and one column per sample.
#[derive(Debug, Clone, PartialEq)]
pub struct CountMatrix {
    pub genes: Vec<String>,
    pub samples: Vec<String>,
    /// `counts[gene][sample]`
    pub counts: Vec<Vec<u64>>,
}

impl CountMatrix {
    pub fn new(genes: Vec<String>, samples: Vec<String>, counts: Vec<Vec<u64>>) -> Result<Self> {
        let bad_row = counts
            .iter()
            .position(|row| row.len() != samples.len())
            .or((counts.len() != genes.len()).then_some(counts.len()));
        if let Some(row) = bad_row {
            return Err(LoadError::SchemaMismatch {
                table: "counts".to_string(),
                detail: format!(
                    "row {row} does not fit {} genes x {} samples",
                    genes.len(),
                    samples.len()
                ),
            });
        }
        Ok(CountMatrix {
            genes,
            samples,
            counts,
        })
    }

    pub fn n_genes(&self) -> usize {
        self.genes.len()
    }

    pub fn n_samples(&self) -> usize {
        self.samples.len()
    }

    /// A matrix restricted to the given sample columns, in the given order.
    pub fn select_samples(&self, columns: &[usize]) -> CountMatrix {
        CountMatrix {
            genes: self.genes.clone(),
            samples: columns.iter().map(|&j| self.samples[j].clone()).collect(),
            counts: self
                .counts
                .iter()
                .map(|row| columns.iter().map(|&j| row[j]).collect())
                .collect(),
        }
    }
}

fn parse_count(raw: &str) -> Option<u64> {
    let value: f64 = raw.parse().ok()?;
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    Some(value.round() as u64)
}

///
/// Parse a tab-separated count matrix.
///
/// The first line names the samples; it may or may not carry a name for the gene column.
/// Rows with a non-numeric or negative count are dropped, every row of a gene label that
/// occurs more than once is dropped, and rows that are zero in every sample are dropped.
///
pub fn parse_counts<R: Read>(reader: R) -> Result<CountMatrix> {
    let mismatch = |detail: String| LoadError::SchemaMismatch {
        table: "counts".to_string(),
        detail,
    };

    let mut records = delimited_reader(reader, b'\t').into_records();
    let header = records
        .next()
        .transpose()?
        .ok_or_else(|| mismatch("empty count matrix".to_string()))?;

    // malformed rows stay as `None` so they still count towards duplicated labels
    let mut rows: Vec<(String, Option<Vec<u64>>)> = Vec::new();
    let mut samples: Option<Vec<String>> = None;
    let mut non_numeric = 0usize;

    for record in records {
        let record = record?;
        let line = line_of(&record);

        // header without a gene column name has one field less than the data rows
        let samples = samples.get_or_insert_with(|| {
            let skip = if record.len() == header.len() { 1 } else { 0 };
            header.iter().skip(skip).map(String::from).collect()
        });
        if record.len() != samples.len() + 1 {
            return Err(mismatch(format!(
                "line {line} has {} fields, expected {}",
                record.len(),
                samples.len() + 1
            )));
        }

        let gene = record.get(0).unwrap_or_default().to_string();
        let values: Option<Vec<u64>> = record.iter().skip(1).map(parse_count).collect();
        if values.is_none() {
            log::warn!("counts: dropping line {line} ({gene}), not every field is a count");
            non_numeric += 1;
        }
        rows.push((gene, values));
    }

    let samples = samples.unwrap_or_else(|| header.iter().skip(1).map(String::from).collect());

    let mut occurrences: FxHashMap<&str, usize> = FxHashMap::default();
    for (gene, _) in rows.iter() {
        *occurrences.entry(gene.as_str()).or_default() += 1;
    }
    let duplicated: FxHashSet<String> = occurrences
        .iter()
        .filter(|(_, n)| **n > 1)
        .map(|(g, _)| g.to_string())
        .collect();

    let mut duplicate_rows = 0usize;
    let mut zero_rows = 0usize;
    let mut genes = Vec::with_capacity(rows.len());
    let mut counts = Vec::with_capacity(rows.len());
    for (gene, values) in rows {
        if duplicated.contains(&gene) {
            duplicate_rows += 1;
            continue;
        }
        let Some(values) = values else {
            continue;
        };
        if values.iter().all(|&v| v == 0) {
            zero_rows += 1;
            continue;
        }
        genes.push(gene);
        counts.push(values);
    }

    if !duplicated.is_empty() {
        log::warn!(
            "counts: removed {duplicate_rows} rows of {} duplicated gene labels",
            duplicated.len()
        );
    }
    log::info!(
        "counts: kept {} genes x {} samples ({non_numeric} malformed, {zero_rows} all-zero rows dropped)",
        genes.len(),
        samples.len()
    );

    CountMatrix::new(genes, samples, counts)
}
