use std::collections::BTreeMap;
use std::io::Read;

use csv::{ReaderBuilder, StringRecord, Trim};

use crate::cache::SourceCache;
use crate::config::{Source, SourceConfig, TablesConfig};
use crate::counts::{CountMatrix, parse_counts};
use crate::error::{LoadError, Result};
use crate::schema::{
    ColumnKind, HeaderPolicy, NO_DATA, RowLabel, TableId, TableSchema, binding_sites_schema,
    dmrs_schema, promoter_methylation_schema, umrs_schema,
};
use crate::table::{Column, Table};
use methsil_core::utils::get_dynamic_reader;

/// Build a csv reader for one of our delimited sources.
///
/// Lines starting with `#` are comments; field counts are checked by the caller.
pub(crate) fn delimited_reader<R: Read>(reader: R, delimiter: u8) -> csv::Reader<R> {
    ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .comment(Some(b'#'))
        .trim(Trim::All)
        .from_reader(reader)
}

pub(crate) fn line_of(record: &StringRecord) -> u64 {
    record.position().map(|p| p.line()).unwrap_or_default()
}

fn normalise_header(name: &str) -> String {
    name.trim_matches('"').trim().to_lowercase()
}

enum Cell {
    Text(String),
    Integer(u32),
    Float(f64),
}

fn parse_cell(raw: &str, kind: ColumnKind) -> Option<Cell> {
    match kind {
        ColumnKind::Text => Some(Cell::Text(raw.to_string())),
        ColumnKind::Integer => raw.parse::<u32>().ok().map(Cell::Integer),
        ColumnKind::Float => match raw {
            NO_DATA | "" | "NA" => Some(Cell::Float(f64::NAN)),
            _ => raw.parse::<f64>().ok().map(Cell::Float),
        },
    }
}

///
/// Parse a delimited table according to `schema`.
///
/// Rows whose numeric cells do not parse (a stray `$`, say) and rows with `start > end` are
/// dropped and logged. A row with the wrong number of fields, or a header line that does not
/// fit the schema, is a [`LoadError::SchemaMismatch`].
///
/// # Arguments
/// - reader: the raw (already decompressed) content
/// - schema: column layout of the table
///
pub fn parse_table<R: Read>(reader: R, schema: &TableSchema) -> Result<Table> {
    let table = schema.id.as_str();
    let mismatch = |detail: String| LoadError::SchemaMismatch {
        table: table.to_string(),
        detail,
    };

    let mut records = delimited_reader(reader, schema.delimiter).into_records();

    if let HeaderPolicy::Line { check_names } = schema.header {
        let header = records
            .next()
            .transpose()?
            .ok_or_else(|| mismatch("missing header line".to_string()))?;
        if header.len() != schema.columns.len() {
            return Err(mismatch(format!(
                "header has {} fields, expected {}",
                header.len(),
                schema.columns.len()
            )));
        }
        let found: Vec<String> = header.iter().map(normalise_header).collect();
        let expected: Vec<String> = schema.names().iter().map(|n| normalise_header(n)).collect();
        if check_names && found != expected {
            return Err(mismatch(format!(
                "header {:?} does not match {:?}",
                found, expected
            )));
        }
        log::debug!("{table}: header {:?}", found);
    }

    let mut columns: Vec<Column> = schema.columns.iter().map(|c| Column::empty(c.kind)).collect();
    let mut labels: Vec<String> = Vec::new();
    let mut dropped_symbols = 0usize;
    let mut dropped_inverted = 0usize;

    let start_col = schema.position("start");
    let end_col = schema.position("end");

    'rows: for record in records {
        let record = record?;
        if record.iter().all(|f| f.is_empty()) {
            continue;
        }
        let line = line_of(&record);
        if record.len() != schema.columns.len() {
            return Err(mismatch(format!(
                "line {line} has {} fields, expected {}",
                record.len(),
                schema.columns.len()
            )));
        }

        let mut cells = Vec::with_capacity(record.len());
        for (raw, spec) in record.iter().zip(schema.columns.iter()) {
            match parse_cell(raw, spec.kind) {
                Some(cell) => cells.push(cell),
                None => {
                    log::warn!(
                        "{table}: dropping line {line}, '{raw}' is not a valid {} value",
                        spec.name
                    );
                    dropped_symbols += 1;
                    continue 'rows;
                }
            }
        }

        if let (Some(s), Some(e)) = (start_col, end_col) {
            if let (Cell::Integer(start), Cell::Integer(end)) = (&cells[s], &cells[e]) {
                if start > end {
                    log::warn!("{table}: dropping line {line}, start {start} > end {end}");
                    dropped_inverted += 1;
                    continue;
                }
            }
        }

        let label = match &schema.label {
            RowLabel::Locus => format!(
                "{}:{}-{}",
                record.get(schema.position("chr").unwrap_or(0)).unwrap_or_default(),
                start_col.and_then(|i| record.get(i)).unwrap_or_default(),
                end_col.and_then(|i| record.get(i)).unwrap_or_default(),
            ),
            RowLabel::Column(name) => schema
                .position(name)
                .and_then(|i| record.get(i))
                .unwrap_or_default()
                .to_string(),
        };
        labels.push(label);

        for (column, cell) in columns.iter_mut().zip(cells) {
            match (column, cell) {
                (Column::Text(v), Cell::Text(x)) => v.push(x),
                (Column::Integer(v), Cell::Integer(x)) => v.push(x),
                (Column::Float(v), Cell::Float(x)) => v.push(x),
                _ => unreachable!("cells are parsed with the column kind"),
            }
        }
    }

    if dropped_symbols + dropped_inverted > 0 {
        log::info!(
            "{table}: dropped {dropped_symbols} rows with non-numeric values and {dropped_inverted} inverted regions"
        );
    }
    log::info!("{table}: loaded {} rows", labels.len());

    let named = schema
        .columns
        .iter()
        .map(|c| c.name.clone())
        .zip(columns)
        .collect();
    Table::new(table, labels, named)
}

///
/// Loads the pipeline's tables by identifier, fetching them through a [`SourceCache`].
///
pub struct TableLoader {
    cache: SourceCache,
    sources: BTreeMap<String, SourceConfig>,
    tables: TablesConfig,
}

impl TableLoader {
    pub fn new(
        cache: SourceCache,
        sources: BTreeMap<String, SourceConfig>,
        tables: TablesConfig,
    ) -> Self {
        TableLoader {
            cache,
            sources,
            tables,
        }
    }

    pub fn cache(&self) -> &SourceCache {
        &self.cache
    }

    /// The declared schema of a region table. The count matrix has none.
    pub fn schema(&self, id: TableId) -> Result<TableSchema> {
        match id {
            TableId::Umrs => Ok(umrs_schema(&self.tables.umr_genebody_column)),
            TableId::Dmrs => Ok(dmrs_schema()),
            TableId::BindingSites => Ok(binding_sites_schema()),
            TableId::PromoterMethylation => Ok(promoter_methylation_schema()),
            TableId::Counts => Err(LoadError::UnknownTable(format!(
                "{id} has sample-dependent columns; use load_counts"
            ))),
        }
    }

    pub fn source(&self, id: TableId) -> Source {
        self.sources
            .get(id.as_str())
            .cloned()
            .unwrap_or_default()
            .resolve(id.as_str(), id.default_file_name())
    }

    ///
    /// Load one of the region tables.
    ///
    /// # Arguments
    /// - id: which table
    ///
    pub fn load(&self, id: TableId) -> Result<Table> {
        let schema = self.schema(id)?;
        let path = self.cache.ensure(&self.source(id))?;
        let reader = get_dynamic_reader(&path).map_err(|e| LoadError::SourceUnavailable {
            id: id.to_string(),
            reason: e.to_string(),
        })?;
        parse_table(reader, &schema)
    }

    /// Load and clean the RNA-seq count matrix.
    pub fn load_counts(&self) -> Result<CountMatrix> {
        let path = self.cache.ensure(&self.source(TableId::Counts))?;
        let reader = get_dynamic_reader(&path).map_err(|e| LoadError::SourceUnavailable {
            id: TableId::Counts.to_string(),
            reason: e.to_string(),
        })?;
        parse_counts(reader)
    }
}
