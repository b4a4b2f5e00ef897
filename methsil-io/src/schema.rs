//! Column layouts of every table the pipeline reads.
//!
//! Columns are positional: the supplementary tables either carry no header at all or carry
//! one whose names are not stable across releases, so each source gets a schema declared here
//! and every row is checked against it at load time.

use std::fmt::{self, Display};
use std::str::FromStr;

use crate::error::LoadError;

/// Missing-value marker used by the methylation tables.
pub const NO_DATA: &str = "noData";

/// Default name of the twelfth UMR column.
pub const DEFAULT_UMR_GENEBODY_COLUMN: &str = "genebody_classification";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TableId {
    Umrs,
    Dmrs,
    BindingSites,
    PromoterMethylation,
    Counts,
}

impl TableId {
    pub const ALL: [TableId; 5] = [
        TableId::Umrs,
        TableId::Dmrs,
        TableId::BindingSites,
        TableId::PromoterMethylation,
        TableId::Counts,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TableId::Umrs => "umrs",
            TableId::Dmrs => "dmrs",
            TableId::BindingSites => "binding_sites",
            TableId::PromoterMethylation => "promoter_methylation",
            TableId::Counts => "counts",
        }
    }

    /// File name inside the data directory when no source entry overrides it.
    pub fn default_file_name(&self) -> &'static str {
        match self {
            TableId::Umrs => "umrs.tsv",
            TableId::Dmrs => "dmrs.tsv",
            TableId::BindingSites => "binding_sites.csv",
            TableId::PromoterMethylation => "promoter_methylation.csv",
            TableId::Counts => "counts.tsv.gz",
        }
    }
}

impl Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TableId {
    type Err = LoadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TableId::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| LoadError::UnknownTable(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    /// Non-negative integer, e.g. a coordinate or a CpG count.
    Integer,
    /// Floating point; `noData` and empty cells load as NaN.
    Float,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: String,
    pub kind: ColumnKind,
}

impl ColumnSpec {
    pub fn new(name: &str, kind: ColumnKind) -> Self {
        ColumnSpec {
            name: name.to_string(),
            kind,
        }
    }
}

/// What follows the leading `#` comment block of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderPolicy {
    /// Data starts right away.
    None,
    /// One header line. Its field count must match the schema; its names are compared too
    /// when `check_names` is set.
    Line { check_names: bool },
}

/// How the row label of a loaded table is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowLabel {
    /// `chr:start-end`
    Locus,
    /// value of the named text column
    Column(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableSchema {
    pub id: TableId,
    pub delimiter: u8,
    pub header: HeaderPolicy,
    pub columns: Vec<ColumnSpec>,
    pub label: RowLabel,
}

impl TableSchema {
    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }
}

use ColumnKind::{Float, Integer, Text};

fn columns(specs: &[(&str, ColumnKind)]) -> Vec<ColumnSpec> {
    specs
        .iter()
        .map(|(name, kind)| ColumnSpec::new(name, *kind))
        .collect()
}

///
/// Unmethylated regions: twelve tab-separated columns, no header.
///
/// # Arguments
/// - genebody_column: name given to the twelfth column
pub fn umrs_schema(genebody_column: &str) -> TableSchema {
    TableSchema {
        id: TableId::Umrs,
        delimiter: b'\t',
        header: HeaderPolicy::None,
        columns: columns(&[
            ("chr", Text),
            ("start", Integer),
            ("end", Integer),
            ("umr_id", Text),
            ("n_cpg", Integer),
            ("mC_control", Float),
            ("mC_treated", Float),
            ("delta_mC", Float),
            ("nearest_gene", Text),
            ("tss_distance", Float),
            ("promoter_classification", Text),
            (genebody_column, Text),
        ]),
        label: RowLabel::Column("umr_id".to_string()),
    }
}

/// Differentially methylated regions: tab-separated behind a `#` header.
pub fn dmrs_schema() -> TableSchema {
    TableSchema {
        id: TableId::Dmrs,
        delimiter: b'\t',
        header: HeaderPolicy::None,
        columns: columns(&[
            ("chr", Text),
            ("start", Integer),
            ("end", Integer),
            ("n_cpg", Integer),
            ("mC_control", Float),
            ("mC_treated", Float),
        ]),
        label: RowLabel::Locus,
    }
}

/// Binding-site peaks: comma-separated with a header line.
pub fn binding_sites_schema() -> TableSchema {
    TableSchema {
        id: TableId::BindingSites,
        delimiter: b',',
        header: HeaderPolicy::Line { check_names: false },
        columns: columns(&[
            ("chr", Text),
            ("start", Integer),
            ("end", Integer),
            ("peak_id", Text),
            ("score", Float),
        ]),
        label: RowLabel::Locus,
    }
}

/// Promoter methylation per gene: comma-separated with a header line.
pub fn promoter_methylation_schema() -> TableSchema {
    TableSchema {
        id: TableId::PromoterMethylation,
        delimiter: b',',
        header: HeaderPolicy::Line { check_names: false },
        columns: columns(&[
            ("gene", Text),
            ("chr", Text),
            ("start", Integer),
            ("end", Integer),
            ("n_cpg", Integer),
            ("mC_control", Float),
            ("mC_treated", Float),
        ]),
        label: RowLabel::Column("gene".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[rstest]
    #[case("umrs", TableId::Umrs)]
    #[case("binding_sites", TableId::BindingSites)]
    #[case("counts", TableId::Counts)]
    fn test_table_id_from_str(#[case] s: &str, #[case] id: TableId) {
        assert_eq!(s.parse::<TableId>().unwrap(), id);
        assert_eq!(id.to_string(), s);
    }

    #[rstest]
    fn test_unknown_table_id() {
        assert!(matches!(
            "figure5".parse::<TableId>(),
            Err(LoadError::UnknownTable(_))
        ));
    }

    #[rstest]
    fn test_umr_genebody_column_is_configurable() {
        let schema = umrs_schema("gb_class");
        assert_eq!(schema.columns.len(), 12);
        assert_eq!(schema.position("gb_class"), Some(11));
        assert_eq!(schema.position(DEFAULT_UMR_GENEBODY_COLUMN), None);
    }
}
