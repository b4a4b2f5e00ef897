use methsil_core::models::{Region, RegionSet};

use crate::error::{LoadError, Result};
use crate::schema::ColumnKind;

/// Values of one table column.
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Text(Vec<String>),
    Integer(Vec<u32>),
    /// NaN marks a missing value.
    Float(Vec<f64>),
}

impl Column {
    pub fn empty(kind: ColumnKind) -> Self {
        match kind {
            ColumnKind::Text => Column::Text(Vec::new()),
            ColumnKind::Integer => Column::Integer(Vec::new()),
            ColumnKind::Float => Column::Float(Vec::new()),
        }
    }

    pub fn kind(&self) -> ColumnKind {
        match self {
            Column::Text(_) => ColumnKind::Text,
            Column::Integer(_) => ColumnKind::Integer,
            Column::Float(_) => ColumnKind::Float,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Column::Text(v) => v.len(),
            Column::Integer(v) => v.len(),
            Column::Float(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

///
/// A row-labeled, column-typed table.
///
/// Columns are fixed once the table is built.
///
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub name: String,
    pub row_labels: Vec<String>,
    names: Vec<String>,
    columns: Vec<Column>,
}

impl Table {
    pub fn new(name: &str, row_labels: Vec<String>, columns: Vec<(String, Column)>) -> Result<Self> {
        let (names, columns): (Vec<String>, Vec<Column>) = columns.into_iter().unzip();
        if let Some((n, c)) = names
            .iter()
            .zip(columns.iter())
            .find(|(_, c)| c.len() != row_labels.len())
        {
            return Err(LoadError::SchemaMismatch {
                table: name.to_string(),
                detail: format!(
                    "column '{n}' has {} values for {} rows",
                    c.len(),
                    row_labels.len()
                ),
            });
        }
        Ok(Table {
            name: name.to_string(),
            row_labels,
            names,
            columns,
        })
    }

    pub fn len(&self) -> usize {
        self.row_labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.row_labels.is_empty()
    }

    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| &self.columns[i])
    }

    fn missing(&self, column: &str) -> LoadError {
        LoadError::MissingColumn {
            table: self.name.clone(),
            column: column.to_string(),
        }
    }

    pub fn text(&self, name: &str) -> Result<&[String]> {
        match self.column(name) {
            Some(Column::Text(v)) => Ok(v),
            _ => Err(self.missing(name)),
        }
    }

    pub fn integers(&self, name: &str) -> Result<&[u32]> {
        match self.column(name) {
            Some(Column::Integer(v)) => Ok(v),
            _ => Err(self.missing(name)),
        }
    }

    pub fn floats(&self, name: &str) -> Result<&[f64]> {
        match self.column(name) {
            Some(Column::Float(v)) => Ok(v),
            _ => Err(self.missing(name)),
        }
    }

    ///
    /// Regions of a table carrying `chr`, `start` and `end` columns, in row order.
    ///
    /// The row label goes into `rest`, so region `i` always refers back to row `i`.
    ///
    pub fn to_region_set(&self) -> Result<RegionSet> {
        let chrs = self.text("chr")?;
        let starts = self.integers("start")?;
        let ends = self.integers("end")?;

        let regions = (0..self.len())
            .map(|i| Region {
                chr: chrs[i].clone(),
                start: starts[i],
                end: ends[i],
                rest: Some(self.row_labels[i].clone()),
            })
            .collect::<Vec<_>>();

        Ok(RegionSet::from(regions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[fixture]
    fn table() -> Table {
        Table::new(
            "dmrs",
            vec!["r1".to_string(), "r2".to_string(), "r3".to_string()],
            vec![
                (
                    "chr".to_string(),
                    Column::Text(vec!["chr1".into(), "chr1".into(), "chr2".into()]),
                ),
                ("start".to_string(), Column::Integer(vec![10, 50, 5])),
                ("end".to_string(), Column::Integer(vec![20, 60, 9])),
                ("mC_control".to_string(), Column::Float(vec![0.1, f64::NAN, 0.2])),
            ],
        )
        .unwrap()
    }

    #[rstest]
    fn test_typed_access(table: Table) {
        assert_eq!(table.len(), 3);
        assert_eq!(table.integers("start").unwrap(), &[10, 50, 5]);
        assert!(table.floats("mC_control").unwrap()[1].is_nan());
        assert!(matches!(
            table.floats("start"),
            Err(LoadError::MissingColumn { .. })
        ));
    }

    #[rstest]
    fn test_to_region_set(table: Table) {
        let rs = table.to_region_set().unwrap();
        assert_eq!(rs.len(), 3);
        assert_eq!(rs.regions[2].locus(), "chr2:5-9");
        assert_eq!(rs.regions[0].rest.as_deref(), Some("r1"));
    }
}
