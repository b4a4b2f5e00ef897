use std::path::Path;

use anyhow::{Context, Result};
use csv::WriterBuilder;
use serde::Serialize;

///
/// Write serializable rows as a tab-separated file with a header line.
///
/// Returns the number of rows written. Missing values (`None`) become empty cells.
///
pub fn write_tsv<T, I>(path: &Path, rows: I) -> Result<usize>
where
    T: Serialize,
    I: IntoIterator<Item = T>,
{
    let mut writer = WriterBuilder::new()
        .delimiter(b'\t')
        .from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    let mut n = 0;
    for row in rows {
        writer
            .serialize(row)
            .with_context(|| format!("Failed to write row {} of {}", n + 1, path.display()))?;
        n += 1;
    }
    writer.flush()?;
    log::info!("wrote {n} rows to {}", path.display());
    Ok(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::*;
    use std::fs;

    #[derive(Serialize)]
    struct Row {
        gene: &'static str,
        base_mean: f64,
        p_adjusted: Option<f64>,
    }

    #[rstest]
    fn test_write_tsv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rows.tsv");
        let rows = [
            Row { gene: "A", base_mean: 10.5, p_adjusted: Some(0.01) },
            Row { gene: "B", base_mean: 3.0, p_adjusted: None },
        ];
        assert_eq!(write_tsv(&path, &rows).unwrap(), 2);
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "gene\tbase_mean\tp_adjusted\nA\t10.5\t0.01\nB\t3.0\t\n"
        );
    }
}
