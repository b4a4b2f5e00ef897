use serde::{Deserialize, Serialize};

use crate::schema::DEFAULT_UMR_GENEBODY_COLUMN;

/// One `[sources.<id>]` entry of the pipeline configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourceConfig {
    /// File name inside the data directory; a built-in default is used when unset.
    pub file_name: Option<String>,
    pub url: Option<String>,
    /// Gunzip the download next to the archive and read the decompressed copy.
    pub decompress: bool,
}

impl SourceConfig {
    pub fn resolve(&self, id: &str, default_file_name: &str) -> Source {
        Source {
            id: id.to_string(),
            file_name: self
                .file_name
                .clone()
                .unwrap_or_else(|| default_file_name.to_string()),
            url: self.url.clone().filter(|u| !u.trim().is_empty()),
            decompress: self.decompress,
        }
    }
}

/// A fully resolved input source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    pub id: String,
    pub file_name: String,
    pub url: Option<String>,
    pub decompress: bool,
}

/// The `[tables]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TablesConfig {
    /// Name of the twelfth column of the UMR table.
    pub umr_genebody_column: String,
}

impl Default for TablesConfig {
    fn default() -> Self {
        TablesConfig {
            umr_genebody_column: DEFAULT_UMR_GENEBODY_COLUMN.to_string(),
        }
    }
}
