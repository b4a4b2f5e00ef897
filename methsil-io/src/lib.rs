//! Input side of methsil: a local cache of the downloaded sources and schema-validated
//! loading of the supplementary tables and the RNA-seq count matrix.
//!
//! ```rust,no_run
//! use std::collections::BTreeMap;
//! use methsil_io::{SourceCache, TableLoader, TableId, TablesConfig};
//!
//! let cache = SourceCache::builder().finish().unwrap();
//! let loader = TableLoader::new(cache, BTreeMap::new(), TablesConfig::default());
//! let umrs = loader.load(TableId::Umrs).unwrap();
//! println!("{} UMRs", umrs.len());
//! ```
pub mod cache;
pub mod config;
pub mod counts;
pub mod error;
pub mod loader;
pub mod schema;
pub mod table;

pub use cache::SourceCache;
pub use config::{Source, SourceConfig, TablesConfig};
pub use counts::CountMatrix;
pub use error::LoadError;
pub use loader::TableLoader;
pub use schema::TableId;
pub use table::{Column, Table};
