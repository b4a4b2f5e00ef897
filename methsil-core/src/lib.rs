//! Core models shared by every methsil crate.
//!
//! Genomic coordinates follow the BED convention throughout the workspace: 0-based,
//! start inclusive, end exclusive.
//!
//! ```rust
//! use methsil_core::models::{Region, RegionSet};
//!
//! let rs = RegionSet::from(vec![
//!     Region { chr: "chr1".to_string(), start: 100, end: 200, rest: None },
//!     Region { chr: "chr2".to_string(), start: 50, end: 80, rest: None },
//! ]);
//! assert_eq!(rs.len(), 2);
//! ```
pub mod errors;
pub mod models;
pub mod utils;

pub use errors::RegionSetError;
