//! Region overlap joins for methsil.
//!
//! This crate holds every interval computation of the pipeline: the per-chromosome
//! [`AIList`] index, the genome-wide [`MultiChromOverlapper`](multi_chrom_overlapper::MultiChromOverlapper),
//! and the two joins used downstream, [`overlap_fraction`] and [`nearest_distance`].
//!
//! ## Quick Start
//!
//! ```rust
//! use methsil_core::models::{Region, RegionSet};
//! use methsil_overlaprs::{nearest_distance, overlap_fraction};
//!
//! let umrs = RegionSet::from(vec![
//!     Region { chr: "chr1".to_string(), start: 100, end: 200, rest: None },
//!     Region { chr: "chr1".to_string(), start: 900, end: 950, rest: None },
//! ]);
//! let peaks = RegionSet::from(vec![
//!     Region { chr: "chr1".to_string(), start: 150, end: 160, rest: None },
//! ]);
//!
//! assert_eq!(overlap_fraction(&umrs, &peaks).unwrap(), 0.5);
//!
//! let hits = nearest_distance(&umrs, &peaks).unwrap();
//! assert_eq!(hits[1].map(|h| h.distance), Some(740));
//! ```

/// Augmented Interval List implementation.
///
/// See [`AIList`] for details.
pub mod ailist;

pub mod errors;
pub mod joins;

/// Genome-wide interval indexing.
pub mod multi_chrom_overlapper;

pub mod nearest;

/// Core traits for overlap operations.
///
/// See [`Overlapper`] for the main trait.
pub mod traits;

// re-exports
pub use self::ailist::AIList;
pub use self::errors::OverlapError;
pub use self::joins::{nearest_distance, overlap_fraction};
pub use self::nearest::{NearestHit, NearestIndex};
pub use self::traits::{Interval, Overlapper};
