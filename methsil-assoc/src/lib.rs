//! # methsil-assoc
//!
//! Links methylation regions to genes and summarises the expression change of those genes.
//!
//! - [`promoters`]: promoter regions from a GTF gene annotation (or a BED file)
//! - [`associate`](associate::associate): nearest-promoter join of a region table with the
//!   differential expression results, one row per gene
//! - [`binning`]: fold-change bins and effect classes of the associated rows
//! - [`quantile_bin`]: equal-count bins of the A-value
pub mod associate;
pub mod binning;
pub mod errors;
pub mod models;
pub mod promoters;
pub mod quantile;

pub use associate::{AssociationParams, Associations, DeltaSource, DropCounts};
pub use binning::{BinScheme, Classification, EffectClass, classify, classify_with};
pub use errors::AssocError;
pub use models::RegionGeneAssociation;
pub use promoters::{BedPromoterSource, GtfPromoterSource, PromoterSource, PromoterWindow};
pub use quantile::quantile_bin;
