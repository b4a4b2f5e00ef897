//! # methsil-de
//!
//! Two-group differential expression on an RNA-seq count matrix.
//!
//! Samples are split into `Control` and `Methylated` by name patterns, normalised by
//! median-of-ratios size factors, and every gene is fitted with a negative-binomial model
//! whose dispersion is shrunk towards a fitted mean-dispersion trend. Fold changes are tested
//! with a Wald test and adjusted with Benjamini-Hochberg after independent filtering on the
//! mean of normalised counts.
//!
//! ```rust,no_run
//! use methsil_de::{DeConfig, DifferentialExpressionRunner};
//! use methsil_io::counts::parse_counts;
//!
//! let counts = parse_counts("gene\tctrl_1\tctrl_2\tdox_1\tdox_2\nA\t10\t12\t40\t44\n".as_bytes()).unwrap();
//! let table = DifferentialExpressionRunner::new(DeConfig::default()).run(&counts).unwrap();
//! for result in &table {
//!     println!("{}\t{:.2}", result.gene, result.log2_fold_change);
//! }
//! ```
pub mod adjust;
pub mod dispersion;
pub mod errors;
pub mod grouping;
pub mod normalization;
pub mod runner;
pub mod wald;

pub use errors::DeError;
pub use grouping::{Group, GroupingConfig, SampleGrouping, assign_groups};
pub use runner::{DeConfig, DifferentialExpressionRunner, ExpressionResult, ExpressionTable};
