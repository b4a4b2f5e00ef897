use thiserror::Error;

use crate::grouping::Group;

#[derive(Debug, Error)]
pub enum DeError {
    #[error("No samples were assigned to the {0} group")]
    EmptyGroup(Group),

    #[error("Invalid sample pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("Need at least one replicate beyond the two groups, found {0} samples")]
    NoReplicates(usize),

    #[error("No gene has a non-zero count in every sample; size factors are undefined")]
    NoSizeFactorGenes,
}

pub type Result<T> = std::result::Result<T, DeError>;
