use methsil_io::LoadError;
use methsil_overlaprs::OverlapError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AssocError {
    #[error("Cannot read gene annotation {location}: {reason}")]
    AnnotationUnavailable { location: String, reason: String },

    #[error("Malformed annotation line {line}: {detail}")]
    AnnotationParse { line: usize, detail: String },

    #[error("Annotation {0} contains no genes")]
    EmptyAnnotation(String),

    #[error(transparent)]
    Overlap(#[from] OverlapError),

    #[error(transparent)]
    Table(#[from] LoadError),

    #[error("Need at least one quantile bin")]
    NoBins,
}

pub type Result<T> = std::result::Result<T, AssocError>;
