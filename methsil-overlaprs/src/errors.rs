use thiserror::Error;

#[derive(Debug, Error)]
pub enum OverlapError {
    /// A region whose start lies after its end cannot take part in a join.
    #[error("Inverted region in {set} set: {locus}")]
    InvertedRegion { set: &'static str, locus: String },
}
