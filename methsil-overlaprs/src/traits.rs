use num_traits::{PrimInt, Unsigned};

pub use methsil_core::models::Interval;

/// A single-chromosome interval index answering half-open overlap queries.
pub trait Overlapper<I, T>: Send + Sync
where
    I: PrimInt + Unsigned + Send + Sync,
    T: Eq + Clone + Send + Sync,
{
    fn build(intervals: Vec<Interval<I, T>>) -> Self
    where
        Self: Sized;

    /// All stored intervals sharing at least one position with `[start, end)`.
    fn find(&self, start: I, end: I) -> Vec<Interval<I, T>>;

    fn find_iter<'a>(
        &'a self,
        start: I,
        end: I,
    ) -> Box<dyn Iterator<Item = &'a Interval<I, T>> + 'a>;

    /// Cheaper than `find` when only existence matters.
    fn any_overlap(&self, start: I, end: I) -> bool {
        self.find_iter(start, end).next().is_some()
    }
}
