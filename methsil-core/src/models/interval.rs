// https://github.com/sstadick/rust-lapper/blob/7e3904daed85181f1faa39b15f51935f13945976/src/lib.rs#L92
use num_traits::{identities::zero, PrimInt, Unsigned};
use std::cmp::Ordering::{self};

/// Represent a range from [start, end)
/// Inclusive start, exclusive of end
#[derive(Eq, Debug, Clone)]
pub struct Interval<I, T>
where
    I: PrimInt + Unsigned + Send + Sync,
    T: Eq + Clone + Send + Sync,
{
    pub start: I,
    pub end: I,
    pub val: T,
}

impl<I, T> Ord for Interval<I, T>
where
    I: PrimInt + Unsigned + Send + Sync,
    T: Eq + Clone + Send + Sync,
{
    #[inline]
    fn cmp(&self, other: &Interval<I, T>) -> Ordering {
        self.start
            .cmp(&other.start)
            .then_with(|| self.end.cmp(&other.end))
    }
}

impl<I, T> Interval<I, T>
where
    I: PrimInt + Unsigned + Send + Sync,
    T: Eq + Clone + Send + Sync,
{
    /// Number of bases shared by two intervals (0 when disjoint).
    #[inline]
    pub fn intersect(&self, other: &Interval<I, T>) -> I {
        std::cmp::min(self.end, other.end)
            .checked_sub(&std::cmp::max(self.start, other.start))
            .unwrap_or_else(zero::<I>)
    }

    /// Check if the interval shares at least one base with `[start, end)`
    #[inline]
    pub fn overlap(&self, start: I, end: I) -> bool {
        self.start < end && self.end > start
    }

    /// Number of bases between two intervals, 0 when they overlap or abut.
    #[inline]
    pub fn gap(&self, start: I, end: I) -> I {
        if self.end <= start {
            start - self.end
        } else if end <= self.start {
            self.start - end
        } else {
            zero::<I>()
        }
    }
}

impl<I, T> PartialOrd for Interval<I, T>
where
    I: PrimInt + Unsigned + Send + Sync,
    T: Eq + Clone + Send + Sync,
{
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<I, T> PartialEq for Interval<I, T>
where
    I: PrimInt + Unsigned + Send + Sync,
    T: Eq + Clone + Send + Sync,
{
    #[inline]
    fn eq(&self, other: &Interval<I, T>) -> bool {
        self.start == other.start && self.end == other.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::*;

    fn iv(start: u32, end: u32) -> Interval<u32, ()> {
        Interval { start, end, val: () }
    }

    #[rstest]
    #[case(iv(10, 20), iv(15, 30), 5)]
    #[case(iv(10, 20), iv(20, 30), 0)]
    #[case(iv(10, 20), iv(0, 100), 10)]
    fn test_intersect(#[case] a: Interval<u32, ()>, #[case] b: Interval<u32, ()>, #[case] n: u32) {
        assert_eq!(a.intersect(&b), n);
        assert_eq!(b.intersect(&a), n);
    }

    #[rstest]
    #[case(20, 30, 0)]
    #[case(25, 30, 5)]
    #[case(0, 4, 6)]
    #[case(12, 14, 0)]
    fn test_gap(#[case] start: u32, #[case] end: u32, #[case] gap: u32) {
        assert_eq!(iv(10, 20).gap(start, end), gap);
    }

    #[rstest]
    fn test_overlap_is_half_open() {
        assert!(iv(10, 20).overlap(19, 25));
        assert!(!iv(10, 20).overlap(20, 25));
    }
}
