use std::mem::swap;
use std::ops::Range;

use num_traits::{PrimInt, Unsigned};

use crate::traits::{Interval, Overlapper};

/// Minimum number of contained successors that pushes an interval into the next sublist.
const MIN_COVERAGE: usize = 10;

/// An Augmented Interval List over the intervals of one chromosome.
///
/// From the following article: <https://academic.oup.com/bioinformatics/article/35/23/4907/5509521>
///
/// Intervals are split into sublists so that long intervals covering many short ones do not
/// degrade the backwards scan. Each sublist is sorted by start and carries a running maximum of
/// ends, which lets a query stop as soon as no earlier interval can reach it.
///
/// ```
/// use methsil_overlaprs::{AIList, Overlapper, Interval};
///
/// let promoters = vec![
///     Interval { start: 1000u32, end: 2000, val: 0usize },
///     Interval { start: 1500, end: 2500, val: 1 },
///     Interval { start: 5000, end: 6000, val: 2 },
/// ];
///
/// let ailist = AIList::build(promoters);
/// assert_eq!(ailist.find(1800, 2200).len(), 2);
/// assert!(!ailist.any_overlap(2500, 5000));
/// ```
#[derive(Debug, Clone)]
pub struct AIList<I, T>
where
    I: PrimInt + Unsigned + Send + Sync,
    T: Eq + Clone + Send + Sync,
{
    starts: Vec<I>,
    ends: Vec<I>,
    max_ends: Vec<I>,
    /// offsets of each sublist into the flat vectors above
    sublist_offsets: Vec<usize>,
    stored_intervals: Vec<Interval<I, T>>,
}

/// Scratch buffers reused across [`AIList::decompose`] rounds.
#[derive(Debug, Default)]
struct Decomposition<I, T>
where
    I: PrimInt + Unsigned + Send + Sync,
    T: Eq + Clone + Send + Sync,
{
    starts: Vec<I>,
    ends: Vec<I>,
    max_ends: Vec<I>,
    kept: Vec<Interval<I, T>>,
    /// intervals deferred to the next sublist
    deferred: Vec<Interval<I, T>>,
}

impl<I, T> Decomposition<I, T>
where
    I: PrimInt + Unsigned + Send + Sync,
    T: Eq + Clone + Send + Sync,
{
    fn with_capacity(cap: usize) -> Self {
        Self {
            starts: Vec::with_capacity(cap),
            ends: Vec::with_capacity(cap),
            max_ends: Vec::with_capacity(cap),
            kept: Vec::with_capacity(cap),
            deferred: Vec::with_capacity(cap),
        }
    }

    fn clear(&mut self) {
        self.starts.clear();
        self.ends.clear();
        self.max_ends.clear();
        self.kept.clear();
        self.deferred.clear();
    }
}

impl<I, T> Overlapper<I, T> for AIList<I, T>
where
    I: PrimInt + Unsigned + Send + Sync,
    T: Eq + Clone + Send + Sync,
{
    fn build(intervals: Vec<Interval<I, T>>) -> Self
    where
        Self: Sized,
    {
        let mut intervals = intervals;
        intervals.sort_by_key(|iv| iv.start);

        let mut starts = Vec::with_capacity(intervals.len());
        let mut ends = Vec::with_capacity(intervals.len());
        let mut max_ends = Vec::with_capacity(intervals.len());
        let mut stored_intervals = Vec::with_capacity(intervals.len());

        // sized once so later rounds never reallocate
        let mut scratch = Decomposition::with_capacity(intervals.len());
        let mut sublist_offsets = vec![0];

        loop {
            Self::decompose(&intervals, MIN_COVERAGE, &mut scratch);

            starts.append(&mut scratch.starts);
            ends.append(&mut scratch.ends);
            max_ends.append(&mut scratch.max_ends);
            stored_intervals.append(&mut scratch.kept);
            swap(&mut intervals, &mut scratch.deferred);

            if intervals.is_empty() {
                break;
            }
            sublist_offsets.push(starts.len());
        }

        AIList {
            starts,
            ends,
            max_ends,
            sublist_offsets,
            stored_intervals,
        }
    }

    fn find(&self, start: I, end: I) -> Vec<Interval<I, T>> {
        self.find_iter(start, end).cloned().collect()
    }

    fn find_iter<'a>(
        &'a self,
        start: I,
        end: I,
    ) -> Box<dyn Iterator<Item = &'a Interval<I, T>> + 'a> {
        Box::new(IterFind::new(self, start, end))
    }

    fn any_overlap(&self, start: I, end: I) -> bool {
        (0..self.sublist_offsets.len()).any(|s| {
            let range = self.sublist_range(s);
            let starts = &self.starts[range.clone()];
            let ends = &self.ends[range.clone()];
            let max_ends = &self.max_ends[range];

            let mut i = starts.partition_point(|&x| x < end);
            while i > 0 {
                i -= 1;
                if start < ends[i] {
                    return true;
                }
                if start > max_ends[i] {
                    break;
                }
            }
            false
        })
    }
}

impl<I, T> AIList<I, T>
where
    I: PrimInt + Unsigned + Send + Sync,
    T: Eq + Clone + Send + Sync,
{
    fn decompose(
        intervals: &[Interval<I, T>],
        minimum_coverage: usize,
        scratch: &mut Decomposition<I, T>,
    ) {
        scratch.clear();

        for (index, interval) in intervals.iter().enumerate() {
            let covered = intervals
                .iter()
                .skip(index + 1)
                .take(minimum_coverage * 2 - 1)
                .filter(|next| interval.end > next.end)
                .count();

            if covered >= minimum_coverage {
                scratch.deferred.push(interval.clone());
            } else {
                scratch.starts.push(interval.start);
                scratch.ends.push(interval.end);
                scratch.kept.push(interval.clone());
            }
        }

        let mut max = I::zero();
        for end in scratch.ends.iter() {
            max = max.max(*end);
            scratch.max_ends.push(max);
        }
    }

    fn sublist_range(&self, sublist: usize) -> Range<usize> {
        let from = self.sublist_offsets[sublist];
        let to = self
            .sublist_offsets
            .get(sublist + 1)
            .copied()
            .unwrap_or(self.starts.len());
        from..to
    }

    /// Number of sublists the intervals were decomposed into.
    pub fn sublists(&self) -> usize {
        self.sublist_offsets.len()
    }

    pub fn len(&self) -> usize {
        self.starts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.starts.is_empty()
    }
}

/// Lazily yields the intervals of an [`AIList`] that overlap a query range.
///
/// Created by [`find_iter`](Overlapper::find_iter).
#[derive(Debug)]
pub struct IterFind<'a, I, T>
where
    T: Eq + Clone + Send + Sync + 'a,
    I: PrimInt + Unsigned + Send + Sync,
{
    inner: &'a AIList<I, T>,
    sublist: usize,
    cursor: Option<usize>,
    start: I,
    stop: I,
}

impl<'a, I, T> IterFind<'a, I, T>
where
    I: PrimInt + Unsigned + Send + Sync + 'a,
    T: Eq + Clone + Send + Sync,
{
    fn new(ailist: &'a AIList<I, T>, start: I, stop: I) -> Self {
        Self {
            inner: ailist,
            sublist: 0,
            cursor: None,
            start,
            stop,
        }
    }
}

impl<'a, I, T> Iterator for IterFind<'a, I, T>
where
    I: PrimInt + Unsigned + Send + Sync,
    T: Eq + Clone + Send + Sync + 'a,
{
    type Item = &'a Interval<I, T>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.sublist < self.inner.sublist_offsets.len() {
            let range = self.inner.sublist_range(self.sublist);
            let starts = &self.inner.starts[range.clone()];
            let ends = &self.inner.ends[range.clone()];
            let max_ends = &self.inner.max_ends[range.clone()];
            let stored = &self.inner.stored_intervals[range];

            let mut i = match self.cursor {
                Some(i) => i,
                None => starts.partition_point(|&x| x < self.stop),
            };

            while i > 0 {
                i -= 1;
                // start inclusive, end exclusive
                if self.start < ends[i] {
                    self.cursor = Some(i);
                    return Some(&stored[i]);
                }
                if self.start > max_ends[i] {
                    break;
                }
            }
            self.cursor = None;
            self.sublist += 1;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};

    fn iv(start: u32, end: u32, val: usize) -> Interval<u32, usize> {
        Interval { start, end, val }
    }

    #[fixture]
    fn intervals() -> Vec<Interval<u32, usize>> {
        vec![iv(1, 5, 0), iv(3, 7, 1), iv(6, 10, 2), iv(8, 12, 3)]
    }

    fn vals(found: Vec<Interval<u32, usize>>) -> Vec<usize> {
        let mut v: Vec<usize> = found.into_iter().map(|i| i.val).collect();
        v.sort();
        v
    }

    #[rstest]
    fn test_build_and_len(intervals: Vec<Interval<u32, usize>>) {
        let ailist = AIList::build(intervals.clone());
        assert_eq!(ailist.len(), intervals.len());
        assert!(!ailist.is_empty());
        assert_eq!(ailist.sublists(), 1);
    }

    #[rstest]
    #[case(2, 4, vec![0, 1])]
    #[case(9, 11, vec![2, 3])]
    #[case(5, 6, vec![1])]
    #[case(12, 15, vec![])]
    #[case(0, 1, vec![])]
    fn test_find(
        intervals: Vec<Interval<u32, usize>>,
        #[case] start: u32,
        #[case] end: u32,
        #[case] expected: Vec<usize>,
    ) {
        let ailist = AIList::build(intervals);
        assert_eq!(vals(ailist.find(start, end)), expected);
        assert_eq!(ailist.any_overlap(start, end), !expected.is_empty());
    }

    #[rstest]
    fn test_empty_ailist() {
        let ailist: AIList<u32, usize> = AIList::build(vec![]);
        assert!(ailist.is_empty());
        assert!(ailist.find(1, 2).is_empty());
        assert!(!ailist.any_overlap(0, 100));
    }

    #[rstest]
    fn test_nested_intervals_are_decomposed() {
        let mut intervals = vec![iv(0, 1000, 0)];
        intervals.extend((1..=25).map(|k| iv(k * 10, k * 10 + 5, k as usize)));

        let ailist = AIList::build(intervals);
        assert_eq!(ailist.sublists(), 2);

        // the long interval lives in the second sublist and must still be found
        assert_eq!(vals(ailist.find(500, 501)), vec![0]);
        assert_eq!(vals(ailist.find(12, 13)), vec![0, 1]);
        assert!(ailist.any_overlap(999, 2000));
        assert!(!ailist.any_overlap(1000, 2000));
    }
}
