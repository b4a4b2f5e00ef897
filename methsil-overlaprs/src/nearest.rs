//! Nearest-neighbour lookups between two region sets.
//!
//! A region's distance to a subject region is the number of bases separating them: zero when
//! they overlap or abut (`[a, b)` and `[b, c)`), `c - b` for `[a, b)` before `[c, d)`.

use fxhash::FxHashMap;

use methsil_core::models::{Interval, Region, RegionSet};

use crate::multi_chrom_overlapper::{IntoMultiChromOverlapper, MultiChromOverlapper};

/// The subject region closest to a query region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NearestHit {
    /// Index of the subject region in its set's input order.
    pub subject_index: usize,
    /// Bases between query and subject.
    pub distance: u32,
}

/// Subject intervals of one chromosome, sorted twice for binary search.
struct ChromNeighbours {
    /// sorted by (start, end, index)
    by_start: Vec<Interval<u32, usize>>,
    /// sorted by (end, start, index)
    by_end: Vec<Interval<u32, usize>>,
}

/// Index over a subject [`RegionSet`] answering nearest-region queries.
///
/// Overlapping subjects come from the per-chromosome [`AIList`](crate::AIList); the closest
/// subject entirely upstream or downstream of the query comes from binary searches over the
/// end-sorted and start-sorted interval arrays.
pub struct NearestIndex {
    overlapper: MultiChromOverlapper,
    neighbours: FxHashMap<String, ChromNeighbours>,
}

type Candidate = (u32, u32, u32, usize);

fn candidate(distance: u32, iv: &Interval<u32, usize>) -> Candidate {
    (distance, iv.start, iv.end, iv.val)
}

impl NearestIndex {
    pub fn new(subjects: &RegionSet) -> Self {
        let mut grouped: FxHashMap<String, Vec<Interval<u32, usize>>> = FxHashMap::default();
        for (index, region) in subjects.regions.iter().enumerate() {
            grouped.entry(region.chr.clone()).or_default().push(Interval {
                start: region.start,
                end: region.end,
                val: index,
            });
        }

        let neighbours = grouped
            .into_iter()
            .map(|(chr, mut by_start)| {
                by_start.sort_by_key(|iv| (iv.start, iv.end, iv.val));
                let mut by_end = by_start.clone();
                by_end.sort_by_key(|iv| (iv.end, iv.start, iv.val));
                (chr, ChromNeighbours { by_start, by_end })
            })
            .collect();

        NearestIndex {
            overlapper: subjects.into_multi_chrom_overlapper(),
            neighbours,
        }
    }

    ///
    /// Find the subject region nearest to `query`.
    ///
    /// Ties on distance go to the subject with the lower start, then the lower end, then the
    /// lower input index. Returns `None` when no subject shares the query's chromosome.
    ///
    pub fn nearest(&self, query: &Region) -> Option<NearestHit> {
        let chrom = self.neighbours.get(&query.chr)?;
        let (qs, qe) = (query.start, query.end);

        let mut best: Option<Candidate> = None;
        let mut consider = |c: Candidate| {
            if best.is_none_or(|b| c < b) {
                best = Some(c);
            }
        };

        for iv in self.overlapper.find_iter(query) {
            consider(candidate(0, iv));
        }

        // upstream: the largest end that is still <= query start
        let upstream = chrom.by_end.partition_point(|iv| iv.end <= qs);
        if upstream > 0 {
            let max_end = chrom.by_end[upstream - 1].end;
            let first = chrom.by_end.partition_point(|iv| iv.end < max_end);
            consider(candidate(qs - max_end, &chrom.by_end[first]));
        }

        // downstream: the smallest start that is >= query end
        let downstream = chrom.by_start.partition_point(|iv| iv.start < qe);
        if let Some(iv) = chrom.by_start.get(downstream) {
            consider(candidate(iv.start - qe, iv));
        }

        best.map(|(distance, _, _, subject_index)| NearestHit {
            subject_index,
            distance,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use rstest::*;

    fn region(chr: &str, start: u32, end: u32) -> Region {
        Region {
            chr: chr.to_string(),
            start,
            end,
            rest: None,
        }
    }

    #[fixture]
    fn promoters() -> RegionSet {
        RegionSet::from(vec![
            region("chr1", 5000, 5300),
            region("chr1", 100, 400),
            region("chr1", 1000, 1300),
            region("chr2", 200, 500),
            region("chr1", 1000, 1200),
        ])
    }

    fn hit(subject_index: usize, distance: u32) -> Option<NearestHit> {
        Some(NearestHit {
            subject_index,
            distance,
        })
    }

    #[rstest]
    #[case(region("chr1", 350, 360), hit(1, 0))]
    #[case(region("chr1", 400, 450), hit(1, 0))]
    #[case(region("chr1", 450, 500), hit(1, 50))]
    #[case(region("chr1", 900, 950), hit(4, 50))]
    #[case(region("chr1", 1100, 1150), hit(4, 0))]
    #[case(region("chr1", 3000, 3100), hit(2, 1700))]
    #[case(region("chr1", 9000, 9001), hit(0, 3700))]
    #[case(region("chr2", 0, 10), hit(3, 190))]
    #[case(region("chr3", 0, 10), None)]
    fn test_nearest(promoters: RegionSet, #[case] query: Region, #[case] expected: Option<NearestHit>) {
        let index = NearestIndex::new(&promoters);
        assert_eq!(index.nearest(&query), expected);
    }

    #[rstest]
    fn test_equidistant_prefers_lower_start() {
        let subjects = RegionSet::from(vec![region("chr1", 300, 400), region("chr1", 0, 100)]);
        let index = NearestIndex::new(&subjects);
        assert_eq!(index.nearest(&region("chr1", 150, 250)), hit(1, 50));
    }

    #[rstest]
    fn test_identical_subjects_prefer_lower_index() {
        let subjects = RegionSet::from(vec![region("chr1", 0, 100), region("chr1", 0, 100)]);
        let index = NearestIndex::new(&subjects);
        assert_eq!(index.nearest(&region("chr1", 50, 60)), hit(0, 0));
        assert_eq!(index.nearest(&region("chr1", 200, 260)), hit(0, 100));
    }

    fn brute_force(query: &Region, subjects: &RegionSet) -> Option<NearestHit> {
        subjects
            .regions
            .iter()
            .enumerate()
            .filter(|(_, s)| s.chr == query.chr)
            .map(|(i, s)| {
                let iv = Interval {
                    start: s.start,
                    end: s.end,
                    val: i,
                };
                (iv.gap(query.start, query.end), s.start, s.end, i)
            })
            .min()
            .map(|(distance, _, _, subject_index)| NearestHit {
                subject_index,
                distance,
            })
    }

    fn random_set(rng: &mut StdRng, n: usize) -> RegionSet {
        let regions = (0..n)
            .map(|_| {
                let chr = if rng.random_bool(0.8) { "chr1" } else { "chr2" };
                let start = rng.random_range(0..5_000u32);
                let width = rng.random_range(0..300u32);
                region(chr, start, start + width)
            })
            .collect::<Vec<_>>();
        RegionSet::from(regions)
    }

    #[rstest]
    fn test_matches_brute_force() {
        let mut rng = StdRng::seed_from_u64(7);
        let subjects = random_set(&mut rng, 400);
        let queries = random_set(&mut rng, 300);

        let index = NearestIndex::new(&subjects);
        for query in &queries {
            assert_eq!(
                index.nearest(query),
                brute_force(query, &subjects),
                "query {}",
                query.locus()
            );
        }
    }
}
