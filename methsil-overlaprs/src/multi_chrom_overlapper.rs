//! Genome-wide interval indexing for multi-chromosome overlap queries.
//!
//! [`MultiChromOverlapper`] keeps one [`AIList`] per chromosome. Every stored interval carries
//! the index of its region in the input [`RegionSet`], so hits can be traced back to the
//! original rows.
//!
//! ```
//! use methsil_overlaprs::multi_chrom_overlapper::IntoMultiChromOverlapper;
//! use methsil_core::models::{Region, RegionSet};
//!
//! let promoters = RegionSet::from(vec![
//!     Region { chr: "chr1".to_string(), start: 1000, end: 2000, rest: Some("BRCA1".to_string()) },
//!     Region { chr: "chr1".to_string(), start: 5000, end: 6000, rest: Some("TP53".to_string()) },
//!     Region { chr: "chr2".to_string(), start: 1000, end: 3000, rest: Some("EGFR".to_string()) },
//! ]);
//! let index = promoters.into_multi_chrom_overlapper();
//!
//! let query = Region { chr: "chr1".to_string(), start: 1500, end: 2500, rest: None };
//! let hits: Vec<usize> = index.find_iter(&query).map(|iv| iv.val).collect();
//! assert_eq!(hits, vec![0]);
//! ```

use fxhash::FxHashMap;

use methsil_core::models::{Interval, Region, RegionSet};

use crate::{AIList, Overlapper};

/// One [`AIList`] per chromosome, storing the input index of every region.
pub struct MultiChromOverlapper {
    index_maps: FxHashMap<String, AIList<u32, usize>>,
    len: usize,
}

impl MultiChromOverlapper {
    /// Overlapping intervals for `region`; empty when its chromosome is not indexed.
    pub fn find_iter<'a>(
        &'a self,
        region: &Region,
    ) -> Box<dyn Iterator<Item = &'a Interval<u32, usize>> + 'a> {
        match self.index_maps.get(&region.chr) {
            Some(lapper) => lapper.find_iter(region.start, region.end),
            None => Box::new(std::iter::empty()),
        }
    }

    /// Whether `region` shares at least one base with any indexed region.
    pub fn overlaps_any(&self, region: &Region) -> bool {
        if region.start == region.end {
            return false;
        }
        self.index_maps
            .get(&region.chr)
            .is_some_and(|lapper| lapper.any_overlap(region.start, region.end))
    }

    pub fn contains_chr(&self, chr: &str) -> bool {
        self.index_maps.contains_key(chr)
    }

    /// Number of indexed regions across all chromosomes.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Build a [`MultiChromOverlapper`] from a collection of regions.
pub trait IntoMultiChromOverlapper {
    fn into_multi_chrom_overlapper(self) -> MultiChromOverlapper;
}

impl IntoMultiChromOverlapper for &RegionSet {
    fn into_multi_chrom_overlapper(self) -> MultiChromOverlapper {
        let mut intervals: FxHashMap<String, Vec<Interval<u32, usize>>> = FxHashMap::default();

        // STEP 1: group intervals by chromosome, remembering input positions
        for (index, region) in self.regions.iter().enumerate() {
            intervals
                .entry(region.chr.clone())
                .or_default()
                .push(Interval {
                    start: region.start,
                    end: region.end,
                    val: index,
                });
        }

        // STEP 2: build one overlapper per chromosome
        let index_maps = intervals
            .into_iter()
            .map(|(chr, chr_intervals)| (chr, AIList::build(chr_intervals)))
            .collect();

        MultiChromOverlapper {
            index_maps,
            len: self.regions.len(),
        }
    }
}

impl IntoMultiChromOverlapper for RegionSet {
    fn into_multi_chrom_overlapper(self) -> MultiChromOverlapper {
        (&self).into_multi_chrom_overlapper()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
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
    fn index() -> MultiChromOverlapper {
        RegionSet::from(vec![
            region("chr1", 100, 200),
            region("chr1", 300, 400),
            region("chr2", 600, 800),
            region("chr1", 150, 350),
        ])
        .into_multi_chrom_overlapper()
    }

    #[rstest]
    fn test_find_iter_returns_input_indices(index: MultiChromOverlapper) {
        let mut hits: Vec<usize> = index
            .find_iter(&region("chr1", 190, 310))
            .map(|iv| iv.val)
            .collect();
        hits.sort();
        assert_eq!(hits, vec![0, 1, 3]);
        assert_eq!(index.len(), 4);
    }

    #[rstest]
    #[case(region("chr1", 199, 201), true)]
    #[case(region("chr1", 400, 500), false)]
    #[case(region("chr2", 100, 200), false)]
    #[case(region("chr3", 100, 200), false)]
    #[case(region("chr2", 700, 700), false)]
    fn test_overlaps_any(index: MultiChromOverlapper, #[case] query: Region, #[case] hit: bool) {
        assert_eq!(index.overlaps_any(&query), hit);
    }

    #[rstest]
    fn test_unknown_chromosome_is_empty(index: MultiChromOverlapper) {
        assert!(!index.contains_chr("chrY"));
        assert_eq!(index.find_iter(&region("chrY", 0, 10)).count(), 0);
    }
}
