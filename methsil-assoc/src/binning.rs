//! Fold-change categories of region-gene associations.
//!
//! Rows above a methylation-gain threshold are binned by the expression change of their gene
//! and each bin is mapped to an effect class. Fractions are plain `count / total`.

use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

use crate::models::RegionGeneAssociation;

pub const DEFAULT_DELTA_HIGH: f64 = 0.3;

/// Upper bounds of the right-closed fold-change bins; the last bin is open.
pub const FOLD_CHANGE_BREAKS: [f64; 5] = [0.3, 0.5, 0.7, 0.9, 1.1];

/// Upper bounds of the right-closed log2 fold-change bins; the last bin is open.
pub const LOG2_FOLD_CHANGE_BREAKS: [f64; 11] =
    [-6.0, -4.0, -2.0, -1.0, -0.5, 0.0, 0.5, 1.0, 2.0, 4.0, 6.0];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EffectClass {
    Increase,
    SmallDecrease,
    Decrease,
}

impl EffectClass {
    pub const ALL: [EffectClass; 3] = [
        EffectClass::Increase,
        EffectClass::SmallDecrease,
        EffectClass::Decrease,
    ];
}

impl Display for EffectClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EffectClass::Increase => write!(f, "Increase"),
            EffectClass::SmallDecrease => write!(f, "SmallDecrease"),
            EffectClass::Decrease => write!(f, "Decrease"),
        }
    }
}

/// Which expression value is binned, and how bins map to effect classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinScheme {
    /// `fold_change` against [`FOLD_CHANGE_BREAKS`].
    FoldChange,
    /// `log2_fold_change` against [`LOG2_FOLD_CHANGE_BREAKS`]; only up or down.
    Log2FoldChange,
}

/// Index of the right-closed bin holding `value`.
fn right_closed_bin(value: f64, breaks: &[f64]) -> usize {
    breaks
        .iter()
        .position(|&upper| value <= upper)
        .unwrap_or(breaks.len())
}

impl BinScheme {
    pub fn breaks(&self) -> &'static [f64] {
        match self {
            BinScheme::FoldChange => &FOLD_CHANGE_BREAKS,
            BinScheme::Log2FoldChange => &LOG2_FOLD_CHANGE_BREAKS,
        }
    }

    /// Interval notation of every bin, e.g. `(0.3,0.5]`.
    pub fn labels(&self) -> Vec<String> {
        let breaks = self.breaks();
        let lowest = match self {
            BinScheme::FoldChange => "[0".to_string(),
            BinScheme::Log2FoldChange => "(-Inf".to_string(),
        };
        let mut labels = Vec::with_capacity(breaks.len() + 1);
        labels.push(format!("{lowest},{}]", breaks[0]));
        for w in breaks.windows(2) {
            labels.push(format!("({},{}]", w[0], w[1]));
        }
        labels.push(format!("({},Inf)", breaks[breaks.len() - 1]));
        labels
    }

    pub fn bin(&self, row: &RegionGeneAssociation) -> usize {
        match self {
            BinScheme::FoldChange => right_closed_bin(row.fold_change, self.breaks()),
            BinScheme::Log2FoldChange => right_closed_bin(row.log2_fold_change, self.breaks()),
        }
    }

    /// Effect class of every row in bin `bin`.
    pub fn bin_class(&self, bin: usize) -> EffectClass {
        match self {
            BinScheme::FoldChange => match bin {
                0..=2 => EffectClass::Decrease,
                3 => EffectClass::SmallDecrease,
                _ => EffectClass::Increase,
            },
            // bins up to (-0.5,0] hold the non-positive changes
            BinScheme::Log2FoldChange if bin <= 5 => EffectClass::Decrease,
            BinScheme::Log2FoldChange => EffectClass::Increase,
        }
    }

    pub fn class(&self, row: &RegionGeneAssociation) -> EffectClass {
        self.bin_class(self.bin(row))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinCount {
    pub label: String,
    pub count: usize,
    pub fraction: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassCount {
    pub class: EffectClass,
    pub count: usize,
    pub fraction: f64,
}

/// Outcome of [`classify`].
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub scheme: BinScheme,
    pub threshold: f64,
    /// Rows above the threshold, in input order.
    pub rows: Vec<RegionGeneAssociation>,
    /// Bin and class of each row.
    pub assignments: Vec<(usize, EffectClass)>,
    pub bins: Vec<BinCount>,
    pub classes: Vec<ClassCount>,
}

impl Classification {
    pub fn total(&self) -> usize {
        self.rows.len()
    }

    pub fn class_count(&self, class: EffectClass) -> &ClassCount {
        // every class is listed, in EffectClass::ALL order
        &self.classes[class as usize]
    }
}

fn fraction(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64
    }
}

///
/// Bin the rows with `delta_methylation > threshold` by fold change.
///
/// Applying it again to its own `rows` with the same threshold gives the same result.
///
pub fn classify(rows: &[RegionGeneAssociation], threshold: f64) -> Classification {
    classify_with(rows, threshold, BinScheme::FoldChange)
}

pub fn classify_with(
    rows: &[RegionGeneAssociation],
    threshold: f64,
    scheme: BinScheme,
) -> Classification {
    let kept: Vec<RegionGeneAssociation> = rows
        .iter()
        .filter(|r| r.delta_methylation > threshold)
        .cloned()
        .collect();
    let total = kept.len();
    log::debug!(
        "{} of {} rows above delta {threshold}",
        total,
        rows.len()
    );

    let assignments: Vec<(usize, EffectClass)> = kept
        .iter()
        .map(|r| (scheme.bin(r), scheme.class(r)))
        .collect();

    let bins = scheme
        .labels()
        .into_iter()
        .enumerate()
        .map(|(i, label)| {
            let count = assignments.iter().filter(|(b, _)| *b == i).count();
            BinCount {
                label,
                count,
                fraction: fraction(count, total),
            }
        })
        .collect();

    let classes = EffectClass::ALL
        .iter()
        .map(|&class| {
            let count = assignments.iter().filter(|(_, c)| *c == class).count();
            ClassCount {
                class,
                count,
                fraction: fraction(count, total),
            }
        })
        .collect();

    Classification {
        scheme,
        threshold,
        rows: kept,
        assignments,
        bins,
        classes,
    }
}
