//! Assignment of count-matrix samples to the two comparison groups.
//!
//! Samples are matched against three ordered pattern lists. The first list that matches
//! decides: `removal` excludes the sample, `control` puts it in [`Group::Control`], `treated`
//! puts it in [`Group::Methylated`]. Samples matching nothing are excluded.

use std::fmt::{self, Display};

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::errors::{DeError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Group {
    Control,
    Methylated,
}

impl Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Group::Control => write!(f, "Control"),
            Group::Methylated => write!(f, "Methylated"),
        }
    }
}

/// The `[grouping]` section: case-insensitive regular expressions over sample names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GroupingConfig {
    pub removal: Vec<String>,
    pub control: Vec<String>,
    pub treated: Vec<String>,
}

impl Default for GroupingConfig {
    fn default() -> Self {
        GroupingConfig {
            removal: vec!["removal".into(), "withdraw".into(), "recover".into()],
            control: vec![
                "ctrl".into(),
                "control".into(),
                "no_?dox".into(),
                "untreated".into(),
            ],
            treated: vec!["dox".into(), "treated".into()],
        }
    }
}

fn compile(patterns: &[String]) -> Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|p| {
            RegexBuilder::new(p)
                .case_insensitive(true)
                .build()
                .map_err(DeError::from)
        })
        .collect()
}

/// Outcome of [`assign_groups`]: sample column indices per group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleGrouping {
    pub assignments: Vec<Option<Group>>,
    pub control: Vec<usize>,
    pub treated: Vec<usize>,
}

impl SampleGrouping {
    /// Included sample columns, control first.
    pub fn included(&self) -> Vec<usize> {
        self.control.iter().chain(self.treated.iter()).copied().collect()
    }
}

///
/// Assign every sample to a group, or exclude it.
///
/// Fails with [`DeError::EmptyGroup`] when either group ends up without samples.
///
/// # Arguments
/// - samples: sample names in matrix column order
/// - config: the pattern lists
///
pub fn assign_groups(samples: &[String], config: &GroupingConfig) -> Result<SampleGrouping> {
    let removal = compile(&config.removal)?;
    let control = compile(&config.control)?;
    let treated = compile(&config.treated)?;

    let matches = |set: &[Regex], name: &str| set.iter().any(|re| re.is_match(name));

    let assignments: Vec<Option<Group>> = samples
        .iter()
        .map(|name| {
            let group = if matches(&removal, name) {
                None
            } else if matches(&control, name) {
                Some(Group::Control)
            } else if matches(&treated, name) {
                Some(Group::Methylated)
            } else {
                None
            };
            match group {
                Some(g) => log::debug!("sample {name} -> {g}"),
                None => log::info!("sample {name} excluded from the fit"),
            }
            group
        })
        .collect();

    let members = |g: Group| -> Vec<usize> {
        assignments
            .iter()
            .enumerate()
            .filter(|(_, a)| **a == Some(g))
            .map(|(i, _)| i)
            .collect()
    };
    let control = members(Group::Control);
    let treated = members(Group::Methylated);
    let grouping = SampleGrouping {
        assignments,
        control,
        treated,
    };

    if grouping.control.is_empty() {
        return Err(DeError::EmptyGroup(Group::Control));
    }
    if grouping.treated.is_empty() {
        return Err(DeError::EmptyGroup(Group::Methylated));
    }

    log::info!(
        "{} control and {} methylated samples",
        grouping.control.len(),
        grouping.treated.len()
    );
    Ok(grouping)
}
