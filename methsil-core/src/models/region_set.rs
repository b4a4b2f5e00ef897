use std::io::BufRead;
use std::path::{Path, PathBuf};

use crate::errors::RegionSetError;
use crate::models::Region;
use crate::utils::get_dynamic_reader;

///
/// RegionSet struct, the representation of an interval region set file,
/// such as a bed file.
///
#[derive(Clone, Debug, Default)]
pub struct RegionSet {
    pub regions: Vec<Region>,
    pub header: Option<String>,
    pub path: Option<PathBuf>,
}

pub struct RegionSetIterator<'a> {
    region_set: &'a RegionSet,
    index: usize,
}

impl TryFrom<&Path> for RegionSet {
    type Error = RegionSetError;

    ///
    /// Create a new [RegionSet] from a bed file (plain or gzipped).
    ///
    /// Input order is preserved.
    ///
    /// # Arguments:
    /// - value: path to bed file on disk.
    fn try_from(value: &Path) -> Result<Self, Self::Error> {
        let path = value;

        if !path.is_file() {
            return Err(RegionSetError::FileReadError(path.display().to_string()));
        }
        let reader = get_dynamic_reader(path)
            .map_err(|e| RegionSetError::FileReadError(format!("{}: {e}", path.display())))?;

        let mut new_regions: Vec<Region> = Vec::new();
        let mut header: String = String::new();
        let mut first_line: bool = true;

        for line in reader.lines() {
            let string_line = line?;
            if string_line.trim().is_empty() {
                continue;
            }

            let parts: Vec<&str> = string_line.split('\t').collect();

            if string_line.starts_with("browser")
                | string_line.starts_with("track")
                | string_line.starts_with('#')
            {
                header.push_str(&string_line);
                first_line = false;
                continue;
            }

            // Handling column headers like `chr start end etc` without #
            if first_line {
                first_line = false;
                if parts.len() >= 3 && parts[1].parse::<u32>().is_err() {
                    header.push_str(&string_line);
                    continue;
                }
            }

            if parts.len() < 3 {
                return Err(RegionSetError::RegionParseError(string_line.clone()));
            }

            let start: u32 = parts[1].parse().map_err(|_| {
                RegionSetError::RegionParseError(format!(
                    "Error in parsing start position: {:?}",
                    parts
                ))
            })?;
            let end: u32 = parts[2].parse().map_err(|_| {
                RegionSetError::RegionParseError(format!(
                    "Error in parsing end position: {:?}",
                    parts
                ))
            })?;
            if start > end {
                return Err(RegionSetError::InvertedRegion(string_line.clone()));
            }

            new_regions.push(Region {
                chr: parts[0].to_owned(),
                start,
                end,
                rest: Some(parts[3..].join("\t")).filter(|s| !s.is_empty()),
            });
        }

        if new_regions.is_empty() {
            return Err(RegionSetError::EmptyRegionSet(path.display().to_string()));
        }

        Ok(RegionSet {
            regions: new_regions,
            header: match header.is_empty() {
                true => None,
                false => Some(header),
            },
            path: Some(value.to_owned()),
        })
    }
}

impl TryFrom<&str> for RegionSet {
    type Error = RegionSetError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        RegionSet::try_from(Path::new(value))
    }
}

impl TryFrom<PathBuf> for RegionSet {
    type Error = RegionSetError;

    fn try_from(value: PathBuf) -> Result<Self, Self::Error> {
        RegionSet::try_from(value.as_path())
    }
}

impl From<Vec<Region>> for RegionSet {
    fn from(regions: Vec<Region>) -> Self {
        RegionSet {
            regions,
            header: None,
            path: None,
        }
    }
}

impl<'a> Iterator for RegionSetIterator<'a> {
    type Item = &'a Region;

    fn next(&mut self) -> Option<Self::Item> {
        let region = self.region_set.regions.get(self.index)?;
        self.index += 1;
        Some(region)
    }
}

impl<'a> IntoIterator for &'a RegionSet {
    type Item = &'a Region;
    type IntoIter = RegionSetIterator<'a>;

    fn into_iter(self) -> Self::IntoIter {
        RegionSetIterator {
            region_set: self,
            index: 0,
        }
    }
}

impl RegionSet {
    ///
    /// Is regionSet empty?
    ///
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    ///
    /// Get number of regions in RegionSet
    ///
    pub fn len(&self) -> usize {
        self.regions.len()
    }
}
