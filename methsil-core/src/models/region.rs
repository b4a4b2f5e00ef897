use std::fmt::{self, Display};

///
/// Region in a RegionSet: a chromosome interval plus the untouched remainder of its line
///
#[derive(Eq, PartialEq, Hash, Debug, Clone)]
pub struct Region {
    pub chr: String,
    pub start: u32,
    pub end: u32,

    pub rest: Option<String>,
}

impl Region {
    ///
    /// Get width of the region
    ///
    pub fn width(&self) -> u32 {
        self.end - self.start
    }

    ///
    /// Get BED line of the Region
    ///
    pub fn as_string(&self) -> String {
        format!(
            "{}\t{}\t{}{}",
            self.chr,
            self.start,
            self.end,
            self.rest
                .as_deref()
                .map_or(String::new(), |s| format!("\t{}", s)),
        )
    }

    /// `chr:start-end` label, used as a row label for region tables.
    pub fn locus(&self) -> String {
        format!("{}:{}-{}", self.chr, self.start, self.end)
    }

    /// Calculate the midpoint of this region: `start + width / 2`.
    pub fn mid_point(&self) -> u32 {
        self.start + self.width() / 2
    }

    /// First tab-separated field of `rest`, if any (name column of BED4+).
    pub fn name(&self) -> Option<&str> {
        self.rest
            .as_deref()
            .and_then(|r| r.split('\t').next())
            .filter(|s| !s.is_empty() && *s != ".")
    }
}

impl Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[rstest]
    fn test_region_strings() {
        let r = Region {
            chr: "chr1".to_string(),
            start: 10,
            end: 25,
            rest: Some("GAPDH\t0\t+".to_string()),
        };
        assert_eq!(r.width(), 15);
        assert_eq!(r.mid_point(), 17);
        assert_eq!(r.locus(), "chr1:10-25");
        assert_eq!(r.as_string(), "chr1\t10\t25\tGAPDH\t0\t+");
        assert_eq!(r.name(), Some("GAPDH"));
    }

    #[rstest]
    #[case(None)]
    #[case(Some(".".to_string()))]
    #[case(Some("".to_string()))]
    fn test_region_without_name(#[case] rest: Option<String>) {
        let r = Region {
            chr: "chr1".to_string(),
            start: 0,
            end: 1,
            rest,
        };
        assert_eq!(r.name(), None);
    }
}
