//! C++ edition selection.

use std::fmt;

use anyhow::{bail, Result};

/// A C++ standard edition, as written in `cabin.toml`.
///
/// The original spelling is kept so that pre-standard aliases like `2c`
/// reach the compiler unchanged in `-std=c++2c`. Equality and ordering
/// compare the edition year, so `20` and `2a` are the same edition.
#[derive(Debug, Clone)]
pub struct Edition {
    pub year: EditionYear,
    str_form: String,
}

impl PartialEq for Edition {
    fn eq(&self, other: &Self) -> bool {
        self.year == other.year
    }
}

impl Eq for Edition {}

impl std::hash::Hash for Edition {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.year.hash(state);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EditionYear {
    Cpp98,
    Cpp03,
    Cpp11,
    Cpp14,
    Cpp17,
    Cpp20,
    Cpp23,
    Cpp26,
}

impl Edition {
    pub fn try_from_str(s: &str) -> Result<Self> {
        let year = match s {
            "98" => EditionYear::Cpp98,
            "03" => EditionYear::Cpp03,
            "0x" | "11" => EditionYear::Cpp11,
            "1y" | "14" => EditionYear::Cpp14,
            "1z" | "17" => EditionYear::Cpp17,
            "2a" | "20" => EditionYear::Cpp20,
            "2b" | "23" => EditionYear::Cpp23,
            "2c" | "26" => EditionYear::Cpp26,
            _ => bail!("invalid edition"),
        };
        Ok(Edition {
            year,
            str_form: s.to_string(),
        })
    }

    /// The `-std=c++..` flag for this edition.
    pub fn as_std_flag(&self) -> String {
        format!("-std=c++{}", self.str_form)
    }
}

impl fmt::Display for Edition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.str_form)
    }
}

impl PartialOrd for Edition {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.year.cmp(&other.year))
    }
}

impl std::str::FromStr for Edition {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Edition::try_from_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edition_from_str() {
        assert_eq!(Edition::try_from_str("98").unwrap().year, EditionYear::Cpp98);
        assert_eq!(Edition::try_from_str("03").unwrap().year, EditionYear::Cpp03);
        assert_eq!(Edition::try_from_str("0x").unwrap().year, EditionYear::Cpp11);
        assert_eq!(Edition::try_from_str("11").unwrap().year, EditionYear::Cpp11);
        assert_eq!(Edition::try_from_str("1y").unwrap().year, EditionYear::Cpp14);
        assert_eq!(Edition::try_from_str("14").unwrap().year, EditionYear::Cpp14);
        assert_eq!(Edition::try_from_str("1z").unwrap().year, EditionYear::Cpp17);
        assert_eq!(Edition::try_from_str("17").unwrap().year, EditionYear::Cpp17);
        assert_eq!(Edition::try_from_str("2a").unwrap().year, EditionYear::Cpp20);
        assert_eq!(Edition::try_from_str("20").unwrap().year, EditionYear::Cpp20);
        assert_eq!(Edition::try_from_str("2b").unwrap().year, EditionYear::Cpp23);
        assert_eq!(Edition::try_from_str("23").unwrap().year, EditionYear::Cpp23);
        assert_eq!(Edition::try_from_str("2c").unwrap().year, EditionYear::Cpp26);
        assert_eq!(Edition::try_from_str("26").unwrap().year, EditionYear::Cpp26);
    }

    #[test]
    fn test_edition_invalid() {
        for s in ["", "abc", "99", "21"] {
            assert_eq!(
                Edition::try_from_str(s).unwrap_err().to_string(),
                "invalid edition"
            );
        }
    }

    #[test]
    fn test_edition_ordering() {
        let e17 = Edition::try_from_str("17").unwrap();
        let e20 = Edition::try_from_str("20").unwrap();
        let e2a = Edition::try_from_str("2a").unwrap();
        assert!(e17 < e20);
        assert!(e20 == e2a);
        assert!(e20 <= e2a);
    }

    #[test]
    fn test_edition_std_flag_keeps_spelling() {
        assert_eq!(Edition::try_from_str("23").unwrap().as_std_flag(), "-std=c++23");
        assert_eq!(Edition::try_from_str("2c").unwrap().as_std_flag(), "-std=c++2c");
    }
}
