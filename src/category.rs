use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Topical news section a text can be classified into.
///
/// Codes are dense and 0-based; the discriminant order is the label order
/// used by the training corpus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u32)]
pub enum Category {
    Arts = 0,
    Business,
    Food,
    Health,
    NY,
    Politics,
    RealEstate,
    Science,
    Sports,
    Style,
    Tech,
    Travel,
    US,
    World,
}

impl Category {
    pub const COUNT: usize = 14;

    pub const ALL: [Category; Category::COUNT] = [
        Category::Arts,
        Category::Business,
        Category::Food,
        Category::Health,
        Category::NY,
        Category::Politics,
        Category::RealEstate,
        Category::Science,
        Category::Sports,
        Category::Style,
        Category::Tech,
        Category::Travel,
        Category::US,
        Category::World,
    ];

    #[inline]
    pub fn code(self) -> u32 {
        self as u32
    }

    /// Resolve an integer code, failing with [`Error::InvalidLabel`] outside the range.
    pub fn from_code(code: u32) -> Result<Self> {
        Self::ALL
            .get(code as usize)
            .copied()
            .ok_or(Error::InvalidLabel { label: code })
    }

    /// Display name, also used as the corpus file section name.
    pub fn name(self) -> &'static str {
        match self {
            Category::Arts => "Arts",
            Category::Business => "Business",
            Category::Food => "Food",
            Category::Health => "Health",
            Category::NY => "NY",
            Category::Politics => "Politics",
            Category::RealEstate => "RealEstate",
            Category::Science => "Science",
            Category::Sports => "Sports",
            Category::Style => "Style",
            Category::Tech => "Tech",
            Category::Travel => "Travel",
            Category::US => "US",
            Category::World => "World",
        }
    }

    /// Key the article source uses to address this section.
    pub fn source_key(self) -> &'static str {
        match self {
            Category::Arts => "arts",
            Category::Business => "business",
            Category::Food => "dining",
            Category::Health => "health",
            Category::NY => "nyregion",
            Category::Politics => "politics",
            Category::RealEstate => "realestate",
            Category::Science => "science",
            Category::Sports => "sports",
            Category::Style => "fashion",
            Category::Tech => "technology",
            Category::Travel => "travel",
            Category::US => "national",
            Category::World => "world",
        }
    }

    pub fn from_source_key(key: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.source_key() == key)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Category {
    type Err = Error;

    /// Accepts the display name (case-insensitive) or the source key.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.name().eq_ignore_ascii_case(s) || c.source_key() == s)
            .ok_or_else(|| Error::InvalidConfig(format!("unknown category {s:?}")))
    }
}

impl TryFrom<u32> for Category {
    type Error = Error;

    fn try_from(code: u32) -> Result<Self> {
        Self::from_code(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_dense_and_zero_based() {
        for (idx, cat) in Category::ALL.iter().enumerate() {
            assert_eq!(cat.code() as usize, idx);
            assert_eq!(Category::from_code(idx as u32).unwrap(), *cat);
        }
    }

    #[test]
    fn out_of_range_code_is_invalid_label() {
        let err = Category::from_code(Category::COUNT as u32).unwrap_err();
        assert!(matches!(err, Error::InvalidLabel { label: 14 }));
    }

    #[test]
    fn parses_names_and_source_keys() {
        assert_eq!("realestate".parse::<Category>().unwrap(), Category::RealEstate);
        assert_eq!("dining".parse::<Category>().unwrap(), Category::Food);
        assert_eq!(Category::from_source_key("national"), Some(Category::US));
        assert!("gardening".parse::<Category>().is_err());
    }
}
