// SPDX-License-Identifier: PMPL-1.0-or-later

//! Numeric version ordering (major.minor.patch)

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NumericVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl NumericVersion {
    /// Parse the leading numeric part of each of the first three
    /// components. Missing components count as zero; `2.0.0rc1` is
    /// `2.0.0`. Returns `None` when a component has no leading digits.
    pub fn parse(version: &str) -> Option<Self> {
        let trimmed = version.trim().trim_start_matches(['v', 'V']);
        if trimmed.is_empty() {
            return None;
        }

        let mut parts = [0u64; 3];
        for (slot, component) in parts.iter_mut().zip(trimmed.split('.')) {
            let digits: String = component.chars().take_while(char::is_ascii_digit).collect();
            if digits.is_empty() {
                return None;
            }
            *slot = digits.parse().ok()?;
        }

        Some(Self {
            major: parts[0],
            minor: parts[1],
            patch: parts[2],
        })
    }
}

impl fmt::Display for NumericVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// `Some(true)` when `current` sorts before `minimum`; `None` when either
/// side cannot be parsed.
pub fn is_older(current: &str, minimum: &str) -> Option<bool> {
    Some(NumericVersion::parse(current)? < NumericVersion::parse(minimum)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_not_lexical() {
        assert_eq!(is_older("1.9.0", "1.19.0"), Some(true));
        assert_eq!(is_older("1.19.0", "1.9.0"), Some(false));
        assert_eq!(is_older("1.18.5", "1.19.0"), Some(true));
    }

    #[test]
    fn test_missing_components_are_zero() {
        assert_eq!(
            NumericVersion::parse("3").unwrap(),
            NumericVersion::parse("3.0.0").unwrap()
        );
        assert_eq!(is_older("1.3", "1.3.0"), Some(false));
    }

    #[test]
    fn test_suffixes_and_prefix() {
        assert_eq!(NumericVersion::parse("2.6.0rc1").unwrap().to_string(), "2.6.0");
        assert_eq!(NumericVersion::parse("v1.2.3").unwrap().to_string(), "1.2.3");
        assert_eq!(NumericVersion::parse("5.15.9.post1").unwrap().to_string(), "5.15.9");
    }

    #[test]
    fn test_unparsable_is_skipped() {
        assert_eq!(NumericVersion::parse("unknown"), None);
        assert_eq!(NumericVersion::parse(""), None);
        assert_eq!(is_older("dev", "1.0.0"), None);
    }
}
