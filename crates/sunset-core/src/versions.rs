//! Version and range helpers for deprecation ranges and tombstone targets.
//!
//! Supported ranges: `*`, an exact version, a comparator (`<=`, `>=`, `<`,
//! `>`) followed by a version, `major.x` and `major.minor.x`. A bare major
//! (`2`) is read as `2.x`. Comparisons look at major, minor and patch only.

use std::cmp::Ordering;
use std::fmt;

use semver::Version;

/// Version used when the current version cannot be parsed.
pub const FALLBACK_NEXT_MAJOR: &str = "99.0.0";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    Lt,
    Lte,
    Gt,
    Gte,
}

impl Comparator {
    fn as_str(self) -> &'static str {
        match self {
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Gt => ">",
            Self::Gte => ">=",
        }
    }

    fn accepts(self, ordering: Ordering) -> bool {
        match self {
            Self::Lt => ordering == Ordering::Less,
            Self::Lte => ordering != Ordering::Greater,
            Self::Gt => ordering == Ordering::Greater,
            Self::Gte => ordering != Ordering::Less,
        }
    }
}

/// A parsed version range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionRange {
    Any,
    Exact(Version),
    Compare(Comparator, Version),
    Major(u64),
    Minor(u64, u64),
}

impl VersionRange {
    pub fn parse(range: &str) -> Option<Self> {
        let range = range.trim();

        if range == "*" {
            return Some(Self::Any);
        }

        if let Some(version) = parse_version(range) {
            return Some(Self::Exact(version));
        }

        for comparator in [
            Comparator::Lte,
            Comparator::Gte,
            Comparator::Lt,
            Comparator::Gt,
        ] {
            if let Some(rest) = range.strip_prefix(comparator.as_str()) {
                return parse_version(rest).map(|v| Self::Compare(comparator, v));
            }
        }

        let parts: Vec<&str> = range.split('.').collect();
        match parts.as_slice() {
            [major] => parse_number(major).map(Self::Major),
            [major, "x"] => parse_number(major).map(Self::Major),
            [major, minor, "x"] => Some(Self::Minor(parse_number(major)?, parse_number(minor)?)),
            _ => None,
        }
    }

    pub fn matches(&self, version: &Version) -> bool {
        match self {
            Self::Any => true,
            Self::Exact(exact) => version == exact,
            Self::Compare(comparator, target) => {
                comparator.accepts(compare_release(version, target))
            }
            Self::Major(major) => version.major == *major,
            Self::Minor(major, minor) => version.major == *major && version.minor == *minor,
        }
    }

    /// Like [`VersionRange::matches`], for an unparsed version string.
    pub fn matches_str(&self, version: &str) -> bool {
        match self {
            Self::Any => true,
            _ => parse_version(version).is_some_and(|v| self.matches(&v)),
        }
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("*"),
            Self::Exact(v) => write!(f, "{v}"),
            Self::Compare(c, v) => write!(f, "{}{v}", c.as_str()),
            Self::Major(major) => write!(f, "{major}.x"),
            Self::Minor(major, minor) => write!(f, "{major}.{minor}.x"),
        }
    }
}

/// Normalized form of `range`, or `None` if it is not a supported range.
pub fn valid_range(range: &str) -> Option<String> {
    VersionRange::parse(range).map(|r| r.to_string())
}

/// Strict `major.minor.patch[-pre][+build]` parse.
pub fn parse_version(version: &str) -> Option<Version> {
    Version::parse(version.trim()).ok()
}

/// Whether `version` falls in `range`. Unparseable input never matches,
/// except that `*` matches everything.
pub fn satisfies(version: &str, range: &str) -> bool {
    VersionRange::parse(range).is_some_and(|r| r.matches_str(version))
}

/// The next major release after `current`, e.g. `1.2.3` becomes `2.0.0`.
pub fn next_major(current: &str) -> String {
    match parse_version(current) {
        Some(v) => format!("{}.0.0", v.major + 1),
        None => FALLBACK_NEXT_MAJOR.to_string(),
    }
}

fn compare_release(a: &Version, b: &Version) -> Ordering {
    (a.major, a.minor, a.patch).cmp(&(b.major, b.minor, b.patch))
}

fn parse_number(text: &str) -> Option<u64> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_major() {
        assert_eq!(next_major("1.2.3"), "2.0.0");
        assert_eq!(next_major("0.0.1"), "1.0.0");
        assert_eq!(next_major("2.0.0-beta.1"), "3.0.0");
        assert_eq!(next_major("not-a-version"), "99.0.0");
    }

    #[test]
    fn test_valid_range_forms() {
        assert_eq!(valid_range("*").as_deref(), Some("*"));
        assert_eq!(valid_range("1.2.3").as_deref(), Some("1.2.3"));
        assert_eq!(valid_range("<=1.2.3").as_deref(), Some("<=1.2.3"));
        assert_eq!(valid_range(">2.0.0").as_deref(), Some(">2.0.0"));
        assert_eq!(valid_range("1.x").as_deref(), Some("1.x"));
        assert_eq!(valid_range("1.4.x").as_deref(), Some("1.4.x"));
        assert_eq!(valid_range("2").as_deref(), Some("2.x"));

        assert_eq!(valid_range("^1.0.0"), None);
        assert_eq!(valid_range(">=banana"), None);
        assert_eq!(valid_range("1.2"), None);
        assert_eq!(valid_range(""), None);
    }

    #[test]
    fn test_satisfies() {
        assert!(satisfies("1.0.0", "*"));
        assert!(satisfies("garbage", "*"));
        assert!(satisfies("1.2.3", "1.2.3"));
        assert!(!satisfies("1.2.4", "1.2.3"));

        assert!(satisfies("1.2.3", "<=1.2.3"));
        assert!(!satisfies("1.2.4", "<=1.2.3"));
        assert!(satisfies("1.2.3", ">=1.2.3"));
        assert!(satisfies("1.2.2", "<1.2.3"));
        assert!(!satisfies("1.2.3", "<1.2.3"));
        assert!(satisfies("2.0.0", ">1.9.9"));

        assert!(satisfies("1.9.0", "1.x"));
        assert!(!satisfies("2.0.0", "1.x"));
        assert!(satisfies("1.4.7", "1.4.x"));
        assert!(!satisfies("1.5.0", "1.4.x"));
        assert!(satisfies("2.3.1", "2"));

        assert!(!satisfies("not-a-version", "1.x"));
        assert!(!satisfies("1.0.0", "bogus"));
    }

    #[test]
    fn test_comparators_ignore_prerelease() {
        assert!(satisfies("1.2.3-beta.1", "<=1.2.3"));
        assert!(satisfies("1.2.3-beta.1", ">=1.2.3"));
    }
}
