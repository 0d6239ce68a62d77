//! Dotted interpreter versions with numeric ordering.
//!
//! Components compare as integers, so `3.9 < 3.11`. Missing trailing
//! components count as zero (`3.11 == 3.11.0`).

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use anyhow::{Result, anyhow};
use regex::Regex;

static VERSION_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Python\s+(\d+(?:\.\d+)*)").expect("version regex compiles")
});

/// A dotted version such as `3.11` or `3.12.4`.
///
/// Keeps the text it was parsed from so error messages echo exactly what the
/// user configured or what the interpreter reported.
#[derive(Debug, Clone)]
pub struct Version {
    components: Vec<u64>,
    raw: String,
}

impl Version {
    pub fn parse(input: &str) -> Result<Self> {
        let raw = input.trim();
        if raw.is_empty() {
            return Err(anyhow!("empty version string"));
        }
        let components = raw
            .split('.')
            .map(|part| {
                leading_number(part)
                    .ok_or_else(|| anyhow!("invalid version component {part:?} in {raw:?}"))
            })
            .collect::<Result<Vec<u64>>>()?;
        Ok(Self {
            components,
            raw: raw.to_string(),
        })
    }

    /// Extract the version from `python --version` output (`Python 3.11.4`).
    pub fn from_interpreter_output(output: &str) -> Option<Self> {
        let caps = VERSION_LINE.captures(output)?;
        Self::parse(caps.get(1)?.as_str()).ok()
    }

    pub fn major(&self) -> u64 {
        self.component(0)
    }

    pub fn minor(&self) -> u64 {
        self.component(1)
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    fn component(&self, index: usize) -> u64 {
        self.components.get(index).copied().unwrap_or(0)
    }
}

/// Parse the numeric prefix of a component, so `0rc1` reads as `0`.
fn leading_number(part: &str) -> Option<u64> {
    let digits: &str = &part[..part
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(part.len())];
    digits.parse().ok()
}

impl FromStr for Version {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.components.len().max(other.components.len());
        (0..len)
            .map(|i| self.component(i).cmp(&other.component(i)))
            .find(|ord| *ord != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

/// True when `found` satisfies the `required` minimum.
pub fn meets_minimum(found: &Version, required: &Version) -> bool {
    found >= required
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s).expect("parse version")
    }

    #[test]
    fn minor_components_compare_numerically() {
        assert!(v("3.9") < v("3.11"));
        assert!(v("3.10") < v("3.11"));
        assert!(v("3.11") > v("3.9"));
        assert!(v("2.7.18") < v("3.0"));
    }

    #[test]
    fn missing_components_count_as_zero() {
        assert_eq!(v("3.11"), v("3.11.0"));
        assert!(v("3.11.1") > v("3.11"));
    }

    #[test]
    fn meets_minimum_is_inclusive() {
        assert!(meets_minimum(&v("3.11"), &v("3.11")));
        assert!(meets_minimum(&v("3.12.4"), &v("3.11")));
        assert!(!meets_minimum(&v("3.10"), &v("3.11")));
        assert!(!meets_minimum(&v("3.9.18"), &v("3.11")));
    }

    #[test]
    fn parses_interpreter_banner() {
        let found = Version::from_interpreter_output("Python 3.11.4\n").expect("version");
        assert_eq!(found.as_str(), "3.11.4");
        assert_eq!(found.major(), 3);
        assert_eq!(found.minor(), 11);
    }

    #[test]
    fn prerelease_suffix_is_dropped_from_banner() {
        let found = Version::from_interpreter_output("Python 3.13.0rc1").expect("version");
        assert_eq!(found.as_str(), "3.13.0");
        assert_eq!(found, v("3.13"));
    }

    #[test]
    fn rejects_unparseable_versions() {
        assert!(Version::parse("").is_err());
        assert!(Version::parse("three.eleven").is_err());
        assert!(Version::parse("3..11").is_err());
        assert!(Version::from_interpreter_output("command not found").is_none());
    }

    #[test]
    fn display_keeps_original_text() {
        assert_eq!(v("3.9").to_string(), "3.9");
        assert_eq!(v(" 3.11.0 ").to_string(), "3.11.0");
    }
}
