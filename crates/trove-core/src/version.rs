//! Semantic version values

use crate::error::{Result, TroveError};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// An immutable `MAJOR.MINOR.PATCH` version.
///
/// Ordering is lexicographic on the triple. Bumping returns a new value.
#[derive(Clone, Copy, Debug, Default, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

/// Which component of a version to increment
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionField {
    Major,
    Minor,
    Patch,
}

impl Version {
    /// Version given to files without a `_v` suffix
    pub const ZERO: Version = Version::new(0, 0, 0);

    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Strict three-segment parse
    pub fn parse(s: &str) -> Result<Self> {
        let invalid = || TroveError::InvalidVersion(s.to_string());

        let mut parts = s.split('.');
        let (Some(major), Some(minor), Some(patch), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid());
        };

        Ok(Self {
            major: parse_segment(major).ok_or_else(invalid)?,
            minor: parse_segment(minor).ok_or_else(invalid)?,
            patch: parse_segment(patch).ok_or_else(invalid)?,
        })
    }

    /// Increment one field. Lower fields reset to zero.
    ///
    /// Fails with [`TroveError::VersionOverflow`] when the field is already
    /// `u64::MAX`, so a bumped version is always strictly greater.
    pub fn bump(self, field: VersionField) -> Result<Self> {
        let overflow = || TroveError::VersionOverflow {
            version: self.to_string(),
            field: field.to_string(),
        };
        let bumped = match field {
            VersionField::Major => Self::new(self.major.checked_add(1).ok_or_else(overflow)?, 0, 0),
            VersionField::Minor => Self::new(
                self.major,
                self.minor.checked_add(1).ok_or_else(overflow)?,
                0,
            ),
            VersionField::Patch => Self::new(
                self.major,
                self.minor,
                self.patch.checked_add(1).ok_or_else(overflow)?,
            ),
        };
        Ok(bumped)
    }

    /// Highest version of a set; fails when the set is empty
    pub fn highest<I>(versions: I) -> Result<Self>
    where
        I: IntoIterator<Item = Version>,
    {
        versions
            .into_iter()
            .max()
            .ok_or(TroveError::EmptyVersionSet)
    }
}

fn parse_segment(segment: &str) -> Option<u64> {
    if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if segment.len() > 1 && segment.starts_with('0') {
        return None;
    }
    segment.parse().ok()
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for Version {
    type Err = TroveError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Version::parse(&s).map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for VersionField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VersionField::Major => "major",
            VersionField::Minor => "minor",
            VersionField::Patch => "patch",
        };
        f.write_str(name)
    }
}

impl FromStr for VersionField {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "major" => Ok(VersionField::Major),
            "minor" => Ok(VersionField::Minor),
            "patch" => Ok(VersionField::Patch),
            other => Err(format!(
                "unknown version field '{}'; valid values: major, minor, patch",
                other
            )),
        }
    }
}
