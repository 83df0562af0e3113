//! Maven-style version ordering and version range filtering.
//!
//! Versions are split into items on `.`, `-` and digit/letter transitions.
//! Numeric items compare numerically; qualifiers follow the well-known order
//! `alpha < beta < milestone < rc < snapshot < (release) < sp`, and unknown
//! qualifiers sort after `sp`, lexically among themselves. Trailing release
//! items (`0`, `final`, `ga`, `release`) are ignored, so `1.0 == 1`.

use std::cmp::Ordering;
use std::fmt;

use crate::error::{IndexError, Result};
use crate::types::ArtifactRecord;

#[derive(Debug, Clone, PartialEq, Eq)]
enum VersionItem {
    /// Digits with leading zeros stripped, compared by length then lexically.
    Number(String),
    Qualifier(String),
}

impl VersionItem {
    fn is_null(&self) -> bool {
        match self {
            Self::Number(digits) => digits.is_empty(),
            Self::Qualifier(qualifier) => qualifier_rank(qualifier) == RELEASE_RANK,
        }
    }

    /// Compares against a missing item, which behaves like `0` or a release.
    fn cmp_to_null(&self) -> Ordering {
        match self {
            Self::Number(digits) if digits.is_empty() => Ordering::Equal,
            Self::Number(_) => Ordering::Greater,
            Self::Qualifier(qualifier) => qualifier_rank(qualifier).cmp(&RELEASE_RANK),
        }
    }
}

impl Ord for VersionItem {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => a.len().cmp(&b.len()).then_with(|| a.cmp(b)),
            (Self::Number(_), Self::Qualifier(_)) => Ordering::Greater,
            (Self::Qualifier(_), Self::Number(_)) => Ordering::Less,
            (Self::Qualifier(a), Self::Qualifier(b)) => qualifier_rank(a)
                .cmp(&qualifier_rank(b))
                .then_with(|| {
                    if qualifier_rank(a) == UNKNOWN_RANK {
                        a.cmp(b)
                    } else {
                        Ordering::Equal
                    }
                }),
        }
    }
}

impl PartialOrd for VersionItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

const RELEASE_RANK: u8 = 5;
const UNKNOWN_RANK: u8 = 7;

fn qualifier_rank(qualifier: &str) -> u8 {
    match qualifier {
        "alpha" | "a" => 0,
        "beta" | "b" => 1,
        "milestone" | "m" => 2,
        "rc" | "cr" => 3,
        "snapshot" => 4,
        "" | "final" | "ga" | "release" => RELEASE_RANK,
        "sp" => 6,
        _ => UNKNOWN_RANK,
    }
}

/// A parsed, comparable Maven version.
#[derive(Debug, Clone)]
pub struct MavenVersion {
    raw: String,
    items: Vec<VersionItem>,
}

impl MavenVersion {
    pub fn parse(raw: &str) -> Self {
        let lowered = raw.trim().to_ascii_lowercase();
        let mut items = Vec::new();
        let mut current = String::new();
        let mut current_is_digit = false;

        let flush = |current: &mut String, is_digit: bool, items: &mut Vec<VersionItem>| {
            if current.is_empty() {
                return;
            }
            let token = std::mem::take(current);
            if is_digit {
                items.push(VersionItem::Number(token.trim_start_matches('0').to_string()));
            } else {
                items.push(VersionItem::Qualifier(token));
            }
        };

        for c in lowered.chars() {
            if c == '.' || c == '-' || c == '_' {
                flush(&mut current, current_is_digit, &mut items);
                continue;
            }
            let is_digit = c.is_ascii_digit();
            if !current.is_empty() && is_digit != current_is_digit {
                flush(&mut current, current_is_digit, &mut items);
            }
            current_is_digit = is_digit;
            current.push(c);
        }
        flush(&mut current, current_is_digit, &mut items);

        while items.last().is_some_and(VersionItem::is_null) {
            items.pop();
        }

        Self {
            raw: raw.to_string(),
            items,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl Ord for MavenVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.items.len().max(other.items.len());
        for index in 0..len {
            let ordering = match (self.items.get(index), other.items.get(index)) {
                (Some(a), Some(b)) => a.cmp(b),
                (Some(a), None) => a.cmp_to_null(),
                (None, Some(b)) => b.cmp_to_null().reverse(),
                (None, None) => Ordering::Equal,
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for MavenVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for MavenVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for MavenVersion {}

impl fmt::Display for MavenVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

// ---------------------------------------------------------------------------
// Record filters
// ---------------------------------------------------------------------------

/// Post-query filter applied to reconstructed records.
pub trait ArtifactFilter: Send + Sync {
    fn accepts(&self, record: &ArtifactRecord) -> bool;
}

#[derive(Debug, Clone)]
struct Bound {
    version: MavenVersion,
    exclusive: bool,
}

/// Accepts records whose version falls between optional bounds.
///
/// Bounds are inclusive unless narrowed with the `but_strictly_*` builders.
#[derive(Debug, Clone, Default)]
pub struct VersionRange {
    min: Option<Bound>,
    max: Option<Bound>,
}

impl VersionRange {
    pub fn at_minimum(version: &str) -> Result<Self> {
        Ok(Self {
            min: Some(inclusive(version)?),
            max: None,
        })
    }

    pub fn at_maximum(version: &str) -> Result<Self> {
        Ok(Self {
            min: None,
            max: Some(inclusive(version)?),
        })
    }

    pub fn but_strictly_less_than(self, version: &str) -> Result<Self> {
        Ok(Self {
            max: Some(exclusive(version)?),
            ..self
        })
    }

    pub fn but_strictly_greater_than(self, version: &str) -> Result<Self> {
        Ok(Self {
            min: Some(exclusive(version)?),
            ..self
        })
    }

    pub fn contains(&self, version: &str) -> bool {
        if version.trim().is_empty() {
            // Nothing to compare against; include rather than hide the record.
            return true;
        }
        let version = MavenVersion::parse(version);
        let matches_min = match &self.min {
            None => true,
            Some(bound) if bound.exclusive => version > bound.version,
            Some(bound) => version >= bound.version,
        };
        let matches_max = match &self.max {
            None => true,
            Some(bound) if bound.exclusive => version < bound.version,
            Some(bound) => version <= bound.version,
        };
        matches_min && matches_max
    }
}

impl ArtifactFilter for VersionRange {
    fn accepts(&self, record: &ArtifactRecord) -> bool {
        self.contains(record.coordinate().version())
    }
}

fn checked(version: &str) -> Result<MavenVersion> {
    if version.trim().is_empty() {
        return Err(IndexError::InvalidInput(
            "cannot supply a null or empty version".to_string(),
        ));
    }
    Ok(MavenVersion::parse(version))
}

fn inclusive(version: &str) -> Result<Bound> {
    Ok(Bound {
        version: checked(version)?,
        exclusive: false,
    })
}

fn exclusive(version: &str) -> Result<Bound> {
    Ok(Bound {
        version: checked(version)?,
        exclusive: true,
    })
}
