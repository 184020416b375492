//! WFS protocol versions and the registry of versions the client speaks.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// A `MAJOR.MINOR.PATCH` protocol version.
///
/// Ordering is lexicographic over the three components, so `1.10.0 > 1.9.0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProtocolVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl ProtocolVersion {
    /// WFS 1.0.0
    pub const V1_0_0: ProtocolVersion = ProtocolVersion::new(1, 0, 0);
    /// WFS 1.1.0
    pub const V1_1_0: ProtocolVersion = ProtocolVersion::new(1, 1, 0);
    /// WFS 2.0.0
    pub const V2_0_0: ProtocolVersion = ProtocolVersion::new(2, 0, 0);

    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parse a version, returning `None` for anything that is not a strict
    /// `MAJOR.MINOR.PATCH` triple.
    pub fn parse(s: &str) -> Option<Self> {
        s.parse().ok()
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Error returned when a version string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid protocol version '{0}': expected MAJOR.MINOR.PATCH")]
pub struct VersionParseError(pub String);

impl FromStr for ProtocolVersion {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || VersionParseError(s.to_string());

        let mut parts = s.trim().split('.');
        let mut component = || -> Result<u32, VersionParseError> {
            let part = parts.next().ok_or_else(invalid)?;
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            part.parse().map_err(|_| invalid())
        };

        let version = ProtocolVersion::new(component()?, component()?, component()?);
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(version)
    }
}

impl TryFrom<String> for ProtocolVersion {
    type Error = VersionParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ProtocolVersion> for String {
    fn from(value: ProtocolVersion) -> Self {
        value.to_string()
    }
}

/// A version as declared by a server: any valid semantic version.
///
/// Unlike [`ProtocolVersion`] it may carry a pre-release (`2.0.0-rc.1`) and
/// build metadata (`1.1.0+build.7`). Precedence against a release follows
/// semver: a pre-release sorts below its release and build metadata is
/// ignored.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeclaredVersion {
    release: ProtocolVersion,
    pre: Option<String>,
    build: Option<String>,
}

impl DeclaredVersion {
    pub fn parse(s: &str) -> Option<Self> {
        s.parse().ok()
    }

    /// The `MAJOR.MINOR.PATCH` part.
    pub fn release(&self) -> ProtocolVersion {
        self.release
    }

    pub fn pre_release(&self) -> Option<&str> {
        self.pre.as_deref()
    }

    pub fn build(&self) -> Option<&str> {
        self.build.as_deref()
    }

    pub fn is_prerelease(&self) -> bool {
        self.pre.is_some()
    }

    /// The release version this declaration is equal to, unless it is a
    /// pre-release.
    pub fn as_release(&self) -> Option<ProtocolVersion> {
        match self.pre {
            Some(_) => None,
            None => Some(self.release),
        }
    }

    /// Semver precedence of this version against a release.
    pub fn cmp_release(&self, other: &ProtocolVersion) -> Ordering {
        match self.release.cmp(other) {
            Ordering::Equal if self.pre.is_some() => Ordering::Less,
            ordering => ordering,
        }
    }
}

impl From<ProtocolVersion> for DeclaredVersion {
    fn from(release: ProtocolVersion) -> Self {
        Self {
            release,
            pre: None,
            build: None,
        }
    }
}

impl PartialEq<ProtocolVersion> for DeclaredVersion {
    fn eq(&self, other: &ProtocolVersion) -> bool {
        self.pre.is_none() && self.build.is_none() && self.release == *other
    }
}

impl fmt::Display for DeclaredVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.release)?;
        if let Some(pre) = &self.pre {
            write!(f, "-{}", pre)?;
        }
        if let Some(build) = &self.build {
            write!(f, "+{}", build)?;
        }
        Ok(())
    }
}

impl FromStr for DeclaredVersion {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || VersionParseError(s.to_string());

        let trimmed = s.trim();
        let trimmed = trimmed.strip_prefix('v').unwrap_or(trimmed);
        let (rest, build) = match trimmed.split_once('+') {
            Some((rest, build)) => (rest, Some(build)),
            None => (trimmed, None),
        };
        let (core, pre) = match rest.split_once('-') {
            Some((core, pre)) => (core, Some(pre)),
            None => (rest, None),
        };

        // Core components are numeric identifiers: no sign, no leading zero
        let mut components = [0u32; 3];
        let mut parts = core.split('.');
        for component in components.iter_mut() {
            let part = parts.next().ok_or_else(invalid)?;
            if !is_numeric_identifier(part) {
                return Err(invalid());
            }
            *component = part.parse().map_err(|_| invalid())?;
        }
        if parts.next().is_some() {
            return Err(invalid());
        }

        if let Some(pre) = pre {
            let valid = pre.split('.').all(|id| {
                is_alphanumeric_identifier(id)
                    && (!id.bytes().all(|b| b.is_ascii_digit()) || is_numeric_identifier(id))
            });
            if !valid {
                return Err(invalid());
            }
        }
        if let Some(build) = build {
            if !build.split('.').all(is_alphanumeric_identifier) {
                return Err(invalid());
            }
        }

        Ok(Self {
            release: ProtocolVersion::new(components[0], components[1], components[2]),
            pre: pre.map(str::to_string),
            build: build.map(str::to_string),
        })
    }
}

fn is_numeric_identifier(id: &str) -> bool {
    !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit()) && (id == "0" || !id.starts_with('0'))
}

fn is_alphanumeric_identifier(id: &str) -> bool {
    !id.is_empty() && id.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
}

/// Versions understood by this client, lowest first.
pub const SUPPORTED_VERSIONS: &[ProtocolVersion] = &[
    ProtocolVersion::V1_0_0,
    ProtocolVersion::V1_1_0,
    ProtocolVersion::V2_0_0,
];

/// Ordered, duplicate-free set of protocol versions, highest last.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRegistry {
    versions: Cow<'static, [ProtocolVersion]>,
}

impl VersionRegistry {
    /// The registry of versions this client supports.
    pub const fn supported() -> Self {
        Self {
            versions: Cow::Borrowed(SUPPORTED_VERSIONS),
        }
    }

    /// Build a registry from arbitrary versions. Input is sorted and de-duplicated.
    pub fn new(versions: impl IntoIterator<Item = ProtocolVersion>) -> Self {
        let mut versions: Vec<ProtocolVersion> = versions.into_iter().collect();
        versions.sort_unstable();
        versions.dedup();
        Self {
            versions: Cow::Owned(versions),
        }
    }

    /// All versions, highest last.
    pub fn versions(&self) -> &[ProtocolVersion] {
        &self.versions
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    /// Highest registered version.
    pub fn highest(&self) -> Option<ProtocolVersion> {
        self.versions.last().copied()
    }

    pub fn contains(&self, version: &ProtocolVersion) -> bool {
        self.versions.binary_search(version).is_ok()
    }

    /// Greatest registered version strictly less than `version`.
    pub fn greatest_below(&self, version: &ProtocolVersion) -> Option<ProtocolVersion> {
        let idx = self.versions.partition_point(|v| v < version);
        idx.checked_sub(1).map(|i| self.versions[i])
    }

    /// Comma-separated listing for diagnostics, e.g. `1.0.0, 1.1.0, 2.0.0`.
    pub fn display_list(&self) -> String {
        self.versions
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl Default for VersionRegistry {
    fn default() -> Self {
        Self::supported()
    }
}
