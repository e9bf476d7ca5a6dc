//!
//! Controller version parsing and ordering.
//!
//! Versions look like `major.minor`, optionally followed by `.patch` or
//! `-<tag><patch>`, and optionally by a trailing `.build`. A release without
//! a tag sorts after any tagged pre-release of the same `major.minor`.
//!

use regex::Regex;
use std::{cmp::Ordering, fmt, str::FromStr, sync::LazyLock};
use thiserror::Error as ThisError;

static VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<major>\d{1,9})\.(?P<minor>\d{1,9})((?:\.|-(?P<tag>[a-z]+))(?P<patch>\d{1,9}))?(\.(?P<build>\d{1,9}))?$",
    )
    .expect("valid regex")
});

///
/// VersionError
///

#[derive(Debug, ThisError)]
pub enum VersionError {
    #[error("\"{0}\" is not a valid Juju version string")]
    Invalid(String),
}

///
/// JujuVersion
///

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct JujuVersion {
    pub major: u32,
    pub minor: u32,
    pub tag: String,
    pub patch: u32,
    pub build: u32,
}

impl JujuVersion {
    pub fn parse(version: &str) -> Result<Self, VersionError> {
        let caps = VERSION_RE
            .captures(version)
            .ok_or_else(|| VersionError::Invalid(version.to_string()))?;

        let num = |name: &str| -> Result<u32, VersionError> {
            caps.name(name).map_or(Ok(0), |m| {
                m.as_str()
                    .parse()
                    .map_err(|_| VersionError::Invalid(version.to_string()))
            })
        };

        Ok(Self {
            major: num("major")?,
            minor: num("minor")?,
            tag: caps
                .name("tag")
                .map(|m| m.as_str().to_string())
                .unwrap_or_default(),
            patch: num("patch")?,
            build: num("build")?,
        })
    }

    /// Secrets arrived with the 3.x controllers.
    #[must_use]
    pub const fn supports_secrets(&self) -> bool {
        self.major >= 3
    }
}

impl FromStr for JujuVersion {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for JujuVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.tag.is_empty() {
            write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        } else {
            write!(f, "{}.{}-{}{}", self.major, self.minor, self.tag, self.patch)?;
        }
        if self.build > 0 {
            write!(f, ".{}", self.build)?;
        }

        Ok(())
    }
}

// an empty tag sorts after a non-empty one
fn cmp_tag(a: &str, b: &str) -> Ordering {
    match (a.is_empty(), b.is_empty()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.cmp(b),
    }
}

impl Ord for JujuVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.major
            .cmp(&other.major)
            .then(self.minor.cmp(&other.minor))
            .then_with(|| cmp_tag(&self.tag, &other.tag))
            .then(self.patch.cmp(&other.patch))
            .then(self.build.cmp(&other.build))
    }
}

impl PartialOrd for JujuVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

///
/// TESTS
///
