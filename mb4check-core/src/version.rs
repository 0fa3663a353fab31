//! Server version parsing and the minimum-version policy.
//!
//! `SELECT VERSION()` returns strings such as `8.0.36`, `5.7.44-log` or
//! `10.11.6-MariaDB-1:10.11.6+maria~ubu2204`. Everything from the first
//! hyphen on is a vendor/build suffix and is dropped before parsing.

use crate::Result;
use crate::error::Mb4CheckError;

/// Oldest release that ships the utf8mb4 character set.
pub const MINIMUM_VERSION: ServerVersion = ServerVersion {
    major: 5,
    minor: 5,
    patch: 3,
};

/// A `major.minor.patch` server version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerVersion {
    /// Major release number
    pub major: u32,
    /// Minor release number
    pub minor: u32,
    /// Patch release number
    pub patch: u32,
}

impl std::fmt::Display for ServerVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl ServerVersion {
    /// Returns the part of `raw` before the first hyphen.
    ///
    /// ```rust
    /// use mb4check_core::version::ServerVersion;
    ///
    /// assert_eq!(ServerVersion::truncate("5.7.44-log"), "5.7.44");
    /// assert_eq!(ServerVersion::truncate("8.0.36"), "8.0.36");
    /// ```
    pub fn truncate(raw: &str) -> &str {
        raw.split_once('-').map_or(raw, |(version, _)| version)
    }

    /// Parses a raw server version string.
    ///
    /// # Errors
    /// Returns `MalformedVersion` unless the truncated string is exactly three
    /// dot-separated unsigned integers.
    pub fn parse(raw: &str) -> Result<Self> {
        let truncated = Self::truncate(raw);
        let parts: Vec<&str> = truncated.split('.').collect();

        let [major, minor, patch] = parts[..] else {
            return Err(Mb4CheckError::malformed_version(
                raw,
                format!("expected 3 components, got {}", parts.len()),
            ));
        };

        let component = |name: &str, value: &str| -> Result<u32> {
            value.trim().parse::<u32>().map_err(|e| {
                Mb4CheckError::malformed_version(raw, format!("invalid {} '{}': {}", name, value, e))
            })
        };

        Ok(Self {
            major: component("major", major)?,
            minor: component("minor", minor)?,
            patch: component("patch", patch)?,
        })
    }

    /// Applies the minimum-version policy.
    ///
    /// Each component is compared on its own against 5.5.3, so a server
    /// reporting 6.0.0 or 8.0.36 is rejected because its minor number is
    /// below 5.
    pub fn meets_minimum(&self) -> bool {
        self.major >= MINIMUM_VERSION.major
            && self.minor >= MINIMUM_VERSION.minor
            && self.patch >= MINIMUM_VERSION.patch
    }

    /// Returns `UnsupportedVersion` unless [`meets_minimum`](Self::meets_minimum) holds.
    ///
    /// # Errors
    /// Fails when the version is below the policy threshold
    pub fn ensure_supported(&self) -> Result<()> {
        if self.meets_minimum() {
            Ok(())
        } else {
            Err(Mb4CheckError::UnsupportedVersion {
                found: self.to_string(),
                minimum: MINIMUM_VERSION.to_string(),
            })
        }
    }
}
