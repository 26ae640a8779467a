//! Version Comparison
//!
//! Availability is decided by the manifest: a `sourceURL` means an update is
//! offered. `VersionPolicy::RequireNewer` additionally refuses offers that are
//! not newer than the installed version.

use serde::{Deserialize, Serialize};

/// Who decides whether an offered version should be installed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum VersionPolicy {
    /// The manifest server is the sole authority
    #[default]
    ServerTrust,
    /// The offered version must compare greater than the local one
    RequireNewer,
}

impl VersionPolicy {
    /// Whether an offer of `latest` should be accepted over `local`
    pub fn accepts(&self, local: &str, latest: &str) -> bool {
        match self {
            Self::ServerTrust => true,
            Self::RequireNewer => is_newer_version(latest, local),
        }
    }
}

/// Check if version `a` is newer than version `b`
///
/// Compares dot-separated numeric components; a leading `v` is ignored and
/// components that are not numbers are skipped.
pub fn is_newer_version(a: &str, b: &str) -> bool {
    parse_components(a) > parse_components(b)
}

fn parse_components(v: &str) -> Vec<u64> {
    let mut parts: Vec<u64> = v
        .trim()
        .trim_start_matches('v')
        .split('.')
        .filter_map(|s| s.parse().ok())
        .collect();
    // "1.2" and "1.2.0" are the same release
    while parts.last() == Some(&0) {
        parts.pop();
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_comparison() {
        assert!(is_newer_version("0.2.0", "0.1.0"));
        assert!(is_newer_version("1.0.0", "0.9.9"));
        assert!(is_newer_version("0.1.1", "0.1.0"));
        assert!(is_newer_version("v1.10.0", "1.9.0"));
        assert!(!is_newer_version("0.1.0", "0.1.0"));
        assert!(!is_newer_version("0.1.0", "0.2.0"));
        assert!(!is_newer_version("1.2", "1.2.0"));
    }

    #[test]
    fn test_server_trust_accepts_anything() {
        assert!(VersionPolicy::ServerTrust.accepts("2.0.0", "1.0.0"));
        assert!(VersionPolicy::ServerTrust.accepts("1.0.0", "1.0.0"));
    }

    #[test]
    fn test_require_newer() {
        let policy = VersionPolicy::RequireNewer;
        assert!(policy.accepts("1.0.0", "1.2.0"));
        assert!(!policy.accepts("1.0.0", "1.0.0"));
        assert!(!policy.accepts("2.0.0", "1.9.9"));
    }
}
