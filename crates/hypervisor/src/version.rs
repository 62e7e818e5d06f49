// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Containarium Contributors

//! Hypervisor daemon version gate (spec.md §4.1, §4.8).

use crate::error::HypervisorError;

/// Minimum daemon API version this client was written against.
pub const MIN_API_VERSION: (u32, u32) = (1, 0);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionCheck {
    /// Parses and is `>= MIN_API_VERSION`.
    Ok,
    /// Parses, is newer than anything this client has seen tested, but
    /// still `>= MIN_API_VERSION` — non-fatal per spec.md §4.1.
    UnknownButNewer(String),
}

pub fn check_version(reported: &str) -> Result<VersionCheck, HypervisorError> {
    let (major, minor) = parse_version(reported)
        .ok_or_else(|| HypervisorError::Internal(format!("unparseable hypervisor API version: {reported:?}")))?;

    if (major, minor) < MIN_API_VERSION {
        return Err(HypervisorError::Unavailable(format!(
            "hypervisor API version {reported} is below the minimum supported {}.{}",
            MIN_API_VERSION.0, MIN_API_VERSION.1
        )));
    }

    const KNOWN_MAX: (u32, u32) = (1, 0);
    if (major, minor) > KNOWN_MAX {
        Ok(VersionCheck::UnknownButNewer(reported.to_string()))
    } else {
        Ok(VersionCheck::Ok)
    }
}

fn parse_version(s: &str) -> Option<(u32, u32)> {
    let mut parts = s.split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next().unwrap_or("0").parse().ok()?;
    Some((major, minor))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refuses_versions_below_minimum() {
        let err = check_version("0.9").unwrap_err();
        assert!(matches!(err, HypervisorError::Unavailable(_)));
    }

    #[test]
    fn accepts_minimum_version() {
        assert_eq!(check_version("1.0").unwrap(), VersionCheck::Ok);
    }

    #[test]
    fn surfaces_newer_unknown_versions_non_fatally() {
        let result = check_version("2.3").unwrap();
        assert_eq!(result, VersionCheck::UnknownButNewer("2.3".to_string()));
    }

    #[test]
    fn rejects_garbage() {
        assert!(check_version("not-a-version").is_err());
    }
}
