// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Containarium Contributors

//! Name-format validators (spec.md §6 "Name formats").
//!
//! Kept as hand-written character scans rather than a `regex::Regex` built
//! per call: every one of these patterns is anchored and simple enough that
//! a scan is both faster and allocation-free, and it keeps this leaf crate
//! dependency-free.

/// `^[a-z][a-z0-9-]{0,30}$` — container/application owner usernames and
/// application names.
pub fn is_valid_username(s: &str) -> bool {
    is_valid_slug(s, 31)
}

/// `^[a-z0-9][a-z0-9-]{0,62}$` — custom sub-domain overrides.
pub fn is_valid_subdomain_label(s: &str) -> bool {
    if s.is_empty() || s.len() > 63 {
        return false;
    }
    let mut chars = s.chars();
    let first = chars.next().unwrap();
    if !(first.is_ascii_lowercase() || first.is_ascii_digit()) {
        return false;
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

fn is_valid_slug(s: &str, max_len: usize) -> bool {
    if s.is_empty() || s.len() > max_len {
        return false;
    }
    let mut chars = s.chars();
    let first = chars.next().unwrap();
    if !first.is_ascii_lowercase() {
        return false;
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

/// Shell-safe environment variable identifier, used to validate `DeployRequest::env` keys.
pub fn is_valid_env_key(s: &str) -> bool {
    if s.is_empty() {
        return false;
    }
    let mut chars = s.chars();
    let first = chars.next().unwrap();
    if !(first.is_ascii_alphabetic() || first == '_') {
        return false;
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Container name derived from an owner username: `<username>-container`.
pub fn container_name(owner: &str) -> String {
    format!("{owner}-container")
}

/// Default sub-domain for an application: `<owner>-<appname>`.
pub fn default_subdomain(owner: &str, app_name: &str) -> String {
    format!("{owner}-{app_name}")
}

/// Proxy route id for an application: `<owner>-<appname>` (spec.md §6), stable across redeploys.
pub fn route_id(owner: &str, app_name: &str) -> String {
    format!("{owner}-{app_name}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_accepts_valid_forms() {
        assert!(is_valid_username("alice"));
        assert!(is_valid_username("a"));
        assert!(is_valid_username("a-b-c9"));
    }

    #[test]
    fn username_rejects_invalid_forms() {
        assert!(!is_valid_username(""));
        assert!(!is_valid_username("Alice"));
        assert!(!is_valid_username("9alice"));
        assert!(!is_valid_username("-alice"));
        assert!(!is_valid_username("alice_"));
        assert!(!is_valid_username(&"a".repeat(32)));
    }

    #[test]
    fn subdomain_label_allows_leading_digit() {
        assert!(is_valid_subdomain_label("9alice-myapp"));
        assert!(!is_valid_subdomain_label("Alice"));
        assert!(!is_valid_subdomain_label(""));
    }

    #[test]
    fn env_key_matches_shell_identifier() {
        assert!(is_valid_env_key("PORT"));
        assert!(is_valid_env_key("_secret_1"));
        assert!(!is_valid_env_key("1PORT"));
        assert!(!is_valid_env_key("PORT-NUM"));
    }

    #[test]
    fn derived_names_match_spec_formats() {
        assert_eq!(container_name("alice"), "alice-container");
        assert_eq!(default_subdomain("alice", "myapp"), "alice-myapp");
        assert_eq!(route_id("alice", "myapp"), "alice-myapp");
    }
}
