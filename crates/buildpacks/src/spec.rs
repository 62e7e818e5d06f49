// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Containarium Contributors

//! The generated image build spec (spec.md §4.4). Field order here is the
//! serialized order — keep it stable, it's part of what "byte-identical
//! output for identical input" means.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildSpec {
    pub buildpack: &'static str,
    pub buildpack_version: &'static str,
    pub base_image: String,
    /// In dependency-cache order: lock files copied first, then the rest.
    pub steps: Vec<BuildStep>,
    pub exposed_port: u16,
    pub run_command: Vec<String>,
    pub health_check: Option<HealthCheck>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildStep {
    pub copy_from: String,
    pub copy_to: String,
    pub run_after_copy: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheck {
    pub path: String,
    pub interval_seconds: u32,
}

impl BuildSpec {
    /// Deterministic byte-identical encoding for the round-trip property
    /// (spec.md §8: "Detect(src) == Detect(src) for the same bytes").
    pub fn canonical_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(self).expect("BuildSpec always serializes")
    }
}

#[derive(Debug, Clone)]
pub struct GenerateOptions {
    pub declared_port: u16,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self { declared_port: 3000 }
    }
}
