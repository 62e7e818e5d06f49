// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Containarium Contributors

//! The ordered buildpack registry (spec.md §4.4). Detection order is
//! stable and first-match-wins; a user-provided build spec at the source
//! root short-circuits detection entirely.

use crate::buildpack::golang::GoBuildpack;
use crate::buildpack::nodejs::NodeJsBuildpack;
use crate::buildpack::php::PhpBuildpack;
use crate::buildpack::python::PythonBuildpack;
use crate::buildpack::ruby::RubyBuildpack;
use crate::buildpack::rust_lang::RustBuildpack;
use crate::buildpack::static_site::StaticBuildpack;
use crate::buildpack::Buildpack;
use crate::error::BuildpackError;
use crate::source_tree::SourceTree;
use crate::spec::{BuildSpec, GenerateOptions};

/// User-provided build spec marker (spec.md §4.4: "a user-provided image
/// build spec at the source root short-circuits detection").
const USER_SPEC_FILE: &str = "containarium.build.json";

/// Hard cap on an uploaded source tree's size; enforced before detection
/// runs so we never scan (or later, build) an oversized tarball.
pub const DEFAULT_SOURCE_SIZE_CAP_BYTES: u64 = 200 * 1024 * 1024;

pub struct BuildpackRegistry {
    buildpacks: Vec<Box<dyn Buildpack>>,
    size_cap_bytes: u64,
}

impl Default for BuildpackRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_SOURCE_SIZE_CAP_BYTES)
    }
}

impl BuildpackRegistry {
    pub fn new(size_cap_bytes: u64) -> Self {
        Self {
            // Order is load-bearing: spec.md §4.4 "Node.js, Python, Go, Rust, Ruby, PHP, static".
            buildpacks: vec![
                Box::new(NodeJsBuildpack),
                Box::new(PythonBuildpack),
                Box::new(GoBuildpack),
                Box::new(RustBuildpack),
                Box::new(RubyBuildpack),
                Box::new(PhpBuildpack),
                Box::new(StaticBuildpack),
            ],
            size_cap_bytes,
        }
    }

    pub fn detect<'a>(&'a self, tree: &dyn SourceTree) -> Option<&'a dyn Buildpack> {
        self.buildpacks.iter().find(|bp| bp.detect(tree)).map(|bp| bp.as_ref())
    }

    /// Detects (or short-circuits via a user spec) and generates, enforcing
    /// the size cap first.
    pub fn generate(&self, tree: &dyn SourceTree, opts: &GenerateOptions) -> Result<BuildSpec, BuildpackError> {
        let size = tree.total_size_bytes();
        if size > self.size_cap_bytes {
            return Err(BuildpackError::SourceTooLarge { actual: size, cap: self.size_cap_bytes });
        }

        if let Some(user_spec) = tree.read_to_string(USER_SPEC_FILE) {
            return serde_json::from_str(&user_spec).map_err(|e| BuildpackError::MalformedUserSpec(e.to_string()));
        }

        let buildpack = self.detect(tree).ok_or(BuildpackError::NoMatch)?;
        Ok(buildpack.generate(tree, opts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source_tree::MemorySourceTree;

    #[test]
    fn detection_order_prefers_nodejs_over_static() {
        let registry = BuildpackRegistry::default();
        let tree = MemorySourceTree::new().with_file("package.json", "{}");
        assert_eq!(registry.detect(&tree).unwrap().name(), "nodejs");
    }

    #[test]
    fn no_markers_falls_through_to_static() {
        let registry = BuildpackRegistry::default();
        let tree = MemorySourceTree::new().with_file("index.html", "<h1>hi</h1>");
        assert_eq!(registry.detect(&tree).unwrap().name(), "static");
    }

    #[test]
    fn oversized_source_is_rejected_before_detection() {
        let registry = BuildpackRegistry::new(10);
        let tree = MemorySourceTree::new().with_file("package.json", "{\"much\":\"too big for the cap\"}");
        let err = registry.generate(&tree, &GenerateOptions::default()).unwrap_err();
        assert!(matches!(err, BuildpackError::SourceTooLarge { .. }));
    }

    #[test]
    fn generation_is_deterministic_for_identical_input() {
        let registry = BuildpackRegistry::default();
        let tree = MemorySourceTree::new().with_file("go.mod", "module x\n\ngo 1.22\n");
        let opts = GenerateOptions::default();
        let a = registry.generate(&tree, &opts).unwrap();
        let b = registry.generate(&tree, &opts).unwrap();
        assert_eq!(a.canonical_bytes(), b.canonical_bytes());
    }

    #[test]
    fn user_provided_spec_short_circuits_detection() {
        let registry = BuildpackRegistry::default();
        let user_spec = BuildSpec {
            buildpack: "custom",
            buildpack_version: "0",
            base_image: "scratch".to_string(),
            steps: vec![],
            exposed_port: 9999,
            run_command: vec!["/bin/app".to_string()],
            health_check: None,
        };
        let tree = MemorySourceTree::new()
            .with_file("package.json", "{}")
            .with_file(USER_SPEC_FILE, serde_json::to_string(&user_spec).unwrap());
        let generated = registry.generate(&tree, &GenerateOptions::default()).unwrap();
        assert_eq!(generated.buildpack, "custom");
    }
}
