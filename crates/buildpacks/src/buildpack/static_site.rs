// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Containarium Contributors

//! The last-resort buildpack: serves the source tree as-is. Always
//! detects, so it must stay last in registry order (spec.md §4.4).

use crate::buildpack::Buildpack;
use crate::source_tree::SourceTree;
use crate::spec::{BuildSpec, BuildStep, GenerateOptions, HealthCheck};

pub struct StaticBuildpack;

impl Buildpack for StaticBuildpack {
    fn name(&self) -> &'static str {
        "static"
    }

    fn detect(&self, _tree: &dyn SourceTree) -> bool {
        true
    }

    fn generate(&self, _tree: &dyn SourceTree, opts: &GenerateOptions) -> BuildSpec {
        BuildSpec {
            buildpack: self.name(),
            buildpack_version: "1",
            base_image: "nginx:stable-alpine".to_string(),
            steps: vec![BuildStep { copy_from: ".".to_string(), copy_to: "/usr/share/nginx/html".to_string(), run_after_copy: None }],
            exposed_port: opts.declared_port,
            run_command: vec!["nginx".to_string(), "-g".to_string(), "daemon off;".to_string()],
            health_check: Some(HealthCheck { path: "/".to_string(), interval_seconds: 15 }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source_tree::MemorySourceTree;

    #[test]
    fn always_detects() {
        assert!(StaticBuildpack.detect(&MemorySourceTree::new()));
    }
}
