// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Containarium Contributors

use crate::buildpack::Buildpack;
use crate::source_tree::SourceTree;
use crate::spec::{BuildSpec, BuildStep, GenerateOptions, HealthCheck};

pub struct RustBuildpack;

const DEFAULT_RUST_VERSION: &str = "1.78";

impl Buildpack for RustBuildpack {
    fn name(&self) -> &'static str {
        "rust"
    }

    fn detect(&self, tree: &dyn SourceTree) -> bool {
        tree.exists("Cargo.toml")
    }

    fn generate(&self, tree: &dyn SourceTree, opts: &GenerateOptions) -> BuildSpec {
        let version = tree.read_to_string("rust-toolchain.toml").and_then(|s| parse_channel(&s)).unwrap_or_else(|| DEFAULT_RUST_VERSION.to_string());
        let has_lock = tree.exists("Cargo.lock");

        let mut steps = vec![BuildStep { copy_from: "Cargo.toml".to_string(), copy_to: "Cargo.toml".to_string(), run_after_copy: None }];
        if has_lock {
            steps.push(BuildStep { copy_from: "Cargo.lock".to_string(), copy_to: "Cargo.lock".to_string(), run_after_copy: None });
        }
        steps.push(BuildStep { copy_from: ".".to_string(), copy_to: ".".to_string(), run_after_copy: Some("cargo build --release".to_string()) });

        BuildSpec {
            buildpack: self.name(),
            buildpack_version: "1",
            base_image: format!("rust:{version}-slim"),
            steps,
            exposed_port: opts.declared_port,
            run_command: vec!["sh".to_string(), "-c".to_string(), "./target/release/$(basename \"$PWD\")".to_string()],
            health_check: None,
        }
    }
}

fn parse_channel(toolchain_toml: &str) -> Option<String> {
    toolchain_toml.lines().find_map(|l| l.trim().strip_prefix("channel").and_then(|rest| rest.split('"').nth(1)).map(str::to_string))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source_tree::MemorySourceTree;

    #[test]
    fn detects_cargo_manifest() {
        let tree = MemorySourceTree::new().with_file("Cargo.toml", "[package]\nname='x'");
        assert!(RustBuildpack.detect(&tree));
    }

    #[test]
    fn lockfile_copied_before_source_when_present() {
        let tree = MemorySourceTree::new().with_file("Cargo.toml", "").with_file("Cargo.lock", "");
        let spec = RustBuildpack.generate(&tree, &GenerateOptions::default());
        assert_eq!(spec.steps[1].copy_from, "Cargo.lock");
    }
}
