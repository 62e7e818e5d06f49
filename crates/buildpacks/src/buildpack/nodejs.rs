// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Containarium Contributors

use crate::buildpack::Buildpack;
use crate::source_tree::SourceTree;
use crate::spec::{BuildSpec, BuildStep, GenerateOptions, HealthCheck};

pub struct NodeJsBuildpack;

const DEFAULT_NODE_VERSION: &str = "20";

impl Buildpack for NodeJsBuildpack {
    fn name(&self) -> &'static str {
        "nodejs"
    }

    fn detect(&self, tree: &dyn SourceTree) -> bool {
        tree.exists("package.json")
    }

    fn generate(&self, tree: &dyn SourceTree, opts: &GenerateOptions) -> BuildSpec {
        let is_next = tree.any_matching(".", &["next.config.js", "next.config.mjs", "next.config.ts"]);
        let node_version = tree
            .read_to_string("package.json")
            .and_then(|s| parse_engines_node(&s))
            .unwrap_or_else(|| DEFAULT_NODE_VERSION.to_string());

        let mut steps = vec![BuildStep {
            copy_from: "package.json".to_string(),
            copy_to: "package.json".to_string(),
            run_after_copy: None,
        }];
        if tree.exists("package-lock.json") {
            steps.push(BuildStep {
                copy_from: "package-lock.json".to_string(),
                copy_to: "package-lock.json".to_string(),
                run_after_copy: Some("npm ci".to_string()),
            });
        } else {
            steps.push(BuildStep { copy_from: ".".to_string(), copy_to: ".".to_string(), run_after_copy: Some("npm install".to_string()) });
        }
        steps.push(BuildStep { copy_from: ".".to_string(), copy_to: ".".to_string(), run_after_copy: None });
        if is_next {
            steps.push(BuildStep { copy_from: ".".to_string(), copy_to: ".".to_string(), run_after_copy: Some("npm run build".to_string()) });
        }

        BuildSpec {
            buildpack: self.name(),
            buildpack_version: "1",
            base_image: format!("node:{node_version}-slim"),
            steps,
            exposed_port: opts.declared_port,
            run_command: if is_next {
                vec!["npm".to_string(), "run".to_string(), "start".to_string()]
            } else {
                vec!["npm".to_string(), "start".to_string()]
            },
            health_check: Some(HealthCheck { path: "/".to_string(), interval_seconds: 10 }),
        }
    }
}

fn parse_engines_node(package_json: &str) -> Option<String> {
    let v: serde_json::Value = serde_json::from_str(package_json).ok()?;
    v["engines"]["node"].as_str().map(|s| s.trim_start_matches(['^', '~', '>', '=']).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source_tree::MemorySourceTree;

    #[test]
    fn detects_package_json() {
        let tree = MemorySourceTree::new().with_file("package.json", "{}");
        assert!(NodeJsBuildpack.detect(&tree));
    }

    #[test]
    fn next_config_selects_multi_stage_build() {
        let tree = MemorySourceTree::new().with_file("package.json", "{}").with_file("next.config.js", "module.exports = {}");
        let spec = NodeJsBuildpack.generate(&tree, &GenerateOptions::default());
        assert_eq!(spec.run_command, vec!["npm", "run", "start"]);
        assert!(spec.steps.iter().any(|s| s.run_after_copy.as_deref() == Some("npm run build")));
    }

    #[test]
    fn lockfile_present_uses_npm_ci_and_is_copied_first() {
        let tree = MemorySourceTree::new().with_file("package.json", "{}").with_file("package-lock.json", "{}");
        let spec = NodeJsBuildpack.generate(&tree, &GenerateOptions::default());
        assert_eq!(spec.steps[0].copy_from, "package.json");
        assert_eq!(spec.steps[1].copy_from, "package-lock.json");
    }
}
