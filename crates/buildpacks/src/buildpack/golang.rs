// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Containarium Contributors

use crate::buildpack::Buildpack;
use crate::source_tree::SourceTree;
use crate::spec::{BuildSpec, BuildStep, GenerateOptions, HealthCheck};

pub struct GoBuildpack;

const DEFAULT_GO_VERSION: &str = "1.22";

impl Buildpack for GoBuildpack {
    fn name(&self) -> &'static str {
        "go"
    }

    fn detect(&self, tree: &dyn SourceTree) -> bool {
        tree.exists("go.mod")
    }

    fn generate(&self, tree: &dyn SourceTree, opts: &GenerateOptions) -> BuildSpec {
        let version = tree.read_to_string("go.mod").and_then(|s| parse_go_directive(&s)).unwrap_or_else(|| DEFAULT_GO_VERSION.to_string());

        BuildSpec {
            buildpack: self.name(),
            buildpack_version: "1",
            base_image: format!("golang:{version}"),
            steps: vec![
                BuildStep { copy_from: "go.mod".to_string(), copy_to: "go.mod".to_string(), run_after_copy: None },
                BuildStep { copy_from: "go.sum".to_string(), copy_to: "go.sum".to_string(), run_after_copy: Some("go mod download".to_string()) },
                BuildStep { copy_from: ".".to_string(), copy_to: ".".to_string(), run_after_copy: Some("go build -o /app/server .".to_string()) },
            ],
            exposed_port: opts.declared_port,
            run_command: vec!["/app/server".to_string()],
            health_check: Some(HealthCheck { path: "/healthz".to_string(), interval_seconds: 10 }),
        }
    }
}

fn parse_go_directive(go_mod: &str) -> Option<String> {
    go_mod.lines().find_map(|line| line.strip_prefix("go ").map(|v| v.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source_tree::MemorySourceTree;

    #[test]
    fn pins_version_from_go_mod_directive() {
        let tree = MemorySourceTree::new().with_file("go.mod", "module example.com/app\n\ngo 1.21\n");
        let spec = GoBuildpack.generate(&tree, &GenerateOptions::default());
        assert_eq!(spec.base_image, "golang:1.21");
    }

    #[test]
    fn falls_back_to_default_version_when_unspecified() {
        let tree = MemorySourceTree::new().with_file("go.mod", "module example.com/app\n");
        let spec = GoBuildpack.generate(&tree, &GenerateOptions::default());
        assert_eq!(spec.base_image, format!("golang:{DEFAULT_GO_VERSION}"));
    }
}
