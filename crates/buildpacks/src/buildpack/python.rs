// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Containarium Contributors

use crate::buildpack::Buildpack;
use crate::source_tree::SourceTree;
use crate::spec::{BuildSpec, BuildStep, GenerateOptions, HealthCheck};

pub struct PythonBuildpack;

const DEFAULT_PYTHON_VERSION: &str = "3.12";

impl Buildpack for PythonBuildpack {
    fn name(&self) -> &'static str {
        "python"
    }

    fn detect(&self, tree: &dyn SourceTree) -> bool {
        tree.exists("requirements.txt") || tree.exists("pyproject.toml")
    }

    fn generate(&self, tree: &dyn SourceTree, opts: &GenerateOptions) -> BuildSpec {
        let lockfile = if tree.exists("requirements.txt") { "requirements.txt" } else { "pyproject.toml" };
        let deps = tree.read_to_string(lockfile).unwrap_or_default();
        let server = if deps.contains("gunicorn") {
            "gunicorn"
        } else if deps.contains("uvicorn") {
            "uvicorn"
        } else {
            "python"
        };

        let run_command = match server {
            "gunicorn" => vec!["gunicorn".to_string(), "-b".to_string(), format!("0.0.0.0:{}", opts.declared_port), "app:app".to_string()],
            "uvicorn" => vec!["uvicorn".to_string(), "main:app".to_string(), "--host".to_string(), "0.0.0.0".to_string(), "--port".to_string(), opts.declared_port.to_string()],
            _ => vec!["python".to_string(), "main.py".to_string()],
        };

        BuildSpec {
            buildpack: self.name(),
            buildpack_version: "1",
            base_image: format!("python:{DEFAULT_PYTHON_VERSION}-slim"),
            steps: vec![
                BuildStep {
                    copy_from: lockfile.to_string(),
                    copy_to: lockfile.to_string(),
                    run_after_copy: Some(format!("pip install --no-cache-dir -r {lockfile}")),
                },
                BuildStep { copy_from: ".".to_string(), copy_to: ".".to_string(), run_after_copy: None },
            ],
            exposed_port: opts.declared_port,
            run_command,
            health_check: Some(HealthCheck { path: "/".to_string(), interval_seconds: 10 }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source_tree::MemorySourceTree;

    #[test]
    fn gunicorn_marker_selects_gunicorn_command() {
        let tree = MemorySourceTree::new().with_file("requirements.txt", "gunicorn==21\nflask==3");
        let spec = PythonBuildpack.generate(&tree, &GenerateOptions::default());
        assert_eq!(spec.run_command[0], "gunicorn");
    }

    #[test]
    fn pyproject_without_requirements_is_still_detected() {
        let tree = MemorySourceTree::new().with_file("pyproject.toml", "[project]\nname='x'");
        assert!(PythonBuildpack.detect(&tree));
    }
}
