// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Containarium Contributors

use crate::buildpack::Buildpack;
use crate::source_tree::SourceTree;
use crate::spec::{BuildSpec, BuildStep, GenerateOptions, HealthCheck};

pub struct PhpBuildpack;

const DEFAULT_PHP_VERSION: &str = "8.3";

impl Buildpack for PhpBuildpack {
    fn name(&self) -> &'static str {
        "php"
    }

    fn detect(&self, tree: &dyn SourceTree) -> bool {
        tree.exists("composer.json")
    }

    fn generate(&self, tree: &dyn SourceTree, opts: &GenerateOptions) -> BuildSpec {
        let composer = tree.read_to_string("composer.json").unwrap_or_default();
        let framework_console = detect_framework_console(&composer, tree);

        BuildSpec {
            buildpack: self.name(),
            buildpack_version: "1",
            base_image: format!("php:{DEFAULT_PHP_VERSION}-cli"),
            steps: vec![
                BuildStep { copy_from: "composer.json".to_string(), copy_to: "composer.json".to_string(), run_after_copy: None },
                BuildStep { copy_from: "composer.lock".to_string(), copy_to: "composer.lock".to_string(), run_after_copy: Some("composer install --no-dev".to_string()) },
                BuildStep { copy_from: ".".to_string(), copy_to: ".".to_string(), run_after_copy: None },
            ],
            exposed_port: opts.declared_port,
            run_command: match framework_console {
                Some(console) => vec!["php".to_string(), console, "serve".to_string(), "--host=0.0.0.0".to_string(), format!("--port={}", opts.declared_port)],
                None => vec!["php".to_string(), "-S".to_string(), format!("0.0.0.0:{}", opts.declared_port)],
            },
            health_check: Some(HealthCheck { path: "/".to_string(), interval_seconds: 10 }),
        }
    }
}

fn detect_framework_console(composer_json: &str, tree: &dyn SourceTree) -> Option<String> {
    if composer_json.contains("laravel/framework") && tree.exists("artisan") {
        return Some("artisan".to_string());
    }
    if composer_json.contains("symfony/") && tree.exists("bin/console") {
        return Some("bin/console".to_string());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source_tree::MemorySourceTree;

    #[test]
    fn laravel_console_selected_when_artisan_present() {
        let tree = MemorySourceTree::new().with_file("composer.json", "{\"require\":{\"laravel/framework\":\"^11\"}}").with_file("artisan", "");
        let spec = PhpBuildpack.generate(&tree, &GenerateOptions::default());
        assert_eq!(spec.run_command[1], "artisan");
    }

    #[test]
    fn plain_php_falls_back_to_builtin_server() {
        let tree = MemorySourceTree::new().with_file("composer.json", "{}");
        let spec = PhpBuildpack.generate(&tree, &GenerateOptions::default());
        assert_eq!(spec.run_command[1], "-S");
    }
}
