// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Containarium Contributors

use crate::buildpack::Buildpack;
use crate::source_tree::SourceTree;
use crate::spec::{BuildSpec, BuildStep, GenerateOptions, HealthCheck};

pub struct RubyBuildpack;

const DEFAULT_RUBY_VERSION: &str = "3.3";

impl Buildpack for RubyBuildpack {
    fn name(&self) -> &'static str {
        "ruby"
    }

    fn detect(&self, tree: &dyn SourceTree) -> bool {
        tree.exists("Gemfile")
    }

    fn generate(&self, tree: &dyn SourceTree, opts: &GenerateOptions) -> BuildSpec {
        let is_rails = tree.exists("config.ru") && tree.exists("Rakefile");

        BuildSpec {
            buildpack: self.name(),
            buildpack_version: "1",
            base_image: format!("ruby:{DEFAULT_RUBY_VERSION}-slim"),
            steps: vec![
                BuildStep { copy_from: "Gemfile".to_string(), copy_to: "Gemfile".to_string(), run_after_copy: None },
                BuildStep { copy_from: "Gemfile.lock".to_string(), copy_to: "Gemfile.lock".to_string(), run_after_copy: Some("bundle install".to_string()) },
                BuildStep { copy_from: ".".to_string(), copy_to: ".".to_string(), run_after_copy: None },
            ],
            exposed_port: opts.declared_port,
            run_command: if is_rails {
                vec!["bundle".to_string(), "exec".to_string(), "rails".to_string(), "server".to_string(), "-b".to_string(), "0.0.0.0".to_string(), "-p".to_string(), opts.declared_port.to_string()]
            } else {
                vec!["bundle".to_string(), "exec".to_string(), "rackup".to_string(), "-o".to_string(), "0.0.0.0".to_string(), "-p".to_string(), opts.declared_port.to_string()]
            },
            health_check: Some(HealthCheck { path: "/".to_string(), interval_seconds: 10 }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source_tree::MemorySourceTree;

    #[test]
    fn rails_markers_select_rails_server_command() {
        let tree = MemorySourceTree::new().with_file("Gemfile", "gem 'rails'").with_file("config.ru", "").with_file("Rakefile", "");
        let spec = RubyBuildpack.generate(&tree, &GenerateOptions::default());
        assert!(spec.run_command.contains(&"rails".to_string()));
    }

    #[test]
    fn plain_rack_app_uses_rackup() {
        let tree = MemorySourceTree::new().with_file("Gemfile", "gem 'sinatra'");
        let spec = RubyBuildpack.generate(&tree, &GenerateOptions::default());
        assert!(spec.run_command.contains(&"rackup".to_string()));
    }
}
