// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Containarium Contributors

//! Renders a [`BuildSpec`] into a Dockerfile and a `docker run` invocation
//! for the sub-container the app runs in (spec.md §4.6 step 4-5: "a
//! sub-container named `<a.name>` runs inside the owner container, built
//! from the buildpack's image and resource-capped to the owner's caps").

use std::collections::BTreeMap;

use containarium_buildpacks::BuildSpec;
use containarium_core::ResourceCaps;

/// Renders the Dockerfile a buildpack's [`BuildSpec`] describes: base
/// image, each step's copy (+ optional run), the exposed port, and the
/// run command. The build context is the app's uploaded source tree, so
/// `copy_from` paths resolve relative to it.
pub fn render_dockerfile(spec: &BuildSpec) -> String {
    let mut out = format!("FROM {}\nWORKDIR /app\n", spec.base_image);
    for step in &spec.steps {
        out.push_str(&format!("COPY {} {}\n", step.copy_from, step.copy_to));
        if let Some(command) = &step.run_after_copy {
            out.push_str(&format!("RUN {command}\n"));
        }
    }
    out.push_str(&format!("EXPOSE {}\n", spec.exposed_port));
    let args: Vec<String> = spec.run_command.iter().map(|a| format!("\"{}\"", a.replace('\\', "\\\\").replace('"', "\\\""))).collect();
    out.push_str(&format!("CMD [{}]\n", args.join(", ")));
    out
}

/// Tags the image with the app name and the build's timestamp so every
/// build gets a distinct, traceable reference (stored as
/// [`containarium_core::Application::image_ref`]).
pub fn image_tag(app_name: &str, built_at_ms: u64) -> String {
    format!("containarium/{app_name}:{built_at_ms}")
}

/// Parses the owner container's resource caps back out of the hypervisor
/// config map, the same `limits.cpu`/`limits.memory`/`limits.disk`
/// encoding `ContainerManager` writes on create — so the sub-container
/// inherits the owner's caps rather than running unbounded.
pub fn resource_caps_from_config(config: &BTreeMap<String, String>) -> ResourceCaps {
    let cpu_cores = config.get("limits.cpu").and_then(|v| v.parse().ok()).unwrap_or(0);
    let memory_bytes = config.get("limits.memory").and_then(|v| v.trim_end_matches('B').parse().ok()).unwrap_or(0);
    let root_disk_bytes = config.get("limits.disk").and_then(|v| v.trim_end_matches('B').parse().ok()).unwrap_or(0);
    ResourceCaps::new(cpu_cores, memory_bytes, root_disk_bytes)
}

/// Builds the `docker run` argv that starts the sub-container named
/// `app_name`, capped to `caps` and publishing `host_port` to the
/// buildpack's `exposed_port`.
pub fn docker_run_args(app_name: &str, image: &str, host_port: u16, exposed_port: u16, env: &BTreeMap<String, String>, caps: &ResourceCaps) -> Vec<String> {
    let mut args: Vec<String> = vec!["docker", "run", "-d", "--name", app_name, "--restart", "unless-stopped"].into_iter().map(String::from).collect();
    if caps.cpu_cores > 0 {
        args.push("--cpus".to_string());
        args.push(caps.cpu_cores.to_string());
    }
    if caps.memory_bytes > 0 {
        args.push("--memory".to_string());
        args.push(caps.memory_bytes.to_string());
    }
    for (k, v) in env {
        args.push("--env".to_string());
        args.push(format!("{k}={v}"));
    }
    args.push("-p".to_string());
    args.push(format!("{host_port}:{exposed_port}"));
    args.push(image.to_string());
    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use containarium_buildpacks::{BuildStep, HealthCheck};

    fn sample_spec() -> BuildSpec {
        BuildSpec {
            buildpack: "golang",
            buildpack_version: "1",
            base_image: "golang:1.22".to_string(),
            steps: vec![
                BuildStep { copy_from: "go.mod".into(), copy_to: "go.mod".into(), run_after_copy: None },
                BuildStep { copy_from: ".".into(), copy_to: ".".into(), run_after_copy: Some("go build -o /app/server .".into()) },
            ],
            exposed_port: 8080,
            run_command: vec!["/app/server".into()],
            health_check: Some(HealthCheck { path: "/healthz".into(), interval_seconds: 10 }),
        }
    }

    #[test]
    fn dockerfile_includes_every_step_and_the_run_command() {
        let dockerfile = render_dockerfile(&sample_spec());
        assert!(dockerfile.starts_with("FROM golang:1.22\n"));
        assert!(dockerfile.contains("COPY go.mod go.mod\n"));
        assert!(dockerfile.contains("RUN go build -o /app/server .\n"));
        assert!(dockerfile.contains("EXPOSE 8080\n"));
        assert!(dockerfile.contains("CMD [\"/app/server\"]\n"));
    }

    #[test]
    fn run_args_include_caps_and_port_mapping() {
        let caps = ResourceCaps::new(2, 512 * 1024 * 1024, 0);
        let args = docker_run_args("app-alice-myapp", "containarium/myapp:1", 8080, 8080, &BTreeMap::new(), &caps);
        assert_eq!(args[0..5], ["docker", "run", "-d", "--name", "app-alice-myapp"]);
        assert!(args.contains(&"--cpus".to_string()));
        assert!(args.contains(&"2".to_string()));
        assert!(args.contains(&"--memory".to_string()));
        assert!(args.windows(2).any(|w| w[0] == "-p" && w[1] == "8080:8080"));
    }

    #[test]
    fn run_args_omit_resource_flags_when_caps_are_zero() {
        let args = docker_run_args("app-x", "img", 80, 80, &BTreeMap::new(), &ResourceCaps::new(0, 0, 0));
        assert!(!args.contains(&"--cpus".to_string()));
        assert!(!args.contains(&"--memory".to_string()));
    }
}
