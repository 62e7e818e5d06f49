// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Containarium Contributors

//! Interior bootstrap (spec.md §4.3 step 4): install an SSH server, sudo,
//! a container runtime; create the interior user; inject authorized keys;
//! enable interior services. Expressed as a trait so the state machine
//! doesn't depend on the exact distro/package-manager shape.

use async_trait::async_trait;
use containarium_core::Container;
use containarium_hypervisor::HypervisorClient;

use crate::error::ContainerManagerError;

#[async_trait]
pub trait BootstrapAdapter: Send + Sync {
    async fn bootstrap(&self, hypervisor: &dyn HypervisorClient, container: &Container) -> Result<(), ContainerManagerError>;
}

/// Runs the standard apt-based bootstrap sequence inside the container via
/// exec. Each step is its own exec call so a failure reports which step
/// broke rather than a single opaque script failure.
pub struct AptBootstrapAdapter;

#[async_trait]
impl BootstrapAdapter for AptBootstrapAdapter {
    async fn bootstrap(&self, hypervisor: &dyn HypervisorClient, container: &Container) -> Result<(), ContainerManagerError> {
        run(hypervisor, &container.name, &["apt-get", "update"]).await?;
        run(hypervisor, &container.name, &["apt-get", "install", "-y", "openssh-server", "sudo"]).await?;

        if container.nested_runtime {
            run(hypervisor, &container.name, &["apt-get", "install", "-y", "docker.io"]).await?;
        }

        run(
            hypervisor,
            &container.name,
            &["useradd", "--create-home", "--groups", "sudo", &container.owner],
        )
        .await?;

        let ssh_dir = format!("/home/{}/.ssh", container.owner);
        run(hypervisor, &container.name, &["mkdir", "-p", &ssh_dir]).await?;
        for key in &container.authorized_keys {
            let append = format!("echo '{key}' >> {ssh_dir}/authorized_keys");
            run(hypervisor, &container.name, &["sh", "-c", &append]).await?;
        }
        run(hypervisor, &container.name, &["chmod", "700", &ssh_dir]).await?;
        run(hypervisor, &container.name, &["chmod", "600", &format!("{ssh_dir}/authorized_keys")]).await?;
        run(hypervisor, &container.name, &["chown", "-R", &format!("{}:{}", container.owner, container.owner), &ssh_dir]).await?;

        run(hypervisor, &container.name, &["systemctl", "enable", "--now", "ssh"]).await?;
        if container.nested_runtime {
            run(hypervisor, &container.name, &["systemctl", "enable", "--now", "docker"]).await?;
        }

        Ok(())
    }
}

async fn run(hypervisor: &dyn HypervisorClient, container_name: &str, command: &[&str]) -> Result<(), ContainerManagerError> {
    let result = hypervisor.exec(container_name, command.iter().map(|s| s.to_string()).collect()).await?;
    if result.exit_code != 0 {
        return Err(ContainerManagerError::Core(containarium_core::Error::internal(format!(
            "bootstrap step `{}` exited {} inside {container_name}",
            command.join(" "),
            result.exit_code
        ))));
    }
    Ok(())
}
