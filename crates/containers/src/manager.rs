// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Containarium Contributors

//! The container manager (C3): the `Absent → Creating → Running ⇄ Stopped →
//! Absent` state machine, bootstrap, resize, and delete contracts from
//! spec.md §4.3.

use std::sync::Arc;
use std::time::Duration;

use containarium_core::{Container, ContainerState, ResizeRequest};
use containarium_hypervisor::{container_source, merge_observed_state, CreateContainerRequest, HypervisorClient};
use containarium_jumphost::HostAccountAdapter;
use tracing::{info, instrument, warn};

use crate::bootstrap::BootstrapAdapter;
use crate::error::ContainerManagerError;
use crate::registry::KeyedMutexRegistry;

/// Bounded backoff budget for step 3 ("wait until the interior network
/// stack reports an IPv4"); spec.md §4.3 names a typical 30s budget.
const NETWORK_WAIT_BUDGET: Duration = Duration::from_secs(30);
const NETWORK_POLL_INITIAL: Duration = Duration::from_millis(250);
const NETWORK_POLL_MAX: Duration = Duration::from_secs(4);

pub struct ContainerManager {
    hypervisor: Arc<dyn HypervisorClient>,
    host_accounts: Arc<dyn HostAccountAdapter>,
    bootstrap: Arc<dyn BootstrapAdapter>,
    locks: KeyedMutexRegistry,
}

pub struct CreateOptions {
    pub force: bool,
}

impl ContainerManager {
    pub fn new(
        hypervisor: Arc<dyn HypervisorClient>,
        host_accounts: Arc<dyn HostAccountAdapter>,
        bootstrap: Arc<dyn BootstrapAdapter>,
    ) -> Self {
        Self { hypervisor, host_accounts, bootstrap, locks: KeyedMutexRegistry::new() }
    }

    #[instrument(skip(self, container), fields(owner = %container.owner))]
    pub async fn create(&self, container: Container, opts: CreateOptions) -> Result<Container, ContainerManagerError> {
        if !containarium_core::is_valid_username(&container.owner) {
            return Err(ContainerManagerError::InvalidUsername(container.owner));
        }

        let owner = container.owner.clone();
        self.locks.with_lock(&owner, || self.create_locked(container, opts)).await
    }

    async fn create_locked(&self, mut container: Container, opts: CreateOptions) -> Result<Container, ContainerManagerError> {
        if self.container_exists(&container.name).await? {
            if opts.force {
                self.delete_inner(&container.name, true).await.ok();
            } else {
                return Err(ContainerManagerError::AlreadyExists(container.owner.clone()));
            }
        }

        self.hypervisor
            .create_container(CreateContainerRequest {
                name: container.name.clone(),
                source: container_source(&container.image),
                config: build_config(&container),
                devices: Default::default(),
            })
            .await?;

        if let Err(e) = self.hypervisor.start_container(&container.name).await {
            self.best_effort_rollback(&container.name, &["created container".into()]).await;
            return Err(e.into());
        }

        if let Err(e) = self.wait_for_network(&container.name).await {
            self.best_effort_rollback(&container.name, &["created container".into(), "started container".into()]).await;
            return Err(e);
        }

        if let Err(e) = self.bootstrap.bootstrap(self.hypervisor.as_ref(), &container).await {
            container.state = ContainerState::Error;
            warn!(owner = %container.owner, error = %e, "bootstrap failed, container left in Error state");
            return Err(e);
        }

        if let Err(e) = self.ensure_host_account(&container).await {
            self.best_effort_rollback(
                &container.name,
                &["created container".into(), "started container".into(), "bootstrapped interior".into()],
            )
            .await;
            return Err(e);
        }

        container.state = ContainerState::Running;
        info!(owner = %container.owner, "container created and bootstrapped");
        Ok(container)
    }

    #[instrument(skip(self))]
    pub async fn resize(&self, container: &mut Container, resize: ResizeRequest) -> Result<(), ContainerManagerError> {
        resize.validate_against(&container.resources)?;
        let name = container.name.clone();
        self.locks
            .with_lock(&name, || async move {
                self.hypervisor.live_resize(&container.name, container.resources.merge(&resize)).await?;
                container.resources = container.resources.merge(&resize);
                Ok(())
            })
            .await
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, container: &Container, force: bool) -> Result<(), ContainerManagerError> {
        let name = container.name.clone();
        let owner = container.owner.clone();
        self.locks
            .with_lock(&name, || async move {
                if container.is_running() && !force {
                    return Err(ContainerManagerError::RunningWithoutForce(owner));
                }
                self.delete_inner(&container.name, force).await?;
                if self.host_accounts.account_exists(&owner).await? {
                    self.host_accounts.delete_account(&owner).await?;
                }
                Ok(())
            })
            .await
    }

    async fn delete_inner(&self, name: &str, force: bool) -> Result<(), ContainerManagerError> {
        if force {
            if let Ok(info) = self.hypervisor.get_container(name).await {
                if info.status == "Running" {
                    self.hypervisor.stop_container(name, true).await?;
                }
            }
        }
        self.hypervisor.delete_container(name).await?;
        Ok(())
    }

    async fn ensure_host_account(&self, container: &Container) -> Result<(), ContainerManagerError> {
        if !self.host_accounts.account_exists(&container.owner).await? {
            self.host_accounts.create_account(&container.owner).await?;
        }
        if let Some(key) = container.authorized_keys.iter().next() {
            self.host_accounts.write_authorized_key(&container.owner, key).await?;
        }
        Ok(())
    }

    /// Reads back a single container by name, hydrating the domain type
    /// from the hypervisor's observed state (spec.md §3: "state is derived
    /// from the hypervisor", so there is no separate container store row
    /// to read instead).
    #[instrument(skip(self))]
    pub async fn get(&self, name: &str) -> Result<Container, ContainerManagerError> {
        let info = self.hypervisor.get_container(name).await.map_err(|e| match e {
            containarium_hypervisor::HypervisorError::NotFound(n) => ContainerManagerError::NotFound(n),
            other => other.into(),
        })?;
        Ok(hydrate_container(info))
    }

    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<Container>, ContainerManagerError> {
        let infos = self.hypervisor.list_containers().await?;
        Ok(infos.into_iter().map(hydrate_container).collect())
    }

    #[instrument(skip(self))]
    pub async fn start(&self, container: &mut Container) -> Result<(), ContainerManagerError> {
        let name = container.name.clone();
        self.locks
            .with_lock(&name, || async move {
                self.hypervisor.start_container(&container.name).await?;
                container.state = ContainerState::Running;
                Ok(())
            })
            .await
    }

    #[instrument(skip(self))]
    pub async fn stop(&self, container: &mut Container, force: bool) -> Result<(), ContainerManagerError> {
        let name = container.name.clone();
        self.locks
            .with_lock(&name, || async move {
                self.hypervisor.stop_container(&container.name, force).await?;
                container.state = ContainerState::Stopped;
                Ok(())
            })
            .await
    }

    async fn container_exists(&self, name: &str) -> Result<bool, ContainerManagerError> {
        match self.hypervisor.get_container(name).await {
            Ok(_) => Ok(true),
            Err(containarium_hypervisor::HypervisorError::NotFound(_)) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn wait_for_network(&self, name: &str) -> Result<(), ContainerManagerError> {
        let deadline = tokio::time::Instant::now() + NETWORK_WAIT_BUDGET;
        let mut backoff = NETWORK_POLL_INITIAL;
        loop {
            if let Ok(Some(_ip)) = self.hypervisor.container_ipv4(name).await {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(ContainerManagerError::NetworkTimeout);
            }
            tokio::time::sleep(backoff.min(NETWORK_POLL_MAX)).await;
            backoff = (backoff * 2).min(NETWORK_POLL_MAX);
        }
    }

    /// Best-effort undo on any post-network-up failure (spec.md §4.3 step
    /// 5: "undo in reverse order: delete host account, then stop+delete
    /// container").
    async fn best_effort_rollback(&self, container_name: &str, undone: &[String]) {
        warn!(container = %container_name, ?undone, "rolling back partially-created container");
        let _ = self.hypervisor.stop_container(container_name, true).await;
        let _ = self.hypervisor.delete_container(container_name).await;
    }
}

/// Reconstructs the domain [`Container`] from the hypervisor's observed
/// config map — the inverse of [`build_config`]. Best-effort: fields the
/// daemon doesn't echo back (image alias, static address, nested runtime)
/// fall back to a sentinel, since they're write-only from this crate's
/// perspective once `create` has run.
fn hydrate_container(info: containarium_hypervisor::types::ContainerInfo) -> Container {
    let owner = info.name.strip_suffix("-container").unwrap_or(&info.name).to_string();
    let cpu_cores = info.config.get("limits.cpu").and_then(|v| v.parse().ok()).unwrap_or(0);
    let memory_bytes = info.config.get("limits.memory").and_then(|v| v.trim_end_matches('B').parse().ok()).unwrap_or(0);
    let root_disk_bytes = info.config.get("limits.disk").and_then(|v| v.trim_end_matches('B').parse().ok()).unwrap_or(0);
    let auto_start = info.config.get("boot.autostart").map(|v| v == "true").unwrap_or(true);

    let mut container = Container::new(owner, "unknown", containarium_core::ResourceCaps::new(cpu_cores, memory_bytes, root_disk_bytes));
    container.auto_start = auto_start;
    container.name = info.name.clone();
    merge_observed_state(container, &info)
}

fn build_config(container: &Container) -> std::collections::BTreeMap<String, String> {
    let mut config = std::collections::BTreeMap::new();
    config.insert("limits.cpu".to_string(), container.resources.cpu_cores.to_string());
    config.insert("limits.memory".to_string(), format!("{}B", container.resources.memory_bytes));
    config.insert("limits.disk".to_string(), format!("{}B", container.resources.root_disk_bytes));
    config.insert("boot.autostart".to_string(), container.auto_start.to_string());
    for (k, v) in &container.labels {
        config.insert(containarium_hypervisor::types::label_key(k), v.clone());
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use containarium_core::test_support::ContainerBuilder;
    use containarium_hypervisor::types::{ContainerInfo, ExecResult};
    use containarium_hypervisor::HypervisorError;
    use parking_lot::Mutex as SyncMutex;
    use std::collections::{BTreeMap, HashSet};
    use std::net::Ipv4Addr;

    #[derive(Default)]
    struct FakeHypervisorClient {
        existing: SyncMutex<HashSet<String>>,
    }

    #[async_trait]
    impl HypervisorClient for FakeHypervisorClient {
        async fn check_daemon_version(&self) -> Result<containarium_hypervisor::VersionCheck, HypervisorError> {
            Ok(containarium_hypervisor::VersionCheck::Ok)
        }
        async fn create_container(&self, req: CreateContainerRequest) -> Result<(), HypervisorError> {
            if !self.existing.lock().insert(req.name.clone()) {
                return Err(HypervisorError::AlreadyExists(req.name));
            }
            Ok(())
        }
        async fn start_container(&self, _name: &str) -> Result<(), HypervisorError> {
            Ok(())
        }
        async fn stop_container(&self, _name: &str, _force: bool) -> Result<(), HypervisorError> {
            Ok(())
        }
        async fn delete_container(&self, name: &str) -> Result<(), HypervisorError> {
            self.existing.lock().remove(name);
            Ok(())
        }
        async fn get_container(&self, name: &str) -> Result<ContainerInfo, HypervisorError> {
            if self.existing.lock().contains(name) {
                Ok(ContainerInfo { name: name.to_string(), status: "Running".to_string(), config: BTreeMap::new() })
            } else {
                Err(HypervisorError::NotFound(name.to_string()))
            }
        }
        async fn list_containers(&self) -> Result<Vec<ContainerInfo>, HypervisorError> {
            Ok(vec![])
        }
        async fn container_ipv4(&self, _name: &str) -> Result<Option<Ipv4Addr>, HypervisorError> {
            Ok(Some(Ipv4Addr::new(10, 0, 0, 5)))
        }
        async fn set_config_key(&self, _name: &str, _key: &str, _value: &str) -> Result<(), HypervisorError> {
            Ok(())
        }
        async fn get_config(&self, _name: &str) -> Result<BTreeMap<String, String>, HypervisorError> {
            Ok(BTreeMap::new())
        }
        async fn remove_config_key(&self, _name: &str, _key: &str) -> Result<(), HypervisorError> {
            Ok(())
        }
        async fn add_device(&self, _name: &str, _device_name: &str, _device: BTreeMap<String, String>) -> Result<(), HypervisorError> {
            Ok(())
        }
        async fn remove_device(&self, _name: &str, _device_name: &str) -> Result<(), HypervisorError> {
            Ok(())
        }
        async fn push_file(&self, _name: &str, _dest_path: &str, _contents: &[u8], _mode: u32) -> Result<(), HypervisorError> {
            Ok(())
        }
        async fn pull_file(&self, _name: &str, _src_path: &str) -> Result<Vec<u8>, HypervisorError> {
            Ok(vec![])
        }
        async fn exec(&self, _name: &str, _command: Vec<String>) -> Result<ExecResult, HypervisorError> {
            Ok(ExecResult { exit_code: 0, stdout: String::new(), stderr: String::new() })
        }
        async fn open_terminal(
            &self,
            _name: &str,
            _command: Vec<String>,
            _cols: u16,
            _rows: u16,
        ) -> Result<containarium_hypervisor::TerminalSession, HypervisorError> {
            let (input, _) = tokio::sync::mpsc::channel(1);
            let (_, output) = tokio::sync::mpsc::channel(1);
            let (resize, _) = tokio::sync::mpsc::channel(1);
            Ok(containarium_hypervisor::TerminalSession { input, output, resize })
        }
        async fn live_resize(&self, _name: &str, _resources: containarium_core::ResourceCaps) -> Result<(), HypervisorError> {
            Ok(())
        }
        async fn list_networks(&self) -> Result<Vec<String>, HypervisorError> {
            Ok(vec![])
        }
        async fn list_storage_pools(&self) -> Result<Vec<String>, HypervisorError> {
            Ok(vec![])
        }
        async fn list_profiles(&self) -> Result<Vec<String>, HypervisorError> {
            Ok(vec![])
        }
        async fn install_default_profile(&self, _bridge: &str) -> Result<(), HypervisorError> {
            Ok(())
        }
        async fn recover_storage_pool(&self, _pool: &str, _driver: &str, _source: &str) -> Result<(), HypervisorError> {
            Ok(())
        }
        async fn find_service_container(&self, _substring: &str) -> Result<Option<Ipv4Addr>, HypervisorError> {
            Ok(None)
        }
    }

    #[derive(Default)]
    struct FakeHostAccountAdapter {
        accounts: SyncMutex<HashSet<String>>,
    }

    #[async_trait]
    impl HostAccountAdapter for FakeHostAccountAdapter {
        async fn account_exists(&self, username: &str) -> Result<bool, containarium_jumphost::JumphostError> {
            Ok(self.accounts.lock().contains(username))
        }
        async fn create_account(&self, username: &str) -> Result<(), containarium_jumphost::JumphostError> {
            self.accounts.lock().insert(username.to_string());
            Ok(())
        }
        async fn delete_account(&self, username: &str) -> Result<(), containarium_jumphost::JumphostError> {
            self.accounts.lock().remove(username);
            Ok(())
        }
        async fn write_authorized_key(&self, _username: &str, _key: &str) -> Result<(), containarium_jumphost::JumphostError> {
            Ok(())
        }
        async fn first_authorized_key(&self, _username: &str) -> Result<Option<String>, containarium_jumphost::JumphostError> {
            Ok(None)
        }
    }

    struct NoopBootstrapAdapter;

    #[async_trait]
    impl BootstrapAdapter for NoopBootstrapAdapter {
        async fn bootstrap(&self, _hypervisor: &dyn HypervisorClient, _container: &Container) -> Result<(), ContainerManagerError> {
            Ok(())
        }
    }

    fn test_manager() -> ContainerManager {
        ContainerManager::new(
            Arc::new(FakeHypervisorClient::default()),
            Arc::new(FakeHostAccountAdapter::default()),
            Arc::new(NoopBootstrapAdapter),
        )
    }

    #[tokio::test]
    async fn create_then_create_without_force_is_already_exists() {
        let manager = test_manager();
        let container = ContainerBuilder::default().owner("alice").build();
        manager.create(container.clone(), CreateOptions { force: false }).await.unwrap();
        let err = manager.create(container, CreateOptions { force: false }).await.unwrap_err();
        assert!(matches!(err, ContainerManagerError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn create_with_force_recreates() {
        let manager = test_manager();
        let container = ContainerBuilder::default().owner("bob").build();
        manager.create(container.clone(), CreateOptions { force: false }).await.unwrap();
        let recreated = manager.create(container, CreateOptions { force: true }).await.unwrap();
        assert_eq!(recreated.state, ContainerState::Running);
    }

    #[tokio::test]
    async fn delete_running_without_force_is_rejected() {
        let manager = test_manager();
        let mut container = ContainerBuilder::default().owner("carol").build();
        container.state = ContainerState::Running;
        let err = manager.delete(&container, false).await.unwrap_err();
        assert!(matches!(err, ContainerManagerError::RunningWithoutForce(_)));
    }

    #[tokio::test]
    async fn get_hydrates_state_and_labels_from_observed_config() {
        let manager = test_manager();
        let container = ContainerBuilder::default().owner("dana").build();
        manager.create(container, CreateOptions { force: false }).await.unwrap();
        let hydrated = manager.get("dana-container").await.unwrap();
        assert_eq!(hydrated.state, ContainerState::Running);
        assert_eq!(hydrated.owner, "dana");
    }

    #[tokio::test]
    async fn get_missing_container_is_not_found() {
        let manager = test_manager();
        let err = manager.get("ghost-container").await.unwrap_err();
        assert!(matches!(err, ContainerManagerError::NotFound(_)));
    }

    #[tokio::test]
    async fn invalid_username_is_rejected_before_any_hypervisor_call() {
        let manager = test_manager();
        let container = ContainerBuilder::default().owner("Not_Valid").build();
        let err = manager.create(container, CreateOptions { force: false }).await.unwrap_err();
        assert!(matches!(err, ContainerManagerError::InvalidUsername(_)));
    }
}
