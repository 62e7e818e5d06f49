// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Containarium Contributors

//! The application manager (C6, spec.md §4.6): owns the deploy pipeline
//! and the application lifecycle (Stop/Start/Restart/Redeploy/Delete).

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod error;
pub mod image;
pub mod logs;
pub mod manager;
pub mod pipeline;
pub mod tarball;

pub use error::AppManagerError;
pub use image::{docker_run_args, image_tag, render_dockerfile, resource_caps_from_config};
pub use logs::BuildLogStore;
pub use manager::{AppManager, DEFAULT_MAX_TARBALL_BYTES};
pub use pipeline::{DeployCtx, DeployDeps, DeployRequest, DeployStep};
pub use tarball::decode_tar_gz;

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::net::Ipv4Addr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use containarium_buildpacks::BuildpackRegistry;
    use containarium_core::{AppState, Application, ApplicationId, FakeClock};
    use containarium_hypervisor::{ContainerInfo, ExecResult, HypervisorClient, HypervisorError};
    use containarium_proxy::{ProxyAdmin, ProxyController, ProxyError, RouteSpec};
    use containarium_store::{AppStore, StoreError};
    use parking_lot::Mutex;

    use super::*;

    struct FakeHypervisor {
        running: Mutex<bool>,
    }

    #[async_trait]
    impl HypervisorClient for FakeHypervisor {
        async fn check_daemon_version(&self) -> Result<containarium_hypervisor::VersionCheck, HypervisorError> {
            Ok(containarium_hypervisor::VersionCheck::Ok)
        }

        async fn create_container(&self, _req: containarium_hypervisor::CreateContainerRequest) -> Result<(), HypervisorError> {
            Ok(())
        }

        async fn start_container(&self, _name: &str) -> Result<(), HypervisorError> {
            Ok(())
        }

        async fn stop_container(&self, _name: &str, _force: bool) -> Result<(), HypervisorError> {
            Ok(())
        }

        async fn delete_container(&self, _name: &str) -> Result<(), HypervisorError> {
            Ok(())
        }

        async fn get_container(&self, name: &str) -> Result<ContainerInfo, HypervisorError> {
            if *self.running.lock() {
                Ok(ContainerInfo { name: name.to_string(), status: "Running".into(), config: BTreeMap::new() })
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

    struct FakeProxyAdmin {
        routes: Mutex<Vec<RouteSpec>>,
        add_calls: AtomicUsize,
    }

    #[async_trait]
    impl ProxyAdmin for FakeProxyAdmin {
        async fn add_route(&self, spec: &RouteSpec) -> Result<(), ProxyError> {
            self.add_calls.fetch_add(1, Ordering::SeqCst);
            self.routes.lock().push(spec.clone());
            Ok(())
        }

        async fn delete_route(&self, _route_id: &str) -> Result<(), ProxyError> {
            Ok(())
        }

        async fn provision_tls(&self, _host: &str) -> Result<(), ProxyError> {
            Ok(())
        }

        async fn list_routes(&self) -> Result<Vec<RouteSpec>, ProxyError> {
            Ok(self.routes.lock().clone())
        }

        async fn setup_port_forwarding(&self, _proxy_container_ip: &str) -> Result<(), ProxyError> {
            Ok(())
        }
    }

    struct FakeAppStore {
        apps: Mutex<BTreeMap<String, Application>>,
        subdomains: Mutex<BTreeMap<String, String>>,
    }

    impl Default for FakeAppStore {
        fn default() -> Self {
            Self { apps: Mutex::new(BTreeMap::new()), subdomains: Mutex::new(BTreeMap::new()) }
        }
    }

    #[async_trait]
    impl AppStore for FakeAppStore {
        async fn create(&self, app: &Application) -> Result<(), StoreError> {
            self.apps.lock().insert(app.id.as_str().to_string(), app.clone());
            Ok(())
        }

        async fn get(&self, owner: &str, name: &str) -> Result<Application, StoreError> {
            self.apps
                .lock()
                .values()
                .find(|a| a.owner == owner && a.name == name)
                .cloned()
                .ok_or_else(|| StoreError::NotFound(format!("{owner}/{name}")))
        }

        async fn get_by_domain(&self, sub_domain: &str) -> Result<Application, StoreError> {
            self.apps
                .lock()
                .values()
                .find(|a| a.sub_domain == sub_domain)
                .cloned()
                .ok_or_else(|| StoreError::NotFound(sub_domain.to_string()))
        }

        async fn list(&self, owner: Option<&str>) -> Result<Vec<Application>, StoreError> {
            Ok(self.apps.lock().values().filter(|a| owner.map_or(true, |o| o == a.owner)).cloned().collect())
        }

        async fn update_state(&self, id: &ApplicationId, next: AppState, now_ms: u64) -> Result<(), StoreError> {
            let mut apps = self.apps.lock();
            let app = apps.get_mut(id.as_str()).ok_or_else(|| StoreError::NotFound(id.to_string()))?;
            app.transition(next, now_ms).map_err(|e| StoreError::Conflict(e.message))
        }

        async fn update_image(&self, id: &ApplicationId, image_ref: &str, _now_ms: u64) -> Result<(), StoreError> {
            let mut apps = self.apps.lock();
            let app = apps.get_mut(id.as_str()).ok_or_else(|| StoreError::NotFound(id.to_string()))?;
            app.image_ref = Some(image_ref.to_string());
            Ok(())
        }

        async fn delete(&self, id: &ApplicationId) -> Result<(), StoreError> {
            self.apps.lock().remove(id.as_str()).ok_or_else(|| StoreError::NotFound(id.to_string()))?;
            Ok(())
        }

        async fn reserve_subdomain(&self, sub_domain: &str, owner: &str, _now_ms: u64) -> Result<(), StoreError> {
            let mut subs = self.subdomains.lock();
            if subs.contains_key(sub_domain) {
                return Err(StoreError::AlreadyExists(sub_domain.to_string()));
            }
            subs.insert(sub_domain.to_string(), owner.to_string());
            Ok(())
        }

        async fn release_subdomain(&self, sub_domain: &str) -> Result<(), StoreError> {
            self.subdomains.lock().remove(sub_domain);
            Ok(())
        }
    }

    fn manager(running: bool) -> AppManager<FakeClock> {
        let store: Arc<dyn AppStore> = Arc::new(FakeAppStore::default());
        let hypervisor: Arc<dyn HypervisorClient> = Arc::new(FakeHypervisor { running: Mutex::new(running) });
        let admin: Arc<dyn ProxyAdmin> = Arc::new(FakeProxyAdmin { routes: Mutex::new(Vec::new()), add_calls: AtomicUsize::new(0) });
        let proxy = Arc::new(ProxyController::new(admin));
        let buildpacks = Arc::new(BuildpackRegistry::default());
        let clock = FakeClock::new();
        clock.set_epoch_ms(1_000);
        AppManager::new(store, hypervisor, proxy, buildpacks, clock, "apps.example.com")
    }

    fn request(owner: &str, name: &str) -> DeployRequest {
        let mut tarball = BTreeMap::new();
        tarball.insert("Procfile".to_string(), b"web: node server.js".to_vec());
        tarball.insert("package.json".to_string(), b"{}".to_vec());
        DeployRequest { owner: owner.to_string(), app_name: name.to_string(), source_tarball: tarball, declared_port: 8080, env: BTreeMap::new(), sub_domain: None }
    }

    #[tokio::test]
    async fn deploy_rejects_invalid_app_name() {
        let mgr = manager(true);
        let err = mgr.deploy(request("alice", "Bad_Name")).await.unwrap_err();
        assert!(matches!(err, AppManagerError::InvalidName(_)));
    }

    #[tokio::test]
    async fn deploy_requires_owner_container_running() {
        let mgr = manager(false);
        let err = mgr.deploy(request("alice", "myapp")).await.unwrap_err();
        assert!(matches!(err, AppManagerError::OwnerContainerNotRunning));
    }

    #[tokio::test]
    async fn deploy_ends_running_on_success() {
        let mgr = manager(true);
        let app = mgr.deploy(request("alice", "myapp")).await.unwrap();
        assert_eq!(app.state, AppState::Running);
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let mgr = manager(true);
        let app = mgr.deploy(request("alice", "myapp")).await.unwrap();
        mgr.delete(&app).await.unwrap();
        mgr.delete(&app).await.unwrap();
    }
}
