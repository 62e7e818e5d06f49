// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Containarium Contributors

//! The hypervisor client (C1): all interactions with the host's
//! local-socket container daemon (spec.md §4.1).

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use containarium_core::{Container, ContainerState, ResourceCaps};
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::error::HypervisorError;
use crate::operations::wait_for_operation;
use crate::transport::UnixHttpClient;
use crate::types::{
    label_key, strip_label_prefix, ContainerInfo, ContainerSource, ContainerStateResponse, CreateContainerRequest,
    ExecRequest, ExecResult, LABEL_PREFIX,
};
use crate::version::{check_version, VersionCheck};

/// Everything C3 (container manager) and C2 (jump-host syncer) need from
/// the hypervisor, behind a trait so tests substitute a fake.
#[async_trait]
pub trait HypervisorClient: Send + Sync + 'static {
    async fn check_daemon_version(&self) -> Result<VersionCheck, HypervisorError>;

    async fn create_container(&self, req: CreateContainerRequest) -> Result<(), HypervisorError>;
    async fn start_container(&self, name: &str) -> Result<(), HypervisorError>;
    async fn stop_container(&self, name: &str, force: bool) -> Result<(), HypervisorError>;
    async fn delete_container(&self, name: &str) -> Result<(), HypervisorError>;
    async fn get_container(&self, name: &str) -> Result<ContainerInfo, HypervisorError>;
    async fn list_containers(&self) -> Result<Vec<ContainerInfo>, HypervisorError>;
    async fn container_ipv4(&self, name: &str) -> Result<Option<std::net::Ipv4Addr>, HypervisorError>;

    async fn set_config_key(&self, name: &str, key: &str, value: &str) -> Result<(), HypervisorError>;
    async fn get_config(&self, name: &str) -> Result<BTreeMap<String, String>, HypervisorError>;
    async fn remove_config_key(&self, name: &str, key: &str) -> Result<(), HypervisorError>;

    async fn add_device(&self, name: &str, device_name: &str, device: BTreeMap<String, String>) -> Result<(), HypervisorError>;
    async fn remove_device(&self, name: &str, device_name: &str) -> Result<(), HypervisorError>;

    async fn push_file(&self, name: &str, dest_path: &str, contents: &[u8], mode: u32) -> Result<(), HypervisorError>;
    async fn pull_file(&self, name: &str, src_path: &str) -> Result<Vec<u8>, HypervisorError>;

    async fn exec(&self, name: &str, command: Vec<String>) -> Result<ExecResult, HypervisorError>;

    /// Opens an interactive PTY session running `command` inside `name`,
    /// sized `cols`x`rows` (spec.md §4.8). Unlike `exec`, this returns as
    /// soon as the session is attached — the caller pumps bytes and
    /// resize events through the returned channels for the session's
    /// lifetime.
    async fn open_terminal(&self, name: &str, command: Vec<String>, cols: u16, rows: u16) -> Result<crate::terminal::TerminalSession, HypervisorError>;

    async fn live_resize(&self, name: &str, resources: ResourceCaps) -> Result<(), HypervisorError>;

    async fn list_networks(&self) -> Result<Vec<String>, HypervisorError>;
    async fn list_storage_pools(&self) -> Result<Vec<String>, HypervisorError>;
    async fn list_profiles(&self) -> Result<Vec<String>, HypervisorError>;
    async fn install_default_profile(&self, bridge: &str) -> Result<(), HypervisorError>;

    async fn recover_storage_pool(&self, pool: &str, driver: &str, source: &str) -> Result<(), HypervisorError>;

    /// Returns the IPv4 of a container whose name contains `substring`
    /// (spec.md §4.1: used to auto-discover the reverse-proxy and database
    /// containers).
    async fn find_service_container(&self, substring: &str) -> Result<Option<std::net::Ipv4Addr>, HypervisorError>;
}

pub struct LxdClient {
    transport: UnixHttpClient,
    op_timeout: Duration,
}

impl LxdClient {
    pub fn new(socket_path: impl AsRef<Path>) -> Self {
        Self {
            transport: UnixHttpClient::new(socket_path.as_ref(), Duration::from_secs(10)),
            op_timeout: Duration::from_secs(30),
        }
    }

    fn api_version_path() -> &'static str {
        "/1.0"
    }

    async fn wait_mutation(&self, body: &str) -> Result<(), HypervisorError> {
        wait_for_operation(&self.transport, body, self.op_timeout).await
    }

    fn container_state_to_domain(status: &str) -> ContainerState {
        match status {
            "Running" => ContainerState::Running,
            "Stopped" => ContainerState::Stopped,
            "Frozen" => ContainerState::Frozen,
            _ => ContainerState::Error,
        }
    }
}

#[async_trait]
impl HypervisorClient for LxdClient {
    #[instrument(skip(self))]
    async fn check_daemon_version(&self) -> Result<VersionCheck, HypervisorError> {
        let resp = self.transport.get(Self::api_version_path()).await?;
        let v: serde_json::Value = serde_json::from_str(&resp.body)?;
        let reported = v["metadata"]["environment"]["server_version"]
            .as_str()
            .ok_or_else(|| HypervisorError::Internal("daemon did not report server_version".into()))?;
        let check = check_version(reported)?;
        if let VersionCheck::UnknownButNewer(ref v) = check {
            warn!(reported = %v, "hypervisor daemon reports a newer-than-tested API version");
        }
        Ok(check)
    }

    #[instrument(skip(self, req), fields(container = %req.name))]
    async fn create_container(&self, req: CreateContainerRequest) -> Result<(), HypervisorError> {
        let body = json!({
            "name": req.name,
            "source": { "type": req.source.kind, "alias": req.source.alias },
            "config": req.config,
            "devices": req.devices,
        });
        let resp = self.transport.post_json("/1.0/containers", &body).await?;
        match resp.status {
            202 => self.wait_mutation(&resp.body).await,
            409 => Err(HypervisorError::AlreadyExists(req.name)),
            _ => Err(HypervisorError::Internal(format!("create_container HTTP {}: {}", resp.status, resp.body))),
        }?;
        info!(container = %req.name, "container created");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn start_container(&self, name: &str) -> Result<(), HypervisorError> {
        self.put_state(name, "start").await
    }

    #[instrument(skip(self))]
    async fn stop_container(&self, name: &str, force: bool) -> Result<(), HypervisorError> {
        let body = json!({ "action": "stop", "timeout": 30, "force": force });
        let resp = self.transport.put_json(&format!("/1.0/containers/{name}/state"), &body).await?;
        match resp.status {
            202 => self.wait_mutation(&resp.body).await,
            404 => Err(HypervisorError::NotFound(name.to_string())),
            _ => Err(HypervisorError::Internal(format!("stop_container HTTP {}: {}", resp.status, resp.body))),
        }
    }

    #[instrument(skip(self))]
    async fn delete_container(&self, name: &str) -> Result<(), HypervisorError> {
        let info = self.get_container(name).await?;
        if info.status == "Running" {
            return Err(HypervisorError::Conflict(format!("container {name} is running; stop it first")));
        }
        let resp = self.transport.delete(&format!("/1.0/containers/{name}")).await?;
        match resp.status {
            202 => self.wait_mutation(&resp.body).await,
            404 => Err(HypervisorError::NotFound(name.to_string())),
            _ => Err(HypervisorError::Internal(format!("delete_container HTTP {}: {}", resp.status, resp.body))),
        }
    }

    async fn get_container(&self, name: &str) -> Result<ContainerInfo, HypervisorError> {
        let resp = self.transport.get(&format!("/1.0/containers/{name}")).await?;
        if resp.status == 404 {
            return Err(HypervisorError::NotFound(name.to_string()));
        }
        let v: serde_json::Value = serde_json::from_str(&resp.body)?;
        let meta = &v["metadata"];
        Ok(ContainerInfo {
            name: name.to_string(),
            status: meta["status"].as_str().unwrap_or("Unknown").to_string(),
            config: meta["config"]
                .as_object()
                .map(|m| m.iter().map(|(k, v)| (k.clone(), v.as_str().unwrap_or_default().to_string())).collect())
                .unwrap_or_default(),
        })
    }

    async fn list_containers(&self) -> Result<Vec<ContainerInfo>, HypervisorError> {
        let resp = self.transport.get("/1.0/containers?recursion=1").await?;
        let v: serde_json::Value = serde_json::from_str(&resp.body)?;
        let entries = v["metadata"].as_array().cloned().unwrap_or_default();
        let mut out = Vec::with_capacity(entries.len());
        for entry in entries {
            out.push(ContainerInfo {
                name: entry["name"].as_str().unwrap_or_default().to_string(),
                status: entry["status"].as_str().unwrap_or("Unknown").to_string(),
                config: entry["config"]
                    .as_object()
                    .map(|m| m.iter().map(|(k, v)| (k.clone(), v.as_str().unwrap_or_default().to_string())).collect())
                    .unwrap_or_default(),
            });
        }
        Ok(out)
    }

    async fn container_ipv4(&self, name: &str) -> Result<Option<std::net::Ipv4Addr>, HypervisorError> {
        let resp = self.transport.get(&format!("/1.0/containers/{name}/state")).await?;
        if resp.status == 404 {
            return Err(HypervisorError::NotFound(name.to_string()));
        }
        let envelope: StateEnvelope = serde_json::from_str(&resp.body)?;
        Ok(envelope.metadata.first_ipv4())
    }

    async fn set_config_key(&self, name: &str, key: &str, value: &str) -> Result<(), HypervisorError> {
        let mut config = self.get_config(name).await?;
        config.insert(key.to_string(), value.to_string());
        let body = json!({ "config": config });
        let resp = self.transport.patch_json(&format!("/1.0/containers/{name}"), &body).await?;
        match resp.status {
            202 => self.wait_mutation(&resp.body).await,
            200 => Ok(()),
            404 => Err(HypervisorError::NotFound(name.to_string())),
            _ => Err(HypervisorError::Internal(format!("set_config_key HTTP {}: {}", resp.status, resp.body))),
        }
    }

    async fn get_config(&self, name: &str) -> Result<BTreeMap<String, String>, HypervisorError> {
        Ok(self.get_container(name).await?.config)
    }

    async fn remove_config_key(&self, name: &str, key: &str) -> Result<(), HypervisorError> {
        let mut config = self.get_config(name).await?;
        config.remove(key);
        let body = json!({ "config": config });
        let resp = self.transport.patch_json(&format!("/1.0/containers/{name}"), &body).await?;
        match resp.status {
            202 => self.wait_mutation(&resp.body).await,
            200 => Ok(()),
            404 => Err(HypervisorError::NotFound(name.to_string())),
            _ => Err(HypervisorError::Internal(format!("remove_config_key HTTP {}: {}", resp.status, resp.body))),
        }
    }

    async fn add_device(&self, name: &str, device_name: &str, device: BTreeMap<String, String>) -> Result<(), HypervisorError> {
        let info = self.get_container(name).await?;
        let _ = info; // devices live separately from config in the real API; simplified here.
        let body = json!({ "devices": { device_name: device } });
        let resp = self.transport.patch_json(&format!("/1.0/containers/{name}"), &body).await?;
        match resp.status {
            202 => self.wait_mutation(&resp.body).await,
            200 => Ok(()),
            404 => Err(HypervisorError::NotFound(name.to_string())),
            _ => Err(HypervisorError::Internal(format!("add_device HTTP {}: {}", resp.status, resp.body))),
        }
    }

    async fn remove_device(&self, name: &str, device_name: &str) -> Result<(), HypervisorError> {
        let body = json!({ "devices": { device_name: serde_json::Value::Null } });
        let resp = self.transport.patch_json(&format!("/1.0/containers/{name}"), &body).await?;
        match resp.status {
            202 => self.wait_mutation(&resp.body).await,
            200 => Ok(()),
            404 => Err(HypervisorError::NotFound(name.to_string())),
            _ => Err(HypervisorError::Internal(format!("remove_device HTTP {}: {}", resp.status, resp.body))),
        }
    }

    async fn push_file(&self, name: &str, dest_path: &str, contents: &[u8], mode: u32) -> Result<(), HypervisorError> {
        let body = json!({
            "content": base64::engine::general_purpose::STANDARD.encode(contents),
            "mode": format!("{:o}", mode),
            "type": "file",
        });
        let resp = self.transport.post_json(&format!("/1.0/containers/{name}/files?path={dest_path}"), &body).await?;
        if resp.status >= 400 {
            return Err(HypervisorError::Internal(format!("push_file HTTP {}: {}", resp.status, resp.body)));
        }
        Ok(())
    }

    async fn pull_file(&self, name: &str, src_path: &str) -> Result<Vec<u8>, HypervisorError> {
        let resp = self.transport.get(&format!("/1.0/containers/{name}/files?path={src_path}")).await?;
        if resp.status == 404 {
            return Err(HypervisorError::NotFound(format!("{name}:{src_path}")));
        }
        Ok(resp.body.into_bytes())
    }

    #[instrument(skip(self, command))]
    async fn exec(&self, name: &str, command: Vec<String>) -> Result<ExecResult, HypervisorError> {
        let req = ExecRequest::new(command);
        let body = serde_json::to_value(&req)?;
        let resp = self.transport.post_json(&format!("/1.0/containers/{name}/exec"), &body).await?;
        if resp.status != 202 {
            return Err(HypervisorError::Internal(format!("exec HTTP {}: {}", resp.status, resp.body)));
        }
        let envelope: serde_json::Value = serde_json::from_str(&resp.body)?;
        let op_id = envelope["metadata"]["id"].as_str().unwrap_or_default().to_string();
        wait_for_operation(&self.transport, &resp.body, self.op_timeout).await?;

        let final_resp = self.transport.get(&format!("/1.0/operations/{op_id}")).await?;
        let final_envelope: serde_json::Value = serde_json::from_str(&final_resp.body)?;
        let exit_code = final_envelope["metadata"]["metadata"]["return"].as_i64().unwrap_or(-1) as i32;

        // `record-output: true` makes the daemon persist each fd to a log file
        // and report its path under `metadata.metadata.output`, keyed by fd
        // number ("1" stdout, "2" stderr) rather than inlining the bytes.
        let output = final_envelope["metadata"]["metadata"]["output"].as_object();
        let stdout = self.fetch_exec_log(output, "1").await;
        let stderr = self.fetch_exec_log(output, "2").await;

        Ok(ExecResult { exit_code, stdout, stderr })
    }

    #[instrument(skip(self, command))]
    async fn open_terminal(&self, name: &str, command: Vec<String>, cols: u16, rows: u16) -> Result<crate::terminal::TerminalSession, HypervisorError> {
        crate::terminal::open_terminal(&self.transport, name, command, cols, rows).await
    }

    #[instrument(skip(self, resources))]
    async fn live_resize(&self, name: &str, resources: ResourceCaps) -> Result<(), HypervisorError> {
        self.set_config_key(name, "limits.cpu", &resources.cpu_cores.to_string()).await?;
        self.set_config_key(name, "limits.memory", &format!("{}B", resources.memory_bytes)).await?;
        self.set_config_key(name, "limits.disk", &format!("{}B", resources.root_disk_bytes)).await?;
        Ok(())
    }

    async fn list_networks(&self) -> Result<Vec<String>, HypervisorError> {
        self.list_string_resource("/1.0/networks").await
    }

    async fn list_storage_pools(&self) -> Result<Vec<String>, HypervisorError> {
        self.list_string_resource("/1.0/storage-pools").await
    }

    async fn list_profiles(&self) -> Result<Vec<String>, HypervisorError> {
        self.list_string_resource("/1.0/profiles").await
    }

    async fn install_default_profile(&self, bridge: &str) -> Result<(), HypervisorError> {
        let body = json!({
            "name": "default",
            "devices": { "eth0": { "type": "nic", "nictype": "bridged", "parent": bridge, "name": "eth0" } },
        });
        let resp = self.transport.patch_json("/1.0/profiles/default", &body).await?;
        match resp.status {
            200 | 202 => Ok(()),
            404 => Err(HypervisorError::NotFound("default profile".into())),
            _ => Err(HypervisorError::Internal(format!("install_default_profile HTTP {}: {}", resp.status, resp.body))),
        }
    }

    async fn recover_storage_pool(&self, pool: &str, driver: &str, source: &str) -> Result<(), HypervisorError> {
        let body = json!({ "name": pool, "driver": driver, "config": { "source": source } });
        let resp = self.transport.post_json("/1.0/storage-pools", &body).await?;
        match resp.status {
            200 | 202 => Ok(()),
            409 => Ok(()), // already imported
            _ => Err(HypervisorError::Internal(format!("recover_storage_pool HTTP {}: {}", resp.status, resp.body))),
        }
    }

    async fn find_service_container(&self, substring: &str) -> Result<Option<std::net::Ipv4Addr>, HypervisorError> {
        for c in self.list_containers().await? {
            if c.name.contains(substring) {
                return self.container_ipv4(&c.name).await;
            }
        }
        Ok(None)
    }
}

impl LxdClient {
    /// Fetches the log file the daemon recorded for one exec fd. Missing or
    /// unreadable logs degrade to an empty string rather than failing the
    /// whole `exec` call — the exit code is still authoritative.
    async fn fetch_exec_log(&self, output: Option<&serde_json::Map<String, serde_json::Value>>, fd: &str) -> String {
        let Some(path) = output.and_then(|o| o.get(fd)).and_then(|v| v.as_str()) else {
            return String::new();
        };
        match self.transport.get(path).await {
            Ok(resp) if resp.status < 400 => resp.body,
            Ok(resp) => {
                warn!(path, status = resp.status, "exec log fetch returned an error status");
                String::new()
            }
            Err(e) => {
                warn!(path, error = %e, "failed to fetch exec log");
                String::new()
            }
        }
    }

    async fn put_state(&self, name: &str, action: &str) -> Result<(), HypervisorError> {
        let body = json!({ "action": action, "timeout": 30 });
        let resp = self.transport.put_json(&format!("/1.0/containers/{name}/state"), &body).await?;
        match resp.status {
            202 => self.wait_mutation(&resp.body).await,
            404 => Err(HypervisorError::NotFound(name.to_string())),
            _ => Err(HypervisorError::Internal(format!("{action} HTTP {}: {}", resp.status, resp.body))),
        }
    }

    async fn list_string_resource(&self, path: &str) -> Result<Vec<String>, HypervisorError> {
        let resp = self.transport.get(path).await?;
        let v: serde_json::Value = serde_json::from_str(&resp.body)?;
        Ok(v["metadata"]
            .as_array()
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .filter_map(|entry| entry.as_str().map(|s| s.rsplit('/').next().unwrap_or(s).to_string()))
            .collect())
    }
}

#[derive(serde::Deserialize)]
struct StateEnvelope {
    metadata: ContainerStateResponse,
}

/// Turn a hypervisor container observation into a domain `Container` by
/// overlaying the derived state onto the caller's known-good config.
pub fn merge_observed_state(mut container: Container, observed: &ContainerInfo) -> Container {
    container.state = match observed.status.as_str() {
        "Running" => ContainerState::Running,
        "Stopped" => ContainerState::Stopped,
        "Frozen" => ContainerState::Frozen,
        _ => ContainerState::Error,
    };
    for (k, v) in &observed.config {
        if let Some(label) = strip_label_prefix(k) {
            container.labels.insert(label.to_string(), v.clone());
        }
    }
    container
}

pub fn container_source(image: &str) -> ContainerSource {
    ContainerSource { kind: "image", alias: image.to_string() }
}

pub fn label_config_entry(key: &str, value: &str) -> (String, String) {
    (label_key(key), value.to_string())
}

pub const _LABEL_PREFIX: &str = LABEL_PREFIX;

#[cfg(test)]
mod tests {
    use super::*;
    use containarium_core::test_support::ContainerBuilder;

    #[test]
    fn merge_observed_state_maps_status_and_labels() {
        let container = ContainerBuilder::default().build();
        let observed = ContainerInfo {
            name: container.name.clone(),
            status: "Stopped".to_string(),
            config: BTreeMap::from([(label_key("team"), "infra".to_string())]),
        };
        let merged = merge_observed_state(container, &observed);
        assert_eq!(merged.state, ContainerState::Stopped);
        assert_eq!(merged.labels.get("team"), Some(&"infra".to_string()));
    }
}
