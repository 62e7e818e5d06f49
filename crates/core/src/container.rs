// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Containarium Contributors

//! Container domain type (spec.md §3, §4.3).

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Derived container state, sourced from the hypervisor — never stored
/// independently (spec.md §3: "State is derived from the hypervisor").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContainerState {
    Creating,
    Running,
    Stopped,
    Frozen,
    Error,
}

crate::simple_display! {
    ContainerState {
        Creating => "creating",
        Running => "running",
        Stopped => "stopped",
        Frozen => "frozen",
        Error => "error",
    }
}

/// Resource caps for a container (spec.md §3). All fields are in base
/// units (cores, bytes, bytes) so they compare and persist without unit
/// ambiguity; the hypervisor client formats them for the daemon's config
/// keys (e.g. `"4"`, `"4GB"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceCaps {
    pub cpu_cores: u32,
    pub memory_bytes: u64,
    pub root_disk_bytes: u64,
}

impl ResourceCaps {
    pub fn new(cpu_cores: u32, memory_bytes: u64, root_disk_bytes: u64) -> Self {
        Self { cpu_cores, memory_bytes, root_disk_bytes }
    }

    /// A resize request only touches the caps it names; `Some(_)` fields
    /// replace the current value, `None` leaves it unchanged.
    pub fn merge(&self, resize: &ResizeRequest) -> Self {
        Self {
            cpu_cores: resize.cpu_cores.unwrap_or(self.cpu_cores),
            memory_bytes: resize.memory_bytes.unwrap_or(self.memory_bytes),
            root_disk_bytes: resize.root_disk_bytes.unwrap_or(self.root_disk_bytes),
        }
    }
}

/// Partial resource update (spec.md §4.3 "Resize: accepts any subset").
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResizeRequest {
    pub cpu_cores: Option<u32>,
    pub memory_bytes: Option<u64>,
    pub root_disk_bytes: Option<u64>,
}

impl ResizeRequest {
    /// Spec.md §4.3: "Disk shrinking is forbidden."
    pub fn validate_against(&self, current: &ResourceCaps) -> Result<(), crate::Error> {
        if let Some(new_disk) = self.root_disk_bytes {
            if new_disk < current.root_disk_bytes {
                return Err(crate::Error::failed_precondition(format!(
                    "cannot shrink root disk from {} to {} bytes",
                    current.root_disk_bytes, new_disk
                )));
            }
        }
        Ok(())
    }
}

/// A persistent, per-user system container (spec.md §3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    /// `<username>-container`.
    pub name: String,
    pub owner: String,
    pub image: String,
    pub resources: ResourceCaps,
    pub static_address: Option<std::net::Ipv4Addr>,
    pub authorized_keys: BTreeSet<String>,
    pub labels: BTreeMap<String, String>,
    pub auto_start: bool,
    pub nested_runtime: bool,
    pub state: ContainerState,
}

impl Container {
    pub fn new(owner: impl Into<String>, image: impl Into<String>, resources: ResourceCaps) -> Self {
        let owner = owner.into();
        let name = crate::names::container_name(&owner);
        Self {
            name,
            owner,
            image: image.into(),
            resources,
            static_address: None,
            authorized_keys: BTreeSet::new(),
            labels: BTreeMap::new(),
            auto_start: true,
            nested_runtime: false,
            state: ContainerState::Creating,
        }
    }

    /// Invariant check used by the manager before allowing a delete without
    /// `force` (spec.md §4.3).
    pub fn is_running(&self) -> bool {
        matches!(self.state, ContainerState::Running)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn container_name_follows_convention() {
        let c = Container::new("alice", "images:ubuntu/24.04", ResourceCaps::new(4, 4_000_000_000, 50_000_000_000));
        assert_eq!(c.name, "alice-container");
        assert_eq!(c.state, ContainerState::Creating);
    }

    #[test]
    fn resize_merges_only_named_fields() {
        let current = ResourceCaps::new(4, 4_000_000_000, 50_000_000_000);
        let resize = ResizeRequest { cpu_cores: Some(8), memory_bytes: Some(8_000_000_000), root_disk_bytes: None };
        let merged = current.merge(&resize);
        assert_eq!(merged.cpu_cores, 8);
        assert_eq!(merged.memory_bytes, 8_000_000_000);
        assert_eq!(merged.root_disk_bytes, 50_000_000_000);
    }

    #[test]
    fn disk_shrink_is_rejected() {
        let current = ResourceCaps::new(4, 4_000_000_000, 50_000_000_000);
        let resize = ResizeRequest { root_disk_bytes: Some(10_000_000_000), ..Default::default() };
        let err = resize.validate_against(&current).unwrap_err();
        assert_eq!(err.kind, crate::ErrorKind::FailedPrecondition);
    }
}
