// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Containarium Contributors

//! `SyncAccounts` (spec.md §4.2): reconcile host OS users against what the
//! hypervisor and app store say should exist. Run once at daemon startup to
//! recover host accounts after a rebuild, and safe to re-run at any time —
//! it only ever creates accounts that are missing, it never deletes one
//! whose container still exists.

use std::sync::Arc;

use containarium_core::Collaborator;
use containarium_hypervisor::HypervisorClient;
use tracing::{info, warn};

use crate::error::JumphostError;
use crate::host_account::HostAccountAdapter;

pub struct AccountSyncer {
    hypervisor: Arc<dyn HypervisorClient>,
    accounts: Arc<dyn HostAccountAdapter>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub created: Vec<String>,
    pub skipped_no_key: Vec<String>,
    pub already_present: Vec<String>,
}

impl AccountSyncer {
    pub fn new(hypervisor: Arc<dyn HypervisorClient>, accounts: Arc<dyn HostAccountAdapter>) -> Self {
        Self { hypervisor, accounts }
    }

    /// Lists every container on the host, extracts the first interior SSH
    /// key by exec, and recreates the matching host user if it's absent.
    pub async fn sync_containers(&self) -> Result<SyncReport, JumphostError> {
        let mut report = SyncReport::default();
        for info in self.hypervisor.list_containers().await? {
            let owner = owner_from_container_name(&info.name);
            self.sync_one(&owner, &info.name, &mut report).await?;
        }
        Ok(report)
    }

    /// Syncs collaborator accounts, which carry their key directly (no
    /// exec needed — spec.md §4.2: "synced identically from the app store").
    pub async fn sync_collaborators(&self, collaborators: &[Collaborator]) -> Result<SyncReport, JumphostError> {
        let mut report = SyncReport::default();
        for c in collaborators {
            if self.accounts.account_exists(&c.username).await? {
                report.already_present.push(c.username.clone());
                continue;
            }
            self.accounts.create_account(&c.username).await?;
            self.accounts.write_authorized_key(&c.username, &c.authorized_key).await?;
            report.created.push(c.username.clone());
        }
        Ok(report)
    }

    async fn sync_one(&self, owner: &str, container_name: &str, report: &mut SyncReport) -> Result<(), JumphostError> {
        if self.accounts.account_exists(owner).await? {
            report.already_present.push(owner.to_string());
            return Ok(());
        }

        let key = match self.read_interior_key(container_name, owner).await {
            Ok(Some(key)) => key,
            Ok(None) => {
                warn!(container = %container_name, "no authorized_keys found inside container, skipping host account");
                report.skipped_no_key.push(owner.to_string());
                return Ok(());
            }
            Err(e) => {
                warn!(container = %container_name, error = %e, "could not read interior key, skipping host account");
                report.skipped_no_key.push(owner.to_string());
                return Ok(());
            }
        };

        self.accounts.create_account(owner).await?;
        self.accounts.write_authorized_key(owner, &key).await?;
        info!(owner, container = %container_name, "recreated host jump account");
        report.created.push(owner.to_string());
        Ok(())
    }

    async fn read_interior_key(&self, container_name: &str, owner: &str) -> Result<Option<String>, JumphostError> {
        let path = format!("/home/{owner}/.ssh/authorized_keys");
        let result = self
            .hypervisor
            .exec(container_name, vec!["cat".to_string(), path])
            .await?;
        if result.exit_code != 0 {
            return Ok(None);
        }
        Ok(result.stdout.lines().find(|l| !l.trim().is_empty()).map(str::to_string))
    }
}

fn owner_from_container_name(container_name: &str) -> String {
    container_name.strip_suffix("-container").unwrap_or(container_name).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_is_stripped_from_container_suffix() {
        assert_eq!(owner_from_container_name("alice-container"), "alice");
        assert_eq!(owner_from_container_name("weird-name"), "weird-name");
    }
}
