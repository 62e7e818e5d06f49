// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Containarium Contributors

//! Host OS account provisioning (spec.md §4.2).
//!
//! Invariants enforced here: never create an account whose key can't be
//! read, never delete an account while its container still exists, and the
//! `authorized_keys` file is always `0600` owned by the jumped user.

use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;

use async_trait::async_trait;
use fs2::FileExt;
use tokio::process::Command;

use crate::error::JumphostError;

/// Abstraction over the host-account primitives so the syncer is testable
/// without actually shelling out to `useradd`/`usermod`.
#[async_trait]
pub trait HostAccountAdapter: Send + Sync {
    async fn account_exists(&self, username: &str) -> Result<bool, JumphostError>;
    async fn create_account(&self, username: &str) -> Result<(), JumphostError>;
    async fn delete_account(&self, username: &str) -> Result<(), JumphostError>;
    async fn write_authorized_key(&self, username: &str, key: &str) -> Result<(), JumphostError>;
    async fn first_authorized_key(&self, username: &str) -> Result<Option<String>, JumphostError>;
}

/// Shells out to the real `useradd`/`userdel` and writes `~/.ssh/authorized_keys`
/// directly, serialized with an exclusive flock the same way the daemon's
/// own lock-file startup guards a single-writer region.
pub struct SystemHostAccountAdapter;

#[async_trait]
impl HostAccountAdapter for SystemHostAccountAdapter {
    async fn account_exists(&self, username: &str) -> Result<bool, JumphostError> {
        let status = Command::new("id").arg(username).status().await?;
        Ok(status.success())
    }

    async fn create_account(&self, username: &str) -> Result<(), JumphostError> {
        if self.account_exists(username).await? {
            return Err(JumphostError::AccountExists(username.to_string()));
        }
        let output = Command::new("useradd")
            .args(["--create-home", "--shell", "/usr/sbin/nologin", username])
            .output()
            .await?;
        if !output.status.success() {
            return Err(JumphostError::CommandFailed(
                format!("useradd {username}"),
                String::from_utf8_lossy(&output.stderr).into_owned(),
            ));
        }
        Ok(())
    }

    async fn delete_account(&self, username: &str) -> Result<(), JumphostError> {
        if !self.account_exists(username).await? {
            return Err(JumphostError::AccountNotFound(username.to_string()));
        }
        let output = Command::new("userdel").args(["--remove", username]).output().await?;
        if !output.status.success() {
            return Err(JumphostError::CommandFailed(
                format!("userdel {username}"),
                String::from_utf8_lossy(&output.stderr).into_owned(),
            ));
        }
        Ok(())
    }

    async fn write_authorized_key(&self, username: &str, key: &str) -> Result<(), JumphostError> {
        let ssh_dir = home_dir(username).join(".ssh");
        let path = ssh_dir.clone();
        let key = key.to_string();
        let username = username.to_string();
        tokio::task::spawn_blocking(move || write_authorized_key_blocking(&path, &username, &key))
            .await
            .map_err(|e| JumphostError::CommandFailed("write_authorized_key".into(), e.to_string()))??;
        Ok(())
    }

    async fn first_authorized_key(&self, username: &str) -> Result<Option<String>, JumphostError> {
        let path = home_dir(username).join(".ssh").join("authorized_keys");
        match tokio::fs::read_to_string(&path).await {
            Ok(contents) => Ok(contents.lines().find(|l| !l.trim().is_empty()).map(str::to_string)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

fn home_dir(username: &str) -> PathBuf {
    PathBuf::from("/home").join(username)
}

/// Exclusive-locked so two syncer runs never interleave writes to the same
/// file; mirrors the daemon's own lock-file acquisition pattern.
fn write_authorized_key_blocking(ssh_dir: &std::path::Path, username: &str, key: &str) -> Result<(), JumphostError> {
    std::fs::create_dir_all(ssh_dir)?;
    let path = ssh_dir.join("authorized_keys");
    let file = std::fs::OpenOptions::new().create(true).write(true).truncate(false).open(&path)?;
    file.lock_exclusive().map_err(JumphostError::Io)?;
    std::fs::write(&path, format!("{}\n", key.trim()))?;
    let mut perms = file.metadata()?.permissions();
    perms.set_mode(0o600);
    std::fs::set_permissions(&path, perms)?;
    file.unlock()?;

    set_owner(&path, username)?;
    Ok(())
}

fn set_owner(path: &std::path::Path, username: &str) -> Result<(), JumphostError> {
    let status = std::process::Command::new("chown").arg(format!("{username}:{username}")).arg(path).status()?;
    if !status.success() {
        return Err(JumphostError::CommandFailed(format!("chown {username}"), "non-zero exit".into()));
    }
    Ok(())
}
