// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Containarium Contributors

//! NAT chain programming (spec.md §4.9): PROXY mode DNATs each forwarded
//! port to the backend's internal IP and MASQUERADEs the return path;
//! MAINTENANCE mode clears the chain. Every invocation passes an argv
//! vector to `iptables`, never a shell string, grounded on the teacher's
//! `tokio::process::Command` usage for external tool invocation
//! (`executor.rs`, `adapters/agent/docker/mod.rs`).

use std::sync::Arc;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::SentinelError;

#[async_trait]
pub trait NatRunner: Send + Sync {
    async fn run(&self, args: &[&str]) -> Result<(), SentinelError>;
}

/// Shells out to the real `iptables` binary.
pub struct IptablesRunner;

#[async_trait]
impl NatRunner for IptablesRunner {
    async fn run(&self, args: &[&str]) -> Result<(), SentinelError> {
        let output = Command::new("iptables").args(args).output().await?;
        if !output.status.success() {
            return Err(SentinelError::Nat(format!("iptables {:?} exited {}: {}", args, output.status, String::from_utf8_lossy(&output.stderr))));
        }
        Ok(())
    }
}

pub struct NatProgrammer {
    runner: Arc<dyn NatRunner>,
    chain: String,
}

impl NatProgrammer {
    pub fn new(runner: Arc<dyn NatRunner>, chain: String) -> Self {
        Self { runner, chain }
    }

    /// Idempotent: create the chain if absent, ignore "already exists".
    async fn ensure_chain(&self) {
        let _ = self.runner.run(&["-t", "nat", "-N", &self.chain]).await;
    }

    async fn flush_chain(&self) -> Result<(), SentinelError> {
        self.runner.run(&["-t", "nat", "-F", &self.chain]).await
    }

    async fn ensure_jump(&self) -> Result<(), SentinelError> {
        // Avoid duplicate jump rules: check first, append only if absent.
        let check = self.runner.run(&["-t", "nat", "-C", "PREROUTING", "-j", &self.chain]).await;
        if check.is_err() {
            self.runner.run(&["-t", "nat", "-A", "PREROUTING", "-j", &self.chain]).await?;
        }
        Ok(())
    }

    async fn remove_jump(&self) {
        let _ = self.runner.run(&["-t", "nat", "-D", "PREROUTING", "-j", &self.chain]).await;
    }

    async fn ensure_masquerade(&self, backend_ip: &str) -> Result<(), SentinelError> {
        let check = self.runner.run(&["-t", "nat", "-C", "POSTROUTING", "-d", backend_ip, "-j", "MASQUERADE"]).await;
        if check.is_err() {
            self.runner.run(&["-t", "nat", "-A", "POSTROUTING", "-d", backend_ip, "-j", "MASQUERADE"]).await?;
        }
        Ok(())
    }

    async fn remove_masquerade(&self, backend_ip: &str) {
        let _ = self.runner.run(&["-t", "nat", "-D", "POSTROUTING", "-d", backend_ip, "-j", "MASQUERADE"]).await;
    }

    /// Programs one DNAT rule per forwarded port targeting `backend_ip`.
    pub async fn enter_proxy_mode(&self, backend_ip: &str, forwarded_ports: &[u16]) -> Result<(), SentinelError> {
        self.ensure_chain().await;
        self.flush_chain().await?;
        self.ensure_jump().await?;
        for port in forwarded_ports {
            let port_str = port.to_string();
            let to_dest = format!("{backend_ip}:{port_str}");
            self.runner
                .run(&["-t", "nat", "-A", &self.chain, "-p", "tcp", "--dport", &port_str, "-j", "DNAT", "--to-destination", &to_dest])
                .await?;
        }
        self.ensure_masquerade(backend_ip).await?;
        info!(backend_ip, ports = ?forwarded_ports, chain = %self.chain, "NAT chain programmed for PROXY mode");
        Ok(())
    }

    /// Empties the chain; no traffic reaches the backend until the next
    /// `enter_proxy_mode`.
    pub async fn enter_maintenance_mode(&self, backend_ip: &str) -> Result<(), SentinelError> {
        self.flush_chain().await?;
        self.remove_jump().await;
        self.remove_masquerade(backend_ip).await;
        debug!(chain = %self.chain, "NAT chain cleared for MAINTENANCE mode");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::*;

    #[derive(Default)]
    struct RecordingRunner {
        calls: Mutex<Vec<Vec<String>>>,
        fail_checks: bool,
    }

    #[async_trait]
    impl NatRunner for RecordingRunner {
        async fn run(&self, args: &[&str]) -> Result<(), SentinelError> {
            let owned: Vec<String> = args.iter().map(|s| s.to_string()).collect();
            let is_check = owned.iter().any(|a| a == "-C");
            self.calls.lock().push(owned);
            if is_check && self.fail_checks {
                return Err(SentinelError::Nat("no such rule".to_string()));
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn proxy_mode_programs_dnat_per_port() {
        let runner = Arc::new(RecordingRunner { fail_checks: true, ..Default::default() });
        let programmer = NatProgrammer::new(runner.clone(), "TEST-CHAIN".to_string());
        programmer.enter_proxy_mode("10.0.0.5", &[80, 443]).await.unwrap();
        let calls = runner.calls.lock();
        assert!(calls.iter().any(|c| c.contains(&"DNAT".to_string()) && c.contains(&"80".to_string())));
        assert!(calls.iter().any(|c| c.contains(&"DNAT".to_string()) && c.contains(&"443".to_string())));
        assert!(calls.iter().any(|c| c.contains(&"MASQUERADE".to_string())));
    }

    #[tokio::test]
    async fn maintenance_mode_flushes_and_removes_jump() {
        let runner = Arc::new(RecordingRunner { fail_checks: true, ..Default::default() });
        let programmer = NatProgrammer::new(runner.clone(), "TEST-CHAIN".to_string());
        programmer.enter_maintenance_mode("10.0.0.5").await.unwrap();
        let calls = runner.calls.lock();
        assert!(calls.iter().any(|c| c.contains(&"-F".to_string())));
    }
}
