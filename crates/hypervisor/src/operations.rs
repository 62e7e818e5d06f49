// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Containarium Contributors

//! Background-operation polling.
//!
//! Mutating hypervisor calls return an operation id immediately; the daemon
//! completes the work asynchronously. Spec.md §4.1: "all mutating calls
//! block until the daemon acknowledges completion (the daemon's native
//! operation-completion protocol)" — so every mutating method in
//! [`crate::client::HypervisorClient`] calls [`wait_for_operation`] before
//! returning.

use std::time::Duration;

use serde::Deserialize;

use crate::error::HypervisorError;
use crate::transport::UnixHttpClient;

#[derive(Debug, Deserialize)]
struct OperationEnvelope {
    metadata: OperationMetadata,
}

#[derive(Debug, Deserialize)]
struct OperationMetadata {
    id: String,
    status: String,
    #[serde(default)]
    err: String,
}

/// Poll `/1.0/operations/{id}/wait` until the operation leaves `Running`.
///
/// `timeout` bounds the whole wait, not a single poll; a daemon that never
/// completes the operation surfaces as [`HypervisorError::Timeout`].
pub async fn wait_for_operation(
    transport: &UnixHttpClient,
    create_response_body: &str,
    timeout: Duration,
) -> Result<(), HypervisorError> {
    let envelope: OperationEnvelope = serde_json::from_str(create_response_body)?;
    let op_id = envelope.metadata.id;

    tokio::time::timeout(timeout, poll_until_done(transport, &op_id))
        .await
        .map_err(|_| HypervisorError::Timeout(format!("operation {op_id} did not complete in time")))?
}

async fn poll_until_done(transport: &UnixHttpClient, op_id: &str) -> Result<(), HypervisorError> {
    loop {
        let resp = transport.get(&format!("/1.0/operations/{op_id}/wait?timeout=5")).await?;
        if resp.status >= 400 {
            return Err(HypervisorError::Internal(format!(
                "operation {op_id} wait returned HTTP {}: {}",
                resp.status, resp.body
            )));
        }
        let envelope: OperationEnvelope = serde_json::from_str(&resp.body)?;
        match envelope.metadata.status.as_str() {
            "Success" => return Ok(()),
            "Failure" => {
                return Err(HypervisorError::Internal(format!(
                    "operation {op_id} failed: {}",
                    envelope.metadata.err
                )))
            }
            "Running" | "Pending" => continue,
            other => return Err(HypervisorError::Internal(format!("unexpected operation status {other:?}"))),
        }
    }
}
