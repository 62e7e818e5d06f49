// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Containarium Contributors

//! Interactive exec (spec.md §4.8: "opens a PTY inside the container").
//!
//! LXD's interactive exec multiplexes stdin/stdout/stderr onto a single
//! data fd (`"0"`) and carries resize/signal control messages on a
//! second `"control"` fd, each reachable as its own WebSocket at
//! `/1.0/operations/{id}/websocket?secret=...`. We open that upgrade the
//! same way the teacher's Docker event bridge does
//! (`tokio_tungstenite::client_async` against an already-connected
//! stream) — just over this crate's Unix socket instead of TCP.

use std::path::Path;

use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio::net::UnixStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::WebSocketStream;
use tracing::warn;

use crate::error::HypervisorError;
use crate::transport::UnixHttpClient;

/// A live PTY session inside a container. `input` carries bytes to the
/// process's stdin; `output` yields bytes as they arrive and closes when
/// the session ends; `resize` forwards a terminal size change.
pub struct TerminalSession {
    pub input: mpsc::Sender<Vec<u8>>,
    pub output: mpsc::Receiver<Vec<u8>>,
    pub resize: mpsc::Sender<(u16, u16)>,
}

/// Opens an interactive exec inside `name`, running `command` attached to
/// a `cols`x`rows` PTY, and returns the channels bridging it.
pub async fn open_terminal(
    transport: &UnixHttpClient,
    name: &str,
    command: Vec<String>,
    cols: u16,
    rows: u16,
) -> Result<TerminalSession, HypervisorError> {
    let body = json!({
        "command": command,
        "wait-for-websocket": true,
        "interactive": true,
        "width": cols,
        "height": rows,
    });
    let resp = transport.post_json(&format!("/1.0/containers/{name}/exec"), &body).await?;
    if resp.status != 202 {
        return Err(HypervisorError::Internal(format!("interactive exec HTTP {}: {}", resp.status, resp.body)));
    }

    let envelope: serde_json::Value = serde_json::from_str(&resp.body)?;
    let op_id = envelope["metadata"]["id"].as_str().unwrap_or_default().to_string();
    let fds = envelope["metadata"]["metadata"]["fds"].as_object().cloned().unwrap_or_default();
    let data_secret = fds
        .get("0")
        .and_then(|v| v.as_str())
        .ok_or_else(|| HypervisorError::Internal("interactive exec did not return a data fd secret".into()))?
        .to_string();
    let control_secret = fds.get("control").and_then(|v| v.as_str()).map(str::to_string);

    let socket_path = transport.socket_path().to_path_buf();
    let data_ws = connect_operation_ws(&socket_path, &op_id, &data_secret).await?;
    let (mut data_write, mut data_read) = data_ws.split();

    let (input_tx, mut input_rx) = mpsc::channel::<Vec<u8>>(64);
    let (output_tx, output_rx) = mpsc::channel::<Vec<u8>>(64);
    let (resize_tx, mut resize_rx) = mpsc::channel::<(u16, u16)>(8);

    tokio::spawn(async move {
        loop {
            tokio::select! {
                msg = input_rx.recv() => match msg {
                    Some(bytes) => {
                        if data_write.send(WsMessage::Binary(bytes)).await.is_err() {
                            break;
                        }
                    }
                    None => {
                        let _ = data_write.send(WsMessage::Close(None)).await;
                        break;
                    }
                },
                frame = data_read.next() => match frame {
                    Some(Ok(WsMessage::Binary(bytes))) => {
                        if output_tx.send(bytes).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(WsMessage::Text(text))) => {
                        if output_tx.send(text.into_bytes()).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(WsMessage::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!(error = %e, "terminal data channel error");
                        break;
                    }
                },
            }
        }
    });

    if let Some(control_secret) = control_secret {
        tokio::spawn(async move {
            let control_ws = match connect_operation_ws(&socket_path, &op_id, &control_secret).await {
                Ok(ws) => ws,
                Err(e) => {
                    warn!(error = %e, "failed to open terminal control channel");
                    return;
                }
            };
            let (mut control_write, _control_read) = control_ws.split();
            while let Some((cols, rows)) = resize_rx.recv().await {
                let msg = json!({"command": "window-resize", "args": {"width": cols.to_string(), "height": rows.to_string()}});
                if control_write.send(WsMessage::Text(msg.to_string())).await.is_err() {
                    break;
                }
            }
        });
    }

    Ok(TerminalSession { input: input_tx, output: output_rx, resize: resize_tx })
}

async fn connect_operation_ws(socket_path: &Path, op_id: &str, secret: &str) -> Result<WebSocketStream<UnixStream>, HypervisorError> {
    let stream = UnixStream::connect(socket_path).await.map_err(|e| HypervisorError::Unavailable(format!("connect {}: {e}", socket_path.display())))?;
    let uri = format!("ws://lxd/1.0/operations/{op_id}/websocket?secret={secret}");
    let (ws, _response) = tokio_tungstenite::client_async(uri, stream).await.map_err(|e| HypervisorError::Internal(format!("websocket handshake failed: {e}")))?;
    Ok(ws)
}
