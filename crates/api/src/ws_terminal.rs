// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Containarium Contributors

//! The browser terminal (spec.md §4.8: `GET /v1/containers/{u}/terminal`):
//! a WebSocket upgrade proxying JSON frames `{type: "input"|"output"|
//! "resize"|"error", data?, cols?, rows?}` to a real PTY opened inside the
//! container via [`containarium_hypervisor::HypervisorClient::open_terminal`].
//! Grounded on the teacher's `listener::attach` connection-upgrade shape:
//! three cooperating tasks (stdin pump, stdout pump, resize handler)
//! joined by one `CancellationToken`, so a client disconnect or a server
//! shutdown tears all three down together (spec.md: "the terminal PTY
//! uses three cooperating tasks ... joined by the WebSocket connection's
//! lifetime").

use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Path, Query, State, WebSocketUpgrade};
use axum::response::{IntoResponse, Response};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::auth::verify;
use crate::context::ApiContext;

const DEFAULT_COLS: u16 = 80;
const DEFAULT_ROWS: u16 = 24;
const SHELL: &str = "bash";

#[derive(Deserialize)]
pub struct TerminalQuery {
    token: String,
    #[serde(default)]
    cols: Option<u16>,
    #[serde(default)]
    rows: Option<u16>,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum ClientFrame {
    Input { data: String },
    Resize { cols: u16, rows: u16 },
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum ServerFrame<'a> {
    Output { data: &'a str },
    Error { data: &'a str },
}

pub async fn upgrade(State(ctx): State<ApiContext>, Path(name): Path<String>, Query(q): Query<TerminalQuery>, ws: WebSocketUpgrade) -> Response {
    if verify(&ctx.jwt_secret, &q.token).is_err() {
        return (axum::http::StatusCode::UNAUTHORIZED, "invalid or expired token").into_response();
    }
    let cols = q.cols.unwrap_or(DEFAULT_COLS);
    let rows = q.rows.unwrap_or(DEFAULT_ROWS);
    ws.on_upgrade(move |socket| run_terminal(socket, ctx, name, cols, rows))
}

async fn run_terminal(socket: WebSocket, ctx: ApiContext, container_name: String, cols: u16, rows: u16) {
    let (mut sink, mut stream) = socket.split();

    let session = match ctx.hypervisor.open_terminal(&container_name, vec![SHELL.to_string()], cols, rows).await {
        Ok(session) => session,
        Err(e) => {
            let frame = ServerFrame::Error { data: &e.to_string() };
            if let Ok(text) = serde_json::to_string(&frame) {
                let _ = sink.send(Message::Text(text)).await;
            }
            let _ = sink.send(Message::Close(None)).await;
            return;
        }
    };
    let mut pty_input = session.input;
    let mut pty_output = session.output;
    let pty_resize = session.resize;

    let cancel = CancellationToken::new();
    let (resize_tx, mut resize_rx) = mpsc::channel::<(u16, u16)>(8);

    // stdout pump: relays PTY output as "output" frames and keeps the
    // connection alive with periodic pings while idle.
    let stdout_pump = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            let mut keepalive = tokio::time::interval(Duration::from_secs(30));
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = keepalive.tick() => {
                        if sink.send(Message::Ping(Vec::new())).await.is_err() {
                            break;
                        }
                    }
                    chunk = pty_output.recv() => match chunk {
                        Some(bytes) => {
                            let text = String::from_utf8_lossy(&bytes).into_owned();
                            let frame = ServerFrame::Output { data: &text };
                            let Ok(payload) = serde_json::to_string(&frame) else { continue };
                            if sink.send(Message::Text(payload)).await.is_err() {
                                break;
                            }
                        }
                        None => break,
                    },
                }
            }
            cancel.cancel();
            let _ = sink.send(Message::Close(None)).await;
        })
    };

    // resize handler: forwards parsed resize frames to the PTY's control
    // channel, decoupled from stdin parsing so a slow control channel
    // never blocks input delivery.
    let resize_handler = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    req = resize_rx.recv() => match req {
                        Some((cols, rows)) => {
                            if pty_resize.send((cols, rows)).await.is_err() {
                                break;
                            }
                        }
                        None => break,
                    },
                }
            }
        })
    };

    // stdin pump: reads client frames and dispatches input bytes to the
    // PTY or resize requests to the resize handler.
    let stdin_pump = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            while let Some(Ok(msg)) = stream.next().await {
                let text = match msg {
                    Message::Text(t) => t,
                    Message::Close(_) => break,
                    _ => continue,
                };
                match serde_json::from_str::<ClientFrame>(&text) {
                    Ok(ClientFrame::Input { data }) => {
                        if pty_input.send(data.into_bytes()).await.is_err() {
                            break;
                        }
                    }
                    Ok(ClientFrame::Resize { cols, rows }) => {
                        if resize_tx.send((cols, rows)).await.is_err() {
                            break;
                        }
                    }
                    Err(_) => continue,
                }
            }
            cancel.cancel();
            debug!(container = %container_name, "terminal session ended");
        })
    };

    let _ = stdin_pump.await;
    cancel.cancel();
    let _ = resize_handler.await;
    let _ = stdout_pump.await;
}
