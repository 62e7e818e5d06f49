// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Containarium Contributors

//! Admin HTTP client for the reverse-proxy process (spec.md §4.7). The
//! proxy is an external process; this is its one authorized caller.

use async_trait::async_trait;
use containarium_core::Route;
use serde::{Deserialize, Serialize};

use crate::error::ProxyError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteSpec {
    pub route_id: String,
    pub host: String,
    pub upstream: String,
}

impl RouteSpec {
    pub fn from_route(route: &Route) -> Self {
        Self { route_id: route.id.to_string(), host: route.domain.clone(), upstream: route.upstream() }
    }
}

#[async_trait]
pub trait ProxyAdmin: Send + Sync {
    async fn add_route(&self, route: &RouteSpec) -> Result<(), ProxyError>;
    async fn delete_route(&self, route_id: &str) -> Result<(), ProxyError>;
    async fn provision_tls(&self, host: &str) -> Result<(), ProxyError>;
    async fn list_routes(&self) -> Result<Vec<RouteSpec>, ProxyError>;
    async fn setup_port_forwarding(&self, proxy_container_ip: &str) -> Result<(), ProxyError>;
}

pub struct HttpProxyAdmin {
    base_url: String,
    http: reqwest::Client,
}

impl HttpProxyAdmin {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into(), http: reqwest::Client::new() }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn check(resp: reqwest::Response) -> Result<reqwest::Response, ProxyError> {
        if resp.status().is_success() {
            Ok(resp)
        } else {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            Err(ProxyError::BadResponse { status, body })
        }
    }
}

#[async_trait]
impl ProxyAdmin for HttpProxyAdmin {
    async fn add_route(&self, route: &RouteSpec) -> Result<(), ProxyError> {
        let resp = self.http.put(self.url(&format!("/routes/{}", route.route_id))).json(route).send().await?;
        Self::check(resp).await?;
        Ok(())
    }

    async fn delete_route(&self, route_id: &str) -> Result<(), ProxyError> {
        let resp = self.http.delete(self.url(&format!("/routes/{route_id}"))).send().await?;
        match resp.status().as_u16() {
            404 => Err(ProxyError::RouteNotFound(route_id.to_string())),
            _ => {
                Self::check(resp).await?;
                Ok(())
            }
        }
    }

    async fn provision_tls(&self, host: &str) -> Result<(), ProxyError> {
        #[derive(Serialize)]
        struct Body<'a> {
            host: &'a str,
        }
        let resp = self.http.post(self.url("/tls/subjects")).json(&Body { host }).send().await?;
        Self::check(resp).await?;
        Ok(())
    }

    async fn list_routes(&self) -> Result<Vec<RouteSpec>, ProxyError> {
        let resp = self.http.get(self.url("/routes")).send().await?;
        let resp = Self::check(resp).await?;
        Ok(resp.json().await?)
    }

    async fn setup_port_forwarding(&self, proxy_container_ip: &str) -> Result<(), ProxyError> {
        #[derive(Serialize)]
        struct Body<'a> {
            proxy_container_ip: &'a str,
        }
        let resp = self.http.post(self.url("/port-forwarding")).json(&Body { proxy_container_ip }).send().await?;
        Self::check(resp).await?;
        Ok(())
    }
}
