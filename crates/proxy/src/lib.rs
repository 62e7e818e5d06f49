// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Containarium Contributors

//! containarium-proxy: admin client for the external reverse-proxy
//! process (spec.md §4.7).

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod client;
pub mod controller;
pub mod error;

pub use client::{HttpProxyAdmin, ProxyAdmin, RouteSpec};
pub use controller::ProxyController;
pub use error::ProxyError;

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use containarium_core::{Route, RouteId};
    use parking_lot::Mutex;

    use super::*;

    #[derive(Default)]
    struct FakeProxyAdmin {
        routes: Mutex<Vec<RouteSpec>>,
        add_calls: AtomicUsize,
    }

    #[async_trait]
    impl ProxyAdmin for FakeProxyAdmin {
        async fn add_route(&self, route: &RouteSpec) -> Result<(), ProxyError> {
            self.add_calls.fetch_add(1, Ordering::SeqCst);
            let mut routes = self.routes.lock();
            routes.retain(|r| r.route_id != route.route_id);
            routes.push(route.clone());
            Ok(())
        }

        async fn delete_route(&self, route_id: &str) -> Result<(), ProxyError> {
            let mut routes = self.routes.lock();
            let before = routes.len();
            routes.retain(|r| r.route_id != route_id);
            if routes.len() == before {
                return Err(ProxyError::RouteNotFound(route_id.to_string()));
            }
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

    fn route(owner: &str, app: &str, port: u16) -> Route {
        let mut r = Route::new(RouteId::for_app(owner, app), format!("{owner}-{app}.example.com"), "10.0.0.5", port);
        r.app_id = None;
        r
    }

    #[tokio::test]
    async fn add_route_is_idempotent_when_unchanged() {
        let admin = Arc::new(FakeProxyAdmin::default());
        let controller = ProxyController::new(admin.clone());
        let r = route("alice", "blog", 3000);

        controller.add_route(&r).await.unwrap();
        controller.add_route(&r).await.unwrap();

        // Second call sees no drift (route already matches), so it should not re-PUT.
        assert_eq!(admin.add_calls.load(Ordering::SeqCst), 1);
        assert_eq!(controller.list_routes().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn add_route_repairs_out_of_band_drift() {
        let admin = Arc::new(FakeProxyAdmin::default());
        let controller = ProxyController::new(admin.clone());
        let r = route("alice", "blog", 3000);
        controller.add_route(&r).await.unwrap();

        {
            let mut routes = admin.routes.lock();
            routes[0].upstream = "10.0.0.5:9999".to_string();
        }

        controller.add_route(&r).await.unwrap();
        assert_eq!(admin.add_calls.load(Ordering::SeqCst), 2);
        let routes = controller.list_routes().await.unwrap();
        assert_eq!(routes[0].upstream, "10.0.0.5:3000");
    }

    #[tokio::test]
    async fn delete_route_is_idempotent() {
        let admin = Arc::new(FakeProxyAdmin::default());
        let controller = ProxyController::new(admin);
        controller.delete_route("alice-blog").await.unwrap();
    }
}
