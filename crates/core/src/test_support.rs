// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Containarium Contributors

//! Test-only builders for domain types, gated behind `test-support` so
//! downstream crates can depend on `containarium-core` with
//! `features = ["test-support"]` in `[dev-dependencies]` only.

use crate::application::{AppState, Application, ApplicationId};
use crate::container::{Container, ContainerState, ResourceCaps};

crate::builder! {
    pub struct ContainerBuilder => Container {
        into {
            owner: String = "alice",
            name: String = "alice-container",
            image: String = "images:ubuntu/24.04",
        }
        set {
            resources: ResourceCaps = ResourceCaps::new(2, 2_000_000_000, 20_000_000_000),
            state: ContainerState = ContainerState::Running,
            auto_start: bool = true,
            nested_runtime: bool = false,
        }
        option {
            static_address: std::net::Ipv4Addr = None,
        }
        computed {
            authorized_keys: std::collections::BTreeSet<String> = std::collections::BTreeSet::new(),
            labels: std::collections::BTreeMap<String, String> = std::collections::BTreeMap::new(),
        }
    }
}

pub fn running_app(owner: &str, name: &str) -> Application {
    let mut app = Application::new(owner, name, format!("{owner}-{name}"), 3000, 1_000);
    app.transition(AppState::Building, 1_001).unwrap();
    app.transition(AppState::Running, 1_002).unwrap();
    app
}

pub fn app_id() -> ApplicationId {
    ApplicationId::new()
}
