// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Containarium Contributors

//! Application domain type and its state machine (spec.md §3, §4.6, §9).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Globally-unique application id (`app-<nanoid>`).
    pub struct ApplicationId("app-");
}

/// Application lifecycle state (spec.md §3, §9).
///
/// `Unspecified` exists because the design notes call it out explicitly:
/// "the source defines 'Unspecified' in addition to the app states
/// listed; implementers should treat it as invalid on input and an I/O
/// error on output." It is never a valid target of [`AppState::can_transition_to`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AppState {
    Unspecified,
    Uploading,
    Building,
    Running,
    Stopped,
    Failed,
    Restarting,
    Deleted,
}

crate::simple_display! {
    AppState {
        Unspecified => "unspecified",
        Uploading => "uploading",
        Building => "building",
        Running => "running",
        Stopped => "stopped",
        Failed => "failed",
        Restarting => "restarting",
        Deleted => "deleted",
    }
}

impl AppState {
    /// Parse a persisted state string, rejecting `"unspecified"` and anything
    /// unrecognized (spec.md §9 design note).
    pub fn parse(s: &str) -> Result<Self, crate::Error> {
        match s {
            "uploading" => Ok(AppState::Uploading),
            "building" => Ok(AppState::Building),
            "running" => Ok(AppState::Running),
            "stopped" => Ok(AppState::Stopped),
            "failed" => Ok(AppState::Failed),
            "restarting" => Ok(AppState::Restarting),
            "deleted" => Ok(AppState::Deleted),
            other => Err(crate::Error::invalid_argument(format!("invalid application state: {other:?}"))),
        }
    }

    /// The state machine named in spec.md §4.6 and §9: implementations must
    /// reject transitions not listed here.
    pub fn can_transition_to(self, next: AppState) -> bool {
        use AppState::*;
        if next == Unspecified {
            return false;
        }
        match (self, next) {
            (Uploading, Building) => true,
            (Uploading, Failed) => true,
            (Building, Running) => true,
            (Building, Failed) => true,
            (Running, Stopped) => true,
            (Running, Restarting) => true,
            (Running, Building) => true, // redeploy
            (Running, Failed) => true,   // route-programming failure after build
            (Stopped, Running) => true,
            (Restarting, Running) => true,
            (Restarting, Failed) => true,
            // Delete is reachable from any non-deleted state.
            (from, Deleted) => from != Deleted,
            _ => false,
        }
    }
}

/// A deployed application (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    pub owner: String,
    pub name: String,
    pub sub_domain: String,
    pub port: u16,
    pub language_fingerprint: Option<String>,
    pub state: AppState,
    pub env: BTreeMap<String, String>,
    pub restart_count: u32,
    pub created_at_ms: u64,
    pub updated_at_ms: u64,
    pub deployed_at_ms: Option<u64>,
    pub container_name: String,
    pub image_ref: Option<String>,
}

impl Application {
    pub fn new(owner: impl Into<String>, name: impl Into<String>, sub_domain: impl Into<String>, port: u16, now_ms: u64) -> Self {
        let owner = owner.into();
        let container_name = crate::names::container_name(&owner);
        Self {
            id: ApplicationId::new(),
            owner,
            name: name.into(),
            sub_domain: sub_domain.into(),
            port,
            language_fingerprint: None,
            state: AppState::Uploading,
            env: BTreeMap::new(),
            restart_count: 0,
            created_at_ms: now_ms,
            updated_at_ms: now_ms,
            deployed_at_ms: None,
            container_name,
            image_ref: None,
        }
    }

    /// Apply a validated transition, bumping `updated_at_ms` (and
    /// `deployed_at_ms` when entering `Running`). Callers must check
    /// [`AppState::can_transition_to`] first — this only asserts it.
    pub fn transition(&mut self, next: AppState, now_ms: u64) -> Result<(), crate::Error> {
        if !self.state.can_transition_to(next) {
            return Err(crate::Error::failed_precondition(format!(
                "application {} cannot transition {} -> {}",
                self.name, self.state, next
            )));
        }
        self.state = next;
        self.updated_at_ms = now_ms;
        if next == AppState::Running {
            self.deployed_at_ms = Some(now_ms);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_transitions_are_allowed() {
        let mut app = Application::new("alice", "myapp", "alice-myapp", 3000, 1000);
        app.transition(AppState::Building, 1001).unwrap();
        app.transition(AppState::Running, 1002).unwrap();
        assert_eq!(app.state, AppState::Running);
        assert_eq!(app.deployed_at_ms, Some(1002));
    }

    #[test]
    fn deploy_while_building_is_rejected_by_caller_precondition() {
        // The state machine itself models Building -> Building as illegal;
        // the manager layer (C6) is what actually returns Conflict for a
        // concurrent deploy attempt (spec.md §8 boundary behavior).
        assert!(!AppState::Building.can_transition_to(AppState::Building));
    }

    #[test]
    fn unspecified_is_never_a_valid_target() {
        assert!(!AppState::Uploading.can_transition_to(AppState::Unspecified));
    }

    #[test]
    fn delete_reachable_from_any_non_deleted_state() {
        for s in [AppState::Uploading, AppState::Building, AppState::Running, AppState::Stopped, AppState::Failed, AppState::Restarting] {
            assert!(s.can_transition_to(AppState::Deleted));
        }
        assert!(!AppState::Deleted.can_transition_to(AppState::Deleted));
    }

    #[test]
    fn parse_rejects_unspecified_and_garbage() {
        assert!(AppState::parse("unspecified").is_err());
        assert!(AppState::parse("bogus").is_err());
        assert_eq!(AppState::parse("running").unwrap(), AppState::Running);
    }
}
