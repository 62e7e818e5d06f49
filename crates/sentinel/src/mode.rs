// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Containarium Contributors

//! The PROXY/MAINTENANCE mode machine (spec.md §4.9, §5). Transitions are
//! serialized by a single mutex; the health prober and the preemption event
//! watcher both race for it, and last-writer-wins is decided by the
//! timestamp of the observation that triggered the transition, not by
//! acquisition order — a stale health-check result arriving late must never
//! clobber a preemption event that landed first.

use std::fmt;
use std::sync::Arc;

use containarium_core::Clock;
use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Mode {
    Proxy,
    Maintenance,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Proxy => write!(f, "PROXY"),
            Mode::Maintenance => write!(f, "MAINTENANCE"),
        }
    }
}

struct State {
    mode: Mode,
    last_event_ms: u64,
}

/// Shared mode state plus a `watch` channel other tasks (NAT programmer,
/// maintenance listeners, cert re-sync) subscribe to react on transition.
pub struct ModeController<C: Clock> {
    state: Mutex<State>,
    tx: watch::Sender<Mode>,
    clock: C,
}

impl<C: Clock> ModeController<C> {
    pub fn new(clock: C, initial: Mode) -> Arc<Self> {
        let (tx, _rx) = watch::channel(initial);
        Arc::new(Self { state: Mutex::new(State { mode: initial, last_event_ms: clock.epoch_ms() }), tx, clock })
    }

    pub fn current(&self) -> Mode {
        self.state.lock().mode
    }

    pub fn subscribe(&self) -> watch::Receiver<Mode> {
        self.tx.subscribe()
    }

    /// Attempt a transition observed at `event_ms`. Returns `true` if the
    /// mode actually changed. A transition whose observation predates the
    /// last applied one is dropped as stale.
    pub fn transition(&self, desired: Mode, event_ms: u64, reason: &str) -> bool {
        let mut state = self.state.lock();
        if event_ms < state.last_event_ms {
            debug!(desired = %desired, event_ms, last_event_ms = state.last_event_ms, "stale mode transition ignored");
            return false;
        }
        state.last_event_ms = event_ms;
        if state.mode == desired {
            return false;
        }
        state.mode = desired;
        info!(mode = %desired, reason, "sentinel mode transition");
        let _ = self.tx.send(desired);
        true
    }

    /// Convenience wrapper that stamps the transition with the controller's
    /// own clock, for callers that don't carry an external event timestamp.
    pub fn transition_now(&self, desired: Mode, reason: &str) -> bool {
        self.transition(desired, self.clock.epoch_ms(), reason)
    }
}

#[cfg(test)]
mod tests {
    use containarium_core::FakeClock;

    use super::*;

    #[test]
    fn transitions_on_change() {
        let clock = FakeClock::new();
        clock.set_epoch_ms(1000);
        let ctrl = ModeController::new(clock, Mode::Proxy);
        assert_eq!(ctrl.current(), Mode::Proxy);
        assert!(ctrl.transition(Mode::Maintenance, 2000, "test"));
        assert_eq!(ctrl.current(), Mode::Maintenance);
    }

    #[test]
    fn stale_event_is_ignored() {
        let clock = FakeClock::new();
        clock.set_epoch_ms(5000);
        let ctrl = ModeController::new(clock, Mode::Proxy);
        assert!(ctrl.transition(Mode::Maintenance, 6000, "preemption"));
        assert!(!ctrl.transition(Mode::Proxy, 5500, "late health recovery"));
        assert_eq!(ctrl.current(), Mode::Maintenance);
    }

    #[test]
    fn same_mode_is_not_a_transition() {
        let clock = FakeClock::new();
        clock.set_epoch_ms(1000);
        let ctrl = ModeController::new(clock, Mode::Proxy);
        assert!(!ctrl.transition(Mode::Proxy, 2000, "already healthy"));
    }
}
