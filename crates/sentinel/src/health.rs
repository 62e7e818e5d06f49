// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Containarium Contributors

//! TCP health prober (spec.md §4.9): polls the backend on a fixed
//! interval and flips the mode after `unhealthy-threshold` /
//! `healthy-threshold` consecutive results in the same direction.

use std::sync::Arc;
use std::time::Duration;

use containarium_core::Clock;
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::mode::{Mode, ModeController};

pub struct HealthProber<C: Clock> {
    backend_addr: String,
    interval: Duration,
    connect_timeout: Duration,
    unhealthy_threshold: u32,
    healthy_threshold: u32,
    mode: Arc<ModeController<C>>,
    clock: C,
}

impl<C: Clock + 'static> HealthProber<C> {
    pub fn new(backend_addr: String, interval: Duration, unhealthy_threshold: u32, healthy_threshold: u32, mode: Arc<ModeController<C>>, clock: C) -> Self {
        Self { backend_addr, interval, connect_timeout: Duration::from_secs(3), unhealthy_threshold, healthy_threshold, mode, clock }
    }

    async fn probe_once(&self) -> bool {
        matches!(tokio::time::timeout(self.connect_timeout, TcpStream::connect(&self.backend_addr)).await, Ok(Ok(_)))
    }

    pub async fn run(self, cancel: CancellationToken) {
        let mut consecutive_failures = 0u32;
        let mut consecutive_successes = 0u32;
        let mut ticker = tokio::time::interval(self.interval);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }
            let healthy = self.probe_once().await;
            debug!(addr = %self.backend_addr, healthy, "health check result");
            if healthy {
                consecutive_successes += 1;
                consecutive_failures = 0;
            } else {
                consecutive_failures += 1;
                consecutive_successes = 0;
            }

            let event_ms = self.clock.epoch_ms();
            match self.mode.current() {
                Mode::Proxy if consecutive_failures >= self.unhealthy_threshold => {
                    self.mode.transition(Mode::Maintenance, event_ms, "health check failures reached unhealthy-threshold");
                }
                Mode::Maintenance if consecutive_successes >= self.healthy_threshold => {
                    self.mode.transition(Mode::Proxy, event_ms, "health check successes reached healthy-threshold");
                }
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use containarium_core::FakeClock;

    use super::*;

    #[tokio::test]
    async fn unreachable_address_counts_as_unhealthy() {
        let clock = FakeClock::new();
        let mode = ModeController::new(clock.clone(), Mode::Proxy);
        let prober = HealthProber::new("127.0.0.1:1".to_string(), Duration::from_millis(10), 2, 2, mode.clone(), clock);
        assert!(!prober.probe_once().await);
    }
}
