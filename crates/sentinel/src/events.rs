// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Containarium Contributors

//! Cloud preemption event watcher (spec.md §4.9): independent of the
//! health prober's threshold counting, this reacts to a cloud provider's
//! preemption notice with an immediate MAINTENANCE transition, required to
//! land within the ≤10s detection window of the recovery timeline
//! contract.

use std::sync::Arc;
use std::time::Duration;

use containarium_core::Clock;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::mode::{Mode, ModeController};

#[async_trait::async_trait]
pub trait PreemptionSource: Send + Sync {
    async fn is_preempted(&self) -> bool;
}

/// Polls a cloud metadata endpoint (default: GCP's instance preemption
/// flag) for a notice that this instance is about to be reclaimed.
pub struct MetadataPreemptionSource {
    url: String,
    http: reqwest::Client,
}

impl MetadataPreemptionSource {
    pub fn new(url: String) -> Self {
        let http = reqwest::Client::builder().timeout(Duration::from_secs(2)).build().unwrap_or_default();
        Self { url, http }
    }
}

#[async_trait::async_trait]
impl PreemptionSource for MetadataPreemptionSource {
    async fn is_preempted(&self) -> bool {
        let resp = match self.http.get(&self.url).header("Metadata-Flavor", "Google").send().await {
            Ok(resp) => resp,
            Err(_) => return false,
        };
        match resp.text().await {
            Ok(body) => body.trim().eq_ignore_ascii_case("true") || body.trim() == "TERMINATED",
            Err(_) => false,
        }
    }
}

pub struct PreemptionWatcher<C: Clock> {
    source: Arc<dyn PreemptionSource>,
    poll_interval: Duration,
    mode: Arc<ModeController<C>>,
    clock: C,
}

impl<C: Clock + 'static> PreemptionWatcher<C> {
    pub fn new(source: Arc<dyn PreemptionSource>, poll_interval: Duration, mode: Arc<ModeController<C>>, clock: C) -> Self {
        Self { source, poll_interval, mode, clock }
    }

    pub async fn run(self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.poll_interval);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }
            if self.source.is_preempted().await {
                let event_ms = self.clock.epoch_ms();
                warn!("cloud preemption notice received; forcing MAINTENANCE");
                self.mode.transition(Mode::Maintenance, event_ms, "cloud preemption event");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use containarium_core::FakeClock;

    use super::*;

    struct FakeSource(AtomicBool);

    #[async_trait::async_trait]
    impl PreemptionSource for FakeSource {
        async fn is_preempted(&self) -> bool {
            self.0.load(Ordering::SeqCst)
        }
    }

    #[tokio::test]
    async fn preemption_forces_maintenance_immediately() {
        let clock = FakeClock::new();
        clock.set_epoch_ms(42);
        let mode = ModeController::new(clock.clone(), Mode::Proxy);
        let source: Arc<dyn PreemptionSource> = Arc::new(FakeSource(AtomicBool::new(true)));
        let watcher = PreemptionWatcher::new(source, Duration::from_millis(5), mode.clone(), clock);
        let cancel = CancellationToken::new();
        let cancel_inner = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            cancel_inner.cancel();
        });
        watcher.run(cancel).await;
        assert_eq!(mode.current(), Mode::Maintenance);
    }
}
