use std::time::Duration;

use crate::geo_client::GeoLookup;
use crate::shutdown::Shutdown;
use crate::store::{ActiveNode, Store};

/// Upper bound on how long a pending shutdown can go unnoticed during a wait.
pub const CHECKPOINT_TICK: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Running,
    /// Shutdown observed at a checkpoint; no new lookups start.
    Draining,
    Stopped,
}

#[derive(Debug, Clone, Copy)]
pub struct Pacing {
    /// Wait between cycles.
    pub check_interval: Duration,
    /// Wait after each node, to stay polite with the provider.
    pub node_delay: Duration,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub nodes: usize,
    pub recorded: usize,
    pub failed: usize,
    /// Shutdown cut the cycle short before every node was checked.
    pub aborted: bool,
}

pub struct Scheduler<L> {
    store: Store,
    lookup: L,
    shutdown: Shutdown,
    pacing: Pacing,
    state: SchedulerState,
}

impl<L: GeoLookup> Scheduler<L> {
    pub fn new(store: Store, lookup: L, shutdown: Shutdown, pacing: Pacing) -> Self {
        Self {
            store,
            lookup,
            shutdown,
            pacing,
            state: SchedulerState::Running,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// Drives cycles until shutdown, then releases the store. Always ends `Stopped`.
    pub async fn run(mut self) -> SchedulerState {
        tracing::info!(
            check_interval_secs = self.pacing.check_interval.as_secs(),
            node_delay_secs = self.pacing.node_delay.as_secs(),
            "poll scheduler started"
        );

        while self.checkpoint() {
            let report = self.run_cycle().await;
            tracing::info!(
                nodes = report.nodes,
                recorded = report.recorded,
                failed = report.failed,
                aborted = report.aborted,
                "cycle finished"
            );
            if !self.wait(self.pacing.check_interval).await {
                break;
            }
        }

        if let Err(err) = self.store.close().await {
            tracing::warn!(%err, "failed to close store cleanly");
        }
        self.state = SchedulerState::Stopped;
        tracing::info!("poll scheduler stopped");
        self.state
    }

    /// One pass over the active node set. Per-node failures are logged and skipped.
    pub async fn run_cycle(&mut self) -> CycleReport {
        let nodes = self.store.list_active_nodes().await;
        let mut report = CycleReport {
            nodes: nodes.len(),
            ..Default::default()
        };

        if nodes.is_empty() {
            tracing::info!("no active nodes to check");
            return report;
        }

        for (i, node) in nodes.iter().enumerate() {
            if !self.checkpoint() {
                report.aborted = true;
                tracing::info!(skipped = nodes.len() - i, "cycle aborted by shutdown");
                break;
            }

            if self.check_node(node).await {
                report.recorded += 1;
            } else {
                report.failed += 1;
            }

            if i + 1 == nodes.len() {
                break;
            }
            // The next checkpoint records the abort.
            if !self.wait(self.pacing.node_delay).await {
                continue;
            }
        }

        report
    }

    async fn check_node(&self, node: &ActiveNode) -> bool {
        let geo = match self.lookup.lookup(&node.ip).await {
            Ok(geo) => geo,
            Err(err) => {
                tracing::warn!(
                    node_id = node.id,
                    ip = %node.ip,
                    kind = ?err.kind(),
                    %err,
                    "geolocation lookup failed"
                );
                return false;
            }
        };

        let check_time = chrono::Utc::now().into();
        match self.store.record_observation(node.id, &geo, check_time).await {
            Ok(observation_id) => {
                tracing::info!(
                    node_id = node.id,
                    ip = %node.ip,
                    observation_id,
                    country = geo.country.as_deref().unwrap_or("-"),
                    city = geo.city.as_deref().unwrap_or("-"),
                    isp = geo.isp.as_deref().unwrap_or("-"),
                    "observation recorded"
                );
                true
            }
            Err(err) => {
                tracing::error!(node_id = node.id, ip = %node.ip, %err, "failed to record observation");
                false
            }
        }
    }

    /// Returns whether the scheduler may keep going, moving to `Draining` on first sight of
    /// a shutdown request.
    fn checkpoint(&mut self) -> bool {
        if self.state == SchedulerState::Running && self.shutdown.is_requested() {
            tracing::info!("shutdown observed; draining");
            self.state = SchedulerState::Draining;
        }
        self.state == SchedulerState::Running
    }

    /// Sleeps for `total` in checkpoint-sized slices. Returns `false` if shutdown cut it short.
    async fn wait(&mut self, total: Duration) -> bool {
        let mut remaining = total;
        loop {
            if !self.checkpoint() {
                return false;
            }
            if remaining.is_zero() {
                return true;
            }
            let slice = remaining.min(CHECKPOINT_TICK);
            tokio::time::sleep(slice).await;
            remaining -= slice;
        }
    }
}
