//! Admission control: hold the next submission until the cluster has room.

use std::time::Duration;

use tokio::time::sleep;
use tracing::debug;

use crate::cluster::ClusterClient;
use crate::error::Result;
use crate::reconciler::{PhaseCounters, Reconciler};

/// Capacity thresholds checked before every submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapacityLimits {
    pub max_pending: usize,
    /// Bound on running plus pending jobs.
    pub max_running: usize,
}

impl CapacityLimits {
    pub fn admits(&self, counters: &PhaseCounters) -> bool {
        let pending = counters.pending();
        let running = counters.running();
        pending <= self.max_pending && running + pending <= self.max_running
    }
}

pub struct AdmissionController {
    limits: CapacityLimits,
    poll_interval: Duration,
}

impl AdmissionController {
    pub fn new(limits: CapacityLimits, poll_interval: Duration) -> Self {
        Self {
            limits,
            poll_interval,
        }
    }

    #[cfg(test)]
    pub fn limits(&self) -> CapacityLimits {
        self.limits
    }

    /// Block until the reconciler's counters fit within the limits, re-polling
    /// every interval. There is no timeout. Returns the number of extra polls.
    pub async fn wait_for_capacity<C: ClusterClient>(
        &self,
        reconciler: &mut Reconciler,
        client: &C,
    ) -> Result<u32> {
        let mut polls = 0;
        while !self.limits.admits(reconciler.counters()) {
            debug!(
                pending = reconciler.counters().pending(),
                running = reconciler.counters().running(),
                "at capacity, waiting"
            );
            sleep(self.poll_interval).await;
            reconciler.poll(client).await?;
            polls += 1;
        }
        Ok(polls)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::fake::FakeCluster;
    use crate::state_machine::Phase;

    fn limits(max_pending: usize, max_running: usize) -> CapacityLimits {
        CapacityLimits {
            max_pending,
            max_running,
        }
    }

    #[test]
    fn admits_checks_both_thresholds() {
        let counters = PhaseCounters::from_phases(&[Phase::Pending, Phase::Running, Phase::Running]);

        assert!(limits(1, 3).admits(&counters));
        assert!(!limits(0, 3).admits(&counters));
        assert!(!limits(1, 2).admits(&counters));
        // Terminal and terminating jobs do not use capacity.
        let counters = PhaseCounters::from_phases(&[Phase::Succeeded, Phase::Terminating]);
        assert!(limits(0, 0).admits(&counters));
    }

    #[tokio::test]
    async fn returns_immediately_with_room() {
        let client = FakeCluster::instant_success();
        let mut reconciler = Reconciler::new(None);
        reconciler.poll(&client).await.unwrap();

        let controller = AdmissionController::new(limits(3, 10), Duration::ZERO);
        assert_eq!(
            controller.wait_for_capacity(&mut reconciler, &client).await.unwrap(),
            0
        );
        assert_eq!(client.list_calls(), 1);
    }

    #[tokio::test]
    async fn waits_until_pending_drains() {
        let client = FakeCluster::instant_success().with_pod(
            "busy",
            &[Phase::Pending, Phase::Pending, Phase::Running, Phase::Succeeded],
        );
        let mut reconciler = Reconciler::new(None);
        reconciler.poll(&client).await.unwrap();

        // No pending allowed, one running allowed.
        let controller = AdmissionController::new(limits(0, 1), Duration::ZERO);
        let polls = controller.wait_for_capacity(&mut reconciler, &client).await.unwrap();

        assert_eq!(polls, 2);
        assert!(controller.limits().admits(reconciler.counters()));
        assert_eq!(reconciler.counters().running(), 1);
    }

    #[tokio::test]
    async fn poll_failure_while_waiting_propagates() {
        let client = FakeCluster::instant_success().with_pod("busy", &[Phase::Pending]);
        let mut reconciler = Reconciler::new(None);
        reconciler.poll(&client).await.unwrap();
        client.fail_listing();

        let controller = AdmissionController::new(limits(0, 0), Duration::ZERO);
        assert!(controller.wait_for_capacity(&mut reconciler, &client).await.is_err());
    }
}
