//! Scripted in-memory cluster for tests.
//!
//! Each pod walks through a list of phases, one step per `list_pods` call:
//! a call reports the current phases and then advances every pod.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use super::{ClusterClient, ClusterError, PodPhase};
use crate::state_machine::Phase;
use crate::template;

#[derive(Debug)]
struct FakePod {
    phases: Vec<Phase>,
    step: usize,
}

impl FakePod {
    fn current(&self) -> Phase {
        self.phases[self.step.min(self.phases.len() - 1)]
    }
}

#[derive(Debug, Default)]
struct FakeState {
    pods: BTreeMap<String, FakePod>,
    lifecycle: Vec<Phase>,
    last_report: BTreeMap<String, Phase>,
    applied: Vec<String>,
    /// (pending, running) as last reported, captured at each apply.
    reported_at_apply: Vec<(usize, usize)>,
    deleted: Vec<String>,
    log_fetches: Vec<String>,
    list_calls: usize,
    reject: BTreeSet<String>,
    delete_failures: u32,
    fail_list: bool,
}

#[derive(Debug)]
pub struct FakeCluster {
    state: Mutex<FakeState>,
}

impl FakeCluster {
    /// Newly applied pods follow `lifecycle`.
    pub fn new(lifecycle: &[Phase]) -> Self {
        assert!(!lifecycle.is_empty());
        Self {
            state: Mutex::new(FakeState {
                lifecycle: lifecycle.to_vec(),
                ..Default::default()
            }),
        }
    }

    /// Pods go straight to `Succeeded`.
    pub fn instant_success() -> Self {
        Self::new(&[Phase::Succeeded])
    }

    /// Add a pod that already exists in the cluster.
    pub fn with_pod(self, name: &str, phases: &[Phase]) -> Self {
        self.state.lock().unwrap().pods.insert(
            name.to_string(),
            FakePod {
                phases: phases.to_vec(),
                step: 0,
            },
        );
        self
    }

    /// Reject submissions of `name`.
    pub fn rejecting(self, name: &str) -> Self {
        self.state.lock().unwrap().reject.insert(name.to_string());
        self
    }

    /// Fail the next `count` delete calls.
    pub fn failing_deletes(self, count: u32) -> Self {
        self.state.lock().unwrap().delete_failures = count;
        self
    }

    pub fn fail_listing(&self) {
        self.state.lock().unwrap().fail_list = true;
    }

    pub fn applied(&self) -> Vec<String> {
        self.state.lock().unwrap().applied.clone()
    }

    pub fn reported_at_apply(&self) -> Vec<(usize, usize)> {
        self.state.lock().unwrap().reported_at_apply.clone()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.state.lock().unwrap().deleted.clone()
    }

    pub fn log_fetches(&self) -> Vec<String> {
        self.state.lock().unwrap().log_fetches.clone()
    }

    pub fn list_calls(&self) -> usize {
        self.state.lock().unwrap().list_calls
    }

    pub fn live_names(&self) -> Vec<String> {
        self.state.lock().unwrap().pods.keys().cloned().collect()
    }
}

impl ClusterClient for FakeCluster {
    async fn list_pods(&self) -> Result<Vec<PodPhase>, ClusterError> {
        let mut state = self.state.lock().unwrap();
        state.list_calls += 1;
        if state.fail_list {
            return Err(ClusterError::Decode("scripted list failure".into()));
        }
        let report: Vec<PodPhase> = state
            .pods
            .iter()
            .map(|(name, pod)| PodPhase::new(name.clone(), pod.current()))
            .collect();
        for pod in state.pods.values_mut() {
            pod.step += 1;
        }
        state.last_report = report.iter().map(|p| (p.name.clone(), p.phase)).collect();
        Ok(report)
    }

    async fn apply(&self, manifest: &str) -> Result<(), ClusterError> {
        let name =
            template::job_name(0, manifest).map_err(|e| ClusterError::Decode(e.to_string()))?;
        let mut state = self.state.lock().unwrap();
        if state.reject.contains(&name) {
            return Err(ClusterError::CommandFailed {
                command: "apply -f -".into(),
                status: "exit status: 1".into(),
                stderr: format!("admission webhook denied {name}"),
            });
        }
        let pending = state
            .last_report
            .values()
            .filter(|p| **p == Phase::Pending)
            .count();
        let running = state
            .last_report
            .values()
            .filter(|p| **p == Phase::Running)
            .count();
        state.reported_at_apply.push((pending, running));
        state.applied.push(name.clone());
        let phases = state.lifecycle.clone();
        state
            .pods
            .entry(name)
            .or_insert(FakePod { phases, step: 0 });
        Ok(())
    }

    async fn logs(&self, name: &str) -> Result<Vec<u8>, ClusterError> {
        let mut state = self.state.lock().unwrap();
        state.log_fetches.push(name.to_string());
        if !state.pods.contains_key(name) {
            return Err(ClusterError::CommandFailed {
                command: format!("logs pod/{name}"),
                status: "exit status: 1".into(),
                stderr: "not found".into(),
            });
        }
        Ok(format!("output of {name}\n").into_bytes())
    }

    async fn delete(&self, name: &str) -> Result<(), ClusterError> {
        let mut state = self.state.lock().unwrap();
        if state.delete_failures > 0 {
            state.delete_failures -= 1;
            return Err(ClusterError::CommandFailed {
                command: format!("delete pod/{name}"),
                status: "exit status: 1".into(),
                stderr: "etcdserver: request timed out".into(),
            });
        }
        state.pods.remove(name);
        state.deleted.push(name.to_string());
        Ok(())
    }
}
