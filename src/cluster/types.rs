//! Wire types for `get pods -o json`.
//!
//! Only the fields the reconciler needs are modelled; everything else in
//! the pod list is ignored.

use serde::Deserialize;
use tracing::warn;

use crate::state_machine::Phase;

/// One live job as reported by the cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodPhase {
    pub name: String,
    pub phase: Phase,
}

impl PodPhase {
    pub fn new(name: impl Into<String>, phase: Phase) -> Self {
        Self {
            name: name.into(),
            phase,
        }
    }
}

/// Top-level `PodList` document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PodList {
    #[serde(default)]
    pub items: Vec<Pod>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Pod {
    #[serde(default)]
    pub metadata: PodMetadata,
    #[serde(default)]
    pub status: PodStatus,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodMetadata {
    #[serde(default)]
    pub name: String,
    /// Set once deletion has been requested.
    #[serde(default)]
    pub deletion_timestamp: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PodStatus {
    #[serde(default)]
    pub phase: Option<String>,
}

impl Pod {
    /// Resolve the reported phase. A pod being deleted that has not finished
    /// is `Terminating`; phases outside the known set collapse to `None`.
    pub fn phase(&self) -> Phase {
        let reported = match self.status.phase.as_deref() {
            None | Some("") => Phase::None,
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                warn!(pod = %self.metadata.name, phase = raw, "unrecognised pod phase");
                Phase::None
            }),
        };
        if self.metadata.deletion_timestamp.is_some() && !reported.is_terminal() {
            Phase::Terminating
        } else {
            reported
        }
    }
}

impl PodList {
    /// Named pods with their resolved phases, in report order.
    pub fn phases(&self) -> Vec<PodPhase> {
        self.items
            .iter()
            .filter(|pod| !pod.metadata.name.is_empty())
            .map(|pod| PodPhase::new(pod.metadata.name.clone(), pod.phase()))
            .collect()
    }
}
