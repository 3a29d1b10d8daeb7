//! Status reconciliation.
//!
//! Each cycle merges the archive's durable terminal records with the
//! cluster's live report, detects phase changes since the previous cycle,
//! archives jobs that just finished, and recounts jobs per phase. Tables
//! are rebuilt from scratch every cycle so stale entries never linger.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use tracing::debug;

use crate::archive::LogArchiver;
use crate::cluster::ClusterClient;
use crate::error::Result;
use crate::state_machine::{Phase, PhaseTransition};

/// Job name → phase, as of the last cycle.
pub type JobStatusTable = HashMap<String, Phase>;

/// Number of live jobs in each phase. Always covers all six phases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseCounters {
    counts: BTreeMap<Phase, usize>,
}

impl Default for PhaseCounters {
    fn default() -> Self {
        Self {
            counts: Phase::ALL.into_iter().map(|p| (p, 0)).collect(),
        }
    }
}

impl PhaseCounters {
    pub fn from_phases<'a>(phases: impl IntoIterator<Item = &'a Phase>) -> Self {
        let mut counters = Self::default();
        for phase in phases {
            *counters.counts.entry(*phase).or_insert(0) += 1;
        }
        counters
    }

    pub fn get(&self, phase: Phase) -> usize {
        self.counts.get(&phase).copied().unwrap_or(0)
    }

    pub fn pending(&self) -> usize {
        self.get(Phase::Pending)
    }

    pub fn running(&self) -> usize {
        self.get(Phase::Running)
    }

    /// Jobs still occupying the cluster: pending, running or terminating.
    pub fn active(&self) -> usize {
        Phase::ALL
            .into_iter()
            .filter(|p| p.is_active())
            .map(|p| self.get(p))
            .sum()
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    pub fn as_map(&self) -> &BTreeMap<Phase, usize> {
        &self.counts
    }
}

impl fmt::Display for PhaseCounters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Pending {:<3} Running {:<6} Succeeded {:<6} Failed {:<6}",
            self.get(Phase::Pending),
            self.get(Phase::Running),
            self.get(Phase::Succeeded),
            self.get(Phase::Failed),
        )
    }
}

/// Reconciler state, owned by the run and threaded through admission and the main loop.
#[derive(Debug, Default)]
pub struct Reconciler {
    archiver: Option<LogArchiver>,
    table: JobStatusTable,
    archived: BTreeMap<String, Phase>,
    /// Names this process has seen in a live report.
    observed: HashSet<String>,
    counters: PhaseCounters,
    cycles: u64,
}

impl Reconciler {
    /// Without an archiver, nothing is seeded from disk and finished jobs stay in the cluster.
    pub fn new(archiver: Option<LogArchiver>) -> Self {
        Self {
            archiver,
            ..Default::default()
        }
    }

    pub fn counters(&self) -> &PhaseCounters {
        &self.counters
    }

    #[cfg(test)]
    pub fn table(&self) -> &JobStatusTable {
        &self.table
    }

    #[cfg(test)]
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Best known phase of `name`. An archive record beats any live report.
    pub fn phase_of(&self, name: &str) -> Phase {
        self.archived
            .get(name)
            .or_else(|| self.table.get(name))
            .copied()
            .unwrap_or_default()
    }

    /// Run one reconciliation cycle and return the phase changes it observed.
    pub async fn poll<C: ClusterClient>(&mut self, client: &C) -> Result<Vec<PhaseTransition>> {
        let archived = match &self.archiver {
            Some(archiver) => archiver.scan().await?,
            None => BTreeMap::new(),
        };
        let live = client.list_pods().await?;

        let mut table: JobStatusTable = archived
            .iter()
            .map(|(name, phase)| (name.clone(), *phase))
            .collect();
        let mut live_phases: HashMap<String, Phase> = HashMap::with_capacity(live.len());
        let mut transitions = Vec::new();

        for pod in live {
            let first_sighting = self.observed.insert(pod.name.clone());
            // Compare with the last observation; a name this process has
            // never seen falls back to its archive record.
            let from = self
                .table
                .get(&pod.name)
                .or_else(|| archived.get(&pod.name))
                .copied()
                .unwrap_or_default();
            let to = pod.phase;

            // Archived by an earlier process that stopped before deleting it.
            let leftover = first_sighting && to.is_terminal() && archived.contains_key(&pod.name);

            let transition = PhaseTransition {
                name: pod.name.clone(),
                from,
                to,
            };
            if let Some(archiver) = &self.archiver {
                if leftover {
                    archiver.remove(client, &pod.name).await?;
                } else if transition.enters_terminal() {
                    archiver.archive(client, &pod.name, to).await?;
                }
            }
            if from != to {
                debug!(job = %pod.name, %from, %to, "phase change");
                transitions.push(transition);
            }

            table.insert(pod.name.clone(), to);
            live_phases.insert(pod.name, to);
        }

        self.counters = PhaseCounters::from_phases(live_phases.values());
        self.table = table;
        self.archived = archived;
        self.cycles += 1;
        debug!(cycle = self.cycles, live = self.counters.total(), "poll complete");
        Ok(transitions)
    }
}
