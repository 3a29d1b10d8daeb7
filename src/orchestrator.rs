use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::admission::{AdmissionController, CapacityLimits};
use crate::cluster::ClusterClient;
use crate::config::Settings;
use crate::error::{QupodsError, Result};
use crate::items::Item;
use crate::reconciler::Reconciler;
use crate::state_machine::{ItemFailure, RunEvent, RunState, RunSummary, StateMachine};
use crate::template::TemplateRenderer;
use crate::ui::RunProgress;

/// Knobs for one run, taken from the resolved [`Settings`].
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub poll: Duration,
    pub pace: Duration,
    pub limits: CapacityLimits,
    pub wait_for_completion: bool,
    pub print_specs: bool,
    pub progress: bool,
}

impl From<&Settings> for RunOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            poll: settings.poll,
            pace: settings.pace,
            limits: settings.limits,
            wait_for_completion: settings.wait_for_completion,
            print_specs: settings.print_specs,
            progress: settings.progress,
        }
    }
}

/// Submits one job per item, throttled by admission control, then drains.
pub struct Orchestrator<C: ClusterClient> {
    client: C,
    renderer: TemplateRenderer,
    reconciler: Reconciler,
    admission: AdmissionController,
    machine: StateMachine,
    options: RunOptions,
}

impl<C: ClusterClient> Orchestrator<C> {
    pub fn new(
        client: C,
        renderer: TemplateRenderer,
        reconciler: Reconciler,
        options: RunOptions,
    ) -> Self {
        Self {
            client,
            renderer,
            reconciler,
            admission: AdmissionController::new(options.limits, options.poll),
            machine: StateMachine::new(options.wait_for_completion),
            options,
        }
    }

    #[cfg(test)]
    pub fn client(&self) -> &C {
        &self.client
    }

    #[cfg(test)]
    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    /// Run every item in order and return the summary.
    ///
    /// Item-scoped failures are recorded and skipped over; any other error
    /// aborts the run.
    pub async fn run(&mut self, items: &[Item]) -> Result<RunSummary> {
        let total = items.len();
        let mut summary = RunSummary::start(total);
        let progress = RunProgress::new(total, self.options.progress);
        let mut state = RunState::Submitting;

        for item in items {
            match self.submit_item(item, &progress, &mut summary).await {
                Ok(()) => {}
                Err(e) if e.is_item_scoped() => {
                    warn!(index = item.index, "{e}");
                    summary.failures.push(failure(item.index, &e));
                }
                Err(e) => {
                    progress.finish();
                    error!(index = item.index, item = %item.item, "run aborted");
                    return Err(e);
                }
            }
        }

        state = self.machine.next(state, RunEvent::ItemsExhausted);
        debug!(%state, "items exhausted");

        while state == RunState::Draining {
            sleep(self.options.poll).await;
            self.reconciler.poll(&self.client).await?;
            let active = self.reconciler.counters().active();
            progress.waiting(self.reconciler.counters());
            state = self.machine.next(state, RunEvent::Polled { active });
        }

        // Pick up and archive anything that finished since the last cycle.
        self.reconciler.poll(&self.client).await?;
        progress.finish();

        summary.finish(self.reconciler.counters().as_map().clone());
        info!(
            submitted = summary.submitted,
            skipped = summary.skipped,
            failed = summary.failures.len(),
            "run {state}"
        );
        Ok(summary)
    }

    async fn submit_item(
        &mut self,
        item: &Item,
        progress: &RunProgress,
        summary: &mut RunSummary,
    ) -> Result<()> {
        let job = self.renderer.render(item)?;

        self.reconciler.poll(&self.client).await?;
        progress.item(item.index, self.reconciler.counters());

        let phase = self.reconciler.phase_of(&job.name);
        if phase.is_terminal() {
            debug!(job = %job.name, %phase, "already finished, skipping");
            summary.skipped += 1;
            return Ok(());
        }

        self.admission
            .wait_for_capacity(&mut self.reconciler, &self.client)
            .await?;

        if self.options.print_specs {
            info!("{}", job.manifest);
        }

        let applied = self.client.apply(&job.manifest).await;
        // Rejected submissions are paced too.
        sleep(self.options.pace).await;
        applied.map_err(|source| QupodsError::Submit {
            index: item.index,
            name: job.name.clone(),
            source,
        })?;
        debug!(job = %job.name, "submitted");
        summary.submitted += 1;
        Ok(())
    }
}

fn failure(index: usize, e: &QupodsError) -> ItemFailure {
    let name = match e {
        QupodsError::Submit { name, .. } => name.clone(),
        _ => String::new(),
    };
    ItemFailure {
        index,
        name,
        reason: e.to_string(),
    }
}
