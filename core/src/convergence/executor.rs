//! Convergence executor: probes, plans and runs guarded steps.

use serde::Serialize;
use tracing::{info, warn};

use crate::admin::{AdminClient, AdminOperation};
use crate::convergence::planner::{plan, PlannedStep, StepKind};
use crate::error::{ConvergeError, Result};
use crate::infrastructure::runner::CommandRunner;
use crate::probe::ExistenceProber;
use crate::types::domain::{DesiredAction, ObservedState, SecurityDomainSpec};

/// What happened to one planned step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// The guard held and the operation succeeded.
    Applied,
    /// Why-run mode: the guard held, nothing was executed.
    WouldApply,
    /// The fresh probe disagreed with the guard; the step was skipped.
    SkippedRace,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepReport {
    pub kind: StepKind,
    pub description: String,
    pub operation: AdminOperation,
    pub status: StepStatus,
}

impl StepReport {
    fn new(step: PlannedStep, status: StepStatus) -> Self {
        StepReport {
            kind: step.kind,
            description: step.description,
            operation: step.operation,
            status,
        }
    }
}

/// Outcome of a convergence pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConvergeOutcome {
    pub resource: String,
    pub action: DesiredAction,
    pub observed: ObservedState,
    /// `true` iff at least one step was applied.
    pub changed: bool,
    pub why_run: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub steps: Vec<StepReport>,
}

/// Drives a security domain toward its desired state.
///
/// Existence is probed once to choose the plan and again right before each
/// side-effecting step. A failed step is reported, never retried or rolled
/// back: the next pass re-probes from scratch.
pub struct Converger<R: CommandRunner> {
    client: AdminClient<R>,
    why_run: bool,
}

impl<R: CommandRunner> Converger<R> {
    pub fn new(client: AdminClient<R>) -> Self {
        Converger {
            client,
            why_run: false,
        }
    }

    /// In why-run mode nothing but probes is executed.
    pub fn why_run(mut self, enabled: bool) -> Self {
        self.why_run = enabled;
        self
    }

    pub fn client(&self) -> &AdminClient<R> {
        &self.client
    }

    pub fn prober(&self) -> ExistenceProber<'_, R> {
        ExistenceProber::new(&self.client)
    }

    pub fn converge(&self, spec: &SecurityDomainSpec, action: DesiredAction) -> Result<ConvergeOutcome> {
        spec.validate()?;
        let prober = self.prober();
        let observed = prober.observe(spec.name())?;
        let plan = plan(spec, action, observed);
        if plan.is_noop() {
            info!(resource = %spec, "{}", plan.reason.as_deref().unwrap_or("nothing to do"));
        }

        let mut reports = Vec::with_capacity(plan.steps.len());
        // Why-run never touches the server, so later guards see the state
        // earlier would-apply steps would have produced.
        let mut simulated: Option<bool> = None;

        for step in plan.steps {
            debug_assert!(!step.operation.is_read_only(), "planned steps must mutate");
            let exists = match simulated {
                Some(exists) => exists,
                None => prober.exists(spec.name())?,
            };
            if !step.guard.holds(exists) {
                warn!(
                    resource = %spec,
                    step = %step.description,
                    exists,
                    "state changed since planning, skipping step"
                );
                reports.push(StepReport::new(step, StepStatus::SkippedRace));
                continue;
            }

            if self.why_run {
                info!(resource = %spec, "Would {}", step.description);
                simulated = Some(step.kind.exists_after());
                reports.push(StepReport::new(step, StepStatus::WouldApply));
                continue;
            }

            info!(resource = %spec, operation = %step.operation, "{}", step.description);
            let result = self
                .client
                .execute(&step.operation)
                .map_err(|source| ConvergeError::ExecutionFailure {
                    description: step.description.clone(),
                    source,
                })?;
            if !result.success() {
                warn!(
                    resource = %spec,
                    exit = ?result.exit_code,
                    stderr = %result.stderr.trim(),
                    "{} rejected",
                    step.description
                );
                return Err(ConvergeError::CommandRejected {
                    description: step.description,
                    exit_code: result.exit_code,
                    stderr: result.stderr,
                });
            }
            reports.push(StepReport::new(step, StepStatus::Applied));
        }

        let changed = reports.iter().any(|r| r.status == StepStatus::Applied);
        Ok(ConvergeOutcome {
            resource: spec.to_string(),
            action,
            observed,
            changed,
            why_run: self.why_run,
            reason: plan.reason,
            steps: reports,
        })
    }
}
