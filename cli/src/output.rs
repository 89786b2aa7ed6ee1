//! Human-readable and JSON rendering of convergence results.

use secdomain_core::convergence::{ConvergeOutcome, StepStatus};
use secdomain_core::types::DesiredAction;


/// One-line summary followed by one line per step.
pub fn render_outcome(outcome: &ConvergeOutcome) -> String {
    let verb = match (outcome.action, outcome.changed, outcome.why_run) {
        (_, _, true) if outcome.steps.iter().any(|s| s.status == StepStatus::WouldApply) => {
            "would change"
        }
        (DesiredAction::Create, true, _) => "created",
        (DesiredAction::Delete, true, _) => "deleted",
        (_, false, _) => "unchanged",
    };
    let mut out = format!("{}: {}", outcome.resource, verb);
    if let Some(reason) = &outcome.reason {
        out.push_str(&format!(" ({})", reason));
    }
    for step in &outcome.steps {
        out.push_str(&format!(
            "\n  {:<12} {}\n               {}",
            status_label(step.status),
            step.description,
            step.operation
        ));
    }
    out
}


fn status_label(status: StepStatus) -> &'static str {
    match status {
        StepStatus::Applied => "applied",
        StepStatus::WouldApply => "would apply",
        StepStatus::SkippedRace => "skipped",
    }
}


pub fn render_json<T: serde::Serialize>(value: &T) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}
