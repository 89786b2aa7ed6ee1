//! Action planner: decides which guarded steps a pass needs.
//!
//! The planner is stateless: it takes the desired action and the state
//! observed at the start of the pass and returns the steps needed to converge
//! them. It never executes anything itself.

use serde::Serialize;

use crate::admin::builder::{build_add_domain, build_add_login_modules, build_delete};
use crate::admin::AdminOperation;
use crate::types::domain::{DesiredAction, ObservedState, SecurityDomainSpec};

/// Existence state a fresh probe must report right before a step runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Guard {
    /// `not_if exists`
    Absent,
    /// `only_if exists`
    Present,
}

impl Guard {
    pub fn holds(self, exists: bool) -> bool {
        match self {
            Guard::Absent => !exists,
            Guard::Present => exists,
        }
    }
}

/// What a step does to the domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    AddDomain,
    AttachLoginModules,
    RemoveDomain,
}

impl StepKind {
    /// Whether the domain exists once this step has succeeded.
    pub fn exists_after(self) -> bool {
        !matches!(self, StepKind::RemoveDomain)
    }
}

/// One side-effecting operation with its precondition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedStep {
    pub kind: StepKind,
    pub description: String,
    pub operation: AdminOperation,
    pub guard: Guard,
}

/// Steps for one pass, in execution order. Empty when nothing needs doing, in
/// which case `reason` says why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Plan {
    pub steps: Vec<PlannedStep>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Plan {
    pub fn is_noop(&self) -> bool {
        self.steps.is_empty()
    }

    fn noop(reason: String) -> Self {
        Plan {
            steps: Vec::new(),
            reason: Some(reason),
        }
    }
}

/// Compute the guarded steps that move `observed` toward `action`.
///
/// | action | observed | steps |
/// |--------|----------|-------|
/// | create | present  | none  |
/// | create | absent   | add domain (absent), add login modules (present) |
/// | delete | absent   | none  |
/// | delete | present  | remove domain (present) |
pub fn plan(spec: &SecurityDomainSpec, action: DesiredAction, observed: ObservedState) -> Plan {
    match (action, observed.exists) {
        (DesiredAction::Create, true) => {
            Plan::noop(format!("{} already exists - nothing to do", spec))
        }
        (DesiredAction::Create, false) => Plan {
            steps: create_steps(spec),
            reason: None,
        },
        (DesiredAction::Delete, false) => {
            Plan::noop(format!("{} doesn't exist - can't delete", spec))
        }
        (DesiredAction::Delete, true) => Plan {
            steps: vec![PlannedStep {
                kind: StepKind::RemoveDomain,
                description: format!("Delete {}", spec),
                operation: build_delete(spec),
                guard: Guard::Present,
            }],
            reason: None,
        },
    }
}

fn create_steps(spec: &SecurityDomainSpec) -> Vec<PlannedStep> {
    let mut steps = vec![PlannedStep {
        kind: StepKind::AddDomain,
        description: format!("Create {}", spec),
        operation: build_add_domain(spec),
        guard: Guard::Absent,
    }];
    // Depends on the domain existing, whether step one created it or not.
    if let Some(operation) = build_add_login_modules(spec) {
        steps.push(PlannedStep {
            kind: StepKind::AttachLoginModules,
            description: format!("Attach login modules to {}", spec),
            operation,
            guard: Guard::Present,
        });
    }
    steps
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::domain::LoginModuleSpec;

    fn spec() -> SecurityDomainSpec {
        SecurityDomainSpec::new("testDomain").unwrap()
    }

    #[test]
    fn create_when_present_is_noop() {
        let p = plan(&spec(), DesiredAction::Create, ObservedState::present());
        assert!(p.is_noop());
        assert_eq!(
            p.reason.as_deref(),
            Some("securitydomain[testDomain] already exists - nothing to do")
        );
    }

    #[test]
    fn delete_when_absent_is_noop() {
        let p = plan(&spec(), DesiredAction::Delete, ObservedState::absent());
        assert!(p.is_noop());
        assert!(p.reason.unwrap().contains("can't delete"));
    }

    #[test]
    fn create_when_absent_adds_domain_guarded_absent() {
        let p = plan(&spec(), DesiredAction::Create, ObservedState::absent());
        assert_eq!(p.steps.len(), 1);
        assert_eq!(p.steps[0].guard, Guard::Absent);
        assert_eq!(p.steps[0].description, "Create securitydomain[testDomain]");
        assert!(p.reason.is_none());
    }

    #[test]
    fn create_with_modules_attaches_them_guarded_present() {
        let spec = spec().with_login_module(LoginModuleSpec::new("Ldap", "required"));
        let p = plan(&spec, DesiredAction::Create, ObservedState::absent());
        assert_eq!(p.steps.len(), 2);
        assert_eq!(p.steps[0].guard, Guard::Absent);
        assert_eq!(p.steps[1].guard, Guard::Present);
        assert!(p.steps[1].operation.to_string().contains("authentication=classic:add"));
    }

    #[test]
    fn delete_when_present_removes_guarded_present() {
        let p = plan(&spec(), DesiredAction::Delete, ObservedState::present());
        assert_eq!(p.steps.len(), 1);
        assert_eq!(p.steps[0].guard, Guard::Present);
        assert!(p.steps[0].operation.to_string().ends_with(":remove"));
    }

    #[test]
    fn planned_operations_all_mutate() {
        let spec = spec().with_login_module(LoginModuleSpec::new("Ldap", "required"));
        let create = plan(&spec, DesiredAction::Create, ObservedState::absent());
        let delete = plan(&spec, DesiredAction::Delete, ObservedState::present());
        for step in create.steps.iter().chain(delete.steps.iter()) {
            assert!(!step.operation.is_read_only(), "{}", step.operation);
        }
    }

    #[test]
    fn step_effects() {
        assert!(StepKind::AddDomain.exists_after());
        assert!(StepKind::AttachLoginModules.exists_after());
        assert!(!StepKind::RemoveDomain.exists_after());
    }

    #[test]
    fn guard_holds() {
        assert!(Guard::Absent.holds(false));
        assert!(!Guard::Absent.holds(true));
        assert!(Guard::Present.holds(true));
        assert!(!Guard::Present.holds(false));
    }

    #[test]
    fn plan_serializes_operations_as_strings() {
        let p = plan(&spec(), DesiredAction::Delete, ObservedState::present());
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(
            json["steps"][0]["operation"],
            "/subsystem=security/security-domain=testDomain:remove"
        );
        assert_eq!(json["steps"][0]["guard"], "present");
    }
}
