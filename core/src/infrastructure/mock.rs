//! Fake admin controller for testing.
//!
//! `FakeController` is a `CommandRunner` that understands the `--command=`
//! operations this crate emits and keeps an in-memory set of resource
//! addresses, so convergence can be exercised end to end without a server.

use std::cell::RefCell;
use std::collections::BTreeSet;

use crate::admin::builder::domain_address;
use crate::error::ExecError;

use super::runner::{CommandRunner, ExecutionResult, Invocation};

/// A test double that tracks which resources exist and records every
/// operation it receives.
#[derive(Default)]
pub struct FakeController {
    resources: RefCell<BTreeSet<String>>,
    operations: RefCell<Vec<String>>,
    /// Operation names (`add`, `remove`) that are rejected regardless of state.
    rejected: RefCell<Vec<String>>,
}

impl FakeController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a controller with some domains already present.
    pub fn with_domains(names: &[&str]) -> Self {
        let fake = Self::new();
        for name in names {
            fake.resources
                .borrow_mut()
                .insert(domain_address(name).to_string());
        }
        fake
    }

    /// Reject every later operation with this name.
    pub fn reject(&self, operation: &str) {
        self.rejected.borrow_mut().push(operation.to_string());
    }

    pub fn has_domain(&self, name: &str) -> bool {
        self.resources
            .borrow()
            .contains(&domain_address(name).to_string())
    }

    pub fn has_login_modules(&self, name: &str) -> bool {
        let addr = domain_address(name).child("authentication", "classic");
        self.resources.borrow().contains(&addr.to_string())
    }

    /// Every operation received, in order.
    pub fn operations(&self) -> Vec<String> {
        self.operations.borrow().clone()
    }

    /// Operations other than `read-resource`.
    pub fn mutations(&self) -> Vec<String> {
        self.operations
            .borrow()
            .iter()
            .filter(|op| !op.ends_with(":read-resource"))
            .cloned()
            .collect()
    }

    fn apply(&self, address: &str, operation: &str) -> ExecutionResult {
        if self.rejected.borrow().iter().any(|r| r == operation) {
            return ExecutionResult::failed(1, "WFLYCTL0158: Operation handler failed");
        }
        let mut resources = self.resources.borrow_mut();
        match operation {
            "read-resource" => {
                if resources.contains(address) {
                    ExecutionResult::ok("{\"outcome\" => \"success\"}")
                } else {
                    ExecutionResult::failed(
                        1,
                        &format!("WFLYCTL0216: Management resource '{}' not found", address),
                    )
                }
            }
            "add" => {
                if resources.contains(address) {
                    return ExecutionResult::failed(1, "WFLYCTL0212: Duplicate resource");
                }
                if let Some(parent) = parent_address(address) {
                    if parent.contains("/security-domain=") && !resources.contains(parent) {
                        return ExecutionResult::failed(
                            1,
                            &format!("WFLYCTL0175: Resource {} does not exist", parent),
                        );
                    }
                }
                resources.insert(address.to_string());
                ExecutionResult::ok("{\"outcome\" => \"success\"}")
            }
            "remove" => {
                if !resources.remove(address) {
                    return ExecutionResult::failed(
                        1,
                        &format!("WFLYCTL0216: Management resource '{}' not found", address),
                    );
                }
                let child_prefix = format!("{}/", address);
                resources.retain(|r| !r.starts_with(&child_prefix));
                ExecutionResult::ok("{\"outcome\" => \"success\"}")
            }
            other => ExecutionResult::failed(1, &format!("unsupported operation '{}'", other)),
        }
    }
}

impl CommandRunner for FakeController {
    fn run(&self, invocation: &Invocation) -> Result<ExecutionResult, ExecError> {
        let op = invocation
            .args
            .iter()
            .find_map(|a| a.strip_prefix("--command="))
            .unwrap_or_default()
            .to_string();
        self.operations.borrow_mut().push(op.clone());
        let Some((address, operation)) = split_operation(&op) else {
            return Ok(ExecutionResult::failed(1, "malformed operation"));
        };
        Ok(self.apply(address, operation))
    }
}

/// Split `/a=b/c=d:name(params)` into the address and the operation name,
/// honouring backslash escapes in the address.
fn split_operation(op: &str) -> Option<(&str, &str)> {
    let colon = find_unescaped(op, ':', false)?;
    let (address, rest) = (&op[..colon], &op[colon + 1..]);
    let name = match rest.find('(') {
        Some(paren) => &rest[..paren],
        None => rest,
    };
    Some((address, name))
}

fn parent_address(address: &str) -> Option<&str> {
    let slash = find_unescaped(address, '/', true)?;
    if slash == 0 {
        None
    } else {
        Some(&address[..slash])
    }
}

fn find_unescaped(s: &str, target: char, last: bool) -> Option<usize> {
    let mut escaped = false;
    let mut found = None;
    for (i, c) in s.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        if c == '\\' {
            escaped = true;
        } else if c == target {
            if !last {
                return Some(i);
            }
            found = Some(i);
        }
    }
    found
}
