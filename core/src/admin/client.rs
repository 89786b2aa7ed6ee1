//! Admin client: turns a management operation into a CLI invocation.

use tracing::debug;

use crate::admin::AdminOperation;
use crate::error::ExecError;
use crate::infrastructure::runner::{CommandRunner, ExecutionResult, Invocation};
use crate::types::config::RuntimeConfig;

/// Runs management operations through the server's CLI script, in the
/// server's base directory, as the configured user.
pub struct AdminClient<R: CommandRunner> {
    config: RuntimeConfig,
    runner: R,
}

impl<R: CommandRunner> AdminClient<R> {
    pub fn new(config: RuntimeConfig, runner: R) -> Self {
        AdminClient { config, runner }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// The invocation that would run `op`. The operation is passed as a single
    /// argument, never through a shell.
    pub fn invocation(&self, op: &AdminOperation) -> Invocation {
        let mut inv = Invocation::new(self.config.cli_path(), &self.config.base_dir)
            .identity(self.config.user.clone())
            .timeout(self.config.timeout())
            .arg("--connect");
        if let Some(controller) = &self.config.controller {
            inv = inv.arg(format!("--controller={}", controller));
        }
        inv.arg(format!("--command={}", op))
    }

    pub fn execute(&self, op: &AdminOperation) -> Result<ExecutionResult, ExecError> {
        debug!(
            address = %op.address(),
            operation = op.name(),
            read_only = op.is_read_only(),
            "running management operation"
        );
        self.runner.run(&self.invocation(op))
    }
}
