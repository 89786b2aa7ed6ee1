//! Error types for the executor, the convergence engine and configuration.
//!
//! A non-zero exit status from the admin CLI is never an `ExecError`: it is a
//! normal `ExecutionResult` that the caller interprets. `ExecError` covers only
//! the cases where a process could not be run to completion at all.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Result alias used throughout the convergence path.
pub type Result<T> = std::result::Result<T, ConvergeError>;

// ---------------------------------------------------------------------------
// ExecError
// ---------------------------------------------------------------------------

/// Infrastructure failure while running an external command.
#[derive(Error, Debug)]
pub enum ExecError {
    #[error("failed to spawn {}: {source}", program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unknown user '{0}'")]
    UnknownIdentity(String),

    #[error("command timed out after {}s: {command}", after.as_secs())]
    Timeout { command: String, after: Duration },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// ConvergeError
// ---------------------------------------------------------------------------

/// Failure of a convergence pass.
#[derive(Error, Debug)]
pub enum ConvergeError {
    /// The read-only existence probe could not be executed.
    #[error("cannot probe security domain '{name}': {source}")]
    ProbeExecutionFailure {
        name: String,
        #[source]
        source: ExecError,
    },

    /// A side-effecting operation ran and exited non-zero.
    #[error("{description} was rejected (exit {}): {}", exit_label(*exit_code), stderr.trim())]
    CommandRejected {
        description: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    /// A side-effecting operation could not be run at all.
    #[error("{description} could not be executed: {source}")]
    ExecutionFailure {
        description: String,
        #[source]
        source: ExecError,
    },

    #[error("invalid security domain: {0}")]
    InvalidSpec(String),
}

impl ConvergeError {
    /// Short machine-readable tag, used in JSON output.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ProbeExecutionFailure { .. } => "probe_execution_failure",
            Self::CommandRejected { .. } => "command_rejected",
            Self::ExecutionFailure { source: ExecError::Timeout { .. }, .. } => "timeout",
            Self::ExecutionFailure { .. } => "execution_failure",
            Self::InvalidSpec(_) => "invalid_spec",
        }
    }
}

fn exit_label(code: Option<i32>) -> String {
    match code {
        Some(c) => c.to_string(),
        None => "signal".into(),
    }
}

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Failure loading or saving settings and declaration files.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("cannot serialize settings: {0}")]
    Serialize(#[from] serde_yaml::Error),

    #[error("could not determine a configuration directory (set SECDOMAIN_CONFIG_DIR or HOME)")]
    NoConfigDir,
}
