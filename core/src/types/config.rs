use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Where the application server lives and how to reach its admin CLI.
///
/// Passed explicitly to the admin client; nothing in the convergence path
/// reads process-wide state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RuntimeConfig {
    /// Server installation directory. Also the working directory for every
    /// CLI invocation.
    pub base_dir: PathBuf,
    /// CLI script, relative to `base_dir` unless absolute.
    #[serde(default = "default_cli_script")]
    pub cli_script: PathBuf,
    /// OS user the CLI runs as. `None` runs as the current user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    /// Management endpoint, e.g. `localhost:9990`. `None` lets the CLI use
    /// its own default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controller: Option<String>,
    /// Upper bound on a single CLI invocation.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_cli_script() -> PathBuf {
    PathBuf::from("bin/jboss-cli.sh")
}

fn default_timeout_secs() -> u64 {
    60
}

impl RuntimeConfig {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        RuntimeConfig {
            base_dir: base_dir.into(),
            cli_script: default_cli_script(),
            user: None,
            controller: None,
            timeout_secs: default_timeout_secs(),
        }
    }

    /// Absolute path of the CLI script.
    pub fn cli_path(&self) -> PathBuf {
        if self.cli_script.is_absolute() {
            self.cli_script.clone()
        } else {
            self.base_dir.join(&self.cli_script)
        }
    }

    /// `None` when `timeout_secs` is zero.
    pub fn timeout(&self) -> Option<Duration> {
        if self.timeout_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.timeout_secs))
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        RuntimeConfig {
            user: Some("wildfly".into()),
            ..RuntimeConfig::new("/opt/wildfly")
        }
    }
}
