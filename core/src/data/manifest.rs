//! Declaration files: a flat list of security domains and the action wanted
//! for each.
//!
//! ```yaml
//! security_domains:
//!   - name: app
//!     cache_type: default
//!     login_modules:
//!       - code: Ldap
//!         flag: required
//!         module_options:
//!           java.naming.provider.url: ldap://ldap:389
//!   - name: legacy
//!     action: delete
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::convergence::{ConvergeOutcome, Converger};
use crate::error::{ConfigError, ConvergeError};
use crate::infrastructure::runner::CommandRunner;
use crate::types::domain::{DesiredAction, SecurityDomainSpec};

/// One declared security domain.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Declaration {
    #[serde(flatten)]
    pub spec: SecurityDomainSpec,
    #[serde(default)]
    pub action: DesiredAction,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Manifest {
    #[serde(default)]
    pub security_domains: Vec<Declaration>,
}

impl Manifest {
    pub fn parse(content: &str) -> Result<Manifest, serde_yaml::Error> {
        if content.trim().is_empty() {
            return Ok(Manifest::default());
        }
        serde_yaml::from_str(content)
    }

    /// Every declaration must carry a usable name.
    pub fn validate(&self) -> Result<(), ConvergeError> {
        for decl in &self.security_domains {
            decl.spec.validate()?;
        }
        Ok(())
    }

    /// Converge each declaration in file order, stopping at the first error.
    /// Nothing runs when any declaration is invalid.
    pub fn converge_all<R: CommandRunner>(
        &self,
        converger: &Converger<R>,
    ) -> Result<Vec<ConvergeOutcome>, ConvergeError> {
        self.validate()?;
        let mut outcomes = Vec::with_capacity(self.security_domains.len());
        for decl in &self.security_domains {
            outcomes.push(converger.converge(&decl.spec, decl.action)?);
        }
        let changed = outcomes.iter().filter(|o| o.changed).count();
        info!(total = outcomes.len(), changed, "converged declarations");
        Ok(outcomes)
    }
}

/// Load a declaration file.
pub fn load(path: &Path) -> Result<Manifest, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Manifest::parse(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
