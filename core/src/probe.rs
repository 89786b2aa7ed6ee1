//! Existence prober: read-only check whether a security domain exists.

use tracing::debug;

use crate::admin::builder::build_probe;
use crate::admin::AdminClient;
use crate::error::{ConvergeError, Result};
use crate::infrastructure::runner::CommandRunner;
use crate::types::domain::ObservedState;

/// Issues `read-resource` against a domain's address. Never mutates server
/// state, so it is safe to call as often as needed.
pub struct ExistenceProber<'a, R: CommandRunner> {
    client: &'a AdminClient<R>,
}

impl<'a, R: CommandRunner> ExistenceProber<'a, R> {
    pub fn new(client: &'a AdminClient<R>) -> Self {
        ExistenceProber { client }
    }

    /// `true` iff the read operation exits 0.
    pub fn exists(&self, name: &str) -> Result<bool> {
        let result = self
            .client
            .execute(&build_probe(name))
            .map_err(|source| ConvergeError::ProbeExecutionFailure {
                name: name.to_string(),
                source,
            })?;
        let exists = result.success();
        debug!(domain = name, exists, "probed security domain");
        Ok(exists)
    }

    pub fn observe(&self, name: &str) -> Result<ObservedState> {
        Ok(ObservedState {
            exists: self.exists(name)?,
        })
    }
}
