//! Security domain convergence for WildFly / JBoss EAP style servers.
//!
//! A pass probes whether a named security domain exists, plans the guarded
//! management operations needed to reach the desired state, re-probes right
//! before each operation and runs it through the server's admin CLI.
//!
//! ```no_run
//! use secdomain_core::admin::AdminClient;
//! use secdomain_core::convergence::Converger;
//! use secdomain_core::infrastructure::ProcessRunner;
//! use secdomain_core::types::{DesiredAction, LoginModuleSpec, RuntimeConfig, SecurityDomainSpec};
//!
//! let client = AdminClient::new(RuntimeConfig::default(), ProcessRunner);
//! let converger = Converger::new(client);
//! let spec = SecurityDomainSpec::new("app")?
//!     .with_login_module(LoginModuleSpec::new("RealmDirect", "required"));
//! let outcome = converger.converge(&spec, DesiredAction::Create)?;
//! println!("changed: {}", outcome.changed);
//! # Ok::<(), secdomain_core::ConvergeError>(())
//! ```

pub mod admin;
pub mod convergence;
pub mod data;
pub mod error;
pub mod infrastructure;
pub mod probe;
pub mod types;

pub use error::{ConfigError, ConvergeError, ExecError, Result};
