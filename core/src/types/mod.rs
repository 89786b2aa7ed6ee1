pub mod config;
pub mod domain;

pub use config::RuntimeConfig;
pub use domain::{DesiredAction, LoginModuleSpec, ObservedState, SecurityDomainSpec};
