//! Infrastructure for running the admin CLI.
//!
//! `runner` holds the `CommandRunner` trait with its production and scripted
//! implementations; `mock` holds a stateful fake controller for end-to-end
//! tests.

pub mod mock;
pub mod runner;

pub use runner::{CommandRunner, ExecutionResult, Invocation, MockRunner, ProcessRunner};
