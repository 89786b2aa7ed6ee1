//! File-backed inputs: runtime settings and security domain declarations.

pub mod manifest;
pub mod settings;

pub use manifest::{Declaration, Manifest};
