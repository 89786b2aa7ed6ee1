//! Management operations for the application server's admin CLI.
//!
//! `AdminOperation` is a typed operation (address, name, parameters) that
//! renders to the single-line syntax the CLI accepts. Values are escaped when
//! they are added, in `escape`; `builder` knows which operations a security
//! domain needs; `client` runs them through a `CommandRunner`.

pub mod builder;
pub mod client;
pub mod escape;

use std::fmt;

use serde::Serialize;

pub use client::AdminClient;

use escape::escape_path_value;

// ---------------------------------------------------------------------------
// ResourceAddress
// ---------------------------------------------------------------------------

/// A resource path such as `/subsystem=security/security-domain=app`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResourceAddress {
    segments: Vec<(String, String)>,
}

impl ResourceAddress {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn child(mut self, key: &str, value: &str) -> Self {
        self.segments.push((key.to_string(), value.to_string()));
        self
    }
}

impl fmt::Display for ResourceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, value) in &self.segments {
            write!(f, "/{}={}", key, escape_path_value(value))?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// AdminOperation
// ---------------------------------------------------------------------------

/// One management operation. Parameter values are stored already rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminOperation {
    address: ResourceAddress,
    name: String,
    params: Vec<(String, String)>,
}

impl AdminOperation {
    pub fn new(address: ResourceAddress, name: &str) -> Self {
        AdminOperation {
            address,
            name: name.to_string(),
            params: Vec::new(),
        }
    }

    /// Add a parameter whose value is already rendered (see `escape::quote_value`).
    pub fn param(mut self, key: &str, rendered: String) -> Self {
        self.params.push((key.to_string(), rendered));
        self
    }

    pub fn address(&self) -> &ResourceAddress {
        &self.address
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `true` for `read-*` operations, which never change server state.
    pub fn is_read_only(&self) -> bool {
        self.name.starts_with("read-")
    }
}

impl fmt::Display for AdminOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.address, self.name)?;
        if !self.params.is_empty() {
            let params: Vec<String> = self
                .params
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            write!(f, "({})", params.join(","))?;
        }
        Ok(())
    }
}

impl Serialize for AdminOperation {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_address_renders_empty() {
        let op = AdminOperation::new(ResourceAddress::root(), "read-resource");
        assert_eq!(op.to_string(), ":read-resource");
        assert!(op.is_read_only());
    }

    #[test]
    fn params_joined_with_commas() {
        let op = AdminOperation::new(ResourceAddress::root().child("a", "b"), "add")
            .param("x", "1".into())
            .param("y", "2".into());
        assert_eq!(op.to_string(), "/a=b:add(x=1,y=2)");
        assert!(!op.is_read_only());
        assert_eq!(op.name(), "add");
        assert_eq!(op.address().to_string(), "/a=b");
    }

    #[test]
    fn address_values_are_escaped() {
        let addr = ResourceAddress::root().child("security-domain", "a/b=c");
        assert_eq!(addr.to_string(), "/security-domain=a\\/b\\=c");
    }

    #[test]
    fn serializes_as_rendered_string() {
        let op = AdminOperation::new(ResourceAddress::root().child("a", "b"), "remove");
        assert_eq!(serde_json::to_string(&op).unwrap(), "\"/a=b:remove\"");
    }
}
