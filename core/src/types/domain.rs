//! Resource model: the desired state of one security domain and what a
//! probe observed about it.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ConvergeError;

/// Cache type used when a declaration does not name one.
pub const DEFAULT_CACHE_TYPE: &str = "default";

// ---------------------------------------------------------------------------
// LoginModuleSpec
// ---------------------------------------------------------------------------

/// One classic authentication module attached to a security domain.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoginModuleSpec {
    #[serde(deserialize_with = "scalar::deserialize")]
    pub code: String,
    #[serde(deserialize_with = "scalar::deserialize")]
    pub flag: String,
    /// Rendered in insertion order.
    #[serde(default, with = "ordered_options", skip_serializing_if = "Vec::is_empty")]
    pub module_options: Vec<(String, String)>,
}

impl LoginModuleSpec {
    pub fn new(code: &str, flag: &str) -> Self {
        LoginModuleSpec {
            code: code.to_string(),
            flag: flag.to_string(),
            module_options: Vec::new(),
        }
    }

    /// Append a module option. Later options render after earlier ones.
    pub fn option(mut self, key: &str, value: &str) -> Self {
        self.module_options.push((key.to_string(), value.to_string()));
        self
    }
}

// ---------------------------------------------------------------------------
// SecurityDomainSpec
// ---------------------------------------------------------------------------

/// Desired state of a security domain. Built once per convergence pass and
/// never mutated while the pass runs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SecurityDomainSpec {
    #[serde(deserialize_with = "scalar::deserialize")]
    name: String,
    #[serde(default = "default_cache_type", deserialize_with = "scalar::deserialize")]
    cache_type: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    login_modules: Vec<LoginModuleSpec>,
}

fn default_cache_type() -> String {
    DEFAULT_CACHE_TYPE.to_string()
}

impl SecurityDomainSpec {
    /// A domain with the default cache type and no login modules.
    pub fn new(name: &str) -> Result<Self, ConvergeError> {
        let spec = SecurityDomainSpec {
            name: name.to_string(),
            cache_type: default_cache_type(),
            login_modules: Vec::new(),
        };
        spec.validate()?;
        Ok(spec)
    }

    pub fn with_cache_type(mut self, cache_type: &str) -> Self {
        self.cache_type = cache_type.to_string();
        self
    }

    pub fn with_login_module(mut self, module: LoginModuleSpec) -> Self {
        self.login_modules.push(module);
        self
    }

    pub fn with_login_modules(mut self, modules: Vec<LoginModuleSpec>) -> Self {
        self.login_modules = modules;
        self
    }

    /// Checks the one structural requirement on a spec: a usable name.
    /// Flags and cache types are passed through untouched.
    pub fn validate(&self) -> Result<(), ConvergeError> {
        if self.name.trim().is_empty() {
            return Err(ConvergeError::InvalidSpec(
                "security domain name must not be empty".into(),
            ));
        }
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cache_type(&self) -> &str {
        &self.cache_type
    }

    pub fn login_modules(&self) -> &[LoginModuleSpec] {
        &self.login_modules
    }
}

impl fmt::Display for SecurityDomainSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "securitydomain[{}]", self.name)
    }
}

// ---------------------------------------------------------------------------
// DesiredAction / ObservedState
// ---------------------------------------------------------------------------

/// What the caller wants to be true after convergence.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DesiredAction {
    #[default]
    Create,
    Delete,
}

impl fmt::Display for DesiredAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DesiredAction::Create => write!(f, "create"),
            DesiredAction::Delete => write!(f, "delete"),
        }
    }
}

/// Result of probing the runtime once.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ObservedState {
    pub exists: bool,
}

impl ObservedState {
    pub fn present() -> Self {
        ObservedState { exists: true }
    }

    pub fn absent() -> Self {
        ObservedState { exists: false }
    }
}

// ---------------------------------------------------------------------------
// Scalar strings
// ---------------------------------------------------------------------------

/// Reads any YAML scalar as its string form, so `allowEmptyPasswords: false`
/// or `name: 2024` are accepted where a string is expected. Works through
/// `#[serde(flatten)]`, which buffers values and loses the original tag.
mod scalar {
    use std::fmt;

    use serde::de::{self, Deserialize, Visitor};
    use serde::Deserializer;

    pub struct Scalar(pub String);

    impl<'de> Deserialize<'de> for Scalar {
        fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
        where
            D: Deserializer<'de>,
        {
            deserializer.deserialize_any(ScalarVisitor).map(Scalar)
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        Scalar::deserialize(deserializer).map(|s| s.0)
    }

    struct ScalarVisitor;

    impl<'de> Visitor<'de> for ScalarVisitor {
        type Value = String;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a string, number or boolean")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_string<E: de::Error>(self, v: String) -> Result<String, E> {
            Ok(v)
        }

        fn visit_bool<E: de::Error>(self, v: bool) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<String, E> {
            Ok(v.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// Ordered module options
// ---------------------------------------------------------------------------

/// Serde adapter that keeps module options as an ordered list of pairs while
/// reading and writing them as a mapping in document order. A sequence of
/// `[key, value]` pairs is accepted as well.
mod ordered_options {
    use std::fmt;

    use serde::de::{MapAccess, SeqAccess, Visitor};
    use serde::ser::SerializeMap;
    use serde::{Deserializer, Serializer};

    use super::scalar::Scalar;

    pub fn serialize<S>(pairs: &[(String, String)], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(pairs.len()))?;
        for (k, v) in pairs {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<(String, String)>, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(PairsVisitor)
    }

    struct PairsVisitor;

    impl<'de> Visitor<'de> for PairsVisitor {
        type Value = Vec<(String, String)>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a mapping of option names to values")
        }

        fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut pairs = Vec::new();
            while let Some((k, v)) = access.next_entry::<Scalar, Scalar>()? {
                pairs.push((k.0, v.0));
            }
            Ok(pairs)
        }

        fn visit_seq<A>(self, mut access: A) -> Result<Self::Value, A::Error>
        where
            A: SeqAccess<'de>,
        {
            let mut pairs = Vec::new();
            while let Some((k, v)) = access.next_element::<(Scalar, Scalar)>()? {
                pairs.push((k.0, v.0));
            }
            Ok(pairs)
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E> {
            Ok(Vec::new())
        }
    }
}
