//! Command builder: renders the resource model into management operations.
//!
//! All operations are path-scoped:
//!
//! ```text
//! /subsystem=security/security-domain=<name>:read-resource
//! /subsystem=security/security-domain=<name>:add(cache-type=<cache>)
//! /subsystem=security/security-domain=<name>/authentication=classic:add(login-modules=[...])
//! /subsystem=security/security-domain=<name>:remove
//! ```

use crate::admin::escape::quote_value;
use crate::admin::{AdminOperation, ResourceAddress};
use crate::types::domain::{LoginModuleSpec, SecurityDomainSpec};

/// Address of the security domain `name`.
pub fn domain_address(name: &str) -> ResourceAddress {
    ResourceAddress::root()
        .child("subsystem", "security")
        .child("security-domain", name)
}

/// Read-only existence check.
pub fn build_probe(name: &str) -> AdminOperation {
    AdminOperation::new(domain_address(name), "read-resource")
}

/// Ordered operations that create the domain: the domain itself, then its
/// classic authentication block when there are login modules to attach.
pub fn build_create(spec: &SecurityDomainSpec) -> Vec<AdminOperation> {
    let mut ops = vec![build_add_domain(spec)];
    if let Some(op) = build_add_login_modules(spec) {
        ops.push(op);
    }
    ops
}

pub fn build_add_domain(spec: &SecurityDomainSpec) -> AdminOperation {
    AdminOperation::new(domain_address(spec.name()), "add")
        .param("cache-type", quote_value(spec.cache_type()))
}

/// `None` when the spec has no login modules.
pub fn build_add_login_modules(spec: &SecurityDomainSpec) -> Option<AdminOperation> {
    if spec.login_modules().is_empty() {
        return None;
    }
    let address = domain_address(spec.name()).child("authentication", "classic");
    Some(
        AdminOperation::new(address, "add")
            .param("login-modules", render_login_modules(spec.login_modules())),
    )
}

pub fn build_delete(spec: &SecurityDomainSpec) -> AdminOperation {
    AdminOperation::new(domain_address(spec.name()), "remove")
}

/// `[{code=>..., flag=>..., module-options=>[(k=>v), ...]}, ...]`, keeping
/// module order and per-module option order.
pub fn render_login_modules(modules: &[LoginModuleSpec]) -> String {
    let entries: Vec<String> = modules.iter().map(render_login_module).collect();
    format!("[{}]", entries.join(", "))
}

fn render_login_module(module: &LoginModuleSpec) -> String {
    let mut out = format!(
        "{{code=>{}, flag=>{}",
        quote_value(&module.code),
        quote_value(&module.flag)
    );
    if !module.module_options.is_empty() {
        let options: Vec<String> = module
            .module_options
            .iter()
            .map(|(k, v)| format!("({}=>{})", quote_value(k), quote_value(v)))
            .collect();
        out.push_str(", module-options=>[");
        out.push_str(&options.join(", "));
        out.push(']');
    }
    out.push('}');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ldap_spec() -> SecurityDomainSpec {
        SecurityDomainSpec::new("app")
            .unwrap()
            .with_login_module(
                LoginModuleSpec::new("Ldap", "required")
                    .option("a", "1")
                    .option("b", "2"),
            )
    }

    #[test]
    fn probe_reads_domain_resource() {
        assert_eq!(
            build_probe("testDomain").to_string(),
            "/subsystem=security/security-domain=testDomain:read-resource"
        );
    }

    #[test]
    fn create_without_modules_is_one_operation() {
        let spec = SecurityDomainSpec::new("testDomain").unwrap();
        let ops = build_create(&spec);
        assert_eq!(ops.len(), 1);
        let rendered = ops[0].to_string();
        assert!(rendered.contains("cache-type=default"));
        assert_eq!(
            rendered,
            "/subsystem=security/security-domain=testDomain:add(cache-type=default)"
        );
    }

    #[test]
    fn create_honours_cache_type() {
        let spec = SecurityDomainSpec::new("d").unwrap().with_cache_type("infinispan");
        assert!(build_create(&spec)[0].to_string().contains("cache-type=infinispan"));
    }

    #[test]
    fn create_with_modules_is_two_operations() {
        let ops = build_create(&ldap_spec());
        assert_eq!(ops.len(), 2);
        assert_eq!(
            ops[1].to_string(),
            "/subsystem=security/security-domain=app/authentication=classic:add(\
             login-modules=[{code=>Ldap, flag=>required, module-options=>[(a=>1), (b=>2)]}])"
        );
    }

    #[test]
    fn option_order_is_insertion_order() {
        let spec = SecurityDomainSpec::new("app").unwrap().with_login_module(
            LoginModuleSpec::new("Ldap", "required")
                .option("b", "2")
                .option("a", "1"),
        );
        let rendered = build_create(&spec)[1].to_string();
        let b = rendered.find("(b=>2)").unwrap();
        let a = rendered.find("(a=>1)").unwrap();
        assert!(b < a);
    }

    #[test]
    fn module_order_is_preserved() {
        let spec = SecurityDomainSpec::new("app")
            .unwrap()
            .with_login_module(LoginModuleSpec::new("RealmDirect", "sufficient"))
            .with_login_module(LoginModuleSpec::new("Database", "required"))
            .with_login_module(LoginModuleSpec::new("Ldap", "optional"));
        let literal = render_login_modules(spec.login_modules());
        assert_eq!(
            literal,
            "[{code=>RealmDirect, flag=>sufficient}, {code=>Database, flag=>required}, \
             {code=>Ldap, flag=>optional}]"
        );
    }

    #[test]
    fn option_values_are_quoted_when_needed() {
        let spec = SecurityDomainSpec::new("app").unwrap().with_login_module(
            LoginModuleSpec::new("Database", "required")
                .option("dsJndiName", "java:/AppDS")
                .option("principalsQuery", "select passwd from users where login=?"),
        );
        let rendered = build_create(&spec)[1].to_string();
        assert!(rendered.contains("(dsJndiName=>\"java:/AppDS\")"));
        assert!(rendered.contains("(principalsQuery=>\"select passwd from users where login=?\")"));
    }

    #[test]
    fn delete_is_path_scoped() {
        let spec = SecurityDomainSpec::new("testDomain").unwrap();
        assert_eq!(
            build_delete(&spec).to_string(),
            "/subsystem=security/security-domain=testDomain:remove"
        );
    }

    #[test]
    fn slash_in_name_escaped_identically_everywhere() {
        let spec = SecurityDomainSpec::new("corp/app")
            .unwrap()
            .with_login_module(LoginModuleSpec::new("Ldap", "required"));
        let expected = "/subsystem=security/security-domain=corp\\/app";
        let mut rendered = vec![build_probe(spec.name()).to_string(), build_delete(&spec).to_string()];
        rendered.extend(build_create(&spec).iter().map(|op| op.to_string()));
        assert_eq!(rendered.len(), 4);
        for op in rendered {
            assert!(op.starts_with(expected), "{} lacks escaped path", op);
            assert!(!op.contains("=corp/app"));
        }
    }
}
