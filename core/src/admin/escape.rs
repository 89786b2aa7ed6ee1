//! Escaping for values embedded in management operations.
//!
//! Every resource path and every parameter value the crate emits passes
//! through one of these two functions, so a name or option value can never
//! terminate an address segment or a parameter list early.

/// Characters that carry meaning inside a resource address.
const PATH_SPECIAL: &[char] = &['\\', '/', ':', '=', ',', '(', ')', '[', ']', '{', '}', '"', '\''];

/// Escape a value for use inside an address segment (`key=<value>`).
/// Special characters and whitespace are prefixed with a backslash.
pub fn escape_path_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if PATH_SPECIAL.contains(&c) || c.is_whitespace() {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Render a parameter value. Plain identifiers stay bare
/// (`cache-type=default`); anything else is double-quoted with `\` and `"`
/// escaped.
pub fn quote_value(value: &str) -> String {
    if is_bare(value) {
        return value.to_string();
    }
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

fn is_bare(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_slash_escaped() {
        assert_eq!(escape_path_value("app/admin"), "app\\/admin");
    }

    #[test]
    fn path_plain_name_untouched() {
        assert_eq!(escape_path_value("testDomain"), "testDomain");
    }

    #[test]
    fn path_operation_separators_escaped() {
        assert_eq!(
            escape_path_value("a:remove(x=1)"),
            "a\\:remove\\(x\\=1\\)"
        );
        assert_eq!(escape_path_value("two words"), "two\\ words");
    }

    #[test]
    fn bare_values_not_quoted() {
        assert_eq!(quote_value("default"), "default");
        assert_eq!(quote_value("infinispan"), "infinispan");
        assert_eq!(quote_value("org.jboss.security.auth.spi.LdapLoginModule"),
            "org.jboss.security.auth.spi.LdapLoginModule");
    }

    #[test]
    fn special_values_quoted() {
        assert_eq!(quote_value("ldap://host:389"), "\"ldap://host:389\"");
        assert_eq!(quote_value("say \"hi\""), "\"say \\\"hi\\\"\"");
        assert_eq!(quote_value("a\\b"), "\"a\\\\b\"");
        assert_eq!(quote_value(""), "\"\"");
    }

    #[test]
    fn injection_attempt_stays_inside_quotes() {
        let rendered = quote_value("x),:shutdown(");
        assert_eq!(rendered, "\"x),:shutdown(\"");
    }
}
