//! Utility functions for working with identifiers.

use heck::{ToSnakeCase, ToUpperCamelCase};

/// Converts a field name to its JSON name the way protoc does: underscores are dropped and the
/// following letter is upper-cased.
pub fn to_json_name(field_name: &str) -> String {
    let mut json_name = String::with_capacity(field_name.len());
    let mut capitalize_next = false;
    for c in field_name.chars() {
        if c == '_' {
            capitalize_next = true;
        } else if capitalize_next {
            json_name.extend(c.to_uppercase());
            capitalize_next = false;
        } else {
            json_name.push(c);
        }
    }
    json_name
}

/// Converts a `snake_case` identifier to an `UpperCamel` case type name.
pub fn to_upper_camel(s: &str) -> String {
    s.to_upper_camel_case()
}

/// Converts a `camelCase` or `UpperCamel` identifier to `lower_snake` case, as used for default
/// routes.
pub fn to_snake(s: &str) -> String {
    s.to_snake_case()
}

/// Applies a flatten prefix to a field's JSON name.
pub fn prefixed(prefix: &str, json_name: &str) -> String {
    format!("{}{}", prefix, json_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_json_name() {
        assert_eq!("fooBar", &to_json_name("foo_bar"));
        assert_eq!("fooBarBaz", &to_json_name("foo_bar_baz"));
        assert_eq!("authMethod", &to_json_name("auth_method"));
        assert_eq!("foo2bar", &to_json_name("foo2bar"));
        assert_eq!("FooBar", &to_json_name("_foo_bar"));
        assert_eq!("email", &to_json_name("email"));
    }

    #[test]
    fn test_to_upper_camel() {
        assert_eq!("PaymentMethod", &to_upper_camel("payment_method"));
        assert_eq!("Auth", &to_upper_camel("auth"));
    }

    #[test]
    fn test_to_snake() {
        assert_eq!("get_user", &to_snake("GetUser"));
        assert_eq!("list_http_routes", &to_snake("ListHTTPRoutes"));
    }
}
