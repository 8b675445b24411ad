//! Non-fatal findings of a resolution run.
//!
//! Diagnostics never block generation; they are logged as warnings and kept on the
//! [`Resolution`](crate::Resolution) for callers that want to surface them.

use std::fmt;

use crate::annotations::Int64Encoding;
use crate::context::Context;
use crate::fully_qualified_name::FullyQualifiedName;

/// The largest integer a JSON number (an IEEE-754 double) represents exactly: 2^53 - 1.
pub const MAX_SAFE_INTEGER: i128 = 9_007_199_254_740_991;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// A 64-bit integer field is written as a JSON number and may lose precision.
    PrecisionRisk {
        element: FullyQualifiedName,
        /// Declared examples outside the exactly representable range.
        unsafe_examples: Vec<String>,
    },
}

impl Diagnostic {
    pub fn element(&self) -> &FullyQualifiedName {
        match self {
            Diagnostic::PrecisionRisk { element, .. } => element,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::PrecisionRisk {
                element,
                unsafe_examples,
            } => {
                write!(
                    f,
                    "{}: 64-bit integer encoded as a JSON number loses precision beyond {}",
                    element, MAX_SAFE_INTEGER
                )?;
                if !unsafe_examples.is_empty() {
                    write!(f, " (unsafe examples: {})", unsafe_examples.join(", "))?;
                }
                Ok(())
            }
        }
    }
}

/// Returns `true` if `example` is an integer a JSON number cannot hold exactly.
fn is_unsafe(example: &str) -> bool {
    example
        .trim()
        .trim_matches('"')
        .parse::<i128>()
        .map_or(false, |value| value.abs() > MAX_SAFE_INTEGER)
}

/// Collects a precision-risk diagnostic for every NUMBER-encoded 64-bit integer field,
/// including maps with 64-bit values.
pub fn collect(ctx: &Context) -> Vec<Diagnostic> {
    let schema = ctx.schema();
    let annotations = ctx.annotations();
    schema
        .fields()
        .filter(|(id, _)| {
            let value = schema.map_entry(*id).map_or(*id, |(_, value)| value);
            schema.field(value).is_64_bit()
                && annotations.field(*id).int64_encoding == Some(Int64Encoding::Number)
        })
        .map(|(id, field)| Diagnostic::PrecisionRisk {
            element: field.name.clone(),
            unsafe_examples: annotations
                .field(id)
                .examples
                .iter()
                .filter(|example| is_unsafe(example))
                .cloned()
                .collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{FieldDescriptor, FileDescriptor, MessageDescriptor, Type};
    use crate::options::OptionValue;
    use crate::Config;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_unsafe_examples() {
        assert!(!is_unsafe("9007199254740991"));
        assert!(is_unsafe("9007199254740993"));
        assert!(is_unsafe("-9007199254740993"));
        assert!(is_unsafe("\"9007199254740993\""));
        assert!(!is_unsafe("12.5"));
        assert!(!is_unsafe("abc"));
    }

    #[test]
    fn test_precision_risk_is_not_an_error() {
        let resolution = Config::new().resolve(vec![FileDescriptor::new("c.proto", "pkg").message(
            MessageDescriptor::new("Counter")
                .field(
                    FieldDescriptor::new("count", 1, Type::Int64)
                        .option("sebuf.http.int64_encoding", OptionValue::ident("NUMBER"))
                        .option(
                            "sebuf.http.field_examples",
                            OptionValue::List(vec![
                                OptionValue::string("42"),
                                OptionValue::string("9007199254740993"),
                            ]),
                        ),
                )
                .field(FieldDescriptor::new("total", 2, Type::Int64)),
        )]);
        assert!(resolution.errors().is_empty());
        assert_eq!(
            resolution.diagnostics(),
            &[Diagnostic::PrecisionRisk {
                element: ".pkg.Counter.count".into(),
                unsafe_examples: vec!["9007199254740993".to_string()],
            }]
        );

        let quiet = Config::new()
            .precision_diagnostics(false)
            .resolve(vec![FileDescriptor::new("c.proto", "pkg").message(
                MessageDescriptor::new("Counter").field(
                    FieldDescriptor::new("count", 1, Type::Int64)
                        .option("sebuf.http.int64_encoding", OptionValue::ident("NUMBER")),
                ),
            )]);
        assert!(quiet.diagnostics().is_empty());
    }
}
