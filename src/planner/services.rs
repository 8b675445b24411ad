use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

use super::{HttpBinding, PathParam, QueryParam};
use crate::annotations::{Binding, HeaderRequirement};
use crate::context::Context;
use crate::descriptor::Type;
use crate::error::ConflictError;
use crate::fully_qualified_name::FullyQualifiedName;
use crate::ident::to_snake;
use crate::walker::{FieldId, MethodId};

static PATH_PARAM: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{([^}]+)\}").unwrap());

/// The `{name}` placeholders of a route template, in order.
pub fn path_params(path: &str) -> Vec<String> {
    PATH_PARAM
        .captures_iter(path)
        .map(|captures| captures[1].to_string())
        .collect()
}

pub fn ensure_leading_slash(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    }
}

/// Joins a service base path and a method path with exactly one slash between them.
pub fn build_http_path(base: &str, path: &str) -> String {
    match (base.is_empty(), path.is_empty()) {
        (true, true) => "/".to_string(),
        (true, false) => ensure_leading_slash(path),
        (false, true) => ensure_leading_slash(base),
        (false, false) => format!(
            "{}/{}",
            ensure_leading_slash(base).trim_end_matches('/'),
            path.trim_start_matches('/')
        ),
    }
}

/// The union of the service's and the method's header requirements, sorted by name, and every
/// disagreement found while merging them.
///
/// Header names match case-insensitively. A header declared at both levels must agree on
/// `required`, `format` and `type`; the method's description, example and deprecation win.
/// A disagreeing declaration is reported and the earlier one kept.
pub(crate) fn merge_headers(
    ctx: &Context,
    method: MethodId,
) -> (Vec<HeaderRequirement>, Vec<ConflictError>) {
    let element = ctx.schema().method(method);
    let service = ctx.annotations().service(element.service);
    let own = ctx.annotations().method(method);

    let mut merged = BTreeMap::new();
    let mut conflicts = Vec::new();
    for header in service.headers.iter().chain(&own.headers) {
        match merged.entry(header.name.to_ascii_lowercase()) {
            Entry::Vacant(entry) => {
                entry.insert(header.clone());
            }
            Entry::Occupied(mut entry) => match disagreement(entry.get(), header) {
                Some(detail) => conflicts.push(ConflictError::HeaderRequirementConflict {
                    element: element.name.clone(),
                    header: header.name.clone(),
                    detail,
                }),
                None => {
                    entry.insert(header.clone());
                }
            },
        }
    }
    (merged.into_values().collect(), conflicts)
}

fn disagreement(first: &HeaderRequirement, second: &HeaderRequirement) -> Option<String> {
    let required = |header: &HeaderRequirement| {
        if header.required {
            "required"
        } else {
            "optional"
        }
    };
    if first.required != second.required {
        Some(format!(
            "declared {} and {}",
            required(first),
            required(second)
        ))
    } else if first.format != second.format {
        Some(format!(
            "format `{}` differs from `{}`",
            first.format, second.format
        ))
    } else if first.header_type != second.header_type {
        Some(format!(
            "type `{}` differs from `{}`",
            first.header_type, second.header_type
        ))
    } else {
        None
    }
}

/// Types a path placeholder can be bound to.
fn is_path_compatible(r#type: Type) -> bool {
    !matches!(
        r#type,
        Type::Enum | Type::Bytes | Type::Message | Type::Group
    )
}

/// Plans the route and request binding of `method`.
///
/// The binding is always returned; the accompanying errors are only reported for methods with
/// an explicit `config` annotation.
pub(crate) fn build_binding(ctx: &Context, method: MethodId) -> (HttpBinding, Vec<ConflictError>) {
    let schema = ctx.schema();
    let annotations = ctx.annotations();
    let element = schema.method(method);
    let service = schema.service(element.service);
    let base = annotations
        .service(element.service)
        .base_path
        .clone()
        .unwrap_or_default();
    let rule = annotations.method(method).http.as_ref();

    let verb = rule.map(|rule| rule.method).unwrap_or_default();
    let method_path = rule.map(|rule| rule.path.as_str()).unwrap_or_default();
    let path = if !method_path.is_empty() {
        build_http_path(&base, method_path)
    } else if !base.is_empty() {
        build_http_path(&base, &to_snake(&element.method_name))
    } else {
        let package = &schema.file(service.file).package;
        build_http_path(package, &to_snake(&element.method_name))
    };

    let fields: &[FieldId] = match element.input {
        Some(input) => &schema.message(input).fields,
        None => &[],
    };
    let find = |name: &str| {
        fields
            .iter()
            .copied()
            .find(|&field| schema.field(field).field_name == name)
    };

    // Placeholders may come from the service base path too.
    let path_params = path_params(&path)
        .into_iter()
        .map(|name| PathParam {
            field: find(&name).map(|field| schema.field(field).name.clone()),
            name,
        })
        .collect::<Vec<_>>();

    let query_params = fields
        .iter()
        .filter_map(|&field| match &annotations.field(field).query {
            Some(Binding::Query { name, required }) => Some(QueryParam {
                name: name.clone(),
                field: schema.field(field).name.clone(),
                required: *required,
            }),
            _ => None,
        })
        .collect::<Vec<_>>();

    let bound = |name: &FullyQualifiedName| {
        path_params
            .iter()
            .any(|param| param.field.as_ref() == Some(name))
            || query_params.iter().any(|param| &param.field == name)
    };
    let body_fields = fields
        .iter()
        .map(|&field| schema.field(field).name.clone())
        .filter(|name| !bound(name))
        .collect::<Vec<_>>();

    let mut errors = Vec::new();
    if rule.is_some() {
        let invalid = |detail: String| ConflictError::InvalidBinding {
            element: element.name.clone(),
            detail,
        };
        for param in &path_params {
            let field = match param.field.as_ref().and_then(|name| schema.lookup_field(name)) {
                Some(field) => schema.field(field),
                None => {
                    errors.push(invalid(format!(
                        "path variable `{{{}}}` in `{}` has no matching request field",
                        param.name, path
                    )));
                    continue;
                }
            };
            if field.is_repeated() || !is_path_compatible(field.r#type) {
                errors.push(invalid(format!(
                    "path variable `{{{}}}` is bound to non-scalar field `{}`",
                    param.name, field.name
                )));
            }
            if query_params.iter().any(|query| query.field == field.name) {
                errors.push(invalid(format!(
                    "field `{}` is bound to both the path and the query string",
                    field.name
                )));
            }
        }
        if verb.is_bodyless() && !body_fields.is_empty() {
            errors.push(invalid(format!(
                "{} request has fields not bound to the path or query: {}",
                verb.as_str(),
                body_fields
                    .iter()
                    .map(FullyQualifiedName::name)
                    .collect::<Vec<_>>()
                    .join(", ")
            )));
        }
    }

    debug!("bound {} to {} {}", element.name, verb.as_str(), path);
    (
        HttpBinding {
            method: verb,
            path,
            path_params,
            query_params,
            body_fields,
        },
        errors,
    )
}
