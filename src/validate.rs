//! The conflict validator.
//!
//! Checks each element's annotations against each other and against their target. Rules are
//! independent: every violation is reported, not just the first one found on an element.

use std::collections::{HashMap, HashSet};

use itertools::Itertools;
use log::debug;

use crate::annotations::{Discriminator, EnumEncoding};
use crate::context::Context;
use crate::descriptor::Type;
use crate::error::ConflictError;
use crate::planner::{
    build_binding, flatten_target, flattened_variant, is_discriminated, member_names,
    merge_headers, variant_literals,
};
use crate::walker::{ElementId, EnumId, FieldId, MessageId, MethodId, OneofId};

/// Validates a single element.
pub fn validate(ctx: &Context, element: ElementId) -> Result<(), Vec<ConflictError>> {
    let mut conflicts = Vec::new();
    match element {
        ElementId::Message(id) => validate_message(ctx, id, &mut conflicts),
        ElementId::Field(id) => validate_field(ctx, id, &mut conflicts),
        ElementId::Oneof(id) => validate_oneof(ctx, id, &mut conflicts),
        ElementId::Enum(id) => validate_enum(ctx, id, &mut conflicts),
        ElementId::Method(id) => validate_method(ctx, id, &mut conflicts),
        ElementId::EnumValue(_) | ElementId::Service(_) => {}
    }
    if conflicts.is_empty() {
        Ok(())
    } else {
        Err(conflicts)
    }
}

/// Validates every element of the schema, in traversal order.
pub fn validate_all(ctx: &Context) -> Vec<ConflictError> {
    let conflicts = ctx
        .schema()
        .elements()
        .filter_map(|element| validate(ctx, element).err())
        .flatten()
        .collect::<Vec<_>>();
    debug!("validation found {} conflict(s)", conflicts.len());
    conflicts
}

fn validate_message(ctx: &Context, message: MessageId, conflicts: &mut Vec<ConflictError>) {
    let schema = ctx.schema();
    let element = schema.message(message);

    let unwrapped = element
        .fields
        .iter()
        .copied()
        .filter(|&field| ctx.annotations().field(field).unwrap)
        .collect::<Vec<_>>();
    match unwrapped.as_slice() {
        [] => {}
        [field] if element.fields.len() > 1 => conflicts.push(ConflictError::InvalidUnwrapTarget {
            element: element.name.clone(),
            detail: format!(
                "wrapper has fields besides its unwrap field `{}`",
                schema.field(*field).field_name
            ),
        }),
        [_] => {}
        fields => conflicts.push(ConflictError::InvalidUnwrapTarget {
            element: element.name.clone(),
            detail: format!(
                "only one field may be annotated unwrap, found {}",
                fields
                    .iter()
                    .map(|&field| &schema.field(field).field_name)
                    .join(", ")
            ),
        }),
    }

    // Flattened members share the parent's namespace.
    let mut seen = HashMap::new();
    for member in member_names(ctx, message) {
        let owner = member.via.unwrap_or(member.field);
        match seen.get(&member.json_name) {
            Some(&first) => conflicts.push(ConflictError::FlattenCollision {
                element: schema.field(owner).name.clone(),
                name: member.json_name.clone(),
                detail: format!("the member produced by `{}`", schema.field(first).name),
            }),
            None => {
                seen.insert(member.json_name, owner);
            }
        }
    }
}

fn validate_field(ctx: &Context, field: FieldId, conflicts: &mut Vec<ConflictError>) {
    let schema = ctx.schema();
    let element = schema.field(field);
    let annotations = ctx.annotations().field(field);
    // Map fields carry the encodings of their values.
    let value = schema.field(schema.map_entry(field).map_or(field, |(_, value)| value));

    if annotations.unwrap && !element.is_repeated() {
        conflicts.push(ConflictError::InvalidUnwrapTarget {
            element: element.name.clone(),
            detail: "unwrap requires a repeated or map field".to_string(),
        });
    }

    if annotations.flatten.is_some() {
        if let Err(detail) = flatten_target(ctx, field) {
            conflicts.push(ConflictError::InvalidFlattenTarget {
                element: element.name.clone(),
                detail: detail.to_string(),
            });
        }
    }
    if annotations.stray_flatten_prefix.is_some() {
        conflicts.push(ConflictError::InvalidFlattenTarget {
            element: element.name.clone(),
            detail: "flatten_prefix requires flatten".to_string(),
        });
    }

    let mut misplaced = |annotation: &str, detail: &str| {
        conflicts.push(ConflictError::InvalidAnnotationTarget {
            element: element.name.clone(),
            annotation: annotation.to_string(),
            detail: detail.to_string(),
        })
    };
    let is_timestamp = value
        .message_target()
        .map_or(false, |target| ctx.is_timestamp(target));
    if annotations.int64_encoding.is_some() && !value.is_64_bit() {
        misplaced("int64_encoding", "applies only to 64-bit integer fields");
    }
    if annotations.enum_encoding.is_some() && value.r#type != Type::Enum {
        misplaced("enum_encoding", "applies only to enum fields");
    }
    if annotations.timestamp_format.is_some() && !is_timestamp {
        misplaced("timestamp_format", "applies only to timestamp fields");
    }
    if annotations.bytes_encoding.is_some() && value.r#type != Type::Bytes {
        misplaced("bytes_encoding", "applies only to bytes fields");
    }
    if annotations.nullable && (!element.proto3_optional || element.is_message()) {
        misplaced("nullable", "applies only to proto3 optional scalar fields");
    }
    if annotations.empty_behavior.is_some() && (element.is_repeated() || !element.is_message()) {
        misplaced("empty_behavior", "applies only to singular message fields");
    }
    if annotations.oneof_value.is_some() && element.oneof.is_none() {
        misplaced("oneof_value", "applies only to oneof members");
    }
    if annotations.query.is_some() && element.is_message() && !element.is_repeated() {
        misplaced("query", "cannot bind a message field to the query string");
    }

    // A field may request NUMBER for an enum whose values are renamed.
    if let Some(enumeration) = value.enum_target() {
        let enum_level = ctx.annotations().enumeration(enumeration).encoding;
        if annotations.enum_encoding == Some(EnumEncoding::Number)
            && enum_level != Some(EnumEncoding::Number)
            && has_value_overrides(ctx, enumeration)
        {
            conflicts.push(ConflictError::EnumEncodingConflict {
                element: schema.enumeration(enumeration).name.clone(),
                field: Some(element.name.clone()),
            });
        }
    }
}

fn has_value_overrides(ctx: &Context, enumeration: EnumId) -> bool {
    ctx.schema()
        .enumeration(enumeration)
        .values
        .iter()
        .any(|&value| ctx.annotations().enum_value(value).name.is_some())
}

fn validate_enum(ctx: &Context, enumeration: EnumId, conflicts: &mut Vec<ConflictError>) {
    if ctx.annotations().enumeration(enumeration).encoding == Some(EnumEncoding::Number)
        && has_value_overrides(ctx, enumeration)
    {
        conflicts.push(ConflictError::EnumEncodingConflict {
            element: ctx.schema().enumeration(enumeration).name.clone(),
            field: None,
        });
    }
}

fn validate_oneof(ctx: &Context, oneof: OneofId, conflicts: &mut Vec<ConflictError>) {
    if !is_discriminated(ctx, oneof) {
        return;
    }
    let discriminator: &Discriminator = match &ctx.annotations().oneof(oneof).discriminator {
        Some(discriminator) => discriminator,
        None => return,
    };
    let schema = ctx.schema();
    let element = schema.oneof(oneof);
    let invalid = |detail: String| ConflictError::InvalidDiscriminator {
        element: element.name.clone(),
        detail,
    };

    let cases = element
        .fields
        .iter()
        .map(|&field| schema.field(field).field_name.as_str())
        .collect::<Vec<_>>();
    let mut mapped = HashSet::new();
    for variant in &discriminator.variants {
        if !cases.contains(&variant.case.as_str()) {
            conflicts.push(ConflictError::UnknownOneofCase {
                element: element.name.clone(),
                case: variant.case.clone(),
            });
        } else if !mapped.insert(variant.case.as_str()) {
            conflicts.push(invalid(format!(
                "case `{}` is mapped more than once",
                variant.case
            )));
        }
    }

    let literals = variant_literals(ctx, oneof, discriminator);
    for variant in &literals {
        if let (Some(config), Some(field)) = (&variant.config_literal, &variant.field_literal) {
            if config != field {
                conflicts.push(invalid(format!(
                    "case `{}` is mapped to `{}` but its oneof_value is `{}`",
                    variant.case, config, field
                )));
            }
        }
    }
    let mut first_use = HashMap::new();
    for variant in &literals {
        match first_use.get(variant.literal.as_str()) {
            Some(&first) => conflicts.push(ConflictError::DuplicateDiscriminatorValue {
                element: element.name.clone(),
                value: variant.literal.clone(),
                first: String::from(first),
                second: variant.case.clone(),
            }),
            None => {
                first_use.insert(variant.literal.as_str(), variant.case.as_str());
            }
        }
    }

    let parent_names = member_names(ctx, element.message)
        .into_iter()
        .map(|member| member.json_name)
        .collect::<Vec<_>>();
    if parent_names.contains(&discriminator.name) {
        conflicts.push(invalid(format!(
            "discriminator `{}` collides with a field of {}",
            discriminator.name,
            schema.message(element.message).name
        )));
    }

    if !discriminator.flatten {
        return;
    }
    for variant in &literals {
        let field = schema.field(variant.field);
        let target = match flattened_variant(ctx, variant.field) {
            Ok(target) => target,
            Err(detail) => {
                conflicts.push(invalid(format!(
                    "variant `{}` cannot be flattened: {}",
                    variant.case, detail
                )));
                continue;
            }
        };
        for child in member_names(ctx, target) {
            let detail = if child.json_name == discriminator.name {
                Some("the discriminator".to_string())
            } else if parent_names.contains(&child.json_name) {
                Some(format!("a field of {}", schema.message(element.message).name))
            } else {
                None
            };
            if let Some(detail) = detail {
                conflicts.push(ConflictError::FlattenCollision {
                    element: field.name.clone(),
                    name: child.json_name,
                    detail,
                });
            }
        }
    }
}

fn validate_method(ctx: &Context, method: MethodId, conflicts: &mut Vec<ConflictError>) {
    let (_, errors) = merge_headers(ctx, method);
    conflicts.extend(errors);
    let (_, errors) = build_binding(ctx, method);
    conflicts.extend(errors);
}
