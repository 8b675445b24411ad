use log::debug;

use self::oneof::is_discriminated;
use super::{FieldPlan, Member, MemberSource, MessagePlan, Placement, Representation, Resolution};
use crate::annotations::EnumEncoding;
use crate::context::Context;
use crate::error::Error;
use crate::fully_qualified_name::FullyQualifiedName;
use crate::kind::{FieldKind, ScalarValue};
use crate::unwrap_index::{resolve_field_shape, resolve_message_shape};
use crate::walker::{FieldId, MessageId};

pub(crate) mod oneof;

/// Returns the message a flatten annotation on `field` would inline, or why it cannot.
pub(crate) fn flatten_target(ctx: &Context, field: FieldId) -> Result<MessageId, &'static str> {
    let element = ctx.schema().field(field);
    if element.is_repeated() {
        return Err("flatten cannot be applied to repeated or map fields");
    }
    if !element.is_message() {
        return Err("flatten requires a message-typed field");
    }
    if element.oneof.is_some() {
        return Err("flatten cannot be applied to oneof members");
    }
    let target = element
        .message_target()
        .ok_or("flatten target type is not resolved")?;
    inline_target(ctx, target)
}

/// Checks that the fields of `target` can be spliced into another object.
///
/// Timestamps and unwrap wrappers have no object form. A discriminated oneof of `target` has
/// no place among the members of the object it would be inlined into.
pub(crate) fn inline_target(ctx: &Context, target: MessageId) -> Result<MessageId, &'static str> {
    let schema = ctx.schema();
    let message = schema.message(target);
    if ctx.is_timestamp(target) {
        return Err("flatten cannot be applied to timestamp fields");
    }
    if ctx.unwrap_index().contains(&message.name) {
        return Err("flatten cannot be applied to an unwrap wrapper");
    }
    if message
        .oneofs
        .iter()
        .any(|&oneof| is_discriminated(ctx, oneof))
    {
        return Err("flatten cannot inline a message with a discriminated oneof");
    }
    Ok(target)
}

/// A JSON property name of a message object and the field that produces it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MemberName {
    pub json_name: String,
    pub field: FieldId,
    /// The flattened field the member was inlined through.
    pub via: Option<FieldId>,
}

/// The base members of `message`: every field outside a discriminated oneof, with valid
/// flatten fields replaced by all of their target's fields. Flatten expands exactly one level.
pub(crate) fn member_names(ctx: &Context, message: MessageId) -> Vec<MemberName> {
    let schema = ctx.schema();
    let annotations = ctx.annotations();
    let mut names = Vec::new();

    let in_union = |field: FieldId| {
        schema
            .field(field)
            .oneof
            .map_or(false, |oneof| is_discriminated(ctx, oneof))
    };

    for &field in &schema.message(message).fields {
        if in_union(field) {
            continue;
        }
        let element = schema.field(field);
        let flatten = annotations
            .field(field)
            .flatten
            .as_ref()
            .and_then(|prefix| Some((prefix, flatten_target(ctx, field).ok()?)));
        match flatten {
            Some((prefix, target)) => {
                for &child in &schema.message(target).fields {
                    names.push(MemberName {
                        json_name: format!("{}{}", prefix, schema.field(child).json_name),
                        field: child,
                        via: Some(field),
                    });
                }
            }
            None => names.push(MemberName {
                json_name: element.json_name.clone(),
                field,
                via: None,
            }),
        }
    }
    names
}

impl Resolution {
    pub(super) fn build_field_plan(&self, field: FieldId) -> Result<FieldPlan, Error> {
        let ctx = &self.ctx;
        let schema = ctx.schema();
        let element = schema.field(field);
        let annotations = ctx.annotations().field(field);

        let kind = resolve_field_shape(ctx, field)?;
        let shape = kind.shape();
        let singular_message = !element.is_repeated() && element.is_message();

        let zero_value = match &kind {
            FieldKind::Enum(_, EnumEncoding::String) => element
                .enum_target()
                .map(|enumeration| self.plan_enum(enumeration))
                .and_then(|plan| plan.zero_literal().map(|l| ScalarValue::Text(l.to_string()))),
            other => other.scalar_zero(),
        };

        let plan = FieldPlan {
            name: element.name.clone(),
            field_name: element.field_name.clone(),
            json_name: element.json_name.clone(),
            number: element.number,
            shape,
            nullable: element.proto3_optional || singular_message || element.oneof.is_some(),
            explicit_null: annotations.nullable,
            boxed: ctx.message_graph().is_recursive_field(schema, field),
            collapsed: self.collapsed_wrapper(field),
            flatten: annotations.flatten.clone(),
            oneof: element.oneof.map(|oneof| schema.oneof(oneof).name.clone()),
            query: annotations.query.clone(),
            empty_behavior: annotations.empty_behavior.unwrap_or_default(),
            examples: annotations.examples.clone(),
            zero_value,
            precision_risk: kind.has_precision_risk(),
            kind,
        };
        debug!("planned field {}: {:?}", plan.name, plan.kind);
        Ok(plan)
    }

    /// The wrapper message elided from `field`'s kind: its message type, or its map value type,
    /// when that message is a registered wrapper.
    fn collapsed_wrapper(&self, field: FieldId) -> Option<FullyQualifiedName> {
        let schema = self.schema();
        let value = match schema.map_entry(field) {
            Some((_, value)) => value,
            None => field,
        };
        let target = schema.field(value).message_target()?;
        let name = &schema.message(target).name;
        self.unwrap_index().contains(name).then(|| name.clone())
    }

    /// Plans each member, recording how it was reached.
    pub(super) fn plan_members(
        &self,
        names: Vec<MemberName>,
        outer: Option<FieldId>,
    ) -> Result<Vec<Member>, Error> {
        let schema = self.schema();
        let annotations = self.ctx.annotations();
        names
            .into_iter()
            .map(|member| {
                let source = match (member.via, outer) {
                    (Some(via), _) => MemberSource::Flattened {
                        via: schema.field(via).name.clone(),
                        prefix: annotations.field(via).flatten.clone().unwrap_or_default(),
                    },
                    (None, Some(outer)) => MemberSource::Flattened {
                        via: schema.field(outer).name.clone(),
                        prefix: String::new(),
                    },
                    (None, None) => MemberSource::Direct,
                };
                Ok(Member {
                    json_name: member.json_name,
                    plan: self.plan_field(member.field)?,
                    source,
                })
            })
            .collect()
    }

    pub(super) fn build_message_plan(&self, message: MessageId) -> Result<MessagePlan, Error> {
        let ctx = &self.ctx;
        let element = ctx.schema().message(message);
        debug!("planning message {}", element.name);

        let members = self.plan_members(member_names(ctx, message), None)?;

        let mut unions = Vec::new();
        for &oneof in &element.oneofs {
            if let Some(union) = self.plan_oneof(oneof)? {
                unions.push(union);
            }
        }

        let representation = if ctx.unwrap_index().contains(&element.name) {
            Representation::Unwrapped(resolve_message_shape(ctx, message)?)
        } else if unions
            .iter()
            .any(|union| union.placement == Placement::Intersected)
        {
            Representation::Intersection
        } else {
            Representation::Object
        };

        Ok(MessagePlan {
            name: element.name.clone(),
            representation,
            members,
            unions,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::annotations::{Binding, Int64Encoding, TimestampFormat};
    use crate::descriptor::{
        EnumDescriptor, EnumValueDescriptor, FieldDescriptor, FileDescriptor, MessageDescriptor,
        Type,
    };
    use crate::kind::{ScalarKind, Shape};
    use crate::options::OptionValue;
    use crate::Config;
    use pretty_assertions::assert_eq;

    fn ext(name: &str) -> String {
        format!("sebuf.http.{}", name)
    }

    fn resolve(files: Vec<FileDescriptor>) -> Resolution {
        Config::new().resolve(files)
    }

    fn timestamp_file() -> FileDescriptor {
        FileDescriptor::new("google/protobuf/timestamp.proto", "google.protobuf")
            .imported()
            .message(
                MessageDescriptor::new("Timestamp")
                    .field(FieldDescriptor::new("seconds", 1, Type::Int64))
                    .field(FieldDescriptor::new("nanos", 2, Type::Int32)),
            )
    }

    #[test]
    fn test_scalar_encodings() {
        let resolution = resolve(vec![
            timestamp_file(),
            FileDescriptor::new("event.proto", "pkg").message(
                MessageDescriptor::new("Event")
                    .field(FieldDescriptor::new("id", 1, Type::Int64))
                    .field(
                        FieldDescriptor::new("count", 2, Type::Uint64)
                            .option(ext("int64_encoding"), OptionValue::ident("NUMBER")),
                    )
                    .field(FieldDescriptor::message(
                        "created_at",
                        3,
                        ".google.protobuf.Timestamp",
                    ))
                    .field(
                        FieldDescriptor::message("updated_at", 4, ".google.protobuf.Timestamp")
                            .option(ext("timestamp_format"), OptionValue::ident("UNIX_MILLIS")),
                    )
                    .field(
                        FieldDescriptor::new("payload", 5, Type::Bytes)
                            .option(ext("bytes_encoding"), OptionValue::ident("HEX")),
                    )
                    .field(FieldDescriptor::new("ok", 6, Type::Bool)),
            ),
        ]);
        let plan = |name: &str| resolution.plan(&name.into()).unwrap();

        let id = plan(".pkg.Event.id");
        assert_eq!(id.shape, Shape::Textual);
        assert_eq!(id.zero_value, Some(ScalarValue::Text("0".to_string())));
        assert!(id.is_zero(&ScalarValue::Text("0".to_string())));
        assert!(!id.is_zero(&ScalarValue::Number(0.0)));
        assert!(!id.nullable);

        let count = plan(".pkg.Event.count");
        assert_eq!(count.kind, FieldKind::Int64(ScalarKind::Uint64, Int64Encoding::Number));
        assert_eq!(count.shape, Shape::Numeric);
        assert!(count.is_zero(&ScalarValue::Number(0.0)));
        assert!(count.precision_risk);

        let created = plan(".pkg.Event.created_at");
        assert_eq!(created.kind, FieldKind::Timestamp(TimestampFormat::Rfc3339));
        assert_eq!(created.shape, Shape::Textual);
        assert!(created.nullable);
        assert_eq!(plan(".pkg.Event.updated_at").shape, Shape::Numeric);
        assert_eq!(plan(".pkg.Event.payload").shape, Shape::Textual);
        assert_eq!(
            plan(".pkg.Event.ok").zero_value,
            Some(ScalarValue::Bool(false))
        );
    }

    #[test]
    fn test_enum_field_zero_and_encoding_override() {
        let resolution = resolve(vec![FileDescriptor::new("s.proto", "pkg")
            .enumeration(
                EnumDescriptor::new("Status")
                    .value(EnumValueDescriptor::new("STATUS_UNSPECIFIED", 0))
                    .value(
                        EnumValueDescriptor::new("STATUS_ACTIVE", 1)
                            .option(ext("enum_value"), OptionValue::string("active")),
                    ),
            )
            .enumeration(
                EnumDescriptor::new("Level")
                    .value(EnumValueDescriptor::new("LEVEL_LOW", 0))
                    .option(ext("enum_encoding"), OptionValue::ident("NUMBER")),
            )
            .message(
                MessageDescriptor::new("User")
                    .field(FieldDescriptor::enumeration("status", 1, "Status"))
                    .field(FieldDescriptor::enumeration("level", 2, "Level"))
                    .field(
                        FieldDescriptor::enumeration("level_name", 3, "Level")
                            .option(ext("enum_encoding"), OptionValue::ident("STRING")),
                    ),
            )]);
        let plan = |name: &str| resolution.plan(&name.into()).unwrap();

        let status = plan(".pkg.User.status");
        assert_eq!(status.shape, Shape::Textual);
        assert_eq!(
            status.zero_value,
            Some(ScalarValue::Text("STATUS_UNSPECIFIED".to_string()))
        );
        assert_eq!(plan(".pkg.User.level").shape, Shape::Numeric);
        assert_eq!(plan(".pkg.User.level_name").shape, Shape::Textual);
    }

    #[test]
    fn test_flatten_members() {
        let resolution = resolve(vec![FileDescriptor::new("o.proto", "pkg")
            .message(
                MessageDescriptor::new("Address")
                    .field(FieldDescriptor::new("street", 1, Type::String))
                    .field(FieldDescriptor::new("zip_code", 2, Type::String)),
            )
            .message(
                MessageDescriptor::new("Order")
                    .field(FieldDescriptor::new("id", 1, Type::String))
                    .field(
                        FieldDescriptor::message("billing", 2, "Address")
                            .option(ext("flatten"), OptionValue::Bool(true))
                            .option(ext("flatten_prefix"), OptionValue::string("billing_")),
                    )
                    .field(
                        FieldDescriptor::new("page", 3, Type::Int32).option(
                            ext("query"),
                            OptionValue::aggregate([("name", OptionValue::string("p"))]),
                        ),
                    ),
            )]);
        assert!(resolution.validate_all().is_empty());

        let plan = resolution.plan_message_named(&".pkg.Order".into()).unwrap();
        assert_eq!(plan.representation, Representation::Object);
        let names = plan
            .members
            .iter()
            .map(|member| member.json_name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["id", "billing_street", "billing_zipCode", "page"]);
        assert_eq!(
            plan.members[1].source,
            MemberSource::Flattened {
                via: ".pkg.Order.billing".into(),
                prefix: "billing_".to_string(),
            }
        );
        assert_eq!(
            plan.members[3].plan.query,
            Some(Binding::Query {
                name: "p".to_string(),
                required: false
            })
        );
    }

    #[test]
    fn test_recursive_field_is_boxed() {
        let resolution = resolve(vec![FileDescriptor::new("t.proto", "pkg").message(
            MessageDescriptor::new("Node")
                .field(FieldDescriptor::message("next", 1, "Node"))
                .field(FieldDescriptor::message("children", 2, "Node").repeated()),
        )]);
        assert!(resolution.plan(&".pkg.Node.next".into()).unwrap().boxed);
        assert!(!resolution.plan(&".pkg.Node.children".into()).unwrap().boxed);
    }

    #[test]
    fn test_plans_are_memoized() {
        let resolution = resolve(vec![FileDescriptor::new("t.proto", "pkg").message(
            MessageDescriptor::new("Msg").field(FieldDescriptor::new("id", 1, Type::Int64)),
        )]);
        let first = resolution.plan(&".pkg.Msg.id".into()).unwrap();
        let second = resolution.plan(&".pkg.Msg.id".into()).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(resolution.plan(&".pkg.Msg.missing".into()).is_err());
    }
}
