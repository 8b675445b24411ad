//! Plans: the resolved, emitter-facing model.
//!
//! A [`Resolution`] owns one run. It is created from a [`Context`] after the global unwrap index
//! is complete, runs the validator once, and then computes field, message, oneof and enum plans
//! lazily on first request. Plans are cached in per-element cells and handed out as `Arc`s, so
//! the same element always yields the same plan for the rest of the run. `Resolution` is `Sync`;
//! emitters may share it across threads.

use std::sync::Arc;

use log::{debug, warn};
use once_cell::sync::OnceCell;

use crate::annotations::{Binding, EmptyBehavior, EnumEncoding, HeaderRequirement, HttpMethod};
use crate::context::Context;
use crate::diagnostics::{self, Diagnostic};
use crate::error::{ConflictError, Error, ResolutionError};
use crate::fully_qualified_name::FullyQualifiedName;
use crate::kind::{FieldKind, ScalarValue, Shape};
use crate::unwrap_index::GlobalUnwrapIndex;
use crate::validate;
use crate::walker::{
    ElementId, EnumId, FieldId, FileId, MessageId, MethodId, OneofId, Schema, ServiceId,
};

mod enums;
mod messages;
mod services;

pub(crate) use messages::oneof::{flattened_variant, is_discriminated, variant_literals};
pub(crate) use messages::{flatten_target, member_names};
pub(crate) use services::{build_binding, merge_headers};

/// The resolved description of one field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldPlan {
    pub name: FullyQualifiedName,
    pub field_name: String,
    pub json_name: String,
    pub number: i32,
    pub kind: FieldKind,
    pub shape: Shape,
    /// The field may be absent: proto3 `optional`, a singular message, or a oneof member.
    pub nullable: bool,
    /// Absence is written as an explicit JSON `null`.
    pub explicit_null: bool,
    /// A singular message field that (transitively) contains its own message.
    pub boxed: bool,
    /// The wrapper message elided by unwrap collapsing, if any.
    pub collapsed: Option<FullyQualifiedName>,
    /// The flatten prefix, when the field is inlined into its parent.
    pub flatten: Option<String>,
    pub oneof: Option<FullyQualifiedName>,
    pub query: Option<Binding>,
    pub empty_behavior: EmptyBehavior,
    pub examples: Vec<String>,
    /// The field's default value in its resolved shape; `None` for messages and collections.
    pub zero_value: Option<ScalarValue>,
    /// A NUMBER-encoded 64-bit integer is part of the kind.
    pub precision_risk: bool,
}

impl FieldPlan {
    /// Returns `true` if `value` is the field's default, judged by its resolved shape: a
    /// textual 64-bit integer is zero only as the string `"0"`, a numeric one only as `0`.
    pub fn is_zero(&self, value: &ScalarValue) -> bool {
        match (&self.zero_value, value) {
            (Some(ScalarValue::Text(zero)), ScalarValue::Text(value)) => zero == value,
            (Some(ScalarValue::Number(_)), ScalarValue::Number(value)) => *value == 0.0,
            (Some(ScalarValue::Bool(_)), ScalarValue::Bool(value)) => !*value,
            _ => false,
        }
    }
}

/// Where a member of a message's JSON object comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberSource {
    Direct,
    /// Inlined from the message-typed field `via`.
    Flattened {
        via: FullyQualifiedName,
        prefix: String,
    },
}

/// One property of a message's JSON object.
#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub json_name: String,
    pub plan: Arc<FieldPlan>,
    pub source: MemberSource,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Representation {
    /// A wrapper message, written as the kind of its unwrap field.
    Unwrapped(FieldKind),
    /// A single object with `members` (and any union placed as a property).
    Object,
    /// The intersection of an object with `members` and each of the message's unions.
    Intersection,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MessagePlan {
    pub name: FullyQualifiedName,
    pub representation: Representation,
    /// Base members in declaration order; discriminated oneof members are in `unions` instead.
    pub members: Vec<Member>,
    pub unions: Vec<Arc<UnionPlan>>,
}

/// How a union is attached to its message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    /// Nested under a property of the message object.
    Property(String),
    /// Intersected with the message's base object.
    Intersected,
}

#[derive(Debug, Clone, PartialEq)]
pub enum VariantPayload {
    /// The payload message's fields sit next to the discriminator.
    Flattened(Vec<Member>),
    /// The payload sits under an optional property named after the case.
    Nested {
        property: String,
        plan: Arc<FieldPlan>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariantPlan {
    /// The oneof member field name.
    pub case: String,
    /// The discriminator value identifying this variant.
    pub literal: String,
    pub field: Arc<FieldPlan>,
    pub payload: VariantPayload,
}

/// The tagged-union layout of a discriminated oneof.
#[derive(Debug, Clone, PartialEq)]
pub struct UnionPlan {
    pub name: FullyQualifiedName,
    /// Parent message name followed by the oneof name in upper camel case.
    pub type_name: String,
    pub discriminator: String,
    pub flatten: bool,
    pub placement: Placement,
    /// Variants in oneof declaration order.
    pub variants: Vec<VariantPlan>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumValuePlan {
    pub name: String,
    pub number: i32,
    /// The JSON literal: the `enum_value` override if present, else the declared name.
    pub literal: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumPlan {
    pub name: FullyQualifiedName,
    /// The enum-level encoding; fields may override it.
    pub encoding: EnumEncoding,
    pub values: Vec<EnumValuePlan>,
}

impl EnumPlan {
    pub fn literal(&self, number: i32) -> Option<&str> {
        self.values
            .iter()
            .find(|value| value.number == number)
            .map(|value| value.literal.as_str())
    }

    /// The literal of the default value (numbered 0, or the first declared).
    pub fn zero_literal(&self) -> Option<&str> {
        self.literal(0)
            .or_else(|| self.values.first().map(|value| value.literal.as_str()))
    }
}

/// A bound path placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathParam {
    pub name: String,
    pub field: Option<FullyQualifiedName>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryParam {
    pub name: String,
    pub field: FullyQualifiedName,
    pub required: bool,
}

/// How a method's request message maps onto an HTTP request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpBinding {
    pub method: HttpMethod,
    pub path: String,
    pub path_params: Vec<PathParam>,
    pub query_params: Vec<QueryParam>,
    /// Request fields carried in the body, in declaration order.
    pub body_fields: Vec<FullyQualifiedName>,
}

type Cell<T> = OnceCell<Result<T, Error>>;

/// A single resolution run over a loaded schema.
#[derive(Debug)]
pub struct Resolution {
    ctx: Context,
    fields: Vec<Cell<Arc<FieldPlan>>>,
    messages: Vec<Cell<Arc<MessagePlan>>>,
    oneofs: Vec<Cell<Option<Arc<UnionPlan>>>>,
    enums: Vec<OnceCell<Arc<EnumPlan>>>,
    conflicts: Vec<ConflictError>,
    errors: Vec<Error>,
    diagnostics: Vec<Diagnostic>,
}

fn cells<T>(len: usize) -> Vec<OnceCell<T>> {
    std::iter::repeat_with(OnceCell::new).take(len).collect()
}

impl Resolution {
    pub fn new(ctx: Context) -> Resolution {
        let conflicts = validate::validate_all(&ctx);
        let diagnostics = if ctx.config().precision_diagnostics_enabled() {
            diagnostics::collect(&ctx)
        } else {
            Vec::new()
        };
        for diagnostic in &diagnostics {
            warn!("{}", diagnostic);
        }

        let errors = ctx
            .annotations()
            .decoding_errors()
            .iter()
            .cloned()
            .map(Error::from)
            .chain(conflicts.iter().cloned().map(Error::from))
            .chain(
                ctx.schema()
                    .resolution_errors()
                    .iter()
                    .cloned()
                    .map(Error::from),
            )
            .collect::<Vec<_>>();
        debug!(
            "resolution ready: {} conflict(s), {} error(s), {} diagnostic(s)",
            conflicts.len(),
            errors.len(),
            diagnostics.len()
        );

        let schema = ctx.schema();
        Resolution {
            fields: cells(schema.field_count()),
            messages: cells(schema.message_count()),
            oneofs: cells(schema.oneof_count()),
            enums: cells(schema.enum_count()),
            ctx,
            conflicts,
            errors,
            diagnostics,
        }
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    pub fn schema(&self) -> &Schema {
        self.ctx.schema()
    }

    pub fn unwrap_index(&self) -> &GlobalUnwrapIndex {
        self.ctx.unwrap_index()
    }

    /// Every annotation conflict in the loaded schema, in element traversal order.
    pub fn validate_all(&self) -> &[ConflictError] {
        &self.conflicts
    }

    /// Every error of the run: decoding errors, conflicts and unresolved references.
    pub fn errors(&self) -> &[Error] {
        &self.errors
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Files for which output was requested.
    pub fn files_to_generate(&self) -> impl Iterator<Item = FileId> + '_ {
        self.schema()
            .files()
            .filter(|(_, file)| file.generate)
            .map(|(id, _)| id)
    }

    /// Errors blocking generation of `file`.
    pub fn errors_for_file(&self, file: FileId) -> Vec<&Error> {
        self.errors
            .iter()
            .filter(|error| {
                self.error_elements(error)
                    .any(|element| self.schema().file_of(element) == file)
            })
            .collect()
    }

    /// Errors blocking generation of `service`.
    pub fn errors_for_service(&self, service: ServiceId) -> Vec<&Error> {
        self.errors
            .iter()
            .filter(|error| {
                self.error_elements(error)
                    .any(|element| self.schema().service_of(element) == Some(service))
            })
            .collect()
    }

    /// `Ok` when `file` may be emitted; otherwise the errors that block it.
    pub fn file_status(&self, file: FileId) -> Result<(), Vec<&Error>> {
        let errors = self.errors_for_file(file);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// `Ok` when `service` may be emitted; otherwise the errors that block it.
    pub fn service_status(&self, service: ServiceId) -> Result<(), Vec<&Error>> {
        let errors = self.errors_for_service(service);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn error_elements<'a>(&'a self, error: &'a Error) -> impl Iterator<Item = ElementId> + 'a {
        let names = match error {
            Error::Conflict(conflict) => conflict.elements(),
            other => other.element().into_iter().collect(),
        };
        names
            .into_iter()
            .filter_map(move |name| self.schema().lookup(name))
    }

    /// Plans the field with the given fully-qualified name.
    pub fn plan(&self, field: &FullyQualifiedName) -> Result<Arc<FieldPlan>, Error> {
        let id = self
            .schema()
            .lookup_field(field)
            .ok_or_else(|| ResolutionError::UnknownElement(field.clone()))?;
        self.plan_field(id)
    }

    pub fn plan_field(&self, field: FieldId) -> Result<Arc<FieldPlan>, Error> {
        self.fields[field.index()]
            .get_or_init(|| self.build_field_plan(field).map(Arc::new))
            .clone()
    }

    pub fn plan_message(&self, message: MessageId) -> Result<Arc<MessagePlan>, Error> {
        self.messages[message.index()]
            .get_or_init(|| self.build_message_plan(message).map(Arc::new))
            .clone()
    }

    pub fn plan_message_named(
        &self,
        message: &FullyQualifiedName,
    ) -> Result<Arc<MessagePlan>, Error> {
        let id = self
            .schema()
            .lookup_message(message)
            .ok_or_else(|| ResolutionError::UnknownElement(message.clone()))?;
        self.plan_message(id)
    }

    /// Plans a discriminated oneof. Oneofs without a discriminator are ordinary optional
    /// field groups and yield `None`.
    pub fn plan_oneof(&self, oneof: OneofId) -> Result<Option<Arc<UnionPlan>>, Error> {
        self.oneofs[oneof.index()]
            .get_or_init(|| Ok(self.build_union_plan(oneof)?.map(Arc::new)))
            .clone()
    }

    pub fn plan_oneof_named(
        &self,
        oneof: &FullyQualifiedName,
    ) -> Result<Option<Arc<UnionPlan>>, Error> {
        let id = self
            .schema()
            .lookup_oneof(oneof)
            .ok_or_else(|| ResolutionError::UnknownElement(oneof.clone()))?;
        self.plan_oneof(id)
    }

    pub fn plan_enum(&self, enumeration: EnumId) -> Arc<EnumPlan> {
        self.enums[enumeration.index()]
            .get_or_init(|| Arc::new(self.build_enum_plan(enumeration)))
            .clone()
    }

    pub fn plan_enum_named(&self, enumeration: &FullyQualifiedName) -> Result<Arc<EnumPlan>, Error> {
        let id = self
            .schema()
            .lookup_enum(enumeration)
            .ok_or_else(|| ResolutionError::UnknownElement(enumeration.clone()))?;
        Ok(self.plan_enum(id))
    }

    /// The headers required by `method`: the union of its service's and its own requirements,
    /// sorted by name.
    pub fn effective_headers(&self, method: MethodId) -> Result<Vec<HeaderRequirement>, Error> {
        let (headers, mut conflicts) = merge_headers(&self.ctx, method);
        if conflicts.is_empty() {
            Ok(headers)
        } else {
            Err(conflicts.remove(0).into())
        }
    }

    /// The route and request binding of `method`.
    pub fn http_binding(&self, method: MethodId) -> Result<HttpBinding, Error> {
        let (binding, mut errors) = build_binding(&self.ctx, method);
        if errors.is_empty() {
            Ok(binding)
        } else {
            Err(errors.remove(0).into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_is_sync() {
        fn assert_sync<T: Send + Sync>() {}
        assert_sync::<Resolution>();
        assert_sync::<Arc<FieldPlan>>();
    }

    #[test]
    fn test_enum_plan_zero_literal() {
        let plan = EnumPlan {
            name: ".pkg.Status".into(),
            encoding: EnumEncoding::String,
            values: vec![
                EnumValuePlan {
                    name: "STATUS_ACTIVE".to_string(),
                    number: 1,
                    literal: "active".to_string(),
                },
                EnumValuePlan {
                    name: "STATUS_UNSPECIFIED".to_string(),
                    number: 0,
                    literal: "STATUS_UNSPECIFIED".to_string(),
                },
            ],
        };
        assert_eq!(plan.zero_literal(), Some("STATUS_UNSPECIFIED"));
        assert_eq!(plan.literal(1), Some("active"));
        assert_eq!(plan.literal(7), None);
    }
}
