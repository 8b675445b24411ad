//! The cross-file resolver.
//!
//! Phase one scans every message of every loaded file, generated or merely imported, and
//! records each unwrap wrapper in a [`GlobalUnwrapIndex`]. The index is only obtainable from
//! [`UnwrapIndexBuilder::build`], so nothing can read it while it is still being filled.
//!
//! Phase two, [`resolve_field_shape`], computes a field's [`FieldKind`] and looks every message
//! reference up in the index by fully-qualified name, collapsing wrappers into the kind of their
//! unwrap field.

use std::collections::BTreeMap;

use log::trace;

use crate::annotations::{Annotations, EnumEncoding, FieldAnnotations};
use crate::context::Context;
use crate::descriptor::Type;
use crate::error::ResolutionError;
use crate::fully_qualified_name::FullyQualifiedName;
use crate::kind::{FieldKind, ScalarKind};
use crate::walker::{FieldId, MessageId, Schema, TypeRef};

/// A registered wrapper message and its single unwrap field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnwrapEntry {
    pub message: MessageId,
    pub field: FieldId,
}

/// Collects wrapper messages. Consumed by [`UnwrapIndexBuilder::build`].
#[derive(Debug, Default)]
pub struct UnwrapIndexBuilder {
    entries: BTreeMap<FullyQualifiedName, UnwrapEntry>,
}

impl UnwrapIndexBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers every wrapper in `schema`: a message with exactly one field, where that field
    /// is annotated `unwrap` and is repeated or a map.
    ///
    /// Messages that break the rule are not indexed; the validator reports them.
    pub fn scan(&mut self, schema: &Schema, annotations: &Annotations) -> &mut Self {
        for (id, message) in schema.messages() {
            let field = match message.fields.as_slice() {
                [field] => *field,
                _ => continue,
            };
            if annotations.field(field).unwrap && schema.field(field).is_repeated() {
                self.insert(message.name.clone(), UnwrapEntry { message: id, field });
            }
        }
        self
    }

    pub fn insert(&mut self, message: FullyQualifiedName, entry: UnwrapEntry) -> &mut Self {
        trace!("registering unwrap wrapper {}", message);
        self.entries.insert(message, entry);
        self
    }

    pub fn build(self) -> GlobalUnwrapIndex {
        GlobalUnwrapIndex {
            entries: self.entries,
        }
    }
}

/// Read-only map from wrapper message name to its unwrap field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlobalUnwrapIndex {
    entries: BTreeMap<FullyQualifiedName, UnwrapEntry>,
}

impl GlobalUnwrapIndex {
    /// Builds the index over the whole loaded schema.
    pub fn build(schema: &Schema, annotations: &Annotations) -> GlobalUnwrapIndex {
        let mut builder = UnwrapIndexBuilder::new();
        builder.scan(schema, annotations);
        builder.build()
    }

    pub fn get(&self, message: &FullyQualifiedName) -> Option<&UnwrapEntry> {
        self.entries.get(message)
    }

    pub fn contains(&self, message: &FullyQualifiedName) -> bool {
        self.entries.contains_key(message)
    }

    /// Wrappers in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&FullyQualifiedName, &UnwrapEntry)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Resolves the externally visible kind of `field`.
///
/// Maps resolve to `Map(key, value)` and repeated fields to `List(element)`. A reference to a
/// registered wrapper message is replaced by the kind of the wrapper's unwrap field, so a
/// `map<string, BarList>` whose `BarList` wraps `repeated Bar` becomes `Map(String, List(Bar))`.
pub fn resolve_field_shape(ctx: &Context, field: FieldId) -> Result<FieldKind, ResolutionError> {
    Collapser {
        ctx,
        seen: Vec::new(),
    }
    .field_kind(field)
}

/// Resolves a message reference through the index, as used for method inputs and outputs.
pub fn resolve_message_shape(
    ctx: &Context,
    message: MessageId,
) -> Result<FieldKind, ResolutionError> {
    Collapser {
        ctx,
        seen: Vec::new(),
    }
    .collapse(message)
}

struct Collapser<'a> {
    ctx: &'a Context,
    /// Wrappers being collapsed; a wrapper reached again through itself stays a message.
    seen: Vec<MessageId>,
}

impl Collapser<'_> {
    fn field_kind(&mut self, id: FieldId) -> Result<FieldKind, ResolutionError> {
        let ctx = self.ctx;
        let schema = ctx.schema();
        let annotations = ctx.annotations().field(id);

        if let Some((key, value)) = schema.map_entry(id) {
            let key = ScalarKind::from_type(schema.field(key).r#type).unwrap_or(ScalarKind::String);
            let value = self.element_kind(value, annotations)?;
            return Ok(FieldKind::Map(key, Box::new(value)));
        }

        let element = self.element_kind(id, annotations)?;
        if schema.field(id).is_repeated() {
            Ok(FieldKind::List(Box::new(element)))
        } else {
            Ok(element)
        }
    }

    /// The kind of a single value of `id`, with encodings taken from `annotations` (which, for
    /// map values, belong to the map field rather than the synthetic entry field).
    fn element_kind(
        &mut self,
        id: FieldId,
        annotations: &FieldAnnotations,
    ) -> Result<FieldKind, ResolutionError> {
        let ctx = self.ctx;
        let schema = ctx.schema();
        let field = schema.field(id);
        let unresolved = || ResolutionError::UnresolvedType {
            element: field.name.clone(),
            type_name: field.type_name.clone().unwrap_or_default(),
        };

        match field.r#type {
            Type::Message | Type::Group => {
                let message = match field.target {
                    Some(TypeRef::Message(message)) => message,
                    _ => return Err(unresolved()),
                };
                if ctx.is_timestamp(message) {
                    return Ok(FieldKind::Timestamp(
                        annotations.timestamp_format.unwrap_or_default(),
                    ));
                }
                self.collapse(message)
            }
            Type::Enum => {
                let enumeration = field.enum_target().ok_or_else(unresolved)?;
                let encoding = annotations
                    .enum_encoding
                    .or(ctx.annotations().enumeration(enumeration).encoding)
                    .unwrap_or(EnumEncoding::String);
                Ok(FieldKind::Enum(
                    schema.enumeration(enumeration).name.clone(),
                    encoding,
                ))
            }
            Type::Bytes => Ok(FieldKind::Bytes(annotations.bytes_encoding.unwrap_or_default())),
            ty => match ScalarKind::from_type(ty) {
                Some(scalar) if scalar.is_64_bit() => Ok(FieldKind::Int64(
                    scalar,
                    annotations.int64_encoding.unwrap_or_default(),
                )),
                Some(scalar) => Ok(FieldKind::Scalar(scalar)),
                None => Err(unresolved()),
            },
        }
    }

    fn collapse(&mut self, message: MessageId) -> Result<FieldKind, ResolutionError> {
        let ctx = self.ctx;
        let name = &ctx.schema().message(message).name;
        let entry = match ctx.unwrap_index().get(name) {
            Some(entry) if !self.seen.contains(&message) => *entry,
            _ => return Ok(FieldKind::Message(name.clone())),
        };
        trace!("collapsing wrapper {}", name);
        self.seen.push(message);
        let collapsed = self.field_kind(entry.field);
        self.seen.pop();
        collapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{FieldDescriptor, FileDescriptor, MessageDescriptor};
    use crate::options::OptionValue;
    use crate::Config;
    use pretty_assertions::assert_eq;

    fn unwrap_field(name: &str, number: i32, type_name: &str) -> FieldDescriptor {
        FieldDescriptor::message(name, number, type_name)
            .repeated()
            .option("sebuf.http.unwrap", OptionValue::Bool(true))
    }

    fn context(files: Vec<FileDescriptor>) -> Context {
        Context::new(Config::new(), Schema::walk(files))
    }

    #[test]
    fn test_index_only_holds_single_field_wrappers() {
        let ctx = context(vec![FileDescriptor::new("a.proto", "pkg")
            .message(MessageDescriptor::new("Bar"))
            .message(MessageDescriptor::new("BarList").field(unwrap_field("bars", 1, "Bar")))
            .message(
                MessageDescriptor::new("TwoFields")
                    .field(unwrap_field("bars", 1, "Bar"))
                    .field(FieldDescriptor::new("total", 2, Type::Int32)),
            )
            .message(
                MessageDescriptor::new("Singular").field(
                    FieldDescriptor::message("bar", 1, "Bar")
                        .option("sebuf.http.unwrap", OptionValue::Bool(true)),
                ),
            )]);
        let names = ctx
            .unwrap_index()
            .iter()
            .map(|(name, _)| name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(names, vec![".pkg.BarList"]);
    }

    #[test]
    fn test_wrapper_in_imported_file_collapses() {
        let ctx = context(vec![
            FileDescriptor::new("bar.proto", "pkg")
                .imported()
                .message(MessageDescriptor::new("Bar"))
                .message(MessageDescriptor::new("BarList").field(unwrap_field("bars", 1, "Bar"))),
            FileDescriptor::new("response.proto", "pkg").message(
                MessageDescriptor::new("Response")
                    .map_field("bars", 1, Type::String, Type::Message, Some(".pkg.BarList"))
                    .field(FieldDescriptor::message("list", 2, "BarList"))
                    .field(FieldDescriptor::message("lists", 3, "BarList").repeated()),
            ),
        ]);
        let field = |name: &str| ctx.schema().lookup_field(&name.into()).unwrap();
        let bar = || Box::new(FieldKind::Message(".pkg.Bar".into()));

        assert_eq!(
            resolve_field_shape(&ctx, field(".pkg.Response.bars")).unwrap(),
            FieldKind::Map(ScalarKind::String, Box::new(FieldKind::List(bar())))
        );
        assert_eq!(
            resolve_field_shape(&ctx, field(".pkg.Response.list")).unwrap(),
            FieldKind::List(bar())
        );
        assert_eq!(
            resolve_field_shape(&ctx, field(".pkg.Response.lists")).unwrap(),
            FieldKind::List(Box::new(FieldKind::List(bar())))
        );
    }

    #[test]
    fn test_self_referencing_wrapper_terminates() {
        let ctx = context(vec![FileDescriptor::new("a.proto", "pkg").message(
            MessageDescriptor::new("Tree").field(unwrap_field("children", 1, "Tree")),
        )]);
        let tree = ctx.schema().lookup_message(&".pkg.Tree".into()).unwrap();
        assert_eq!(
            resolve_message_shape(&ctx, tree).unwrap(),
            FieldKind::List(Box::new(FieldKind::Message(".pkg.Tree".into())))
        );
    }
}
