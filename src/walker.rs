//! The descriptor walker.
//!
//! [`Schema`] is a read-only projection of every loaded file, imports included. Elements live in
//! per-kind arenas addressed by small copyable ids; cross references between elements (a field's
//! message type, a method's input) are resolved once, by fully-qualified name, while walking.
//!
//! Traversal order is stable: files in load order, and within a file every element in
//! declaration order (a message, then its fields, its oneofs, its nested messages and its
//! nested enums).

use std::collections::HashMap;

use log::{trace, warn};
use multimap::MultiMap;

use crate::descriptor::{
    EnumDescriptor, FileDescriptor, Label, MessageDescriptor, ServiceDescriptor, Syntax, Type,
};
use crate::error::ResolutionError;
use crate::fully_qualified_name::FullyQualifiedName;
use crate::ident::to_json_name;
use crate::options::RawOptions;

macro_rules! element_id {
    ($($(#[$attr:meta])* $name:ident),* $(,)?) => {
        $(
            $(#[$attr])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
            pub struct $name(usize);

            impl $name {
                pub fn index(self) -> usize {
                    self.0
                }
            }
        )*
    };
}

element_id! {
    FileId,
    MessageId,
    FieldId,
    OneofId,
    EnumId,
    EnumValueId,
    ServiceId,
    MethodId,
}

/// A handle to any named schema element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ElementId {
    Message(MessageId),
    Field(FieldId),
    Oneof(OneofId),
    Enum(EnumId),
    EnumValue(EnumValueId),
    Service(ServiceId),
    Method(MethodId),
}

/// The resolved target of a message- or enum-typed reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeRef {
    Message(MessageId),
    Enum(EnumId),
}

#[derive(Debug, Clone)]
pub struct FileElement {
    pub name: String,
    pub package: String,
    pub syntax: Syntax,
    pub generate: bool,
    pub messages: Vec<MessageId>,
    pub enums: Vec<EnumId>,
    pub services: Vec<ServiceId>,
}

#[derive(Debug, Clone)]
pub struct MessageElement {
    pub name: FullyQualifiedName,
    pub file: FileId,
    pub parent: Option<MessageId>,
    pub fields: Vec<FieldId>,
    pub oneofs: Vec<OneofId>,
    pub map_entry: bool,
    pub options: RawOptions,
}

impl MessageElement {
    /// The unqualified message name.
    pub fn message_name(&self) -> &str {
        self.name.name()
    }
}

#[derive(Debug, Clone)]
pub struct FieldElement {
    pub name: FullyQualifiedName,
    pub field_name: String,
    pub json_name: String,
    pub message: MessageId,
    pub number: i32,
    pub label: Label,
    pub r#type: Type,
    pub type_name: Option<String>,
    /// Set once the walker resolved `type_name`.
    pub target: Option<TypeRef>,
    /// The real (non-synthetic) oneof this field belongs to.
    pub oneof: Option<OneofId>,
    pub proto3_optional: bool,
    pub options: RawOptions,
}

impl FieldElement {
    pub fn is_repeated(&self) -> bool {
        self.label == Label::Repeated
    }

    pub fn is_message(&self) -> bool {
        matches!(self.r#type, Type::Message | Type::Group)
    }

    pub fn is_64_bit(&self) -> bool {
        matches!(
            self.r#type,
            Type::Int64 | Type::Uint64 | Type::Sint64 | Type::Fixed64 | Type::Sfixed64
        )
    }

    pub fn message_target(&self) -> Option<MessageId> {
        match self.target {
            Some(TypeRef::Message(id)) => Some(id),
            _ => None,
        }
    }

    pub fn enum_target(&self) -> Option<EnumId> {
        match self.target {
            Some(TypeRef::Enum(id)) => Some(id),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OneofElement {
    pub name: FullyQualifiedName,
    pub oneof_name: String,
    pub message: MessageId,
    pub fields: Vec<FieldId>,
    /// Generated by protoc for a proto3 `optional` field; never a real union.
    pub synthetic: bool,
    pub options: RawOptions,
}

#[derive(Debug, Clone)]
pub struct EnumElement {
    pub name: FullyQualifiedName,
    pub file: FileId,
    pub parent: Option<MessageId>,
    pub values: Vec<EnumValueId>,
    pub options: RawOptions,
}

#[derive(Debug, Clone)]
pub struct EnumValueElement {
    /// Keyed under the enum (`.pkg.Status.ACTIVE`) so values of different enums never clash.
    pub name: FullyQualifiedName,
    pub value_name: String,
    pub number: i32,
    pub enumeration: EnumId,
    pub options: RawOptions,
}

#[derive(Debug, Clone)]
pub struct ServiceElement {
    pub name: FullyQualifiedName,
    pub file: FileId,
    pub methods: Vec<MethodId>,
    pub options: RawOptions,
}

#[derive(Debug, Clone)]
pub struct MethodElement {
    pub name: FullyQualifiedName,
    pub method_name: String,
    pub service: ServiceId,
    pub input_type: String,
    pub output_type: String,
    pub input: Option<MessageId>,
    pub output: Option<MessageId>,
    pub client_streaming: bool,
    pub server_streaming: bool,
    pub options: RawOptions,
}

/// The walked schema. Immutable once built.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    files: Vec<FileElement>,
    messages: Vec<MessageElement>,
    fields: Vec<FieldElement>,
    oneofs: Vec<OneofElement>,
    enums: Vec<EnumElement>,
    enum_values: Vec<EnumValueElement>,
    services: Vec<ServiceElement>,
    methods: Vec<MethodElement>,
    by_name: HashMap<FullyQualifiedName, ElementId>,
    types: HashMap<FullyQualifiedName, TypeRef>,
    order: Vec<ElementId>,
    errors: Vec<ResolutionError>,
}

impl Schema {
    /// Walks every loaded file, in load order.
    pub fn walk(files: impl IntoIterator<Item = FileDescriptor>) -> Schema {
        let mut schema = Schema::default();
        let mut methods = Vec::new();
        for file in files {
            schema.add_file(file, &mut methods);
        }
        schema.link_fields();
        schema.link_methods(methods);
        schema
    }

    fn add_file(&mut self, file: FileDescriptor, methods: &mut Vec<PendingMethod>) {
        trace!("walking file {} (generate: {})", file.name, file.generate);
        let file_id = FileId(self.files.len());
        let package = FullyQualifiedName::new(&file.package, &[] as &[&str], "");
        self.files.push(FileElement {
            name: file.name,
            package: file.package,
            syntax: file.syntax,
            generate: file.generate,
            messages: Vec::new(),
            enums: Vec::new(),
            services: Vec::new(),
        });

        for message in file.messages {
            self.add_message(file_id, &package, None, message);
        }
        for enumeration in file.enums {
            self.add_enum(file_id, &package, None, enumeration);
        }
        for service in file.services {
            self.add_service(file_id, &package, service, methods);
        }
    }

    fn register(&mut self, name: &FullyQualifiedName, id: ElementId) {
        if self.by_name.contains_key(name) {
            warn!("duplicate definition of {}; keeping the first", name);
        } else {
            self.by_name.insert(name.clone(), id);
        }
        self.order.push(id);
    }

    fn add_message(
        &mut self,
        file: FileId,
        scope: &FullyQualifiedName,
        parent: Option<MessageId>,
        message: MessageDescriptor,
    ) {
        let name = scope.join(&message.name);
        let id = MessageId(self.messages.len());
        self.messages.push(MessageElement {
            name: name.clone(),
            file,
            parent,
            fields: Vec::new(),
            oneofs: Vec::new(),
            map_entry: message.map_entry,
            options: message.options,
        });
        self.files[file.0].messages.push(id);
        self.register(&name, ElementId::Message(id));
        self.types.entry(name.clone()).or_insert(TypeRef::Message(id));

        let mut oneof_members: MultiMap<i32, FieldId> = MultiMap::new();
        let mut proto3_optional_members: MultiMap<i32, bool> = MultiMap::new();
        for field in message.fields {
            let field_id = FieldId(self.fields.len());
            let field_name = name.join(&field.name);
            if let Some(idx) = field.oneof_index {
                oneof_members.insert(idx, field_id);
                proto3_optional_members.insert(idx, field.proto3_optional);
            }
            self.fields.push(FieldElement {
                name: field_name.clone(),
                json_name: field
                    .json_name
                    .unwrap_or_else(|| to_json_name(&field.name)),
                field_name: field.name,
                message: id,
                number: field.number,
                label: field.label,
                r#type: field.r#type,
                type_name: field.type_name,
                target: None,
                oneof: None,
                proto3_optional: field.proto3_optional,
                options: field.options,
            });
            self.messages[id.0].fields.push(field_id);
            self.register(&field_name, ElementId::Field(field_id));
        }

        for (idx, oneof) in message.oneofs.into_iter().enumerate() {
            let idx = idx as i32;
            let oneof_id = OneofId(self.oneofs.len());
            let oneof_name = name.join(&oneof.name);
            let members = oneof_members.get_vec(&idx).cloned().unwrap_or_default();
            let synthetic = proto3_optional_members
                .get_vec(&idx)
                .map_or(false, |flags| flags.len() == 1 && flags[0]);
            if !synthetic {
                for member in &members {
                    self.fields[member.0].oneof = Some(oneof_id);
                }
            }
            self.oneofs.push(OneofElement {
                name: oneof_name.clone(),
                oneof_name: oneof.name,
                message: id,
                fields: members,
                synthetic,
                options: oneof.options,
            });
            self.messages[id.0].oneofs.push(oneof_id);
            self.register(&oneof_name, ElementId::Oneof(oneof_id));
        }

        for nested in message.nested_messages {
            self.add_message(file, &name, Some(id), nested);
        }
        for nested in message.nested_enums {
            self.add_enum(file, &name, Some(id), nested);
        }
    }

    fn add_enum(
        &mut self,
        file: FileId,
        scope: &FullyQualifiedName,
        parent: Option<MessageId>,
        enumeration: EnumDescriptor,
    ) {
        let name = scope.join(&enumeration.name);
        let id = EnumId(self.enums.len());
        self.enums.push(EnumElement {
            name: name.clone(),
            file,
            parent,
            values: Vec::new(),
            options: enumeration.options,
        });
        self.files[file.0].enums.push(id);
        self.register(&name, ElementId::Enum(id));
        self.types.entry(name.clone()).or_insert(TypeRef::Enum(id));

        for value in enumeration.values {
            let value_id = EnumValueId(self.enum_values.len());
            let value_name = name.join(&value.name);
            self.enum_values.push(EnumValueElement {
                name: value_name.clone(),
                value_name: value.name,
                number: value.number,
                enumeration: id,
                options: value.options,
            });
            self.enums[id.0].values.push(value_id);
            self.register(&value_name, ElementId::EnumValue(value_id));
        }
    }

    fn add_service(
        &mut self,
        file: FileId,
        scope: &FullyQualifiedName,
        service: ServiceDescriptor,
        pending: &mut Vec<PendingMethod>,
    ) {
        let name = scope.join(&service.name);
        let id = ServiceId(self.services.len());
        self.services.push(ServiceElement {
            name: name.clone(),
            file,
            methods: Vec::new(),
            options: service.options,
        });
        self.files[file.0].services.push(id);
        self.register(&name, ElementId::Service(id));

        for method in service.methods {
            let method_id = MethodId(self.methods.len());
            let method_name = name.join(&method.name);
            self.methods.push(MethodElement {
                name: method_name.clone(),
                method_name: method.name,
                service: id,
                input_type: method.input_type,
                output_type: method.output_type,
                input: None,
                output: None,
                client_streaming: method.client_streaming,
                server_streaming: method.server_streaming,
                options: method.options,
            });
            self.services[id.0].methods.push(method_id);
            self.register(&method_name, ElementId::Method(method_id));
            pending.push(PendingMethod {
                id: method_id,
                scope: name.clone(),
            });
        }
    }

    fn link_fields(&mut self) {
        for idx in 0..self.fields.len() {
            let field = &self.fields[idx];
            if !matches!(field.r#type, Type::Message | Type::Group | Type::Enum) {
                continue;
            }
            let scope = &self.messages[field.message.0].name;
            let target = field
                .type_name
                .as_deref()
                .and_then(|type_name| self.resolve_type(scope, type_name));
            match target {
                Some(target) => {
                    let field = &mut self.fields[idx];
                    field.target = Some(target);
                    // Some loaders leave the kind to be inferred from the target.
                    field.r#type = match (target, field.r#type) {
                        (TypeRef::Enum(_), _) => Type::Enum,
                        (TypeRef::Message(_), Type::Group) => Type::Group,
                        (TypeRef::Message(_), _) => Type::Message,
                    };
                }
                None => {
                    let field = &self.fields[idx];
                    self.errors.push(ResolutionError::UnresolvedType {
                        element: field.name.clone(),
                        type_name: field.type_name.clone().unwrap_or_default(),
                    });
                }
            }
        }
    }

    fn link_methods(&mut self, pending: Vec<PendingMethod>) {
        for PendingMethod { id, scope } in pending {
            let method = &self.methods[id.0];
            let input = self.resolve_message(&scope, &method.input_type);
            let output = self.resolve_message(&scope, &method.output_type);
            for (resolved, type_name) in [(input, &method.input_type), (output, &method.output_type)]
            {
                if resolved.is_none() {
                    self.errors.push(ResolutionError::UnresolvedType {
                        element: method.name.clone(),
                        type_name: type_name.clone(),
                    });
                }
            }
            let method = &mut self.methods[id.0];
            method.input = input;
            method.output = output;
        }
    }

    fn resolve_message(&self, scope: &FullyQualifiedName, type_name: &str) -> Option<MessageId> {
        match self.resolve_type(scope, type_name) {
            Some(TypeRef::Message(id)) => Some(id),
            _ => None,
        }
    }

    /// Resolves a type reference the way protoc does: fully-qualified names directly, relative
    /// names from the innermost enclosing scope outward.
    pub fn resolve_type(&self, scope: &FullyQualifiedName, type_name: &str) -> Option<TypeRef> {
        if type_name.starts_with('.') {
            return self
                .types
                .get(&FullyQualifiedName::from_type_name(type_name))
                .copied();
        }
        let mut scope = Some(scope.clone());
        while let Some(current) = scope {
            if let Some(target) = self.types.get(&current.join(type_name)) {
                return Some(*target);
            }
            scope = current.parent();
        }
        None
    }

    pub fn file(&self, id: FileId) -> &FileElement {
        &self.files[id.0]
    }

    pub fn message(&self, id: MessageId) -> &MessageElement {
        &self.messages[id.0]
    }

    pub fn field(&self, id: FieldId) -> &FieldElement {
        &self.fields[id.0]
    }

    pub fn oneof(&self, id: OneofId) -> &OneofElement {
        &self.oneofs[id.0]
    }

    pub fn enumeration(&self, id: EnumId) -> &EnumElement {
        &self.enums[id.0]
    }

    pub fn enum_value(&self, id: EnumValueId) -> &EnumValueElement {
        &self.enum_values[id.0]
    }

    pub fn service(&self, id: ServiceId) -> &ServiceElement {
        &self.services[id.0]
    }

    pub fn method(&self, id: MethodId) -> &MethodElement {
        &self.methods[id.0]
    }

    pub fn files(&self) -> impl Iterator<Item = (FileId, &FileElement)> {
        self.files.iter().enumerate().map(|(i, f)| (FileId(i), f))
    }

    pub fn messages(&self) -> impl Iterator<Item = (MessageId, &MessageElement)> {
        self.messages.iter().enumerate().map(|(i, m)| (MessageId(i), m))
    }

    pub fn fields(&self) -> impl Iterator<Item = (FieldId, &FieldElement)> {
        self.fields.iter().enumerate().map(|(i, f)| (FieldId(i), f))
    }

    pub fn oneofs(&self) -> impl Iterator<Item = (OneofId, &OneofElement)> {
        self.oneofs.iter().enumerate().map(|(i, o)| (OneofId(i), o))
    }

    pub fn enums(&self) -> impl Iterator<Item = (EnumId, &EnumElement)> {
        self.enums.iter().enumerate().map(|(i, e)| (EnumId(i), e))
    }

    pub fn enum_values(&self) -> impl Iterator<Item = (EnumValueId, &EnumValueElement)> {
        self.enum_values
            .iter()
            .enumerate()
            .map(|(i, v)| (EnumValueId(i), v))
    }

    pub fn services(&self) -> impl Iterator<Item = (ServiceId, &ServiceElement)> {
        self.services.iter().enumerate().map(|(i, s)| (ServiceId(i), s))
    }

    pub fn methods(&self) -> impl Iterator<Item = (MethodId, &MethodElement)> {
        self.methods.iter().enumerate().map(|(i, m)| (MethodId(i), m))
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    pub fn oneof_count(&self) -> usize {
        self.oneofs.len()
    }

    pub fn enum_count(&self) -> usize {
        self.enums.len()
    }

    pub fn enum_value_count(&self) -> usize {
        self.enum_values.len()
    }

    pub fn service_count(&self) -> usize {
        self.services.len()
    }

    pub fn method_count(&self) -> usize {
        self.methods.len()
    }

    /// Every element in stable traversal order.
    pub fn elements(&self) -> impl Iterator<Item = ElementId> + '_ {
        self.order.iter().copied()
    }

    pub fn lookup(&self, name: &FullyQualifiedName) -> Option<ElementId> {
        self.by_name.get(name).copied()
    }

    pub fn lookup_message(&self, name: &FullyQualifiedName) -> Option<MessageId> {
        match self.lookup(name) {
            Some(ElementId::Message(id)) => Some(id),
            _ => None,
        }
    }

    pub fn lookup_field(&self, name: &FullyQualifiedName) -> Option<FieldId> {
        match self.lookup(name) {
            Some(ElementId::Field(id)) => Some(id),
            _ => None,
        }
    }

    pub fn lookup_oneof(&self, name: &FullyQualifiedName) -> Option<OneofId> {
        match self.lookup(name) {
            Some(ElementId::Oneof(id)) => Some(id),
            _ => None,
        }
    }

    pub fn lookup_enum(&self, name: &FullyQualifiedName) -> Option<EnumId> {
        match self.lookup(name) {
            Some(ElementId::Enum(id)) => Some(id),
            _ => None,
        }
    }

    pub fn lookup_method(&self, name: &FullyQualifiedName) -> Option<MethodId> {
        match self.lookup(name) {
            Some(ElementId::Method(id)) => Some(id),
            _ => None,
        }
    }

    pub fn element_name(&self, id: ElementId) -> &FullyQualifiedName {
        match id {
            ElementId::Message(id) => &self.message(id).name,
            ElementId::Field(id) => &self.field(id).name,
            ElementId::Oneof(id) => &self.oneof(id).name,
            ElementId::Enum(id) => &self.enumeration(id).name,
            ElementId::EnumValue(id) => &self.enum_value(id).name,
            ElementId::Service(id) => &self.service(id).name,
            ElementId::Method(id) => &self.method(id).name,
        }
    }

    /// The file that declares an element.
    pub fn file_of(&self, id: ElementId) -> FileId {
        match id {
            ElementId::Message(id) => self.message(id).file,
            ElementId::Field(id) => self.message(self.field(id).message).file,
            ElementId::Oneof(id) => self.message(self.oneof(id).message).file,
            ElementId::Enum(id) => self.enumeration(id).file,
            ElementId::EnumValue(id) => self.enumeration(self.enum_value(id).enumeration).file,
            ElementId::Service(id) => self.service(id).file,
            ElementId::Method(id) => self.service(self.method(id).service).file,
        }
    }

    /// The service that declares an element, for services and methods.
    pub fn service_of(&self, id: ElementId) -> Option<ServiceId> {
        match id {
            ElementId::Service(id) => Some(id),
            ElementId::Method(id) => Some(self.method(id).service),
            _ => None,
        }
    }

    /// The key and value fields of a map field's synthetic entry message.
    pub fn map_entry(&self, field: FieldId) -> Option<(FieldId, FieldId)> {
        let field = self.field(field);
        if !field.is_repeated() {
            return None;
        }
        let entry = self.message(field.message_target()?);
        if !entry.map_entry {
            return None;
        }
        let by_number = |number| {
            entry
                .fields
                .iter()
                .copied()
                .find(|id| self.field(*id).number == number)
        };
        Some((by_number(1)?, by_number(2)?))
    }

    pub fn is_map(&self, field: FieldId) -> bool {
        self.map_entry(field).is_some()
    }

    /// References the walker could not resolve.
    pub fn resolution_errors(&self) -> &[ResolutionError] {
        &self.errors
    }
}

struct PendingMethod {
    id: MethodId,
    scope: FullyQualifiedName,
}
