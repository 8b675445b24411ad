//! The owned schema tree handed over by a loader.
//!
//! These types carry exactly what the engine reads from a parsed schema: names, field types,
//! nesting, and the raw custom options of every element. They can be built by hand (mostly in
//! tests) with the chaining helpers below, or converted from `prost-types` descriptors with
//! [`crate::file_descriptor_set`].

use heck::ToUpperCamelCase;
pub use prost_types::field_descriptor_proto::{Label, Type};

use crate::options::{OptionValue, RawOptions};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Syntax {
    Proto2,
    #[default]
    Proto3,
}

impl Syntax {
    pub fn parse(syntax: &str) -> Syntax {
        match syntax {
            "proto3" | "editions" => Syntax::Proto3,
            _ => Syntax::Proto2,
        }
    }
}

/// One loaded schema file.
#[derive(Debug, Clone, PartialEq)]
pub struct FileDescriptor {
    pub name: String,
    pub package: String,
    pub syntax: Syntax,
    pub messages: Vec<MessageDescriptor>,
    pub enums: Vec<EnumDescriptor>,
    pub services: Vec<ServiceDescriptor>,
    /// Whether output is requested for this file. Files loaded only as imports still take part
    /// in cross-file resolution.
    pub generate: bool,
}

impl FileDescriptor {
    pub fn new(name: impl Into<String>, package: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            package: package.into(),
            syntax: Syntax::Proto3,
            messages: Vec::new(),
            enums: Vec::new(),
            services: Vec::new(),
            generate: true,
        }
    }

    pub fn syntax(mut self, syntax: Syntax) -> Self {
        self.syntax = syntax;
        self
    }

    /// Marks the file as loaded only to satisfy imports.
    pub fn imported(mut self) -> Self {
        self.generate = false;
        self
    }

    pub fn message(mut self, message: MessageDescriptor) -> Self {
        self.messages.push(message);
        self
    }

    pub fn enumeration(mut self, enumeration: EnumDescriptor) -> Self {
        self.enums.push(enumeration);
        self
    }

    pub fn service(mut self, service: ServiceDescriptor) -> Self {
        self.services.push(service);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MessageDescriptor {
    pub name: String,
    pub fields: Vec<FieldDescriptor>,
    pub oneofs: Vec<OneofDescriptor>,
    pub nested_messages: Vec<MessageDescriptor>,
    pub nested_enums: Vec<EnumDescriptor>,
    /// Set on the synthetic entry message backing a `map<K, V>` field.
    pub map_entry: bool,
    pub options: RawOptions,
}

impl MessageDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    /// Declares a oneof. Its members are the fields added through [`Self::oneof_field`].
    pub fn oneof(mut self, oneof: OneofDescriptor) -> Self {
        self.oneofs.push(oneof);
        self
    }

    /// Adds a field as a member of the oneof named `oneof`, declaring the oneof on first use.
    pub fn oneof_field(mut self, oneof: &str, field: FieldDescriptor) -> Self {
        let index = match self.oneofs.iter().position(|o| o.name == oneof) {
            Some(index) => index,
            None => {
                self.oneofs.push(OneofDescriptor::new(oneof));
                self.oneofs.len() - 1
            }
        };
        self.fields.push(field.in_oneof(index as i32));
        self
    }

    pub fn nested(mut self, message: MessageDescriptor) -> Self {
        self.nested_messages.push(message);
        self
    }

    pub fn nested_enum(mut self, enumeration: EnumDescriptor) -> Self {
        self.nested_enums.push(enumeration);
        self
    }

    pub fn option(mut self, name: impl Into<String>, value: OptionValue) -> Self {
        self.options.push(name, value);
        self
    }

    /// Adds a `map<key, value>` field the way protoc lowers it: a nested `<Name>Entry` message
    /// plus a repeated field referencing it.
    ///
    /// `value_type_name` names the value message or enum and is ignored for scalar values.
    pub fn map_field(
        self,
        name: &str,
        number: i32,
        key: Type,
        value: Type,
        value_type_name: Option<&str>,
    ) -> Self {
        self.map_field_with(name, number, key, value, value_type_name, RawOptions::new())
    }

    /// Like [`Self::map_field`], attaching `options` to the map field itself.
    pub fn map_field_with(
        self,
        name: &str,
        number: i32,
        key: Type,
        value: Type,
        value_type_name: Option<&str>,
        options: RawOptions,
    ) -> Self {
        let entry_name = format!("{}Entry", name.to_upper_camel_case());
        let mut value_field = FieldDescriptor::new("value", 2, value);
        if matches!(value, Type::Message | Type::Enum | Type::Group) {
            value_field.type_name = value_type_name.map(str::to_string);
        }
        let mut entry = MessageDescriptor::new(entry_name.clone())
            .field(FieldDescriptor::new("key", 1, key))
            .field(value_field);
        entry.map_entry = true;

        let mut field = FieldDescriptor::message(name, number, &entry_name).repeated();
        field.options = options;
        self.nested(entry).field(field)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub name: String,
    pub number: i32,
    pub label: Label,
    pub r#type: Type,
    /// Message or enum type reference; either fully qualified (leading `.`) or relative to the
    /// declaring scope.
    pub type_name: Option<String>,
    pub json_name: Option<String>,
    pub oneof_index: Option<i32>,
    pub proto3_optional: bool,
    pub options: RawOptions,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, number: i32, r#type: Type) -> Self {
        Self {
            name: name.into(),
            number,
            label: Label::Optional,
            r#type,
            type_name: None,
            json_name: None,
            oneof_index: None,
            proto3_optional: false,
            options: RawOptions::new(),
        }
    }

    pub fn message(name: impl Into<String>, number: i32, type_name: &str) -> Self {
        Self::new(name, number, Type::Message).type_name(type_name)
    }

    pub fn enumeration(name: impl Into<String>, number: i32, type_name: &str) -> Self {
        Self::new(name, number, Type::Enum).type_name(type_name)
    }

    pub fn type_name(mut self, type_name: &str) -> Self {
        self.type_name = Some(type_name.to_string());
        self
    }

    pub fn repeated(mut self) -> Self {
        self.label = Label::Repeated;
        self
    }

    /// Marks the field with the proto3 `optional` keyword.
    pub fn proto3_optional(mut self) -> Self {
        self.proto3_optional = true;
        self
    }

    pub fn json_name(mut self, json_name: impl Into<String>) -> Self {
        self.json_name = Some(json_name.into());
        self
    }

    pub fn in_oneof(mut self, index: i32) -> Self {
        self.oneof_index = Some(index);
        self
    }

    pub fn option(mut self, name: impl Into<String>, value: OptionValue) -> Self {
        self.options.push(name, value);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OneofDescriptor {
    pub name: String,
    pub options: RawOptions,
}

impl OneofDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            options: RawOptions::new(),
        }
    }

    pub fn option(mut self, name: impl Into<String>, value: OptionValue) -> Self {
        self.options.push(name, value);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct EnumDescriptor {
    pub name: String,
    pub values: Vec<EnumValueDescriptor>,
    pub options: RawOptions,
}

impl EnumDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn value(mut self, value: EnumValueDescriptor) -> Self {
        self.values.push(value);
        self
    }

    pub fn option(mut self, name: impl Into<String>, value: OptionValue) -> Self {
        self.options.push(name, value);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumValueDescriptor {
    pub name: String,
    pub number: i32,
    pub options: RawOptions,
}

impl EnumValueDescriptor {
    pub fn new(name: impl Into<String>, number: i32) -> Self {
        Self {
            name: name.into(),
            number,
            options: RawOptions::new(),
        }
    }

    pub fn option(mut self, name: impl Into<String>, value: OptionValue) -> Self {
        self.options.push(name, value);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ServiceDescriptor {
    pub name: String,
    pub methods: Vec<MethodDescriptor>,
    pub options: RawOptions,
}

impl ServiceDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn method(mut self, method: MethodDescriptor) -> Self {
        self.methods.push(method);
        self
    }

    pub fn option(mut self, name: impl Into<String>, value: OptionValue) -> Self {
        self.options.push(name, value);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodDescriptor {
    pub name: String,
    pub input_type: String,
    pub output_type: String,
    pub client_streaming: bool,
    pub server_streaming: bool,
    pub options: RawOptions,
}

impl MethodDescriptor {
    pub fn new(name: impl Into<String>, input_type: &str, output_type: &str) -> Self {
        Self {
            name: name.into(),
            input_type: input_type.to_string(),
            output_type: output_type.to_string(),
            client_streaming: false,
            server_streaming: false,
            options: RawOptions::new(),
        }
    }

    pub fn option(mut self, name: impl Into<String>, value: OptionValue) -> Self {
        self.options.push(name, value);
        self
    }
}
