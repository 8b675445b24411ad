//! Conversion from `prost-types` descriptors.
//!
//! `prost-types` keeps no extension fields on the option messages, so custom options are read
//! from their `uninterpreted_option` form: the option name as a list of name parts, and the
//! value as an identifier, number, string or text-format aggregate. Descriptor sets must be
//! produced with options left uninterpreted for annotations to be seen.

use log::trace;
use prost::Message;
use prost_types::compiler::CodeGeneratorRequest;
use prost_types::{
    DescriptorProto, EnumDescriptorProto, FieldDescriptorProto, FileDescriptorProto,
    FileDescriptorSet, MethodDescriptorProto, ServiceDescriptorProto, UninterpretedOption,
};

use crate::descriptor::{
    EnumDescriptor, EnumValueDescriptor, FieldDescriptor, FileDescriptor, MessageDescriptor,
    MethodDescriptor, OneofDescriptor, ServiceDescriptor, Syntax,
};
use crate::error::{DecodingError, Error};
use crate::fully_qualified_name::FullyQualifiedName;
use crate::options::{parse_aggregate, OptionValue, RawOptions};

/// Decodes a serialized `FileDescriptorSet` and converts every file in it.
pub fn decode_file_descriptor_set(bytes: &[u8]) -> Result<Vec<FileDescriptor>, Error> {
    let set = FileDescriptorSet::decode(bytes)?;
    from_file_descriptor_set(set)
}

/// Converts every file of `set`; all are marked for generation.
pub fn from_file_descriptor_set(set: FileDescriptorSet) -> Result<Vec<FileDescriptor>, Error> {
    set.file.into_iter().map(convert_file).collect()
}

/// Converts the files of a protoc plugin request. Only files listed in `file_to_generate` are
/// marked for generation; the rest are imports.
pub fn from_code_generator_request(
    request: CodeGeneratorRequest,
) -> Result<Vec<FileDescriptor>, Error> {
    let CodeGeneratorRequest {
        file_to_generate,
        proto_file,
        ..
    } = request;
    proto_file
        .into_iter()
        .map(|file| {
            let mut converted = convert_file(file)?;
            converted.generate = file_to_generate.contains(&converted.name);
            Ok(converted)
        })
        .collect()
}

fn convert_file(file: FileDescriptorProto) -> Result<FileDescriptor, Error> {
    trace!("converting {}", file.name());
    let scope = FullyQualifiedName::new(file.package(), &[] as &[&str], "");
    let mut converted = FileDescriptor::new(file.name(), file.package())
        .syntax(Syntax::parse(file.syntax.as_deref().unwrap_or("proto2")));

    for message in file.message_type {
        converted.messages.push(convert_message(&scope, message)?);
    }
    for enumeration in file.enum_type {
        converted.enums.push(convert_enum(&scope, enumeration)?);
    }
    for service in file.service {
        converted.services.push(convert_service(&scope, service)?);
    }
    Ok(converted)
}

fn convert_message(
    scope: &FullyQualifiedName,
    message: DescriptorProto,
) -> Result<MessageDescriptor, Error> {
    let name = scope.join(message.name());
    let mut converted = MessageDescriptor::new(message.name());
    if let Some(options) = &message.options {
        converted.map_entry = options.map_entry();
        converted.options = convert_options(&name, &options.uninterpreted_option)?;
    }

    for field in message.field {
        converted.fields.push(convert_field(&name, field)?);
    }
    for oneof in message.oneof_decl {
        let mut decl = OneofDescriptor::new(oneof.name());
        if let Some(options) = &oneof.options {
            decl.options =
                convert_options(&name.join(oneof.name()), &options.uninterpreted_option)?;
        }
        converted.oneofs.push(decl);
    }
    for nested in message.nested_type {
        converted.nested_messages.push(convert_message(&name, nested)?);
    }
    for enumeration in message.enum_type {
        converted.nested_enums.push(convert_enum(&name, enumeration)?);
    }
    Ok(converted)
}

fn convert_field(
    scope: &FullyQualifiedName,
    field: FieldDescriptorProto,
) -> Result<FieldDescriptor, Error> {
    let mut converted = FieldDescriptor::new(field.name(), field.number(), field.r#type());
    converted.label = field.label();
    converted.type_name = field.type_name.clone().filter(|name| !name.is_empty());
    converted.json_name = field.json_name.clone();
    converted.oneof_index = field.oneof_index;
    converted.proto3_optional = field.proto3_optional();
    if let Some(options) = &field.options {
        converted.options =
            convert_options(&scope.join(field.name()), &options.uninterpreted_option)?;
    }
    Ok(converted)
}

fn convert_enum(
    scope: &FullyQualifiedName,
    enumeration: EnumDescriptorProto,
) -> Result<EnumDescriptor, Error> {
    let name = scope.join(enumeration.name());
    let mut converted = EnumDescriptor::new(enumeration.name());
    if let Some(options) = &enumeration.options {
        converted.options = convert_options(&name, &options.uninterpreted_option)?;
    }
    for value in enumeration.value {
        let mut decl = EnumValueDescriptor::new(value.name(), value.number());
        if let Some(options) = &value.options {
            decl.options =
                convert_options(&name.join(value.name()), &options.uninterpreted_option)?;
        }
        converted.values.push(decl);
    }
    Ok(converted)
}

fn convert_service(
    scope: &FullyQualifiedName,
    service: ServiceDescriptorProto,
) -> Result<ServiceDescriptor, Error> {
    let name = scope.join(service.name());
    let mut converted = ServiceDescriptor::new(service.name());
    if let Some(options) = &service.options {
        converted.options = convert_options(&name, &options.uninterpreted_option)?;
    }
    for method in service.method {
        converted.methods.push(convert_method(&name, method)?);
    }
    Ok(converted)
}

fn convert_method(
    scope: &FullyQualifiedName,
    method: MethodDescriptorProto,
) -> Result<MethodDescriptor, Error> {
    let mut converted =
        MethodDescriptor::new(method.name(), method.input_type(), method.output_type());
    converted.client_streaming = method.client_streaming();
    converted.server_streaming = method.server_streaming();
    if let Some(options) = &method.options {
        converted.options =
            convert_options(&scope.join(method.name()), &options.uninterpreted_option)?;
    }
    Ok(converted)
}

/// Folds uninterpreted options into raw options.
///
/// `option (ext) = {...};` becomes one entry named `ext`; `option (ext).a.b = v;` sets the
/// path `a.b` of an `ext` aggregate. Built-in options (no extension name part) are skipped.
fn convert_options(
    element: &FullyQualifiedName,
    options: &[UninterpretedOption],
) -> Result<RawOptions, DecodingError> {
    let mut converted = RawOptions::new();
    for option in options {
        let extension = match option.name.iter().position(|part| part.is_extension) {
            Some(0) => option.name[0].name_part.as_str(),
            _ => {
                trace!("{}: skipping built-in option", element);
                continue;
            }
        };
        let path = option.name[1..]
            .iter()
            .map(|part| part.name_part.clone())
            .collect::<Vec<_>>();
        let value = convert_value(element, extension, option)?;
        if path.is_empty() {
            converted.push(extension, value);
        } else {
            converted.push_nested(extension, &path, value);
        }
    }
    Ok(converted)
}

fn convert_value(
    element: &FullyQualifiedName,
    extension: &str,
    option: &UninterpretedOption,
) -> Result<OptionValue, DecodingError> {
    if let Some(identifier) = &option.identifier_value {
        return Ok(match identifier.as_str() {
            "true" => OptionValue::Bool(true),
            "false" => OptionValue::Bool(false),
            _ => OptionValue::ident(identifier.as_str()),
        });
    }
    if let Some(value) = option.positive_int_value {
        return Ok(OptionValue::Int(i128::from(value)));
    }
    if let Some(value) = option.negative_int_value {
        return Ok(OptionValue::Int(i128::from(value)));
    }
    if let Some(value) = option.double_value {
        return Ok(OptionValue::Float(value));
    }
    if let Some(bytes) = &option.string_value {
        return String::from_utf8(bytes.clone())
            .map(OptionValue::String)
            .map_err(|_| DecodingError::InvalidAnnotationValue {
                element: element.clone(),
                field: extension.trim_start_matches('.').to_string(),
                value: String::from_utf8_lossy(bytes).into_owned(),
            });
    }
    if let Some(aggregate) = &option.aggregate_value {
        return parse_aggregate(aggregate).map_err(|source| DecodingError::MalformedOption {
            element: element.clone(),
            source,
        });
    }
    Err(DecodingError::InvalidAnnotationValue {
        element: element.clone(),
        field: extension.trim_start_matches('.').to_string(),
        value: String::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost_types::field_descriptor_proto::{Label, Type};
    use prost_types::uninterpreted_option::NamePart;
    use prost_types::{FieldOptions, MethodOptions};
    use pretty_assertions::assert_eq;

    fn part(name: &str, is_extension: bool) -> NamePart {
        NamePart {
            name_part: name.to_string(),
            is_extension,
        }
    }

    fn option(name: Vec<NamePart>) -> UninterpretedOption {
        UninterpretedOption {
            name,
            ..Default::default()
        }
    }

    fn request() -> CodeGeneratorRequest {
        let count = FieldDescriptorProto {
            name: Some("count".to_string()),
            number: Some(1),
            label: Some(Label::Optional as i32),
            r#type: Some(Type::Int64 as i32),
            options: Some(FieldOptions {
                uninterpreted_option: vec![UninterpretedOption {
                    identifier_value: Some("NUMBER".to_string()),
                    ..option(vec![part("sebuf.http.int64_encoding", true)])
                }],
                ..Default::default()
            }),
            ..Default::default()
        };
        let method = MethodDescriptorProto {
            name: Some("Get".to_string()),
            input_type: Some(".pkg.Counter".to_string()),
            output_type: Some(".pkg.Counter".to_string()),
            options: Some(MethodOptions {
                uninterpreted_option: vec![
                    UninterpretedOption {
                        string_value: Some(b"/counters/{count}".to_vec()),
                        ..option(vec![part("sebuf.http.config", true), part("path", false)])
                    },
                    UninterpretedOption {
                        identifier_value: Some("HTTP_METHOD_GET".to_string()),
                        ..option(vec![part("sebuf.http.config", true), part("method", false)])
                    },
                    UninterpretedOption {
                        identifier_value: Some("true".to_string()),
                        ..option(vec![part("deprecated", false)])
                    },
                ],
                ..Default::default()
            }),
            ..Default::default()
        };
        CodeGeneratorRequest {
            file_to_generate: vec!["counter.proto".to_string()],
            proto_file: vec![
                FileDescriptorProto {
                    name: Some("base.proto".to_string()),
                    package: Some("base".to_string()),
                    syntax: Some("proto3".to_string()),
                    ..Default::default()
                },
                FileDescriptorProto {
                    name: Some("counter.proto".to_string()),
                    package: Some("pkg".to_string()),
                    syntax: Some("proto3".to_string()),
                    message_type: vec![DescriptorProto {
                        name: Some("Counter".to_string()),
                        field: vec![count],
                        ..Default::default()
                    }],
                    service: vec![ServiceDescriptorProto {
                        name: Some("CounterService".to_string()),
                        method: vec![method],
                        ..Default::default()
                    }],
                    ..Default::default()
                },
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_code_generator_request() {
        let files = from_code_generator_request(request()).unwrap();
        assert!(!files[0].generate);
        assert!(files[1].generate);
        assert_eq!(files[1].syntax, Syntax::Proto3);

        let field = &files[1].messages[0].fields[0];
        assert_eq!(
            field.options.get("sebuf.http.int64_encoding"),
            Some(&OptionValue::ident("NUMBER"))
        );

        let method = &files[1].services[0].methods[0];
        assert_eq!(method.options.iter().count(), 1);
        let config = method.options.get("sebuf.http.config").unwrap();
        assert_eq!(config.get("path"), Some(&OptionValue::string("/counters/{count}")));
        assert_eq!(config.get("method"), Some(&OptionValue::ident("HTTP_METHOD_GET")));
    }

    #[test]
    fn test_decode_file_descriptor_set() {
        let set = FileDescriptorSet {
            file: request().proto_file,
        };
        let files = decode_file_descriptor_set(&set.encode_to_vec()).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|file| file.generate));
        assert!(decode_file_descriptor_set(&[0xff, 0xff]).is_err());
    }

    #[test]
    fn test_malformed_aggregate() {
        let options = vec![UninterpretedOption {
            aggregate_value: Some("path: \"/x\" method:".to_string()),
            ..option(vec![part("sebuf.http.config", true)])
        }];
        match convert_options(&".pkg.Svc.Get".into(), &options) {
            Err(DecodingError::MalformedOption { element, .. }) => {
                assert_eq!(element, FullyQualifiedName::from(".pkg.Svc.Get"))
            }
            other => panic!("unexpected result {:?}", other),
        }
    }
}
