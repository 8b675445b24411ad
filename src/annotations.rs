//! The annotation extractor.
//!
//! Decodes the raw custom options of every schema element into typed [`Annotation`]s and folds
//! them into one record per element. Decoding is purely local: an unknown enum value or a value
//! of the wrong kind is a [`DecodingError`], but whether an annotation makes sense on its target
//! is left to [`crate::validate`].

use log::{trace, warn};

use crate::error::DecodingError;
use crate::fully_qualified_name::FullyQualifiedName;
use crate::options::{OptionValue, RawOptions};
use crate::walker::{EnumId, EnumValueId, FieldId, MethodId, OneofId, Schema, ServiceId};

/// The encoding of a 64-bit integer field in JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Int64Encoding {
    /// A decimal string; safe for the full range.
    #[default]
    String,
    /// A JSON number; loses precision beyond 2^53.
    Number,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EnumEncoding {
    #[default]
    String,
    Number,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TimestampFormat {
    #[default]
    Rfc3339,
    Date,
    UnixSeconds,
    UnixMillis,
}

impl TimestampFormat {
    pub fn is_numeric(self) -> bool {
        matches!(self, TimestampFormat::UnixSeconds | TimestampFormat::UnixMillis)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BytesEncoding {
    #[default]
    Base64,
    Base64Raw,
    Base64Url,
    Base64UrlRaw,
    Hex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EmptyBehavior {
    #[default]
    Preserve,
    Null,
    Omit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HttpMethod {
    Get,
    #[default]
    Post,
    Put,
    Delete,
    Patch,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
        }
    }

    /// Whether requests with this verb carry no body.
    pub fn is_bodyless(self) -> bool {
        matches!(self, HttpMethod::Get | HttpMethod::Delete)
    }
}

/// A protobuf enum used as an annotation value.
///
/// Values may be written with their full symbolic name, the name without the type prefix, or
/// their number. The `*_UNSPECIFIED` value decodes to `None`, meaning "use the default".
trait AnnotationEnum: Sized + Copy + 'static {
    const PREFIX: &'static str;
    const VALUES: &'static [(&'static str, i128, Option<Self>)];

    fn decode(value: &OptionValue) -> Result<Option<Self>, ()> {
        let found = match value {
            OptionValue::Ident(ident) | OptionValue::String(ident) => {
                let short = ident.strip_prefix(Self::PREFIX).unwrap_or(ident.as_str());
                Self::VALUES.iter().find(|(name, _, _)| *name == short)
            }
            OptionValue::Int(number) => Self::VALUES.iter().find(|(_, n, _)| n == number),
            _ => None,
        };
        found.map(|(_, _, value)| *value).ok_or(())
    }
}

impl AnnotationEnum for Int64Encoding {
    const PREFIX: &'static str = "INT64_ENCODING_";
    const VALUES: &'static [(&'static str, i128, Option<Self>)] = &[
        ("UNSPECIFIED", 0, None),
        ("STRING", 1, Some(Int64Encoding::String)),
        ("NUMBER", 2, Some(Int64Encoding::Number)),
    ];
}

impl AnnotationEnum for EnumEncoding {
    const PREFIX: &'static str = "ENUM_ENCODING_";
    const VALUES: &'static [(&'static str, i128, Option<Self>)] = &[
        ("UNSPECIFIED", 0, None),
        ("STRING", 1, Some(EnumEncoding::String)),
        ("NUMBER", 2, Some(EnumEncoding::Number)),
    ];
}

impl AnnotationEnum for TimestampFormat {
    const PREFIX: &'static str = "TIMESTAMP_FORMAT_";
    const VALUES: &'static [(&'static str, i128, Option<Self>)] = &[
        ("UNSPECIFIED", 0, None),
        ("RFC3339", 1, Some(TimestampFormat::Rfc3339)),
        ("UNIX_SECONDS", 2, Some(TimestampFormat::UnixSeconds)),
        ("UNIX_MILLIS", 3, Some(TimestampFormat::UnixMillis)),
        ("DATE", 4, Some(TimestampFormat::Date)),
    ];
}

impl AnnotationEnum for BytesEncoding {
    const PREFIX: &'static str = "BYTES_ENCODING_";
    const VALUES: &'static [(&'static str, i128, Option<Self>)] = &[
        ("UNSPECIFIED", 0, None),
        ("BASE64", 1, Some(BytesEncoding::Base64)),
        ("BASE64_RAW", 2, Some(BytesEncoding::Base64Raw)),
        ("BASE64URL", 3, Some(BytesEncoding::Base64Url)),
        ("BASE64URL_RAW", 4, Some(BytesEncoding::Base64UrlRaw)),
        ("HEX", 5, Some(BytesEncoding::Hex)),
    ];
}

impl AnnotationEnum for EmptyBehavior {
    const PREFIX: &'static str = "EMPTY_BEHAVIOR_";
    const VALUES: &'static [(&'static str, i128, Option<Self>)] = &[
        ("UNSPECIFIED", 0, None),
        ("PRESERVE", 1, Some(EmptyBehavior::Preserve)),
        ("NULL", 2, Some(EmptyBehavior::Null)),
        ("OMIT", 3, Some(EmptyBehavior::Omit)),
    ];
}

impl AnnotationEnum for HttpMethod {
    const PREFIX: &'static str = "HTTP_METHOD_";
    const VALUES: &'static [(&'static str, i128, Option<Self>)] = &[
        ("UNSPECIFIED", 0, None),
        ("GET", 1, Some(HttpMethod::Get)),
        ("POST", 2, Some(HttpMethod::Post)),
        ("PUT", 3, Some(HttpMethod::Put)),
        ("DELETE", 4, Some(HttpMethod::Delete)),
        ("PATCH", 5, Some(HttpMethod::Patch)),
    ];
}

/// A header a service or method expects on every request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct HeaderRequirement {
    pub name: String,
    pub required: bool,
    pub format: String,
    /// The declared value type (`string`, `integer`, ...); empty means string.
    pub header_type: String,
    pub description: String,
    pub example: String,
    pub deprecated: bool,
}

/// The `{ path, method }` route declared on a method.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HttpRule {
    pub path: String,
    pub method: HttpMethod,
}

/// A request field bound outside the body. Path placeholders bind by field name and need no
/// annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    /// Bound from the query string and excluded from the body.
    Query { name: String, required: bool },
}

/// An explicit `case -> literal` mapping in a discriminator annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscriminatorVariant {
    pub case: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discriminator {
    /// The JSON property carrying the variant literal.
    pub name: String,
    /// Inline message payloads next to the discriminator instead of nesting them.
    pub flatten: bool,
    pub variants: Vec<DiscriminatorVariant>,
}

/// A decoded annotation attached to one schema element.
#[derive(Debug, Clone, PartialEq)]
pub enum Annotation {
    Unwrap,
    Flatten { prefix: String },
    FlattenPrefix(String),
    Discriminator(Discriminator),
    IntEncoding(Int64Encoding),
    EnumEncoding(EnumEncoding),
    EnumValueName(String),
    TimestampFormat(TimestampFormat),
    BytesEncoding(BytesEncoding),
    HeaderRequirements(Vec<HeaderRequirement>),
    Binding(Binding),
    Nullable,
    EmptyBehavior(EmptyBehavior),
    OneofValue(String),
    Examples(Vec<String>),
    Http(HttpRule),
    BasePath(String),
}

/// The kind of element being decoded; selects which extension names apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Field,
    Oneof,
    Enum,
    EnumValue,
    Service,
    Method,
}

impl ElementKind {
    fn accepts(self, extension: &str) -> bool {
        let names: &[&str] = match self {
            ElementKind::Field => &[
                "unwrap",
                "flatten",
                "flatten_prefix",
                "int64_encoding",
                "enum_encoding",
                "timestamp_format",
                "bytes_encoding",
                "nullable",
                "empty_behavior",
                "query",
                "field_examples",
                "oneof_value",
            ],
            ElementKind::Oneof => &["oneof_config"],
            ElementKind::Enum => &["enum_encoding"],
            ElementKind::EnumValue => &["enum_value"],
            ElementKind::Service => &["service_config", "service_headers"],
            ElementKind::Method => &["config", "method_headers"],
        };
        names.contains(&extension)
    }
}

/// Decodes the options of one element. `local_name` is the element's unqualified name, used
/// for defaults such as a query parameter's name.
pub fn decode(
    element: &FullyQualifiedName,
    kind: ElementKind,
    local_name: &str,
    options: &RawOptions,
    extension_package: &str,
) -> (Vec<Annotation>, Vec<DecodingError>) {
    let mut decoder = Decoder {
        element,
        annotations: Vec::new(),
        errors: Vec::new(),
    };
    let prefix = format!("{}.", extension_package.trim_matches('.'));

    for option in options.iter() {
        let extension = match option.name.strip_prefix(&prefix) {
            Some(extension) => extension,
            None => continue,
        };
        if !kind.accepts(extension) {
            trace!("{}: ignoring `{}` on a {:?}", element, option.name, kind);
            continue;
        }
        decoder.decode(extension, local_name, &option.value);
    }

    (decoder.annotations, decoder.errors)
}

struct Decoder<'a> {
    element: &'a FullyQualifiedName,
    annotations: Vec<Annotation>,
    errors: Vec<DecodingError>,
}

impl Decoder<'_> {
    fn invalid(&mut self, field: &str, value: &OptionValue) {
        self.errors.push(DecodingError::InvalidAnnotationValue {
            element: self.element.clone(),
            field: field.to_string(),
            value: value.to_string(),
        });
    }

    fn enumeration<T: AnnotationEnum>(&mut self, field: &str, value: &OptionValue) -> Option<T> {
        match T::decode(value) {
            Ok(decoded) => decoded,
            Err(()) => {
                self.invalid(field, value);
                None
            }
        }
    }

    fn boolean(&mut self, field: &str, value: &OptionValue) -> bool {
        match value.as_bool() {
            Some(b) => b,
            None => {
                self.invalid(field, value);
                false
            }
        }
    }

    fn string(&mut self, field: &str, value: &OptionValue) -> Option<String> {
        match value.as_str() {
            Some(s) => Some(s.to_string()),
            None => {
                self.invalid(field, value);
                None
            }
        }
    }

    fn aggregate<'v>(&mut self, field: &str, value: &'v OptionValue) -> Option<&'v OptionValue> {
        match value {
            OptionValue::Aggregate(_) => Some(value),
            _ => {
                self.invalid(field, value);
                None
            }
        }
    }

    fn decode(&mut self, extension: &str, local_name: &str, value: &OptionValue) {
        let annotation = match extension {
            "unwrap" => self.boolean(extension, value).then_some(Annotation::Unwrap),
            "flatten" => match value {
                OptionValue::String(prefix) => Some(Annotation::Flatten {
                    prefix: prefix.clone(),
                }),
                _ => self
                    .boolean(extension, value)
                    .then(|| Annotation::Flatten {
                        prefix: String::new(),
                    }),
            },
            "flatten_prefix" => self
                .string(extension, value)
                .filter(|prefix| !prefix.is_empty())
                .map(Annotation::FlattenPrefix),
            "int64_encoding" => self
                .enumeration(extension, value)
                .map(Annotation::IntEncoding),
            "enum_encoding" => self
                .enumeration(extension, value)
                .map(Annotation::EnumEncoding),
            "timestamp_format" => self
                .enumeration(extension, value)
                .map(Annotation::TimestampFormat),
            "bytes_encoding" => self
                .enumeration(extension, value)
                .map(Annotation::BytesEncoding),
            "empty_behavior" => self
                .enumeration(extension, value)
                .map(Annotation::EmptyBehavior),
            "nullable" => self.boolean(extension, value).then_some(Annotation::Nullable),
            "enum_value" => self
                .string(extension, value)
                .filter(|name| !name.is_empty())
                .map(Annotation::EnumValueName),
            "oneof_value" => self
                .string(extension, value)
                .filter(|literal| !literal.is_empty())
                .map(Annotation::OneofValue),
            "query" => self.query(local_name, value),
            "field_examples" => self.examples(value),
            "oneof_config" => self.oneof_config(value),
            "config" => self.http_rule(value),
            "service_config" => self.service_config(value),
            "service_headers" | "method_headers" => self.headers(extension, value),
            _ => None,
        };
        if let Some(annotation) = annotation {
            self.annotations.push(annotation);
        }
    }

    fn query(&mut self, local_name: &str, value: &OptionValue) -> Option<Annotation> {
        let (name, required) = match value {
            // `[(query) = true]` is shorthand for a parameter named after the field.
            OptionValue::Bool(true) => (String::new(), false),
            OptionValue::Aggregate(_) => {
                let name = match value.get("name") {
                    Some(name) => self.string("query.name", name)?,
                    None => String::new(),
                };
                let required = match value.get("required") {
                    Some(required) => self.boolean("query.required", required),
                    None => false,
                };
                (name, required)
            }
            _ => {
                self.invalid("query", value);
                return None;
            }
        };
        let name = if name.is_empty() {
            local_name.to_string()
        } else {
            name
        };
        Some(Annotation::Binding(Binding::Query { name, required }))
    }

    fn examples(&mut self, value: &OptionValue) -> Option<Annotation> {
        let items = match value {
            OptionValue::List(_) | OptionValue::String(_) => vec![value],
            OptionValue::Aggregate(_) => value.get_all("values").collect(),
            _ => {
                self.invalid("field_examples", value);
                return None;
            }
        };
        let mut examples = Vec::new();
        for item in items {
            match item {
                OptionValue::List(list) => {
                    for entry in list {
                        examples.extend(self.string("field_examples.values", entry));
                    }
                }
                other => examples.extend(self.string("field_examples.values", other)),
            }
        }
        (!examples.is_empty()).then_some(Annotation::Examples(examples))
    }

    fn oneof_config(&mut self, value: &OptionValue) -> Option<Annotation> {
        let value = self.aggregate("oneof_config", value)?;
        let name = match value.get("discriminator") {
            Some(name) => self.string("oneof_config.discriminator", name)?,
            None => String::new(),
        };
        // An empty discriminator is the same as no annotation.
        if name.is_empty() {
            return None;
        }
        let flatten = match value.get("flatten") {
            Some(flatten) => self.boolean("oneof_config.flatten", flatten),
            None => false,
        };
        let mut variants = Vec::new();
        for variant in value.get_all("variants") {
            let case = variant.get("case").and_then(OptionValue::as_str);
            let literal = variant.get("value").and_then(OptionValue::as_str);
            match (case, literal) {
                (Some(case), Some(literal)) => variants.push(DiscriminatorVariant {
                    case: case.to_string(),
                    value: literal.to_string(),
                }),
                _ => self.invalid("oneof_config.variants", variant),
            }
        }
        Some(Annotation::Discriminator(Discriminator {
            name,
            flatten,
            variants,
        }))
    }

    fn http_rule(&mut self, value: &OptionValue) -> Option<Annotation> {
        let value = self.aggregate("config", value)?;
        let path = match value.get("path") {
            Some(path) => self.string("config.path", path)?,
            None => String::new(),
        };
        let method = match value.get("method") {
            Some(method) => self.enumeration("config.method", method).unwrap_or_default(),
            None => HttpMethod::default(),
        };
        Some(Annotation::Http(HttpRule { path, method }))
    }

    fn service_config(&mut self, value: &OptionValue) -> Option<Annotation> {
        let value = self.aggregate("service_config", value)?;
        let base_path = match value.get("base_path") {
            Some(base_path) => self.string("service_config.base_path", base_path)?,
            None => String::new(),
        };
        (!base_path.is_empty()).then_some(Annotation::BasePath(base_path))
    }

    fn headers(&mut self, extension: &str, value: &OptionValue) -> Option<Annotation> {
        let value = self.aggregate(extension, value)?;
        let mut headers = Vec::new();
        for header in value.get_all("required_headers") {
            if !matches!(header, OptionValue::Aggregate(_)) {
                self.invalid(extension, header);
                continue;
            }
            let text = |key: &str| {
                header
                    .get(key)
                    .and_then(OptionValue::as_str)
                    .unwrap_or_default()
                    .to_string()
            };
            let flag = |key: &str| header.get(key).and_then(OptionValue::as_bool).unwrap_or(false);
            let requirement = HeaderRequirement {
                name: text("name"),
                required: flag("required"),
                format: text("format"),
                header_type: text("type"),
                description: text("description"),
                example: text("example"),
                deprecated: flag("deprecated"),
            };
            if requirement.name.is_empty() {
                warn!("{}: skipping `{}` entry without a name", self.element, extension);
                continue;
            }
            headers.push(requirement);
        }
        (!headers.is_empty()).then_some(Annotation::HeaderRequirements(headers))
    }
}

/// Field-level annotations, with unset values left as `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldAnnotations {
    pub unwrap: bool,
    /// The flatten prefix; `Some("")` for an unprefixed flatten.
    pub flatten: Option<String>,
    /// A `flatten_prefix` given without `flatten`.
    pub stray_flatten_prefix: Option<String>,
    pub int64_encoding: Option<Int64Encoding>,
    pub enum_encoding: Option<EnumEncoding>,
    pub timestamp_format: Option<TimestampFormat>,
    pub bytes_encoding: Option<BytesEncoding>,
    pub query: Option<Binding>,
    pub nullable: bool,
    pub empty_behavior: Option<EmptyBehavior>,
    pub oneof_value: Option<String>,
    pub examples: Vec<String>,
}

impl FieldAnnotations {
    pub fn from_annotations(annotations: Vec<Annotation>) -> Self {
        let mut record = FieldAnnotations::default();
        let mut prefix = None;
        for annotation in annotations {
            match annotation {
                Annotation::Unwrap => record.unwrap = true,
                Annotation::Flatten { prefix } => record.flatten = Some(prefix),
                Annotation::FlattenPrefix(p) => prefix = Some(p),
                Annotation::IntEncoding(e) => record.int64_encoding = Some(e),
                Annotation::EnumEncoding(e) => record.enum_encoding = Some(e),
                Annotation::TimestampFormat(f) => record.timestamp_format = Some(f),
                Annotation::BytesEncoding(e) => record.bytes_encoding = Some(e),
                Annotation::Binding(binding) => record.query = Some(binding),
                Annotation::Nullable => record.nullable = true,
                Annotation::EmptyBehavior(b) => record.empty_behavior = Some(b),
                Annotation::OneofValue(v) => record.oneof_value = Some(v),
                Annotation::Examples(examples) => record.examples = examples,
                _ => {}
            }
        }
        match (&mut record.flatten, prefix) {
            (Some(flatten), Some(prefix)) => *flatten = prefix,
            (None, Some(prefix)) => record.stray_flatten_prefix = Some(prefix),
            _ => {}
        }
        record
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OneofAnnotations {
    pub discriminator: Option<Discriminator>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnumAnnotations {
    pub encoding: Option<EnumEncoding>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnumValueAnnotations {
    /// The JSON literal replacing the declared value name.
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServiceAnnotations {
    pub base_path: Option<String>,
    pub headers: Vec<HeaderRequirement>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MethodAnnotations {
    pub http: Option<HttpRule>,
    pub headers: Vec<HeaderRequirement>,
}

/// The decoded annotations of every element in a [`Schema`], addressed by element id.
#[derive(Debug, Clone, Default)]
pub struct Annotations {
    fields: Vec<FieldAnnotations>,
    oneofs: Vec<OneofAnnotations>,
    enums: Vec<EnumAnnotations>,
    enum_values: Vec<EnumValueAnnotations>,
    services: Vec<ServiceAnnotations>,
    methods: Vec<MethodAnnotations>,
    errors: Vec<DecodingError>,
}

impl Annotations {
    pub fn extract(schema: &Schema, extension_package: &str) -> Annotations {
        let mut annotations = Annotations::default();
        let mut decode_element =
            |name: &FullyQualifiedName, kind: ElementKind, local: &str, options: &RawOptions| {
                let (decoded, errors) = decode(name, kind, local, options, extension_package);
                annotations.errors.extend(errors);
                decoded
            };

        let mut fields = Vec::with_capacity(schema.field_count());
        for (_, field) in schema.fields() {
            let decoded = decode_element(
                &field.name,
                ElementKind::Field,
                &field.field_name,
                &field.options,
            );
            fields.push(FieldAnnotations::from_annotations(decoded));
        }

        let mut oneofs = Vec::with_capacity(schema.oneof_count());
        for (_, oneof) in schema.oneofs() {
            let decoded = decode_element(
                &oneof.name,
                ElementKind::Oneof,
                &oneof.oneof_name,
                &oneof.options,
            );
            let discriminator = decoded.into_iter().find_map(|a| match a {
                Annotation::Discriminator(d) => Some(d),
                _ => None,
            });
            oneofs.push(OneofAnnotations { discriminator });
        }

        let mut enums = Vec::with_capacity(schema.enum_count());
        for (_, enumeration) in schema.enums() {
            let decoded = decode_element(
                &enumeration.name,
                ElementKind::Enum,
                enumeration.name.name(),
                &enumeration.options,
            );
            let encoding = decoded.into_iter().find_map(|a| match a {
                Annotation::EnumEncoding(e) => Some(e),
                _ => None,
            });
            enums.push(EnumAnnotations { encoding });
        }

        let mut enum_values = Vec::with_capacity(schema.enum_value_count());
        for (_, value) in schema.enum_values() {
            let decoded = decode_element(
                &value.name,
                ElementKind::EnumValue,
                &value.value_name,
                &value.options,
            );
            let name = decoded.into_iter().find_map(|a| match a {
                Annotation::EnumValueName(name) => Some(name),
                _ => None,
            });
            enum_values.push(EnumValueAnnotations { name });
        }

        let mut services = Vec::with_capacity(schema.service_count());
        for (_, service) in schema.services() {
            let decoded = decode_element(
                &service.name,
                ElementKind::Service,
                service.name.name(),
                &service.options,
            );
            let mut record = ServiceAnnotations::default();
            for annotation in decoded {
                match annotation {
                    Annotation::BasePath(base_path) => record.base_path = Some(base_path),
                    Annotation::HeaderRequirements(headers) => record.headers.extend(headers),
                    _ => {}
                }
            }
            services.push(record);
        }

        let mut methods = Vec::with_capacity(schema.method_count());
        for (_, method) in schema.methods() {
            let decoded = decode_element(
                &method.name,
                ElementKind::Method,
                &method.method_name,
                &method.options,
            );
            let mut record = MethodAnnotations::default();
            for annotation in decoded {
                match annotation {
                    Annotation::Http(rule) => record.http = Some(rule),
                    Annotation::HeaderRequirements(headers) => record.headers.extend(headers),
                    _ => {}
                }
            }
            methods.push(record);
        }

        annotations.fields = fields;
        annotations.oneofs = oneofs;
        annotations.enums = enums;
        annotations.enum_values = enum_values;
        annotations.services = services;
        annotations.methods = methods;
        annotations
    }

    pub fn field(&self, id: FieldId) -> &FieldAnnotations {
        &self.fields[id.index()]
    }

    pub fn oneof(&self, id: OneofId) -> &OneofAnnotations {
        &self.oneofs[id.index()]
    }

    pub fn enumeration(&self, id: EnumId) -> &EnumAnnotations {
        &self.enums[id.index()]
    }

    pub fn enum_value(&self, id: EnumValueId) -> &EnumValueAnnotations {
        &self.enum_values[id.index()]
    }

    pub fn service(&self, id: ServiceId) -> &ServiceAnnotations {
        &self.services[id.index()]
    }

    pub fn method(&self, id: MethodId) -> &MethodAnnotations {
        &self.methods[id.index()]
    }

    pub fn decoding_errors(&self) -> &[DecodingError] {
        &self.errors
    }
}
