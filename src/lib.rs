//! `protoshape` resolves the HTTP/JSON annotations of a set of Protocol Buffers files into the
//! structural plans code generators emit from.
//!
//! A run takes every loaded file, generated or merely imported, and proceeds in two phases:
//!
//!  1. The schema is walked, each element's custom options are decoded into typed annotations,
//!     and a [`GlobalUnwrapIndex`] of wrapper messages is built over all files. The whole schema
//!     is validated once.
//!  2. Emitters ask the resulting [`Resolution`] for field, message, oneof, enum and HTTP binding
//!     plans. Plans are computed on first request and memoized for the rest of the run.
//!
//! ## Example
//!
//! ```rust,ignore
//! use protoshape::{Config, FileDescriptor, MessageDescriptor, FieldDescriptor, Type};
//!
//! let resolution = Config::new().resolve(vec![
//!     FileDescriptor::new("counter.proto", "demo").message(
//!         MessageDescriptor::new("Counter").field(FieldDescriptor::new("count", 1, Type::Int64)),
//!     ),
//! ]);
//! assert!(resolution.validate_all().is_empty());
//!
//! // 64-bit integers are JSON strings unless annotated otherwise.
//! let plan = resolution.plan(&".demo.Counter.count".into())?;
//! assert_eq!(plan.shape, protoshape::Shape::Textual);
//! ```
//!
//! Errors never abort a run. Each is attributed to the file or service it blocks; see
//! [`Resolution::file_status`] and [`Resolution::service_status`].

#![doc(html_root_url = "https://docs.rs/protoshape/0.1.0")]

mod annotations;
mod context;
mod descriptor;
mod diagnostics;
mod error;
mod file_descriptor_set;
mod fully_qualified_name;
mod ident;
mod kind;
mod message_graph;
mod options;
mod planner;
mod unwrap_index;
mod validate;
mod walker;

pub use annotations::{
    Annotations, Binding, BytesEncoding, Discriminator, DiscriminatorVariant, EmptyBehavior,
    EnumAnnotations, EnumEncoding, EnumValueAnnotations, FieldAnnotations, HeaderRequirement,
    HttpMethod, HttpRule, Int64Encoding, MethodAnnotations, OneofAnnotations, ServiceAnnotations,
    TimestampFormat,
};
pub use context::Context;
pub use descriptor::{
    EnumDescriptor, EnumValueDescriptor, FieldDescriptor, FileDescriptor, Label,
    MessageDescriptor, MethodDescriptor, OneofDescriptor, ServiceDescriptor, Syntax, Type,
};
pub use diagnostics::{Diagnostic, MAX_SAFE_INTEGER};
pub use error::{ConflictError, DecodingError, Error, ResolutionError};
pub use file_descriptor_set::{
    decode_file_descriptor_set, from_code_generator_request, from_file_descriptor_set,
};
pub use fully_qualified_name::FullyQualifiedName;
pub use kind::{FieldKind, ScalarKind, ScalarValue, Shape};
pub use options::{parse_aggregate, OptionValue, RawOption, RawOptions, TextFormatError};
pub use planner::{
    EnumPlan, EnumValuePlan, FieldPlan, HttpBinding, Member, MemberSource, MessagePlan, PathParam,
    Placement, QueryParam, Representation, Resolution, UnionPlan, VariantPayload, VariantPlan,
};
pub use unwrap_index::{
    resolve_field_shape, resolve_message_shape, GlobalUnwrapIndex, UnwrapEntry,
    UnwrapIndexBuilder,
};
pub use validate::{validate, validate_all};
pub use walker::{
    ElementId, EnumElement, EnumId, EnumValueElement, EnumValueId, FieldElement, FieldId,
    FileElement, FileId, MessageElement, MessageId, MethodElement, MethodId, OneofElement,
    OneofId, Schema, ServiceElement, ServiceId, TypeRef,
};

use log::debug;

const DEFAULT_EXTENSION_PACKAGE: &str = "sebuf.http";
const DEFAULT_TIMESTAMP_TYPE: &str = ".google.protobuf.Timestamp";

/// Configuration options for a resolution run.
#[derive(Debug, Clone)]
pub struct Config {
    extension_package: String,
    timestamp_type: String,
    precision_diagnostics: bool,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            extension_package: DEFAULT_EXTENSION_PACKAGE.to_string(),
            timestamp_type: DEFAULT_TIMESTAMP_TYPE.to_string(),
            precision_diagnostics: true,
        }
    }
}

impl Config {
    /// Creates a new configuration with default options.
    pub fn new() -> Config {
        Config::default()
    }

    /// Parses a protoc plugin parameter string of comma-separated `key=value` pairs.
    ///
    /// Recognized keys are `extension_package`, `timestamp_type` and `precision_diagnostics`
    /// (`true` or `false`). Any other key is an error.
    pub fn from_parameter(parameter: &str) -> Result<Config, Error> {
        let mut config = Config::new();
        for entry in parameter.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (key, value) = match entry.split_once('=') {
                Some((key, value)) => (key.trim(), value.trim()),
                None => (entry, "true"),
            };
            match key {
                "extension_package" => {
                    config.extension_package(value);
                }
                "timestamp_type" => {
                    config.timestamp_type(value);
                }
                "precision_diagnostics" => {
                    let enabled = value.parse::<bool>().map_err(|_| {
                        Error::Config(format!("invalid value `{}` for `{}`", value, key))
                    })?;
                    config.precision_diagnostics(enabled);
                }
                _ => return Err(Error::Config(format!("unknown parameter `{}`", key))),
            }
        }
        Ok(config)
    }

    /// Sets the protobuf package declaring the annotation extensions.
    ///
    /// Options are recognized by their full name, e.g. `sebuf.http.unwrap` for the default
    /// package.
    pub fn extension_package<S>(&mut self, package: S) -> &mut Self
    where
        S: Into<String>,
    {
        self.extension_package = package.into().trim_matches('.').to_string();
        self
    }

    /// Sets the well-known timestamp message type, which is planned as a scalar.
    pub fn timestamp_type<S>(&mut self, type_name: S) -> &mut Self
    where
        S: AsRef<str>,
    {
        self.timestamp_type = FullyQualifiedName::from_type_name(type_name.as_ref())
            .as_str()
            .to_string();
        self
    }

    /// Enables or disables precision-risk diagnostics for 64-bit integers encoded as numbers.
    pub fn precision_diagnostics(&mut self, enabled: bool) -> &mut Self {
        self.precision_diagnostics = enabled;
        self
    }

    pub fn extension_package_name(&self) -> &str {
        &self.extension_package
    }

    pub fn timestamp_type_name(&self) -> &str {
        &self.timestamp_type
    }

    pub fn precision_diagnostics_enabled(&self) -> bool {
        self.precision_diagnostics
    }

    /// Walks, indexes and validates `files`, returning the run from which plans are requested.
    ///
    /// `files` must include every imported file, not only those marked for generation.
    pub fn resolve<I>(&self, files: I) -> Resolution
    where
        I: IntoIterator<Item = FileDescriptor>,
    {
        let schema = Schema::walk(files);
        debug!(
            "walked {} file(s), {} message(s), {} service(s)",
            schema.file_count(),
            schema.message_count(),
            schema.service_count()
        );
        Resolution::new(Context::new(self.clone(), schema))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_parameter() {
        let config = Config::from_parameter(
            "extension_package=acme.http, timestamp_type=acme.Time,precision_diagnostics=false",
        )
        .unwrap();
        assert_eq!(config.extension_package_name(), "acme.http");
        assert_eq!(config.timestamp_type_name(), ".acme.Time");
        assert!(!config.precision_diagnostics_enabled());

        assert!(Config::from_parameter("").is_ok());
        assert_eq!(
            Config::from_parameter("emit_everything=1").unwrap_err(),
            Error::Config("unknown parameter `emit_everything`".to_string())
        );
        assert!(Config::from_parameter("precision_diagnostics=maybe").is_err());
    }

    #[test]
    fn test_custom_extension_package() {
        let mut config = Config::new();
        config.extension_package("acme.http");
        let resolution = config.resolve(vec![FileDescriptor::new("c.proto", "pkg").message(
            MessageDescriptor::new("Counter")
                .field(
                    FieldDescriptor::new("count", 1, Type::Int64)
                        .option("acme.http.int64_encoding", OptionValue::ident("NUMBER")),
                )
                .field(
                    FieldDescriptor::new("total", 2, Type::Int64)
                        .option("sebuf.http.int64_encoding", OptionValue::ident("NUMBER")),
                ),
        )]);
        let shape = |name: &str| resolution.plan(&name.into()).unwrap().shape;
        assert_eq!(shape(".pkg.Counter.count"), Shape::Numeric);
        assert_eq!(shape(".pkg.Counter.total"), Shape::Textual);
    }
}
