//! Externally visible field kinds and their JSON shapes.

use crate::annotations::{BytesEncoding, EnumEncoding, Int64Encoding, TimestampFormat};
use crate::descriptor::Type;
use crate::fully_qualified_name::FullyQualifiedName;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Double,
    Float,
    Int32,
    Int64,
    Uint32,
    Uint64,
    Sint32,
    Sint64,
    Fixed32,
    Fixed64,
    Sfixed32,
    Sfixed64,
    Bool,
    String,
    Bytes,
}

impl ScalarKind {
    /// The scalar kind of a field type, or `None` for message, group and enum types.
    pub fn from_type(ty: Type) -> Option<ScalarKind> {
        Some(match ty {
            Type::Double => ScalarKind::Double,
            Type::Float => ScalarKind::Float,
            Type::Int32 => ScalarKind::Int32,
            Type::Int64 => ScalarKind::Int64,
            Type::Uint32 => ScalarKind::Uint32,
            Type::Uint64 => ScalarKind::Uint64,
            Type::Sint32 => ScalarKind::Sint32,
            Type::Sint64 => ScalarKind::Sint64,
            Type::Fixed32 => ScalarKind::Fixed32,
            Type::Fixed64 => ScalarKind::Fixed64,
            Type::Sfixed32 => ScalarKind::Sfixed32,
            Type::Sfixed64 => ScalarKind::Sfixed64,
            Type::Bool => ScalarKind::Bool,
            Type::String => ScalarKind::String,
            Type::Bytes => ScalarKind::Bytes,
            Type::Message | Type::Group | Type::Enum => return None,
        })
    }

    pub fn is_64_bit(self) -> bool {
        matches!(
            self,
            ScalarKind::Int64
                | ScalarKind::Uint64
                | ScalarKind::Sint64
                | ScalarKind::Fixed64
                | ScalarKind::Sfixed64
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ScalarKind::Double => "double",
            ScalarKind::Float => "float",
            ScalarKind::Int32 => "int32",
            ScalarKind::Int64 => "int64",
            ScalarKind::Uint32 => "uint32",
            ScalarKind::Uint64 => "uint64",
            ScalarKind::Sint32 => "sint32",
            ScalarKind::Sint64 => "sint64",
            ScalarKind::Fixed32 => "fixed32",
            ScalarKind::Fixed64 => "fixed64",
            ScalarKind::Sfixed32 => "sfixed32",
            ScalarKind::Sfixed64 => "sfixed64",
            ScalarKind::Bool => "bool",
            ScalarKind::String => "string",
            ScalarKind::Bytes => "bytes",
        }
    }
}

/// The resolved kind of a field, after encodings and unwrap collapsing are applied.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// 32-bit integers, floating point, bool and string.
    Scalar(ScalarKind),
    /// A 64-bit integer and its JSON encoding.
    Int64(ScalarKind, Int64Encoding),
    /// Always a string in JSON; the encoding picks the alphabet only.
    Bytes(BytesEncoding),
    Timestamp(TimestampFormat),
    Enum(FullyQualifiedName, EnumEncoding),
    Message(FullyQualifiedName),
    List(Box<FieldKind>),
    Map(ScalarKind, Box<FieldKind>),
}

/// The JSON shape of a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    Textual,
    Numeric,
    Boolean,
    Object,
    List,
    Map,
}

impl FieldKind {
    pub fn shape(&self) -> Shape {
        match self {
            FieldKind::Scalar(ScalarKind::String) | FieldKind::Scalar(ScalarKind::Bytes) => {
                Shape::Textual
            }
            FieldKind::Scalar(ScalarKind::Bool) => Shape::Boolean,
            FieldKind::Scalar(_) => Shape::Numeric,
            FieldKind::Int64(_, Int64Encoding::Number) => Shape::Numeric,
            FieldKind::Int64(_, Int64Encoding::String) => Shape::Textual,
            FieldKind::Bytes(_) => Shape::Textual,
            FieldKind::Timestamp(format) if format.is_numeric() => Shape::Numeric,
            FieldKind::Timestamp(_) => Shape::Textual,
            FieldKind::Enum(_, EnumEncoding::Number) => Shape::Numeric,
            FieldKind::Enum(_, EnumEncoding::String) => Shape::Textual,
            FieldKind::Message(_) => Shape::Object,
            FieldKind::List(_) => Shape::List,
            FieldKind::Map(..) => Shape::Map,
        }
    }

    /// The element kind of a list, or the value kind of a map.
    pub fn element(&self) -> Option<&FieldKind> {
        match self {
            FieldKind::List(element) | FieldKind::Map(_, element) => Some(element),
            _ => None,
        }
    }

    /// The default value of a singular kind, compared against the kind's JSON shape.
    ///
    /// Enums are not covered here: their textual zero depends on the enum's literals.
    pub fn scalar_zero(&self) -> Option<ScalarValue> {
        match self.shape() {
            Shape::Textual => match self {
                FieldKind::Int64(..) => Some(ScalarValue::Text("0".to_string())),
                FieldKind::Scalar(_) | FieldKind::Bytes(_) => Some(ScalarValue::Text(String::new())),
                _ => None,
            },
            Shape::Numeric => match self {
                FieldKind::Timestamp(_) => None,
                _ => Some(ScalarValue::Number(0.0)),
            },
            Shape::Boolean => Some(ScalarValue::Bool(false)),
            Shape::Object | Shape::List | Shape::Map => None,
        }
    }

    /// Whether a NUMBER-encoded 64-bit integer appears anywhere in this kind.
    pub fn has_precision_risk(&self) -> bool {
        match self {
            FieldKind::Int64(_, Int64Encoding::Number) => true,
            FieldKind::List(element) | FieldKind::Map(_, element) => element.has_precision_risk(),
            _ => false,
        }
    }
}

/// A JSON scalar, as seen by default-value checks.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    Text(String),
    Number(f64),
    Bool(bool),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int64_shape_follows_encoding() {
        let textual = FieldKind::Int64(ScalarKind::Int64, Int64Encoding::String);
        let numeric = FieldKind::Int64(ScalarKind::Uint64, Int64Encoding::Number);
        assert_eq!(textual.shape(), Shape::Textual);
        assert_eq!(numeric.shape(), Shape::Numeric);
        assert_eq!(textual.scalar_zero(), Some(ScalarValue::Text("0".to_string())));
        assert_eq!(numeric.scalar_zero(), Some(ScalarValue::Number(0.0)));
        assert!(numeric.has_precision_risk());
        assert!(FieldKind::List(Box::new(numeric)).has_precision_risk());
    }

    #[test]
    fn test_timestamp_and_bytes_shapes() {
        assert_eq!(
            FieldKind::Timestamp(TimestampFormat::UnixMillis).shape(),
            Shape::Numeric
        );
        assert_eq!(FieldKind::Timestamp(TimestampFormat::Date).shape(), Shape::Textual);
        assert_eq!(FieldKind::Bytes(BytesEncoding::Hex).shape(), Shape::Textual);
        assert_eq!(FieldKind::Timestamp(TimestampFormat::UnixSeconds).scalar_zero(), None);
    }
}
