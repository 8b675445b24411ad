//! Errors reported by a resolution run.
//!
//! Every error names the fully-qualified element it concerns, so callers can attribute it to
//! the file or service being generated.

use thiserror::Error;

use crate::fully_qualified_name::FullyQualifiedName;
use crate::options::TextFormatError;

/// A malformed or unknown annotation value, found while decoding a single element.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodingError {
    #[error("{element}: invalid value `{value}` for annotation `{field}`")]
    InvalidAnnotationValue {
        element: FullyQualifiedName,
        field: String,
        value: String,
    },
    #[error("{element}: {source}")]
    MalformedOption {
        element: FullyQualifiedName,
        #[source]
        source: TextFormatError,
    },
}

impl DecodingError {
    pub fn element(&self) -> &FullyQualifiedName {
        match self {
            DecodingError::InvalidAnnotationValue { element, .. }
            | DecodingError::MalformedOption { element, .. } => element,
        }
    }
}

/// A rule violation between annotations, or between an annotation and its target.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConflictError {
    #[error("{element}: invalid unwrap target: {detail}")]
    InvalidUnwrapTarget {
        element: FullyQualifiedName,
        detail: String,
    },
    /// `element` is the enum; `field` is set when the NUMBER encoding came from a field.
    #[error("{element}: enum_encoding NUMBER cannot be combined with enum_value overrides{}", field_suffix(.field))]
    EnumEncodingConflict {
        element: FullyQualifiedName,
        field: Option<FullyQualifiedName>,
    },
    #[error("{element}: conflicting requirements for header `{header}`: {detail}")]
    HeaderRequirementConflict {
        element: FullyQualifiedName,
        header: String,
        detail: String,
    },
    #[error("{element}: invalid flatten target: {detail}")]
    InvalidFlattenTarget {
        element: FullyQualifiedName,
        detail: String,
    },
    #[error("{element}: discriminator value `{value}` is used by both `{first}` and `{second}`")]
    DuplicateDiscriminatorValue {
        element: FullyQualifiedName,
        value: String,
        first: String,
        second: String,
    },
    #[error("{element}: discriminator references unknown oneof case `{case}`")]
    UnknownOneofCase {
        element: FullyQualifiedName,
        case: String,
    },
    #[error("{element}: invalid discriminator: {detail}")]
    InvalidDiscriminator {
        element: FullyQualifiedName,
        detail: String,
    },
    #[error("{element}: flattened name `{name}` collides with {detail}")]
    FlattenCollision {
        element: FullyQualifiedName,
        name: String,
        detail: String,
    },
    #[error("{element}: annotation `{annotation}` {detail}")]
    InvalidAnnotationTarget {
        element: FullyQualifiedName,
        annotation: String,
        detail: String,
    },
    #[error("{element}: invalid HTTP binding: {detail}")]
    InvalidBinding {
        element: FullyQualifiedName,
        detail: String,
    },
}

fn field_suffix(field: &Option<FullyQualifiedName>) -> String {
    match field {
        Some(field) => format!(" (requested by field {})", field),
        None => String::new(),
    }
}

impl ConflictError {
    /// The element the diagnostic is reported against.
    pub fn element(&self) -> &FullyQualifiedName {
        match self {
            ConflictError::InvalidUnwrapTarget { element, .. }
            | ConflictError::EnumEncodingConflict { element, .. }
            | ConflictError::HeaderRequirementConflict { element, .. }
            | ConflictError::InvalidFlattenTarget { element, .. }
            | ConflictError::DuplicateDiscriminatorValue { element, .. }
            | ConflictError::UnknownOneofCase { element, .. }
            | ConflictError::InvalidDiscriminator { element, .. }
            | ConflictError::FlattenCollision { element, .. }
            | ConflictError::InvalidAnnotationTarget { element, .. }
            | ConflictError::InvalidBinding { element, .. } => element,
        }
    }

    /// Every element whose generation unit is blocked by this conflict.
    ///
    /// An enum encoding conflict requested by a field also blocks the field's file.
    pub fn elements(&self) -> Vec<&FullyQualifiedName> {
        match self {
            ConflictError::EnumEncodingConflict {
                element,
                field: Some(field),
            } => vec![element, field],
            other => vec![other.element()],
        }
    }

    /// A short rule name, stable across versions.
    pub fn rule(&self) -> &'static str {
        match self {
            ConflictError::InvalidUnwrapTarget { .. } => "InvalidUnwrapTarget",
            ConflictError::EnumEncodingConflict { .. } => "EnumEncodingConflict",
            ConflictError::HeaderRequirementConflict { .. } => "HeaderRequirementConflict",
            ConflictError::InvalidFlattenTarget { .. } => "InvalidFlattenTarget",
            ConflictError::DuplicateDiscriminatorValue { .. } => "DuplicateDiscriminatorValue",
            ConflictError::UnknownOneofCase { .. } => "UnknownOneofCase",
            ConflictError::InvalidDiscriminator { .. } => "InvalidDiscriminator",
            ConflictError::FlattenCollision { .. } => "FlattenCollision",
            ConflictError::InvalidAnnotationTarget { .. } => "InvalidAnnotationTarget",
            ConflictError::InvalidBinding { .. } => "InvalidBinding",
        }
    }
}

/// A reference that cannot be followed within the loaded schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    #[error("{element}: type `{type_name}` not found in any loaded file")]
    UnresolvedType {
        element: FullyQualifiedName,
        type_name: String,
    },
    #[error("no element named `{0}` in the loaded schema")]
    UnknownElement(FullyQualifiedName),
}

impl ResolutionError {
    pub fn element(&self) -> &FullyQualifiedName {
        match self {
            ResolutionError::UnresolvedType { element, .. } => element,
            ResolutionError::UnknownElement(element) => element,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error(transparent)]
    Decoding(#[from] DecodingError),
    #[error(transparent)]
    Conflict(#[from] ConflictError),
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("failed to decode descriptor set: {0}")]
    Descriptor(#[from] prost::DecodeError),
}

impl Error {
    /// The element the error concerns, when there is one.
    pub fn element(&self) -> Option<&FullyQualifiedName> {
        match self {
            Error::Decoding(e) => Some(e.element()),
            Error::Conflict(e) => Some(e.element()),
            Error::Resolution(e) => Some(e.element()),
            Error::Config(_) | Error::Descriptor(_) => None,
        }
    }
}
