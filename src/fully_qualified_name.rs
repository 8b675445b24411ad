use std::fmt;

use itertools::Itertools;

/// The stable cross-reference key of a schema element: package plus nesting path.
///
/// Elements loaded from different files compare equal exactly when their names do.
// Invariant: should always begin with a '.' (dot)
#[derive(Debug, PartialEq, Eq, Hash, Clone, PartialOrd, Ord)]
pub struct FullyQualifiedName(String);

impl FullyQualifiedName {
    pub fn new(package_string: &str, type_path: &[impl AsRef<str>], name: &str) -> Self {
        let package = package_string.trim_matches('.');
        let segments = package
            .split('.')
            .filter(|segment| !segment.is_empty())
            .chain(
                type_path
                    .iter()
                    .map(AsRef::as_ref)
                    .map(|segment| segment.trim_matches('.')),
            )
            .chain((!name.is_empty()).then_some(name));

        Self(format!(".{}", segments.format(".")))
    }

    /// Builds a name from a type reference that is already fully qualified.
    ///
    /// A missing leading dot is added.
    pub fn from_type_name(type_name: &str) -> Self {
        if type_name.starts_with('.') {
            Self(type_name.to_string())
        } else {
            Self(format!(".{}", type_name))
        }
    }

    pub fn path_iterator(&self) -> impl DoubleEndedIterator<Item = &str> {
        self.0[1..].split('.')
    }

    pub fn join(&self, path: &str) -> Self {
        if self.0 == "." {
            Self(format!(".{}", path))
        } else {
            Self(format!("{}.{}", self.0, path))
        }
    }

    /// The last path segment.
    pub fn name(&self) -> &str {
        self.path_iterator().next_back().unwrap_or("")
    }

    /// The enclosing scope, or `None` at the root.
    pub fn parent(&self) -> Option<Self> {
        if self.0 == "." {
            return None;
        }
        match self.0.rfind('.') {
            Some(0) => Some(Self(".".to_string())),
            Some(idx) => Some(Self(self.0[..idx].to_string())),
            None => None,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for FullyQualifiedName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FullyQualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.trim_start_matches('.'))
    }
}

impl From<&str> for FullyQualifiedName {
    fn from(name: &str) -> Self {
        Self::from_type_name(name)
    }
}
