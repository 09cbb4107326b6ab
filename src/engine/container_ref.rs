//! Opaque container identifiers.

use std::fmt;

/// Identifier naming a container at the engine.
///
/// The reference is a lookup key only; whether the container still exists
/// is decided by the engine at query time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContainerRef(String);

impl ContainerRef {
    /// Wrap a container ID or name.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Return the identifier as sent to the engine.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ContainerRef {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for ContainerRef {
    fn from(id: &str) -> Self {
        Self(String::from(id))
    }
}

impl AsRef<str> for ContainerRef {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
