//! # Core Domain Entities
//!
//! The two values that cross every boundary of the gateway:
//!
//! - **Message**: an opaque content payload plus string properties.
//! - **`ModuleHandle`**: an opaque identifier for a hosted module instance.
//!
//! A module handle is allocated by the host and is never a memory address;
//! it is only meaningful as a key into the bus routing table.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Message properties, kept in key order so encoding is deterministic.
pub type Properties = BTreeMap<String, String>;

/// Opaque identifier of a module instance hosted on a bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModuleHandle(Uuid);

impl ModuleHandle {
    /// Allocate a fresh handle.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing identifier.
    #[must_use]
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// The underlying identifier.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ModuleHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ModuleHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A message travelling on the bus.
///
/// Messages are immutable after construction. The bus shares a single
/// `Arc<Message>` between all receivers instead of copying it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    content: Vec<u8>,
    properties: Properties,
}

impl Message {
    /// Create a message from raw content and properties.
    #[must_use]
    pub fn new(content: impl Into<Vec<u8>>, properties: Properties) -> Self {
        Self {
            content: content.into(),
            properties,
        }
    }

    /// Create a message whose content is UTF-8 text.
    #[must_use]
    pub fn from_text(content: &str, properties: Properties) -> Self {
        Self::new(content.as_bytes(), properties)
    }

    /// Add a property, replacing any previous value for `key`.
    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// The raw content bytes.
    #[must_use]
    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// The content as text, replacing invalid UTF-8 sequences.
    #[must_use]
    pub fn content_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.content)
    }

    #[must_use]
    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    #[must_use]
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// Consume the message, returning its parts.
    #[must_use]
    pub fn into_parts(self) -> (Vec<u8>, Properties) {
        (self.content, self.properties)
    }
}
