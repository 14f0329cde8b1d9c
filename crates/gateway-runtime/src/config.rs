//! # Gateway Configuration
//!
//! The JSON document describing the bus and the modules to host.
//!
//! ```json
//! {
//!   "bus": { "queue_capacity": 1024, "overflow": "drop_newest" },
//!   "modules": [
//!     { "name": "hello", "kind": "hello_world", "args": { "interval_ms": 1000 } },
//!     { "name": "log",   "kind": "logger",      "args": { "filename": "log.json" } }
//!   ]
//! }
//! ```
//!
//! `bus` may be omitted. A module's `args` is handed to its factory as the
//! module's configuration string.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use gateway_bus::BusConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::registry::ModuleRegistry;

/// Complete gateway configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Bus settings.
    #[serde(default)]
    pub bus: BusConfig,
    /// Modules to create, in creation order.
    #[serde(default)]
    pub modules: Vec<ModuleEntry>,
}

/// One module to host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleEntry {
    /// Unique name within the gateway.
    pub name: String,
    /// Factory kind, e.g. `"logger"`.
    pub kind: String,
    /// Module arguments.
    #[serde(default)]
    pub args: serde_json::Value,
}

impl ModuleEntry {
    pub fn new(name: impl Into<String>, kind: impl Into<String>, args: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            args,
        }
    }

    /// The configuration string handed to the module.
    ///
    /// Missing args become an empty string and a JSON string is passed through
    /// unquoted. Anything else is passed as compact JSON.
    pub fn configuration(&self) -> String {
        match &self.args {
            serde_json::Value::Null => String::new(),
            serde_json::Value::String(raw) => raw.clone(),
            other => other.to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid gateway configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Module #{index} has an empty name")]
    EmptyModuleName { index: usize },

    #[error("Module name {0:?} is used more than once")]
    DuplicateModuleName(String),

    #[error("Module {name:?} has unknown kind {kind:?}")]
    UnknownKind { name: String, kind: String },
}

impl GatewayConfig {
    /// Read and parse a configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Parse a configuration document.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Check names are present and unique and every kind is registered.
    pub fn validate(&self, registry: &ModuleRegistry) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for (index, entry) in self.modules.iter().enumerate() {
            entry.validate(registry, index)?;
            if !seen.insert(entry.name.as_str()) {
                return Err(ConfigError::DuplicateModuleName(entry.name.clone()));
            }
        }
        Ok(())
    }
}

impl ModuleEntry {
    pub(crate) fn validate(&self, registry: &ModuleRegistry, index: usize) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::EmptyModuleName { index });
        }
        if registry.get(&self.kind).is_none() {
            return Err(ConfigError::UnknownKind {
                name: self.name.clone(),
                kind: self.kind.clone(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_bus::OverflowPolicy;
    use serde_json::json;
    use std::io::Write;

    const SAMPLE: &str = r#"{
        "bus": { "queue_capacity": 16, "overflow": "reject" },
        "modules": [
            { "name": "hello", "kind": "hello_world", "args": { "interval_ms": 1000 } },
            { "name": "log", "kind": "logger" }
        ]
    }"#;

    #[test]
    fn test_parse_sample() {
        let config = GatewayConfig::from_json(SAMPLE).unwrap();
        assert_eq!(config.bus.queue_capacity, 16);
        assert_eq!(config.bus.overflow, OverflowPolicy::Reject);
        assert_eq!(config.modules.len(), 2);
        assert_eq!(config.modules[0].args, json!({ "interval_ms": 1000 }));
        assert_eq!(config.modules[1].args, serde_json::Value::Null);
        assert!(config.validate(&ModuleRegistry::with_builtins()).is_ok());
    }

    #[test]
    fn test_bus_section_optional() {
        let config = GatewayConfig::from_json(r#"{ "modules": [] }"#).unwrap();
        assert_eq!(config.bus, BusConfig::default());
    }

    #[test]
    fn test_configuration_string() {
        let entry = |args| ModuleEntry::new("m", "logger", args);
        assert_eq!(entry(serde_json::Value::Null).configuration(), "");
        assert_eq!(entry(json!("raw text")).configuration(), "raw text");
        assert_eq!(
            entry(json!({ "filename": "a.json" })).configuration(),
            r#"{"filename":"a.json"}"#
        );
    }

    #[test]
    fn test_validate_rejects_duplicates() {
        let mut config = GatewayConfig::from_json(SAMPLE).unwrap();
        config.modules[1].name = "hello".into();
        assert!(matches!(
            config.validate(&ModuleRegistry::with_builtins()),
            Err(ConfigError::DuplicateModuleName(name)) if name == "hello"
        ));
    }

    #[test]
    fn test_validate_rejects_empty_name_and_unknown_kind() {
        let registry = ModuleRegistry::with_builtins();

        let mut config = GatewayConfig::from_json(SAMPLE).unwrap();
        config.modules[1].name = "  ".into();
        assert!(matches!(
            config.validate(&registry),
            Err(ConfigError::EmptyModuleName { index: 1 })
        ));

        let mut config = GatewayConfig::from_json(SAMPLE).unwrap();
        config.modules[0].kind = "java_module".into();
        assert!(matches!(
            config.validate(&registry),
            Err(ConfigError::UnknownKind { kind, .. }) if kind == "java_module"
        ));
    }

    #[test]
    fn test_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let config = GatewayConfig::from_path(file.path()).unwrap();
        assert_eq!(config.modules[0].name, "hello");

        assert!(matches!(
            GatewayConfig::from_path("/nonexistent/gateway.json"),
            Err(ConfigError::Io { .. })
        ));
        assert!(matches!(
            GatewayConfig::from_json("{ not json"),
            Err(ConfigError::Parse(_))
        ));
    }
}
