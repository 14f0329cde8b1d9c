//! # Module Registry
//!
//! Maps a module kind, as named in the gateway configuration, to the factory
//! that creates modules of that kind.
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                ModuleRegistry                │
//! │                                              │
//! │  "hello_world" ──► HelloWorldFactory         │
//! │  "logger"      ──► LoggerFactory             │
//! │  "echo"        ──► EchoFactory               │
//! │  ...           ──► (registered at startup)   │
//! └──────────────────────────────────────────────┘
//!          │ create(ModuleContext)
//!          ▼
//!    Arc<dyn Module>  ──► MessageBus::add_module
//! ```
//!
//! Modules are plain Rust types; there is no loading from shared libraries.

use std::collections::HashMap;
use std::sync::Arc;

use gateway_bus::ModuleContext;
use gateway_types::{Module, ModuleError};
use thiserror::Error;
use tracing::debug;

use crate::modules::{EchoFactory, HelloWorldFactory, LoggerFactory};

/// Creates modules of one kind.
pub trait ModuleFactory: Send + Sync {
    /// Kind name used in the gateway configuration.
    fn kind(&self) -> &'static str;

    /// Create a module bound to `context`.
    ///
    /// The module is attached to the bus only after this returns. Factories
    /// that start background work need a Tokio runtime.
    fn create(&self, context: ModuleContext) -> Result<Arc<dyn Module>, ModuleError>;
}

/// Registry errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("A factory for kind {0:?} is already registered")]
    DuplicateKind(&'static str),
}

/// Kind to factory lookup.
#[derive(Default)]
pub struct ModuleRegistry {
    factories: HashMap<&'static str, Arc<dyn ModuleFactory>>,
}

impl ModuleRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the bundled sample modules.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        let builtins: [Arc<dyn ModuleFactory>; 3] = [
            Arc::new(HelloWorldFactory),
            Arc::new(LoggerFactory),
            Arc::new(EchoFactory),
        ];
        for factory in builtins {
            // Built-in kinds are distinct
            let _ = registry.register(factory);
        }
        registry
    }

    /// Add a factory. Kinds are unique.
    pub fn register(&mut self, factory: Arc<dyn ModuleFactory>) -> Result<(), RegistryError> {
        let kind = factory.kind();
        if self.factories.contains_key(kind) {
            return Err(RegistryError::DuplicateKind(kind));
        }
        debug!(kind, "Registered module factory");
        self.factories.insert(kind, factory);
        Ok(())
    }

    /// Look up the factory for `kind`.
    pub fn get(&self, kind: &str) -> Option<Arc<dyn ModuleFactory>> {
        self.factories.get(kind).cloned()
    }

    /// Registered kinds, sorted.
    pub fn kinds(&self) -> Vec<&'static str> {
        let mut kinds: Vec<_> = self.factories.keys().copied().collect();
        kinds.sort_unstable();
        kinds
    }
}

impl std::fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}
