//! # Gateway
//!
//! Owns a message bus and the modules hosted on it.
//!
//! ## Lifecycle
//!
//! 1. Validate the configuration against the registry
//! 2. Create the bus
//! 3. For each module, in order: allocate a handle, call the factory with a
//!    [`ModuleContext`], attach the module to the bus
//! 4. On any failure, detach and destroy what was created, newest first
//!
//! [`Gateway::destroy`] tears down in reverse creation order: a module is
//! detached (its worker stopped, its queue discarded) before its `destroy`
//! hook runs.

use std::sync::Arc;

use gateway_bus::{BusError, BusStats, MessageBus, ModuleContext};
use gateway_telemetry::{log_module_event, metric_inc, MODULE_ERRORS};
use gateway_types::{Message, Module, ModuleError, ModuleHandle};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::{ConfigError, GatewayConfig, ModuleEntry};
use crate::registry::ModuleRegistry;

/// Gateway errors.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Module {name:?} failed to start: {source}")]
    Module {
        name: String,
        #[source]
        source: ModuleError,
    },

    #[error("Module {name:?} could not be attached: {source}")]
    Attach {
        name: String,
        #[source]
        source: BusError,
    },

    #[error("No module named {0:?}")]
    ModuleNotFound(String),

    #[error("Publish failed: {0}")]
    Publish(#[from] BusError),
}

/// A module created by the gateway.
struct Hosted {
    name: String,
    kind: String,
    handle: ModuleHandle,
    module: Arc<dyn Module>,
}

/// A running set of modules on one bus.
pub struct Gateway {
    bus: MessageBus,
    /// Creation order.
    modules: Vec<Hosted>,
    /// Source handle for host publishes; never attached, so every module receives them.
    host: ModuleHandle,
}

impl Gateway {
    /// Create a gateway and every module in `config`.
    ///
    /// Nothing is left running if this fails.
    pub async fn create(
        config: GatewayConfig,
        registry: &ModuleRegistry,
    ) -> Result<Self, GatewayError> {
        config.validate(registry)?;

        let mut gateway = Self {
            bus: MessageBus::with_config(config.bus),
            modules: Vec::with_capacity(config.modules.len()),
            host: ModuleHandle::new(),
        };

        for entry in &config.modules {
            if let Err(e) = gateway.start_module(entry, registry).await {
                warn!(module = %entry.name, error = %e, "Gateway creation failed, rolling back");
                gateway.teardown().await;
                return Err(e);
            }
        }

        info!(modules = gateway.modules.len(), "Gateway created");
        Ok(gateway)
    }

    /// Create and attach one more module.
    pub async fn add_module(
        &mut self,
        entry: &ModuleEntry,
        registry: &ModuleRegistry,
    ) -> Result<ModuleHandle, GatewayError> {
        entry.validate(registry, self.modules.len())?;
        if self.modules.iter().any(|m| m.name == entry.name) {
            return Err(ConfigError::DuplicateModuleName(entry.name.clone()).into());
        }
        self.start_module(entry, registry).await
    }

    /// Detach and destroy the named module.
    pub async fn remove_module(&mut self, name: &str) -> Result<(), GatewayError> {
        let index = self
            .modules
            .iter()
            .position(|m| m.name == name)
            .ok_or_else(|| GatewayError::ModuleNotFound(name.to_string()))?;
        let hosted = self.modules.remove(index);
        self.stop_module(hosted).await;
        Ok(())
    }

    /// Publish a message from the host. Every module receives it.
    pub fn publish(&self, message: Message) -> Result<usize, GatewayError> {
        Ok(self.bus.publish(self.host, message)?)
    }

    /// Handle of the named module.
    pub fn module_handle(&self, name: &str) -> Option<ModuleHandle> {
        self.modules.iter().find(|m| m.name == name).map(|m| m.handle)
    }

    /// Module names, in creation order.
    pub fn module_names(&self) -> Vec<&str> {
        self.modules.iter().map(|m| m.name.as_str()).collect()
    }

    /// The bus modules are attached to.
    pub fn bus(&self) -> &MessageBus {
        &self.bus
    }

    pub fn stats(&self) -> BusStats {
        self.bus.stats()
    }

    /// Detach and destroy every module, newest first.
    pub async fn destroy(mut self) {
        self.teardown().await;
        info!("Gateway destroyed");
    }

    async fn start_module(
        &mut self,
        entry: &ModuleEntry,
        registry: &ModuleRegistry,
    ) -> Result<ModuleHandle, GatewayError> {
        let factory = registry.get(&entry.kind).ok_or_else(|| ConfigError::UnknownKind {
            name: entry.name.clone(),
            kind: entry.kind.clone(),
        })?;

        let handle = ModuleHandle::new();
        let context = ModuleContext::new(handle, self.bus.handle(), entry.configuration());

        let module = factory.create(context).map_err(|source| {
            metric_inc!(MODULE_ERRORS, &[entry.kind.as_str(), "create"]);
            GatewayError::Module {
                name: entry.name.clone(),
                source,
            }
        })?;

        if let Err(source) = self.bus.add_module(handle, Arc::clone(&module)) {
            metric_inc!(MODULE_ERRORS, &[entry.kind.as_str(), "attach"]);
            // Created but never attached; it still gets its destroy call.
            module.destroy().await;
            return Err(GatewayError::Attach {
                name: entry.name.clone(),
                source,
            });
        }

        log_module_event!(info, entry.name.as_str(), "Module started", handle, kind = %entry.kind);
        self.modules.push(Hosted {
            name: entry.name.clone(),
            kind: entry.kind.clone(),
            handle,
            module,
        });
        Ok(handle)
    }

    async fn stop_module(&self, hosted: Hosted) {
        match self.bus.remove_module(hosted.handle).await {
            Ok(discarded) => {
                log_module_event!(debug, hosted.name.as_str(), "Module detached", hosted.handle, discarded)
            }
            Err(e) => warn!(module = %hosted.name, error = %e, "Module was not attached"),
        }
        hosted.module.destroy().await;
        log_module_event!(info, hosted.name.as_str(), "Module destroyed", hosted.handle, kind = %hosted.kind);
    }

    async fn teardown(&mut self) {
        while let Some(hosted) = self.modules.pop() {
            self.stop_module(hosted).await;
        }
    }
}

impl Drop for Gateway {
    fn drop(&mut self) {
        if !self.modules.is_empty() {
            warn!(
                modules = self.modules.len(),
                "Gateway dropped without destroy; module destroy hooks will not run"
            );
        }
    }
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("modules", &self.module_names())
            .field("bus", &self.bus)
            .finish()
    }
}
