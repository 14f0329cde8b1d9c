//! # Module Context
//!
//! What a hosted module is given at creation: who it is, where to publish
//! and how it was configured.

use gateway_types::{Message, ModuleHandle};

use crate::bus::BusHandle;
use crate::BusError;

/// Binding between one module and the bus it is attached to.
///
/// The bus reference is weak. Publishing after the bus is gone fails with
/// [`BusError::Closed`] instead of keeping the bus alive.
#[derive(Debug, Clone)]
pub struct ModuleContext {
    handle: ModuleHandle,
    bus: BusHandle,
    configuration: String,
}

impl ModuleContext {
    pub fn new(handle: ModuleHandle, bus: BusHandle, configuration: impl Into<String>) -> Self {
        Self {
            handle,
            bus,
            configuration: configuration.into(),
        }
    }

    /// This module's handle.
    pub fn handle(&self) -> ModuleHandle {
        self.handle
    }

    /// The bus this module publishes to.
    pub fn bus(&self) -> &BusHandle {
        &self.bus
    }

    /// Raw configuration string the module was created with.
    pub fn configuration(&self) -> &str {
        &self.configuration
    }

    /// Publish with this module as the source, so it is not delivered back.
    pub fn publish(&self, message: Message) -> Result<usize, BusError> {
        self.bus.publish(self.handle, message)
    }

    /// Publish an encoded envelope with this module as the source.
    pub fn publish_serialized(&self, bytes: &[u8]) -> Result<usize, BusError> {
        self.bus.publish_serialized(self.handle, bytes)
    }
}
