//! # Module Trait
//!
//! The contract every hosted module implements.
//!
//! A module is created by a factory (see the runtime's module registry) which
//! hands it a handle, a bus reference and its configuration string. After that
//! the host only ever calls two hooks:
//!
//! - [`Module::receive`] for every message published by another module
//! - [`Module::destroy`] once, after the module has been removed from the bus
//!
//! ## Example Implementation
//!
//! ```rust,ignore
//! use gateway_types::{Message, Module};
//! use async_trait::async_trait;
//! use std::sync::Arc;
//!
//! pub struct Printer;
//!
//! #[async_trait]
//! impl Module for Printer {
//!     async fn receive(&self, message: Arc<Message>) {
//!         println!("{}", message.content_str());
//!     }
//! }
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::entities::Message;
use crate::envelope;
use crate::errors::CodecError;

/// A module hosted on the message bus.
#[async_trait]
pub trait Module: Send + Sync {
    /// Called for every message delivered to this module.
    ///
    /// Calls for one module never overlap; calls for different modules may.
    async fn receive(&self, message: Arc<Message>);

    /// Release resources held by the module.
    ///
    /// Called once, after the module has been removed from the bus, so no
    /// `receive` call is in flight or will follow.
    async fn destroy(&self) {}

    /// Decode an envelope and forward the message to [`Module::receive`].
    ///
    /// If the bytes are not a valid envelope the error is returned and
    /// `receive` is not called.
    async fn receive_serialized(&self, bytes: &[u8]) -> Result<(), CodecError> {
        let message = envelope::decode(bytes)?;
        debug!(
            content_len = message.content().len(),
            properties = message.properties().len(),
            "Forwarding decoded envelope"
        );
        self.receive(Arc::new(message)).await;
        Ok(())
    }
}
