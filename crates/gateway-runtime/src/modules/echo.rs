//! Republishes every message it receives, once.

use std::sync::Arc;

use async_trait::async_trait;
use gateway_bus::ModuleContext;
use gateway_types::{Message, Module, ModuleError};
use tracing::{debug, warn};

use crate::registry::ModuleFactory;

/// Property added to echoed messages. Messages carrying it are not echoed.
pub const ECHOED_BY_PROPERTY: &str = "echoed-by";

pub struct EchoFactory;

impl ModuleFactory for EchoFactory {
    fn kind(&self) -> &'static str {
        "echo"
    }

    fn create(&self, context: ModuleContext) -> Result<Arc<dyn Module>, ModuleError> {
        Ok(Arc::new(EchoModule { context }))
    }
}

pub struct EchoModule {
    context: ModuleContext,
}

#[async_trait]
impl Module for EchoModule {
    async fn receive(&self, message: Arc<Message>) {
        if message.property(ECHOED_BY_PROPERTY).is_some() {
            return;
        }

        let echo = Message::new(message.content().to_vec(), message.properties().clone())
            .with_property(ECHOED_BY_PROPERTY, self.context.handle().to_string());
        match self.context.publish(echo) {
            Ok(queued) => debug!(queued, "Message echoed"),
            Err(e) => warn!(error = %e, "Echo not published"),
        }
    }
}
