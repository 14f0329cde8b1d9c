//! Fixtures shared by the integration flows.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use gateway_bus::ModuleContext;
use gateway_runtime::{ModuleFactory, ModuleRegistry};
use gateway_types::{Message, Module, ModuleError, ModuleHandle};
use parking_lot::Mutex;

/// Module that keeps everything it receives.
pub struct Recorder {
    pub name: String,
    pub handle: ModuleHandle,
    seen: Mutex<Vec<Arc<Message>>>,
    destroyed: AtomicBool,
}

impl Recorder {
    pub fn new(name: impl Into<String>, handle: ModuleHandle) -> Self {
        Self {
            name: name.into(),
            handle,
            seen: Mutex::new(Vec::new()),
            destroyed: AtomicBool::new(false),
        }
    }

    pub fn seen(&self) -> Vec<Arc<Message>> {
        self.seen.lock().clone()
    }

    pub fn seen_count(&self) -> usize {
        self.seen.lock().len()
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Module for Recorder {
    async fn receive(&self, message: Arc<Message>) {
        self.seen.lock().push(message);
    }

    async fn destroy(&self) {
        self.destroyed.store(true, Ordering::SeqCst);
    }
}

/// Factory for `recorder` modules. Every instance it creates is kept so a
/// test can inspect it after the gateway owns it.
#[derive(Default)]
pub struct RecorderFactory {
    created: Arc<Mutex<Vec<Arc<Recorder>>>>,
}

impl RecorderFactory {
    pub fn created(&self) -> Arc<Mutex<Vec<Arc<Recorder>>>> {
        Arc::clone(&self.created)
    }
}

impl ModuleFactory for RecorderFactory {
    fn kind(&self) -> &'static str {
        "recorder"
    }

    fn create(&self, context: ModuleContext) -> Result<Arc<dyn Module>, ModuleError> {
        let recorder = Arc::new(Recorder::new(context.configuration(), context.handle()));
        self.created.lock().push(Arc::clone(&recorder));
        Ok(recorder)
    }
}

/// Built-in kinds plus `recorder`, and the list of recorders it will create.
pub fn registry_with_recorder() -> (ModuleRegistry, Arc<Mutex<Vec<Arc<Recorder>>>>) {
    let factory = RecorderFactory::default();
    let created = factory.created();
    let mut registry = ModuleRegistry::with_builtins();
    // "recorder" is not a built-in kind
    let _ = registry.register(Arc::new(factory));
    (registry, created)
}

/// Find a created recorder by its configured name.
pub fn recorder(created: &Mutex<Vec<Arc<Recorder>>>, name: &str) -> Option<Arc<Recorder>> {
    created.lock().iter().find(|r| r.name == name).cloned()
}

/// Poll `condition` until it holds or five seconds pass.
pub async fn wait_until(condition: impl Fn() -> bool) -> bool {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    })
    .await
    .is_ok()
}
