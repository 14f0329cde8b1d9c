//! Periodic greeting publisher.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use gateway_bus::{BusError, ModuleContext};
use gateway_types::{Message, Module, ModuleError, Properties};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, trace, warn};

use super::parse_args;
use crate::registry::ModuleFactory;

/// Content of every published greeting.
pub const HELLO_WORLD_CONTENT: &str = "hello world";

const DEFAULT_INTERVAL_MS: u64 = 5000;

/// `hello_world` arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HelloWorldArgs {
    /// Milliseconds between greetings. The first one is sent after one interval.
    pub interval_ms: u64,
}

impl Default for HelloWorldArgs {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_INTERVAL_MS,
        }
    }
}

pub struct HelloWorldFactory;

impl ModuleFactory for HelloWorldFactory {
    fn kind(&self) -> &'static str {
        "hello_world"
    }

    fn create(&self, context: ModuleContext) -> Result<Arc<dyn Module>, ModuleError> {
        let args: HelloWorldArgs = parse_args(context.configuration())?;
        if args.interval_ms == 0 {
            return Err(ModuleError::InvalidConfiguration(
                "interval_ms must be greater than zero".into(),
            ));
        }
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| ModuleError::CreateFailed("hello_world needs a Tokio runtime".into()))?;

        let handle = context.handle();
        let (stop, stop_rx) = watch::channel(false);
        let task = runtime.spawn(publish_loop(
            context,
            Duration::from_millis(args.interval_ms),
            stop_rx,
        ));
        debug!(%handle, interval_ms = args.interval_ms, "hello_world created");

        Ok(Arc::new(HelloWorldModule {
            stop,
            task: Mutex::new(Some(task)),
        }))
    }
}

/// Publishes [`HELLO_WORLD_CONTENT`] with `source=hello_world` until destroyed.
pub struct HelloWorldModule {
    stop: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

#[async_trait]
impl Module for HelloWorldModule {
    async fn receive(&self, message: Arc<Message>) {
        trace!(content_len = message.content().len(), "hello_world ignores input");
    }

    async fn destroy(&self) {
        let _ = self.stop.send(true);
        let task = self.task.lock().take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!(error = %e, "hello_world publisher ended abnormally");
            }
        }
    }
}

impl Drop for HelloWorldModule {
    fn drop(&mut self) {
        if let Some(task) = self.task.get_mut().take() {
            task.abort();
        }
    }
}

async fn publish_loop(context: ModuleContext, period: Duration, mut stop: watch::Receiver<bool>) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = stop.changed() => break,
            _ = ticker.tick() => {
                let message = Message::from_text(HELLO_WORLD_CONTENT, Properties::new())
                    .with_property("source", "hello_world");
                match context.publish(message) {
                    Ok(queued) => trace!(queued, "Greeting published"),
                    Err(BusError::Closed) => {
                        debug!("Bus gone, hello_world stops publishing");
                        break;
                    }
                    Err(e) => warn!(error = %e, "Greeting not published"),
                }
            }
        }
    }
}
