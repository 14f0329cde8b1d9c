//! # Message Bus
//!
//! The routing table and the publish path.
//!
//! `publish` never blocks and never awaits: it takes the read lock, pushes one
//! shared `Arc<Message>` into each destination queue and returns. Delivery
//! happens on the per-module worker tasks.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use gateway_telemetry::{
    BUS_DELIVERIES_QUEUED, BUS_MESSAGES_DROPPED, BUS_MESSAGES_PUBLISHED, ENVELOPE_ERRORS,
    MODULES_ACTIVE,
};
use gateway_types::{envelope, Message, Module, ModuleHandle};
use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::mpsc::error::{TryRecvError, TrySendError};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::context::ModuleContext;
use crate::{worker, BusConfig, BusError, OverflowPolicy};

/// Shared counters, updated by the publish path and the workers.
#[derive(Debug, Default)]
pub(crate) struct StatsInner {
    pub(crate) published: AtomicU64,
    pub(crate) queued: AtomicU64,
    pub(crate) delivered: AtomicU64,
    pub(crate) dropped: AtomicU64,
    pub(crate) discarded: AtomicU64,
}

/// Point-in-time copy of the bus counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BusStats {
    /// Calls to `publish` that passed validation.
    pub published: u64,
    /// Messages placed on a module queue.
    pub queued: u64,
    /// Messages handed to a module's receive hook.
    pub delivered: u64,
    /// Messages not queued because the destination was full or gone.
    pub dropped: u64,
    /// Messages left in a queue when its module was removed.
    pub discarded: u64,
}

/// One attached module.
struct ModuleEntry {
    sender: mpsc::Sender<Arc<Message>>,
    quit: watch::Sender<bool>,
    worker: JoinHandle<mpsc::Receiver<Arc<Message>>>,
}

struct Inner {
    /// Insertion ordered; lookups are linear, module counts are small.
    modules: RwLock<Vec<(ModuleHandle, ModuleEntry)>>,
    config: BusConfig,
    stats: Arc<StatsInner>,
}

impl Inner {
    fn publish(&self, source: ModuleHandle, message: Arc<Message>) -> Result<usize, BusError> {
        let modules = self.modules.read();

        if let OverflowPolicy::Reject = self.config.overflow {
            return self.publish_all_or_nothing(&modules, source, message);
        }

        self.stats.published.fetch_add(1, Ordering::Relaxed);
        BUS_MESSAGES_PUBLISHED.inc();

        let mut queued = 0;
        for (handle, entry) in modules.iter().filter(|(h, _)| *h != source) {
            match entry.sender.try_send(Arc::clone(&message)) {
                Ok(()) => queued += 1,
                Err(TrySendError::Full(_)) => {
                    warn!(%handle, "Module queue full, message dropped");
                    self.count_dropped(DropReason::Overflow);
                }
                Err(TrySendError::Closed(_)) => {
                    warn!(%handle, "Module worker gone, message dropped");
                    self.count_dropped(DropReason::Closed);
                }
            }
        }

        self.count_queued(queued);
        if queued == 0 && no_destinations(&modules, source) {
            debug!(%source, "Published with no other modules attached");
        }
        Ok(queued)
    }

    /// Reserve a slot in every destination queue before sending to any.
    fn publish_all_or_nothing(
        &self,
        modules: &[(ModuleHandle, ModuleEntry)],
        source: ModuleHandle,
        message: Arc<Message>,
    ) -> Result<usize, BusError> {
        let mut permits = Vec::with_capacity(modules.len());
        let mut closed = 0;
        for (handle, entry) in modules.iter().filter(|(h, _)| *h != source) {
            match entry.sender.try_reserve() {
                Ok(permit) => permits.push(permit),
                Err(TrySendError::Full(())) => {
                    debug!(%handle, "Module queue full, publish rejected");
                    return Err(BusError::QueueFull(*handle));
                }
                Err(TrySendError::Closed(())) => {
                    warn!(%handle, "Module worker gone, message dropped");
                    closed += 1;
                }
            }
        }

        self.stats.published.fetch_add(1, Ordering::Relaxed);
        BUS_MESSAGES_PUBLISHED.inc();
        for _ in 0..closed {
            self.count_dropped(DropReason::Closed);
        }

        let queued = permits.len();
        for permit in permits {
            permit.send(Arc::clone(&message));
        }
        self.count_queued(queued);
        if queued == 0 && no_destinations(modules, source) {
            debug!(%source, "Published with no other modules attached");
        }
        Ok(queued)
    }

    fn count_queued(&self, n: usize) {
        self.stats.queued.fetch_add(n as u64, Ordering::Relaxed);
        BUS_DELIVERIES_QUEUED.inc_by(n as f64);
    }

    fn count_dropped(&self, reason: DropReason) {
        self.stats.dropped.fetch_add(1, Ordering::Relaxed);
        BUS_MESSAGES_DROPPED
            .with_label_values(&[reason.as_label()])
            .inc();
    }
}

/// Why a publish could not queue a message for a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DropReason {
    /// The module's queue was full.
    Overflow,
    /// The module's worker is gone (it panicked).
    Closed,
}

impl DropReason {
    fn as_label(self) -> &'static str {
        match self {
            DropReason::Overflow => "overflow",
            DropReason::Closed => "closed",
        }
    }
}

/// True when every attached module is `source` itself.
fn no_destinations(modules: &[(ModuleHandle, ModuleEntry)], source: ModuleHandle) -> bool {
    modules.iter().all(|(h, _)| *h == source)
}

impl Drop for Inner {
    fn drop(&mut self) {
        let modules = self.modules.get_mut();
        for (_, entry) in modules.iter() {
            // Receiver may already be gone if the worker panicked
            let _ = entry.quit.send(true);
        }
        MODULES_ACTIVE.sub(modules.len() as f64);
        if !modules.is_empty() {
            debug!(modules = modules.len(), "Message bus dropped, workers signalled");
        }
    }
}

/// Broadcast bus connecting hosted modules.
///
/// Cloning is cheap and every clone refers to the same bus. Workers are
/// signalled to stop when the last clone is dropped.
#[derive(Clone)]
pub struct MessageBus {
    inner: Arc<Inner>,
}

impl MessageBus {
    /// Create a bus with default settings.
    pub fn new() -> Self {
        Self::with_config(BusConfig::default())
    }

    /// Create a bus with the given settings.
    pub fn with_config(mut config: BusConfig) -> Self {
        config.queue_capacity = config.queue_capacity.max(1);
        Self {
            inner: Arc::new(Inner {
                modules: RwLock::new(Vec::new()),
                config,
                stats: Arc::new(StatsInner::default()),
            }),
        }
    }

    /// Settings this bus was created with.
    pub fn config(&self) -> &BusConfig {
        &self.inner.config
    }

    /// Attach a module and start its worker.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn add_module(
        &self,
        handle: ModuleHandle,
        module: Arc<dyn Module>,
    ) -> Result<(), BusError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| BusError::NoRuntime)?;

        let mut modules = self.inner.modules.write();
        if modules.iter().any(|(h, _)| *h == handle) {
            return Err(BusError::DuplicateModule(handle));
        }

        let (sender, receiver) = mpsc::channel(self.inner.config.queue_capacity);
        let (quit, quit_rx) = watch::channel(false);
        let worker = runtime.spawn(worker::run(
            handle,
            module,
            receiver,
            quit_rx,
            Arc::clone(&self.inner.stats),
        ));

        modules.push((
            handle,
            ModuleEntry {
                sender,
                quit,
                worker,
            },
        ));
        MODULES_ACTIVE.inc();
        info!(%handle, modules = modules.len(), "Module attached to bus");
        Ok(())
    }

    /// Detach a module, stop its worker and discard anything still queued.
    ///
    /// Waits for a receive call in flight to return. Returns the number of
    /// messages discarded.
    pub async fn remove_module(&self, handle: ModuleHandle) -> Result<usize, BusError> {
        let entry = {
            let mut modules = self.inner.modules.write();
            let index = modules
                .iter()
                .position(|(h, _)| *h == handle)
                .ok_or(BusError::ModuleNotFound(handle))?;
            modules.remove(index).1
        };
        MODULES_ACTIVE.dec();

        let ModuleEntry {
            sender,
            quit,
            worker,
        } = entry;
        let _ = quit.send(true);
        drop(sender);

        let discarded = match worker.await {
            Ok(mut receiver) => {
                receiver.close();
                let mut count = 0;
                loop {
                    match receiver.try_recv() {
                        Ok(_) => count += 1,
                        Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
                    }
                }
                count
            }
            Err(e) => {
                error!(%handle, error = %e, "Module worker failed");
                0
            }
        };

        if discarded > 0 {
            self.inner
                .stats
                .discarded
                .fetch_add(discarded as u64, Ordering::Relaxed);
            BUS_MESSAGES_DROPPED
                .with_label_values(&["removed"])
                .inc_by(discarded as f64);
        }

        info!(%handle, discarded, "Module detached from bus");
        Ok(discarded)
    }

    /// Detach every module, in attach order.
    pub async fn shutdown(&self) -> usize {
        let handles = self.handles();
        let mut removed = 0;
        for handle in handles {
            // A concurrent remove may have won the race
            if self.remove_module(handle).await.is_ok() {
                removed += 1;
            }
        }
        removed
    }

    /// Queue `message` for every attached module except `source`.
    ///
    /// Returns how many modules it was queued for. `source` need not be
    /// attached; a handle that is not on the bus reaches every module.
    pub fn publish(&self, source: ModuleHandle, message: Message) -> Result<usize, BusError> {
        self.inner.publish(source, Arc::new(message))
    }

    /// Like [`MessageBus::publish`] for a message that is already shared.
    pub fn publish_shared(
        &self,
        source: ModuleHandle,
        message: Arc<Message>,
    ) -> Result<usize, BusError> {
        self.inner.publish(source, message)
    }

    /// Decode an envelope and publish the message it carries.
    pub fn publish_serialized(&self, source: ModuleHandle, bytes: &[u8]) -> Result<usize, BusError> {
        let message = decode_envelope(bytes)?;
        self.inner.publish(source, Arc::new(message))
    }

    /// Number of attached modules.
    pub fn module_count(&self) -> usize {
        self.inner.modules.read().len()
    }

    /// Whether `handle` is attached.
    pub fn contains(&self, handle: ModuleHandle) -> bool {
        self.inner.modules.read().iter().any(|(h, _)| *h == handle)
    }

    /// Attached handles, in attach order.
    pub fn handles(&self) -> Vec<ModuleHandle> {
        self.inner.modules.read().iter().map(|(h, _)| *h).collect()
    }

    /// Messages waiting in a module's queue.
    pub fn queue_depth(&self, handle: ModuleHandle) -> Option<usize> {
        self.inner
            .modules
            .read()
            .iter()
            .find(|(h, _)| *h == handle)
            .map(|(_, entry)| entry.sender.max_capacity() - entry.sender.capacity())
    }

    /// Number of live `MessageBus` clones. Weak handles are not counted.
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    /// Snapshot of the bus counters.
    pub fn stats(&self) -> BusStats {
        let s = &self.inner.stats;
        BusStats {
            published: s.published.load(Ordering::Relaxed),
            queued: s.queued.load(Ordering::Relaxed),
            delivered: s.delivered.load(Ordering::Relaxed),
            dropped: s.dropped.load(Ordering::Relaxed),
            discarded: s.discarded.load(Ordering::Relaxed),
        }
    }

    /// A handle that does not keep the bus alive.
    pub fn handle(&self) -> BusHandle {
        BusHandle {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Build the binding handed to a module factory.
    pub fn context(&self, handle: ModuleHandle, configuration: impl Into<String>) -> ModuleContext {
        ModuleContext::new(handle, self.handle(), configuration)
    }
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MessageBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageBus")
            .field("modules", &self.module_count())
            .field("config", &self.inner.config)
            .finish()
    }
}

/// Weak reference to a [`MessageBus`].
///
/// Modules hold one of these so they never keep the bus alive.
#[derive(Clone)]
pub struct BusHandle {
    inner: Weak<Inner>,
}

impl BusHandle {
    /// Upgrade to a strong reference, if the bus still exists.
    pub fn upgrade(&self) -> Option<MessageBus> {
        self.inner.upgrade().map(|inner| MessageBus { inner })
    }

    /// Whether the bus has been dropped.
    pub fn is_closed(&self) -> bool {
        self.inner.strong_count() == 0
    }

    /// Publish through the bus, or fail with [`BusError::Closed`].
    pub fn publish(&self, source: ModuleHandle, message: Message) -> Result<usize, BusError> {
        let inner = self.inner.upgrade().ok_or(BusError::Closed)?;
        inner.publish(source, Arc::new(message))
    }

    /// Decode an envelope and publish it through the bus.
    pub fn publish_serialized(&self, source: ModuleHandle, bytes: &[u8]) -> Result<usize, BusError> {
        let inner = self.inner.upgrade().ok_or(BusError::Closed)?;
        let message = decode_envelope(bytes)?;
        inner.publish(source, Arc::new(message))
    }
}

impl fmt::Debug for BusHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BusHandle")
            .field("closed", &self.is_closed())
            .finish()
    }
}

fn decode_envelope(bytes: &[u8]) -> Result<Message, BusError> {
    envelope::decode(bytes).map_err(|e| {
        ENVELOPE_ERRORS.inc();
        warn!(error = %e, len = bytes.len(), "Rejected envelope");
        BusError::from(e)
    })
}
