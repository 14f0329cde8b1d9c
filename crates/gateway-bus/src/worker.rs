//! # Module Worker
//!
//! The task that feeds one module's queue into its receive hook.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use gateway_telemetry::{time_histogram, BUS_MESSAGES_DELIVERED, MODULE_RECEIVE_DURATION};
use gateway_types::{Message, Module, ModuleHandle};
use tokio::sync::{mpsc, watch};
use tracing::{debug, trace};

use crate::bus::StatsInner;

/// Deliver queued messages to `module` until told to quit.
///
/// Messages already queued are delivered without waiting. The quit signal is
/// checked before every message, so a worker told to quit stops after the
/// receive call in flight (if any) even when its queue is not empty. The
/// receiver is handed back so the caller can account for what was left.
pub(crate) async fn run(
    handle: ModuleHandle,
    module: Arc<dyn Module>,
    mut queue: mpsc::Receiver<Arc<Message>>,
    mut quit: watch::Receiver<bool>,
    stats: Arc<StatsInner>,
) -> mpsc::Receiver<Arc<Message>> {
    debug!(%handle, "Module worker started");

    loop {
        if *quit.borrow() {
            break;
        }

        let message = tokio::select! {
            biased;
            changed = quit.changed() => {
                // Err means the bus itself is gone
                if changed.is_err() || *quit.borrow() {
                    break;
                }
                continue;
            }
            message = queue.recv() => match message {
                Some(message) => message,
                None => break,
            },
        };

        trace!(%handle, content_len = message.content().len(), "Delivering message");
        {
            let _timer = time_histogram!(MODULE_RECEIVE_DURATION);
            module.receive(message).await;
        }
        stats.delivered.fetch_add(1, Ordering::Relaxed);
        BUS_MESSAGES_DELIVERED.inc();
    }

    debug!(%handle, "Module worker stopped");
    queue
}
