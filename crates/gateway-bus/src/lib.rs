//! # Gateway Bus - Broadcast Message Bus for Hosted Modules
//!
//! Every message published on the bus is queued for every attached module
//! except the one that published it.
//!
//! ## Dispatch Model
//!
//! ```text
//! ┌──────────────┐  publish(source=A)  ┌──────────────┐
//! │   Module A   │ ──────────────────► │ MessageBus   │
//! └──────────────┘                     │              │
//!                                      │ routing table│
//!                     ┌────────────────┴──────┬───────┘
//!                     ▼                       ▼
//!              ┌─────────────┐         ┌─────────────┐
//!              │ queue  (B)  │         │ queue  (C)  │
//!              └──────┬──────┘         └──────┬──────┘
//!                 worker task             worker task
//!                     ▼                       ▼
//!              B.receive(msg)          C.receive(msg)
//! ```
//!
//! - One bounded FIFO queue and one worker task per module
//! - A single `Arc<Message>` is shared by all queues
//! - Removing a module stops its worker and discards whatever is still queued
//!
//! ## Module Binding
//!
//! A hosted module sees the bus through a [`ModuleContext`]: its own handle,
//! a weak [`BusHandle`] and its configuration string.

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod bus;
pub mod context;
mod worker;

use gateway_types::{CodecError, ModuleHandle};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// Re-export main types
pub use bus::{BusHandle, BusStats, MessageBus};
pub use context::ModuleContext;

/// Messages buffered per module before the overflow policy applies.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// What to do when a module's queue is full at publish time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Skip the full module and keep publishing to the rest.
    #[default]
    DropNewest,
    /// Fail the publish call with [`BusError::QueueFull`].
    Reject,
}

/// Bus tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// Per-module queue capacity. Zero is treated as one.
    pub queue_capacity: usize,
    /// Behavior when a module queue is full.
    pub overflow: OverflowPolicy,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            overflow: OverflowPolicy::DropNewest,
        }
    }
}

/// Errors from bus operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BusError {
    /// A module with this handle is already attached.
    #[error("Module {0} is already attached to the bus")]
    DuplicateModule(ModuleHandle),

    /// No module with this handle is attached.
    #[error("Module {0} not found on the bus")]
    ModuleNotFound(ModuleHandle),

    /// The module's queue is full and the overflow policy is `Reject`.
    #[error("Queue for module {0} is full")]
    QueueFull(ModuleHandle),

    /// The bus behind a weak handle has been dropped.
    #[error("Message bus closed")]
    Closed,

    /// Module workers need a Tokio runtime.
    #[error("No Tokio runtime available to run module workers")]
    NoRuntime,

    /// An envelope could not be decoded.
    #[error("Envelope error: {0}")]
    Codec(#[from] CodecError),
}
