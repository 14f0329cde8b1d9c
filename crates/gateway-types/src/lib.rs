//! # Gateway Types Crate
//!
//! Domain types shared by every crate in the gateway.
//!
//! ## Contents
//!
//! - [`Message`]: content bytes plus string properties, immutable once published.
//! - [`ModuleHandle`]: opaque identifier of a hosted module instance.
//! - [`envelope`]: the binary wire form of a [`Message`].
//! - [`Module`]: the receive/destroy contract every hosted module implements.

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod entities;
pub mod envelope;
pub mod errors;
pub mod module;

pub use entities::{Message, ModuleHandle, Properties};
pub use envelope::{decode, encode, ENVELOPE_MAGIC, MIN_ENVELOPE_LEN};
pub use errors::{CodecError, ModuleError};
pub use module::Module;
