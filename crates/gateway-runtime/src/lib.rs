//! # Gateway Runtime
//!
//! Hosts modules on a message bus according to a JSON configuration.
//! The `gateway` binary wraps this library.
//!
//! ## Structure
//!
//! - `config` - gateway configuration document
//! - `registry` - module kinds and their factories
//! - `modules` - bundled sample modules
//! - `gateway` - lifecycle of a running set of modules

#![allow(missing_docs)]
#![allow(clippy::type_complexity)]

pub mod config;
pub mod gateway;
pub mod modules;
pub mod registry;

pub use config::{ConfigError, GatewayConfig, ModuleEntry};
pub use gateway::{Gateway, GatewayError};
pub use registry::{ModuleFactory, ModuleRegistry, RegistryError};
