//! # Sample Modules
//!
//! - `hello_world` publishes a greeting on a fixed interval
//! - `logger` writes every message it sees to the log and optionally a file
//! - `echo` republishes what it receives, once

mod echo;
mod hello_world;
mod logger;

pub use echo::{EchoFactory, EchoModule, ECHOED_BY_PROPERTY};
pub use hello_world::{HelloWorldArgs, HelloWorldFactory, HelloWorldModule, HELLO_WORLD_CONTENT};
pub use logger::{LoggerArgs, LoggerFactory, LoggerModule};

use gateway_types::ModuleError;
use serde::de::DeserializeOwned;

/// Parse a module configuration string. Empty means all defaults.
pub(crate) fn parse_args<T: DeserializeOwned + Default>(
    configuration: &str,
) -> Result<T, ModuleError> {
    if configuration.trim().is_empty() {
        return Ok(T::default());
    }
    serde_json::from_str(configuration)
        .map_err(|e| ModuleError::InvalidConfiguration(e.to_string()))
}
