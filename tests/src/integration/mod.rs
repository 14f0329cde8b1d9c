//! Cross-crate integration flows.

pub mod envelope;
pub mod flows;
pub mod support;
