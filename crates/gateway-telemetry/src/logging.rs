//! Structured logging helpers.
//!
//! Every log line emitted on behalf of a hosted module carries the same
//! fields so log pipelines can group by module:
//! - `module`: the module's configured name
//! - `handle`: the module's bus handle (when known)

/// Log an event tagged with the module it concerns.
#[macro_export]
macro_rules! log_event {
    (info, $module:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::info!(
            module = $module,
            $($($field)*,)?
            $msg
        )
    };

    (warn, $module:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::warn!(
            module = $module,
            $($($field)*,)?
            $msg
        )
    };

    (error, $module:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::error!(
            module = $module,
            $($($field)*,)?
            $msg
        )
    };

    (debug, $module:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::debug!(
            module = $module,
            $($($field)*,)?
            $msg
        )
    };
}

/// Log a module lifecycle event with its handle.
#[macro_export]
macro_rules! log_module_event {
    ($level:ident, $module:expr, $msg:expr, $handle:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            module = $module,
            handle = %$handle,
            $($($field)*,)?
            $msg
        )
    };
}
