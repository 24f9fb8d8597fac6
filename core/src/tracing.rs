//! Tracing utilities for query construction and hydration.
//!
//! Enable the `tracing` feature to emit events via the `tracing` crate.
//! These macros no-op when the feature is disabled, avoiding `#[cfg]` boilerplate
//! at every call site.

/// Emit a debug-level tracing event with the SQL text and parameter count.
///
/// ```ignore
/// vellum_trace_query!(&compiled.sql, compiled.bindings.len());
/// ```
#[macro_export]
macro_rules! vellum_trace_query {
    ($sql:expr, $param_count:expr) => {
        #[cfg(feature = "tracing")]
        tracing::debug!(sql = %$sql, params = $param_count, "vellum.query");
    };
}

/// Emit a debug-level event.
#[macro_export]
macro_rules! vellum_debug {
    ($($arg:tt)+) => {
        #[cfg(feature = "tracing")]
        tracing::debug!(target: "vellum", $($arg)+);
    };
}

/// Emit a warn-level event.
#[macro_export]
macro_rules! vellum_warn {
    ($($arg:tt)+) => {
        #[cfg(feature = "tracing")]
        tracing::warn!(target: "vellum", $($arg)+);
    };
}

/// Emit an error-level event.
///
/// ```ignore
/// vellum_error!(clause = %raw, "vellum.security_violation");
/// ```
#[macro_export]
macro_rules! vellum_error {
    ($($arg:tt)+) => {
        #[cfg(feature = "tracing")]
        tracing::error!(target: "vellum", $($arg)+);
    };
}
