//! # Error Types
//!
//! Error handling for the interception layer.
//!
//! Errors never cross the public packet hooks or the lifecycle entry points:
//! [`Interceptor::write`](crate::service::interceptor::Interceptor::write) and
//! friends turn them into a [`Verdict`](crate::core::verdict::Verdict) or a
//! [`LifecycleOutcome`](crate::core::verdict::LifecycleOutcome). They are still
//! typed so that callers and tests can inspect what went wrong.
//!
//! ## Error Categories
//! - **Listener Errors**: a listener returned an error or panicked during dispatch
//! - **Adapter Errors**: a transport adapter failed to attach or detach
//! - **Worker Errors**: the sequential worker timed out or is gone
//! - **Configuration Errors**: invalid or unreadable configuration
//!
//! ## Example Usage
//! ```rust
//! use packet_intercept::error::{InterceptError, Result};
//!
//! fn attach(ok: bool) -> Result<()> {
//!     if ok {
//!         Ok(())
//!     } else {
//!         Err(InterceptError::AdapterFailed {
//!             adapter: "legacy".into(),
//!             message: "pipeline already closed".into(),
//!         })
//!     }
//! }
//!
//! assert!(attach(true).is_ok());
//! assert!(attach(false).is_err());
//! ```

use std::time::Duration;
use thiserror::Error;

/// Error message constants to reduce allocations in error paths.
pub mod constants {
    /// Dispatcher-related error messages
    pub const ERR_DISPATCHER_WRITE_LOCK: &str = "Failed to acquire write lock on dispatcher";
    pub const ERR_DISPATCHER_READ_LOCK: &str = "Failed to acquire read lock on dispatcher";

    /// Worker errors
    pub const ERR_WORKER_SPAWN: &str = "Failed to spawn packet worker thread";
    pub const ERR_WORKER_GONE: &str = "Packet worker is no longer running";

    /// Lifecycle pool errors
    pub const ERR_RUNTIME_BUILD: &str = "Failed to build lifecycle runtime";

    /// Panic payloads that are neither &str nor String
    pub const ERR_UNKNOWN_PANIC: &str = "non-string panic payload";
}

/// Primary error type for all interception operations
#[derive(Error, Debug)]
pub enum InterceptError {
    #[error("Listener {listener} failed: {source}")]
    ListenerFailed {
        listener: &'static str,
        #[source]
        source: Box<InterceptError>,
    },

    #[error("Listener {listener} panicked: {message}")]
    ListenerPanicked {
        listener: &'static str,
        message: String,
    },

    #[error("Transport adapter {adapter} failed: {message}")]
    AdapterFailed { adapter: String, message: String },

    #[error("Transport adapter {adapter} panicked")]
    AdapterPanicked { adapter: String },

    #[error("No verdict from packet worker within {0:?}")]
    VerdictTimeout(Duration),

    #[error("Packet worker is no longer running")]
    WorkerUnavailable,

    #[error("Lifecycle task could not be joined: {0}")]
    TaskJoin(String),

    #[error("Runtime error: {0}")]
    Runtime(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Synchronization primitive poisoned")]
    LockPoisoned,

    #[error("Custom error: {0}")]
    Custom(String),
}

impl InterceptError {
    /// Whether the error came out of the event pipeline rather than the transport
    pub fn is_listener_fault(&self) -> bool {
        matches!(
            self,
            InterceptError::ListenerFailed { .. } | InterceptError::ListenerPanicked { .. }
        )
    }

    /// Whether the error came out of a transport adapter
    pub fn is_adapter_fault(&self) -> bool {
        matches!(
            self,
            InterceptError::AdapterFailed { .. } | InterceptError::AdapterPanicked { .. }
        )
    }
}

/// Turn a caught panic payload into a printable message.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        constants::ERR_UNKNOWN_PANIC.to_string()
    }
}

/// Type alias for Results using InterceptError
pub type Result<T> = std::result::Result<T, InterceptError>;
