//! # Utility Modules
//!
//! Supporting utilities shared by the interception services.
//!
//! ## Components
//! - **Logging**: `tracing-subscriber` setup from [`crate::config::LoggingConfig`]
//! - **Metrics**: thread-safe counters for lifecycle outcomes and packet verdicts

pub mod logging;
pub mod metrics;

pub use metrics::{Metrics, MetricsSnapshot};
