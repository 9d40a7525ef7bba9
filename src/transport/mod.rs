//! # Transport Integration
//!
//! The contract the underlying transport library's glue must fulfil, and the
//! one-time choice between the two incompatible library generations.
//!
//! ## Components
//! - **Adapter**: [`adapter::TransportAdapter`] attaches and detaches the
//!   interception hooks on one connection's pipeline
//! - **Mode**: [`mode::ModeProbe`] decides at startup whether the modern
//!   library is present
//!
//! The interceptor holds an [`adapter::ActiveTransport`], which is exactly one
//! of the two adapter variants for its whole lifetime.

pub mod adapter;
pub mod mode;

pub use adapter::{ActiveTransport, TransportAdapter};
pub use mode::{EnvSymbols, ModeProbe, StaticSymbols, SymbolResolver, TransportMode};
