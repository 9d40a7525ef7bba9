//! # Core Interception Types
//!
//! The values that flow through the interception layer.
//!
//! ## Components
//! - **Event**: lifecycle events (inject / uninject) and packet events (send / receive)
//! - **Verdict**: the outcome handed back to the transport and to lifecycle callers
//!
//! ## Flow
//! ```text
//! transport thread -> Interceptor hook -> EventDispatcher (packet worker) -> Verdict
//! ```
//!
//! Packets are opaque: nothing in this crate inspects them, they are moved
//! into an event and moved back out inside [`verdict::Verdict::Forward`].

pub mod event;
pub mod verdict;

pub use event::{
    Cancellable, Connection, InjectEvent, PacketReceiveEvent, PacketSendEvent, UninjectEvent,
};
pub use verdict::{Direction, FaultPolicy, LifecycleKind, LifecycleOutcome, Verdict};
