//! # packet-intercept
//!
//! A cancellable interception layer for an existing network transport.
//!
//! The transport calls [`Interceptor::write`](service::Interceptor::write) for
//! every outbound packet and [`Interceptor::read`](service::Interceptor::read)
//! for every inbound one. Each packet becomes an event delivered to the
//! registered listeners on a single sequential worker; the answer is either
//! the packet (possibly edited) or the drop sentinel.
//!
//! Attaching the hooks to a connection (inject) and removing them (eject) are
//! cancellable events too, with synchronous and asynchronous entry points.
//! The adapter that performs the actual attach / detach is chosen once at
//! startup between a legacy and a modern transport library generation.
//!
//! ## Modules
//! - [`core`]: events and verdicts
//! - [`protocol`]: listeners and the event dispatcher
//! - [`transport`]: adapter contract and startup mode probe
//! - [`service`]: the interceptor, packet worker and lifecycle pool
//! - [`config`], [`error`], [`utils`]: configuration, errors, logging, metrics

pub mod config;
pub mod core;
pub mod error;
pub mod protocol;
pub mod service;
pub mod transport;
pub mod utils;

pub use error::{InterceptError, Result};

/// Common imports for adapter and listener authors
pub mod prelude {
    pub use crate::config::InterceptorConfig;
    pub use crate::core::{
        Cancellable, InjectEvent, LifecycleOutcome, PacketReceiveEvent, PacketSendEvent,
        UninjectEvent, Verdict,
    };
    pub use crate::protocol::listener::{on_inject, on_receive, on_send, on_uninject};
    pub use crate::protocol::{EventDispatcher, Listener, ListenerOptions, Priority};
    pub use crate::service::{Interceptor, LifecycleTask};
    pub use crate::transport::{
        ActiveTransport, EnvSymbols, ModeProbe, StaticSymbols, TransportAdapter, TransportMode,
    };
}
