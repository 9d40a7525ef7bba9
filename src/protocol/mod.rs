//! # Event Pipeline
//!
//! Listener registration and ordered, cancellable event delivery.
//!
//! ## Components
//! - **Listener**: the trait event handlers implement, plus closure adapters
//! - **Dispatcher**: priority-ordered delivery with fault capture
//!
//! ## Ordering
//! Listeners run from [`listener::Priority::Lowest`] up to
//! [`listener::Priority::Monitor`]; within one priority, in registration order.
//! A listener may cancel the event, edit a packet payload, or stop propagation.
//!
//! Listeners for packet events run on the single packet worker thread. A
//! listener that blocks stalls every connection's packet flow until the
//! verdict timeout expires.

pub mod dispatcher;
pub mod listener;


pub use dispatcher::{EventDispatcher, ListenerId};
pub use listener::{Event, Listener, ListenerOptions, Priority};
