//! # Interception Services
//!
//! The public coordinator and the two concurrency domains it drives.
//!
//! ## Components
//! - **Interceptor**: inject / eject and the `read` / `write` packet hooks
//! - **Packet Worker**: one dedicated thread, FIFO, total order of packet events
//! - **Lifecycle Pool**: on-demand threads for asynchronous inject / eject
//!
//! ## Threading
//! ```text
//! transport threads --read/write--> [FIFO] --> packet worker --> verdict
//! connect/disconnect --*_async-----> lifecycle pool (unordered, parallel)
//! ```

pub mod interceptor;
pub mod lifecycle;
pub mod packet_worker;

pub use interceptor::{Interceptor, InterceptorBuilder};
pub use lifecycle::{LifecyclePool, LifecycleTask};
pub use packet_worker::PacketWorker;
