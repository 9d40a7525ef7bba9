use crate::error::{panic_message, InterceptError, Result};
use crate::transport::mode::TransportMode;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::warn;

/// Version-specific glue that installs or removes the interception hooks on a
/// connection's transport pipeline.
///
/// Both calls must tolerate repetition: attaching an attached connection or
/// detaching a detached one is a no-op or a local error, never corruption.
pub trait TransportAdapter<C>: Send + Sync {
    /// Name used in logs and errors
    fn name(&self) -> &str;

    fn attach(&self, connection: &C) -> Result<()>;

    fn detach(&self, connection: &C) -> Result<()>;
}

/// The single adapter in use for the lifetime of an interceptor
pub enum ActiveTransport<C> {
    Legacy(Box<dyn TransportAdapter<C>>),
    Modern(Box<dyn TransportAdapter<C>>),
}

impl<C> ActiveTransport<C> {
    /// Keep the adapter matching `mode` and drop the other one
    pub fn select<L, M>(mode: TransportMode, legacy: L, modern: M) -> Self
    where
        L: TransportAdapter<C> + 'static,
        M: TransportAdapter<C> + 'static,
    {
        match mode {
            TransportMode::Legacy => ActiveTransport::Legacy(Box::new(legacy)),
            TransportMode::Modern => ActiveTransport::Modern(Box::new(modern)),
        }
    }

    pub fn mode(&self) -> TransportMode {
        match self {
            ActiveTransport::Legacy(_) => TransportMode::Legacy,
            ActiveTransport::Modern(_) => TransportMode::Modern,
        }
    }

    fn adapter(&self) -> &dyn TransportAdapter<C> {
        match self {
            ActiveTransport::Legacy(adapter) | ActiveTransport::Modern(adapter) => adapter.as_ref(),
        }
    }

    pub fn name(&self) -> &str {
        self.adapter().name()
    }

    /// Attach through the active adapter; a panic inside the adapter is
    /// reported as [`InterceptError::AdapterPanicked`].
    pub fn attach(&self, connection: &C) -> Result<()> {
        self.guarded(|adapter| adapter.attach(connection))
    }

    pub fn detach(&self, connection: &C) -> Result<()> {
        self.guarded(|adapter| adapter.detach(connection))
    }

    fn guarded<F>(&self, op: F) -> Result<()>
    where
        F: FnOnce(&dyn TransportAdapter<C>) -> Result<()>,
    {
        let adapter = self.adapter();
        match catch_unwind(AssertUnwindSafe(|| op(adapter))) {
            Ok(result) => result,
            Err(payload) => {
                warn!(
                    adapter = adapter.name(),
                    panic = %panic_message(payload.as_ref()),
                    "Transport adapter panicked"
                );
                Err(InterceptError::AdapterPanicked {
                    adapter: adapter.name().to_string(),
                })
            }
        }
    }
}

impl<C> std::fmt::Debug for ActiveTransport<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActiveTransport")
            .field("mode", &self.mode())
            .field("adapter", &self.name())
            .finish()
    }
}
