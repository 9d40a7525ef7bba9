use crate::error::{constants, panic_message, InterceptError, Result};
use crate::protocol::listener::{Event, Listener, ListenerOptions};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tracing::{debug, trace, warn};

fn poisoned(context: &'static str) -> InterceptError {
    warn!("{context}: lock poisoned");
    InterceptError::LockPoisoned
}

/// Handle returned by registration, used to unregister
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

struct Registration<C, P> {
    id: ListenerId,
    name: &'static str,
    options: ListenerOptions,
    listener: Arc<dyn Listener<C, P>>,
}

impl<C, P> Clone for Registration<C, P> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            name: self.name,
            options: self.options,
            listener: Arc::clone(&self.listener),
        }
    }
}

type Table<C, P> = Arc<Vec<Registration<C, P>>>;

/// Priority-ordered event dispatcher.
///
/// The listener table is copy-on-write: dispatch takes a snapshot and releases
/// the lock before calling any listener, so listeners may register or
/// unregister others while an event is in flight. Changes apply to the next
/// event.
pub struct EventDispatcher<C, P> {
    listeners: RwLock<Table<C, P>>,
    next_id: AtomicU64,
}

impl<C, P> Default for EventDispatcher<C, P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C, P> EventDispatcher<C, P> {
    pub fn new() -> Self {
        Self {
            listeners: RwLock::new(Arc::new(Vec::new())),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a listener at the given priority
    pub fn register<L>(&self, listener: L, options: impl Into<ListenerOptions>) -> Result<ListenerId>
    where
        L: Listener<C, P>,
    {
        self.insert(
            std::any::type_name::<L>(),
            Arc::new(listener),
            options.into(),
        )
    }

    /// Register a listener that is shared with other owners
    pub fn register_arc(
        &self,
        listener: Arc<dyn Listener<C, P>>,
        options: impl Into<ListenerOptions>,
    ) -> Result<ListenerId> {
        self.insert("shared listener", listener, options.into())
    }

    fn insert(
        &self,
        name: &'static str,
        listener: Arc<dyn Listener<C, P>>,
        options: ListenerOptions,
    ) -> Result<ListenerId> {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));

        let mut table = self.listeners.write().map_err(|_| poisoned(constants::ERR_DISPATCHER_WRITE_LOCK))?;

        let mut next = Vec::with_capacity(table.len() + 1);
        next.extend(table.iter().cloned());
        let at = next.partition_point(|r| r.options.priority <= options.priority);
        next.insert(
            at,
            Registration {
                id,
                name,
                options,
                listener,
            },
        );
        *table = Arc::new(next);

        debug!(listener = name, priority = ?options.priority, id = id.0, "Listener registered");
        Ok(id)
    }

    /// Remove a listener. Returns whether it was registered.
    pub fn unregister(&self, id: ListenerId) -> Result<bool> {
        let mut table = self.listeners.write().map_err(|_| poisoned(constants::ERR_DISPATCHER_WRITE_LOCK))?;

        if !table.iter().any(|r| r.id == id) {
            return Ok(false);
        }

        let next: Vec<_> = table.iter().filter(|r| r.id != id).cloned().collect();
        *table = Arc::new(next);
        debug!(id = id.0, "Listener unregistered");
        Ok(true)
    }

    /// Remove every listener
    pub fn clear(&self) -> Result<()> {
        let mut table = self.listeners.write().map_err(|_| poisoned(constants::ERR_DISPATCHER_WRITE_LOCK))?;
        *table = Arc::new(Vec::new());
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.snapshot().map(|t| t.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn snapshot(&self) -> Result<Table<C, P>> {
        let table = self.listeners.read().map_err(|_| poisoned(constants::ERR_DISPATCHER_READ_LOCK))?;
        Ok(Arc::clone(&table))
    }

    /// Deliver `event` to every listener in priority order.
    ///
    /// Delivery stops early when a listener calls `stop_propagation`. The first
    /// listener error or panic aborts delivery and is returned; the event keeps
    /// whatever state the listeners before it left.
    pub fn call_event<E>(&self, event: &mut E) -> Result<()>
    where
        E: Event<C, P>,
    {
        let table = self.snapshot()?;

        for reg in table.iter() {
            if event.is_propagation_stopped() {
                trace!(event = E::NAME, "Propagation stopped");
                break;
            }
            if reg.options.ignore_cancelled && event.is_cancelled() {
                continue;
            }

            let listener = reg.listener.as_ref();
            match catch_unwind(AssertUnwindSafe(|| event.deliver(listener))) {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    return Err(InterceptError::ListenerFailed {
                        listener: reg.name,
                        source: Box::new(err),
                    });
                }
                Err(payload) => {
                    return Err(InterceptError::ListenerPanicked {
                        listener: reg.name,
                        message: panic_message(payload.as_ref()),
                    });
                }
            }
        }

        Ok(())
    }
}
