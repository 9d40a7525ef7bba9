use crate::config::InterceptorConfig;
use crate::core::event::{Cancellable, Connection, InjectEvent, UninjectEvent};
use crate::core::verdict::{Direction, LifecycleKind, LifecycleOutcome, Verdict};
use crate::error::Result;
use crate::protocol::dispatcher::{EventDispatcher, ListenerId};
use crate::protocol::listener::{Listener, ListenerOptions};
use crate::service::lifecycle::{LifecyclePool, LifecycleTask};
use crate::service::packet_worker::PacketWorker;
use crate::transport::adapter::ActiveTransport;
use crate::transport::mode::TransportMode;
use crate::utils::metrics::{Metrics, MetricsSnapshot, Timer};
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{debug, info, instrument, warn};

/// Everything a lifecycle request needs; shared with queued async requests.
struct LifecycleCore<C, P> {
    transport: ActiveTransport<C>,
    dispatcher: Arc<EventDispatcher<C, P>>,
    metrics: Arc<Metrics>,
}

impl<C: Connection, P: 'static> LifecycleCore<C, P> {
    fn inject(&self, connection: &C, is_async: bool) -> LifecycleOutcome {
        let _timer = Timer::start("inject");
        let mut event = InjectEvent::new(connection.clone(), is_async);
        let dispatched = self.dispatcher.call_event(&mut event);

        let outcome = self.settle(LifecycleKind::Inject, dispatched, event.is_cancelled(), || {
            self.transport.attach(connection)
        });
        self.metrics.lifecycle(LifecycleKind::Inject, &outcome);
        outcome
    }

    fn eject(&self, connection: &C, is_async: bool) -> LifecycleOutcome {
        let _timer = Timer::start("eject");
        let mut event = UninjectEvent::new(connection.clone(), is_async);
        let dispatched = self.dispatcher.call_event(&mut event);

        let outcome = self.settle(LifecycleKind::Eject, dispatched, event.is_cancelled(), || {
            self.transport.detach(connection)
        });
        self.metrics.lifecycle(LifecycleKind::Eject, &outcome);
        outcome
    }

    fn settle<F>(
        &self,
        kind: LifecycleKind,
        dispatched: Result<()>,
        cancelled: bool,
        apply: F,
    ) -> LifecycleOutcome
    where
        F: FnOnce() -> Result<()>,
    {
        if let Err(err) = dispatched {
            warn!(%kind, error = %err, "Lifecycle event dispatch failed, adapter call skipped");
            return LifecycleOutcome::Failed(err);
        }

        if cancelled {
            debug!(%kind, "Lifecycle event cancelled by listener");
            return LifecycleOutcome::Cancelled;
        }

        match apply() {
            Ok(()) => LifecycleOutcome::Applied,
            Err(err) => {
                warn!(%kind, adapter = self.transport.name(), error = %err, "Transport adapter call failed");
                LifecycleOutcome::Failed(err)
            }
        }
    }
}

struct Inner<C, P> {
    lifecycle: Arc<LifecycleCore<C, P>>,
    worker: PacketWorker<C, P>,
    pool: LifecyclePool,
    config: InterceptorConfig,
}

/// The interception coordinator.
///
/// Cloning is cheap; every clone drives the same packet worker, listener table
/// and adapter. The packet worker and the lifecycle pool shut down when the
/// last clone is dropped.
///
/// ```no_run
/// use packet_intercept::prelude::*;
///
/// struct Noop;
///
/// impl TransportAdapter<u64> for Noop {
///     fn name(&self) -> &str { "noop" }
///     fn attach(&self, _c: &u64) -> packet_intercept::Result<()> { Ok(()) }
///     fn detach(&self, _c: &u64) -> packet_intercept::Result<()> { Ok(()) }
/// }
///
/// let config = InterceptorConfig::default();
/// let mode = config.transport.resolve_mode(EnvSymbols::from_env());
/// let interceptor: Interceptor<u64, Vec<u8>> =
///     Interceptor::builder(ActiveTransport::select(mode, Noop, Noop))
///         .config(config)
///         .build()
///         .unwrap();
///
/// interceptor.inject_player(&1);
/// if let Some(packet) = interceptor.write(&1, vec![0x01]).into_packet() {
///     // hand `packet` on to the transport
///     let _ = packet;
/// }
/// ```
pub struct Interceptor<C, P> {
    inner: Arc<Inner<C, P>>,
}

impl<C, P> Clone for Interceptor<C, P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C, P> Interceptor<C, P>
where
    C: Connection,
    P: Send + 'static,
{
    pub fn builder(transport: ActiveTransport<C>) -> InterceptorBuilder<C, P> {
        InterceptorBuilder::new(transport)
    }

    /// Synchronously attach the interception hooks to `connection`.
    ///
    /// Fires an [`InjectEvent`]; the adapter is called only if no listener
    /// cancelled it. Never panics or propagates: failures come back as
    /// [`LifecycleOutcome::Failed`].
    #[instrument(level = "debug", skip(self))]
    pub fn inject_player(&self, connection: &C) -> LifecycleOutcome {
        self.inner.lifecycle.inject(connection, false)
    }

    /// [`Interceptor::inject_player`] on the lifecycle pool
    #[instrument(level = "debug", skip(self))]
    pub fn inject_player_async(&self, connection: C) -> LifecycleTask {
        let lifecycle = Arc::clone(&self.inner.lifecycle);
        self.inner
            .pool
            .spawn(move || lifecycle.inject(&connection, true))
    }

    /// Synchronously detach the interception hooks from `connection`
    #[instrument(level = "debug", skip(self))]
    pub fn eject_player(&self, connection: &C) -> LifecycleOutcome {
        self.inner.lifecycle.eject(connection, false)
    }

    /// [`Interceptor::eject_player`] on the lifecycle pool
    #[instrument(level = "debug", skip(self))]
    pub fn eject_player_async(&self, connection: C) -> LifecycleTask {
        let lifecycle = Arc::clone(&self.inner.lifecycle);
        self.inner
            .pool
            .spawn(move || lifecycle.eject(&connection, true))
    }

    /// Outbound hook: called by the transport for every packet it is about to
    /// send. Blocks until the packet worker has run the send listeners.
    pub fn write(&self, connection: &C, packet: P) -> Verdict<P> {
        self.inner.worker.submit(Direction::Outbound, connection, packet)
    }

    /// Inbound hook: called by the transport for every packet it has read.
    /// Blocks until the packet worker has run the receive listeners.
    pub fn read(&self, connection: &C, packet: P) -> Verdict<P> {
        self.inner.worker.submit(Direction::Inbound, connection, packet)
    }

    pub fn register_listener<L>(&self, listener: L, options: impl Into<ListenerOptions>) -> Result<ListenerId>
    where
        L: Listener<C, P>,
    {
        self.inner.lifecycle.dispatcher.register(listener, options)
    }

    pub fn unregister_listener(&self, id: ListenerId) -> Result<bool> {
        self.inner.lifecycle.dispatcher.unregister(id)
    }

    pub fn dispatcher(&self) -> &Arc<EventDispatcher<C, P>> {
        &self.inner.lifecycle.dispatcher
    }

    pub fn mode(&self) -> TransportMode {
        self.inner.lifecycle.transport.mode()
    }

    pub fn config(&self) -> &InterceptorConfig {
        &self.inner.config
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.inner.lifecycle.metrics.snapshot()
    }

    pub fn log_metrics(&self) {
        self.inner.lifecycle.metrics.log_metrics();
    }

    /// Packets waiting for the packet worker
    pub fn pending_packets(&self) -> usize {
        self.inner.worker.pending()
    }
}

/// Builder for [`Interceptor`]
pub struct InterceptorBuilder<C, P> {
    transport: ActiveTransport<C>,
    config: InterceptorConfig,
    dispatcher: Option<Arc<EventDispatcher<C, P>>>,
    runtime: Option<Handle>,
}

impl<C, P> InterceptorBuilder<C, P>
where
    C: Connection,
    P: Send + 'static,
{
    pub fn new(transport: ActiveTransport<C>) -> Self {
        Self {
            transport,
            config: InterceptorConfig::default(),
            dispatcher: None,
            runtime: None,
        }
    }

    pub fn config(mut self, config: InterceptorConfig) -> Self {
        self.config = config;
        self
    }

    /// Share an existing listener table
    pub fn dispatcher(mut self, dispatcher: Arc<EventDispatcher<C, P>>) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    /// Run async lifecycle requests on this runtime instead of a dedicated one
    pub fn runtime(mut self, handle: Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    pub fn build(self) -> Result<Interceptor<C, P>> {
        self.config.validate_strict()?;

        let metrics = Arc::new(Metrics::new());
        let dispatcher = self.dispatcher.unwrap_or_default();
        let worker = PacketWorker::spawn(&self.config.worker, Arc::clone(&dispatcher), Arc::clone(&metrics))?;
        let pool = match self.runtime {
            Some(handle) => LifecyclePool::from_handle(handle),
            None => LifecyclePool::new(&self.config.pool)?,
        };

        info!(
            mode = %self.transport.mode(),
            adapter = self.transport.name(),
            verdict_timeout_ms = self.config.worker.verdict_timeout.as_millis() as u64,
            "Interceptor ready"
        );

        Ok(Interceptor {
            inner: Arc::new(Inner {
                lifecycle: Arc::new(LifecycleCore {
                    transport: self.transport,
                    dispatcher,
                    metrics,
                }),
                worker,
                pool,
                config: self.config,
            }),
        })
    }
}
