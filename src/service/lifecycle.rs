//! Worker pool for asynchronous inject / eject requests.
//!
//! Lifecycle requests are rare and independent, so they run on tokio's
//! blocking thread pool: threads are created on demand up to
//! `pool.max_threads` and reclaimed after `pool.keep_alive` of idleness.
//! Tasks carry no ordering guarantee relative to each other or to packet
//! processing.

use crate::config::PoolConfig;
use crate::core::verdict::LifecycleOutcome;
use crate::error::{constants, InterceptError, Result};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::runtime::{Builder, Handle, Runtime};
use tokio::task::JoinHandle;
use tracing::debug;

/// Completion handle of an asynchronous inject / eject.
///
/// Resolves once the lifecycle event has been dispatched and any adapter call
/// has returned. Await it from async code or call [`LifecycleTask::wait`] from
/// a plain thread. Dropping it does not cancel the request.
#[must_use = "dropping the handle does not cancel the request, but its outcome is lost"]
pub struct LifecycleTask {
    inner: JoinHandle<LifecycleOutcome>,
}

impl LifecycleTask {
    pub fn is_finished(&self) -> bool {
        self.inner.is_finished()
    }

    /// Block the current thread until the request completes.
    ///
    /// Not for use inside an async context; `.await` the task there instead.
    pub fn wait(self) -> LifecycleOutcome {
        futures::executor::block_on(self)
    }
}

impl Future for LifecycleTask {
    type Output = LifecycleOutcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.inner).poll(cx).map(|joined| {
            joined.unwrap_or_else(|e| LifecycleOutcome::Failed(InterceptError::TaskJoin(e.to_string())))
        })
    }
}

/// Pool executing lifecycle jobs
pub struct LifecyclePool {
    handle: Handle,
    /// Present when the pool built its own runtime
    runtime: Option<Runtime>,
}

impl LifecyclePool {
    /// Build a dedicated runtime sized from `config`
    pub fn new(config: &PoolConfig) -> Result<Self> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .max_blocking_threads(config.max_threads)
            .thread_keep_alive(config.keep_alive)
            .thread_name(config.thread_name.clone())
            .build()
            .map_err(|e| InterceptError::Runtime(format!("{}: {e}", constants::ERR_RUNTIME_BUILD)))?;

        debug!(
            thread = %config.thread_name,
            max_threads = config.max_threads,
            "Lifecycle pool started"
        );

        Ok(Self {
            handle: runtime.handle().clone(),
            runtime: Some(runtime),
        })
    }

    /// Run lifecycle jobs on an existing runtime's blocking pool
    pub fn from_handle(handle: Handle) -> Self {
        Self {
            handle,
            runtime: None,
        }
    }

    pub fn owns_runtime(&self) -> bool {
        self.runtime.is_some()
    }

    pub fn spawn<F>(&self, job: F) -> LifecycleTask
    where
        F: FnOnce() -> LifecycleOutcome + Send + 'static,
    {
        LifecycleTask {
            inner: self.handle.spawn_blocking(job),
        }
    }
}

impl Drop for LifecyclePool {
    fn drop(&mut self) {
        // Jobs that already started run to completion; queued ones resolve
        // to `Failed(TaskJoin)`.
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}
