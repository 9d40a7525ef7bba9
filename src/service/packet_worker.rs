//! The single sequential packet worker.
//!
//! Every `read` / `write` across every connection is queued onto one FIFO
//! channel drained by one dedicated thread, so listeners observe packet events
//! in one global order. The calling transport thread blocks on a reply channel
//! until the verdict arrives. The verdict timeout starts when the worker
//! dequeues the packet, so time spent waiting behind other packets never
//! counts against it; only a listener that stalls on this packet trips it.

use crate::config::WorkerConfig;
use crate::core::event::{Cancellable, Connection, PacketReceiveEvent, PacketSendEvent};
use crate::core::verdict::{Direction, FaultPolicy, Verdict};
use crate::error::{constants, panic_message, InterceptError, Result};
use crate::protocol::dispatcher::EventDispatcher;
use crate::utils::metrics::Metrics;
use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, SendError, Sender};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

/// Worker-to-submitter messages for one packet
enum Reply<P> {
    /// The worker dequeued the packet and is about to dispatch it
    Started,
    Done(Verdict<P>),
}

enum PacketTask<C, P> {
    Process {
        direction: Direction,
        connection: C,
        packet: P,
        reply: Sender<Reply<P>>,
    },
    Shutdown,
}

/// State shared between the worker thread and submitters
struct WorkerCore<C, P> {
    dispatcher: Arc<EventDispatcher<C, P>>,
    metrics: Arc<Metrics>,
    fault_policy: FaultPolicy,
    sequence: AtomicU64,
}

impl<C: 'static, P: 'static> WorkerCore<C, P> {
    fn process(&self, direction: Direction, connection: C, packet: P) -> Verdict<P> {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);

        match direction {
            Direction::Outbound => {
                let mut event = PacketSendEvent::new(connection, packet, sequence);
                let dispatched = self.dispatcher.call_event(&mut event);
                let cancelled = event.is_cancelled();
                self.settle(direction, sequence, dispatched, cancelled, event.into_packet())
            }
            Direction::Inbound => {
                let mut event = PacketReceiveEvent::new(connection, packet, sequence);
                let dispatched = self.dispatcher.call_event(&mut event);
                let cancelled = event.is_cancelled();
                self.settle(direction, sequence, dispatched, cancelled, event.into_packet())
            }
        }
    }

    fn settle(
        &self,
        direction: Direction,
        sequence: u64,
        dispatched: Result<()>,
        cancelled: bool,
        packet: P,
    ) -> Verdict<P> {
        match dispatched {
            Ok(()) if cancelled => {
                trace!(%direction, sequence, "Packet cancelled");
                Verdict::Drop
            }
            Ok(()) => Verdict::Forward(packet),
            Err(err) => {
                self.metrics.listener_fault();
                warn!(
                    %direction,
                    sequence,
                    error = %err,
                    policy = ?self.fault_policy,
                    "Listener fault on packet event"
                );
                self.fault_policy.apply(packet)
            }
        }
    }
}

/// Handle to the packet worker thread. Dropping it drains the queue and joins
/// the thread.
pub struct PacketWorker<C, P> {
    sender: Sender<PacketTask<C, P>>,
    core: Arc<WorkerCore<C, P>>,
    verdict_wait: Option<Duration>,
    thread_id: ThreadId,
    join: Option<JoinHandle<()>>,
}

impl<C, P> PacketWorker<C, P>
where
    C: Connection,
    P: Send + 'static,
{
    pub fn spawn(
        config: &WorkerConfig,
        dispatcher: Arc<EventDispatcher<C, P>>,
        metrics: Arc<Metrics>,
    ) -> Result<Self> {
        let (sender, receiver) = unbounded::<PacketTask<C, P>>();
        let core = Arc::new(WorkerCore {
            dispatcher,
            metrics,
            fault_policy: config.fault_policy,
            sequence: AtomicU64::new(0),
        });

        let thread_core = Arc::clone(&core);
        let join = thread::Builder::new()
            .name(config.thread_name.clone())
            .spawn(move || worker_loop(receiver, thread_core))
            .map_err(|e| InterceptError::Runtime(format!("{}: {e}", constants::ERR_WORKER_SPAWN)))?;

        debug!(thread = %config.thread_name, "Packet worker started");

        Ok(Self {
            sender,
            core,
            verdict_wait: config.verdict_wait(),
            thread_id: join.thread().id(),
            join: Some(join),
        })
    }

    /// Run one packet through the pipeline and wait for its verdict.
    ///
    /// Packet and verdict counters record what the caller gets back, which
    /// after a timeout is `Drop` even if the listeners later forward it.
    pub fn submit(&self, direction: Direction, connection: &C, packet: P) -> Verdict<P> {
        self.core.metrics.packet(direction);
        let verdict = self.run(direction, connection, packet);
        self.core.metrics.verdict(verdict.is_forward());
        verdict
    }

    fn run(&self, direction: Direction, connection: &C, packet: P) -> Verdict<P> {
        // A listener writing a packet from the worker thread would otherwise
        // queue behind the task that is currently running.
        if thread::current().id() == self.thread_id {
            trace!(%direction, "Re-entrant packet submission, processing inline");
            return self.core.process(direction, connection.clone(), packet);
        }

        let (reply, reply_rx) = bounded::<Reply<P>>(2);
        let task = PacketTask::Process {
            direction,
            connection: connection.clone(),
            packet,
            reply,
        };

        if let Err(SendError(task)) = self.sender.send(task) {
            warn!(%direction, "{}", constants::ERR_WORKER_GONE);
            return match task {
                PacketTask::Process { packet, .. } => self.core.fault_policy.apply(packet),
                PacketTask::Shutdown => Verdict::Drop,
            };
        }

        match self.await_verdict(&reply_rx) {
            Ok(verdict) => verdict,
            Err(err) => {
                if matches!(err, InterceptError::VerdictTimeout(_)) {
                    self.core.metrics.verdict_timeout();
                }
                warn!(%direction, error = %err, "No packet verdict, dropping packet");
                Verdict::Drop
            }
        }
    }

    fn await_verdict(&self, reply_rx: &Receiver<Reply<P>>) -> Result<Verdict<P>> {
        let mut deadline: Option<(Instant, Duration)> = None;
        loop {
            let reply = match deadline {
                None => reply_rx.recv().map_err(|_| InterceptError::WorkerUnavailable)?,
                Some((at, timeout)) => match reply_rx.recv_deadline(at) {
                    Ok(reply) => reply,
                    Err(RecvTimeoutError::Timeout) => return Err(InterceptError::VerdictTimeout(timeout)),
                    Err(RecvTimeoutError::Disconnected) => return Err(InterceptError::WorkerUnavailable),
                },
            };

            match reply {
                Reply::Started => {
                    deadline = self.verdict_wait.map(|timeout| (Instant::now() + timeout, timeout));
                }
                Reply::Done(verdict) => return Ok(verdict),
            }
        }
    }

    /// Packets queued behind the one being processed
    pub fn pending(&self) -> usize {
        self.sender.len()
    }

    /// Number of packet events dispatched or in flight so far
    pub fn sequence(&self) -> u64 {
        self.core.sequence.load(Ordering::Relaxed)
    }
}

impl<C, P> Drop for PacketWorker<C, P> {
    fn drop(&mut self) {
        let _ = self.sender.send(PacketTask::Shutdown);
        if let Some(join) = self.join.take() {
            // The last handle can be dropped by a listener running on the worker.
            if thread::current().id() != self.thread_id {
                let _ = join.join();
            }
        }
    }
}

fn worker_loop<C: 'static, P: 'static>(receiver: Receiver<PacketTask<C, P>>, core: Arc<WorkerCore<C, P>>) {
    for task in receiver {
        match task {
            PacketTask::Process {
                direction,
                connection,
                packet,
                reply,
            } => {
                // Nobody is waiting for this verdict any more
                if reply.send(Reply::Started).is_err() {
                    trace!(%direction, "Submitter gone, packet skipped");
                    continue;
                }

                match catch_unwind(AssertUnwindSafe(|| core.process(direction, connection, packet))) {
                    // The submitter may have timed out and gone away.
                    Ok(verdict) => {
                        let _ = reply.send(Reply::Done(verdict));
                    }
                    Err(payload) => {
                        core.metrics.listener_fault();
                        warn!(
                            %direction,
                            panic = %panic_message(payload.as_ref()),
                            "Packet processing panicked"
                        );
                    }
                }
            }
            PacketTask::Shutdown => break,
        }
    }
    debug!("Packet worker stopped");
}
