use crate::core::event::{
    Cancellable, InjectEvent, PacketReceiveEvent, PacketSendEvent, UninjectEvent,
};
use crate::error::Result;

/// Delivery priority. Lower runs first.
///
/// `Monitor` runs last and is meant for observers that record the final state
/// of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Priority {
    Lowest,
    Low,
    #[default]
    Normal,
    High,
    Highest,
    Monitor,
}

/// Per-registration settings
#[derive(Debug, Clone, Copy, Default)]
pub struct ListenerOptions {
    pub priority: Priority,
    /// Skip this listener when an earlier one already cancelled the event
    pub ignore_cancelled: bool,
}

impl ListenerOptions {
    pub fn new(priority: Priority) -> Self {
        Self {
            priority,
            ignore_cancelled: false,
        }
    }

    pub fn ignore_cancelled(mut self) -> Self {
        self.ignore_cancelled = true;
        self
    }
}

impl From<Priority> for ListenerOptions {
    fn from(priority: Priority) -> Self {
        Self::new(priority)
    }
}

/// Event handler. Every method defaults to a no-op, implement the ones you need.
///
/// Returning an error aborts delivery of that event to the remaining
/// listeners. For lifecycle events the adapter call is then skipped; for
/// packet events the packet worker applies its fault policy.
#[allow(unused_variables)]
pub trait Listener<C, P>: Send + Sync + 'static {
    fn on_inject(&self, event: &mut InjectEvent<C>) -> Result<()> {
        Ok(())
    }

    fn on_uninject(&self, event: &mut UninjectEvent<C>) -> Result<()> {
        Ok(())
    }

    fn on_packet_send(&self, event: &mut PacketSendEvent<C, P>) -> Result<()> {
        Ok(())
    }

    fn on_packet_receive(&self, event: &mut PacketReceiveEvent<C, P>) -> Result<()> {
        Ok(())
    }
}

/// An event the dispatcher knows how to route to a [`Listener`] method
pub trait Event<C, P>: Cancellable {
    /// Short name used in logs
    const NAME: &'static str;

    fn deliver(&mut self, listener: &dyn Listener<C, P>) -> Result<()>;
}

impl<C: 'static, P: 'static> Event<C, P> for InjectEvent<C> {
    const NAME: &'static str = "inject";

    fn deliver(&mut self, listener: &dyn Listener<C, P>) -> Result<()> {
        listener.on_inject(self)
    }
}

impl<C: 'static, P: 'static> Event<C, P> for UninjectEvent<C> {
    const NAME: &'static str = "uninject";

    fn deliver(&mut self, listener: &dyn Listener<C, P>) -> Result<()> {
        listener.on_uninject(self)
    }
}

impl<C: 'static, P: 'static> Event<C, P> for PacketSendEvent<C, P> {
    const NAME: &'static str = "packet_send";

    fn deliver(&mut self, listener: &dyn Listener<C, P>) -> Result<()> {
        listener.on_packet_send(self)
    }
}

impl<C: 'static, P: 'static> Event<C, P> for PacketReceiveEvent<C, P> {
    const NAME: &'static str = "packet_receive";

    fn deliver(&mut self, listener: &dyn Listener<C, P>) -> Result<()> {
        listener.on_packet_receive(self)
    }
}

// Closure adapters

pub struct InjectFn<F>(F);
pub struct UninjectFn<F>(F);
pub struct SendFn<F>(F);
pub struct ReceiveFn<F>(F);

/// Listen to inject events with a closure
pub fn on_inject<C, F>(f: F) -> InjectFn<F>
where
    F: Fn(&mut InjectEvent<C>) -> Result<()> + Send + Sync + 'static,
{
    InjectFn(f)
}

/// Listen to uninject events with a closure
pub fn on_uninject<C, F>(f: F) -> UninjectFn<F>
where
    F: Fn(&mut UninjectEvent<C>) -> Result<()> + Send + Sync + 'static,
{
    UninjectFn(f)
}

/// Listen to outbound packets with a closure
pub fn on_send<C, P, F>(f: F) -> SendFn<F>
where
    F: Fn(&mut PacketSendEvent<C, P>) -> Result<()> + Send + Sync + 'static,
{
    SendFn(f)
}

/// Listen to inbound packets with a closure
pub fn on_receive<C, P, F>(f: F) -> ReceiveFn<F>
where
    F: Fn(&mut PacketReceiveEvent<C, P>) -> Result<()> + Send + Sync + 'static,
{
    ReceiveFn(f)
}

impl<C, P, F> Listener<C, P> for InjectFn<F>
where
    F: Fn(&mut InjectEvent<C>) -> Result<()> + Send + Sync + 'static,
{
    fn on_inject(&self, event: &mut InjectEvent<C>) -> Result<()> {
        (self.0)(event)
    }
}

impl<C, P, F> Listener<C, P> for UninjectFn<F>
where
    F: Fn(&mut UninjectEvent<C>) -> Result<()> + Send + Sync + 'static,
{
    fn on_uninject(&self, event: &mut UninjectEvent<C>) -> Result<()> {
        (self.0)(event)
    }
}

impl<C, P, F> Listener<C, P> for SendFn<F>
where
    F: Fn(&mut PacketSendEvent<C, P>) -> Result<()> + Send + Sync + 'static,
{
    fn on_packet_send(&self, event: &mut PacketSendEvent<C, P>) -> Result<()> {
        (self.0)(event)
    }
}

impl<C, P, F> Listener<C, P> for ReceiveFn<F>
where
    F: Fn(&mut PacketReceiveEvent<C, P>) -> Result<()> + Send + Sync + 'static,
{
    fn on_packet_receive(&self, event: &mut PacketReceiveEvent<C, P>) -> Result<()> {
        (self.0)(event)
    }
}
