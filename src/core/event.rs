use std::fmt::Debug;

/// A connection handle.
///
/// Owned by the transport; this crate only clones it into events and queued
/// tasks and never mutates it. Any cheap, shareable handle qualifies.
pub trait Connection: Clone + Debug + Send + Sync + 'static {}

impl<T> Connection for T where T: Clone + Debug + Send + Sync + 'static {}

/// Cancellation and propagation control shared by every event
pub trait Cancellable {
    fn is_cancelled(&self) -> bool;

    fn set_cancelled(&mut self, cancelled: bool);

    /// Stop delivering this event to the remaining listeners
    fn stop_propagation(&mut self);

    fn is_propagation_stopped(&self) -> bool;

    /// Shorthand for `set_cancelled(true)`
    fn cancel(&mut self) {
        self.set_cancelled(true);
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct EventState {
    cancelled: bool,
    stopped: bool,
}

macro_rules! impl_cancellable {
    ($ty:ident < $($g:ident),+ >) => {
        impl<$($g),+> Cancellable for $ty<$($g),+> {
            fn is_cancelled(&self) -> bool {
                self.state.cancelled
            }

            fn set_cancelled(&mut self, cancelled: bool) {
                self.state.cancelled = cancelled;
            }

            fn stop_propagation(&mut self) {
                self.state.stopped = true;
            }

            fn is_propagation_stopped(&self) -> bool {
                self.state.stopped
            }
        }
    };
}

/// Fired before a connection's transport gets the interception hooks
#[derive(Debug, Clone)]
pub struct InjectEvent<C> {
    connection: C,
    is_async: bool,
    state: EventState,
}

impl<C> InjectEvent<C> {
    pub fn new(connection: C, is_async: bool) -> Self {
        Self {
            connection,
            is_async,
            state: EventState::default(),
        }
    }

    pub fn connection(&self) -> &C {
        &self.connection
    }

    /// Whether the request came through `inject_player_async`
    pub fn is_async(&self) -> bool {
        self.is_async
    }
}

impl_cancellable!(InjectEvent<C>);

/// Fired before the interception hooks are removed from a connection
#[derive(Debug, Clone)]
pub struct UninjectEvent<C> {
    connection: C,
    is_async: bool,
    state: EventState,
}

impl<C> UninjectEvent<C> {
    pub fn new(connection: C, is_async: bool) -> Self {
        Self {
            connection,
            is_async,
            state: EventState::default(),
        }
    }

    pub fn connection(&self) -> &C {
        &self.connection
    }

    /// Whether the request came through `eject_player_async`
    pub fn is_async(&self) -> bool {
        self.is_async
    }
}

impl_cancellable!(UninjectEvent<C>);

/// An outbound packet about to be written to the peer.
///
/// Only the packet worker builds these; `sequence` is its global processing
/// order across every connection and both directions.
#[derive(Debug)]
pub struct PacketSendEvent<C, P> {
    connection: C,
    packet: P,
    sequence: u64,
    state: EventState,
}

impl<C, P> PacketSendEvent<C, P> {
    pub(crate) fn new(connection: C, packet: P, sequence: u64) -> Self {
        Self {
            connection,
            packet,
            sequence,
            state: EventState::default(),
        }
    }

    pub fn connection(&self) -> &C {
        &self.connection
    }

    pub fn packet(&self) -> &P {
        &self.packet
    }

    /// Replace or edit the packet that will be forwarded
    pub fn packet_mut(&mut self) -> &mut P {
        &mut self.packet
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub(crate) fn into_packet(self) -> P {
        self.packet
    }
}

impl_cancellable!(PacketSendEvent<C, P>);

/// An inbound packet read from the peer, before the server handles it.
#[derive(Debug)]
pub struct PacketReceiveEvent<C, P> {
    connection: C,
    packet: P,
    sequence: u64,
    state: EventState,
}

impl<C, P> PacketReceiveEvent<C, P> {
    pub(crate) fn new(connection: C, packet: P, sequence: u64) -> Self {
        Self {
            connection,
            packet,
            sequence,
            state: EventState::default(),
        }
    }

    pub fn connection(&self) -> &C {
        &self.connection
    }

    pub fn packet(&self) -> &P {
        &self.packet
    }

    pub fn packet_mut(&mut self) -> &mut P {
        &mut self.packet
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub(crate) fn into_packet(self) -> P {
        self.packet
    }
}

impl_cancellable!(PacketReceiveEvent<C, P>);
