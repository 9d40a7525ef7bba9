use crate::error::InterceptError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of a `read` / `write` hook.
///
/// `Drop` is the drop sentinel: the transport must not pass the original
/// packet on.
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict<P> {
    /// Continue with this packet (the original value, possibly mutated by a listener)
    Forward(P),
    /// Suppress the packet
    Drop,
}

impl<P> Verdict<P> {
    pub fn is_forward(&self) -> bool {
        matches!(self, Verdict::Forward(_))
    }

    pub fn is_drop(&self) -> bool {
        matches!(self, Verdict::Drop)
    }

    /// Borrow the forwarded packet, if any
    pub fn packet(&self) -> Option<&P> {
        match self {
            Verdict::Forward(packet) => Some(packet),
            Verdict::Drop => None,
        }
    }

    /// Consume the verdict; `None` means drop
    pub fn into_packet(self) -> Option<P> {
        match self {
            Verdict::Forward(packet) => Some(packet),
            Verdict::Drop => None,
        }
    }
}

impl<P> From<Verdict<P>> for Option<P> {
    fn from(verdict: Verdict<P>) -> Self {
        verdict.into_packet()
    }
}

/// Which side of the transport a packet travels on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Server to peer (`write`)
    Outbound,
    /// Peer to server (`read`)
    Inbound,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Outbound => f.write_str("outbound"),
            Direction::Inbound => f.write_str("inbound"),
        }
    }
}

/// What the packet worker answers when a listener faults on a packet event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FaultPolicy {
    /// Pass the packet on as if no listener had run
    Forward,
    /// Suppress the packet
    #[default]
    Drop,
}

impl FaultPolicy {
    pub(crate) fn apply<P>(self, packet: P) -> Verdict<P> {
        match self {
            FaultPolicy::Forward => Verdict::Forward(packet),
            FaultPolicy::Drop => Verdict::Drop,
        }
    }
}

/// Attach or detach
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleKind {
    Inject,
    Eject,
}

impl fmt::Display for LifecycleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleKind::Inject => f.write_str("inject"),
            LifecycleKind::Eject => f.write_str("eject"),
        }
    }
}

/// Result of an inject / eject request.
///
/// Failures are recovered, not propagated: the caller gets the error as a
/// value and the connection is left without any adapter side effect from the
/// failed step.
#[derive(Debug)]
pub enum LifecycleOutcome {
    /// The event went through and the adapter call returned successfully
    Applied,
    /// A listener cancelled the event; the adapter was never called
    Cancelled,
    /// Dispatch or the adapter call failed
    Failed(InterceptError),
}

impl LifecycleOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, LifecycleOutcome::Applied)
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, LifecycleOutcome::Cancelled)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, LifecycleOutcome::Failed(_))
    }

    pub fn error(&self) -> Option<&InterceptError> {
        match self {
            LifecycleOutcome::Failed(err) => Some(err),
            _ => None,
        }
    }
}
