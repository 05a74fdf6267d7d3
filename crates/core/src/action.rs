//! Action types for the deterministic state machines.

use crate::outcome::{ConsensusOutcome, OrderingEvent, SynchronizationEvent};
use crate::{Event, OutboundMessage, PeerId, TimerId};
use std::time::Duration;

/// Actions the state machines want to perform.
///
/// Actions are commands: they describe something to do. The runner executes
/// them and may convert results back into events.
#[derive(Debug, Clone)]
pub enum Action {
    // ═══════════════════════════════════════════════════════════════════════
    // Network
    // ═══════════════════════════════════════════════════════════════════════
    /// Send a message to one peer.
    Send {
        to: PeerId,
        message: OutboundMessage,
    },

    // ═══════════════════════════════════════════════════════════════════════
    // Timers
    // ═══════════════════════════════════════════════════════════════════════
    /// Set a timer to fire after a duration. Replaces any timer with the
    /// same id.
    SetTimer { id: TimerId, duration: Duration },

    /// Cancel a previously set timer. Idempotent.
    CancelTimer { id: TimerId },

    // ═══════════════════════════════════════════════════════════════════════
    // Internal (fed back as events with Internal priority)
    // ═══════════════════════════════════════════════════════════════════════
    /// Enqueue an internal event for immediate processing.
    EnqueueInternal { event: Event },

    // ═══════════════════════════════════════════════════════════════════════
    // External Notifications
    // ═══════════════════════════════════════════════════════════════════════
    /// A consensus round reached its terminal outcome.
    EmitOutcome { outcome: ConsensusOutcome },

    /// The gate produced the (stripped) proposal for the current round.
    EmitOrderingEvent { event: OrderingEvent },

    /// The synchronizer finished processing a consensus outcome.
    EmitSyncEvent { event: SynchronizationEvent },
}

impl Action {
    /// Check if this action performs network I/O.
    pub fn is_network(&self) -> bool {
        matches!(self, Action::Send { .. })
    }

    /// Check if this is an internal event action.
    pub fn is_internal(&self) -> bool {
        matches!(self, Action::EnqueueInternal { .. })
    }

    /// Get the action type name for telemetry.
    pub fn type_name(&self) -> &'static str {
        match self {
            Action::Send { .. } => "Send",
            Action::SetTimer { .. } => "SetTimer",
            Action::CancelTimer { .. } => "CancelTimer",
            Action::EnqueueInternal { .. } => "EnqueueInternal",
            Action::EmitOutcome { .. } => "EmitOutcome",
            Action::EmitOrderingEvent { .. } => "EmitOrderingEvent",
            Action::EmitSyncEvent { .. } => "EmitSyncEvent",
        }
    }
}
