//! Timer management.
//!
//! Timers are tokio tasks that sleep and then push the corresponding event
//! into the owning engine's channel. Setting a timer replaces any existing
//! timer with the same id; cancelling is idempotent, and a timer firing
//! after cancellation is a no-op (the task is aborted).

use meridian_core::{Event, TimerId};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

fn timer_event(id: TimerId) -> Event {
    match id {
        TimerId::VoteDelay => Event::VoteTimer,
    }
}

/// Manages the cancellable timers of one engine.
pub struct TimerManager {
    timers: HashMap<TimerId, JoinHandle<()>>,
    event_tx: mpsc::Sender<Event>,
}

impl TimerManager {
    pub fn new(event_tx: mpsc::Sender<Event>) -> Self {
        TimerManager {
            timers: HashMap::new(),
            event_tx,
        }
    }

    /// Arm a timer; an existing timer with the same id is cancelled first.
    pub fn set_timer(&mut self, id: TimerId, duration: Duration) {
        self.cancel_timer(id);

        let event_tx = self.event_tx.clone();
        let handle = tokio::spawn(async move {
            trace!(?id, ?duration, "Timer armed");
            tokio::time::sleep(duration).await;
            let _ = event_tx.send(timer_event(id)).await;
        });
        self.timers.insert(id, handle);
        debug!(?id, ?duration, "Timer set");
    }

    /// Cancel a timer. A missing or already-fired timer is a no-op.
    pub fn cancel_timer(&mut self, id: TimerId) {
        if let Some(handle) = self.timers.remove(&id) {
            handle.abort();
            debug!(?id, "Timer cancelled");
        }
    }

    /// Cancel everything (shutdown).
    pub fn cancel_all(&mut self) {
        for (id, handle) in self.timers.drain() {
            handle.abort();
            trace!(?id, "Timer cancelled (shutdown)");
        }
    }

    pub fn active_count(&self) -> usize {
        self.timers.len()
    }
}

impl Drop for TimerManager {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
