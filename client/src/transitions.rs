//! Waiting for card animations to finish.
//!
//! The renderer reports every transition it starts and finishes on a card.
//! A command that moved cards waits here until the last running transition
//! ends, bounded by a fallback of twice the nominal duration so a lost end
//! signal can never stall the command queue.

use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Notify;

use crate::board::CardId;
use crate::config::Motion;

/// How an [`TransitionCoordinator::await_transitions`] call returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settle {
    /// Animations are off: nothing to wait for.
    Immediate,
    /// Reduced motion: slept half a duration.
    Reduced,
    /// The last running transition reported its end.
    Drained,
    /// Nobody reported in time.
    Fallback,
}

#[derive(Debug)]
pub struct TransitionCoordinator {
    duration: Duration,
    motion: Motion,
    /// Server-controlled; `animations|off` during catch-up replays.
    animations: AtomicBool,
    running: Mutex<HashMap<CardId, HashSet<String>>>,
    drained: Notify,
}

impl TransitionCoordinator {
    pub fn new(duration: Duration, motion: Motion) -> Self {
        TransitionCoordinator {
            duration,
            motion,
            animations: AtomicBool::new(true),
            running: Mutex::new(HashMap::new()),
            drained: Notify::new(),
        }
    }

    /// True when cards visibly move: the server allows animations and the
    /// local renderer animates at all.
    pub fn animations_enabled(&self) -> bool {
        self.animations.load(Ordering::SeqCst) && self.motion != Motion::None
    }

    pub fn set_animations(&self, enabled: bool) {
        tracing::debug!(enabled, "animations");
        self.animations.store(enabled, Ordering::SeqCst);
    }

    pub fn transition_started(&self, card: CardId, property: impl Into<String>) {
        self.running
            .lock()
            .entry(card)
            .or_default()
            .insert(property.into());
    }

    pub fn transition_ended(&self, card: CardId, property: &str) {
        let drained = {
            let mut running = self.running.lock();
            let Some(properties) = running.get_mut(&card) else {
                // end without a start: the card was created mid-transition
                return;
            };
            properties.remove(property);
            if properties.is_empty() {
                running.remove(&card);
            }
            running.is_empty()
        };
        if drained {
            self.drained.notify_waiters();
        }
    }

    /// Drops whatever `card` had running, e.g. because it left the board.
    pub fn forget(&self, card: CardId) {
        let drained = {
            let mut running = self.running.lock();
            running.remove(&card).is_some() && running.is_empty()
        };
        if drained {
            self.drained.notify_waiters();
        }
    }

    pub fn running(&self) -> usize {
        self.running.lock().len()
    }

    /// Resolves once the board has visibly settled.
    ///
    /// The fallback is armed even when no transition is registered yet: the
    /// renderer may only start them after this call.
    pub async fn await_transitions(&self) -> Settle {
        if !self.animations_enabled() {
            return Settle::Immediate;
        }
        if self.motion == Motion::Reduced {
            tokio::time::sleep(self.duration / 2).await;
            return Settle::Reduced;
        }

        let notified = self.drained.notified();
        match tokio::time::timeout(2 * self.duration, notified).await {
            Ok(()) => Settle::Drained,
            Err(_) => {
                tracing::debug!(running = self.running(), "transition fallback fired");
                Settle::Fallback
            }
        }
    }

    /// Sleeps `factor` transition durations, letting the previous move be
    /// seen before the next one. Skipped while animations are off.
    pub async fn pause(&self, factor: u32) {
        if self.animations_enabled() {
            tokio::time::sleep(self.duration * factor).await;
        }
    }
}
