use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::notifications::Notifications;

/// Session state that lives outside the command queue: read by the channel
/// when it reconnects and flipped by local input or connection loss without
/// waiting for the current handler to finish.
#[derive(Debug)]
pub struct SharedState {
    game_id: RwLock<String>,
    name: RwLock<String>,
    /// Set by `turn`, cleared when the local player acts or the link drops.
    playing: AtomicBool,
    turn_status: RwLock<Option<String>>,
    notifications: Notifications,
}

impl SharedState {
    pub fn new(game_id: impl Into<String>, name: impl Into<String>, notification_ttl: Duration) -> Self {
        SharedState {
            game_id: RwLock::new(game_id.into()),
            name: RwLock::new(name.into()),
            playing: AtomicBool::new(false),
            turn_status: RwLock::new(None),
            notifications: Notifications::new(notification_ttl),
        }
    }

    pub fn game_id(&self) -> String {
        self.game_id.read().clone()
    }

    pub fn set_game_id(&self, game_id: impl Into<String>) {
        *self.game_id.write() = game_id.into();
    }

    pub fn name(&self) -> String {
        self.name.read().clone()
    }

    pub fn set_name(&self, name: impl Into<String>) {
        *self.name.write() = name.into();
    }

    pub fn playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }

    pub fn set_playing(&self, playing: bool) {
        self.playing.store(playing, Ordering::SeqCst);
    }

    /// Clears the in-turn flag, returning whether it was set.
    pub fn take_playing(&self) -> bool {
        self.playing.swap(false, Ordering::SeqCst)
    }

    pub fn turn_status(&self) -> Option<String> {
        self.turn_status.read().clone()
    }

    pub fn set_turn_status(&self, status: Option<String>) {
        *self.turn_status.write() = status;
    }

    pub fn notifications(&self) -> &Notifications {
        &self.notifications
    }
}
