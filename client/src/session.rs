use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::watch;

use crate::board::{Board, Deck, Field, FinalizeAction};
use crate::error::BoardError;
use crate::games::GameVariant;
use crate::state::SharedState;
use crate::transitions::{Settle, TransitionCoordinator};

/// The named decks and fields a variant plays with, all unbound.
#[derive(Debug, Clone, Default)]
pub struct Layout {
    decks: BTreeMap<String, Deck>,
    fields: BTreeMap<String, Field>,
}

impl Layout {
    pub fn new(decks: Vec<(String, Deck)>, fields: Vec<(String, Field)>) -> Self {
        Layout {
            decks: decks.into_iter().collect(),
            fields: fields.into_iter().collect(),
        }
    }

    pub fn deck(&self, name: &str) -> Result<&Deck, BoardError> {
        self.decks
            .get(name)
            .ok_or_else(|| BoardError::UnknownGroup(name.to_string()))
    }

    pub fn field(&self, name: &str) -> Result<&Field, BoardError> {
        self.fields
            .get(name)
            .ok_or_else(|| BoardError::UnknownGroup(name.to_string()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResultRow {
    pub player_id: usize,
    pub name: String,
    /// `None` until the final scores arrive.
    pub points: Option<i64>,
    pub is_self: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DetailValue {
    pub player_id: usize,
    pub value: i64,
    /// Compact card summary, e.g. `A7-6` for a primiera.
    pub cards: Option<String>,
    pub winner: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResultDetail {
    pub kind: String,
    pub values: Vec<DetailValue>,
}

/// End-of-game table. Rows are kept in display order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Results {
    pub rows: Vec<ResultRow>,
    pub details: Vec<ResultDetail>,
    pub shown: bool,
}

/// What renderers see after each published change.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub variant: &'static str,
    pub game_id: String,
    pub player_id: Option<i64>,
    pub players: Vec<String>,
    pub started: bool,
    pub rematch_requested: bool,
    pub results: Results,
    pub board: Board,
}

/// Everything a command handler may touch.
///
/// Only the dispatcher owns a `Session`, so handlers get `&mut` access and
/// never race each other.
#[derive(Debug)]
pub struct Session {
    variant: Arc<dyn GameVariant>,
    layout: Layout,
    pub board: Board,
    shared: Arc<SharedState>,
    transitions: Arc<TransitionCoordinator>,
    pending: FinalizeAction,
    player_id: Option<i64>,
    players: Vec<String>,
    started: bool,
    pub results: Results,
    rematch_requested: bool,
    snapshots: watch::Sender<Snapshot>,
}

impl Session {
    pub fn new(
        variant: Arc<dyn GameVariant>,
        shared: Arc<SharedState>,
        transitions: Arc<TransitionCoordinator>,
    ) -> (Self, watch::Receiver<Snapshot>) {
        let layout = variant.layout();
        let (snapshots, rx) = watch::channel(Snapshot {
            variant: variant.name(),
            game_id: shared.game_id(),
            ..Snapshot::default()
        });
        let session = Session {
            variant,
            layout,
            board: Board::new(),
            shared,
            transitions,
            pending: FinalizeAction::none(),
            player_id: None,
            players: Vec::new(),
            started: false,
            results: Results::default(),
            rematch_requested: false,
            snapshots,
        };
        (session, rx)
    }

    pub fn variant(&self) -> &Arc<dyn GameVariant> {
        &self.variant
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Unbound deck by name, cloned so it can be bound and used while the
    /// board is borrowed mutably.
    pub fn deck(&self, name: &str) -> Result<Deck, BoardError> {
        self.layout.deck(name).cloned()
    }

    pub fn field(&self, name: &str) -> Result<Field, BoardError> {
        self.layout.field(name).cloned()
    }

    pub fn shared(&self) -> &SharedState {
        &self.shared
    }

    pub fn transitions(&self) -> &TransitionCoordinator {
        &self.transitions
    }

    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshots.subscribe()
    }

    pub fn player_id(&self) -> Option<i64> {
        self.player_id
    }

    pub fn set_player_id(&mut self, player_id: i64) {
        self.player_id = Some(player_id);
    }

    /// Seat the board is drawn from; spectators watch from seat 0.
    pub fn player_side(&self) -> i64 {
        self.player_id.unwrap_or(-1).max(0)
    }

    pub fn is_self(&self, player_id: i64) -> bool {
        self.player_id == Some(player_id)
    }

    /// Sub-field value naming `player_id`'s groups (`self`/`opponent`).
    pub fn player_identifier(&self, player_id: i64) -> &'static str {
        self.variant.player_identifier(player_id, self.player_side())
    }

    pub fn players(&self) -> &[String] {
        &self.players
    }

    pub fn set_players(&mut self, players: Vec<String>) {
        self.players = players;
    }

    pub fn started(&self) -> bool {
        self.started
    }

    pub fn set_rematch_requested(&mut self, requested: bool) {
        self.rematch_requested = requested;
    }

    /// Wipes the table for a new game.
    pub fn begin(&mut self) {
        self.flush_pending();
        self.board.clear();
        self.results = Results::default();
        self.rematch_requested = false;
        self.started = true;
    }

    /// Queues a finalize action to run once transitions settle.
    pub fn defer(&mut self, action: FinalizeAction) {
        self.pending.merge(action);
    }

    /// Publishes the moved board, waits for it to settle, then runs every
    /// deferred finalize action and publishes again.
    pub async fn await_transitions(&mut self) -> Settle {
        self.publish();
        let settle = self.transitions.await_transitions().await;
        self.flush_pending();
        self.publish();
        settle
    }

    pub async fn settle(&mut self, action: FinalizeAction) -> Settle {
        self.defer(action);
        self.await_transitions().await
    }

    /// Runs deferred actions now. Returns whether there were any.
    pub fn flush_pending(&mut self) -> bool {
        let pending = std::mem::take(&mut self.pending);
        if pending.is_empty() {
            return false;
        }
        pending.run(&mut self.board);
        true
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn publish(&self) {
        self.snapshots.send_replace(Snapshot {
            variant: self.variant.name(),
            game_id: self.shared.game_id(),
            player_id: self.player_id,
            players: self.players.clone(),
            started: self.started,
            rematch_requested: self.rematch_requested,
            results: self.results.clone(),
            board: self.board.clone(),
        });
    }
}
