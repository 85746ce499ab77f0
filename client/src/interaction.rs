use std::sync::Arc;
use tokio::sync::watch;

use carte_protocol::{Card, Outbound};

use crate::board::{CardFilter, CardId};
use crate::channel::ChannelHandle;
use crate::games::GameVariant;
use crate::session::Snapshot;
use crate::state::SharedState;

/// Local player input: turns clicks and menu actions into outbound verbs.
#[derive(Debug, Clone)]
pub struct Interaction {
    variant: Arc<dyn GameVariant>,
    shared: Arc<SharedState>,
    snapshots: watch::Receiver<Snapshot>,
    channel: ChannelHandle,
}

impl Interaction {
    pub fn new(
        variant: Arc<dyn GameVariant>,
        shared: Arc<SharedState>,
        snapshots: watch::Receiver<Snapshot>,
        channel: ChannelHandle,
    ) -> Self {
        Interaction {
            variant,
            shared,
            snapshots,
            channel,
        }
    }

    fn seated(&self) -> bool {
        self.snapshots.borrow().player_id.is_some_and(|id| id >= 0)
    }

    /// A click on a card of the latest snapshot. Only acts in turn, and only
    /// once per turn.
    pub fn click(&self, card: CardId) -> Option<Outbound> {
        if !self.shared.playing() {
            return None;
        }
        let out = {
            let snapshot = self.snapshots.borrow();
            let status = self.shared.turn_status();
            self.variant.on_card_click(&snapshot.board, status.as_deref(), card)?
        };
        if !self.shared.take_playing() {
            return None;
        }
        self.channel.send(out.clone());
        Some(out)
    }

    /// Clicks the first card on the board showing `card`'s face.
    pub fn click_card(&self, card: &Card) -> Option<Outbound> {
        let filter = CardFilter::from_card(card);
        let candidates: Vec<CardId> = self
            .snapshots
            .borrow()
            .board
            .cards()
            .filter(|c| filter.matches(c.attrs()))
            .map(|c| c.id())
            .collect();
        candidates.into_iter().find_map(|id| self.click(id))
    }

    /// Updates the name used to join; tells the server once seated.
    pub fn rename(&self, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() {
            return false;
        }
        self.shared.set_name(name);
        self.seated()
            && self.channel.send(Outbound::Name {
                name: name.to_string(),
            })
    }

    pub fn rematch(&self) -> bool {
        self.seated() && self.channel.send(Outbound::Rematch)
    }
}
