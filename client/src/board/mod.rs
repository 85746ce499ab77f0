//! Indexed store of everything on the table.
//!
//! Two maps make up the board: card id → (group, attributes, slot) and
//! bound deck key → pile state. Fields have no state of their own beyond the
//! cards located in them. Renderers read the store; only command handlers
//! write to it.

pub mod attrs;
pub mod deck;
pub mod field;
pub mod finalize;
pub mod group;

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

pub use attrs::{AttrPatch, Attributes, CardFilter};
pub use deck::{Deck, DeckSetup};
pub use field::Field;
pub use finalize::FinalizeAction;
pub use group::{CardGroup, GroupKey, GroupRef};

use crate::error::BoardError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct CardId(u64);

impl CardId {
    #[cfg(test)]
    pub(crate) fn new(raw: u64) -> Self {
        CardId(raw)
    }
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Position of a card inside its field: `ordinal` in `0..size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Slot {
    pub ordinal: usize,
    pub size: usize,
}

#[derive(Debug, Clone)]
pub struct CardEntity {
    id: CardId,
    /// `None` only while a move is handing the card over.
    location: Option<GroupKey>,
    attrs: Attributes,
    slot: Option<Slot>,
    arrival: u64,
}

impl CardEntity {
    pub fn id(&self) -> CardId {
        self.id
    }

    pub fn location(&self) -> Option<&GroupKey> {
        self.location.as_ref()
    }

    pub fn attrs(&self) -> &Attributes {
        &self.attrs
    }

    pub fn slot(&self) -> Option<Slot> {
        self.slot
    }

    pub fn is_in(&self, key: &GroupKey) -> bool {
        self.location.as_ref() == Some(key)
    }
}

/// A pile: only a count and how its top card looks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeckState {
    count: u32,
    cap: Option<u32>,
    back: Option<String>,
    anchor: Option<String>,
}

impl DeckState {
    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn back(&self) -> Option<&str> {
        self.back.as_deref()
    }

    pub fn anchor(&self) -> Option<&str> {
        self.anchor.as_deref()
    }

    pub(crate) fn set_count(&mut self, value: u32) {
        self.count = match self.cap {
            Some(cap) => value.min(cap),
            None => value,
        };
    }

    pub(crate) fn add_count(&mut self, delta: i64) -> Result<(), BoardError> {
        let value = i64::from(self.count) + delta;
        let value = u32::try_from(value).map_err(|_| BoardError::CountUnderflow {
            count: self.count,
            delta,
        })?;
        self.set_count(value);
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct Board {
    next_card: u64,
    next_arrival: u64,
    cards: BTreeMap<CardId, CardEntity>,
    decks: BTreeMap<GroupKey, DeckState>,
}

impl Board {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops every card and pile. Ids keep increasing so stale ids from a
    /// previous game never alias new cards.
    pub fn clear(&mut self) {
        self.cards.clear();
        self.decks.clear();
    }

    pub fn card(&self, id: CardId) -> Option<&CardEntity> {
        self.cards.get(&id)
    }

    pub fn cards(&self) -> impl Iterator<Item = &CardEntity> {
        self.cards.values()
    }

    pub fn cards_in<'a>(&'a self, key: &'a GroupKey) -> impl Iterator<Item = &'a CardEntity> + 'a {
        self.cards.values().filter(move |c| c.is_in(key))
    }

    pub fn deck(&self, key: &GroupKey) -> Option<&DeckState> {
        self.decks.get(key)
    }

    pub fn decks(&self) -> impl Iterator<Item = (&GroupKey, &DeckState)> {
        self.decks.iter()
    }

    /// Every non-deck group that currently holds at least one card.
    pub fn occupied_fields(&self) -> BTreeSet<GroupKey> {
        self.cards
            .values()
            .filter_map(|c| c.location.clone())
            .filter(|key| !self.decks.contains_key(key))
            .collect()
    }

    /// Applies a patch to a resident card, e.g. marking it active.
    pub fn patch_card(&mut self, id: CardId, patch: &AttrPatch) -> Result<(), BoardError> {
        self.card_mut(id)?.attrs.apply(patch);
        Ok(())
    }

    pub fn toggle_flag(&mut self, id: CardId, flag: &str) -> Result<(), BoardError> {
        self.card_mut(id)?.attrs.toggle(flag);
        Ok(())
    }

    pub(crate) fn card_mut(&mut self, id: CardId) -> Result<&mut CardEntity, BoardError> {
        self.cards.get_mut(&id).ok_or(BoardError::UnknownCard(id))
    }

    pub(crate) fn deck_mut(&mut self, key: &GroupKey) -> Result<&mut DeckState, BoardError> {
        self.decks
            .get_mut(key)
            .ok_or_else(|| BoardError::DeckNotInstantiated(key.to_string()))
    }

    pub(crate) fn insert_deck(&mut self, key: GroupKey, state: DeckState) {
        self.decks.insert(key, state);
    }

    pub(crate) fn spawn_card(&mut self, attrs: Attributes) -> CardId {
        let id = CardId(self.next_card);
        self.next_card += 1;
        self.cards.insert(
            id,
            CardEntity {
                id,
                location: None,
                attrs,
                slot: None,
                arrival: 0,
            },
        );
        id
    }

    pub(crate) fn remove_card(&mut self, id: CardId) -> Option<CardEntity> {
        self.cards.remove(&id)
    }

    /// Puts a card in a group, stamping its arrival order.
    pub(crate) fn place(&mut self, id: CardId, key: GroupKey) -> Result<(), BoardError> {
        let arrival = self.next_arrival;
        self.next_arrival += 1;
        let card = self.card_mut(id)?;
        card.location = Some(key);
        card.arrival = arrival;
        Ok(())
    }

    /// Takes a card out of its group so it can be handed to another one.
    pub(crate) fn detach(&mut self, id: CardId) -> Result<(), BoardError> {
        let card = self.card_mut(id)?;
        card.location = None;
        card.slot = None;
        card.attrs.clear_prefix(attrs::FIELD_PREFIX);
        Ok(())
    }

    /// Rewrites `0..n` ordinals for the residents of `key`: cards that already
    /// had a slot keep their relative order, newcomers follow in arrival order.
    pub(crate) fn renumber(&mut self, key: &GroupKey) {
        let mut residents: Vec<(bool, usize, u64, CardId)> = self
            .cards_in(key)
            .map(|c| {
                (
                    c.slot.is_none(),
                    c.slot.map_or(0, |s| s.ordinal),
                    c.arrival,
                    c.id,
                )
            })
            .collect();
        residents.sort();
        let size = residents.len();
        for (ordinal, (.., id)) in residents.into_iter().enumerate() {
            if let Some(card) = self.cards.get_mut(&id) {
                card.slot = Some(Slot { ordinal, size });
            }
        }
    }
}
