use serde::Serialize;
use std::collections::BTreeMap;

use carte_protocol::Card;

pub const SUIT: &str = "suit";
pub const RANK: &str = "rank";
pub const BACK: &str = "back";

/// Tags describing where a drawn card came from; cleared once it lands.
pub const STARTING_PREFIX: &str = "starting-";
/// Tags owned by the field a card sits in; cleared when it leaves.
pub const FIELD_PREFIX: &str = "field-";

/// Visible attributes of a card on the board, keyed like `data-*` tags:
/// `suit`, `rank`, `back`, flags such as `selected` (empty value) and
/// prefixed tags such as `field-player`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Attributes(BTreeMap<String, String>);

impl Attributes {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.0.remove(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn apply(&mut self, patch: &AttrPatch) {
        for (key, value) in &patch.0 {
            match value {
                Some(value) => {
                    self.0.insert(key.clone(), value.clone());
                }
                None => {
                    self.0.remove(key);
                }
            }
        }
    }

    /// Adds a flag when absent, removes it when present.
    pub fn toggle(&mut self, flag: &str) {
        if self.0.remove(flag).is_none() {
            self.0.insert(flag.to_string(), String::new());
        }
    }

    pub fn clear_prefix(&mut self, prefix: &str) {
        self.0.retain(|key, _| !key.starts_with(prefix));
    }

    /// The card these attributes show, if any face or back is known.
    pub fn card(&self) -> Option<Card> {
        match (self.get(SUIT), self.get(RANK), self.get(BACK)) {
            (Some(suit), Some(rank), back) => {
                let card = Card::face(suit, rank).ok()?;
                match back.filter(|b| !b.is_empty()) {
                    Some(back) => card.with_back(back).ok(),
                    None => Some(card),
                }
            }
            (_, _, Some(back)) if !back.is_empty() => Card::back(back).ok(),
            _ => None,
        }
    }
}

/// A set of attribute writes; `None` deletes the key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttrPatch(BTreeMap<String, Option<String>>);

impl AttrPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), Some(value.into()));
        self
    }

    pub fn flag(self, key: impl Into<String>) -> Self {
        self.set(key, "")
    }

    pub fn unset(mut self, key: impl Into<String>) -> Self {
        self.0.insert(key.into(), None);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Option<String>) {
        self.0.insert(key.into(), value);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Writes the card's suit, rank and back.
    pub fn from_card(card: &Card) -> Self {
        let mut patch = AttrPatch::new();
        if let Some(suit) = card.suit() {
            patch.insert(SUIT, Some(suit.to_string()));
        }
        if let Some(rank) = card.rank() {
            patch.insert(RANK, Some(rank.to_string()));
        }
        if let Some(back) = card.back_style() {
            patch.insert(BACK, Some(back.to_string()));
        }
        patch
    }

    /// Hides the face of a card.
    pub fn face_down() -> Self {
        AttrPatch::new().unset(SUIT).unset(RANK)
    }

    pub fn merged(mut self, other: &AttrPatch) -> Self {
        for (key, value) in &other.0 {
            self.0.insert(key.clone(), value.clone());
        }
        self
    }
}

/// Attribute equality constraints used to pick resident cards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardFilter(BTreeMap<String, String>);

impl CardFilter {
    pub fn any() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn flag(self, key: impl Into<String>) -> Self {
        self.with(key, "")
    }

    pub fn from_card(card: &Card) -> Self {
        let mut filter = CardFilter::any();
        if let Some(suit) = card.suit() {
            filter = filter.with(SUIT, suit);
        }
        if let Some(rank) = card.rank() {
            filter = filter.with(RANK, rank);
        }
        if let Some(back) = card.back_style() {
            filter = filter.with(BACK, back);
        }
        filter
    }

    pub fn matches(&self, attrs: &Attributes) -> bool {
        self.0.iter().all(|(k, v)| attrs.get(k) == Some(v.as_str()))
    }
}
