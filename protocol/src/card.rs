use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::wire::DELIMITER;

/// Separator between the components of a card token.
pub const CARD_SEPARATOR: char = ':';

/// ---- Cards ----
///
/// A card as the authority describes it. A face-down card only knows the
/// style of its back; a face-up card knows its suit and rank and may remember
/// the back style of the pile it came from.
///
/// Suits and ranks are kept as opaque strings: Italian decks
/// (`bastoni`, `fante`, ...) and French decks (`cuori`, `donna`, ...) share
/// the same client.
///
/// Only the checked constructors build one, so every card survives an
/// encode/decode round trip.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Card(Token);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Token {
    Back(String),
    Face {
        suit: String,
        rank: String,
        back: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MalformedCardError {
    #[error("card token {token:?} has {segments} segments, expected 1 to 3")]
    Arity { token: String, segments: usize },
    #[error("card token {0:?} has an empty component")]
    EmptyComponent(String),
    #[error("card component {0:?} contains a reserved character")]
    ReservedCharacter(String),
}

fn check_component(value: &str) -> Result<(), MalformedCardError> {
    if value.is_empty() {
        return Err(MalformedCardError::EmptyComponent(value.to_string()));
    }
    if value.contains(CARD_SEPARATOR) || value.contains(DELIMITER) {
        return Err(MalformedCardError::ReservedCharacter(value.to_string()));
    }
    Ok(())
}

impl Card {
    pub fn face(suit: impl Into<String>, rank: impl Into<String>) -> Result<Self, MalformedCardError> {
        let (suit, rank) = (suit.into(), rank.into());
        check_component(&suit)?;
        check_component(&rank)?;
        Ok(Card(Token::Face {
            suit,
            rank,
            back: None,
        }))
    }

    pub fn back(style: impl Into<String>) -> Result<Self, MalformedCardError> {
        let style = style.into();
        check_component(&style)?;
        Ok(Card(Token::Back(style)))
    }

    /// Marks a face-up card with the back style of its origin pile.
    /// Face-down cards are replaced by a face-down card of the new style.
    pub fn with_back(self, style: impl Into<String>) -> Result<Self, MalformedCardError> {
        let style = style.into();
        check_component(&style)?;
        Ok(Card(match self.0 {
            Token::Back(_) => Token::Back(style),
            Token::Face { suit, rank, .. } => Token::Face {
                suit,
                rank,
                back: Some(style),
            },
        }))
    }

    pub fn suit(&self) -> Option<&str> {
        match &self.0 {
            Token::Face { suit, .. } => Some(suit),
            Token::Back(_) => None,
        }
    }

    pub fn rank(&self) -> Option<&str> {
        match &self.0 {
            Token::Face { rank, .. } => Some(rank),
            Token::Back(_) => None,
        }
    }

    pub fn back_style(&self) -> Option<&str> {
        match &self.0 {
            Token::Back(style) => Some(style),
            Token::Face { back, .. } => back.as_deref(),
        }
    }

    pub fn encode(&self) -> String {
        match &self.0 {
            Token::Back(style) => style.clone(),
            Token::Face {
                suit,
                rank,
                back: None,
            } => format!("{suit}{CARD_SEPARATOR}{rank}"),
            Token::Face {
                suit,
                rank,
                back: Some(back),
            } => format!("{suit}{CARD_SEPARATOR}{rank}{CARD_SEPARATOR}{back}"),
        }
    }

    pub fn decode(token: &str) -> Result<Self, MalformedCardError> {
        let parts: Vec<&str> = token.split(CARD_SEPARATOR).collect();
        if parts.iter().any(|p| p.is_empty()) {
            return Err(MalformedCardError::EmptyComponent(token.to_string()));
        }
        match parts.as_slice() {
            [back] => Card::back(*back),
            [suit, rank] => Card::face(*suit, *rank),
            [suit, rank, back] => Card::face(*suit, *rank)?.with_back(*back),
            _ => Err(MalformedCardError::Arity {
                token: token.to_string(),
                segments: parts.len(),
            }),
        }
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl FromStr for Card {
    type Err = MalformedCardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Card::decode(s)
    }
}

impl TryFrom<String> for Card {
    type Error = MalformedCardError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Card::decode(&value)
    }
}

impl From<Card> for String {
    fn from(card: Card) -> Self {
        card.encode()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn encodes_face_and_back_cards() {
        let card = Card::face("bastoni", "fante").unwrap();
        assert_eq!(card.encode(), "bastoni:fante");

        let card = card.with_back("blu").unwrap();
        assert_eq!(card.encode(), "bastoni:fante:blu");

        assert_eq!(Card::back("rosso").unwrap().encode(), "rosso");
    }

    #[test]
    fn decodes_every_arity() {
        assert_eq!(Card::decode("rosso").unwrap(), Card::back("rosso").unwrap());
        assert_eq!(Card::decode("coppe:7").unwrap(), Card::face("coppe", "7").unwrap());
        let card = Card::decode("cuori:donna:blu").unwrap();
        assert_eq!(card.suit(), Some("cuori"));
        assert_eq!(card.rank(), Some("donna"));
        assert_eq!(card.back_style(), Some("blu"));
    }

    #[test]
    fn rejects_malformed_tokens() {
        assert!(matches!(
            Card::decode("a:b:c:d"),
            Err(MalformedCardError::Arity { segments: 4, .. })
        ));
        assert!(matches!(Card::decode(""), Err(MalformedCardError::EmptyComponent(_))));
        assert!(matches!(Card::decode("coppe:"), Err(MalformedCardError::EmptyComponent(_))));
        assert!(matches!(
            Card::face("co|ppe", "1"),
            Err(MalformedCardError::ReservedCharacter(_))
        ));
        // a back style must stay a single segment
        assert!(matches!(Card::back("a:b"), Err(MalformedCardError::ReservedCharacter(_))));
        assert!(matches!(
            Card::face("coppe", "1").unwrap().with_back("x:y"),
            Err(MalformedCardError::ReservedCharacter(_))
        ));
    }

    #[test]
    fn serializes_as_token() {
        let card = Card::face("denari", "re").unwrap();
        let json = serde_json::to_string(&card).unwrap();
        assert_eq!(json, "\"denari:re\"");
        let back: Card = serde_json::from_str(&json).unwrap();
        assert_eq!(back, card);
        assert!(serde_json::from_str::<Card>("\"a:b:c:d\"").is_err());
    }

    fn component() -> impl Strategy<Value = String> {
        "[a-z0-9]{1,8}"
    }

    fn any_card() -> impl Strategy<Value = Card> {
        prop_oneof![
            component().prop_map(|style| Card::back(style).unwrap()),
            (component(), component(), proptest::option::of(component())).prop_map(
                |(suit, rank, back)| {
                    let card = Card::face(suit, rank).unwrap();
                    match back {
                        Some(back) => card.with_back(back).unwrap(),
                        None => card,
                    }
                }
            ),
        ]
    }

    proptest! {
        #[test]
        fn decode_inverts_encode(card in any_card()) {
            prop_assert_eq!(Card::decode(&card.encode()).unwrap(), card);
        }
    }
}
