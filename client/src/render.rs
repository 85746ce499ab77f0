//! Plain projections of a snapshot for terminals and JSON dumps.

use serde::Serialize;
use std::fmt;

use crate::board::attrs::{BACK, RANK, STARTING_PREFIX, SUIT};
use crate::board::{Board, CardEntity, CardId};
use crate::notifications::Notification;
use crate::session::{Results, Snapshot};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardView {
    pub id: CardId,
    /// `suit:rank`, or `None` while face down.
    pub face: Option<String>,
    pub back: Option<String>,
    pub ordinal: Option<usize>,
    /// Flags and tags other than the face, e.g. `selected`.
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeckView {
    pub group: String,
    pub count: u32,
    pub anchor: Option<String>,
    pub back: Option<String>,
    /// Cards on their way into the pile.
    pub incoming: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldView {
    pub group: String,
    pub cards: Vec<CardView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoardView {
    pub decks: Vec<DeckView>,
    pub fields: Vec<FieldView>,
}

impl CardView {
    fn new(card: &CardEntity) -> Self {
        let attrs = card.attrs();
        let face = match (attrs.get(SUIT), attrs.get(RANK)) {
            (Some(suit), Some(rank)) => Some(format!("{suit}:{rank}")),
            _ => None,
        };
        let tags = attrs
            .iter()
            .filter(|(k, _)| ![SUIT, RANK, BACK].contains(k) && !k.starts_with(STARTING_PREFIX))
            .map(|(k, v)| if v.is_empty() { k.to_string() } else { format!("{k}={v}") })
            .collect();
        CardView {
            id: card.id(),
            face,
            back: attrs.get(BACK).map(str::to_string),
            ordinal: card.slot().map(|s| s.ordinal),
            tags,
        }
    }
}

impl BoardView {
    pub fn project(board: &Board) -> Self {
        let decks = board
            .decks()
            .map(|(key, state)| DeckView {
                group: key.to_string(),
                count: state.count(),
                anchor: state.anchor().map(str::to_string),
                back: state.back().map(str::to_string),
                incoming: board.cards_in(key).count(),
            })
            .collect();

        let fields = board
            .occupied_fields()
            .into_iter()
            .map(|key| {
                let mut cards: Vec<_> = board.cards_in(&key).collect();
                cards.sort_by_key(|c| (c.slot().is_none(), c.slot().map_or(0, |s| s.ordinal), c.id()));
                FieldView {
                    group: key.to_string(),
                    cards: cards.into_iter().map(CardView::new).collect(),
                }
            })
            .collect();

        BoardView { decks, fields }
    }
}

impl fmt::Display for CardView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.face {
            Some(face) => write!(f, "{face}")?,
            None => write!(f, "[{}]", self.back.as_deref().unwrap_or("??"))?,
        }
        if !self.tags.is_empty() {
            write!(f, "({})", self.tags.join(","))?;
        }
        Ok(())
    }
}

impl fmt::Display for BoardView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for deck in &self.decks {
            write!(f, "{:<24} {:>2} cards", deck.group, deck.count)?;
            if let Some(back) = &deck.back {
                write!(f, " back={back}")?;
            }
            if deck.incoming > 0 {
                write!(f, " (+{} incoming)", deck.incoming)?;
            }
            writeln!(f)?;
        }
        for field in &self.fields {
            let cards: Vec<String> = field.cards.iter().map(|c| c.to_string()).collect();
            writeln!(f, "{:<24} {}", field.group, cards.join(" "))?;
        }
        Ok(())
    }
}

/// Everything a status screen shows.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub game: &'static str,
    pub game_id: String,
    pub player_id: Option<i64>,
    pub players: Vec<String>,
    pub started: bool,
    pub playing: bool,
    pub turn_status: Option<String>,
    pub rematch_requested: bool,
    pub results: Results,
    pub notifications: Vec<Notification>,
    pub board: BoardView,
}

impl SessionView {
    pub fn new(
        snapshot: &Snapshot,
        playing: bool,
        turn_status: Option<String>,
        notifications: Vec<Notification>,
    ) -> Self {
        SessionView {
            game: snapshot.variant,
            game_id: snapshot.game_id.clone(),
            player_id: snapshot.player_id,
            players: snapshot.players.clone(),
            started: snapshot.started,
            playing,
            turn_status,
            rematch_requested: snapshot.rematch_requested,
            results: snapshot.results.clone(),
            notifications,
            board: BoardView::project(&snapshot.board),
        }
    }
}

impl fmt::Display for SessionView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "== {}", self.game)?;
        if !self.game_id.is_empty() {
            write!(f, " #{}", self.game_id)?;
        }
        writeln!(f, " ==")?;
        if !self.players.is_empty() {
            let seat = self.player_id.unwrap_or(-1);
            let names: Vec<String> = self
                .players
                .iter()
                .enumerate()
                .map(|(i, name)| if i as i64 == seat { format!("{name} (you)") } else { name.clone() })
                .collect();
            writeln!(f, "players: {}", names.join(", "))?;
        }
        write!(f, "{}", self.board)?;
        if self.playing {
            match &self.turn_status {
                Some(status) => writeln!(f, "-- your turn ({status}) --")?,
                None => writeln!(f, "-- your turn --")?,
            }
        }
        if self.results.shown {
            writeln!(f, "results:")?;
            for row in &self.results.rows {
                let marker = if row.is_self { "*" } else { " " };
                let points = row.points.map_or_else(|| "-".to_string(), |p| p.to_string());
                writeln!(f, " {marker} {:<20} {points:>3}", row.name)?;
            }
            for detail in &self.results.details {
                let values: Vec<String> = detail
                    .values
                    .iter()
                    .map(|v| {
                        let mut s = v.value.to_string();
                        if let Some(cards) = &v.cards {
                            s.push_str(&format!(" ({cards})"));
                        }
                        if v.winner {
                            s.push('!');
                        }
                        s
                    })
                    .collect();
                writeln!(f, "   {:<11} {}", detail.kind, values.join(" / "))?;
            }
            if self.rematch_requested {
                writeln!(f, "rematch requested")?;
            }
        }
        for note in &self.notifications {
            writeln!(f, "! {}", note.message)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{AttrPatch, CardGroup, Deck, DeckSetup, Field};
    use carte_protocol::Card;

    #[test]
    fn projects_piles_and_fields_in_slot_order() {
        let mut board = Board::new();
        let deck = Deck::new("deck", Vec::<String>::new(), None);
        deck.instantiate(
            &mut board,
            DeckSetup {
                count: 40,
                anchor: Some("br".into()),
                back: Some("blu".into()),
            },
        )
        .unwrap();
        let hand = Field::new("hand", ["player"], 3).select("player", "self");
        for token in ["coppe:1", "spade:re"] {
            let patch = AttrPatch::from_card(&Card::decode(token).unwrap());
            deck.move_to(&mut board, &hand, &patch).unwrap().run(&mut board);
        }
        let opponent = Field::new("hand", ["player"], 3).select("player", "opponent");
        let pending = deck.move_to(&mut board, &opponent, &AttrPatch::new()).unwrap();

        let view = BoardView::project(&board);
        assert_eq!(view.decks[0].count, 37);
        assert_eq!(view.fields.len(), 2);
        let mine = view.fields.iter().find(|f| f.group == "hand[player=self]").unwrap();
        let faces: Vec<_> = mine.cards.iter().map(|c| c.to_string()).collect();
        assert_eq!(faces, ["coppe:1", "spade:re"]);

        let theirs = view.fields.iter().find(|f| f.group == "hand[player=opponent]").unwrap();
        // starting tags are hidden while the draw is in flight
        assert_eq!(theirs.cards[0].to_string(), "[??]");
        pending.run(&mut board);

        let text = BoardView::project(&board).to_string();
        assert!(text.contains("deck"));
        assert!(text.contains("37 cards back=blu"));
    }
}
