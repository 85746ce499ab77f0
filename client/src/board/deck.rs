use super::attrs::{AttrPatch, Attributes, STARTING_PREFIX};
use super::finalize::FinalizeAction;
use super::group::{CardGroup, GroupKey, GroupRef};
use super::{Board, CardId, DeckState};
use crate::error::BoardError;

/// How a pile looks when it is put on the table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeckSetup {
    pub count: u32,
    /// Table corner the pile is drawn in (`br`, `tr`, ...).
    pub anchor: Option<String>,
    pub back: Option<String>,
}

/// An opaque pile. Cards drawn from it are created on the fly; cards sent to
/// it disappear into its count once their transition settles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deck {
    group: GroupRef,
    cap: Option<u32>,
}

impl Deck {
    pub fn new<I, S>(name: impl Into<String>, sub_fields: I, cap: Option<u32>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Deck {
            group: GroupRef::new(name, sub_fields),
            cap,
        }
    }

    /// Puts the pile on the table, replacing any previous one at this key.
    pub fn instantiate(&self, board: &mut Board, setup: DeckSetup) -> Result<(), BoardError> {
        let mut state = DeckState {
            count: 0,
            cap: self.cap,
            back: setup.back,
            anchor: setup.anchor,
        };
        state.set_count(setup.count);
        board.insert_deck(self.key()?, state);
        Ok(())
    }

    pub fn state<'b>(&self, board: &'b Board) -> Result<&'b DeckState, BoardError> {
        let key = self.key()?;
        board
            .deck(&key)
            .ok_or_else(|| BoardError::DeckNotInstantiated(key.to_string()))
    }

    pub fn count(&self, board: &Board) -> Result<u32, BoardError> {
        self.state(board).map(DeckState::count)
    }

    pub fn set_count(&self, board: &mut Board, value: u32) -> Result<(), BoardError> {
        board.deck_mut(&self.key()?)?.set_count(value);
        Ok(())
    }

    pub fn add_count(&self, board: &mut Board, delta: i64) -> Result<(), BoardError> {
        board.deck_mut(&self.key()?)?.add_count(delta)
    }

    pub fn set_back(&self, board: &mut Board, back: impl Into<String>) -> Result<(), BoardError> {
        board.deck_mut(&self.key()?)?.back = Some(back.into());
        Ok(())
    }

    /// Draws one card into `dest`.
    ///
    /// The new card is tagged with `starting-*` attributes naming this pile
    /// so it can be animated out of it; the pile shrinks immediately. The
    /// returned action finalizes the destination and clears those tags.
    pub fn move_to(
        &self,
        board: &mut Board,
        dest: &dyn CardGroup,
        patch: &AttrPatch,
    ) -> Result<FinalizeAction, BoardError> {
        let key = self.key()?;
        dest.ready(board)?;
        if self.count(board)? == 0 {
            return Err(BoardError::EmptyDeck(key.to_string()));
        }

        let mut attrs = Attributes::default();
        attrs.set(format!("{STARTING_PREFIX}position"), key.name());
        for (field, value) in key.params() {
            attrs.set(format!("{STARTING_PREFIX}{field}"), value);
        }
        let card = board.spawn_card(attrs);
        board.deck_mut(&key)?.add_count(-1)?;

        let mut finalize = match dest.receive_card(board, card, patch) {
            Ok(action) => action.unwrap_or_default(),
            Err(e) => {
                board.remove_card(card);
                board.deck_mut(&key)?.add_count(1)?;
                return Err(e);
            }
        };
        finalize.push_clear_prefix(card, STARTING_PREFIX);
        finalize.push_moved(card);
        Ok(finalize)
    }
}

impl CardGroup for Deck {
    fn group(&self) -> &GroupRef {
        &self.group
    }

    fn with_group(&self, group: GroupRef) -> Self {
        Deck {
            group,
            cap: self.cap,
        }
    }

    fn ready(&self, board: &Board) -> Result<GroupKey, BoardError> {
        let key = self.key()?;
        if board.deck(&key).is_none() {
            return Err(BoardError::DeckNotInstantiated(key.to_string()));
        }
        Ok(key)
    }

    fn receive_card(
        &self,
        board: &mut Board,
        card: CardId,
        patch: &AttrPatch,
    ) -> Result<Option<FinalizeAction>, BoardError> {
        let key = self.ready(board)?;
        board.card_mut(card)?.attrs.apply(patch);
        board.place(card, key.clone())?;
        Ok(Some(FinalizeAction::discard(card, key)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{Field, Slot};

    fn setup(count: u32) -> (Board, Deck, Field) {
        let mut board = Board::new();
        let deck = Deck::new("deck", Vec::<String>::new(), None);
        deck.instantiate(
            &mut board,
            DeckSetup {
                count,
                anchor: Some("br".into()),
                back: None,
            },
        )
        .unwrap();
        (board, deck, Field::new("hand", ["player"], 3))
    }

    #[test]
    fn draw_shrinks_pile_and_lands_face_down() {
        let (mut board, deck, hand) = setup(40);
        let mine = hand.select("player", "self");

        let finalize = deck.move_to(&mut board, &mine, &AttrPatch::new()).unwrap();
        assert_eq!(deck.count(&board).unwrap(), 39);

        let card = finalize.moved()[0];
        let entity = board.card(card).unwrap();
        assert_eq!(entity.attrs().get("starting-position"), Some("deck"));
        assert_eq!(entity.attrs().card(), None);
        assert_eq!(entity.slot(), Some(Slot { ordinal: 0, size: 1 }));

        finalize.run(&mut board);
        assert!(!board.card(card).unwrap().attrs().contains("starting-position"));
        assert_eq!(deck.count(&board).unwrap(), 39);
    }

    #[test]
    fn drawing_from_an_empty_pile_fails_cleanly() {
        let (mut board, deck, hand) = setup(0);
        let err = deck
            .move_to(&mut board, &hand.select("player", "self"), &AttrPatch::new())
            .unwrap_err();
        assert!(matches!(err, BoardError::EmptyDeck(_)));
        assert_eq!(board.cards().count(), 0);
    }

    #[test]
    fn unbound_destination_leaves_board_untouched() {
        let (mut board, deck, hand) = setup(3);
        let err = deck.move_to(&mut board, &hand, &AttrPatch::new()).unwrap_err();
        assert!(matches!(err, BoardError::UnboundSelection { .. }));
        assert_eq!(deck.count(&board).unwrap(), 3);
        assert_eq!(board.cards().count(), 0);
    }

    #[test]
    fn received_card_counts_only_after_finalize() {
        let (mut board, deck, hand) = setup(1);
        let mine = hand.select("player", "self");
        deck.move_to(&mut board, &mine, &AttrPatch::new()).unwrap().run(&mut board);
        assert_eq!(deck.count(&board).unwrap(), 0);

        let finalize = mine
            .move_to(&mut board, &crate::board::CardFilter::any(), &deck, &AttrPatch::new(), None)
            .unwrap();
        assert_eq!(deck.count(&board).unwrap(), 0);
        assert_eq!(board.cards().count(), 1);

        finalize.run(&mut board);
        assert_eq!(deck.count(&board).unwrap(), 1);
        assert_eq!(board.cards().count(), 0);
    }
}
