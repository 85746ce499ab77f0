use super::attrs::{AttrPatch, CardFilter};
use super::finalize::FinalizeAction;
use super::group::{CardGroup, GroupRef};
use super::{Board, CardId};
use crate::error::BoardError;

/// An ordered row of visible cards (a hand, the table, a scopa pile).
///
/// Every resident card carries a [`Slot`](super::Slot); the slots are
/// rewritten after each change so ordinals stay contiguous.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    group: GroupRef,
    max_size: usize,
}

impl Field {
    pub fn new<I, S>(name: impl Into<String>, sub_fields: I, max_size: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Field {
            group: GroupRef::new(name, sub_fields),
            max_size,
        }
    }

    /// Layout hint only; a field may briefly hold more.
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Matching residents in slot order, at most `count` of them.
    pub fn cards(
        &self,
        board: &Board,
        filter: &CardFilter,
        count: Option<usize>,
    ) -> Result<Vec<CardId>, BoardError> {
        let key = self.key()?;
        let mut residents: Vec<_> = board
            .cards_in(&key)
            .filter(|c| filter.matches(c.attrs()))
            .map(|c| (c.slot().is_none(), c.slot().map_or(0, |s| s.ordinal), c.arrival, c.id()))
            .collect();
        residents.sort();
        Ok(residents
            .into_iter()
            .map(|(.., id)| id)
            .take(count.unwrap_or(usize::MAX))
            .collect())
    }

    pub fn count(&self, board: &Board) -> Result<usize, BoardError> {
        let key = self.key()?;
        Ok(board.cards_in(&key).count())
    }

    /// Hands up to `count` matching cards (all when `None`) to `dest`.
    ///
    /// Field tags are stripped, this field is renumbered, then each card is
    /// received by `dest` with `patch`. The finalize actions of every
    /// destination are merged into the returned one. A destination that
    /// cannot take cards fails the move before any card leaves.
    pub fn move_to(
        &self,
        board: &mut Board,
        filter: &CardFilter,
        dest: &dyn CardGroup,
        patch: &AttrPatch,
        count: Option<usize>,
    ) -> Result<FinalizeAction, BoardError> {
        let key = self.key()?;
        dest.ready(board)?;
        let cards = self.cards(board, filter, count)?;

        for &card in &cards {
            board.detach(card)?;
        }
        board.renumber(&key);

        let mut finalize = FinalizeAction::none();
        for card in cards {
            if let Some(action) = dest.receive_card(board, card, patch)? {
                finalize.merge(action);
            }
            finalize.push_moved(card);
        }
        Ok(finalize)
    }
}

impl CardGroup for Field {
    fn group(&self) -> &GroupRef {
        &self.group
    }

    fn with_group(&self, group: GroupRef) -> Self {
        Field {
            group,
            max_size: self.max_size,
        }
    }

    fn receive_card(
        &self,
        board: &mut Board,
        card: CardId,
        patch: &AttrPatch,
    ) -> Result<Option<FinalizeAction>, BoardError> {
        let key = self.key()?;
        board.card_mut(card)?.attrs.apply(patch);
        board.place(card, key.clone())?;
        board.renumber(&key);
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::attrs::FIELD_PREFIX;
    use crate::board::{Deck, DeckSetup, Slot};
    use carte_protocol::Card;

    fn assert_contiguous(board: &Board, field: &Field) {
        let cards = field.cards(board, &CardFilter::any(), None).unwrap();
        for (i, id) in cards.iter().enumerate() {
            assert_eq!(
                board.card(*id).unwrap().slot(),
                Some(Slot {
                    ordinal: i,
                    size: cards.len()
                })
            );
        }
    }

    fn dealt_board() -> (Board, Deck, Field, Field) {
        let mut board = Board::new();
        let deck = Deck::new("deck", Vec::<String>::new(), None);
        deck.instantiate(
            &mut board,
            DeckSetup {
                count: 40,
                ..DeckSetup::default()
            },
        )
        .unwrap();
        let hand = Field::new("hand", ["player"], 3).select("player", "self");
        for card in ["coppe:1", "spade:re", "denari:7"] {
            let patch = AttrPatch::from_card(&Card::decode(card).unwrap());
            deck.move_to(&mut board, &hand, &patch).unwrap().run(&mut board);
        }
        (board, deck, hand, Field::new("playing-area", Vec::<String>::new(), 2))
    }

    #[test]
    fn moves_selected_card_and_renumbers_both_sides() {
        let (mut board, _deck, hand, area) = dealt_board();
        assert_contiguous(&board, &hand);

        let played = Card::decode("spade:re").unwrap();
        let finalize = hand
            .move_to(
                &mut board,
                &CardFilter::from_card(&played),
                &area,
                &AttrPatch::new().set("field-player", "self"),
                Some(1),
            )
            .unwrap();
        assert!(finalize.is_empty());
        assert_eq!(finalize.moved().len(), 1);

        assert_eq!(hand.count(&board).unwrap(), 2);
        assert_eq!(area.count(&board).unwrap(), 1);
        assert_contiguous(&board, &hand);
        assert_contiguous(&board, &area);

        let hand_faces: Vec<_> = hand
            .cards(&board, &CardFilter::any(), None)
            .unwrap()
            .into_iter()
            .map(|id| board.card(id).unwrap().attrs().card().unwrap().encode())
            .collect();
        assert_eq!(hand_faces, vec!["coppe:1", "denari:7"]);
    }

    #[test]
    fn moving_out_strips_field_tags() {
        let (mut board, _deck, hand, area) = dealt_board();
        let finalize = hand
            .move_to(
                &mut board,
                &CardFilter::any(),
                &area,
                &AttrPatch::new().set("field-player", "self"),
                Some(1),
            )
            .unwrap();
        let card = finalize.moved()[0];
        assert_eq!(board.card(card).unwrap().attrs().get("field-player"), Some("self"));

        let back_home = area
            .move_to(&mut board, &CardFilter::any(), &hand, &AttrPatch::new(), None)
            .unwrap();
        assert_eq!(back_home.moved(), &[card]);
        let attrs = board.card(card).unwrap().attrs();
        assert!(attrs.iter().all(|(k, _)| !k.starts_with(FIELD_PREFIX)));
        assert_eq!(area.count(&board).unwrap(), 0);
        assert_contiguous(&board, &hand);
        // the returning card was last to arrive
        let last = hand.cards(&board, &CardFilter::any(), None).unwrap();
        assert_eq!(last.last(), Some(&card));
    }

    #[test]
    fn count_limits_selection_and_empty_filter_moves_all() {
        let (mut board, deck, hand, _area) = dealt_board();
        let finalize = hand
            .move_to(&mut board, &CardFilter::any(), &deck, &AttrPatch::new(), Some(2))
            .unwrap();
        assert_eq!(finalize.moved().len(), 2);
        assert_eq!(hand.count(&board).unwrap(), 1);
        assert_contiguous(&board, &hand);

        finalize.run(&mut board);
        assert_eq!(deck.count(&board).unwrap(), 39);

        hand.move_to(&mut board, &CardFilter::any(), &deck, &AttrPatch::new(), None)
            .unwrap()
            .run(&mut board);
        assert_eq!(hand.count(&board).unwrap(), 0);
        assert_eq!(deck.count(&board).unwrap(), 40);
    }

    #[test]
    fn missing_pile_keeps_cards_in_place() {
        let (mut board, _deck, hand, _area) = dealt_board();
        let before: Vec<_> = hand
            .cards(&board, &CardFilter::any(), None)
            .unwrap()
            .into_iter()
            .map(|id| (id, board.card(id).unwrap().slot()))
            .collect();

        let pile = Deck::new("points", ["player"], None).select("player", "self");
        let err = hand
            .move_to(&mut board, &CardFilter::any(), &pile, &AttrPatch::new(), None)
            .unwrap_err();
        assert!(matches!(err, BoardError::DeckNotInstantiated(_)));

        assert_eq!(hand.count(&board).unwrap(), 3);
        assert!(board.cards().all(|c| c.location().is_some()));
        let after: Vec<_> = hand
            .cards(&board, &CardFilter::any(), None)
            .unwrap()
            .into_iter()
            .map(|id| (id, board.card(id).unwrap().slot()))
            .collect();
        assert_eq!(after, before);
    }

    #[test]
    fn unmatched_filter_moves_nothing() {
        let (mut board, _deck, hand, area) = dealt_board();
        let finalize = hand
            .move_to(&mut board, &CardFilter::any().flag("active"), &area, &AttrPatch::new(), Some(1))
            .unwrap();
        assert!(finalize.moved().is_empty());
        assert_eq!(hand.count(&board).unwrap(), 3);
    }
}
