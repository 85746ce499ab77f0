use super::{Board, CardId, GroupKey};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Step {
    /// The card has reached a pile: drop it and grow the pile.
    Discard { card: CardId, deck: GroupKey },
    ClearPrefix { card: CardId, prefix: &'static str },
}

/// Bookkeeping deferred until the transitions of a move have settled.
///
/// A move mutates card attributes right away so the renderer can start
/// animating towards the destination; counts and removals recorded here are
/// applied by [`FinalizeAction::run`].
#[must_use = "a finalize action does nothing until it is run"]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FinalizeAction {
    steps: Vec<Step>,
    moved: Vec<CardId>,
}

impl FinalizeAction {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Cards handed over by the move that produced this action.
    pub fn moved(&self) -> &[CardId] {
        &self.moved
    }

    pub(crate) fn discard(card: CardId, deck: GroupKey) -> Self {
        FinalizeAction {
            steps: vec![Step::Discard { card, deck }],
            moved: Vec::new(),
        }
    }

    pub(crate) fn push_clear_prefix(&mut self, card: CardId, prefix: &'static str) {
        self.steps.push(Step::ClearPrefix { card, prefix });
    }

    pub(crate) fn push_moved(&mut self, card: CardId) {
        self.moved.push(card);
    }

    pub fn merge(&mut self, other: FinalizeAction) {
        self.steps.extend(other.steps);
        self.moved.extend(other.moved);
    }

    pub fn run(self, board: &mut Board) {
        for step in self.steps {
            match step {
                Step::Discard { card, deck } => {
                    if board.remove_card(card).is_none() {
                        tracing::debug!(%card, "discarded card already gone");
                        continue;
                    }
                    match board.deck_mut(&deck) {
                        Ok(state) => {
                            if let Err(e) = state.add_count(1) {
                                tracing::warn!(%deck, error = %e, "cannot grow pile");
                            }
                        }
                        Err(e) => tracing::debug!(error = %e, "pile removed before finalize"),
                    }
                }
                Step::ClearPrefix { card, prefix } => {
                    if let Ok(entity) = board.card_mut(card) {
                        entity.attrs.clear_prefix(prefix);
                    }
                }
            }
        }
    }
}
