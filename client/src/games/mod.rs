use std::fmt::Debug;
use std::sync::Arc;

use carte_protocol::{Card, Outbound};

use crate::board::attrs::{RANK, SUIT};
use crate::board::{Board, CardGroup, CardId, Deck, DeckSetup, Field};
use crate::dispatch::{Args, CommandTable};
use crate::error::CommandError;
use crate::session::{Layout, Session};

pub mod briscola;
pub mod scopa;

/// Rules of one card game as far as the board is concerned: which groups it
/// plays with, which commands it adds and what a click on a card means.
pub trait GameVariant: Send + Sync + Debug {
    /// Path segment the game is served under.
    fn name(&self) -> &'static str;

    fn display_name(&self) -> &'static str;

    /// Sub-field values for the `player` parameter, in seat order.
    fn player_identifiers(&self) -> &'static [&'static str];

    /// Named groups; their `player` sub-field is bound per command.
    fn layout(&self) -> Layout;

    /// Names of the variant's own commands, validated at startup.
    fn commands(&self) -> &'static [&'static str];

    /// Adds the variant's handlers on top of the shared ones.
    fn register(&self, table: &mut CommandTable);

    fn player_identifier(&self, player_id: i64, side: i64) -> &'static str {
        if player_id == side {
            "self"
        } else {
            "opponent"
        }
    }

    /// Outbound action for a click on `card` while in turn, if any.
    fn on_card_click(&self, board: &Board, turn_status: Option<&str>, card: CardId) -> Option<Outbound>;
}

pub const GAMES: &[&str] = &["briscola", "scopa"];

pub fn get_game_variant(name: &str) -> Option<Arc<dyn GameVariant>> {
    match name {
        "briscola" => Some(Arc::new(briscola::Briscola)),
        "scopa" => Some(Arc::new(scopa::Scopa)),
        _ => None,
    }
}

/// Every command a table built for `variant` must answer.
pub fn required_commands(variant: &dyn GameVariant) -> Vec<&'static str> {
    let mut names: Vec<_> = crate::commands::BASE_COMMANDS.to_vec();
    names.extend_from_slice(variant.commands());
    names.sort_unstable();
    names.dedup();
    names
}

pub(crate) fn named<G>(group: G) -> (String, G)
where
    G: CardGroup,
{
    (group.group().name().to_string(), group)
}

/// Draw pile bottom right, one empty point pile per player top right.
pub(crate) fn deal_table(session: &mut Session) -> Result<(), CommandError> {
    let deck = session.deck("deck")?;
    deck.instantiate(
        &mut session.board,
        DeckSetup {
            count: 40,
            anchor: Some("br".into()),
            back: None,
        },
    )?;
    let points = session.deck("points")?;
    let players = session.variant().player_identifiers();
    for &player in players {
        points.select("player", player).instantiate(
            &mut session.board,
            DeckSetup {
                count: 0,
                anchor: Some("tr".into()),
                back: None,
            },
        )?;
    }
    Ok(())
}

/// `points|<playerId>|<n>`: sets a player's point pile.
pub(crate) fn set_points(session: &mut Session, args: &Args) -> Result<(), CommandError> {
    let player_id = args.parse(0, "playerId")?;
    let amount = args.parse(1, "amount")?;
    let player = session.player_identifier(player_id);
    let pile: Deck = session.deck("points")?.select("player", player);
    pile.set_count(&mut session.board, amount)?;
    Ok(())
}

/// The face of a resident card as a play token (`suit:rank`).
pub(crate) fn face_of(board: &Board, card: CardId) -> Option<Card> {
    let attrs = board.card(card)?.attrs();
    Card::face(attrs.get(SUIT)?, attrs.get(RANK)?).ok()
}

pub(crate) fn in_hand_of_self(board: &Board, hand: &Field, card: CardId) -> bool {
    let Ok(key) = hand.select("player", "self").key() else {
        return false;
    };
    board.card(card).is_some_and(|c| c.is_in(&key))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_cover_every_required_command() {
        for name in GAMES {
            let variant = get_game_variant(name).unwrap();
            let table = CommandTable::for_variant(variant.as_ref());
            assert!(
                table.missing(&required_commands(variant.as_ref())).is_empty(),
                "{name}"
            );
            assert_eq!(variant.name(), *name);
        }
        assert!(get_game_variant("tressette").is_none());
    }

    #[test]
    fn identifies_players_by_seat() {
        let variant = get_game_variant("briscola").unwrap();
        assert_eq!(variant.player_identifier(1, 1), "self");
        assert_eq!(variant.player_identifier(0, 1), "opponent");
    }
}
