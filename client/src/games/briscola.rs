use carte_protocol::Outbound;

use super::{deal_table, face_of, in_hand_of_self, named, set_points, GameVariant};
use crate::board::{AttrPatch, Board, CardFilter, CardGroup, CardId, Deck, Field};
use crate::commands;
use crate::dispatch::{Args, CommandTable, HandlerFuture};
use crate::session::{Layout, Session};

#[derive(Debug, Clone, Copy, Default)]
pub struct Briscola;

const HAND_SIZE: usize = 3;

impl GameVariant for Briscola {
    fn name(&self) -> &'static str {
        "briscola"
    }

    fn display_name(&self) -> &'static str {
        "Briscola"
    }

    fn player_identifiers(&self) -> &'static [&'static str] {
        &["opponent", "self"]
    }

    fn layout(&self) -> Layout {
        Layout::new(
            vec![
                named(Deck::new("deck", Vec::<String>::new(), None)),
                named(Deck::new("points", ["player"], None)),
            ],
            vec![
                named(Field::new("hand", ["player"], HAND_SIZE)),
                named(Field::new("briscola", Vec::<String>::new(), 1)),
                named(Field::new("playing-area", Vec::<String>::new(), 2)),
            ],
        )
    }

    fn commands(&self) -> &'static [&'static str] {
        &["begin", "draw_briscola", "points", "show_briscola", "take"]
    }

    fn register(&self, table: &mut CommandTable) {
        table.register("begin", begin);
        table.register("draw_briscola", draw_briscola);
        table.register("points", points);
        table.register("show_briscola", show_briscola);
        table.register("take", take);
    }

    fn on_card_click(&self, board: &Board, _turn_status: Option<&str>, card: CardId) -> Option<Outbound> {
        let hand = Field::new("hand", ["player"], HAND_SIZE);
        if !in_hand_of_self(board, &hand, card) {
            return None;
        }
        face_of(board, card).map(|card| Outbound::Play { card })
    }
}

fn begin(session: &mut Session, args: Args) -> HandlerFuture<'_> {
    Box::pin(async move {
        commands::begin(session, args).await?;
        deal_table(session)?;
        session.await_transitions().await;
        Ok(())
    })
}

/// Turns up the trump card next to the deck.
fn show_briscola(session: &mut Session, args: Args) -> HandlerFuture<'_> {
    Box::pin(async move {
        let card = args.card(0, "card")?;
        let deck = session.deck("deck")?;
        let briscola = session.field("briscola")?;
        let finalize = deck.move_to(&mut session.board, &briscola, &AttrPatch::from_card(&card))?;
        session.settle(finalize).await;
        Ok(())
    })
}

/// The last draw of the game takes the trump card; an opponent gets it face
/// down like any other drawn card.
fn draw_briscola(session: &mut Session, args: Args) -> HandlerFuture<'_> {
    Box::pin(async move {
        let player_id = args.parse(0, "playerId")?;
        let player = session.player_identifier(player_id);
        let patch = if session.is_self(player_id) {
            AttrPatch::new()
        } else {
            AttrPatch::face_down()
        };
        let briscola = session.field("briscola")?;
        let hand = session.field("hand")?.select("player", player);
        let finalize = briscola.move_to(&mut session.board, &CardFilter::any(), &hand, &patch, None)?;
        session.settle(finalize).await;
        Ok(())
    })
}

fn points(session: &mut Session, args: Args) -> HandlerFuture<'_> {
    Box::pin(async move { set_points(session, &args) })
}

/// Sweeps the trick into the winner's point pile after a short look.
fn take(session: &mut Session, args: Args) -> HandlerFuture<'_> {
    Box::pin(async move {
        let player_id = args.parse(0, "playerId")?;
        session.transitions().pause(2).await;

        let player = session.player_identifier(player_id);
        let area = session.field("playing-area")?;
        let pile = session.deck("points")?.select("player", player);
        let finalize = area.move_to(&mut session.board, &CardFilter::any(), &pile, &AttrPatch::new(), None)?;
        session.settle(finalize).await;
        Ok(())
    })
}
