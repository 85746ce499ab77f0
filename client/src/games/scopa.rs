use carte_protocol::{Card, Outbound};

use super::{deal_table, face_of, in_hand_of_self, named, set_points, GameVariant};
use crate::board::{AttrPatch, Board, CardFilter, CardGroup, CardId, Deck, Field};
use crate::commands::{self, parse_scores};
use crate::dispatch::{Args, CommandTable, HandlerFuture};
use crate::error::CommandError;
use crate::session::{DetailValue, Layout, ResultDetail, ResultRow, Session};

#[derive(Debug, Clone, Copy, Default)]
pub struct Scopa;

const HAND_SIZE: usize = 6;
const POINTS_CAP: u32 = 6;

const ACTIVE: &str = "active";
const TAKEABLE: &str = "takeable";
const SELECTED: &str = "selected";

impl GameVariant for Scopa {
    fn name(&self) -> &'static str {
        "scopa"
    }

    fn display_name(&self) -> &'static str {
        "Scopa"
    }

    fn player_identifiers(&self) -> &'static [&'static str] {
        &["opponent", "self"]
    }

    fn layout(&self) -> Layout {
        Layout::new(
            vec![
                named(Deck::new("deck", Vec::<String>::new(), None)),
                // only the top few cards of a point pile are ever drawn
                named(Deck::new("points", ["player"], Some(POINTS_CAP))),
            ],
            vec![
                named(Field::new("hand", ["player"], HAND_SIZE)),
                named(Field::new("playing-area", Vec::<String>::new(), 13)),
                named(Field::new("points-scopa", ["player"], 18)),
            ],
        )
    }

    fn commands(&self) -> &'static [&'static str] {
        &[
            "activate_card",
            "add_to_table",
            "begin",
            "capture_selected_cards",
            "capture_takeable_cards",
            "points",
            "points_scopa",
            "results",
            "results_detail",
            "results_prepare",
            "take",
            "take_all",
            "turn_status",
        ]
    }

    fn register(&self, table: &mut CommandTable) {
        table.register("activate_card", activate_card);
        table.register("add_to_table", add_to_table);
        table.register("begin", begin);
        table.register("capture_selected_cards", capture_selected_cards);
        table.register("capture_takeable_cards", capture_takeable_cards);
        table.register("points", points);
        table.register("points_scopa", points_scopa);
        table.register("results", results);
        table.register("results_detail", results_detail);
        table.register("results_prepare", results_prepare);
        table.register("take", take);
        table.register("take_all", take_all);
        table.register("turn_status", turn_status);
    }

    /// `hand`: play a card of the local hand. `capture`: pick a table card
    /// the server marked as takeable (or already selected).
    fn on_card_click(&self, board: &Board, turn_status: Option<&str>, card: CardId) -> Option<Outbound> {
        match turn_status {
            Some("hand") => {
                let hand = Field::new("hand", ["player"], HAND_SIZE);
                if !in_hand_of_self(board, &hand, card) {
                    return None;
                }
                face_of(board, card).map(|card| Outbound::Play { card })
            }
            Some("capture") => {
                let area = Field::new("playing-area", Vec::<String>::new(), 13).key().ok()?;
                let entity = board.card(card)?;
                let pickable = entity.attrs().contains(TAKEABLE) || entity.attrs().contains(SELECTED);
                if !entity.is_in(&area) || !pickable {
                    return None;
                }
                face_of(board, card).map(|card| Outbound::TakeChoice { card })
            }
            other => {
                tracing::warn!(status = ?other, "click in unknown turn status");
                None
            }
        }
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

/// Deals a card face up onto the table.
fn add_to_table(session: &mut Session, args: Args) -> HandlerFuture<'_> {
    Box::pin(async move {
        let card = args.card(0, "card")?;
        let deck = session.deck("deck")?;
        let area = session.field("playing-area")?;
        let finalize = deck.move_to(&mut session.board, &area, &AttrPatch::from_card(&card))?;
        session.settle(finalize).await;
        Ok(())
    })
}

fn turn_status(session: &mut Session, args: Args) -> HandlerFuture<'_> {
    Box::pin(async move {
        let status = args.required(0, "status")?;
        session.shared().set_turn_status(Some(status.to_string()));
        Ok(())
    })
}

/// Marks the hand card about to capture. Not animated, so the player can
/// click the table right away.
fn activate_card(session: &mut Session, args: Args) -> HandlerFuture<'_> {
    Box::pin(async move {
        let player_id = args.parse(0, "playerId")?;
        let card = args.card(1, "card")?;
        let player = session.player_identifier(player_id);
        let filter = if session.is_self(player_id) {
            CardFilter::from_card(&card)
        } else {
            CardFilter::any()
        };

        let hand = session.field("hand")?.select("player", player);
        let target = hand
            .cards(&session.board, &filter, Some(1))?
            .first()
            .copied()
            .ok_or_else(|| CommandError::NoMatchingCard(card.encode()))?;
        let patch = AttrPatch::from_card(&card).flag(ACTIVE);
        session.board.patch_card(target, &patch)?;
        Ok(())
    })
}

fn toggle_on_table(session: &mut Session, args: &Args, flag: &str) -> Result<(), CommandError> {
    let area = session.field("playing-area")?;
    for raw in args.rest(0) {
        let card = Card::decode(raw)?;
        let target = area
            .cards(&session.board, &CardFilter::from_card(&card), Some(1))?
            .first()
            .copied()
            .ok_or_else(|| CommandError::NoMatchingCard(card.encode()))?;
        session.board.toggle_flag(target, flag)?;
    }
    Ok(())
}

fn capture_takeable_cards(session: &mut Session, args: Args) -> HandlerFuture<'_> {
    Box::pin(async move { toggle_on_table(session, &args, TAKEABLE) })
}

fn capture_selected_cards(session: &mut Session, args: Args) -> HandlerFuture<'_> {
    Box::pin(async move { toggle_on_table(session, &args, SELECTED) })
}

fn points(session: &mut Session, args: Args) -> HandlerFuture<'_> {
    Box::pin(async move { set_points(session, &args) })
}

/// `take|<playerId>|<isScopa>`: selected table cards go to the player's
/// pile, the active hand card too, or to the scopa row when it swept the
/// table.
fn take(session: &mut Session, args: Args) -> HandlerFuture<'_> {
    Box::pin(async move {
        let player_id = args.parse(0, "playerId")?;
        let is_scopa: i64 = args.parse(1, "isScopa")?;
        session.transitions().pause(2).await;

        let player = session.player_identifier(player_id);
        let area = session.field("playing-area")?;
        let hand = session.field("hand")?.select("player", player);
        let pile = session.deck("points")?.select("player", player);

        let taken = area.move_to(
            &mut session.board,
            &CardFilter::any().flag(SELECTED),
            &pile,
            &AttrPatch::new(),
            None,
        )?;
        session.defer(taken);

        let active = CardFilter::any().flag(ACTIVE);
        let handed = if is_scopa > 0 {
            let row = session.field("points-scopa")?.select("player", player);
            hand.move_to(&mut session.board, &active, &row, &AttrPatch::new(), Some(1))?
        } else {
            hand.move_to(&mut session.board, &active, &pile, &AttrPatch::new(), Some(1))?
        };
        session.settle(handed).await;
        Ok(())
    })
}

/// Lays out the cards that scored a scopa face up in the player's row.
fn points_scopa(session: &mut Session, args: Args) -> HandlerFuture<'_> {
    Box::pin(async move {
        let player_id = args.parse(0, "playerId")?;
        let player = session.player_identifier(player_id);
        let deck = session.deck("deck")?;
        let row = session.field("points-scopa")?.select("player", player);

        for raw in args.rest(1) {
            let card = Card::decode(raw)?;
            let finalize = deck.move_to(&mut session.board, &row, &AttrPatch::from_card(&card))?;
            session.defer(finalize);
        }
        session.await_transitions().await;
        Ok(())
    })
}

fn take_all(session: &mut Session, args: Args) -> HandlerFuture<'_> {
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

/// One unscored row per player, in seat order.
fn results_prepare(session: &mut Session, _args: Args) -> HandlerFuture<'_> {
    Box::pin(async move {
        let rows: Vec<ResultRow> = session
            .players()
            .iter()
            .enumerate()
            .map(|(player_id, name)| ResultRow {
                player_id,
                name: name.clone(),
                points: None,
                is_self: session.is_self(player_id as i64),
            })
            .collect();
        session.results.rows = rows;
        session.results.details.clear();
        Ok(())
    })
}

pub const DETAIL_KINDS: &[&str] = &["cards", "denari", "primiera", "settebello", "scopa"];

/// `results_detail|<kind>|<v0>|<v1>[|...]`. A primiera carries, per suit,
/// a triple of (suit, best rank of player 0, best rank of player 1).
fn results_detail(session: &mut Session, args: Args) -> HandlerFuture<'_> {
    Box::pin(async move {
        let kind = args.required(0, "type")?;
        if !DETAIL_KINDS.contains(&kind) {
            return Err(args.invalid("type", kind));
        }
        let rest = args.rest(1);
        let value_of = |player_id: usize| -> Result<i64, CommandError> {
            let raw = rest.get(player_id).map(String::as_str).unwrap_or_default();
            raw.trim().parse().map_err(|_| args.invalid("value", raw))
        };

        let mut values = Vec::new();
        for player_id in 0..session.players().len() {
            let value = value_of(player_id)?;
            let winner = if kind == "scopa" {
                value > 0
            } else {
                // two seats: compare against the other one
                match value_of(1 - player_id.min(1)) {
                    Ok(other) => value > other,
                    Err(_) => false,
                }
            };
            let cards = (kind == "primiera").then(|| primiera_summary(rest.get(2..).unwrap_or(&[]), player_id));
            values.push(DetailValue {
                player_id,
                value,
                cards,
                winner,
            });
        }

        session.results.details.retain(|d| d.kind != kind);
        session.results.details.push(ResultDetail {
            kind: kind.to_string(),
            values,
        });
        Ok(())
    })
}

/// `A`, `2`..`7`, `F`/`C`/`R` per suit; `-` for a suit the player lacks.
fn primiera_summary(triples: &[String], player_id: usize) -> String {
    triples
        .iter()
        .enumerate()
        .filter(|(i, _)| i % 3 == player_id + 1)
        .map(|(_, rank)| match rank.as_str() {
            "fante" | "cavallo" | "re" => rank[..1].to_uppercase(),
            "1" => "A".to_string(),
            "0" => "-".to_string(),
            other => other.to_string(),
        })
        .collect()
}

/// Final scores: fills the prepared rows and orders them best first.
fn results(session: &mut Session, args: Args) -> HandlerFuture<'_> {
    Box::pin(async move {
        let scores = parse_scores(&args)?;
        if session.results.rows.is_empty() {
            return commands::results(session, args).await;
        }
        for row in &mut session.results.rows {
            row.points = scores.get(row.player_id).copied();
        }
        session.results.rows.sort_by(|a, b| b.points.cmp(&a.points));
        session.results.shown = true;
        Ok(())
    })
}
