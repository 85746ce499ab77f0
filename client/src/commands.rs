//! Handlers shared by every variant.

use std::time::Duration;

use carte_protocol::Card;

use crate::board::attrs::{BACK, FIELD_PREFIX};
use crate::board::{AttrPatch, CardFilter, CardGroup};
use crate::dispatch::{Args, CommandTable, HandlerFuture};
use crate::error::CommandError;
use crate::session::{ResultRow, Session};

/// Delay before animations come back after a catch-up replay.
const ANIMATIONS_ON_DELAY: Duration = Duration::from_millis(100);

pub const BASE_COMMANDS: &[&str] = &[
    "animations",
    "begin",
    "deck_count",
    "draw_card",
    "error",
    "game_id",
    "play_card",
    "player_id",
    "players",
    "rematch_active",
    "results",
    "turn",
];

pub fn register(table: &mut CommandTable) {
    table.register("animations", animations);
    table.register("begin", begin);
    table.register("deck_count", deck_count);
    table.register("draw_card", draw_card);
    table.register("error", error);
    table.register("game_id", game_id);
    table.register("play_card", play_card);
    table.register("player_id", player_id);
    table.register("players", players);
    table.register("rematch_active", rematch_active);
    table.register("results", results);
    table.register("turn", turn);
}

pub fn begin(session: &mut Session, _args: Args) -> HandlerFuture<'_> {
    Box::pin(async move {
        session.begin();
        Ok(())
    })
}

pub fn error(session: &mut Session, args: Args) -> HandlerFuture<'_> {
    Box::pin(async move {
        let message = args.required(0, "message")?;
        let command = args.optional(1).map(str::to_string);
        session.shared().notifications().push_transient(message, command);
        Ok(())
    })
}

pub fn game_id(session: &mut Session, args: Args) -> HandlerFuture<'_> {
    Box::pin(async move {
        let id = args.required(0, "gameId")?;
        tracing::info!(game_id = id, "joined game");
        session.shared().set_game_id(id);
        Ok(())
    })
}

pub fn player_id(session: &mut Session, args: Args) -> HandlerFuture<'_> {
    Box::pin(async move {
        let id = args.parse(0, "playerId")?;
        session.set_player_id(id);
        Ok(())
    })
}

pub fn players(session: &mut Session, args: Args) -> HandlerFuture<'_> {
    Box::pin(async move {
        session.set_players(args.rest(0).to_vec());
        Ok(())
    })
}

pub fn animations(session: &mut Session, args: Args) -> HandlerFuture<'_> {
    Box::pin(async move {
        match args.required(0, "status")? {
            "off" => session.transitions().set_animations(false),
            "on" => {
                tokio::time::sleep(ANIMATIONS_ON_DELAY).await;
                session.transitions().set_animations(true);
            }
            other => return Err(args.invalid("status", other)),
        }
        Ok(())
    })
}

/// `deck_count|<deck>|<n>[|<playerId>]`; the player binds per-player piles.
/// Capped piles clamp the count.
pub fn deck_count(session: &mut Session, args: Args) -> HandlerFuture<'_> {
    Box::pin(async move {
        let mut deck = session.deck(args.required(0, "deckId")?)?;
        let count = args.parse(1, "amount")?;
        if args.optional(2).is_some() {
            let player_id = args.parse(2, "playerId")?;
            deck = deck.select("player", session.player_identifier(player_id));
        }
        deck.set_count(&mut session.board, count)?;
        Ok(())
    })
}

pub fn turn(session: &mut Session, _args: Args) -> HandlerFuture<'_> {
    Box::pin(async move {
        session.shared().set_playing(true);
        Ok(())
    })
}

/// `draw_card|<playerId>[|<card>[|<deckBack>]]`: deck → that player's hand.
/// Without a card the drawn card stays face down.
pub fn draw_card(session: &mut Session, args: Args) -> HandlerFuture<'_> {
    Box::pin(async move {
        let player_id = args.parse(0, "playerId")?;
        let patch = match args.optional(1) {
            Some(raw) => AttrPatch::from_card(&Card::decode(raw)?),
            None => AttrPatch::new(),
        };
        let player = session.player_identifier(player_id);
        let deck = session.deck("deck")?;
        let hand = session.field("hand")?.select("player", player);

        let finalize = deck.move_to(&mut session.board, &hand, &patch)?;
        session.defer(finalize);
        if let Some(back) = args.optional(2) {
            deck.set_back(&mut session.board, back)?;
        }
        session.await_transitions().await;
        Ok(())
    })
}

/// `play_card|<playerId>|<card>`: hand → playing area.
///
/// The local hand is searched by face. An opponent's cards are face down, so
/// any card (of the given back, if any) is taken and turned up.
pub fn play_card(session: &mut Session, args: Args) -> HandlerFuture<'_> {
    Box::pin(async move {
        let player_id = args.parse(0, "playerId")?;
        let card = args.card(1, "card")?;
        let player = session.player_identifier(player_id);

        let (filter, mut patch) = if session.is_self(player_id) {
            (CardFilter::from_card(&card), AttrPatch::new())
        } else {
            let filter = match card.back_style() {
                Some(back) => CardFilter::any().with(BACK, back),
                None => CardFilter::any(),
            };
            (filter, AttrPatch::from_card(&card))
        };
        patch.insert(format!("{FIELD_PREFIX}player"), Some(player.to_string()));

        let hand = session.field("hand")?.select("player", player);
        let area = session.field("playing-area")?;
        let finalize = hand.move_to(&mut session.board, &filter, &area, &patch, Some(1))?;
        if finalize.moved().is_empty() {
            return Err(CommandError::NoMatchingCard(card.encode()));
        }
        session.settle(finalize).await;
        Ok(())
    })
}

/// `results|<score>...`: one score per player id, shown best first.
pub fn results(session: &mut Session, args: Args) -> HandlerFuture<'_> {
    Box::pin(async move {
        let scores = parse_scores(&args)?;
        let mut rows: Vec<ResultRow> = scores
            .into_iter()
            .enumerate()
            .map(|(player_id, points)| ResultRow {
                player_id,
                name: session.players().get(player_id).cloned().unwrap_or_default(),
                points: Some(points),
                is_self: session.is_self(player_id as i64),
            })
            .collect();
        rows.sort_by(|a, b| b.points.cmp(&a.points));
        session.results.rows = rows;
        session.results.shown = true;
        Ok(())
    })
}

pub fn rematch_active(session: &mut Session, _args: Args) -> HandlerFuture<'_> {
    Box::pin(async move {
        session.set_rematch_requested(true);
        Ok(())
    })
}

pub(crate) fn parse_scores(args: &Args) -> Result<Vec<i64>, CommandError> {
    args.rest(0)
        .iter()
        .map(|raw| raw.trim().parse().map_err(|_| args.invalid("score", raw.as_str())))
        .collect()
}
