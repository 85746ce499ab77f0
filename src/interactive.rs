use tokio::io::{AsyncBufReadExt, BufReader};

use carte_client::{ClientConfig, Engine, SessionView};
use carte_protocol::Card;

#[derive(Debug, PartialEq, Eq)]
enum Input {
    /// A card to click: played from hand or picked on the table.
    Card(Card),
    Name(String),
    Rematch,
    Dismiss,
    Show,
    Help,
    Quit,
}

fn parse_input(line: &str) -> Result<Input, String> {
    let mut parts = line.split_whitespace();
    let Some(verb) = parts.next() else {
        return Ok(Input::Show);
    };
    let rest: Vec<&str> = parts.collect();
    match verb.to_lowercase().as_str() {
        "play" | "take" | "p" | "t" => {
            let token = rest.first().ok_or("which card? e.g. play coppe:7")?;
            Card::decode(token).map(Input::Card).map_err(|e| e.to_string())
        }
        "name" if !rest.is_empty() => Ok(Input::Name(rest.join(" "))),
        "name" => Err("name <new name>".into()),
        "rematch" => Ok(Input::Rematch),
        "ok" | "dismiss" => Ok(Input::Dismiss),
        "show" => Ok(Input::Show),
        "help" | "?" => Ok(Input::Help),
        "quit" | "exit" => Ok(Input::Quit),
        // a bare face, e.g. "coppe:7"
        other if other.contains(':') => Card::decode(other).map(Input::Card).map_err(|e| e.to_string()),
        other => Err(format!("unknown command: {other}")),
    }
}

fn print_help() {
    println!("\nCommands:");
    println!("  play <suit:rank>  - play a card from your hand");
    println!("  take <suit:rank>  - pick a card on the table to capture");
    println!("  name <new name>   - change your name");
    println!("  rematch           - ask for another game");
    println!("  ok                - dismiss messages");
    println!("  show              - print the table again");
    println!("  quit              - leave");
}

pub async fn run(config: ClientConfig) -> anyhow::Result<()> {
    let engine = Engine::start(config)?;
    println!("{} table client", engine.variant.display_name());
    print_help();

    // redraw on every published snapshot
    let printer = {
        let mut snapshots = engine.snapshots.clone();
        let shared = engine.shared.clone();
        tokio::spawn(async move {
            while snapshots.changed().await.is_ok() {
                let snapshot = snapshots.borrow_and_update().clone();
                let view = SessionView::new(
                    &snapshot,
                    shared.playing(),
                    shared.turn_status(),
                    shared.notifications().active(),
                );
                println!("\n{view}");
            }
        })
    };

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        match parse_input(line.trim()) {
            Ok(Input::Card(card)) => match engine.interaction.click_card(&card) {
                Some(sent) => println!(">> {sent}"),
                None if !engine.shared.playing() => println!("not your turn"),
                None => println!("{card} cannot be played now"),
            },
            Ok(Input::Name(name)) => {
                if !engine.interaction.rename(&name) {
                    println!("name saved, sent once you are seated");
                }
            }
            Ok(Input::Rematch) => {
                if !engine.interaction.rematch() {
                    println!("no seat yet");
                }
            }
            Ok(Input::Dismiss) => {
                engine.shared.notifications().dismiss_transient();
            }
            Ok(Input::Show) => println!("\n{}", engine.view()),
            Ok(Input::Help) => print_help(),
            Ok(Input::Quit) => break,
            Err(msg) => println!("{msg}"),
        }
    }

    printer.abort();
    engine.shutdown().await;
    println!("bye");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands() {
        let card = Card::face("coppe", "7").unwrap();
        assert_eq!(parse_input("play coppe:7"), Ok(Input::Card(card.clone())));
        assert_eq!(parse_input("coppe:7"), Ok(Input::Card(card)));
        assert_eq!(parse_input("name Ada Lovelace"), Ok(Input::Name("Ada Lovelace".into())));
        assert_eq!(parse_input(""), Ok(Input::Show));
        assert_eq!(parse_input("QUIT"), Ok(Input::Quit));
        assert_eq!(parse_input("ok"), Ok(Input::Dismiss));
        assert!(parse_input("play").is_err());
        assert!(parse_input("dance").is_err());
        assert!(parse_input("play a:b:c:d").is_err());
    }
}
