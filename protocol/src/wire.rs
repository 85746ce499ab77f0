use std::fmt;

use crate::card::Card;

/// Field separator of every message, in both directions.
pub const DELIMITER: char = '|';

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WireError {
    #[error("empty message")]
    Empty,
    #[error("command name {0:?} is not snake_case")]
    BadCommandName(String),
}

/// Joins positional fields with [`DELIMITER`], dropping any delimiter found
/// inside a field. There is no escaping: arguments never carry a `|`.
pub fn encode_fields<I, S>(fields: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    fields
        .into_iter()
        .map(|f| f.as_ref().replace(DELIMITER, ""))
        .collect::<Vec<_>>()
        .join(&DELIMITER.to_string())
}

/// A decoded server → client message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inbound {
    pub name: String,
    pub args: Vec<String>,
}

impl Inbound {
    pub fn parse(raw: &str) -> Result<Self, WireError> {
        let raw = raw.trim_end_matches(['\r', '\n']);
        if raw.is_empty() {
            return Err(WireError::Empty);
        }
        let mut fields = raw.split(DELIMITER).map(str::to_string);
        let name = fields.next().unwrap_or_default();
        if !is_snake_case(&name) {
            return Err(WireError::BadCommandName(name));
        }
        Ok(Inbound {
            name,
            args: fields.collect(),
        })
    }

    pub fn to_wire(&self) -> String {
        encode_fields(std::iter::once(self.name.as_str()).chain(self.args.iter().map(String::as_str)))
    }
}

fn is_snake_case(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_lowercase())
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

/// Client → server verbs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Join { name: String },
    Name { name: String },
    Rematch,
    Play { card: Card },
    TakeChoice { card: Card },
}

impl Outbound {
    pub fn verb(&self) -> &'static str {
        match self {
            Outbound::Join { .. } => "join",
            Outbound::Name { .. } => "name",
            Outbound::Rematch => "rematch",
            Outbound::Play { .. } => "play",
            Outbound::TakeChoice { .. } => "take_choice",
        }
    }

    pub fn to_wire(&self) -> String {
        let verb = self.verb();
        match self {
            Outbound::Join { name } | Outbound::Name { name } => encode_fields([verb, name.as_str()]),
            Outbound::Rematch => encode_fields([verb]),
            Outbound::Play { card } | Outbound::TakeChoice { card } => {
                encode_fields([verb.to_string(), card.encode()])
            }
        }
    }
}

impl fmt::Display for Outbound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_wire())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_delimiters_from_arguments() {
        assert_eq!(encode_fields(["join", "Al|ice"]), "join|Alice");
        let join = Outbound::Join {
            name: "|Bob|".into(),
        };
        assert_eq!(join.to_wire(), "join|Bob");
    }

    #[test]
    fn encodes_outbound_verbs() {
        let card = Card::face("spade", "cavallo").unwrap();
        assert_eq!(Outbound::Play { card: card.clone() }.to_wire(), "play|spade:cavallo");
        assert_eq!(Outbound::TakeChoice { card }.to_wire(), "take_choice|spade:cavallo");
        assert_eq!(Outbound::Rematch.to_wire(), "rematch");
        assert_eq!(Outbound::Name { name: "Eve".into() }.to_wire(), "name|Eve");
    }

    #[test]
    fn parses_inbound_commands() {
        let cmd = Inbound::parse("draw_card|1|coppe:3\n").unwrap();
        assert_eq!(cmd.name, "draw_card");
        assert_eq!(cmd.args, vec!["1", "coppe:3"]);

        let cmd = Inbound::parse("turn").unwrap();
        assert!(cmd.args.is_empty());

        let cmd = Inbound::parse("players|Alice||Bob").unwrap();
        assert_eq!(cmd.args, vec!["Alice", "", "Bob"]);
        assert_eq!(cmd.to_wire(), "players|Alice||Bob");
    }

    #[test]
    fn rejects_malformed_inbound() {
        assert_eq!(Inbound::parse(""), Err(WireError::Empty));
        assert!(matches!(Inbound::parse("DrawCard|1"), Err(WireError::BadCommandName(_))));
        assert!(matches!(Inbound::parse("|1"), Err(WireError::BadCommandName(_))));
    }
}
