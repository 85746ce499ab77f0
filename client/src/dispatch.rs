//! Serialized execution of server commands.
//!
//! Messages are queued as they arrive and a single task runs their handlers
//! one after the other: a handler that waits for transitions holds back every
//! later command until the board has settled.

use futures::future::BoxFuture;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use carte_protocol::{Card, Inbound};

use crate::commands;
use crate::error::{CommandError, DispatchError};
use crate::games::GameVariant;
use crate::session::Session;

/// Positional arguments of one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Args {
    command: String,
    values: Vec<String>,
}

impl Args {
    pub fn new(command: impl Into<String>, values: Vec<String>) -> Self {
        Args {
            command: command.into(),
            values,
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Argument `index`; absent and empty arguments are both `None`.
    pub fn optional(&self, index: usize) -> Option<&str> {
        self.values
            .get(index)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    pub fn required(&self, index: usize, name: &'static str) -> Result<&str, CommandError> {
        self.optional(index).ok_or_else(|| CommandError::MissingArgument {
            command: self.command.clone(),
            name,
        })
    }

    pub fn parse<T: FromStr>(&self, index: usize, name: &'static str) -> Result<T, CommandError> {
        let raw = self.required(index, name)?;
        raw.trim().parse().map_err(|_| CommandError::InvalidArgument {
            command: self.command.clone(),
            name,
            value: raw.to_string(),
        })
    }

    pub fn card(&self, index: usize, name: &'static str) -> Result<Card, CommandError> {
        Ok(Card::decode(self.required(index, name)?)?)
    }

    /// Every argument from `index` on, e.g. the card list of a capture.
    pub fn rest(&self, index: usize) -> &[String] {
        self.values.get(index..).unwrap_or(&[])
    }

    pub fn invalid(&self, name: &'static str, value: impl Into<String>) -> CommandError {
        CommandError::InvalidArgument {
            command: self.command.clone(),
            name,
            value: value.into(),
        }
    }
}

pub type HandlerFuture<'a> = BoxFuture<'a, Result<(), CommandError>>;
pub type Handler = for<'a> fn(&'a mut Session, Args) -> HandlerFuture<'a>;

/// Command name → handler. Built once per session: shared handlers first,
/// then the variant's, which replace shared ones of the same name.
#[derive(Clone, Default)]
pub struct CommandTable {
    handlers: BTreeMap<&'static str, Handler>,
}

impl fmt::Debug for CommandTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.handlers.keys()).finish()
    }
}

impl CommandTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_variant(variant: &dyn GameVariant) -> Self {
        let mut table = Self::new();
        commands::register(&mut table);
        variant.register(&mut table);
        table
    }

    /// Returns whether an earlier handler was replaced.
    pub fn register(&mut self, name: &'static str, handler: Handler) -> bool {
        self.handlers.insert(name, handler).is_some()
    }

    pub fn get(&self, name: &str) -> Option<Handler> {
        self.handlers.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.handlers.keys().copied()
    }

    /// Names from `required` with no handler.
    pub fn missing<'n>(&self, required: &[&'n str]) -> Vec<&'n str> {
        required
            .iter()
            .copied()
            .filter(|name| !self.contains(name))
            .collect()
    }
}

pub struct CommandDispatcher {
    session: Session,
    table: Arc<CommandTable>,
}

impl CommandDispatcher {
    pub fn new(session: Session, table: Arc<CommandTable>) -> Self {
        CommandDispatcher { session, table }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn into_session(self) -> Session {
        self.session
    }

    /// Runs one raw message to completion.
    ///
    /// Finalize actions a handler deferred are run even when it bailed out
    /// before settling, so no card is left half-moved.
    pub async fn handle(&mut self, raw: &str) -> Result<(), DispatchError> {
        let Inbound { name, args } = Inbound::parse(raw)?;
        let handler = self
            .table
            .get(&name)
            .ok_or_else(|| DispatchError::UnknownCommand(name.clone()))?;

        tracing::debug!(command = %name, ?args, "handling");
        let result = handler(&mut self.session, Args::new(name.as_str(), args)).await;
        if self.session.flush_pending() {
            tracing::debug!(command = %name, "ran leftover finalize actions");
        }
        self.session.publish();
        result.map_err(DispatchError::from)
    }

    /// Drains `inbox` until every sender is gone. Failures are logged and
    /// dropped; one bad command never stops the queue.
    pub async fn run(mut self, mut inbox: mpsc::UnboundedReceiver<String>) -> Session {
        while let Some(raw) = inbox.recv().await {
            tracing::debug!("<< {}", raw);
            match self.handle(&raw).await {
                Ok(()) => {}
                Err(DispatchError::UnknownCommand(name)) => {
                    tracing::warn!(command = %name, "unhandled command");
                }
                Err(e) => tracing::warn!(error = %e, message = %raw, "command failed"),
            }
        }
        tracing::debug!("command queue closed");
        self.session
    }

    pub fn spawn(self) -> (DispatcherHandle, JoinHandle<Session>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(self.run(rx));
        (DispatcherHandle { tx }, task)
    }
}

/// Enqueues raw messages for the dispatcher task.
#[derive(Debug, Clone)]
pub struct DispatcherHandle {
    tx: mpsc::UnboundedSender<String>,
}

impl DispatcherHandle {
    /// Returns `false` once the dispatcher has stopped.
    pub fn push(&self, raw: impl Into<String>) -> bool {
        self.tx.send(raw.into()).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Args {
        Args::new("draw_card", values.iter().map(|v| v.to_string()).collect())
    }

    #[test]
    fn empty_arguments_count_as_missing() {
        let args = args(&["1", ""]);
        assert_eq!(args.parse::<i64>(0, "playerId").unwrap(), 1);
        assert_eq!(args.optional(1), None);
        assert_eq!(args.optional(2), None);
        assert!(matches!(
            args.required(1, "card"),
            Err(CommandError::MissingArgument { name: "card", .. })
        ));
    }

    #[test]
    fn reports_invalid_numbers() {
        let err = args(&["uno"]).parse::<i64>(0, "playerId").unwrap_err();
        assert_eq!(err.to_string(), "draw_card: invalid playerId \"uno\"");
    }

    #[test]
    fn rest_past_the_end_is_empty() {
        assert_eq!(args(&["0", "coppe:1"]).rest(1), ["coppe:1".to_string()]);
        assert!(args(&[]).rest(3).is_empty());
    }
}
