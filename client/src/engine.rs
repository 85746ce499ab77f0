use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::channel::CommandChannel;
use crate::config::ClientConfig;
use crate::dispatch::{CommandDispatcher, CommandTable};
use crate::error::{ChannelError, StartError};
use crate::games::{get_game_variant, required_commands, GameVariant};
use crate::interaction::Interaction;
use crate::render::SessionView;
use crate::session::{Session, Snapshot};
use crate::state::SharedState;
use crate::transitions::TransitionCoordinator;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

/// The variant served at the configured page.
pub fn variant_for(config: &ClientConfig) -> Result<Arc<dyn GameVariant>, StartError> {
    let name = config
        .game_type()
        .ok_or_else(|| StartError::NoGameInUrl(config.page_url.to_string()))?;
    get_game_variant(name).ok_or_else(|| StartError::UnknownGame(name.to_string()))
}

/// A session and its dispatcher, not yet connected to anything.
pub struct Parts {
    pub variant: Arc<dyn GameVariant>,
    pub shared: Arc<SharedState>,
    pub transitions: Arc<TransitionCoordinator>,
    pub dispatcher: CommandDispatcher,
    pub snapshots: watch::Receiver<Snapshot>,
}

/// Builds the session for `variant`, refusing a command table with holes.
pub fn assemble(variant: Arc<dyn GameVariant>, config: &ClientConfig) -> Result<Parts, StartError> {
    let table = CommandTable::for_variant(variant.as_ref());
    let missing = table.missing(&required_commands(variant.as_ref()));
    if !missing.is_empty() {
        return Err(StartError::IncompleteCommandTable {
            game: variant.name().to_string(),
            missing: missing.into_iter().map(str::to_string).collect(),
        });
    }

    let shared = Arc::new(SharedState::new(
        config.game_id.clone(),
        config.name.clone(),
        config.notification_ttl,
    ));
    let transitions = Arc::new(TransitionCoordinator::new(config.transition_duration, config.motion));
    let (session, snapshots) = Session::new(variant.clone(), shared.clone(), transitions.clone());
    tracing::debug!(game = variant.name(), commands = ?table, "command table ready");

    Ok(Parts {
        variant,
        shared,
        transitions,
        dispatcher: CommandDispatcher::new(session, Arc::new(table)),
        snapshots,
    })
}

/// A running client: dispatcher and channel tasks plus the handles the UI
/// needs. Must be started inside a tokio runtime.
pub struct Engine {
    pub variant: Arc<dyn GameVariant>,
    pub shared: Arc<SharedState>,
    pub transitions: Arc<TransitionCoordinator>,
    pub snapshots: watch::Receiver<Snapshot>,
    pub interaction: Interaction,
    dispatcher: JoinHandle<Session>,
    channel: JoinHandle<Result<(), ChannelError>>,
}

impl Engine {
    pub fn start(config: ClientConfig) -> Result<Self, StartError> {
        let variant = variant_for(&config)?;
        let parts = assemble(variant, &config)?;
        tracing::info!(game = parts.variant.display_name(), name = %config.name, "starting client");

        let (inbound, dispatcher) = parts.dispatcher.spawn();
        let (channel, outbound) = CommandChannel::new(
            config.page_url.clone(),
            config.reconnect_delay,
            parts.shared.clone(),
            inbound,
        );
        let channel = tokio::spawn(channel.run());
        let interaction = Interaction::new(
            parts.variant.clone(),
            parts.shared.clone(),
            parts.snapshots.clone(),
            outbound,
        );

        Ok(Engine {
            variant: parts.variant,
            shared: parts.shared,
            transitions: parts.transitions,
            snapshots: parts.snapshots,
            interaction,
            dispatcher,
            channel,
        })
    }

    pub fn view(&self) -> SessionView {
        let snapshot = self.snapshots.borrow().clone();
        SessionView::new(
            &snapshot,
            self.shared.playing(),
            self.shared.turn_status(),
            self.shared.notifications().active(),
        )
    }

    /// Closes the connection and waits for queued commands to finish.
    pub async fn shutdown(self) -> Option<Session> {
        let Engine {
            interaction,
            dispatcher,
            mut channel,
            ..
        } = self;
        drop(interaction);

        match tokio::time::timeout(SHUTDOWN_GRACE, &mut channel).await {
            Ok(Ok(Err(e))) => tracing::warn!(error = %e, "channel stopped with an error"),
            Ok(_) => {}
            Err(_) => {
                // still waiting out a reconnect delay
                channel.abort();
                let _ = channel.await;
            }
        }
        dispatcher.await.ok()
    }
}
