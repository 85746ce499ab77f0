//! The websocket link to the game server.
//!
//! Inbound text frames are handed to the dispatcher untouched; outbound
//! verbs are queued through a [`ChannelHandle`]. A dropped connection is
//! retried forever after a fixed delay, and every new connection starts
//! with a `join` so the server can restore the player's seat.

use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use url::Url;

use carte_protocol::Outbound;

use crate::dispatch::DispatcherHandle;
use crate::error::ChannelError;
use crate::notifications::CONNECTION_LOST;
use crate::state::SharedState;

pub const CONNECTION_LOST_MESSAGE: &str = "Connection lost... reconnecting";

/// `http(s)://host/<game>` → `ws(s)://host/ws/<game>[/<gameId>]`. The query
/// is kept, the fragment dropped.
pub fn derive_ws_url(page: &Url, game_id: &str) -> Result<Url, ChannelError> {
    let scheme = match page.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => return Err(ChannelError::Url(format!("unsupported scheme {other:?} in {page}"))),
    };
    let mut url = page.clone();
    url.set_scheme(scheme)
        .map_err(|()| ChannelError::Url(page.to_string()))?;

    let path = page.path().trim_end_matches('/');
    let game_id = game_id.trim();
    if game_id.is_empty() {
        url.set_path(&format!("/ws{path}"));
    } else {
        url.set_path(&format!("/ws{path}/{game_id}"));
    }
    url.set_fragment(None);
    Ok(url)
}

enum Closed {
    /// Every sender is gone: the client is shutting down.
    Local,
    /// The server hung up.
    Remote,
}

pub struct CommandChannel {
    page_url: Url,
    reconnect_delay: Duration,
    shared: Arc<SharedState>,
    inbound: DispatcherHandle,
    outbound: mpsc::UnboundedReceiver<Outbound>,
}

/// Queues verbs for the server. Messages queued while disconnected are
/// dropped on reconnect; the `join` handshake replaces them.
#[derive(Debug, Clone)]
pub struct ChannelHandle {
    tx: mpsc::UnboundedSender<Outbound>,
}

impl ChannelHandle {
    pub fn send(&self, msg: Outbound) -> bool {
        self.tx.send(msg).is_ok()
    }
}

impl CommandChannel {
    pub fn new(
        page_url: Url,
        reconnect_delay: Duration,
        shared: Arc<SharedState>,
        inbound: DispatcherHandle,
    ) -> (Self, ChannelHandle) {
        let (tx, outbound) = mpsc::unbounded_channel();
        let channel = CommandChannel {
            page_url,
            reconnect_delay,
            shared,
            inbound,
            outbound,
        };
        (channel, ChannelHandle { tx })
    }

    /// Connects and reconnects until every [`ChannelHandle`] is dropped.
    pub async fn run(mut self) -> Result<(), ChannelError> {
        loop {
            if self.outbound.is_closed() {
                return Ok(());
            }
            // re-read each time: `game_id` may have assigned one
            let url = derive_ws_url(&self.page_url, &self.shared.game_id())?;
            match self.connection(&url).await {
                Ok(Closed::Local) => {
                    tracing::info!("channel closed");
                    return Ok(());
                }
                Ok(Closed::Remote) => tracing::warn!(%url, "server closed the connection"),
                Err(e) => tracing::warn!(%url, error = %e, "connection failed"),
            }

            self.shared.set_playing(false);
            self.shared
                .notifications()
                .push_persistent(CONNECTION_LOST, CONNECTION_LOST_MESSAGE);
            tokio::time::sleep(self.reconnect_delay).await;
        }
    }

    async fn connection(&mut self, url: &Url) -> Result<Closed, ChannelError> {
        tracing::info!(%url, "connecting");
        let (ws, _) = connect_async(url.as_str()).await?;
        let (mut write, mut read) = ws.split();

        self.shared.notifications().clear_persistent(CONNECTION_LOST);
        while let Ok(stale) = self.outbound.try_recv() {
            tracing::debug!(message = %stale, "dropping message queued while offline");
        }

        let join = Outbound::Join {
            name: self.shared.name(),
        };
        tracing::debug!(">> {}", join);
        write.send(Message::Text(join.to_wire())).await?;

        loop {
            tokio::select! {
                out = self.outbound.recv() => match out {
                    Some(msg) => {
                        tracing::debug!(">> {}", msg);
                        write.send(Message::Text(msg.to_wire())).await?;
                    }
                    None => {
                        let _ = write.send(Message::Close(None)).await;
                        return Ok(Closed::Local);
                    }
                },
                frame = read.next() => match frame {
                    Some(Ok(Message::Text(text))) => {
                        if !self.inbound.push(text) {
                            return Ok(Closed::Local);
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => return Ok(Closed::Remote),
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(e.into()),
                },
            }
        }
    }
}
