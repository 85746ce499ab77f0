//! Runs the client against an in-process websocket server.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;
use url::Url;

use carte_client::board::CardGroup;
use carte_client::notifications::CONNECTION_LOST;
use carte_client::{ClientConfig, Engine, Motion};
use carte_protocol::{Card, Outbound};

const WAIT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq)]
enum Event {
    Connected(Option<String>),
    Received(String),
}

/// What the server does on its n-th connection once the client has joined.
#[derive(Clone, Default)]
struct Script {
    lines: Vec<&'static str>,
    /// Close after this many messages from the client.
    hang_up_after: Option<usize>,
}

#[derive(Clone)]
struct FakeServer {
    events: mpsc::UnboundedSender<Event>,
    scripts: Arc<Vec<Script>>,
    connections: Arc<AtomicUsize>,
}

async fn ws_new(ws: WebSocketUpgrade, State(server): State<FakeServer>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| serve(socket, server, None))
}

async fn ws_game(
    ws: WebSocketUpgrade,
    Path(game_id): Path<String>,
    State(server): State<FakeServer>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| serve(socket, server, Some(game_id)))
}

async fn serve(mut socket: WebSocket, server: FakeServer, game_id: Option<String>) {
    let _ = server.events.send(Event::Connected(game_id));
    let n = server.connections.fetch_add(1, Ordering::SeqCst);
    let script = server.scripts.get(n).cloned().unwrap_or_default();

    let mut received = 0;
    while let Some(Ok(msg)) = socket.recv().await {
        let Message::Text(text) = msg else { continue };
        let _ = server.events.send(Event::Received(text));
        received += 1;
        if received == 1 {
            for line in &script.lines {
                if socket.send(Message::Text(line.to_string())).await.is_err() {
                    return;
                }
            }
        }
        if script.hang_up_after == Some(received) {
            let _ = socket.send(Message::Close(None)).await;
            return;
        }
    }
}

async fn start_server(scripts: Vec<Script>) -> (SocketAddr, mpsc::UnboundedReceiver<Event>) {
    let (events, rx) = mpsc::unbounded_channel();
    let server = FakeServer {
        events,
        scripts: Arc::new(scripts),
        connections: Arc::new(AtomicUsize::new(0)),
    };
    let app = Router::new()
        .route("/ws/briscola", get(ws_new))
        .route("/ws/briscola/:game_id", get(ws_game))
        .with_state(server);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, rx)
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

fn config(addr: SocketAddr) -> ClientConfig {
    init_logging();
    let url = Url::parse(&format!("http://{addr}/briscola")).unwrap();
    ClientConfig::new(url)
        .with_name("Ada")
        .with_motion(Motion::None)
        .with_reconnect_delay(Duration::from_millis(50))
}

async fn within<T>(what: &str, fut: impl Future<Output = T>) -> T {
    match tokio::time::timeout(WAIT, fut).await {
        Ok(value) => value,
        Err(_) => panic!("timed out waiting for {what}"),
    }
}

async fn next_event(events: &mut mpsc::UnboundedReceiver<Event>) -> Event {
    within("server event", events.recv()).await.unwrap()
}

async fn until(what: &str, mut check: impl FnMut() -> bool) {
    within(what, async {
        while !check() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
}

#[tokio::test]
async fn joins_first_and_applies_server_commands() {
    let (addr, mut events) = start_server(vec![Script {
        lines: vec!["game_id|k3x9", "player_id|0", "players|Ada|Bob"],
        hang_up_after: None,
    }])
    .await;
    let mut engine = Engine::start(config(addr)).unwrap();

    assert_eq!(next_event(&mut events).await, Event::Connected(None));
    assert_eq!(next_event(&mut events).await, Event::Received("join|Ada".into()));

    let snapshot = within("players", engine.snapshots.wait_for(|s| s.players.len() == 2))
        .await
        .unwrap()
        .clone();
    assert_eq!(snapshot.players, ["Ada", "Bob"]);
    assert_eq!(snapshot.player_id, Some(0));
    assert_eq!(engine.shared.game_id(), "k3x9");

    assert!(engine.interaction.rename("Ada|Lovelace"));
    assert_eq!(next_event(&mut events).await, Event::Received("name|AdaLovelace".into()));
    engine.shutdown().await;
}

#[tokio::test]
async fn reconnects_to_the_assigned_game() {
    let (addr, mut events) = start_server(vec![
        Script {
            lines: vec!["game_id|k3x9"],
            hang_up_after: Some(1),
        },
        Script::default(),
    ])
    .await;
    let engine = Engine::start(config(addr)).unwrap();

    assert_eq!(next_event(&mut events).await, Event::Connected(None));
    assert_eq!(next_event(&mut events).await, Event::Received("join|Ada".into()));

    // the second connection carries the id handed out by the first
    assert_eq!(next_event(&mut events).await, Event::Connected(Some("k3x9".into())));
    assert_eq!(next_event(&mut events).await, Event::Received("join|Ada".into()));

    let shared = engine.shared.clone();
    until("notice cleared", || !shared.notifications().has_persistent(CONNECTION_LOST)).await;
    engine.shutdown().await;
}

#[tokio::test]
async fn shows_connection_lost_while_server_is_down() {
    // nothing listens here once the listener is dropped
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let engine = Engine::start(config(addr)).unwrap();
    let shared = engine.shared.clone();
    until("connection lost notice", || shared.notifications().has_persistent(CONNECTION_LOST)).await;

    let notices = shared.notifications().active();
    assert_eq!(notices.len(), 1, "the notice is shown once across retries");
    engine.shutdown().await;
}

#[tokio::test]
async fn clicks_send_one_play_per_turn() {
    let (addr, mut events) = start_server(vec![Script {
        lines: vec![
            "player_id|0",
            "players|Ada|Bob",
            "begin",
            "draw_card|0|coppe:1",
            "draw_card|0|spade:re",
            "turn",
        ],
        hang_up_after: None,
    }])
    .await;
    let mut engine = Engine::start(config(addr)).unwrap();
    assert_eq!(next_event(&mut events).await, Event::Connected(None));
    assert_eq!(next_event(&mut events).await, Event::Received("join|Ada".into()));

    within("dealt hand", engine.snapshots.wait_for(|s| s.board.cards().count() == 2))
        .await
        .unwrap();
    let shared = engine.shared.clone();
    until("turn", || shared.playing()).await;

    let spade_re = Card::face("spade", "re").unwrap();
    assert_eq!(
        engine.interaction.click_card(&spade_re),
        Some(Outbound::Play {
            card: spade_re.clone()
        })
    );
    assert_eq!(next_event(&mut events).await, Event::Received("play|spade:re".into()));

    // out of turn until the server says otherwise
    assert_eq!(engine.interaction.click_card(&spade_re), None);
    let coppe = Card::face("coppe", "1").unwrap();
    assert_eq!(engine.interaction.click_card(&coppe), None);

    let snapshot = engine.snapshots.borrow().clone();
    let view = carte_client::BoardView::project(&snapshot.board);
    let hand = engine
        .variant
        .layout()
        .field("hand")
        .unwrap()
        .select("player", "self")
        .key()
        .unwrap()
        .to_string();
    assert!(view.fields.iter().any(|f| f.group == hand && f.cards.len() == 2));
    engine.shutdown().await;
}

#[tokio::test]
async fn losing_the_connection_ends_the_turn() {
    let (addr, mut events) = start_server(vec![
        Script {
            lines: vec!["player_id|0", "players|Ada|Bob", "turn"],
            hang_up_after: Some(2),
        },
        Script::default(),
    ])
    .await;
    let engine = Engine::start(config(addr)).unwrap();
    assert_eq!(next_event(&mut events).await, Event::Connected(None));
    assert_eq!(next_event(&mut events).await, Event::Received("join|Ada".into()));

    let shared = engine.shared.clone();
    until("turn", || shared.playing()).await;

    // any second message makes the server hang up
    assert!(engine.interaction.rename("Ada L"));
    assert_eq!(next_event(&mut events).await, Event::Received("name|Ada L".into()));
    until("turn cleared", || !shared.playing()).await;

    assert_eq!(next_event(&mut events).await, Event::Connected(None));
    assert!(!shared.playing());
    engine.shutdown().await;
}
