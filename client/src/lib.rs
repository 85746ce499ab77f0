//! Client side of the card table: mirrors the server's game on a local board
//! and animates it one command at a time.

pub mod board;
pub mod channel;
pub mod commands;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod games;
pub mod interaction;
pub mod notifications;
pub mod render;
pub mod session;
pub mod state;
pub mod transitions;

pub use config::{ClientConfig, Motion};
pub use engine::Engine;
pub use render::{BoardView, SessionView};
pub use session::{Session, Snapshot};
