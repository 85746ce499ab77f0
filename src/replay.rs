use anyhow::Context;
use std::path::Path;
use url::Url;

use carte_client::engine::{assemble, variant_for};
use carte_client::{ClientConfig, Motion, SessionView};

/// Feeds a transcript through a fresh session with animations off. Lines
/// that fail are logged and skipped, as they would be live.
pub async fn replay_lines<'a>(
    game: &str,
    lines: impl IntoIterator<Item = &'a str>,
) -> anyhow::Result<SessionView> {
    let page = Url::parse(&format!("http://localhost/{game}"))?;
    let config = ClientConfig::new(page).with_motion(Motion::None);
    let variant = variant_for(&config)?;
    let parts = assemble(variant, &config)?;
    let mut dispatcher = parts.dispatcher;

    for (n, line) in lines.into_iter().enumerate() {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        // tolerate transcripts copied from a log
        let line = line.strip_prefix("<< ").unwrap_or(line);
        if let Err(e) = dispatcher.handle(line).await {
            tracing::warn!(line = n + 1, error = %e, "skipped");
        }
    }

    let snapshot = parts.snapshots.borrow().clone();
    Ok(SessionView::new(
        &snapshot,
        parts.shared.playing(),
        parts.shared.turn_status(),
        parts.shared.notifications().active(),
    ))
}

pub async fn replay_file(path: &Path, game: &str) -> anyhow::Result<SessionView> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    replay_lines(game, text.lines()).await
}
