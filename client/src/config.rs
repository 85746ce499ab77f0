use rand::Rng;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

// ==== knobs ====
pub const RECONNECT_DELAY: Duration = Duration::from_secs(5);
pub const TRANSITION_DURATION: Duration = Duration::from_millis(500);
pub const NOTIFICATION_TTL: Duration = Duration::from_secs(5);

/// How much the local renderer animates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Motion {
    /// Wait for transitions to report completion.
    #[default]
    Full,
    /// Transitions are short: wait half a nominal duration.
    Reduced,
    /// Nothing animates; settle immediately.
    None,
}

impl FromStr for Motion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "full" => Ok(Motion::Full),
            "reduced" => Ok(Motion::Reduced),
            "none" => Ok(Motion::None),
            other => Err(format!("unknown motion setting {other:?} (full, reduced, none)")),
        }
    }
}

impl fmt::Display for Motion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Motion::Full => "full",
            Motion::Reduced => "reduced",
            Motion::None => "none",
        })
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Page the game is played from, e.g. `http://localhost:8080/briscola`.
    pub page_url: Url,
    /// Empty lets the server pick one and announce it with `game_id`.
    pub game_id: String,
    pub name: String,
    pub reconnect_delay: Duration,
    pub transition_duration: Duration,
    pub motion: Motion,
    pub notification_ttl: Duration,
}

impl ClientConfig {
    pub fn new(page_url: Url) -> Self {
        ClientConfig {
            page_url,
            game_id: String::new(),
            name: guest_name(),
            reconnect_delay: RECONNECT_DELAY,
            transition_duration: TRANSITION_DURATION,
            motion: Motion::default(),
            notification_ttl: NOTIFICATION_TTL,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.name = if name.trim().is_empty() {
            guest_name()
        } else {
            name.trim().to_string()
        };
        self
    }

    pub fn with_game_id(mut self, game_id: impl Into<String>) -> Self {
        self.game_id = game_id.into().trim().to_string();
        self
    }

    pub fn with_motion(mut self, motion: Motion) -> Self {
        self.motion = motion;
        self
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Last path segment of the page, which names the game variant.
    pub fn game_type(&self) -> Option<&str> {
        self.page_url
            .path_segments()?
            .filter(|s| !s.is_empty())
            .last()
    }
}

pub fn guest_name() -> String {
    format!("Guest {}", rand::thread_rng().gen_range(0..1_000_000))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_names_become_guests() {
        let url = Url::parse("http://localhost:8080/scopa").unwrap();
        let config = ClientConfig::new(url).with_name("   ");
        assert!(config.name.starts_with("Guest "));
        assert_eq!(config.with_name(" Ada ").name, "Ada");
    }

    #[test]
    fn game_type_is_last_path_segment() {
        let url = Url::parse("https://cards.example/games/briscola/").unwrap();
        assert_eq!(ClientConfig::new(url).game_type(), Some("briscola"));
        let url = Url::parse("http://localhost/").unwrap();
        assert_eq!(ClientConfig::new(url).game_type(), None);
    }

    #[test]
    fn parses_motion() {
        assert_eq!("reduced".parse::<Motion>(), Ok(Motion::Reduced));
        assert!("fast".parse::<Motion>().is_err());
    }
}
