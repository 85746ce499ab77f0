use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use url::Url;

use carte_client::{ClientConfig, Motion};

mod interactive;
mod replay;

#[derive(Parser)]
#[command(name = "carte")]
#[command(about = "Briscola and Scopa table client")]
struct Cli {
    /// Debug log output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum MotionArg {
    Full,
    Reduced,
    None,
}

impl From<MotionArg> for Motion {
    fn from(arg: MotionArg) -> Self {
        match arg {
            MotionArg::Full => Motion::Full,
            MotionArg::Reduced => Motion::Reduced,
            MotionArg::None => Motion::None,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Join a game and play from the terminal
    Play {
        /// Game page, e.g. http://localhost:8080/briscola
        #[arg(env = "CARTE_SERVER")]
        url: Url,
        /// Game to join; a new one is created when omitted
        #[arg(short, long, env = "CARTE_GAME_ID", default_value = "")]
        game: String,
        /// Name shown to the other players
        #[arg(short, long, env = "CARTE_NAME", default_value = "")]
        name: String,
        /// Pacing between animated moves
        #[arg(long, value_enum, default_value = "reduced")]
        motion: MotionArg,
        /// Seconds between reconnect attempts
        #[arg(long, default_value = "5")]
        reconnect_secs: u64,
    },
    /// Apply a recorded transcript offline and print the resulting table
    Replay {
        /// One server message per line
        file: PathBuf,
        /// Game the transcript belongs to
        #[arg(short, long, default_value = "briscola")]
        game: String,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Play {
            url,
            game,
            name,
            motion,
            reconnect_secs,
        } => {
            let config = ClientConfig::new(url)
                .with_game_id(game)
                .with_name(name)
                .with_motion(motion.into())
                .with_reconnect_delay(Duration::from_secs(reconnect_secs));
            interactive::run(config).await
        }
        Commands::Replay { file, game, json } => {
            let view = replay::replay_file(&file, &game).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&view)?);
            } else {
                print!("{view}");
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn play_waits_briefly_by_default() {
        let cli = Cli::try_parse_from(["carte", "play", "http://localhost:8080/briscola"]).unwrap();
        let Commands::Play { motion, url, .. } = cli.command else {
            panic!("expected play");
        };
        assert_eq!(motion, MotionArg::Reduced);
        assert_eq!(url.path(), "/briscola");

        let cli = Cli::try_parse_from(["carte", "play", "http://h/scopa", "--motion", "full"]).unwrap();
        assert!(matches!(cli.command, Commands::Play { motion: MotionArg::Full, .. }));
    }
}
