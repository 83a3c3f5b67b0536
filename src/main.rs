use std::{path::PathBuf, sync::Arc};

use clap::Parser;

use crate::{
    config::LyricFixConfig,
    lyrics::LrcLibClient,
    overlay::{
        handler::{OverlayHandler, Session},
        plain_backend::PlainBackend,
        tui_backend::TerminalUiBackend,
    },
    player::{JsonFileSource, PlaylistEntry, SimulatedPlayer},
    tracker::{MetadataSource, PreferredSource},
};

mod config;
mod error;
mod event;
mod logging;
mod lyrics;
mod overlay;
mod player;
mod ticker;
mod tracker;

/// Time-synced lyrics for whatever is playing
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Config file, defaults to ~/.config/lyricfix/config.toml
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Track to play as "Title|Artist|Seconds"; repeat for a playlist
    #[arg(short = 't', long = "track", required = true)]
    tracks: Vec<PlaylistEntry>,
    /// Seconds into the first track to start from
    #[arg(long, default_value_t = 0.0)]
    start: f64,
    /// Now-playing JSON file consulted when the player reports no title
    #[arg(long)]
    now_playing: Option<PathBuf>,
    /// Print lines as they become active instead of drawing the TUI
    #[arg(long)]
    plain: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = Arc::new(LyricFixConfig::load(args.config.as_deref()).await?);
    let _guard = logging::init_logging(&config.logging, &config::config_dir()?)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        tracks = args.tracks.len(),
        api = %config.api.lyrics_api_url,
        "lyricfix.start"
    );

    let fetcher = Arc::new(LrcLibClient::new(&config.api)?);
    let (event_tx, event_rx) = flume::unbounded();
    let session = Session::new(fetcher, event_tx, config.general.duration_fallback);

    let player = SimulatedPlayer::new(args.tracks, args.start);
    let scraped = args
        .now_playing
        .map(|path| Arc::new(JsonFileSource::new(path)) as Arc<dyn MetadataSource>);
    let source = Arc::new(PreferredSource::new(Arc::new(player.clone()), scraped));

    let result = if args.plain {
        OverlayHandler::new(session, PlainBackend)
            .run(source, player, event_rx, config)
            .await
    } else {
        OverlayHandler::new(session, TerminalUiBackend::default())
            .run(source, player, event_rx, config)
            .await
    };
    if let Err(e) = &result {
        tracing::error!(error = %e, "lyricfix.exit");
    }
    result
}
