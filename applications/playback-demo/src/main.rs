/// Playback Demo - Scripted session against a simulated engine
use clap::Parser;
use soul_playback::{
    EngineThread, Format, FormatSupport, MessagePayload, PlaybackConfig, PlaybackManager,
    PlayerEvent, PlayerListener, Renderer, TrackType,
};
use soul_timeline::{MediaItem, MediaMetadata, RepeatMode};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod backend;

use backend::SimulatedBackend;

#[derive(Parser)]
#[command(name = "playback-demo")]
#[command(about = "Drive a playback manager through a scripted session", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "PLAYBACK_DEMO_CONFIG")]
    config: Option<PathBuf>,

    /// Number of tracks in the playlist
    #[arg(long, default_value_t = 3)]
    tracks: usize,

    /// Length of each track in milliseconds
    #[arg(long, default_value_t = 800)]
    track_ms: u64,

    /// Engine tick in milliseconds
    #[arg(long, default_value_t = 20)]
    tick_ms: u64,
}

/// Logs every event the player publishes
struct EventLogger;

impl PlayerListener for EventLogger {
    fn on_event(&mut self, event: &PlayerEvent) {
        match event {
            PlayerEvent::MediaItemTransition { media_item, reason } => {
                tracing::info!(
                    media_id = media_item.as_ref().map(|m| m.media_id.as_str()),
                    ?reason,
                    "Media item transition"
                );
            }
            PlayerEvent::PlayerError { error } => {
                tracing::error!("Player error: {}", error);
            }
            other => tracing::debug!(event = ?other, "Player event"),
        }
    }
}

/// Audio sink that only reports what it was told
struct ConsoleSpeaker;

impl Renderer for ConsoleSpeaker {
    fn track_type(&self) -> TrackType {
        TrackType::Audio
    }

    fn supports_format(&self, format: &Format) -> FormatSupport {
        match format.sample_mime_type.as_str() {
            "audio/flac" | "audio/mpeg" | "audio/opus" => FormatSupport::Handled,
            _ => FormatSupport::UnsupportedSubtype,
        }
    }

    fn handle_message(&self, payload: &MessagePayload) {
        tracing::info!(?payload, "Speaker received message");
    }
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "playback_demo=info,soul_playback=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = PlaybackConfig::load(cli.config.as_deref())?;
    let tick = Duration::from_millis(cli.tick_ms.max(1));

    let mut player = PlaybackManager::builder(config)
        .renderer(Arc::new(ConsoleSpeaker))
        .build(|ctx| {
            EngineThread::spawn(SimulatedBackend::new(tick), ctx.renderers, ctx.updates, tick)
        })?;
    player.add_listener(Box::new(EventLogger));

    run_session(&mut player, &cli)?;

    player.release()?;
    tracing::info!("Session finished");
    Ok(())
}

fn run_session(player: &mut PlaybackManager, cli: &Cli) -> anyhow::Result<()> {
    let track_length = Duration::from_millis(cli.track_ms);
    let items: Vec<MediaItem> = (1..=cli.tracks)
        .map(|n| {
            MediaItem::new(format!("track-{n}"), format!("file:///music/track-{n}.flac"))
                .with_duration(track_length)
                .with_metadata(MediaMetadata {
                    title: Some(format!("Track {n}")),
                    ..Default::default()
                })
        })
        .collect();

    player.set_media_items(items, true)?;
    player.prepare()?;
    player.play()?;
    report(player, "Playing");
    pump(player, track_length + track_length / 2)?;
    report(player, "After one and a half tracks");

    player.seek_to_next()?;
    report(player, "Skipped ahead (masked)");
    pump(player, track_length / 4)?;

    player.set_repeat_mode(RepeatMode::All)?;
    player.set_volume(0.5)?;
    player.add_media_item(
        MediaItem::new("encore", "file:///music/encore.flac").with_duration(track_length),
    )?;
    report(player, "Encore queued");
    pump(player, track_length * 2)?;

    player.seek_back()?;
    player.pause()?;
    pump(player, track_length / 4)?;
    report(player, "Paused");

    player.stop()?;
    pump(player, tick_margin(cli))?;
    report(player, "Stopped");
    Ok(())
}

/// Drain engine confirmations for `duration`
fn pump(player: &mut PlaybackManager, duration: Duration) -> anyhow::Result<()> {
    let deadline = Instant::now() + duration;
    loop {
        let now = Instant::now();
        if now >= deadline {
            return Ok(());
        }
        player.poll_updates(deadline - now)?;
    }
}

fn tick_margin(cli: &Cli) -> Duration {
    Duration::from_millis(cli.tick_ms.max(1) * 5)
}

fn report(player: &PlaybackManager, label: &str) {
    tracing::info!(
        state = ?player.get_playback_state(),
        media_id = player.get_current_media_item().map(|m| m.media_id.as_str()),
        index = player.get_current_media_item_index(),
        position_ms = player.get_current_position_ms(),
        pending = player.pending_operation_count(),
        "{}",
        label
    );
}
