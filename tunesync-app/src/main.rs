mod console;
mod display;

use std::fs::File;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use tunesync_core::{
    BroadcastSink, CoreError, IntervalScheduler, LocalLyricsStorage, LyricStore, LyricsProvider,
    PlaybackSyncEngine, TunesyncConfig,
};
use tunesync_lyrics_lrclib::LrclibProvider;
use tunesync_spotify_api::{
    SpotifyAuth, SpotifyPlaybackSource, SpotifyProviderConfig, SPOTIFY_CONFIG_TEMPLATE,
};

fn main() {
    // Check config for logging.enabled before full config load
    let file_logging_enabled = check_file_logging_enabled();
    init_tracing(file_logging_enabled);

    let provider_templates: &[&str] = &[SPOTIFY_CONFIG_TEMPLATE];
    let config = match TunesyncConfig::load_or_create(provider_templates) {
        Ok(config) => config,
        Err(e @ CoreError::ConfigNotFound { .. }) => {
            // Config was just created from the template
            info!("{e}");
            std::process::exit(0);
        }
        Err(e) => {
            error!("{e}");
            std::process::exit(1);
        }
    };

    let spotify_config = match spotify_config(&config) {
        Ok(spotify_config) => spotify_config,
        Err(e) => {
            error!("{e}");
            error!(
                "Edit {} and restart",
                TunesyncConfig::config_path().display()
            );
            std::process::exit(1);
        }
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            error!("Failed to create tokio runtime: {e}");
            std::process::exit(1);
        }
    };

    // Create shared cancellation token for graceful shutdown
    let cancel_token = CancellationToken::new();

    let ctrlc_token = cancel_token.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received Ctrl+C, shutting down gracefully...");
        ctrlc_token.cancel();
    }) {
        error!("Failed to set Ctrl+C handler: {}", e);
    }

    let result = runtime.block_on(run(&config, spotify_config, cancel_token));
    // A pending stdin read would otherwise block runtime drop
    runtime.shutdown_background();

    if let Err(e) = result {
        error!("{e}");
        std::process::exit(1);
    }
}

/// Wire the Spotify source, lyric providers, and display into one engine and
/// run it alongside the console until cancelled.
async fn run(
    config: &TunesyncConfig,
    spotify_config: SpotifyProviderConfig,
    cancel_token: CancellationToken,
) -> Result<(), CoreError> {
    let auth = Arc::new(SpotifyAuth::new(
        spotify_config.client_id,
        spotify_config.client_secret,
        spotify_config.oauth_redirect_uri,
    ));
    auth.ensure_authenticated().await?;
    let source = Arc::new(SpotifyPlaybackSource::new(auth, spotify_config.device_id));

    let providers = create_providers();
    let provider_names: Vec<_> = providers.iter().map(|p| p.name()).collect();
    info!(
        "Initialized {} lyrics provider(s): {:?}",
        providers.len(),
        provider_names
    );

    let local = LocalLyricsStorage::new(config.lyrics.local_dir());
    info!("Local lyrics directory: {}", local.dir().display());
    let store = LyricStore::new(providers, local);

    let sink = Arc::new(BroadcastSink::new());
    let display = tokio::spawn(display::log_field_updates(sink.subscribe()));

    let scheduler = IntervalScheduler::new(
        config.sync.info_interval(),
        config.sync.progress_interval(),
    );

    let engine = PlaybackSyncEngine::new(source, store, sink, Box::new(scheduler), config)
        .with_cancel_token(cancel_token.clone());
    let handle = engine.handle();

    let console = tokio::spawn(console::run_console(handle, cancel_token.clone()));

    // The engine owns the sink, so the display task ends once it returns
    engine.run().await;
    cancel_token.cancel();
    let _ = console.await;
    let _ = display.await;

    info!("Shutdown complete");
    Ok(())
}

/// Read and validate the `[providers.spotify]` section
fn spotify_config(config: &TunesyncConfig) -> Result<SpotifyProviderConfig, CoreError> {
    let spotify_config =
        SpotifyProviderConfig::from_providers(&config.providers)?.ok_or_else(|| {
            CoreError::ConfigMissingField {
                field: "providers.spotify".into(),
            }
        })?;
    spotify_config.validate()?;
    Ok(spotify_config)
}

fn create_providers() -> Vec<Arc<dyn LyricsProvider>> {
    let mut providers: Vec<Arc<dyn LyricsProvider>> = Vec::new();
    info!("Initializing LRCLIB provider");
    match LrclibProvider::new() {
        Ok(provider) => providers.push(Arc::new(provider)),
        Err(e) => error!("Failed to create LRCLIB provider: {}", e),
    }
    providers
}

/// Quick check of `logging.enabled` without loading the full config
fn check_file_logging_enabled() -> bool {
    // Minimal structs to parse just the logging.enabled field
    #[derive(serde::Deserialize)]
    struct PartialConfig {
        #[serde(default)]
        logging: PartialLoggingConfig,
    }
    #[derive(serde::Deserialize, Default)]
    struct PartialLoggingConfig {
        #[serde(default)]
        enabled: bool,
    }

    let Ok(content) = std::fs::read_to_string(TunesyncConfig::config_path()) else {
        return false;
    };

    toml::from_str::<PartialConfig>(&content)
        .map(|c| c.logging.enabled)
        .unwrap_or(false)
}

/// Initialize tracing with console output and optional file logging
fn init_tracing(file_logging_enabled: bool) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,rspotify_http=warn"));

    let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    if file_logging_enabled {
        let log_path = tunesync_core::log_file_path();

        if let Some(parent) = log_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }

        match File::create(&log_path) {
            Ok(file) => {
                let file_layer = tracing_subscriber::fmt::layer()
                    .with_writer(Arc::new(file))
                    .with_ansi(false);

                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt_layer)
                    .with(file_layer)
                    .init();

                return;
            }
            Err(e) => {
                eprintln!("Failed to create log file at {}: {e}", log_path.display());
            }
        }
    }

    // Fallback: console only
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}
