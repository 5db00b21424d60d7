use anyhow::{Context, Result};
use avatar_talk::{
    create_router, resolve_selector, AppState, CaptureFeed, ChannelCapture, ChannelRecognizer,
    Config, HttpSignaling, RecognizerFeed, SessionConfig, SessionLifecycle, ViewPresenter,
    VoiceInput, WebRtcPeerConnection,
};
use clap::Parser;
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "avatar-talk", version, about = "Real-time avatar session controller")]
struct Cli {
    /// Config file path (extension optional)
    #[arg(long, default_value = "config/avatar-talk")]
    config: String,

    /// Avatar/session-profile id
    #[arg(long)]
    avatar: Option<String>,

    /// Page URL whose `avatar` query parameter selects the profile
    #[arg(long)]
    page_url: Option<String>,

    /// Remote media service base URL
    #[arg(long)]
    base_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut cfg = Config::load(&cli.config).context("Failed to load config")?;
    if let Some(base_url) = cli.base_url {
        cfg.server.base_url = base_url;
    }

    let avatar_id = resolve_selector(cli.avatar.as_deref(), cli.page_url.as_deref(), &cfg.avatar.id)?;

    info!("{} v{}", cfg.service.name, env!("CARGO_PKG_VERSION"));
    info!("Media service: {}", cfg.server.base_url);
    info!("Avatar: {}", avatar_id);

    let signaling = Arc::new(
        HttpSignaling::new(
            &cfg.server.base_url,
            cfg.server.request_timeout(),
            cfg.server.slow_offer_warn(),
        )
        .context("Failed to build signaling client")?,
    );
    let view = ViewPresenter::new();
    let mut lifecycle = SessionLifecycle::new(
        SessionConfig::from_config(&cfg, avatar_id),
        signaling,
        Arc::new(view.clone()),
    );

    let capture_feed = CaptureFeed::default();
    let recognizer_feed = RecognizerFeed::default();
    let voice = VoiceInput::new(
        Box::new(ChannelCapture::new(
            capture_feed.clone(),
            cfg.voice.microphone_enabled,
        )),
        Some(Box::new(ChannelRecognizer::new(recognizer_feed.clone()))),
    );

    let connection = Arc::new(
        WebRtcPeerConnection::new(&cfg.negotiation.ice_servers)
            .await
            .context("Failed to create peer connection")?,
    );

    let controller = match lifecycle.start(connection, voice).await {
        Ok(controller) => controller,
        Err(e) => {
            error!("{}", e.user_message());
            lifecycle.disconnect().await;
            return Err(e.into());
        }
    };

    let shutdown = Arc::new(Notify::new());
    let state = AppState {
        controller,
        session: lifecycle.session(),
        avatar: lifecycle.avatar().clone(),
        view,
        capture_feed,
        recognizer_feed,
        shutdown: shutdown.clone(),
    };

    let addr = format!("{}:{}", cfg.control.bind, cfg.control.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind control API on {}", addr))?;
    info!("Control API listening on {}", addr);

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(async move {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => info!("Ctrl-C received"),
                _ = shutdown.notified() => {}
            }
        })
        .await
        .context("Control API failed")?;

    lifecycle.disconnect().await;
    info!("Session closed");
    Ok(())
}
