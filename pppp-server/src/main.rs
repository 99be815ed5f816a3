//! PPPP camera bridge entry point.
//!
//! ```text
//! pppp-server                  Connect to the camera and serve /stream
//! pppp-server --config <path>  Load a custom config TOML
//! pppp-server --gen-config     Write default config to stdout
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use pppp_core::{Plaintext, Session};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use pppp_server::config::ServerConfig;
use pppp_server::service::StreamServer;

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "pppp-server", about = "Serve a PPPP camera's video as MJPEG over HTTP")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "pppp-server.toml")]
    config: PathBuf,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // --gen-config: dump defaults and exit.
    if cli.gen_config {
        let text = toml::to_string_pretty(&ServerConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    // Load config.
    let config = ServerConfig::load(&cli.config);

    // Init tracing.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("pppp-server v{}", env!("CARGO_PKG_VERSION"));
    info!("discovery target: {}", config.network.broadcast_addr);
    info!("HTTP address: {}", config.network.http_addr);

    let session_config = config.to_session_config();
    info!(
        "waiting up to {:?} for a camera",
        session_config.connect_timeout
    );

    let mut session = match Session::connect(session_config, Arc::new(Plaintext)).await {
        Ok(session) => session,
        Err(e) => {
            error!("could not connect to camera: {e}");
            return Err(e.into());
        }
    };
    if let Some(addr) = session.remote_addr().await {
        info!("connected to camera at {addr}");
    }

    session.request_video_stream().await?;
    info!("video stream requested");

    let cancel = CancellationToken::new();
    let server = StreamServer::new(config.session.frame_queue_capacity);
    let fanout = match session.take_frames() {
        Some(frames) => server.spawn_fanout(frames, cancel.clone()),
        None => return Err("frame stream already taken".into()),
    };

    // Ctrl-C handler.
    let stop = cancel.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Ctrl-C received, shutting down");
        stop.cancel();
    });

    let listener = TcpListener::bind(config.network.http_addr).await?;
    server.serve(listener, cancel.clone()).await;

    session.close().await;
    fanout.await.ok();
    info!("stopped");

    Ok(())
}
