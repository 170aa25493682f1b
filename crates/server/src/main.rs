// crates/server/src/main.rs
//! Trailview server binary.
//!
//! Loads (or seeds) the config file, binds the HTTP server, and serves the
//! API plus the static frontend when one is present.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use trailview_core::ConfigStore;
use trailview_server::create_app_with_static;

/// Multi-directory session viewer for AI coding-assistant transcripts.
#[derive(Debug, Parser)]
#[command(name = "trailview", version, about)]
struct Cli {
    /// Port to listen on (overrides the config value)
    #[arg(short, long)]
    port: Option<u16>,

    /// Config file location (overrides TRAILVIEW_CONFIG and the default path)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the default config and exit
    #[arg(long)]
    init: bool,
}

/// Static frontend directory: explicit override, else ./public if present,
/// else API-only mode.
fn get_static_dir() -> Option<PathBuf> {
    std::env::var("STATIC_DIR")
        .ok()
        .map(PathBuf::from)
        .or_else(|| {
            let public = PathBuf::from("public");
            public.exists().then_some(public)
        })
}

#[tokio::main]
async fn main() -> Result<()> {
    // Quiet by default; RUST_LOG opts into more.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .compact()
        .init();

    let cli = Cli::parse();

    let store = match cli.config {
        Some(path) => ConfigStore::new(path),
        None => ConfigStore::from_env()?,
    };

    if cli.init {
        store.init().await?;
        eprintln!("Config initialized at {}", store.path().display());
        return Ok(());
    }

    // Seed the default config on first run, like `--init` would.
    store.init().await?;
    let snapshot = store.load().await?;

    let port = cli.port.unwrap_or(snapshot.server.port);
    let profiles = snapshot.enabled_directories().count();

    let app = create_app_with_static(store.clone(), get_static_dir());

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    eprintln!("\n  trailview v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("  {} profile(s) \u{2014} config at {}", profiles, store.path().display());
    eprintln!("  \u{2192} http://localhost:{}\n", port);

    axum::serve(listener, app).await?;

    Ok(())
}
