#![forbid(unsafe_code)]
#![deny(rust_2018_idioms, clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

use anyhow::{Context, Result};
use appsources::{
    dirs::Dirs,
    handlers::AppState,
    logging,
    repositories::{ProductRepository, RepoRepository, SettingsRepository},
    routes,
};
use tokio::net::TcpListener;
use tokio_shutdown::Shutdown;
use tracing::{Level, info};

#[tokio::main]
async fn main() -> Result<()> {
    let dirs = Dirs::new()?;
    let settings = SettingsRepository::init(dirs.data_dir()).await?;

    let level = settings
        .get_log_level()
        .await
        .parse::<Level>()
        .context("invalid log level in settings")?;
    let log_level = logging::init(level);

    let addr = settings.get_socket_addr().await;
    let state = AppState::new(
        RepoRepository::open(dirs.data_dir()).await?,
        ProductRepository::open(dirs.data_dir()).await?,
        settings,
        log_level,
    );

    let shutdown = Shutdown::new()?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed binding to {addr}"))?;

    info!(data_dir = %dirs.data_dir(), "Listening on http://{addr}");

    axum::serve(listener, routes::build(state))
        .with_graceful_shutdown(shutdown.handle())
        .await?;

    Ok(())
}
