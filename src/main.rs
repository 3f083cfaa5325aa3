use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use note_board::settings::Settings;
use note_board::{api, database, ui};

#[tokio::main]
async fn main() -> note_board::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,note_board=debug")),
        )
        .init();

    let settings = Settings::new()?;
    tracing::debug!(
        server = ?settings.server,
        database = ?settings.database,
        pages = ?settings.pages,
        "loaded settings"
    );

    let addr : SocketAddr = settings.server.addr.parse()?;
    let token_lifetime = settings.auth.token_lifetime()?;

    let server = Arc::new(api::ServerInner {
        server_name :    settings.server.name,
        token_secret :   settings.auth.token_secret.into_bytes(),
        token_lifetime,
        page_size :      settings.pages.page_size,
        static_dir :     settings.server.static_dir,
        db :             database::Db::new(&settings.database.path)?,
        render :         ui::Renderer::new()?,
    });

    tracing::info!(%addr, "listening");

    warp::serve(api::routes(&server)).run(addr).await;

    Ok(())
}
