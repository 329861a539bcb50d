use std::{sync::Arc, time::Duration};

use ghiblibrary::{
    AppState,
    catalog::Catalog,
    clock::SystemClock,
    config::Config,
    db,
    ghibli::GhibliClient,
    routes,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,ghiblibrary=debug,sqlx=warn".to_string()),
        )
        .init();

    let config = Arc::new(Config::from_env()?);

    let http = wreq::Client::builder().timeout(Duration::from_secs(30)).build()?;

    let db = db::connect_and_migrate(&config.database_url).await?;

    let source = GhibliClient::new(http, config.ghibli_base_url.clone(), config.ghibli_rps);
    let clock = Arc::new(SystemClock);
    let catalog = Arc::new(Catalog::new(Arc::new(source), clock.clone(), config.catalog_ttl_ms));

    let state = Arc::new(AppState::new(config.clone(), db, catalog, clock));
    let app = routes::router(state);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    tracing::info!(addr = %config.addr, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}
