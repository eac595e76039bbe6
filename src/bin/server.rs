use std::sync::Arc;

use retainer_portal::server::config::ServerConfig;
use retainer_portal::web;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,retainer_portal=debug")),
        )
        .init();

    let config = Arc::new(ServerConfig::from_env()?);
    let db = sea_orm::Database::connect(&config.database_url).await?;

    let app = web::create_router(db, config.clone());

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "retainer portal backend listening");
    axum::serve(listener, app).await?;

    Ok(())
}
