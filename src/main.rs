use anyhow::Context;

use pantry_api::{app, config, database, session::SessionStore, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL etc.
    let _ = dotenvy::dotenv();

    let config = config::config();

    tracing_subscriber::fmt::init();
    tracing::info!("Starting Pantry API in {:?} mode", config.environment);

    let pool = database::manager::connect().await?;
    let state = AppState {
        pool,
        sessions: SessionStore::new(),
    };

    let app = app(state);

    let bind_addr = format!("0.0.0.0:{}", config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    println!("🥖 Pantry API server listening on http://{}", bind_addr);

    axum::serve(listener, app).await.context("server")?;
    Ok(())
}
