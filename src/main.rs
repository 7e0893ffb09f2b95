use anyhow::Context;
use dotenvy::dotenv;
use tokio::net::TcpListener;

use volunteer_server::config::Settings;
use volunteer_server::database;
use volunteer_server::routes::create_routes;
use volunteer_server::state::AppState;
use volunteer_server::utils::logging::init_logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let settings = Settings::load().context("Failed to load configuration")?;
    init_logging(&settings.logging);

    let pool = database::connect(&settings.database)
        .await
        .context("Failed to connect to database")?;
    database::migrate(&pool)
        .await
        .context("Failed to run migrations")?;

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let bootstrap_admin = settings.auth.bootstrap_admin.clone();
    let state = AppState::new(pool, settings);

    if let Some(admin) = bootstrap_admin {
        state
            .auth
            .ensure_bootstrap_admin(&admin)
            .await
            .context("Failed to create bootstrap admin")?;
    }

    let app = create_routes(state);

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Server running at http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server failed")?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
