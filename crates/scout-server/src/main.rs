mod api;
mod middleware;

use std::sync::Arc;

use anyhow::Context;
use scout_core::ScoringEngine;
use scout_marketplace::{MarketplaceApi, RyeClient};
use scout_research::{ImportMode, ImportOptions, Researcher, SearchStrategy};
use tracing_subscriber::EnvFilter;

use crate::api::{build_app, default_rate_limit_state, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Arc::new(scout_core::load_app_config()?);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = scout_db::PoolConfig::from_app_config(&config);
    let pool = scout_db::connect_pool(&config.database_url, pool_config).await?;
    scout_db::run_migrations(&pool).await?;

    let client = RyeClient::from_app_config(&config)
        .context("RYE_API_KEY and RYE_SHOPPER_IP are required to serve research requests")?;
    let api: Arc<dyn MarketplaceApi> = Arc::new(client);
    let policy = scout_core::load_scoring_policy(&config)?;
    let researcher = Researcher::new(
        Arc::clone(&api),
        SearchStrategy::hybrid(pool.clone(), api),
        ScoringEngine::new(policy),
    )
    .with_log(Arc::new(pool.clone()));

    let state = AppState {
        pool: pool.clone(),
        catalog: Arc::new(pool),
        researcher: Arc::new(researcher),
        import_options: ImportOptions::from_app_config(&config, ImportMode::FullRefresh),
    };
    let app = build_app(state, default_rate_limit_state());

    tracing::info!(addr = %config.bind_addr, env = %config.env, "scout-server listening");
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
