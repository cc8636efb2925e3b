mod api;
mod middleware;
mod scheduler;

use std::sync::Arc;

use pricedrop_engine::TickOptions;
use pricedrop_shopify::ShopifyClient;
use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, default_rate_limit_state, AppState},
    middleware::AuthState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = pricedrop_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = pricedrop_db::PoolConfig::from_app_config(&config);
    let pool = pricedrop_db::connect_pool(&config.database_url, pool_config).await?;
    let applied = pricedrop_db::run_migrations(&pool).await?;
    tracing::info!(applied, "migrations up to date");

    let shopify = Arc::new(ShopifyClient::new(
        &config.shopify_store_domain,
        &config.shopify_access_token,
        &config.shopify_api_version,
        config.shopify_timeout_secs,
    )?);
    let tick = TickOptions::from_app_config(&config);

    let _scheduler = scheduler::build_scheduler(
        config.tick_cron.as_deref(),
        pool.clone(),
        Arc::clone(&shopify),
        tick,
    )
    .await?;

    let auth = AuthState::from_config(&config)?;
    let app = build_app(
        AppState {
            pool,
            shopify,
            tick,
        },
        auth,
        default_rate_limit_state(),
    );

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, env = %config.env, "pricedrop server listening");
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
