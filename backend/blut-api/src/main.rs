use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use anyhow::{anyhow, Context};
use blut_api::cache::FeedCache;
use blut_api::config::Config;
use blut_api::db::MIGRATOR;
use blut_api::error::{json_error_handler, path_error_handler, query_error_handler};
use blut_api::handlers::configure_routes;
use blut_api::middleware::{CorrelationIdMiddleware, MetricsMiddleware};
use blut_api::realtime::ChatHub;
use blut_api::services::{FeedRankingConfig, FeedRankingService, MediaStorage};
use blut_api::AppState;
use crypto_core::jwt;
use db_pool::{create_pool, DbConfig};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const SERVICE_NAME: &str = "blut-api";

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,actix_web=info,sqlx=warn".into());

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

fn build_cors(allowed_origins: &str) -> Cors {
    let mut cors = Cors::default();
    for origin in allowed_origins.split(',').map(str::trim).filter(|o| !o.is_empty()) {
        if origin == "*" {
            cors = cors.allow_any_origin();
        } else {
            cors = cors.allowed_origin(origin);
        }
    }
    cors.allow_any_method()
        .allow_any_header()
        .max_age(3600)
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = terminate.recv() => {},
                }
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

/// BluT API server
///
/// Serves the REST API under `/api`, the chat WebSocket at `/ws`, stored
/// media under `/uploads`, plus `/health` and `/metrics`.
#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = Config::from_env().map_err(|e| anyhow!("Failed to load configuration: {e}"))?;

    tracing::info!("Starting {} v{}", SERVICE_NAME, env!("CARGO_PKG_VERSION"));
    tracing::info!("Environment: {}", config.app.env);

    jwt::initialize_jwt_secret(
        &config.jwt.secret,
        chrono::Duration::hours(config.jwt.ttl_hours),
    )
    .context("Failed to initialize JWT secret")?;

    let db_cfg = DbConfig::new(
        SERVICE_NAME,
        &config.database.url,
        config.database.max_connections,
    );
    db_cfg.log_config();
    let db_pool = create_pool(db_cfg)
        .await
        .context("Failed to create database pool")?;

    MIGRATOR
        .run(&db_pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database migrations applied");

    let feed_cache = match &config.cache.redis_url {
        Some(url) => match FeedCache::connect(url, config.feed.cache_ttl_secs).await {
            Ok(cache) => {
                tracing::info!("Feed cache connected");
                Some(cache)
            }
            Err(e) => {
                tracing::warn!("Redis unavailable, feed will be ranked on every request: {}", e);
                None
            }
        },
        None => {
            tracing::info!("REDIS_URL not set; feed cache disabled");
            None
        }
    };

    let storage = MediaStorage::from_config(&config);
    storage
        .ensure_dir()
        .await
        .with_context(|| format!("Failed to create upload dir {}", storage.root().display()))?;

    let feed = Arc::new(FeedRankingService::new(
        db_pool.clone(),
        feed_cache,
        FeedRankingConfig::from(&config.feed),
    ));

    let bind_address = format!("{}:{}", config.app.host, config.app.port);
    let config = Arc::new(config);

    let state = AppState {
        db: db_pool,
        config: config.clone(),
        hub: ChatHub::new(),
        storage,
        feed,
    };

    tracing::info!("Starting HTTP server at {}", bind_address);

    let server = HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .app_data(web::JsonConfig::default().error_handler(json_error_handler))
            .app_data(web::QueryConfig::default().error_handler(query_error_handler))
            .app_data(web::PathConfig::default().error_handler(path_error_handler))
            .wrap(MetricsMiddleware)
            .wrap(CorrelationIdMiddleware)
            .wrap(tracing_actix_web::TracingLogger::default())
            .wrap(build_cors(&config.cors.allowed_origins))
            .configure(configure_routes)
    })
    .bind(&bind_address)
    .with_context(|| format!("Failed to bind {bind_address}"))?
    .shutdown_timeout(30)
    .run();

    let handle = server.handle();
    tokio::spawn(async move {
        shutdown_signal().await;
        tracing::info!("Shutdown signal received");
        handle.stop(true).await;
    });

    server.await.context("HTTP server failed")?;

    tracing::info!("{} shut down", SERVICE_NAME);
    Ok(())
}
