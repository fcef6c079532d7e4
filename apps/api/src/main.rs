mod accounts;
mod auth;
mod cache;
mod config;
mod db;
mod errors;
mod interview;
mod llm_client;
mod models;
mod routes;
mod state;
mod storage;
#[cfg(test)]
mod testing;

use anyhow::Result;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::accounts::entitlement::PgEntitlementService;
use crate::accounts::rate_limit::RateLimiter;
use crate::accounts::resumes::{CachedResumeStore, PgResumeStore, ResumeStore};
use crate::cache::{Cache, RedisCache};
use crate::config::Config;
use crate::db::create_pool;
use crate::interview::engine::{EngineSettings, InterviewEngine};
use crate::interview::questions::QuestionGenerator;
use crate::interview::store::PgSessionStore;
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::state::AppState;
use crate::storage::S3VideoStorage;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("interview_api={}", &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting interview API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;

    // Initialize Redis
    let redis = redis::Client::open(config.redis_url.clone())?;
    let cache: Arc<dyn Cache> = Arc::new(RedisCache::new(redis));
    info!("Redis cache initialized");

    // Initialize S3 / MinIO
    let s3 = build_s3_client(&config).await;
    let videos = S3VideoStorage::new(s3, config.s3_bucket.clone(), config.s3_public_url.clone());
    info!("S3 client initialized (bucket: {})", config.s3_bucket);

    // Initialize LLM client
    let llm = LlmClient::new(config.anthropic_api_key.clone(), config.llm_max_attempts)?;
    info!(
        "LLM client initialized (model: {}, attempts: {})",
        llm_client::MODEL,
        config.llm_max_attempts
    );

    let resumes: Arc<dyn ResumeStore> = Arc::new(CachedResumeStore::new(
        PgResumeStore::new(db.clone()),
        cache.clone(),
        Duration::from_secs(config.resume_cache_ttl_secs),
    ));

    let settings = EngineSettings {
        free_tier_session: chrono::Duration::seconds(
            i64::try_from(config.free_tier_session_secs)?,
        ),
    };
    info!(
        "Free tier: {}s per session, {} interviews per month",
        config.free_tier_session_secs, config.free_interviews_per_month
    );

    let engine = InterviewEngine::new(
        Arc::new(PgSessionStore::new(db.clone())),
        resumes.clone(),
        QuestionGenerator::new(Arc::new(llm)),
        Arc::new(videos),
        settings,
    );

    // Build app state
    let state = AppState {
        engine: Arc::new(engine),
        resumes,
        entitlements: Arc::new(PgEntitlementService::new(
            db,
            config.free_interviews_per_month,
        )),
        rate_limiter: RateLimiter::new(cache, config.rate_limit_per_minute),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins to the web client domain

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
async fn build_s3_client(config: &Config) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &config.aws_access_key_id,
        &config.aws_secret_access_key,
        None,
        None,
        "interview-static",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(credentials)
        .endpoint_url(&config.s3_endpoint)
        .load()
        .await;

    let s3_config = aws_sdk_s3::config::Builder::from(&s3_config)
        .force_path_style(true)
        .build();

    aws_sdk_s3::Client::from_conf(s3_config)
}
