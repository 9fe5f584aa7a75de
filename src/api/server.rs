use axum::{
    routing::{get, post},
    Router,
};
use std::env;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter, prelude::*};
use opentelemetry::KeyValue;
use opentelemetry::trace::TracerProvider as _;  // Import as _ since we only need the trait methods
use opentelemetry_sdk::{trace::{SdkTracerProvider, Sampler}, Resource};
use opentelemetry_otlp::{SpanExporter, WithExportConfig};
use tracing_opentelemetry::OpenTelemetryLayer;

use crate::api::handlers::{
    achievement_metadata_handler, award_points_handler, create_composite_handler,
    evolve_token_handler, get_achievement_handler, get_token_handler, logout_handler,
    owner_tokens_handler, stacking_opportunities_handler, submit_achievement_handler,
    token_history_handler, verify_achievement_handler,
};
use crate::api::state::AppState;
use crate::auth::InMemorySessionStore;
use crate::config::{ServerConfig, StoreBackend};
use crate::db::{self, InMemoryStore, PgTokenStore, TokenStore};
use crate::rules::{RuleTable, DEFAULT_RULE_TABLE};

const SERVICE_NAME: &str = "academic-nft";

pub fn init_tracing() {
    let enable_otel = env::var("OTEL_ENABLED").map(|v| v == "true").unwrap_or(false);

    let otel_endpoint = env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
        .unwrap_or_else(|_| "http://localhost:4318/v1/traces".to_string());

    // Span close events are noisy next to exported spans, so only log them without OTEL
    let subscriber = tracing_subscriber::registry()
        .with(
            if !enable_otel {
                fmt::layer()
                    .json()
                    .with_target(false)
                    .with_span_events(fmt::format::FmtSpan::CLOSE)
            } else {
                fmt::layer()
                    .json()
                    .with_target(false)
                    .with_span_events(fmt::format::FmtSpan::NONE)
            }
        )
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn,hyper=warn,tower=warn"))
        );

    if enable_otel {
        match init_opentelemetry(&otel_endpoint) {
            Ok(provider) => {
                opentelemetry::global::set_tracer_provider(provider.clone());

                // global::tracer returns a BoxedTracer, which OpenTelemetryLayer cannot use
                let tracer = provider.tracer(SERVICE_NAME);

                subscriber
                    .with(OpenTelemetryLayer::new(tracer))
                    .init();

                info!("OpenTelemetry enabled: {}", otel_endpoint);
            }
            Err(e) => {
                subscriber.init();
                tracing::error!("Failed to initialize OpenTelemetry: {}. Continuing with logs only.", e);
            }
        }
    } else {
        subscriber.init();
    }
}

fn init_opentelemetry(endpoint: &str) -> Result<SdkTracerProvider, Box<dyn std::error::Error>> {
    let environment = env::var("ENVIRONMENT")
        .unwrap_or_else(|_| "development".to_string());

    let service_name = env::var("OTEL_SERVICE_NAME")
        .unwrap_or_else(|_| SERVICE_NAME.to_string());

    // Default 0.01 = 1%
    let sampling_rate = env::var("OTEL_TRACE_SAMPLING_RATE")
        .ok()
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(0.01)
        .clamp(0.0, 1.0);

    let resource = Resource::builder()
        .with_attribute(KeyValue::new("service.name", service_name))
        .with_attribute(KeyValue::new("service.version", env!("CARGO_PKG_VERSION")))
        .with_attribute(KeyValue::new("deployment.environment", environment))
        .build();

    let exporter = if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        SpanExporter::builder()
            .with_http()
            .with_endpoint(endpoint)
            .build()?
    } else {
        SpanExporter::builder()
            .with_tonic()
            .with_endpoint(endpoint)
            .build()?
    };

    let provider = SdkTracerProvider::builder()
        .with_resource(resource)
        .with_sampler(Sampler::TraceIdRatioBased(sampling_rate))
        .with_batch_exporter(exporter)
        .build();

    info!("OpenTelemetry sampling rate: {}%", sampling_rate * 100.0);

    Ok(provider)
}

/// Rule table from RULES_PATH, or the built-in table
pub fn load_rules(config: &ServerConfig) -> Result<RuleTable, Box<dyn std::error::Error>> {
    match &config.rules_path {
        Some(path) => {
            let rules = RuleTable::load(path)?;
            info!("Loaded rule table from {}", path.display());
            Ok(rules)
        }
        None => {
            info!("Using built-in rule table");
            Ok(DEFAULT_RULE_TABLE.clone())
        }
    }
}

async fn build_store(config: &ServerConfig) -> Result<Arc<dyn TokenStore>, Box<dyn std::error::Error>> {
    match config.store_backend {
        StoreBackend::Postgres => {
            let database_url = config
                .database_url
                .as_deref()
                .ok_or("DATABASE_URL must be set for the postgres store")?;
            let pool = db::create_pool(database_url, config.db_max_connections).await?;
            db::run_migrations(&pool).await?;
            Ok(Arc::new(PgTokenStore::new(pool)))
        }
        StoreBackend::Memory => {
            info!("Using in-memory store; data is lost on restart");
            Ok(Arc::new(InMemoryStore::new()))
        }
    }
}

/// Periodically drop idle sessions so the map does not grow without bound
fn spawn_session_sweeper(sessions: Arc<InMemorySessionStore>, every: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            let purged = sessions.purge_expired(chrono::Utc::now());
            if purged > 0 {
                info!(purged, remaining = sessions.len(), "Purged expired sessions");
            }
        }
    });
}

pub async fn build_state(config: &ServerConfig) -> Result<AppState, Box<dyn std::error::Error>> {
    let rules = load_rules(config)?;
    let store = build_store(config).await?;

    let sessions = Arc::new(InMemorySessionStore::new(chrono::Duration::seconds(
        config.session_idle_timeout_secs,
    )));
    let sweep_every = Duration::from_secs(config.session_idle_timeout_secs.clamp(60, 3600) as u64);
    spawn_session_sweeper(sessions.clone(), sweep_every);

    Ok(AppState {
        store,
        rules: Arc::new(rules),
        sessions,
        jwt_secret: Arc::from(config.jwt_secret.as_str()),
        image_base_uri: Arc::from(config.image_base_uri.as_str()),
    })
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        // Achievements
        .route("/achievements", post(submit_achievement_handler))
        .route("/achievements/{id}", get(get_achievement_handler))
        .route("/achievements/{id}/metadata", get(achievement_metadata_handler))
        // Tokens
        .route("/tokens/{id}", get(get_token_handler))
        .route("/tokens/{id}/history", get(token_history_handler))
        .route("/tokens/{id}/evolve", post(evolve_token_handler))
        .route("/owners/{owner_id}/tokens", get(owner_tokens_handler))
        // Stacking
        .route("/owners/{owner_id}/stacking-opportunities", get(stacking_opportunities_handler))
        .route("/composites", post(create_composite_handler))
        // Sessions
        .route("/auth/logout", post(logout_handler))
        // Verification service endpoints (private network, no authentication)
        .route("/internal/achievements/{id}/verify", post(verify_achievement_handler))
        .route("/internal/tokens/{id}/points", post(award_points_handler))
        // Health check endpoint
        .route("/health", get(health_check))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn health_check() -> &'static str {
    "OK"
}

pub async fn run_server() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    info!("Starting academic NFT evolution server");

    // Secrets may provide DATABASE_URL and JWT_SECRET, so load them before the config
    crate::secrets::load_secrets_from_manager().await?;
    let config = ServerConfig::from_env()?;

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install CTRL+C signal handler: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Shutting down gracefully...");
    };

    let state = build_state(&config).await?;
    let app = create_app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
