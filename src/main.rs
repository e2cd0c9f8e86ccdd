use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::limit::RequestBodyLimitLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use aq_verdict_api::api;
use aq_verdict_api::config::Config;
use aq_verdict_api::handlers::AppState;
use aq_verdict_api::orchestrator::DecisionOrchestrator;

/// Main entry point for the application.
///
/// This function initializes the application, including:
/// - Logging and tracing.
/// - Configuration loading.
/// - The decision pipeline and its HTTP clients.
/// - HTTP routes and middleware (CORS, body limit, rate limiting).
///
/// It then starts the Axum server.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "aq_verdict_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;

    let orchestrator = DecisionOrchestrator::from_config(&config)?;
    tracing::info!(
        "Decision pipeline ready (default location: {} {})",
        config.default_location.display_name,
        config.default_location.coordinates
    );

    let app_state = Arc::new(AppState {
        config: config.clone(),
        orchestrator: Arc::new(orchestrator),
    });

    // Every analysis fans out to three paid upstream APIs: 2 req/sec per IP, burst of 5
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(2)
            .burst_size(5)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .ok_or_else(|| anyhow::anyhow!("Invalid rate limiter configuration"))?,
    );

    let protected_routes = api::api_routes().layer(
        ServiceBuilder::new()
            // Request size limit: 64KB is far above any valid analyze body
            .layer(RequestBodyLimitLayer::new(64 * 1024))
            .layer(GovernorLayer {
                config: governor_conf,
            }),
    );

    // Health check bypasses rate limiting
    let app = api::router(app_state, protected_routes);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
