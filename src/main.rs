use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rolaju_api::api::handlers::{self, AppState};
use rolaju_api::config::Config;
use rolaju_api::core::contact::ContactRelay;
use rolaju_api::core::places::PlaceSearchService;
use rolaju_api::integrations::mail::SmtpMailTransport;
use rolaju_api::integrations::services::provider_from_config;

/// Main entry point for the application.
///
/// This function initializes the application, including:
/// - Logging and tracing.
/// - Configuration loading.
/// - SMTP mail transport.
/// - Geocoding provider client.
/// - HTTP routes and middleware (CORS, Rate Limiting, Body Limit).
///
/// It then starts the Axum server.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rolaju_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!("Configuration loaded successfully");

    let transport = SmtpMailTransport::from_config(&config)
        .map_err(|e| anyhow::anyhow!("Failed to create SMTP transport: {}", e))?;
    tracing::info!("✓ SMTP transport initialized: {}", config.smtp_url);

    let provider = provider_from_config(&config)
        .map_err(|e| anyhow::anyhow!("Failed to create place provider: {}", e))?;
    tracing::info!("✓ Place provider initialized: {}", provider.name());

    // Build application state
    let app_state = Arc::new(AppState {
        contact_relay: ContactRelay::new(Arc::new(transport), &config),
        places: PlaceSearchService::new(provider),
        config: config.clone(),
    });

    let app = handlers::app(app_state)
        .map_err(|e| anyhow::anyhow!("Failed to build router: {}", e))?;

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Servidor rodando na porta {}", config.port);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await?;

    Ok(())
}
