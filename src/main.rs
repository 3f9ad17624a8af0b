use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::{AppState, router};
use healthdesk_core::{
    CoreConfig, PatientService, constants::DEFAULT_DATA_DIR, identity_scheme_from_env_value,
    store_backend_from_env_value, upload_keywords_from_env_value,
};

/// Main entry point for the HealthDesk server
///
/// Resolves configuration from the environment (a `.env` file is honoured), opens the record
/// store and serves the REST API with Swagger UI.
///
/// # Environment Variables
/// - `HEALTHDESK_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `HEALTHDESK_DATA_DIR`: Directory for the store file and uploads (default: "healthdesk_data")
/// - `HEALTHDESK_STORE`: `memory`, `json` or `csv` (default: `json`)
/// - `HEALTHDESK_IDENTITY`: `email`, `name-phone` or `generated` (default: `email`)
/// - `HEALTHDESK_KEYWORDS`: comma-separated keywords scanned for in text uploads
///
/// # Errors
/// Returns an error if:
/// - the logging configuration cannot be initialised,
/// - a configuration value is invalid,
/// - the record store cannot be opened, or
/// - the server address cannot be bound or the server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("healthdesk_run=info".parse()?)
                .add_directive("healthdesk_core=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr =
        std::env::var("HEALTHDESK_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let data_dir = std::env::var("HEALTHDESK_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_DATA_DIR));

    let cfg = CoreConfig::new(
        data_dir,
        store_backend_from_env_value(std::env::var("HEALTHDESK_STORE").ok())?,
        identity_scheme_from_env_value(std::env::var("HEALTHDESK_IDENTITY").ok())?,
        upload_keywords_from_env_value(std::env::var("HEALTHDESK_KEYWORDS").ok()),
    )?;

    tracing::info!(
        data_dir = %cfg.data_dir().display(),
        store = %cfg.store_backend(),
        identity = %cfg.identity_scheme(),
        "++ Opening HealthDesk store"
    );
    let service = PatientService::open(&cfg)?;

    let app = router(AppState::new(service));

    tracing::info!("++ Starting HealthDesk REST on {}", rest_addr);
    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
