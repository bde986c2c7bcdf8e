use cart_service::config::{CartConfig, DEFAULT_PORT, SERVICE_NAME};
use cart_service::services::init_metrics;
use cart_service::Application;
use service_core::config::Config as CoreConfig;
use service_core::error::AppError;
use service_core::observability::init_tracing;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Shared settings first so logging is up before anything else is resolved
    let common = CoreConfig::load(DEFAULT_PORT)?;
    init_tracing(
        SERVICE_NAME,
        &common.log_level,
        common.otlp_endpoint.as_deref(),
    )?;
    init_metrics()?;

    let config = CartConfig::with_common(common);

    tracing::info!(
        service = %config.service_name,
        version = env!("CARGO_PKG_VERSION"),
        port = config.common.port,
        database = %config.mongodb.database,
        "Starting cart service"
    );

    let application = Application::build(config).await.map_err(|e| {
        tracing::error!("Failed to start cart service: {}", e);
        e
    })?;
    application.run_until_stopped().await?;

    tracing::info!("Service shutdown complete");
    Ok(())
}
