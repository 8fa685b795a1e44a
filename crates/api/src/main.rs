use api::{AppState, config::get_configuration, router};
use classifier::{Classifier, ClassifierOptions, Vocabulary, backend::ort::OrtBackend};
use common::{TelemetryGuard, setup_logging};

#[cfg(not(feature = "ort-backend"))]
compile_error!("The `ort-backend` feature must be enabled to build the server binary");

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = get_configuration()?;

    let _telemetry = match config.otel_endpoint.as_deref() {
        Some(endpoint) => Some(TelemetryGuard::init(
            "soil-api",
            endpoint,
            config.environment,
        )?),
        None => {
            setup_logging(config.environment);
            None
        }
    };

    tracing::info!(
        config = ?config,
        "Loaded configuration"
    );

    tracing::info!("Loading classification model");
    let backend =
        OrtBackend::load_model_with_provider(&config.model_path, config.execution_provider)?;

    let vocabulary = Vocabulary::new(config.labels.clone())?;
    let classifier = Classifier::new(
        backend,
        vocabulary,
        ClassifierOptions {
            pixel_scale: config.pixel_scale,
        },
    )?;

    let app = router(AppState::new(classifier), config.max_upload_bytes);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("HTTP server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

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
