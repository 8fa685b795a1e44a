use crate::config::Environment;
use tracing::Subscriber;
use tracing_subscriber::{
    EnvFilter, Layer, Registry, layer::Identity, layer::SubscriberExt, registry::LookupSpan,
    util::SubscriberInitExt,
};

/// Default filter when `RUST_LOG` is unset or unparsable.
pub const DEFAULT_FILTER: &str = "info";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Pretty output in development, JSON in production, filtered by `RUST_LOG`.
///
/// Use [`crate::TelemetryGuard::init`] instead when spans and metrics should
/// also be exported over OTLP; it installs the subscriber itself.
pub fn setup_logging(environment: Environment) {
    install_subscriber(environment, Identity::new());
}

/// Install the global subscriber with `export` stacked under the fmt layer.
pub(crate) fn install_subscriber<L>(environment: Environment, export: L)
where
    L: Layer<Registry> + Send + Sync + 'static,
{
    let registry = tracing_subscriber::registry().with(export).with(env_filter());
    with_format(registry, environment).init();
}

fn with_format<S>(
    subscriber: S,
    environment: Environment,
) -> impl Subscriber + Send + Sync + 'static
where
    S: Subscriber + for<'a> LookupSpan<'a> + Send + Sync + 'static,
{
    let layer = match environment {
        Environment::Production => tracing_subscriber::fmt::layer()
            .json()
            .with_level(true)
            .boxed(),
        Environment::Development => tracing_subscriber::fmt::layer()
            .pretty()
            .with_ansi(true)
            .boxed(),
    };
    subscriber.with(layer)
}
