use classifier::PixelScale;
#[cfg(feature = "ort-backend")]
use classifier::backend::ort::ExecutionProvider;
use common::Environment;
use serde::Deserialize;
use std::path::PathBuf;

pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub environment: Environment,
    pub host: String,
    pub port: u16,
    pub model_path: PathBuf,
    pub labels: Vec<String>,
    pub pixel_scale: PixelScale,
    #[cfg(feature = "ort-backend")]
    pub execution_provider: ExecutionProvider,
    pub max_upload_bytes: usize,
    pub otel_endpoint: Option<String>,
}

impl Config {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Defaults overlaid with `SOIL_*` environment variables, e.g.
/// `SOIL_PORT=9000` or `SOIL_LABELS="Sandy,Loam"`.
pub fn get_configuration() -> Result<Config, config::ConfigError> {
    let default_labels: Vec<String> = classifier::vocabulary::SOIL_TYPES
        .iter()
        .map(|s| s.to_string())
        .collect();

    let config = config::Config::builder()
        .set_default("environment", "development")?
        .set_default("host", "localhost")?
        .set_default("port", 8888)?
        .set_default("model_path", "saved_models/1.onnx")?
        .set_default("labels", default_labels)?
        .set_default("pixel_scale", "raw")?
        .set_default("execution_provider", "cpu")?
        .set_default("max_upload_bytes", DEFAULT_MAX_UPLOAD_BYTES as i64)?
        .add_source(
            config::Environment::with_prefix("SOIL")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("labels")
                .try_parsing(true),
        )
        .build()?;

    config.try_deserialize::<Config>()
}
