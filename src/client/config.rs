use crate::shared::config::{
    AppConfig, AppConfigBuilder, ConfigError, StoreConfig, SyncConfig, WorkerConfig,
    DEFAULT_SERVER_URL,
};
use std::path::PathBuf;
use std::time::Duration;

/// Env var naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "CHATPING_CONFIG";

/// Application configuration wrapper.
///
/// Layers, lowest first: built-in defaults, the TOML file, environment
/// overrides (`CLIENT_API_URL`, `CHATPING_DATA_DIR`, `CHATPING_PROXY_PORT`).
#[derive(Debug, Clone, Default)]
pub struct Config {
    app: AppConfig,
}

impl Config {
    /// Create a configuration from built-in defaults only
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builder(builder: AppConfigBuilder) -> Result<Self, ConfigError> {
        Ok(Self { app: builder.build()? })
    }

    pub fn from_app(app: AppConfig) -> Result<Self, ConfigError> {
        app.validate()?;
        Ok(Self { app })
    }

    /// Load the config file (if any) and apply environment overrides
    pub fn load() -> Result<Self, ConfigError> {
        let app = match Self::config_path() {
            Some(path) if path.exists() => {
                tracing::info!("Loading configuration from {}", path.display());
                AppConfig::load(&path)?
            }
            _ => AppConfig::default(),
        };
        let app = apply_overrides(app, |key| std::env::var(key).ok())?;
        Ok(Self { app })
    }

    /// `CHATPING_CONFIG`, else `<data_dir>/chatping/config.toml`
    pub fn config_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            return Some(PathBuf::from(path));
        }
        dirs::data_dir().map(|mut path| {
            path.push("chatping");
            path.push("config.toml");
            path
        })
    }

    /// Get the full URL for an API endpoint
    pub fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.server_url().trim_end_matches('/'), path)
    }

    pub fn server_url(&self) -> &str {
        self.app.server_url.as_deref().unwrap_or(DEFAULT_SERVER_URL)
    }

    pub fn app(&self) -> &AppConfig {
        &self.app
    }

    pub fn store(&self) -> &StoreConfig {
        &self.app.store
    }

    pub fn sync(&self) -> &SyncConfig {
        &self.app.sync
    }

    pub fn worker(&self) -> &WorkerConfig {
        &self.app.worker
    }

    /// Timeout for one remote write
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.app.sync.request_timeout_secs)
    }
}

/// Apply environment overrides through `lookup` and re-validate
fn apply_overrides(
    mut app: AppConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<AppConfig, ConfigError> {
    if let Some(url) = lookup("CLIENT_API_URL") {
        app.server_url = Some(url);
    }
    if let Some(dir) = lookup("CHATPING_DATA_DIR") {
        app.store.data_dir = Some(PathBuf::from(dir));
    }
    if let Some(port) = lookup("CHATPING_PROXY_PORT") {
        app.worker.proxy_port = port.parse().map_err(|e| ConfigError::InvalidValue {
            field: "worker.proxy_port",
            message: format!("{}: {}", port, e),
        })?;
    }
    app.validate()?;
    Ok(app)
}
