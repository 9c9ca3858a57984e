use anyhow::Result;
use serde::Deserialize;
use anyhow::anyhow;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub geocoder: GeocoderConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub worker_threads: Option<usize>,
    /// Empty means any origin is allowed.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "0.0.0.0".into(), port: 3002, worker_threads: Some(4), allowed_origins: Vec::new() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_db_file")]
    pub db_file: String,
    #[serde(default = "default_seed_demo_user")]
    pub seed_demo_user: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { db_file: default_db_file(), seed_demo_user: default_seed_demo_user() }
    }
}

fn default_db_file() -> String { "data/radsafe_database.json".into() }
fn default_seed_demo_user() -> bool { true }

#[derive(Debug, Clone, Deserialize)]
pub struct GeocoderConfig {
    #[serde(default = "default_geocoder_url")]
    pub base_url: String,
    #[serde(default = "default_geocoder_timeout")]
    pub timeout_secs: u64,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self { base_url: default_geocoder_url(), timeout_secs: default_geocoder_timeout() }
    }
}

fn default_geocoder_url() -> String { "https://nominatim.openstreetmap.org".into() }
fn default_geocoder_timeout() -> u64 { 10 }

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { format: default_log_format() }
    }
}

fn default_log_format() -> String { "compact".into() }

pub fn load_default() -> Result<AppConfig> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    load_from_file(&path)
}

pub fn load_from_file(path: &str) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    load_from_str(&content)
}

pub fn load_from_str(content: &str) -> Result<AppConfig> {
    let cfg: AppConfig = toml::from_str(content)?;
    Ok(cfg)
}

impl AppConfig {
    /// Load `config.toml` (or `CONFIG_PATH`), falling back to defaults when the
    /// file is absent, then apply env overrides and validate.
    pub fn load_and_validate() -> Result<Self> {
        let mut cfg = match load_default() {
            Ok(cfg) => cfg,
            Err(e) if is_not_found(&e) => AppConfig::default(),
            Err(e) => return Err(e),
        };
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    pub fn normalize_and_validate(&mut self) -> Result<()> {
        self.apply_env();
        self.server.normalize()?;
        self.storage.validate()?;
        self.geocoder.validate()?;
        Ok(())
    }

    fn apply_env(&mut self) {
        if let Ok(host) = std::env::var("SERVER_HOST") {
            self.server.host = host;
        }
        if let Some(port) = std::env::var("SERVER_PORT").ok().and_then(|p| p.parse::<u16>().ok()) {
            self.server.port = port;
        }
        if let Some(w) = std::env::var("TOKIO_WORKER_THREADS").ok().and_then(|v| v.parse::<usize>().ok()) {
            self.server.worker_threads = Some(w);
        }
        if let Ok(path) = std::env::var("DB_FILE") {
            self.storage.db_file = path;
        }
        if let Ok(url) = std::env::var("GEOCODER_URL") {
            self.geocoder.base_url = url;
        }
        if let Ok(format) = std::env::var("LOG_FORMAT") {
            self.logging.format = format;
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn is_not_found(e: &anyhow::Error) -> bool {
    e.downcast_ref::<std::io::Error>()
        .is_some_and(|io| io.kind() == std::io::ErrorKind::NotFound)
}

impl ServerConfig {
    fn normalize(&mut self) -> Result<()> {
        if self.host.trim().is_empty() {
            self.host = "0.0.0.0".to_string();
        }
        if self.port == 0 {
            return Err(anyhow!("server.port must be in 1..=65535"));
        }
        // 0 或未设置时回落到 4 个工作线程
        match self.worker_threads {
            Some(w) if w > 0 => {}
            _ => self.worker_threads = Some(4),
        }
        self.allowed_origins.retain(|o| !o.trim().is_empty());
        Ok(())
    }
}

impl StorageConfig {
    pub fn validate(&self) -> Result<()> {
        if self.db_file.trim().is_empty() {
            return Err(anyhow!("storage.db_file is empty; set it in config.toml or DB_FILE"));
        }
        Ok(())
    }
}

impl GeocoderConfig {
    pub fn validate(&self) -> Result<()> {
        let lower = self.base_url.to_lowercase();
        if !(lower.starts_with("http://") || lower.starts_with("https://")) {
            return Err(anyhow!("geocoder.base_url must start with http:// or https://"));
        }
        if self.timeout_secs == 0 {
            return Err(anyhow!("geocoder.timeout_secs must be a positive number of seconds"));
        }
        Ok(())
    }
}
