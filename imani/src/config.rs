//! Application configuration management.
//!
//! Configuration is loaded from a YAML file with environment variable overrides. The configuration
//! file path defaults to `config.yaml` but can be specified via `-f` flag or `IMANI_CONFIG`
//! environment variable.
//!
//! ## Loading Priority
//!
//! Configuration sources are merged in the following order (later sources override earlier ones):
//!
//! 1. **YAML config file** - Base configuration (default: `config.yaml`). A missing file is fine.
//! 2. **Environment variables** - Variables prefixed with `IMANI_` override YAML values
//! 3. **DATABASE_URL** - Special case: overrides `database.url` if set
//!
//! For nested config values, use double underscores in environment variables. For example,
//! `IMANI_STORAGE__IMAGES_DIR=/data/images` sets the `storage.images_dir` field.
//!
//! ## Environment Variable Examples
//!
//! ```bash
//! # Override server port
//! IMANI_PORT=8080
//!
//! # Set database connection (preferred method)
//! DATABASE_URL="sqlite:///var/lib/imani/imani.db?mode=rwc"
//!
//! # Override nested values
//! IMANI_PDF__RENDER_DPI=300
//! IMANI_OCR__MODEL_DIR=/opt/ocrs
//! IMANI_ENABLE_METRICS=true
//! ```

use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};
use url::Url;

use crate::editor::{ocr, pdf::DEFAULT_RENDER_DPI, RenderSettings};
use crate::storage::StoragePaths;

/// Simple CLI args - just for specifying config file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "IMANI_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the server.
    #[arg(long)]
    pub validate: bool,
}

/// Main application configuration.
///
/// All fields have defaults defined in the `Default` implementation, so an empty file (or no file)
/// gives a working local setup.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP server host to bind to (e.g., "0.0.0.0" for all interfaces)
    pub host: String,
    /// HTTP server port to bind to
    pub port: u16,
    /// Set from the `DATABASE_URL` environment variable; folded into `database.url` on load.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_url: Option<String>,
    pub database: DatabaseConfig,
    /// Where uploads and derived files are written
    pub storage: StorageConfig,
    pub pdf: PdfConfig,
    pub ocr: OcrConfig,
    /// Maximum request body size in bytes. Unlimited when unset.
    pub max_upload_size: Option<usize>,
    pub cors: CorsConfig,
    /// Enable Prometheus metrics endpoint at `/internal/metrics`
    pub enable_metrics: bool,
    /// Enable OpenTelemetry OTLP export for distributed tracing
    pub enable_otel_export: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    /// SQLx connection URL
    pub url: String,
    pub pool: PoolSettings,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://imani.db?mode=rwc".to_string(),
            pool: PoolSettings::default(),
        }
    }
}

/// Connection pool parameters.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct PoolSettings {
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Minimum number of idle connections to maintain
    pub min_connections: u32,
    /// Maximum time to wait for a connection (seconds)
    pub acquire_timeout_secs: u64,
    /// Time before idle connections are closed (seconds, 0 = never)
    pub idle_timeout_secs: u64,
    /// Maximum lifetime of a connection (seconds, 0 = never)
    pub max_lifetime_secs: u64,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_connections: 0,
            acquire_timeout_secs: 30,
            idle_timeout_secs: 600,  // 10 minutes
            max_lifetime_secs: 1800, // 30 minutes
        }
    }
}

impl PoolSettings {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }

    pub fn idle_timeout(&self) -> Option<Duration> {
        (self.idle_timeout_secs > 0).then(|| Duration::from_secs(self.idle_timeout_secs))
    }

    pub fn max_lifetime(&self) -> Option<Duration> {
        (self.max_lifetime_secs > 0).then(|| Duration::from_secs(self.max_lifetime_secs))
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    /// Uploaded images, uploaded PDFs and derived images
    pub images_dir: PathBuf,
    /// Rendered pages, split pages and merged documents
    pub pdf_output_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            images_dir: PathBuf::from("uploaded_images"),
            pdf_output_dir: PathBuf::from("processed_pdfs"),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct PdfConfig {
    /// Resolution used when rendering pages to images
    pub render_dpi: u32,
    /// Directory holding the pdfium shared library. The system library is used when unset.
    pub pdfium_library_dir: Option<PathBuf>,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            render_dpi: DEFAULT_RENDER_DPI,
            pdfium_library_dir: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct OcrConfig {
    /// Directory with `text-detection.rten` and `text-recognition.rten`.
    /// Defaults to the `ocrs` cache directory.
    pub model_dir: Option<PathBuf>,
}

impl OcrConfig {
    pub fn model_dir(&self) -> PathBuf {
        self.model_dir.clone().unwrap_or_else(ocr::default_model_dir)
    }
}

/// CORS (Cross-Origin Resource Sharing) configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CorsConfig {
    /// Allowed origins for CORS requests
    pub allowed_origins: Vec<CorsOrigin>,
    /// Allow credentials (cookies) in CORS requests
    pub allow_credentials: bool,
    /// Cache preflight requests for this many seconds
    pub max_age: Option<u64>,
}

/// CORS origin specification.
///
/// Can be either a wildcard (`*`) to allow all origins, or a specific URL.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum CorsOrigin {
    /// Allow all origins (`*`)
    #[serde(deserialize_with = "parse_wildcard")]
    Wildcard,
    /// Specific origin URL (e.g., `https://app.example.com`)
    #[serde(deserialize_with = "parse_url")]
    Url(Url),
}

fn parse_wildcard<'de, D>(deserializer: D) -> Result<(), D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    if s == "*" {
        Ok(())
    } else {
        Err(serde::de::Error::custom("Expected '*'"))
    }
}

fn parse_url<'de, D>(deserializer: D) -> Result<Url, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    Url::parse(&s).map_err(serde::de::Error::custom)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            database_url: None,
            database: DatabaseConfig::default(),
            storage: StorageConfig::default(),
            pdf: PdfConfig::default(),
            ocr: OcrConfig::default(),
            max_upload_size: None,
            cors: CorsConfig::default(),
            enable_metrics: false,
            enable_otel_export: false,
        }
    }
}

impl Config {
    #[allow(clippy::result_large_err)]
    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        let mut config: Self = Self::figment(args).extract()?;

        if let Some(url) = config.database_url.take() {
            config.database.url = url;
        }

        config.validate().map_err(|e| figment::Error::from(e.to_string()))?;
        Ok(config)
    }

    /// Validate the configuration for consistency and required fields
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.pdf.render_dpi == 0 {
            anyhow::bail!("Config validation: pdf.render_dpi must be greater than 0");
        }

        if self.storage.images_dir == self.storage.pdf_output_dir {
            anyhow::bail!(
                "Config validation: storage.images_dir and storage.pdf_output_dir must differ (both are {})",
                self.storage.images_dir.display()
            );
        }

        let pool = &self.database.pool;
        if pool.min_connections > pool.max_connections {
            anyhow::bail!(
                "Config validation: database.pool.min_connections ({}) cannot be greater than max_connections ({})",
                pool.min_connections,
                pool.max_connections
            );
        }

        if self.cors.allow_credentials && self.cors.allowed_origins.iter().any(|o| matches!(o, CorsOrigin::Wildcard)) {
            anyhow::bail!("Config validation: cors.allow_credentials cannot be combined with a '*' origin");
        }

        Ok(())
    }

    pub fn figment(args: &Args) -> Figment {
        Figment::new()
            // Load base config file
            .merge(Yaml::file(&args.config))
            // Environment variables can still override specific values
            .merge(Env::prefixed("IMANI_").ignore(&["config"]).split("__"))
            // Common DATABASE_URL pattern
            .merge(Env::raw().only(&["DATABASE_URL"]))
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn storage_paths(&self) -> StoragePaths {
        StoragePaths::new(&self.storage.images_dir, &self.storage.pdf_output_dir)
    }

    pub fn render_settings(&self) -> RenderSettings {
        RenderSettings {
            dpi: self.pdf.render_dpi,
            library_dir: self.pdf.pdfium_library_dir.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    fn args(config: &str) -> Args {
        Args {
            config: config.to_string(),
            validate: false,
        }
    }

    #[test]
    fn test_defaults_without_config_file() {
        Jail::expect_with(|_jail| {
            let config = Config::load(&args("missing.yaml"))?;

            assert_eq!(config.bind_address(), "0.0.0.0:8000");
            assert_eq!(config.storage.images_dir, PathBuf::from("uploaded_images"));
            assert_eq!(config.storage.pdf_output_dir, PathBuf::from("processed_pdfs"));
            assert_eq!(config.pdf.render_dpi, 200);
            assert!(config.max_upload_size.is_none());
            assert!(!config.enable_metrics);

            Ok(())
        });
    }

    #[test]
    fn test_yaml_values() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "test.yaml",
                r#"
port: 9000
storage:
  images_dir: /data/images
pdf:
  render_dpi: 300
  pdfium_library_dir: /opt/pdfium/lib
ocr:
  model_dir: /opt/ocrs
max_upload_size: 10485760
cors:
  allowed_origins:
    - "https://app.example.com"
    - "*"
"#,
            )?;

            let config = Config::load(&args("test.yaml"))?;

            assert_eq!(config.port, 9000);
            assert_eq!(config.storage.images_dir, PathBuf::from("/data/images"));
            assert_eq!(config.storage.pdf_output_dir, PathBuf::from("processed_pdfs"));
            assert_eq!(config.render_settings().dpi, 300);
            assert_eq!(config.render_settings().library_dir, Some(PathBuf::from("/opt/pdfium/lib")));
            assert_eq!(config.ocr.model_dir(), PathBuf::from("/opt/ocrs"));
            assert_eq!(config.max_upload_size, Some(10 * 1024 * 1024));
            assert!(matches!(config.cors.allowed_origins[0], CorsOrigin::Url(ref u) if u.as_str() == "https://app.example.com/"));
            assert!(matches!(config.cors.allowed_origins[1], CorsOrigin::Wildcard));

            Ok(())
        });
    }

    #[test]
    fn test_env_override() {
        Jail::expect_with(|jail| {
            jail.create_file("test.yaml", "port: 9000\n")?;

            jail.set_env("IMANI_HOST", "127.0.0.1");
            jail.set_env("IMANI_PORT", "8080");
            jail.set_env("IMANI_PDF__RENDER_DPI", "150");
            jail.set_env("IMANI_CONFIG", "test.yaml");

            let config = Config::load(&args("test.yaml"))?;

            assert_eq!(config.host, "127.0.0.1");
            assert_eq!(config.port, 8080);
            assert_eq!(config.pdf.render_dpi, 150);

            Ok(())
        });
    }

    #[test]
    fn test_database_url_override() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "test.yaml",
                r#"
database:
  url: sqlite://from-file.db
  pool:
    max_connections: 4
"#,
            )?;
            jail.set_env("DATABASE_URL", "sqlite://from-env.db");

            let config = Config::load(&args("test.yaml"))?;

            assert_eq!(config.database.url, "sqlite://from-env.db");
            assert_eq!(config.database.pool.max_connections, 4);
            assert!(config.database_url.is_none());

            Ok(())
        });
    }

    #[test]
    fn test_unknown_fields_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file("test.yaml", "not_a_setting: true\n")?;
            assert!(Config::load(&args("test.yaml")).is_err());
            Ok(())
        });
    }

    #[test]
    fn test_validation_failures() {
        let mut config = Config::default();
        config.pdf.render_dpi = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.storage.pdf_output_dir = config.storage.images_dir.clone();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.database.pool.min_connections = 20;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.cors.allowed_origins = vec![CorsOrigin::Wildcard];
        config.cors.allow_credentials = true;
        assert!(config.validate().is_err());

        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_pool_durations() {
        let pool = PoolSettings {
            idle_timeout_secs: 0,
            ..Default::default()
        };
        assert_eq!(pool.idle_timeout(), None);
        assert_eq!(pool.max_lifetime(), Some(Duration::from_secs(1800)));
        assert_eq!(pool.acquire_timeout(), Duration::from_secs(30));
    }
}
