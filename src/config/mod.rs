use crate::global;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub backend: BackendConfig,
    pub polling: PollingConfig,
    pub validation: ValidationConfig,
    pub wizard: WizardConfig,
    pub ui: UiConfig,
    pub export: ExportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL of the processing backend, without the `/api` suffix.
    pub base_url: String,
    pub request_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    pub interval_ms: u64,
    /// Maximum status checks for non-live sources. Live recordings never time out.
    pub poll_limit: u32,
    pub summary_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    pub max_file_size_mb: u64,
    /// Lowercase extensions without the leading dot.
    pub allowed_extensions: Vec<String>,
    pub link_domain_marker: String,
    pub link_join_marker: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WizardConfig {
    /// Let page 2 advance on a valid local selection without a finished job.
    pub direct_advance: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub error_display_seconds: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub directory: Option<PathBuf>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:9000".to_string(),
            request_timeout_seconds: 30,
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: 500,
            poll_limit: 120,
            summary_interval_ms: 1000,
        }
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_file_size_mb: 100,
            allowed_extensions: ["mp3", "mp4", "wav", "m4a", "avi", "mov", "flv", "aac"]
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
            link_domain_marker: "zoom.us".to_string(),
            link_join_marker: "/j/".to_string(),
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            error_display_seconds: 3,
        }
    }
}

impl PollingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn summary_interval(&self) -> Duration {
        Duration::from_millis(self.summary_interval_ms)
    }
}

impl ValidationConfig {
    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb * 1024 * 1024
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            info!(
                "Config file not found, creating default at {:?}",
                config_path
            );
            let config = Self::default();
            config.save_to(config_path)?;
            return Ok(config);
        }

        let content =
            std::fs::read_to_string(config_path).context("Failed to read config file")?;

        let config: Self = toml::from_str(&content).context("Failed to parse config file")?;

        info!("Loaded config from {:?}", config_path);
        Ok(config)
    }

    fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(config_path, content).context("Failed to write config file")?;

        Ok(())
    }

    /// Directory exports are written to, falling back to the data dir.
    pub fn export_dir(&self) -> Result<PathBuf> {
        match &self.export.directory {
            Some(dir) => Ok(dir.clone()),
            None => global::exports_dir(),
        }
    }

    fn config_path() -> Result<PathBuf> {
        global::config_file()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_deployment() {
        let config = Config::default();
        assert_eq!(config.backend.base_url, "http://127.0.0.1:9000");
        assert_eq!(config.polling.interval(), Duration::from_millis(500));
        assert_eq!(config.polling.poll_limit, 120);
        assert_eq!(config.validation.max_file_size_bytes(), 100 * 1024 * 1024);
        assert!(config
            .validation
            .allowed_extensions
            .contains(&"m4a".to_string()));
        assert!(!config.wizard.direct_advance);
    }

    #[test]
    fn test_load_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.polling.poll_limit, 120);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let contents = r#"
[validation]
max_file_size_mb = 10

[backend]
base_url = "http://backend:9000"
"#;
        std::fs::write(&path, contents).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.validation.max_file_size_mb, 10);
        assert_eq!(config.validation.link_join_marker, "/j/");
        assert_eq!(config.backend.base_url, "http://backend:9000");
        assert_eq!(config.backend.request_timeout_seconds, 30);
    }

    #[test]
    fn test_export_dir_override() {
        let mut config = Config::default();
        config.export.directory = Some(PathBuf::from("/tmp/meetwise-exports"));
        assert_eq!(
            config.export_dir().unwrap(),
            PathBuf::from("/tmp/meetwise-exports")
        );
    }
}
