//! Application configuration storage
//!
//! Handles persistent storage of generation and preview settings.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;

use generation::{OllamaOptions, DEFAULT_BASE_URL};
use preview_engine::constants::sandbox::DEFAULT_TIMEOUT_MS;
use preview_engine::{BoaHost, Device, MockLibrary, PreviewError, PreviewSettings, Theme};

/// Directory name under the platform config dir
pub const APP_DIR_NAME: &str = "crystal-forge";
const CONFIG_FILE: &str = "config.json";

/// Connection and sampling settings for the Ollama daemon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub base_url: String,
    /// Model tag; overrides the crystal's model
    pub model: String,
    pub temperature: f32,
    pub top_p: f32,
    pub num_predict: i32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        let options = OllamaOptions::default();
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: "qwen2.5-coder:7b-instruct-q8_0".to_string(),
            temperature: options.temperature,
            top_p: options.top_p,
            num_predict: options.num_predict,
        }
    }
}

impl GenerationConfig {
    pub fn options(&self) -> OllamaOptions {
        OllamaOptions {
            temperature: self.temperature,
            top_p: self.top_p,
            num_predict: self.num_predict,
        }
    }
}

/// Sandbox configuration for the preview host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxConfig {
    /// Time a preview program may run before the load is abandoned
    pub timeout_ms: u64,
    /// Extra icon mocks, name → glyph
    pub extra_icons: BTreeMap<String, String>,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            extra_icons: BTreeMap::new(),
        }
    }
}

/// Preview defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    pub theme: Theme,
    pub device: Device,
    pub zoom: u16,
    pub sandbox: SandboxConfig,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        let settings = PreviewSettings::default();
        Self {
            theme: settings.theme,
            device: settings.device,
            zoom: settings.zoom,
            sandbox: SandboxConfig::default(),
        }
    }
}

impl PreviewConfig {
    pub fn settings(&self) -> PreviewSettings {
        PreviewSettings {
            theme: self.theme,
            device: self.device,
            zoom: PreviewSettings::clamp_zoom(self.zoom),
            ..PreviewSettings::default()
        }
    }

    /// Standard mocks plus the configured extra icons
    pub fn mocks(&self) -> Result<MockLibrary, PreviewError> {
        let mut mocks = MockLibrary::standard();
        for (name, glyph) in &self.sandbox.extra_icons {
            mocks.register_icon(name.as_str(), glyph.as_str())?;
        }
        Ok(mocks)
    }

    pub fn host(&self) -> BoaHost {
        BoaHost::new(self.sandbox.timeout_ms)
    }
}

/// Full application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub generation: GenerationConfig,
    pub preview: PreviewConfig,
}

impl AppConfig {
    /// Platform config directory for the application
    pub fn default_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR_NAME))
    }

    /// Load configuration from disk, or defaults when there is no file
    pub async fn load(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE);

        if !fs::try_exists(&config_path).await? {
            log::debug!("No configuration at {:?}, using defaults", config_path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&config_path).await?;
        serde_json::from_str(&contents).map_err(ConfigError::Parse)
    }

    /// Save configuration to disk
    pub async fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        fs::create_dir_all(config_dir).await?;

        let config_path = config_dir.join(CONFIG_FILE);
        let contents = serde_json::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        fs::write(&config_path, contents).await?;

        log::info!("Configuration saved to {:?}", config_path);
        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(serde_json::Error),
    #[error("Failed to serialize config: {0}")]
    Serialize(serde_json::Error),
}
