use std::fs;
use std::path::Path;
use serde::{Deserialize, Serialize};
use anyhow::{Result, Context};
use log::warn;

use crate::chart::ChartKind;

/// Main configuration structure for steamnoodles
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Brand name used in replies, prompts and chart titles
    #[serde(default = "default_brand")]
    pub brand: String,

    /// Sentiment classifier configuration
    #[serde(default)]
    pub classifier: ClassifierConfig,

    /// Chart output configuration
    #[serde(default)]
    pub plot: PlotConfig,

    /// Terminal display configuration
    #[serde(default)]
    pub ui: UIConfig,
}

/// Hosted model backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProviderKind {
    #[serde(rename = "openai")]
    OpenAI,
    #[serde(rename = "ollama")]
    Ollama,
    #[serde(rename = "none")]
    Disabled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Hosted backend to try first
    #[serde(default = "default_provider")]
    pub provider: ProviderKind,

    /// Model to use; each provider has its own default
    #[serde(default)]
    pub model: Option<String>,

    /// Temperature setting
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Per-call network timeout for hosted requests
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Override for the provider's API base URL
    #[serde(default)]
    pub base_url: Option<String>,

    /// Confidence below which a binary prediction counts as neutral
    #[serde(default = "default_neutral_floor")]
    pub neutral_floor: f64,

    /// Texts per classifier batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Characters of each text passed to the local model
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,

    /// Send whole batches to the hosted model instead of classifying locally
    #[serde(default)]
    pub hosted_batches: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlotConfig {
    /// Output path when `--out` is not given
    #[serde(default = "default_out")]
    pub default_out: String,

    /// Chart kind when `--kind` is not given
    #[serde(default)]
    pub default_kind: ChartKind,

    /// Image width in pixels
    #[serde(default = "default_width")]
    pub width: u32,

    /// Image height in pixels
    #[serde(default = "default_height")]
    pub height: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UIConfig {
    /// Enable colorful output
    #[serde(default = "default_colorful")]
    pub colorful: bool,

    /// Show progress bars
    #[serde(default = "default_progress_bars")]
    pub progress_bars: bool,
}

// Default value functions
fn default_brand() -> String { "SteamNoodles".to_string() }
fn default_provider() -> ProviderKind { ProviderKind::OpenAI }
fn default_temperature() -> f32 { 0.2 }
fn default_timeout_secs() -> u64 { 30 }
fn default_neutral_floor() -> f64 { 0.45 }
fn default_batch_size() -> usize { 32 }
fn default_max_chars() -> usize { 512 }
fn default_out() -> String { "outputs/sentiment_by_day.svg".to_string() }
fn default_width() -> u32 { 1000 }
fn default_height() -> u32 { 500 }
fn default_colorful() -> bool { true }
fn default_progress_bars() -> bool { true }

impl Default for ClassifierConfig {
    fn default() -> Self {
        ClassifierConfig {
            provider: default_provider(),
            model: None,
            temperature: default_temperature(),
            timeout_secs: default_timeout_secs(),
            base_url: None,
            neutral_floor: default_neutral_floor(),
            batch_size: default_batch_size(),
            max_chars: default_max_chars(),
            hosted_batches: false,
        }
    }
}

impl Default for PlotConfig {
    fn default() -> Self {
        PlotConfig {
            default_out: default_out(),
            default_kind: ChartKind::default(),
            width: default_width(),
            height: default_height(),
        }
    }
}

impl Default for UIConfig {
    fn default() -> Self {
        UIConfig {
            colorful: default_colorful(),
            progress_bars: default_progress_bars(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            brand: default_brand(),
            classifier: ClassifierConfig::default(),
            plot: PlotConfig::default(),
            ui: UIConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))
    }

    /// Load configuration from command line argument or default locations
    pub fn load(config_path: &Option<String>) -> Result<Self> {
        if let Some(path) = config_path {
            let expanded_path = shellexpand::tilde(path);
            return Self::from_file(expanded_path.as_ref());
        }

        // Try loading from default locations
        let default_paths = [
            "steamnoodles.toml",
            ".steamnoodles.toml",
            "~/.config/steamnoodles/config.toml",
        ];

        for path in default_paths {
            let expanded_path = shellexpand::tilde(path);
            if Path::new(expanded_path.as_ref()).exists() {
                match Self::from_file(expanded_path.as_ref()) {
                    Ok(config) => return Ok(config),
                    Err(e) => warn!("Failed to load config from {}: {:#}", path, e),
                }
            }
        }

        // Return default config if no file found
        Ok(Self::default())
    }

    /// Merge with command-line arguments (CLI args take precedence)
    pub fn merge_with_args(&mut self, headless: bool) {
        if headless {
            self.ui.colorful = false;
            self.ui.progress_bars = false;
        }
    }
}
