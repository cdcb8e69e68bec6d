use crate::playback::SpotifyCredentials;
use crate::services::LoopSettings;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Input device used when `start` is given no name
    #[serde(default)]
    pub device: Option<String>,

    #[serde(default = "default_capture_seconds")]
    pub capture_seconds: f32,

    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    #[serde(default = "default_interval_seconds")]
    pub interval_seconds: u64,

    #[serde(default = "default_timeout")]
    pub identify_timeout: u64,

    #[serde(default = "default_timeout")]
    pub dispatch_timeout: u64,

    #[serde(default)]
    pub acrcloud: AcrCloudConfig,

    #[serde(default)]
    pub spotify: SpotifyConfig,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct AcrCloudConfig {
    #[serde(default = "default_acrcloud_host")]
    pub host: String,

    #[serde(default)]
    pub access_key: String,

    #[serde(default)]
    pub access_secret: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct SpotifyConfig {
    #[serde(default = "default_spotify_api_base")]
    pub api_base: String,

    #[serde(default = "default_spotify_accounts_url")]
    pub accounts_url: String,

    #[serde(default)]
    pub access_token: Option<String>,

    #[serde(default)]
    pub refresh_token: Option<String>,

    #[serde(default)]
    pub client_id: Option<String>,

    #[serde(default)]
    pub client_secret: Option<String>,
}

/// Longest clip the fingerprint service is worth sending
const MAX_CAPTURE_SECONDS: f32 = 60.0;

const MAX_SAMPLE_RATE: u32 = 192_000;

fn default_capture_seconds() -> f32 {
    7.0
}

fn default_sample_rate() -> u32 {
    44100
}

fn default_interval_seconds() -> u64 {
    5
}

fn default_timeout() -> u64 {
    30
}

fn default_acrcloud_host() -> String {
    "identify-eu-west-1.acrcloud.com".to_string()
}

fn default_spotify_api_base() -> String {
    "https://api.spotify.com/v1".to_string()
}

fn default_spotify_accounts_url() -> String {
    "https://accounts.spotify.com/api/token".to_string()
}

impl Default for AcrCloudConfig {
    fn default() -> Self {
        Self {
            host: default_acrcloud_host(),
            access_key: String::new(),
            access_secret: String::new(),
        }
    }
}

impl Default for SpotifyConfig {
    fn default() -> Self {
        Self {
            api_base: default_spotify_api_base(),
            accounts_url: default_spotify_accounts_url(),
            access_token: None,
            refresh_token: None,
            client_id: None,
            client_secret: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            device: None,
            capture_seconds: default_capture_seconds(),
            sample_rate: default_sample_rate(),
            interval_seconds: default_interval_seconds(),
            identify_timeout: default_timeout(),
            dispatch_timeout: default_timeout(),
            acrcloud: AcrCloudConfig::default(),
            spotify: SpotifyConfig::default(),
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

impl Config {
    /// Load configuration from the default location (~/.config/earworm/config.json)
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            tracing::info!(
                "Config file not found at {:?}, creating default config",
                config_path
            );
            let config = Self::default();
            config.save_to(&config_path)?;
            return Ok(config);
        }

        Self::load_from(&config_path)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

        let config: Self = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {:?}", config_path))?;

        tracing::info!("Loaded config from {:?}", config_path);
        Ok(config)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let contents = serde_json::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(config_path, contents)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;

        tracing::info!("Saved config to {:?}", config_path);
        Ok(())
    }

    /// Get the path to the configuration file
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = if let Ok(dir) = std::env::var("XDG_CONFIG_HOME") {
            PathBuf::from(dir)
        } else {
            let home = std::env::var("HOME").context("HOME environment variable not set")?;
            PathBuf::from(home).join(".config")
        };

        Ok(config_dir.join("earworm").join("config.json"))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.capture_duration()?;

        if self.sample_rate == 0 || self.sample_rate > MAX_SAMPLE_RATE {
            return Err(anyhow::anyhow!(
                "sample_rate must be between 1 and {}",
                MAX_SAMPLE_RATE
            ));
        }

        if self.acrcloud.host.is_empty() {
            return Err(anyhow::anyhow!("acrcloud.host cannot be empty"));
        }

        if self.acrcloud.access_key.is_empty() || self.acrcloud.access_secret.is_empty() {
            return Err(anyhow::anyhow!(
                "acrcloud.access_key and acrcloud.access_secret must be set"
            ));
        }

        self.spotify_credentials()?;
        Ok(())
    }

    fn capture_duration(&self) -> Result<Duration> {
        let seconds = self.capture_seconds;
        if seconds.is_nan() || seconds <= 0.0 || seconds > MAX_CAPTURE_SECONDS {
            return Err(anyhow::anyhow!(
                "capture_seconds must be greater than 0 and at most {}",
                MAX_CAPTURE_SECONDS
            ));
        }

        Duration::try_from_secs_f32(self.capture_seconds)
            .with_context(|| format!("Invalid capture_seconds: {}", self.capture_seconds))
    }

    pub fn loop_settings(&self) -> Result<LoopSettings> {
        Ok(LoopSettings {
            capture_duration: self.capture_duration()?,
            sample_rate: self.sample_rate,
            interval: Duration::from_secs(self.interval_seconds),
            identify_timeout: Duration::from_secs(self.identify_timeout),
            dispatch_timeout: Duration::from_secs(self.dispatch_timeout),
        })
    }

    /// A refresh token takes precedence over a fixed access token
    pub fn spotify_credentials(&self) -> Result<SpotifyCredentials> {
        let spotify = &self.spotify;

        if let Some(refresh_token) = non_empty(&spotify.refresh_token) {
            let (Some(client_id), Some(client_secret)) = (
                non_empty(&spotify.client_id),
                non_empty(&spotify.client_secret),
            ) else {
                return Err(anyhow::anyhow!(
                    "spotify.refresh_token requires spotify.client_id and spotify.client_secret"
                ));
            };

            return Ok(SpotifyCredentials::RefreshToken {
                refresh_token: refresh_token.to_string(),
                client_id: client_id.to_string(),
                client_secret: client_secret.to_string(),
            });
        }

        non_empty(&spotify.access_token)
            .map(|token| SpotifyCredentials::AccessToken(token.to_string()))
            .ok_or_else(|| {
                anyhow::anyhow!("spotify.access_token or spotify.refresh_token must be set")
            })
    }
}
