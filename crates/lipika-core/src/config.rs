// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Application configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{LipikaError, Result};

/// File name of the persisted configuration inside the config directory.
pub const CONFIG_FILE: &str = "config.json";

/// Environment variable overriding [`RecognitionConfig::api_key`].
pub const ENV_API_KEY: &str = "LIPIKA_API_KEY";

/// Environment variable overriding [`RecognitionConfig::endpoint`].
pub const ENV_ENDPOINT: &str = "LIPIKA_ENDPOINT";

/// Persistent application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub recognition: RecognitionConfig,
    pub throttle: ThrottleConfig,
    pub preprocess: PreprocessConfig,
    pub export: ExportConfig,
}

/// Where and how to reach the external recognition service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognitionConfig {
    /// Endpoint accepting `{"image": "<data url>"}` and answering `{"text": ...}`.
    pub endpoint: String,
    /// Bearer token, if the endpoint needs one.
    pub api_key: Option<String>,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Substrings in an error payload that mean "rate limited" (case-sensitive).
    pub rate_limit_markers: Vec<String>,
    /// Substrings in an error payload that mean "credits exhausted" (case-sensitive).
    pub quota_markers: Vec<String>,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8787/extract-text".into(),
            api_key: None,
            timeout_secs: 120,
            rate_limit_markers: vec![
                "429".into(),
                "Rate limit".into(),
                "rate limit".into(),
                "Too Many Requests".into(),
            ],
            quota_markers: vec![
                "402".into(),
                "Payment required".into(),
                "credits".into(),
                "quota".into(),
            ],
        }
    }
}

/// Spacing between consecutive recognition calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThrottleConfig {
    /// Fixed wait between two pages of one item, in milliseconds.
    pub page_delay_ms: u64,
    /// When set, a token bucket replaces the fixed wait.
    pub token_bucket: Option<TokenBucketConfig>,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            page_delay_ms: 2000,
            token_bucket: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenBucketConfig {
    /// Calls that may be made back to back.
    pub capacity: u32,
    /// Time to earn one call back, in milliseconds.
    pub refill_ms: u64,
}

/// Page image size bounds applied before transmission.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Largest allowed width or height in pixels.
    pub max_dimension: u32,
    /// Re-encoding quality in (0, 1].
    pub quality: f32,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            max_dimension: 1600,
            quality: 0.85,
        }
    }
}

/// Styling of exported documents. All sizes are half-points, spacing is twips.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Font family used for every run; must cover the target script.
    pub font: String,
    pub body_size: usize,
    pub table_header_size: usize,
    pub table_body_size: usize,
    /// Size of headers at the shallowest level present in the document.
    pub header_size: usize,
    /// Size of every deeper header level.
    pub subheader_size: usize,
    pub paragraph_spacing_after: u32,
    pub header_spacing_before: u32,
    pub header_spacing_after: u32,
    /// Usable page width (A4 minus 1" margins).
    pub content_width: usize,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            font: "Nirmala UI".into(),
            body_size: 24,
            table_header_size: 24,
            table_body_size: 22,
            header_size: 32,
            subheader_size: 28,
            paragraph_spacing_after: 200,
            header_spacing_before: 240,
            header_spacing_after: 120,
            content_width: 9026,
        }
    }
}

impl AppConfig {
    /// Load the configuration from `path`.
    ///
    /// A missing file yields the defaults; a malformed one is an error.
    /// Environment overrides are applied on top in both cases.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = match std::fs::read_to_string(path) {
            Ok(data) => {
                debug!(path = %path.display(), "loading configuration");
                serde_json::from_str(&data).map_err(|e| {
                    LipikaError::Config(format!("{}: {e}", path.display()))
                })?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "no configuration file, using defaults");
                Self::default()
            }
            Err(e) => return Err(LipikaError::Io(e)),
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Write the configuration to `path` as pretty JSON, creating parent
    /// directories as needed.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var(ENV_API_KEY)
            && !key.is_empty()
        {
            self.recognition.api_key = Some(key);
        }
        if let Ok(endpoint) = std::env::var(ENV_ENDPOINT)
            && !endpoint.is_empty()
        {
            self.recognition.endpoint = endpoint;
        }
    }

    /// Reject settings the pipeline cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.preprocess.max_dimension == 0 {
            return Err(LipikaError::Config("preprocess.max_dimension must be > 0".into()));
        }
        if !(self.preprocess.quality > 0.0 && self.preprocess.quality <= 1.0) {
            return Err(LipikaError::Config(format!(
                "preprocess.quality must be in (0, 1], got {}",
                self.preprocess.quality
            )));
        }
        if let Some(bucket) = self.throttle.token_bucket
            && bucket.capacity == 0
        {
            return Err(LipikaError::Config("throttle.token_bucket.capacity must be > 0".into()));
        }
        Ok(())
    }
}

/// Default location of the configuration file.
///
/// `$XDG_CONFIG_HOME/lipika/config.json`, falling back to
/// `~/.config/lipika/config.json`, then the working directory.
pub fn default_config_path() -> PathBuf {
    let base = if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        PathBuf::from(xdg)
    } else if let Ok(home) = std::env::var("HOME") {
        PathBuf::from(home).join(".config")
    } else {
        PathBuf::from(".")
    };
    base.join("lipika").join(CONFIG_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_pipeline_constants() {
        let config = AppConfig::default();
        assert_eq!(config.throttle.page_delay_ms, 2000);
        assert_eq!(config.preprocess.max_dimension, 1600);
        assert!((config.preprocess.quality - 0.85).abs() < f32::EPSILON);
        assert_eq!(config.export.body_size, 24);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = AppConfig::load(dir.path().join("absent.json")).expect("load");
        assert_eq!(config.preprocess.max_dimension, 1600);
    }

    #[test]
    fn save_then_load_keeps_custom_values() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join(CONFIG_FILE);

        let mut config = AppConfig::default();
        config.throttle.page_delay_ms = 500;
        config.export.font = "Kalpurush".into();
        config.save(&path).expect("save");

        let loaded = AppConfig::load(&path).expect("load");
        assert_eq!(loaded.throttle.page_delay_ms, 500);
        assert_eq!(loaded.export.font, "Kalpurush");
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, r#"{"preprocess": {"max_dimension": 800}}"#).expect("write");

        let loaded = AppConfig::load(&path).expect("load");
        assert_eq!(loaded.preprocess.max_dimension, 800);
        assert!((loaded.preprocess.quality - 0.85).abs() < f32::EPSILON);
        assert_eq!(loaded.throttle.page_delay_ms, 2000);
    }

    #[test]
    fn invalid_quality_is_rejected() {
        let mut config = AppConfig::default();
        config.preprocess.quality = 1.5;
        assert!(matches!(config.validate(), Err(LipikaError::Config(_))));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "{not json").expect("write");
        assert!(AppConfig::load(&path).is_err());
    }
}
