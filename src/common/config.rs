use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use crate::common::error::{FaceLockError, Result};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    pub camera: CameraConfig,
    pub models: ModelConfig,
    pub detector: DetectorConfig,
    pub recognizer: RecognizerConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub actuation: ActuationConfig,
    #[serde(default)]
    pub notification: NotificationConfig,
    #[serde(default)]
    pub display: DisplayConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CameraConfig {
    /// V4L2 device index; 999 auto-detects an IR/grayscale camera.
    pub device_index: u32,
    pub width: u32,
    pub height: u32,
    #[serde(default = "default_framerate")]
    pub framerate: u32,
    #[serde(default)]
    pub warmup_frames: u32,
    #[serde(default = "default_warmup_delay")]
    pub warmup_delay_ms: u64,
}

fn default_framerate() -> u32 { 10 }
fn default_warmup_delay() -> u64 { 50 }

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ModelConfig {
    pub detector_path: PathBuf,
    pub recognizer_path: PathBuf,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DetectorConfig {
    pub input_width: u32,
    pub input_height: u32,
    #[serde(default = "default_detection_confidence")]
    pub confidence: f32,
    #[serde(default = "default_optimization_level")]
    pub optimization_level: u32,
}

fn default_detection_confidence() -> f32 { 0.5 }
fn default_optimization_level() -> u32 { 3 }

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RecognizerConfig {
    pub input_size: u32,
    pub normalization_value: f32,
    /// Minimum cosine similarity for a reference encoding to count as a match.
    #[serde(default = "default_match_threshold")]
    pub match_threshold: f32,
}

fn default_match_threshold() -> f32 { 0.6 }

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum RearmPolicy {
    /// Cooldown lasts exactly one frame after an attempt.
    #[default]
    NextFrame,
    /// Cooldown lasts until a frame with no known face is observed.
    AfterAbsence,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AuthConfig {
    pub reference_credential_id: i64,
    #[serde(default)]
    pub identity_codes: BTreeMap<String, i64>,
    #[serde(default)]
    pub prompt_timeout_seconds: Option<u64>,
    #[serde(default)]
    pub rearm: RearmPolicy,
}

impl AuthConfig {
    pub fn prompt_timeout(&self) -> Option<Duration> {
        self.prompt_timeout_seconds.map(Duration::from_secs)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct StorageConfig {
    #[serde(default)]
    pub encodings_path: Option<PathBuf>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ActuationConfig {
    #[serde(default = "default_unlock_dwell")]
    pub unlock_dwell_ms: u64,
    #[serde(default = "default_lock_warning")]
    pub lock_warning_ms: u64,
    #[serde(default = "default_reject_display")]
    pub reject_display_ms: u64,
    #[serde(default)]
    pub gpio_pin: Option<u32>,
    #[serde(default)]
    pub active_low: bool,
}

fn default_unlock_dwell() -> u64 { 5000 }
fn default_lock_warning() -> u64 { 2000 }
fn default_reject_display() -> u64 { 2000 }

impl Default for ActuationConfig {
    fn default() -> Self {
        Self {
            unlock_dwell_ms: default_unlock_dwell(),
            lock_warning_ms: default_lock_warning(),
            reject_display_ms: default_reject_display(),
            gpio_pin: None,
            active_low: false,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct NotificationConfig {
    #[serde(default)]
    pub webhook_url: Option<String>,
    #[serde(default = "default_notification_timeout")]
    pub timeout_seconds: u64,
}

fn default_notification_timeout() -> u64 { 10 }

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            timeout_seconds: default_notification_timeout(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DisplayConfig {
    #[serde(default = "default_columns")]
    pub columns: usize,
    #[serde(default = "default_rows")]
    pub rows: usize,
    #[serde(default = "default_true")]
    pub preview: bool,
    #[serde(default)]
    pub ascii_width: Option<usize>,
    #[serde(default)]
    pub ascii_height: Option<usize>,
}

fn default_columns() -> usize { 16 }
fn default_rows() -> usize { 2 }
fn default_true() -> bool { true }

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            columns: default_columns(),
            rows: default_rows(),
            preview: true,
            ascii_width: None,
            ascii_height: None,
        }
    }
}

impl Config {
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(FaceLockError::Config(format!(
                "Config file not found: {}. Please create it from configs/facelock.example.toml.",
                path.display()
            )));
        }

        tracing::info!("Loading config from: {}", path.display());
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)
            .map_err(|e| FaceLockError::Config(format!("Config parse error: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.camera.width == 0 || self.camera.width > 4096 {
            return Err(FaceLockError::Config(format!(
                "Camera width must be between 1 and 4096, got {}", self.camera.width
            )));
        }
        if self.camera.height == 0 || self.camera.height > 4096 {
            return Err(FaceLockError::Config(format!(
                "Camera height must be between 1 and 4096, got {}", self.camera.height
            )));
        }
        if self.camera.framerate == 0 || self.camera.framerate > 120 {
            return Err(FaceLockError::Config(format!(
                "Camera framerate must be between 1 and 120, got {}", self.camera.framerate
            )));
        }

        if !(0.0..=1.0).contains(&self.detector.confidence) {
            return Err(FaceLockError::Config(format!(
                "Detection confidence must be between 0.0 and 1.0, got {}",
                self.detector.confidence
            )));
        }
        if self.detector.input_width == 0 || self.detector.input_width > 4096
            || self.detector.input_height == 0 || self.detector.input_height > 4096
        {
            return Err(FaceLockError::Config(format!(
                "Detector input must be between 1x1 and 4096x4096, got {}x{}",
                self.detector.input_width, self.detector.input_height
            )));
        }

        if self.recognizer.input_size == 0 || self.recognizer.input_size > 1024 {
            return Err(FaceLockError::Config(format!(
                "Recognizer input size must be between 1 and 1024, got {}",
                self.recognizer.input_size
            )));
        }
        if !(0.0..=1.0).contains(&self.recognizer.match_threshold) {
            return Err(FaceLockError::Config(format!(
                "Match threshold must be between 0.0 and 1.0, got {}",
                self.recognizer.match_threshold
            )));
        }

        if let Some(timeout) = self.auth.prompt_timeout_seconds {
            if timeout == 0 || timeout > 600 {
                return Err(FaceLockError::Config(format!(
                    "Prompt timeout must be between 1 and 600 seconds, got {}", timeout
                )));
            }
        }

        if self.display.columns == 0 || self.display.rows == 0 {
            return Err(FaceLockError::Config(
                "Display must have at least one column and one row".into(),
            ));
        }

        if let Some(url) = &self.notification.webhook_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(FaceLockError::Config(format!(
                    "Webhook URL must start with http:// or https://, got {}", url
                )));
            }
        }

        Ok(())
    }

    /// Resolves a model path relative to the models directory.
    pub fn resolve_model_path(path: &Path, models_dir: &Path) -> PathBuf {
        if path.is_relative() {
            models_dir.join(path)
        } else {
            path.to_path_buf()
        }
    }
}
