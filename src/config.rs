//! Configuration file handling for visionx.
//!
//! Loads configuration from `<config dir>/visionx/config.toml` or a custom path,
//! then applies environment overrides.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::analysis::{
    default_base_url, ClientOptions, Endpoints, InferenceClient, InferenceError, PipelineKind,
    DEFAULT_CONNECT_TIMEOUT,
};
use crate::camera::{CameraSettings, Resolution};
use crate::frame::DEFAULT_JPEG_QUALITY;
use crate::pipeline::{PipelineOptions, StopPolicy};

/// Environment variable overriding the face service base URL.
pub const FACE_URL_ENV: &str = "VISIONX_FACE_URL";

/// Environment variable overriding the object service base URL.
pub const OBJECT_URL_ENV: &str = "VISIONX_OBJECT_URL";

/// Configuration file structure for visionx.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(from = "ConfigFile")]
pub struct Config {
    pub face: ServiceConfig,
    pub object: ServiceConfig,
    pub request: RequestConfig,
    pub camera: CameraConfig,
    pub capture: CaptureConfig,
}

/// On-disk shape of [`Config`]. Service sections default per kind, so they
/// are read field by field and resolved afterwards.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    face: ServiceSection,
    object: ServiceSection,
    request: RequestConfig,
    camera: CameraConfig,
    capture: CaptureConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ServiceSection {
    base_url: Option<String>,
    detect_path: Option<String>,
    analyze_path: Option<String>,
    health_path: Option<String>,
}

impl ServiceSection {
    fn resolve(self, kind: PipelineKind) -> ServiceConfig {
        let defaults = ServiceConfig::for_kind(kind);
        ServiceConfig {
            base_url: self.base_url.unwrap_or(defaults.base_url),
            detect_path: self.detect_path.unwrap_or(defaults.detect_path),
            analyze_path: self.analyze_path.unwrap_or(defaults.analyze_path),
            health_path: self.health_path.unwrap_or(defaults.health_path),
        }
    }
}

impl From<ConfigFile> for Config {
    fn from(file: ConfigFile) -> Self {
        Self {
            face: file.face.resolve(PipelineKind::Face),
            object: file.object.resolve(PipelineKind::Object),
            request: file.request,
            camera: file.camera,
            capture: file.capture,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            face: ServiceConfig::face(),
            object: ServiceConfig::object(),
            request: RequestConfig::default(),
            camera: CameraConfig::default(),
            capture: CaptureConfig::default(),
        }
    }
}

/// Location of one inference service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceConfig {
    pub base_url: String,
    pub detect_path: String,
    pub analyze_path: String,
    pub health_path: String,
}

impl ServiceConfig {
    fn for_kind(kind: PipelineKind) -> Self {
        let endpoints = Endpoints::for_kind(kind);
        Self {
            base_url: default_base_url(kind).to_string(),
            detect_path: endpoints.detect_path,
            analyze_path: endpoints.analyze_path,
            health_path: endpoints.health_path,
        }
    }

    fn face() -> Self {
        Self::for_kind(PipelineKind::Face)
    }

    fn object() -> Self {
        Self::for_kind(PipelineKind::Object)
    }

    pub fn endpoints(&self) -> Endpoints {
        Endpoints {
            detect_path: self.detect_path.clone(),
            analyze_path: self.analyze_path.clone(),
            health_path: self.health_path.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RequestConfig {
    /// Overall timeout for an analysis request; absent means wait forever
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Cancel the in-flight request when the camera is stopped
    #[serde(default)]
    pub cancel_on_stop: bool,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            timeout_secs: None,
            connect_timeout_secs: default_connect_timeout_secs(),
            cancel_on_stop: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CameraConfig {
    #[serde(default)]
    pub device: u32,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_fps")]
    pub fps: u32,
    #[serde(default)]
    pub mirror: bool,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device: 0,
            width: default_width(),
            height: default_height(),
            fps: default_fps(),
            mirror: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CaptureConfig {
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            jpeg_quality: default_jpeg_quality(),
        }
    }
}

fn default_connect_timeout_secs() -> u64 {
    DEFAULT_CONNECT_TIMEOUT.as_secs()
}

fn default_width() -> u32 {
    Resolution::MEDIUM.width
}

fn default_height() -> u32 {
    Resolution::MEDIUM.height
}

fn default_fps() -> u32 {
    30
}

fn default_jpeg_quality() -> u8 {
    DEFAULT_JPEG_QUALITY
}

impl Config {
    /// Load configuration from a file path.
    ///
    /// With no explicit path, a missing default file yields the defaults.
    /// An explicit path that does not exist is an error, as is a file that
    /// exists but cannot be parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let explicit = path.is_some();
        let path = path.map(PathBuf::from).unwrap_or_else(default_path);

        if !path.exists() {
            if explicit {
                return Err(ConfigError::NotFound { path });
            }
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::IoError {
            path: path.clone(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.clone(),
            source: e,
        })
    }

    /// Apply `VISIONX_*_URL` overrides from the environment.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var(FACE_URL_ENV) {
            log::debug!("Face service URL overridden by {}", FACE_URL_ENV);
            self.face.base_url = url;
        }
        if let Ok(url) = std::env::var(OBJECT_URL_ENV) {
            log::debug!("Object service URL overridden by {}", OBJECT_URL_ENV);
            self.object.base_url = url;
        }
    }

    pub fn service(&self, kind: PipelineKind) -> &ServiceConfig {
        match kind {
            PipelineKind::Face => &self.face,
            PipelineKind::Object => &self.object,
        }
    }

    /// Build the HTTP client for the service behind `kind`.
    pub fn client_for(&self, kind: PipelineKind) -> Result<InferenceClient, InferenceError> {
        let service = self.service(kind);
        InferenceClient::with_options(
            service.base_url.clone(),
            service.endpoints(),
            ClientOptions {
                timeout: self.request.timeout_secs.map(Duration::from_secs),
                connect_timeout: Duration::from_secs(self.request.connect_timeout_secs),
            },
        )
    }

    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            camera: CameraSettings {
                device_index: self.camera.device,
                resolution: Resolution {
                    width: self.camera.width,
                    height: self.camera.height,
                },
                fps: self.camera.fps,
                mirror: self.camera.mirror,
            },
            jpeg_quality: self.capture.jpeg_quality,
            stop_policy: if self.request.cancel_on_stop {
                StopPolicy::CancelInFlight
            } else {
                StopPolicy::LetComplete
            },
        }
    }

    /// Render the configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::SerializeError)
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    NotFound {
        path: PathBuf,
    },
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
    SerializeError(toml::ser::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::NotFound { path } => {
                write!(f, "Config file not found: '{}'", path.display())
            }
            ConfigError::IoError { path, source } => {
                write!(
                    f,
                    "Failed to read config file '{}': {}",
                    path.display(),
                    source
                )
            }
            ConfigError::ParseError { path, source } => {
                write!(
                    f,
                    "Failed to parse config file '{}': {}",
                    path.display(),
                    source
                )
            }
            ConfigError::SerializeError(source) => {
                write!(f, "Failed to serialize configuration: {}", source)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::NotFound { .. } => None,
            ConfigError::IoError { source, .. } => Some(source),
            ConfigError::ParseError { source, .. } => Some(source),
            ConfigError::SerializeError(source) => Some(source),
        }
    }
}

/// Get the default config file path.
pub fn default_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("visionx").join("config.toml"))
        .unwrap_or_else(|| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".config/visionx/config.toml")
        })
}
