//! InferenceClient - HTTP transport to a vision-inference service.

use std::fmt;
use std::time::Duration;

use serde::Serialize;

use super::mode::PipelineKind;

/// Default base URL of the face-detection service.
pub const DEFAULT_FACE_URL: &str = "http://localhost:8000";

/// Default base URL of the object-detection service.
pub const DEFAULT_OBJECT_URL: &str = "http://localhost:8001";

/// Path of the narrative-analysis endpoint (shared by both services).
pub const ANALYZE_PATH: &str = "/api/ai-analyze";

/// Path of the liveness endpoint.
pub const HEALTH_PATH: &str = "/health";

/// Default connection timeout (10 seconds).
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Upper bound for a liveness probe; it only enriches an error message.
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Paths of the endpoints a pipeline talks to, relative to the base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub detect_path: String,
    pub analyze_path: String,
    pub health_path: String,
}

impl Endpoints {
    pub fn for_kind(kind: PipelineKind) -> Self {
        let detect_path = match kind {
            PipelineKind::Face => "/api/detect-faces",
            PipelineKind::Object => "/api/detect-objects",
        };
        Self {
            detect_path: detect_path.to_string(),
            analyze_path: ANALYZE_PATH.to_string(),
            health_path: HEALTH_PATH.to_string(),
        }
    }
}

/// Default base URL for a pipeline kind.
pub fn default_base_url(kind: PipelineKind) -> &'static str {
    match kind {
        PipelineKind::Face => DEFAULT_FACE_URL,
        PipelineKind::Object => DEFAULT_OBJECT_URL,
    }
}

/// Transport-level options.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Overall request timeout. `None` waits for the service indefinitely.
    pub timeout: Option<Duration>,
    pub connect_timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

/// Outcome of a liveness probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendStatus {
    /// Health endpoint answered 2xx
    Running,
    /// Health endpoint answered with another status
    NotResponding,
    /// Health endpoint could not be reached
    NotRunning,
    /// The probe itself could not be issued
    Unknown,
}

impl fmt::Display for BackendStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            BackendStatus::Running => "Running",
            BackendStatus::NotResponding => "Not responding",
            BackendStatus::NotRunning => "Not running",
            BackendStatus::Unknown => "unknown",
        };
        f.write_str(text)
    }
}

/// Errors that can occur while talking to a service.
#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("{}", describe_reqwest_error(.0))]
    HttpError(#[from] reqwest::Error),

    #[error("HTTP {status}: {reason}")]
    Status { status: u16, reason: String },

    #[error("Invalid service URL '{0}'")]
    InvalidUrl(String),
}

/// Summarise a reqwest failure the way a user would describe it.
fn describe_reqwest_error(error: &reqwest::Error) -> String {
    if error.is_connect() {
        format!("connection failed ({})", error)
    } else if error.is_timeout() {
        format!("request timed out ({})", error)
    } else if error.is_body() || error.is_decode() {
        format!("failed to read response body ({})", error)
    } else {
        format!("HTTP request failed: {}", error)
    }
}

/// Client for one inference service.
#[derive(Debug, Clone)]
pub struct InferenceClient {
    base_url: String,
    endpoints: Endpoints,
    http_client: reqwest::Client,
}

impl InferenceClient {
    /// Create a client for the default endpoints of `kind` at `base_url`.
    pub fn new(kind: PipelineKind, base_url: impl Into<String>) -> Result<Self, InferenceError> {
        Self::with_options(
            base_url,
            Endpoints::for_kind(kind),
            ClientOptions::default(),
        )
    }

    /// Create a client with explicit endpoints and transport options.
    pub fn with_options(
        base_url: impl Into<String>,
        endpoints: Endpoints,
        options: ClientOptions,
    ) -> Result<Self, InferenceError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if reqwest::Url::parse(&base_url).is_err() {
            return Err(InferenceError::InvalidUrl(base_url));
        }

        let mut builder = reqwest::Client::builder().connect_timeout(options.connect_timeout);
        if let Some(timeout) = options.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            base_url,
            endpoints,
            http_client: builder.build()?,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Absolute URL of `path` on this service.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// POST a JSON body and return the response text of a 2xx answer.
    ///
    /// # Errors
    ///
    /// Returns `InferenceError::Status` for non-2xx answers and
    /// `InferenceError::HttpError` when the request or body read fails.
    pub async fn post_json<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<String, InferenceError> {
        let url = self.url(path);

        let response = self
            .http_client
            .post(&url)
            .header("Accept", "application/json")
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            log::warn!("{} answered {}", url, status);
            return Err(InferenceError::Status {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown status").to_string(),
            });
        }

        Ok(response.text().await?)
    }

    /// GET the health endpoint and classify the answer.
    ///
    /// Never fails: a probe that cannot be issued reports `Unknown`.
    pub async fn probe_health(&self) -> BackendStatus {
        let url = match reqwest::Url::parse(&self.url(&self.endpoints.health_path)) {
            Ok(url) => url,
            Err(_) => return BackendStatus::Unknown,
        };

        let status = match self.http_client.get(url).timeout(PROBE_TIMEOUT).send().await {
            Ok(response) if response.status().is_success() => BackendStatus::Running,
            Ok(_) => BackendStatus::NotResponding,
            Err(e) if e.is_builder() => BackendStatus::Unknown,
            Err(_) => BackendStatus::NotRunning,
        };
        log::debug!("Liveness probe of {}: {}", self.base_url, status);
        status
    }
}
