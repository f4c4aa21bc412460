//! JSON bodies exchanged with the inference services.

use serde::{Deserialize, Serialize};

/// Body for the detection endpoints.
#[derive(Debug, Serialize)]
pub(crate) struct DetectRequest<'a> {
    /// Data-URI encoded image.
    pub image: &'a str,
}

/// Body for the narrative endpoint.
#[derive(Debug, Serialize)]
pub(crate) struct AnalyzeRequest<'a> {
    pub image: &'a str,
    #[serde(rename = "type")]
    pub analysis_type: &'a str,
}

/// Response from the face endpoint.
#[derive(Debug, Deserialize)]
pub(crate) struct FaceResponse {
    pub success: bool,
    #[serde(default)]
    pub result_image: Option<String>,
    #[serde(default)]
    pub face_count: Option<u32>,
    #[serde(default)]
    pub features_detected: Option<bool>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Response from the object endpoint.
#[derive(Debug, Deserialize)]
pub(crate) struct ObjectResponse {
    pub success: bool,
    #[serde(default)]
    pub result_image: Option<String>,
    #[serde(default)]
    pub detected_objects: Option<Vec<String>>,
    #[serde(default)]
    pub object_count: Option<usize>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Response from the narrative endpoint.
#[derive(Debug, Deserialize)]
pub(crate) struct AnalyzeResponse {
    pub success: bool,
    #[serde(default)]
    pub analysis: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}
