//! Analysis outcomes.

use super::mode::AnalysisMode;

/// Mode-specific structured output of a successful analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Findings {
    Face {
        face_count: u32,
        features_detected: bool,
    },
    Object {
        labels: Vec<String>,
        /// Count reported by the service, or the label count when absent
        object_count: usize,
    },
    /// Free-text analysis from the narrative endpoint
    Narrative(String),
}

/// The outcome of one analysis request.
///
/// A successful result always carries an image and no error message; a
/// failed one always carries an error message. The constructors are the only
/// way to build one.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisResult {
    mode: AnalysisMode,
    success: bool,
    annotated_image: Option<String>,
    findings: Option<Findings>,
    error_message: Option<String>,
}

impl AnalysisResult {
    pub fn succeeded(mode: AnalysisMode, annotated_image: String, findings: Findings) -> Self {
        Self {
            mode,
            success: true,
            annotated_image: Some(annotated_image),
            findings: Some(findings),
            error_message: None,
        }
    }

    pub fn failed(mode: AnalysisMode, error_message: impl Into<String>) -> Self {
        Self {
            mode,
            success: false,
            annotated_image: None,
            findings: None,
            error_message: Some(error_message.into()),
        }
    }

    pub fn mode(&self) -> AnalysisMode {
        self.mode
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn annotated_image(&self) -> Option<&str> {
        self.annotated_image.as_deref()
    }

    pub fn findings(&self) -> Option<&Findings> {
        self.findings.as_ref()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    /// Face count, for face results.
    pub fn face_count(&self) -> Option<u32> {
        match self.findings {
            Some(Findings::Face { face_count, .. }) => Some(face_count),
            _ => None,
        }
    }

    /// Detected object labels, for object results.
    pub fn object_labels(&self) -> Option<&[String]> {
        match &self.findings {
            Some(Findings::Object { labels, .. }) => Some(labels),
            _ => None,
        }
    }

    /// Narrative text, for narrative results.
    pub fn narrative(&self) -> Option<&str> {
        match &self.findings {
            Some(Findings::Narrative(text)) => Some(text),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_invariant() {
        let result = AnalysisResult::succeeded(
            AnalysisMode::Face,
            "data:image/jpeg;base64,AA==".to_string(),
            Findings::Face {
                face_count: 2,
                features_detected: true,
            },
        );
        assert!(result.is_success());
        assert!(result.annotated_image().is_some());
        assert!(result.error_message().is_none());
        assert_eq!(result.face_count(), Some(2));
        assert!(result.object_labels().is_none());
    }

    #[test]
    fn test_failure_invariant() {
        let result = AnalysisResult::failed(AnalysisMode::Object, "boom");
        assert!(!result.is_success());
        assert_eq!(result.error_message(), Some("boom"));
        assert!(result.findings().is_none());
        assert!(result.face_count().is_none());
    }

    #[test]
    fn test_object_accessors() {
        let result = AnalysisResult::succeeded(
            AnalysisMode::Object,
            "img".to_string(),
            Findings::Object {
                labels: vec!["Person".to_string(), "Dog".to_string()],
                object_count: 2,
            },
        );
        assert_eq!(result.object_labels().unwrap().len(), 2);
        assert!(result.narrative().is_none());
    }
}
