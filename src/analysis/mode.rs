//! Pipeline kinds and request modes.

use std::fmt;

/// Which detection service a pipeline instance targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum PipelineKind {
    Face,
    Object,
}

impl PipelineKind {
    /// The plain detection mode for this kind.
    pub fn detection_mode(self) -> AnalysisMode {
        match self {
            PipelineKind::Face => AnalysisMode::Face,
            PipelineKind::Object => AnalysisMode::Object,
        }
    }

    /// Human-readable service name.
    pub fn label(self) -> &'static str {
        match self {
            PipelineKind::Face => "Face detection",
            PipelineKind::Object => "Object detection",
        }
    }
}

impl fmt::Display for PipelineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineKind::Face => write!(f, "face"),
            PipelineKind::Object => write!(f, "object"),
        }
    }
}

/// What a single analysis request asks the service to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnalysisMode {
    /// Face detection (count + feature flag)
    Face,
    /// Object detection (label list)
    Object,
    /// Narrative analysis of a freshly captured frame
    AiDirect,
    /// Narrative analysis attached to an already-held result
    AiOnExistingResult,
}

impl AnalysisMode {
    /// Whether this mode produces a narrative rather than detections.
    pub fn is_narrative(self) -> bool {
        matches!(self, AnalysisMode::AiDirect | AnalysisMode::AiOnExistingResult)
    }

    /// Whether a pipeline of `kind` may issue this mode.
    pub fn supported_by(self, kind: PipelineKind) -> bool {
        match self {
            AnalysisMode::Face => kind == PipelineKind::Face,
            AnalysisMode::Object => kind == PipelineKind::Object,
            AnalysisMode::AiDirect | AnalysisMode::AiOnExistingResult => true,
        }
    }

    /// Value of the `type` field sent with narrative requests.
    pub fn analysis_type(self) -> Option<&'static str> {
        match self {
            AnalysisMode::AiDirect => Some("direct_analysis"),
            AnalysisMode::AiOnExistingResult => Some("face_analysis"),
            AnalysisMode::Face | AnalysisMode::Object => None,
        }
    }

    /// Human-readable operation name used in failure messages.
    pub fn label(self) -> &'static str {
        match self {
            AnalysisMode::Face => PipelineKind::Face.label(),
            AnalysisMode::Object => PipelineKind::Object.label(),
            AnalysisMode::AiDirect | AnalysisMode::AiOnExistingResult => "AI analysis",
        }
    }
}

impl fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AnalysisMode::Face => "face",
            AnalysisMode::Object => "object",
            AnalysisMode::AiDirect => "ai-direct",
            AnalysisMode::AiOnExistingResult => "ai-on-existing-result",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detection_mode_per_kind() {
        assert_eq!(PipelineKind::Face.detection_mode(), AnalysisMode::Face);
        assert_eq!(PipelineKind::Object.detection_mode(), AnalysisMode::Object);
    }

    #[test]
    fn test_mode_support_matrix() {
        assert!(AnalysisMode::Face.supported_by(PipelineKind::Face));
        assert!(!AnalysisMode::Face.supported_by(PipelineKind::Object));
        assert!(!AnalysisMode::Object.supported_by(PipelineKind::Face));
        assert!(AnalysisMode::AiDirect.supported_by(PipelineKind::Object));
        assert!(AnalysisMode::AiOnExistingResult.supported_by(PipelineKind::Face));
    }

    #[test]
    fn test_analysis_type() {
        assert_eq!(AnalysisMode::AiDirect.analysis_type(), Some("direct_analysis"));
        assert_eq!(
            AnalysisMode::AiOnExistingResult.analysis_type(),
            Some("face_analysis")
        );
        assert_eq!(AnalysisMode::Face.analysis_type(), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(AnalysisMode::AiOnExistingResult.to_string(), "ai-on-existing-result");
        assert_eq!(PipelineKind::Object.to_string(), "object");
    }
}
