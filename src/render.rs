//! Text rendering of pipeline results.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use crate::analysis::{Findings, PipelineKind};
use crate::frame::{decode_data_uri, FrameError};
use crate::pipeline::PipelineState;
use crate::results::ResultSnapshot;

/// Errors that can occur while writing a result image.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("No result image to save")]
    NoImage,

    #[error(transparent)]
    Image(#[from] FrameError),

    #[error("Failed to write '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// One-line status badge for a pipeline.
pub fn status_line(kind: PipelineKind, state: PipelineState) -> String {
    let (scanner, done) = match kind {
        PipelineKind::Face => ("Face Scanner", "Face Detection Complete"),
        PipelineKind::Object => ("Object Scanner", "Object Detection Complete"),
    };
    match state {
        PipelineState::Idle => format!("{} Ready", scanner),
        PipelineState::Streaming => "Camera Active".to_string(),
        PipelineState::Processing => "Processing...".to_string(),
        PipelineState::ResultReady => done.to_string(),
    }
}

/// Describe a snapshot for the terminal.
pub fn describe(snapshot: &ResultSnapshot) -> String {
    let mut out = String::new();

    if let Some(result) = snapshot.result.as_deref() {
        match result.findings() {
            Some(Findings::Face {
                face_count,
                features_detected,
            }) => {
                let plural = if *face_count == 1 { "" } else { "s" };
                let _ = writeln!(out, "Face Detection Complete");
                let _ = writeln!(out, "  {} Face{} Found", face_count, plural);
                if *features_detected {
                    let _ = writeln!(out, "  Features Detected");
                }
            }
            Some(Findings::Object {
                labels,
                object_count,
            }) => {
                let _ = writeln!(out, "Object Detection Complete");
                if labels.is_empty() {
                    let _ = writeln!(out, "  No objects detected");
                } else {
                    let _ = writeln!(out, "  Detected Objects ({})", object_count);
                    for label in labels {
                        let _ = writeln!(out, "    - {}", label);
                    }
                }
            }
            Some(Findings::Narrative(_)) => {
                let _ = writeln!(out, "AI Analysis Complete");
            }
            None => {}
        }
    }

    if let Some(narrative) = &snapshot.narrative {
        let _ = writeln!(out, "AI Analysis:");
        for line in narrative.lines() {
            let _ = writeln!(out, "  {}", line);
        }
    }

    if let Some(error) = &snapshot.error {
        let _ = writeln!(out, "Error: {}", error);
    }

    if out.is_empty() {
        out.push_str("No result yet\n");
    }
    out
}

/// Write the held result image to `path`.
///
/// The image bytes are written as delivered by the service; the file
/// extension is not checked against the MIME type.
pub fn save_result_image(snapshot: &ResultSnapshot, path: &Path) -> Result<PathBuf, RenderError> {
    let image = snapshot
        .result
        .as_deref()
        .and_then(|r| r.annotated_image())
        .ok_or(RenderError::NoImage)?;
    let (_mime, bytes) = decode_data_uri(image)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| RenderError::Io {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }
    std::fs::write(path, bytes).map_err(|e| RenderError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{AnalysisMode, AnalysisResult};
    use crate::frame::encode_data_uri;
    use std::sync::Arc;

    fn snapshot_with(result: AnalysisResult) -> ResultSnapshot {
        ResultSnapshot {
            result: Some(Arc::new(result)),
            narrative: None,
            error: None,
        }
    }

    #[test]
    fn test_describe_empty() {
        assert_eq!(describe(&ResultSnapshot::default()), "No result yet\n");
    }

    #[test]
    fn test_describe_faces() {
        let snap = snapshot_with(AnalysisResult::succeeded(
            AnalysisMode::Face,
            "img".to_string(),
            Findings::Face {
                face_count: 1,
                features_detected: true,
            },
        ));
        let text = describe(&snap);
        assert!(text.contains("1 Face Found"));
        assert!(text.contains("Features Detected"));
    }

    #[test]
    fn test_describe_objects_and_narrative() {
        let mut snap = snapshot_with(AnalysisResult::succeeded(
            AnalysisMode::Object,
            "img".to_string(),
            Findings::Object {
                labels: vec!["Person".to_string(), "Dog".to_string()],
                object_count: 2,
            },
        ));
        snap.narrative = Some("A person walking a dog.".to_string());
        let text = describe(&snap);
        assert!(text.contains("Detected Objects (2)"));
        assert!(text.contains("- Dog"));
        assert!(text.contains("A person walking a dog."));
    }

    #[test]
    fn test_describe_error() {
        let snap = snapshot_with(AnalysisResult::failed(AnalysisMode::Face, "ignored"));
        let snap = ResultSnapshot {
            error: Some("Network error: refused. Backend status: Not running".to_string()),
            ..snap
        };
        assert!(describe(&snap).contains("Backend status: Not running"));
    }

    #[test]
    fn test_status_line() {
        assert_eq!(
            status_line(PipelineKind::Face, PipelineState::Idle),
            "Face Scanner Ready"
        );
        assert_eq!(
            status_line(PipelineKind::Object, PipelineState::ResultReady),
            "Object Detection Complete"
        );
    }

    #[test]
    fn test_save_result_image() {
        let dir = tempfile::tempdir().unwrap();
        let snap = snapshot_with(AnalysisResult::succeeded(
            AnalysisMode::Face,
            encode_data_uri("image/jpeg", &[0xFF, 0xD8, 0xFF]),
            Findings::Face {
                face_count: 0,
                features_detected: false,
            },
        ));
        let path = dir.path().join("out").join("result.jpg");
        let written = save_result_image(&snap, &path).unwrap();
        assert_eq!(std::fs::read(written).unwrap(), vec![0xFF, 0xD8, 0xFF]);
    }

    #[test]
    fn test_save_without_result_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = save_result_image(&ResultSnapshot::default(), &dir.path().join("x.jpg"));
        assert!(matches!(result, Err(RenderError::NoImage)));
    }
}
