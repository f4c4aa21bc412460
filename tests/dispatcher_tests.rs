//! Mock HTTP tests for the inference client and dispatcher.
//!
//! These tests cover:
//! - Response interpretation for face, object and narrative modes
//! - Service-reported and malformed failures
//! - Transport failures and the liveness probe
//! - The single in-flight request rule and cancellation

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use visionx::analysis::{
    AnalysisMode, BackendStatus, DispatchError, Dispatcher, Findings, InferenceClient,
    PipelineKind,
};
use visionx::frame::{encode_data_uri, Frame, FrameExtractor};

const RESULT_IMAGE: &str = "data:image/jpeg;base64,/9j/AA==";

fn png_of(image: &image::DynamicImage) -> Vec<u8> {
    let mut cursor = std::io::Cursor::new(Vec::new());
    image
        .write_to(&mut cursor, image::ImageFormat::Png)
        .unwrap();
    cursor.into_inner()
}

fn sample_frame() -> Frame {
    let image = image::DynamicImage::ImageRgb8(image::RgbImage::new(8, 8));
    let bytes = png_of(&image);
    FrameExtractor::default().from_uploaded_file(&bytes).unwrap()
}

fn dispatcher(kind: PipelineKind, base_url: &str) -> Dispatcher {
    Dispatcher::new(kind, InferenceClient::new(kind, base_url).unwrap())
}

async fn wait_until_in_flight(dispatcher: &Dispatcher) {
    for _ in 0..200 {
        if dispatcher.is_in_flight() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("request never went in flight");
}

// === Successful Responses ===

#[tokio::test]
async fn test_face_detection_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/detect-faces"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "result_image": RESULT_IMAGE,
            "face_count": 2,
            "features_detected": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dispatcher = dispatcher(PipelineKind::Face, &server.uri());
    let result = dispatcher
        .submit(sample_frame(), AnalysisMode::Face)
        .await
        .unwrap();

    assert!(result.is_success());
    assert_eq!(result.annotated_image(), Some(RESULT_IMAGE));
    assert_eq!(result.face_count(), Some(2));
    assert_eq!(
        result.findings(),
        Some(&Findings::Face {
            face_count: 2,
            features_detected: true
        })
    );
    assert!(!dispatcher.is_in_flight());
}

#[tokio::test]
async fn test_face_request_carries_image_field() {
    let server = MockServer::start().await;
    let frame = sample_frame();
    Mock::given(method("POST"))
        .and(path("/api/detect-faces"))
        .and(body_partial_json(json!({ "image": frame.encoded_image() })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "result_image": RESULT_IMAGE,
            "face_count": 0,
            "features_detected": false
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = dispatcher(PipelineKind::Face, &server.uri())
        .submit(frame, AnalysisMode::Face)
        .await
        .unwrap();
    assert_eq!(result.face_count(), Some(0));
}

#[tokio::test]
async fn test_object_detection_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/detect-objects"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "result_image": RESULT_IMAGE,
            "detected_objects": ["Person", "Dog"]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = dispatcher(PipelineKind::Object, &server.uri())
        .submit(sample_frame(), AnalysisMode::Object)
        .await
        .unwrap();

    assert!(result.is_success());
    assert_eq!(
        result.object_labels(),
        Some(&["Person".to_string(), "Dog".to_string()][..])
    );
    assert_eq!(
        result.findings(),
        Some(&Findings::Object {
            labels: vec!["Person".to_string(), "Dog".to_string()],
            object_count: 2
        })
    );
}

#[tokio::test]
async fn test_ai_direct_sends_type_and_keeps_submitted_image() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/ai-analyze"))
        .and(body_partial_json(json!({ "type": "direct_analysis" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "analysis": "A person smiling at the camera."
        })))
        .expect(1)
        .mount(&server)
        .await;

    let frame = sample_frame();
    let submitted = frame.encoded_image().to_string();
    let result = dispatcher(PipelineKind::Object, &server.uri())
        .submit(frame, AnalysisMode::AiDirect)
        .await
        .unwrap();

    assert!(result.is_success());
    assert_eq!(result.narrative(), Some("A person smiling at the camera."));
    assert_eq!(result.annotated_image(), Some(submitted.as_str()));
}

#[tokio::test]
async fn test_enrichment_sends_face_analysis_type() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/ai-analyze"))
        .and(body_partial_json(json!({ "type": "face_analysis" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "analysis": "Two people."
        })))
        .expect(1)
        .mount(&server)
        .await;

    let frame = Frame::from_data_uri(&encode_data_uri("image/jpeg", &[0xFF, 0xD8])).unwrap();
    let result = dispatcher(PipelineKind::Face, &server.uri())
        .submit(frame, AnalysisMode::AiOnExistingResult)
        .await
        .unwrap();
    assert_eq!(result.narrative(), Some("Two people."));
}

// === Failure Responses ===

#[tokio::test]
async fn test_service_reported_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/detect-faces"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "success": false, "error": "No image provided" })),
        )
        .mount(&server)
        .await;

    let result = dispatcher(PipelineKind::Face, &server.uri())
        .submit(sample_frame(), AnalysisMode::Face)
        .await
        .unwrap();

    assert!(!result.is_success());
    assert_eq!(
        result.error_message(),
        Some("Face detection failed: No image provided")
    );
    assert_eq!(result.annotated_image(), None);
}

#[tokio::test]
async fn test_service_failure_without_error_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/detect-objects"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": false })))
        .mount(&server)
        .await;

    let result = dispatcher(PipelineKind::Object, &server.uri())
        .submit(sample_frame(), AnalysisMode::Object)
        .await
        .unwrap();
    assert_eq!(
        result.error_message(),
        Some("Object detection failed: Unknown error")
    );
}

#[tokio::test]
async fn test_success_without_result_image_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/detect-faces"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .mount(&server)
        .await;

    let result = dispatcher(PipelineKind::Face, &server.uri())
        .submit(sample_frame(), AnalysisMode::Face)
        .await
        .unwrap();

    assert!(!result.is_success());
    let message = result.error_message().unwrap();
    assert!(message.starts_with("Failed to parse Face detection response"));
}

#[tokio::test]
async fn test_non_json_body_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/ai-analyze"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let result = dispatcher(PipelineKind::Face, &server.uri())
        .submit(sample_frame(), AnalysisMode::AiDirect)
        .await
        .unwrap();
    assert!(result
        .error_message()
        .unwrap()
        .starts_with("Failed to parse AI analysis response"));
}

#[tokio::test]
async fn test_http_error_probes_running_backend() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/detect-faces"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "healthy" })))
        .expect(1)
        .mount(&server)
        .await;

    let result = dispatcher(PipelineKind::Face, &server.uri())
        .submit(sample_frame(), AnalysisMode::Face)
        .await
        .unwrap();

    assert_eq!(
        result.error_message(),
        Some("Network error: HTTP 500: Internal Server Error. Backend status: Running")
    );
}

#[tokio::test]
async fn test_http_error_with_unhealthy_backend() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/detect-objects"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let result = dispatcher(PipelineKind::Object, &server.uri())
        .submit(sample_frame(), AnalysisMode::Object)
        .await
        .unwrap();

    let message = result.error_message().unwrap();
    assert!(message.contains("HTTP 502"));
    assert!(message.ends_with("Backend status: Not responding"));
}

#[tokio::test]
async fn test_connection_refused_reports_not_running() {
    // Nothing listens on the discard port
    let dispatcher = dispatcher(PipelineKind::Face, "http://127.0.0.1:9");
    let result = dispatcher
        .submit(sample_frame(), AnalysisMode::Face)
        .await
        .unwrap();

    assert!(!result.is_success());
    let message = result.error_message().unwrap();
    assert!(message.starts_with("Network error:"));
    assert!(message.ends_with("Backend status: Not running"));
    assert!(!dispatcher.is_in_flight());
}

#[tokio::test]
async fn test_probe_health_statuses() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let client = InferenceClient::new(PipelineKind::Face, server.uri()).unwrap();
    assert_eq!(client.probe_health().await, BackendStatus::Running);

    let client = InferenceClient::new(PipelineKind::Face, "http://127.0.0.1:9").unwrap();
    assert_eq!(client.probe_health().await, BackendStatus::NotRunning);
}

// === In-flight Rule ===

#[tokio::test]
async fn test_second_submission_rejected_while_in_flight() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/detect-faces"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({
                    "success": true,
                    "result_image": RESULT_IMAGE,
                    "face_count": 1,
                    "features_detected": false
                }))
                .set_delay(Duration::from_millis(300)),
        )
        // The rejected submission must never reach the network
        .expect(1)
        .mount(&server)
        .await;

    let dispatcher = Arc::new(dispatcher(PipelineKind::Face, &server.uri()));
    let first = {
        let dispatcher = Arc::clone(&dispatcher);
        tokio::spawn(async move { dispatcher.submit(sample_frame(), AnalysisMode::Face).await })
    };
    wait_until_in_flight(&dispatcher).await;

    let second = dispatcher.submit(sample_frame(), AnalysisMode::Face).await;
    assert_eq!(second.unwrap_err(), DispatchError::RequestInProgress);

    let first = first.await.unwrap().unwrap();
    assert_eq!(first.face_count(), Some(1));
    assert!(!dispatcher.is_in_flight());
}

#[tokio::test]
async fn test_cancel_in_flight() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/detect-faces"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(10)))
        .mount(&server)
        .await;

    let dispatcher = Arc::new(dispatcher(PipelineKind::Face, &server.uri()));
    assert!(!dispatcher.cancel_in_flight());

    let pending = {
        let dispatcher = Arc::clone(&dispatcher);
        tokio::spawn(async move { dispatcher.submit(sample_frame(), AnalysisMode::Face).await })
    };
    wait_until_in_flight(&dispatcher).await;

    assert!(dispatcher.cancel_in_flight());
    let outcome = tokio::time::timeout(Duration::from_secs(2), pending)
        .await
        .expect("cancellation should resolve promptly")
        .unwrap();
    assert_eq!(outcome.unwrap_err(), DispatchError::Cancelled);
    assert!(!dispatcher.is_in_flight());
}

#[tokio::test]
async fn test_unsupported_mode_rejected_without_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let result = dispatcher(PipelineKind::Object, &server.uri())
        .submit(sample_frame(), AnalysisMode::Face)
        .await;
    assert!(matches!(
        result,
        Err(DispatchError::UnsupportedMode {
            mode: AnalysisMode::Face,
            kind: PipelineKind::Object
        })
    ));
}
