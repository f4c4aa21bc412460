//! Frame extraction: turns a live camera frame or an uploaded file into a
//! transmittable data-URI encoded image.

use std::time::SystemTime;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::codecs::jpeg::JpegEncoder;
use image::ExtendedColorType;

use crate::camera::CaptureSession;

/// JPEG quality used for live frames (matches the browser `toDataURL` default).
pub const DEFAULT_JPEG_QUALITY: u8 = 92;

const LIVE_MIME: &str = "image/jpeg";

/// Where a frame came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Live,
    Uploaded,
}

/// A single encoded still image. Immutable once produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    encoded_image: String,
    source_kind: SourceKind,
    captured_at: SystemTime,
}

impl Frame {
    /// The image as a `data:<mime>;base64,<payload>` URI.
    pub fn encoded_image(&self) -> &str {
        &self.encoded_image
    }

    pub fn source_kind(&self) -> SourceKind {
        self.source_kind
    }

    pub fn captured_at(&self) -> SystemTime {
        self.captured_at
    }

    /// Wrap an already-encoded data URI, e.g. a result image being sent back
    /// for enrichment.
    pub fn from_data_uri(uri: &str) -> Result<Self, FrameError> {
        decode_data_uri(uri)?;
        Ok(Self {
            encoded_image: uri.to_string(),
            source_kind: SourceKind::Uploaded,
            captured_at: SystemTime::now(),
        })
    }
}

/// Errors raised while producing a frame.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("No active capture session")]
    NoActiveSession,

    #[error("Camera has not produced a frame yet")]
    NoFrameAvailable,

    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Failed to encode frame: {0}")]
    Encode(String),

    #[error("Invalid data URI: {0}")]
    InvalidDataUri(String),
}

/// Produces frames with a fixed encoding configuration.
#[derive(Debug, Clone, Copy)]
pub struct FrameExtractor {
    jpeg_quality: u8,
}

impl Default for FrameExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_JPEG_QUALITY)
    }
}

impl FrameExtractor {
    /// Create an extractor; quality is clamped to 1..=100.
    pub fn new(jpeg_quality: u8) -> Self {
        Self {
            jpeg_quality: jpeg_quality.clamp(1, 100),
        }
    }

    pub fn jpeg_quality(&self) -> u8 {
        self.jpeg_quality
    }

    /// Read the current frame of an active session and JPEG-encode it.
    ///
    /// # Errors
    /// * `FrameError::NoActiveSession` - the session is not active
    /// * `FrameError::NoFrameAvailable` - the device has not delivered a frame
    /// * `FrameError::Encode` - the frame could not be encoded
    pub fn from_live_frame(&self, session: &CaptureSession) -> Result<Frame, FrameError> {
        if !session.is_active() {
            return Err(FrameError::NoActiveSession);
        }
        let raw = session.current_frame().ok_or(FrameError::NoFrameAvailable)?;
        if !raw.is_well_formed() {
            return Err(FrameError::Encode(format!(
                "frame buffer of {} bytes does not match {}x{} RGB",
                raw.data.len(),
                raw.width,
                raw.height
            )));
        }

        let mut jpeg = Vec::new();
        JpegEncoder::new_with_quality(&mut jpeg, self.jpeg_quality)
            .encode(&raw.data, raw.width, raw.height, ExtendedColorType::Rgb8)
            .map_err(|e| FrameError::Encode(e.to_string()))?;

        log::debug!(
            "Encoded live frame {}x{} into {} JPEG bytes",
            raw.width,
            raw.height,
            jpeg.len()
        );

        Ok(Frame {
            encoded_image: encode_data_uri(LIVE_MIME, &jpeg),
            source_kind: SourceKind::Live,
            captured_at: SystemTime::now(),
        })
    }

    /// Validate uploaded bytes as an image and wrap them unchanged.
    ///
    /// The bytes are decoded only to prove they are an image; the frame
    /// carries the original bytes with their sniffed MIME type.
    ///
    /// # Errors
    /// * `FrameError::InvalidImage` - the bytes are not a decodable image
    pub fn from_uploaded_file(&self, file_bytes: &[u8]) -> Result<Frame, FrameError> {
        let format =
            image::guess_format(file_bytes).map_err(|e| FrameError::InvalidImage(e.to_string()))?;
        image::load_from_memory_with_format(file_bytes, format)
            .map_err(|e| FrameError::InvalidImage(e.to_string()))?;

        Ok(Frame {
            encoded_image: encode_data_uri(format.to_mime_type(), file_bytes),
            source_kind: SourceKind::Uploaded,
            captured_at: SystemTime::now(),
        })
    }
}

/// Build a `data:<mime>;base64,...` URI.
pub fn encode_data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}

/// Split a base64 data URI into its MIME type and decoded bytes.
pub fn decode_data_uri(uri: &str) -> Result<(String, Vec<u8>), FrameError> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| FrameError::InvalidDataUri("missing 'data:' prefix".to_string()))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| FrameError::InvalidDataUri("missing ',' separator".to_string()))?;
    let mime = header
        .strip_suffix(";base64")
        .ok_or_else(|| FrameError::InvalidDataUri("only base64 payloads are supported".to_string()))?;
    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|e| FrameError::InvalidDataUri(e.to_string()))?;
    Ok((mime.to_string(), bytes))
}
