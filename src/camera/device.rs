//! Capture device seam and the built-in devices.
//!
//! A [`CaptureDevice`] grants (or denies) a [`VideoStream`]; the stream hands
//! out the most recent frame until all of its tracks are stopped.

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use super::types::{CameraError, CameraSettings, RawFrame};

/// A camera that can be asked for a live stream.
///
/// `request_stream` may block (permission prompts, device warm-up); callers
/// run it off the async executor.
pub trait CaptureDevice: Send + Sync {
    fn request_stream(&self, constraints: &CameraSettings)
        -> Result<Box<dyn VideoStream>, CameraError>;
}

/// A granted live stream.
pub trait VideoStream: Send {
    /// The latest frame, or `None` if the device has not produced one yet.
    fn current_frame(&self) -> Option<RawFrame>;

    /// Release every track of the stream. Must be safe to call more than once.
    fn stop_all_tracks(&mut self);
}

/// Device used when the build has no camera backend: every request is denied.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableDevice;

impl CaptureDevice for UnavailableDevice {
    fn request_stream(
        &self,
        _constraints: &CameraSettings,
    ) -> Result<Box<dyn VideoStream>, CameraError> {
        Err(CameraError::NoBackend)
    }
}

/// A device whose "live feed" is a fixed still image.
///
/// Useful for demos without a webcam and as a deterministic source in tests.
/// The device counts the streams it has handed out that are still open.
#[derive(Debug, Clone)]
pub struct StillImageDevice {
    frame: RawFrame,
    open_streams: Arc<AtomicUsize>,
}

impl StillImageDevice {
    /// Build a device from an already-decoded RGB image.
    pub fn from_rgb(image: image::RgbImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            frame: RawFrame {
                data: image.into_raw(),
                width,
                height,
                timestamp: Instant::now(),
            },
            open_streams: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Build a device from encoded image bytes (PNG, JPEG, ...).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CameraError> {
        let image =
            image::load_from_memory(bytes).map_err(|e| CameraError::OpenFailed(e.to_string()))?;
        Ok(Self::from_rgb(image.to_rgb8()))
    }

    /// Build a device from an image file on disk.
    pub fn from_path(path: &Path) -> Result<Self, CameraError> {
        let bytes = std::fs::read(path)
            .map_err(|e| CameraError::OpenFailed(format!("{}: {}", path.display(), e)))?;
        Self::from_bytes(&bytes)
    }

    /// Number of granted streams whose tracks have not been stopped.
    pub fn open_streams(&self) -> usize {
        self.open_streams.load(Ordering::SeqCst)
    }
}

impl CaptureDevice for StillImageDevice {
    fn request_stream(
        &self,
        _constraints: &CameraSettings,
    ) -> Result<Box<dyn VideoStream>, CameraError> {
        self.open_streams.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(StillStream {
            frame: self.frame.clone(),
            open_streams: Arc::clone(&self.open_streams),
            stopped: AtomicBool::new(false),
        }))
    }
}

struct StillStream {
    frame: RawFrame,
    open_streams: Arc<AtomicUsize>,
    stopped: AtomicBool,
}

impl VideoStream for StillStream {
    fn current_frame(&self) -> Option<RawFrame> {
        if self.stopped.load(Ordering::SeqCst) {
            return None;
        }
        let mut frame = self.frame.clone();
        frame.timestamp = Instant::now();
        Some(frame)
    }

    fn stop_all_tracks(&mut self) {
        if !self.stopped.swap(true, Ordering::SeqCst) {
            self.open_streams.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

impl Drop for StillStream {
    fn drop(&mut self) {
        self.stop_all_tracks();
    }
}

/// List all available camera devices on the system.
///
/// If no cameras are found, returns an empty vector (not an error).
#[cfg(feature = "native-camera")]
pub fn list_devices() -> Result<Vec<super::types::CameraInfo>, CameraError> {
    use nokhwa::query;
    use nokhwa::utils::ApiBackend;

    let devices = query(ApiBackend::Auto).map_err(|e| CameraError::QueryFailed(e.to_string()))?;

    Ok(devices
        .into_iter()
        .map(|d| super::types::CameraInfo {
            index: d.index().as_index().unwrap_or(0),
            name: d.human_name(),
            description: d.description().to_string(),
        })
        .collect())
}

/// Without a camera backend there is nothing to enumerate.
#[cfg(not(feature = "native-camera"))]
pub fn list_devices() -> Result<Vec<super::types::CameraInfo>, CameraError> {
    Ok(Vec::new())
}
