//! Capture session manager.
//!
//! Owns the live stream of exactly one pipeline. The stream handle is held
//! iff the session is active; stopping releases every track and is a no-op
//! when nothing is held.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::device::{CaptureDevice, VideoStream};
use super::frame_utils::mirror_horizontal;
use super::types::{CameraError, CameraSettings, RawFrame};

pub struct CaptureSession {
    device: Arc<dyn CaptureDevice>,
    settings: CameraSettings,
    stream: Mutex<Option<Box<dyn VideoStream>>>,
    /// Set while a grant is being awaited
    acquiring: AtomicBool,
}

impl std::fmt::Debug for CaptureSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureSession")
            .field("settings", &self.settings)
            .field("active", &self.is_active())
            .finish_non_exhaustive()
    }
}

/// Clears the `acquiring` flag even if the start future is dropped mid-grant.
struct AcquireGuard<'a>(&'a AtomicBool);

impl Drop for AcquireGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl CaptureSession {
    pub fn new(device: Arc<dyn CaptureDevice>, settings: CameraSettings) -> Self {
        Self {
            device,
            settings,
            stream: Mutex::new(None),
            acquiring: AtomicBool::new(false),
        }
    }

    pub fn settings(&self) -> &CameraSettings {
        &self.settings
    }

    /// Request the camera and hold the granted stream.
    ///
    /// The device request runs on the blocking pool so the caller's executor
    /// keeps serving other pipelines while a permission prompt is pending.
    ///
    /// # Errors
    /// * `CameraError::AlreadyRunning` - a stream is held or being acquired
    /// * any error the device reports; the session stays inactive
    pub async fn start(&self) -> Result<(), CameraError> {
        if self.is_active() || self.acquiring.swap(true, Ordering::SeqCst) {
            return Err(CameraError::AlreadyRunning);
        }
        let _guard = AcquireGuard(&self.acquiring);

        let device = Arc::clone(&self.device);
        let settings = self.settings.clone();
        let granted = tokio::task::spawn_blocking(move || device.request_stream(&settings))
            .await
            .map_err(|e| {
                log::error!("Camera grant task failed: {}", e);
                CameraError::StreamFailed(e.to_string())
            })?;

        let stream = granted?;
        *self.lock() = Some(stream);
        log::info!("Capture session started (device {})", self.settings.device_index);
        Ok(())
    }

    /// Release every track and drop the handle. Idempotent.
    pub fn stop(&self) {
        let taken = self.lock().take();
        if let Some(mut stream) = taken {
            stream.stop_all_tracks();
            log::info!("Capture session stopped");
        }
    }

    pub fn is_active(&self) -> bool {
        self.lock().is_some()
    }

    /// The latest frame of the live stream, mirrored if configured.
    ///
    /// Returns `None` when the session is inactive or the device has not
    /// delivered a frame yet.
    pub fn current_frame(&self) -> Option<RawFrame> {
        let mut frame = self.lock().as_ref()?.current_frame()?;
        if self.settings.mirror {
            mirror_horizontal(&mut frame);
        }
        Some(frame)
    }

    fn lock(&self) -> MutexGuard<'_, Option<Box<dyn VideoStream>>> {
        self.stream.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.stop();
    }
}
