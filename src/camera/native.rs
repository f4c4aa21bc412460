//! Webcam backend built on nokhwa.
//!
//! The camera is opened inside a background thread that continuously stores
//! the latest frame in a shared buffer; the granted [`VideoStream`] reads from
//! that buffer and stops the thread when its tracks are released.

use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{
    CameraFormat, CameraIndex, FrameFormat as NokhwaFrameFormat, RequestedFormat,
    RequestedFormatType,
};
use nokhwa::Camera;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::device::{list_devices, CaptureDevice, VideoStream};
use super::frame_utils::convert_to_rgb;
use super::types::{CameraError, CameraSettings, RawFrame, Resolution};

/// Commands sent to the capture thread.
enum CaptureCommand {
    Stop,
}

/// The system webcam.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeCameraDevice;

impl CaptureDevice for NativeCameraDevice {
    fn request_stream(
        &self,
        constraints: &CameraSettings,
    ) -> Result<Box<dyn VideoStream>, CameraError> {
        let devices = list_devices()?;
        if devices.is_empty() {
            return Err(CameraError::NoDevices);
        }
        if !devices.iter().any(|d| d.index == constraints.device_index) {
            return Err(CameraError::DeviceNotFound(constraints.device_index));
        }

        let frame_buffer = Arc::new(Mutex::new(None));
        let stop_signal = Arc::new(AtomicBool::new(false));
        let (tx, rx) = mpsc::channel();
        let (info_tx, info_rx) = mpsc::channel::<Result<(Resolution, u32), CameraError>>();

        let buffer = Arc::clone(&frame_buffer);
        let stop = Arc::clone(&stop_signal);
        let settings = constraints.clone();
        let handle = thread::spawn(move || {
            run_capture_loop(settings, buffer, stop, rx, info_tx);
        });

        let mut stream = NativeStream {
            frame_buffer,
            stop_signal,
            command_tx: Some(tx),
            capture_thread: Some(handle),
        };

        match info_rx.recv() {
            Ok(Ok((res, fps))) => {
                log::info!("Camera stream granted at {}x{} @ {} fps", res.width, res.height, fps);
                Ok(Box::new(stream))
            }
            Ok(Err(e)) => {
                stream.stop_all_tracks();
                Err(e)
            }
            Err(_) => {
                stream.stop_all_tracks();
                Err(CameraError::StreamFailed(
                    "Capture thread terminated unexpectedly".to_string(),
                ))
            }
        }
    }
}

struct NativeStream {
    frame_buffer: Arc<Mutex<Option<RawFrame>>>,
    stop_signal: Arc<AtomicBool>,
    command_tx: Option<Sender<CaptureCommand>>,
    capture_thread: Option<JoinHandle<()>>,
}

impl VideoStream for NativeStream {
    fn current_frame(&self) -> Option<RawFrame> {
        let buffer = self.frame_buffer.lock().ok()?;
        buffer.clone()
    }

    fn stop_all_tracks(&mut self) {
        self.stop_signal.store(true, Ordering::SeqCst);

        // Also send stop command via channel (in case thread is blocked)
        if let Some(tx) = self.command_tx.take() {
            let _ = tx.send(CaptureCommand::Stop);
        }

        if let Some(handle) = self.capture_thread.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for NativeStream {
    fn drop(&mut self) {
        self.stop_all_tracks();
    }
}

fn run_capture_loop(
    settings: CameraSettings,
    buffer: Arc<Mutex<Option<RawFrame>>>,
    stop: Arc<AtomicBool>,
    rx: Receiver<CaptureCommand>,
    info_tx: Sender<Result<(Resolution, u32), CameraError>>,
) {
    let index = CameraIndex::Index(settings.device_index);

    let mut camera = match open_camera_with_fallback(&index, &settings) {
        Ok(cam) => cam,
        Err(e) => {
            let _ = info_tx.send(Err(e));
            return;
        }
    };

    if let Err(e) = camera.open_stream() {
        let _ = info_tx.send(Err(CameraError::StreamFailed(e.to_string())));
        return;
    }

    let res = camera.resolution();
    let actual_res = Resolution {
        width: res.width(),
        height: res.height(),
    };
    let _ = info_tx.send(Ok((actual_res, camera.frame_rate())));

    while !stop.load(Ordering::Relaxed) {
        if let Ok(CaptureCommand::Stop) = rx.try_recv() {
            break;
        }

        if let Ok(raw) = camera.frame() {
            // Frames that fail to decode are skipped
            if let Some(frame) = convert_to_rgb(&raw) {
                if let Ok(mut buf) = buffer.lock() {
                    *buf = Some(frame);
                }
            }
        }

        thread::sleep(Duration::from_millis(1));
    }

    let _ = camera.stop_stream();
}

/// Try to open a camera with multiple format fallback strategies.
fn open_camera_with_fallback(
    index: &CameraIndex,
    settings: &CameraSettings,
) -> Result<Camera, CameraError> {
    let resolution =
        nokhwa::utils::Resolution::new(settings.resolution.width, settings.resolution.height);
    let format_attempts = [
        RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(CameraFormat::new(
            resolution,
            NokhwaFrameFormat::MJPEG,
            settings.fps,
        ))),
        RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(CameraFormat::new(
            resolution,
            NokhwaFrameFormat::YUYV,
            settings.fps,
        ))),
        RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestResolution),
    ];

    let mut last_error = String::from("no format accepted");

    for requested in format_attempts {
        match Camera::new(index.clone(), requested) {
            Ok(cam) => return Ok(cam),
            Err(e) => last_error = e.to_string(),
        }
    }

    let msg = last_error.to_lowercase();
    if msg.contains("permission")
        || msg.contains("denied")
        || msg.contains("authorization")
        || msg.contains("access")
    {
        Err(CameraError::PermissionDenied)
    } else {
        Err(CameraError::OpenFailed(last_error))
    }
}
