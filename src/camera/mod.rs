//! Camera access for live capture.
//!
//! - Device seam via [`CaptureDevice`] and [`VideoStream`]
//! - Session lifecycle via [`CaptureSession`]
//! - Stream constraints via [`CameraSettings`] and [`Resolution`]
//! - A webcam backend ([`NativeCameraDevice`]) behind the `native-camera` feature

mod device;
mod frame_utils;
#[cfg(feature = "native-camera")]
mod native;
mod session;
mod types;

pub use device::{list_devices, CaptureDevice, StillImageDevice, UnavailableDevice, VideoStream};
pub use frame_utils::mirror_horizontal;
#[cfg(feature = "native-camera")]
pub use native::NativeCameraDevice;
pub use session::CaptureSession;
pub use types::{CameraError, CameraInfo, CameraSettings, RawFrame, Resolution};

/// The device live sessions should use by default in this build.
pub fn default_device() -> std::sync::Arc<dyn CaptureDevice> {
    #[cfg(feature = "native-camera")]
    {
        std::sync::Arc::new(NativeCameraDevice)
    }
    #[cfg(not(feature = "native-camera"))]
    {
        std::sync::Arc::new(UnavailableDevice)
    }
}
