//! Camera types and data structures.

use std::fmt;
use std::time::Instant;

/// Information about an available camera device.
#[derive(Debug, Clone)]
pub struct CameraInfo {
    /// Device index for selection
    pub index: u32,
    /// Human-readable device name
    pub name: String,
    /// Device description
    pub description: String,
}

impl fmt::Display for CameraInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} ({})", self.index, self.name, self.description)
    }
}

/// Camera resolution settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    /// Medium resolution (640x480) - what browsers hand out for `{ video: true }`
    pub const MEDIUM: Resolution = Resolution {
        width: 640,
        height: 480,
    };
}

impl Default for Resolution {
    fn default() -> Self {
        Self::MEDIUM
    }
}

/// A raw RGB frame read from a live stream.
#[derive(Debug, Clone)]
pub struct RawFrame {
    /// Raw pixel data in RGB format (3 bytes per pixel)
    pub data: Vec<u8>,
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Timestamp when frame was read from the device
    pub timestamp: Instant,
}

impl RawFrame {
    /// Bytes per pixel (always 3, RGB).
    pub fn bytes_per_pixel(&self) -> usize {
        3
    }

    /// Whether `data` holds exactly `width * height` RGB pixels.
    pub fn is_well_formed(&self) -> bool {
        self.width > 0
            && self.height > 0
            && self.data.len() == self.width as usize * self.height as usize * self.bytes_per_pixel()
    }
}

/// Constraints passed to the device when a stream is requested.
#[derive(Debug, Clone)]
pub struct CameraSettings {
    /// Camera device index
    pub device_index: u32,
    /// Capture resolution
    pub resolution: Resolution,
    /// Target FPS (actual may vary)
    pub fps: u32,
    /// Mirror horizontally before frames leave the session
    pub mirror: bool,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            device_index: 0,
            resolution: Resolution::default(),
            fps: 30,
            mirror: false,
        }
    }
}

/// Errors that can occur while acquiring or reading the camera.
///
/// Every variant is a device-access failure: the session that produced it
/// is left exactly as it was before the request.
#[derive(Debug)]
pub enum CameraError {
    /// No cameras found on the system
    NoDevices,
    /// Failed to query camera devices
    QueryFailed(String),
    /// Failed to open camera
    OpenFailed(String),
    /// Camera permission denied
    PermissionDenied,
    /// Camera device not found at specified index
    DeviceNotFound(u32),
    /// Failed to start video stream
    StreamFailed(String),
    /// A session is already active (or being acquired)
    AlreadyRunning,
    /// This build has no camera backend
    NoBackend,
}

impl fmt::Display for CameraError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CameraError::NoDevices => write!(f, "No cameras found"),
            CameraError::QueryFailed(msg) => write!(f, "Failed to query cameras: {}", msg),
            CameraError::OpenFailed(msg) => write!(f, "Failed to open camera: {}", msg),
            CameraError::PermissionDenied => {
                write!(
                    f,
                    "Camera permission denied. Grant camera access to this application and try again"
                )
            }
            CameraError::DeviceNotFound(index) => {
                write!(f, "Camera device {} not found", index)
            }
            CameraError::StreamFailed(msg) => write!(f, "Failed to start camera stream: {}", msg),
            CameraError::AlreadyRunning => write!(f, "Camera session is already active"),
            CameraError::NoBackend => write!(
                f,
                "No camera backend available. Rebuild with --features native-camera or use --still"
            ),
        }
    }
}

impl std::error::Error for CameraError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camera_info_display() {
        let info = CameraInfo {
            index: 0,
            name: "Test Camera".to_string(),
            description: "Built-in".to_string(),
        };
        assert_eq!(format!("{}", info), "[0] Test Camera (Built-in)");
    }

    #[test]
    fn test_resolution_default() {
        assert_eq!(Resolution::default(), Resolution::MEDIUM);
        assert_eq!(Resolution::MEDIUM.width, 640);
        assert_eq!(Resolution::MEDIUM.height, 480);
    }

    #[test]
    fn test_camera_settings_default() {
        let settings = CameraSettings::default();
        assert_eq!(settings.device_index, 0);
        assert_eq!(settings.resolution, Resolution::MEDIUM);
        assert_eq!(settings.fps, 30);
        assert!(!settings.mirror);
    }

    #[test]
    fn test_camera_error_display() {
        assert_eq!(format!("{}", CameraError::NoDevices), "No cameras found");
        assert_eq!(
            format!("{}", CameraError::OpenFailed("busy".to_string())),
            "Failed to open camera: busy"
        );
        assert!(format!("{}", CameraError::PermissionDenied).contains("permission denied"));
        assert!(format!("{}", CameraError::DeviceNotFound(5)).contains('5'));
        assert!(format!("{}", CameraError::NoBackend).contains("native-camera"));
    }

    #[test]
    fn test_raw_frame_well_formed() {
        let frame = RawFrame {
            data: vec![0; 12],
            width: 2,
            height: 2,
            timestamp: Instant::now(),
        };
        assert!(frame.is_well_formed());

        let short = RawFrame {
            data: vec![0; 11],
            ..frame.clone()
        };
        assert!(!short.is_well_formed());
    }
}
