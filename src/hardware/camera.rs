//! Frame sources.
//!
//! A [`FrameSource`] opens its device, grabs one still and releases the device inside a
//! single [`FrameSource::capture`] call; nothing is held between turns.
//!
//! Sources are selected by a locator string:
//! - `/dev/videoN` or a bare index `N`: V4L2 device (requires the `v4l2` feature)
//! - `file://path`: a still image read from disk on every capture
//! - `stub://`: a generated test pattern
//!
//! Builds without the `v4l2` feature default to `stub://`, so both binaries start on any host.

use crate::error::{HackerbotError, Result};
use crate::vision::frame::Frame;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Camera the chat assistant opens when none is configured.
#[cfg(feature = "v4l2")]
pub const DEFAULT_CHAT_CAMERA: &str = "/dev/video2";
#[cfg(not(feature = "v4l2"))]
pub const DEFAULT_CHAT_CAMERA: &str = "stub://";

/// Camera the MCP tool server opens when none is configured.
#[cfg(feature = "v4l2")]
pub const DEFAULT_TOOL_CAMERA: &str = "/dev/video0";
#[cfg(not(feature = "v4l2"))]
pub const DEFAULT_TOOL_CAMERA: &str = "stub://";

/// Capture settings shared by all sources.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraConfig {
    pub device: String,
    pub width: u32,
    pub height: u32,
    pub target_fps: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device: std::env::var("HACKERBOT_CAMERA")
                .unwrap_or_else(|_| DEFAULT_CHAT_CAMERA.to_string()),
            width: 640,
            height: 480,
            target_fps: 30,
        }
    }
}

/// Produces a single still image on demand.
pub trait FrameSource: Send + Sync {
    fn capture(&self) -> Result<Frame>;

    /// Human-readable locator for logs
    fn describe(&self) -> String;
}

/// Build the source named by `config.device`.
pub fn open_frame_source(config: &CameraConfig) -> Result<Arc<dyn FrameSource>> {
    let device = config.device.trim();

    let source: Arc<dyn FrameSource> = if let Some(path) = device.strip_prefix("file://") {
        Arc::new(FileCamera::new(path, config.width, config.height))
    } else if device.starts_with("stub://") {
        if !cfg!(feature = "v4l2") {
            warn!("Built without the `v4l2` feature; serving a generated test pattern");
        }
        Arc::new(SyntheticCamera::new(config.width, config.height))
    } else {
        let path = match device.parse::<u32>() {
            Ok(index) => format!("/dev/video{}", index),
            Err(_) => device.to_string(),
        };
        open_device(CameraConfig {
            device: path,
            ..config.clone()
        })?
    };

    info!(source = %source.describe(), "Frame source ready");
    Ok(source)
}

#[cfg(feature = "v4l2")]
fn open_device(config: CameraConfig) -> Result<Arc<dyn FrameSource>> {
    Ok(Arc::new(crate::hardware::v4l2::V4l2Camera::new(config)))
}

#[cfg(not(feature = "v4l2"))]
fn open_device(config: CameraConfig) -> Result<Arc<dyn FrameSource>> {
    Err(HackerbotError::ConfigError(format!(
        "camera {} needs the `v4l2` feature; use file:// or stub:// otherwise",
        config.device
    )))
}

/// Reads a still image from disk on every capture.
pub struct FileCamera {
    path: PathBuf,
    width: u32,
    height: u32,
}

impl FileCamera {
    pub fn new(path: impl Into<PathBuf>, width: u32, height: u32) -> Self {
        Self {
            path: path.into(),
            width,
            height,
        }
    }
}

impl FrameSource for FileCamera {
    fn capture(&self) -> Result<Frame> {
        let bytes = std::fs::read(&self.path).map_err(|e| {
            HackerbotError::DeviceError(format!("failed to read {}: {}", self.path.display(), e))
        })?;
        let frame = Frame::decode(&bytes)?.resized(self.width, self.height);
        debug!(path = %self.path.display(), "Captured still from file");
        Ok(frame)
    }

    fn describe(&self) -> String {
        format!("file://{}", self.path.display())
    }
}

/// Generated gradient pattern that shifts with every capture.
pub struct SyntheticCamera {
    width: u32,
    height: u32,
    frame_count: AtomicU64,
}

impl SyntheticCamera {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            frame_count: AtomicU64::new(0),
        }
    }

    pub fn frames_captured(&self) -> u64 {
        self.frame_count.load(Ordering::Relaxed)
    }
}

impl FrameSource for SyntheticCamera {
    fn capture(&self) -> Result<Frame> {
        let count = self.frame_count.fetch_add(1, Ordering::Relaxed) + 1;
        let (w, h) = (self.width as usize, self.height as usize);

        let mut pixels = vec![0u8; w * h * 3];
        for (i, px) in pixels.chunks_exact_mut(3).enumerate() {
            let (x, y) = (i % w, i / w);
            px[0] = ((x * 255) / w.max(1)) as u8;
            px[1] = ((y * 255) / h.max(1)) as u8;
            px[2] = (count % 256) as u8;
        }

        Frame::from_rgb(self.width, self.height, pixels)
    }

    fn describe(&self) -> String {
        format!("stub://{}x{}", self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    fn config(device: &str) -> CameraConfig {
        CameraConfig {
            device: device.to_string(),
            width: 64,
            height: 48,
            target_fps: 30,
        }
    }

    #[test]
    fn test_synthetic_camera_produces_configured_size() {
        let camera = SyntheticCamera::new(64, 48);

        let frame = camera.capture().unwrap();

        assert_eq!((frame.width(), frame.height()), (64, 48));
        assert_eq!(camera.frames_captured(), 1);
    }

    #[test]
    fn test_synthetic_frames_differ() {
        let camera = SyntheticCamera::new(8, 8);
        assert_ne!(camera.capture().unwrap(), camera.capture().unwrap());
    }

    #[test]
    fn test_file_camera_resizes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("still.png");
        RgbImage::new(32, 24).save(&path).unwrap();

        let camera = FileCamera::new(&path, 64, 48);
        let frame = camera.capture().unwrap();

        assert_eq!((frame.width(), frame.height()), (64, 48));
    }

    #[test]
    fn test_file_camera_missing_file_is_device_error() {
        let camera = FileCamera::new("/nonexistent/still.jpg", 64, 48);

        let result = camera.capture();

        assert!(matches!(result, Err(HackerbotError::DeviceError(_))));
    }

    #[test]
    fn test_open_stub_source() {
        let source = open_frame_source(&config("stub://")).unwrap();
        assert_eq!(source.describe(), "stub://64x48");
    }

    #[test]
    fn test_open_file_source() {
        let source = open_frame_source(&config("file:///tmp/frame.jpg")).unwrap();
        assert_eq!(source.describe(), "file:///tmp/frame.jpg");
    }

    #[test]
    fn test_default_cameras_open() {
        for locator in [DEFAULT_CHAT_CAMERA, DEFAULT_TOOL_CAMERA] {
            let result = open_frame_source(&config(locator));
            assert!(result.is_ok(), "default camera {} failed to open", locator);
        }
    }

    #[cfg(not(feature = "v4l2"))]
    #[test]
    fn test_device_without_feature_is_config_error() {
        let result = open_frame_source(&config("2"));

        match result {
            Err(HackerbotError::ConfigError(msg)) => assert!(msg.contains("/dev/video2")),
            _ => panic!("Expected ConfigError"),
        }
    }
}
