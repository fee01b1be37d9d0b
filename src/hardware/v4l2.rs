//! V4L2 camera backend.
//!
//! Each capture opens the device node, negotiates MJPG at the configured size and rate,
//! drops a few warm-up buffers so auto-exposure settles, decodes one frame and closes the
//! device again.

use crate::error::{HackerbotError, Result};
use crate::hardware::camera::{CameraConfig, FrameSource};
use crate::vision::frame::Frame;
use tracing::{debug, warn};
use v4l::buffer::Type;
use v4l::io::traits::CaptureStream;
use v4l::prelude::*;
use v4l::video::capture::Parameters;
use v4l::video::Capture;
use v4l::FourCC;

const WARMUP_FRAMES: usize = 3;
const BUFFER_COUNT: u32 = 4;

pub struct V4l2Camera {
    config: CameraConfig,
}

impl V4l2Camera {
    pub fn new(config: CameraConfig) -> Self {
        Self { config }
    }

    fn device_error(&self, action: &str, err: impl std::fmt::Display) -> HackerbotError {
        HackerbotError::DeviceError(format!("{} {}: {}", action, self.config.device, err))
    }
}

impl FrameSource for V4l2Camera {
    fn capture(&self) -> Result<Frame> {
        let device = Device::with_path(&self.config.device)
            .map_err(|e| self.device_error("open v4l2 device", e))?;

        let mut format = device.format().map_err(|e| self.device_error("read format of", e))?;
        format.width = self.config.width;
        format.height = self.config.height;
        format.fourcc = FourCC::new(b"MJPG");
        let format = device.set_format(&format).map_err(|e| self.device_error("set format on", e))?;

        if self.config.target_fps > 0 {
            if let Err(err) = device.set_params(&Parameters::with_fps(self.config.target_fps)) {
                warn!(device = %self.config.device, error = %err, "Failed to set frame rate");
            }
        }

        let mut stream = MmapStream::with_buffers(&device, Type::VideoCapture, BUFFER_COUNT)
            .map_err(|e| self.device_error("create buffer stream for", e))?;

        for _ in 0..WARMUP_FRAMES {
            stream.next().map_err(|e| self.device_error("capture from", e))?;
        }
        let (buf, meta) = stream.next().map_err(|e| self.device_error("capture from", e))?;
        let used = (meta.bytesused as usize).min(buf.len());
        let data = &buf[..used];

        debug!(
            device = %self.config.device,
            fourcc = %format.fourcc,
            width = format.width,
            height = format.height,
            bytes = used,
            "Captured v4l2 frame"
        );

        let frame = match &format.fourcc.repr {
            b"MJPG" | b"JPEG" => Frame::decode(data)?,
            b"RGB3" => Frame::from_rgb(format.width, format.height, data.to_vec())?,
            other => {
                return Err(self.device_error(
                    "unsupported pixel format from",
                    String::from_utf8_lossy(other),
                ))
            }
        };

        Ok(frame.resized(self.config.width, self.config.height))
    }

    fn describe(&self) -> String {
        format!(
            "{} ({}x{} @ {} fps)",
            self.config.device, self.config.width, self.config.height, self.config.target_fps
        )
    }
}
