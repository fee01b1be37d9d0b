//! Pixel and joint-angle arithmetic.
//!
//! Two independent conversions live here:
//!
//! - [`annotation_rect`] maps a box to the integer corners a rectangle is drawn between.
//! - [`CameraModel::pan_tilt_delta`] turns the offset of a normalized box's center from the
//!   image center into pan/tilt corrections. The diagonal field of view is split across the
//!   two axes in proportion to the frame's width and height.

use crate::error::GeometryError;
use crate::vision::bounding_box::{BoundingBox, BoxSpace};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const JOINT_COUNT: usize = 6;
pub const TILT_JOINT: usize = 3;
pub const PAN_JOINT: usize = 4;

/// Integer pixel position, origin at the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelPoint {
    pub x: i32,
    pub y: i32,
}

impl fmt::Display for PixelPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Corners a rectangle is drawn between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub start: PixelPoint,
    pub end: PixelPoint,
}

/// Map a box to drawable pixel corners.
///
/// Normalized boxes are scaled by the frame size and truncated toward zero. Pixel boxes
/// pass through unchanged; `BoxParser` only yields whole-number pixel coordinates.
pub fn annotation_rect(
    bbox: &BoundingBox,
    space: BoxSpace,
    width: u32,
    height: u32,
) -> PixelRect {
    let (sx, sy) = match space {
        BoxSpace::Normalized => (f64::from(width), f64::from(height)),
        BoxSpace::Pixel => (1.0, 1.0),
    };

    PixelRect {
        start: PixelPoint {
            x: (bbox.xmin * sx) as i32,
            y: (bbox.ymin * sy) as i32,
        },
        end: PixelPoint {
            x: (bbox.xmax * sx) as i32,
            y: (bbox.ymax * sy) as i32,
        },
    }
}

/// Offset of the box center from the image center, in normalized units.
///
/// Left of center and above center are negative.
pub fn center_offset(bbox: &BoundingBox) -> (f64, f64) {
    let xc = ((bbox.xmin - 0.5) + (bbox.xmax - 0.5)) / 2.0;
    let yc = ((bbox.ymin - 0.5) + (bbox.ymax - 0.5)) / 2.0;
    (xc, yc)
}

/// Angular correction in degrees. Positive pan turns left, positive tilt turns up.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PanTilt {
    pub pan: f64,
    pub tilt: f64,
}

/// Fixed field-of-view and resolution model of the arm camera.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraModel {
    pub width: u32,
    pub height: u32,
    pub fov_degrees: f64,
}

impl Default for CameraModel {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            fov_degrees: 120.0,
        }
    }
}

impl CameraModel {
    pub fn new(width: u32, height: u32, fov_degrees: f64) -> Result<Self, GeometryError> {
        if width == 0 || height == 0 {
            return Err(GeometryError::InvalidDimensions { width, height });
        }
        Ok(Self {
            width,
            height,
            fov_degrees,
        })
    }

    fn diagonal(&self) -> f64 {
        f64::from(self.width).hypot(f64::from(self.height))
    }

    /// Degrees spanned by the full frame width.
    pub fn degrees_x(&self) -> f64 {
        f64::from(self.width) / self.diagonal() * self.fov_degrees
    }

    /// Degrees spanned by the full frame height.
    pub fn degrees_y(&self) -> f64 {
        f64::from(self.height) / self.diagonal() * self.fov_degrees
    }

    /// Correction that brings a normalized box's center to the image center.
    pub fn pan_tilt_delta(&self, bbox: &BoundingBox) -> PanTilt {
        let (xc, yc) = center_offset(bbox);
        PanTilt {
            pan: -xc * self.degrees_x(),
            tilt: -yc * self.degrees_y(),
        }
    }
}

/// Absolute angles of the six arm joints, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct JointVector(pub [f64; JOINT_COUNT]);

impl JointVector {
    pub fn zero() -> Self {
        Self([0.0; JOINT_COUNT])
    }

    pub fn angles(&self) -> &[f64; JOINT_COUNT] {
        &self.0
    }

    pub fn pan(&self) -> f64 {
        self.0[PAN_JOINT]
    }

    pub fn tilt(&self) -> f64 {
        self.0[TILT_JOINT]
    }

    /// New vector with the correction added at the pan and tilt joints.
    pub fn offset_by(&self, delta: PanTilt) -> Self {
        let mut angles = self.0;
        angles[PAN_JOINT] += delta.pan;
        angles[TILT_JOINT] += delta.tilt;
        Self(angles)
    }
}

impl fmt::Display for JointVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|a| format!("{:.2}", a)).collect();
        write!(f, "[{}]", parts.join(", "))
    }
}

/// Per-joint range an arm command must stay within.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JointLimits {
    pub min: [f64; JOINT_COUNT],
    pub max: [f64; JOINT_COUNT],
}

impl Default for JointLimits {
    fn default() -> Self {
        Self {
            min: [-165.0, -165.0, -165.0, -165.0, -165.0, -175.0],
            max: [165.0, 165.0, 165.0, 165.0, 165.0, 175.0],
        }
    }
}

impl JointLimits {
    /// Same range on every joint.
    pub fn uniform(limit: f64) -> Self {
        Self {
            min: [-limit; JOINT_COUNT],
            max: [limit; JOINT_COUNT],
        }
    }

    pub fn check(&self, joints: &JointVector) -> Result<(), GeometryError> {
        for (index, &angle) in joints.0.iter().enumerate() {
            let (min, max) = (self.min[index], self.max[index]);
            if !angle.is_finite() || angle < min || angle > max {
                return Err(GeometryError::JointOutOfRange {
                    index,
                    angle,
                    min,
                    max,
                });
            }
        }
        Ok(())
    }
}
