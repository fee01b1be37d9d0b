pub mod bounding_box;
pub mod frame;
pub mod geometry;
pub mod prompts;

pub use bounding_box::{BoundingBox, BoxParser, BoxSpace};
pub use frame::Frame;
pub use geometry::{
    annotation_rect, CameraModel, JointLimits, JointVector, PanTilt, PixelPoint, PixelRect,
};
