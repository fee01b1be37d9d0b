pub mod arm;
pub mod camera;
pub mod shared;
#[cfg(feature = "v4l2")]
pub mod v4l2;

pub use arm::{open_arm, ArmConfig, ArmController, DryRunArm, SerialArm};
pub use camera::{
    open_frame_source, CameraConfig, FileCamera, FrameSource, SyntheticCamera, DEFAULT_CHAT_CAMERA,
    DEFAULT_TOOL_CAMERA,
};
pub use shared::SharedHardware;
