//! Error types and result aliases for the Hackerbot vision assistant.
//!
//! This module defines the core error type [`HackerbotError`] and the [`Result`] type alias
//! used throughout the crate. Parse and geometry failures have their own enums so that the
//! turn processor can report them to the user instead of aborting the session.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HackerbotError {
    #[error("LLM gateway error: {0}")]
    GatewayError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Image error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("Camera error: {0}")]
    DeviceError(String),

    #[error("Arm error: {0}")]
    ArmError(String),

    #[error("Could not parse location: {0}")]
    ParseError(#[from] BoxParseError),

    #[error("Geometry error: {0}")]
    GeometryError(#[from] GeometryError),

    #[error("Invalid interaction mode: '{0}'")]
    InvalidMode(String),

    #[error("Protocol error: {0}")]
    ProtocolError(String),
}

/// Failures while extracting a bounding box from model output.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BoxParseError {
    #[error("marker {0:?} not found in response")]
    MissingMarker(String),

    #[error("expected a 4-element array or null, got {0:?}")]
    InvalidSyntax(String),

    #[error("expected 4 coordinates, got {0}")]
    WrongArity(usize),

    #[error("coordinate {index} is not a number: {value}")]
    NonNumeric { index: usize, value: String },

    #[error("box is inverted: min {min} > max {max}")]
    Inverted { min: f64, max: f64 },

    #[error("coordinate {value} outside [0, {limit}]")]
    OutOfRange { value: f64, limit: f64 },

    #[error("pixel coordinate {value} is not a whole number")]
    Fractional { value: f64 },
}

/// Failures in pixel or joint-angle arithmetic.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("joint {index} would move to {angle:.2}°, outside [{min}°, {max}°]")]
    JointOutOfRange {
        index: usize,
        angle: f64,
        min: f64,
        max: f64,
    },

    #[error("invalid frame dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
}

pub type Result<T> = std::result::Result<T, HackerbotError>;
