//! Bounding-box extraction from free-form model output.
//!
//! The accepted grammar is small: an optional literal marker, then either a JSON array of
//! exactly four numbers or the `null` literal, optionally wrapped in backticks or a code
//! fence. Anything else is a typed [`BoxParseError`].

use crate::error::BoxParseError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Coordinate space a model is asked to answer in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoxSpace {
    /// Each coordinate in [0, 1] relative to frame width/height.
    Normalized,
    /// Pixel coordinates in [0, W] x [0, H].
    Pixel,
}

/// Region of interest as two opposite corners, top-left first.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

impl BoundingBox {
    pub fn new(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Self {
        Self {
            xmin,
            ymin,
            xmax,
            ymax,
        }
    }

    /// Check ordering and range for the given space and frame size. Pixel coordinates
    /// must also be whole numbers.
    pub fn validate(&self, space: BoxSpace, width: u32, height: u32) -> Result<(), BoxParseError> {
        let (x_limit, y_limit) = match space {
            BoxSpace::Normalized => (1.0, 1.0),
            BoxSpace::Pixel => (f64::from(width), f64::from(height)),
        };

        for (value, limit) in [
            (self.xmin, x_limit),
            (self.ymin, y_limit),
            (self.xmax, x_limit),
            (self.ymax, y_limit),
        ] {
            if !(0.0..=limit).contains(&value) {
                return Err(BoxParseError::OutOfRange { value, limit });
            }
            if space == BoxSpace::Pixel && value.fract() != 0.0 {
                return Err(BoxParseError::Fractional { value });
            }
        }

        if self.xmin > self.xmax {
            return Err(BoxParseError::Inverted {
                min: self.xmin,
                max: self.xmax,
            });
        }
        if self.ymin > self.ymax {
            return Err(BoxParseError::Inverted {
                min: self.ymin,
                max: self.ymax,
            });
        }

        Ok(())
    }
}

/// Extracts a box (or an explicit "not found") from a model response.
#[derive(Debug, Clone)]
pub struct BoxParser {
    marker: Option<String>,
    space: BoxSpace,
}

impl BoxParser {
    pub fn new(marker: Option<&str>, space: BoxSpace) -> Self {
        Self {
            marker: marker.map(String::from),
            space,
        }
    }

    pub fn space(&self) -> BoxSpace {
        self.space
    }

    /// Parse `response` for a frame of `width` x `height`.
    ///
    /// `Ok(None)` means the model reported the object as not found.
    pub fn parse(
        &self,
        response: &str,
        width: u32,
        height: u32,
    ) -> Result<Option<BoundingBox>, BoxParseError> {
        let payload = match &self.marker {
            Some(marker) => after_marker(response, marker)?,
            None => response,
        };

        let bbox = parse_payload(strip_fences(payload))?;
        if let Some(bbox) = &bbox {
            bbox.validate(self.space, width, height)?;
        }
        Ok(bbox)
    }
}

// Text between the first marker and the next one (or the end)
fn after_marker<'a>(response: &'a str, marker: &str) -> Result<&'a str, BoxParseError> {
    let start = response
        .find(marker)
        .ok_or_else(|| BoxParseError::MissingMarker(marker.to_string()))?
        + marker.len();
    let rest = &response[start..];

    Ok(match rest.find(marker) {
        Some(end) => &rest[..end],
        None => rest,
    })
}

fn strip_fences(payload: &str) -> &str {
    let mut text = payload.trim();

    if let Some(inner) = text.strip_prefix("```") {
        let inner = inner.strip_prefix("json").unwrap_or(inner);
        text = inner.strip_suffix("```").unwrap_or(inner).trim();
    }

    text.trim_matches('`').trim()
}

fn parse_payload(payload: &str) -> Result<Option<BoundingBox>, BoxParseError> {
    if payload.eq_ignore_ascii_case("null") || payload.eq_ignore_ascii_case("none") {
        return Ok(None);
    }

    let value: Value = serde_json::from_str(payload)
        .map_err(|_| BoxParseError::InvalidSyntax(excerpt(payload)))?;

    let items = match value {
        Value::Null => return Ok(None),
        Value::Array(items) => items,
        other => return Err(BoxParseError::InvalidSyntax(excerpt(&other.to_string()))),
    };

    if items.len() != 4 {
        return Err(BoxParseError::WrongArity(items.len()));
    }

    let mut coords = [0.0; 4];
    for (index, item) in items.iter().enumerate() {
        coords[index] = item.as_f64().ok_or_else(|| BoxParseError::NonNumeric {
            index,
            value: item.to_string(),
        })?;
    }

    Ok(Some(BoundingBox::new(coords[0], coords[1], coords[2], coords[3])))
}

fn excerpt(text: &str) -> String {
    const LIMIT: usize = 80;
    match text.char_indices().nth(LIMIT) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
