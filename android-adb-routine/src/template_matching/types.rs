/// Template matching data types
use super::error::TemplateError;
use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Absolute screen coordinate in capture pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub x: u32,
    pub y: u32,
}

impl Point {
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Reference image of a UI element
#[derive(Clone, Debug)]
pub struct Template {
    /// Lookup key in the template store (e.g. "sousuo.png")
    pub name: String,
    /// Colour pixels; scoring uses all three channels
    pub pixels: RgbImage,
    pub width: u32,
    pub height: u32,
}

impl Template {
    pub fn new(name: impl Into<String>, pixels: RgbImage) -> Self {
        let (width, height) = pixels.dimensions();
        Self {
            name: name.into(),
            pixels,
            width,
            height,
        }
    }

    /// Decode an encoded image (PNG, JPEG) into a template.
    pub fn from_bytes(name: impl Into<String>, bytes: &[u8]) -> Result<Self, TemplateError> {
        let name = name.into();
        let image = image::load_from_memory(bytes).map_err(|source| TemplateError::Decode {
            name: name.clone(),
            source,
        })?;
        let template = Self::new(name, image.to_rgb8());
        template.ensure_not_empty()?;
        Ok(template)
    }

    pub(crate) fn ensure_not_empty(&self) -> Result<(), TemplateError> {
        if self.width == 0 || self.height == 0 {
            return Err(TemplateError::Empty {
                name: self.name.clone(),
            });
        }
        Ok(())
    }

    /// Center of this template when its top-left corner sits at `(x, y)`.
    pub fn center_at(&self, x: u32, y: u32) -> Point {
        Point::new(x + self.width / 2, y + self.height / 2)
    }
}

/// Outcome of one match call.
///
/// `x`/`y` hold the match center only when `found`; otherwise both are `-1`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MatchResult {
    pub found: bool,
    pub x: i32,
    pub y: i32,
    /// Last observed score, `None` if no capture was ever scored
    pub score: Option<f32>,
}

impl MatchResult {
    pub const NOT_FOUND: i32 = -1;

    pub fn found_at(center: Point, score: f32) -> Self {
        Self {
            found: true,
            x: center.x as i32,
            y: center.y as i32,
            score: Some(score),
        }
    }

    pub fn not_found(score: Option<f32>) -> Self {
        Self {
            found: false,
            x: Self::NOT_FOUND,
            y: Self::NOT_FOUND,
            score,
        }
    }

    /// Match center, present only for a successful match.
    pub fn position(&self) -> Option<Point> {
        if !self.found {
            return None;
        }
        Some(Point::new(
            u32::try_from(self.x).ok()?,
            u32::try_from(self.y).ok()?,
        ))
    }
}

impl Default for MatchResult {
    fn default() -> Self {
        Self::not_found(None)
    }
}

impl fmt::Display for MatchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.found, self.score) {
            (true, Some(score)) => write!(f, "({}, {}) score {:.4}", self.x, self.y, score),
            (_, Some(score)) => write!(f, "not found, last score {:.4}", score),
            (_, None) => write!(f, "not found"),
        }
    }
}
