//! Payloads that travel between the stages.
//!

use chrono::{DateTime, Local};
use image::GrayImage;

/// Axis aligned box in pixel coordinates.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Scale every coordinate by (sx, sy).
    pub fn scale(&self, sx: f32, sy: f32) -> Self {
        Self {
            x: (self.x as f32 * sx).round() as u32,
            y: (self.y as f32 * sy).round() as u32,
            width: (self.width as f32 * sx).round() as u32,
            height: (self.height as f32 * sy).round() as u32,
        }
    }

    /// Intersection with a `width` x `height` frame anchored at the origin.
    pub fn clamp(&self, width: u32, height: u32) -> Self {
        let x = self.x.min(width);
        let y = self.y.min(height);
        Self {
            x,
            y,
            width: self.width.min(width - x),
            height: self.height.min(height - y),
        }
    }

    pub fn area(&self) -> u32 {
        self.width * self.height
    }
}

/// Grayscale still pulled between two recording bursts.
///
#[derive(Debug, Clone)]
pub struct StillFrame {
    pub ordinal: u64,
    pub captured_at: DateTime<Local>,
    pub image: GrayImage,
}

/// Crop of a still that contains motion.
///
#[derive(Debug, Clone)]
pub struct Candidate {
    pub still: u64, // Ordinal of the originating still
    pub rect: Rect, // Box in native resolution
    pub crop: GrayImage, // Pixels inside `rect`
}

/// One recorded segment, owned by acquisition until it is handed to persistence.
///
#[derive(Debug)]
pub struct VideoSegment {
    pub bytes: Vec<u8>,
    pub container: &'static str,
    pub started_at: DateTime<Local>,
    pub completed_at: DateTime<Local>,
    pub first_still: u64,
    pub last_still: u64,
    pub recorded_seconds: f64,
}
