//! Decoded RGBD video frames

use glam::Vec3;
use image::{Rgb, RgbImage};
use thiserror::Error;

/// Depth in length units covered by a full hue turn.
pub const DEPTH_SCALE: f32 = 3.0;

/// Errors raised when wrapping a decoded frame
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("Frame is empty ({0}x{1})")]
    Empty(u32, u32),
    #[error("Stored frame width must be even, got {0}")]
    OddWidth(u32),
    #[error("Depth half is {depth:?} but color half is {color:?}")]
    HalfMismatch { depth: (u32, u32), color: (u32, u32) },
}

/// A decoded frame of an RGBD video.
///
/// The stored image is `2W x H`: the left half carries hue-encoded depth, the
/// right half carries color at the same logical resolution `W x H`.
#[derive(Debug, Clone)]
pub struct RgbdFrame {
    image: RgbImage,
    logical_width: u32,
}

impl RgbdFrame {
    /// Wrap a decoded `2W x H` image.
    pub fn new(image: RgbImage) -> Result<Self, FrameError> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(FrameError::Empty(width, height));
        }
        if width % 2 != 0 {
            return Err(FrameError::OddWidth(width));
        }
        Ok(Self {
            image,
            logical_width: width / 2,
        })
    }

    /// Assemble a frame from separate depth and color images of equal size.
    pub fn from_halves(depth: &RgbImage, color: &RgbImage) -> Result<Self, FrameError> {
        if depth.dimensions() != color.dimensions() {
            return Err(FrameError::HalfMismatch {
                depth: depth.dimensions(),
                color: color.dimensions(),
            });
        }
        let (w, h) = depth.dimensions();
        let image = RgbImage::from_fn(w * 2, h, |x, y| {
            if x < w {
                *depth.get_pixel(x, y)
            } else {
                *color.get_pixel(x - w, y)
            }
        });
        Self::new(image)
    }

    /// Logical (half-width) size `(W, H)`.
    pub fn logical_size(&self) -> (u32, u32) {
        (self.logical_width, self.image.height())
    }

    /// Stored size `(2W, H)`.
    pub fn stored_size(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Number of logical pixels, `W * H`.
    pub fn point_count(&self) -> usize {
        self.logical_width as usize * self.image.height() as usize
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    /// Raw depth-half pixel. Caller guarantees `(x, y)` is in the logical frame.
    pub fn depth_rgb(&self, x: u32, y: u32) -> [u8; 3] {
        self.image.get_pixel(x, y).0
    }

    /// Decoded depth at logical pixel `(x, y)`.
    pub fn depth_at(&self, x: u32, y: u32) -> f32 {
        decode_depth(self.depth_rgb(x, y))
    }

    /// Depth-half pixel as a 0-1 color, for depth-map display.
    pub fn depth_color(&self, x: u32, y: u32) -> Vec3 {
        to_unit_rgb(self.depth_rgb(x, y))
    }

    /// Color-half pixel for logical `(x, y)` as a 0-1 color.
    pub fn color(&self, x: u32, y: u32) -> Vec3 {
        to_unit_rgb(self.image.get_pixel(x + self.logical_width, y).0)
    }
}

/// Hue of an RGB color in `[0, 1)`, independent of saturation and lightness.
/// Grays have hue 0.
pub fn hue(rgb: [u8; 3]) -> f32 {
    let [r, g, b] = rgb.map(|c| c as f32 / 255.0);
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;
    if delta <= 0.0 {
        return 0.0;
    }

    let sector = if max == r {
        ((g - b) / delta).rem_euclid(6.0)
    } else if max == g {
        (b - r) / delta + 2.0
    } else {
        (r - g) / delta + 4.0
    };

    let h = sector / 6.0;
    if h >= 1.0 { 0.0 } else { h }
}

/// Depth encoded by a depth-half pixel: `3 * hue`.
pub fn decode_depth(rgb: [u8; 3]) -> f32 {
    DEPTH_SCALE * hue(rgb)
}

/// Fully saturated color whose hue encodes `depth`. Depths outside
/// `[0, DEPTH_SCALE)` wrap around the hue circle.
pub fn encode_depth(depth: f32) -> Rgb<u8> {
    let h6 = (depth / DEPTH_SCALE).rem_euclid(1.0) * 6.0;
    let sector = h6.floor();
    let f = h6 - sector;
    let (r, g, b) = match sector as u32 {
        0 => (1.0, f, 0.0),
        1 => (1.0 - f, 1.0, 0.0),
        2 => (0.0, 1.0, f),
        3 => (0.0, 1.0 - f, 1.0),
        4 => (f, 0.0, 1.0),
        _ => (1.0, 0.0, 1.0 - f),
    };
    let q = |c: f32| (c * 255.0).round().clamp(0.0, 255.0) as u8;
    Rgb([q(r), q(g), q(b)])
}

fn to_unit_rgb(rgb: [u8; 3]) -> Vec3 {
    Vec3::new(rgb[0] as f32, rgb[1] as f32, rgb[2] as f32) / 255.0
}
