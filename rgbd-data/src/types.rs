//! Core calibration types for RGBD video.
//!
//! These are CPU-side representations shared by the metadata parser, the
//! reconstructor and the player. Nothing here touches pixels.

use glam::{Mat3, Vec2, Vec3};

/// Pinhole camera calibration.
///
/// `matrix` is the usual `K` with the focal lengths on the diagonal and the
/// principal point in the last column. glam stores columns, so `cx` lives in
/// `z_axis.x` and `cy` in `z_axis.y`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Intrinsics {
    matrix: Mat3,
}

impl Intrinsics {
    /// Build intrinsics from focal lengths and principal point (pixels).
    pub fn new(fx: f32, fy: f32, cx: f32, cy: f32) -> Self {
        Self {
            matrix: Mat3::from_cols(
                Vec3::new(fx, 0.0, 0.0),
                Vec3::new(0.0, fy, 0.0),
                Vec3::new(cx, cy, 1.0),
            ),
        }
    }

    /// Wrap an already-oriented `K` matrix.
    pub fn from_matrix(matrix: Mat3) -> Self {
        Self { matrix }
    }

    /// The calibration matrix `K`.
    pub fn matrix(&self) -> Mat3 {
        self.matrix
    }

    /// Focal length X (`M00`).
    pub fn fx(&self) -> f32 {
        self.matrix.x_axis.x
    }

    /// Focal length Y (`M11`).
    pub fn fy(&self) -> f32 {
        self.matrix.y_axis.y
    }

    /// Principal point X (`M02`).
    pub fn cx(&self) -> f32 {
        self.matrix.z_axis.x
    }

    /// Principal point Y (`M12`).
    pub fn cy(&self) -> f32 {
        self.matrix.z_axis.y
    }

    /// True when both focal lengths are finite and non-zero and the principal
    /// point is finite.
    pub fn is_valid(&self) -> bool {
        let focal_ok = |f: f32| f.is_finite() && f != 0.0;
        focal_ok(self.fx()) && focal_ok(self.fy()) && self.cx().is_finite() && self.cy().is_finite()
    }

    /// Derive the inverse form used for unprojection.
    pub fn inverse(&self) -> InverseIntrinsics {
        let (fx, fy) = (self.fx(), self.fy());
        InverseIntrinsics {
            ifx: 1.0 / fx,
            ify: 1.0 / fy,
            itx: -self.cx() / fx,
            ity: -self.cy() / fy,
        }
    }

    /// Project a camera-space point (looking down `-Z`) back to a pixel and
    /// its depth. Returns `None` for points at or behind the camera.
    pub fn project(&self, point: Vec3) -> Option<(Vec2, f32)> {
        let depth = -point.z;
        if depth <= 0.0 {
            return None;
        }
        let pixel = Vec2::new(
            self.fx() * point.x / depth + self.cx(),
            self.fy() * point.y / depth + self.cy(),
        );
        Some((pixel, depth))
    }
}

/// Inverse pinhole terms, computed once per asset.
///
/// A pixel `(x, y)` at depth `d` maps to
/// `((ifx * x + itx) * d, (ify * y + ity) * d, -d)`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct InverseIntrinsics {
    pub ifx: f32,
    pub ify: f32,
    pub itx: f32,
    pub ity: f32,
}

impl InverseIntrinsics {
    /// Lateral ray slope for a pixel, before multiplying by depth.
    pub fn ray(&self, x: f32, y: f32) -> Vec2 {
        Vec2::new(self.ifx * x + self.itx, self.ify * y + self.ity)
    }
}
