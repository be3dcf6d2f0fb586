//! Wireframe box visualizing the active depth range

use crate::reconstruction::ViewParameters;
use glam::Vec3;

/// Corner index pairs forming the 12 cube edges.
pub const EDGES: [(usize, usize); 12] = [
    (0, 1),
    (1, 3),
    (3, 2),
    (2, 0),
    (4, 5),
    (5, 7),
    (7, 6),
    (6, 4),
    (0, 4),
    (1, 5),
    (2, 6),
    (3, 7),
];

/// A unit cube scaled by the depth range size, sitting in front of the viewer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeBox {
    pub size: f32,
    pub center: Vec3,
    /// Where the point cloud origin is placed inside the box group
    pub cloud_origin: Vec3,
}

impl RangeBox {
    pub fn from_params(params: &ViewParameters) -> Self {
        let size = params.range_size();
        Self {
            size,
            center: Vec3::new(0.0, 0.0, -size / 2.0),
            cloud_origin: Vec3::new(0.0, 0.0, params.range_near()),
        }
    }

    /// Corner `i` has bit 0 set for `+x`, bit 1 for `+y`, bit 2 for `+z`.
    pub fn corners(&self) -> [Vec3; 8] {
        let half = self.size / 2.0;
        std::array::from_fn(|i| {
            let sign = |bit: usize| if i & (1 << bit) != 0 { 1.0 } else { -1.0 };
            self.center + Vec3::new(sign(0), sign(1), sign(2)) * half
        })
    }

    /// Line segments of the wireframe.
    pub fn edges(&self) -> [(Vec3, Vec3); 12] {
        let corners = self.corners();
        EDGES.map(|(a, b)| (corners[a], corners[b]))
    }
}

impl Default for RangeBox {
    fn default() -> Self {
        Self::from_params(&ViewParameters::default())
    }
}
