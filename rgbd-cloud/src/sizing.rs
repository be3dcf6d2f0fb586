//! Adaptive point sizing from viewing distance

use crate::scene::Placement;
use glam::Vec3;

/// Vertical resolution at which [`size_for`] is calibrated.
pub const REFERENCE_VERTICAL_RESOLUTION: f32 = 640.0;

const NEAR_DISTANCE: f32 = 1.0;
const FAR_DISTANCE: f32 = 3.0;
const NEAR_SIZE: f32 = 10.0;
const FAR_SIZE: f32 = 1.0;

/// Base point size at `distance`: 10 up close, 1 far away, linear in between.
pub fn size_for(distance: f32) -> f32 {
    if distance <= NEAR_DISTANCE {
        NEAR_SIZE
    } else if distance >= FAR_DISTANCE {
        FAR_SIZE
    } else {
        -4.5 * distance + 14.5
    }
}

/// `640 / vertical_resolution`, or 1 when the resolution is unknown.
pub fn resolution_multiplier(vertical_resolution: u32) -> f32 {
    if vertical_resolution == 0 {
        1.0
    } else {
        REFERENCE_VERTICAL_RESOLUTION / vertical_resolution as f32
    }
}

/// Point size for a viewer at `viewer` looking at a cloud placed at `placement`.
pub fn adaptive_point_size(viewer: Vec3, placement: &Placement, vertical_resolution: u32) -> f32 {
    resolution_multiplier(vertical_resolution) * size_for(placement.distance_to(viewer))
}
