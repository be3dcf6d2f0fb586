//! Per-point reconstruction kernel
//!
//! Every logical pixel is evaluated independently: decode its depth, reject it
//! when it or its neighbors fall outside the depth range or disagree, unproject
//! it with the inverse intrinsics and clip it laterally to the range box.

use crate::ingest::{CloudPoint, RgbdFrame};
use crate::reconstruction::ViewParameters;
use glam::{UVec2, Vec3};
use rgbd_data::InverseIntrinsics;

/// Largest depth difference between a pixel and any neighbor that is still
/// treated as the same surface.
pub const NEIGHBOR_DEPTH_THRESHOLD: f32 = 0.05;

/// Why a pixel produced no point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rejection {
    /// Index past `W * H`
    OutOfFrame,
    /// Center or neighbor depth out of range, or a depth discontinuity
    Neighborhood,
    /// Unprojected position outside the lateral range box
    Clipped,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointOutcome {
    Accepted(CloudPoint),
    Rejected(Rejection),
}

impl PointOutcome {
    pub fn accepted(self) -> Option<CloudPoint> {
        match self {
            PointOutcome::Accepted(point) => Some(point),
            PointOutcome::Rejected(_) => None,
        }
    }
}

const NEIGHBOR_OFFSETS: [(i64, i64); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Evaluate logical pixel `index` of `frame`.
pub fn evaluate_point(
    index: u32,
    frame: &RgbdFrame,
    params: &ViewParameters,
    inverse: &InverseIntrinsics,
) -> PointOutcome {
    let (width, height) = frame.logical_size();
    if index as usize >= frame.point_count() {
        return PointOutcome::Rejected(Rejection::OutOfFrame);
    }
    let x = index % width;
    let y = index / width;

    let near = params.range_near();
    let far = params.range_far();
    let in_range = |d: f32| d >= near && d < far;

    let depth = frame.depth_at(x, y);
    if !in_range(depth) {
        return PointOutcome::Rejected(Rejection::Neighborhood);
    }

    for (dx, dy) in NEIGHBOR_OFFSETS {
        let nx = x as i64 + dx;
        let ny = y as i64 + dy;
        if nx < 0 || ny < 0 || nx >= width as i64 || ny >= height as i64 {
            continue;
        }
        let neighbor = frame.depth_at(nx as u32, ny as u32);
        if !in_range(neighbor) || (neighbor - depth).abs() > NEIGHBOR_DEPTH_THRESHOLD {
            return PointOutcome::Rejected(Rejection::Neighborhood);
        }
    }

    let position = unproject(x, y, depth, params, inverse);

    let half_extent = params.range_size() / 2.0;
    if position.x.abs() > half_extent || position.y.abs() > half_extent {
        return PointOutcome::Rejected(Rejection::Clipped);
    }

    let color = if params.show_depth_map() {
        frame.depth_color(x, y)
    } else {
        frame.color(x, y)
    };

    PointOutcome::Accepted(CloudPoint {
        index,
        pixel: UVec2::new(x, y),
        depth,
        position,
        color,
    })
}

/// Accepted point for `index`, or `None` when rejected.
pub fn reconstruct_point(
    index: u32,
    frame: &RgbdFrame,
    params: &ViewParameters,
    inverse: &InverseIntrinsics,
) -> Option<CloudPoint> {
    evaluate_point(index, frame, params, inverse).accepted()
}

/// Camera-space position of pixel `(x, y)` at `depth`.
///
/// Flatness stretches the lateral axes and scale divided by flatness applies to
/// all three, so flatness alone compresses only `z`.
pub fn unproject(
    x: u32,
    y: u32,
    depth: f32,
    params: &ViewParameters,
    inverse: &InverseIntrinsics,
) -> Vec3 {
    let flatness = params.flatness();
    let ray = inverse.ray(x as f32, y as f32);
    let local = Vec3::new(ray.x * depth * flatness, ray.y * depth * flatness, -depth);
    local * (params.scale() / flatness)
}
