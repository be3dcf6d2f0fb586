//! Reconstructed point clouds

use glam::{UVec2, Vec3};
use serde::Serialize;
use serde_ply::{SerializeError, SerializeOptions};
use std::io::Write;

/// A single accepted point of a reconstructed frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CloudPoint {
    /// Logical pixel index, `y * W + x`
    pub index: u32,
    pub pixel: UVec2,
    /// Decoded depth at the pixel
    pub depth: f32,
    /// Camera-space position
    pub position: Vec3,
    /// Linear 0-1 RGB
    pub color: Vec3,
}

/// One `vertex` row of an exported PLY file
#[derive(Debug, Clone, Copy, Serialize)]
struct PlyRow {
    x: f32,
    y: f32,
    z: f32,
    red: u8,
    green: u8,
    blue: u8,
}

impl From<&CloudPoint> for PlyRow {
    fn from(p: &CloudPoint) -> Self {
        let [red, green, blue] = p
            .color
            .to_array()
            .map(|c| (c * 255.0).round().clamp(0.0, 255.0) as u8);
        Self {
            x: p.position.x,
            y: p.position.y,
            z: p.position.z,
            red,
            green,
            blue,
        }
    }
}

#[derive(Debug, Serialize)]
struct PlyFile {
    vertex: Vec<PlyRow>,
}

/// The accepted points of one displayed frame
#[derive(Debug, Clone, Default)]
pub struct PointCloud {
    pub points: Vec<CloudPoint>,
}

impl PointCloud {
    pub fn new(points: Vec<CloudPoint>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Axis-aligned bounds `(min, max)` of all positions.
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let first = self.points.first()?.position;
        Some(self.points.iter().fold((first, first), |(lo, hi), p| {
            (lo.min(p.position), hi.max(p.position))
        }))
    }

    /// Write the cloud as an ASCII PLY with `uchar` vertex colors.
    pub fn write_ply<W: Write>(&self, mut out: W) -> Result<(), SerializeError> {
        let ply = PlyFile {
            vertex: self.points.iter().map(PlyRow::from).collect(),
        };
        serde_ply::to_writer(&ply, SerializeOptions::ascii(), &mut out)?;
        out.flush()?;
        Ok(())
    }
}
