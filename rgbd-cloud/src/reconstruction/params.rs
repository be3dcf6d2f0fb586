//! Live view parameters for reconstruction

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Smallest flatness accepted; unprojection divides by it.
pub const MIN_FLATNESS: f32 = 1e-3;

/// Tunable parameters consumed by the reconstructor every frame.
///
/// `range_near <= range_far` always holds. Writes that would break it push the
/// other bound along instead of failing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "ViewParametersRepr")]
pub struct ViewParameters {
    point_size: f32,
    range_near: f32,
    range_far: f32,
    flatness: f32,
    scale: f32,
    show_depth_map: bool,
    muted: bool,
}

impl Default for ViewParameters {
    fn default() -> Self {
        Self {
            point_size: 1.0,
            range_near: 0.1,
            range_far: 1.1,
            flatness: 1.0,
            scale: 1.0,
            show_depth_map: false,
            muted: true,
        }
    }
}

impl ViewParameters {
    pub fn point_size(&self) -> f32 {
        self.point_size
    }

    pub fn range_near(&self) -> f32 {
        self.range_near
    }

    pub fn range_far(&self) -> f32 {
        self.range_far
    }

    pub fn flatness(&self) -> f32 {
        self.flatness
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn show_depth_map(&self) -> bool {
        self.show_depth_map
    }

    pub fn muted(&self) -> bool {
        self.muted
    }

    /// `range_far - range_near`, never negative.
    pub fn range_size(&self) -> f32 {
        self.range_far - self.range_near
    }

    pub fn set_point_size(&mut self, value: f32) {
        self.point_size = value;
    }

    /// Set the near bound. Raising it past `range_far` raises `range_far` too.
    /// NaN writes are ignored.
    pub fn set_range_near(&mut self, value: f32) {
        if value.is_nan() {
            return;
        }
        self.range_near = value;
        if self.range_far < value {
            self.range_far = value;
        }
    }

    /// Set the far bound. Lowering it below `range_near` lowers `range_near` too.
    /// NaN writes are ignored.
    pub fn set_range_far(&mut self, value: f32) {
        if value.is_nan() {
            return;
        }
        self.range_far = value;
        if self.range_near > value {
            self.range_near = value;
        }
    }

    /// Positive values below [`MIN_FLATNESS`] are raised to it. Zero, negative
    /// and NaN writes are ignored.
    pub fn set_flatness(&mut self, value: f32) {
        if value.is_nan() || value <= 0.0 {
            return;
        }
        self.flatness = value.max(MIN_FLATNESS);
    }

    pub fn set_scale(&mut self, value: f32) {
        self.scale = value;
    }

    pub fn set_show_depth_map(&mut self, value: bool) {
        self.show_depth_map = value;
    }

    pub fn set_muted(&mut self, value: bool) {
        self.muted = value;
    }
}

/// Unchecked wire form; every field goes through the setters on the way in.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ViewParametersRepr {
    point_size: f32,
    range_near: f32,
    range_far: f32,
    flatness: f32,
    scale: f32,
    show_depth_map: bool,
    muted: bool,
}

impl Default for ViewParametersRepr {
    fn default() -> Self {
        let d = ViewParameters::default();
        Self {
            point_size: d.point_size,
            range_near: d.range_near,
            range_far: d.range_far,
            flatness: d.flatness,
            scale: d.scale,
            show_depth_map: d.show_depth_map,
            muted: d.muted,
        }
    }
}

impl From<ViewParametersRepr> for ViewParameters {
    fn from(repr: ViewParametersRepr) -> Self {
        let mut params = ViewParameters::default();
        params.set_point_size(repr.point_size);
        params.set_range_near(repr.range_near);
        params.set_range_far(repr.range_far);
        params.set_flatness(repr.flatness);
        params.set_scale(repr.scale);
        params.set_show_depth_map(repr.show_depth_map);
        params.set_muted(repr.muted);
        params
    }
}

/// Parameters remembered per asset, by their persisted names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamName {
    PointSize,
    RangeNear,
    RangeFar,
    Flatness,
    Scale,
    ShowDepthMap,
}

impl ParamName {
    pub const ALL: [ParamName; 6] = [
        ParamName::PointSize,
        ParamName::RangeNear,
        ParamName::RangeFar,
        ParamName::Flatness,
        ParamName::Scale,
        ParamName::ShowDepthMap,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ParamName::PointSize => "pointSize",
            ParamName::RangeNear => "rangeNear",
            ParamName::RangeFar => "rangeFar",
            ParamName::Flatness => "flatness",
            ParamName::Scale => "scale",
            ParamName::ShowDepthMap => "showDepthMap",
        }
    }

    pub fn is_bool(&self) -> bool {
        matches!(self, ParamName::ShowDepthMap)
    }
}

impl fmt::Display for ParamName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParamName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ParamName::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| format!("unknown parameter '{s}'"))
    }
}
