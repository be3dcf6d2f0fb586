//! Per-frame point reconstruction
//!
//! This module turns decoded RGBD frames into filtered, unprojected points
//! using the live view parameters and the asset's inverse intrinsics.

pub mod cloud;
pub mod kernel;
pub mod params;

pub use cloud::{identity_indices, points, reconstruct_par, ReconstructionStats};
pub use kernel::{
    evaluate_point, reconstruct_point, unproject, PointOutcome, Rejection,
    NEIGHBOR_DEPTH_THRESHOLD,
};
pub use params::{ParamName, ViewParameters, MIN_FLATNESS};
