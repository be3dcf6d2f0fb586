//! Scene-side helpers for the reconstructed cloud
//!
//! This module provides the depth-range box and the cloud placement that
//! adaptive sizing measures distance against.

pub mod placement;
pub mod range_box;

pub use placement::Placement;
pub use range_box::RangeBox;
