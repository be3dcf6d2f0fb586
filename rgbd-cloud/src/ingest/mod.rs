//! Data ingestion module
//!
//! Wraps decoded RGBD frames and holds the point clouds reconstructed from them:
//! - Hue depth decoding of the left frame half
//! - Color sampling from the right frame half
//! - ASCII PLY export

pub mod frame;
pub mod point_cloud;

pub use frame::{decode_depth, encode_depth, hue, FrameError, RgbdFrame, DEPTH_SCALE};
pub use point_cloud::{CloudPoint, PointCloud};
