//! RGBD Cloud Crate
//!
//! This crate reconstructs colored point clouds from hue-encoded RGBD video
//! frames. Each stored frame is twice as wide as its logical size: the left
//! half encodes depth in hue and the right half carries color.
//!
//! ## Modules
//!
//! - [`ingest`]: Decoded frame wrapper, hue depth decoding, point clouds
//! - [`reconstruction`]: View parameters and the per-point reconstruction kernel
//! - [`scene`]: Range box and cloud placement
//! - [`sizing`]: Point size adapted to viewing distance

pub mod ingest;
pub mod reconstruction;
pub mod scene;
pub mod sizing;

pub use ingest::{CloudPoint, FrameError, PointCloud, RgbdFrame};
pub use reconstruction::{PointOutcome, Rejection, ViewParameters};
pub use scene::{Placement, RangeBox};
