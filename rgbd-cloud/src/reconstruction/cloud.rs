//! Whole-frame reconstruction drivers

use crate::ingest::{CloudPoint, PointCloud, RgbdFrame};
use crate::reconstruction::kernel::{evaluate_point, PointOutcome, Rejection};
use crate::reconstruction::ViewParameters;
use rayon::prelude::*;
use rgbd_data::InverseIntrinsics;
use tracing::debug;

/// Lazily evaluate the pixels named by `indices` and yield the accepted points.
///
/// `indices` is normally the identity buffer `0..W*H`. The iterator is finite
/// and borrows the frame, so it cannot outlive the frame it reads.
pub fn points<'a>(
    frame: &'a RgbdFrame,
    params: &'a ViewParameters,
    inverse: &'a InverseIntrinsics,
    indices: &'a [u32],
) -> impl Iterator<Item = CloudPoint> + 'a {
    indices
        .iter()
        .filter_map(move |&i| evaluate_point(i, frame, params, inverse).accepted())
}

/// Outcome counts for one reconstructed frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconstructionStats {
    pub accepted: usize,
    pub out_of_frame: usize,
    pub neighborhood: usize,
    pub clipped: usize,
}

impl ReconstructionStats {
    pub fn record(&mut self, outcome: &PointOutcome) {
        match outcome {
            PointOutcome::Accepted(_) => self.accepted += 1,
            PointOutcome::Rejected(Rejection::OutOfFrame) => self.out_of_frame += 1,
            PointOutcome::Rejected(Rejection::Neighborhood) => self.neighborhood += 1,
            PointOutcome::Rejected(Rejection::Clipped) => self.clipped += 1,
        }
    }

    pub fn rejected(&self) -> usize {
        self.out_of_frame + self.neighborhood + self.clipped
    }

    pub fn total(&self) -> usize {
        self.accepted + self.rejected()
    }

    fn merge(mut self, other: Self) -> Self {
        self.accepted += other.accepted;
        self.out_of_frame += other.out_of_frame;
        self.neighborhood += other.neighborhood;
        self.clipped += other.clipped;
        self
    }
}

/// Evaluate every index in parallel and collect the accepted points in index order.
pub fn reconstruct_par(
    frame: &RgbdFrame,
    params: &ViewParameters,
    inverse: &InverseIntrinsics,
    indices: &[u32],
) -> (PointCloud, ReconstructionStats) {
    let outcomes: Vec<PointOutcome> = indices
        .par_iter()
        .map(|&i| evaluate_point(i, frame, params, inverse))
        .collect();

    let stats = outcomes
        .par_iter()
        .fold(ReconstructionStats::default, |mut stats, outcome| {
            stats.record(outcome);
            stats
        })
        .reduce(ReconstructionStats::default, ReconstructionStats::merge);

    let points = outcomes
        .into_iter()
        .filter_map(PointOutcome::accepted)
        .collect();

    debug!(
        "Reconstructed {} of {} points ({} neighborhood, {} clipped, {} out of frame)",
        stats.accepted,
        stats.total(),
        stats.neighborhood,
        stats.clipped,
        stats.out_of_frame
    );
    (PointCloud::new(points), stats)
}

/// Identity buffer `0..count`, mapping draw index to logical pixel.
pub fn identity_indices(count: usize) -> Vec<u32> {
    (0..count as u32).collect()
}
