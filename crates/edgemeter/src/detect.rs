//! Candidate line detection on the binarized disk.
//!
//! Canny edges over the cluster boundary, then a Hough accumulator with
//! 1-pixel/1-degree bins. Among the lines that clear the vote threshold the
//! one passing closest to the crop center wins.

use image::GrayImage;
use imageproc::hough::{detect_lines, LineDetectionOptions, PolarLine};
use serde::{Deserialize, Serialize};

use crate::line::Line;

/// Edge detector and Hough transform parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LineDetectConfig {
    /// Canny hysteresis low threshold.
    pub canny_low: f32,
    /// Canny hysteresis high threshold.
    pub canny_high: f32,
    /// Minimum accumulator votes for a line.
    pub vote_threshold: u32,
    /// Non-maximum suppression radius in accumulator bins.
    pub suppression_radius: u32,
}

impl Default for LineDetectConfig {
    fn default() -> Self {
        Self {
            canny_low: 50.0,
            canny_high: 100.0,
            vote_threshold: 50,
            suppression_radius: 2,
        }
    }
}

/// A Hough line in the crop frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PolarCandidate {
    /// `x·cos θ + y·sin θ = rho` in crop pixels.
    pub rho: f64,
    /// Normal angle in radians, `[0, π)`.
    pub theta: f64,
}

impl PolarCandidate {
    /// Perpendicular distance from `(cx, cy)`.
    pub fn distance_to(&self, cx: f64, cy: f64) -> f64 {
        (self.rho - cx * self.theta.cos() - cy * self.theta.sin()).abs()
    }

    /// Canonical line in the crop frame.
    pub fn to_line(&self) -> Line {
        Line::from_polar(self.rho, self.theta)
    }
}

impl From<PolarLine> for PolarCandidate {
    fn from(l: PolarLine) -> Self {
        Self {
            rho: l.r as f64,
            theta: (l.angle_in_degrees as f64).to_radians(),
        }
    }
}

/// Canny edge map of the binarized crop.
pub fn edge_map(binary: &GrayImage, config: &LineDetectConfig) -> GrayImage {
    imageproc::edges::canny(binary, config.canny_low, config.canny_high)
}

/// All Hough lines in `edges` that clear the vote threshold.
pub fn candidate_lines(edges: &GrayImage, config: &LineDetectConfig) -> Vec<PolarCandidate> {
    let options = LineDetectionOptions {
        vote_threshold: config.vote_threshold,
        suppression_radius: config.suppression_radius,
    };
    detect_lines(edges, options)
        .into_iter()
        .map(PolarCandidate::from)
        .collect()
}

/// Candidate closest to `center`, or `None` when the list is empty.
pub fn closest_to_center(candidates: &[PolarCandidate], center: [f64; 2]) -> Option<PolarCandidate> {
    candidates
        .iter()
        .copied()
        .min_by(|a, b| {
            a.distance_to(center[0], center[1])
                .total_cmp(&b.distance_to(center[0], center[1]))
        })
}

/// Detect the edge line in a binarized `diameter x diameter` crop.
///
/// Returns the polar line in crop coordinates, or `None` when nothing
/// clears the vote threshold.
///
/// A `None` only happens when the disk is (nearly) uniform after
/// clustering. Sensor noise alone still splits the disk into two speckled
/// classes whose Canny edges can clear the threshold, so a noise-only ROI
/// yields a line with near-zero contrast. Callers that need to reject such
/// measurements should threshold the contrast.
pub fn detect_edge_line(
    binary: &GrayImage,
    diameter: u32,
    config: &LineDetectConfig,
) -> Option<PolarCandidate> {
    let edges = edge_map(binary, config);
    let candidates = candidate_lines(&edges, config);
    let r = (diameter / 2) as f64;
    let best = closest_to_center(&candidates, [r, r]);
    tracing::debug!(
        "{} Hough candidates, closest to center: {:?}",
        candidates.len(),
        best
    );
    best
}
