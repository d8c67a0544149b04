//! Edge spread function: mean intensity versus signed distance to the line.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::EdgeError;
use crate::grid::{sample, Grid, Intensity, Roi};
use crate::line::Line;

/// Distance binning for the ESF.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EsfConfig {
    /// Bin width in pixels. Distances are rounded to the nearest multiple.
    pub bin_width: f64,
}

impl Default for EsfConfig {
    fn default() -> Self {
        Self { bin_width: 0.5 }
    }
}

/// One occupied distance bin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EsfSample {
    /// Bin center (signed distance in pixels).
    pub distance: f64,
    /// Mean intensity of the pixels in the bin.
    pub intensity: f64,
    /// Number of pixels in the bin.
    pub count: usize,
}

/// Ordered `(distance, mean intensity)` series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeSpreadFunction {
    /// Bin width the series was built with.
    pub bin_width: f64,
    /// Occupied bins in increasing distance.
    pub samples: Vec<EsfSample>,
}

impl EdgeSpreadFunction {
    /// Bin centers.
    pub fn distances(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.distance).collect()
    }

    /// Per-bin mean intensities.
    pub fn intensities(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.intensity).collect()
    }

    /// Number of occupied bins.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// `true` when no bin is occupied.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Bin index of `distance` (round half to even, like the rest of the
/// measurement chain).
#[inline]
fn bin_index(distance: f64, bin_width: f64) -> i64 {
    (distance / bin_width).round_ties_even() as i64
}

/// Build the ESF of `grid` across `line` over the ROI disk.
pub fn edge_spread_function<T: Intensity>(
    grid: &Grid<T>,
    line: &Line,
    roi: &Roi,
    config: &EsfConfig,
) -> Result<EdgeSpreadFunction, EdgeError> {
    let bin_width = if config.bin_width > 0.0 {
        config.bin_width
    } else {
        EsfConfig::default().bin_width
    };

    let mut bins: BTreeMap<i64, (f64, usize)> = BTreeMap::new();
    for (x, y) in roi.pixels() {
        let d = line.signed_distance(x as f64, y as f64);
        let entry = bins.entry(bin_index(d, bin_width)).or_insert((0.0, 0));
        entry.0 += sample(grid, x, y);
        entry.1 += 1;
    }
    if bins.is_empty() {
        return Err(EdgeError::EmptyEdgeSpreadFunction);
    }

    let samples = bins
        .into_iter()
        .map(|(k, (sum, n))| EsfSample {
            distance: k as f64 * bin_width,
            intensity: sum / n as f64,
            count: n,
        })
        .collect();
    Ok(EdgeSpreadFunction { bin_width, samples })
}
