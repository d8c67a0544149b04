//! Top-level analysis configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::batch::BatchConfig;
use crate::blur::BlurMethod;
use crate::cluster::ClusterConfig;
use crate::detect::LineDetectConfig;
use crate::error::EdgeError;
use crate::esf::EsfConfig;
use crate::fit::FitConfig;
use crate::overlay::OverlayConfig;
use crate::preprocess::PreprocessConfig;

/// Every tunable of the measurement pipeline.
///
/// Missing fields in a JSON file fall back to [`Default`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// ROI diameter in pixels.
    pub roi_diameter: u32,
    /// Gaussian smoothing ahead of clustering (automatic mode).
    pub preprocess: PreprocessConfig,
    /// Two-class k-means (automatic mode).
    pub cluster: ClusterConfig,
    /// Canny + Hough (automatic mode).
    pub detect: LineDetectConfig,
    /// Edge spread function binning.
    pub esf: EsfConfig,
    /// Erf model solver.
    pub fit: FitConfig,
    /// Blur metric.
    pub blur: BlurMethod,
    /// Overlay rendering.
    pub overlay: OverlayConfig,
    /// Folder processing.
    pub batch: BatchConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            roi_diameter: 236,
            preprocess: PreprocessConfig::default(),
            cluster: ClusterConfig::default(),
            detect: LineDetectConfig::default(),
            esf: EsfConfig::default(),
            fit: FitConfig::default(),
            blur: BlurMethod::default(),
            overlay: OverlayConfig::default(),
            batch: BatchConfig::default(),
        }
    }
}

impl AnalysisConfig {
    /// Default configuration with a different ROI diameter.
    pub fn with_diameter(roi_diameter: u32) -> Self {
        Self {
            roi_diameter,
            ..Self::default()
        }
    }

    /// Load from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self, EdgeError> {
        let data = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    /// Write as pretty-printed JSON.
    pub fn to_json_file(&self, path: &Path) -> Result<(), EdgeError> {
        let data = serde_json::to_string_pretty(self)?;
        std::fs::write(path, data)?;
        Ok(())
    }
}
