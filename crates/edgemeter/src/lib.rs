//! edgemeter: angle, contrast and blurriness of a single straight edge
//! inside a circular region of interest.
//!
//! The pipeline stages are:
//!
//! 1. **Preprocess** – Gaussian smoothing, crop to the ROI square.
//! 2. **Cluster** – two-class intensity k-means over the inscribed disk.
//! 3. **Detect** – Canny + Hough, keep the line closest to the ROI center.
//! 4. **Sides** – mean intensity on each side of the line, contrast.
//! 5. **Angle** – canonical `[0, 360)` angle from the darker side.
//! 6. **Blur** – edge spread function, erf model fit (or rise distance).
//! 7. **Overlay** – annotated RGB copy of the input.
//!
//! Stages 1-3 only run in automatic mode; manual mode starts from two
//! points. [`batch`] runs automatic mode over a folder.
//!
//! # Public API
//! - [`Analyzer`] as the primary entry point
//! - [`AnalysisConfig`] and the per-stage configs for tuning
//! - [`Line`] / [`LineInput`] for callers that already know the edge

pub mod angle;
pub mod batch;
pub mod blur;
pub mod cluster;
pub mod detect;
pub mod esf;
pub mod fit;
pub mod line;
pub mod overlay;
pub mod preprocess;
pub mod sides;

mod analysis;
mod config;
mod error;
mod grid;

#[cfg(test)]
pub(crate) mod test_utils;

pub use analysis::{Analysis, AnalysisResult, Analyzer, AutomaticAnalysis};
pub use batch::{analyze_folder, BatchConfig, BatchReport};
pub use blur::{BlurEstimate, BlurMethod};
pub use cluster::ClusterConfig;
pub use config::AnalysisConfig;
pub use detect::{LineDetectConfig, PolarCandidate};
pub use error::EdgeError;
pub use esf::{EdgeSpreadFunction, EsfConfig, EsfSample};
pub use fit::{FitConfig, FitError, FitResult};
pub use grid::{Grid, Intensity, Roi};
pub use line::{Line, LineInput};
pub use overlay::OverlayConfig;
pub use preprocess::PreprocessConfig;
pub use sides::SideClassification;
