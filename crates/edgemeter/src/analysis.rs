//! Measurement orchestration.
//!
//! [`Analyzer`] is the primary entry point. It wraps an [`AnalysisConfig`]
//! and the annotation font (bundled by default). Create once, analyze many
//! images.
//!
//! # Examples
//!
//! ```no_run
//! use edgemeter::Analyzer;
//! use image::GrayImage;
//!
//! let analyzer = Analyzer::new();
//! let image = GrayImage::new(640, 480);
//! match analyzer.analyze_automatic(&image) {
//!     Ok(auto) => println!("{:?}", auto.analysis.result),
//!     Err(e) if e.is_no_edge() => println!("no edge"),
//!     Err(e) => eprintln!("{}", e),
//! }
//! ```

use ab_glyph::FontArc;
use image::{GrayImage, RgbImage};
use serde::{Deserialize, Serialize};

use crate::angle::canonical_angle;
use crate::blur::{estimate_blur, BlurEstimate};
use crate::cluster::cluster_disk;
use crate::config::AnalysisConfig;
use crate::detect::{detect_edge_line, PolarCandidate};
use crate::error::EdgeError;
use crate::grid::{Grid, Intensity, Roi};
use crate::line::Line;
use crate::overlay::{annotate_clustered, load_default_font, render_overlay};
use crate::preprocess::preprocess;
use crate::sides::{classify_sides, SideClassification};

/// The three scalar measurements of one edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Canonical angle in `[0, 360)` degrees.
    pub angle_degrees: f64,
    /// Normalized intensity difference in `[0, 1]`.
    pub contrast: f64,
    /// Non-negative blur metric (see [`crate::BlurMethod`]).
    pub blurriness: f64,
}

/// Measurement plus the intermediate quantities it was derived from.
#[derive(Debug, Clone)]
pub struct Analysis {
    /// Angle, contrast and blurriness.
    pub result: AnalysisResult,
    /// Edge line in full-image coordinates.
    pub line: Line,
    /// Side means and darker-side flag.
    pub sides: SideClassification,
    /// Blur value and, for the erf method, the fitted model.
    pub blur: BlurEstimate,
    /// Independently owned RGB copy of the input with the line, the ROI
    /// circle and (given a font) the annotation.
    pub overlay: RgbImage,
}

/// Automatic-mode output.
#[derive(Debug, Clone)]
pub struct AutomaticAnalysis {
    /// Measurement on the original grid.
    pub analysis: Analysis,
    /// Selected Hough line in crop coordinates.
    pub crop_line: PolarCandidate,
    /// Binarized disk with the selected line drawn in gray.
    pub clustered: GrayImage,
}

/// Edge analyzer.
pub struct Analyzer {
    config: AnalysisConfig,
    font: Option<FontArc>,
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer {
    /// Analyzer with the default configuration and the bundled font.
    pub fn new() -> Self {
        Self::with_config(AnalysisConfig::default())
    }

    /// Create with full config control. The annotation uses the bundled
    /// font until [`Analyzer::with_font`] replaces it.
    pub fn with_config(config: AnalysisConfig) -> Self {
        let font = match load_default_font() {
            Ok(font) => Some(font),
            Err(e) => {
                tracing::warn!("bundled annotation font unavailable: {}", e);
                None
            }
        };
        Self { config, font }
    }

    /// Use `font` for the overlay annotation.
    pub fn with_font(mut self, font: FontArc) -> Self {
        self.font = Some(font);
        self
    }

    /// Parse TrueType/OpenType bytes and use them for the annotation.
    pub fn with_font_bytes(self, bytes: Vec<u8>) -> Result<Self, EdgeError> {
        let font = FontArc::try_from_vec(bytes).map_err(|_| EdgeError::InvalidFont)?;
        Ok(self.with_font(font))
    }

    /// Access the current configuration.
    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Mutable access to configuration for post-construction tuning.
    pub fn config_mut(&mut self) -> &mut AnalysisConfig {
        &mut self.config
    }

    /// Annotation font; `None` only if the bundled font failed to load.
    pub fn font(&self) -> Option<&FontArc> {
        self.font.as_ref()
    }

    /// Locate the edge automatically and measure it.
    ///
    /// Smooth and crop, cluster the disk, detect the line closest to the
    /// crop center, then measure on the original grid. Automatic mode
    /// treats the object as the darker half.
    ///
    /// Returns [`EdgeError::NoEdgeFound`] when no line clears the vote
    /// threshold.
    pub fn analyze_automatic<T: Intensity>(&self, grid: &Grid<T>) -> Result<AutomaticAnalysis, EdgeError> {
        let cfg = &self.config;
        let diameter = cfg.roi_diameter;
        let roi = Roi::for_grid(grid, diameter)?;

        let crop = preprocess(grid, diameter, &cfg.preprocess)?;
        let clustering = cluster_disk(&crop, diameter, &cfg.cluster);
        let crop_line =
            detect_edge_line(&clustering.binary, diameter, &cfg.detect).ok_or(EdgeError::NoEdgeFound)?;

        let r = roi.radius();
        let in_crop = crop_line.to_line();
        let line = in_crop.translated((roi.center_x - r) as f64, (roi.center_y - r) as f64);
        let segment = line.span(grid.width(), grid.height());
        let analysis = self.measure(grid, &roi, &line, false, segment)?;
        let clustered = annotate_clustered(&clustering.binary, &in_crop, &cfg.overlay);

        Ok(AutomaticAnalysis {
            analysis,
            crop_line,
            clustered,
        })
    }

    /// Measure the edge through two caller-supplied points.
    ///
    /// `points` must hold exactly two distinct points (full-image pixel
    /// coordinates). The result does not depend on their order.
    pub fn analyze_manual<T: Intensity>(
        &self,
        grid: &Grid<T>,
        points: &[[f64; 2]],
        is_object_lighter: bool,
    ) -> Result<Analysis, EdgeError> {
        let [p1, p2] = match points {
            [a, b] => [*a, *b],
            _ => return Err(EdgeError::InvalidManualInput { got: points.len() }),
        };
        let line = Line::from_points(p1, p2)?;
        let roi = Roi::for_grid(grid, self.config.roi_diameter)?;
        let (p, q) = if (p1[0], p1[1]) <= (p2[0], p2[1]) {
            (p1, p2)
        } else {
            (p2, p1)
        };
        let segment = (
            [p[0] as f32, p[1] as f32],
            [q[0] as f32, q[1] as f32],
        );
        self.measure(grid, &roi, &line, is_object_lighter, segment)
    }

    /// Measure an already known line (full-image coordinates).
    pub fn measure_line<T: Intensity>(
        &self,
        grid: &Grid<T>,
        line: &Line,
        is_object_lighter: bool,
    ) -> Result<Analysis, EdgeError> {
        let roi = Roi::for_grid(grid, self.config.roi_diameter)?;
        let segment = line.span(grid.width(), grid.height());
        self.measure(grid, &roi, line, is_object_lighter, segment)
    }

    fn measure<T: Intensity>(
        &self,
        grid: &Grid<T>,
        roi: &Roi,
        line: &Line,
        is_object_lighter: bool,
        segment: ([f32; 2], [f32; 2]),
    ) -> Result<Analysis, EdgeError> {
        let cfg = &self.config;
        let sides = classify_sides(grid, line, roi);
        let angle = canonical_angle(
            line.raw_angle_deg(),
            line.is_horizontal(),
            sides.object_darker_above_left(is_object_lighter),
        );
        let blur = estimate_blur(grid, line, roi, &cfg.esf, &cfg.fit, &cfg.blur)?;

        let result = AnalysisResult {
            angle_degrees: angle,
            contrast: sides.contrast(),
            blurriness: blur.value,
        };
        tracing::debug!(
            "angle={:.3} contrast={:.3} blurriness={:.5} (p1={:.2}, p2={:.2})",
            result.angle_degrees,
            result.contrast,
            result.blurriness,
            sides.mean_side_1,
            sides.mean_side_2
        );

        let overlay = render_overlay(grid, roi, segment, &result, self.font.as_ref(), &cfg.overlay);
        Ok(Analysis {
            result,
            line: *line,
            sides,
            blur,
            overlay,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blur::BlurMethod;
    use crate::test_utils::{erf_edge_image, vertical_step_image};
    use approx::assert_abs_diff_eq;
    use image::Luma;

    fn seeded() -> Analyzer {
        let mut cfg = AnalysisConfig::default();
        cfg.cluster.seed = Some(42);
        Analyzer::with_config(cfg)
    }

    #[test]
    fn manual_vertical_step_darker_object() {
        // 200 left of x = 118, 50 right, object darker
        let img = vertical_step_image(236, 236, 118, 200, 50);
        let a = Analyzer::new()
            .analyze_manual(&img, &[[118.0, 0.0], [118.0, 235.0]], false)
            .unwrap();
        assert_abs_diff_eq!(a.result.contrast, 0.6, epsilon = 1e-9);
        assert_abs_diff_eq!(a.result.angle_degrees, 270.0, epsilon = 1e-9);
        assert!(a.result.blurriness >= 0.0 && a.result.blurriness < 1.0);
        assert_eq!(a.overlay.dimensions(), img.dimensions());
    }

    #[test]
    fn lighter_object_flips_angle_by_half_turn() {
        let img = vertical_step_image(236, 236, 118, 200, 50);
        let analyzer = Analyzer::new();
        let pts = [[118.0, 0.0], [118.0, 235.0]];
        let darker = analyzer.analyze_manual(&img, &pts, false).unwrap();
        let lighter = analyzer.analyze_manual(&img, &pts, true).unwrap();
        assert_abs_diff_eq!(lighter.result.angle_degrees, 90.0, epsilon = 1e-9);
        assert_abs_diff_eq!(darker.result.contrast, lighter.result.contrast);
    }

    #[test]
    fn manual_is_invariant_to_point_order() {
        let line = Line::from_points([20.0, 40.0], [280.0, 170.0]).unwrap();
        let img = erf_edge_image(300, 300, &line, 3.0, 30.0, 220.0);
        let analyzer = Analyzer::new();
        let a = analyzer
            .analyze_manual(&img, &[[20.0, 40.0], [280.0, 170.0]], false)
            .unwrap();
        let b = analyzer
            .analyze_manual(&img, &[[280.0, 170.0], [20.0, 40.0]], false)
            .unwrap();
        assert_abs_diff_eq!(a.result.angle_degrees, b.result.angle_degrees, epsilon = 1e-9);
        assert_abs_diff_eq!(a.result.contrast, b.result.contrast, epsilon = 1e-12);
        assert_abs_diff_eq!(a.result.blurriness, b.result.blurriness, epsilon = 1e-9);
        assert_eq!(a.overlay, b.overlay);
    }

    #[test]
    fn manual_rejects_wrong_point_count() {
        let img = vertical_step_image(236, 236, 118, 200, 50);
        let err = Analyzer::new()
            .analyze_manual(&img, &[[1.0, 2.0]], false)
            .unwrap_err();
        assert!(matches!(err, EdgeError::InvalidManualInput { got: 1 }));
        let err = Analyzer::new()
            .analyze_manual(&img, &[[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]], false)
            .unwrap_err();
        assert!(matches!(err, EdgeError::InvalidManualInput { got: 3 }));
    }

    #[test]
    fn manual_rejects_coincident_points() {
        let img = vertical_step_image(236, 236, 118, 200, 50);
        let err = Analyzer::new()
            .analyze_manual(&img, &[[5.0, 5.0], [5.0, 5.0]], false)
            .unwrap_err();
        assert!(matches!(err, EdgeError::CoincidentPoints));
    }

    #[test]
    fn oversized_roi_is_rejected() {
        let img = vertical_step_image(200, 200, 100, 200, 50);
        let err = Analyzer::new()
            .analyze_manual(&img, &[[100.0, 0.0], [100.0, 199.0]], false)
            .unwrap_err();
        assert!(matches!(err, EdgeError::InvalidRoi { diameter: 236, .. }));
        assert!(matches!(
            Analyzer::new().analyze_automatic(&img),
            Err(EdgeError::InvalidRoi { .. })
        ));
    }

    #[test]
    fn automatic_finds_vertical_step() {
        let img = vertical_step_image(300, 300, 150, 200, 50);
        let auto = seeded().analyze_automatic(&img).unwrap();
        let r = auto.analysis.result;
        assert!((r.angle_degrees - 270.0).abs() <= 2.5, "angle={}", r.angle_degrees);
        assert_abs_diff_eq!(r.contrast, 0.6, epsilon = 0.03);
        assert!(r.blurriness >= 0.0);
        assert_eq!(auto.clustered.dimensions(), (236, 236));
        assert!(auto.crop_line.distance_to(118.0, 118.0) <= 3.0);
        // line lands in full-image coordinates
        assert!(auto.analysis.line.distance(150.0, 150.0) <= 3.0);
    }

    #[test]
    fn automatic_on_uniform_image_reports_no_edge() {
        let img = GrayImage::from_pixel(300, 300, Luma([128]));
        let err = seeded().analyze_automatic(&img).unwrap_err();
        assert!(err.is_no_edge());
    }

    #[test]
    fn measure_line_matches_manual() {
        let img = vertical_step_image(236, 236, 118, 200, 50);
        let analyzer = Analyzer::new();
        let line = Line::from_points([118.0, 0.0], [118.0, 235.0]).unwrap();
        let a = analyzer.measure_line(&img, &line, false).unwrap();
        let b = analyzer
            .analyze_manual(&img, &[[118.0, 0.0], [118.0, 235.0]], false)
            .unwrap();
        assert_eq!(a.result, b.result);
    }

    #[test]
    fn rise_distance_method_is_selectable() {
        let mut analyzer = Analyzer::new();
        analyzer.config_mut().blur = BlurMethod::rise_distance();
        let img = vertical_step_image(236, 236, 118, 200, 50);
        let a = analyzer
            .analyze_manual(&img, &[[118.0, 0.0], [118.0, 235.0]], false)
            .unwrap();
        assert!(a.blur.fit.is_none());
        assert!((0.0..=1.0).contains(&a.result.blurriness));
    }

    #[test]
    fn default_analyzer_annotates_overlay() {
        let img = vertical_step_image(400, 300, 200, 200, 50);
        let analyzer = Analyzer::new();
        assert!(analyzer.font().is_some());
        let a = analyzer
            .analyze_manual(&img, &[[200.0, 0.0], [200.0, 299.0]], false)
            .unwrap();
        let count = a
            .overlay
            .pixels()
            .filter(|p| p[2] as i32 - p[0] as i32 > 60)
            .count();
        assert!(count > 50, "only {} annotation pixels", count);
    }

    #[test]
    fn invalid_font_bytes_are_rejected() {
        let err = Analyzer::new().with_font_bytes(vec![0, 1, 2, 3]).err();
        assert!(matches!(err, Some(EdgeError::InvalidFont)));
    }
}
