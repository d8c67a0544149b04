//! Annotated RGB renderings of a measurement.

use ab_glyph::FontArc;
use image::{GrayImage, Luma, Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_circle_mut, draw_line_segment_mut, draw_text_mut};
use serde::{Deserialize, Serialize};

use crate::analysis::AnalysisResult;
use crate::error::EdgeError;
use crate::grid::{Grid, Intensity, Roi};
use crate::line::Line;

/// Overlay colors, stroke widths and text placement.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Edge line color.
    pub line_color: [u8; 3],
    /// ROI circle color.
    pub circle_color: [u8; 3],
    /// Annotation text color.
    pub text_color: [u8; 3],
    /// Edge line stroke width in pixels.
    pub line_thickness: u32,
    /// ROI circle stroke width in pixels.
    pub circle_thickness: u32,
    /// Top-left corner of the annotation.
    pub text_origin: (i32, i32),
    /// Glyph height in pixels.
    pub text_scale: f32,
    /// Gray level of the line drawn on the clustered diagnostic.
    pub clustered_line_level: u8,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            line_color: [255, 0, 0],
            circle_color: [0, 255, 0],
            text_color: [26, 155, 147],
            line_thickness: 2,
            circle_thickness: 2,
            text_origin: (10, 30),
            text_scale: 28.0,
            clustered_line_level: 155,
        }
    }
}

/// Font bundled with the crate for the overlay annotation.
pub const DEFAULT_FONT_NAME: &str = "DejaVuSansMono.ttf";

static DEFAULT_FONT_DATA: &[u8] = include_bytes!("../data/DejaVuSansMono.ttf");

/// Parse the bundled annotation font.
pub fn load_default_font() -> Result<FontArc, EdgeError> {
    FontArc::try_from_slice(DEFAULT_FONT_DATA).map_err(|_| EdgeError::InvalidFont)
}

/// Fixed-format annotation burned into the overlay.
pub fn annotation_text(result: &AnalysisResult) -> String {
    format!(
        "Angle: {:.3} deg, Contrast: {:.3}, Blurriness: {:.5}",
        result.angle_degrees, result.contrast, result.blurriness
    )
}

/// Independent RGB copy of `grid`, rescaled so the sample type's maximum
/// maps to 255.
pub fn to_rgb<T: Intensity>(grid: &Grid<T>) -> RgbImage {
    let max = T::DEFAULT_MAX_VALUE.intensity();
    let scale = if max > 0.0 { 255.0 / max } else { 1.0 };
    RgbImage::from_fn(grid.width(), grid.height(), |x, y| {
        let v = (grid.get_pixel(x, y)[0].intensity() * scale)
            .round()
            .clamp(0.0, 255.0) as u8;
        Rgb([v, v, v])
    })
}

/// Stroke offsets centered on zero: `[0]`, `[0, 1]`, `[-1, 0, 1]`, ...
fn stroke_offsets(thickness: u32) -> impl Iterator<Item = i32> {
    let t = thickness.max(1) as i32;
    let start = -(t - 1) / 2;
    start..start + t
}

fn draw_thick_segment(img: &mut RgbImage, p: [f32; 2], q: [f32; 2], color: Rgb<u8>, thickness: u32) {
    let (dx, dy) = (q[0] - p[0], q[1] - p[1]);
    let len = (dx * dx + dy * dy).sqrt();
    let (nx, ny) = if len > 0.0 { (-dy / len, dx / len) } else { (0.0, 0.0) };
    for k in stroke_offsets(thickness) {
        let o = k as f32;
        draw_line_segment_mut(
            img,
            (p[0] + nx * o, p[1] + ny * o),
            (q[0] + nx * o, q[1] + ny * o),
            color,
        );
    }
}

fn draw_roi(img: &mut RgbImage, roi: &Roi, config: &OverlayConfig) {
    let center = (roi.center_x as i32, roi.center_y as i32);
    let r = roi.radius() as i32;
    for k in stroke_offsets(config.circle_thickness) {
        if r + k > 0 {
            draw_hollow_circle_mut(img, center, r + k, Rgb(config.circle_color));
        }
    }
}

/// Render the measurement overlay: `segment` in the line color, the ROI
/// circle and, when a font is available, the annotation text.
pub fn render_overlay<T: Intensity>(
    grid: &Grid<T>,
    roi: &Roi,
    segment: ([f32; 2], [f32; 2]),
    result: &AnalysisResult,
    font: Option<&FontArc>,
    config: &OverlayConfig,
) -> RgbImage {
    let mut img = to_rgb(grid);
    draw_thick_segment(
        &mut img,
        segment.0,
        segment.1,
        Rgb(config.line_color),
        config.line_thickness,
    );
    draw_roi(&mut img, roi, config);
    match font {
        Some(font) => {
            let (x, y) = config.text_origin;
            draw_text_mut(
                &mut img,
                Rgb(config.text_color),
                x,
                y,
                config.text_scale,
                font,
                &annotation_text(result),
            );
        }
        None => tracing::warn!("no font available, overlay annotation not drawn"),
    }
    img
}

/// Copy of `grid` with only the ROI circle, for images without an edge.
pub fn render_roi_only<T: Intensity>(grid: &Grid<T>, roi: &Roi, config: &OverlayConfig) -> RgbImage {
    let mut img = to_rgb(grid);
    draw_roi(&mut img, roi, config);
    img
}

/// Draw `line` (crop coordinates) across the binarized crop in mid gray.
pub fn annotate_clustered(binary: &GrayImage, line: &Line, config: &OverlayConfig) -> GrayImage {
    let mut img = binary.clone();
    let (p, q) = line.span(img.width(), img.height());
    draw_line_segment_mut(
        &mut img,
        (p[0], p[1]),
        (q[0], q[1]),
        Luma([config.clustered_line_level]),
    );
    img
}
