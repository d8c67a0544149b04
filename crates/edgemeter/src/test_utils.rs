use image::{GrayImage, Luma};

use crate::fit::erf;
use crate::line::Line;

/// `left` for columns `< split_col`, `right` elsewhere.
pub(crate) fn vertical_step_image(w: u32, h: u32, split_col: u32, left: u8, right: u8) -> GrayImage {
    GrayImage::from_fn(w, h, |x, _| Luma([if x < split_col { left } else { right }]))
}

/// `side1` where the signed distance to `line` is non-negative, `side2`
/// elsewhere.
pub(crate) fn half_plane_image(w: u32, h: u32, line: &Line, side1: u8, side2: u8) -> GrayImage {
    GrayImage::from_fn(w, h, |x, y| {
        let d = line.signed_distance(x as f64, y as f64);
        Luma([if d >= 0.0 { side1 } else { side2 }])
    })
}

/// Edge blurred by a Gaussian of width `sigma` across `line`: `lo` deep on
/// side 2, `hi` deep on side 1.
pub(crate) fn erf_edge_image(w: u32, h: u32, line: &Line, sigma: f64, lo: f64, hi: f64) -> GrayImage {
    let mid = 0.5 * (lo + hi);
    let amp = 0.5 * (hi - lo);
    GrayImage::from_fn(w, h, |x, y| {
        let d = line.signed_distance(x as f64, y as f64);
        let v = mid + amp * erf(d / (sigma * std::f64::consts::SQRT_2));
        Luma([v.round().clamp(0.0, 255.0) as u8])
    })
}
