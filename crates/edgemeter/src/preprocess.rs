//! Noise suppression and ROI crop ahead of automatic line detection.

use image::{ImageBuffer, Luma};
use serde::{Deserialize, Serialize};

use crate::error::EdgeError;
use crate::grid::{Grid, Intensity, Roi};

/// Float working image produced by the preprocessor.
pub type FloatImage = ImageBuffer<Luma<f32>, Vec<f32>>;

/// Gaussian smoothing parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Odd kernel width/height in pixels.
    pub kernel_size: usize,
    /// Gaussian standard deviation in pixels.
    pub sigma: f32,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            kernel_size: 5,
            sigma: 5.0,
        }
    }
}

/// Normalized 1-D Gaussian taps for a `kernel_size`-wide separable filter.
pub fn gaussian_kernel(kernel_size: usize, sigma: f32) -> Vec<f32> {
    let size = kernel_size.max(1) | 1;
    let half = (size / 2) as f32;
    let sigma = sigma.max(1e-3);
    let mut taps: Vec<f32> = (0..size)
        .map(|i| {
            let d = i as f32 - half;
            (-(d * d) / (2.0 * sigma * sigma)).exp()
        })
        .collect();
    let sum: f32 = taps.iter().sum();
    for t in &mut taps {
        *t /= sum;
    }
    taps
}

/// Blur `grid` with a fixed-size separable Gaussian.
pub fn gaussian_smooth<T: Intensity>(grid: &Grid<T>, config: &PreprocessConfig) -> FloatImage {
    let (w, h) = grid.dimensions();
    let f = FloatImage::from_fn(w, h, |x, y| Luma([grid.get_pixel(x, y)[0].intensity() as f32]));
    let kernel = gaussian_kernel(config.kernel_size, config.sigma);
    imageproc::filter::separable_filter_equal(&f, &kernel)
}

/// Crop a `2r x 2r` square centered on the grid midpoint, `r = diameter / 2`.
pub fn crop_to_roi(image: &FloatImage, diameter: u32) -> Result<FloatImage, EdgeError> {
    let roi = Roi::centered(image.width(), image.height(), diameter)?;
    let r = roi.radius();
    let side = (2 * r) as u32;
    let x0 = (roi.center_x - r) as u32;
    let y0 = (roi.center_y - r) as u32;
    Ok(image::imageops::crop_imm(image, x0, y0, side, side).to_image())
}

/// Smooth then crop: the input stage of automatic detection.
pub fn preprocess<T: Intensity>(
    grid: &Grid<T>,
    diameter: u32,
    config: &PreprocessConfig,
) -> Result<FloatImage, EdgeError> {
    Roi::for_grid(grid, diameter)?;
    let smoothed = gaussian_smooth(grid, config);
    let cropped = crop_to_roi(&smoothed, diameter)?;
    tracing::debug!(
        "preprocessed {}x{} grid into {}x{} crop",
        grid.width(),
        grid.height(),
        cropped.width(),
        cropped.height()
    );
    Ok(cropped)
}
