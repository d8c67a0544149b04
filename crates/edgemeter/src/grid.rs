//! Pixel access and circular ROI geometry shared by every stage.

use image::{ImageBuffer, Luma, Primitive};

use crate::error::EdgeError;

/// Single-channel pixel grid with samples of type `T`.
pub type Grid<T> = ImageBuffer<Luma<T>, Vec<T>>;

/// Sample types the measurement stages accept.
///
/// Integer and float grids are read as `f64`; no rescaling is applied, so a
/// `u16` grid yields intensities in `0..=65535`.
pub trait Intensity: Primitive + 'static {
    /// Sample value as `f64`.
    fn intensity(self) -> f64;
}

macro_rules! impl_intensity {
    ($($t:ty),*) => {
        $(
            impl Intensity for $t {
                #[inline]
                fn intensity(self) -> f64 {
                    self as f64
                }
            }
        )*
    };
}

impl_intensity!(u8, u16, u32, f32, f64);

/// Read the sample at `(x, y)` as `f64`.
#[inline]
pub fn sample<T: Intensity>(grid: &Grid<T>, x: u32, y: u32) -> f64 {
    grid.get_pixel(x, y)[0].intensity()
}

/// Circular region of interest in full-image pixel coordinates.
///
/// The center is the grid midpoint with integer division, as is the radius
/// (`diameter / 2`). Membership is strict: `(x-cx)² + (y-cy)² < r²`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Roi {
    /// Center column.
    pub center_x: i64,
    /// Center row.
    pub center_y: i64,
    /// Caller-supplied diameter in pixels.
    pub diameter: u32,
}

impl Roi {
    /// ROI centered on a `width x height` grid.
    ///
    /// Fails with [`EdgeError::InvalidRoi`] when `diameter` exceeds either
    /// dimension or is zero.
    pub fn centered(width: u32, height: u32, diameter: u32) -> Result<Self, EdgeError> {
        if diameter == 0 || diameter > width.min(height) {
            return Err(EdgeError::InvalidRoi {
                diameter,
                width,
                height,
            });
        }
        Ok(Self {
            center_x: (width / 2) as i64,
            center_y: (height / 2) as i64,
            diameter,
        })
    }

    /// ROI centered on `grid`.
    pub fn for_grid<T: Intensity>(grid: &Grid<T>, diameter: u32) -> Result<Self, EdgeError> {
        Self::centered(grid.width(), grid.height(), diameter)
    }

    /// Integer radius (`diameter / 2`).
    #[inline]
    pub fn radius(&self) -> i64 {
        (self.diameter / 2) as i64
    }

    /// Center as floating-point `[x, y]`.
    pub fn center(&self) -> [f64; 2] {
        [self.center_x as f64, self.center_y as f64]
    }

    /// Strict disk membership.
    #[inline]
    pub fn contains(&self, x: i64, y: i64) -> bool {
        let r = self.radius();
        let dx = x - self.center_x;
        let dy = y - self.center_y;
        dx * dx + dy * dy < r * r
    }

    /// Iterate the pixels strictly inside the disk, column-major over the
    /// bounding square `[c - r, c + r)`.
    pub fn pixels(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        let r = self.radius();
        let (cx, cy) = (self.center_x, self.center_y);
        ((cx - r)..(cx + r)).flat_map(move |x| {
            ((cy - r)..(cy + r))
                .filter(move |&y| self.contains(x, y))
                .map(move |y| (x as u32, y as u32))
        })
    }

    /// Number of pixels strictly inside the disk.
    pub fn pixel_count(&self) -> usize {
        self.pixels().count()
    }
}

/// Euclidean distance between two points.
#[inline]
pub fn euclidean_distance(a: [f64; 2], b: [f64; 2]) -> f64 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    (dx * dx + dy * dy).sqrt()
}
