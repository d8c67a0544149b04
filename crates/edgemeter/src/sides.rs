//! Half-plane statistics on either side of the edge line.

use serde::{Deserialize, Serialize};

use crate::grid::{sample, Grid, Intensity, Roi};
use crate::line::Line;

/// Mean intensity on each side of the line inside the ROI.
///
/// Side 1 is the half-plane with non-negative signed distance (below a
/// horizontal-dominant line, right of a vertical-dominant one); side 2 is
/// the rest.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SideClassification {
    /// Mean intensity of side 1 (0 when the side is empty).
    pub mean_side_1: f64,
    /// Mean intensity of side 2 (0 when the side is empty).
    pub mean_side_2: f64,
    /// Pixels on side 1.
    pub count_side_1: usize,
    /// Pixels on side 2.
    pub count_side_2: usize,
    /// `mean_side_1 > mean_side_2`: the darker half-plane lies above or to
    /// the left of the line.
    pub darker_above_left: bool,
}

impl SideClassification {
    /// `|p2 - p1| / (p2 + p1)`, saturating to 0 when the sum is zero.
    pub fn contrast(&self) -> f64 {
        contrast(self.mean_side_1, self.mean_side_2)
    }

    /// Object-relative darker-side flag used by the angle normalizer.
    pub fn object_darker_above_left(&self, is_object_lighter: bool) -> bool {
        self.darker_above_left ^ is_object_lighter
    }
}

/// Normalized intensity difference of two side means.
#[inline]
pub fn contrast(p1: f64, p2: f64) -> f64 {
    let sum = p1 + p2;
    if sum == 0.0 {
        return 0.0;
    }
    ((p2 - p1) / sum).abs()
}

/// Partition the ROI pixels of `grid` by the sign of their distance to
/// `line` and average each side.
pub fn classify_sides<T: Intensity>(grid: &Grid<T>, line: &Line, roi: &Roi) -> SideClassification {
    let mut sum = [0.0f64; 2];
    let mut count = [0usize; 2];
    for (x, y) in roi.pixels() {
        let gap = line.signed_distance(x as f64, y as f64);
        let k = if gap >= 0.0 { 0 } else { 1 };
        sum[k] += sample(grid, x, y);
        count[k] += 1;
    }
    let mean = |k: usize| {
        if count[k] == 0 {
            0.0
        } else {
            sum[k] / count[k] as f64
        }
    };
    let (p1, p2) = (mean(0), mean(1));
    SideClassification {
        mean_side_1: p1,
        mean_side_2: p2,
        count_side_1: count[0],
        count_side_2: count[1],
        darker_above_left: p1 > p2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::line::LineInput;
    use crate::test_utils::{half_plane_image, vertical_step_image};
    use approx::assert_abs_diff_eq;

    #[test]
    fn vertical_step_contrast() {
        let img = vertical_step_image(300, 300, 150, 200, 50);
        let roi = Roi::for_grid(&img, 236).unwrap();
        let line = Line::from_points([150.0, 0.0], [150.0, 299.0]).unwrap();
        let s = classify_sides(&img, &line, &roi);
        assert_abs_diff_eq!(s.mean_side_1, 50.0);
        assert_abs_diff_eq!(s.mean_side_2, 200.0);
        assert!(!s.darker_above_left);
        assert_abs_diff_eq!(s.contrast(), 0.6, epsilon = 1e-12);
        assert_eq!(s.count_side_1 + s.count_side_2, roi.pixel_count());
    }

    #[test]
    fn contrast_saturates_to_zero() {
        assert_eq!(contrast(0.0, 0.0), 0.0);
        let img = Grid::<u8>::new(64, 64);
        let roi = Roi::for_grid(&img, 40).unwrap();
        let line = Line::from_polar(32.0, 0.3);
        let s = classify_sides(&img, &line, &roi);
        assert_eq!(s.contrast(), 0.0);
    }

    #[test]
    fn contrast_is_bounded_for_nonnegative_means() {
        for (p1, p2) in [(0.0, 10.0), (10.0, 0.0), (3.0, 3.0), (255.0, 1.0)] {
            let c = contrast(p1, p2);
            assert!((0.0..=1.0).contains(&c), "{} {} -> {}", p1, p2, c);
        }
        assert_eq!(contrast(7.0, 7.0), 0.0);
    }

    #[test]
    fn lighter_flag_flips_object_side() {
        let s = SideClassification {
            mean_side_1: 10.0,
            mean_side_2: 20.0,
            count_side_1: 1,
            count_side_2: 1,
            darker_above_left: false,
        };
        assert!(!s.object_darker_above_left(false));
        assert!(s.object_darker_above_left(true));
    }

    #[test]
    fn polar_and_point_lines_partition_identically() {
        let p = [0.0, 10.25];
        let q = [100.0, 60.25];
        let from_points = Line::from_points(p, q).unwrap();

        let dir = [q[0] - p[0], q[1] - p[1]];
        let theta = dir[0].atan2(-dir[1]);
        let rho = p[0] * theta.cos() + p[1] * theta.sin();
        let from_polar = LineInput::Polar { rho, theta }.to_line().unwrap();

        let img = half_plane_image(160, 160, &from_points, 180, 40);
        let roi = Roi::for_grid(&img, 150).unwrap();
        for (x, y) in roi.pixels() {
            let a = from_points.signed_distance(x as f64, y as f64) >= 0.0;
            let b = from_polar.signed_distance(x as f64, y as f64) >= 0.0;
            assert_eq!(a, b, "pixel ({}, {})", x, y);
        }
        let sa = classify_sides(&img, &from_points, &roi);
        let sb = classify_sides(&img, &from_polar, &roi);
        assert_eq!(sa, sb);
    }

    #[test]
    fn float_grids_are_supported() {
        let img = Grid::<f32>::from_fn(100, 100, |x, _| {
            image::Luma([if x >= 50 { 0.2 } else { 0.8 }])
        });
        let roi = Roi::for_grid(&img, 80).unwrap();
        let line = Line::from_points([50.0, 0.0], [50.0, 99.0]).unwrap();
        let s = classify_sides(&img, &line, &roi);
        assert_abs_diff_eq!(s.contrast(), 0.6, epsilon = 1e-6);
    }
}
