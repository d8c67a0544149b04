//! Canonical edge line and the two external representations that feed it.
//!
//! Every downstream stage works on [`Line`], stored as a unit-normal
//! implicit equation `a·x + b·y + c = 0`. This keeps vertical lines
//! (`dx = 0`) free of infinite slopes; the slope/intercept view is only
//! produced on demand.
//!
//! Sign convention: `(a, b, c)` is oriented so that the signed distance is
//! non-negative below a horizontal-dominant line (`y` larger) and to the
//! right of a vertical-dominant line (`x` larger). That half-plane is
//! "side 1" of the side classifier.

use serde::{Deserialize, Serialize};

use crate::error::EdgeError;

/// Edge line in canonical implicit form.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Line {
    a: f64,
    b: f64,
    c: f64,
    is_horizontal: bool,
}

/// Line as it arrives at the core boundary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineInput {
    /// Hough-style polar form: `x·cos θ + y·sin θ = rho`, `theta` in radians.
    Polar {
        /// Signed distance of the line from the origin.
        rho: f64,
        /// Normal angle in radians.
        theta: f64,
    },
    /// Two distinct points on the line.
    Points([f64; 2], [f64; 2]),
}

impl LineInput {
    /// Convert to the canonical form.
    pub fn to_line(&self) -> Result<Line, EdgeError> {
        match *self {
            Self::Polar { rho, theta } => Ok(Line::from_polar(rho, theta)),
            Self::Points(p1, p2) => Line::from_points(p1, p2),
        }
    }
}

impl Line {
    /// Line through two points. Fails when the points coincide.
    pub fn from_points(p1: [f64; 2], p2: [f64; 2]) -> Result<Self, EdgeError> {
        let dx = p2[0] - p1[0];
        let dy = p2[1] - p1[1];
        if !(dx.is_finite() && dy.is_finite()) || (dx == 0.0 && dy == 0.0) {
            return Err(EdgeError::CoincidentPoints);
        }
        let a = -dy;
        let b = dx;
        // anchored at the midpoint so swapping the points is bit-exact
        let mx = 0.5 * (p1[0] + p2[0]);
        let my = 0.5 * (p1[1] + p2[1]);
        let c = -(a * mx + b * my);
        Ok(Self::oriented(a, b, c, dx.abs() > dy.abs()))
    }

    /// Line from polar parameters (`theta` in radians).
    pub fn from_polar(rho: f64, theta: f64) -> Self {
        let (sin, cos) = theta.sin_cos();
        // direction is (-sin, cos)
        Self::oriented(cos, sin, -rho, sin.abs() > cos.abs())
    }

    /// Line `y = slope·x + intercept`, or the vertical `x = intercept` when
    /// `slope` is infinite.
    pub fn from_slope_intercept(slope: f64, intercept: f64) -> Self {
        if slope.is_infinite() {
            return Self::oriented(1.0, 0.0, -intercept, false);
        }
        Self::oriented(slope, -1.0, intercept, slope.abs() < 1.0)
    }

    fn oriented(a: f64, b: f64, c: f64, is_horizontal: bool) -> Self {
        let n = (a * a + b * b).sqrt();
        let (mut a, mut b, mut c) = (a / n, b / n, c / n);
        let flip = if is_horizontal { b < 0.0 } else { a < 0.0 };
        if flip {
            a = -a;
            b = -b;
            c = -c;
        }
        Self {
            a,
            b,
            c,
            is_horizontal,
        }
    }

    /// Unit-normal coefficients `[a, b, c]`.
    pub fn coeffs(&self) -> [f64; 3] {
        [self.a, self.b, self.c]
    }

    /// `true` when the line is closer to horizontal than vertical.
    pub fn is_horizontal(&self) -> bool {
        self.is_horizontal
    }

    /// Signed perpendicular distance from `(x, y)`; non-negative on side 1.
    #[inline]
    pub fn signed_distance(&self, x: f64, y: f64) -> f64 {
        self.a * x + self.b * y + self.c
    }

    /// Unsigned perpendicular distance from `(x, y)`.
    #[inline]
    pub fn distance(&self, x: f64, y: f64) -> f64 {
        self.signed_distance(x, y).abs()
    }

    /// Orientation of the line as `atan(dy/dx)` in degrees, in `(-90, 90]`.
    ///
    /// A vertical line reports `90`. The value does not depend on which way
    /// the line was traversed.
    pub fn raw_angle_deg(&self) -> f64 {
        if self.b == 0.0 {
            return 90.0;
        }
        (-self.a / self.b).atan().to_degrees()
    }

    /// `(slope, intercept)` of `y = slope·x + intercept`; `None` for a
    /// vertical line.
    pub fn slope_intercept(&self) -> Option<(f64, f64)> {
        if self.b == 0.0 {
            return None;
        }
        Some((-self.a / self.b, -self.c / self.b))
    }

    /// Polar form `(rho, theta)` with `theta` in `[0, π)`.
    pub fn to_polar(&self) -> (f64, f64) {
        let (mut a, mut b, mut c) = (self.a, self.b, self.c);
        if b < 0.0 || (b == 0.0 && a < 0.0) {
            a = -a;
            b = -b;
            c = -c;
        }
        let theta = b.atan2(a);
        (-c, theta)
    }

    /// Shift the line by `(dx, dy)`, e.g. from crop to full-image coordinates.
    pub fn translated(&self, dx: f64, dy: f64) -> Self {
        Self {
            c: self.c - self.a * dx - self.b * dy,
            ..*self
        }
    }

    /// Endpoints of the line clipped to a `width x height` canvas along its
    /// dominant axis.
    pub fn span(&self, width: u32, height: u32) -> ([f32; 2], [f32; 2]) {
        if self.is_horizontal {
            let x1 = (width.max(1) - 1) as f64;
            let y_at = |x: f64| -(self.a * x + self.c) / self.b;
            ([0.0, y_at(0.0) as f32], [x1 as f32, y_at(x1) as f32])
        } else {
            let y1 = (height.max(1) - 1) as f64;
            let x_at = |y: f64| -(self.b * y + self.c) / self.a;
            ([x_at(0.0) as f32, 0.0], [x_at(y1) as f32, y1 as f32])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn vertical_line_has_no_slope_but_measures_distance() {
        let l = Line::from_points([118.0, 0.0], [118.0, 200.0]).unwrap();
        assert!(!l.is_horizontal());
        assert!(l.slope_intercept().is_none());
        assert_abs_diff_eq!(l.raw_angle_deg(), 90.0);
        assert_abs_diff_eq!(l.signed_distance(120.0, 5.0), 2.0);
        assert_abs_diff_eq!(l.signed_distance(110.0, 5.0), -8.0);
    }

    #[test]
    fn horizontal_side_one_is_below() {
        let l = Line::from_points([0.0, 50.0], [100.0, 60.0]).unwrap();
        assert!(l.is_horizontal());
        assert!(l.signed_distance(50.0, 80.0) > 0.0);
        assert!(l.signed_distance(50.0, 30.0) < 0.0);
    }

    #[test]
    fn point_order_does_not_change_line() {
        let p = [12.0, 7.0];
        let q = [40.0, 91.0];
        let l1 = Line::from_points(p, q).unwrap();
        let l2 = Line::from_points(q, p).unwrap();
        assert_eq!(l1, l2);
        assert_eq!(l1.raw_angle_deg(), l2.raw_angle_deg());
    }

    #[test]
    fn polar_and_opposite_polar_agree() {
        let theta = 0.7f64;
        let l1 = Line::from_polar(55.0, theta);
        let l2 = Line::from_polar(-55.0, theta + std::f64::consts::PI);
        for (u, v) in l1.coeffs().iter().zip(l2.coeffs().iter()) {
            assert_abs_diff_eq!(u, v, epsilon = 1e-9);
        }
    }

    #[test]
    fn polar_matches_points() {
        let p = [0.0, 10.25];
        let q = [100.0, 60.25];
        let from_pts = Line::from_points(p, q).unwrap();
        let (rho, theta) = from_pts.to_polar();
        let from_polar = LineInput::Polar { rho, theta }.to_line().unwrap();
        for (u, v) in from_pts.coeffs().iter().zip(from_polar.coeffs().iter()) {
            assert_abs_diff_eq!(u, v, epsilon = 1e-12);
        }
        assert_eq!(from_pts.is_horizontal(), from_polar.is_horizontal());
    }

    #[test]
    fn slope_intercept_round_trip() {
        let l = Line::from_slope_intercept(0.5, 10.25);
        let (m, k) = l.slope_intercept().unwrap();
        assert_abs_diff_eq!(m, 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(k, 10.25, epsilon = 1e-12);
        let v = Line::from_slope_intercept(f64::INFINITY, 42.0);
        assert_abs_diff_eq!(v.signed_distance(45.0, 3.0), 3.0);
    }

    #[test]
    fn coincident_points_are_rejected() {
        assert!(matches!(
            Line::from_points([3.0, 3.0], [3.0, 3.0]),
            Err(EdgeError::CoincidentPoints)
        ));
    }

    #[test]
    fn translation_moves_origin() {
        let l = Line::from_polar(10.0, 0.0).translated(5.0, 0.0);
        assert_abs_diff_eq!(l.signed_distance(15.0, 99.0), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn span_covers_dominant_axis() {
        let l = Line::from_points([0.0, 20.0], [100.0, 30.0]).unwrap();
        let (s, e) = l.span(101, 50);
        assert_abs_diff_eq!(s[0], 0.0);
        assert_abs_diff_eq!(e[0], 100.0);
        assert_abs_diff_eq!(e[1], 30.0, epsilon = 1e-4);
    }
}
