//! Blurriness estimators over the edge spread function.
//!
//! [`BlurMethod::ErfSigma`] is the primary metric: `|σ|` of the fitted
//! smoothed-step model, in pixels. [`BlurMethod::RiseDistance`] is a fit-free
//! alternative whose value is normalized by the ROI diameter. The two are on
//! different scales and are never substituted for one another.

use serde::{Deserialize, Serialize};

use crate::error::EdgeError;
use crate::esf::{edge_spread_function, EdgeSpreadFunction, EsfConfig};
use crate::fit::{fit_esf, FitConfig, FitResult};
use crate::grid::{Grid, Intensity, Roi};
use crate::line::Line;

/// Blur metric selection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlurMethod {
    /// `|σ|` of the erf model fit, in pixels.
    ErfSigma,
    /// Distance between the low and high intensity-percentile crossings of
    /// the ESF, divided by the ROI diameter.
    RiseDistance {
        /// Lower percentile in `[0, 100]`.
        low_percentile: f64,
        /// Upper percentile in `[0, 100]`.
        high_percentile: f64,
        /// Relative half-width of the band accepted around each percentile value.
        tolerance: f64,
    },
}

impl Default for BlurMethod {
    fn default() -> Self {
        Self::ErfSigma
    }
}

impl BlurMethod {
    /// Rise distance with the 25th/75th percentiles and a ±3% band.
    pub fn rise_distance() -> Self {
        Self::RiseDistance {
            low_percentile: 25.0,
            high_percentile: 75.0,
            tolerance: 0.03,
        }
    }
}

/// Blur value plus the fit it came from (erf method only).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlurEstimate {
    /// Non-negative blurriness metric.
    pub value: f64,
    /// Fitted edge model when [`BlurMethod::ErfSigma`] was used.
    pub fit: Option<FitResult>,
}

/// Percentile of `values` with linear interpolation between closest ranks.
///
/// Returns `None` for an empty slice.
pub fn percentile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let pos = (q.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let t = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * t)
}

/// ESF distance nearest the line whose intensity lies within
/// `[v·(1 - tol), v·(1 + tol)]`, `v` being the `q`-th percentile of the
/// bin intensities. Falls back to `0` when no bin lies in the band.
fn percentile_crossing(esf: &EdgeSpreadFunction, q: f64, tolerance: f64) -> f64 {
    let intensities = esf.intensities();
    let Some(v) = percentile(&intensities, q) else {
        return 0.0;
    };
    let (a, b) = (v * (1.0 - tolerance), v * (1.0 + tolerance));
    let (low, high) = (a.min(b), a.max(b));
    esf.samples
        .iter()
        .filter(|s| (low..=high).contains(&s.intensity))
        .min_by(|x, y| x.distance.abs().total_cmp(&y.distance.abs()))
        .map_or(0.0, |s| s.distance)
}

/// Fit-free blur metric: `|d_high - d_low| / diameter`.
pub fn rise_distance(
    esf: &EdgeSpreadFunction,
    diameter: u32,
    low_percentile: f64,
    high_percentile: f64,
    tolerance: f64,
) -> Result<f64, EdgeError> {
    if esf.is_empty() {
        return Err(EdgeError::EmptyEdgeSpreadFunction);
    }
    let d_low = percentile_crossing(esf, low_percentile, tolerance);
    let d_high = percentile_crossing(esf, high_percentile, tolerance);
    Ok((d_high - d_low).abs() / (2 * (diameter / 2)).max(1) as f64)
}

/// Build the ESF of `grid` across `line` and reduce it with `method`.
pub fn estimate_blur<T: Intensity>(
    grid: &Grid<T>,
    line: &Line,
    roi: &Roi,
    esf_config: &EsfConfig,
    fit_config: &FitConfig,
    method: &BlurMethod,
) -> Result<BlurEstimate, EdgeError> {
    let esf = edge_spread_function(grid, line, roi, esf_config)?;
    let estimate = match *method {
        BlurMethod::ErfSigma => {
            let fit = fit_esf(&esf, fit_config)?;
            BlurEstimate {
                value: fit.blurriness(),
                fit: Some(fit),
            }
        }
        BlurMethod::RiseDistance {
            low_percentile,
            high_percentile,
            tolerance,
        } => BlurEstimate {
            value: rise_distance(&esf, roi.diameter, low_percentile, high_percentile, tolerance)?,
            fit: None,
        },
    };
    tracing::debug!(
        "blur estimate {:.5} from {} ESF bins ({:?})",
        estimate.value,
        esf.len(),
        method
    );
    Ok(estimate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::esf::EsfSample;
    use crate::test_utils::{erf_edge_image, vertical_step_image};
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    fn esf_from(points: &[(f64, f64)]) -> EdgeSpreadFunction {
        EdgeSpreadFunction {
            bin_width: 0.5,
            samples: points
                .iter()
                .map(|&(distance, intensity)| EsfSample {
                    distance,
                    intensity,
                    count: 1,
                })
                .collect(),
        }
    }

    #[test]
    fn percentile_interpolates_linearly() {
        let v = [4.0, 1.0, 3.0, 2.0];
        assert_abs_diff_eq!(percentile(&v, 0.0).unwrap(), 1.0);
        assert_abs_diff_eq!(percentile(&v, 50.0).unwrap(), 2.5);
        assert_abs_diff_eq!(percentile(&v, 25.0).unwrap(), 1.75);
        assert_abs_diff_eq!(percentile(&v, 100.0).unwrap(), 4.0);
        assert!(percentile(&[], 50.0).is_none());
    }

    #[test]
    fn sigma_fit_recovers_transition_width() {
        let line = Line::from_points([150.0, 0.0], [150.0, 299.0]).unwrap();
        for w in [2.0, 4.0, 8.0] {
            let img = erf_edge_image(300, 300, &line, w, 40.0, 210.0);
            let roi = Roi::for_grid(&img, 236).unwrap();
            let est = estimate_blur(
                &img,
                &line,
                &roi,
                &EsfConfig::default(),
                &FitConfig::default(),
                &BlurMethod::ErfSigma,
            )
            .unwrap();
            assert!(est.fit.is_some());
            assert_relative_eq!(est.value, w, max_relative = 0.15);
        }
    }

    #[test]
    fn sharp_step_has_small_sigma() {
        let img = vertical_step_image(300, 300, 150, 200, 50);
        let roi = Roi::for_grid(&img, 236).unwrap();
        let line = Line::from_points([150.0, 0.0], [150.0, 299.0]).unwrap();
        let est = estimate_blur(
            &img,
            &line,
            &roi,
            &EsfConfig::default(),
            &FitConfig::default(),
            &BlurMethod::ErfSigma,
        )
        .unwrap();
        assert!(est.value >= 0.0);
        assert!(est.value < 1.0, "sigma={}", est.value);
    }

    #[test]
    fn rise_distance_picks_band_members_nearest_the_line() {
        // bins: flat 10 on the left, ramp, flat 50 on the right
        let esf = esf_from(&[
            (-3.0, 10.0),
            (-2.0, 10.0),
            (-1.0, 20.0),
            (0.0, 30.0),
            (1.0, 40.0),
            (2.0, 50.0),
            (3.0, 50.0),
        ]);
        // p25 = 15 -> band [14.55, 15.45] holds nothing -> 0
        // p75 = 45 -> band [43.65, 46.35] holds nothing -> 0
        assert_abs_diff_eq!(rise_distance(&esf, 100, 25.0, 75.0, 0.03).unwrap(), 0.0);

        // p25 band [7.5, 22.5] is nearest the line at -1,
        // p75 band [22.5, 67.5] at 0
        let r = rise_distance(&esf, 100, 25.0, 75.0, 0.5).unwrap();
        assert_abs_diff_eq!(r, 1.0 / 100.0, epsilon = 1e-12);
    }

    #[test]
    fn rise_distance_method_has_no_fit() {
        let line = Line::from_points([150.0, 0.0], [150.0, 299.0]).unwrap();
        let img = erf_edge_image(300, 300, &line, 6.0, 40.0, 210.0);
        let roi = Roi::for_grid(&img, 236).unwrap();
        let est = estimate_blur(
            &img,
            &line,
            &roi,
            &EsfConfig::default(),
            &FitConfig::default(),
            &BlurMethod::rise_distance(),
        )
        .unwrap();
        assert!(est.fit.is_none());
        assert!(est.value >= 0.0 && est.value <= 1.0);
    }

    #[test]
    fn empty_esf_is_an_error() {
        let esf = esf_from(&[]);
        assert!(matches!(
            rise_distance(&esf, 10, 25.0, 75.0, 0.03),
            Err(EdgeError::EmptyEdgeSpreadFunction)
        ));
    }

    #[test]
    fn blur_method_serializes_snake_case() {
        let json = serde_json::to_string(&BlurMethod::ErfSigma).unwrap();
        assert_eq!(json, "\"erf_sigma\"");
        let back: BlurMethod = serde_json::from_str(
            r#"{"rise_distance":{"low_percentile":25.0,"high_percentile":75.0,"tolerance":0.03}}"#,
        )
        .unwrap();
        assert_eq!(back, BlurMethod::rise_distance());
    }
}
