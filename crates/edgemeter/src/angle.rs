//! Canonical edge angle in `[0, 360)`.
//!
//! A line's slope fixes its orientation only modulo 180°. The side on which
//! the object's darker half lies picks one of the two directions.

/// Map a raw orientation to the canonical angle.
///
/// * `raw_deg`: `atan(dy/dx)` of the line in degrees, `(-90, 90]`.
/// * `is_horizontal`: the line is closer to horizontal than vertical.
/// * `darker_above_left`: the object-relative darker half-plane lies
///   above (horizontal-dominant) or to the left (vertical-dominant).
pub fn canonical_angle(raw_deg: f64, is_horizontal: bool, darker_above_left: bool) -> f64 {
    if is_horizontal {
        let base = if darker_above_left { 360.0 } else { 180.0 };
        return (base - raw_deg).rem_euclid(360.0);
    }
    match (darker_above_left, raw_deg < 0.0) {
        (true, true) => raw_deg.abs(),
        (true, false) => 90.0 + (90.0 - raw_deg).abs(),
        (false, true) => 270.0 - (90.0 - raw_deg.abs()).abs(),
        (false, false) => 270.0 + (90.0 - raw_deg).abs(),
    }
}
