//! Shared angle helpers
//!
//! Headings travel on the wire and through the peer table in degrees.
//! Absolute headings live in `[0, 360)`; differences between two headings
//! live in `[-180, 180]`.

/// Normalize an absolute heading to `[0, 360)` degrees
#[inline]
pub fn normalize_heading(degrees: f32) -> f32 {
    let h = degrees.rem_euclid(360.0);
    // rem_euclid rounds tiny negative inputs up to exactly 360.0
    if h >= 360.0 { 0.0 } else { h }
}

/// Normalize a heading difference to `[-180, 180]` degrees
#[inline]
pub fn normalize_heading_error(degrees: f32) -> f32 {
    let e = (degrees + 180.0).rem_euclid(360.0) - 180.0;
    e.clamp(-180.0, 180.0)
}

/// Normalize an angle difference in radians to `[-π, π]`
#[inline]
pub fn normalize_angle(radians: f32) -> f32 {
    use std::f32::consts::{PI, TAU};
    ((radians + PI).rem_euclid(TAU) - PI).clamp(-PI, PI)
}

/// Rotate a 2D vector counter-clockwise by `radians`
#[inline]
pub fn rotate(x: f32, y: f32, radians: f32) -> (f32, f32) {
    let (sin, cos) = radians.sin_cos();
    (x * cos - y * sin, x * sin + y * cos)
}

/// Scale `(x, y)` down so its magnitude does not exceed `limit`, keeping direction
#[inline]
pub fn clamp_magnitude(x: f32, y: f32, limit: f32) -> (f32, f32) {
    let magnitude = x.hypot(y);
    if magnitude > limit && magnitude > 0.0 {
        let scale = limit / magnitude;
        (x * scale, y * scale)
    } else {
        (x, y)
    }
}
