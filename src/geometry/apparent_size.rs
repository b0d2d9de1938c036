//! Apparent size of the target body in image pixels.

use std::f64::consts::SQRT_2;

use crate::ephemeris::FieldOfView;

/// Angular size of one pixel for a square sensor of `resolution` pixels.
///
/// The diagonal half-angle is the widest angle between the boresight and a
/// boundary vector; the sensor width is the diagonal over √2.
pub fn pixel_scale(fov: &FieldOfView, resolution: u32) -> Option<f64> {
    if resolution == 0 {
        return None;
    }
    let boresight = fov.boresight.try_normalize(0.0)?;
    let half_diagonal = fov
        .bounds
        .iter()
        .filter_map(|b| b.try_normalize(0.0))
        .map(|b| boresight.dot(&b).clamp(-1.0, 1.0).acos())
        .reduce(f64::max)?;

    Some((2.0 * half_diagonal / SQRT_2) / f64::from(resolution))
}

/// Full angle subtended by a sphere of `radius` seen from `range`.
pub fn angular_diameter(range: f64, radius: f64) -> Option<f64> {
    if range <= radius {
        return None;
    }
    Some(2.0 * (radius / range).clamp(0.0, 1.0).asin())
}

pub fn diameter_px(range: f64, radius: f64, pixel_scale: f64) -> Option<f64> {
    if pixel_scale <= 0.0 {
        return None;
    }
    Some(angular_diameter(range, radius)? / pixel_scale)
}
