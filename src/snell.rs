//! Snell's law at a planar interface between two lossless dielectrics.
//!
//! Angles are in degrees at the public boundary. Beyond the critical angle there
//! is no real transmitted angle: [`theta_t`] returns `None` instead of taking
//! the arcsine of a value above one.

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normal_incidence_same_media() {
        let theta_t = theta_t(0.0, 1.0, 1.0).unwrap();
        assert!(theta_t.abs() < 1e-12)
    }

    #[test]
    fn normal_incidence() {
        let theta_t = theta_t(0.0, 1.0, 1.31).unwrap();
        assert!(theta_t.abs() < f64::EPSILON)
    }

    #[test]
    fn angle30_incidence() {
        let theta_t = theta_t(30.0, 1.0, 1.31).unwrap().to_radians();
        let abs_difference = (theta_t - 0.3916126).abs();
        assert!(abs_difference < 0.001)
    }

    #[test]
    fn total_internal_reflection() {
        assert!(theta_t(60.0, 1.5, 1.0).is_none());
        assert!(is_tir(60.0, 1.5, 1.0));
        assert!(!is_tir(30.0, 1.5, 1.0));
        assert!((sin_theta_t(60.0, 1.5, 1.0) - 1.299038).abs() < 1e-5);
    }

    #[test]
    fn grazing_incidence_is_finite() {
        let theta_t = theta_t(90.0, 1.0, 1.5).unwrap();
        assert!((theta_t - (1.0f64 / 1.5).asin().to_degrees()).abs() < 1e-9);
    }
}

/// `sin θt = n1·sin θi / n2`. May exceed one, which signals total internal reflection.
pub fn sin_theta_t(theta_i: f64, n1: f64, n2: f64) -> f64 {
    n1 * theta_i.to_radians().sin() / n2
}

pub fn is_tir(theta_i: f64, n1: f64, n2: f64) -> bool {
    sin_theta_t(theta_i, n1, n2).powi(2) > 1.0
}

/// Transmitted angle in degrees, or `None` under total internal reflection.
pub fn theta_t(theta_i: f64, n1: f64, n2: f64) -> Option<f64> {
    if n1 == n2 {
        return Some(theta_i);
    }
    let sin_t = sin_theta_t(theta_i, n1, n2);
    if sin_t * sin_t > 1.0 {
        return None;
    }
    Some(sin_t.clamp(-1.0, 1.0).asin().to_degrees())
}
