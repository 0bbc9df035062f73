//! Jones calculus for fully polarized light.
//!
//! A Jones vector holds the complex field amplitudes `[Ex, Ey]` and a Jones
//! matrix is a linear, non-depolarizing operator. Both are plain nalgebra
//! types so that composition is ordinary matrix multiplication.
//!
//! Every factory takes its angles in degrees and converts them to radians
//! exactly once. Angles are measured counter-clockwise from the horizontal
//! (x) axis. Retarders put the phase `e^{-iδ/2}` on the fast axis and
//! `e^{+iδ/2}` on the slow axis; with `S3 = 2·Im(Ex·Ey*)` this makes a
//! quarter-wave plate at 45° turn horizontal light into right-circular light.

use nalgebra::{Matrix2, Vector2};

use crate::complex::{self, Complex};
use crate::config;
use crate::state::PolarizationInfo;

pub type JonesVector = Vector2<Complex>;
pub type JonesMatrix = Matrix2<Complex>;


/// Standard 2x2 complex matrix-by-vector product.
pub fn apply_jones_matrix(m: &JonesMatrix, v: &JonesVector) -> JonesVector {
    m * v
}

/// Intensity `|Ex|² + |Ey|²`.
pub fn intensity(v: &JonesVector) -> f64 {
    complex::magnitude_sq(v[0]) + complex::magnitude_sq(v[1])
}

/// Scales `v` to unit intensity. Extinguished vectors normalise to the zero vector.
pub fn normalize(v: &JonesVector) -> JonesVector {
    let i = intensity(v);
    if i < config::ZERO_INTENSITY {
        return JonesVector::zeros();
    }
    let norm = i.sqrt();
    v.map(|c| c / norm)
}

/// Linearly polarized light at `angle` degrees with the given intensity.
pub fn from_angle(angle: f64, intensity: f64) -> JonesVector {
    let theta = angle.to_radians();
    let amplitude = intensity.max(0.0).sqrt();
    JonesVector::new(
        Complex::new(amplitude * theta.cos(), 0.0),
        Complex::new(amplitude * theta.sin(), 0.0),
    )
}

/// Circularly polarized light. Right-handed light has `S3 > 0`.
pub fn circular(right: bool, intensity: f64) -> JonesVector {
    let amplitude = (intensity.max(0.0) / 2.0).sqrt();
    let ey = if right {
        Complex::new(0.0, -amplitude)
    } else {
        Complex::new(0.0, amplitude)
    };
    JonesVector::new(Complex::new(amplitude, 0.0), ey)
}

pub fn analyze_polarization(v: &JonesVector) -> PolarizationInfo {
    PolarizationInfo::from_jones(*v)
}

fn real(m11: f64, m12: f64, m21: f64, m22: f64) -> JonesMatrix {
    JonesMatrix::new(
        Complex::new(m11, 0.0),
        Complex::new(m12, 0.0),
        Complex::new(m21, 0.0),
        Complex::new(m22, 0.0),
    )
}

/// Ideal linear polarizer with its transmission axis at `angle` degrees.
pub fn polarizer_matrix(angle: f64) -> JonesMatrix {
    let (s, c) = angle.to_radians().sin_cos();
    real(c * c, c * s, c * s, s * s)
}

/// Dichroic polarizer with intensity transmittances `t_par` along and
/// `t_perp` across the axis at `angle` degrees.
pub fn partial_polarizer_matrix(angle: f64, t_par: f64, t_perp: f64) -> JonesMatrix {
    let (s, c) = angle.to_radians().sin_cos();
    let a = t_par.max(0.0).sqrt();
    let b = t_perp.max(0.0).sqrt();
    real(
        a * c * c + b * s * s,
        (a - b) * c * s,
        (a - b) * c * s,
        a * s * s + b * c * c,
    )
}

/// Linear retarder with fast axis at `fast_axis` and retardance `retardance`, both in degrees.
pub fn retarder_matrix(fast_axis: f64, retardance: f64) -> JonesMatrix {
    retarder_matrix_rad(fast_axis.to_radians(), retardance.to_radians())
}

fn retarder_matrix_rad(theta: f64, delta: f64) -> JonesMatrix {
    let (s, c) = theta.sin_cos();
    let fast = complex::phasor(-delta / 2.0);
    let slow = complex::phasor(delta / 2.0);
    let off = (fast - slow) * (c * s);
    JonesMatrix::new(
        fast * (c * c) + slow * (s * s),
        off,
        off,
        fast * (s * s) + slow * (c * c),
    )
}

pub fn half_wave_plate_matrix(fast_axis: f64) -> JonesMatrix {
    retarder_matrix_rad(fast_axis.to_radians(), std::f64::consts::PI)
}

pub fn quarter_wave_plate_matrix(fast_axis: f64) -> JonesMatrix {
    retarder_matrix_rad(fast_axis.to_radians(), std::f64::consts::FRAC_PI_2)
}

/// Optical rotator turning the plane of polarization by `angle` degrees.
pub fn rotator_matrix(angle: f64) -> JonesMatrix {
    let (s, c) = angle.to_radians().sin_cos();
    real(c, -s, s, c)
}

/// Ideal mirror at normal incidence. The y component flips sign, which
/// reverses the handedness of circular light.
pub fn mirror_matrix() -> JonesMatrix {
    real(1.0, 0.0, 0.0, -1.0)
}
