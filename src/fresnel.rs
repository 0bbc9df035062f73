//! Fresnel equations at a planar interface between two lossless dielectrics.
//!
//! Amplitude coefficients follow the convention
//!
//! - `rs = (n1 cosθi − n2 cosθt) / (n1 cosθi + n2 cosθt)`
//! - `rp = (n2 cosθi − n1 cosθt) / (n2 cosθi + n1 cosθt)`
//! - `ts = 2 n1 cosθi / (n1 cosθi + n2 cosθt)`
//! - `tp = 2 n1 cosθi / (n2 cosθi + n1 cosθt)`
//!
//! Jones matrices are diagonal in the (p, s) basis, p along the first
//! component. Beyond the critical angle `cosθt` becomes imaginary and the
//! reflection coefficients are unit-magnitude phasors; no arcsine of a value
//! above one is ever taken. Transmitted energy is reported as `T = 1 − R`,
//! which equals `η·|t|²` with `η = (n2 cosθt) / (n1 cosθi)` and stays finite at
//! grazing incidence.

use nalgebra::Vector2;

use crate::complex::Complex;
use crate::config;
use crate::jones::JonesMatrix;
use crate::mueller::MuellerMatrix;
use crate::snell;


/// Amplitude coefficients at an interface, plus the transmitted angle in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FresnelCoefficients {
    pub rs: Complex,
    pub rp: Complex,
    pub ts: Complex,
    pub tp: Complex,
    /// `None` under total internal reflection.
    pub theta_t: Option<f64>,
    pub is_tir: bool,
    n1: f64,
    n2: f64,
    cos_i: f64,
}

impl FresnelCoefficients {
    /// Intensity reflectances `(Rs, Rp)`.
    pub fn reflectances(&self) -> (f64, f64) {
        (self.rs.norm_sqr(), self.rp.norm_sqr())
    }

    /// Intensity transmittances `(Ts, Tp)`; zero under total internal reflection.
    pub fn transmittances(&self) -> (f64, f64) {
        if self.is_tir {
            return (0.0, 0.0);
        }
        let (rs, rp) = self.reflectances();
        ((1.0 - rs).max(0.0), (1.0 - rp).max(0.0))
    }

    /// Beam cross-section factor `η = (n2 cosθt) / (n1 cosθi)`.
    /// `None` under total internal reflection or at grazing incidence.
    pub fn beam_factor(&self) -> Option<f64> {
        let theta_t = self.theta_t?;
        let denominator = self.n1 * self.cos_i;
        if denominator.abs() < config::FRESNEL_EPSILON {
            return None;
        }
        Some(self.n2 * theta_t.to_radians().cos() / denominator)
    }
}

/// Fresnel amplitude coefficients for light going from index `n1` into `n2`
/// at incidence `theta_i` degrees.
pub fn fresnel_amplitudes(n1: f64, n2: f64, theta_i: f64) -> FresnelCoefficients {
    let sin_t = snell::sin_theta_t(theta_i, n1, n2);
    if sin_t * sin_t > 1.0 {
        return fresnel_tir(n1, n2, theta_i);
    }
    let cos_i = theta_i.to_radians().cos();
    let cos_t = Complex::new((1.0 - sin_t * sin_t).max(0.0).sqrt(), 0.0);
    let (rs, rp, ts, tp) = coefficients(n1, n2, cos_i, cos_t);
    FresnelCoefficients {
        rs,
        rp,
        ts,
        tp,
        theta_t: snell::theta_t(theta_i, n1, n2),
        is_tir: false,
        n1,
        n2,
        cos_i,
    }
}

/// Total internal reflection: `cosθt = i·√(sin²θt − 1)`, giving `|rs| = |rp| = 1`
/// with a well-defined phase. No energy is transmitted.
pub fn fresnel_tir(n1: f64, n2: f64, theta_i: f64) -> FresnelCoefficients {
    let sin_t = snell::sin_theta_t(theta_i, n1, n2);
    let cos_i = theta_i.to_radians().cos();
    let cos_t = Complex::new(0.0, (sin_t * sin_t - 1.0).max(0.0).sqrt());
    let (rs, rp, _, _) = coefficients(n1, n2, cos_i, cos_t);
    let zero = Complex::new(0.0, 0.0);
    FresnelCoefficients {
        rs,
        rp,
        ts: zero,
        tp: zero,
        theta_t: None,
        is_tir: true,
        n1,
        n2,
        cos_i,
    }
}

/// Guarded coefficient formulas. A vanishing denominator takes the limit of
/// no reflection and full transmission.
fn coefficients(
    n1: f64,
    n2: f64,
    cos_i: f64,
    cos_t: Complex,
) -> (Complex, Complex, Complex, Complex) {
    let one = Complex::new(1.0, 0.0);
    let zero = Complex::new(0.0, 0.0);
    let incident_s = Complex::new(n1 * cos_i, 0.0);
    let incident_p = Complex::new(n2 * cos_i, 0.0);
    let ds = incident_s + cos_t * n2;
    let dp = incident_p + cos_t * n1;
    let (rs, ts) = if ds.norm() < config::FRESNEL_EPSILON {
        (zero, one)
    } else {
        ((incident_s - cos_t * n2) / ds, incident_s * 2.0 / ds)
    };
    let (rp, tp) = if dp.norm() < config::FRESNEL_EPSILON {
        (zero, one)
    } else {
        ((incident_p - cos_t * n1) / dp, incident_s * 2.0 / dp)
    };
    (rs, rp, ts, tp)
}

/// Amplitude reflection matrix `diag(rp, rs)` in the (p, s) basis.
pub fn reflection_matrix(n1: f64, n2: f64, theta_i: f64) -> JonesMatrix {
    let f = fresnel_amplitudes(n1, n2, theta_i);
    JonesMatrix::from_diagonal(&Vector2::new(f.rp, f.rs))
}

/// Amplitude transmission matrix `diag(tp, ts)` in the (p, s) basis.
pub fn transmission_matrix(n1: f64, n2: f64, theta_i: f64) -> JonesMatrix {
    let f = fresnel_amplitudes(n1, n2, theta_i);
    JonesMatrix::from_diagonal(&Vector2::new(f.tp, f.ts))
}

/// Transmission matrix `diag(√Tp, √Ts)` whose intensities are energy fluxes.
/// The zero matrix under total internal reflection.
pub fn energy_transmission_matrix(n1: f64, n2: f64, theta_i: f64) -> JonesMatrix {
    let (ts, tp) = fresnel_amplitudes(n1, n2, theta_i).transmittances();
    JonesMatrix::from_diagonal(&Vector2::new(
        Complex::new(tp.sqrt(), 0.0),
        Complex::new(ts.sqrt(), 0.0),
    ))
}

/// Mueller matrix of reflection, including the TIR phase retardance.
pub fn fresnel_mueller_reflect(n1: f64, n2: f64, theta_i: f64) -> MuellerMatrix {
    MuellerMatrix::from_jones_elements(&reflection_matrix(n1, n2, theta_i))
}

/// Mueller matrix of transmission in the energy domain, or `None` under total internal reflection.
pub fn fresnel_mueller_transmit(n1: f64, n2: f64, theta_i: f64) -> Option<MuellerMatrix> {
    let f = fresnel_amplitudes(n1, n2, theta_i);
    if f.is_tir {
        return None;
    }
    let (ts, tp) = f.transmittances();
    let sum = 0.5 * (tp + ts);
    let diff = 0.5 * (tp - ts);
    let cross = (tp * ts).sqrt();
    Some(MuellerMatrix::new(nalgebra::Matrix4::new(
        sum, diff, 0.0, 0.0, //
        diff, sum, 0.0, 0.0, //
        0.0, 0.0, cross, 0.0, //
        0.0, 0.0, 0.0, cross,
    )))
}

/// Brewster's angle `atan(n2 / n1)` in degrees.
pub fn brewster_angle(n1: f64, n2: f64) -> f64 {
    (n2 / n1).atan().to_degrees()
}

/// Critical angle `asin(n2 / n1)` in degrees. NaN when `n1 ≤ n2`: there is no
/// total internal reflection going into a denser medium.
pub fn critical_angle(n1: f64, n2: f64) -> f64 {
    if n1 <= n2 {
        return f64::NAN;
    }
    (n2 / n1).asin().to_degrees()
}
