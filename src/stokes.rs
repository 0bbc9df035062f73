//! Stokes vectors for arbitrary, including partially polarized and unpolarized, light.
//!
//! `S0` is the total intensity, `S1` the horizontal/vertical preference,
//! `S2` the ±45° preference and `S3` the right/left circular preference.
//! The physical cone `S1² + S2² + S3² ≤ S0²` is enforced by
//! [`StokesVector::clamp_to_physical`] on every user-facing output.

use std::f64::consts::FRAC_PI_4;
use std::ops::Add;

use nalgebra::Vector4;
use serde::{Deserialize, Serialize};

use crate::complex::Complex;
use crate::config;
use crate::jones::JonesVector;
use crate::state::Handedness;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jones;

    const TOL: f64 = 1e-2;

    fn close(a: &StokesVector, b: [f64; 4], tol: f64) -> bool {
        (a.s0 - b[0]).abs() < tol
            && (a.s1 - b[1]).abs() < tol
            && (a.s2 - b[2]).abs() < tol
            && (a.s3 - b[3]).abs() < tol
    }

    #[test]
    fn canonical_states_from_jones() {
        let h = StokesVector::from_jones(&jones::from_angle(0.0, 1.0));
        let v = StokesVector::from_jones(&jones::from_angle(90.0, 1.0));
        let d = StokesVector::from_jones(&jones::from_angle(45.0, 1.0));
        let r = StokesVector::from_jones(&jones::circular(true, 1.0));
        assert!(close(&h, [1.0, 1.0, 0.0, 0.0], TOL), "{:?}", h);
        assert!(close(&v, [1.0, -1.0, 0.0, 0.0], TOL), "{:?}", v);
        assert!(close(&d, [1.0, 0.0, 1.0, 0.0], TOL), "{:?}", d);
        assert!(close(&r, [1.0, 0.0, 0.0, 1.0], TOL), "{:?}", r);
    }

    #[test]
    fn factories_match_jones_conversions() {
        assert!(close(&StokesVector::create_horizontal(1.0), [1.0, 1.0, 0.0, 0.0], 1e-12));
        assert!(close(&StokesVector::create_vertical(1.0), [1.0, -1.0, 0.0, 0.0], 1e-12));
        assert!(close(&StokesVector::create_diagonal(1.0), [1.0, 0.0, 1.0, 0.0], 1e-12));
        assert!(close(&StokesVector::create_circular(true, 1.0), [1.0, 0.0, 0.0, 1.0], 1e-12));
        let e = StokesVector::create_elliptical(1.0, 0.0, 45.0);
        assert!(close(&e, [1.0, 0.0, 0.0, 1.0], 1e-12), "{:?}", e);
    }

    #[test]
    fn degree_of_polarization() {
        assert!((StokesVector::unpolarized(3.0).degree_of_polarization()).abs() < 1e-12);
        let p = StokesVector::create_partially_polarized(2.0, 30.0, 0.4);
        assert!((p.degree_of_polarization() - 0.4).abs() < 1e-12);
        assert!((p.orientation() - 30.0).abs() < 1e-9);
        assert_eq!(StokesVector::default().degree_of_polarization(), 0.0);
    }

    #[test]
    fn clamp_projects_onto_cone() {
        let bad = StokesVector::new(1.0, 2.0, 0.0, 0.0);
        assert!(!bad.is_physical());
        let fixed = bad.clamp_to_physical();
        assert!(fixed.is_physical());
        assert!((fixed.s0 - 1.5).abs() < 1e-12);
        assert!((fixed.s1 - 1.5).abs() < 1e-12);

        let negative = StokesVector::new(-1.0, 0.5, 0.0, 0.0);
        assert_eq!(negative.clamp_to_physical(), StokesVector::default());

        let good = StokesVector::create_partially_polarized(1.0, 10.0, 0.5);
        assert_eq!(good.clamp_to_physical(), good);
    }

    #[test]
    fn jones_round_trip_for_pure_states() {
        for v in [
            jones::from_angle(33.0, 2.0),
            jones::circular(false, 1.0),
            jones::circular(true, 0.5),
        ] {
            let s = StokesVector::from_jones(&v);
            let back = StokesVector::from_jones(&s.to_jones().unwrap());
            assert!(close(&back, [s.s0, s.s1, s.s2, s.s3], 1e-9), "{:?} vs {:?}", s, back);
        }
        assert!(StokesVector::unpolarized(1.0).to_jones().is_none());
    }

    #[test]
    fn six_intensity_measurement() {
        // Horizontal light of unit intensity measured with six analysers.
        let s = StokesVector::from_intensities(1.0, 0.0, 0.5, 0.5, 0.5, 0.5);
        assert!(close(&s, [1.0, 1.0, 0.0, 0.0], 1e-12), "{:?}", s);
    }

    #[test]
    fn decomposition_sums_back() {
        let s = StokesVector::create_partially_polarized(1.0, 20.0, 0.3);
        let (pol, unpol) = s.decompose();
        assert!((pol.degree_of_polarization() - 1.0).abs() < 1e-9);
        assert!(unpol.degree_of_polarization().abs() < 1e-12);
        let sum = pol + unpol;
        assert!(close(&sum, [s.s0, s.s1, s.s2, s.s3], 1e-12));
    }

    #[test]
    fn ellipse_of_circular_light() {
        let e = StokesVector::create_circular(false, 1.0).ellipse_parameters();
        assert!((e.semi_major - e.semi_minor).abs() < 1e-9);
        assert!((e.ellipticity + 45.0).abs() < 1e-9);
        assert_eq!(e.handedness, Handedness::Left);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StokesVector {
    pub s0: f64,
    pub s1: f64,
    pub s2: f64,
    pub s3: f64,
}

/// Polarization ellipse of the polarized part of a Stokes vector. Angles in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EllipseParameters {
    pub semi_major: f64,
    pub semi_minor: f64,
    pub orientation: f64,
    pub ellipticity: f64,
    pub handedness: Handedness,
}

impl Add for StokesVector {
    type Output = Self;

    /// Incoherent superposition.
    fn add(self, other: Self) -> Self {
        Self {
            s0: self.s0 + other.s0,
            s1: self.s1 + other.s1,
            s2: self.s2 + other.s2,
            s3: self.s3 + other.s3,
        }
    }
}

impl StokesVector {
    pub fn new(s0: f64, s1: f64, s2: f64, s3: f64) -> Self {
        Self { s0, s1, s2, s3 }
    }

    pub fn unpolarized(intensity: f64) -> Self {
        Self::new(intensity, 0.0, 0.0, 0.0)
    }

    pub fn create_horizontal(intensity: f64) -> Self {
        Self::new(intensity, intensity, 0.0, 0.0)
    }

    pub fn create_vertical(intensity: f64) -> Self {
        Self::new(intensity, -intensity, 0.0, 0.0)
    }

    pub fn create_diagonal(intensity: f64) -> Self {
        Self::new(intensity, 0.0, intensity, 0.0)
    }

    pub fn create_anti_diagonal(intensity: f64) -> Self {
        Self::new(intensity, 0.0, -intensity, 0.0)
    }

    pub fn create_circular(right: bool, intensity: f64) -> Self {
        let s3 = if right { intensity } else { -intensity };
        Self::new(intensity, 0.0, 0.0, s3)
    }

    /// Fully polarized elliptical light with orientation `psi` and ellipticity
    /// angle `chi`, in degrees.
    pub fn create_elliptical(intensity: f64, psi: f64, chi: f64) -> Self {
        let (two_psi, two_chi) = (2.0 * psi.to_radians(), 2.0 * chi.to_radians());
        Self::new(
            intensity,
            intensity * two_chi.cos() * two_psi.cos(),
            intensity * two_chi.cos() * two_psi.sin(),
            intensity * two_chi.sin(),
        )
    }

    /// Partially linearly polarized light at `psi` degrees with degree of polarization `dop`.
    pub fn create_partially_polarized(intensity: f64, psi: f64, dop: f64) -> Self {
        let dop = dop.clamp(0.0, 1.0);
        let two_psi = 2.0 * psi.to_radians();
        Self::new(
            intensity,
            intensity * dop * two_psi.cos(),
            intensity * dop * two_psi.sin(),
            0.0,
        )
    }

    /// Builds a Stokes vector from six analyser measurements. `S0` is the mean of
    /// the three complementary pairs.
    pub fn from_intensities(i_h: f64, i_v: f64, i_45: f64, i_m45: f64, i_r: f64, i_l: f64) -> Self {
        Self::new(
            (i_h + i_v + i_45 + i_m45 + i_r + i_l) / 3.0,
            i_h - i_v,
            i_45 - i_m45,
            i_r - i_l,
        )
    }

    pub fn from_jones(v: &JonesVector) -> Self {
        let (ex, ey) = (v[0], v[1]);
        let cross = ex * ey.conj();
        Self::new(
            ex.norm_sqr() + ey.norm_sqr(),
            ex.norm_sqr() - ey.norm_sqr(),
            2.0 * cross.re,
            2.0 * cross.im,
        )
    }

    /// Jones vector with a real `Ex`, or `None` when the light is not fully polarized.
    pub fn to_jones(&self) -> Option<JonesVector> {
        if self.s0 < config::ZERO_INTENSITY {
            return Some(JonesVector::zeros());
        }
        if self.degree_of_polarization() < config::PURE_STATE_DOP {
            return None;
        }
        let ex = ((self.s0 + self.s1) / 2.0).max(0.0).sqrt();
        let ey = ((self.s0 - self.s1) / 2.0).max(0.0).sqrt();
        let phase = if ey < 1e-15 { 0.0 } else { (-self.s3).atan2(self.s2) };
        Some(JonesVector::new(
            Complex::new(ex, 0.0),
            Complex::from_polar(ey, phase),
        ))
    }

    pub fn from_vector(v: &Vector4<f64>) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }

    pub fn to_vector(&self) -> Vector4<f64> {
        Vector4::new(self.s0, self.s1, self.s2, self.s3)
    }

    pub fn intensity(&self) -> f64 {
        self.s0
    }

    pub fn scale(&self, k: f64) -> Self {
        Self::new(self.s0 * k, self.s1 * k, self.s2 * k, self.s3 * k)
    }

    /// Intensity of the polarized part, `√(S1² + S2² + S3²)`.
    pub fn polarized_intensity(&self) -> f64 {
        (self.s1 * self.s1 + self.s2 * self.s2 + self.s3 * self.s3).sqrt()
    }

    pub fn degree_of_polarization(&self) -> f64 {
        if self.s0 < config::ZERO_INTENSITY {
            return 0.0;
        }
        (self.polarized_intensity() / self.s0).min(1.0)
    }

    pub fn degree_of_linear_polarization(&self) -> f64 {
        if self.s0 < config::ZERO_INTENSITY {
            return 0.0;
        }
        (self.s1.hypot(self.s2) / self.s0).min(1.0)
    }

    /// Orientation ψ of the polarization ellipse in degrees, in `[0, 180)`.
    pub fn orientation(&self) -> f64 {
        let scale = self.s0.abs().max(config::ZERO_INTENSITY);
        if self.s1.abs() / scale < 1e-12 && self.s2.abs() / scale < 1e-12 {
            return 0.0;
        }
        let psi = 0.5 * self.s2.atan2(self.s1).to_degrees();
        let psi = psi.rem_euclid(180.0);
        if psi >= 180.0 - 1e-9 {
            0.0
        } else {
            psi
        }
    }

    /// Ellipticity angle χ in degrees, in `[-45, 45]`. Positive for right-handed light.
    pub fn ellipticity_angle(&self) -> f64 {
        let p = self.polarized_intensity();
        if p < config::ZERO_INTENSITY {
            return 0.0;
        }
        0.5 * (self.s3 / p).clamp(-1.0, 1.0).asin().to_degrees()
    }

    /// Ellipticity angle normalised to `[-1, 1]` (χ divided by 45°).
    pub fn normalized_ellipticity(&self) -> f64 {
        self.ellipticity_angle().to_radians() / FRAC_PI_4
    }

    /// Normalised Poincaré sphere coordinates `(s1, s2, s3)`. Length equals the DoP.
    pub fn poincare(&self) -> [f64; 3] {
        if self.s0 < config::ZERO_INTENSITY {
            return [0.0; 3];
        }
        [self.s1 / self.s0, self.s2 / self.s0, self.s3 / self.s0]
    }

    /// Necessary physical constraint: `S0 ≥ 0` and `S1² + S2² + S3² ≤ S0²`.
    pub fn is_physical(&self) -> bool {
        let slack = 1e-12 * self.s0.abs().max(1.0);
        self.s0 >= -slack && self.polarized_intensity() <= self.s0 + slack
    }

    /// Euclidean projection onto the cone of physical Stokes vectors.
    pub fn clamp_to_physical(&self) -> Self {
        let p = self.polarized_intensity();
        if p <= self.s0 {
            return *self;
        }
        if p <= -self.s0 {
            return Self::default();
        }
        let s0 = 0.5 * (self.s0 + p);
        let k = s0 / p;
        Self::new(s0, self.s1 * k, self.s2 * k, self.s3 * k)
    }

    /// Splits into a fully polarized and an unpolarized part.
    pub fn decompose(&self) -> (Self, Self) {
        let p = self.polarized_intensity().min(self.s0.max(0.0));
        let polarized = if self.polarized_intensity() > 0.0 {
            let k = p / self.polarized_intensity();
            Self::new(p, self.s1 * k, self.s2 * k, self.s3 * k)
        } else {
            Self::default()
        };
        (polarized, Self::unpolarized((self.s0 - p).max(0.0)))
    }

    pub fn ellipse_parameters(&self) -> EllipseParameters {
        let amplitude = (self.degree_of_polarization() * self.s0.max(0.0)).sqrt();
        let chi = self.ellipticity_angle();
        let (sin_chi, cos_chi) = chi.to_radians().sin_cos();
        EllipseParameters {
            semi_major: amplitude * cos_chi,
            semi_minor: amplitude * sin_chi.abs(),
            orientation: self.orientation(),
            ellipticity: chi,
            handedness: Handedness::from_ellipticity(
                self.normalized_ellipticity(),
                config::LINEAR_ELLIPTICITY_THRESHOLD,
            ),
        }
    }
}
