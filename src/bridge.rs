//! Conversions between the legacy tuple-Jones representation and the unified
//! state, and the cross-engine check that keeps the two formalisms honest.
//!
//! Legacy vectors are plain `[{re, im}, {re, im}]` pairs as older call sites
//! and stored data carry them. Going from legacy to unified is exact. Going back
//! is exact for pure states; a partially polarized or unpolarized state keeps
//! the direction of its polarized part (horizontal when there is none) and its
//! full intensity, which is the closest a Jones pair can get.

use serde::{Deserialize, Serialize};

use crate::complex::Complex;
use crate::config::{self, Tolerances};
use crate::element::Element;
use crate::jones::{self, JonesVector};
use crate::state::{PolarizationInfo, PolarizationState};
use crate::stokes::StokesVector;


#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LegacyComplex {
    pub re: f64,
    pub im: f64,
}

pub type LegacyJonesVector = [LegacyComplex; 2];

impl From<Complex> for LegacyComplex {
    fn from(c: Complex) -> Self {
        LegacyComplex { re: c.re, im: c.im }
    }
}

impl From<LegacyComplex> for Complex {
    fn from(c: LegacyComplex) -> Self {
        Complex::new(c.re, c.im)
    }
}

pub fn legacy_to_jones(v: &LegacyJonesVector) -> JonesVector {
    JonesVector::new(v[0].into(), v[1].into())
}

pub fn jones_to_legacy(v: &JonesVector) -> LegacyJonesVector {
    [v[0].into(), v[1].into()]
}

pub fn legacy_to_unified(v: &LegacyJonesVector) -> PolarizationState {
    PolarizationState::Jones(legacy_to_jones(v))
}

/// Exact for pure states, approximate otherwise (see module docs).
pub fn unified_to_legacy(state: &PolarizationState) -> LegacyJonesVector {
    if let Some(v) = state.to_jones() {
        return jones_to_legacy(&v);
    }
    let stokes = state.to_stokes();
    let (polarized, _) = stokes.decompose();
    let direction = polarized
        .to_jones()
        .map(|v| jones::normalize(&v))
        .filter(|v| jones::intensity(v) > 0.0)
        .unwrap_or_else(|| jones::from_angle(0.0, 1.0));
    let amplitude = Complex::new(stokes.s0.max(0.0).sqrt(), 0.0);
    jones_to_legacy(&(direction * amplitude))
}

pub fn legacy_from_angle(angle: f64, intensity: f64) -> LegacyJonesVector {
    jones_to_legacy(&jones::from_angle(angle, intensity))
}

/// Orientation in degrees, analysed through the shared Stokes classification.
pub fn legacy_angle(v: &LegacyJonesVector) -> f64 {
    legacy_analysis(v).angle()
}

pub fn legacy_intensity(v: &LegacyJonesVector) -> f64 {
    jones::intensity(&legacy_to_jones(v))
}

pub fn legacy_analysis(v: &LegacyJonesVector) -> PolarizationInfo {
    PolarizationInfo::analyze(legacy_to_unified(v))
}

/// Legacy-style element application. Depolarizing elements are evaluated with
/// Mueller and converted back with [`unified_to_legacy`].
pub fn legacy_apply(v: &LegacyJonesVector, element: &Element) -> LegacyJonesVector {
    let out = element.apply(&legacy_to_unified(v), false);
    let out = out.purify(&Tolerances::default());
    unified_to_legacy(&out)
}

/// Jones-path and Mueller-path results for one element acting on one state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CrossCheck {
    pub jones: StokesVector,
    pub mueller: StokesVector,
    /// `|I_jones − I_mueller| / max(I_jones, I_mueller)`.
    pub intensity_error: f64,
    /// Euclidean distance of the two Stokes vectors over the larger `S0`.
    pub stokes_error: f64,
}

impl CrossCheck {
    pub fn agrees(&self, tolerance: f64) -> bool {
        self.intensity_error <= tolerance && self.stokes_error <= tolerance
    }
}

/// Runs `element` on a legacy vector once with Jones and once with Stokes/Mueller.
pub fn cross_check(v: &LegacyJonesVector, element: &Element) -> CrossCheck {
    let state = legacy_to_unified(v);
    let jones = element.apply(&state, false).to_stokes();
    let mueller = element.apply(&state.into_stokes(), true).to_stokes();
    let scale = jones.s0.max(mueller.s0).max(config::ZERO_INTENSITY);
    CrossCheck {
        jones,
        mueller,
        intensity_error: (jones.s0 - mueller.s0).abs() / scale,
        stokes_error: (jones.to_vector() - mueller.to_vector()).norm() / scale,
    }
}
