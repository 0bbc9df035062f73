//! Material properties: optical activity of sugar solutions and birefringent
//! retardation in calcite.

use serde::{Deserialize, Serialize};

use crate::element::Element;


pub const CALCITE_N_O: f64 = 1.658;
pub const CALCITE_N_E: f64 = 1.486;
pub const CALCITE_BIREFRINGENCE: f64 = CALCITE_N_O - CALCITE_N_E;

/// Optically active solutes with tabulated specific rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Substance {
    Sucrose,
    Fructose,
    Glucose,
    Lactose,
}

impl Substance {
    /// Specific rotation `[α]` in deg·mL/(g·dm) at the sodium D line.
    pub fn specific_rotation(&self) -> f64 {
        match self {
            Substance::Sucrose => 66.5,
            Substance::Fructose => -92.4,
            Substance::Glucose => 52.7,
            Substance::Lactose => 52.3,
        }
    }
}

/// Rotation `α = [α]·L·c` in degrees for a path of `length` dm at
/// `concentration` g/mL.
pub fn optical_rotation(substance: Substance, length: f64, concentration: f64) -> f64 {
    substance.specific_rotation() * length * concentration
}

/// The rotator equivalent to a cell of optically active solution.
pub fn optical_activity(substance: Substance, length: f64, concentration: f64) -> Element {
    Element::Rotator {
        angle: optical_rotation(substance, length, concentration),
    }
}

/// Phase retardation `Δφ = 2π·Δn·d/λ` of calcite, in degrees modulo 360.
/// `None` unless the wavelength is positive and finite.
pub fn phase_retardation(thickness_mm: f64, wavelength_nm: f64) -> Option<f64> {
    if !(wavelength_nm.is_finite() && wavelength_nm > 0.0) {
        return None;
    }
    let phase = 2.0 * std::f64::consts::PI * CALCITE_BIREFRINGENCE * (thickness_mm * 1e-3)
        / (wavelength_nm * 1e-9);
    Some(phase.to_degrees().rem_euclid(360.0))
}

/// Ordinary and extraordinary intensities for linear light at `angle` degrees
/// to the optic axis: `I·cos²θ` and `I·sin²θ`.
pub fn birefringence_intensities(angle: f64, intensity: f64) -> (f64, f64) {
    let (s, c) = angle.to_radians().sin_cos();
    (intensity * c * c, intensity * s * s)
}
