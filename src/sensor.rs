//! Sensor matching by polarization fidelity.
//!
//! Fidelity is computed from Stokes vectors,
//! `F = (S0a·S0b + S⃗a·S⃗b) / (2·S0a·S0b)`, which equals `|⟨ψa|ψb⟩|²` for pure
//! states and stays defined for mixed ones. A sensor's angular tolerance `τ`
//! becomes the minimum fidelity `cos²τ`: two linear states `τ` apart have
//! exactly that fidelity.

use serde::{Deserialize, Serialize};

use crate::component::PolarizationSpec;
use crate::config;
use crate::jones::{self, JonesVector};
use crate::state::PolarizationState;


/// Normalised overlap `|⟨a|b⟩|² / (|a|²·|b|²)` of two Jones vectors.
pub fn jones_fidelity(a: &JonesVector, b: &JonesVector) -> f64 {
    let norm = jones::intensity(a) * jones::intensity(b);
    if norm < config::ZERO_INTENSITY {
        return 0.0;
    }
    (a.dotc(b).norm_sqr() / norm).clamp(0.0, 1.0)
}

/// Fidelity of two arbitrary states. Zero if either is dark.
pub fn fidelity(a: &PolarizationState, b: &PolarizationState) -> f64 {
    let (sa, sb) = (a.to_stokes(), b.to_stokes());
    if sa.s0 < config::ZERO_INTENSITY || sb.s0 < config::ZERO_INTENSITY {
        return 0.0;
    }
    let dot = sa.s1 * sb.s1 + sa.s2 * sb.s2 + sa.s3 * sb.s3;
    ((sa.s0 * sb.s0 + dot) / (2.0 * sa.s0 * sb.s0)).clamp(0.0, 1.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorMatch {
    pub intensity_ok: bool,
    /// `None` when the sensor has no polarization requirement.
    pub fidelity: Option<f64>,
    pub matched: bool,
}

/// Checks light arriving at a sensor against its requirement, its intensity
/// `threshold` and its angular `tolerance` in degrees.
pub fn check_sensor_match(
    state: &PolarizationState,
    required: Option<&PolarizationSpec>,
    threshold: f64,
    tolerance: f64,
) -> SensorMatch {
    let intensity_ok = state.intensity() >= threshold;
    let fidelity = required.map(|target| fidelity(state, &target.to_state(1.0)));
    let min_fidelity = tolerance.to_radians().cos().powi(2);
    let polarization_ok = fidelity.map_or(true, |f| f >= min_fidelity - 1e-12);
    SensorMatch {
        intensity_ok,
        fidelity,
        matched: intensity_ok && polarization_ok,
    }
}
