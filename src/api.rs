//! Function-level API for collaborators: create a source, push it through
//! elements, read it back as Stokes or Jones. Angles are in degrees.

use crate::config::Tolerances;
use crate::element::Element;
use crate::jones::{self, JonesVector};
use crate::state::{PolarizationInfo, PolarizationState};
use crate::stokes::StokesVector;

pub use crate::analyzer::calculate_malus_law;


pub fn create_linear_source(angle: f64, intensity: f64) -> PolarizationInfo {
    PolarizationInfo::from_jones(jones::from_angle(angle, intensity))
}

pub fn create_circular_source(is_right: bool, intensity: f64) -> PolarizationInfo {
    PolarizationInfo::from_jones(jones::circular(is_right, intensity))
}

pub fn create_unpolarized_source(intensity: f64) -> PolarizationInfo {
    PolarizationInfo::from_stokes(StokesVector::unpolarized(intensity.max(0.0)))
}

/// Applies any element; a Stokes result that has become pure is returned in Jones form.
pub fn apply_element(state: &PolarizationInfo, element: &Element) -> PolarizationInfo {
    let tolerances = Tolerances::default();
    let out = element.apply(state.state(), false).purify(&tolerances);
    PolarizationInfo::analyze_with(out, &tolerances)
}

pub fn apply_polarizer(state: &PolarizationInfo, axis_angle: f64) -> PolarizationInfo {
    apply_element(state, &Element::Polarizer { angle: axis_angle })
}

pub fn apply_wave_plate(
    state: &PolarizationInfo,
    retardance: f64,
    fast_axis: f64,
) -> PolarizationInfo {
    apply_element(
        state,
        &Element::Retarder {
            axis: fast_axis,
            retardance,
        },
    )
}

pub fn apply_rotator(state: &PolarizationInfo, angle: f64) -> PolarizationInfo {
    apply_element(state, &Element::Rotator { angle })
}

pub fn to_stokes(state: &PolarizationInfo) -> StokesVector {
    state.state().to_stokes().clamp_to_physical()
}

/// `None` when the state is not fully polarized.
pub fn to_jones(state: &PolarizationInfo) -> Option<JonesVector> {
    match state.state() {
        PolarizationState::Jones(v) => Some(*v),
        PolarizationState::Stokes(s) => s.to_jones(),
    }
}
