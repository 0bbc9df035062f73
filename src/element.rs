//! Closed set of optical elements and their operators in both formalisms.
//!
//! Each variant carries only its own parameters (angles in degrees). An element
//! maps to exactly one Mueller matrix and, when it does not depolarize, to one
//! Jones matrix; [`Element::apply`] picks the operator that matches the
//! representation of the incoming state.

use serde::{Deserialize, Serialize};

use crate::fresnel;
use crate::jones::{self, JonesMatrix};
use crate::mueller::MuellerMatrix;
use crate::state::PolarizationState;


#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Element {
    Polarizer { angle: f64 },
    /// Dichroic polarizer with intensity transmittances along and across the axis.
    PartialPolarizer { angle: f64, t_par: f64, t_perp: f64 },
    Retarder { axis: f64, retardance: f64 },
    HalfWavePlate { axis: f64 },
    QuarterWavePlate { axis: f64 },
    Rotator { angle: f64 },
    Mirror,
    Attenuator { transmittance: f64 },
    Depolarizer,
    PartialDepolarizer { amount: f64 },
    FresnelReflection { n1: f64, n2: f64, incidence: f64 },
    FresnelTransmission { n1: f64, n2: f64, incidence: f64 },
}

impl Element {
    /// Jones operator, or `None` for depolarizing elements.
    pub fn jones(&self) -> Option<JonesMatrix> {
        let m = match *self {
            Element::Polarizer { angle } => jones::polarizer_matrix(angle),
            Element::PartialPolarizer { angle, t_par, t_perp } => {
                jones::partial_polarizer_matrix(angle, t_par, t_perp)
            }
            Element::Retarder { axis, retardance } => jones::retarder_matrix(axis, retardance),
            Element::HalfWavePlate { axis } => jones::half_wave_plate_matrix(axis),
            Element::QuarterWavePlate { axis } => jones::quarter_wave_plate_matrix(axis),
            Element::Rotator { angle } => jones::rotator_matrix(angle),
            Element::Mirror => jones::mirror_matrix(),
            Element::Attenuator { transmittance } => {
                JonesMatrix::identity() * crate::complex::create(transmittance.max(0.0).sqrt(), 0.0)
            }
            Element::Depolarizer | Element::PartialDepolarizer { .. } => return None,
            Element::FresnelReflection { n1, n2, incidence } => {
                fresnel::reflection_matrix(n1, n2, incidence)
            }
            Element::FresnelTransmission { n1, n2, incidence } => {
                fresnel::energy_transmission_matrix(n1, n2, incidence)
            }
        };
        Some(m)
    }

    pub fn mueller(&self) -> MuellerMatrix {
        match *self {
            Element::Polarizer { angle } => MuellerMatrix::linear_polarizer(angle),
            Element::PartialPolarizer { angle, t_par, t_perp } => {
                MuellerMatrix::dichroic_polarizer(angle, t_par, t_perp)
            }
            Element::Retarder { axis, retardance } => {
                MuellerMatrix::general_retarder(axis, retardance)
            }
            Element::HalfWavePlate { axis } => MuellerMatrix::half_wave_plate(axis),
            Element::QuarterWavePlate { axis } => MuellerMatrix::quarter_wave_plate(axis),
            Element::Rotator { angle } => MuellerMatrix::rotator(angle),
            Element::Mirror => MuellerMatrix::mirror(),
            Element::Attenuator { transmittance } => MuellerMatrix::attenuator(transmittance),
            Element::Depolarizer => MuellerMatrix::depolarizer(),
            Element::PartialDepolarizer { amount } => MuellerMatrix::partial_depolarizer(amount),
            Element::FresnelReflection { n1, n2, incidence } => {
                fresnel::fresnel_mueller_reflect(n1, n2, incidence)
            }
            Element::FresnelTransmission { n1, n2, incidence } => {
                fresnel::fresnel_mueller_transmit(n1, n2, incidence)
                    .unwrap_or_else(|| MuellerMatrix::new(nalgebra::Matrix4::zeros()))
            }
        }
    }

    /// Applies the element. Jones states stay Jones unless the element depolarizes
    /// or `force_mueller` is set; Stokes states always go through Mueller.
    pub fn apply(&self, state: &PolarizationState, force_mueller: bool) -> PolarizationState {
        let mueller = self.mueller();
        match (self.jones(), state) {
            (Some(j), PolarizationState::Jones(_)) if !force_mueller => {
                state.transform(&j, &mueller)
            }
            _ => state.transform_mueller(&mueller),
        }
    }
}
