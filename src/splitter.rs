//! Beam splitting: polarizing, non-polarizing and birefringent.
//!
//! Every split returns both outputs with their own state. Ideal splitters are
//! lossless, so the two intensities add up to the input.

use serde::Serialize;

use crate::component::SplitterKind;
use crate::element::Element;
use crate::state::{PolarizationInfo, PolarizationState};


/// Projection axes of a birefringent crystal. Always orthogonal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrystalAxis {
    o_axis_angle: f64,
    e_axis_angle: f64,
}

impl CrystalAxis {
    pub fn new(o_axis_angle: f64) -> Self {
        Self {
            o_axis_angle,
            e_axis_angle: o_axis_angle + 90.0,
        }
    }

    pub fn o_axis_angle(&self) -> f64 {
        self.o_axis_angle
    }

    pub fn e_axis_angle(&self) -> f64 {
        self.e_axis_angle
    }
}

/// The two outputs of a splitter. For polarizing and non-polarizing splitters
/// the `o` side is the transmitted beam and the `e` side the reflected one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitBeamResult {
    pub o_ray: PolarizationState,
    pub e_ray: PolarizationState,
    pub o_intensity: f64,
    pub e_intensity: f64,
    pub o_polarization: PolarizationInfo,
    pub e_polarization: PolarizationInfo,
}

impl SplitBeamResult {
    fn new(o_ray: PolarizationState, e_ray: PolarizationState) -> Self {
        Self {
            o_ray,
            e_ray,
            o_intensity: o_ray.intensity(),
            e_intensity: e_ray.intensity(),
            o_polarization: PolarizationInfo::analyze(o_ray),
            e_polarization: PolarizationInfo::analyze(e_ray),
        }
    }
}

pub fn split(
    kind: SplitterKind,
    angle: f64,
    ratio: f64,
    state: &PolarizationState,
    force_mueller: bool,
) -> SplitBeamResult {
    match kind {
        SplitterKind::Pbs => split_polarizing(state, angle, force_mueller),
        SplitterKind::Npbs => split_non_polarizing(state, ratio),
        SplitterKind::Calcite => split_birefringent(state, &CrystalAxis::new(angle), force_mueller),
    }
}

/// Ordinary ray along the o axis, extraordinary ray along the e axis.
pub fn split_birefringent(
    state: &PolarizationState,
    axis: &CrystalAxis,
    force_mueller: bool,
) -> SplitBeamResult {
    let o_ray = Element::Polarizer {
        angle: axis.o_axis_angle,
    }
    .apply(state, force_mueller);
    let e_ray = Element::Polarizer {
        angle: axis.e_axis_angle,
    }
    .apply(state, force_mueller);
    SplitBeamResult::new(o_ray, e_ray)
}

/// Transmits the component along `angle`, reflects the orthogonal one.
pub fn split_polarizing(
    state: &PolarizationState,
    angle: f64,
    force_mueller: bool,
) -> SplitBeamResult {
    split_birefringent(state, &CrystalAxis::new(angle), force_mueller)
}

/// Transmits the fraction `ratio` of the intensity and reflects the rest,
/// both with the input polarization.
pub fn split_non_polarizing(state: &PolarizationState, ratio: f64) -> SplitBeamResult {
    let ratio = ratio.clamp(0.0, 1.0);
    SplitBeamResult::new(
        state.scale_intensity(ratio),
        state.scale_intensity(1.0 - ratio),
    )
}
