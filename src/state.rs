//! Polarization state as a tagged union over the two formalisms, and its analysis.
//!
//! A pure state travels as a Jones vector; anything that Jones cannot express
//! (unpolarized or partially polarized light) travels as a Stokes vector.
//! Conversions between the variants are explicit and total, except that a
//! partially polarized state has no Jones form.
//!
//! Every classification goes through the Stokes parameters of the state, so
//! that the legacy and the unified call sites agree on angle, ellipticity and
//! type by construction.

use serde::{Deserialize, Serialize};

use crate::config::Tolerances;
use crate::jones::{self, JonesMatrix, JonesVector};
use crate::mueller::MuellerMatrix;
use crate::stokes::StokesVector;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_canonical_states() {
        let linear = PolarizationInfo::from_jones(jones::from_angle(30.0, 1.0));
        assert_eq!(linear.kind(), PolarizationKind::Linear);
        assert_eq!(linear.handedness(), Handedness::Linear);
        assert!((linear.angle() - 30.0).abs() < 1e-9);

        let right = PolarizationInfo::from_jones(jones::circular(true, 1.0));
        assert_eq!(right.kind(), PolarizationKind::Circular);
        assert_eq!(right.handedness(), Handedness::Right);

        let left = PolarizationInfo::from_stokes(StokesVector::create_circular(false, 1.0));
        assert_eq!(left.handedness(), Handedness::Left);

        let elliptical =
            PolarizationInfo::from_stokes(StokesVector::create_elliptical(1.0, 10.0, 20.0));
        assert_eq!(elliptical.kind(), PolarizationKind::Elliptical);
    }

    #[test]
    fn unpolarized_is_classified_without_nan() {
        let info = PolarizationInfo::from_stokes(StokesVector::unpolarized(1.0));
        assert_eq!(info.kind(), PolarizationKind::Unpolarized);
        assert!(info.angle().is_finite());
        assert!(info.ellipticity().is_finite());
        assert_eq!(info.degree_of_polarization(), 0.0);
    }

    #[test]
    fn zero_intensity_threshold_is_injected() {
        let faint = PolarizationState::Jones(jones::from_angle(0.0, 1e-12));
        let default = PolarizationInfo::analyze_with(faint, &Tolerances::default());
        assert_eq!(default.kind(), PolarizationKind::Linear);
        let coarse = Tolerances {
            zero_intensity: 1e-6,
            ..Tolerances::default()
        };
        let dark = PolarizationInfo::analyze_with(faint, &coarse);
        assert_eq!(dark.kind(), PolarizationKind::Unpolarized);
    }

    #[test]
    fn jones_and_stokes_variants_agree() {
        let v = jones::from_angle(63.0, 0.7);
        let a = PolarizationState::Jones(v);
        let b = PolarizationState::Stokes(StokesVector::from_jones(&v));
        let m = jones::quarter_wave_plate_matrix(12.0);
        let mueller = MuellerMatrix::from_jones_elements(&m);
        let a = a.transform(&m, &mueller);
        let b = b.transform(&m, &mueller);
        let (sa, sb) = (a.to_stokes(), b.to_stokes());
        assert!((sa.to_vector() - sb.to_vector()).norm() < 1e-12);
        assert!(matches!(a, PolarizationState::Jones(_)));
        assert!(matches!(b, PolarizationState::Stokes(_)));
    }

    #[test]
    fn purify_converts_only_pure_stokes() {
        let pure = PolarizationState::Stokes(StokesVector::create_diagonal(1.0));
        assert!(matches!(pure.purify(&Tolerances::default()), PolarizationState::Jones(_)));
        let mixed = PolarizationState::Stokes(StokesVector::unpolarized(1.0));
        assert!(matches!(mixed.purify(&Tolerances::default()), PolarizationState::Stokes(_)));
    }
}

/// Handedness of the polarization ellipse. Right-handed light has `S3 > 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Handedness {
    Right,
    Left,
    Linear,
}

impl Handedness {
    pub fn from_ellipticity(ellipticity: f64, linear_threshold: f64) -> Self {
        if ellipticity.abs() < linear_threshold {
            Handedness::Linear
        } else if ellipticity > 0.0 {
            Handedness::Right
        } else {
            Handedness::Left
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolarizationKind {
    Linear,
    Circular,
    Elliptical,
    Unpolarized,
}

/// The light carried along a trace, in whichever formalism can represent it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolarizationState {
    Jones(JonesVector),
    Stokes(StokesVector),
}

impl PolarizationState {
    pub fn intensity(&self) -> f64 {
        match self {
            PolarizationState::Jones(v) => jones::intensity(v),
            PolarizationState::Stokes(s) => s.s0.max(0.0),
        }
    }

    pub fn to_stokes(&self) -> StokesVector {
        match self {
            PolarizationState::Jones(v) => StokesVector::from_jones(v),
            PolarizationState::Stokes(s) => *s,
        }
    }

    pub fn to_jones(&self) -> Option<JonesVector> {
        match self {
            PolarizationState::Jones(v) => Some(*v),
            PolarizationState::Stokes(s) => s.to_jones(),
        }
    }

    pub fn is_jones(&self) -> bool {
        matches!(self, PolarizationState::Jones(_))
    }

    /// Forces the Stokes representation.
    pub fn into_stokes(self) -> Self {
        PolarizationState::Stokes(self.to_stokes())
    }

    /// Returns a Jones state when a Stokes state is pure within `tolerances`.
    pub fn purify(self, tolerances: &Tolerances) -> Self {
        match self {
            PolarizationState::Stokes(s)
                if s.degree_of_polarization() >= tolerances.pure_state_dop =>
            {
                s.to_jones().map_or(self, PolarizationState::Jones)
            }
            _ => self,
        }
    }

    /// Applies an element: the Jones operator to a Jones state, the Mueller operator
    /// to a Stokes state. The two operators must describe the same element.
    pub fn transform(&self, jones: &JonesMatrix, mueller: &MuellerMatrix) -> Self {
        match self {
            PolarizationState::Jones(v) => {
                PolarizationState::Jones(jones::apply_jones_matrix(jones, v))
            }
            PolarizationState::Stokes(s) => {
                PolarizationState::Stokes(mueller.apply_to_stokes(s).clamp_to_physical())
            }
        }
    }

    /// Applies a Mueller-only operator, such as a depolarizer.
    pub fn transform_mueller(&self, mueller: &MuellerMatrix) -> Self {
        PolarizationState::Stokes(mueller.apply_to_stokes(&self.to_stokes()).clamp_to_physical())
    }

    pub fn scale_intensity(&self, factor: f64) -> Self {
        let factor = factor.max(0.0);
        match self {
            PolarizationState::Jones(v) => {
                PolarizationState::Jones(v * crate::complex::create(factor.sqrt(), 0.0))
            }
            PolarizationState::Stokes(s) => PolarizationState::Stokes(s.scale(factor)),
        }
    }
}

/// Analysed view of a polarization state: orientation, intensity, ellipticity,
/// handedness and type. Produced by analysis, never assembled field by field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PolarizationInfo {
    state: PolarizationState,
    angle: f64,
    intensity: f64,
    ellipticity: f64,
    handedness: Handedness,
    #[serde(rename = "type")]
    kind: PolarizationKind,
    degree_of_polarization: f64,
}

impl PolarizationInfo {
    pub fn from_jones(v: JonesVector) -> Self {
        Self::analyze(PolarizationState::Jones(v))
    }

    pub fn from_stokes(s: StokesVector) -> Self {
        Self::analyze(PolarizationState::Stokes(s))
    }

    pub fn analyze(state: PolarizationState) -> Self {
        Self::analyze_with(state, &Tolerances::default())
    }

    pub fn analyze_with(state: PolarizationState, tolerances: &Tolerances) -> Self {
        let stokes = state.to_stokes();
        let dop = stokes.degree_of_polarization();
        let ellipticity = stokes.normalized_ellipticity();
        let handedness = Handedness::from_ellipticity(ellipticity, tolerances.linear_threshold);
        let kind = if stokes.s0 < tolerances.zero_intensity || dop < tolerances.linear_threshold {
            PolarizationKind::Unpolarized
        } else if ellipticity.abs() < tolerances.linear_threshold {
            PolarizationKind::Linear
        } else if ellipticity.abs() > tolerances.circular_threshold {
            PolarizationKind::Circular
        } else {
            PolarizationKind::Elliptical
        };
        Self {
            state,
            angle: stokes.orientation(),
            intensity: state.intensity(),
            ellipticity,
            handedness,
            kind,
            degree_of_polarization: dop,
        }
    }

    pub fn state(&self) -> &PolarizationState {
        &self.state
    }

    /// Orientation of the polarization ellipse in degrees, `[0, 180)`.
    pub fn angle(&self) -> f64 {
        self.angle
    }

    pub fn intensity(&self) -> f64 {
        self.intensity
    }

    /// Ellipticity angle normalised to `[-1, 1]`; positive for right-handed light.
    pub fn ellipticity(&self) -> f64 {
        self.ellipticity
    }

    pub fn handedness(&self) -> Handedness {
        self.handedness
    }

    pub fn kind(&self) -> PolarizationKind {
        self.kind
    }

    pub fn degree_of_polarization(&self) -> f64 {
        self.degree_of_polarization
    }

    pub fn is_linear(&self) -> bool {
        self.kind == PolarizationKind::Linear
    }

    pub fn is_circular(&self) -> bool {
        self.kind == PolarizationKind::Circular
    }
}
