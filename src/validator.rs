//! Conservation checks over a completed trace.
//!
//! Violations are data: they are collected as messages and never abort the
//! trace. The bench runs [`validate`] once at the end of every trace.

use serde::{Deserialize, Serialize};

use crate::component::Layout;
use crate::config::Tolerances;
use crate::error::LayoutError;
use crate::powers::Powers;
use crate::result::TraceResult;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::{LightSegment, SegmentEnd};
    use crate::state::PolarizationState;
    use crate::stokes::StokesVector;

    fn balanced() -> TraceResult {
        TraceResult {
            powers: Powers {
                input: 1.0,
                sensed: 0.6,
                absorbed: 0.4,
                ..Powers::new()
            },
            ..TraceResult::default()
        }
    }

    #[test]
    fn balanced_budget_passes() {
        let report = validate(&balanced(), &Tolerances::default());
        assert!(report.is_conserved());
        assert!(report.relative < 1e-12);
    }

    #[test]
    fn unaccounted_energy_is_reported() {
        let mut result = balanced();
        result.powers.sensed = 0.5;
        let report = validate(&result, &Tolerances::default());
        assert!(!report.is_conserved());
        assert!((report.difference - 0.1).abs() < 1e-12);
        assert_eq!(report.violations.len(), 1);
    }

    #[test]
    fn non_physical_segments_are_reported() {
        let mut result = balanced();
        result.segments.push(LightSegment {
            index: 0,
            origin: "a".into(),
            end: SegmentEnd::Escaped,
            state: PolarizationState::Stokes(StokesVector::new(1.0, 2.0, 0.0, 0.0)),
            intensity: 1.0,
            depth: 0,
        });
        result.segments.push(LightSegment {
            index: 1,
            origin: "a".into(),
            end: SegmentEnd::Escaped,
            state: PolarizationState::Stokes(StokesVector::unpolarized(1.0)),
            intensity: f64::NAN,
            depth: 0,
        });
        let report = validate(&result, &Tolerances::default());
        assert_eq!(report.violations.len(), 2);
    }

    #[test]
    fn element_loss() {
        let tol = Tolerances::default();
        assert!(check_element_loss("p", 1.0, 0.5, 0.5, &tol).is_none());
        assert!(check_element_loss("w", 1.0, 1.0 + 1e-12, 0.0, &tol).is_none());
        // gain
        assert!(check_element_loss("w", 1.0, 1.1, 0.0, &tol).is_some());
        // unaccounted loss
        assert!(check_element_loss("w", 1.0, 0.5, 0.0, &tol).is_some());
        assert!(check_element_loss("p", 1.0, 0.25, 0.5, &tol).is_some());
        assert!(check_element_loss("dark", 0.0, 0.0, 0.0, &tol).is_none());
    }
}

/// Energy balance of one trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConservationReport {
    pub input: f64,
    pub output: f64,
    /// `input - output`.
    pub difference: f64,
    /// `|difference| / input`, zero for a dark bench.
    pub relative: f64,
    pub violations: Vec<String>,
}

impl ConservationReport {
    pub fn from_powers(powers: &Powers, tolerances: &Tolerances) -> Self {
        let relative = powers.relative_missing();
        let mut violations = Vec::new();
        if relative > tolerances.conservation {
            violations.push(format!(
                "energy not conserved: input {:.9e}, output {:.9e}, relative difference {:.3e}",
                powers.input,
                powers.output(),
                relative
            ));
        }
        Self {
            input: powers.input,
            output: powers.output(),
            difference: powers.missing(),
            relative,
            violations,
        }
    }

    pub fn is_conserved(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Checks the energy budget and every segment of a trace.
pub fn validate(result: &TraceResult, tolerances: &Tolerances) -> ConservationReport {
    let mut report = ConservationReport::from_powers(&result.powers, tolerances);
    for segment in &result.segments {
        if !segment.intensity.is_finite() || segment.intensity < 0.0 {
            report.violations.push(format!(
                "segment {} from `{}` has intensity {}",
                segment.index, segment.origin, segment.intensity
            ));
        } else if !segment.state.to_stokes().is_physical() {
            report.violations.push(format!(
                "segment {} from `{}` carries a non-physical Stokes vector",
                segment.index, segment.origin
            ));
        }
    }
    report
}

/// Returns a message when the light a component removed differs from the
/// loss its configuration accounts for. A gain counts as a negative loss.
pub fn check_element_loss(
    id: &str,
    incoming: f64,
    outgoing: f64,
    expected_loss: f64,
    tolerances: &Tolerances,
) -> Option<String> {
    let measured = incoming - outgoing;
    let mismatch = (measured - expected_loss).abs() / incoming.max(tolerances.zero_intensity);
    (mismatch > tolerances.conservation).then(|| {
        format!(
            "component `{}` lost {:.6e} of {:.6e} incoming, configured for {:.6e}",
            id, measured, incoming, expected_loss
        )
    })
}

/// Largest sensor intensity difference between the Jones and the forced Mueller trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineAgreement {
    pub max_difference: f64,
    pub worst_sensor: Option<String>,
    pub agrees: bool,
}

/// Traces the layout twice, once on the mixed Jones/Mueller path and once
/// forced through Mueller, and compares sensor intensities relative to the input.
pub fn cross_validate(
    layout: &Layout,
    tolerances: &Tolerances,
) -> Result<EngineAgreement, LayoutError> {
    let mixed = Tolerances {
        force_mueller: false,
        ..*tolerances
    };
    let forced = Tolerances {
        force_mueller: true,
        ..*tolerances
    };
    let a = crate::bench::trace(layout, &mixed)?;
    let b = crate::bench::trace(layout, &forced)?;
    let scale = a.powers.input.max(tolerances.zero_intensity);

    let (worst_sensor, max_difference) = a
        .sensors
        .iter()
        .filter_map(|(id, reading)| {
            b.sensors
                .get(id)
                .map(|other| (id.clone(), (reading.intensity - other.intensity).abs() / scale))
        })
        .fold((None, 0.0_f64), |(worst, max), (id, diff)| {
            if diff > max {
                (Some(id), diff)
            } else {
                (worst, max)
            }
        });

    Ok(EngineAgreement {
        max_difference,
        worst_sensor,
        agrees: max_difference <= tolerances.cross_engine,
    })
}
