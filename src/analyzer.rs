//! Malus's law and rotating-analyser measurements.

use ndarray::{s, Array1};
use serde::{Deserialize, Serialize};

use crate::config;
use crate::element::Element;
use crate::state::PolarizationState;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jones;
    use crate::stokes::StokesVector;

    #[test]
    fn malus_law_reference_angles() {
        let i0 = 3.0;
        let cases = [(0.0, 1.0), (30.0, 0.75), (45.0, 0.5), (60.0, 0.25), (90.0, 0.0)];
        for (angle, fraction) in cases {
            let i = calculate_malus_law(i0, angle);
            assert!((i - i0 * fraction).abs() <= 1e-5 * i0, "angle {}: {}", angle, i);
        }
        assert!((polarization_efficiency(0.75, 1.0) - 75.0).abs() < 1e-12);
        assert_eq!(polarization_efficiency(1.0, 0.0), 0.0);
    }

    #[test]
    fn sweep_of_linear_light() {
        let state = PolarizationState::Jones(jones::from_angle(30.0, 1.0));
        let sweep = analyzer_sweep(&state, 0.0, 180.0, 181);
        assert_eq!(sweep.angles.len(), 181);
        let (angle_max, max) = sweep.maximum();
        assert!((angle_max - 30.0).abs() < 1e-9 && (max - 1.0).abs() < 1e-12);
        assert!(sweep.extinction_ratio().is_infinite());
        assert!((sweep.mean() - 0.5).abs() < 1e-4, "mean: {}", sweep.mean());
    }

    #[test]
    fn sweep_of_partial_light_has_finite_ratio() {
        let state = PolarizationState::Stokes(StokesVector::create_partially_polarized(
            1.0, 0.0, 0.8,
        ));
        let sweep = analyzer_sweep(&state, 0.0, 180.0, 181);
        // Maximum 0.9, minimum 0.1.
        assert!((sweep.extinction_ratio() - 9.0).abs() < 1e-9);
    }

    #[test]
    fn extinction_ratio_snaps_rounding_noise() {
        assert!(extinction_ratio(&[1.0, 1e-33]).is_infinite());
        assert!((extinction_ratio(&[2.0, 0.5]) - 4.0).abs() < 1e-12);
        assert_eq!(extinction_ratio(&[0.0, 0.0]), 1.0);
        assert_eq!(extinction_ratio(&[]), 1.0);
    }
}

/// Malus's law, `I0·cos²θ` with `θ` in degrees.
pub fn calculate_malus_law(i0: f64, angle: f64) -> f64 {
    i0 * angle.to_radians().cos().powi(2)
}

/// Transmitted fraction in percent.
pub fn polarization_efficiency(transmitted: f64, incident: f64) -> f64 {
    if incident < config::ZERO_INTENSITY {
        return 0.0;
    }
    transmitted / incident * 100.0
}

/// `max / min` of the given intensities. Values below `ZERO_INTENSITY` count as
/// exactly zero; a zero minimum gives `f64::INFINITY`. All-dark input gives 1.
pub fn extinction_ratio(intensities: &[f64]) -> f64 {
    let snapped = intensities
        .iter()
        .map(|&i| if i < config::ZERO_INTENSITY { 0.0 } else { i });
    let (min, max) = snapped.fold((f64::INFINITY, 0.0f64), |(lo, hi), i| (lo.min(i), hi.max(i)));
    if max == 0.0 {
        return 1.0;
    }
    if min == 0.0 {
        return f64::INFINITY;
    }
    max / min
}

/// Intensity transmitted by an ideal analyser at each angle of a sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerSweep {
    pub angles: Vec<f64>,
    pub intensities: Vec<f64>,
}

/// Rotates an ideal analyser from `start` to `stop` degrees in `steps` points.
pub fn analyzer_sweep(
    state: &PolarizationState,
    start: f64,
    stop: f64,
    steps: usize,
) -> AnalyzerSweep {
    let angles = Array1::linspace(start, stop, steps);
    let intensities = angles
        .iter()
        .map(|&angle| Element::Polarizer { angle }.apply(state, false).intensity())
        .collect();
    AnalyzerSweep {
        angles: angles.to_vec(),
        intensities,
    }
}

impl AnalyzerSweep {
    /// Angle and intensity of the brightest sample.
    pub fn maximum(&self) -> (f64, f64) {
        self.angles
            .iter()
            .zip(&self.intensities)
            .fold((0.0, f64::NEG_INFINITY), |best, (&a, &i)| {
                if i > best.1 {
                    (a, i)
                } else {
                    best
                }
            })
    }

    pub fn extinction_ratio(&self) -> f64 {
        extinction_ratio(&self.intensities)
    }

    /// Angle-averaged transmitted intensity, by the trapezoidal rule.
    pub fn mean(&self) -> f64 {
        if self.angles.len() < 2 {
            return self.intensities.first().copied().unwrap_or(0.0);
        }
        let x = Array1::from(self.angles.clone());
        let y = Array1::from(self.intensities.clone());
        let span = x[x.len() - 1] - x[0];
        if span.abs() < f64::EPSILON {
            return y.mean().unwrap_or(0.0);
        }
        integrate_trapezoidal(&x, &y) / span
    }
}

fn integrate_trapezoidal(x: &Array1<f64>, y: &Array1<f64>) -> f64 {
    let dx = &x.slice(s![1..]) - &x.slice(s![..-1]);
    let avg_y = (&y.slice(s![1..]) + &y.slice(s![..-1])) / 2.0;
    (dx * avg_y).sum()
}
