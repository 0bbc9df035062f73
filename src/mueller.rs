//! Mueller calculus: real 4x4 operators acting on Stokes vectors.
//!
//! Mueller matrices generalise Jones matrices to depolarizing and non-ideal
//! elements. Every closed-form factory here agrees exactly with
//! [`MuellerMatrix::from_jones_elements`] applied to the matching factory in
//! [`crate::jones`], so both formalisms share one sign convention.
//!
//! Composition follows light-travel order: [`chain_mueller`] takes the
//! elements in the order light meets them and returns `Mn × … × M1`.

use nalgebra::Matrix4;
use serde::{Deserialize, Serialize};

use crate::complex::Complex;
use crate::jones::JonesMatrix;
use crate::stokes::StokesVector;


/// A 4x4 real Mueller matrix. Serialised as 16 reals in row-major order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 16]", into = "[f64; 16]")]
pub struct MuellerMatrix(Matrix4<f64>);

impl From<[f64; 16]> for MuellerMatrix {
    fn from(values: [f64; 16]) -> Self {
        MuellerMatrix(Matrix4::from_row_slice(&values))
    }
}

impl From<MuellerMatrix> for [f64; 16] {
    fn from(m: MuellerMatrix) -> Self {
        m.into_array()
    }
}

impl From<Matrix4<f64>> for MuellerMatrix {
    fn from(m: Matrix4<f64>) -> Self {
        MuellerMatrix(m)
    }
}

/// Composes elements given in light-travel order: returns `Mn × … × M1`.
pub fn chain_mueller(elements: &[MuellerMatrix]) -> MuellerMatrix {
    elements
        .iter()
        .fold(MuellerMatrix::identity(), |total, m| m.multiply(&total))
}

/// `cos 2θ` and `sin 2θ` for an angle in degrees.
fn double_angle(theta: f64) -> (f64, f64) {
    let (s, c) = (2.0 * theta.to_radians()).sin_cos();
    (c, s)
}

impl MuellerMatrix {
    pub fn new(m: Matrix4<f64>) -> Self {
        MuellerMatrix(m)
    }

    pub fn matrix(&self) -> &Matrix4<f64> {
        &self.0
    }

    /// Element at row `i`, column `j`.
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.0[(i, j)]
    }

    pub fn into_array(self) -> [f64; 16] {
        let mut out = [0.0; 16];
        for (k, value) in out.iter_mut().enumerate() {
            *value = self.0[(k / 4, k % 4)];
        }
        out
    }

    pub fn identity() -> Self {
        MuellerMatrix(Matrix4::identity())
    }

    /// Ideal linear polarizer with its transmission axis at `theta` degrees.
    pub fn linear_polarizer(theta: f64) -> Self {
        let (c, s) = double_angle(theta);
        MuellerMatrix(
            Matrix4::new(
                1.0, c, s, 0.0, //
                c, c * c, c * s, 0.0, //
                s, c * s, s * s, 0.0, //
                0.0, 0.0, 0.0, 0.0,
            ) * 0.5,
        )
    }

    /// Linear retarder with fast axis at `theta` and retardance `delta`, both in degrees.
    pub fn general_retarder(theta: f64, delta: f64) -> Self {
        let (c, s) = double_angle(theta);
        let (sd, cd) = delta.to_radians().sin_cos();
        MuellerMatrix(Matrix4::new(
            1.0, 0.0, 0.0, 0.0, //
            0.0, c * c + s * s * cd, c * s * (1.0 - cd), -s * sd, //
            0.0, c * s * (1.0 - cd), s * s + c * c * cd, c * sd, //
            0.0, s * sd, -c * sd, cd,
        ))
    }

    pub fn quarter_wave_plate(theta: f64) -> Self {
        Self::general_retarder(theta, 90.0)
    }

    pub fn half_wave_plate(theta: f64) -> Self {
        Self::general_retarder(theta, 180.0)
    }

    /// Rotates the plane of polarization counter-clockwise by `theta` degrees.
    pub fn rotator(theta: f64) -> Self {
        let (c, s) = double_angle(theta);
        MuellerMatrix(Matrix4::new(
            1.0, 0.0, 0.0, 0.0, //
            0.0, c, -s, 0.0, //
            0.0, s, c, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ))
    }

    /// Ideal depolarizer: keeps the intensity, removes all polarization.
    pub fn depolarizer() -> Self {
        MuellerMatrix(Matrix4::from_diagonal(&nalgebra::Vector4::new(
            1.0, 0.0, 0.0, 0.0,
        )))
    }

    /// Depolarizer removing the fraction `amount` (clamped to `[0, 1]`) of the polarized part.
    pub fn partial_depolarizer(amount: f64) -> Self {
        let keep = 1.0 - amount.clamp(0.0, 1.0);
        MuellerMatrix(Matrix4::from_diagonal(&nalgebra::Vector4::new(
            1.0, keep, keep, keep,
        )))
    }

    /// Mirror at normal incidence. Reverses handedness.
    pub fn mirror() -> Self {
        MuellerMatrix(Matrix4::from_diagonal(&nalgebra::Vector4::new(
            1.0, 1.0, -1.0, -1.0,
        )))
    }

    /// Neutral density filter with intensity transmittance `t`.
    pub fn attenuator(t: f64) -> Self {
        MuellerMatrix(Matrix4::identity() * t.max(0.0))
    }

    /// Dichroic linear polarizer. `px` and `py` are the intensity transmittances
    /// along and across the axis at `theta` degrees.
    pub fn dichroic_polarizer(theta: f64, px: f64, py: f64) -> Self {
        let (px, py) = (px.max(0.0), py.max(0.0));
        let (c, s) = double_angle(theta);
        let sum = px + py;
        let diff = px - py;
        let root = (px * py).sqrt();
        MuellerMatrix(
            Matrix4::new(
                sum,
                diff * c,
                diff * s,
                0.0,
                diff * c,
                sum * c * c + 2.0 * root * s * s,
                (sum - 2.0 * root) * c * s,
                0.0,
                diff * s,
                (sum - 2.0 * root) * c * s,
                sum * s * s + 2.0 * root * c * c,
                0.0,
                0.0,
                0.0,
                0.0,
                2.0 * root,
            ) * 0.5,
        )
    }

    /// Partial polarizer given by its mean transmittance and its diattenuation
    /// `D = (px - py) / (px + py)`.
    pub fn partial_polarizer(theta: f64, transmittance: f64, diattenuation: f64) -> Self {
        let d = diattenuation.clamp(0.0, 1.0);
        let t = transmittance.max(0.0);
        Self::dichroic_polarizer(theta, t * (1.0 + d), t * (1.0 - d))
    }

    /// Frame rotation `R(θ)` acting on Stokes vectors.
    pub fn rotation(theta: f64) -> Self {
        Self::rotator(-theta)
    }

    /// The same element physically rotated by `theta` degrees: `R(-θ)·M·R(θ)`.
    pub fn rotate(&self, theta: f64) -> Self {
        Self::rotation(-theta)
            .multiply(self)
            .multiply(&Self::rotation(theta))
    }

    /// Standard 4x4 product `self × other`: `other` acts first.
    pub fn multiply(&self, other: &MuellerMatrix) -> Self {
        MuellerMatrix(self.0 * other.0)
    }

    pub fn apply_to_stokes(&self, s: &StokesVector) -> StokesVector {
        StokesVector::from_vector(&(self.0 * s.to_vector()))
    }

    /// Necessary realizability check: `M00 ≥ 0` and `|Mij| ≤ M00`.
    pub fn is_physical(&self) -> bool {
        let m00 = self.0[(0, 0)];
        let slack = 1e-12 * m00.abs().max(1.0);
        m00 >= -slack && self.0.iter().all(|v| v.abs() <= m00 + slack)
    }

    /// `Δ = 1 - √(tr(MᵀM) - M00²) / (√3·M00)`, clamped to `[0, 1]`.
    /// Zero for non-depolarizing elements, one for an ideal depolarizer.
    pub fn depolarization_index(&self) -> f64 {
        let m00 = self.0[(0, 0)];
        if m00 <= 0.0 {
            return 1.0;
        }
        let sum_sq = self.0.iter().map(|v| v * v).sum::<f64>();
        let numerator = (sum_sq - m00 * m00).max(0.0).sqrt();
        (1.0 - numerator / (3f64.sqrt() * m00)).clamp(0.0, 1.0)
    }

    pub fn diattenuation(&self) -> f64 {
        let m00 = self.0[(0, 0)];
        if m00 <= 0.0 {
            return 0.0;
        }
        let row = self.0.fixed_view::<1, 3>(0, 1).norm();
        (row / m00).min(1.0)
    }

    pub fn polarizance(&self) -> f64 {
        let m00 = self.0[(0, 0)];
        if m00 <= 0.0 {
            return 0.0;
        }
        let column = self.0.fixed_view::<3, 1>(1, 0).norm();
        (column / m00).min(1.0)
    }

    /// Exact Mueller equivalent of a Jones matrix, `M_ij = ½ tr(σ_i J σ_j J†)`.
    pub fn from_jones_elements(j: &JonesMatrix) -> Self {
        let sigma = pauli();
        let adjoint = j.adjoint();
        let mut m = Matrix4::zeros();
        for (i, si) in sigma.iter().enumerate() {
            for (k, sk) in sigma.iter().enumerate() {
                m[(i, k)] = 0.5 * (si * j * sk * adjoint).trace().re;
            }
        }
        MuellerMatrix(m)
    }
}

/// Pauli basis ordered to match `[S0, S1, S2, S3]` with `S3 = 2·Im(Ex·Ey*)`.
fn pauli() -> [JonesMatrix; 4] {
    let zero = Complex::new(0.0, 0.0);
    let one = Complex::new(1.0, 0.0);
    let i = Complex::new(0.0, 1.0);
    [
        JonesMatrix::new(one, zero, zero, one),
        JonesMatrix::new(one, zero, zero, -one),
        JonesMatrix::new(zero, one, one, zero),
        JonesMatrix::new(zero, i, -i, zero),
    ]
}
