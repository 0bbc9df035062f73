//! Numerical constants and tolerances shared by every part of the engine.
//!
//! Every threshold that decides a classification, a cut-off or a guarded
//! division lives here, so that the Jones path, the Stokes/Mueller path and the
//! bench tracer agree on the same numbers. The bench receives its values through
//! a [`Tolerances`] instance at construction; the free analysis functions use
//! [`Tolerances::default`], which is built from the constants below. The
//! Fresnel guard is a fixed property of the solver and is not injectable.

use serde::{Deserialize, Serialize};

/// Intensities below this are treated as extinguished light (zero vector).
pub const ZERO_INTENSITY: f64 = 1e-30;
/// Smallest Fresnel denominator that is divided by. Below this the limiting value is used.
pub const FRESNEL_EPSILON: f64 = 1e-12;
/// Normalised ellipticity below which a state is classified as linear.
pub const LINEAR_ELLIPTICITY_THRESHOLD: f64 = 0.05;
/// Normalised ellipticity above which a state is classified as circular.
pub const CIRCULAR_ELLIPTICITY_THRESHOLD: f64 = 0.95;
/// Degree of polarization above which a Stokes state is representable as a Jones vector.
pub const PURE_STATE_DOP: f64 = 1.0 - 1e-9;
/// Minimum intensity for a traced ray to keep propagating.
pub const MIN_TRACE_INTENSITY: f64 = 1e-9;
/// Maximum number of elements a ray may traverse before it is truncated.
pub const MAX_TRACE_DEPTH: usize = 64;
/// Relative tolerance on `|input - output| / input` for a completed trace.
pub const CONSERVATION_TOLERANCE: f64 = 1e-9;
/// Relative tolerance used when comparing the Jones and Mueller paths.
pub const CROSS_ENGINE_TOLERANCE: f64 = 0.02;
/// Default angular tolerance of a sensor, in degrees.
pub const SENSOR_ANGLE_TOLERANCE: f64 = 5.0;
/// Default splitting ratio (transmitted fraction) of a non-polarizing splitter.
pub const NPBS_RATIO: f64 = 0.5;

/// Injectable set of tolerances used by the bench tracer and the validator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tolerances {
    pub zero_intensity: f64,
    pub linear_threshold: f64,
    pub circular_threshold: f64,
    pub pure_state_dop: f64,
    pub min_intensity: f64,
    pub max_depth: usize,
    pub conservation: f64,
    pub cross_engine: f64,
    /// Propagate every state with Stokes/Mueller, even pure ones.
    pub force_mueller: bool,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            zero_intensity: ZERO_INTENSITY,
            linear_threshold: LINEAR_ELLIPTICITY_THRESHOLD,
            circular_threshold: CIRCULAR_ELLIPTICITY_THRESHOLD,
            pure_state_dop: PURE_STATE_DOP,
            min_intensity: MIN_TRACE_INTENSITY,
            max_depth: MAX_TRACE_DEPTH,
            conservation: CONSERVATION_TOLERANCE,
            cross_engine: CROSS_ENGINE_TOLERANCE,
            force_mueller: false,
        }
    }
}
