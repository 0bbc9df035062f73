use polarbench::{
    api,
    component::Layout,
    config::Tolerances,
    snapshot,
    state::{Handedness, PolarizationInfo, PolarizationKind},
};
use pyo3::{exceptions::PyValueError, prelude::*};

/// An analysed polarization state.
#[pyclass(name = "Polarization")]
#[derive(Debug, Clone)]
struct PyPolarization {
    inner: PolarizationInfo,
}

impl From<PolarizationInfo> for PyPolarization {
    fn from(inner: PolarizationInfo) -> Self {
        Self { inner }
    }
}

#[pymethods]
impl PyPolarization {
    /// Orientation in degrees, [0, 180).
    #[getter]
    fn angle(&self) -> f64 {
        self.inner.angle()
    }

    #[getter]
    fn intensity(&self) -> f64 {
        self.inner.intensity()
    }

    /// Normalised ellipticity in [-1, 1].
    #[getter]
    fn ellipticity(&self) -> f64 {
        self.inner.ellipticity()
    }

    #[getter]
    fn degree_of_polarization(&self) -> f64 {
        self.inner.degree_of_polarization()
    }

    /// "linear", "circular", "elliptical" or "unpolarized".
    #[getter]
    fn kind(&self) -> &'static str {
        match self.inner.kind() {
            PolarizationKind::Linear => "linear",
            PolarizationKind::Circular => "circular",
            PolarizationKind::Elliptical => "elliptical",
            PolarizationKind::Unpolarized => "unpolarized",
        }
    }

    #[getter]
    fn handedness(&self) -> &'static str {
        match self.inner.handedness() {
            Handedness::Right => "right",
            Handedness::Left => "left",
            Handedness::Linear => "linear",
        }
    }

    /// (S0, S1, S2, S3)
    fn stokes(&self) -> (f64, f64, f64, f64) {
        let s = api::to_stokes(&self.inner);
        (s.s0, s.s1, s.s2, s.s3)
    }

    /// ((Ex.re, Ex.im), (Ey.re, Ey.im)), or None for a partially polarized state.
    fn jones(&self) -> Option<((f64, f64), (f64, f64))> {
        api::to_jones(&self.inner).map(|v| ((v[0].re, v[0].im), (v[1].re, v[1].im)))
    }

    fn __repr__(&self) -> String {
        format!(
            "Polarization(kind={}, angle={:.4}, intensity={:.6}, ellipticity={:.4})",
            self.kind(),
            self.angle(),
            self.intensity(),
            self.ellipticity()
        )
    }
}

#[pyfunction]
fn create_linear_source(angle: f64, intensity: f64) -> PyPolarization {
    api::create_linear_source(angle, intensity).into()
}

#[pyfunction]
fn create_circular_source(is_right: bool, intensity: f64) -> PyPolarization {
    api::create_circular_source(is_right, intensity).into()
}

#[pyfunction]
fn create_unpolarized_source(intensity: f64) -> PyPolarization {
    api::create_unpolarized_source(intensity).into()
}

#[pyfunction]
fn apply_polarizer(state: &PyPolarization, axis_angle: f64) -> PyPolarization {
    api::apply_polarizer(&state.inner, axis_angle).into()
}

#[pyfunction]
fn apply_wave_plate(state: &PyPolarization, retardance: f64, fast_axis: f64) -> PyPolarization {
    api::apply_wave_plate(&state.inner, retardance, fast_axis).into()
}

#[pyfunction]
fn apply_rotator(state: &PyPolarization, angle: f64) -> PyPolarization {
    api::apply_rotator(&state.inner, angle).into()
}

#[pyfunction]
fn calculate_malus_law(i0: f64, angle: f64) -> f64 {
    api::calculate_malus_law(i0, angle)
}

/// Traces a layout given as JSON and returns the snapshot JSON.
#[pyfunction]
#[pyo3(signature = (layout_json, description=None))]
fn trace_json(layout_json: &str, description: Option<&str>) -> PyResult<String> {
    let layout: Layout =
        serde_json::from_str(layout_json).map_err(|e| PyValueError::new_err(e.to_string()))?;
    snapshot::record(&layout, &Tolerances::default(), description)
        .and_then(|s| s.to_json())
        .map_err(|e| PyValueError::new_err(e.to_string()))
}

/// Replays a snapshot JSON. True when the fingerprint is reproduced.
#[pyfunction]
fn replay_json(snapshot_json: &str) -> PyResult<bool> {
    snapshot::replay_from_json(snapshot_json)
        .map(|outcome| outcome.fingerprint_matches)
        .map_err(|e| PyValueError::new_err(e.to_string()))
}

/// A Python module implemented in Rust.
#[pymodule]
fn _polarbench_py(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyPolarization>()?;
    m.add_function(wrap_pyfunction!(create_linear_source, m)?)?;
    m.add_function(wrap_pyfunction!(create_circular_source, m)?)?;
    m.add_function(wrap_pyfunction!(create_unpolarized_source, m)?)?;
    m.add_function(wrap_pyfunction!(apply_polarizer, m)?)?;
    m.add_function(wrap_pyfunction!(apply_wave_plate, m)?)?;
    m.add_function(wrap_pyfunction!(apply_rotator, m)?)?;
    m.add_function(wrap_pyfunction!(calculate_malus_law, m)?)?;
    m.add_function(wrap_pyfunction!(trace_json, m)?)?;
    m.add_function(wrap_pyfunction!(replay_json, m)?)?;
    Ok(())
}
