use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::powers::Powers;
use crate::segment::LightSegment;
use crate::state::PolarizationInfo;
use crate::stokes::StokesVector;

/// What one sensor saw during a trace. Beams arriving at the same sensor are
/// summed incoherently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub intensity: f64,
    pub stokes: StokesVector,
    pub polarization: PolarizationInfo,
    pub fidelity: Option<f64>,
    pub matched: bool,
    /// Number of beams that reached the sensor.
    pub hits: usize,
}

/// Outcome of tracing one layout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TraceResult {
    pub segments: Vec<LightSegment>,
    pub powers: Powers,
    pub sensors: BTreeMap<String, SensorReading>,
    pub violations: Vec<String>,
}

impl TraceResult {
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    pub fn total_input_energy(&self) -> f64 {
        self.powers.input
    }

    pub fn total_output_energy(&self) -> f64 {
        self.powers.output()
    }

    pub fn has_conservation_violation(&self) -> bool {
        !self.violations.is_empty()
    }

    /// Intensity at each segment, in trace order.
    pub fn segment_intensities(&self) -> Vec<f64> {
        self.segments.iter().map(|s| s.intensity).collect()
    }

    pub fn all_sensors_matched(&self) -> bool {
        self.sensors.values().all(|r| r.matched)
    }
}

impl fmt::Display for TraceResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Segments: {}", self.segment_count())?;
        write!(f, "{}", self.powers)?;
        writeln!(f, "Sensors:")?;
        for (id, reading) in &self.sensors {
            writeln!(
                f,
                "  {:<16} I = {:.6}  angle = {:>8.3}  {:?}  matched = {}",
                id,
                reading.intensity,
                reading.polarization.angle(),
                reading.polarization.kind(),
                reading.matched
            )?;
        }
        if !self.violations.is_empty() {
            writeln!(f, "Violations:")?;
            for v in &self.violations {
                writeln!(f, "  {}", v)?;
            }
        }
        Ok(())
    }
}
