//! Snapshots of a traced layout for deterministic replay.
//!
//! A snapshot stores the layout, the tolerances it was traced with and a
//! summary of the trace, together with a SHA-256 fingerprint over the layout,
//! the tolerances, the per-segment intensities and the sensor analysis.
//! Replaying a snapshot traces the stored layout again with the stored
//! tolerances and compares fingerprints, which detects any change in engine
//! behaviour.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{info, warn};
use uuid::Uuid;

use crate::bench;
use crate::component::Layout;
use crate::config::Tolerances;
use crate::error::SnapshotError;
use crate::result::TraceResult;
use crate::state::PolarizationInfo;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{ComponentKind, ComponentNode, PolarizationSpec, SplitterKind};

    fn layout() -> Layout {
        Layout::new(vec![
            ComponentNode {
                id: "laser".into(),
                kind: ComponentKind::Emitter {
                    polarization: PolarizationSpec::Linear { angle: 30.0 },
                    intensity: 1.0,
                },
                next: Some("qwp".into()),
                branch: None,
            },
            ComponentNode {
                id: "qwp".into(),
                kind: ComponentKind::Waveplate {
                    retardance: 90.0,
                    axis: 0.0,
                },
                next: Some("pbs".into()),
                branch: None,
            },
            ComponentNode {
                id: "pbs".into(),
                kind: ComponentKind::Splitter {
                    kind: SplitterKind::Pbs,
                    angle: 0.0,
                    ratio: 0.5,
                },
                next: Some("t".into()),
                branch: Some("r".into()),
            },
            ComponentNode {
                id: "t".into(),
                kind: ComponentKind::Sensor {
                    required: None,
                    threshold: 0.0,
                    tolerance: 5.0,
                },
                next: None,
                branch: None,
            },
            ComponentNode {
                id: "r".into(),
                kind: ComponentKind::Sensor {
                    required: None,
                    threshold: 0.0,
                    tolerance: 5.0,
                },
                next: None,
                branch: None,
            },
        ])
    }

    #[test]
    fn replay_reproduces_fingerprint() {
        let tol = Tolerances::default();
        let snapshot = record(&layout(), &tol, Some("qwp into pbs")).unwrap();
        assert_eq!(snapshot.fingerprint.len(), 64);
        assert_eq!(snapshot.result.segment_count, 4);

        let json = snapshot.to_json().unwrap();
        assert!(json.contains("\"sensorAnalysis\""));
        assert!(json.contains("\"hasConservationViolation\""));

        let outcome = replay_from_json(&json).unwrap();
        assert!(outcome.fingerprint_matches);
        assert_eq!(outcome.intensity_drift, Some(0.0));
        assert!(outcome.is_exact());
    }

    #[test]
    fn edited_layout_changes_fingerprint() {
        let tol = Tolerances::default();
        let mut snapshot = record(&layout(), &tol, None).unwrap();
        snapshot.layout.components[1].kind = ComponentKind::Waveplate {
            retardance: 180.0,
            axis: 0.0,
        };
        let outcome = replay_snapshot(&snapshot).unwrap();
        assert!(!outcome.fingerprint_matches);
        assert!(!outcome.is_exact());
    }

    #[test]
    fn replay_uses_recorded_tolerances() {
        let shallow = Tolerances {
            max_depth: 2,
            ..Tolerances::default()
        };
        let snapshot = record(&layout(), &shallow, None).unwrap();
        assert_eq!(snapshot.tolerances, shallow);
        assert!(snapshot.to_json().unwrap().contains("\"max_depth\": 2"));

        let outcome = replay_snapshot(&snapshot).unwrap();
        assert!(outcome.is_exact());
        assert_eq!(outcome.snapshot.tolerances, shallow);

        // Same segment intensities, different tolerances: a different fingerprint.
        let deep = record(&layout(), &Tolerances::default(), None).unwrap();
        assert_eq!(deep.result.segment_intensities, snapshot.result.segment_intensities);
        assert_ne!(deep.fingerprint, snapshot.fingerprint);
    }

    #[test]
    fn snapshots_without_tolerances_replay_with_defaults() {
        let snapshot = record(&layout(), &Tolerances::default(), None).unwrap();
        let json = snapshot.to_json().unwrap();
        let mut value: serde_json::Value = serde_json::from_str(&json).unwrap();
        value.as_object_mut().unwrap().remove("tolerances");
        let outcome = replay_from_json(&value.to_string()).unwrap();
        assert_eq!(outcome.snapshot.tolerances, Tolerances::default());
        assert!(outcome.is_exact());
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(matches!(
            replay_from_json("{ not json"),
            Err(SnapshotError::Json(_))
        ));
        assert!(matches!(
            replay_from_json("{\"id\": 3}"),
            Err(SnapshotError::Json(_))
        ));
    }

    #[test]
    fn invalid_layout_is_an_error() {
        let tol = Tolerances::default();
        let mut snapshot = record(&layout(), &tol, None).unwrap();
        snapshot.layout.components[0].next = Some("nowhere".into());
        let json = snapshot.to_json().unwrap();
        assert!(matches!(
            replay_from_json(&json),
            Err(SnapshotError::Layout(_))
        ));
    }

    #[test]
    fn log_keeps_latest() {
        let tol = Tolerances::default();
        let mut log = SnapshotLog::new();
        assert!(export_latest(&log).unwrap().is_none());
        let first = log.record(&layout(), &tol, Some("first")).unwrap().id.clone();
        let second = log.record(&layout(), &tol, Some("second")).unwrap().id.clone();
        assert_eq!(log.len(), 2);
        assert_eq!(log.latest().map(|s| s.id.as_str()), Some(second.as_str()));
        assert!(export_latest(&log).unwrap().unwrap().contains("second"));
        assert!(log.remove(&second).is_some());
        assert_eq!(log.latest().map(|s| s.id.as_str()), Some(first.as_str()));
    }

    #[test]
    fn parse_one_or_many() {
        let tol = Tolerances::default();
        let a = record(&layout(), &tol, None).unwrap();
        let one = parse_snapshots(&a.to_json().unwrap()).unwrap();
        assert_eq!(one.len(), 1);
        let many = serde_json::to_string(&vec![a.clone(), a]).unwrap();
        assert_eq!(parse_snapshots(&many).unwrap().len(), 2);
    }
}

/// What the snapshot keeps of each sensor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorAnalysis {
    pub intensity: f64,
    pub polarization: PolarizationInfo,
    pub matched: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotResult {
    pub segment_count: usize,
    pub total_input_energy: f64,
    pub total_output_energy: f64,
    pub has_conservation_violation: bool,
    pub violations: Vec<String>,
    pub sensor_analysis: BTreeMap<String, SensorAnalysis>,
    #[serde(default)]
    pub segment_intensities: Vec<f64>,
}

impl From<&TraceResult> for SnapshotResult {
    fn from(result: &TraceResult) -> Self {
        Self {
            segment_count: result.segment_count(),
            total_input_energy: result.total_input_energy(),
            total_output_energy: result.total_output_energy(),
            has_conservation_violation: result.has_conservation_violation(),
            violations: result.violations.clone(),
            sensor_analysis: result
                .sensors
                .iter()
                .map(|(id, reading)| {
                    (
                        id.clone(),
                        SensorAnalysis {
                            intensity: reading.intensity,
                            polarization: reading.polarization,
                            matched: reading.matched,
                        },
                    )
                })
                .collect(),
            segment_intensities: result.segment_intensities(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationSnapshot {
    pub id: String,
    /// Unix time in milliseconds.
    pub timestamp: i64,
    pub fingerprint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub layout: Layout,
    /// Tolerances the layout was traced with. Replay uses these.
    #[serde(default)]
    pub tolerances: Tolerances,
    pub result: SnapshotResult,
}

impl SimulationSnapshot {
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_str(json)?)
    }
}

#[derive(Serialize)]
struct FingerprintInput<'a> {
    layout: &'a Layout,
    tolerances: &'a Tolerances,
    segment_intensities: &'a [f64],
    sensors: &'a BTreeMap<String, SensorAnalysis>,
}

/// Hex SHA-256 over the layout, the tolerances, the segment intensities and
/// the sensor analysis.
pub fn fingerprint(
    layout: &Layout,
    tolerances: &Tolerances,
    result: &SnapshotResult,
) -> Result<String, SnapshotError> {
    let bytes = serde_json::to_vec(&FingerprintInput {
        layout,
        tolerances,
        segment_intensities: &result.segment_intensities,
        sensors: &result.sensor_analysis,
    })?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect())
}

/// Builds a snapshot from a layout and its completed trace.
pub fn export_snapshot(
    layout: &Layout,
    tolerances: &Tolerances,
    result: &TraceResult,
    description: Option<&str>,
) -> Result<SimulationSnapshot, SnapshotError> {
    let summary = SnapshotResult::from(result);
    Ok(SimulationSnapshot {
        id: Uuid::new_v4().to_string(),
        timestamp: chrono::Utc::now().timestamp_millis(),
        fingerprint: fingerprint(layout, tolerances, &summary)?,
        description: description.map(str::to_string),
        layout: layout.clone(),
        tolerances: *tolerances,
        result: summary,
    })
}

/// Traces a layout and snapshots the result.
pub fn record(
    layout: &Layout,
    tolerances: &Tolerances,
    description: Option<&str>,
) -> Result<SimulationSnapshot, SnapshotError> {
    let result = bench::trace(layout, tolerances)?;
    export_snapshot(layout, tolerances, &result, description)
}

/// Result of tracing a stored snapshot again.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayOutcome {
    /// Snapshot of the fresh trace. Keeps the stored id and description.
    pub snapshot: SimulationSnapshot,
    pub stored_fingerprint: String,
    pub fingerprint_matches: bool,
    /// Largest per-segment intensity difference, `None` when the segment counts differ.
    pub intensity_drift: Option<f64>,
}

impl ReplayOutcome {
    pub fn is_exact(&self) -> bool {
        self.fingerprint_matches && self.intensity_drift == Some(0.0)
    }
}

/// Traces the stored layout again with the stored tolerances. The stored
/// snapshot is not modified.
pub fn replay_snapshot(stored: &SimulationSnapshot) -> Result<ReplayOutcome, SnapshotError> {
    let result = bench::trace(&stored.layout, &stored.tolerances)?;
    let summary = SnapshotResult::from(&result);
    let fresh_fingerprint = fingerprint(&stored.layout, &stored.tolerances, &summary)?;

    let stored_intensities = &stored.result.segment_intensities;
    let intensity_drift = (stored_intensities.len() == summary.segment_intensities.len()).then(|| {
        stored_intensities
            .iter()
            .zip(&summary.segment_intensities)
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max)
    });
    let fingerprint_matches = fresh_fingerprint == stored.fingerprint;

    if fingerprint_matches {
        info!(id = %stored.id, "replay reproduced snapshot");
    } else {
        warn!(
            id = %stored.id,
            stored = %stored.fingerprint,
            fresh = %fresh_fingerprint,
            drift = ?intensity_drift,
            "replay fingerprint differs"
        );
    }

    Ok(ReplayOutcome {
        snapshot: SimulationSnapshot {
            id: stored.id.clone(),
            timestamp: chrono::Utc::now().timestamp_millis(),
            fingerprint: fresh_fingerprint,
            description: stored.description.clone(),
            layout: stored.layout.clone(),
            tolerances: stored.tolerances,
            result: summary,
        },
        stored_fingerprint: stored.fingerprint.clone(),
        fingerprint_matches,
        intensity_drift,
    })
}

/// Parses and replays a snapshot. Malformed JSON and invalid layouts are errors.
pub fn replay_from_json(json: &str) -> Result<ReplayOutcome, SnapshotError> {
    let stored = SimulationSnapshot::from_json(json)?;
    replay_snapshot(&stored)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    Many(Vec<SimulationSnapshot>),
    One(Box<SimulationSnapshot>),
}

/// Parses either a single snapshot or an array of snapshots.
pub fn parse_snapshots(json: &str) -> Result<Vec<SimulationSnapshot>, SnapshotError> {
    Ok(match serde_json::from_str(json)? {
        OneOrMany::Many(snapshots) => snapshots,
        OneOrMany::One(snapshot) => vec![*snapshot],
    })
}

/// Ordered list of recorded snapshots, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SnapshotLog {
    snapshots: Vec<SimulationSnapshot>,
}

impl SnapshotLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, snapshot: SimulationSnapshot) -> &SimulationSnapshot {
        self.snapshots.push(snapshot);
        &self.snapshots[self.snapshots.len() - 1]
    }

    pub fn record(
        &mut self,
        layout: &Layout,
        tolerances: &Tolerances,
        description: Option<&str>,
    ) -> Result<&SimulationSnapshot, SnapshotError> {
        let snapshot = record(layout, tolerances, description)?;
        Ok(self.push(snapshot))
    }

    pub fn latest(&self) -> Option<&SimulationSnapshot> {
        self.snapshots.last()
    }

    pub fn get(&self, id: &str) -> Option<&SimulationSnapshot> {
        self.snapshots.iter().find(|s| s.id == id)
    }

    pub fn remove(&mut self, id: &str) -> Option<SimulationSnapshot> {
        let position = self.snapshots.iter().position(|s| s.id == id)?;
        Some(self.snapshots.remove(position))
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SimulationSnapshot> {
        self.snapshots.iter()
    }

    pub fn snapshots(&self) -> &[SimulationSnapshot] {
        &self.snapshots
    }
}

/// JSON of the most recent snapshot, or `None` for an empty log.
pub fn export_latest(log: &SnapshotLog) -> Result<Option<String>, SnapshotError> {
    log.latest().map(SimulationSnapshot::to_json).transpose()
}
