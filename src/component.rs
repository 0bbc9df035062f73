//! Bench layout: an arena of component nodes joined by id.
//!
//! A node has at most two outputs. `next` is the single output of an ordinary
//! element, or the transmitted / ordinary beam of a splitter; `branch` is the
//! reflected / extraordinary beam of a splitter. A missing output means the
//! light leaves the bench. Sensors terminate the light and have no outputs.
//!
//! Layouts come from outside the engine and are checked by
//! [`Layout::validate`] before any trace.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::config;
use crate::element::Element;
use crate::error::LayoutError;
use crate::jones;
use crate::state::PolarizationState;
use crate::stokes::StokesVector;

#[cfg(test)]
mod tests {
    use super::*;

    const SIMPLE: &str = r#"{
        "components": [
            {"id": "laser", "type": "emitter", "polarization": {"kind": "linear", "angle": 0.0}, "intensity": 1.0, "next": "pbs"},
            {"id": "pbs", "type": "splitter", "kind": "pbs", "next": "a", "branch": "b"},
            {"id": "a", "type": "sensor", "required": {"kind": "linear", "angle": 0.0}, "threshold": 0.5},
            {"id": "b", "type": "sensor"}
        ]
    }"#;

    #[test]
    fn parse_and_validate() {
        let layout: Layout = serde_json::from_str(SIMPLE).unwrap();
        assert_eq!(layout.components.len(), 4);
        layout.validate().unwrap();
        match &layout.components[1].kind {
            ComponentKind::Splitter { kind, angle, ratio } => {
                assert_eq!(*kind, SplitterKind::Pbs);
                assert_eq!(*angle, 0.0);
                assert_eq!(*ratio, config::NPBS_RATIO);
            }
            other => panic!("unexpected kind {:?}", other),
        }
        match &layout.components[3].kind {
            ComponentKind::Sensor { tolerance, .. } => {
                assert_eq!(*tolerance, config::SENSOR_ANGLE_TOLERANCE)
            }
            other => panic!("unexpected kind {:?}", other),
        }
    }

    #[test]
    fn serialises_back_to_the_same_layout() {
        let layout: Layout = serde_json::from_str(SIMPLE).unwrap();
        let json = serde_json::to_string(&layout).unwrap();
        let again: Layout = serde_json::from_str(&json).unwrap();
        assert_eq!(layout, again);
    }

    #[test]
    fn rejects_bad_layouts() {
        let emitter = |id: &str, next: Option<&str>| ComponentNode {
            id: id.to_string(),
            kind: ComponentKind::Emitter {
                polarization: PolarizationSpec::Unpolarized,
                intensity: 1.0,
            },
            next: next.map(str::to_string),
            branch: None,
        };
        let sensor = |id: &str| ComponentNode {
            id: id.to_string(),
            kind: ComponentKind::Sensor {
                required: None,
                threshold: 0.0,
                tolerance: 5.0,
            },
            next: None,
            branch: None,
        };

        assert_eq!(Layout::default().validate(), Err(LayoutError::Empty));

        let duplicate = Layout::new(vec![emitter("a", None), sensor("a")]);
        assert_eq!(duplicate.validate(), Err(LayoutError::DuplicateId("a".into())));

        let dangling = Layout::new(vec![emitter("a", Some("nowhere"))]);
        assert!(matches!(dangling.validate(), Err(LayoutError::DanglingTarget { .. })));

        let into_emitter = Layout::new(vec![emitter("a", Some("b")), emitter("b", None)]);
        assert!(matches!(into_emitter.validate(), Err(LayoutError::EdgeIntoEmitter { .. })));

        let mut branchy = emitter("a", Some("s"));
        branchy.branch = Some("s".into());
        let layout = Layout::new(vec![branchy, sensor("s")]);
        assert!(matches!(layout.validate(), Err(LayoutError::UnexpectedOutput { .. })));

        let mut nan = emitter("a", None);
        nan.kind = ComponentKind::Rotator { angle: f64::NAN };
        assert!(matches!(Layout::new(vec![nan]).validate(), Err(LayoutError::NonFinite { .. })));

        let mirror = ComponentNode {
            id: "m".into(),
            kind: ComponentKind::Mirror { reflectance: 1.5 },
            next: None,
            branch: None,
        };
        assert!(matches!(
            Layout::new(vec![mirror]).validate(),
            Err(LayoutError::OutOfRange { .. })
        ));

        for tolerance in [-1.0, 90.5, 180.0] {
            let mut wide = sensor("s");
            wide.kind = ComponentKind::Sensor {
                required: None,
                threshold: 0.0,
                tolerance,
            };
            assert_eq!(
                Layout::new(vec![wide]).validate(),
                Err(LayoutError::ToleranceOutOfRange {
                    id: "s".into(),
                    value: tolerance
                })
            );
        }
        let mut right_angle = sensor("s");
        right_angle.kind = ComponentKind::Sensor {
            required: None,
            threshold: 0.0,
            tolerance: 90.0,
        };
        assert!(Layout::new(vec![right_angle]).validate().is_ok());
    }

    #[test]
    fn expected_loss_follows_configuration() {
        let vertical = StokesVector::create_vertical(2.0);
        let polarizer = ComponentKind::Polarizer {
            angle: 0.0,
            t_par: 1.0,
            t_perp: 0.0,
        };
        assert!((polarizer.expected_loss(&vertical) - 2.0).abs() < 1e-12);
        let diagonal = ComponentKind::Polarizer {
            angle: 45.0,
            t_par: 0.8,
            t_perp: 0.2,
        };
        assert!((diagonal.expected_loss(&vertical) - 1.0).abs() < 1e-12);
        let mirror = ComponentKind::Mirror { reflectance: 0.9 };
        assert!((mirror.expected_loss(&vertical) - 0.2).abs() < 1e-12);
        let waveplate = ComponentKind::Waveplate {
            retardance: 90.0,
            axis: 10.0,
        };
        assert_eq!(waveplate.expected_loss(&vertical), 0.0);
    }

    #[test]
    fn polarization_specs_seed_states() {
        assert!(PolarizationSpec::Linear { angle: 10.0 }.to_state(1.0).is_jones());
        assert!(PolarizationSpec::Circular { right: true }.to_state(1.0).is_jones());
        assert!(!PolarizationSpec::Unpolarized.to_state(1.0).is_jones());
        assert!(!PolarizationSpec::Partial { angle: 0.0, dop: 0.5 }.to_state(1.0).is_jones());
        let elliptical = PolarizationSpec::Elliptical {
            angle: 30.0,
            ellipticity: 10.0,
        }
        .to_state(2.0);
        assert!(elliptical.is_jones());
        assert!((elliptical.intensity() - 2.0).abs() < 1e-12);
    }
}

/// Polarization of an emitter, or the polarization a sensor expects.
/// Angles in degrees; `ellipticity` is the ellipticity angle χ.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PolarizationSpec {
    Linear { angle: f64 },
    Circular { right: bool },
    Elliptical { angle: f64, ellipticity: f64 },
    Unpolarized,
    Partial { angle: f64, dop: f64 },
}

impl PolarizationSpec {
    /// Pure states are seeded as Jones vectors, everything else as Stokes.
    pub fn to_state(&self, intensity: f64) -> PolarizationState {
        let intensity = intensity.max(0.0);
        match *self {
            PolarizationSpec::Linear { angle } => {
                PolarizationState::Jones(jones::from_angle(angle, intensity))
            }
            PolarizationSpec::Circular { right } => {
                PolarizationState::Jones(jones::circular(right, intensity))
            }
            PolarizationSpec::Elliptical { angle, ellipticity } => {
                let s = StokesVector::create_elliptical(intensity, angle, ellipticity);
                s.to_jones()
                    .map_or(PolarizationState::Stokes(s), PolarizationState::Jones)
            }
            PolarizationSpec::Unpolarized => {
                PolarizationState::Stokes(StokesVector::unpolarized(intensity))
            }
            PolarizationSpec::Partial { angle, dop } => PolarizationState::Stokes(
                StokesVector::create_partially_polarized(intensity, angle, dop),
            ),
        }
    }

    fn numbers(&self) -> Vec<(&'static str, f64)> {
        match *self {
            PolarizationSpec::Linear { angle } => vec![("angle", angle)],
            PolarizationSpec::Circular { .. } | PolarizationSpec::Unpolarized => vec![],
            PolarizationSpec::Elliptical { angle, ellipticity } => {
                vec![("angle", angle), ("ellipticity", ellipticity)]
            }
            PolarizationSpec::Partial { angle, dop } => vec![("angle", angle), ("dop", dop)],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitterKind {
    /// Polarizing beam splitter: transmits along `angle`, reflects across it.
    Pbs,
    /// Non-polarizing beam splitter: transmits the fraction `ratio`.
    Npbs,
    /// Birefringent crystal: ordinary ray along `angle`, extraordinary across it.
    Calcite,
}

fn unit() -> f64 {
    1.0
}

fn default_ratio() -> f64 {
    config::NPBS_RATIO
}

fn default_tolerance() -> f64 {
    config::SENSOR_ANGLE_TOLERANCE
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ComponentKind {
    Emitter {
        polarization: PolarizationSpec,
        #[serde(default = "unit")]
        intensity: f64,
    },
    /// `t_par` and `t_perp` are intensity transmittances along and across the axis.
    Polarizer {
        angle: f64,
        #[serde(default = "unit")]
        t_par: f64,
        #[serde(default)]
        t_perp: f64,
    },
    Waveplate {
        retardance: f64,
        axis: f64,
    },
    Rotator {
        angle: f64,
    },
    Mirror {
        #[serde(default = "unit")]
        reflectance: f64,
    },
    Splitter {
        kind: SplitterKind,
        #[serde(default)]
        angle: f64,
        #[serde(default = "default_ratio")]
        ratio: f64,
    },
    Sensor {
        #[serde(default)]
        required: Option<PolarizationSpec>,
        #[serde(default)]
        threshold: f64,
        #[serde(default = "default_tolerance")]
        tolerance: f64,
    },
}

impl ComponentKind {
    pub fn name(&self) -> &'static str {
        match self {
            ComponentKind::Emitter { .. } => "emitter",
            ComponentKind::Polarizer { .. } => "polarizer",
            ComponentKind::Waveplate { .. } => "waveplate",
            ComponentKind::Rotator { .. } => "rotator",
            ComponentKind::Mirror { .. } => "mirror",
            ComponentKind::Splitter { .. } => "splitter",
            ComponentKind::Sensor { .. } => "sensor",
        }
    }

    /// Operators applied in sequence by a single-output element.
    /// Empty for emitters, splitters and sensors.
    pub fn elements(&self) -> Vec<Element> {
        match *self {
            ComponentKind::Polarizer { angle, t_par, t_perp } => {
                if t_par == 1.0 && t_perp == 0.0 {
                    vec![Element::Polarizer { angle }]
                } else {
                    vec![Element::PartialPolarizer { angle, t_par, t_perp }]
                }
            }
            ComponentKind::Waveplate { retardance, axis } => {
                vec![Element::Retarder { axis, retardance }]
            }
            ComponentKind::Rotator { angle } => vec![Element::Rotator { angle }],
            ComponentKind::Mirror { reflectance } => {
                if reflectance == 1.0 {
                    vec![Element::Mirror]
                } else {
                    vec![
                        Element::Mirror,
                        Element::Attenuator {
                            transmittance: reflectance,
                        },
                    ]
                }
            }
            ComponentKind::Emitter { .. }
            | ComponentKind::Splitter { .. }
            | ComponentKind::Sensor { .. } => vec![],
        }
    }

    /// Intensity the component is configured to remove from `incoming`.
    /// Waveplates, rotators and splitters are lossless.
    pub fn expected_loss(&self, incoming: &StokesVector) -> f64 {
        match *self {
            ComponentKind::Polarizer { angle, t_par, t_perp } => {
                let (sin, cos) = (2.0 * angle.to_radians()).sin_cos();
                let along = 0.5 * (incoming.s0 + incoming.s1 * cos + incoming.s2 * sin);
                let across = incoming.s0 - along;
                (1.0 - t_par) * along + (1.0 - t_perp) * across
            }
            ComponentKind::Mirror { reflectance } => (1.0 - reflectance) * incoming.s0,
            ComponentKind::Waveplate { .. }
            | ComponentKind::Rotator { .. }
            | ComponentKind::Splitter { .. }
            | ComponentKind::Emitter { .. }
            | ComponentKind::Sensor { .. } => 0.0,
        }
    }

    fn numbers(&self) -> Vec<(&'static str, f64)> {
        match self {
            ComponentKind::Emitter {
                polarization,
                intensity,
            } => {
                let mut n = polarization.numbers();
                n.push(("intensity", *intensity));
                n
            }
            ComponentKind::Polarizer { angle, t_par, t_perp } => {
                vec![("angle", *angle), ("t_par", *t_par), ("t_perp", *t_perp)]
            }
            ComponentKind::Waveplate { retardance, axis } => {
                vec![("retardance", *retardance), ("axis", *axis)]
            }
            ComponentKind::Rotator { angle } => vec![("angle", *angle)],
            ComponentKind::Mirror { reflectance } => vec![("reflectance", *reflectance)],
            ComponentKind::Splitter { angle, ratio, .. } => {
                vec![("angle", *angle), ("ratio", *ratio)]
            }
            ComponentKind::Sensor {
                required,
                threshold,
                tolerance,
            } => {
                let mut n = required.as_ref().map(|r| r.numbers()).unwrap_or_default();
                n.push(("threshold", *threshold));
                n.push(("tolerance", *tolerance));
                n
            }
        }
    }

    fn fractions(&self) -> Vec<(&'static str, f64)> {
        match self {
            ComponentKind::Emitter {
                polarization: PolarizationSpec::Partial { dop, .. },
                ..
            } => vec![("dop", *dop)],
            ComponentKind::Polarizer { t_par, t_perp, .. } => {
                vec![("t_par", *t_par), ("t_perp", *t_perp)]
            }
            ComponentKind::Mirror { reflectance } => vec![("reflectance", *reflectance)],
            ComponentKind::Splitter { ratio, .. } => vec![("ratio", *ratio)],
            _ => vec![],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentNode {
    pub id: String,
    #[serde(flatten)]
    pub kind: ComponentKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
}

impl ComponentNode {
    pub fn is_emitter(&self) -> bool {
        matches!(self.kind, ComponentKind::Emitter { .. })
    }

    fn outputs(&self) -> impl Iterator<Item = &String> {
        self.next.iter().chain(self.branch.iter())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    pub components: Vec<ComponentNode>,
}

impl Layout {
    pub fn new(components: Vec<ComponentNode>) -> Self {
        Self { components }
    }

    /// Map from component id to its index in the arena.
    pub fn index(&self) -> HashMap<&str, usize> {
        self.components
            .iter()
            .enumerate()
            .map(|(i, node)| (node.id.as_str(), i))
            .collect()
    }

    pub fn emitters(&self) -> impl Iterator<Item = (usize, &ComponentNode)> {
        self.components
            .iter()
            .enumerate()
            .filter(|(_, node)| node.is_emitter())
    }

    /// Structural and numeric checks. A valid layout can always be traced.
    pub fn validate(&self) -> Result<(), LayoutError> {
        if self.components.is_empty() {
            return Err(LayoutError::Empty);
        }

        let mut seen = HashSet::new();
        for node in &self.components {
            if !seen.insert(node.id.as_str()) {
                return Err(LayoutError::DuplicateId(node.id.clone()));
            }
        }

        let index = self.index();
        for node in &self.components {
            for (field, value) in node.kind.numbers() {
                if !value.is_finite() {
                    return Err(LayoutError::NonFinite {
                        id: node.id.clone(),
                        field,
                    });
                }
            }
            for (field, value) in node.kind.fractions() {
                if !(0.0..=1.0).contains(&value) {
                    return Err(LayoutError::OutOfRange {
                        id: node.id.clone(),
                        field,
                        value,
                    });
                }
            }
            if let ComponentKind::Emitter { intensity, .. } = node.kind {
                if intensity < 0.0 {
                    return Err(LayoutError::Negative {
                        id: node.id.clone(),
                        field: "intensity",
                        value: intensity,
                    });
                }
            }
            if let ComponentKind::Sensor { tolerance, .. } = node.kind {
                if !(0.0..=90.0).contains(&tolerance) {
                    return Err(LayoutError::ToleranceOutOfRange {
                        id: node.id.clone(),
                        value: tolerance,
                    });
                }
            }

            let allowed = match node.kind {
                ComponentKind::Sensor { .. } => 0,
                ComponentKind::Splitter { .. } => 2,
                _ => 1,
            };
            if node.outputs().count() > allowed || (allowed == 1 && node.branch.is_some()) {
                return Err(LayoutError::UnexpectedOutput {
                    id: node.id.clone(),
                    kind: node.kind.name(),
                });
            }

            for target in node.outputs() {
                match index.get(target.as_str()) {
                    None => {
                        return Err(LayoutError::DanglingTarget {
                            from: node.id.clone(),
                            to: target.clone(),
                        })
                    }
                    Some(&i) if self.components[i].is_emitter() => {
                        return Err(LayoutError::EdgeIntoEmitter {
                            from: node.id.clone(),
                            to: target.clone(),
                        })
                    }
                    Some(_) => {}
                }
            }
        }
        Ok(())
    }
}
