//! The composition engine: traces light from every emitter through the layout.
//!
//! Rays wait on an explicit stack and are processed one node at a time, so
//! cyclic layouts (two mirrors facing each other) cannot grow the call stack.
//! Each ray stops when it reaches a sensor, leaves the bench, drops below the
//! minimum intensity or exceeds the maximum depth; the last two are safety
//! limits and their intensity is booked as truncated.
//!
//! A ray carries a Jones vector while it is fully polarized and a Stokes
//! vector otherwise. A Stokes ray that becomes pure again (unpolarized light
//! through a polarizer) goes back to Jones, unless the tolerances force the
//! Mueller path everywhere.

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, info, warn};

use crate::component::{ComponentKind, Layout};
use crate::config::Tolerances;
use crate::error::LayoutError;
use crate::result::{SensorReading, TraceResult};
use crate::segment::{LightSegment, SegmentEnd};
use crate::sensor;
use crate::splitter;
use crate::state::{PolarizationInfo, PolarizationState};
use crate::stokes::StokesVector;
use crate::validator;


/// A ray waiting to be processed at a node.
#[derive(Debug, Clone)]
struct Ray {
    node: usize,
    state: PolarizationState,
    depth: usize,
}

/// Incoherent sum of the light that reached one sensor.
#[derive(Debug, Clone, Copy, Default)]
struct Arrival {
    stokes: StokesVector,
    hits: usize,
}

/// A bench ready to be traced.
#[derive(Debug, Clone)]
pub struct Bench {
    layout: Layout,
    index: HashMap<String, usize>,
    tolerances: Tolerances,
    ray_queue: Vec<Ray>,
    arrivals: BTreeMap<String, Arrival>,
    pub result: TraceResult,
}

/// Validates and traces a layout.
pub fn trace(layout: &Layout, tolerances: &Tolerances) -> Result<TraceResult, LayoutError> {
    let mut bench = Bench::new(layout.clone(), *tolerances)?;
    bench.illuminate();
    bench.solve();
    Ok(bench.result)
}

impl Bench {
    pub fn new(layout: Layout, tolerances: Tolerances) -> Result<Self, LayoutError> {
        layout.validate()?;
        let index = layout
            .index()
            .into_iter()
            .map(|(id, i)| (id.to_string(), i))
            .collect();
        Ok(Self {
            layout,
            index,
            tolerances,
            ray_queue: Vec::new(),
            arrivals: BTreeMap::new(),
            result: TraceResult::default(),
        })
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn tolerances(&self) -> &Tolerances {
        &self.tolerances
    }

    /// Discards the previous trace.
    pub fn reset(&mut self) {
        self.ray_queue.clear();
        self.arrivals.clear();
        self.result = TraceResult::default();
    }

    /// Seeds one ray per emitter.
    pub fn illuminate(&mut self) {
        let emitters: Vec<(String, Option<String>, PolarizationState)> = self
            .layout
            .emitters()
            .filter_map(|(_, node)| match node.kind {
                ComponentKind::Emitter {
                    polarization,
                    intensity,
                } => Some((node.id.clone(), node.next.clone(), polarization.to_state(intensity))),
                _ => None,
            })
            .collect();

        for (id, next, state) in emitters {
            let state = if self.tolerances.force_mueller {
                state.into_stokes()
            } else {
                state
            };
            self.result.powers.input += state.intensity();
            info!(emitter = %id, intensity = state.intensity(), "illuminate");
            self.emit(&id, next.as_deref(), state, 0);
        }
    }

    /// Processes rays until none are left, then analyses sensors and checks conservation.
    pub fn solve(&mut self) {
        while self.propagate_next().is_some() {}
        self.finish();
    }

    /// Processes the next ray. Returns the index of the node it was processed at.
    pub fn propagate_next(&mut self) -> Option<usize> {
        let ray = self.ray_queue.pop()?;
        let node = &self.layout.components[ray.node];
        let (id, kind) = (node.id.clone(), node.kind);
        let (next, branch) = (node.next.clone(), node.branch.clone());
        let incoming = ray.state.intensity();
        let depth = ray.depth + 1;

        match kind {
            ComponentKind::Sensor { .. } => {
                self.result.powers.sensed += incoming;
                let arrival = self.arrivals.entry(id).or_default();
                arrival.stokes = arrival.stokes + ray.state.to_stokes();
                arrival.hits += 1;
            }
            ComponentKind::Splitter {
                kind: splitter_kind,
                angle,
                ratio,
            } => {
                let split = splitter::split(
                    splitter_kind,
                    angle,
                    ratio,
                    &ray.state,
                    self.tolerances.force_mueller,
                );
                let outgoing = split.o_intensity + split.e_intensity;
                self.book_loss(&id, &kind, &ray.state, outgoing);
                let o_ray = self.settle(split.o_ray);
                let e_ray = self.settle(split.e_ray);
                self.emit(&id, next.as_deref(), o_ray, depth);
                self.emit(&id, branch.as_deref(), e_ray, depth);
            }
            ComponentKind::Emitter { .. } => {
                // Unreachable for a validated layout: nothing points into an emitter.
                warn!(component = %id, "ray arrived at an emitter");
                self.result.powers.absorbed += incoming;
            }
            _ => {
                let state = kind.elements().iter().fold(ray.state, |state, element| {
                    element.apply(&state, self.tolerances.force_mueller)
                });
                self.book_loss(&id, &kind, &ray.state, state.intensity());
                let state = self.settle(state);
                self.emit(&id, next.as_deref(), state, depth);
            }
        }
        Some(ray.node)
    }

    /// Returns a pure Stokes state to the Jones path.
    fn settle(&self, state: PolarizationState) -> PolarizationState {
        if self.tolerances.force_mueller {
            state
        } else {
            state.purify(&self.tolerances)
        }
    }

    /// Books the loss the component is configured for. Light lost or gained
    /// beyond that stays unbooked and is reported as a violation.
    fn book_loss(
        &mut self,
        id: &str,
        kind: &ComponentKind,
        incoming: &PolarizationState,
        outgoing: f64,
    ) {
        let expected = kind.expected_loss(&incoming.to_stokes());
        let check = validator::check_element_loss(
            id,
            incoming.intensity(),
            outgoing,
            expected,
            &self.tolerances,
        );
        if let Some(message) = check {
            warn!("{}", message);
            self.result.violations.push(message);
        }
        self.result.powers.absorbed += expected;
    }

    /// Records a segment leaving `origin` towards `target` and queues it if it lives on.
    fn emit(&mut self, origin: &str, target: Option<&str>, state: PolarizationState, depth: usize) {
        let intensity = state.intensity();
        let powers = &mut self.result.powers;
        let (end, queued) = match target.and_then(|t| self.index.get(t).map(|&i| (t, i))) {
            None => {
                powers.escaped += intensity;
                (SegmentEnd::Escaped, None)
            }
            Some(_) if intensity < self.tolerances.min_intensity => {
                powers.trnc_intensity += intensity;
                (SegmentEnd::Extinguished, None)
            }
            Some(_) if depth >= self.tolerances.max_depth => {
                powers.trnc_depth += intensity;
                (SegmentEnd::DepthExceeded, None)
            }
            Some((t, i)) => (SegmentEnd::Node(t.to_string()), Some(i)),
        };

        let segment = LightSegment {
            index: self.result.segments.len(),
            origin: origin.to_string(),
            end,
            state,
            intensity,
            depth,
        };
        debug!(
            index = segment.index,
            origin = %segment.origin,
            end = ?segment.end,
            intensity,
            depth,
            "segment"
        );
        self.result.segments.push(segment);

        if let Some(node) = queued {
            self.ray_queue.push(Ray { node, state, depth });
        }
    }

    /// Builds the sensor readings and runs the conservation check.
    fn finish(&mut self) {
        for node in &self.layout.components {
            let ComponentKind::Sensor {
                required,
                threshold,
                tolerance,
            } = node.kind
            else {
                continue;
            };
            let arrival = self.arrivals.get(&node.id).copied().unwrap_or_default();
            let state = PolarizationState::Stokes(arrival.stokes.clamp_to_physical());
            let state = self.settle(state);
            let check = sensor::check_sensor_match(&state, required.as_ref(), threshold, tolerance);
            self.result.sensors.insert(
                node.id.clone(),
                SensorReading {
                    intensity: state.intensity(),
                    stokes: state.to_stokes(),
                    polarization: PolarizationInfo::analyze_with(state, &self.tolerances),
                    fidelity: check.fidelity,
                    matched: check.matched,
                    hits: arrival.hits,
                },
            );
        }

        let report = validator::validate(&self.result, &self.tolerances);
        for message in report.violations {
            warn!("{}", message);
            self.result.violations.push(message);
        }

        info!(
            segments = self.result.segment_count(),
            input = self.result.powers.input,
            output = self.result.powers.output(),
            violations = self.result.violations.len(),
            "trace complete"
        );
    }
}
