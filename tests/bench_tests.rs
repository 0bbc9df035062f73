use std::{fs, path::Path};

use polarbench::{
    batch,
    bench::{self, Bench},
    component::{ComponentKind, ComponentNode, Layout, PolarizationSpec},
    config::Tolerances,
    error::{LayoutError, SnapshotError},
    segment::SegmentEnd,
    settings, snapshot,
    state::{Handedness, PolarizationKind},
    validator,
};

// Tolerance for comparing intensities
const TOL: f64 = 1e-12;

fn load_layout(filename: &str) -> Layout {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("test_data")
        .join(filename);
    let json = fs::read_to_string(path).unwrap();
    serde_json::from_str(&json).unwrap()
}

#[test]
fn demo_bench() {
    let settings = settings::load_default_config().unwrap();
    let layout = load_layout("demo_bench.json");
    let result = bench::trace(&layout, &settings.tolerances).unwrap();

    assert_eq!(result.segment_count(), 9);
    assert!(!result.has_conservation_violation(), "{:?}", result.violations);
    assert!((result.total_input_energy() - 1.0).abs() < TOL);
    assert!((result.total_output_energy() - 1.0).abs() < TOL);
    assert!((result.powers.sensed - 0.5).abs() < TOL);
    assert!((result.powers.absorbed - 0.5).abs() < TOL);

    let circ = &result.sensors["circ"];
    assert!((circ.intensity - 0.25).abs() < TOL);
    assert_eq!(circ.polarization.kind(), PolarizationKind::Circular);
    assert_eq!(circ.polarization.handedness(), Handedness::Right);
    assert!(circ.matched);

    for id in ["ordinary", "extraordinary"] {
        let reading = &result.sensors[id];
        assert!((reading.intensity - 0.125).abs() < TOL, "{}: {}", id, reading.intensity);
        assert_eq!(reading.polarization.kind(), PolarizationKind::Linear);
        assert!(reading.matched, "{}", id);
    }
    assert!(result.all_sensors_matched());

    // Every segment ends at a sensor-bound node; nothing escaped or was truncated.
    assert!(result
        .segments
        .iter()
        .all(|s| matches!(s.end, SegmentEnd::Node(_))));
}

#[test]
fn demo_bench_agrees_on_both_engines() {
    let settings = settings::load_default_config().unwrap();
    let layout = load_layout("demo_bench.json");
    let agreement = validator::cross_validate(&layout, &settings.tolerances).unwrap();
    assert!(agreement.agrees);
    assert!(agreement.max_difference < 1e-9, "{:?}", agreement);
}

#[test]
fn bench_can_be_stepped() {
    let settings = settings::load_default_config().unwrap();
    let mut bench = Bench::new(load_layout("demo_bench.json"), settings.tolerances).unwrap();
    bench.illuminate();
    let first = bench.propagate_next();
    assert_eq!(first.map(|i| bench.layout().components[i].id.as_str()), Some("pol"));
    bench.solve();
    assert_eq!(bench.result.segment_count(), 9);

    // A reset discards the previous trace.
    bench.reset();
    assert_eq!(bench.result.segment_count(), 0);
    bench.illuminate();
    bench.solve();
    assert_eq!(bench.result.segment_count(), 9);
}

#[test]
fn demo_bench_replays_exactly() {
    let settings = settings::load_default_config().unwrap();
    let layout = load_layout("demo_bench.json");
    let recorded = snapshot::record(&layout, &settings.tolerances, Some("demo")).unwrap();
    assert_eq!(recorded.result.segment_count, 9);
    assert_eq!(recorded.result.sensor_analysis.len(), 3);

    let json = recorded.to_json().unwrap();
    let outcome = snapshot::replay_from_json(&json).unwrap();
    assert!(outcome.is_exact());
    assert_eq!(outcome.snapshot.fingerprint, recorded.fingerprint);
    assert_eq!(outcome.snapshot.description.as_deref(), Some("demo"));

    let report = batch::replay_all(&[recorded.clone(), recorded], false);
    assert!(report.all_exact());
}

#[test]
fn demo_bench_replays_with_its_recorded_depth() {
    let settings = settings::load_default_config().unwrap();
    let layout = load_layout("demo_bench.json");
    let shallow = Tolerances {
        max_depth: 2,
        ..settings.tolerances
    };
    let recorded = snapshot::record(&layout, &shallow, None).unwrap();
    let full = snapshot::record(&layout, &settings.tolerances, None).unwrap();
    assert!(recorded.result.segment_count < full.result.segment_count);

    let outcome = snapshot::replay_from_json(&recorded.to_json().unwrap()).unwrap();
    assert!(outcome.is_exact());
    assert_eq!(outcome.snapshot.result.segment_count, recorded.result.segment_count);
    assert_ne!(recorded.fingerprint, full.fingerprint);
}

#[test]
fn malformed_input_never_panics() {
    let settings = settings::load_default_config().unwrap();
    for json in ["", "[]", "{\"layout\": 1}", "{\"components\": [{\"id\": \"x\"}]}"] {
        assert!(matches!(
            snapshot::replay_from_json(json),
            Err(SnapshotError::Json(_))
        ));
    }
    let unknown_type = "{\"components\": [{\"id\": \"x\", \"type\": \"laser\"}]}";
    assert!(serde_json::from_str::<Layout>(unknown_type).is_err());
    assert_eq!(
        bench::trace(&Layout::default(), &settings.tolerances),
        Err(LayoutError::Empty)
    );
}

#[test]
fn feedback_loop_is_bounded() {
    let settings = settings::load_default_config().unwrap();
    let mut layout = load_layout("demo_bench.json");
    // Send the extraordinary ray back into the wave plate.
    for node in layout.components.iter_mut() {
        if node.id == "crystal" {
            node.branch = Some("qwp".into());
        }
    }
    layout.components.retain(|n| n.id != "extraordinary");

    let result = bench::trace(&layout, &settings.tolerances).unwrap();
    assert!(result.segment_count() < 1000);
    assert!(!result.has_conservation_violation(), "{:?}", result.violations);
    let extinguished = result
        .segments
        .iter()
        .filter(|s| s.end == SegmentEnd::Extinguished)
        .count();
    assert!(extinguished > 0);
}

#[test]
fn several_emitters_share_a_sensor() {
    let settings = settings::load_default_config().unwrap();
    let emitter = |id: &str, angle: f64| ComponentNode {
        id: id.into(),
        kind: ComponentKind::Emitter {
            polarization: PolarizationSpec::Linear { angle },
            intensity: 0.5,
        },
        next: Some("s".into()),
        branch: None,
    };
    let layout = Layout::new(vec![
        emitter("a", 0.0),
        emitter("b", 0.0),
        ComponentNode {
            id: "s".into(),
            kind: ComponentKind::Sensor {
                required: Some(PolarizationSpec::Linear { angle: 0.0 }),
                threshold: 0.9,
                tolerance: 1.0,
            },
            next: None,
            branch: None,
        },
    ]);
    let result = bench::trace(&layout, &settings.tolerances).unwrap();
    let reading = &result.sensors["s"];
    assert_eq!(reading.hits, 2);
    assert!((reading.intensity - 1.0).abs() < TOL);
    assert!(reading.matched);
}
