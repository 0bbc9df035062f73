use polarbench::{
    analyzer, api,
    bridge::{self, LegacyComplex, LegacyJonesVector},
    config::CROSS_ENGINE_TOLERANCE,
    element::Element,
    jones,
    mueller::MuellerMatrix,
    state::PolarizationState,
    stokes::StokesVector,
};
use rand::{rngs::StdRng, Rng, SeedableRng};

const SEED: u64 = 0x9e3779b97f4a7c15;

fn random_legacy(rng: &mut StdRng) -> LegacyJonesVector {
    [
        LegacyComplex {
            re: rng.random_range(-1.0..1.0),
            im: rng.random_range(-1.0..1.0),
        },
        LegacyComplex {
            re: rng.random_range(-1.0..1.0),
            im: rng.random_range(-1.0..1.0),
        },
    ]
}

fn random_element(rng: &mut StdRng) -> Element {
    let angle = rng.random_range(0.0..180.0);
    match rng.random_range(0..9) {
        0 => Element::Polarizer { angle },
        1 => Element::HalfWavePlate { axis: angle },
        2 => Element::QuarterWavePlate { axis: angle },
        3 => Element::Rotator { angle },
        4 => Element::Retarder {
            axis: angle,
            retardance: rng.random_range(0.0..360.0),
        },
        5 => Element::PartialPolarizer {
            angle,
            t_par: rng.random_range(0.5..1.0),
            t_perp: rng.random_range(0.0..0.5),
        },
        6 => Element::Mirror,
        7 => Element::FresnelReflection {
            n1: 1.0,
            n2: rng.random_range(1.2..2.0),
            incidence: rng.random_range(0.0..89.0),
        },
        _ => Element::FresnelTransmission {
            n1: 1.0,
            n2: rng.random_range(1.2..2.0),
            incidence: rng.random_range(0.0..89.0),
        },
    }
}

#[test]
fn jones_and_mueller_paths_agree() {
    let mut rng = StdRng::seed_from_u64(SEED);
    for _ in 0..500 {
        let v = random_legacy(&mut rng);
        let element = random_element(&mut rng);
        let check = bridge::cross_check(&v, &element);
        assert!(
            check.agrees(CROSS_ENGINE_TOLERANCE),
            "{:?} on {:?}: {:?}",
            element,
            v,
            check
        );
        // The two paths are derived from one convention, so they agree far
        // more tightly than the bridge tolerance.
        assert!(check.stokes_error < 1e-9, "{:?}: {:?}", element, check);
    }
}

#[test]
fn closed_form_mueller_matches_pauli_trace() {
    let mut rng = StdRng::seed_from_u64(SEED + 1);
    for _ in 0..200 {
        let element = random_element(&mut rng);
        let Some(j) = element.jones() else { continue };
        let derived = MuellerMatrix::from_jones_elements(&j);
        let closed = element.mueller();
        let diff = (derived.matrix() - closed.matrix()).abs().max();
        assert!(diff < 1e-9, "{:?}: {}", element, diff);
    }
}

#[test]
fn chains_agree() {
    let mut rng = StdRng::seed_from_u64(SEED + 2);
    for _ in 0..100 {
        let elements: Vec<_> = (0..rng.random_range(1..6))
            .map(|_| random_element(&mut rng))
            .collect();
        let start = bridge::legacy_to_unified(&random_legacy(&mut rng));

        let jones_out = elements
            .iter()
            .fold(start, |s, e| e.apply(&s, false))
            .to_stokes();
        let chain: Vec<_> = elements.iter().map(Element::mueller).collect();
        let mueller_out =
            polarbench::mueller::chain_mueller(&chain).apply_to_stokes(&start.to_stokes());

        let scale = jones_out.s0.max(1e-12);
        let err = (jones_out.to_vector() - mueller_out.to_vector()).norm() / scale;
        assert!(err < 1e-9, "{:?}: {}", elements, err);
    }
}

#[test]
fn legacy_round_trips() {
    let mut rng = StdRng::seed_from_u64(SEED + 3);
    for _ in 0..100 {
        let v = random_legacy(&mut rng);
        let unified = bridge::legacy_to_unified(&v);
        let back = bridge::unified_to_legacy(&unified);
        let a = StokesVector::from_jones(&bridge::legacy_to_jones(&v));
        let b = StokesVector::from_jones(&bridge::legacy_to_jones(&back));
        assert!((a.to_vector() - b.to_vector()).norm() < 1e-9);
        assert!((bridge::legacy_intensity(&v) - unified.intensity()).abs() < 1e-12);
    }
    for angle in [0.0, 15.0, 30.0, 45.0, 60.0, 75.0, 90.0] {
        let v = bridge::legacy_from_angle(angle, 1.0);
        assert!((bridge::legacy_angle(&v) - angle).abs() < 1e-3, "{}", angle);
    }
}

#[test]
fn malus_law_holds_everywhere() {
    let mut rng = StdRng::seed_from_u64(SEED + 4);
    for _ in 0..200 {
        let i0 = rng.random_range(0.1..10.0);
        let source = rng.random_range(0.0..180.0);
        let axis = rng.random_range(0.0..180.0);
        let out = api::apply_polarizer(&api::create_linear_source(source, i0), axis);
        let expected = analyzer::calculate_malus_law(i0, axis - source);
        assert!((out.intensity() - expected).abs() <= 1e-5 * i0);
    }
    let cases = [(0.0, 1.0), (90.0, 0.0), (45.0, 0.5), (30.0, 0.75), (60.0, 0.25)];
    for (angle, fraction) in cases {
        assert!((analyzer::calculate_malus_law(2.0, angle) - 2.0 * fraction).abs() < 1e-12);
    }
}

#[test]
fn boundary_angles_stay_finite() {
    for angle in [0.0, 0.0001, 89.9999, 90.0, 90.0001, 179.9999, 180.0] {
        for intensity in [1e-15, 1.0] {
            let state = PolarizationState::Jones(jones::from_angle(angle, intensity));
            for element in [
                Element::Polarizer { angle: 90.0 },
                Element::QuarterWavePlate { axis: angle },
                Element::FresnelReflection {
                    n1: 1.5,
                    n2: 1.0,
                    incidence: angle.min(89.9999),
                },
                Element::FresnelTransmission {
                    n1: 1.5,
                    n2: 1.0,
                    incidence: angle.min(89.9999),
                },
            ] {
                for force in [false, true] {
                    let s = element.apply(&state, force).to_stokes();
                    assert!(
                        s.s0.is_finite() && s.s1.is_finite() && s.s2.is_finite() && s.s3.is_finite(),
                        "{:?} at {} ({})",
                        element,
                        angle,
                        force
                    );
                }
            }
        }
    }
}
