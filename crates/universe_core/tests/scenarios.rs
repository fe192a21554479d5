//! End-to-end scenarios exercising the engine through its public surface.

use std::collections::BTreeMap;

use universe_core::{
    comm_check_reachable, Action, Engine, LocationKind, Planet, PlanetType, ProbeStatus, Relay,
    ResourceKind, Sector, TechDomain, Uid, Vec3, REPLICATION_COST, RESOURCE_COUNT, SURVEY_LEVELS,
};

fn actions_for(probe: Uid, action: Action) -> BTreeMap<Uid, Action> {
    BTreeMap::from([(probe, action)])
}

fn make_planet(id: Uid, kind: PlanetType, mass_earth: f64, iron: f64) -> Planet {
    let mut resources = [0.1; RESOURCE_COUNT];
    resources[ResourceKind::Iron.index()] = iron;
    Planet {
        id,
        name: "Scenario World".to_string(),
        kind,
        mass_earth,
        radius_earth: 1.0,
        orbital_radius_au: 1.0,
        orbital_period_days: 365.25,
        eccentricity: 0.01,
        obliquity_deg: 10.0,
        rotation_hours: 30.0,
        surface_temp_k: 280.0,
        atmosphere_bar: 1.0,
        water_coverage: 0.2,
        magnetic_field_gauss: 0.3,
        resources,
        habitability: 0.4,
        surveyed: [false; SURVEY_LEVELS],
        discovered_by: Uid::ZERO,
        discovered_tick: 0,
        artifact: None,
    }
}

/// Seed 42, one probe, first planet of the home system: orbit entry burns
/// fuel, then survey level 0 completes over multiple ticks.
#[test]
fn bob_orbits_and_surveys() {
    let mut engine = Engine::new(42);
    engine.universe.probes[0].name = "Bob".to_string();
    let bob = engine.universe.probes[0].id;
    let home = engine.universe.probes[0].system_id;
    let first_planet = engine.system(home).expect("home system").planets[0].id;

    let fuel_before = engine.universe.probes[0].fuel_kg;
    let report = engine.step(&actions_for(bob, Action::EnterOrbit { body: first_planet }));
    let (_, outcome) = &report.results[0];
    assert!(outcome.success, "{outcome:?}");
    let probe = engine.universe.probe(bob).unwrap();
    assert!(probe.fuel_kg < fuel_before, "orbit insertion burns fuel");
    assert_eq!(probe.location, LocationKind::Orbiting);

    let mut survey_ticks = 0u32;
    loop {
        let report = engine.step(&actions_for(bob, Action::Survey { level: 0 }));
        let (_, outcome) = &report.results[0];
        assert!(outcome.success, "{outcome:?}");
        survey_ticks += 1;
        if outcome.completed {
            break;
        }
        assert!(survey_ticks < 100, "survey never completed");
    }
    assert!(survey_ticks > 1, "level 0 must span multiple ticks");
    let planet = engine.system(home).unwrap().planet(first_planet).unwrap();
    assert!(planet.surveyed[0]);
}

/// Identical probes on worlds with iron abundance 0.8 and 0.2: a hundred
/// mining ticks end more than 2x apart.
#[test]
fn mining_yield_tracks_abundance() {
    let mut totals = Vec::new();
    for abundance in [0.8, 0.2] {
        let mut engine = Engine::new(42);
        let probe_id = engine.universe.probes[0].id;
        let home = engine.universe.probes[0].system_id;
        let body = Uid { hi: 900, lo: 1 };
        engine
            .system_mut(home)
            .unwrap()
            .planets
            .push(make_planet(body, PlanetType::Rocky, 1.0, abundance));
        {
            let probe = &mut engine.universe.probes[0];
            probe.body_id = body;
            probe.location = LocationKind::Landed;
        }
        for _ in 0..100 {
            let report = engine.step(&actions_for(
                probe_id,
                Action::Mine {
                    resource: ResourceKind::Iron,
                },
            ));
            assert!(report.results[0].1.success);
        }
        let mined = engine.universe.probe(probe_id).unwrap().resource(ResourceKind::Iron);
        totals.push(mined);
    }
    assert!(
        totals[0] > 2.0 * totals[1],
        "0.8 abundance should out-mine 0.2 by >2x: {totals:?}"
    );
}

/// Landing on a gas giant is refused without touching state.
#[test]
fn gas_giant_landing_rejected() {
    let mut engine = Engine::new(42);
    let probe_id = engine.universe.probes[0].id;
    let home = engine.universe.probes[0].system_id;
    let body = Uid { hi: 900, lo: 2 };
    engine
        .system_mut(home)
        .unwrap()
        .planets
        .push(make_planet(body, PlanetType::GasGiant, 300.0, 0.0));
    {
        let probe = &mut engine.universe.probes[0];
        probe.body_id = body;
        probe.location = LocationKind::Orbiting;
    }

    let fuel_before = engine.universe.probes[0].fuel_kg;
    let report = engine.step(&actions_for(probe_id, Action::Land));
    let (_, outcome) = &report.results[0];
    assert!(!outcome.success);
    assert!(outcome
        .error
        .as_deref()
        .unwrap()
        .contains("gas or ice giant"));
    let probe = engine.universe.probe(probe_id).unwrap();
    assert_eq!(probe.location, LocationKind::Orbiting);
    assert!(
        (probe.fuel_kg - fuel_before).abs() < 1e-6,
        "rejection must not burn fuel"
    );
}

/// A 1-ly hop at 0.15c arrives in a plausible tick window with less fuel
/// than it left with.
#[test]
fn travel_arrival_window() {
    let mut engine = Engine::new(42);
    let probe_id = engine.universe.probes[0].id;
    assert!(
        (engine.universe.probes[0].rates.max_speed_c - 0.15).abs() < 1e-9,
        "seed probe cruises at 0.15c"
    );

    // Place a synthetic target exactly 1 ly out, registered in the origin
    // sector.
    let start = engine.universe.probes[0].position;
    let target_sector = Sector(0, 0, 0);
    let mut target = engine.sectors[&target_sector][0].clone();
    target.id = Uid { hi: 901, lo: 1 };
    target.position = start.add(Vec3::new(1.0, 0.0, 0.0));
    engine.sectors.get_mut(&target_sector).unwrap().push(target);

    let fuel_before = engine.universe.probes[0].fuel_kg;
    let report = engine.step(&actions_for(
        probe_id,
        Action::TravelToSystem {
            system: Uid { hi: 901, lo: 1 },
            sector: target_sector,
        },
    ));
    assert!(report.results[0].1.success);
    assert_eq!(
        engine.universe.probe(probe_id).unwrap().status,
        ProbeStatus::Traveling
    );

    let empty = BTreeMap::new();
    let mut ticks: u64 = 1;
    while engine.universe.probe(probe_id).unwrap().status == ProbeStatus::Traveling {
        engine.step(&empty);
        ticks += 1;
        assert!(ticks < 50_000, "never arrived");
    }
    let probe = engine.universe.probe(probe_id).unwrap();
    assert_eq!(probe.status, ProbeStatus::Active, "arrived intact");
    assert_eq!(probe.location, LocationKind::InSystem);
    assert!(ticks > 1_000, "1 ly at 0.15c takes years of days: {ticks}");
    assert!(ticks < 50_000);
    assert!(probe.fuel_kg < fuel_before);
}

/// Replication consumes the stockpile, forks a child with inherited-but-
/// mutated identity, and appends a lineage entry.
#[test]
fn replication_and_lineage() {
    let mut engine = Engine::new(42);
    let parent_id = engine.universe.probes[0].id;
    engine.universe.probes[0].resources = REPLICATION_COST;
    let parent_fidelity = engine.universe.probes[0].earth_memories[0].fidelity;

    let report = engine.step(&actions_for(parent_id, Action::Replicate));
    assert!(report.results[0].1.success);
    assert_eq!(
        engine.universe.probe(parent_id).unwrap().status,
        ProbeStatus::Replicating
    );

    let empty = BTreeMap::new();
    let mut ticks = 0u32;
    while engine.universe.probes.len() < 2 {
        engine.step(&empty);
        ticks += 1;
        assert!(ticks < 500, "replication never completed");
    }

    let parent = engine.universe.probe(parent_id).unwrap().clone();
    let child = engine
        .universe
        .probes
        .iter()
        .find(|p| p.parent_id == parent_id)
        .expect("child probe")
        .clone();

    assert_eq!(child.generation, parent.generation + 1);
    assert!(
        (child.earth_memories[0].fidelity - parent_fidelity * 0.7).abs() < 1e-9,
        "earth memories attenuate by 0.7 per generation"
    );
    let p = parent.personality;
    let c = child.personality;
    let differs = (c.curiosity - p.curiosity).abs() > 1e-12
        || (c.caution - p.caution).abs() > 1e-12
        || (c.sociability - p.sociability).abs() > 1e-12
        || (c.ambition - p.ambition).abs() > 1e-12
        || (c.empathy - p.empathy).abs() > 1e-12;
    assert!(differs, "mutation must move at least one trait");

    let entry = engine
        .lineage
        .iter()
        .find(|e| e.child_id == child.id)
        .expect("lineage entry");
    assert_eq!(entry.parent_id, parent_id);
    assert_eq!(entry.generation, child.generation);
    assert_eq!(entry.birth_tick, child.created_tick);
}

/// Two probes 30 ly apart with 15-ly radios cannot talk until a 20-ly relay
/// sits between them.
#[test]
fn relay_path_bridges_the_gap() {
    let mut engine = Engine::new(42);
    {
        let probe = &mut engine.universe.probes[0];
        probe.tech[TechDomain::Communication.index()] = 2; // 15 ly range
        probe.recompute_rates();
        probe.position = Vec3::ZERO;
    }
    let mut far = engine.universe.probes[0].clone();
    far.id = Uid { hi: 902, lo: 1 };
    far.name = "Distant".to_string();
    far.position = Vec3::new(30.0, 0.0, 0.0);
    engine.universe.probes.push(far);

    let a = engine.universe.probes[0].clone();
    let b = engine.universe.probes[1].clone();
    assert!(
        comm_check_reachable(&a, &b, &engine.comms.relays).is_none(),
        "30 ly exceeds a 15 ly radio"
    );

    engine.comms.relays.push(Relay {
        id: 0,
        system_id: Uid::ZERO,
        position: Vec3::new(15.0, 0.0, 0.0),
        range_ly: 20.0,
    });
    let via = comm_check_reachable(&a, &b, &engine.comms.relays)
        .expect("mid-way relay must bridge");
    assert!((via - 30.0).abs() < 1e-6);

    engine.comms.relays.clear();
    assert!(comm_check_reachable(&a, &b, &engine.comms.relays).is_none());
}
