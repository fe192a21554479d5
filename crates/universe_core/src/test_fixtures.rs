//! Shared fixtures for unit and integration tests.

use crate::engine::Engine;
use crate::types::{
    LocationKind, Planet, PlanetType, Probe, ProbeStatus, ResourceKind, Sector, Uid, Vec3,
    RESOURCE_COUNT, SURVEY_LEVELS,
};

/// A standalone copy of the freshly initialised seed probe.
pub fn seed_probe() -> Probe {
    Engine::new(42).universe.probes[0].clone()
}

/// Spawn an extra probe cloned from the seed probe at a fixed position,
/// returning its id.
pub fn spawn_probe_at(engine: &mut Engine, position: Vec3) -> Uid {
    let mut probe = engine.universe.probes[0].clone();
    probe.id = engine_uid(engine);
    probe.name = format!("Probe-{}", engine.universe.probes.len());
    probe.parent_id = Uid::ZERO;
    probe.position = position;
    probe.status = ProbeStatus::Active;
    probe.location = LocationKind::InSystem;
    probe.relationships.clear();
    probe.memories.clear();
    let id = probe.id;
    engine.universe.probes.push(probe);
    id
}

fn engine_uid(engine: &mut Engine) -> Uid {
    // Tests that use this do not depend on main-stream alignment afterwards.
    let mut throwaway = crate::rng::EngineRng::derive(
        engine.universe.seed,
        engine.universe.probes.len() as i64,
        0x7e57,
        0,
    );
    throwaway.generate_uid()
}

/// Install a synthetic planet with a known type, mass, and iron abundance
/// into the seed probe's home system; returns (system, body) ids.
pub fn install_planet(
    engine: &mut Engine,
    kind: PlanetType,
    mass_earth: f64,
    iron_abundance: f64,
) -> (Uid, Uid) {
    let system_id = engine.universe.probes[0].system_id;
    let body_id = engine_uid(engine);
    let mut resources = [0.1; RESOURCE_COUNT];
    resources[ResourceKind::Iron.index()] = iron_abundance;
    let planet = Planet {
        id: body_id,
        name: "Testbed".to_string(),
        kind,
        mass_earth,
        radius_earth: mass_earth.powf(0.27),
        orbital_radius_au: 1.0,
        orbital_period_days: 365.25,
        eccentricity: 0.02,
        obliquity_deg: 23.0,
        rotation_hours: 24.0,
        surface_temp_k: 288.0,
        atmosphere_bar: 1.0,
        water_coverage: 0.3,
        magnetic_field_gauss: 0.5,
        resources,
        habitability: 0.6,
        surveyed: [false; SURVEY_LEVELS],
        discovered_by: Uid::ZERO,
        discovered_tick: 0,
        artifact: None,
    };
    engine
        .system_mut(system_id)
        .expect("home system must be materialised")
        .planets
        .push(planet);
    (system_id, body_id)
}

/// A system other than the probe's own, close enough to travel to quickly;
/// returns (system id, sector).
pub fn nearby_system(engine: &mut Engine) -> (Uid, Sector) {
    let origin = Sector(0, 0, 0);
    engine.ensure_sector(origin);
    let own = engine.universe.probes[0].system_id;
    if let Some(system) = engine.sectors[&origin].iter().find(|s| s.id != own) {
        return (system.id, origin);
    }
    let next = Sector(1, 0, 0);
    engine.ensure_sector(next);
    (engine.sectors[&next][0].id, next)
}
