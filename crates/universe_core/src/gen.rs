//! Deterministic star-system synthesis.
//!
//! `generate_sector(seed, coord)` is a pure function: the same seed and
//! coordinate always produce byte-identical systems. All draws come from a
//! substream derived from seed+coordinate, never from the main engine
//! stream.

use crate::rng::EngineRng;
use crate::types::{
    Artifact, ArtifactKind, Planet, PlanetType, ResourceKind, Sector, SpectralClass, Star,
    StarSystem, Uid, Vec3, RESOURCE_COUNT, SECTOR_SIZE_LY, SURVEY_LEVELS,
};

/// Hard cap on systems per sector; the core never exceeds it.
pub const MAX_SYSTEMS_PER_SECTOR: usize = 12;

const STAR_NAMES: &[&str] = &[
    "Achird", "Baten", "Caph", "Dabih", "Errai", "Furud", "Gienah", "Hamal", "Izar", "Jabbah",
    "Keid", "Lesath", "Maia", "Nashira", "Okul", "Phact", "Rotanev", "Sadr", "Tarazed", "Unukal",
    "Vindem", "Wasat", "Yildun", "Zaniah",
];

const ARTIFACT_DESCRIPTIONS: &[&str] = &[
    "a lattice of self-repairing filaments humming at radio frequencies",
    "a buried vault of refined isotopes, stacked with impossible precision",
    "an etched basalt slab mapping stars that no longer exist",
    "a crystalline antenna array still tracking something beyond the halo",
];

/// Classical habitable-zone bounds in AU for a star of luminosity `l`
/// (solar units): inner ≈ 0.95·√L, outer ≈ 1.37·√L.
pub fn habitable_zone(luminosity_solar: f64) -> (f64, f64) {
    let root = luminosity_solar.max(0.0).sqrt();
    (0.95 * root, 1.37 * root)
}

/// Generate every system in a sector. Star density falls off with
/// galactocentric distance: dense near the origin, sparse in the halo.
pub fn generate_sector(seed: u64, sector: Sector) -> Vec<StarSystem> {
    let mut rng = EngineRng::derive(seed, sector.0, sector.1, sector.2);

    let expected = 6.0 * (-sector.distance_from_core() / 40.0).exp() + 0.5;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let mut count = expected.floor() as usize;
    if rng.uniform_unit() < expected.fract() {
        count += 1;
    }
    count = count.clamp(1, MAX_SYSTEMS_PER_SECTOR);

    let origin = sector.origin_ly();
    let mut systems = Vec::with_capacity(count);
    for _ in 0..count {
        let position = Vec3::new(
            origin.x + rng.range_f64(0.0, SECTOR_SIZE_LY),
            origin.y + rng.range_f64(0.0, SECTOR_SIZE_LY),
            origin.z + rng.range_f64(0.0, SECTOR_SIZE_LY),
        );
        systems.push(generate_system(&mut rng, sector, position));
    }
    systems
}

fn generate_system(rng: &mut EngineRng, sector: Sector, position: Vec3) -> StarSystem {
    let id = rng.generate_uid();
    let base = STAR_NAMES[rng.range(STAR_NAMES.len() as u64) as usize];
    let name = format!("{base}-{:03}", rng.range(1000));

    let star = generate_star(rng, &name);
    let luminosity = star.luminosity_solar;

    // Every system carries at least one body worth visiting.
    let planet_count = 1 + rng.range(8) as usize;
    let mut planets = Vec::with_capacity(planet_count);
    for orbit_index in 0..planet_count {
        planets.push(generate_planet(rng, &name, luminosity, orbit_index));
    }

    StarSystem {
        id,
        name,
        sector,
        position,
        stars: vec![star],
        planets,
        visited: false,
        first_visit_tick: None,
    }
}

fn sample_spectral_class(rng: &mut EngineRng) -> SpectralClass {
    // M dominates (>40%), O is very rare (<2%); compact remnants fill the
    // tail. Weights sum to 1.
    const WEIGHTS: [(SpectralClass, f64); 10] = [
        (SpectralClass::M, 0.45),
        (SpectralClass::K, 0.18),
        (SpectralClass::G, 0.10),
        (SpectralClass::F, 0.07),
        (SpectralClass::A, 0.04),
        (SpectralClass::B, 0.025),
        (SpectralClass::O, 0.015),
        (SpectralClass::WhiteDwarf, 0.06),
        (SpectralClass::Neutron, 0.03),
        (SpectralClass::BlackHole, 0.03),
    ];
    let mut roll = rng.uniform_unit();
    for (class, weight) in WEIGHTS {
        if roll < weight {
            return class;
        }
        roll -= weight;
    }
    SpectralClass::M
}

fn generate_star(rng: &mut EngineRng, system_name: &str) -> Star {
    let class = sample_spectral_class(rng);

    let (mass_lo, mass_hi, temp_lo, temp_hi): (f64, f64, f64, f64) = match class {
        SpectralClass::O => (16.0, 60.0, 30_000.0, 50_000.0),
        SpectralClass::B => (2.1, 16.0, 10_000.0, 30_000.0),
        SpectralClass::A => (1.4, 2.1, 7_500.0, 10_000.0),
        SpectralClass::F => (1.04, 1.4, 6_000.0, 7_500.0),
        SpectralClass::G => (0.8, 1.04, 5_200.0, 6_000.0),
        SpectralClass::K => (0.45, 0.8, 3_700.0, 5_200.0),
        SpectralClass::M => (0.08, 0.45, 2_400.0, 3_700.0),
        SpectralClass::WhiteDwarf => (0.5, 1.2, 8_000.0, 40_000.0),
        SpectralClass::Neutron => (1.4, 2.0, 500_000.0, 1_000_000.0),
        SpectralClass::BlackHole => (3.0, 30.0, 0.0, 1.0),
    };

    let mass_solar = rng.range_f64(mass_lo, mass_hi);
    let temperature_k = rng.range_f64(temp_lo, temp_hi.max(temp_lo + 1.0));

    // Main-sequence mass-luminosity relation L ∝ M^3.5; remnants are dim.
    let luminosity_solar = match class {
        SpectralClass::WhiteDwarf => rng.range_f64(0.0001, 0.01),
        SpectralClass::Neutron | SpectralClass::BlackHole => rng.range_f64(0.000_01, 0.001),
        _ => mass_solar.powf(3.5) * rng.range_f64(0.85, 1.15),
    };

    Star {
        id: rng.generate_uid(),
        name: format!("{system_name} A"),
        class,
        mass_solar,
        luminosity_solar,
        temperature_k,
        age_gyr: rng.range_f64(0.1, 12.0),
        metallicity: (0.02 + rng.gaussian(0.0, 0.01)).max(0.0001),
        position: Vec3::ZERO,
    }
}

#[allow(clippy::too_many_lines)]
fn generate_planet(
    rng: &mut EngineRng,
    system_name: &str,
    luminosity_solar: f64,
    orbit_index: usize,
) -> Planet {
    // Titius-Bode-like spacing with jitter.
    let orbital_radius_au =
        (0.25 * 1.6_f64.powi(orbit_index as i32) + rng.range_f64(-0.05, 0.05)).max(0.05);
    // Kepler's third law in AU/years, rendered in days.
    let orbital_period_days = 365.25 * orbital_radius_au.powf(1.5);

    // Log-uniform mass, 0.05 to ~2000 Earth masses.
    let mass_earth = 10.0_f64.powf(rng.range_f64(-1.3, 3.3));
    let surface_temp_k = 278.0 * luminosity_solar.max(1e-6).powf(0.25) / orbital_radius_au.sqrt();
    let water_roll = rng.uniform_unit();
    let kind = classify_planet(rng, mass_earth, surface_temp_k, water_roll, orbital_radius_au);

    // Giants stay above 5 M⊕, rocky worlds below 3.
    let mass_earth = match kind {
        PlanetType::GasGiant => mass_earth.max(80.0),
        PlanetType::IceGiant => mass_earth.clamp(5.5, 80.0),
        PlanetType::SuperEarth => mass_earth.clamp(3.0, 5.0),
        _ => mass_earth.min(2.9),
    };

    let radius_earth = match kind {
        PlanetType::GasGiant => mass_earth.powf(-0.04) * 11.0,
        PlanetType::IceGiant => mass_earth.powf(0.06) * 2.0,
        _ => mass_earth.powf(0.27),
    };

    let atmosphere_bar = match kind {
        PlanetType::GasGiant | PlanetType::IceGiant => rng.range_f64(100.0, 10_000.0),
        PlanetType::Lava => rng.range_f64(0.0, 90.0),
        PlanetType::Rogue | PlanetType::Ice => rng.range_f64(0.0, 0.1),
        _ => rng.range_f64(0.0, 3.0),
    };

    let water_coverage = match kind {
        PlanetType::Ocean => rng.range_f64(0.7, 1.0),
        PlanetType::Ice => rng.range_f64(0.3, 0.9),
        PlanetType::Rocky | PlanetType::SuperEarth => {
            if (240.0..=330.0).contains(&surface_temp_k) {
                rng.range_f64(0.0, 0.7)
            } else {
                rng.range_f64(0.0, 0.05)
            }
        }
        _ => 0.0,
    };

    let habitability = habitability_index(
        luminosity_solar,
        orbital_radius_au,
        surface_temp_k,
        water_coverage,
        atmosphere_bar,
        kind,
    );

    let artifact = if rng.uniform_unit() < 0.01 {
        Some(generate_artifact(rng))
    } else {
        None
    };

    Planet {
        id: rng.generate_uid(),
        name: format!("{system_name} {}", roman(orbit_index + 1)),
        kind,
        mass_earth,
        radius_earth,
        orbital_radius_au,
        orbital_period_days,
        eccentricity: rng.range_f64(0.0, 0.95),
        obliquity_deg: rng.range_f64(0.0, 90.0),
        rotation_hours: rng.range_f64(4.0, 2_000.0),
        surface_temp_k,
        atmosphere_bar,
        water_coverage,
        magnetic_field_gauss: rng.range_f64(0.0, 2.0),
        resources: resource_abundances(rng, kind),
        habitability,
        surveyed: [false; SURVEY_LEVELS],
        discovered_by: Uid::ZERO,
        discovered_tick: 0,
        artifact,
    }
}

fn classify_planet(
    rng: &mut EngineRng,
    mass_earth: f64,
    surface_temp_k: f64,
    water_roll: f64,
    orbital_radius_au: f64,
) -> PlanetType {
    if mass_earth > 50.0 {
        return PlanetType::GasGiant;
    }
    if mass_earth > 5.0 {
        return PlanetType::IceGiant;
    }
    if mass_earth > 3.0 {
        return PlanetType::SuperEarth;
    }
    // Rocky family, resolved by environment with rare exotic compositions.
    if orbital_radius_au > 40.0 && rng.uniform_unit() < 0.3 {
        return PlanetType::Rogue;
    }
    let exotic = rng.uniform_unit();
    if exotic < 0.04 {
        return PlanetType::Carbon;
    }
    if exotic < 0.08 {
        return PlanetType::Iron;
    }
    if surface_temp_k > 700.0 {
        PlanetType::Lava
    } else if surface_temp_k < 150.0 {
        PlanetType::Ice
    } else if water_roll > 0.65 && (230.0..=350.0).contains(&surface_temp_k) {
        PlanetType::Ocean
    } else if water_roll < 0.15 {
        PlanetType::Desert
    } else {
        PlanetType::Rocky
    }
}

fn habitability_index(
    luminosity_solar: f64,
    orbital_radius_au: f64,
    surface_temp_k: f64,
    water_coverage: f64,
    atmosphere_bar: f64,
    kind: PlanetType,
) -> f64 {
    if !kind.landable() || matches!(kind, PlanetType::Lava | PlanetType::Rogue) {
        return 0.0;
    }
    let (inner, outer) = habitable_zone(luminosity_solar);
    let in_zone = orbital_radius_au >= inner && orbital_radius_au <= outer;
    if !in_zone {
        return 0.0;
    }
    let temp_factor = (-((surface_temp_k - 288.0) / 60.0).powi(2)).exp();
    let atmosphere_factor = if (0.1..=5.0).contains(&atmosphere_bar) {
        1.0
    } else {
        0.2
    };
    (temp_factor * atmosphere_factor * (0.3 + 0.7 * water_coverage)).clamp(0.0, 1.0)
}

fn resource_abundances(rng: &mut EngineRng, kind: PlanetType) -> [f64; RESOURCE_COUNT] {
    let mut base = [0.0; RESOURCE_COUNT];
    let set = |base: &mut [f64; RESOURCE_COUNT], kind: ResourceKind, value: f64| {
        base[kind.index()] = value;
    };
    match kind {
        PlanetType::GasGiant => {
            set(&mut base, ResourceKind::Hydrogen, 0.9);
            set(&mut base, ResourceKind::Helium3, 0.4);
        }
        PlanetType::IceGiant => {
            set(&mut base, ResourceKind::Hydrogen, 0.6);
            set(&mut base, ResourceKind::Water, 0.5);
            set(&mut base, ResourceKind::Helium3, 0.2);
        }
        PlanetType::Iron => {
            set(&mut base, ResourceKind::Iron, 0.9);
            set(&mut base, ResourceKind::Uranium, 0.2);
            set(&mut base, ResourceKind::RareEarth, 0.3);
        }
        PlanetType::Carbon => {
            set(&mut base, ResourceKind::Carbon, 0.9);
            set(&mut base, ResourceKind::Silicon, 0.3);
        }
        PlanetType::Ocean => {
            set(&mut base, ResourceKind::Water, 0.95);
            set(&mut base, ResourceKind::Hydrogen, 0.2);
        }
        PlanetType::Ice => {
            set(&mut base, ResourceKind::Water, 0.8);
            set(&mut base, ResourceKind::Helium3, 0.1);
        }
        PlanetType::Lava => {
            set(&mut base, ResourceKind::Iron, 0.5);
            set(&mut base, ResourceKind::RareEarth, 0.4);
            set(&mut base, ResourceKind::Uranium, 0.3);
        }
        PlanetType::Rocky | PlanetType::SuperEarth | PlanetType::Desert | PlanetType::Rogue => {
            set(&mut base, ResourceKind::Iron, 0.5);
            set(&mut base, ResourceKind::Silicon, 0.5);
            set(&mut base, ResourceKind::Carbon, 0.2);
            set(&mut base, ResourceKind::Water, 0.1);
            set(&mut base, ResourceKind::RareEarth, 0.1);
            set(&mut base, ResourceKind::Uranium, 0.05);
        }
    }
    for value in &mut base {
        let jitter = rng.range_f64(-0.1, 0.1);
        *value = (*value + jitter).clamp(0.0, 1.0);
    }
    // A trace of the exotic everywhere, concentrated nowhere.
    base[ResourceKind::Exotic.index()] = rng.range_f64(0.0, 0.05);
    base
}

fn generate_artifact(rng: &mut EngineRng) -> Artifact {
    let kind = match rng.range(4) {
        0 => ArtifactKind::TechBoost,
        1 => ArtifactKind::ResourceCache,
        2 => ArtifactKind::StarMap,
        _ => ArtifactKind::CommAmplifier,
    };
    let description =
        ARTIFACT_DESCRIPTIONS[rng.range(ARTIFACT_DESCRIPTIONS.len() as u64) as usize].to_string();
    Artifact {
        kind,
        magnitude: rng.range_f64(0.5, 3.0),
        description,
        discovered: false,
    }
}

fn roman(n: usize) -> String {
    const NUMERALS: [(usize, &str); 9] = [
        (100, "C"),
        (90, "XC"),
        (50, "L"),
        (40, "XL"),
        (10, "X"),
        (9, "IX"),
        (5, "V"),
        (4, "IV"),
        (1, "I"),
    ];
    let mut remaining = n;
    let mut out = String::new();
    for (value, token) in NUMERALS {
        while remaining >= value {
            out.push_str(token);
            remaining -= value;
        }
    }
    out
}
