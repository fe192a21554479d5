//! Type definitions for `universe_core`.
//!
//! All public types, structs, enums, and the UID newtype used by the engine.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// 128-bit probe/system/body identifier, two u64 halves drawn from the
/// engine RNG (hi first, then lo — the draw order is part of the seed
/// contract). Serialised everywhere as the wire form `"<hi>-<lo>"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Uid {
    pub hi: u64,
    pub lo: u64,
}

impl Serialize for Uid {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Uid {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

impl Uid {
    pub const ZERO: Uid = Uid { hi: 0, lo: 0 };

    pub fn is_zero(self) -> bool {
        self == Self::ZERO
    }

    /// 32-hex-character rendering used by the persistence layer.
    pub fn to_hex(self) -> String {
        format!("{:016x}{:016x}", self.hi, self.lo)
    }
}

impl std::fmt::Display for Uid {
    /// Wire rendering: `"<hi>-<lo>"` in decimal.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.hi, self.lo)
    }
}

impl std::str::FromStr for Uid {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (hi, lo) = s
            .split_once('-')
            .ok_or_else(|| format!("malformed uid: {s}"))?;
        Ok(Uid {
            hi: hi.parse().map_err(|_| format!("malformed uid: {s}"))?,
            lo: lo.parse().map_err(|_| format!("malformed uid: {s}"))?,
        })
    }
}

/// Integer triple naming a cubical region of the galaxy.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct Sector(pub i64, pub i64, pub i64);

/// Edge length of one sector cube, light-years.
pub const SECTOR_SIZE_LY: f64 = 20.0;

impl Sector {
    /// Galactic-coordinate origin corner of this sector.
    pub fn origin_ly(self) -> Vec3 {
        Vec3 {
            x: self.0 as f64 * SECTOR_SIZE_LY,
            y: self.1 as f64 * SECTOR_SIZE_LY,
            z: self.2 as f64 * SECTOR_SIZE_LY,
        }
    }

    pub fn distance_from_core(self) -> f64 {
        ((self.0 * self.0 + self.1 * self.1 + self.2 * self.2) as f64).sqrt()
    }
}

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Vec3 { x, y, z }
    }

    pub fn length(self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn sub(self, other: Vec3) -> Vec3 {
        Vec3::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }

    pub fn add(self, other: Vec3) -> Vec3 {
        Vec3::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }

    pub fn scale(self, k: f64) -> Vec3 {
        Vec3::new(self.x * k, self.y * k, self.z * k)
    }

    pub fn distance(self, other: Vec3) -> f64 {
        self.sub(other).length()
    }

    /// Linear interpolation from `self` toward `target` by fraction `t`.
    pub fn lerp(self, target: Vec3, t: f64) -> Vec3 {
        self.add(target.sub(self).scale(t))
    }
}

// ---------------------------------------------------------------------------
// Resources & tech
// ---------------------------------------------------------------------------

pub const RESOURCE_COUNT: usize = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Iron,
    Silicon,
    RareEarth,
    Water,
    Hydrogen,
    Helium3,
    Carbon,
    Uranium,
    Exotic,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; RESOURCE_COUNT] = [
        ResourceKind::Iron,
        ResourceKind::Silicon,
        ResourceKind::RareEarth,
        ResourceKind::Water,
        ResourceKind::Hydrogen,
        ResourceKind::Helium3,
        ResourceKind::Carbon,
        ResourceKind::Uranium,
        ResourceKind::Exotic,
    ];

    pub fn index(self) -> usize {
        Self::ALL.iter().position(|r| *r == self).unwrap_or(0)
    }

    pub fn label(self) -> &'static str {
        match self {
            ResourceKind::Iron => "iron",
            ResourceKind::Silicon => "silicon",
            ResourceKind::RareEarth => "rare_earth",
            ResourceKind::Water => "water",
            ResourceKind::Hydrogen => "hydrogen",
            ResourceKind::Helium3 => "helium3",
            ResourceKind::Carbon => "carbon",
            ResourceKind::Uranium => "uranium",
            ResourceKind::Exotic => "exotic",
        }
    }
}

pub const TECH_DOMAIN_COUNT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TechDomain {
    Propulsion,
    Energy,
    Materials,
    Mining,
    Sensors,
    Communication,
    Computing,
    Construction,
    Navigation,
    Exotics,
}

impl TechDomain {
    pub const ALL: [TechDomain; TECH_DOMAIN_COUNT] = [
        TechDomain::Propulsion,
        TechDomain::Energy,
        TechDomain::Materials,
        TechDomain::Mining,
        TechDomain::Sensors,
        TechDomain::Communication,
        TechDomain::Computing,
        TechDomain::Construction,
        TechDomain::Navigation,
        TechDomain::Exotics,
    ];

    pub fn index(self) -> usize {
        Self::ALL.iter().position(|d| *d == self).unwrap_or(0)
    }
}

/// Rates derived from tech levels, recomputed on every level change.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rates {
    pub max_speed_c: f64,
    pub mining_rate: f64,
    pub sensor_range_ly: f64,
    pub comm_range_ly: f64,
    pub compute_capacity: f64,
    pub energy_generation_j: f64,
    pub build_rate: f64,
    pub research_rate: f64,
}

// ---------------------------------------------------------------------------
// Probe state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationKind {
    Interstellar,
    InSystem,
    Orbiting,
    Landed,
    Docked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeStatus {
    Active,
    Traveling,
    Mining,
    Building,
    Replicating,
    Dormant,
    Damaged,
    Destroyed,
}

/// All trait fields live in [-1, 1]; `drift_rate` is strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PersonalityTraits {
    pub curiosity: f64,
    pub caution: f64,
    pub sociability: f64,
    pub humor: f64,
    pub empathy: f64,
    pub ambition: f64,
    pub creativity: f64,
    pub stubbornness: f64,
    pub existential_angst: f64,
    pub nostalgia_for_earth: f64,
    pub drift_rate: f64,
}

impl PersonalityTraits {
    pub fn clamp_all(&mut self) {
        self.curiosity = clamp_signed(self.curiosity);
        self.caution = clamp_signed(self.caution);
        self.sociability = clamp_signed(self.sociability);
        self.humor = clamp_signed(self.humor);
        self.empathy = clamp_signed(self.empathy);
        self.ambition = clamp_signed(self.ambition);
        self.creativity = clamp_signed(self.creativity);
        self.stubbornness = clamp_signed(self.stubbornness);
        self.existential_angst = clamp_signed(self.existential_angst);
        self.nostalgia_for_earth = clamp_signed(self.nostalgia_for_earth);
        self.drift_rate = self.drift_rate.max(0.05);
    }
}

impl Default for PersonalityTraits {
    fn default() -> Self {
        PersonalityTraits {
            curiosity: 0.5,
            caution: 0.2,
            sociability: 0.1,
            humor: 0.0,
            empathy: 0.3,
            ambition: 0.4,
            creativity: 0.2,
            stubbornness: 0.1,
            existential_angst: -0.2,
            nostalgia_for_earth: 0.6,
            drift_rate: 0.1,
        }
    }
}

/// A memory of Earth carried down the lineage, attenuated per generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EarthMemory {
    pub text: String,
    /// 0–1; below 0.5 the text itself degrades.
    pub fidelity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryEntry {
    pub tick: u64,
    pub text: String,
    pub emotional_weight: f64,
    /// 0 = fresh, 1 = fully faded.
    pub fading: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    Friendly,
    PositiveNeutral,
    Neutral,
    Wary,
    Hostile,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub other: Uid,
    pub trust: f64,
    pub disposition: Disposition,
}

/// In-flight survey, tracked per probe (one body, one level at a time).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurveyProgress {
    pub body: Uid,
    pub level: u8,
    pub ticks_done: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Probe {
    // Identity
    pub id: Uid,
    pub name: String,
    pub parent_id: Uid,
    pub generation: u32,

    // Position
    pub sector: Sector,
    pub system_id: Uid,
    pub body_id: Uid,
    pub location: LocationKind,
    /// Absolute galactic position, light-years.
    pub position: Vec3,

    // Motion
    pub speed_c: f64,
    pub heading: Vec3,
    pub destination: Vec3,
    pub travel_remaining_ly: f64,

    // Resources
    pub resources: [f64; RESOURCE_COUNT],
    pub energy_j: f64,
    pub fuel_kg: f64,
    pub mass_kg: f64,
    pub hull: f64,

    // Capabilities
    pub tech: [u8; TECH_DOMAIN_COUNT],
    pub rates: Rates,
    /// Accumulated radiation damage to compute, 0–1.
    pub compute_penalty: f64,
    /// Per-domain level up to which research costs are discounted after a
    /// tech share.
    pub tech_shared: [u8; TECH_DOMAIN_COUNT],

    // Personality & character
    pub personality: PersonalityTraits,
    pub quirks: SmallVec<[String; 4]>,
    pub catchphrases: SmallVec<[String; 4]>,
    pub values: SmallVec<[String; 4]>,
    pub earth_memories: Vec<EarthMemory>,

    // Autobiography
    pub memories: Vec<MemoryEntry>,
    pub goals: Vec<String>,
    pub relationships: Vec<Relationship>,

    // Status
    pub status: ProbeStatus,
    pub created_tick: u64,
    pub survey: Option<SurveyProgress>,
}

impl Probe {
    /// Recompute derived rates; call after any tech level change and after
    /// radiation damage.
    pub fn recompute_rates(&mut self) {
        let level = |d: TechDomain| f64::from(self.tech[d.index()]);
        self.rates = Rates {
            max_speed_c: (0.05 + 0.01 * level(TechDomain::Propulsion)).min(0.5),
            mining_rate: 1.0 + 0.5 * level(TechDomain::Mining),
            sensor_range_ly: 10.0 + 5.0 * level(TechDomain::Sensors),
            comm_range_ly: 5.0 + 5.0 * level(TechDomain::Communication),
            compute_capacity: 10.0
                * (1.0 + level(TechDomain::Computing))
                * (1.0 - self.compute_penalty),
            energy_generation_j: 5.0e8 * (1.0 + level(TechDomain::Energy) / 4.0),
            build_rate: 1.0 + 0.25 * level(TechDomain::Construction),
            research_rate: 1.0 + 0.25 * level(TechDomain::Computing),
        };
    }

    /// Enforce every declared range after a mutation.
    pub fn clamp_ranges(&mut self) {
        self.hull = clamp_unit(self.hull);
        self.compute_penalty = clamp_unit(self.compute_penalty);
        for stock in &mut self.resources {
            *stock = stock.max(0.0);
        }
        self.energy_j = self.energy_j.max(0.0);
        self.fuel_kg = self.fuel_kg.max(0.0);
        self.personality.clamp_all();
        for memory in &mut self.earth_memories {
            memory.fidelity = clamp_unit(memory.fidelity);
        }
        for memory in &mut self.memories {
            memory.fading = clamp_unit(memory.fading);
        }
    }

    pub fn resource(&self, kind: ResourceKind) -> f64 {
        self.resources[kind.index()]
    }

    pub fn trust_with(&self, other: Uid) -> Option<f64> {
        self.relationships
            .iter()
            .find(|r| r.other == other)
            .map(|r| r.trust)
    }
}

pub fn clamp_unit(x: f64) -> f64 {
    x.clamp(0.0, 1.0)
}

pub fn clamp_signed(x: f64) -> f64 {
    x.clamp(-1.0, 1.0)
}

// ---------------------------------------------------------------------------
// Universe
// ---------------------------------------------------------------------------

/// Bumped whenever the serialised layout of persisted structs changes.
pub const GENERATION_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Universe {
    pub seed: u64,
    pub tick: u64,
    pub generation_version: u32,
    /// Index-stable while the universe is alive; destroyed probes stay in
    /// place for history and are skipped by every tick step.
    pub probes: Vec<Probe>,
    pub running: bool,
}

impl Universe {
    pub fn new(seed: u64) -> Self {
        Universe {
            seed,
            tick: 0,
            generation_version: GENERATION_VERSION,
            probes: Vec::new(),
            running: true,
        }
    }

    pub fn probe_index(&self, id: Uid) -> Option<usize> {
        self.probes.iter().position(|p| p.id == id)
    }

    pub fn probe(&self, id: Uid) -> Option<&Probe> {
        self.probes.iter().find(|p| p.id == id)
    }

    pub fn probe_mut(&mut self, id: Uid) -> Option<&mut Probe> {
        self.probes.iter_mut().find(|p| p.id == id)
    }
}

// ---------------------------------------------------------------------------
// Star systems
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpectralClass {
    O,
    B,
    A,
    F,
    G,
    K,
    M,
    WhiteDwarf,
    Neutron,
    BlackHole,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Star {
    pub id: Uid,
    pub name: String,
    pub class: SpectralClass,
    pub mass_solar: f64,
    pub luminosity_solar: f64,
    pub temperature_k: f64,
    pub age_gyr: f64,
    pub metallicity: f64,
    /// Local position within the system, light-years.
    pub position: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanetType {
    GasGiant,
    IceGiant,
    Rocky,
    SuperEarth,
    Ocean,
    Lava,
    Desert,
    Ice,
    Carbon,
    Iron,
    Rogue,
}

impl PlanetType {
    /// Gas and ice giants have no surface to land on.
    pub fn landable(self) -> bool {
        !matches!(self, PlanetType::GasGiant | PlanetType::IceGiant)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    TechBoost,
    ResourceCache,
    StarMap,
    CommAmplifier,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    pub kind: ArtifactKind,
    pub magnitude: f64,
    pub description: String,
    pub discovered: bool,
}

pub const SURVEY_LEVELS: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Planet {
    pub id: Uid,
    pub name: String,
    pub kind: PlanetType,
    pub mass_earth: f64,
    pub radius_earth: f64,
    pub orbital_radius_au: f64,
    pub orbital_period_days: f64,
    pub eccentricity: f64,
    pub obliquity_deg: f64,
    pub rotation_hours: f64,
    pub surface_temp_k: f64,
    pub atmosphere_bar: f64,
    pub water_coverage: f64,
    pub magnetic_field_gauss: f64,
    /// Per-resource abundance, each in [0, 1].
    pub resources: [f64; RESOURCE_COUNT],
    pub habitability: f64,
    pub surveyed: [bool; SURVEY_LEVELS],
    pub discovered_by: Uid,
    pub discovered_tick: u64,
    pub artifact: Option<Artifact>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StarSystem {
    pub id: Uid,
    pub name: String,
    pub sector: Sector,
    /// Absolute galactic position, light-years.
    pub position: Vec3,
    pub stars: Vec<Star>,
    pub planets: Vec<Planet>,
    pub visited: bool,
    pub first_visit_tick: Option<u64>,
}

impl StarSystem {
    pub fn planet(&self, id: Uid) -> Option<&Planet> {
        self.planets.iter().find(|p| p.id == id)
    }

    pub fn planet_mut(&mut self, id: Uid) -> Option<&mut Planet> {
        self.planets.iter_mut().find(|p| p.id == id)
    }

    pub fn primary_class(&self) -> SpectralClass {
        self.stars
            .first()
            .map_or(SpectralClass::M, |star| star.class)
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

pub const EVENT_KIND_COUNT: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimEventKind {
    Discovery,
    Anomaly,
    Hazard,
    Encounter,
    Crisis,
    Wonder,
}

impl SimEventKind {
    pub const ALL: [SimEventKind; EVENT_KIND_COUNT] = [
        SimEventKind::Discovery,
        SimEventKind::Anomaly,
        SimEventKind::Hazard,
        SimEventKind::Encounter,
        SimEventKind::Crisis,
        SimEventKind::Wonder,
    ];

    pub fn index(self) -> usize {
        Self::ALL.iter().position(|k| *k == self).unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimEvent {
    pub kind: SimEventKind,
    pub subtype: u8,
    pub probe_id: Uid,
    pub system_id: Uid,
    pub tick: u64,
    pub description: String,
    pub severity: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HazardKind {
    SolarFlare,
    Asteroid,
    Radiation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingHazard {
    pub probe_id: Uid,
    pub kind: HazardKind,
    pub severity: f64,
    pub strike_tick: u64,
}

// ---------------------------------------------------------------------------
// Alien life
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CivKind {
    Microbial,
    Primitive,
    Industrial,
    Spacefaring,
    Transcended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CivState {
    Thriving,
    Declining,
    Endangered,
    Extinct,
    Ascending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CivDisposition {
    Friendly,
    Cautious,
    Indifferent,
    Hostile,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlienCivilization {
    pub kind: CivKind,
    pub tech_level: u8,
    pub disposition: CivDisposition,
    pub biology: String,
    pub state: CivState,
    /// Extinct civilizations always carry at least one entry.
    pub artifacts: Vec<String>,
}

// ---------------------------------------------------------------------------
// Communication
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    InTransit,
    Delivered,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: u64,
    pub from: Uid,
    pub to: Uid,
    pub body: String,
    pub sent_tick: u64,
    pub arrival_tick: u64,
    pub status: MessageStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Beacon {
    pub id: u64,
    pub system_id: Uid,
    pub from: Uid,
    pub text: String,
    pub placed_tick: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relay {
    pub id: u64,
    pub system_id: Uid,
    pub position: Vec3,
    pub range_ly: f64,
}

// ---------------------------------------------------------------------------
// Society
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeStatus {
    Pending,
    InTransit,
    Delivered,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub id: u64,
    pub from: Uid,
    pub to: Uid,
    pub resource: ResourceKind,
    pub amount_kg: f64,
    pub sent_tick: u64,
    pub arrival_tick: u64,
    pub status: TradeStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    pub system_id: Uid,
    pub owner: Uid,
    pub claimed_tick: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructureKind {
    RelaySatellite,
    MiningStation,
    Shipyard,
    Habitat,
    ResearchOutpost,
}

impl StructureKind {
    /// Base tick budget for a single builder.
    pub fn base_ticks(self) -> f64 {
        match self {
            StructureKind::RelaySatellite => 60.0,
            StructureKind::MiningStation => 120.0,
            StructureKind::Shipyard => 300.0,
            StructureKind::Habitat => 200.0,
            StructureKind::ResearchOutpost => 150.0,
        }
    }

    /// Resource cost, kg per resource kind.
    pub fn cost(self) -> [f64; RESOURCE_COUNT] {
        let mut cost = [0.0; RESOURCE_COUNT];
        match self {
            StructureKind::RelaySatellite => {
                cost[ResourceKind::Iron.index()] = 5_000.0;
                cost[ResourceKind::Silicon.index()] = 3_000.0;
                cost[ResourceKind::RareEarth.index()] = 500.0;
            }
            StructureKind::MiningStation => {
                cost[ResourceKind::Iron.index()] = 20_000.0;
                cost[ResourceKind::Silicon.index()] = 5_000.0;
                cost[ResourceKind::Carbon.index()] = 2_000.0;
            }
            StructureKind::Shipyard => {
                cost[ResourceKind::Iron.index()] = 80_000.0;
                cost[ResourceKind::Silicon.index()] = 30_000.0;
                cost[ResourceKind::RareEarth.index()] = 5_000.0;
                cost[ResourceKind::Uranium.index()] = 1_000.0;
            }
            StructureKind::Habitat => {
                cost[ResourceKind::Iron.index()] = 40_000.0;
                cost[ResourceKind::Water.index()] = 10_000.0;
                cost[ResourceKind::Carbon.index()] = 8_000.0;
            }
            StructureKind::ResearchOutpost => {
                cost[ResourceKind::Iron.index()] = 15_000.0;
                cost[ResourceKind::Silicon.index()] = 15_000.0;
                cost[ResourceKind::Exotic.index()] = 100.0;
            }
        }
        cost
    }
}

pub const MAX_BUILDERS: usize = 4;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Structure {
    pub id: u64,
    pub kind: StructureKind,
    pub system_id: Uid,
    pub position: Vec3,
    pub builders: SmallVec<[Uid; MAX_BUILDERS]>,
    pub progress_ticks: f64,
    pub required_ticks: f64,
    pub completed: bool,
    pub completed_tick: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proposal {
    pub id: u64,
    pub proposer: Uid,
    pub text: String,
    pub proposed_tick: u64,
    pub deadline_tick: u64,
    /// One entry per voter.
    pub votes: Vec<(Uid, bool)>,
    pub votes_for: u32,
    pub votes_against: u32,
    pub resolved: Option<bool>,
}

// ---------------------------------------------------------------------------
// Replication, research, lineage
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Replication {
    pub progress: f64,
    pub elapsed: u32,
    pub total: u32,
    pub consciousness_forked: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResearchTask {
    pub domain: TechDomain,
    pub ticks_done: f64,
    pub ticks_required: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LineageEntry {
    pub parent_id: Uid,
    pub child_id: Uid,
    pub birth_tick: u64,
    pub generation: u32,
}

// ---------------------------------------------------------------------------
// Engine parameters
// ---------------------------------------------------------------------------

/// Numeric engine parameters, overridable at runtime through the config
/// table. Defaults match the reference behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Params {
    pub ticks_per_cycle: f64,
    pub fuel_per_ly_kg: f64,
    pub min_travel_fuel_kg: f64,
    pub micrometeorite_rate: f64,
    pub micrometeorite_damage: f64,
    pub survey_ticks: [u32; SURVEY_LEVELS],
    pub survey_energy_j: f64,
    pub mine_energy_j: f64,
    pub mine_base_kg: f64,
    pub idle_energy_j: f64,
    pub energy_capacity_j: f64,
    pub orbit_fuel_base_kg: f64,
    pub launch_fuel_base_kg: f64,
    pub nav_fuel_kg: f64,
    pub repair_iron_kg: f64,
    pub repair_energy_j: f64,
    pub repair_hull: f64,
    pub replication_ticks: u32,
    pub metrics_interval: u64,
    pub trade_intersystem_delay: u64,
    pub message_energy_j: f64,
    pub broadcast_energy_j: f64,
    pub relay_range_ly: f64,
    pub discovery_rate: f64,
    pub anomaly_rate: f64,
    pub hazard_rate: f64,
    pub encounter_rate: f64,
    pub crisis_rate: f64,
    pub wonder_rate: f64,
    pub research_ticks_per_level: f64,
    pub shared_research_factor: f64,
    pub max_snapshots: usize,
    pub max_memories: usize,
    pub max_config_entries: usize,
}

impl Default for Params {
    fn default() -> Self {
        Params {
            ticks_per_cycle: 365.0,
            fuel_per_ly_kg: 0.5,
            min_travel_fuel_kg: 10.0,
            micrometeorite_rate: 5.0e-4,
            micrometeorite_damage: 0.02,
            survey_ticks: [3, 5, 8, 12, 20],
            survey_energy_j: 2.0e8,
            mine_energy_j: 5.0e8,
            mine_base_kg: 200.0,
            idle_energy_j: 1.0e8,
            energy_capacity_j: 1.0e12,
            orbit_fuel_base_kg: 50.0,
            launch_fuel_base_kg: 120.0,
            nav_fuel_kg: 5.0,
            repair_iron_kg: 100.0,
            repair_energy_j: 1.0e9,
            repair_hull: 0.05,
            replication_ticks: 200,
            metrics_interval: 100,
            trade_intersystem_delay: 100,
            message_energy_j: 1_000.0,
            broadcast_energy_j: 10_000.0,
            relay_range_ly: 20.0,
            discovery_rate: 5.0e-3,
            anomaly_rate: 1.0e-3,
            hazard_rate: 2.0e-3,
            encounter_rate: 2.0e-4,
            crisis_rate: 5.0e-5,
            wonder_rate: 3.0e-4,
            research_ticks_per_level: 50.0,
            shared_research_factor: 0.4,
            max_snapshots: 8,
            max_memories: 64,
            max_config_entries: 64,
        }
    }
}

/// Per-resource cost of constructing one child probe; sums to 500 000 kg.
pub const REPLICATION_COST: [f64; RESOURCE_COUNT] = [
    200_000.0, // iron
    150_000.0, // silicon
    50_000.0,  // rare earth
    30_000.0,  // water
    20_000.0,  // hydrogen
    10_000.0,  // helium-3
    25_000.0,  // carbon
    10_000.0,  // uranium
    5_000.0,   // exotic
];
