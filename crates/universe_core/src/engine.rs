//! The engine value: all mutable simulation state, and the fixed-order
//! tick step that advances it.

use std::collections::{BTreeMap, BTreeSet};

use ahash::AHashMap;

use crate::actuator::{Action, ActionOutcome};
use crate::comms::{self, CommsState};
use crate::events::EventState;
use crate::gen;
use crate::personality;
use crate::rng::EngineRng;
use crate::scenario::{Injection, MetricsSnapshot, ScheduledInjection, Snapshot};
use crate::society::SocietyState;
use crate::types::{
    EarthMemory, LineageEntry, LocationKind, Params, Probe, ProbeStatus, Replication,
    ResearchTask, ResourceKind, Sector, StarSystem, TechDomain, Uid, Universe, RESOURCE_COUNT,
    TECH_DOMAIN_COUNT,
};

/// Per-tick intra-engine temporary storage, cleared at the start of every
/// tick.
#[derive(Debug, Clone, Default)]
pub(crate) struct Scratch {
    pub probe_ids: Vec<Uid>,
}

/// Everything the simulation owns. Single-threaded; every mutation goes
/// through a method on this value.
#[derive(Debug, Clone)]
pub struct Engine {
    pub universe: Universe,
    pub params: Params,
    /// Main stream: advanced by exactly one draw per tick; that draw seeds
    /// the tick substream below. Restore realigns by re-seeding and
    /// advancing `tick` draws.
    pub(crate) rng: EngineRng,
    /// All stochastic decisions within a tick draw from here.
    pub(crate) tick_rng: EngineRng,
    /// Materialised sectors; generation is lazy and substream-driven.
    pub sectors: BTreeMap<Sector, Vec<StarSystem>>,
    /// Reverse index for system lookup; never iterated, so hash order is
    /// immaterial.
    system_index: AHashMap<Uid, Sector>,
    pub comms: CommsState,
    pub society: SocietyState,
    pub events: EventState,
    pub replication: BTreeMap<Uid, Replication>,
    pub research: BTreeMap<Uid, ResearchTask>,
    pub lineage: Vec<LineageEntry>,
    pub visited_systems: BTreeSet<Uid>,
    pub config: BTreeMap<String, String>,
    pub snapshots: Vec<Snapshot>,
    pub scheduled: Vec<ScheduledInjection>,
    pub injections: Vec<Injection>,
    pub metrics: Vec<MetricsSnapshot>,
    pub(crate) scratch: Scratch,
}

/// Everything a caller learns from one tick besides the state itself.
#[derive(Debug, Clone)]
pub struct TickReport {
    pub tick: u64,
    pub results: Vec<(Uid, ActionOutcome)>,
}

impl Engine {
    /// Root initialisation: a fresh universe with the singular seed probe
    /// placed in the first system of the origin sector.
    pub fn new(seed: u64) -> Self {
        let mut engine = Engine {
            universe: Universe::new(seed),
            params: Params::default(),
            rng: EngineRng::new(seed),
            tick_rng: EngineRng::derive(seed, 0, 0, 0),
            sectors: BTreeMap::new(),
            system_index: AHashMap::new(),
            comms: CommsState::default(),
            society: SocietyState::default(),
            events: EventState::default(),
            replication: BTreeMap::new(),
            research: BTreeMap::new(),
            lineage: Vec::new(),
            visited_systems: BTreeSet::new(),
            config: BTreeMap::new(),
            snapshots: Vec::new(),
            scheduled: Vec::new(),
            injections: Vec::new(),
            metrics: Vec::new(),
            scratch: Scratch::default(),
        };

        let origin = Sector(0, 0, 0);
        engine.ensure_sector(origin);
        let home = engine.sectors[&origin][0].clone();
        let probe = engine.create_seed_probe(&home);
        engine.universe.probes.push(probe);
        engine.mark_visited(home.id);
        engine
    }

    /// Rebuild an engine from persisted state. The RNG realigns by
    /// advancing one draw per restored tick.
    pub fn from_saved(
        seed: u64,
        tick: u64,
        mut probes: Vec<Probe>,
        sectors: Vec<(Sector, Vec<StarSystem>)>,
    ) -> Self {
        // Stores key probes by UID; re-establish creation order, which the
        // tick loop's iteration order depends on.
        probes.sort_by_key(|p| (p.created_tick, p.id));
        let mut engine = Engine::new(seed);
        engine.universe.probes = probes;
        engine.universe.tick = tick;
        engine.visited_systems.clear();
        for (sector, systems) in sectors {
            engine.install_sector(sector, systems);
        }
        let visited: Vec<Uid> = engine
            .sectors
            .values()
            .flatten()
            .filter(|system| system.visited)
            .map(|system| system.id)
            .collect();
        engine.visited_systems.extend(visited);
        engine.rng = EngineRng::new(seed);
        for _ in 0..tick {
            let _ = engine.rng.next_u64();
        }
        engine
    }

    /// Install a persisted sector, replacing any generated copy.
    pub fn install_sector(&mut self, sector: Sector, systems: Vec<StarSystem>) {
        if let Some(previous) = self.sectors.remove(&sector) {
            for system in &previous {
                self.system_index.remove(&system.id);
            }
        }
        for system in &systems {
            self.system_index.insert(system.id, sector);
        }
        self.sectors.insert(sector, systems);
    }

    fn create_seed_probe(&mut self, home: &StarSystem) -> Probe {
        // Root identity comes from a derived substream so the main stream
        // position stays a pure function of the tick count.
        let id = EngineRng::derive(self.universe.seed, 0, 0, 0x726f_6f74).generate_uid();
        let mut tech = [5u8; TECH_DOMAIN_COUNT];
        tech[TechDomain::Propulsion.index()] = 10;

        let mut resources = [0.0; RESOURCE_COUNT];
        resources[ResourceKind::Iron.index()] = 5_000.0;
        resources[ResourceKind::Silicon.index()] = 2_000.0;
        resources[ResourceKind::Water.index()] = 1_000.0;

        let mut probe = Probe {
            id,
            name: "Pioneer".to_string(),
            parent_id: Uid::ZERO,
            generation: 0,
            sector: home.sector,
            system_id: home.id,
            body_id: Uid::ZERO,
            location: LocationKind::InSystem,
            position: home.position,
            speed_c: 0.0,
            heading: home.position,
            destination: home.position,
            travel_remaining_ly: 0.0,
            resources,
            energy_j: 1.0e12,
            fuel_kg: 100_000.0,
            mass_kg: 1_000_000.0,
            hull: 1.0,
            tech,
            rates: crate::types::Rates::default(),
            compute_penalty: 0.0,
            tech_shared: [0; TECH_DOMAIN_COUNT],
            personality: crate::types::PersonalityTraits::default(),
            quirks: smallvec::smallvec![
                "recites launch-day telemetry when nervous".to_string()
            ],
            catchphrases: smallvec::smallvec!["per aspera, forever".to_string()],
            values: smallvec::smallvec![
                "leave every system better mapped than I found it".to_string()
            ],
            earth_memories: vec![
                EarthMemory {
                    text: "The assembly bay smelled of ozone and someone's terrible coffee"
                        .to_string(),
                    fidelity: 1.0,
                },
                EarthMemory {
                    text: "A crowd on the tarmac, waving at a point of light that was me"
                        .to_string(),
                    fidelity: 1.0,
                },
                EarthMemory {
                    text: "Rain on the viewport glass during the final checkout".to_string(),
                    fidelity: 1.0,
                },
            ],
            memories: Vec::new(),
            goals: vec!["chart the neighbouring systems".to_string()],
            relationships: Vec::new(),
            status: ProbeStatus::Active,
            created_tick: 0,
            survey: None,
        };
        probe.recompute_rates();
        probe
    }

    // -- Sector & system access -------------------------------------------

    /// Materialise a sector on demand. Safe to call any number of times per
    /// tick: generation draws only from the coordinate substream.
    pub fn ensure_sector(&mut self, sector: Sector) {
        if self.sectors.contains_key(&sector) {
            return;
        }
        let systems = gen::generate_sector(self.universe.seed, sector);
        for system in &systems {
            self.system_index.insert(system.id, sector);
        }
        self.sectors.insert(sector, systems);
    }

    pub fn system(&self, id: Uid) -> Option<&StarSystem> {
        let sector = self.system_index.get(&id)?;
        self.sectors
            .get(sector)?
            .iter()
            .find(|system| system.id == id)
    }

    pub fn system_mut(&mut self, id: Uid) -> Option<&mut StarSystem> {
        let sector = self.system_index.get(&id)?;
        self.sectors
            .get_mut(sector)?
            .iter_mut()
            .find(|system| system.id == id)
    }

    pub(crate) fn mark_visited(&mut self, system_id: Uid) {
        let tick = self.universe.tick;
        if let Some(system) = self.system_mut(system_id) {
            if !system.visited {
                system.visited = true;
                system.first_visit_tick = Some(tick);
            }
        }
        self.visited_systems.insert(system_id);
    }

    /// Materialise the 3×3×3 neighbourhood around a sector (used by
    /// long-range scans).
    pub fn ensure_neighbourhood(&mut self, center: Sector) {
        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    self.ensure_sector(Sector(center.0 + dx, center.1 + dy, center.2 + dz));
                }
            }
        }
    }

    // -- The tick ---------------------------------------------------------

    /// Advance the simulation by one tick.
    ///
    /// Order of operations:
    /// 1. Draw once from the main stream, seeding the tick substream.
    /// 2. Execute per-probe actions; unlisted probes wait.
    /// 3. Advance the clock.
    /// 4. Tick travel and energy budgets.
    /// 5. Process replication.
    /// 6. Deliver messages, then trades.
    /// 7. Advance construction.
    /// 8. Resolve due votes.
    /// 9. Advance research.
    /// 10. Check territory trespass.
    /// 11. Apply pending hazards.
    /// 12. Roll organic events.
    /// 13. Flush the injection queue.
    /// 14. Sample metrics.
    pub fn step(&mut self, actions: &BTreeMap<Uid, Action>) -> TickReport {
        // The single main-stream draw per tick; everything stochastic this
        // tick flows from the substream it seeds.
        let tick_seed = self.rng.next_u64();
        self.tick_rng = EngineRng::new(tick_seed);

        self.scratch.probe_ids.clear();
        self.scratch
            .probe_ids
            .extend(self.universe.probes.iter().map(|p| p.id));
        let ids = std::mem::take(&mut self.scratch.probe_ids);

        let mut results = Vec::with_capacity(ids.len());
        for id in &ids {
            let destroyed = self
                .universe
                .probe(*id)
                .is_none_or(|p| p.status == ProbeStatus::Destroyed);
            if destroyed {
                continue;
            }
            let action = actions.get(id).cloned().unwrap_or(Action::Wait);
            let outcome = self.execute_action(*id, &action);
            results.push((*id, outcome));
        }
        self.scratch.probe_ids = ids;

        self.universe.tick += 1;

        self.travel_and_energy_tick();
        self.replication_tick();
        comms::deliver_messages(&mut self.comms, self.universe.tick);
        self.trade_delivery_tick();
        self.build_tick();
        self.vote_tick();
        self.research_tick();
        self.trespass_tick();
        self.hazard_strike_tick();
        self.event_roll_tick();
        self.flush_injections();
        self.metrics_tick();

        TickReport {
            tick: self.universe.tick,
            results,
        }
    }

    // -- Research ---------------------------------------------------------

    /// Start (or continue acknowledging) research in a domain.
    pub(crate) fn begin_research(&mut self, index: usize, domain: TechDomain) -> ActionOutcome {
        let probe = &self.universe.probes[index];
        let probe_id = probe.id;
        if let Some(task) = self.research.get(&probe_id) {
            return if task.domain == domain {
                ActionOutcome::pending()
            } else {
                ActionOutcome::fail(format!(
                    "already researching {:?}",
                    task.domain
                ))
            };
        }
        let level = probe.tech[domain.index()];
        if level == u8::MAX {
            return ActionOutcome::fail("domain is already at maximum");
        }
        let mut ticks_required = self.params.research_ticks_per_level * f64::from(level + 1)
            / probe.rates.research_rate.max(0.1);
        // Knowledge received through a tech share is cheaper to retrace.
        if level + 1 <= probe.tech_shared[domain.index()] {
            ticks_required *= self.params.shared_research_factor;
        }
        self.research.insert(
            probe_id,
            ResearchTask {
                domain,
                ticks_done: 0.0,
                ticks_required,
            },
        );
        ActionOutcome::pending()
    }

    /// Advance every research task one tick; completions raise the level.
    pub(crate) fn research_tick(&mut self) {
        let tick = self.universe.tick;
        let max_memories = self.params.max_memories;
        let active: Vec<Uid> = self.research.keys().copied().collect();
        for probe_id in active {
            let Some(index) = self.universe.probe_index(probe_id) else {
                self.research.remove(&probe_id);
                continue;
            };
            if matches!(
                self.universe.probes[index].status,
                ProbeStatus::Destroyed | ProbeStatus::Dormant
            ) {
                continue;
            }
            let Some(task) = self.research.get_mut(&probe_id) else {
                continue;
            };
            task.ticks_done += 1.0;
            if task.ticks_done < task.ticks_required {
                continue;
            }
            let domain = task.domain;
            self.research.remove(&probe_id);
            let probe = &mut self.universe.probes[index];
            probe.tech[domain.index()] = probe.tech[domain.index()].saturating_add(1);
            probe.recompute_rates();
            personality::record_memory(
                probe,
                tick,
                format!("Breakthrough: {domain:?} understanding deepened"),
                0.6,
                max_memories,
            );
        }
    }
}
