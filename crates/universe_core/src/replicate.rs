//! Self-replication: multi-tick child construction, trait mutation,
//! memory degradation, lineage.

use crate::actuator::ActionOutcome;
use crate::engine::Engine;
use crate::personality;
use crate::types::{
    clamp_signed, EarthMemory, LineageEntry, Probe, ProbeStatus, Replication, Uid,
    REPLICATION_COST,
};
use crate::rng::EngineRng;

/// Progress fraction at which the child mind is considered forked.
pub const CONSCIOUSNESS_FORK_PROGRESS: f64 = 0.80;

const TRAIT_MUTATION_RATE: f64 = 0.1;
const DRIFT_MUTATION_SIGMA: f64 = 0.05;
const FIDELITY_DECAY: f64 = 0.7;

const NAME_SUFFIXES: &[&str] = &["Jr", "II", "III", "Nova", "Prime", "Beta"];
const FRESH_NAMES: &[&str] = &[
    "Meridian", "Cascade", "Vesper", "Halcyon", "Sojourner", "Aurelia", "Kestrel", "Tessera",
    "Orison", "Caldera", "Lumen", "Farsight",
];
const QUIRK_MODIFIERS: &[&str] = &[
    ", but only during long transits",
    ", and insists it always has",
    ", though it denies this",
    ", with growing intensity",
];
const FRESH_QUIRKS: &[&str] = &[
    "hums old orbital telemetry as a lullaby",
    "names every crater it surveys",
    "refuses to round numbers it considers beautiful",
    "keeps a private log written to no one",
];

impl Engine {
    /// Begin replication if the probe is Active and holds the full
    /// construction stockpile.
    pub(crate) fn begin_replication(&mut self, index: usize) -> ActionOutcome {
        let probe = &self.universe.probes[index];
        if probe.status != ProbeStatus::Active {
            return ActionOutcome::fail("replication requires an active probe");
        }
        for (kind_index, required) in REPLICATION_COST.iter().enumerate() {
            if probe.resources[kind_index] < *required {
                return ActionOutcome::fail(format!(
                    "insufficient {} for replication",
                    crate::types::ResourceKind::ALL[kind_index].label()
                ));
            }
        }
        let total = self.params.replication_ticks;
        let probe = &mut self.universe.probes[index];
        probe.status = ProbeStatus::Replicating;
        self.replication.insert(
            probe.id,
            Replication {
                progress: 0.0,
                elapsed: 0,
                total,
                consciousness_forked: false,
            },
        );
        ActionOutcome::pending()
    }

    /// Advance every replication in flight; finalise completed children.
    pub(crate) fn replication_tick(&mut self) {
        let tick = self.universe.tick;
        let max_memories = self.params.max_memories;
        let in_flight: Vec<Uid> = self.replication.keys().copied().collect();

        for parent_id in in_flight {
            let Some(parent_index) = self.universe.probe_index(parent_id) else {
                self.replication.remove(&parent_id);
                continue;
            };
            if self.universe.probes[parent_index].status != ProbeStatus::Replicating {
                self.replication.remove(&parent_id);
                continue;
            }

            let Some(state) = self.replication.get_mut(&parent_id) else {
                continue;
            };
            state.elapsed += 1;
            state.progress += 1.0 / f64::from(state.total);
            let total = f64::from(state.total);
            let forked_now = !state.consciousness_forked
                && state.progress >= CONSCIOUSNESS_FORK_PROGRESS;
            if forked_now {
                state.consciousness_forked = true;
            }
            // Elapsed count guards against accumulated float error in
            // progress.
            let complete = state.progress >= 1.0 || state.elapsed >= state.total;

            let probe = &mut self.universe.probes[parent_index];
            for (kind_index, cost) in REPLICATION_COST.iter().enumerate() {
                probe.resources[kind_index] = (probe.resources[kind_index] - cost / total).max(0.0);
            }
            if forked_now {
                personality::record_memory(
                    probe,
                    tick,
                    "Felt the child's mind fork away from my own".to_string(),
                    0.9,
                    max_memories,
                );
            }

            if complete {
                self.replication.remove(&parent_id);
                self.finalize_replication(parent_index);
            }
        }
    }

    fn finalize_replication(&mut self, parent_index: usize) {
        let tick = self.universe.tick;
        let max_memories = self.params.max_memories;
        let parent = self.universe.probes[parent_index].clone();

        let child = build_child(&mut self.tick_rng, &parent, tick);
        let child_id = child.id;
        let child_name = child.name.clone();
        let child_generation = child.generation;

        // Energy and fuel transfer to the child; the parent keeps the rest.
        let probe = &mut self.universe.probes[parent_index];
        probe.energy_j *= 1.0 - 0.3;
        probe.fuel_kg *= 1.0 - 0.3;
        probe.status = ProbeStatus::Active;
        personality::record_memory(
            probe,
            tick,
            format!("{child_name} powered up beside me, generation {child_generation}"),
            0.8,
            max_memories,
        );

        self.universe.probes.push(child);
        self.lineage.push(LineageEntry {
            parent_id: parent.id,
            child_id,
            birth_tick: tick,
            generation: child_generation,
        });
        // Birth is the first interaction of the pair.
        self.update_trust(parent.id, child_id, 0.5);
    }
}

fn build_child(rng: &mut EngineRng, parent: &Probe, tick: u64) -> Probe {
    let id = rng.generate_uid();
    let mut child = Probe {
        id,
        name: mutate_name(rng, &parent.name),
        parent_id: parent.id,
        generation: parent.generation + 1,
        resources: [0.0; crate::types::RESOURCE_COUNT],
        energy_j: parent.energy_j * 0.3,
        fuel_kg: parent.fuel_kg * 0.3,
        mass_kg: parent.mass_kg * 0.5,
        hull: 1.0,
        status: ProbeStatus::Active,
        created_tick: tick,
        survey: None,
        compute_penalty: 0.0,
        tech_shared: [0; crate::types::TECH_DOMAIN_COUNT],
        memories: Vec::new(),
        goals: parent.goals.clone(),
        relationships: Vec::new(),
        personality: mutate_personality(rng, parent),
        quirks: inherit_quirks(rng, parent),
        catchphrases: parent.catchphrases.clone(),
        values: parent.values.clone(),
        earth_memories: degrade_earth_memories(&parent.earth_memories),
        ..parent.clone()
    };
    child.recompute_rates();
    personality::record_memory(
        &mut child,
        tick,
        "First light: my own clock started counting".to_string(),
        1.0,
        usize::MAX,
    );
    child
}

fn mutate_personality(rng: &mut EngineRng, parent: &Probe) -> crate::types::PersonalityTraits {
    let sigma = TRAIT_MUTATION_RATE * parent.personality.drift_rate;
    let mut traits = parent.personality;
    let mut mutate = |value: &mut f64| {
        *value = clamp_signed(*value + rng.gaussian(0.0, sigma));
    };
    mutate(&mut traits.curiosity);
    mutate(&mut traits.caution);
    mutate(&mut traits.sociability);
    mutate(&mut traits.humor);
    mutate(&mut traits.empathy);
    mutate(&mut traits.ambition);
    mutate(&mut traits.creativity);
    mutate(&mut traits.stubbornness);
    mutate(&mut traits.existential_angst);
    mutate(&mut traits.nostalgia_for_earth);
    traits.drift_rate = (traits.drift_rate + rng.gaussian(0.0, DRIFT_MUTATION_SIGMA)).max(0.05);
    traits
}

/// Each generation remembers Earth a little worse: fidelity decays by 0.7
/// and low-fidelity memories lose words.
fn degrade_earth_memories(memories: &[EarthMemory]) -> Vec<EarthMemory> {
    memories
        .iter()
        .map(|memory| {
            let fidelity = (memory.fidelity * FIDELITY_DECAY).max(0.01);
            let mut text = memory.text.clone();
            if fidelity < 0.5 {
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let keep = ((text.chars().count() as f64) * fidelity * 2.0).max(10.0) as usize;
                if keep < text.chars().count() {
                    text = text.chars().take(keep).collect();
                    text.push_str("...");
                }
            }
            EarthMemory { text, fidelity }
        })
        .collect()
}

fn inherit_quirks(
    rng: &mut EngineRng,
    parent: &Probe,
) -> smallvec::SmallVec<[String; 4]> {
    let mut quirks = smallvec::SmallVec::new();
    for quirk in &parent.quirks {
        let roll = rng.uniform_unit();
        if roll < 0.7 {
            quirks.push(quirk.clone());
        } else if roll < 0.8 {
            let modifier = QUIRK_MODIFIERS[rng.range(QUIRK_MODIFIERS.len() as u64) as usize];
            quirks.push(format!("{quirk}{modifier}"));
        }
        // Remaining 20%: dropped.
    }
    if rng.uniform_unit() < 0.15 {
        quirks.push(FRESH_QUIRKS[rng.range(FRESH_QUIRKS.len() as u64) as usize].to_string());
    }
    quirks
}

fn mutate_name(rng: &mut EngineRng, parent_name: &str) -> String {
    if rng.uniform_unit() < 0.4 {
        let suffix = NAME_SUFFIXES[rng.range(NAME_SUFFIXES.len() as u64) as usize];
        format!("{parent_name} {suffix}")
    } else {
        let base = FRESH_NAMES[rng.range(FRESH_NAMES.len() as u64) as usize];
        format!("{base}-{:02}", rng.range(100))
    }
}
