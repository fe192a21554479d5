//! Scenario tooling: event injection, metrics sampling, tagged snapshots,
//! forks, replay, and the runtime config table.

use serde::{Deserialize, Serialize};

use crate::engine::Engine;
use crate::rng::EngineRng;
use crate::types::{
    HazardKind, Probe, ProbeStatus, SimEvent, SimEventKind, Uid, EVENT_KIND_COUNT,
};

/// A pending injected event. A zero `target_probe_id` targets every live
/// probe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Injection {
    pub kind: SimEventKind,
    pub subtype: u8,
    pub description: String,
    pub severity: f64,
    pub target_probe_id: Uid,
    pub pending: bool,
}

/// An injection scheduled for a future tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledInjection {
    pub at_tick: u64,
    pub event: Injection,
}

/// Sampled every `metrics_interval` ticks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub tick: u64,
    pub probes_spawned: u64,
    pub probes_active: u64,
    /// Count of distinct visited system UIDs.
    pub systems_explored: u64,
    pub total_resources_kg: f64,
    pub avg_tech_level: f64,
    pub avg_trust: f64,
    pub structures_built: u64,
    pub event_counts: [u64; EVENT_KIND_COUNT],
}

/// A tagged, restorable copy of the mutable universe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub tag: String,
    pub tick: u64,
    pub seed: u64,
    pub probes: Vec<Probe>,
}

/// Byte-wise snapshot comparison.
pub fn snapshot_matches(a: &Snapshot, b: &Snapshot) -> bool {
    match (bincode::serialize(a), bincode::serialize(b)) {
        (Ok(bytes_a), Ok(bytes_b)) => bytes_a == bytes_b,
        _ => false,
    }
}

impl Engine {
    // -- Injection --------------------------------------------------------

    /// Queue an event for end-of-tick application. Errors when the queue is
    /// at capacity.
    pub fn inject(&mut self, injection: Injection) -> Result<usize, String> {
        if self.injections.len() >= 256 {
            return Err("injection queue is full".to_string());
        }
        self.injections.push(injection);
        Ok(self.injections.len())
    }

    /// Schedule injections for future ticks.
    pub fn schedule(&mut self, entries: Vec<ScheduledInjection>) -> Result<usize, String> {
        if self.scheduled.len() + entries.len() > 1024 {
            return Err("scenario schedule is full".to_string());
        }
        self.scheduled.extend(entries);
        Ok(self.scheduled.len())
    }

    /// Flush the injection queue into the event log, applying effects
    /// through the same paths organic events use. Runs strictly after the
    /// organic roll within the tick.
    pub(crate) fn flush_injections(&mut self) {
        let tick = self.universe.tick;

        // Promote due scheduled entries first.
        let due: Vec<ScheduledInjection> = self
            .scheduled
            .iter()
            .filter(|s| s.at_tick <= tick)
            .cloned()
            .collect();
        self.scheduled.retain(|s| s.at_tick > tick);
        for entry in due {
            self.injections.push(entry.event);
        }

        let pending: Vec<Injection> = self.injections.drain(..).collect();
        for injection in pending {
            if !injection.pending {
                continue;
            }
            let targets: Vec<Uid> = if injection.target_probe_id.is_zero() {
                self.universe
                    .probes
                    .iter()
                    .filter(|p| p.status != ProbeStatus::Destroyed)
                    .map(|p| p.id)
                    .collect()
            } else {
                vec![injection.target_probe_id]
            };
            for target in targets {
                let Some(index) = self.universe.probe_index(target) else {
                    continue;
                };
                if self.universe.probes[index].status == ProbeStatus::Destroyed {
                    continue;
                }
                let system_id = self.universe.probes[index].system_id;
                self.record_event(SimEvent {
                    kind: injection.kind,
                    subtype: injection.subtype,
                    probe_id: target,
                    system_id,
                    tick,
                    description: injection.description.clone(),
                    severity: injection.severity,
                });
                if injection.kind == SimEventKind::Hazard {
                    let hazard = match injection.subtype {
                        0 => HazardKind::SolarFlare,
                        1 => HazardKind::Asteroid,
                        _ => HazardKind::Radiation,
                    };
                    self.apply_hazard(index, hazard, injection.severity);
                }
            }
        }
    }

    // -- Metrics ----------------------------------------------------------

    pub(crate) fn metrics_tick(&mut self) {
        if self.universe.tick % self.params.metrics_interval == 0 {
            let snapshot = self.compute_metrics();
            self.metrics.push(snapshot);
        }
    }

    pub fn compute_metrics(&self) -> MetricsSnapshot {
        let mut probes_active = 0u64;
        let mut total_resources_kg = 0.0;
        let mut tech_sum = 0.0;
        let mut tech_count = 0u64;
        let mut trust_sum = 0.0;
        let mut trust_count = 0u64;

        for probe in &self.universe.probes {
            total_resources_kg += probe.resources.iter().sum::<f64>();
            for relationship in &probe.relationships {
                trust_sum += relationship.trust;
                trust_count += 1;
            }
            if probe.status == ProbeStatus::Destroyed {
                continue;
            }
            probes_active += 1;
            let mean_tech: f64 = probe.tech.iter().map(|t| f64::from(*t)).sum::<f64>()
                / probe.tech.len() as f64;
            tech_sum += mean_tech;
            tech_count += 1;
        }

        MetricsSnapshot {
            tick: self.universe.tick,
            probes_spawned: self.universe.probes.len() as u64,
            probes_active,
            systems_explored: self.visited_systems.len() as u64,
            total_resources_kg,
            avg_tech_level: if tech_count > 0 {
                tech_sum / tech_count as f64
            } else {
                0.0
            },
            avg_trust: if trust_count > 0 {
                trust_sum / trust_count as f64
            } else {
                0.0
            },
            structures_built: self
                .society
                .structures
                .iter()
                .filter(|s| s.completed)
                .count() as u64,
            event_counts: self.events.counts,
        }
    }

    // -- Snapshots & forks ------------------------------------------------

    /// Capture the universe under a tag, replacing any snapshot with the
    /// same tag. Errors when all slots are taken.
    pub fn take_snapshot(&mut self, tag: &str) -> Result<Snapshot, String> {
        let snapshot = Snapshot {
            tag: tag.to_string(),
            tick: self.universe.tick,
            seed: self.universe.seed,
            probes: self.universe.probes.clone(),
        };
        if let Some(slot) = self.snapshots.iter_mut().find(|s| s.tag == tag) {
            *slot = snapshot.clone();
            return Ok(snapshot);
        }
        if self.snapshots.len() >= self.params.max_snapshots {
            return Err("snapshot slots exhausted".to_string());
        }
        self.snapshots.push(snapshot.clone());
        Ok(snapshot)
    }

    /// Restore a tagged snapshot. The RNG is re-seeded and advanced once
    /// per restored tick to realign the stream.
    pub fn restore_snapshot(&mut self, tag: &str) -> Result<u64, String> {
        let Some(snapshot) = self.snapshots.iter().find(|s| s.tag == tag).cloned() else {
            return Err(format!("no snapshot tagged '{tag}'"));
        };
        self.universe.tick = snapshot.tick;
        self.universe.seed = snapshot.seed;
        self.universe.probes = snapshot.probes;
        self.rng = EngineRng::new(snapshot.seed);
        for _ in 0..snapshot.tick {
            let _ = self.rng.next_u64();
        }
        Ok(snapshot.tick)
    }

    /// Clone this universe into a fresh engine under a new seed, keeping
    /// tick and probes. The source is untouched.
    pub fn fork(&self, new_seed: u64) -> Engine {
        let mut forked = self.clone();
        forked.universe.seed = new_seed;
        forked.rng = EngineRng::new(new_seed);
        for _ in 0..forked.universe.tick {
            let _ = forked.rng.next_u64();
        }
        forked
    }

    // -- Replay -----------------------------------------------------------

    /// Events with `from_tick <= tick <= to_tick`, in log order.
    pub fn replay(&self, from_tick: u64, to_tick: u64) -> Vec<SimEvent> {
        self.events
            .log
            .iter()
            .filter(|e| e.tick >= from_tick && e.tick <= to_tick)
            .cloned()
            .collect()
    }

    // -- Config -----------------------------------------------------------

    /// Override a numeric engine parameter. The raw string is retained in
    /// the bounded config table.
    #[allow(clippy::too_many_lines)]
    pub fn set_config(&mut self, key: &str, raw: &str, value: f64) -> Result<(), String> {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        match key {
            "ticks_per_cycle" => self.params.ticks_per_cycle = value,
            "fuel_per_ly_kg" => self.params.fuel_per_ly_kg = value,
            "min_travel_fuel_kg" => self.params.min_travel_fuel_kg = value,
            "micrometeorite_rate" => self.params.micrometeorite_rate = value,
            "micrometeorite_damage" => self.params.micrometeorite_damage = value,
            "survey_energy_j" => self.params.survey_energy_j = value,
            "mine_energy_j" => self.params.mine_energy_j = value,
            "mine_base_kg" => self.params.mine_base_kg = value,
            "idle_energy_j" => self.params.idle_energy_j = value,
            "energy_capacity_j" => self.params.energy_capacity_j = value,
            "orbit_fuel_base_kg" => self.params.orbit_fuel_base_kg = value,
            "launch_fuel_base_kg" => self.params.launch_fuel_base_kg = value,
            "nav_fuel_kg" => self.params.nav_fuel_kg = value,
            "repair_iron_kg" => self.params.repair_iron_kg = value,
            "repair_energy_j" => self.params.repair_energy_j = value,
            "repair_hull" => self.params.repair_hull = value,
            "replication_ticks" => self.params.replication_ticks = value.max(1.0) as u32,
            "metrics_interval" => self.params.metrics_interval = value.max(1.0) as u64,
            "trade_intersystem_delay" => {
                self.params.trade_intersystem_delay = value.max(0.0) as u64;
            }
            "message_energy_j" => self.params.message_energy_j = value,
            "broadcast_energy_j" => self.params.broadcast_energy_j = value,
            "relay_range_ly" => self.params.relay_range_ly = value,
            "discovery_rate" => self.params.discovery_rate = value,
            "anomaly_rate" => self.params.anomaly_rate = value,
            "hazard_rate" => self.params.hazard_rate = value,
            "encounter_rate" => self.params.encounter_rate = value,
            "crisis_rate" => self.params.crisis_rate = value,
            "wonder_rate" => self.params.wonder_rate = value,
            "research_ticks_per_level" => self.params.research_ticks_per_level = value,
            "shared_research_factor" => self.params.shared_research_factor = value,
            _ => return Err(format!("unknown config key '{key}'")),
        }
        if self.config.len() >= self.params.max_config_entries && !self.config.contains_key(key) {
            return Err("config table is full".to_string());
        }
        self.config.insert(key.to_string(), raw.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Engine;
    use std::collections::BTreeMap;

    fn hazard_injection(target: Uid) -> Injection {
        Injection {
            kind: SimEventKind::Hazard,
            subtype: 1, // asteroid
            description: "scripted bombardment".to_string(),
            severity: 1.0,
            target_probe_id: target,
            pending: true,
        }
    }

    #[test]
    fn snapshot_restore_round_trips_bytewise() {
        let mut engine = Engine::new(42);
        let actions = BTreeMap::new();
        for _ in 0..25 {
            engine.step(&actions);
        }
        let first = engine.take_snapshot("checkpoint").unwrap();

        for _ in 0..25 {
            engine.step(&actions);
        }
        assert_eq!(engine.universe.tick, 50);

        let restored_tick = engine.restore_snapshot("checkpoint").unwrap();
        assert_eq!(restored_tick, 25);
        let second = engine.take_snapshot("verify").unwrap();
        let mut comparable = second.clone();
        comparable.tag = "checkpoint".to_string();
        assert!(snapshot_matches(&first, &comparable));
    }

    #[test]
    fn restore_unknown_tag_errors() {
        let mut engine = Engine::new(42);
        assert!(engine.restore_snapshot("ghost").is_err());
    }

    #[test]
    fn snapshot_slots_are_bounded() {
        let mut engine = Engine::new(42);
        for i in 0..engine.params.max_snapshots {
            engine.take_snapshot(&format!("slot{i}")).unwrap();
        }
        assert!(engine.take_snapshot("overflow").is_err());
        // Overwriting an existing tag still works at capacity.
        assert!(engine.take_snapshot("slot0").is_ok());
    }

    #[test]
    fn fork_preserves_probes_and_tick_with_new_seed() {
        let mut engine = Engine::new(42);
        let actions = BTreeMap::new();
        for _ in 0..10 {
            engine.step(&actions);
        }
        let source_tick = engine.universe.tick;
        let source_probes = engine.universe.probes.clone();

        let fork = engine.fork(9_000);
        assert_eq!(fork.universe.tick, source_tick);
        assert_eq!(fork.universe.probes, source_probes);
        assert_eq!(fork.universe.seed, 9_000);
        // The source is untouched.
        assert_eq!(engine.universe.seed, 42);
        assert_eq!(engine.universe.tick, source_tick);
        assert_eq!(engine.universe.probes, source_probes);
    }

    #[test]
    fn injection_applies_after_organic_roll_same_tick() {
        let mut engine = Engine::new(42);
        let target = engine.universe.probes[0].id;
        let hull_before = engine.universe.probes[0].hull;
        engine.inject(hazard_injection(target)).unwrap();

        let actions = BTreeMap::new();
        engine.step(&actions);

        assert!(engine.universe.probes[0].hull < hull_before);
        let logged = engine
            .events
            .log
            .iter()
            .find(|e| e.description == "scripted bombardment")
            .expect("injected event must reach the log");
        assert_eq!(logged.kind, SimEventKind::Hazard);
        assert!(engine.injections.is_empty(), "queue flushed");
    }

    #[test]
    fn zero_target_injects_into_every_probe() {
        let mut engine = Engine::new(42);
        crate::test_fixtures::spawn_probe_at(&mut engine, crate::types::Vec3::new(1.0, 0.0, 0.0));
        engine.inject(hazard_injection(Uid::ZERO)).unwrap();
        let actions = BTreeMap::new();
        engine.step(&actions);
        let hits = engine
            .events
            .log
            .iter()
            .filter(|e| e.description == "scripted bombardment")
            .count();
        assert_eq!(hits, 2);
    }

    #[test]
    fn scheduled_injection_waits_for_its_tick() {
        let mut engine = Engine::new(42);
        let target = engine.universe.probes[0].id;
        engine
            .schedule(vec![ScheduledInjection {
                at_tick: 3,
                event: hazard_injection(target),
            }])
            .unwrap();

        let actions = BTreeMap::new();
        engine.step(&actions); // tick 1
        engine.step(&actions); // tick 2
        assert!(!engine
            .events
            .log
            .iter()
            .any(|e| e.description == "scripted bombardment"));
        engine.step(&actions); // tick 3
        assert!(engine
            .events
            .log
            .iter()
            .any(|e| e.description == "scripted bombardment"));
    }

    #[test]
    fn metrics_sample_on_interval() {
        let mut engine = Engine::new(42);
        engine.params.metrics_interval = 10;
        let actions = BTreeMap::new();
        for _ in 0..30 {
            engine.step(&actions);
        }
        assert_eq!(engine.metrics.len(), 3);
        assert_eq!(engine.metrics[0].tick, 10);
        assert_eq!(engine.metrics[2].tick, 30);
        assert_eq!(engine.metrics[0].probes_spawned, 1);
        assert!(engine.metrics[0].systems_explored >= 1);
    }

    #[test]
    fn replay_filters_by_tick_range() {
        let mut engine = Engine::new(42);
        engine.events.log.push(SimEvent {
            kind: SimEventKind::Discovery,
            subtype: 0,
            probe_id: Uid::ZERO,
            system_id: Uid::ZERO,
            tick: 5,
            description: "early".to_string(),
            severity: 0.0,
        });
        engine.events.log.push(SimEvent {
            kind: SimEventKind::Wonder,
            subtype: 0,
            probe_id: Uid::ZERO,
            system_id: Uid::ZERO,
            tick: 15,
            description: "late".to_string(),
            severity: 0.0,
        });
        let slice = engine.replay(0, 10);
        assert_eq!(slice.len(), 1);
        assert_eq!(slice[0].description, "early");
        let all = engine.replay(0, 100);
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn config_overrides_params_and_rejects_unknown_keys() {
        let mut engine = Engine::new(42);
        engine.set_config("hazard_rate", "0.5", 0.5).unwrap();
        assert!((engine.params.hazard_rate - 0.5).abs() < 1e-12);
        assert_eq!(engine.config.get("hazard_rate").unwrap(), "0.5");
        assert!(engine.set_config("warp_drive", "1", 1.0).is_err());
    }
}
