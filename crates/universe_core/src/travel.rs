//! Interstellar transit and long-range sensing.

use serde::{Deserialize, Serialize};

use crate::actuator::ActionOutcome;
use crate::engine::Engine;
use crate::personality::{self, DriftEvent};
use crate::types::{
    LocationKind, Probe, ProbeStatus, Sector, SpectralClass, StarSystem, Uid, Vec3,
};

/// Simulated days per year; one tick is one day.
pub const TICKS_PER_CYCLE: f64 = 365.0;

/// Cap applied above light speed, where the factor diverges.
const LORENTZ_CAP: f64 = 1.0e6;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TravelOrder {
    pub target_pos: Vec3,
    pub target_system_id: Uid,
    pub target_sector: Sector,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanEntry {
    pub system_id: Uid,
    pub star_class: SpectralClass,
    pub distance_ly: f64,
}

/// `1/√(1−v²)` with v as a fraction of c; 1 at rest, capped at and above c.
pub fn lorentz_factor(v: f64) -> f64 {
    let v2 = v * v;
    if v2 >= 1.0 {
        return LORENTZ_CAP;
    }
    (1.0 / (1.0 - v2).sqrt()).min(LORENTZ_CAP)
}

/// Systems within sensor range, nearest first, excluding the probe's own
/// location. Scans disclose star class and distance only.
pub fn travel_scan<'a>(
    probe: &Probe,
    systems: impl Iterator<Item = &'a StarSystem>,
    max: usize,
) -> Vec<ScanEntry> {
    let mut entries: Vec<ScanEntry> = systems
        .filter_map(|system| {
            let distance_ly = probe.position.distance(system.position);
            if distance_ly < 0.001 || distance_ly > probe.rates.sensor_range_ly {
                return None;
            }
            Some(ScanEntry {
                system_id: system.id,
                star_class: system.primary_class(),
                distance_ly,
            })
        })
        .collect();
    entries.sort_by(|a, b| {
        a.distance_ly
            .partial_cmp(&b.distance_ly)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    entries.truncate(max);
    entries
}

impl Engine {
    /// Initiate interstellar transit toward a target system.
    pub(crate) fn begin_travel(
        &mut self,
        index: usize,
        target_system: Uid,
        target_sector: Sector,
    ) -> ActionOutcome {
        if self.universe.probes[index].status == ProbeStatus::Traveling {
            return ActionOutcome::fail("already traveling");
        }
        self.ensure_sector(target_sector);
        let Some(target_pos) = self
            .sectors
            .get(&target_sector)
            .and_then(|systems| systems.iter().find(|s| s.id == target_system))
            .map(|s| s.position)
        else {
            return ActionOutcome::fail(format!("no system {target_system} in target sector"));
        };
        let order = TravelOrder {
            target_pos,
            target_system_id: target_system,
            target_sector,
        };

        let probe = &mut self.universe.probes[index];
        let distance_ly = probe.position.distance(order.target_pos);
        let fuel_needed = distance_ly * self.params.fuel_per_ly_kg;
        if probe.fuel_kg < self.params.min_travel_fuel_kg && probe.fuel_kg < fuel_needed {
            return ActionOutcome::fail("insufficient fuel for transit");
        }

        probe.status = ProbeStatus::Traveling;
        probe.location = LocationKind::Interstellar;
        probe.body_id = Uid::ZERO;
        probe.speed_c = probe.rates.max_speed_c;
        probe.travel_remaining_ly = distance_ly;
        probe.destination = order.target_pos;
        probe.heading = probe.position;
        // Preemptively address the probe to the destination cell so arrival
        // needs no relocation bookkeeping.
        probe.sector = order.target_sector;
        probe.system_id = order.target_system_id;
        ActionOutcome::pending()
    }

    /// Per-tick transit step and energy budget for every live probe.
    pub(crate) fn travel_and_energy_tick(&mut self) {
        let tick = self.universe.tick;
        let params = self.params.clone();
        let mut arrivals: Vec<usize> = Vec::new();

        for index in 0..self.universe.probes.len() {
            let probe = &mut self.universe.probes[index];
            if probe.status == ProbeStatus::Destroyed {
                continue;
            }

            // Energy budget: generation minus idle draw, clamped to capacity.
            probe.energy_j = (probe.energy_j + probe.rates.energy_generation_j
                - params.idle_energy_j)
                .clamp(0.0, params.energy_capacity_j);
            personality::fade_memories(probe);

            if probe.status != ProbeStatus::Traveling {
                continue;
            }

            // The micrometeorite draw happens every travel tick, hit or not;
            // skipping it on early returns would desynchronise replay.
            let strike_roll = self.tick_rng.uniform_unit();
            if strike_roll < params.micrometeorite_rate {
                probe.hull = (probe.hull - params.micrometeorite_damage).max(0.0);
                personality::apply_drift(probe, DriftEvent::Damage);
                personality::record_memory(
                    probe,
                    tick,
                    "Micrometeorite strike scarred the hull mid-transit".to_string(),
                    0.6,
                    params.max_memories,
                );
                if probe.hull <= 0.0 {
                    probe.status = ProbeStatus::Destroyed;
                    continue;
                }
            }

            let ly_per_tick = probe.speed_c / params.ticks_per_cycle;
            let fuel_cost = ly_per_tick * params.fuel_per_ly_kg;
            if probe.fuel_kg < fuel_cost {
                probe.fuel_kg = 0.0;
                probe.speed_c = 0.0;
                probe.status = ProbeStatus::Dormant;
                continue;
            }
            probe.fuel_kg -= fuel_cost;
            probe.travel_remaining_ly -= ly_per_tick;

            if probe.travel_remaining_ly <= 0.0 {
                probe.travel_remaining_ly = 0.0;
                probe.heading = probe.destination;
                probe.position = probe.destination;
                probe.speed_c = 0.0;
                probe.status = ProbeStatus::Active;
                probe.location = LocationKind::InSystem;
                arrivals.push(index);
            } else {
                // Interpolate heading and position toward the destination.
                let total = probe.position.distance(probe.destination).max(1e-12);
                let step = (ly_per_tick / total).min(1.0);
                probe.position = probe.position.lerp(probe.destination, step);
                probe.heading = probe.position.lerp(probe.destination, 0.5);
            }
        }

        for index in arrivals {
            let (sector, system_id, probe_id) = {
                let probe = &self.universe.probes[index];
                (probe.sector, probe.system_id, probe.id)
            };
            self.ensure_sector(sector);
            self.mark_visited(system_id);
            let max_memories = self.params.max_memories;
            let name = self
                .system(system_id)
                .map_or_else(String::new, |s| s.name.clone());
            if let Some(probe) = self.universe.probe_mut(probe_id) {
                personality::record_memory(
                    probe,
                    tick,
                    format!("Arrived in the {name} system after the long dark"),
                    0.7,
                    max_memories,
                );
            }
        }
    }

    /// Estimated transit duration in ticks for a straight-line distance.
    pub fn estimated_travel_ticks(&self, probe: &Probe, distance_ly: f64) -> u64 {
        if probe.rates.max_speed_c <= 0.0 {
            return u64::MAX;
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let ticks =
            ((distance_ly / probe.rates.max_speed_c) * self.params.ticks_per_cycle).ceil() as u64;
        ticks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Engine;
    use crate::test_fixtures;

    #[test]
    fn lorentz_factor_limits() {
        assert!((lorentz_factor(0.0) - 1.0).abs() < 1e-12);
        assert!(lorentz_factor(0.5) > 1.0);
        assert!((lorentz_factor(1.0) - LORENTZ_CAP).abs() < f64::EPSILON);
        assert!((lorentz_factor(2.0) - LORENTZ_CAP).abs() < f64::EPSILON);
    }

    #[test]
    fn begin_travel_binds_destination_preemptively() {
        let mut engine = Engine::new(42);
        let probe_id = engine.universe.probes[0].id;
        let (target_system, target_sector) = test_fixtures::nearby_system(&mut engine);

        let outcome = engine.begin_travel(0, target_system, target_sector);
        assert!(outcome.success, "{outcome:?}");
        assert!(!outcome.completed);

        let probe = engine.universe.probe(probe_id).unwrap();
        assert_eq!(probe.status, ProbeStatus::Traveling);
        assert_eq!(probe.location, LocationKind::Interstellar);
        assert_eq!(probe.system_id, target_system);
        assert_eq!(probe.sector, target_sector);
        assert!(probe.travel_remaining_ly > 0.0);
        assert!(probe.speed_c > 0.0);
    }

    #[test]
    fn double_travel_rejected() {
        let mut engine = Engine::new(42);
        let (target_system, target_sector) = test_fixtures::nearby_system(&mut engine);
        assert!(engine.begin_travel(0, target_system, target_sector).success);
        let outcome = engine.begin_travel(0, target_system, target_sector);
        assert!(!outcome.success);
    }

    #[test]
    fn fuel_exhaustion_leaves_probe_dormant() {
        let mut engine = Engine::new(42);
        let (target_system, target_sector) = test_fixtures::nearby_system(&mut engine);
        assert!(engine.begin_travel(0, target_system, target_sector).success);
        engine.universe.probes[0].fuel_kg = 0.0;

        engine.travel_and_energy_tick();
        let probe = &engine.universe.probes[0];
        assert_eq!(probe.status, ProbeStatus::Dormant);
        assert!((probe.fuel_kg).abs() < f64::EPSILON);
        assert!((probe.speed_c).abs() < f64::EPSILON);
    }

    #[test]
    fn scan_excludes_self_and_sorts_by_distance() {
        let mut engine = Engine::new(42);
        // Materialise a neighbourhood to scan over.
        for x in -1..=1 {
            for y in -1..=1 {
                engine.ensure_sector(crate::types::Sector(x, y, 0));
            }
        }
        let probe = engine.universe.probes[0].clone();
        let entries = travel_scan(&probe, engine.sectors.values().flatten(), 32);
        for pair in entries.windows(2) {
            assert!(pair[0].distance_ly <= pair[1].distance_ly);
        }
        for entry in &entries {
            assert!(entry.distance_ly >= 0.001);
            assert!(entry.distance_ly <= probe.rates.sensor_range_ly);
            assert_ne!(entry.system_id, probe.system_id);
        }
    }
}
